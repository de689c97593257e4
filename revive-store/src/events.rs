use tokio::sync::broadcast;
use tracing::debug;

use revive_core::events::EventPublisher;
use revive_shared::models::MarketEvent;

/// In-process fan-out of committed domain events.
#[derive(Clone)]
pub struct BroadcastPublisher {
    sender: broadcast::Sender<MarketEvent>,
}

impl BroadcastPublisher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MarketEvent> {
        self.sender.subscribe()
    }
}

impl EventPublisher for BroadcastPublisher {
    fn publish(&self, event: MarketEvent) {
        if self.sender.send(event).is_err() {
            debug!("Dropped market event: no subscribers");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let publisher = BroadcastPublisher::new(4);
        let mut rx = publisher.subscribe();
        let order_id = Uuid::new_v4();

        publisher.publish(MarketEvent::OrderDelivered { order_id, timestamp: 0 });

        assert_eq!(rx.recv().await.unwrap(), MarketEvent::OrderDelivered { order_id, timestamp: 0 });
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let publisher = BroadcastPublisher::new(4);
        publisher.publish(MarketEvent::OrderDelivered { order_id: Uuid::new_v4(), timestamp: 0 });
    }
}
