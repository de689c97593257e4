use revive_shared::models::MarketEvent;

/// Sink for committed domain events. Publishing never fails the caller: an
/// event with no subscribers is simply dropped.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: MarketEvent);
}
