use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use revive_catalog::TrustOutboxRelay;
use revive_order::WarehouseAllocator;
use revive_shared::models::MarketEvent;

/// Polls the trust outbox and hands queued ratings to the trust engine.
pub async fn start_trust_outbox_worker(relay: Arc<TrustOutboxRelay>, every: Duration) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!("Trust outbox worker started, polling every {:?}", every);

    loop {
        ticker.tick().await;
        // The relay logs its own non-empty passes.
        if let Err(e) = relay.drain_once().await {
            error!("Trust outbox pass failed: {}", e);
        }
    }
}

/// Repairs warehouse transitions lost to a restart.
pub async fn start_warehouse_reconciler(warehouse: Arc<WarehouseAllocator>, every: Duration) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!("Warehouse reconciler started, sweeping every {:?}", every);

    loop {
        ticker.tick().await;
        if let Err(e) = warehouse.reconcile().await {
            error!("Warehouse reconciliation failed: {}", e);
        }
    }
}

/// Logs committed market events.
pub async fn start_event_logger(mut events: broadcast::Receiver<MarketEvent>) {
    loop {
        match events.recv().await {
            Ok(MarketEvent::BundlePurchased { order_id, bundle_id, reseller_id, amount_cents, .. }) => {
                info!("Order {}: bundle {} sold to {} for {} cents", order_id, bundle_id, reseller_id, amount_cents);
            }
            Ok(MarketEvent::SupplierTrustUpdated { supplier_id, trust_score, is_blacklisted, .. }) => {
                info!(
                    "Supplier {} trust is now {:.2} (blacklisted: {})",
                    supplier_id, trust_score, is_blacklisted
                );
            }
            Ok(event) => debug!("Market event: {:?}", event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Event logger lagged, skipped {} event(s)", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
