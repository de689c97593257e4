use std::sync::Arc;
use std::time::Duration;
use chrono::Utc;
use uuid::Uuid;
use tracing::{debug, error, info};

use revive_core::events::EventPublisher;
use revive_core::repository::WarehouseRepository;
use revive_core::{CoreError, CoreResult};
use revive_shared::models::{MarketEvent, WarehouseItem, WarehouseStatus};

use crate::scheduler::DelayedTaskScheduler;

/// Tracks physical custody of purchased bundles and their simulated arrival.
pub struct WarehouseAllocator {
    warehouse: Arc<dyn WarehouseRepository>,
    events: Arc<dyn EventPublisher>,
    scheduler: DelayedTaskScheduler,
    listing_delay: Duration,
}

impl WarehouseAllocator {
    pub fn new(
        warehouse: Arc<dyn WarehouseRepository>,
        events: Arc<dyn EventPublisher>,
        scheduler: DelayedTaskScheduler,
        listing_delay: Duration,
    ) -> Self {
        Self { warehouse, events, scheduler, listing_delay }
    }

    /// Records a pending custody entry outside of a purchase transaction.
    pub async fn allocate(&self, bundle_id: Uuid, reseller_id: Uuid) -> CoreResult<WarehouseItem> {
        let item = WarehouseItem::pending(bundle_id, reseller_id);
        self.warehouse.add_item(&item).await?;
        self.schedule_listing(item.id);
        Ok(item)
    }

    pub async fn has_reseller_received_bundle(&self, reseller_id: Uuid, bundle_id: Uuid) -> CoreResult<bool> {
        self.warehouse.has_reseller_received_bundle(reseller_id, bundle_id).await
    }

    /// Queues the pending → listed transition after the shipping delay.
    pub fn schedule_listing(&self, item_id: Uuid) {
        let warehouse = self.warehouse.clone();
        let events = self.events.clone();
        self.scheduler.schedule(item_id, self.listing_delay, async move {
            if let Err(e) = mark_listed(warehouse.as_ref(), events.as_ref(), item_id).await {
                error!("Failed to mark warehouse item {} as listed: {}", item_id, e);
            }
        });
        debug!("Warehouse item {} will be listed in {:?}", item_id, self.listing_delay);
    }

    pub fn pending_transitions(&self) -> usize {
        self.scheduler.pending_count()
    }

    pub async fn list_by_reseller(&self, reseller_id: Uuid) -> CoreResult<Vec<WarehouseItem>> {
        self.warehouse.list_by_reseller(reseller_id).await
    }

    pub async fn list_by_bundle(&self, reseller_id: Uuid, bundle_id: Uuid) -> CoreResult<Vec<WarehouseItem>> {
        let items = self.warehouse.list_by_bundle(bundle_id).await?;
        Ok(items.into_iter().filter(|item| item.reseller_id == reseller_id).collect())
    }

    pub async fn mark_skipped(&self, reseller_id: Uuid, item_id: Uuid) -> CoreResult<WarehouseItem> {
        self.decide(reseller_id, item_id, WarehouseStatus::Skipped).await
    }

    pub async fn mark_damaged(&self, reseller_id: Uuid, item_id: Uuid) -> CoreResult<WarehouseItem> {
        self.decide(reseller_id, item_id, WarehouseStatus::Damaged).await
    }

    /// Removes the record and any transition still waiting on it.
    pub async fn delete(&self, reseller_id: Uuid, item_id: Uuid) -> CoreResult<()> {
        self.owned_item(reseller_id, item_id).await?;
        self.scheduler.cancel(item_id);
        if !self.warehouse.delete_item(item_id).await? {
            return Err(CoreError::NotFound(format!("warehouse item {}", item_id)));
        }
        info!("Warehouse item {} deleted by reseller {}", item_id, reseller_id);
        Ok(())
    }

    pub async fn count_by_status(&self, status: WarehouseStatus) -> CoreResult<i64> {
        self.warehouse.count_by_status(status).await
    }

    /// Lists every item whose arrival is overdue, e.g. because the process
    /// restarted before its scheduled transition fired.
    pub async fn reconcile(&self) -> CoreResult<usize> {
        let delay = chrono::Duration::from_std(self.listing_delay)
            .map_err(|e| CoreError::Internal(format!("listing delay out of range: {}", e)))?;
        let overdue = self.warehouse.list_pending_before(Utc::now() - delay).await?;

        let mut repaired = 0;
        for item in overdue {
            if mark_listed(self.warehouse.as_ref(), self.events.as_ref(), item.id).await? {
                self.scheduler.cancel(item.id);
                repaired += 1;
            }
        }
        if repaired > 0 {
            info!("Reconciled {} overdue warehouse item(s)", repaired);
        }
        Ok(repaired)
    }

    async fn decide(&self, reseller_id: Uuid, item_id: Uuid, status: WarehouseStatus) -> CoreResult<WarehouseItem> {
        let mut item = self.owned_item(reseller_id, item_id).await?;
        if !self.warehouse.update_status(item_id, WarehouseStatus::Listed, status).await? {
            return Err(CoreError::Conflict(format!(
                "warehouse item is {}, only listed items can be marked {}",
                item.status, status
            )));
        }
        item.status = status;
        Ok(item)
    }

    async fn owned_item(&self, reseller_id: Uuid, item_id: Uuid) -> CoreResult<WarehouseItem> {
        let item = self
            .warehouse
            .get_item(item_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("warehouse item {}", item_id)))?;
        if item.reseller_id != reseller_id {
            return Err(CoreError::Unauthorized("warehouse item belongs to another reseller".to_string()));
        }
        Ok(item)
    }
}

/// Conditional pending → listed. A deleted or already-moved item is a no-op.
async fn mark_listed(warehouse: &dyn WarehouseRepository, events: &dyn EventPublisher, item_id: Uuid) -> CoreResult<bool> {
    if !warehouse.update_status(item_id, WarehouseStatus::Pending, WarehouseStatus::Listed).await? {
        debug!("Warehouse item {} no longer pending, skipping listing", item_id);
        return Ok(false);
    }
    if let Some(item) = warehouse.get_item(item_id).await? {
        info!("Warehouse item {} arrived for reseller {}", item.id, item.reseller_id);
        events.publish(MarketEvent::WarehouseItemListed {
            item_id: item.id,
            bundle_id: item.bundle_id,
            reseller_id: item.reseller_id,
            timestamp: Utc::now().timestamp(),
        });
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use revive_store::{BroadcastPublisher, MemoryStore};

    async fn flush() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    fn allocator(store: &MemoryStore, delay_secs: u64) -> WarehouseAllocator {
        WarehouseAllocator::new(
            Arc::new(store.clone()),
            Arc::new(BroadcastPublisher::new(16)),
            DelayedTaskScheduler::new(),
            Duration::from_secs(delay_secs),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_item_is_listed_after_delay() {
        let store = MemoryStore::new();
        let allocator = allocator(&store, 180);
        let (bundle_id, reseller_id) = (Uuid::new_v4(), Uuid::new_v4());

        let item = allocator.allocate(bundle_id, reseller_id).await.unwrap();
        assert_eq!(item.status, WarehouseStatus::Pending);
        assert!(!allocator.has_reseller_received_bundle(reseller_id, bundle_id).await.unwrap());

        tokio::time::advance(Duration::from_secs(181)).await;
        flush().await;

        assert!(allocator.has_reseller_received_bundle(reseller_id, bundle_id).await.unwrap());
        assert_eq!(allocator.count_by_status(WarehouseStatus::Listed).await.unwrap(), 1);
        assert_eq!(allocator.pending_transitions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deleted_item_is_never_listed() {
        let store = MemoryStore::new();
        let allocator = allocator(&store, 180);
        let reseller_id = Uuid::new_v4();

        let item = allocator.allocate(Uuid::new_v4(), reseller_id).await.unwrap();
        allocator.delete(reseller_id, item.id).await.unwrap();

        tokio::time::advance(Duration::from_secs(200)).await;
        flush().await;

        assert!(store.warehouse_items().await.is_empty());
        assert_eq!(allocator.pending_transitions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_listing_is_idempotent() {
        let store = MemoryStore::new();
        let allocator = allocator(&store, 60);
        let reseller_id = Uuid::new_v4();
        let item = allocator.allocate(Uuid::new_v4(), reseller_id).await.unwrap();

        // Arrived early and already flagged by the reseller.
        store.update_status(item.id, WarehouseStatus::Pending, WarehouseStatus::Listed).await.unwrap();
        allocator.mark_skipped(reseller_id, item.id).await.unwrap();

        tokio::time::advance(Duration::from_secs(61)).await;
        flush().await;

        assert_eq!(allocator.count_by_status(WarehouseStatus::Skipped).await.unwrap(), 1);
        assert_eq!(allocator.count_by_status(WarehouseStatus::Listed).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_decisions_need_an_arrived_item_owned_by_caller() {
        let store = MemoryStore::new();
        let allocator = allocator(&store, 180);
        let reseller_id = Uuid::new_v4();
        let item = allocator.allocate(Uuid::new_v4(), reseller_id).await.unwrap();

        assert!(allocator.mark_damaged(reseller_id, item.id).await.unwrap_err().is_conflict());
        assert!(matches!(
            allocator.mark_damaged(Uuid::new_v4(), item.id).await.unwrap_err(),
            CoreError::Unauthorized(_)
        ));
        assert!(allocator.mark_damaged(reseller_id, Uuid::new_v4()).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_reconcile_lists_overdue_items() {
        let store = MemoryStore::new();
        let allocator = allocator(&store, 180);
        let (bundle_id, reseller_id) = (Uuid::new_v4(), Uuid::new_v4());

        let mut stale = WarehouseItem::pending(bundle_id, reseller_id);
        stale.created_at = Utc::now() - chrono::Duration::minutes(10);
        store.add_item(&stale).await.unwrap();
        let fresh = WarehouseItem::pending(Uuid::new_v4(), reseller_id);
        store.add_item(&fresh).await.unwrap();

        assert_eq!(allocator.reconcile().await.unwrap(), 1);
        assert!(allocator.has_reseller_received_bundle(reseller_id, bundle_id).await.unwrap());
        assert_eq!(allocator.count_by_status(WarehouseStatus::Pending).await.unwrap(), 1);
        assert_eq!(allocator.reconcile().await.unwrap(), 0);
    }
}
