use std::sync::Arc;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use tracing::{info, warn};

use revive_core::events::EventPublisher;
use revive_core::repository::{BundleRepository, OrderRepository, PurchaseCommit, PurchaseUnitOfWork};
use revive_core::{CoreError, CoreResult};
use revive_shared::models::{MarketEvent, Order, Payment, PaymentType, Role, WarehouseItem};

use crate::settlement::PaymentSettlement;
use crate::warehouse::WarehouseAllocator;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseReceipt {
    pub order: Order,
    pub payment: Payment,
    pub warehouse_item: WarehouseItem,
}

/// Coordinates a reseller buying a whole bundle.
pub struct OrderOrchestrator {
    bundles: Arc<dyn BundleRepository>,
    orders: Arc<dyn OrderRepository>,
    purchases: Arc<dyn PurchaseUnitOfWork>,
    settlement: Arc<PaymentSettlement>,
    warehouse: Arc<WarehouseAllocator>,
    events: Arc<dyn EventPublisher>,
}

impl OrderOrchestrator {
    pub fn new(
        bundles: Arc<dyn BundleRepository>,
        orders: Arc<dyn OrderRepository>,
        purchases: Arc<dyn PurchaseUnitOfWork>,
        settlement: Arc<PaymentSettlement>,
        warehouse: Arc<WarehouseAllocator>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self { bundles, orders, purchases, settlement, warehouse, events }
    }

    /// Buys `bundle_id` for `reseller_id`.
    ///
    /// Checks run before any write. The order, payment, bundle claim and
    /// warehouse record then commit together; if another reseller claimed
    /// the bundle first this fails with `Conflict` and nothing is stored.
    pub async fn purchase_bundle(&self, bundle_id: Uuid, reseller_id: Uuid) -> CoreResult<PurchaseReceipt> {
        let bundle = self
            .bundles
            .get_bundle(bundle_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("bundle {}", bundle_id)))?;

        if !bundle.is_available() {
            return Err(CoreError::Conflict("bundle not available".to_string()));
        }
        if bundle.supplier_id == reseller_id {
            return Err(CoreError::Forbidden("cannot purchase own bundle".to_string()));
        }

        let payment = self
            .settlement
            .settle(reseller_id, bundle.supplier_id, bundle.id, PaymentType::B2b, bundle.price_cents)
            .await?;

        let commit = PurchaseCommit {
            order: Order::for_bundle(&bundle, reseller_id, payment.platform_fee_cents),
            payment,
            warehouse_item: WarehouseItem::pending(bundle.id, reseller_id),
        };

        let order = match self.purchases.commit_purchase(&commit).await {
            Ok(order) => order,
            Err(e) => {
                // The charge went through but nothing was recorded; it needs a refund.
                warn!(
                    "Purchase of bundle {} by {} not recorded after charge {}: {}",
                    bundle_id, reseller_id, commit.payment.charge_id, e
                );
                return Err(CoreError::after_charges(vec![commit.payment.charge_id.clone()], e));
            }
        };

        self.warehouse.schedule_listing(commit.warehouse_item.id);

        info!(
            "Bundle {} purchased by reseller {} for {} cents (order {})",
            bundle_id, reseller_id, order.total_price_cents, order.id
        );
        self.events.publish(MarketEvent::BundlePurchased {
            order_id: order.id,
            bundle_id,
            supplier_id: bundle.supplier_id,
            reseller_id,
            amount_cents: order.total_price_cents,
            timestamp: Utc::now().timestamp(),
        });

        Ok(PurchaseReceipt {
            order,
            payment: commit.payment,
            warehouse_item: commit.warehouse_item,
        })
    }

    /// Visible to the buyer and the seller only.
    pub async fn get_order_by_id(&self, requester_id: Uuid, order_id: Uuid) -> CoreResult<Order> {
        let order = self
            .orders
            .get_order(order_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("order {}", order_id)))?;
        if order.buyer_id != requester_id && order.seller_id != requester_id {
            return Err(CoreError::Unauthorized("order belongs to other users".to_string()));
        }
        Ok(order)
    }

    pub async fn list_orders(&self, user_id: Uuid, role: Role) -> CoreResult<Vec<Order>> {
        match role {
            Role::Consumer => self.orders.list_by_consumer(user_id).await,
            Role::Supplier => self.orders.list_by_supplier(user_id).await,
            Role::Reseller => self.orders.list_by_reseller(user_id).await,
            Role::Admin => Err(CoreError::Forbidden("admins have no orders".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use revive_core::repository::{PaymentRepository, UserRepository};
    use revive_shared::models::{Bundle, BundleDraft, BundleStatus, OrderStatus, SortingLevel, User, WarehouseStatus};
    use revive_store::{BroadcastPublisher, MemoryStore};

    use crate::scheduler::DelayedTaskScheduler;
    use crate::settlement::SimulatedGateway;

    struct Fixture {
        orchestrator: Arc<OrderOrchestrator>,
        store: MemoryStore,
        supplier_id: Uuid,
        bundle_id: Uuid,
    }

    async fn fixture(payment_latency: Duration) -> Fixture {
        let store = MemoryStore::new();
        let supplier = User::new("Meron", "meron", "meron@example.com", Role::Supplier);
        store.create_user(&supplier).await.unwrap();

        let bundle = Bundle::new(
            supplier.id,
            BundleDraft {
                title: "Vintage tees".to_string(),
                description: String::new(),
                sample_image: String::new(),
                grade: "B".to_string(),
                sorting_level: SortingLevel::SemiSorted,
                declared_rating: 3,
                price_cents: 10_000,
                quantity: 40,
            },
        );
        store.create_bundle(&bundle).await.unwrap();

        let events: Arc<dyn EventPublisher> = Arc::new(BroadcastPublisher::new(16));
        let warehouse = Arc::new(WarehouseAllocator::new(
            Arc::new(store.clone()),
            events.clone(),
            DelayedTaskScheduler::new(),
            Duration::from_secs(180),
        ));
        let settlement = Arc::new(PaymentSettlement::new(Arc::new(SimulatedGateway::new(payment_latency))));
        let orchestrator = Arc::new(OrderOrchestrator::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            settlement,
            warehouse,
            events,
        ));
        Fixture { orchestrator, store, supplier_id: supplier.id, bundle_id: bundle.id }
    }

    #[tokio::test]
    async fn test_purchase_completes_order_and_splits_payment() {
        let f = fixture(Duration::ZERO).await;
        let reseller_id = Uuid::new_v4();

        let receipt = f.orchestrator.purchase_bundle(f.bundle_id, reseller_id).await.unwrap();

        assert_eq!(receipt.order.status, OrderStatus::Completed);
        assert_eq!(receipt.order.platform_fee_cents, 200);
        assert_eq!(receipt.payment.seller_earning_cents, 9_800);
        assert_eq!(receipt.payment.payment_type, PaymentType::B2b);
        assert_eq!(receipt.warehouse_item.status, WarehouseStatus::Pending);

        let bundle = f.store.get_bundle(f.bundle_id).await.unwrap().unwrap();
        assert_eq!(bundle.status, BundleStatus::Purchased);
        assert_eq!(bundle.reseller_id, Some(reseller_id));

        let stored = f.orchestrator.get_order_by_id(reseller_id, receipt.order.id).await.unwrap();
        assert_eq!(stored.status, OrderStatus::Completed);
    }

    #[tokio::test]
    async fn test_supplier_cannot_buy_own_bundle() {
        let f = fixture(Duration::ZERO).await;

        let err = f.orchestrator.purchase_bundle(f.bundle_id, f.supplier_id).await.unwrap_err();

        assert!(matches!(err, CoreError::Forbidden(_)));
        assert!(f.store.orders().await.is_empty());
        assert!(f.store.payments().await.is_empty());
        assert!(f.store.warehouse_items().await.is_empty());
        assert!(f.store.get_bundle(f.bundle_id).await.unwrap().unwrap().is_available());
    }

    #[tokio::test]
    async fn test_second_purchase_conflicts() {
        let f = fixture(Duration::ZERO).await;
        f.orchestrator.purchase_bundle(f.bundle_id, Uuid::new_v4()).await.unwrap();

        let err = f.orchestrator.purchase_bundle(f.bundle_id, Uuid::new_v4()).await.unwrap_err();

        assert!(matches!(err, CoreError::Conflict(ref msg) if msg == "bundle not available"));
        assert_eq!(f.store.payments().await.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_bundle_is_not_found() {
        let f = fixture(Duration::ZERO).await;
        let err = f.orchestrator.purchase_bundle(Uuid::new_v4(), Uuid::new_v4()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_purchases_have_one_winner() {
        // Latency keeps both requests past the availability check before either commits.
        let f = fixture(Duration::from_millis(50)).await;
        let (first, second) = (Uuid::new_v4(), Uuid::new_v4());

        let a = tokio::spawn({
            let orchestrator = f.orchestrator.clone();
            let bundle_id = f.bundle_id;
            async move { orchestrator.purchase_bundle(bundle_id, first).await }
        });
        let b = tokio::spawn({
            let orchestrator = f.orchestrator.clone();
            let bundle_id = f.bundle_id;
            async move { orchestrator.purchase_bundle(bundle_id, second).await }
        });
        let results = [a.await.unwrap(), b.await.unwrap()];

        let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        let losers: Vec<_> = results.iter().filter_map(|r| r.as_ref().err()).collect();
        assert_eq!(winners.len(), 1);
        assert_eq!(losers.len(), 1);
        assert!(losers[0].is_conflict());
        match losers[0] {
            CoreError::PartiallyApplied { charge_ids, .. } => assert_eq!(charge_ids.len(), 1),
            other => panic!("losing purchase should report its charge, got {:?}", other),
        }

        let bundle = f.store.get_bundle(f.bundle_id).await.unwrap().unwrap();
        assert_eq!(bundle.reseller_id, Some(winners[0].order.buyer_id));
        assert_eq!(f.store.orders().await.len(), 1);
        assert_eq!(f.store.list_by_user(winners[0].order.buyer_id).await.unwrap().len(), 1);
        assert_eq!(f.store.warehouse_items().await.len(), 1);
    }

    #[tokio::test]
    async fn test_order_hidden_from_outsiders() {
        let f = fixture(Duration::ZERO).await;
        let receipt = f.orchestrator.purchase_bundle(f.bundle_id, Uuid::new_v4()).await.unwrap();

        let err = f.orchestrator.get_order_by_id(Uuid::new_v4(), receipt.order.id).await.unwrap_err();
        assert!(matches!(err, CoreError::Unauthorized(_)));

        let sales = f.orchestrator.list_orders(f.supplier_id, Role::Supplier).await.unwrap();
        assert_eq!(sales.len(), 1);
    }
}
