use std::sync::Arc;
use uuid::Uuid;

use revive_core::repository::{BundleRepository, OrderRepository, PaymentRepository, UserRepository, WarehouseRepository};
use revive_core::{CoreError, CoreResult};
use revive_shared::models::{
    AdminMetrics, Bundle, BundleStatus, DashboardMetrics, Order, Payment, PaymentType, PerformanceMetrics,
    ResellerMetrics, User, WarehouseStatus,
};

/// Read-only aggregates for dashboards. No state transitions happen here.
pub struct ReportService {
    bundles: Arc<dyn BundleRepository>,
    orders: Arc<dyn OrderRepository>,
    payments: Arc<dyn PaymentRepository>,
    users: Arc<dyn UserRepository>,
    warehouse: Arc<dyn WarehouseRepository>,
}

impl ReportService {
    pub fn new(
        bundles: Arc<dyn BundleRepository>,
        orders: Arc<dyn OrderRepository>,
        payments: Arc<dyn PaymentRepository>,
        users: Arc<dyn UserRepository>,
        warehouse: Arc<dyn WarehouseRepository>,
    ) -> Self {
        Self { bundles, orders, payments, users, warehouse }
    }

    pub async fn get_dashboard_metrics(&self, supplier_id: Uuid) -> CoreResult<DashboardMetrics> {
        let supplier = self.user(supplier_id).await?;
        let bundles = self.bundles.list_by_supplier(supplier_id).await?;

        let total_bundles_listed = bundles.len();
        let (sold, mut active): (Vec<Bundle>, Vec<Bundle>) = bundles
            .into_iter()
            .filter(|b| b.status != BundleStatus::Deactivated)
            .partition(|b| b.status == BundleStatus::Purchased);
        active.sort_by_key(|b| std::cmp::Reverse(b.date_listed));

        Ok(DashboardMetrics {
            total_sales_cents: sold.iter().map(|b| b.price_cents).sum(),
            best_selling_cents: sold.iter().map(|b| b.price_cents).max().unwrap_or(0),
            performance: PerformanceMetrics {
                total_bundles_listed,
                active_count: active.len(),
                sold_count: sold.len(),
            },
            active_bundles: active,
            rating: supplier.trust.score,
        })
    }

    pub async fn get_reseller_metrics(&self, reseller_id: Uuid) -> CoreResult<ResellerMetrics> {
        let reseller = self.user(reseller_id).await?;
        let bought = self.bundles.list_purchased_by_reseller(reseller_id).await?;
        let orders = self.orders.list_by_reseller(reseller_id).await?;

        let total_items_sold = orders
            .iter()
            .filter(|o| o.seller_id == reseller_id && o.is_settled())
            .map(|o| o.product_ids.len())
            .sum();

        Ok(ResellerMetrics {
            total_bought_bundles: bought.len(),
            total_items_sold,
            rating: reseller.trust.score,
            best_selling_cents: bought.iter().map(|b| b.price_cents).max().unwrap_or(0),
            bought_bundles: bought,
        })
    }

    /// Whole-bundle sales by the supplier, newest first.
    pub async fn get_sold_bundle_history(&self, supplier_id: Uuid) -> CoreResult<Vec<Order>> {
        let orders = self.orders.list_by_supplier(supplier_id).await?;
        Ok(orders.into_iter().filter(Order::is_bundle_sale).collect())
    }

    pub async fn get_admin_dashboard_metrics(&self) -> CoreResult<AdminMetrics> {
        let totals = self.payments.platform_totals().await?;
        Ok(AdminMetrics {
            total_bundles: self.bundles.count_all().await?,
            total_users: self.users.count_active().await?,
            total_sales_cents: totals.total_sales_cents,
            revenue_from_fees_cents: totals.total_fees_cents,
            skipped_items: self.warehouse.count_by_status(WarehouseStatus::Skipped).await?,
        })
    }

    pub async fn list_payments(&self, user_id: Uuid, payment_type: Option<PaymentType>) -> CoreResult<Vec<Payment>> {
        match payment_type {
            Some(kind) => self.payments.list_by_type(user_id, kind).await,
            None => self.payments.list_by_user(user_id).await,
        }
    }

    pub async fn list_blacklisted_users(&self) -> CoreResult<Vec<User>> {
        self.users.list_blacklisted().await
    }

    async fn user(&self, user_id: Uuid) -> CoreResult<User> {
        self.users
            .get_user(user_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("user {}", user_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use revive_shared::models::{BundleDraft, OrderStatus, Role, SortingLevel, TrustState, WarehouseItem};
    use revive_store::MemoryStore;

    fn service(store: &MemoryStore) -> ReportService {
        let repo = Arc::new(store.clone());
        ReportService::new(repo.clone(), repo.clone(), repo.clone(), repo.clone(), repo)
    }

    fn bundle(supplier_id: Uuid, price_cents: i64, status: BundleStatus, age_minutes: i64) -> Bundle {
        let mut bundle = Bundle::new(
            supplier_id,
            BundleDraft {
                title: format!("Lot {}", price_cents),
                description: String::new(),
                sample_image: String::new(),
                grade: "A".to_string(),
                sorting_level: SortingLevel::Sorted,
                declared_rating: 4,
                price_cents,
                quantity: 10,
            },
        );
        bundle.status = status;
        bundle.date_listed = Utc::now() - Duration::minutes(age_minutes);
        bundle
    }

    #[tokio::test]
    async fn test_supplier_dashboard() {
        let store = MemoryStore::new();
        let supplier = User::new("Ruth", "ruth", "ruth@example.com", Role::Supplier);
        store.create_user(&supplier).await.unwrap();
        let rated = TrustState { score: 97.0, rated_count: 1, total_error: 3.0, is_blacklisted: false };
        store.update_trust(supplier.id, &TrustState::initial(), &rated).await.unwrap();

        let older = bundle(supplier.id, 5_000, BundleStatus::Available, 30);
        let newer = bundle(supplier.id, 6_000, BundleStatus::Available, 5);
        for b in [
            older.clone(),
            newer.clone(),
            bundle(supplier.id, 12_000, BundleStatus::Purchased, 60),
            bundle(supplier.id, 8_000, BundleStatus::Purchased, 90),
            bundle(supplier.id, 9_000, BundleStatus::Deactivated, 10),
        ] {
            store.create_bundle(&b).await.unwrap();
        }

        let metrics = service(&store).get_dashboard_metrics(supplier.id).await.unwrap();

        assert_eq!(metrics.total_sales_cents, 20_000);
        assert_eq!(metrics.best_selling_cents, 12_000);
        assert_eq!(metrics.rating, 97.0);
        assert_eq!(
            metrics.performance,
            PerformanceMetrics { total_bundles_listed: 5, active_count: 2, sold_count: 2 }
        );
        let active: Vec<Uuid> = metrics.active_bundles.iter().map(|b| b.id).collect();
        assert_eq!(active, vec![newer.id, older.id]);
    }

    #[tokio::test]
    async fn test_reseller_metrics_count_delivered_items() {
        let store = MemoryStore::new();
        let reseller = User::new("Dawit", "dawit", "dawit@example.com", Role::Reseller);
        store.create_user(&reseller).await.unwrap();

        let mut bought = bundle(Uuid::new_v4(), 15_000, BundleStatus::Purchased, 10);
        bought.reseller_id = Some(reseller.id);
        store.create_bundle(&bought).await.unwrap();

        let consumer = Uuid::new_v4();
        let mut delivered = Order::for_listings(consumer, reseller.id, vec![Uuid::new_v4(), Uuid::new_v4()], 3_000, 60);
        delivered.update_status(OrderStatus::Delivered);
        let shipped = Order::for_listings(consumer, reseller.id, vec![Uuid::new_v4()], 1_000, 20);
        store.create_order(&delivered).await.unwrap();
        store.create_order(&shipped).await.unwrap();

        let metrics = service(&store).get_reseller_metrics(reseller.id).await.unwrap();

        assert_eq!(metrics.total_bought_bundles, 1);
        assert_eq!(metrics.total_items_sold, 2);
        assert_eq!(metrics.best_selling_cents, 15_000);
        assert_eq!(metrics.rating, 100.0);
    }

    #[tokio::test]
    async fn test_sold_history_excludes_item_orders() {
        let store = MemoryStore::new();
        let supplier_id = Uuid::new_v4();
        let sold = bundle(supplier_id, 10_000, BundleStatus::Purchased, 5);
        store.create_order(&Order::for_bundle(&sold, Uuid::new_v4(), 200)).await.unwrap();
        store
            .create_order(&Order::for_listings(Uuid::new_v4(), supplier_id, vec![Uuid::new_v4()], 500, 10))
            .await
            .unwrap();

        let history = service(&store).get_sold_bundle_history(supplier_id).await.unwrap();

        assert_eq!(history.len(), 1);
        assert_eq!(history[0].bundle_id, Some(sold.id));
    }

    #[tokio::test]
    async fn test_admin_metrics() {
        let store = MemoryStore::new();
        let supplier = User::new("Eden", "eden", "eden@example.com", Role::Supplier);
        store.create_user(&supplier).await.unwrap();
        store.create_bundle(&bundle(supplier.id, 10_000, BundleStatus::Available, 1)).await.unwrap();
        store
            .record_payment(&Payment::paid(
                Uuid::new_v4(),
                supplier.id,
                Uuid::new_v4(),
                PaymentType::B2b,
                10_000,
                200,
                "ch_test".to_string(),
            ))
            .await
            .unwrap();
        let mut skipped = WarehouseItem::pending(Uuid::new_v4(), Uuid::new_v4());
        skipped.status = WarehouseStatus::Skipped;
        store.add_item(&skipped).await.unwrap();

        let metrics = service(&store).get_admin_dashboard_metrics().await.unwrap();

        assert_eq!(
            metrics,
            AdminMetrics {
                total_bundles: 1,
                total_users: 1,
                total_sales_cents: 10_000,
                revenue_from_fees_cents: 200,
                skipped_items: 1,
            }
        );
    }

    #[tokio::test]
    async fn test_payments_filter_by_type_and_blacklist() {
        let store = MemoryStore::new();
        let reseller = User::new("Kidus", "kidus", "kidus@example.com", Role::Reseller);
        let supplier = User::new("Tsion", "tsion", "tsion@example.com", Role::Supplier);
        store.create_user(&reseller).await.unwrap();
        store.create_user(&supplier).await.unwrap();
        let flagged = TrustState { score: 20.0, rated_count: 1, total_error: 80.0, is_blacklisted: true };
        store.update_trust(supplier.id, &TrustState::initial(), &flagged).await.unwrap();

        let bought = Payment::paid(reseller.id, supplier.id, Uuid::new_v4(), PaymentType::B2b, 10_000, 200, "ch_a".to_string());
        let sold = Payment::paid(Uuid::new_v4(), reseller.id, Uuid::new_v4(), PaymentType::B2c, 2_000, 40, "ch_b".to_string());
        store.record_payment(&bought).await.unwrap();
        store.record_payment(&sold).await.unwrap();

        let reports = service(&store);
        assert_eq!(reports.list_payments(reseller.id, None).await.unwrap().len(), 2);
        let b2c = reports.list_payments(reseller.id, Some(PaymentType::B2c)).await.unwrap();
        assert_eq!(b2c.len(), 1);
        assert_eq!(b2c[0].charge_id, "ch_b");

        let blacklisted = reports.list_blacklisted_users().await.unwrap();
        assert_eq!(blacklisted.len(), 1);
        assert_eq!(blacklisted[0].id, supplier.id);
    }
}
