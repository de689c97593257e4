use std::sync::Arc;
use std::time::Duration;

use revive_catalog::{BundleLifecycleManager, TrustOutboxRelay, TrustScoreEngine, UnpackService};
use revive_core::events::EventPublisher;
use revive_core::payment::PaymentGateway;
use revive_core::repository::{
    BundleRepository, CartRepository, CheckoutUnitOfWork, ListingRepository, OrderRepository, PaymentRepository,
    PurchaseUnitOfWork, TrustOutboxRepository, UnpackUnitOfWork, UserRepository, WarehouseRepository,
};
use revive_order::{
    CartCheckout, DelayedTaskScheduler, OrderOrchestrator, PaymentSettlement, ReportService, SimulatedGateway,
    WarehouseAllocator,
};
use revive_store::app_config::BusinessRules;
use revive_store::{
    DbClient, MemoryStore, StoreBundleRepository, StoreCartRepository, StoreOrderRepository, StoreUserRepository,
    StoreWarehouseRepository,
};

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
}

/// Every store seam the services need.
#[derive(Clone)]
pub struct Repositories {
    pub bundles: Arc<dyn BundleRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub payments: Arc<dyn PaymentRepository>,
    pub warehouse: Arc<dyn WarehouseRepository>,
    pub users: Arc<dyn UserRepository>,
    pub carts: Arc<dyn CartRepository>,
    pub listings: Arc<dyn ListingRepository>,
    pub outbox: Arc<dyn TrustOutboxRepository>,
    pub purchases: Arc<dyn PurchaseUnitOfWork>,
    pub checkouts: Arc<dyn CheckoutUnitOfWork>,
    pub unpacks: Arc<dyn UnpackUnitOfWork>,
}

impl Repositories {
    pub fn postgres(db: &DbClient) -> Self {
        let orders = Arc::new(StoreOrderRepository::new(db.pool.clone()));
        let users = Arc::new(StoreUserRepository::new(db.pool.clone()));
        let carts = Arc::new(StoreCartRepository::new(db.pool.clone()));
        Self {
            bundles: Arc::new(StoreBundleRepository::new(db.pool.clone())),
            orders: orders.clone(),
            payments: orders.clone(),
            warehouse: Arc::new(StoreWarehouseRepository::new(db.pool.clone())),
            users: users.clone(),
            carts: carts.clone(),
            listings: carts.clone(),
            outbox: users,
            purchases: orders,
            checkouts: carts.clone(),
            unpacks: carts,
        }
    }

    pub fn in_memory(store: &MemoryStore) -> Self {
        let store = Arc::new(store.clone());
        Self {
            bundles: store.clone(),
            orders: store.clone(),
            payments: store.clone(),
            warehouse: store.clone(),
            users: store.clone(),
            carts: store.clone(),
            listings: store.clone(),
            outbox: store.clone(),
            purchases: store.clone(),
            checkouts: store.clone(),
            unpacks: store,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub lifecycle: Arc<BundleLifecycleManager>,
    pub trust: Arc<TrustScoreEngine>,
    pub unpack: Arc<UnpackService>,
    pub orchestrator: Arc<OrderOrchestrator>,
    pub warehouse: Arc<WarehouseAllocator>,
    pub checkout: Arc<CartCheckout>,
    pub reports: Arc<ReportService>,
    pub outbox_relay: Arc<TrustOutboxRelay>,
    pub auth: AuthConfig,
}

impl AppState {
    pub fn new(
        repos: Repositories,
        events: Arc<dyn EventPublisher>,
        rules: &BusinessRules,
        auth: AuthConfig,
    ) -> Self {
        let gateway: Arc<dyn PaymentGateway> =
            Arc::new(SimulatedGateway::new(Duration::from_millis(rules.payment_latency_ms)));
        let settlement = Arc::new(PaymentSettlement::new(gateway));
        let scheduler = DelayedTaskScheduler::new();

        let lifecycle = Arc::new(BundleLifecycleManager::new(repos.bundles.clone(), repos.users.clone()));
        let trust = Arc::new(TrustScoreEngine::new(repos.users.clone(), events.clone()));
        let unpack = Arc::new(UnpackService::new(
            repos.bundles.clone(),
            repos.warehouse.clone(),
            repos.outbox.clone(),
            repos.unpacks.clone(),
        ));
        let warehouse = Arc::new(WarehouseAllocator::new(
            repos.warehouse.clone(),
            events.clone(),
            scheduler.clone(),
            Duration::from_secs(rules.warehouse_listing_delay_seconds),
        ));
        let orchestrator = Arc::new(OrderOrchestrator::new(
            repos.bundles.clone(),
            repos.orders.clone(),
            repos.purchases.clone(),
            settlement.clone(),
            warehouse.clone(),
            events.clone(),
        ));
        let checkout = Arc::new(CartCheckout::new(
            repos.carts.clone(),
            repos.listings.clone(),
            repos.checkouts.clone(),
            repos.orders.clone(),
            settlement,
            events,
            scheduler,
            Duration::from_secs(rules.delivery_delay_seconds),
        ));
        let reports = Arc::new(ReportService::new(
            repos.bundles,
            repos.orders,
            repos.payments,
            repos.users,
            repos.warehouse,
        ));
        let outbox_relay = Arc::new(TrustOutboxRelay::new(repos.outbox, trust.clone(), rules.trust_outbox_max_attempts));

        Self { lifecycle, trust, unpack, orchestrator, warehouse, checkout, reports, outbox_relay, auth }
    }
}
