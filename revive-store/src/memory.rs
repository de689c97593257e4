use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use revive_core::repository::{
    BundleRepository, CartClearing, CartRepository, CheckoutCommit, CheckoutUnitOfWork,
    ListingRepository, OrderRepository, PaymentRepository, PlatformTotals, PurchaseCommit,
    PurchaseUnitOfWork, RatingWrite, TrustOutboxRepository, UnpackUnitOfWork, UserRepository,
    WarehouseRepository,
};
use revive_core::{CoreError, CoreResult};
use revive_shared::models::{
    Bundle, BundlePatch, BundleStatus, CartItem, Listing, ListingStatus, Order, OrderStatus,
    OutboxStatus, Payment, PaymentStatus, PaymentType, RatingOutboxEntry, TrustState,
    UnavailableItem, User, WarehouseItem, WarehouseStatus,
};

#[derive(Default)]
struct Tables {
    bundles: HashMap<Uuid, Bundle>,
    orders: HashMap<Uuid, Order>,
    payments: Vec<Payment>,
    warehouse: HashMap<Uuid, WarehouseItem>,
    users: HashMap<Uuid, User>,
    cart: Vec<CartItem>,
    listings: HashMap<Uuid, Listing>,
    outbox: Vec<RatingOutboxEntry>,
}

/// In-memory implementation of every store. One lock guards all tables, so
/// the unit-of-work commits are atomic with respect to every other call.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
    trust_write_failures: Arc<AtomicUsize>,
    listing_write_failures: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` trust writes fail with a persistence error.
    pub fn inject_trust_write_failures(&self, count: usize) {
        self.trust_write_failures.store(count, Ordering::SeqCst);
    }

    /// Makes the next `count` listing inserts fail with a persistence error.
    pub fn inject_listing_write_failures(&self, count: usize) {
        self.listing_write_failures.store(count, Ordering::SeqCst);
    }

    pub async fn payments(&self) -> Vec<Payment> {
        self.tables.read().await.payments.clone()
    }

    pub async fn outbox_entries(&self) -> Vec<RatingOutboxEntry> {
        self.tables.read().await.outbox.clone()
    }

    pub async fn warehouse_items(&self) -> Vec<WarehouseItem> {
        self.tables.read().await.warehouse.values().cloned().collect()
    }

    pub async fn orders(&self) -> Vec<Order> {
        self.tables.read().await.orders.values().cloned().collect()
    }

    /// Test helper: forces a listing into a status, bypassing checkout.
    pub async fn set_listing_status(&self, id: Uuid, status: ListingStatus) {
        if let Some(listing) = self.tables.write().await.listings.get_mut(&id) {
            listing.status = status;
        }
    }

    fn take_trust_failure(&self) -> bool {
        take_one(&self.trust_write_failures)
    }

    fn take_listing_failure(&self) -> bool {
        take_one(&self.listing_write_failures)
    }
}

fn take_one(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

fn newest_first<T, F>(mut rows: Vec<T>, key: F) -> Vec<T>
where
    F: Fn(&T) -> DateTime<Utc>,
{
    rows.sort_by_key(|row| std::cmp::Reverse(key(row)));
    rows
}

#[async_trait]
impl BundleRepository for MemoryStore {
    async fn get_bundle(&self, id: Uuid) -> CoreResult<Option<Bundle>> {
        Ok(self.tables.read().await.bundles.get(&id).cloned())
    }

    async fn list_by_supplier(&self, supplier_id: Uuid) -> CoreResult<Vec<Bundle>> {
        let tables = self.tables.read().await;
        let rows = tables.bundles.values().filter(|b| b.supplier_id == supplier_id).cloned().collect();
        Ok(newest_first(rows, |b: &Bundle| b.date_listed))
    }

    async fn list_available(&self) -> CoreResult<Vec<Bundle>> {
        let tables = self.tables.read().await;
        let rows = tables.bundles.values().filter(|b| b.is_available()).cloned().collect();
        Ok(newest_first(rows, |b: &Bundle| b.date_listed))
    }

    async fn list_purchased_by_reseller(&self, reseller_id: Uuid) -> CoreResult<Vec<Bundle>> {
        let tables = self.tables.read().await;
        let rows = tables
            .bundles
            .values()
            .filter(|b| b.status == BundleStatus::Purchased && b.reseller_id == Some(reseller_id))
            .cloned()
            .collect();
        Ok(newest_first(rows, |b: &Bundle| b.date_listed))
    }

    async fn create_bundle(&self, bundle: &Bundle) -> CoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.bundles.contains_key(&bundle.id) {
            return Err(CoreError::Conflict(format!("bundle {} already exists", bundle.id)));
        }
        tables.bundles.insert(bundle.id, bundle.clone());
        Ok(())
    }

    async fn update_status(&self, id: Uuid, expected: BundleStatus, status: BundleStatus) -> CoreResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.bundles.get_mut(&id) {
            Some(bundle) if bundle.status == expected => {
                bundle.status = status;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_fields(&self, id: Uuid, patch: &BundlePatch) -> CoreResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.bundles.get_mut(&id) {
            Some(bundle) if bundle.is_available() => {
                patch.apply(bundle);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn decrement_remaining(&self, id: Uuid) -> CoreResult<Option<i32>> {
        let mut tables = self.tables.write().await;
        match tables.bundles.get_mut(&id) {
            Some(bundle) if bundle.remaining_item_count > 0 => {
                bundle.remaining_item_count -= 1;
                Ok(Some(bundle.remaining_item_count))
            }
            _ => Ok(None),
        }
    }

    async fn count_all(&self) -> CoreResult<i64> {
        Ok(self.tables.read().await.bundles.len() as i64)
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn create_order(&self, order: &Order) -> CoreResult<()> {
        self.tables.write().await.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn get_order(&self, id: Uuid) -> CoreResult<Option<Order>> {
        Ok(self.tables.read().await.orders.get(&id).cloned())
    }

    async fn list_by_consumer(&self, consumer_id: Uuid) -> CoreResult<Vec<Order>> {
        let tables = self.tables.read().await;
        let rows = tables.orders.values().filter(|o| o.buyer_id == consumer_id).cloned().collect();
        Ok(newest_first(rows, |o: &Order| o.created_at))
    }

    async fn list_by_supplier(&self, supplier_id: Uuid) -> CoreResult<Vec<Order>> {
        let tables = self.tables.read().await;
        let rows = tables.orders.values().filter(|o| o.seller_id == supplier_id).cloned().collect();
        Ok(newest_first(rows, |o: &Order| o.created_at))
    }

    async fn list_by_reseller(&self, reseller_id: Uuid) -> CoreResult<Vec<Order>> {
        let tables = self.tables.read().await;
        let rows = tables
            .orders
            .values()
            .filter(|o| o.buyer_id == reseller_id || o.seller_id == reseller_id)
            .cloned()
            .collect();
        Ok(newest_first(rows, |o: &Order| o.created_at))
    }

    async fn update_status(&self, id: Uuid, expected: OrderStatus, status: OrderStatus) -> CoreResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.orders.get_mut(&id) {
            Some(order) if order.status == expected => {
                order.update_status(status);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_order(&self, id: Uuid) -> CoreResult<bool> {
        Ok(self.tables.write().await.orders.remove(&id).is_some())
    }
}

#[async_trait]
impl PaymentRepository for MemoryStore {
    async fn record_payment(&self, payment: &Payment) -> CoreResult<()> {
        self.tables.write().await.payments.push(payment.clone());
        Ok(())
    }

    async fn list_by_user(&self, user_id: Uuid) -> CoreResult<Vec<Payment>> {
        let tables = self.tables.read().await;
        let rows = tables
            .payments
            .iter()
            .filter(|p| p.payer_id == user_id || p.payee_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(rows, |p: &Payment| p.created_at))
    }

    async fn list_by_type(&self, user_id: Uuid, payment_type: PaymentType) -> CoreResult<Vec<Payment>> {
        let rows = PaymentRepository::list_by_user(self, user_id).await?;
        Ok(rows.into_iter().filter(|p| p.payment_type == payment_type).collect())
    }

    async fn platform_totals(&self) -> CoreResult<PlatformTotals> {
        let tables = self.tables.read().await;
        let totals = tables
            .payments
            .iter()
            .filter(|p| p.status == PaymentStatus::Paid)
            .fold(PlatformTotals::default(), |mut acc, p| {
                acc.total_sales_cents += p.amount_cents;
                acc.total_fees_cents += p.platform_fee_cents;
                acc
            });
        Ok(totals)
    }
}

#[async_trait]
impl WarehouseRepository for MemoryStore {
    async fn add_item(&self, item: &WarehouseItem) -> CoreResult<()> {
        self.tables.write().await.warehouse.insert(item.id, item.clone());
        Ok(())
    }

    async fn get_item(&self, id: Uuid) -> CoreResult<Option<WarehouseItem>> {
        Ok(self.tables.read().await.warehouse.get(&id).cloned())
    }

    async fn list_by_reseller(&self, reseller_id: Uuid) -> CoreResult<Vec<WarehouseItem>> {
        let tables = self.tables.read().await;
        let rows = tables.warehouse.values().filter(|w| w.reseller_id == reseller_id).cloned().collect();
        Ok(newest_first(rows, |w: &WarehouseItem| w.created_at))
    }

    async fn list_by_bundle(&self, bundle_id: Uuid) -> CoreResult<Vec<WarehouseItem>> {
        let tables = self.tables.read().await;
        let rows = tables.warehouse.values().filter(|w| w.bundle_id == bundle_id).cloned().collect();
        Ok(newest_first(rows, |w: &WarehouseItem| w.created_at))
    }

    async fn list_pending_before(&self, cutoff: DateTime<Utc>) -> CoreResult<Vec<WarehouseItem>> {
        let tables = self.tables.read().await;
        Ok(tables
            .warehouse
            .values()
            .filter(|w| w.status == WarehouseStatus::Pending && w.created_at < cutoff)
            .cloned()
            .collect())
    }

    async fn update_status(&self, id: Uuid, expected: WarehouseStatus, status: WarehouseStatus) -> CoreResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.warehouse.get_mut(&id) {
            Some(item) if item.status == expected => {
                item.status = status;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_item(&self, id: Uuid) -> CoreResult<bool> {
        Ok(self.tables.write().await.warehouse.remove(&id).is_some())
    }

    async fn has_reseller_received_bundle(&self, reseller_id: Uuid, bundle_id: Uuid) -> CoreResult<bool> {
        let tables = self.tables.read().await;
        Ok(tables
            .warehouse
            .values()
            .any(|w| w.reseller_id == reseller_id && w.bundle_id == bundle_id && w.has_arrived()))
    }

    async fn count_by_status(&self, status: WarehouseStatus) -> CoreResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables.warehouse.values().filter(|w| w.status == status).count() as i64)
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, user: &User) -> CoreResult<()> {
        self.tables.write().await.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> CoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn update_trust(&self, id: Uuid, expected: &TrustState, trust: &TrustState) -> CoreResult<bool> {
        if self.take_trust_failure() {
            return Err(CoreError::Persistence("injected trust write failure".to_string()));
        }
        let mut tables = self.tables.write().await;
        match tables.users.get_mut(&id) {
            Some(user) if user.trust == *expected => {
                user.trust = *trust;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_blacklisted(&self) -> CoreResult<Vec<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().filter(|u| u.trust.is_blacklisted).cloned().collect())
    }

    async fn count_active(&self) -> CoreResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().filter(|u| !u.is_deleted).count() as i64)
    }
}

#[async_trait]
impl CartRepository for MemoryStore {
    async fn create_item(&self, item: &CartItem) -> CoreResult<()> {
        let mut tables = self.tables.write().await;
        let duplicate = tables
            .cart
            .iter()
            .any(|c| c.user_id == item.user_id && c.listing_id == item.listing_id);
        if duplicate {
            return Err(CoreError::Conflict("item already in cart".to_string()));
        }
        tables.cart.push(item.clone());
        Ok(())
    }

    async fn list_by_user(&self, user_id: Uuid) -> CoreResult<Vec<CartItem>> {
        let tables = self.tables.read().await;
        Ok(tables.cart.iter().filter(|c| c.user_id == user_id).cloned().collect())
    }

    async fn delete_item(&self, user_id: Uuid, listing_id: Uuid) -> CoreResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.cart.len();
        tables.cart.retain(|c| !(c.user_id == user_id && c.listing_id == listing_id));
        Ok(tables.cart.len() != before)
    }
}

#[async_trait]
impl ListingRepository for MemoryStore {
    async fn create_listing(&self, listing: &Listing) -> CoreResult<()> {
        self.tables.write().await.listings.insert(listing.id, listing.clone());
        Ok(())
    }

    async fn get_listing(&self, id: Uuid) -> CoreResult<Option<Listing>> {
        Ok(self.tables.read().await.listings.get(&id).cloned())
    }

    async fn list_by_reseller(&self, reseller_id: Uuid) -> CoreResult<Vec<Listing>> {
        let tables = self.tables.read().await;
        let rows = tables.listings.values().filter(|l| l.reseller_id == reseller_id).cloned().collect();
        Ok(newest_first(rows, |l: &Listing| l.created_at))
    }
}

#[async_trait]
impl TrustOutboxRepository for MemoryStore {
    async fn enqueue(&self, entry: &RatingOutboxEntry) -> CoreResult<()> {
        self.tables.write().await.outbox.push(entry.clone());
        Ok(())
    }

    async fn list_pending(&self, limit: usize) -> CoreResult<Vec<RatingOutboxEntry>> {
        let tables = self.tables.read().await;
        Ok(tables
            .outbox
            .iter()
            .filter(|e| e.status == OutboxStatus::Pending)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn deliver_rating(
        &self,
        entry_id: Uuid,
        supplier_id: Uuid,
        expected: &TrustState,
        trust: &TrustState,
    ) -> CoreResult<RatingWrite> {
        if self.take_trust_failure() {
            return Err(CoreError::Persistence("injected trust write failure".to_string()));
        }
        let mut guard = self.tables.write().await;
        let tables = &mut *guard;

        let entry = match tables.outbox.iter_mut().find(|e| e.id == entry_id) {
            Some(entry) if entry.status == OutboxStatus::Pending => entry,
            _ => return Ok(RatingWrite::AlreadyDelivered),
        };
        let user = tables
            .users
            .get_mut(&supplier_id)
            .ok_or_else(|| CoreError::NotFound(format!("supplier {}", supplier_id)))?;
        if user.trust != *expected {
            return Ok(RatingWrite::StateMoved);
        }

        user.trust = *trust;
        entry.status = OutboxStatus::Delivered;
        Ok(RatingWrite::Applied)
    }

    async fn record_failure(&self, id: Uuid, error: &str, dead_letter: bool) -> CoreResult<()> {
        let mut tables = self.tables.write().await;
        let entry = tables
            .outbox
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| CoreError::NotFound(format!("outbox entry {}", id)))?;
        if entry.status != OutboxStatus::Pending {
            return Ok(());
        }
        entry.attempts += 1;
        entry.last_error = Some(error.to_string());
        if dead_letter {
            entry.status = OutboxStatus::DeadLetter;
        }
        Ok(())
    }
}

#[async_trait]
impl PurchaseUnitOfWork for MemoryStore {
    async fn commit_purchase(&self, commit: &PurchaseCommit) -> CoreResult<Order> {
        let mut tables = self.tables.write().await;
        let bundle_id = commit.warehouse_item.bundle_id;
        let reseller_id = commit.warehouse_item.reseller_id;

        // Check the guard before touching anything so a lost race writes nothing.
        let bundle = tables
            .bundles
            .get_mut(&bundle_id)
            .ok_or_else(|| CoreError::NotFound(format!("bundle {}", bundle_id)))?;
        if !bundle.is_available() {
            return Err(CoreError::Conflict("bundle not available".to_string()));
        }
        bundle.status = BundleStatus::Purchased;
        bundle.reseller_id = Some(reseller_id);

        let mut order = commit.order.clone();
        order.update_status(OrderStatus::Completed);
        tables.orders.insert(order.id, order.clone());
        tables.payments.push(commit.payment.clone());
        tables.warehouse.insert(commit.warehouse_item.id, commit.warehouse_item.clone());

        Ok(order)
    }
}

#[async_trait]
impl UnpackUnitOfWork for MemoryStore {
    async fn commit_unpack(&self, listing: &Listing) -> CoreResult<Option<i32>> {
        let mut tables = self.tables.write().await;
        let remaining = match tables.bundles.get(&listing.bundle_id) {
            Some(bundle) if bundle.remaining_item_count > 0 => bundle.remaining_item_count - 1,
            _ => return Ok(None),
        };
        if self.take_listing_failure() {
            return Err(CoreError::Persistence("injected listing write failure".to_string()));
        }

        if let Some(bundle) = tables.bundles.get_mut(&listing.bundle_id) {
            bundle.remaining_item_count = remaining;
        }
        tables.listings.insert(listing.id, listing.clone());
        Ok(Some(remaining))
    }
}

#[async_trait]
impl CheckoutUnitOfWork for MemoryStore {
    async fn commit_checkout(&self, commit: &CheckoutCommit) -> CoreResult<()> {
        let mut tables = self.tables.write().await;

        let unavailable: Vec<UnavailableItem> = commit
            .lines
            .iter()
            .filter(|line| {
                !tables
                    .listings
                    .get(&line.listing_id)
                    .map(Listing::is_available)
                    .unwrap_or(false)
            })
            .map(|line| UnavailableItem {
                listing_id: line.listing_id,
                title: line.title.clone(),
                reason: "sold before checkout completed".to_string(),
            })
            .collect();
        if !unavailable.is_empty() {
            return Err(CoreError::CheckoutRejected { unavailable });
        }

        for line in &commit.lines {
            if let Some(listing) = tables.listings.get_mut(&line.listing_id) {
                listing.status = ListingStatus::Sold;
            }
        }
        tables.payments.extend(commit.payments.iter().cloned());
        for order in &commit.orders {
            tables.orders.insert(order.id, order.clone());
        }
        match commit.clearing {
            CartClearing::WholeCart => tables.cart.retain(|c| c.user_id != commit.user_id),
            CartClearing::SingleListing(listing_id) => tables
                .cart
                .retain(|c| !(c.user_id == commit.user_id && c.listing_id == listing_id)),
        }
        Ok(())
    }
}
