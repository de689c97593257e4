use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use revive_shared::models::{
    Bundle, BundlePatch, BundleStatus, CartItem, CheckoutLine, Listing, Order, OrderStatus,
    Payment, PaymentType, RatingOutboxEntry, TrustState, User, WarehouseItem, WarehouseStatus,
};

use crate::CoreResult;

/// Repository trait for bundle data access
#[async_trait]
pub trait BundleRepository: Send + Sync {
    async fn get_bundle(&self, id: Uuid) -> CoreResult<Option<Bundle>>;

    async fn list_by_supplier(&self, supplier_id: Uuid) -> CoreResult<Vec<Bundle>>;

    async fn list_available(&self) -> CoreResult<Vec<Bundle>>;

    async fn list_purchased_by_reseller(&self, reseller_id: Uuid) -> CoreResult<Vec<Bundle>>;

    async fn create_bundle(&self, bundle: &Bundle) -> CoreResult<()>;

    /// Moves `id` from `expected` to `status`. Returns `false` when the
    /// bundle is missing or no longer in `expected`.
    async fn update_status(
        &self,
        id: Uuid,
        expected: BundleStatus,
        status: BundleStatus,
    ) -> CoreResult<bool>;

    /// Applies `patch` only while the bundle is still available.
    async fn update_fields(&self, id: Uuid, patch: &BundlePatch) -> CoreResult<bool>;

    /// Decrements `remaining_item_count` only if it is above zero. Returns
    /// the new count, or `None` when the guard did not match.
    async fn decrement_remaining(&self, id: Uuid) -> CoreResult<Option<i32>>;

    async fn count_all(&self) -> CoreResult<i64>;
}

/// Repository trait for order data access
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn create_order(&self, order: &Order) -> CoreResult<()>;

    async fn get_order(&self, id: Uuid) -> CoreResult<Option<Order>>;

    /// Orders the user bought.
    async fn list_by_consumer(&self, consumer_id: Uuid) -> CoreResult<Vec<Order>>;

    /// Orders the user sold.
    async fn list_by_supplier(&self, supplier_id: Uuid) -> CoreResult<Vec<Order>>;

    /// Orders the reseller is on either side of.
    async fn list_by_reseller(&self, reseller_id: Uuid) -> CoreResult<Vec<Order>>;

    async fn update_status(
        &self,
        id: Uuid,
        expected: OrderStatus,
        status: OrderStatus,
    ) -> CoreResult<bool>;

    async fn delete_order(&self, id: Uuid) -> CoreResult<bool>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlatformTotals {
    pub total_sales_cents: i64,
    pub total_fees_cents: i64,
}

/// Repository trait for settled payments. Payments are append-only.
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn record_payment(&self, payment: &Payment) -> CoreResult<()>;

    /// Payments where the user paid or was paid.
    async fn list_by_user(&self, user_id: Uuid) -> CoreResult<Vec<Payment>>;

    async fn list_by_type(&self, user_id: Uuid, payment_type: PaymentType) -> CoreResult<Vec<Payment>>;

    /// Sum of amounts and fees over all payments in "Paid" status.
    async fn platform_totals(&self) -> CoreResult<PlatformTotals>;
}

/// Repository trait for warehouse custody records
#[async_trait]
pub trait WarehouseRepository: Send + Sync {
    async fn add_item(&self, item: &WarehouseItem) -> CoreResult<()>;

    async fn get_item(&self, id: Uuid) -> CoreResult<Option<WarehouseItem>>;

    async fn list_by_reseller(&self, reseller_id: Uuid) -> CoreResult<Vec<WarehouseItem>>;

    async fn list_by_bundle(&self, bundle_id: Uuid) -> CoreResult<Vec<WarehouseItem>>;

    /// Pending items created before `cutoff`.
    async fn list_pending_before(&self, cutoff: DateTime<Utc>) -> CoreResult<Vec<WarehouseItem>>;

    /// Moves `id` from `expected` to `status`; `false` if missing or moved on.
    async fn update_status(
        &self,
        id: Uuid,
        expected: WarehouseStatus,
        status: WarehouseStatus,
    ) -> CoreResult<bool>;

    async fn delete_item(&self, id: Uuid) -> CoreResult<bool>;

    async fn has_reseller_received_bundle(&self, reseller_id: Uuid, bundle_id: Uuid) -> CoreResult<bool>;

    async fn count_by_status(&self, status: WarehouseStatus) -> CoreResult<i64>;
}

/// Repository trait for users and their trust fields
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(&self, user: &User) -> CoreResult<()>;

    async fn get_user(&self, id: Uuid) -> CoreResult<Option<User>>;

    /// Replaces the trust fields only if they still equal `expected`.
    /// Returns `false` when another rating got there first.
    async fn update_trust(&self, id: Uuid, expected: &TrustState, trust: &TrustState) -> CoreResult<bool>;

    async fn list_blacklisted(&self) -> CoreResult<Vec<User>>;

    async fn count_active(&self) -> CoreResult<i64>;
}

/// Repository trait for consumer carts
#[async_trait]
pub trait CartRepository: Send + Sync {
    /// Fails with `Conflict` if the user already has this listing in the cart.
    async fn create_item(&self, item: &CartItem) -> CoreResult<()>;

    async fn list_by_user(&self, user_id: Uuid) -> CoreResult<Vec<CartItem>>;

    async fn delete_item(&self, user_id: Uuid, listing_id: Uuid) -> CoreResult<bool>;
}

/// Product lookup used by unpacking and checkout validation
#[async_trait]
pub trait ListingRepository: Send + Sync {
    async fn create_listing(&self, listing: &Listing) -> CoreResult<()>;

    async fn get_listing(&self, id: Uuid) -> CoreResult<Option<Listing>>;

    async fn list_by_reseller(&self, reseller_id: Uuid) -> CoreResult<Vec<Listing>>;
}

/// Outcome of writing a queued rating into the supplier's trust fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingWrite {
    Applied,
    /// The trust fields no longer match the state the rating was folded into.
    StateMoved,
    /// The entry is no longer pending; another pass already applied it.
    AlreadyDelivered,
}

/// Durable queue of rating events awaiting the trust engine.
#[async_trait]
pub trait TrustOutboxRepository: Send + Sync {
    async fn enqueue(&self, entry: &RatingOutboxEntry) -> CoreResult<()>;

    /// Oldest pending entries first.
    async fn list_pending(&self, limit: usize) -> CoreResult<Vec<RatingOutboxEntry>>;

    /// In one transaction: mark `entry_id` delivered if it is still pending
    /// and swap the supplier's trust fields from `expected` to `trust`.
    /// Writes nothing unless both guards hold.
    async fn deliver_rating(
        &self,
        entry_id: Uuid,
        supplier_id: Uuid,
        expected: &TrustState,
        trust: &TrustState,
    ) -> CoreResult<RatingWrite>;

    /// Bumps the attempt counter; `dead_letter` parks the entry for good.
    /// Entries that already left pending are left alone.
    async fn record_failure(&self, id: Uuid, error: &str, dead_letter: bool) -> CoreResult<()>;
}

/// Writes of one bundle purchase, applied as a single unit.
#[derive(Debug, Clone)]
pub struct PurchaseCommit {
    pub order: Order,
    pub payment: Payment,
    pub warehouse_item: WarehouseItem,
}

#[async_trait]
pub trait PurchaseUnitOfWork: Send + Sync {
    /// In one transaction: create the order as processing, record the
    /// payment, mark the bundle purchased by the reseller only if it is still
    /// available, add the pending warehouse item, complete the order.
    ///
    /// Fails with `Conflict` and writes nothing when the bundle is no longer
    /// available. Returns the completed order.
    async fn commit_purchase(&self, commit: &PurchaseCommit) -> CoreResult<Order>;
}

#[async_trait]
pub trait UnpackUnitOfWork: Send + Sync {
    /// In one transaction: decrement the remaining item count of
    /// `listing.bundle_id` if it is above zero and insert the listing.
    ///
    /// Returns the new count, or `None` with nothing written when the
    /// bundle is missing or fully unpacked.
    async fn commit_unpack(&self, listing: &Listing) -> CoreResult<Option<i32>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartClearing {
    WholeCart,
    SingleListing(Uuid),
}

/// Writes of one cart checkout, applied as a single unit.
#[derive(Debug, Clone)]
pub struct CheckoutCommit {
    pub user_id: Uuid,
    pub lines: Vec<CheckoutLine>,
    pub payments: Vec<Payment>,
    pub orders: Vec<Order>,
    pub clearing: CartClearing,
}

#[async_trait]
pub trait CheckoutUnitOfWork: Send + Sync {
    /// In one transaction: mark every listing sold only if still available,
    /// record payments and orders, clear the cart entries.
    ///
    /// If any listing was sold in the meantime, fails with `CheckoutRejected`
    /// naming all such listings and writes nothing.
    async fn commit_checkout(&self, commit: &CheckoutCommit) -> CoreResult<()>;
}
