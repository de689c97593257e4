use std::sync::Arc;
use std::time::Duration;
use chrono::Utc;
use uuid::Uuid;
use tracing::{error, info, warn};

use revive_core::events::EventPublisher;
use revive_core::repository::{
    CartClearing, CartRepository, CheckoutCommit, CheckoutUnitOfWork, ListingRepository, OrderRepository,
};
use revive_core::{CoreError, CoreResult};
use revive_shared::models::{
    CartItem, CheckoutLine, CheckoutReceipt, ListingStatus, MarketEvent, Order, OrderStatus, Payment,
    PaymentType, UnavailableItem,
};

use crate::scheduler::DelayedTaskScheduler;
use crate::settlement::{platform_fee, PaymentSettlement, Settlement};

/// Consumer cart and all-or-nothing checkout. Charges are taken before the
/// commit; a commit that fails afterwards surfaces as `PartiallyApplied`.
pub struct CartCheckout {
    carts: Arc<dyn CartRepository>,
    listings: Arc<dyn ListingRepository>,
    checkouts: Arc<dyn CheckoutUnitOfWork>,
    orders: Arc<dyn OrderRepository>,
    settlement: Arc<PaymentSettlement>,
    events: Arc<dyn EventPublisher>,
    scheduler: DelayedTaskScheduler,
    delivery_delay: Duration,
}

impl CartCheckout {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        carts: Arc<dyn CartRepository>,
        listings: Arc<dyn ListingRepository>,
        checkouts: Arc<dyn CheckoutUnitOfWork>,
        orders: Arc<dyn OrderRepository>,
        settlement: Arc<PaymentSettlement>,
        events: Arc<dyn EventPublisher>,
        scheduler: DelayedTaskScheduler,
        delivery_delay: Duration,
    ) -> Self {
        Self { carts, listings, checkouts, orders, settlement, events, scheduler, delivery_delay }
    }

    pub async fn add_cart_item(&self, user_id: Uuid, listing_id: Uuid) -> CoreResult<CartItem> {
        let listing = self
            .listings
            .get_listing(listing_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("listing {}", listing_id)))?;
        if !listing.is_available() {
            return Err(CoreError::Conflict("listing is no longer available".to_string()));
        }
        if listing.reseller_id == user_id {
            return Err(CoreError::Forbidden("cannot buy your own listing".to_string()));
        }

        let item = CartItem::from_listing(user_id, &listing);
        self.carts.create_item(&item).await?;
        Ok(item)
    }

    pub async fn get_cart_items(&self, user_id: Uuid) -> CoreResult<Vec<CartItem>> {
        self.carts.list_by_user(user_id).await
    }

    pub async fn remove_cart_item(&self, user_id: Uuid, listing_id: Uuid) -> CoreResult<()> {
        if !self.carts.delete_item(user_id, listing_id).await? {
            return Err(CoreError::NotFound("item not in cart".to_string()));
        }
        Ok(())
    }

    pub async fn checkout_cart(&self, user_id: Uuid) -> CoreResult<CheckoutReceipt> {
        let items = self.carts.list_by_user(user_id).await?;
        if items.is_empty() {
            return Err(CoreError::Validation("cart is empty".to_string()));
        }
        self.checkout(user_id, items, CartClearing::WholeCart).await
    }

    pub async fn checkout_single_item(&self, user_id: Uuid, listing_id: Uuid) -> CoreResult<CheckoutReceipt> {
        let item = self
            .carts
            .list_by_user(user_id)
            .await?
            .into_iter()
            .find(|item| item.listing_id == listing_id)
            .ok_or_else(|| CoreError::NotFound("item not in cart".to_string()))?;
        self.checkout(user_id, vec![item], CartClearing::SingleListing(listing_id)).await
    }

    async fn checkout(&self, user_id: Uuid, items: Vec<CartItem>, clearing: CartClearing) -> CoreResult<CheckoutReceipt> {
        let mut lines = self.validate(&items).await?;

        let total_cents: i64 = lines.iter().map(|line| line.price_cents).sum();
        let receipt_split = Settlement::of(total_cents)?;

        let orders = orders_per_seller(user_id, &lines);
        let order_ids: Vec<Uuid> = orders.iter().map(|order| order.id).collect();

        // One gateway charge per seller order; each line still gets its own payment record.
        let mut charge_ids = Vec::with_capacity(orders.len());
        let mut payments = Vec::with_capacity(lines.len());
        for order in &orders {
            let charge_id = match self
                .settlement
                .charge(user_id, order.seller_id, order.id, order.total_price_cents)
                .await
            {
                Ok(charge_id) => charge_id,
                Err(e) => return Err(CoreError::after_charges(charge_ids, e)),
            };
            for line in lines.iter().filter(|line| line.seller_id == order.seller_id) {
                payments.push(Payment::paid(
                    user_id,
                    line.seller_id,
                    line.listing_id,
                    PaymentType::B2c,
                    line.price_cents,
                    platform_fee(line.price_cents),
                    charge_id.clone(),
                ));
            }
            charge_ids.push(charge_id);
        }

        let commit = CheckoutCommit { user_id, lines: lines.clone(), payments, orders, clearing };
        if let Err(e) = self.checkouts.commit_checkout(&commit).await {
            warn!("Checkout for {} not recorded after {} charge(s): {}", user_id, charge_ids.len(), e);
            return Err(CoreError::after_charges(charge_ids, e));
        }

        for order in &commit.orders {
            self.schedule_delivery(order.id);
        }
        for line in &mut lines {
            line.status = ListingStatus::Sold;
        }

        info!(
            "User {} checked out {} item(s) for {} cents across {} order(s)",
            user_id,
            lines.len(),
            total_cents,
            order_ids.len()
        );
        self.events.publish(MarketEvent::CheckoutCompleted {
            user_id,
            listing_ids: lines.iter().map(|line| line.listing_id).collect(),
            total_cents,
            timestamp: Utc::now().timestamp(),
        });

        Ok(CheckoutReceipt {
            total_cents,
            platform_fee_cents: receipt_split.fee_cents,
            net_payable_cents: receipt_split.net_cents,
            items: lines,
            order_ids,
        })
    }

    /// Resolves every cart entry and reports all failures together.
    async fn validate(&self, items: &[CartItem]) -> CoreResult<Vec<CheckoutLine>> {
        let mut lines = Vec::with_capacity(items.len());
        let mut unavailable = Vec::new();

        for item in items {
            match self.listings.get_listing(item.listing_id).await? {
                None => unavailable.push(UnavailableItem {
                    listing_id: item.listing_id,
                    title: item.title.clone(),
                    reason: "listing no longer exists".to_string(),
                }),
                Some(listing) if !listing.is_available() => unavailable.push(UnavailableItem {
                    listing_id: listing.id,
                    title: listing.title,
                    reason: "listing already sold".to_string(),
                }),
                Some(listing) => lines.push(CheckoutLine {
                    listing_id: listing.id,
                    title: listing.title,
                    price_cents: listing.price_cents,
                    seller_id: listing.reseller_id,
                    status: listing.status,
                }),
            }
        }

        if !unavailable.is_empty() {
            info!("Checkout rejected: {} of {} item(s) unavailable", unavailable.len(), items.len());
            return Err(CoreError::CheckoutRejected { unavailable });
        }
        Ok(lines)
    }

    fn schedule_delivery(&self, order_id: Uuid) {
        let orders = self.orders.clone();
        let events = self.events.clone();
        self.scheduler.schedule(order_id, self.delivery_delay, async move {
            match orders.update_status(order_id, OrderStatus::Shipped, OrderStatus::Delivered).await {
                Ok(true) => {
                    info!("Order {} delivered", order_id);
                    events.publish(MarketEvent::OrderDelivered { order_id, timestamp: Utc::now().timestamp() });
                }
                Ok(false) => {}
                Err(e) => error!("Failed to mark order {} delivered: {}", order_id, e),
            }
        });
    }
}

/// One shipped order per reseller, in cart order.
fn orders_per_seller(consumer_id: Uuid, lines: &[CheckoutLine]) -> Vec<Order> {
    let mut groups: Vec<(Uuid, Vec<&CheckoutLine>)> = Vec::new();
    for line in lines {
        match groups.iter_mut().find(|(seller, _)| *seller == line.seller_id) {
            Some((_, group)) => group.push(line),
            None => groups.push((line.seller_id, vec![line])),
        }
    }

    groups
        .into_iter()
        .map(|(seller_id, group)| {
            let subtotal: i64 = group.iter().map(|line| line.price_cents).sum();
            let product_ids = group.iter().map(|line| line.listing_id).collect();
            Order::for_listings(consumer_id, seller_id, product_ids, subtotal, platform_fee(subtotal))
        })
        .collect()
}
