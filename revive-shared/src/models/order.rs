use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

use super::bundle::Bundle;

/// Order status. Bundle purchases use processing → completed; consumer
/// orders use shipped → delivered.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Processing,
    Completed,
    Canceled,
    Failed,
    Pending,
    Shipped,
    Delivered,
}

string_enum!(OrderStatus, "order status", {
    Processing => "processing",
    Completed => "completed",
    Canceled => "canceled",
    Failed => "failed",
    Pending => "pending",
    Shipped => "shipped",
    Delivered => "delivered",
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub bundle_id: Option<Uuid>,
    pub product_ids: Vec<Uuid>,
    pub total_price_cents: i64,
    /// Fixed at creation; never recomputed.
    pub platform_fee_cents: i64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// A reseller buying a whole bundle from its supplier.
    pub fn for_bundle(bundle: &Bundle, reseller_id: Uuid, platform_fee_cents: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            buyer_id: reseller_id,
            seller_id: bundle.supplier_id,
            bundle_id: Some(bundle.id),
            product_ids: Vec::new(),
            total_price_cents: bundle.price_cents,
            platform_fee_cents,
            status: OrderStatus::Processing,
            created_at: now,
            updated_at: now,
        }
    }

    /// A consumer buying one or more listings from a single reseller.
    pub fn for_listings(
        consumer_id: Uuid,
        seller_id: Uuid,
        product_ids: Vec<Uuid>,
        total_price_cents: i64,
        platform_fee_cents: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            buyer_id: consumer_id,
            seller_id,
            bundle_id: None,
            product_ids,
            total_price_cents,
            platform_fee_cents,
            status: OrderStatus::Shipped,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn update_status(&mut self, new_status: OrderStatus) {
        self.status = new_status;
        self.updated_at = Utc::now();
    }

    /// Sold bundle history only counts whole-bundle sales.
    pub fn is_bundle_sale(&self) -> bool {
        self.bundle_id.is_some() && self.product_ids.is_empty()
    }

    pub fn is_settled(&self) -> bool {
        matches!(self.status, OrderStatus::Completed | OrderStatus::Delivered)
    }
}
