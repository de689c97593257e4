use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

use super::listing::{Listing, ListingStatus};

/// A consumer's pending selection. At most one per (user, listing).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub listing_id: Uuid,
    pub title: String,
    pub price_cents: i64,
    pub image_url: String,
    pub grade: String,
    pub created_at: DateTime<Utc>,
}

impl CartItem {
    pub fn from_listing(user_id: Uuid, listing: &Listing) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            listing_id: listing.id,
            title: listing.title.clone(),
            price_cents: listing.price_cents,
            image_url: listing.image_url.clone(),
            grade: listing.grade.clone(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckoutLine {
    pub listing_id: Uuid,
    pub title: String,
    pub price_cents: i64,
    pub seller_id: Uuid,
    pub status: ListingStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutReceipt {
    pub total_cents: i64,
    pub platform_fee_cents: i64,
    pub net_payable_cents: i64,
    pub items: Vec<CheckoutLine>,
    pub order_ids: Vec<Uuid>,
}

/// A cart entry that failed checkout validation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnavailableItem {
    pub listing_id: Uuid,
    pub title: String,
    pub reason: String,
}
