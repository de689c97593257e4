use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    Available,
    Sold,
}

string_enum!(ListingStatus, "listing status", {
    Available => "available",
    Sold => "sold",
});

/// A single item a reseller unpacked from a bundle and priced for consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub id: Uuid,
    pub reseller_id: Uuid,
    pub supplier_id: Uuid,
    pub bundle_id: Uuid,
    pub title: String,
    pub description: String,
    pub size: String,
    pub kind: String,
    pub grade: String,
    pub price_cents: i64,
    pub image_url: String,
    /// Reseller's quality rating on the 0–100 scale.
    pub rating: f64,
    pub status: ListingStatus,
    pub created_at: DateTime<Utc>,
}

impl Listing {
    pub fn unpacked(reseller_id: Uuid, supplier_id: Uuid, draft: ListingDraft) -> Self {
        Self {
            id: Uuid::new_v4(),
            reseller_id,
            supplier_id,
            bundle_id: draft.bundle_id,
            title: draft.title,
            description: draft.description,
            size: draft.size,
            kind: draft.kind,
            grade: draft.grade,
            price_cents: draft.price_cents,
            image_url: draft.image_url,
            rating: draft.rating,
            status: ListingStatus::Available,
            created_at: Utc::now(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.status == ListingStatus::Available
    }
}

/// What a reseller submits when unpacking one item out of a bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingDraft {
    pub bundle_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub size: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    pub grade: String,
    pub price_cents: i64,
    #[serde(default)]
    pub image_url: String,
    pub rating: f64,
}
