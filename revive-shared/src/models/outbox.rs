use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutboxStatus {
    Pending,
    Delivered,
    DeadLetter,
}

string_enum!(OutboxStatus, "outbox status", {
    Pending => "pending",
    Delivered => "delivered",
    DeadLetter => "dead_letter",
});

/// A supplier rating waiting to be folded into the supplier's trust score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingOutboxEntry {
    pub id: Uuid,
    pub supplier_id: Uuid,
    pub listing_id: Uuid,
    /// Both ratings are on the 0–100 quality scale.
    pub declared_quality: f64,
    pub actual_quality: f64,
    pub status: OutboxStatus,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl RatingOutboxEntry {
    pub fn new(supplier_id: Uuid, listing_id: Uuid, declared_quality: f64, actual_quality: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            supplier_id,
            listing_id,
            declared_quality,
            actual_quality,
            status: OutboxStatus::Pending,
            attempts: 0,
            last_error: None,
            created_at: Utc::now(),
        }
    }
}
