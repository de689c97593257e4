use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WarehouseStatus {
    /// Purchased, still in transit to the reseller.
    Pending,
    /// Arrived; the reseller may unpack items from it.
    Listed,
    Skipped,
    Damaged,
}

string_enum!(WarehouseStatus, "warehouse status", {
    Pending => "pending",
    Listed => "listed",
    Skipped => "skipped",
    Damaged => "damaged",
});

/// Physical custody record for a purchased bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseItem {
    pub id: Uuid,
    pub reseller_id: Uuid,
    pub bundle_id: Uuid,
    pub product_id: Option<Uuid>,
    pub status: WarehouseStatus,
    pub created_at: DateTime<Utc>,
}

impl WarehouseItem {
    pub fn pending(bundle_id: Uuid, reseller_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            reseller_id,
            bundle_id,
            product_id: None,
            status: WarehouseStatus::Pending,
            created_at: Utc::now(),
        }
    }

    pub fn has_arrived(&self) -> bool {
        self.status == WarehouseStatus::Listed
    }
}
