use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

use crate::pii::Masked;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Supplier,
    Reseller,
    Consumer,
    Admin,
}

string_enum!(Role, "role", {
    Supplier => "supplier",
    Reseller => "reseller",
    Consumer => "consumer",
    Admin => "admin",
});

/// Trust fields of a supplier or reseller.
///
/// `score == clamp(100 - total_error / rated_count, 0, 100)` and
/// `is_blacklisted == score < 40` hold after every persisted update.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TrustState {
    #[serde(rename = "trust_score")]
    pub score: f64,
    #[serde(rename = "trust_rated_count")]
    pub rated_count: i64,
    #[serde(rename = "trust_total_error")]
    pub total_error: f64,
    pub is_blacklisted: bool,
}

impl TrustState {
    pub fn initial() -> Self {
        Self {
            score: 100.0,
            rated_count: 0,
            total_error: 0.0,
            is_blacklisted: false,
        }
    }
}

impl Default for TrustState {
    fn default() -> Self {
        Self::initial()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub email: Masked<String>,
    pub role: Role,
    #[serde(flatten)]
    pub trust: TrustState,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: &str, username: &str, email: &str, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            username: username.to_string(),
            email: Masked::new(email.to_string()),
            role,
            trust: TrustState::initial(),
            is_deleted: false,
            created_at: Utc::now(),
        }
    }
}
