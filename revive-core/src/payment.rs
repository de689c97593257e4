use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

use crate::CoreResult;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChargeStatus {
    Succeeded,
    Declined,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeRequest {
    pub payer_id: Uuid,
    pub payee_id: Uuid,
    /// Bundle or consumer order being paid for.
    pub reference_id: Uuid,
    pub amount_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeConfirmation {
    pub charge_id: String, // Provider's ID (e.g., ch_123)
    pub status: ChargeStatus,
    pub confirmed_at: DateTime<Utc>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Charge the payer. Blocks for the provider's confirmation.
    async fn charge(&self, request: &ChargeRequest) -> CoreResult<ChargeConfirmation>;
}
