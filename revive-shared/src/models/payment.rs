use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    /// Supplier → reseller bundle sale.
    B2b,
    /// Reseller → consumer listing sale.
    B2c,
}

string_enum!(PaymentType, "payment type", {
    B2b => "b2b",
    B2c => "b2c",
});

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaymentStatus {
    Paid,
}

string_enum!(PaymentStatus, "payment status", {
    Paid => "Paid",
});

/// Immutable settlement record. `seller_earning_cents + platform_fee_cents`
/// always equals `amount_cents`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub payer_id: Uuid,
    pub payee_id: Uuid,
    pub amount_cents: i64,
    pub platform_fee_cents: i64,
    pub seller_earning_cents: i64,
    /// Bundle id for b2b, listing id for b2c.
    pub reference_id: Uuid,
    pub payment_type: PaymentType,
    pub status: PaymentStatus,
    pub charge_id: String,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    pub fn paid(
        payer_id: Uuid,
        payee_id: Uuid,
        reference_id: Uuid,
        payment_type: PaymentType,
        amount_cents: i64,
        platform_fee_cents: i64,
        charge_id: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            payer_id,
            payee_id,
            amount_cents,
            platform_fee_cents,
            seller_earning_cents: amount_cents - platform_fee_cents,
            reference_id,
            payment_type,
            status: PaymentStatus::Paid,
            charge_id,
            created_at: Utc::now(),
        }
    }
}
