use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use uuid::Uuid;
use tracing::{debug, error, info};

use revive_core::payment::{ChargeConfirmation, ChargeRequest, ChargeStatus, PaymentGateway};
use revive_core::{CoreError, CoreResult};
use revive_shared::models::{Payment, PaymentType};

/// Platform cut of every settled amount.
pub const PLATFORM_FEE_PERCENT: i64 = 2;

/// 2% of `amount_cents`, rounded half up to the cent.
pub fn platform_fee(amount_cents: i64) -> i64 {
    (amount_cents * PLATFORM_FEE_PERCENT + 50) / 100
}

/// Fee split of one amount. `fee_cents + net_cents == amount_cents`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    pub amount_cents: i64,
    pub fee_cents: i64,
    pub net_cents: i64,
}

impl Settlement {
    pub fn of(amount_cents: i64) -> CoreResult<Self> {
        if amount_cents < 0 {
            return Err(CoreError::Validation(format!("cannot settle negative amount {}", amount_cents)));
        }
        let fee_cents = platform_fee(amount_cents);
        Ok(Self {
            amount_cents,
            fee_cents,
            net_cents: amount_cents - fee_cents,
        })
    }
}

/// Charges through the gateway and produces the paid record.
pub struct PaymentSettlement {
    gateway: Arc<dyn PaymentGateway>,
}

impl PaymentSettlement {
    pub fn new(gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { gateway }
    }

    /// Confirms one charge with the gateway and returns its charge id.
    pub async fn charge(
        &self,
        payer_id: Uuid,
        payee_id: Uuid,
        reference_id: Uuid,
        amount_cents: i64,
    ) -> CoreResult<String> {
        if amount_cents < 0 {
            return Err(CoreError::Validation(format!("cannot charge negative amount {}", amount_cents)));
        }
        let request = ChargeRequest { payer_id, payee_id, reference_id, amount_cents };

        // Run the charge on its own task so a dropped request cannot abandon it halfway.
        let gateway = self.gateway.clone();
        let confirmation = tokio::spawn(async move { gateway.charge(&request).await })
            .await
            .map_err(|e| CoreError::Internal(format!("payment task failed: {}", e)))??;

        if confirmation.status != ChargeStatus::Succeeded {
            error!("Charge {} for {} declined", confirmation.charge_id, reference_id);
            return Err(CoreError::PaymentFailed(format!("charge {} declined", confirmation.charge_id)));
        }
        info!("Charged {} cents for {} as {}", amount_cents, reference_id, confirmation.charge_id);
        Ok(confirmation.charge_id)
    }

    /// Charges the full amount and returns the payment to record.
    /// Nothing is persisted here.
    pub async fn settle(
        &self,
        payer_id: Uuid,
        payee_id: Uuid,
        reference_id: Uuid,
        payment_type: PaymentType,
        amount_cents: i64,
    ) -> CoreResult<Payment> {
        let settlement = Settlement::of(amount_cents)?;
        let charge_id = self.charge(payer_id, payee_id, reference_id, amount_cents).await?;

        debug!(
            "Settled {} cents for {} ({}): fee {}, net {}",
            settlement.amount_cents, reference_id, payment_type, settlement.fee_cents, settlement.net_cents
        );
        Ok(Payment::paid(
            payer_id,
            payee_id,
            reference_id,
            payment_type,
            settlement.amount_cents,
            settlement.fee_cents,
            charge_id,
        ))
    }
}

/// Stand-in for a payment provider: waits a fixed latency and approves.
pub struct SimulatedGateway {
    latency: Duration,
}

impl SimulatedGateway {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn charge(&self, request: &ChargeRequest) -> CoreResult<ChargeConfirmation> {
        tokio::time::sleep(self.latency).await;
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(24)
            .map(char::from)
            .collect();
        let charge_id = format!("ch_{}", suffix);
        debug!("Simulated charge {} of {} cents", charge_id, request.amount_cents);
        Ok(ChargeConfirmation {
            charge_id,
            status: ChargeStatus::Succeeded,
            confirmed_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct DecliningGateway;

    #[async_trait]
    impl PaymentGateway for DecliningGateway {
        async fn charge(&self, _request: &ChargeRequest) -> CoreResult<ChargeConfirmation> {
            Ok(ChargeConfirmation {
                charge_id: "ch_declined".to_string(),
                status: ChargeStatus::Declined,
                confirmed_at: Utc::now(),
            })
        }
    }

    #[test]
    fn test_hundred_splits_into_two_and_ninety_eight() {
        let s = Settlement::of(10_000).unwrap();
        assert_eq!(s.fee_cents, 200);
        assert_eq!(s.net_cents, 9_800);
    }

    #[test]
    fn test_fee_rounds_half_up_and_split_adds_up() {
        assert_eq!(platform_fee(25), 1); // 0.5 cent
        assert_eq!(platform_fee(24), 0);
        assert_eq!(platform_fee(75), 2); // 1.5 cents
        assert_eq!(platform_fee(0), 0);

        for amount in [1, 49, 50, 99, 101, 1_234, 999_999, 12_345_678] {
            let s = Settlement::of(amount).unwrap();
            assert_eq!(s.fee_cents + s.net_cents, amount);
            assert_eq!(s.fee_cents, ((amount as f64) * 0.02).round() as i64);
        }
    }

    #[test]
    fn test_negative_amount_is_rejected() {
        assert!(matches!(Settlement::of(-1), Err(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_settle_produces_paid_record() {
        let settlement = PaymentSettlement::new(Arc::new(SimulatedGateway::new(Duration::ZERO)));
        let (payer, payee, bundle) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        let payment = settlement.settle(payer, payee, bundle, PaymentType::B2b, 10_000).await.unwrap();

        assert_eq!(payment.platform_fee_cents, 200);
        assert_eq!(payment.seller_earning_cents, 9_800);
        assert_eq!(payment.reference_id, bundle);
        assert!(payment.charge_id.starts_with("ch_"));
    }

    #[tokio::test]
    async fn test_declined_charge_fails_settlement() {
        let settlement = PaymentSettlement::new(Arc::new(DecliningGateway));
        let err = settlement
            .settle(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), PaymentType::B2c, 500)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::PaymentFailed(_)));
    }
}
