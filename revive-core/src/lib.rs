pub mod events;
pub mod repository;
pub mod payment;

use revive_shared::models::{UnavailableItem, UnknownVariant};

/// Error taxonomy shared by every core operation and store.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Validation failed: {0}")]
    Validation(String),
    /// Checkout validation failed; carries every offending item, not just the first.
    #[error("Checkout rejected: {} item(s) unavailable", unavailable.len())]
    CheckoutRejected { unavailable: Vec<UnavailableItem> },
    #[error("Payment failed: {0}")]
    PaymentFailed(String),
    #[error("Persistence error: {0}")]
    Persistence(String),
    #[error("Internal service error: {0}")]
    Internal(String),
    /// Money moved before the failure; the charges need reconciling.
    #[error("{source} (after charge(s) {})", charge_ids.join(", "))]
    PartiallyApplied {
        charge_ids: Vec<String>,
        source: Box<CoreError>,
    },
}

impl CoreError {
    /// Flags `err` as happening after `charge_ids` went through. With no
    /// charges nothing was mutated and `err` is returned as is.
    pub fn after_charges(charge_ids: Vec<String>, err: CoreError) -> Self {
        if charge_ids.is_empty() {
            return err;
        }
        CoreError::PartiallyApplied { charge_ids, source: Box::new(err) }
    }

    pub fn is_conflict(&self) -> bool {
        match self {
            CoreError::Conflict(_) | CoreError::CheckoutRejected { .. } => true,
            CoreError::PartiallyApplied { source, .. } => source.is_conflict(),
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CoreError::NotFound(_))
    }

    pub fn is_partially_applied(&self) -> bool {
        matches!(self, CoreError::PartiallyApplied { .. })
    }
}

impl From<UnknownVariant> for CoreError {
    fn from(err: UnknownVariant) -> Self {
        // A stored value we cannot decode is a storage problem, not a caller problem.
        CoreError::Persistence(err.to_string())
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_checkout_rejection_counts_items() {
        let err = CoreError::CheckoutRejected {
            unavailable: vec![UnavailableItem {
                listing_id: Uuid::new_v4(),
                title: "Wool coat".to_string(),
                reason: "sold".to_string(),
            }],
        };
        assert!(err.is_conflict());
        assert_eq!(err.to_string(), "Checkout rejected: 1 item(s) unavailable");
    }

    #[test]
    fn test_after_charges_keeps_the_classification() {
        let untouched = CoreError::after_charges(vec![], CoreError::PaymentFailed("declined".into()));
        assert!(matches!(untouched, CoreError::PaymentFailed(_)));

        let lost_race = CoreError::after_charges(
            vec!["ch_1".to_string()],
            CoreError::Conflict("bundle not available".into()),
        );
        assert!(lost_race.is_partially_applied());
        assert!(lost_race.is_conflict());
        assert_eq!(lost_race.to_string(), "Conflict: bundle not available (after charge(s) ch_1)");
    }

    #[test]
    fn test_unknown_variant_is_persistence_error() {
        let err: CoreError = "sold".parse::<revive_shared::models::BundleStatus>().unwrap_err().into();
        assert!(matches!(err, CoreError::Persistence(_)));
    }
}
