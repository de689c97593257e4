use std::sync::Arc;
use chrono::Utc;
use uuid::Uuid;
use tracing::{debug, info, warn};

use revive_core::events::EventPublisher;
use revive_core::repository::{RatingWrite, TrustOutboxRepository, UserRepository};
use revive_core::{CoreError, CoreResult};
use revive_shared::models::{MarketEvent, RatingOutboxEntry, TrustState};

/// Suppliers scoring strictly below this are blacklisted.
pub const BLACKLIST_THRESHOLD: f64 = 40.0;

const MAX_SCORE: f64 = 100.0;
const MAX_SWAP_ATTEMPTS: usize = 8;

/// A quality score on the common 0–100 scale.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct QualityRating(f64);

impl QualityRating {
    pub fn new(value: f64) -> CoreResult<Self> {
        if !value.is_finite() || !(0.0..=MAX_SCORE).contains(&value) {
            return Err(CoreError::Validation(format!(
                "quality rating must be between 0 and 100, got {}",
                value
            )));
        }
        Ok(Self(value))
    }

    /// Converts a declared 1–5 bundle grade onto the quality scale.
    pub fn from_grade(grade: i32) -> CoreResult<Self> {
        if !(1..=5).contains(&grade) {
            return Err(CoreError::Validation(format!(
                "declared rating must be between 1 and 5, got {}",
                grade
            )));
        }
        Ok(Self(f64::from(grade) * 20.0))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

/// Folds one rating into the running error average.
pub fn next_trust_state(current: &TrustState, declared: QualityRating, actual: QualityRating) -> TrustState {
    let diff = (actual.value() - declared.value()).abs();
    let total_error = current.total_error + diff;
    let rated_count = current.rated_count + 1;
    let score = (MAX_SCORE - total_error / rated_count as f64).clamp(0.0, MAX_SCORE);

    TrustState {
        score,
        rated_count,
        total_error,
        is_blacklisted: score < BLACKLIST_THRESHOLD,
    }
}

/// Where a computed trust state gets written.
#[derive(Clone, Copy)]
enum TrustSink<'a> {
    Direct,
    /// Written together with marking the queued rating delivered.
    Outbox {
        outbox: &'a dyn TrustOutboxRepository,
        entry_id: Uuid,
    },
}

pub struct TrustScoreEngine {
    users: Arc<dyn UserRepository>,
    events: Arc<dyn EventPublisher>,
}

impl TrustScoreEngine {
    pub fn new(users: Arc<dyn UserRepository>, events: Arc<dyn EventPublisher>) -> Self {
        Self { users, events }
    }

    /// Recomputes the supplier's trust fields and persists them with a
    /// compare-and-swap, retrying when a concurrent rating wins the write.
    pub async fn update_supplier_trust_score_on_new_rating(
        &self,
        supplier_id: Uuid,
        declared: QualityRating,
        actual: QualityRating,
    ) -> CoreResult<TrustState> {
        self.rate(supplier_id, declared, actual, TrustSink::Direct)
            .await?
            .ok_or_else(|| CoreError::Internal(format!("direct rating of supplier {} was skipped", supplier_id)))
    }

    /// Applies a queued rating at most once. The trust write and the
    /// delivered mark share a transaction; `None` means another relay
    /// already delivered the entry.
    pub async fn apply_queued_rating(
        &self,
        outbox: &dyn TrustOutboxRepository,
        entry: &RatingOutboxEntry,
    ) -> CoreResult<Option<TrustState>> {
        let declared = QualityRating::new(entry.declared_quality)?;
        let actual = QualityRating::new(entry.actual_quality)?;
        let sink = TrustSink::Outbox { outbox, entry_id: entry.id };
        self.rate(entry.supplier_id, declared, actual, sink).await
    }

    async fn rate(
        &self,
        supplier_id: Uuid,
        declared: QualityRating,
        actual: QualityRating,
        sink: TrustSink<'_>,
    ) -> CoreResult<Option<TrustState>> {
        for attempt in 1..=MAX_SWAP_ATTEMPTS {
            let supplier = self
                .users
                .get_user(supplier_id)
                .await?
                .ok_or_else(|| CoreError::NotFound(format!("supplier {}", supplier_id)))?;

            let current = supplier.trust;
            let next = next_trust_state(&current, declared, actual);

            let write = match sink {
                TrustSink::Direct => {
                    if self.users.update_trust(supplier_id, &current, &next).await? {
                        RatingWrite::Applied
                    } else {
                        RatingWrite::StateMoved
                    }
                }
                TrustSink::Outbox { outbox, entry_id } => {
                    outbox.deliver_rating(entry_id, supplier_id, &current, &next).await?
                }
            };
            match write {
                RatingWrite::Applied => {}
                RatingWrite::StateMoved => {
                    debug!("Trust state of supplier {} moved underneath attempt {}, retrying", supplier_id, attempt);
                    continue;
                }
                RatingWrite::AlreadyDelivered => {
                    debug!("Rating for supplier {} was already delivered, skipping", supplier_id);
                    return Ok(None);
                }
            }

            info!(
                "Supplier {} trust score {:.2} -> {:.2} after {} rating(s)",
                supplier_id, current.score, next.score, next.rated_count
            );
            if next.is_blacklisted && !current.is_blacklisted {
                warn!("Supplier {} blacklisted with trust score {:.2}", supplier_id, next.score);
            } else if !next.is_blacklisted && current.is_blacklisted {
                info!("Supplier {} lifted off the blacklist", supplier_id);
            }

            self.events.publish(MarketEvent::SupplierTrustUpdated {
                supplier_id,
                trust_score: next.score,
                is_blacklisted: next.is_blacklisted,
                timestamp: Utc::now().timestamp(),
            });
            return Ok(Some(next));
        }

        Err(CoreError::Conflict(format!(
            "trust score of supplier {} kept changing concurrently",
            supplier_id
        )))
    }
}
