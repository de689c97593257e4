use std::sync::Arc;
use serde::Serialize;
use tracing::{error, info, warn};

use revive_core::repository::TrustOutboxRepository;
use revive_core::{CoreError, CoreResult};
use crate::trust::TrustScoreEngine;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    pub delivered: usize,
    /// Entries another relay delivered between our read and our write.
    pub skipped: usize,
    pub retried: usize,
    pub dead_lettered: usize,
}

/// Delivers queued rating events to the trust engine.
pub struct TrustOutboxRelay {
    outbox: Arc<dyn TrustOutboxRepository>,
    engine: Arc<TrustScoreEngine>,
    max_attempts: i32,
    batch_size: usize,
}

impl TrustOutboxRelay {
    pub fn new(outbox: Arc<dyn TrustOutboxRepository>, engine: Arc<TrustScoreEngine>, max_attempts: i32) -> Self {
        Self {
            outbox,
            engine,
            max_attempts: max_attempts.max(1),
            batch_size: 100,
        }
    }

    pub async fn drain_once(&self) -> CoreResult<DrainReport> {
        let mut report = DrainReport::default();

        for entry in self.outbox.list_pending(self.batch_size).await? {
            match self.engine.apply_queued_rating(self.outbox.as_ref(), &entry).await {
                Ok(Some(_)) => report.delivered += 1,
                Ok(None) => report.skipped += 1,
                Err(e) => {
                    let attempts = entry.attempts + 1;
                    let dead_letter = is_permanent(&e) || attempts >= self.max_attempts;
                    self.outbox.record_failure(entry.id, &e.to_string(), dead_letter).await?;
                    if dead_letter {
                        error!(
                            "Rating {} for supplier {} dead-lettered after {} attempt(s): {}",
                            entry.id, entry.supplier_id, attempts, e
                        );
                        report.dead_lettered += 1;
                    } else {
                        warn!(
                            "Rating {} for supplier {} failed (attempt {}/{}): {}",
                            entry.id, entry.supplier_id, attempts, self.max_attempts, e
                        );
                        report.retried += 1;
                    }
                }
            }
        }

        if report != DrainReport::default() {
            info!(
                "Trust outbox drained: {} delivered, {} skipped, {} retrying, {} dead-lettered",
                report.delivered, report.skipped, report.retried, report.dead_lettered
            );
        }
        Ok(report)
    }
}

/// Retrying cannot fix a bad rating or a supplier that does not exist.
fn is_permanent(err: &CoreError) -> bool {
    matches!(err, CoreError::Validation(_) | CoreError::NotFound(_))
}
