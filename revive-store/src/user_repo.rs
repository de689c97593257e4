use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use revive_core::repository::{RatingWrite, TrustOutboxRepository, UserRepository};
use revive_core::{CoreError, CoreResult};
use revive_shared::models::{OutboxStatus, RatingOutboxEntry, TrustState, User};
use revive_shared::Masked;

use crate::db_err;

/// Users with their trust fields, plus the trust rating outbox.
pub struct StoreUserRepository {
    pool: PgPool,
}

impl StoreUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str = "id, name, username, email, role, trust_score, trust_rated_count, trust_total_error, \
     is_blacklisted, is_deleted, created_at";

const OUTBOX_COLUMNS: &str = "id, supplier_id, listing_id, declared_quality, actual_quality, status, attempts, \
     last_error, created_at";

/// Compare-and-swap of the trust fields. The rated count only grows, so it
/// alone identifies the version that was read.
async fn swap_trust(conn: &mut PgConnection, id: Uuid, expected: &TrustState, trust: &TrustState) -> CoreResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE users
        SET trust_score = $1, trust_rated_count = $2, trust_total_error = $3, is_blacklisted = $4
        WHERE id = $5 AND trust_rated_count = $6
        "#,
    )
    .bind(trust.score)
    .bind(trust.rated_count)
    .bind(trust.total_error)
    .bind(trust.is_blacklisted)
    .bind(id)
    .bind(expected.rated_count)
    .execute(conn)
    .await
    .map_err(db_err)?;
    Ok(result.rows_affected() == 1)
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    username: String,
    email: String,
    role: String,
    trust_score: f64,
    trust_rated_count: i64,
    trust_total_error: f64,
    is_blacklisted: bool,
    is_deleted: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = CoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            name: row.name,
            username: row.username,
            email: Masked::new(row.email),
            role: row.role.parse()?,
            trust: TrustState {
                score: row.trust_score,
                rated_count: row.trust_rated_count,
                total_error: row.trust_total_error,
                is_blacklisted: row.is_blacklisted,
            },
            is_deleted: row.is_deleted,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OutboxRow {
    id: Uuid,
    supplier_id: Uuid,
    listing_id: Uuid,
    declared_quality: f64,
    actual_quality: f64,
    status: String,
    attempts: i32,
    last_error: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<OutboxRow> for RatingOutboxEntry {
    type Error = CoreError;

    fn try_from(row: OutboxRow) -> Result<Self, Self::Error> {
        Ok(RatingOutboxEntry {
            id: row.id,
            supplier_id: row.supplier_id,
            listing_id: row.listing_id,
            declared_quality: row.declared_quality,
            actual_quality: row.actual_quality,
            status: row.status.parse()?,
            attempts: row.attempts,
            last_error: row.last_error,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl UserRepository for StoreUserRepository {
    async fn create_user(&self, user: &User) -> CoreResult<()> {
        sqlx::query(&format!(
            "INSERT INTO users ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
            USER_COLUMNS
        ))
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.username)
        .bind(user.email.expose())
        .bind(user.role.as_str())
        .bind(user.trust.score)
        .bind(user.trust.rated_count)
        .bind(user.trust.total_error)
        .bind(user.trust.is_blacklisted)
        .bind(user.is_deleted)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> CoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.map(User::try_from).transpose()
    }

    async fn update_trust(&self, id: Uuid, expected: &TrustState, trust: &TrustState) -> CoreResult<bool> {
        let mut conn = self.pool.acquire().await.map_err(db_err)?;
        swap_trust(&mut conn, id, expected, trust).await
    }

    async fn list_blacklisted(&self) -> CoreResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE is_blacklisted = TRUE AND is_deleted = FALSE ORDER BY trust_score ASC",
            USER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(User::try_from).collect()
    }

    async fn count_active(&self) -> CoreResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE is_deleted = FALSE")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)
    }
}

#[async_trait]
impl TrustOutboxRepository for StoreUserRepository {
    async fn enqueue(&self, entry: &RatingOutboxEntry) -> CoreResult<()> {
        sqlx::query(&format!(
            "INSERT INTO trust_outbox ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            OUTBOX_COLUMNS
        ))
        .bind(entry.id)
        .bind(entry.supplier_id)
        .bind(entry.listing_id)
        .bind(entry.declared_quality)
        .bind(entry.actual_quality)
        .bind(entry.status.as_str())
        .bind(entry.attempts)
        .bind(entry.last_error.as_deref())
        .bind(entry.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn list_pending(&self, limit: usize) -> CoreResult<Vec<RatingOutboxEntry>> {
        let rows = sqlx::query_as::<_, OutboxRow>(&format!(
            "SELECT {} FROM trust_outbox WHERE status = $1 ORDER BY created_at ASC LIMIT $2",
            OUTBOX_COLUMNS
        ))
        .bind(OutboxStatus::Pending.as_str())
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(RatingOutboxEntry::try_from).collect()
    }

    async fn deliver_rating(
        &self,
        entry_id: Uuid,
        supplier_id: Uuid,
        expected: &TrustState,
        trust: &TrustState,
    ) -> CoreResult<RatingWrite> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        // The row lock taken here makes a concurrent pass wait, then miss the guard.
        let claimed = sqlx::query("UPDATE trust_outbox SET status = $1 WHERE id = $2 AND status = $3")
            .bind(OutboxStatus::Delivered.as_str())
            .bind(entry_id)
            .bind(OutboxStatus::Pending.as_str())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        if claimed.rows_affected() == 0 {
            tx.rollback().await.map_err(db_err)?;
            return Ok(RatingWrite::AlreadyDelivered);
        }

        if !swap_trust(&mut tx, supplier_id, expected, trust).await? {
            tx.rollback().await.map_err(db_err)?;
            return Ok(RatingWrite::StateMoved);
        }

        tx.commit().await.map_err(db_err)?;
        Ok(RatingWrite::Applied)
    }

    async fn record_failure(&self, id: Uuid, error: &str, dead_letter: bool) -> CoreResult<()> {
        let status = if dead_letter { OutboxStatus::DeadLetter } else { OutboxStatus::Pending };
        sqlx::query(
            "UPDATE trust_outbox SET attempts = attempts + 1, last_error = $1, status = $2 \
             WHERE id = $3 AND status = $4",
        )
        .bind(error)
        .bind(status.as_str())
        .bind(id)
        .bind(OutboxStatus::Pending.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }
}
