use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use revive_core::repository::BundleRepository;
use revive_core::{CoreError, CoreResult};
use revive_shared::models::{Bundle, BundlePatch, BundleStatus};

use crate::db_err;

pub struct StoreBundleRepository {
    pool: PgPool,
}

impl StoreBundleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const BUNDLE_COLUMNS: &str = "id, supplier_id, reseller_id, title, description, sample_image, grade, \
     sorting_level, declared_rating, price_cents, quantity, remaining_item_count, status, date_listed";

#[derive(sqlx::FromRow)]
struct BundleRow {
    id: Uuid,
    supplier_id: Uuid,
    reseller_id: Option<Uuid>,
    title: String,
    description: String,
    sample_image: String,
    grade: String,
    sorting_level: String,
    declared_rating: i32,
    price_cents: i64,
    quantity: i32,
    remaining_item_count: i32,
    status: String,
    date_listed: DateTime<Utc>,
}

impl TryFrom<BundleRow> for Bundle {
    type Error = CoreError;

    fn try_from(row: BundleRow) -> Result<Self, Self::Error> {
        Ok(Bundle {
            id: row.id,
            supplier_id: row.supplier_id,
            reseller_id: row.reseller_id,
            title: row.title,
            description: row.description,
            sample_image: row.sample_image,
            grade: row.grade,
            sorting_level: row.sorting_level.parse()?,
            declared_rating: row.declared_rating,
            price_cents: row.price_cents,
            quantity: row.quantity,
            remaining_item_count: row.remaining_item_count,
            status: row.status.parse()?,
            date_listed: row.date_listed,
        })
    }
}

fn into_bundles(rows: Vec<BundleRow>) -> CoreResult<Vec<Bundle>> {
    rows.into_iter().map(Bundle::try_from).collect()
}

#[async_trait]
impl BundleRepository for StoreBundleRepository {
    async fn get_bundle(&self, id: Uuid) -> CoreResult<Option<Bundle>> {
        let row = sqlx::query_as::<_, BundleRow>(&format!("SELECT {} FROM bundles WHERE id = $1", BUNDLE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.map(Bundle::try_from).transpose()
    }

    async fn list_by_supplier(&self, supplier_id: Uuid) -> CoreResult<Vec<Bundle>> {
        let rows = sqlx::query_as::<_, BundleRow>(&format!(
            "SELECT {} FROM bundles WHERE supplier_id = $1 ORDER BY date_listed DESC",
            BUNDLE_COLUMNS
        ))
        .bind(supplier_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        into_bundles(rows)
    }

    async fn list_available(&self) -> CoreResult<Vec<Bundle>> {
        let rows = sqlx::query_as::<_, BundleRow>(&format!(
            "SELECT {} FROM bundles WHERE status = $1 ORDER BY date_listed DESC",
            BUNDLE_COLUMNS
        ))
        .bind(BundleStatus::Available.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        into_bundles(rows)
    }

    async fn list_purchased_by_reseller(&self, reseller_id: Uuid) -> CoreResult<Vec<Bundle>> {
        let rows = sqlx::query_as::<_, BundleRow>(&format!(
            "SELECT {} FROM bundles WHERE reseller_id = $1 AND status = $2 ORDER BY date_listed DESC",
            BUNDLE_COLUMNS
        ))
        .bind(reseller_id)
        .bind(BundleStatus::Purchased.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        into_bundles(rows)
    }

    async fn create_bundle(&self, bundle: &Bundle) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO bundles (id, supplier_id, reseller_id, title, description, sample_image, grade,
                                 sorting_level, declared_rating, price_cents, quantity, remaining_item_count,
                                 status, date_listed)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(bundle.id)
        .bind(bundle.supplier_id)
        .bind(bundle.reseller_id)
        .bind(&bundle.title)
        .bind(&bundle.description)
        .bind(&bundle.sample_image)
        .bind(&bundle.grade)
        .bind(bundle.sorting_level.as_str())
        .bind(bundle.declared_rating)
        .bind(bundle.price_cents)
        .bind(bundle.quantity)
        .bind(bundle.remaining_item_count)
        .bind(bundle.status.as_str())
        .bind(bundle.date_listed)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn update_status(&self, id: Uuid, expected: BundleStatus, status: BundleStatus) -> CoreResult<bool> {
        let result = sqlx::query("UPDATE bundles SET status = $1 WHERE id = $2 AND status = $3")
            .bind(status.as_str())
            .bind(id)
            .bind(expected.as_str())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() == 1)
    }

    async fn update_fields(&self, id: Uuid, patch: &BundlePatch) -> CoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE bundles SET
                title = COALESCE($1, title),
                description = COALESCE($2, description),
                sample_image = COALESCE($3, sample_image),
                grade = COALESCE($4, grade),
                sorting_level = COALESCE($5, sorting_level),
                declared_rating = COALESCE($6, declared_rating),
                price_cents = COALESCE($7, price_cents)
            WHERE id = $8 AND status = $9
            "#,
        )
        .bind(patch.title.as_deref())
        .bind(patch.description.as_deref())
        .bind(patch.sample_image.as_deref())
        .bind(patch.grade.as_deref())
        .bind(patch.sorting_level.map(|level| level.as_str()))
        .bind(patch.declared_rating)
        .bind(patch.price_cents)
        .bind(id)
        .bind(BundleStatus::Available.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(result.rows_affected() == 1)
    }

    async fn decrement_remaining(&self, id: Uuid) -> CoreResult<Option<i32>> {
        let remaining: Option<i32> = sqlx::query_scalar(
            "UPDATE bundles SET remaining_item_count = remaining_item_count - 1 \
             WHERE id = $1 AND remaining_item_count > 0 RETURNING remaining_item_count",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(remaining)
    }

    async fn count_all(&self) -> CoreResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM bundles")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)
    }
}
