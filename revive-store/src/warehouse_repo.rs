use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use revive_core::repository::WarehouseRepository;
use revive_core::{CoreError, CoreResult};
use revive_shared::models::{WarehouseItem, WarehouseStatus};

use crate::db_err;

pub struct StoreWarehouseRepository {
    pool: PgPool,
}

impl StoreWarehouseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const ITEM_COLUMNS: &str = "id, reseller_id, bundle_id, product_id, status, created_at";

#[derive(sqlx::FromRow)]
struct WarehouseRow {
    id: Uuid,
    reseller_id: Uuid,
    bundle_id: Uuid,
    product_id: Option<Uuid>,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<WarehouseRow> for WarehouseItem {
    type Error = CoreError;

    fn try_from(row: WarehouseRow) -> Result<Self, Self::Error> {
        Ok(WarehouseItem {
            id: row.id,
            reseller_id: row.reseller_id,
            bundle_id: row.bundle_id,
            product_id: row.product_id,
            status: row.status.parse()?,
            created_at: row.created_at,
        })
    }
}

fn into_items(rows: Vec<WarehouseRow>) -> CoreResult<Vec<WarehouseItem>> {
    rows.into_iter().map(WarehouseItem::try_from).collect()
}

#[async_trait]
impl WarehouseRepository for StoreWarehouseRepository {
    async fn add_item(&self, item: &WarehouseItem) -> CoreResult<()> {
        sqlx::query(&format!("INSERT INTO warehouse_items ({}) VALUES ($1, $2, $3, $4, $5, $6)", ITEM_COLUMNS))
            .bind(item.id)
            .bind(item.reseller_id)
            .bind(item.bundle_id)
            .bind(item.product_id)
            .bind(item.status.as_str())
            .bind(item.created_at)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn get_item(&self, id: Uuid) -> CoreResult<Option<WarehouseItem>> {
        let row = sqlx::query_as::<_, WarehouseRow>(&format!(
            "SELECT {} FROM warehouse_items WHERE id = $1",
            ITEM_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.map(WarehouseItem::try_from).transpose()
    }

    async fn list_by_reseller(&self, reseller_id: Uuid) -> CoreResult<Vec<WarehouseItem>> {
        let rows = sqlx::query_as::<_, WarehouseRow>(&format!(
            "SELECT {} FROM warehouse_items WHERE reseller_id = $1 ORDER BY created_at DESC",
            ITEM_COLUMNS
        ))
        .bind(reseller_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        into_items(rows)
    }

    async fn list_by_bundle(&self, bundle_id: Uuid) -> CoreResult<Vec<WarehouseItem>> {
        let rows = sqlx::query_as::<_, WarehouseRow>(&format!(
            "SELECT {} FROM warehouse_items WHERE bundle_id = $1 ORDER BY created_at DESC",
            ITEM_COLUMNS
        ))
        .bind(bundle_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        into_items(rows)
    }

    async fn list_pending_before(&self, cutoff: DateTime<Utc>) -> CoreResult<Vec<WarehouseItem>> {
        let rows = sqlx::query_as::<_, WarehouseRow>(&format!(
            "SELECT {} FROM warehouse_items WHERE status = $1 AND created_at < $2",
            ITEM_COLUMNS
        ))
        .bind(WarehouseStatus::Pending.as_str())
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        into_items(rows)
    }

    async fn update_status(&self, id: Uuid, expected: WarehouseStatus, status: WarehouseStatus) -> CoreResult<bool> {
        let result = sqlx::query("UPDATE warehouse_items SET status = $1 WHERE id = $2 AND status = $3")
            .bind(status.as_str())
            .bind(id)
            .bind(expected.as_str())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete_item(&self, id: Uuid) -> CoreResult<bool> {
        let result = sqlx::query("DELETE FROM warehouse_items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() == 1)
    }

    async fn has_reseller_received_bundle(&self, reseller_id: Uuid, bundle_id: Uuid) -> CoreResult<bool> {
        sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM warehouse_items WHERE reseller_id = $1 AND bundle_id = $2 AND status = $3)",
        )
        .bind(reseller_id)
        .bind(bundle_id)
        .bind(WarehouseStatus::Listed.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn count_by_status(&self, status: WarehouseStatus) -> CoreResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM warehouse_items WHERE status = $1")
            .bind(status.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)
    }
}
