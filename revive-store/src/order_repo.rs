use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;
use tracing::debug;

use revive_core::repository::{
    OrderRepository, PaymentRepository, PlatformTotals, PurchaseCommit, PurchaseUnitOfWork,
};
use revive_core::{CoreError, CoreResult};
use revive_shared::models::{
    BundleStatus, Order, OrderStatus, Payment, PaymentStatus, PaymentType, WarehouseItem,
};

use crate::db_err;

/// Orders, payments and the bundle purchase transaction.
pub struct StoreOrderRepository {
    pool: PgPool,
}

impl StoreOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const ORDER_COLUMNS: &str = "id, buyer_id, seller_id, bundle_id, product_ids, total_price_cents, \
     platform_fee_cents, status, created_at, updated_at";

const PAYMENT_COLUMNS: &str = "id, payer_id, payee_id, amount_cents, platform_fee_cents, seller_earning_cents, \
     reference_id, payment_type, status, charge_id, created_at";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    buyer_id: Uuid,
    seller_id: Uuid,
    bundle_id: Option<Uuid>,
    product_ids: Vec<Uuid>,
    total_price_cents: i64,
    platform_fee_cents: i64,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = CoreError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Order {
            id: row.id,
            buyer_id: row.buyer_id,
            seller_id: row.seller_id,
            bundle_id: row.bundle_id,
            product_ids: row.product_ids,
            total_price_cents: row.total_price_cents,
            platform_fee_cents: row.platform_fee_cents,
            status: row.status.parse()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    payer_id: Uuid,
    payee_id: Uuid,
    amount_cents: i64,
    platform_fee_cents: i64,
    seller_earning_cents: i64,
    reference_id: Uuid,
    payment_type: String,
    status: String,
    charge_id: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = CoreError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        Ok(Payment {
            id: row.id,
            payer_id: row.payer_id,
            payee_id: row.payee_id,
            amount_cents: row.amount_cents,
            platform_fee_cents: row.platform_fee_cents,
            seller_earning_cents: row.seller_earning_cents,
            reference_id: row.reference_id,
            payment_type: row.payment_type.parse()?,
            status: row.status.parse()?,
            charge_id: row.charge_id,
            created_at: row.created_at,
        })
    }
}

pub(crate) async fn insert_order(tx: &mut Transaction<'_, Postgres>, order: &Order) -> CoreResult<()> {
    sqlx::query(&format!(
        "INSERT INTO orders ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        ORDER_COLUMNS
    ))
    .bind(order.id)
    .bind(order.buyer_id)
    .bind(order.seller_id)
    .bind(order.bundle_id)
    .bind(&order.product_ids)
    .bind(order.total_price_cents)
    .bind(order.platform_fee_cents)
    .bind(order.status.as_str())
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut **tx)
    .await
    .map_err(db_err)?;
    Ok(())
}

pub(crate) async fn insert_payment(tx: &mut Transaction<'_, Postgres>, payment: &Payment) -> CoreResult<()> {
    sqlx::query(&format!(
        "INSERT INTO payments ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        PAYMENT_COLUMNS
    ))
    .bind(payment.id)
    .bind(payment.payer_id)
    .bind(payment.payee_id)
    .bind(payment.amount_cents)
    .bind(payment.platform_fee_cents)
    .bind(payment.seller_earning_cents)
    .bind(payment.reference_id)
    .bind(payment.payment_type.as_str())
    .bind(payment.status.as_str())
    .bind(&payment.charge_id)
    .bind(payment.created_at)
    .execute(&mut **tx)
    .await
    .map_err(db_err)?;
    Ok(())
}

async fn insert_warehouse_item(tx: &mut Transaction<'_, Postgres>, item: &WarehouseItem) -> CoreResult<()> {
    sqlx::query(
        "INSERT INTO warehouse_items (id, reseller_id, bundle_id, product_id, status, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(item.id)
    .bind(item.reseller_id)
    .bind(item.bundle_id)
    .bind(item.product_id)
    .bind(item.status.as_str())
    .bind(item.created_at)
    .execute(&mut **tx)
    .await
    .map_err(db_err)?;
    Ok(())
}

impl StoreOrderRepository {
    async fn fetch_orders(&self, filter: &str, user_id: Uuid) -> CoreResult<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {} FROM orders WHERE {} ORDER BY created_at DESC",
            ORDER_COLUMNS, filter
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(Order::try_from).collect()
    }
}

#[async_trait]
impl OrderRepository for StoreOrderRepository {
    async fn create_order(&self, order: &Order) -> CoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        insert_order(&mut tx, order).await?;
        tx.commit().await.map_err(db_err)
    }

    async fn get_order(&self, id: Uuid) -> CoreResult<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(&format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.map(Order::try_from).transpose()
    }

    async fn list_by_consumer(&self, consumer_id: Uuid) -> CoreResult<Vec<Order>> {
        self.fetch_orders("buyer_id = $1", consumer_id).await
    }

    async fn list_by_supplier(&self, supplier_id: Uuid) -> CoreResult<Vec<Order>> {
        self.fetch_orders("seller_id = $1", supplier_id).await
    }

    async fn list_by_reseller(&self, reseller_id: Uuid) -> CoreResult<Vec<Order>> {
        self.fetch_orders("buyer_id = $1 OR seller_id = $1", reseller_id).await
    }

    async fn update_status(&self, id: Uuid, expected: OrderStatus, status: OrderStatus) -> CoreResult<bool> {
        let result = sqlx::query("UPDATE orders SET status = $1, updated_at = NOW() WHERE id = $2 AND status = $3")
            .bind(status.as_str())
            .bind(id)
            .bind(expected.as_str())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete_order(&self, id: Uuid) -> CoreResult<bool> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl PaymentRepository for StoreOrderRepository {
    async fn record_payment(&self, payment: &Payment) -> CoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        insert_payment(&mut tx, payment).await?;
        tx.commit().await.map_err(db_err)
    }

    async fn list_by_user(&self, user_id: Uuid) -> CoreResult<Vec<Payment>> {
        let rows = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {} FROM payments WHERE payer_id = $1 OR payee_id = $1 ORDER BY created_at DESC",
            PAYMENT_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(Payment::try_from).collect()
    }

    async fn list_by_type(&self, user_id: Uuid, payment_type: PaymentType) -> CoreResult<Vec<Payment>> {
        let rows = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {} FROM payments WHERE (payer_id = $1 OR payee_id = $1) AND payment_type = $2 \
             ORDER BY created_at DESC",
            PAYMENT_COLUMNS
        ))
        .bind(user_id)
        .bind(payment_type.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(Payment::try_from).collect()
    }

    async fn platform_totals(&self) -> CoreResult<PlatformTotals> {
        let (total_sales_cents, total_fees_cents): (i64, i64) = sqlx::query_as(
            "SELECT COALESCE(SUM(amount_cents), 0)::BIGINT, COALESCE(SUM(platform_fee_cents), 0)::BIGINT \
             FROM payments WHERE status = $1",
        )
        .bind(PaymentStatus::Paid.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(PlatformTotals { total_sales_cents, total_fees_cents })
    }
}

#[async_trait]
impl PurchaseUnitOfWork for StoreOrderRepository {
    async fn commit_purchase(&self, commit: &PurchaseCommit) -> CoreResult<Order> {
        let item = &commit.warehouse_item;
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        insert_order(&mut tx, &commit.order).await?;
        insert_payment(&mut tx, &commit.payment).await?;

        let claimed = sqlx::query(
            "UPDATE bundles SET status = $1, reseller_id = $2 WHERE id = $3 AND status = $4",
        )
        .bind(BundleStatus::Purchased.as_str())
        .bind(item.reseller_id)
        .bind(item.bundle_id)
        .bind(BundleStatus::Available.as_str())
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
        if claimed.rows_affected() != 1 {
            // Dropping the transaction rolls back the order and payment rows.
            debug!("Bundle {} was claimed by a concurrent purchase", item.bundle_id);
            return Err(CoreError::Conflict("bundle not available".to_string()));
        }

        insert_warehouse_item(&mut tx, item).await?;

        let mut order = commit.order.clone();
        order.update_status(OrderStatus::Completed);
        sqlx::query("UPDATE orders SET status = $1, updated_at = $2 WHERE id = $3")
            .bind(order.status.as_str())
            .bind(order.updated_at)
            .bind(order.id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(order)
    }
}
