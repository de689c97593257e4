use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use revive_core::repository::{
    CartClearing, CartRepository, CheckoutCommit, CheckoutUnitOfWork, ListingRepository, UnpackUnitOfWork,
};
use revive_core::{CoreError, CoreResult};
use revive_shared::models::{CartItem, Listing, ListingStatus, UnavailableItem};

use crate::db_err;
use crate::order_repo::{insert_order, insert_payment};

/// Carts, the listings they point at, and the unpack and checkout transactions.
pub struct StoreCartRepository {
    pool: PgPool,
}

impl StoreCartRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const CART_COLUMNS: &str = "id, user_id, listing_id, title, price_cents, image_url, grade, created_at";

const LISTING_COLUMNS: &str = "id, reseller_id, supplier_id, bundle_id, title, description, size, kind, grade, \
     price_cents, image_url, rating, status, created_at";

#[derive(sqlx::FromRow)]
struct CartRow {
    id: Uuid,
    user_id: Uuid,
    listing_id: Uuid,
    title: String,
    price_cents: i64,
    image_url: String,
    grade: String,
    created_at: DateTime<Utc>,
}

impl From<CartRow> for CartItem {
    fn from(row: CartRow) -> Self {
        CartItem {
            id: row.id,
            user_id: row.user_id,
            listing_id: row.listing_id,
            title: row.title,
            price_cents: row.price_cents,
            image_url: row.image_url,
            grade: row.grade,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ListingRow {
    id: Uuid,
    reseller_id: Uuid,
    supplier_id: Uuid,
    bundle_id: Uuid,
    title: String,
    description: String,
    size: String,
    kind: String,
    grade: String,
    price_cents: i64,
    image_url: String,
    rating: f64,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<ListingRow> for Listing {
    type Error = CoreError;

    fn try_from(row: ListingRow) -> Result<Self, Self::Error> {
        Ok(Listing {
            id: row.id,
            reseller_id: row.reseller_id,
            supplier_id: row.supplier_id,
            bundle_id: row.bundle_id,
            title: row.title,
            description: row.description,
            size: row.size,
            kind: row.kind,
            grade: row.grade,
            price_cents: row.price_cents,
            image_url: row.image_url,
            rating: row.rating,
            status: row.status.parse()?,
            created_at: row.created_at,
        })
    }
}

async fn insert_listing(conn: &mut PgConnection, listing: &Listing) -> CoreResult<()> {
    sqlx::query(&format!(
        "INSERT INTO listings ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        LISTING_COLUMNS
    ))
    .bind(listing.id)
    .bind(listing.reseller_id)
    .bind(listing.supplier_id)
    .bind(listing.bundle_id)
    .bind(&listing.title)
    .bind(&listing.description)
    .bind(&listing.size)
    .bind(&listing.kind)
    .bind(&listing.grade)
    .bind(listing.price_cents)
    .bind(&listing.image_url)
    .bind(listing.rating)
    .bind(listing.status.as_str())
    .bind(listing.created_at)
    .execute(conn)
    .await
    .map_err(db_err)?;
    Ok(())
}

#[async_trait]
impl CartRepository for StoreCartRepository {
    async fn create_item(&self, item: &CartItem) -> CoreResult<()> {
        sqlx::query(&format!("INSERT INTO cart_items ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)", CART_COLUMNS))
            .bind(item.id)
            .bind(item.user_id)
            .bind(item.listing_id)
            .bind(&item.title)
            .bind(item.price_cents)
            .bind(&item.image_url)
            .bind(&item.grade)
            .bind(item.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| match db_err(e) {
                CoreError::Conflict(_) => CoreError::Conflict("item already in cart".to_string()),
                other => other,
            })?;
        Ok(())
    }

    async fn list_by_user(&self, user_id: Uuid) -> CoreResult<Vec<CartItem>> {
        let rows = sqlx::query_as::<_, CartRow>(&format!(
            "SELECT {} FROM cart_items WHERE user_id = $1 ORDER BY created_at ASC",
            CART_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rows.into_iter().map(CartItem::from).collect())
    }

    async fn delete_item(&self, user_id: Uuid, listing_id: Uuid) -> CoreResult<bool> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND listing_id = $2")
            .bind(user_id)
            .bind(listing_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ListingRepository for StoreCartRepository {
    async fn create_listing(&self, listing: &Listing) -> CoreResult<()> {
        let mut conn = self.pool.acquire().await.map_err(db_err)?;
        insert_listing(&mut conn, listing).await
    }

    async fn get_listing(&self, id: Uuid) -> CoreResult<Option<Listing>> {
        let row = sqlx::query_as::<_, ListingRow>(&format!("SELECT {} FROM listings WHERE id = $1", LISTING_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.map(Listing::try_from).transpose()
    }

    async fn list_by_reseller(&self, reseller_id: Uuid) -> CoreResult<Vec<Listing>> {
        let rows = sqlx::query_as::<_, ListingRow>(&format!(
            "SELECT {} FROM listings WHERE reseller_id = $1 ORDER BY created_at DESC",
            LISTING_COLUMNS
        ))
        .bind(reseller_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(Listing::try_from).collect()
    }
}

#[async_trait]
impl UnpackUnitOfWork for StoreCartRepository {
    async fn commit_unpack(&self, listing: &Listing) -> CoreResult<Option<i32>> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let remaining: Option<i32> = sqlx::query_scalar(
            "UPDATE bundles SET remaining_item_count = remaining_item_count - 1 \
             WHERE id = $1 AND remaining_item_count > 0 RETURNING remaining_item_count",
        )
        .bind(listing.bundle_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?;
        let Some(remaining) = remaining else {
            tx.rollback().await.map_err(db_err)?;
            return Ok(None);
        };

        insert_listing(&mut tx, listing).await?;
        tx.commit().await.map_err(db_err)?;
        Ok(Some(remaining))
    }
}

#[async_trait]
impl CheckoutUnitOfWork for StoreCartRepository {
    async fn commit_checkout(&self, commit: &CheckoutCommit) -> CoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let listing_ids: Vec<Uuid> = commit.lines.iter().map(|line| line.listing_id).collect();
        let sold: Vec<Uuid> = sqlx::query_scalar(
            "UPDATE listings SET status = $1 WHERE id = ANY($2) AND status = $3 RETURNING id",
        )
        .bind(ListingStatus::Sold.as_str())
        .bind(&listing_ids)
        .bind(ListingStatus::Available.as_str())
        .fetch_all(&mut *tx)
        .await
        .map_err(db_err)?;

        if sold.len() != listing_ids.len() {
            let unavailable = commit
                .lines
                .iter()
                .filter(|line| !sold.contains(&line.listing_id))
                .map(|line| UnavailableItem {
                    listing_id: line.listing_id,
                    title: line.title.clone(),
                    reason: "sold before checkout completed".to_string(),
                })
                .collect();
            tx.rollback().await.map_err(db_err)?;
            return Err(CoreError::CheckoutRejected { unavailable });
        }

        for payment in &commit.payments {
            insert_payment(&mut tx, payment).await?;
        }
        for order in &commit.orders {
            insert_order(&mut tx, order).await?;
        }

        match commit.clearing {
            CartClearing::WholeCart => {
                sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
                    .bind(commit.user_id)
                    .execute(&mut *tx)
                    .await
                    .map_err(db_err)?;
            }
            CartClearing::SingleListing(listing_id) => {
                sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND listing_id = $2")
                    .bind(commit.user_id)
                    .bind(listing_id)
                    .execute(&mut *tx)
                    .await
                    .map_err(db_err)?;
            }
        }

        tx.commit().await.map_err(db_err)
    }
}
