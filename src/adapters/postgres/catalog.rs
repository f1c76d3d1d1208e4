//! PostgreSQL implementations of the catalog ports.

use async_trait::async_trait;
use sqlx::PgPool;

use super::transaction::connection;
use crate::domain::catalog::{Brand, NewItem};
use crate::domain::foundation::{BrandId, DomainError, ErrorCode, ItemId, Timestamp};
use crate::ports::{BrandReader, ItemRepository, TxContext};

/// Reads brands straight from the pool.
#[derive(Clone)]
pub struct PostgresBrandReader {
    pool: PgPool,
}

impl PostgresBrandReader {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BrandReader for PostgresBrandReader {
    async fn find_by_id(&self, id: BrandId) -> Result<Option<Brand>, DomainError> {
        let row: Option<(i64, String)> = sqlx::query_as("SELECT id, name FROM brands WHERE id = $1")
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Failed to fetch brand: {}", e),
                )
            })?;

        Ok(row.map(|(id, name)| Brand {
            id: BrandId::new(id),
            name,
        }))
    }
}

/// Writes items and their image attachments inside the caller's transaction.
#[derive(Clone, Default)]
pub struct PostgresItemRepository;

impl PostgresItemRepository {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ItemRepository for PostgresItemRepository {
    async fn create(&self, ctx: &mut TxContext, item: &NewItem) -> Result<ItemId, DomainError> {
        let conn = connection(ctx, "items.create")?;
        let now = Timestamp::now();

        let price = i64::try_from(item.price)
            .map_err(|_| DomainError::validation("price", "Price is out of range"))?;

        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO items (brand_id, name, description, price, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(item.brand_id.as_i64())
        .bind(&item.name)
        .bind(&item.description)
        .bind(price)
        .bind(now.as_datetime())
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to insert item: {}", e),
            )
        })?;

        if !item.image_keys.is_empty() {
            sqlx::query(
                r#"
                INSERT INTO item_images (item_id, object_key, uploaded_at)
                SELECT $1, key, $3 FROM UNNEST($2::text[]) AS key
                "#,
            )
            .bind(id)
            .bind(&item.image_keys)
            .bind(now.as_datetime())
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Failed to attach item images: {}", e),
                )
            })?;
        }

        Ok(ItemId::new(id))
    }

    async fn is_image_attached(&self, ctx: &mut TxContext, object_key: &str) -> Result<bool, DomainError> {
        let conn = connection(ctx, "items.is_image_attached")?;

        let (attached,): (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM item_images WHERE object_key = $1)")
                .bind(object_key)
                .fetch_one(conn)
                .await
                .map_err(|e| {
                    DomainError::new(
                        ErrorCode::DatabaseError,
                        format!("Failed to look up item image: {}", e),
                    )
                })?;

        Ok(attached)
    }
}
