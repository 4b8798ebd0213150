//! Item Repository
//!
//! Create and read operations for catalog items.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use bomforge_models::{Item, NewItem};

use super::{database_error, map_sqlx_error};
use crate::store::{StoreResult, ITEM_ENTITY};

pub struct ItemRepository {
    pool: PgPool,
}

impl ItemRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find all items
    pub async fn find_all(&self) -> StoreResult<Vec<Item>> {
        let rows: Vec<ItemRow> = sqlx::query_as(
            r#"
            SELECT id, code, name, uom, category, attribute_ids,
                   source_sample_id, active, created_at
            FROM items
            ORDER BY code
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(rows.into_iter().map(Item::from).collect())
    }

    /// Find item by code
    pub async fn find_by_code(&self, code: &str) -> StoreResult<Option<Item>> {
        let row: Option<ItemRow> = sqlx::query_as(
            r#"
            SELECT id, code, name, uom, category, attribute_ids,
                   source_sample_id, active, created_at
            FROM items
            WHERE code = $1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(row.map(Item::from))
    }

    /// Create new item; a taken code surfaces as `DuplicateCode`
    pub async fn create(&self, item: NewItem) -> StoreResult<Item> {
        let code = item.code.clone();
        let item = item.into_item();

        let row: ItemRow = sqlx::query_as(
            r#"
            INSERT INTO items
                (id, code, name, uom, category, attribute_ids,
                 source_sample_id, active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, code, name, uom, category, attribute_ids,
                      source_sample_id, active, created_at
            "#,
        )
        .bind(item.id)
        .bind(&item.code)
        .bind(&item.name)
        .bind(&item.uom)
        .bind(&item.category)
        .bind(&item.attribute_ids)
        .bind(item.source_sample_id)
        .bind(item.active)
        .bind(item.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(e, ITEM_ENTITY, &code))?;

        Ok(row.into())
    }
}

#[derive(Debug, FromRow)]
struct ItemRow {
    id: Uuid,
    code: String,
    name: String,
    uom: String,
    category: Option<String>,
    attribute_ids: Vec<Uuid>,
    source_sample_id: Option<Uuid>,
    active: bool,
    created_at: DateTime<Utc>,
}

impl From<ItemRow> for Item {
    fn from(row: ItemRow) -> Self {
        Self {
            id: row.id,
            code: row.code,
            name: row.name,
            uom: row.uom,
            category: row.category,
            attribute_ids: row.attribute_ids,
            source_sample_id: row.source_sample_id,
            active: row.active,
            created_at: row.created_at,
        }
    }
}
