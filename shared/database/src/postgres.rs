use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use std::time::Duration;
use uuid::Uuid;

use bomforge_models::{AttributeDefinition, BomDocument, BomSummary, Item, NewBom, NewItem};

use crate::repositories::{database_error, AttributeRepository, BomRepository, ItemRepository};
use crate::store::{CatalogStore, StoreResult};

pub type PostgresPool = Pool<Postgres>;

pub async fn create_postgres_pool(
    database_url: &str,
    max_connections: u32,
    connection_timeout: Duration,
) -> Result<PostgresPool> {
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(connection_timeout)
        .connect(database_url)
        .await?;

    tracing::info!("Connected to PostgreSQL database");
    Ok(pool)
}

pub async fn health_check(pool: &PostgresPool) -> Result<()> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// PostgreSQL-backed catalog store.
pub struct PgCatalogStore {
    pool: PostgresPool,
    items: ItemRepository,
    attributes: AttributeRepository,
    boms: BomRepository,
}

impl PgCatalogStore {
    pub fn new(pool: PostgresPool) -> Self {
        Self {
            items: ItemRepository::new(pool.clone()),
            attributes: AttributeRepository::new(pool.clone()),
            boms: BomRepository::new(pool.clone()),
            pool,
        }
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn create_item(&self, item: NewItem) -> StoreResult<Item> {
        self.items.create(item).await
    }

    async fn get_items(&self) -> StoreResult<Vec<Item>> {
        self.items.find_all().await
    }

    async fn get_attributes(&self) -> StoreResult<Vec<AttributeDefinition>> {
        self.attributes.find_all().await
    }

    async fn create_attribute(&self, attribute: AttributeDefinition) -> StoreResult<AttributeDefinition> {
        self.attributes.create(attribute).await
    }

    async fn get_existing_boms(&self) -> StoreResult<Vec<BomSummary>> {
        self.boms.summaries().await
    }

    async fn create_bom(&self, bom: NewBom) -> StoreResult<BomDocument> {
        self.boms.create(bom).await
    }

    async fn get_boms(&self) -> StoreResult<Vec<BomDocument>> {
        self.boms.find_all().await
    }

    async fn get_bom(&self, id: Uuid) -> StoreResult<Option<BomDocument>> {
        self.boms.find_by_id(id).await
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(database_error)?;
        Ok(())
    }
}
