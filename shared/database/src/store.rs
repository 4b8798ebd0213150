//! The catalog/storage seam consumed by the BOM engine.
//!
//! Every backend (in-memory for tests and local runs, PostgreSQL for
//! production) implements [`CatalogStore`]. Uniqueness of item codes, BOM codes
//! and the (item, variant set) pair is enforced here and nowhere else.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use bomforge_models::{AttributeDefinition, BomDocument, BomSummary, Item, NewBom, NewItem};

pub const ITEM_ENTITY: &str = "item";
pub const BOM_ENTITY: &str = "bom";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("{entity} code '{code}' already exists")]
    DuplicateCode { entity: String, code: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

impl StoreError {
    pub fn duplicate_code(entity: &str, code: impl Into<String>) -> Self {
        Self::DuplicateCode {
            entity: entity.to_string(),
            code: code.into(),
        }
    }

    pub fn is_duplicate_code(&self) -> bool {
        matches!(self, Self::DuplicateCode { .. })
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Read access to items and attributes, create access to items and BOMs.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn create_item(&self, item: NewItem) -> StoreResult<Item>;

    async fn get_items(&self) -> StoreResult<Vec<Item>>;

    async fn get_attributes(&self) -> StoreResult<Vec<AttributeDefinition>>;

    async fn create_attribute(&self, attribute: AttributeDefinition) -> StoreResult<AttributeDefinition>;

    /// The slice of every persisted BOM needed for code probing and the
    /// automator's "already has a recipe" check.
    async fn get_existing_boms(&self) -> StoreResult<Vec<BomSummary>>;

    async fn create_bom(&self, bom: NewBom) -> StoreResult<BomDocument>;

    async fn get_boms(&self) -> StoreResult<Vec<BomDocument>>;

    async fn get_bom(&self, id: Uuid) -> StoreResult<Option<BomDocument>>;

    async fn health_check(&self) -> StoreResult<()>;
}

/// Canonical, order-insensitive key for a variant value set.
pub fn variant_key(value_ids: &[Uuid]) -> String {
    let mut ids: Vec<String> = value_ids.iter().map(Uuid::to_string).collect();
    ids.sort();
    ids.dedup();
    ids.join(",")
}
