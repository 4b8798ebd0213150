//! Repository module for database CRUD operations
//!
//! Provides typed repository implementations for the catalog entities the BOM
//! engine reads and writes.

pub mod attribute;
pub mod bom;
pub mod item;

pub use attribute::AttributeRepository;
pub use bom::BomRepository;
pub use item::ItemRepository;

use crate::store::StoreError;

/// Translate a sqlx failure into the storage error taxonomy.
///
/// Unique violations (SQLSTATE 23505) on a code column become `DuplicateCode`;
/// the (item, variant set) constraint becomes `Conflict`.
pub(crate) fn map_sqlx_error(err: sqlx::Error, entity: &str, code: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
            if db.constraint() == Some("boms_item_variant_key") {
                StoreError::Conflict(format!("a BOM already exists for this item and variant selection ({})", code))
            } else {
                StoreError::duplicate_code(entity, code)
            }
        }
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23503") => {
            StoreError::NotFound(format!("referenced record for {} '{}'", entity, code))
        }
        sqlx::Error::RowNotFound => StoreError::NotFound(format!("{} '{}'", entity, code)),
        sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            StoreError::Transport(err.to_string())
        }
        _ => StoreError::Database(err.to_string()),
    }
}

pub(crate) fn database_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            StoreError::Transport(err.to_string())
        }
        other => StoreError::Database(other.to_string()),
    }
}
