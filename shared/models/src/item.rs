//! Catalog item models.
//!
//! Items are owned by the catalog. The BOM engine only reads them, and creates
//! one when a draft references a component code that does not exist yet.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A stocked, produced, or purchased item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Item {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub uom: String,
    pub category: Option<String>,
    /// Attribute definitions bound to this item, in binding order.
    pub attribute_ids: Vec<Uuid>,
    /// Prototype (sample) item this one was derived from.
    pub source_sample_id: Option<Uuid>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Payload for `createItem`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct NewItem {
    #[validate(length(min = 1, max = 64, message = "Item code must be between 1 and 64 characters"))]
    pub code: String,
    #[validate(length(min = 1, max = 255, message = "Item name must be between 1 and 255 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 32, message = "Unit of measure must be between 1 and 32 characters"))]
    pub uom: String,
    #[validate(length(max = 64))]
    pub category: Option<String>,
    #[serde(default)]
    pub attribute_ids: Vec<Uuid>,
    pub source_sample_id: Option<Uuid>,
}

impl NewItem {
    pub fn new(code: impl Into<String>, name: impl Into<String>, uom: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            uom: uom.into(),
            category: None,
            attribute_ids: Vec::new(),
            source_sample_id: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_attributes(mut self, attribute_ids: Vec<Uuid>) -> Self {
        self.attribute_ids = attribute_ids;
        self
    }

    /// Materialize the payload the way a store does on insert.
    pub fn into_item(self) -> Item {
        Item {
            id: Uuid::new_v4(),
            code: self.code,
            name: self.name,
            uom: self.uom,
            category: self.category,
            attribute_ids: self.attribute_ids,
            source_sample_id: self.source_sample_id,
            active: true,
            created_at: Utc::now(),
        }
    }
}

impl Item {
    /// Whether the attribute definition is bound to this item.
    pub fn binds(&self, attribute_id: &Uuid) -> bool {
        self.attribute_ids.contains(attribute_id)
    }
}

/// Item fields a draft carries for components that may have to be created.
///
/// Anything left `None` is inherited from the draft's root item at save time.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ItemDefaults {
    pub name: Option<String>,
    pub uom: Option<String>,
    pub category: Option<String>,
    pub attribute_ids: Option<Vec<Uuid>>,
    pub source_sample_id: Option<Uuid>,
}

impl ItemDefaults {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.uom.is_none()
            && self.category.is_none()
            && self.attribute_ids.is_none()
            && self.source_sample_id.is_none()
    }
}
