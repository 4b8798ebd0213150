//! Explosion output and readiness types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bom::QuantityMode;

/// Absolute quantity of one component needed from one location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Requirement {
    pub item_id: Option<Uuid>,
    pub item_code: String,
    pub variant_value_ids: Vec<Uuid>,
    pub location_id: Option<Uuid>,
    pub required_quantity: Decimal,
}

impl Requirement {
    /// Rows with the same component, variant set and location are summed.
    pub fn same_bucket(&self, other: &Requirement) -> bool {
        self.item_code == other.item_code
            && self.location_id == other.location_id
            && matches_variant_set(&self.variant_value_ids, &other.variant_value_ids)
    }
}

/// One printed row of a fully expanded materials list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MaterialsRow {
    /// 1 for the root's own lines.
    pub depth: usize,
    pub item_id: Option<Uuid>,
    pub item_code: String,
    pub variant_value_ids: Vec<Uuid>,
    pub location_id: Option<Uuid>,
    pub line_quantity: Decimal,
    pub mode: QuantityMode,
    pub required_quantity: Decimal,
    /// Code of the recipe the component is exploded through, if any.
    pub recipe_code: Option<String>,
}

/// On-hand stock for one item/variant at one location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockBalance {
    pub item_id: Uuid,
    pub location_id: Uuid,
    #[serde(default)]
    pub variant_value_ids: Vec<Uuid>,
    pub quantity: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Shortage {
    pub item_id: Option<Uuid>,
    pub item_code: String,
    pub location_id: Option<Uuid>,
    pub variant_value_ids: Vec<Uuid>,
    pub required: Decimal,
    pub available: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReadinessReport {
    pub ready: bool,
    pub checked: usize,
    pub shortages: Vec<Shortage>,
}

/// Exact, order-insensitive variant-set match used for stock lookups.
pub fn matches_variant_set(a: &[Uuid], b: &[Uuid]) -> bool {
    a.len() == b.len() && a.iter().all(|id| b.contains(id))
}
