//! Requirement explosion.
//!
//! Walks a recipe top-down, scaling every line by its parent's requirement and
//! its owning node's tolerance. The same walk serves readiness checks and the
//! printed materials list. Quantities stay unrounded throughout.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bomforge_database::CatalogStore;
use bomforge_models::{
    matches_variant_set, BomDocument, BomNode, Item, MaterialsRow, QuantityMode, ReadinessReport, Recipe,
    Requirement, Shortage, StockBalance,
};

use crate::error::{BomForgeError, BomForgeResult};
use crate::validation::validate_production_quantity;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Required quantity of one line: scale by the parent requirement, then apply
/// the owning node's tolerance once. Results beyond `Decimal`'s range are
/// rejected rather than wrapped.
pub fn explode_line(
    parent_required: Decimal,
    quantity: Decimal,
    mode: QuantityMode,
    tolerance_percentage: Decimal,
) -> BomForgeResult<Decimal> {
    let scaled = match mode {
        QuantityMode::Percentage => parent_required
            .checked_mul(quantity)
            .and_then(|q| q.checked_div(HUNDRED)),
        QuantityMode::Fixed => parent_required.checked_mul(quantity),
    };
    scaled
        .zip(tolerance_percentage.checked_div(HUNDRED))
        .and_then(|(scaled, tolerance)| Decimal::ONE.checked_add(tolerance).and_then(|f| scaled.checked_mul(f)))
        .ok_or_else(quantity_overflow)
}

fn quantity_overflow() -> BomForgeError {
    BomForgeError::validation("quantity", "Required quantity exceeds the representable range")
}

fn add_quantity(total: Decimal, more: Decimal) -> BomForgeResult<Decimal> {
    total.checked_add(more).ok_or_else(quantity_overflow)
}

/// Persisted items and BOM documents, indexed for explosion.
#[derive(Debug, Clone, Default)]
pub struct BomBook {
    items: HashMap<Uuid, Item>,
    boms: HashMap<Uuid, BomDocument>,
}

impl BomBook {
    pub fn new(items: Vec<Item>, boms: Vec<BomDocument>) -> Self {
        Self {
            items: items.into_iter().map(|i| (i.id, i)).collect(),
            boms: boms.into_iter().map(|b| (b.id, b)).collect(),
        }
    }

    pub async fn load(store: &dyn CatalogStore) -> BomForgeResult<Self> {
        let items = store.get_items().await?;
        let boms = store.get_boms().await?;
        Ok(Self::new(items, boms))
    }

    pub fn bom(&self, id: &Uuid) -> Option<&BomDocument> {
        self.boms.get(id)
    }

    pub fn item(&self, id: &Uuid) -> Option<&Item> {
        self.items.get(id)
    }

    pub fn item_by_code(&self, code: &str) -> Option<&Item> {
        self.items.values().find(|i| i.code == code)
    }

    /// Recipe for a component: the BOM for exactly this variant set, else the
    /// component's unvaried BOM.
    pub fn recipe_for(&self, item_id: &Uuid, variant_value_ids: &[Uuid]) -> Option<&BomDocument> {
        let candidates = || self.boms.values().filter(move |b| &b.item_id == item_id && b.active);
        candidates()
            .find(|b| matches_variant_set(&b.variant_value_ids, variant_value_ids))
            .or_else(|| candidates().find(|b| b.variant_value_ids.is_empty()))
    }
}

/// Every row of the expanded tree plus the aggregated leaf requirements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explosion {
    pub root_code: String,
    pub quantity: Decimal,
    pub rows: Vec<MaterialsRow>,
    pub requirements: Vec<Requirement>,
}

#[derive(Default)]
struct Collector {
    rows: Vec<MaterialsRow>,
    requirements: Vec<Requirement>,
}

impl Collector {
    fn add_requirement(&mut self, requirement: Requirement) -> BomForgeResult<()> {
        match self.requirements.iter_mut().find(|r| r.same_bucket(&requirement)) {
            Some(existing) => {
                existing.required_quantity = add_quantity(existing.required_quantity, requirement.required_quantity)?
            }
            None => self.requirements.push(requirement),
        }
        Ok(())
    }

    fn finish(self, root_code: &str, quantity: Decimal) -> Explosion {
        Explosion {
            root_code: root_code.to_string(),
            quantity,
            rows: self.rows,
            requirements: self.requirements,
        }
    }
}

pub struct ExplosionEngine<'a> {
    book: &'a BomBook,
}

impl<'a> ExplosionEngine<'a> {
    pub fn new(book: &'a BomBook) -> Self {
        Self { book }
    }

    /// Explode a persisted BOM for a total production quantity.
    pub fn explode(&self, bom_id: Uuid, quantity: Decimal) -> BomForgeResult<Explosion> {
        let bom = self
            .book
            .bom(&bom_id)
            .ok_or_else(|| BomForgeError::not_found(format!("BOM {}", bom_id)))?;
        self.explode_document(bom, quantity)
    }

    pub fn explode_document(&self, bom: &BomDocument, quantity: Decimal) -> BomForgeResult<Explosion> {
        validate_production_quantity(quantity)?;
        let mut out = Collector::default();
        let mut stack = Vec::new();
        self.walk_document(bom, quantity, 1, &mut stack, &mut out)?;

        tracing::debug!(
            bom_code = %bom.code,
            %quantity,
            rows = out.rows.len(),
            requirements = out.requirements.len(),
            "BOM exploded"
        );
        Ok(out.finish(&bom.code, quantity))
    }

    /// Explode an unsaved draft. Items are matched by code; lines without a
    /// nested draft still descend into any persisted recipe for their component.
    pub fn explode_draft(&self, root: &BomNode, quantity: Decimal) -> BomForgeResult<Explosion> {
        validate_production_quantity(quantity)?;
        let mut out = Collector::default();
        let mut stack = Vec::new();
        self.walk_node(root, quantity, 1, &mut stack, &mut out)?;
        Ok(out.finish(&root.code, quantity))
    }

    fn walk_document(
        &self,
        bom: &BomDocument,
        parent_required: Decimal,
        depth: usize,
        stack: &mut Vec<Uuid>,
        out: &mut Collector,
    ) -> BomForgeResult<()> {
        stack.push(bom.id);

        for line in &bom.lines {
            let required = explode_line(parent_required, line.quantity, line.mode, bom.tolerance_percentage)?;
            let item_code = self
                .book
                .item(&line.item_id)
                .map(|i| i.code.clone())
                .unwrap_or_else(|| line.item_id.to_string());
            let sub = self.book.recipe_for(&line.item_id, &line.variant_value_ids);

            out.rows.push(MaterialsRow {
                depth,
                item_id: Some(line.item_id),
                item_code: item_code.clone(),
                variant_value_ids: line.variant_value_ids.clone(),
                location_id: line.source_location_id,
                line_quantity: line.quantity,
                mode: line.mode,
                required_quantity: required,
                recipe_code: sub.map(|s| s.code.clone()),
            });

            match sub {
                Some(sub) => self.descend(sub, required, depth + 1, stack, out)?,
                None => out.add_requirement(Requirement {
                    item_id: Some(line.item_id),
                    item_code,
                    variant_value_ids: line.variant_value_ids.clone(),
                    location_id: line.source_location_id,
                    required_quantity: required,
                })?,
            }
        }

        stack.pop();
        Ok(())
    }

    fn descend(
        &self,
        sub: &BomDocument,
        required: Decimal,
        depth: usize,
        stack: &mut Vec<Uuid>,
        out: &mut Collector,
    ) -> BomForgeResult<()> {
        if stack.contains(&sub.id) {
            tracing::warn!(bom_code = %sub.code, "Recipe cycle detected during explosion");
            return Err(BomForgeError::cycle_detected(&sub.code));
        }
        self.walk_document(sub, required, depth, stack, out)
    }

    fn walk_node(
        &self,
        node: &BomNode,
        parent_required: Decimal,
        depth: usize,
        stack: &mut Vec<Uuid>,
        out: &mut Collector,
    ) -> BomForgeResult<()> {
        for line in &node.lines {
            let required = explode_line(parent_required, line.quantity, line.mode, node.tolerance_percentage)?;
            let item_id = self.book.item_by_code(&line.item_code).map(|i| i.id);
            let variant_value_ids = line.selection.value_ids();

            let mut row = MaterialsRow {
                depth,
                item_id,
                item_code: line.item_code.clone(),
                variant_value_ids: variant_value_ids.clone(),
                location_id: line.source_location_id,
                line_quantity: line.quantity,
                mode: line.mode,
                required_quantity: required,
                recipe_code: None,
            };

            match &line.recipe {
                Some(Recipe::Draft(child)) => {
                    row.recipe_code = Some(child.code.clone());
                    out.rows.push(row);
                    self.walk_node(child, required, depth + 1, stack, out)?;
                }
                Some(Recipe::Existing { bom_id, code }) => {
                    let sub = self
                        .book
                        .bom(bom_id)
                        .ok_or_else(|| BomForgeError::not_found(format!("BOM {}", code)))?;
                    row.recipe_code = Some(sub.code.clone());
                    out.rows.push(row);
                    self.descend(sub, required, depth + 1, stack, out)?;
                }
                None => {
                    let sub = item_id.and_then(|id| self.book.recipe_for(&id, &variant_value_ids));
                    row.recipe_code = sub.map(|s| s.code.clone());
                    out.rows.push(row);
                    match sub {
                        Some(sub) => self.descend(sub, required, depth + 1, stack, out)?,
                        None => out.add_requirement(Requirement {
                            item_id,
                            item_code: line.item_code.clone(),
                            variant_value_ids,
                            location_id: line.source_location_id,
                            required_quantity: required,
                        })?,
                    }
                }
            }
        }
        Ok(())
    }
}

/// Compare leaf requirements with on-hand stock per (item, exact variant set,
/// location). Requirements without a source override draw from
/// `default_location`; with neither, stock at every location counts.
pub fn check_readiness(
    requirements: &[Requirement],
    balances: &[StockBalance],
    default_location: Option<Uuid>,
) -> BomForgeResult<ReadinessReport> {
    let mut buckets: Vec<Requirement> = Vec::new();
    for requirement in requirements {
        let mut requirement = requirement.clone();
        requirement.location_id = requirement.location_id.or(default_location);
        match buckets.iter_mut().find(|b| b.same_bucket(&requirement)) {
            Some(bucket) => {
                bucket.required_quantity = add_quantity(bucket.required_quantity, requirement.required_quantity)?
            }
            None => buckets.push(requirement),
        }
    }

    let mut shortages = Vec::new();
    for requirement in &buckets {
        let available = match requirement.item_id {
            Some(item_id) => balances
                .iter()
                .filter(|b| b.item_id == item_id)
                .filter(|b| requirement.location_id.map_or(true, |loc| b.location_id == loc))
                .filter(|b| matches_variant_set(&b.variant_value_ids, &requirement.variant_value_ids))
                .try_fold(Decimal::ZERO, |total, b| add_quantity(total, b.quantity))?,
            None => Decimal::ZERO,
        };

        if available < requirement.required_quantity {
            shortages.push(Shortage {
                item_id: requirement.item_id,
                item_code: requirement.item_code.clone(),
                location_id: requirement.location_id,
                variant_value_ids: requirement.variant_value_ids.clone(),
                required: requirement.required_quantity,
                available,
            });
        }
    }

    Ok(ReadinessReport {
        ready: shortages.is_empty(),
        checked: buckets.len(),
        shortages,
    })
}
