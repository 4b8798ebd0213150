//! Read-only catalog snapshot.
//!
//! The engine works against one consistent view of items, attributes and BOM
//! summaries fetched up front; it only grows as the engine itself creates
//! records.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use bomforge_database::CatalogStore;
use bomforge_models::{AttributeDefinition, BomSummary, Item, VariantSelection};

use crate::error::BomForgeResult;

#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    items: Vec<Item>,
    attributes: Vec<AttributeDefinition>,
    boms: Vec<BomSummary>,
    item_by_code: HashMap<String, usize>,
    item_by_id: HashMap<Uuid, usize>,
}

impl CatalogSnapshot {
    pub fn new(items: Vec<Item>, attributes: Vec<AttributeDefinition>, boms: Vec<BomSummary>) -> Self {
        let mut snapshot = Self {
            attributes,
            boms,
            ..Self::default()
        };
        for item in items {
            snapshot.insert_item(item);
        }
        snapshot
    }

    pub async fn load(store: &dyn CatalogStore) -> BomForgeResult<Self> {
        let items = store.get_items().await?;
        let attributes = store.get_attributes().await?;
        let boms = store.get_existing_boms().await?;
        tracing::debug!(
            items = items.len(),
            attributes = attributes.len(),
            boms = boms.len(),
            "Catalog snapshot loaded"
        );
        Ok(Self::new(items, attributes, boms))
    }

    /// Add or refresh an item, keyed by code.
    pub fn insert_item(&mut self, item: Item) {
        match self.item_by_code.get(&item.code) {
            Some(&idx) => {
                self.item_by_id.remove(&self.items[idx].id);
                self.item_by_id.insert(item.id, idx);
                self.items[idx] = item;
            }
            None => {
                let idx = self.items.len();
                self.item_by_code.insert(item.code.clone(), idx);
                self.item_by_id.insert(item.id, idx);
                self.items.push(item);
            }
        }
    }

    pub fn insert_bom(&mut self, bom: BomSummary) {
        self.boms.push(bom);
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn attributes(&self) -> &[AttributeDefinition] {
        &self.attributes
    }

    pub fn boms(&self) -> &[BomSummary] {
        &self.boms
    }

    pub fn item_by_code(&self, code: &str) -> Option<&Item> {
        self.item_by_code.get(code).map(|&idx| &self.items[idx])
    }

    pub fn item(&self, id: &Uuid) -> Option<&Item> {
        self.item_by_id.get(id).map(|&idx| &self.items[idx])
    }

    pub fn attribute(&self, id: &Uuid) -> Option<&AttributeDefinition> {
        self.attributes.iter().find(|a| &a.id == id)
    }

    pub fn boms_for_item(&self, item_id: &Uuid) -> impl Iterator<Item = &BomSummary> {
        let item_id = *item_id;
        self.boms.iter().filter(move |b| b.item_id == item_id)
    }

    /// The BOM for exactly this (item, selection) pair.
    pub fn bom_for(&self, item_id: &Uuid, selection: &VariantSelection) -> Option<&BomSummary> {
        self.boms_for_item(item_id)
            .find(|b| selection.matches_value_ids(&b.variant_value_ids))
    }

    /// The recipe explosion will follow for this pair: the exact BOM, else the
    /// item's unvaried BOM. A BOM for another variant never stands in.
    pub fn recipe_for(&self, item_id: &Uuid, selection: &VariantSelection) -> Option<&BomSummary> {
        self.bom_for(item_id, selection)
            .or_else(|| self.boms_for_item(item_id).find(|b| b.variant_value_ids.is_empty()))
    }

    pub fn bom_codes(&self) -> HashSet<String> {
        self.boms.iter().map(|b| b.code.clone()).collect()
    }

    pub fn item_codes(&self) -> HashSet<String> {
        self.item_by_code.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bomforge_models::NewItem;

    #[test]
    fn test_insert_item_refreshes_by_code() {
        let first = NewItem::new("RM-001", "Resin", "kg").into_item();
        let mut snapshot = CatalogSnapshot::new(vec![first.clone()], vec![], vec![]);

        let second = NewItem::new("RM-001", "Resin (recreated)", "kg").into_item();
        snapshot.insert_item(second.clone());

        assert_eq!(snapshot.items().len(), 1);
        assert_eq!(snapshot.item_by_code("RM-001").map(|i| i.id), Some(second.id));
        assert!(snapshot.item(&first.id).is_none());
        assert!(snapshot.item(&second.id).is_some());
    }

    #[test]
    fn test_bom_for_matches_exact_selection() {
        let item = NewItem::new("FG-001", "Shoe", "pair").into_item();
        let (color, red, blue) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let red_bom = BomSummary {
            id: Uuid::new_v4(),
            code: "BOM-FG-001-RED".to_string(),
            item_id: item.id,
            variant_value_ids: vec![red],
        };
        let snapshot = CatalogSnapshot::new(vec![item.clone()], vec![], vec![red_bom.clone()]);

        let red_selection = VariantSelection::new().with(color, red);
        let blue_selection = VariantSelection::new().with(color, blue);
        assert_eq!(snapshot.bom_for(&item.id, &red_selection), Some(&red_bom));
        assert!(snapshot.bom_for(&item.id, &blue_selection).is_none());
        assert!(snapshot.bom_codes().contains("BOM-FG-001-RED"));
    }
}
