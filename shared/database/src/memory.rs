//! In-memory catalog store.
//!
//! Used by tests and by the `memory` database backend. Enforces the same
//! uniqueness rules as the PostgreSQL schema.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use bomforge_models::{AttributeDefinition, BomDocument, BomSummary, Item, NewBom, NewItem};

use crate::store::{variant_key, CatalogStore, StoreError, StoreResult, BOM_ENTITY, ITEM_ENTITY};

#[derive(Debug, Default)]
struct MemoryState {
    items: Vec<Item>,
    attributes: Vec<AttributeDefinition>,
    boms: Vec<BomDocument>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryCatalogStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn item_count(&self) -> usize {
        self.state.read().await.items.len()
    }

    pub async fn bom_count(&self) -> usize {
        self.state.read().await.boms.len()
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalogStore {
    async fn create_item(&self, item: NewItem) -> StoreResult<Item> {
        let mut state = self.state.write().await;
        if state.items.iter().any(|existing| existing.code == item.code) {
            return Err(StoreError::duplicate_code(ITEM_ENTITY, item.code));
        }
        for attribute_id in &item.attribute_ids {
            if !state.attributes.iter().any(|a| &a.id == attribute_id) {
                return Err(StoreError::NotFound(format!("attribute {}", attribute_id)));
            }
        }

        let item = item.into_item();
        state.items.push(item.clone());
        tracing::debug!(item_code = %item.code, "Item stored in memory");
        Ok(item)
    }

    async fn get_items(&self) -> StoreResult<Vec<Item>> {
        Ok(self.state.read().await.items.clone())
    }

    async fn get_attributes(&self) -> StoreResult<Vec<AttributeDefinition>> {
        Ok(self.state.read().await.attributes.clone())
    }

    async fn create_attribute(&self, attribute: AttributeDefinition) -> StoreResult<AttributeDefinition> {
        let mut state = self.state.write().await;
        if state.attributes.iter().any(|a| a.id == attribute.id) {
            return Err(StoreError::Conflict(format!("attribute {} already exists", attribute.id)));
        }
        state.attributes.push(attribute.clone());
        Ok(attribute)
    }

    async fn get_existing_boms(&self) -> StoreResult<Vec<BomSummary>> {
        Ok(self.state.read().await.boms.iter().map(BomDocument::summary).collect())
    }

    async fn create_bom(&self, bom: NewBom) -> StoreResult<BomDocument> {
        let mut state = self.state.write().await;
        if state.boms.iter().any(|existing| existing.code == bom.code) {
            return Err(StoreError::duplicate_code(BOM_ENTITY, bom.code));
        }

        let key = variant_key(&bom.variant_value_ids);
        if state
            .boms
            .iter()
            .any(|existing| existing.item_id == bom.item_id && variant_key(&existing.variant_value_ids) == key)
        {
            return Err(StoreError::Conflict(format!(
                "item {} already has a BOM for this variant selection",
                bom.item_id
            )));
        }

        let known_item = |id: &Uuid| state.items.iter().any(|item| &item.id == id);
        if !known_item(&bom.item_id) {
            return Err(StoreError::NotFound(format!("item {}", bom.item_id)));
        }
        if let Some(line) = bom.lines.iter().find(|line| !known_item(&line.item_id)) {
            return Err(StoreError::NotFound(format!("item {}", line.item_id)));
        }

        let document = bom.into_document();
        state.boms.push(document.clone());
        tracing::debug!(bom_code = %document.code, "BOM stored in memory");
        Ok(document)
    }

    async fn get_boms(&self) -> StoreResult<Vec<BomDocument>> {
        Ok(self.state.read().await.boms.clone())
    }

    async fn get_bom(&self, id: Uuid) -> StoreResult<Option<BomDocument>> {
        Ok(self.state.read().await.boms.iter().find(|bom| bom.id == id).cloned())
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bomforge_models::{BomDocumentLine, QuantityMode};
    use rust_decimal::Decimal;

    fn new_bom(code: &str, item_id: Uuid, values: Vec<Uuid>) -> NewBom {
        NewBom {
            code: code.to_string(),
            description: None,
            item_id,
            variant_value_ids: values,
            quantity: Decimal::ONE,
            tolerance_percentage: Decimal::ZERO,
            operations: vec![],
            lines: vec![],
        }
    }

    #[tokio::test]
    async fn test_item_codes_are_unique() {
        let store = MemoryCatalogStore::new();
        store.create_item(NewItem::new("RM-001", "Resin", "kg")).await.unwrap();

        let err = store.create_item(NewItem::new("RM-001", "Other", "kg")).await.unwrap_err();
        assert_eq!(err, StoreError::duplicate_code(ITEM_ENTITY, "RM-001"));
        assert_eq!(store.item_count().await, 1);
    }

    #[tokio::test]
    async fn test_bom_uniqueness_rules() {
        let store = MemoryCatalogStore::new();
        let mut color = AttributeDefinition::new("Color");
        let red = color.add_value("Red");
        let blue = color.add_value("Blue");
        store.create_attribute(color.clone()).await.unwrap();

        let item = store
            .create_item(NewItem::new("FG-001", "Shoe", "pair").with_attributes(vec![color.id]))
            .await
            .unwrap();

        store.create_bom(new_bom("BOM-1", item.id, vec![red])).await.unwrap();
        store.create_bom(new_bom("BOM-2", item.id, vec![blue])).await.unwrap();

        let dup = store.create_bom(new_bom("BOM-1", item.id, vec![])).await.unwrap_err();
        assert!(dup.is_duplicate_code());

        let conflict = store.create_bom(new_bom("BOM-3", item.id, vec![red])).await.unwrap_err();
        assert!(matches!(conflict, StoreError::Conflict(_)));

        assert_eq!(store.get_existing_boms().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_bom_lines_must_reference_known_items() {
        let store = MemoryCatalogStore::new();
        let item = store.create_item(NewItem::new("FG-001", "Shoe", "pair")).await.unwrap();

        let mut bom = new_bom("BOM-1", item.id, vec![]);
        bom.lines.push(BomDocumentLine {
            item_id: Uuid::new_v4(),
            variant_value_ids: vec![],
            quantity: Decimal::ONE,
            mode: QuantityMode::Fixed,
            source_location_id: None,
        });

        let err = store.create_bom(bom).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert_eq!(store.bom_count().await, 0);
    }
}
