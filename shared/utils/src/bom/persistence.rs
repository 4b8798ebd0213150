//! Bottom-up persistence of a draft tree.
//!
//! Every nested draft is saved before the node that consumes it, one store
//! call at a time. The first failure ends the walk. Records created before the
//! failure stay in place, and a re-run picks them up again: duplicate item
//! codes are tolerated, and so is a BOM code already written with the same
//! recipe for the same item and variant set.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use tracing::Instrument;
use uuid::Uuid;

use bomforge_database::{CatalogStore, StoreError, BOM_ENTITY};
use bomforge_models::{
    matches_variant_set, BomDocument, BomDocumentLine, BomNode, BomSummary, Item, ItemDefaults, NewBom, NewItem,
    Recipe,
};

use super::automator::AutomationSettings;
use super::catalog::CatalogSnapshot;
use super::code_gen::CodeGenerator;
use super::variant::VariantSelector;
use crate::error::{BomForgeError, BomForgeResult};
use crate::validation::{validate_draft, validate_model};
use crate::{log_error, log_info, log_warn};

type SaveFuture<'s, T> = Pin<Box<dyn Future<Output = BomForgeResult<T>> + Send + 's>>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SaveReport {
    pub root_item_id: Option<Uuid>,
    pub root_bom_id: Option<Uuid>,
    pub created_items: Vec<String>,
    pub created_boms: Vec<String>,
    /// Nodes with neither lines nor operations; only their item was ensured.
    pub skipped_nodes: Vec<String>,
    /// Codes another writer (or an earlier run) had already created.
    pub tolerated_duplicates: Vec<String>,
}

impl SaveReport {
    /// Records written by this run.
    pub fn completed(&self) -> usize {
        self.created_items.len() + self.created_boms.len()
    }
}

/// Fallback item fields, taken from the draft's root item.
#[derive(Debug, Clone)]
struct ItemTemplate {
    uom: String,
    category: Option<String>,
    attribute_ids: Vec<Uuid>,
}

struct SaveState {
    catalog: CatalogSnapshot,
    template: ItemTemplate,
    report: SaveReport,
}

struct SavedNode {
    item_id: Uuid,
    bom_id: Option<Uuid>,
}

pub struct PersistenceCoordinator<'a> {
    store: &'a dyn CatalogStore,
    bom_codes: &'a CodeGenerator,
    default_uom: String,
}

impl<'a> PersistenceCoordinator<'a> {
    pub fn new(store: &'a dyn CatalogStore, bom_codes: &'a CodeGenerator, settings: &AutomationSettings) -> Self {
        Self {
            store,
            bom_codes,
            default_uom: settings.default_uom.clone(),
        }
    }

    /// Save a whole draft. Local validation runs over the full tree before the
    /// first store call.
    pub async fn save(&self, root: &BomNode) -> BomForgeResult<SaveReport> {
        validate_draft(root)?;

        let catalog = CatalogSnapshot::load(self.store).await?;
        let template = self.template_for(root, &catalog);
        check_tree(root, &catalog, &template)?;

        let mut state = SaveState {
            catalog,
            template,
            report: SaveReport::default(),
        };

        let span = tracing::info_span!("draft_save", root_code = %root.code);
        let walked = self.save_node(root, &mut state).instrument(span).await;
        match walked {
            Ok(saved) => {
                state.report.root_item_id = Some(saved.item_id);
                state.report.root_bom_id = saved.bom_id;
                log_info!(
                    "Draft saved",
                    root_code = %root.code,
                    items = state.report.created_items.len(),
                    boms = state.report.created_boms.len(),
                    skipped = state.report.skipped_nodes.len()
                );
                Ok(state.report)
            }
            Err(err) => {
                log_error!(err, "Draft save aborted", root_code = %root.code);
                Err(err)
            }
        }
    }

    fn template_for(&self, root: &BomNode, catalog: &CatalogSnapshot) -> ItemTemplate {
        match catalog.item_by_code(&root.item_code) {
            Some(item) => ItemTemplate {
                uom: item.uom.clone(),
                category: item.category.clone(),
                attribute_ids: item.attribute_ids.clone(),
            },
            None => ItemTemplate {
                uom: root.item_defaults.uom.clone().unwrap_or_else(|| self.default_uom.clone()),
                category: root.item_defaults.category.clone(),
                attribute_ids: root
                    .item_defaults
                    .attribute_ids
                    .clone()
                    .unwrap_or_else(|| root.selection.attribute_ids().copied().collect()),
            },
        }
    }

    fn save_node<'s>(&'s self, node: &'s BomNode, state: &'s mut SaveState) -> SaveFuture<'s, SavedNode> {
        Box::pin(async move {
            let item = if node.is_new_item {
                self.ensure_item(&node.item_code, &node.item_defaults, state).await
            } else {
                existing_item(&node.item_code, state)
            };
            let item = match item {
                Ok(item) => item,
                Err(err) => return Err(abort(node, state, err)),
            };

            let mut lines = Vec::with_capacity(node.lines.len());
            for line in &node.lines {
                let item_id = match &line.recipe {
                    Some(Recipe::Draft(child)) => self.save_node(child, state).await?.item_id,
                    _ => match self.ensure_item(&line.item_code, &line.item_defaults, state).await {
                        Ok(component) => component.id,
                        Err(err) => return Err(abort(node, state, err)),
                    },
                };
                lines.push(BomDocumentLine {
                    item_id,
                    variant_value_ids: line.selection.value_ids(),
                    quantity: line.quantity,
                    mode: line.mode,
                    source_location_id: line.source_location_id,
                });
            }

            if node.is_empty() {
                tracing::debug!(node_code = %node.code, "Empty node, no BOM document written");
                state.report.skipped_nodes.push(node.code.clone());
                return Ok(SavedNode {
                    item_id: item.id,
                    bom_id: None,
                });
            }

            let bom = NewBom {
                code: node.code.clone(),
                description: node.description.clone(),
                item_id: item.id,
                variant_value_ids: node.selection.value_ids(),
                quantity: node.quantity,
                tolerance_percentage: node.tolerance_percentage,
                operations: node.sorted_operations().into_iter().cloned().collect(),
                lines,
            };

            match self.submit_bom(bom, state).await {
                Ok(bom_id) => Ok(SavedNode {
                    item_id: item.id,
                    bom_id: Some(bom_id),
                }),
                Err(err) => Err(abort(node, state, err)),
            }
        })
    }

    async fn ensure_item(&self, code: &str, defaults: &ItemDefaults, state: &mut SaveState) -> BomForgeResult<Item> {
        if let Some(item) = state.catalog.item_by_code(code) {
            return Ok(item.clone());
        }

        let new_item = NewItem {
            code: code.to_string(),
            name: defaults.name.clone().unwrap_or_else(|| code.to_string()),
            uom: defaults.uom.clone().unwrap_or_else(|| state.template.uom.clone()),
            category: defaults.category.clone().or_else(|| state.template.category.clone()),
            attribute_ids: defaults
                .attribute_ids
                .clone()
                .unwrap_or_else(|| state.template.attribute_ids.clone()),
            source_sample_id: defaults.source_sample_id,
        };
        validate_model(&new_item)?;

        match self.store.create_item(new_item).await {
            Ok(item) => {
                log_info!("Item created", item_code = %item.code, item_id = %item.id);
                state.report.created_items.push(item.code.clone());
                state.catalog.insert_item(item.clone());
                Ok(item)
            }
            Err(StoreError::DuplicateCode { .. }) => {
                log_warn!("Item code already taken, assuming a concurrent create", item_code = %code);
                let item = self
                    .store
                    .get_items()
                    .await?
                    .into_iter()
                    .find(|item| item.code == code)
                    .ok_or_else(|| {
                        BomForgeError::conflict(format!("Item '{}' was reported as existing but cannot be read", code))
                    })?;
                state.report.tolerated_duplicates.push(code.to_string());
                state.catalog.insert_item(item.clone());
                Ok(item)
            }
            Err(other) => Err(other.into()),
        }
    }

    async fn submit_bom(&self, bom: NewBom, state: &mut SaveState) -> BomForgeResult<Uuid> {
        validate_model(&bom)?;

        match self.store.create_bom(bom.clone()).await {
            Ok(document) => {
                log_info!("BOM submitted", bom_code = %document.code, bom_id = %document.id);
                state.report.created_boms.push(document.code.clone());
                state.catalog.insert_bom(BomDocument::summary(&document));
                Ok(document.id)
            }
            Err(StoreError::DuplicateCode { .. }) => {
                let existing = self.store.get_existing_boms().await?;
                if let Some(same) = existing.iter().find(|b| is_same_target(b, &bom)) {
                    let stored = self.store.get_bom(same.id).await?;
                    if stored.as_ref().is_some_and(|doc| is_same_recipe(doc, &bom)) {
                        log_warn!("BOM already written by an earlier run", bom_code = %bom.code);
                        state.report.tolerated_duplicates.push(bom.code);
                        return Ok(same.id);
                    }
                    log_warn!("BOM code holds a different recipe for this item", bom_code = %bom.code);
                }

                let mut known: HashSet<String> = state.catalog.bom_codes();
                known.extend(existing.into_iter().map(|b| b.code));
                let suggestion = self.bom_codes.recover_duplicate(&bom.code, &known);
                Err(BomForgeError::duplicate_code(BOM_ENTITY, bom.code, suggestion))
            }
            Err(other) => Err(other.into()),
        }
    }
}

fn is_same_target(summary: &BomSummary, bom: &NewBom) -> bool {
    summary.code == bom.code
        && summary.item_id == bom.item_id
        && matches_variant_set(&summary.variant_value_ids, &bom.variant_value_ids)
}

/// A stored document only counts as this save's own earlier write when its
/// whole recipe matches what is being submitted.
fn is_same_recipe(stored: &BomDocument, bom: &NewBom) -> bool {
    let same_line = |a: &BomDocumentLine, b: &BomDocumentLine| {
        a.item_id == b.item_id
            && a.quantity == b.quantity
            && a.mode == b.mode
            && a.source_location_id == b.source_location_id
            && matches_variant_set(&a.variant_value_ids, &b.variant_value_ids)
    };

    stored.quantity == bom.quantity
        && stored.tolerance_percentage == bom.tolerance_percentage
        && stored.operations == bom.operations
        && stored.lines.len() == bom.lines.len()
        && stored.lines.iter().zip(&bom.lines).all(|(a, b)| same_line(a, b))
}

fn existing_item(code: &str, state: &SaveState) -> BomForgeResult<Item> {
    state
        .catalog
        .item_by_code(code)
        .cloned()
        .ok_or_else(|| BomForgeError::not_found(format!("item '{}'", code)))
}

/// Attribute the failure to the node whose step failed. Failures from nested
/// nodes arrive already attributed.
fn abort(node: &BomNode, state: &SaveState, cause: BomForgeError) -> BomForgeError {
    if matches!(cause, BomForgeError::PartialTreeSave { .. }) {
        return cause;
    }
    let completed = state.report.completed();
    tracing::warn!(node_code = %node.code, completed, error = %cause, "Save walk stopped");
    BomForgeError::partial_tree_save(&node.code, completed, cause)
}

/// Selection and item checks that need the catalog but no writes.
fn check_tree(root: &BomNode, catalog: &CatalogSnapshot, template: &ItemTemplate) -> BomForgeResult<()> {
    let selector = VariantSelector::new(catalog);

    check_items_in_walk_order(root, catalog, &mut HashSet::new())?;

    let attributes_for = |code: &str, defaults: &ItemDefaults| -> Vec<Uuid> {
        match catalog.item_by_code(code) {
            Some(item) => item.attribute_ids.clone(),
            None => defaults
                .attribute_ids
                .clone()
                .unwrap_or_else(|| template.attribute_ids.clone()),
        }
    };

    for node in root.nodes() {
        let attributes = attributes_for(&node.item_code, &node.item_defaults);
        selector
            .validate_against(&node.item_code, &attributes, &node.selection)
            .map_err(|e| scoped(&node.code, "selection", e))?;

        for (idx, line) in node.lines.iter().enumerate() {
            let attributes = attributes_for(&line.item_code, &line.item_defaults);
            selector
                .validate_against(&line.item_code, &attributes, &line.selection)
                .map_err(|e| scoped(&node.code, &format!("lines[{}].selection", idx), e))?;
        }
    }
    Ok(())
}

/// A node not marked as new must name an item that exists by the time the
/// walk reaches it: stored already, or created earlier in the same walk.
fn check_items_in_walk_order<'n>(
    node: &'n BomNode,
    catalog: &CatalogSnapshot,
    created: &mut HashSet<&'n str>,
) -> BomForgeResult<()> {
    if node.is_new_item {
        created.insert(&node.item_code);
    } else if catalog.item_by_code(&node.item_code).is_none() && !created.contains(node.item_code.as_str()) {
        return Err(BomForgeError::validation(
            format!("{}.item_code", node.code),
            format!("Item '{}' does not exist and is not marked as new", node.item_code),
        ));
    }

    for line in &node.lines {
        match &line.recipe {
            Some(Recipe::Draft(child)) => check_items_in_walk_order(child, catalog, created)?,
            _ => {
                created.insert(&line.item_code);
            }
        }
    }
    Ok(())
}

fn scoped(node_code: &str, field: &str, err: BomForgeError) -> BomForgeError {
    match err {
        BomForgeError::Validation { message, .. } => {
            BomForgeError::validation(format!("{}.{}", node_code, field), message)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bom::automator::Automator;
    use crate::bom::code_gen::CodeConfig;
    use async_trait::async_trait;
    use bomforge_database::{MemoryCatalogStore, StoreResult};
    use bomforge_models::{AttributeDefinition, BomLine, VariantSelection};
    use proptest::prelude::*;
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    /// Records every write and can be told to fail one BOM code or to serve a
    /// stale item list on the first read.
    #[derive(Default)]
    struct RecordingStore {
        inner: MemoryCatalogStore,
        calls: Mutex<Vec<String>>,
        fail_bom: Option<String>,
        stale_first_read: AtomicBool,
    }

    impl RecordingStore {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CatalogStore for RecordingStore {
        async fn create_item(&self, item: NewItem) -> StoreResult<Item> {
            self.calls.lock().unwrap().push(format!("item:{}", item.code));
            self.inner.create_item(item).await
        }

        async fn get_items(&self) -> StoreResult<Vec<Item>> {
            if self.stale_first_read.swap(false, Ordering::SeqCst) {
                return Ok(Vec::new());
            }
            self.inner.get_items().await
        }

        async fn get_attributes(&self) -> StoreResult<Vec<AttributeDefinition>> {
            self.inner.get_attributes().await
        }

        async fn create_attribute(&self, attribute: AttributeDefinition) -> StoreResult<AttributeDefinition> {
            self.inner.create_attribute(attribute).await
        }

        async fn get_existing_boms(&self) -> StoreResult<Vec<BomSummary>> {
            self.inner.get_existing_boms().await
        }

        async fn create_bom(&self, bom: NewBom) -> StoreResult<BomDocument> {
            self.calls.lock().unwrap().push(format!("bom:{}", bom.code));
            if self.fail_bom.as_deref() == Some(bom.code.as_str()) {
                return Err(StoreError::Transport("connection reset".to_string()));
            }
            self.inner.create_bom(bom).await
        }

        async fn get_boms(&self) -> StoreResult<Vec<BomDocument>> {
            self.inner.get_boms().await
        }

        async fn get_bom(&self, id: Uuid) -> StoreResult<Option<BomDocument>> {
            self.inner.get_bom(id).await
        }

        async fn health_check(&self) -> StoreResult<()> {
            Ok(())
        }
    }

    fn codes() -> CodeGenerator {
        CodeGenerator::new(CodeConfig::default())
    }

    /// FIN -> (A -> RAW-A), (B -> RAW-B); every node is new.
    fn branching_draft() -> BomNode {
        let a = BomNode::new("BOM-A", "A")
            .new_item()
            .with_line(BomLine::fixed("RAW-A", Decimal::from(2)));
        let b = BomNode::new("BOM-B", "B")
            .new_item()
            .with_line(BomLine::fixed("RAW-B", Decimal::from(3)));
        BomNode::new("BOM-FIN", "FIN")
            .new_item()
            .with_line(BomLine::fixed("A", Decimal::ONE).with_draft(a))
            .with_line(BomLine::fixed("B", Decimal::ONE).with_draft(b))
    }

    #[tokio::test]
    async fn test_saves_generated_chain() {
        let store = MemoryCatalogStore::new();
        let generator = codes();
        let catalog = CatalogSnapshot::default();
        let draft = Automator::new(&catalog, &generator, AutomationSettings::default())
            .build(
                "9698/22",
                &VariantSelection::new(),
                &["WIP CBG {CODE}".to_string(), "WIP CSBG {CODE}".to_string()],
            )
            .unwrap();

        let coordinator = PersistenceCoordinator::new(&store, &generator, &AutomationSettings::default());
        let report = coordinator.save(&draft).await.unwrap();

        assert_eq!(report.created_items, vec!["9698/22", "WIP CBG 9698/22", "WIP CSBG 9698/22"]);
        assert_eq!(report.created_boms.len(), 2);
        assert_eq!(report.skipped_nodes.len(), 1);
        assert!(report.root_bom_id.is_some());

        let items = store.get_items().await.unwrap();
        assert!(items.iter().all(|i| i.uom == "pcs"));
    }

    #[tokio::test]
    async fn test_children_are_submitted_before_parents() {
        let store = RecordingStore::default();
        let generator = codes();
        let coordinator = PersistenceCoordinator::new(&store, &generator, &AutomationSettings::default());

        coordinator.save(&branching_draft()).await.unwrap();

        assert_eq!(
            store.calls(),
            vec![
                "item:FIN", "item:A", "item:RAW-A", "bom:BOM-A", "item:B", "item:RAW-B", "bom:BOM-B", "bom:BOM-FIN",
            ]
        );
    }

    #[tokio::test]
    async fn test_first_failure_aborts_walk_and_rerun_completes() {
        let store = RecordingStore {
            fail_bom: Some("BOM-B".to_string()),
            ..RecordingStore::default()
        };
        let generator = codes();
        let coordinator = PersistenceCoordinator::new(&store, &generator, &AutomationSettings::default());

        let err = coordinator.save(&branching_draft()).await.unwrap_err();
        match &err {
            BomForgeError::PartialTreeSave { node_code, completed, .. } => {
                assert_eq!(node_code, "BOM-B");
                // FIN, A, RAW-A, BOM-A, B, RAW-B
                assert_eq!(*completed, 6);
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(err.root_cause().error_code(), "TRANSPORT_ERROR");
        assert!(!store.calls().contains(&"bom:BOM-FIN".to_string()));
        assert_eq!(store.inner.bom_count().await, 1);

        // Same draft, healthy store: earlier writes are picked up, not repeated.
        let healthy = RecordingStore {
            inner: store.inner.clone(),
            ..RecordingStore::default()
        };
        let coordinator = PersistenceCoordinator::new(&healthy, &generator, &AutomationSettings::default());
        let report = coordinator.save(&branching_draft()).await.unwrap();
        assert!(report.created_items.is_empty());
        assert_eq!(report.created_boms, vec!["BOM-B", "BOM-FIN"]);
        assert_eq!(report.tolerated_duplicates, vec!["BOM-A"]);
        assert_eq!(healthy.inner.bom_count().await, 3);
    }

    #[tokio::test]
    async fn test_duplicate_item_code_is_tolerated() {
        let store = RecordingStore::default();
        store.inner.create_item(NewItem::new("RAW-A", "Raw", "kg")).await.unwrap();
        store.stale_first_read.store(true, Ordering::SeqCst);

        let generator = codes();
        let coordinator = PersistenceCoordinator::new(&store, &generator, &AutomationSettings::default());
        let draft = BomNode::new("BOM-FIN", "FIN")
            .new_item()
            .with_line(BomLine::fixed("RAW-A", Decimal::ONE));

        let report = coordinator.save(&draft).await.unwrap();
        assert_eq!(report.created_items, vec!["FIN"]);
        assert_eq!(report.tolerated_duplicates, vec!["RAW-A"]);
        assert_eq!(report.created_boms, vec!["BOM-FIN"]);
    }

    #[tokio::test]
    async fn test_duplicate_bom_code_suggests_recovery() {
        let store = MemoryCatalogStore::new();
        let other = store.create_item(NewItem::new("OTHER", "Other", "pcs")).await.unwrap();
        store
            .create_bom(NewBom {
                code: "BOM-FIN-001".to_string(),
                description: None,
                item_id: other.id,
                variant_value_ids: vec![],
                quantity: Decimal::ONE,
                tolerance_percentage: Decimal::ZERO,
                operations: vec![],
                lines: vec![],
            })
            .await
            .unwrap();

        let generator = codes();
        let coordinator = PersistenceCoordinator::new(&store, &generator, &AutomationSettings::default());
        let draft = BomNode::new("BOM-FIN-001", "FIN")
            .new_item()
            .with_line(BomLine::fixed("RAW", Decimal::ONE));

        let err = coordinator.save(&draft).await.unwrap_err();
        assert_eq!(
            err.root_cause(),
            &BomForgeError::duplicate_code("bom", "BOM-FIN-001", "BOM-FIN-1")
        );
    }

    #[tokio::test]
    async fn test_edited_draft_with_saved_code_is_rejected() {
        let store = MemoryCatalogStore::new();
        let generator = codes();
        let coordinator = PersistenceCoordinator::new(&store, &generator, &AutomationSettings::default());

        let saved = BomNode::new("BOM-FIN", "FIN")
            .new_item()
            .with_line(BomLine::fixed("RAW", Decimal::from(2)));
        coordinator.save(&saved).await.unwrap();

        let edited = BomNode::new("BOM-FIN", "FIN")
            .new_item()
            .with_line(BomLine::fixed("RAW", Decimal::from(5)));
        let err = coordinator.save(&edited).await.unwrap_err();
        assert_eq!(err.root_cause(), &BomForgeError::duplicate_code("bom", "BOM-FIN", "BOM-FIN-1"));

        let stored = store.get_boms().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].lines[0].quantity, Decimal::from(2));

        // Unchanged re-save still reuses the stored document.
        let report = coordinator.save(&saved).await.unwrap();
        assert_eq!(report.tolerated_duplicates, vec!["BOM-FIN"]);
        assert_eq!(report.root_bom_id, Some(stored[0].id));
    }

    #[tokio::test]
    async fn test_invalid_draft_makes_no_store_calls() {
        let store = RecordingStore::default();
        let generator = codes();
        let coordinator = PersistenceCoordinator::new(&store, &generator, &AutomationSettings::default());

        let zero_quantity = BomNode::new("BOM-FIN", "FIN")
            .new_item()
            .with_line(BomLine::fixed("RAW", Decimal::ZERO));
        let err = coordinator.save(&zero_quantity).await.unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");

        let unknown_item = BomNode::new("BOM-FIN", "FIN").with_line(BomLine::fixed("RAW", Decimal::ONE));
        let err = coordinator.save(&unknown_item).await.unwrap_err();
        assert_eq!(err, BomForgeError::validation("BOM-FIN.item_code", "Item 'FIN' does not exist and is not marked as new"));

        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_item_created_later_in_walk_does_not_count() {
        let store = RecordingStore::default();
        let generator = codes();
        let coordinator = PersistenceCoordinator::new(&store, &generator, &AutomationSettings::default());

        // SUB is only created by the second line, after its own node is reached.
        let sub = BomNode::new("BOM-SUB", "SUB").with_line(BomLine::fixed("RAW", Decimal::ONE));
        let draft = BomNode::new("BOM-FIN", "FIN")
            .new_item()
            .with_line(BomLine::fixed("SUB", Decimal::ONE).with_draft(sub.clone()))
            .with_line(BomLine::fixed("SUB", Decimal::ONE));
        let err = coordinator.save(&draft).await.unwrap_err();
        assert_eq!(err, BomForgeError::validation("BOM-SUB.item_code", "Item 'SUB' does not exist and is not marked as new"));
        assert!(store.calls().is_empty());

        // Created by an earlier line, so the node can use it.
        let draft = BomNode::new("BOM-FIN", "FIN")
            .new_item()
            .with_line(BomLine::fixed("SUB", Decimal::ONE))
            .with_line(BomLine::fixed("SUB", Decimal::from(2)).with_draft(sub));
        let report = coordinator.save(&draft).await.unwrap();
        assert_eq!(report.created_items, vec!["FIN", "SUB", "RAW"]);
    }

    #[tokio::test]
    async fn test_selection_must_use_bound_attributes() {
        let store = RecordingStore::default();
        let mut color = AttributeDefinition::new("Color");
        let red = color.add_value("Red");
        let size = AttributeDefinition::new("Size").with_values(["40"]);
        let forty = size.values[0].id;
        store.create_attribute(color.clone()).await.unwrap();
        store.create_attribute(size.clone()).await.unwrap();
        store
            .inner
            .create_item(NewItem::new("FIN", "Shoe", "pair").with_attributes(vec![color.id]))
            .await
            .unwrap();

        let generator = codes();
        let coordinator = PersistenceCoordinator::new(&store, &generator, &AutomationSettings::default());

        let bad = BomNode::new("BOM-FIN", "FIN")
            .with_selection(VariantSelection::new().with(size.id, forty))
            .with_line(BomLine::fixed("RAW", Decimal::ONE));
        let err = coordinator.save(&bad).await.unwrap_err();
        assert!(matches!(err, BomForgeError::Validation { ref field, .. } if field == "BOM-FIN.selection"));
        assert!(store.calls().is_empty());

        // New components inherit the root's attributes, so a Color selection is valid on them.
        let good = BomNode::new("BOM-FIN", "FIN")
            .with_selection(VariantSelection::new().with(color.id, red))
            .with_line(BomLine::fixed("RAW", Decimal::ONE).with_selection(VariantSelection::new().with(color.id, red)));
        let report = coordinator.save(&good).await.unwrap();
        assert_eq!(report.created_items, vec!["RAW"]);

        let raw = store.inner.get_items().await.unwrap().into_iter().find(|i| i.code == "RAW").unwrap();
        assert_eq!(raw.attribute_ids, vec![color.id]);
        assert_eq!(raw.uom, "pair");
    }

    /// Node `i > 0` hangs under node `parents[i - 1] % i`; leaves get one raw line.
    fn tree_from_parents(parents: &[usize]) -> BomNode {
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); parents.len() + 1];
        for (idx, raw) in parents.iter().enumerate() {
            let node = idx + 1;
            children[raw % node].push(node);
        }

        fn build(idx: usize, children: &[Vec<usize>]) -> BomNode {
            let node = BomNode::new(format!("BOM-N{}", idx), format!("N{}", idx)).new_item();
            if children[idx].is_empty() {
                return node.with_line(BomLine::fixed(format!("RAW-{}", idx), Decimal::ONE));
            }
            children[idx].iter().fold(node, |node, &child| {
                node.with_line(BomLine::fixed(format!("N{}", child), Decimal::ONE).with_draft(build(child, children)))
            })
        }
        build(0, &children)
    }

    proptest! {
        #[test]
        fn prop_every_bom_follows_its_sub_recipes(parents in proptest::collection::vec(0usize..100, 0..10)) {
            let draft = tree_from_parents(&parents);
            let store = RecordingStore::default();
            let generator = codes();
            let coordinator = PersistenceCoordinator::new(&store, &generator, &AutomationSettings::default());

            let report = tokio_test::block_on(coordinator.save(&draft)).unwrap();
            prop_assert_eq!(report.created_boms.len(), parents.len() + 1);

            let calls = store.calls();
            let position = |call: String| calls.iter().position(|c| *c == call).unwrap();
            for node in draft.nodes() {
                let own = position(format!("bom:{}", node.code));
                let item_created = position(format!("item:{}", node.item_code));
                prop_assert!(item_created < own);
                for child in node.children() {
                    let child_saved = position(format!("bom:{}", child.code));
                    prop_assert!(child_saved < own);
                }
            }
        }
    }
}
