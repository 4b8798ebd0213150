//! Pattern-driven draft construction.
//!
//! Given a root item code and levels of naming patterns such as
//! `WIP CBG {CODE}`, builds a draft tree whose lines chain down through the
//! intermediate items those patterns name.

use std::collections::HashSet;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use bomforge_models::{BomLine, BomNode, VariantSelection};

use super::catalog::CatalogSnapshot;
use super::code_gen::CodeGenerator;
use super::matcher::VariantMatcher;
use super::variant::VariantSelector;
use crate::config::{AutomationConfig, AutomationProfile};
use crate::error::{BomForgeError, BomForgeResult};
use crate::validation::validate_code;
use crate::{log_debug, log_info};

pub const CODE_PLACEHOLDER: &str = "{CODE}";

#[derive(Debug, Clone)]
pub struct AutomationSettings {
    pub default_uom: String,
    pub default_line_quantity: Decimal,
}

impl From<&AutomationConfig> for AutomationSettings {
    fn from(config: &AutomationConfig) -> Self {
        Self {
            default_uom: config.default_uom.clone(),
            default_line_quantity: config.default_line_quantity,
        }
    }
}

impl Default for AutomationSettings {
    fn default() -> Self {
        Self::from(&AutomationConfig::default())
    }
}

pub struct Automator<'a> {
    catalog: &'a CatalogSnapshot,
    codes: &'a CodeGenerator,
    settings: AutomationSettings,
    today: NaiveDate,
}

struct BuildContext<'c> {
    root_code: &'c str,
    levels: &'c [Vec<String>],
    /// Attribute set a drafted item will get when it is created on save.
    new_item_attributes: Vec<Uuid>,
    /// Codes already in storage or handed out earlier in this draft.
    reserved: HashSet<String>,
}

impl<'a> Automator<'a> {
    pub fn new(catalog: &'a CatalogSnapshot, codes: &'a CodeGenerator, settings: AutomationSettings) -> Self {
        Self {
            catalog,
            codes,
            settings,
            today: Utc::now().date_naive(),
        }
    }

    /// Pin the date used for dated code parts.
    pub fn with_date(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// One pattern per level.
    pub fn build(
        &self,
        root_item_code: &str,
        root_selection: &VariantSelection,
        patterns: &[String],
    ) -> BomForgeResult<BomNode> {
        let levels: Vec<Vec<String>> = patterns.iter().map(|p| vec![p.clone()]).collect();
        self.build_levels(root_item_code, root_selection, &levels)
    }

    pub fn build_profile(
        &self,
        root_item_code: &str,
        root_selection: &VariantSelection,
        profile: &AutomationProfile,
    ) -> BomForgeResult<BomNode> {
        log_debug!("Building draft from profile", profile = %profile.name);
        self.build_levels(root_item_code, root_selection, &profile.levels)
    }

    /// Each node at level `i` gets one line per pattern of level `i + 1`.
    pub fn build_levels(
        &self,
        root_item_code: &str,
        root_selection: &VariantSelection,
        levels: &[Vec<String>],
    ) -> BomForgeResult<BomNode> {
        validate_code("root_item_code", root_item_code)?;
        for (idx, level) in levels.iter().enumerate() {
            if level.is_empty() {
                return Err(BomForgeError::validation(
                    format!("levels[{}]", idx),
                    "A level needs at least one pattern",
                ));
            }
            if let Some(pattern) = level.iter().find(|p| !p.contains(CODE_PLACEHOLDER)) {
                return Err(BomForgeError::validation(
                    format!("levels[{}]", idx),
                    format!("Pattern '{}' has no {} placeholder", pattern, CODE_PLACEHOLDER),
                ));
            }
        }

        let root_item = self.catalog.item_by_code(root_item_code);
        let new_item_attributes = match root_item {
            Some(item) => {
                VariantSelector::new(self.catalog).validate(item, root_selection)?;
                item.attribute_ids.clone()
            }
            None => root_selection.attribute_ids().copied().collect(),
        };

        let mut ctx = BuildContext {
            root_code: root_item_code,
            levels,
            new_item_attributes,
            reserved: self.catalog.bom_codes(),
        };

        let mut root = self.draft_node(root_item_code, root_selection.clone(), root_item.is_none(), &mut ctx);
        if root_item.is_none() {
            root.item_defaults.uom = Some(self.settings.default_uom.clone());
            root.item_defaults.attribute_ids = Some(ctx.new_item_attributes.clone());
        }
        root.lines = self.build_lines(root_selection, 0, &mut ctx);

        log_info!(
            "Draft built",
            root_item_code = %root_item_code,
            levels = levels.len(),
            depth = root.depth()
        );
        Ok(root)
    }

    fn build_lines(&self, parent_selection: &VariantSelection, level: usize, ctx: &mut BuildContext<'_>) -> Vec<BomLine> {
        let levels = ctx.levels;
        let Some(patterns) = levels.get(level) else {
            return Vec::new();
        };
        let mut lines = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            let child_code = pattern.replacen(CODE_PLACEHOLDER, ctx.root_code, 1);
            lines.push(self.build_line(&child_code, parent_selection, level, ctx));
        }
        lines
    }

    fn build_line(
        &self,
        child_code: &str,
        parent_selection: &VariantSelection,
        level: usize,
        ctx: &mut BuildContext<'_>,
    ) -> BomLine {
        let matcher = VariantMatcher::new(self.catalog);
        let quantity = self.settings.default_line_quantity;

        let (selection, is_new) = match self.catalog.item_by_code(child_code) {
            Some(item) => {
                let selection = matcher.propagate(parent_selection, item);
                let existing = self.catalog.recipe_for(&item.id, &selection);

                if let Some(bom) = existing {
                    log_info!("Reusing existing BOM", item_code = %child_code, bom_code = %bom.code);
                    return BomLine::fixed(child_code, quantity)
                        .with_selection(selection)
                        .with_existing(bom.id, bom.code.clone());
                }
                (selection, false)
            }
            None => {
                log_debug!("Drafting new item", item_code = %child_code);
                // Seeded from the parent, mapped onto the attributes the item will inherit.
                let selection = matcher.propagate_to_attributes(parent_selection, &ctx.new_item_attributes);
                (selection, true)
            }
        };

        let mut node = self.draft_node(child_code, selection.clone(), is_new, ctx);
        node.lines = self.build_lines(&selection, level + 1, ctx);

        BomLine::fixed(child_code, quantity)
            .with_selection(selection)
            .with_draft(node)
    }

    fn draft_node(
        &self,
        item_code: &str,
        selection: VariantSelection,
        is_new: bool,
        ctx: &mut BuildContext<'_>,
    ) -> BomNode {
        let binding_order = match self.catalog.item_by_code(item_code) {
            Some(item) if !is_new => item.attribute_ids.clone(),
            _ => ctx.new_item_attributes.clone(),
        };
        let named = VariantSelector::new(self.catalog).resolve_in_order(&selection, &binding_order);
        let code = self.codes.suggest(item_code, &named, &ctx.reserved, self.today);
        ctx.reserved.insert(code.clone());

        let mut node = BomNode::new(code, item_code).with_selection(selection);
        node.is_new_item = is_new;
        node
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bom::code_gen::CodeConfig;
    use bomforge_models::{AttributeDefinition, BomSummary, NewItem, Recipe};
    use proptest::prelude::*;

    fn patterns(list: &[&str]) -> Vec<String> {
        list.iter().map(|p| p.to_string()).collect()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    #[test]
    fn test_chain_of_new_items() {
        let catalog = CatalogSnapshot::default();
        let codes = CodeGenerator::new(CodeConfig::default());
        let automator = Automator::new(&catalog, &codes, AutomationSettings::default()).with_date(today());

        let root = automator
            .build(
                "9698/22",
                &VariantSelection::new(),
                &patterns(&["WIP CBG {CODE}", "WIP CSBG {CODE}"]),
            )
            .unwrap();

        assert_eq!(root.item_code, "9698/22");
        assert!(root.is_new_item);
        assert_eq!(root.item_defaults.uom.as_deref(), Some("pcs"));

        let cbg = root.lines[0].draft().unwrap();
        assert_eq!(cbg.item_code, "WIP CBG 9698/22");
        assert!(cbg.is_new_item);

        let csbg = cbg.lines[0].draft().unwrap();
        assert_eq!(csbg.item_code, "WIP CSBG 9698/22");
        assert!(csbg.lines.is_empty());
        assert_eq!(root.depth(), 3);
    }

    #[test]
    fn test_codes_are_unique_within_draft() {
        let existing = BomSummary {
            id: Uuid::new_v4(),
            code: "BOM-9698/22-001".to_string(),
            item_id: Uuid::new_v4(),
            variant_value_ids: vec![],
        };
        let catalog = CatalogSnapshot::new(vec![], vec![], vec![existing]);
        let codes = CodeGenerator::new(CodeConfig {
            include_item_code: false,
            ..CodeConfig::with_prefix("BOM")
        });
        let automator = Automator::new(&catalog, &codes, AutomationSettings::default()).with_date(today());

        let root = automator
            .build("9698/22", &VariantSelection::new(), &patterns(&["A {CODE}", "B {CODE}"]))
            .unwrap();
        let node_codes: Vec<&str> = root.nodes().iter().map(|n| n.code.as_str()).collect();
        assert_eq!(node_codes, vec!["BOM-001", "BOM-002", "BOM-003"]);

        let codes = CodeGenerator::new(CodeConfig::default());
        let automator = Automator::new(&catalog, &codes, AutomationSettings::default()).with_date(today());
        let root = automator.build("9698/22", &VariantSelection::new(), &[]).unwrap();
        assert_eq!(root.code, "BOM-9698/22-002");
    }

    #[test]
    fn test_existing_bom_terminates_branch() {
        let cbg = NewItem::new("WIP CBG 9698/22", "Upper", "pcs").into_item();
        let bom = BomSummary {
            id: Uuid::new_v4(),
            code: "BOM-CBG-001".to_string(),
            item_id: cbg.id,
            variant_value_ids: vec![],
        };
        let catalog = CatalogSnapshot::new(vec![cbg], vec![], vec![bom.clone()]);
        let codes = CodeGenerator::new(CodeConfig::default());
        let automator = Automator::new(&catalog, &codes, AutomationSettings::default());

        let root = automator
            .build(
                "9698/22",
                &VariantSelection::new(),
                &patterns(&["WIP CBG {CODE}", "WIP CSBG {CODE}"]),
            )
            .unwrap();

        assert_eq!(root.depth(), 1);
        assert_eq!(
            root.lines[0].recipe,
            Some(Recipe::Existing {
                bom_id: bom.id,
                code: bom.code
            })
        );
    }

    #[test]
    fn test_other_variant_bom_is_not_reused() {
        let mut color = AttributeDefinition::new("Color");
        let red = color.add_value("Red");
        let blue = color.add_value("Blue");
        let cbg = NewItem::new("WIP CBG 9698/22", "Upper", "pcs")
            .with_attributes(vec![color.id])
            .into_item();
        let blue_bom = BomSummary {
            id: Uuid::new_v4(),
            code: "BOM-CBG-BLUE".to_string(),
            item_id: cbg.id,
            variant_value_ids: vec![blue],
        };
        let catalog = CatalogSnapshot::new(vec![cbg], vec![color.clone()], vec![blue_bom]);
        let codes = CodeGenerator::new(CodeConfig::default());
        let automator = Automator::new(&catalog, &codes, AutomationSettings::default());

        let root = automator
            .build(
                "9698/22",
                &VariantSelection::new().with(color.id, red),
                &patterns(&["WIP CBG {CODE}"]),
            )
            .unwrap();

        let line = &root.lines[0];
        assert_eq!(line.selection, VariantSelection::new().with(color.id, red));
        let drafted = line.draft().unwrap();
        assert!(!drafted.is_new_item);
        assert!(drafted.lines.is_empty());
    }

    #[test]
    fn test_existing_item_gets_matched_selection() {
        let mut root_color = AttributeDefinition::new("Color");
        let root_red = root_color.add_value("Red");
        let mut wip_color = AttributeDefinition::new("Color");
        let wip_red = wip_color.add_value("Red");

        let root_item = NewItem::new("9698/22", "Shoe", "pair")
            .with_attributes(vec![root_color.id])
            .into_item();
        let wip = NewItem::new("WIP CBG 9698/22", "Upper", "pcs")
            .with_attributes(vec![wip_color.id])
            .into_item();
        let catalog = CatalogSnapshot::new(
            vec![root_item, wip],
            vec![root_color.clone(), wip_color.clone()],
            vec![],
        );
        let codes = CodeGenerator::new(CodeConfig::default());
        let automator = Automator::new(&catalog, &codes, AutomationSettings::default());

        let selection = VariantSelection::new().with(root_color.id, root_red);
        let root = automator
            .build(
                "9698/22",
                &selection,
                &patterns(&["WIP CBG {CODE}", "WIP CSBG {CODE}"]),
            )
            .unwrap();

        let cbg = root.lines[0].draft().unwrap();
        assert!(!cbg.is_new_item);
        assert_eq!(cbg.selection, VariantSelection::new().with(wip_color.id, wip_red));

        // The new CSBG item will inherit the root's attributes, so its selection maps back onto them.
        let csbg = cbg.lines[0].draft().unwrap();
        assert!(csbg.is_new_item);
        assert_eq!(csbg.selection, selection);
    }

    #[test]
    fn test_branching_levels() {
        let catalog = CatalogSnapshot::default();
        let codes = CodeGenerator::new(CodeConfig::default());
        let automator = Automator::new(&catalog, &codes, AutomationSettings::default());

        let levels = vec![
            patterns(&["WIP CBG {CODE}"]),
            patterns(&["WIP CSBG {CODE}", "WIP LINING {CODE}"]),
        ];
        let root = automator.build_levels("X1", &VariantSelection::new(), &levels).unwrap();

        let cbg = root.lines[0].draft().unwrap();
        let children: Vec<&str> = cbg.children().map(|n| n.item_code.as_str()).collect();
        assert_eq!(children, vec!["WIP CSBG X1", "WIP LINING X1"]);
        assert_eq!(root.nodes().len(), 4);
    }

    #[test]
    fn test_placeholder_replaced_once_and_required() {
        let catalog = CatalogSnapshot::default();
        let codes = CodeGenerator::new(CodeConfig::default());
        let automator = Automator::new(&catalog, &codes, AutomationSettings::default());

        let root = automator
            .build("X1", &VariantSelection::new(), &patterns(&["{CODE} / {CODE}"]))
            .unwrap();
        assert_eq!(root.lines[0].item_code, "X1 / {CODE}");

        let err = automator
            .build("X1", &VariantSelection::new(), &patterns(&["NO PLACEHOLDER"]))
            .unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }

    proptest! {
        #[test]
        fn property_depth_is_levels_plus_one(count in 0usize..6) {
            let catalog = CatalogSnapshot::default();
            let codes = CodeGenerator::new(CodeConfig::default());
            let automator = Automator::new(&catalog, &codes, AutomationSettings::default());

            let patterns: Vec<String> = (0..count).map(|i| format!("L{} {{CODE}}", i)).collect();
            let root = automator.build("ROOT", &VariantSelection::new(), &patterns).unwrap();
            prop_assert_eq!(root.depth(), count + 1);
        }

        #[test]
        fn property_recursion_stops_at_first_existing_bom(count in 1usize..6, stop in 0usize..6) {
            let stop = stop % count;
            let patterns: Vec<String> = (0..count).map(|i| format!("L{} {{CODE}}", i)).collect();
            let item = NewItem::new(format!("L{} ROOT", stop), "Wip", "pcs").into_item();
            let bom = BomSummary {
                id: Uuid::new_v4(),
                code: "BOM-EXISTING".to_string(),
                item_id: item.id,
                variant_value_ids: vec![],
            };
            let catalog = CatalogSnapshot::new(vec![item], vec![], vec![bom]);
            let codes = CodeGenerator::new(CodeConfig::default());
            let automator = Automator::new(&catalog, &codes, AutomationSettings::default());

            let root = automator.build("ROOT", &VariantSelection::new(), &patterns).unwrap();
            prop_assert_eq!(root.depth(), stop + 1);
        }
    }
}
