//! Bill-of-materials models.
//!
//! Two shapes live here. [`BomNode`] is the editable draft: a tree whose lines
//! may own a nested node for the component's own recipe, with items referenced
//! by code because some of them may not exist yet. [`BomDocument`] is what
//! storage holds: one flat recipe per item/variant, referencing items by id.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::item::ItemDefaults;
use crate::variant::VariantSelection;

/// How a line's quantity relates to the quantity being produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantityMode {
    /// Units of component per unit produced.
    #[default]
    Fixed,
    /// Percent of the produced quantity.
    Percentage,
}

impl QuantityMode {
    pub fn is_percentage(&self) -> bool {
        matches!(self, Self::Percentage)
    }

    pub fn from_flag(is_percentage: bool) -> Self {
        if is_percentage {
            Self::Percentage
        } else {
            Self::Fixed
        }
    }
}

impl std::fmt::Display for QuantityMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fixed => write!(f, "fixed"),
            Self::Percentage => write!(f, "percentage"),
        }
    }
}

/// One routing step of a BOM.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct OperationAssignment {
    pub operation_id: Uuid,
    pub work_center_id: Option<Uuid>,
    /// Ordering key, not required to be unique.
    pub sequence: i32,
    #[validate(custom = "validate_non_negative")]
    pub time_minutes: Decimal,
}

/// Where a line's component recipe comes from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recipe {
    /// An unsaved nested node owned by the line.
    Draft(Box<BomNode>),
    /// A BOM that is already persisted; terminal for drafting purposes.
    Existing { bom_id: Uuid, code: String },
}

impl Recipe {
    pub fn as_draft(&self) -> Option<&BomNode> {
        match self {
            Self::Draft(node) => Some(node),
            Self::Existing { .. } => None,
        }
    }

    pub fn as_draft_mut(&mut self) -> Option<&mut BomNode> {
        match self {
            Self::Draft(node) => Some(node),
            Self::Existing { .. } => None,
        }
    }
}

/// A component line of a draft node.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct BomLine {
    pub id: Uuid,
    #[validate(length(min = 1, max = 64, message = "Component code must be between 1 and 64 characters"))]
    pub item_code: String,
    #[serde(default)]
    pub selection: VariantSelection,
    #[validate(custom = "validate_positive")]
    pub quantity: Decimal,
    #[serde(default)]
    pub mode: QuantityMode,
    pub source_location_id: Option<Uuid>,
    /// Used when the component item has to be created on save.
    #[serde(default)]
    pub item_defaults: ItemDefaults,
    pub recipe: Option<Recipe>,
}

impl BomLine {
    pub fn new(item_code: impl Into<String>, quantity: Decimal, mode: QuantityMode) -> Self {
        Self {
            id: Uuid::new_v4(),
            item_code: item_code.into(),
            selection: VariantSelection::new(),
            quantity,
            mode,
            source_location_id: None,
            item_defaults: ItemDefaults::default(),
            recipe: None,
        }
    }

    pub fn fixed(item_code: impl Into<String>, quantity: Decimal) -> Self {
        Self::new(item_code, quantity, QuantityMode::Fixed)
    }

    pub fn percentage(item_code: impl Into<String>, percent: Decimal) -> Self {
        Self::new(item_code, percent, QuantityMode::Percentage)
    }

    pub fn with_selection(mut self, selection: VariantSelection) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_source_location(mut self, location_id: Uuid) -> Self {
        self.source_location_id = Some(location_id);
        self
    }

    pub fn with_draft(mut self, node: BomNode) -> Self {
        self.recipe = Some(Recipe::Draft(Box::new(node)));
        self
    }

    pub fn with_existing(mut self, bom_id: Uuid, code: impl Into<String>) -> Self {
        self.recipe = Some(Recipe::Existing {
            bom_id,
            code: code.into(),
        });
        self
    }

    pub fn draft(&self) -> Option<&BomNode> {
        self.recipe.as_ref().and_then(Recipe::as_draft)
    }

    pub fn draft_mut(&mut self) -> Option<&mut BomNode> {
        self.recipe.as_mut().and_then(Recipe::as_draft_mut)
    }
}

/// A draft recipe node. Lines may own nested nodes, which makes the draft a tree.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct BomNode {
    /// Stable id used to address the node while editing.
    pub id: Uuid,
    #[validate(length(min = 1, max = 64, message = "BOM code must be between 1 and 64 characters"))]
    pub code: String,
    pub description: Option<String>,
    #[validate(length(min = 1, max = 64, message = "Item code must be between 1 and 64 characters"))]
    pub item_code: String,
    /// The item is expected not to exist yet and may be created on save.
    #[serde(default)]
    pub is_new_item: bool,
    #[serde(default)]
    pub item_defaults: ItemDefaults,
    #[serde(default)]
    pub selection: VariantSelection,
    #[validate(custom = "validate_positive")]
    pub quantity: Decimal,
    #[validate(custom = "validate_non_negative")]
    pub tolerance_percentage: Decimal,
    #[serde(default)]
    pub operations: Vec<OperationAssignment>,
    #[serde(default)]
    pub lines: Vec<BomLine>,
}

/// A local validation problem found in a draft tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DraftIssue {
    pub node_code: String,
    pub field: String,
    pub message: String,
}

impl BomNode {
    pub fn new(code: impl Into<String>, item_code: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            code: code.into(),
            description: None,
            item_code: item_code.into(),
            is_new_item: false,
            item_defaults: ItemDefaults::default(),
            selection: VariantSelection::new(),
            quantity: Decimal::ONE,
            tolerance_percentage: Decimal::ZERO,
            operations: Vec::new(),
            lines: Vec::new(),
        }
    }

    pub fn with_selection(mut self, selection: VariantSelection) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_quantity(mut self, quantity: Decimal) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn with_tolerance(mut self, tolerance_percentage: Decimal) -> Self {
        self.tolerance_percentage = tolerance_percentage;
        self
    }

    pub fn with_line(mut self, line: BomLine) -> Self {
        self.lines.push(line);
        self
    }

    pub fn with_operation(mut self, operation: OperationAssignment) -> Self {
        self.operations.push(operation);
        self
    }

    pub fn new_item(mut self) -> Self {
        self.is_new_item = true;
        self
    }

    /// A node with neither lines nor operations is not written as a BOM document.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.operations.is_empty()
    }

    /// Operations ordered by sequence; ties keep insertion order.
    pub fn sorted_operations(&self) -> Vec<&OperationAssignment> {
        let mut ops: Vec<&OperationAssignment> = self.operations.iter().collect();
        ops.sort_by_key(|op| op.sequence);
        ops
    }

    /// Draft children in line order.
    pub fn children(&self) -> impl Iterator<Item = &BomNode> {
        self.lines.iter().filter_map(BomLine::draft)
    }

    /// Levels of draft nodes, counting this one.
    pub fn depth(&self) -> usize {
        1 + self.children().map(BomNode::depth).max().unwrap_or(0)
    }

    /// All draft nodes in pre-order.
    pub fn nodes(&self) -> Vec<&BomNode> {
        let mut out = vec![self];
        for child in self.children() {
            out.extend(child.nodes());
        }
        out
    }

    pub fn find_node(&self, id: Uuid) -> Option<&BomNode> {
        if self.id == id {
            return Some(self);
        }
        self.children().find_map(|child| child.find_node(id))
    }

    pub fn find_node_mut(&mut self, id: Uuid) -> Option<&mut BomNode> {
        if self.id == id {
            return Some(self);
        }
        self.lines
            .iter_mut()
            .filter_map(BomLine::draft_mut)
            .find_map(|child| child.find_node_mut(id))
    }

    /// Substitute the node with the given id, returning the node it replaced.
    pub fn replace_node(&mut self, id: Uuid, replacement: BomNode) -> Option<BomNode> {
        self.find_node_mut(id)
            .map(|slot| std::mem::replace(slot, replacement))
    }

    /// Give a line of any node in the tree its own draft recipe.
    /// Returns false when no line has that id.
    pub fn attach_sub_recipe(&mut self, line_id: Uuid, node: BomNode) -> bool {
        let mut pending = Some(node);
        self.attach_inner(line_id, &mut pending);
        pending.is_none()
    }

    fn attach_inner(&mut self, line_id: Uuid, pending: &mut Option<BomNode>) {
        for line in &mut self.lines {
            if line.id == line_id {
                if let Some(node) = pending.take() {
                    line.recipe = Some(Recipe::Draft(Box::new(node)));
                }
                return;
            }
            if let Some(child) = line.draft_mut() {
                child.attach_inner(line_id, pending);
                if pending.is_none() {
                    return;
                }
            }
        }
    }

    /// Run every local check on the whole tree, before anything touches storage.
    pub fn validate_tree(&self) -> Vec<DraftIssue> {
        let mut issues = Vec::new();
        self.collect_issues(&mut issues);
        issues
    }

    fn collect_issues(&self, issues: &mut Vec<DraftIssue>) {
        if let Err(errors) = self.validate() {
            push_issues(issues, &self.code, "", &errors);
        }
        for (idx, op) in self.operations.iter().enumerate() {
            if let Err(errors) = op.validate() {
                push_issues(issues, &self.code, &format!("operations[{}].", idx), &errors);
            }
        }
        for (idx, line) in self.lines.iter().enumerate() {
            if let Err(errors) = line.validate() {
                push_issues(issues, &self.code, &format!("lines[{}].", idx), &errors);
            }
            if let Some(child) = line.draft() {
                if child.item_code != line.item_code {
                    issues.push(DraftIssue {
                        node_code: self.code.clone(),
                        field: format!("lines[{}].recipe", idx),
                        message: format!(
                            "Nested recipe produces '{}' but the line consumes '{}'",
                            child.item_code, line.item_code
                        ),
                    });
                }
                child.collect_issues(issues);
            }
        }
    }
}

fn push_issues(issues: &mut Vec<DraftIssue>, node_code: &str, prefix: &str, errors: &ValidationErrors) {
    for (field, field_errors) in errors.field_errors() {
        for error in field_errors {
            let message = error
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| error.code.to_string());
            issues.push(DraftIssue {
                node_code: node_code.to_string(),
                field: format!("{}{}", prefix, field),
                message,
            });
        }
    }
}

/// A component line as storage holds it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BomDocumentLine {
    pub item_id: Uuid,
    #[serde(default)]
    pub variant_value_ids: Vec<Uuid>,
    pub quantity: Decimal,
    #[serde(default)]
    pub mode: QuantityMode,
    pub source_location_id: Option<Uuid>,
}

/// Payload for `createBOM`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct NewBom {
    #[validate(length(min = 1, max = 64, message = "BOM code must be between 1 and 64 characters"))]
    pub code: String,
    pub description: Option<String>,
    pub item_id: Uuid,
    #[serde(default)]
    pub variant_value_ids: Vec<Uuid>,
    #[validate(custom = "validate_positive")]
    pub quantity: Decimal,
    #[validate(custom = "validate_non_negative")]
    pub tolerance_percentage: Decimal,
    #[serde(default)]
    pub operations: Vec<OperationAssignment>,
    #[serde(default)]
    pub lines: Vec<BomDocumentLine>,
}

impl NewBom {
    pub fn into_document(self) -> BomDocument {
        BomDocument {
            id: Uuid::new_v4(),
            code: self.code,
            description: self.description,
            item_id: self.item_id,
            variant_value_ids: self.variant_value_ids,
            quantity: self.quantity,
            tolerance_percentage: self.tolerance_percentage,
            operations: self.operations,
            lines: self.lines,
            active: true,
            created_at: Utc::now(),
        }
    }
}

/// A persisted BOM.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BomDocument {
    pub id: Uuid,
    pub code: String,
    pub description: Option<String>,
    pub item_id: Uuid,
    pub variant_value_ids: Vec<Uuid>,
    pub quantity: Decimal,
    pub tolerance_percentage: Decimal,
    pub operations: Vec<OperationAssignment>,
    pub lines: Vec<BomDocumentLine>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl BomDocument {
    pub fn summary(&self) -> BomSummary {
        BomSummary {
            id: self.id,
            code: self.code.clone(),
            item_id: self.item_id,
            variant_value_ids: self.variant_value_ids.clone(),
        }
    }
}

/// The slice of a persisted BOM used for uniqueness probing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BomSummary {
    pub id: Uuid,
    pub code: String,
    pub item_id: Uuid,
    pub variant_value_ids: Vec<Uuid>,
}

fn validate_positive(value: &Decimal) -> Result<(), ValidationError> {
    if *value <= Decimal::ZERO {
        let mut error = ValidationError::new("positive");
        error.message = Some("Quantity must be greater than zero".into());
        return Err(error);
    }
    Ok(())
}

fn validate_non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        let mut error = ValidationError::new("non_negative");
        error.message = Some("Value must not be negative".into());
        return Err(error);
    }
    Ok(())
}
