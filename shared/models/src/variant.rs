//! Variant selections: at most one chosen value per attribute.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::attribute::AttributeDefinition;

/// A configuration mapping attribute id to the chosen value id.
///
/// Keyed by attribute, so a second value for the same attribute replaces the
/// first instead of accumulating.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariantSelection(BTreeMap<Uuid, Uuid>);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("attribute value {value_id} is not defined in the catalog")]
    UnknownValue { value_id: Uuid },

    #[error("values {first} and {second} both belong to attribute '{attribute}'")]
    ConflictingValues {
        attribute: String,
        first: Uuid,
        second: Uuid,
    },
}

impl VariantSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or clear the value for one attribute, leaving the others untouched.
    /// Returns the value previously held for that attribute.
    pub fn set_value(&mut self, attribute_id: Uuid, value_id: Option<Uuid>) -> Option<Uuid> {
        match value_id {
            Some(value_id) => self.0.insert(attribute_id, value_id),
            None => self.0.remove(&attribute_id),
        }
    }

    /// Builder form of [`set_value`](Self::set_value).
    pub fn with(mut self, attribute_id: Uuid, value_id: Uuid) -> Self {
        self.set_value(attribute_id, Some(value_id));
        self
    }

    pub fn get(&self, attribute_id: &Uuid) -> Option<Uuid> {
        self.0.get(attribute_id).copied()
    }

    pub fn contains_value(&self, value_id: &Uuid) -> bool {
        self.0.values().any(|v| v == value_id)
    }

    pub fn attribute_ids(&self) -> impl Iterator<Item = &Uuid> {
        self.0.keys()
    }

    /// Flat value-id list, the shape storage and the wire use.
    pub fn value_ids(&self) -> Vec<Uuid> {
        self.0.values().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Uuid, &Uuid)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Rebuild a selection from a flat value-id list, rejecting ids the
    /// catalog does not know and two values of the same attribute.
    pub fn from_value_ids(
        value_ids: &[Uuid],
        attributes: &[AttributeDefinition],
    ) -> Result<Self, SelectionError> {
        let mut selection = Self::new();
        for value_id in value_ids {
            let attribute = attributes
                .iter()
                .find(|a| a.owns_value(value_id))
                .ok_or(SelectionError::UnknownValue { value_id: *value_id })?;

            if let Some(existing) = selection.get(&attribute.id) {
                if existing != *value_id {
                    return Err(SelectionError::ConflictingValues {
                        attribute: attribute.name.clone(),
                        first: existing,
                        second: *value_id,
                    });
                }
            }
            selection.set_value(attribute.id, Some(*value_id));
        }
        Ok(selection)
    }

    /// Order-insensitive comparison with a flat value-id list.
    pub fn matches_value_ids(&self, value_ids: &[Uuid]) -> bool {
        let ours: BTreeSet<Uuid> = self.0.values().copied().collect();
        let theirs: BTreeSet<Uuid> = value_ids.iter().copied().collect();
        ours == theirs
    }
}

impl FromIterator<(Uuid, Uuid)> for VariantSelection {
    fn from_iter<T: IntoIterator<Item = (Uuid, Uuid)>>(iter: T) -> Self {
        let mut selection = Self::new();
        for (attribute_id, value_id) in iter {
            selection.set_value(attribute_id, Some(value_id));
        }
        selection
    }
}
