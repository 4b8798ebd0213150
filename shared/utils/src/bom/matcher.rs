//! Carry a variant selection across structurally related items by name.

use uuid::Uuid;

use bomforge_models::{Item, VariantSelection};

use super::catalog::CatalogSnapshot;
use super::variant::VariantSelector;

pub struct VariantMatcher<'a> {
    catalog: &'a CatalogSnapshot,
}

impl<'a> VariantMatcher<'a> {
    pub fn new(catalog: &'a CatalogSnapshot) -> Self {
        Self { catalog }
    }

    pub fn propagate(&self, parent: &VariantSelection, child: &Item) -> VariantSelection {
        self.propagate_to_attributes(parent, &child.attribute_ids)
    }

    /// For every parent (name, value) pair, pick the child attribute with the
    /// same name and its value with the same string. Pairs without a match are
    /// dropped. Attribute identity is never compared.
    pub fn propagate_to_attributes(&self, parent: &VariantSelection, child_attribute_ids: &[Uuid]) -> VariantSelection {
        let selector = VariantSelector::new(self.catalog);
        let child_attributes = selector.resolve_attributes(child_attribute_ids);

        let mut result = VariantSelection::new();
        for named in selector.resolve(parent) {
            let matched = child_attributes
                .iter()
                .filter(|attribute| attribute.name == named.attribute)
                .find_map(|attribute| attribute.value_named(&named.value).map(|v| (attribute.id, v.id)));

            if let Some((attribute_id, value_id)) = matched {
                result.set_value(attribute_id, Some(value_id));
            }
        }
        result
    }
}
