//! Variant selection against the catalog.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bomforge_models::{AttributeDefinition, Item, VariantSelection};

use super::catalog::CatalogSnapshot;
use crate::error::{BomForgeError, BomForgeResult};

/// A selected value rendered by name, e.g. `Color = Red`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedValue {
    pub attribute: String,
    pub value: String,
}

pub struct VariantSelector<'a> {
    catalog: &'a CatalogSnapshot,
}

impl<'a> VariantSelector<'a> {
    pub fn new(catalog: &'a CatalogSnapshot) -> Self {
        Self { catalog }
    }

    /// The item's bound attribute definitions, in binding order.
    pub fn bound_attributes(&self, item: &Item) -> Vec<&'a AttributeDefinition> {
        self.resolve_attributes(&item.attribute_ids)
    }

    pub fn resolve_attributes(&self, attribute_ids: &[Uuid]) -> Vec<&'a AttributeDefinition> {
        attribute_ids
            .iter()
            .filter_map(|id| self.catalog.attribute(id))
            .collect()
    }

    /// Set or clear one attribute's value; the value must belong to that attribute.
    pub fn set_value(
        &self,
        selection: &mut VariantSelection,
        attribute_id: Uuid,
        value_id: Option<Uuid>,
    ) -> BomForgeResult<()> {
        if let Some(value_id) = value_id {
            let attribute = self
                .catalog
                .attribute(&attribute_id)
                .ok_or_else(|| BomForgeError::validation("selection", format!("Unknown attribute {}", attribute_id)))?;
            if !attribute.owns_value(&value_id) {
                return Err(BomForgeError::validation(
                    "selection",
                    format!("Value {} does not belong to attribute '{}'", value_id, attribute.name),
                ));
            }
        }
        selection.set_value(attribute_id, value_id);
        Ok(())
    }

    /// Check a selection against an item's bound attributes.
    pub fn validate(&self, item: &Item, selection: &VariantSelection) -> BomForgeResult<()> {
        self.validate_against(&item.code, &item.attribute_ids, selection)
    }

    /// Check a selection against an attribute set, for items that may not exist yet.
    pub fn validate_against(
        &self,
        item_code: &str,
        attribute_ids: &[Uuid],
        selection: &VariantSelection,
    ) -> BomForgeResult<()> {
        for (attribute_id, value_id) in selection.iter() {
            let attribute = self.catalog.attribute(attribute_id).ok_or_else(|| {
                BomForgeError::validation("selection", format!("Unknown attribute {}", attribute_id))
            })?;
            if !attribute_ids.contains(attribute_id) {
                return Err(BomForgeError::validation(
                    "selection",
                    format!("Attribute '{}' is not bound to item '{}'", attribute.name, item_code),
                ));
            }
            if !attribute.owns_value(value_id) {
                return Err(BomForgeError::validation(
                    "selection",
                    format!("Value {} does not belong to attribute '{}'", value_id, attribute.name),
                ));
            }
        }
        Ok(())
    }

    /// Rebuild a selection from storage's flat value-id list.
    pub fn from_value_ids(&self, value_ids: &[Uuid]) -> BomForgeResult<VariantSelection> {
        VariantSelection::from_value_ids(value_ids, self.catalog.attributes())
            .map_err(|e| BomForgeError::validation("variant_value_ids", e.to_string()))
    }

    /// Selected values by name, ordered by attribute name. Unknown ids are
    /// skipped.
    pub fn resolve(&self, selection: &VariantSelection) -> Vec<NamedValue> {
        self.resolve_in_order(selection, &[])
    }

    /// Selected values by name: attributes in `binding_order` first, in that
    /// order, then any other selected attribute by name.
    pub fn resolve_in_order(&self, selection: &VariantSelection, binding_order: &[Uuid]) -> Vec<NamedValue> {
        let named = |attribute_id: &Uuid| -> Option<NamedValue> {
            let value_id = selection.get(attribute_id)?;
            let attribute = self.catalog.attribute(attribute_id)?;
            let value = attribute.value(&value_id)?;
            Some(NamedValue {
                attribute: attribute.name.clone(),
                value: value.value.clone(),
            })
        };

        let mut rest: Vec<NamedValue> = selection
            .iter()
            .map(|(attribute_id, _)| attribute_id)
            .filter(|id| !binding_order.contains(*id))
            .filter_map(named)
            .collect();
        rest.sort_by(|a, b| a.attribute.cmp(&b.attribute));

        binding_order.iter().filter_map(named).chain(rest).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bomforge_models::NewItem;

    struct Fixture {
        catalog: CatalogSnapshot,
        item: Item,
        color_id: Uuid,
        size_id: Uuid,
        red: Uuid,
        forty: Uuid,
    }

    fn fixture() -> Fixture {
        let mut color = AttributeDefinition::new("Color");
        let red = color.add_value("Red");
        color.add_value("Blue");
        let mut size = AttributeDefinition::new("Size");
        let forty = size.add_value("40");
        let (color_id, size_id) = (color.id, size.id);

        let item = NewItem::new("FG-001", "Shoe", "pair").with_attributes(vec![color_id]).into_item();
        Fixture {
            catalog: CatalogSnapshot::new(vec![item.clone()], vec![color, size], vec![]),
            item,
            color_id,
            size_id,
            red,
            forty,
        }
    }

    #[test]
    fn test_bound_attributes_follow_binding_order() {
        let f = fixture();
        let selector = VariantSelector::new(&f.catalog);
        let bound: Vec<Uuid> = selector.bound_attributes(&f.item).iter().map(|a| a.id).collect();
        assert_eq!(bound, vec![f.color_id]);
    }

    #[test]
    fn test_set_value_rejects_foreign_value() {
        let f = fixture();
        let selector = VariantSelector::new(&f.catalog);
        let mut selection = VariantSelection::new();

        selector.set_value(&mut selection, f.color_id, Some(f.red)).unwrap();
        assert!(selector.set_value(&mut selection, f.color_id, Some(f.forty)).is_err());
        assert_eq!(selection.get(&f.color_id), Some(f.red));

        selector.set_value(&mut selection, f.color_id, None).unwrap();
        assert!(selection.is_empty());
    }

    #[test]
    fn test_validate_rejects_unbound_attribute() {
        let f = fixture();
        let selector = VariantSelector::new(&f.catalog);

        let ok = VariantSelection::new().with(f.color_id, f.red);
        assert!(selector.validate(&f.item, &ok).is_ok());

        let unbound = VariantSelection::new().with(f.size_id, f.forty);
        let err = selector.validate(&f.item, &unbound).unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_resolve_by_name() {
        let f = fixture();
        let selector = VariantSelector::new(&f.catalog);
        let named = selector.resolve(&VariantSelection::new().with(f.color_id, f.red));
        assert_eq!(
            named,
            vec![NamedValue {
                attribute: "Color".to_string(),
                value: "Red".to_string()
            }]
        );
    }

    #[test]
    fn test_resolve_follows_binding_order() {
        let f = fixture();
        let selector = VariantSelector::new(&f.catalog);
        let selection = VariantSelection::new().with(f.color_id, f.red).with(f.size_id, f.forty);

        let names = |named: Vec<NamedValue>| named.into_iter().map(|n| n.attribute).collect::<Vec<_>>();
        assert_eq!(names(selector.resolve_in_order(&selection, &[f.size_id, f.color_id])), vec!["Size", "Color"]);
        assert_eq!(names(selector.resolve_in_order(&selection, &[f.size_id])), vec!["Size", "Color"]);
        assert_eq!(names(selector.resolve(&selection)), vec!["Color", "Size"]);
    }
}
