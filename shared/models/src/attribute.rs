//! Attribute definitions (Color, Size, ...) and their values.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttributeDefinition {
    pub id: Uuid,
    pub name: String,
    pub values: Vec<AttributeValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttributeValue {
    pub id: Uuid,
    pub attribute_id: Uuid,
    pub value: String,
}

impl AttributeDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            values: Vec::new(),
        }
    }

    /// Append a value and return its id.
    pub fn add_value(&mut self, value: impl Into<String>) -> Uuid {
        let id = Uuid::new_v4();
        self.values.push(AttributeValue {
            id,
            attribute_id: self.id,
            value: value.into(),
        });
        id
    }

    /// Builder form of [`add_value`](Self::add_value).
    pub fn with_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for value in values {
            self.add_value(value);
        }
        self
    }

    pub fn value(&self, value_id: &Uuid) -> Option<&AttributeValue> {
        self.values.iter().find(|v| &v.id == value_id)
    }

    /// Look up a value by its string, exact match.
    pub fn value_named(&self, value: &str) -> Option<&AttributeValue> {
        self.values.iter().find(|v| v.value == value)
    }

    pub fn owns_value(&self, value_id: &Uuid) -> bool {
        self.value(value_id).is_some()
    }

    /// Suggest the next value when every existing value is an integer
    /// (sizes 38, 39 suggest 40). Returns `None` for empty or non-numeric sets.
    pub fn next_sequential_value(&self) -> Option<String> {
        if self.values.is_empty() {
            return None;
        }
        let mut max: Option<i64> = None;
        for value in &self.values {
            let parsed: i64 = value.value.trim().parse().ok()?;
            max = Some(max.map_or(parsed, |m| m.max(parsed)));
        }
        max.and_then(|m| m.checked_add(1)).map(|next| next.to_string())
    }
}
