//! Code synthesis with collision probing.
//!
//! The same generator drives BOM, item and work-order codes; each family has
//! its own [`CodeConfig`]. Probing against known codes is a convenience for the
//! user. Storage uniqueness is what actually decides, and a rejection is
//! handled by [`CodeGenerator::recover_duplicate`].

use std::collections::HashSet;

use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::variant::NamedValue;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeConfig {
    pub prefix: String,
    pub separator: String,
    #[serde(default)]
    pub suffix: String,
    #[serde(default = "default_true")]
    pub include_item_code: bool,
    #[serde(default)]
    pub include_variant: bool,
    /// Attributes to render, in order. Empty renders every selected value in
    /// the item's attribute binding order.
    #[serde(default)]
    pub variant_attribute_names: Vec<String>,
    #[serde(default)]
    pub include_year: bool,
    #[serde(default)]
    pub include_month: bool,
}

fn default_true() -> bool {
    true
}

impl CodeConfig {
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            separator: "-".to_string(),
            suffix: String::new(),
            include_item_code: true,
            include_variant: false,
            variant_attribute_names: Vec::new(),
            include_year: false,
            include_month: false,
        }
    }
}

impl Default for CodeConfig {
    fn default() -> Self {
        Self::with_prefix("BOM")
    }
}

#[derive(Debug, Clone)]
pub struct CodeGenerator {
    config: CodeConfig,
}

impl CodeGenerator {
    pub fn new(config: CodeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CodeConfig {
        &self.config
    }

    /// The code without its counter.
    pub fn base(&self, anchor_code: &str, selection: &[NamedValue], today: NaiveDate) -> String {
        let config = &self.config;
        let mut parts: Vec<String> = Vec::new();

        if !config.prefix.is_empty() {
            parts.push(config.prefix.clone());
        }
        if config.include_item_code && !anchor_code.is_empty() {
            parts.push(anchor_code.to_string());
        }
        if config.include_variant {
            if config.variant_attribute_names.is_empty() {
                parts.extend(selection.iter().map(|named| render_value(&named.value)));
            } else {
                for name in &config.variant_attribute_names {
                    if let Some(named) = selection.iter().find(|n| &n.attribute == name) {
                        parts.push(render_value(&named.value));
                    }
                }
            }
        }
        if config.include_year {
            parts.push(today.year().to_string());
        }
        if config.include_month {
            parts.push(format!("{:02}", today.month()));
        }
        if !config.suffix.is_empty() {
            parts.push(config.suffix.clone());
        }

        parts.retain(|p| !p.is_empty());
        parts.join(&config.separator)
    }

    /// First `base + separator + NNN` not in `used`, counting from 001.
    pub fn suggest(
        &self,
        anchor_code: &str,
        selection: &[NamedValue],
        used: &HashSet<String>,
        today: NaiveDate,
    ) -> String {
        let base = self.base(anchor_code, selection, today);
        let mut counter: u32 = 1;
        loop {
            let candidate = if base.is_empty() {
                format!("{:03}", counter)
            } else {
                format!("{}{}{:03}", base, self.config.separator, counter)
            };
            if !used.contains(&candidate) {
                return candidate;
            }
            counter += 1;
        }
    }

    pub fn suggest_now(&self, anchor_code: &str, selection: &[NamedValue], used: &HashSet<String>) -> String {
        self.suggest(anchor_code, selection, used, Utc::now().date_naive())
    }

    /// Suggestion after storage rejected `rejected` as a duplicate: drop a
    /// trailing `-<digits>`, then probe `base-1`, `base-2`, ... locally.
    pub fn recover_duplicate(&self, rejected: &str, used: &HashSet<String>) -> String {
        let base = strip_numeric_suffix(rejected);
        let mut counter: u32 = 1;
        loop {
            let candidate = format!("{}-{}", base, counter);
            if candidate != rejected && !used.contains(&candidate) {
                tracing::info!(rejected, suggestion = %candidate, "Suggesting replacement for duplicate code");
                return candidate;
            }
            counter += 1;
        }
    }
}

fn render_value(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

fn strip_numeric_suffix(code: &str) -> &str {
    match code.rsplit_once('-') {
        Some((base, digits)) if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) => base,
        _ => code,
    }
}
