//! Printed materials list.
//!
//! Renders every row of an explosion, intermediate and leaf, as indented text
//! or CSV. This is the only place quantities are rounded.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bomforge_models::MaterialsRow;

use super::catalog::CatalogSnapshot;
use super::explosion::Explosion;
use crate::error::{BomForgeError, BomForgeResult};

pub const PRESENTATION_DECIMALS: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Csv,
}

impl ReportFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Text => "text/plain; charset=utf-8",
            Self::Csv => "text/csv; charset=utf-8",
        }
    }
}

pub fn present_quantity(value: Decimal) -> String {
    value.round_dp(PRESENTATION_DECIMALS).normalize().to_string()
}

pub struct MaterialsReport<'a> {
    explosion: &'a Explosion,
    value_labels: HashMap<Uuid, String>,
}

impl<'a> MaterialsReport<'a> {
    pub fn new(explosion: &'a Explosion) -> Self {
        Self {
            explosion,
            value_labels: HashMap::new(),
        }
    }

    /// Label variant values as `Attribute: Value` from the catalog.
    pub fn with_catalog(mut self, catalog: &CatalogSnapshot) -> Self {
        for attribute in catalog.attributes() {
            for value in &attribute.values {
                self.value_labels
                    .insert(value.id, format!("{}: {}", attribute.name, value.value));
            }
        }
        self
    }

    pub fn render(&self, format: ReportFormat) -> BomForgeResult<String> {
        match format {
            ReportFormat::Text => Ok(self.render_text()),
            ReportFormat::Csv => self.render_csv(),
        }
    }

    pub fn render_text(&self) -> String {
        let mut out = format!(
            "Materials for {} x {}\n",
            self.explosion.root_code,
            present_quantity(self.explosion.quantity)
        );

        for row in &self.explosion.rows {
            let indent = "  ".repeat(row.depth.saturating_sub(1));
            let mut line = format!(
                "{}{} {} ({} {})",
                indent,
                row.item_code,
                present_quantity(row.required_quantity),
                present_quantity(row.line_quantity),
                row.mode
            );
            let variants = self.variant_label(row);
            if !variants.is_empty() {
                line.push_str(&format!(" [{}]", variants));
            }
            if let Some(location) = row.location_id {
                line.push_str(&format!(" @ {}", location));
            }
            if let Some(recipe) = &row.recipe_code {
                line.push_str(&format!(" <- {}", recipe));
            }
            out.push_str(&line);
            out.push('\n');
        }
        out
    }

    pub fn render_csv(&self) -> BomForgeResult<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record([
            "depth",
            "item_code",
            "variant",
            "location",
            "line_quantity",
            "mode",
            "required_quantity",
            "recipe",
        ])?;

        for row in &self.explosion.rows {
            writer.write_record([
                row.depth.to_string(),
                row.item_code.clone(),
                self.variant_label(row),
                row.location_id.map(|id| id.to_string()).unwrap_or_default(),
                present_quantity(row.line_quantity),
                row.mode.to_string(),
                present_quantity(row.required_quantity),
                row.recipe_code.clone().unwrap_or_default(),
            ])?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| BomForgeError::internal(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| BomForgeError::internal(e.to_string()))
    }

    fn variant_label(&self, row: &MaterialsRow) -> String {
        row.variant_value_ids
            .iter()
            .map(|id| self.value_labels.get(id).cloned().unwrap_or_else(|| id.to_string()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bomforge_models::QuantityMode;

    fn explosion() -> Explosion {
        let row = |depth: usize, code: &str, required: Decimal, recipe: Option<&str>| MaterialsRow {
            depth,
            item_id: None,
            item_code: code.to_string(),
            variant_value_ids: vec![],
            location_id: None,
            line_quantity: Decimal::ONE,
            mode: QuantityMode::Fixed,
            required_quantity: required,
            recipe_code: recipe.map(str::to_string),
        };
        Explosion {
            root_code: "BOM-FIN".to_string(),
            quantity: Decimal::from(3),
            rows: vec![
                row(1, "SUB", Decimal::from(3), Some("BOM-SUB")),
                row(2, "RAW", Decimal::new(1_000_000, 6) / Decimal::from(3), None),
            ],
            requirements: vec![],
        }
    }

    #[test]
    fn test_present_quantity_rounds_to_four_places() {
        assert_eq!(present_quantity(Decimal::new(1234567, 6)), "1.2346");
        assert_eq!(present_quantity(Decimal::new(1100, 1)), "110");
    }

    #[test]
    fn test_text_is_indented_by_depth() {
        let explosion = explosion();
        let text = MaterialsReport::new(&explosion).render_text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Materials for BOM-FIN x 3");
        assert_eq!(lines[1], "SUB 3 (1 fixed) <- BOM-SUB");
        assert_eq!(lines[2], "  RAW 0.3333 (1 fixed)");
    }

    #[test]
    fn test_csv_has_header_and_rows() {
        let explosion = explosion();
        let csv = MaterialsReport::new(&explosion).render(ReportFormat::Csv).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("depth,item_code,variant,location,line_quantity,mode,required_quantity,recipe")
        );
        assert_eq!(lines.next(), Some("1,SUB,,,1,fixed,3,BOM-SUB"));
        assert_eq!(lines.next(), Some("2,RAW,,,1,fixed,0.3333,"));
    }
}
