//! BOM graph engine.
//!
//! Variant selection and matching, code generation, draft automation,
//! quantity explosion and bottom-up persistence of draft trees.

pub mod automator;
pub mod catalog;
pub mod code_gen;
pub mod explosion;
pub mod matcher;
pub mod persistence;
pub mod report;
pub mod variant;

pub use automator::{AutomationSettings, Automator, CODE_PLACEHOLDER};
pub use catalog::CatalogSnapshot;
pub use code_gen::{CodeConfig, CodeGenerator};
pub use explosion::{check_readiness, explode_line, BomBook, Explosion, ExplosionEngine};
pub use matcher::VariantMatcher;
pub use persistence::{PersistenceCoordinator, SaveReport};
pub use report::{present_quantity, MaterialsReport, ReportFormat};
pub use variant::{NamedValue, VariantSelector};
