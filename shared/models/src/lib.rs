//! # Bomforge Core Domain Models
//!
//! This module contains the domain models for the Bomforge bill-of-materials system.
//! All models implement serialization/deserialization with serde; payload models
//! carry validation rules with the validator crate.
//!
//! ## Key Models
//!
//! - **Item**: A catalog item with its bound attribute definitions
//! - **AttributeDefinition**: A named attribute (Color, Size) and its values
//! - **VariantSelection**: At most one chosen value per attribute
//! - **BomNode / BomLine**: The recursive, editable draft recipe tree
//! - **BomDocument**: A persisted, flat recipe referencing items by id
//! - **Requirement / MaterialsRow**: Explosion output for readiness and printing
//!
//! ## Validation
//!
//! - Quantities must be positive, tolerances and times non-negative
//! - Codes must be 1 to 64 characters
//! - `BomNode::validate_tree` checks a whole draft before any storage call

pub mod attribute;
pub mod bom;
pub mod item;
pub mod requirement;
pub mod variant;


pub use attribute::*;
pub use bom::*;
pub use item::*;
pub use requirement::*;
pub use variant::*;
