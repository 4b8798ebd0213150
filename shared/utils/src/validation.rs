use crate::error::{BomForgeError, BomForgeResult};
use bomforge_models::{BomNode, DraftIssue};
use rust_decimal::Decimal;
use validator::{Validate, ValidationErrors};

pub const MAX_CODE_LENGTH: usize = 64;

pub fn validate_model<T: Validate>(model: &T) -> BomForgeResult<()> {
    match model.validate() {
        Ok(()) => Ok(()),
        Err(errors) => {
            let error_messages = format_validation_errors(&errors);
            Err(BomForgeError::validation("model", error_messages))
        }
    }
}

pub fn format_validation_errors(errors: &ValidationErrors) -> String {
    let mut messages = Vec::new();

    for (field, field_errors) in errors.field_errors() {
        for error in field_errors {
            let message = match (&error.message, error.code.as_ref()) {
                (Some(message), _) => message.to_string(),
                (None, "length") => format!("Length validation failed for field '{}'", field),
                (None, "range") => format!("Value out of range for field '{}'", field),
                (None, "required") => format!("Field '{}' is required", field),
                (None, code) => format!("Validation failed for field '{}': {}", field, code),
            };
            messages.push(message);
        }
    }

    messages.join(", ")
}

/// Fold a draft tree's local issues into one validation error.
pub fn validate_draft(root: &BomNode) -> BomForgeResult<()> {
    let issues = root.validate_tree();
    if issues.is_empty() {
        return Ok(());
    }
    Err(issues_to_error(&issues))
}

pub fn issues_to_error(issues: &[DraftIssue]) -> BomForgeError {
    let field = issues
        .first()
        .map(|issue| format!("{}.{}", issue.node_code, issue.field))
        .unwrap_or_default();
    let message = issues
        .iter()
        .map(|issue| format!("[{}] {}: {}", issue.node_code, issue.field, issue.message))
        .collect::<Vec<_>>()
        .join("; ");
    BomForgeError::validation(field, message)
}

pub fn validate_code(field: &str, code: &str) -> BomForgeResult<()> {
    if code.trim().is_empty() {
        return Err(BomForgeError::validation(field, "Code must not be empty"));
    }
    if code.len() > MAX_CODE_LENGTH {
        return Err(BomForgeError::validation(
            field,
            format!("Code must be at most {} characters", MAX_CODE_LENGTH),
        ));
    }
    if code.trim() != code {
        return Err(BomForgeError::validation(field, "Code must not start or end with whitespace"));
    }
    Ok(())
}

pub fn validate_production_quantity(quantity: Decimal) -> BomForgeResult<()> {
    if quantity.is_sign_negative() && !quantity.is_zero() {
        return Err(BomForgeError::validation("quantity", "Production quantity must not be negative"));
    }
    Ok(())
}

pub fn validate_uuid(uuid_str: &str) -> BomForgeResult<uuid::Uuid> {
    uuid::Uuid::parse_str(uuid_str).map_err(|_| BomForgeError::validation("uuid", "Invalid UUID format"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bomforge_models::{BomLine, NewItem};

    #[test]
    fn test_validate_code() {
        assert!(validate_code("code", "BOM-ITM-001").is_ok());
        assert!(validate_code("code", "").is_err());
        assert!(validate_code("code", "   ").is_err());
        assert!(validate_code("code", " BOM").is_err());
        assert!(validate_code("code", &"X".repeat(65)).is_err());
    }

    #[test]
    fn test_validate_model_uses_field_messages() {
        let err = validate_model(&NewItem::new("", "Resin", "kg")).unwrap_err();
        match err {
            BomForgeError::Validation { message, .. } => {
                assert!(message.contains("Item code must be between 1 and 64 characters"))
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_validate_draft_names_the_node() {
        let root = BomNode::new("BOM-ROOT", "ROOT").with_line(BomLine::fixed("RAW", Decimal::ZERO));
        let err = validate_draft(&root).unwrap_err();
        assert_eq!(
            err,
            BomForgeError::validation(
                "BOM-ROOT.lines[0].quantity",
                "[BOM-ROOT] lines[0].quantity: Quantity must be greater than zero"
            )
        );
    }

    #[test]
    fn test_validate_production_quantity() {
        assert!(validate_production_quantity(Decimal::ZERO).is_ok());
        assert!(validate_production_quantity(Decimal::from(-1)).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("00000000-0000-0000-0000-000000000000").is_ok());
        assert!(validate_uuid("not-a-uuid").is_err());
    }
}
