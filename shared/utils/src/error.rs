use serde::{Deserialize, Serialize};
use thiserror::Error;

use bomforge_database::StoreError;

#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum BomForgeError {
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    #[error("Duplicate {entity} code '{code}', try '{suggestion}'")]
    DuplicateCode {
        entity: String,
        code: String,
        suggestion: String,
    },

    #[error("Draft save failed at '{node_code}' after {completed} records were created: {cause}")]
    PartialTreeSave {
        node_code: String,
        completed: usize,
        cause: Box<BomForgeError>,
    },

    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Cycle detected through BOM '{bom_code}'")]
    CycleDetected { bom_code: String },

    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("Database error: {message}")]
    Database { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal server error: {message}")]
    Internal { message: String },
}

impl BomForgeError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn duplicate_code(entity: impl Into<String>, code: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::DuplicateCode {
            entity: entity.into(),
            code: code.into(),
            suggestion: suggestion.into(),
        }
    }

    pub fn partial_tree_save(node_code: impl Into<String>, completed: usize, cause: BomForgeError) -> Self {
        Self::PartialTreeSave {
            node_code: node_code.into(),
            completed,
            cause: Box::new(cause),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn cycle_detected(bom_code: impl Into<String>) -> Self {
        Self::CycleDetected {
            bom_code: bom_code.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// The innermost error, looking through partial-save wrappers.
    pub fn root_cause(&self) -> &BomForgeError {
        match self {
            Self::PartialTreeSave { cause, .. } => cause.root_cause(),
            other => other,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::DuplicateCode { .. } => "DUPLICATE_CODE",
            Self::PartialTreeSave { .. } => "PARTIAL_TREE_SAVE",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Conflict { .. } => "CONFLICT",
            Self::CycleDetected { .. } => "CYCLE_DETECTED",
            Self::Transport { .. } => "TRANSPORT_ERROR",
            Self::Database { .. } => "DATABASE_ERROR",
            Self::Configuration { .. } => "CONFIGURATION_ERROR",
            Self::Internal { .. } => "INTERNAL_SERVER_ERROR",
        }
    }

    /// A partial save reports the status of whatever stopped it.
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::Validation { .. } => 400,
            Self::DuplicateCode { .. } => 409,
            Self::PartialTreeSave { cause, .. } => cause.http_status_code(),
            Self::NotFound { .. } => 404,
            Self::Conflict { .. } => 409,
            Self::CycleDetected { .. } => 422,
            Self::Transport { .. } => 502,
            Self::Database { .. } => 500,
            Self::Configuration { .. } => 500,
            Self::Internal { .. } => 500,
        }
    }
}

pub type BomForgeResult<T> = Result<T, BomForgeError>;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl From<BomForgeError> for ErrorResponse {
    fn from(error: BomForgeError) -> Self {
        let details = match &error {
            BomForgeError::DuplicateCode { code, suggestion, .. } => Some(serde_json::json!({
                "code": code,
                "suggestion": suggestion,
            })),
            BomForgeError::PartialTreeSave {
                node_code,
                completed,
                cause,
            } => Some(serde_json::json!({
                "node_code": node_code,
                "completed": completed,
                "cause_code": cause.error_code(),
            })),
            _ => None,
        };

        Self {
            error: error.error_code().to_string(),
            code: error.error_code().to_string(),
            message: error.to_string(),
            details,
        }
    }
}

// Conversion from common error types
impl From<StoreError> for BomForgeError {
    fn from(error: StoreError) -> Self {
        match error {
            // The suggestion is filled in by code recovery, which knows the local code set.
            StoreError::DuplicateCode { entity, code } => Self::duplicate_code(entity, code.clone(), code),
            StoreError::Conflict(message) => Self::conflict(message),
            StoreError::NotFound(resource) => Self::not_found(resource),
            StoreError::Database(message) => Self::database(message),
            StoreError::Transport(message) => Self::transport(message),
        }
    }
}

impl From<serde_json::Error> for BomForgeError {
    fn from(error: serde_json::Error) -> Self {
        Self::validation("JSON", error.to_string())
    }
}

impl From<csv::Error> for BomForgeError {
    fn from(error: csv::Error) -> Self {
        Self::internal(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_save_reports_cause_status() {
        let cause = BomForgeError::transport("connection reset");
        let err = BomForgeError::partial_tree_save("BOM-WIP-CBG-001", 2, cause.clone());
        assert_eq!(err.error_code(), "PARTIAL_TREE_SAVE");
        assert_eq!(err.http_status_code(), 502);
        assert_eq!(err.root_cause(), &cause);
    }

    #[test]
    fn test_store_error_conversion() {
        let err: BomForgeError = StoreError::Conflict("taken".to_string()).into();
        assert_eq!(err.http_status_code(), 409);

        let err: BomForgeError = StoreError::duplicate_code("bom", "BOM-1").into();
        assert_eq!(err.error_code(), "DUPLICATE_CODE");
    }

    #[test]
    fn test_error_response_details() {
        let response = ErrorResponse::from(BomForgeError::duplicate_code("bom", "BOM-ITM-001", "BOM-ITM-1"));
        assert_eq!(response.code, "DUPLICATE_CODE");
        assert_eq!(response.details.unwrap()["suggestion"], "BOM-ITM-1");
    }
}
