use serde::{Deserialize, Serialize};

use crate::cypher::Statement;
use crate::translator::{Operation, ResponseShape, TranslationError};

#[derive(Debug, Deserialize)]
pub struct TranslateRequest {
    pub operation: Operation,
    /// Overrides the configured nesting bound for this request
    pub max_depth: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct TranslateResponse {
    pub root_field: String,
    pub statements: Vec<Statement>,
    pub response: ResponseShape,
    pub translation_time_ms: f64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
    pub error_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl From<&TranslationError> for ErrorResponse {
    fn from(err: &TranslationError) -> Self {
        let (error_type, path) = match err {
            TranslationError::Validation { path, .. } => ("ValidationError", Some(path.clone())),
            TranslationError::UnknownField { .. } => ("UnknownFieldError", None),
            TranslationError::UnknownType { .. } => ("UnknownTypeError", None),
            TranslationError::CardinalityViolation { .. } => ("CardinalityViolation", None),
        };
        ErrorResponse {
            error: err.to_string(),
            error_type: error_type.to_string(),
            path,
        }
    }
}
