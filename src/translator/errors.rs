use thiserror::Error;

/// Errors raised while turning an operation into statements.
///
/// All of these are detected before any statement is emitted, so an operation
/// that fails translation never reaches the database.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TranslationError {
    #[error("Invalid argument at `{path}`: {message}")]
    Validation { path: String, message: String },
    #[error("Unknown field `{field}` on `{type_name}`")]
    UnknownField { type_name: String, field: String },
    #[error("Unknown type or root field `{name}`")]
    UnknownType { name: String },
    #[error("Cardinality violation on `{type_name}.{field}`: {message}")]
    CardinalityViolation {
        type_name: String,
        field: String,
        message: String,
    },
}

impl TranslationError {
    pub fn validation_with_context(path: impl Into<String>, message: impl Into<String>) -> Self {
        TranslationError::Validation {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn unknown_field(type_name: impl Into<String>, field: impl Into<String>) -> Self {
        TranslationError::UnknownField {
            type_name: type_name.into(),
            field: field.into(),
        }
    }
}
