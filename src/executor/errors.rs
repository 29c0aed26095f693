use thiserror::Error;

use crate::response::ResponseError;
use crate::translator::TranslationError;

/// Failures reported by the database collaborator.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DatabaseError {
    #[error("Connectivity: {0}")]
    Connectivity(String),
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
    #[error("Transaction conflict: {0}")]
    TransactionConflict(String),
    #[error("Timeout: {0}")]
    Timeout(String),
    #[error("Query failed: {0}")]
    Query(String),
}

impl DatabaseError {
    pub fn message(&self) -> &str {
        match self {
            DatabaseError::Connectivity(message)
            | DatabaseError::ConstraintViolation(message)
            | DatabaseError::TransactionConflict(message)
            | DatabaseError::Timeout(message)
            | DatabaseError::Query(message) => message,
        }
    }
}

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error(transparent)]
    Translation(#[from] TranslationError),

    #[error("Cardinality violation during {phase} of `{field}`: {message}")]
    CardinalityViolation {
        phase: String,
        field: String,
        message: String,
    },

    #[error("Database error during {phase} of `{field}`: {source}")]
    Database {
        phase: String,
        field: String,
        #[source]
        source: DatabaseError,
    },

    #[error(transparent)]
    Response(#[from] ResponseError),

    #[error("Operation cancelled")]
    Cancelled,
}

/// Marker carried by the in-statement cardinality guards.
pub(crate) const CARDINALITY_MARKER: &str = "CARDINALITY_VIOLATION";

impl ExecutionError {
    /// Classify a database failure, lifting cardinality guard failures out of
    /// the generic database errors.
    pub fn database_with_context(
        phase: impl Into<String>,
        field: impl Into<String>,
        source: DatabaseError,
    ) -> Self {
        let message = source.message();
        if let Some(start) = message.find(CARDINALITY_MARKER) {
            let detail = message[start + CARDINALITY_MARKER.len()..]
                .trim_start_matches(':')
                .trim();
            return ExecutionError::CardinalityViolation {
                phase: phase.into(),
                field: field.into(),
                message: detail.to_string(),
            };
        }
        ExecutionError::Database {
            phase: phase.into(),
            field: field.into(),
            source,
        }
    }
}
