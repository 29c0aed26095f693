//! # Schema Build Errors
//!
//! Every error here is fatal: it is raised once while the type model is being
//! built and a process must not serve requests with a schema that failed.
//!
//! Use the context helpers to say where the problem was found:
//!
//! ```ignore
//! SchemaBuildError::malformed_directive_with_context(
//!     "User.likedPosts",
//!     "relationship",
//!     "missing `direction` argument",
//! )
//! ```

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SchemaBuildError {
    #[error("Failed to parse type definitions: {message}")]
    Parse { message: String },
    #[error("Type `{name}` is defined more than once")]
    DuplicateType { name: String },
    #[error("Unknown type `{type_name}` referenced by `{referenced_by}`")]
    UnknownType {
        type_name: String,
        referenced_by: String,
    },
    #[error("Malformed @{directive} on `{owner}`: {message}")]
    MalformedDirective {
        owner: String,
        directive: String,
        message: String,
    },
    #[error(
        "Conflicting relationship `{interface}.{field}`: `{implementer}` declares {found}, expected {expected}"
    )]
    ConflictingRelationship {
        interface: String,
        field: String,
        implementer: String,
        expected: String,
        found: String,
    },
    #[error("`{implementer}` must implement relationship `{interface}.{field}` with @relationship")]
    MissingImplementation {
        interface: String,
        field: String,
        implementer: String,
    },
    #[error(
        "`{implementer}.{field}` narrows `{declared}` to `{narrowed}`, which is not one of its implementations or members"
    )]
    InvalidNarrowing {
        implementer: String,
        field: String,
        declared: String,
        narrowed: String,
    },
}

impl SchemaBuildError {
    pub fn malformed_directive_with_context(
        owner: impl Into<String>,
        directive: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        SchemaBuildError::MalformedDirective {
            owner: owner.into(),
            directive: directive.into(),
            message: message.into(),
        }
    }

    pub fn unknown_type_with_context(
        type_name: impl Into<String>,
        referenced_by: impl Into<String>,
    ) -> Self {
        SchemaBuildError::UnknownType {
            type_name: type_name.into(),
            referenced_by: referenced_by.into(),
        }
    }
}
