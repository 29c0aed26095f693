//! Parser for annotated type-definition documents.
//!
//! Accepts the subset of GraphQL SDL used to describe a graph model:
//! `type`, `interface`, `union` and `enum` definitions, list / non-null
//! field types, and directives with constant arguments. Descriptions,
//! comments and commas are skipped.
//!
//! ```ignore
//! let document = parse_document(r#"
//!     type User {
//!         name: String!
//!         likedPosts: [Post!]! @relationship(type: "LIKES", direction: OUT)
//!     }
//! "#)?;
//! ```

use ast::Document;
use common::ignored;
use nom::{multi::many0, Parser};

pub mod ast;
mod common;
mod definitions;
pub(crate) mod errors;
mod values;

pub use errors::SyntaxError;

/// Parse a whole document; anything left unparsed is reported with its line and column.
pub fn parse_document(input: &str) -> Result<Document<'_>, SyntaxError> {
    let parsed = (ignored, many0(definitions::parse_definition), ignored).parse(input);

    match parsed {
        Ok((rest, (_, definitions, _))) => {
            if rest.is_empty() {
                log::debug!("Parsed {} type definitions", definitions.len());
                Ok(Document { definitions })
            } else {
                let unexpected = rest.lines().next().unwrap_or_default().trim();
                Err(SyntaxError::at(input, rest, format!("unexpected `{}`", unexpected)))
            }
        }
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(e.locate(input)),
        Err(nom::Err::Incomplete(_)) => Err(SyntaxError::at(input, "", "incomplete type definitions")),
    }
}
