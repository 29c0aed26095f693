//! In-memory graph of declared entities.
//!
//! Built once from a parsed type-definition document and read-only afterwards.

mod builder;
pub mod errors;
pub mod graph_model;
mod polymorphism;

pub use builder::build_type_model;
pub use errors::SchemaBuildError;
pub use graph_model::{
    lower_first, upper_first, Direction, EdgeProperties, Entity, EnumType, InterfaceType,
    NodeType, PolymorphicRelationship, RelationshipField, RelationshipPropertiesType,
    RelationshipVariant, ScalarField, ScalarKind, TargetKind, TypeModel, UnionType,
};

impl TypeModel {
    /// Parse and build in one step.
    pub fn from_sdl(type_defs: &str) -> Result<Self, SchemaBuildError> {
        let document = crate::sdl_parser::parse_document(type_defs)
            .map_err(|error| SchemaBuildError::Parse {
                message: error.to_string(),
            })?;
        build_type_model(&document)
    }
}
