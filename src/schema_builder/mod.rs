//! Schema compiler: derives the generated API catalogue from the type model.
//!
//! Every shape is a pure function of the [`TypeModel`]. Builders insert into a
//! shared [`ApiCatalogue`]; inputs that end up with no fields are pruned at the
//! end together with every reference to them.

mod aggregate_types;
mod mutation_inputs;
pub mod naming;
mod output_types;
mod polymorphism;
pub mod printer;
mod relationship_inputs;
pub mod types;
mod where_input;
pub mod where_operators;

use std::collections::BTreeMap;

use serde::Serialize;

use crate::type_model::{
    EdgeProperties, RelationshipField, RelationshipPropertiesType, SchemaBuildError, TargetKind,
    TypeModel,
};

pub use naming::{plural, root_fields, EntityNames, RelationshipNames, RootField, RootKind};
pub use types::{ApiCatalogue, FieldDef, InputValueDef, ObjectTypeDef, TypeDefinition, TypeRef};
pub use where_operators::{operators_for, parse_where_key, WhereOperator};

/// Type model plus everything generated from it, built once and shared read-only.
#[derive(Debug, Clone, Serialize)]
pub struct CompiledSchema {
    pub model: TypeModel,
    pub catalogue: ApiCatalogue,
    pub root_fields: BTreeMap<String, RootField>,
}

impl CompiledSchema {
    pub fn new(model: TypeModel) -> Self {
        let catalogue = build_catalogue(&model);
        let root_fields = root_fields(&model);
        log::info!(
            "Compiled schema: {} generated types, {} query fields, {} mutation fields",
            catalogue.types.len(),
            catalogue.query.len(),
            catalogue.mutation.len()
        );
        CompiledSchema {
            model,
            catalogue,
            root_fields,
        }
    }

    pub fn from_sdl(type_defs: &str) -> Result<Self, SchemaBuildError> {
        Ok(CompiledSchema::new(TypeModel::from_sdl(type_defs)?))
    }

    pub fn root_field(&self, name: &str) -> Option<&RootField> {
        self.root_fields.get(name)
    }

    pub fn print_sdl(&self) -> String {
        printer::print_catalogue(&self.catalogue)
    }
}

/// Generate the complete catalogue for `model`.
pub fn build_catalogue(model: &TypeModel) -> ApiCatalogue {
    let mut builder = ShapeBuilder {
        model,
        catalogue: ApiCatalogue::default(),
    };

    builder.add_shared_types();
    for enum_type in model.enums() {
        builder.catalogue.insert(TypeDefinition::Enum {
            name: enum_type.name.clone(),
            values: enum_type.values.clone(),
        });
    }
    for properties in model.relationship_properties() {
        builder.add_properties_shapes(properties);
    }
    for node in model.nodes() {
        builder.add_node_shapes(node);
    }
    for interface in model.interfaces() {
        builder.add_interface_shapes(interface);
    }
    for union in model.unions() {
        builder.add_union_shapes(union);
    }
    builder.add_root_fields();

    let mut catalogue = builder.catalogue;
    catalogue.prune_empty();
    catalogue
}

/// How edge properties appear in the shapes of one relationship field.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum EdgeShape<'a> {
    None,
    Shared(&'a RelationshipPropertiesType),
    /// Keyed by implementer name
    Keyed,
}

pub(crate) struct ShapeBuilder<'m> {
    pub(crate) model: &'m TypeModel,
    pub(crate) catalogue: ApiCatalogue,
}

impl<'m> ShapeBuilder<'m> {
    pub(crate) fn edge_shape(&self, owner: &str, field: &RelationshipField) -> EdgeShape<'m> {
        match self.model.edge_properties(owner, field) {
            EdgeProperties::None => EdgeShape::None,
            EdgeProperties::Shared(properties) => EdgeShape::Shared(properties),
            EdgeProperties::PerImplementer(_) => EdgeShape::Keyed,
        }
    }

    /// Member node names for a union target, the target itself otherwise.
    pub(crate) fn union_members(&self, field: &RelationshipField) -> Vec<String> {
        match field.target_kind {
            TargetKind::Union => self
                .model
                .union(&field.target)
                .map(|u| u.members.clone())
                .unwrap_or_default(),
            _ => vec![field.target.clone()],
        }
    }

    fn add_shared_types(&mut self) {
        use types::FieldDef as F;

        self.catalogue.insert(TypeDefinition::Enum {
            name: "SortDirection".to_string(),
            values: vec!["ASC".to_string(), "DESC".to_string()],
        });
        self.catalogue.insert(TypeDefinition::object(
            "PageInfo",
            vec![
                F::new("hasNextPage", TypeRef::required("Boolean")),
                F::new("hasPreviousPage", TypeRef::required("Boolean")),
                F::new("startCursor", TypeRef::named("String")),
                F::new("endCursor", TypeRef::named("String")),
            ],
        ));
        self.catalogue.insert(TypeDefinition::object(
            "CreateInfo",
            vec![
                F::new("nodesCreated", TypeRef::required("Int")),
                F::new("relationshipsCreated", TypeRef::required("Int")),
            ],
        ));
        self.catalogue.insert(TypeDefinition::object(
            "UpdateInfo",
            vec![
                F::new("nodesCreated", TypeRef::required("Int")),
                F::new("nodesDeleted", TypeRef::required("Int")),
                F::new("relationshipsCreated", TypeRef::required("Int")),
                F::new("relationshipsDeleted", TypeRef::required("Int")),
            ],
        ));
        self.catalogue.insert(TypeDefinition::object(
            "DeleteInfo",
            vec![
                F::new("nodesDeleted", TypeRef::required("Int")),
                F::new("relationshipsDeleted", TypeRef::required("Int")),
            ],
        ));
        self.catalogue.insert(TypeDefinition::input(
            "QueryOptions",
            vec![
                InputValueDef::new("limit", TypeRef::named("Int")),
                InputValueDef::new("offset", TypeRef::named("Int")),
            ],
        ));
        for scalar in [
            "BigInt",
            "DateTime",
            "LocalDateTime",
            "Date",
            "Time",
            "LocalTime",
            "Duration",
        ] {
            self.catalogue.insert(TypeDefinition::Scalar {
                name: scalar.to_string(),
            });
        }
    }

    fn add_root_fields(&mut self) {
        let root_fields = root_fields(self.model);
        for (name, root) in root_fields {
            let names = EntityNames::new(&root.entity);
            let where_arg = InputValueDef::new("where", TypeRef::named(names.where_input()));
            let field = match root.kind {
                RootKind::Read => {
                    let options = if self.model.union(&root.entity).is_some() {
                        "QueryOptions".to_string()
                    } else {
                        names.options_input()
                    };
                    FieldDef::new(name, TypeRef::required_list(root.entity.as_str())).with_args(vec![
                        where_arg,
                        InputValueDef::new("options", TypeRef::named(options)),
                    ])
                }
                RootKind::Aggregate => {
                    FieldDef::new(name, TypeRef::required(names.aggregate_selection()))
                        .with_args(vec![where_arg])
                }
                RootKind::Connection => FieldDef::new(name, TypeRef::required(names.connection()))
                    .with_args(vec![
                        where_arg,
                        InputValueDef::new("first", TypeRef::named("Int")),
                        InputValueDef::new("after", TypeRef::named("String")),
                        InputValueDef::new("sort", TypeRef::list(names.sort_input())),
                    ]),
                RootKind::Create => FieldDef::new(name, TypeRef::required(names.create_response()))
                    .with_args(vec![InputValueDef::new(
                        "input",
                        TypeRef::required_list(names.create_input()),
                    )]),
                RootKind::Update => FieldDef::new(name, TypeRef::required(names.update_response()))
                    .with_args(vec![
                        where_arg,
                        InputValueDef::new("update", TypeRef::named(names.update_input())),
                        InputValueDef::new("connect", TypeRef::named(names.connect_input())),
                        InputValueDef::new("disconnect", TypeRef::named(names.disconnect_input())),
                        InputValueDef::new("create", TypeRef::named(names.relation_input())),
                        InputValueDef::new("delete", TypeRef::named(names.delete_input())),
                    ]),
                RootKind::Delete => FieldDef::new(name, TypeRef::required("DeleteInfo")).with_args(
                    vec![
                        where_arg,
                        InputValueDef::new("delete", TypeRef::named(names.delete_input())),
                    ],
                ),
            };
            if root.kind.is_mutation() {
                self.catalogue.mutation.push(field);
            } else {
                self.catalogue.query.push(field);
            }
        }
    }
}
