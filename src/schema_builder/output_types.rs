use super::naming::{EntityNames, RelationshipNames};
use super::types::{FieldDef, InputValueDef, ObjectTypeDef, TypeDefinition, TypeRef};
use super::{EdgeShape, ShapeBuilder};
use crate::type_model::{RelationshipField, ScalarField, TargetKind};

pub(super) fn scalar_output_type(field: &ScalarField) -> TypeRef {
    let base = if field.is_list {
        TypeRef::list(field.kind.type_name())
    } else {
        TypeRef::named(field.kind.type_name())
    };
    if field.required {
        base.non_null()
    } else {
        base
    }
}

fn directed_arg() -> InputValueDef {
    InputValueDef::new("directed", TypeRef::named("Boolean")).with_default(serde_json::json!(true))
}

impl ShapeBuilder<'_> {
    /// Fields of a node or interface object: scalars, then per relationship
    /// the field itself, its aggregate and its connection.
    pub(super) fn object_fields(
        &mut self,
        owner: &str,
        fields: &[ScalarField],
        relationships: &[RelationshipField],
    ) -> Vec<FieldDef> {
        let mut output: Vec<FieldDef> = fields
            .iter()
            .map(|f| FieldDef::new(f.name.as_str(), scalar_output_type(f)))
            .collect();

        for relationship in relationships {
            let names = RelationshipNames::new(owner, relationship);
            let target = EntityNames::new(&relationship.target);
            let is_union = relationship.target_kind == TargetKind::Union;

            let ty = if relationship.is_list {
                TypeRef::required_list(relationship.target.as_str())
            } else if relationship.required {
                TypeRef::required(relationship.target.as_str())
            } else {
                TypeRef::named(relationship.target.as_str())
            };
            let options = if is_union {
                "QueryOptions".to_string()
            } else {
                target.options_input()
            };
            output.push(FieldDef::new(relationship.name.as_str(), ty).with_args(vec![
                InputValueDef::new("where", TypeRef::named(target.where_input())),
                InputValueDef::new("options", TypeRef::named(options)),
                directed_arg(),
            ]));

            if !is_union {
                output.push(
                    FieldDef::new(
                        names.aggregate_field(),
                        TypeRef::named(names.aggregation_selection()),
                    )
                    .with_args(vec![
                        InputValueDef::new("where", TypeRef::named(target.where_input())),
                        directed_arg(),
                    ]),
                );
                self.add_relationship_aggregate_selection(owner, relationship);
            }

            let mut connection_args = vec![
                InputValueDef::new("where", TypeRef::named(names.connection_where())),
                InputValueDef::new("first", TypeRef::named("Int")),
                InputValueDef::new("after", TypeRef::named("String")),
                directed_arg(),
            ];
            if !is_union {
                connection_args.push(InputValueDef::new(
                    "sort",
                    TypeRef::list(names.connection_sort()),
                ));
            }
            output.push(
                FieldDef::new(names.connection_field(), TypeRef::required(names.connection()))
                    .with_args(connection_args),
            );
            self.add_relationship_connection(owner, relationship);
        }
        output
    }

    /// `SFConnection` and `SFRelationship`.
    fn add_relationship_connection(&mut self, owner: &str, field: &RelationshipField) {
        let names = RelationshipNames::new(owner, field);
        self.catalogue.insert(TypeDefinition::object(
            names.connection(),
            vec![
                FieldDef::new("edges", TypeRef::required_list(names.relationship())),
                FieldDef::new("totalCount", TypeRef::required("Int")),
                FieldDef::new("pageInfo", TypeRef::required("PageInfo")),
            ],
        ));

        let mut relationship = vec![
            FieldDef::new("cursor", TypeRef::required("String")),
            FieldDef::new("node", TypeRef::required(field.target.as_str())),
        ];
        match self.edge_shape(owner, field) {
            EdgeShape::None => {}
            EdgeShape::Shared(properties) => relationship.push(FieldDef::new(
                "properties",
                TypeRef::required(properties.name.as_str()),
            )),
            EdgeShape::Keyed => {
                relationship.push(FieldDef::new(
                    "properties",
                    TypeRef::required(names.properties_union()),
                ));
                self.add_properties_union(owner, field);
            }
        }
        self.catalogue
            .insert(TypeDefinition::object(names.relationship(), relationship));
    }

    /// `TEdge` and `TsConnection` for root connection queries.
    pub(super) fn add_entity_connection(&mut self, name: &str) {
        let names = EntityNames::new(name);
        self.catalogue.insert(TypeDefinition::object(
            names.edge(),
            vec![
                FieldDef::new("cursor", TypeRef::required("String")),
                FieldDef::new("node", TypeRef::required(name)),
            ],
        ));
        self.catalogue.insert(TypeDefinition::object(
            names.connection(),
            vec![
                FieldDef::new("totalCount", TypeRef::required("Int")),
                FieldDef::new("pageInfo", TypeRef::required("PageInfo")),
                FieldDef::new("edges", TypeRef::required_list(names.edge())),
            ],
        ));
    }

    pub(super) fn add_mutation_responses(&mut self, name: &str) {
        let names = EntityNames::new(name);
        self.catalogue.insert(TypeDefinition::object(
            names.create_response(),
            vec![
                FieldDef::new("info", TypeRef::required("CreateInfo")),
                FieldDef::new(names.plural.as_str(), TypeRef::required_list(name)),
            ],
        ));
        self.catalogue.insert(TypeDefinition::object(
            names.update_response(),
            vec![
                FieldDef::new("info", TypeRef::required("UpdateInfo")),
                FieldDef::new(names.plural.as_str(), TypeRef::required_list(name)),
            ],
        ));
    }

    /// Output object for a relationship properties type.
    pub(super) fn add_properties_object(&mut self, name: &str, fields: &[ScalarField]) {
        self.catalogue.insert(TypeDefinition::Object(ObjectTypeDef {
            name: name.to_string(),
            implements: vec![],
            fields: fields
                .iter()
                .map(|f| FieldDef::new(f.name.as_str(), scalar_output_type(f)))
                .collect(),
        }));
    }
}
