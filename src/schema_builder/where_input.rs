use super::naming::{EntityNames, RelationshipNames};
use super::types::{InputValueDef, TypeDefinition, TypeRef};
use super::where_operators::operators_for;
use super::{EdgeShape, ShapeBuilder};
use crate::type_model::{RelationshipField, ScalarField, TargetKind};

pub(crate) const QUANTIFIERS: [&str; 4] = ["ALL", "NONE", "SINGLE", "SOME"];

/// Comparator fields for every scalar, in declaration order.
pub(super) fn scalar_where_fields(fields: &[ScalarField]) -> Vec<InputValueDef> {
    let mut inputs = Vec::new();
    for field in fields {
        for op in operators_for(field) {
            let (type_name, is_list) = op.value_type(field);
            let mut input = InputValueDef::new(
                format!("{}{}", field.name, op.suffix()),
                TypeRef::by_cardinality(type_name, is_list),
            );
            if let Some(reason) = op.deprecation() {
                input = input.deprecated(reason);
            }
            inputs.push(input);
        }
    }
    inputs
}

fn composition_fields(where_name: &str) -> Vec<InputValueDef> {
    vec![
        InputValueDef::new("OR", TypeRef::list(where_name)),
        InputValueDef::new("AND", TypeRef::list(where_name)),
        InputValueDef::new("NOT", TypeRef::named(where_name)),
    ]
}

impl ShapeBuilder<'_> {
    /// `TWhere` for a node or interface; interfaces add their dispatch fields separately.
    pub(super) fn add_entity_where(
        &mut self,
        name: &str,
        fields: &[ScalarField],
        relationships: &[RelationshipField],
        extra: Vec<InputValueDef>,
    ) {
        let where_name = EntityNames::new(name).where_input();
        let mut inputs = scalar_where_fields(fields);
        inputs.extend(extra);
        inputs.extend(composition_fields(&where_name));
        for relationship in relationships {
            inputs.extend(self.relationship_where_fields(name, relationship));
        }
        self.catalogue.insert(TypeDefinition::input(where_name, inputs));
    }

    fn relationship_where_fields(
        &self,
        owner: &str,
        field: &RelationshipField,
    ) -> Vec<InputValueDef> {
        let names = RelationshipNames::new(owner, field);
        let target_where = EntityNames::new(&field.target).where_input();
        let connection_where = names.connection_where();
        let connection = names.connection_field();
        let mut inputs = Vec::new();

        if field.is_list {
            for quantifier in QUANTIFIERS {
                inputs.push(InputValueDef::new(
                    format!("{}_{}", field.name, quantifier),
                    TypeRef::named(target_where.as_str()),
                ));
            }
            inputs.push(
                InputValueDef::new(field.name.as_str(), TypeRef::named(target_where.as_str()))
                    .deprecated(format!("Use `{}_SOME` instead.", field.name)),
            );
            inputs.push(
                InputValueDef::new(format!("{}_NOT", field.name), TypeRef::named(target_where.as_str()))
                    .deprecated(format!("Use `{}_NONE` instead.", field.name)),
            );
            for quantifier in QUANTIFIERS {
                inputs.push(InputValueDef::new(
                    format!("{}_{}", connection, quantifier),
                    TypeRef::named(connection_where.as_str()),
                ));
            }
            inputs.push(
                InputValueDef::new(connection.as_str(), TypeRef::named(connection_where.as_str()))
                    .deprecated(format!("Use `{}_SOME` instead.", connection)),
            );
            inputs.push(
                InputValueDef::new(format!("{}_NOT", connection), TypeRef::named(connection_where.as_str()))
                    .deprecated(format!("Use `{}_NONE` instead.", connection)),
            );
        } else {
            inputs.push(InputValueDef::new(
                field.name.as_str(),
                TypeRef::named(target_where.as_str()),
            ));
            inputs.push(InputValueDef::new(
                format!("{}_NOT", field.name),
                TypeRef::named(target_where.as_str()),
            ));
            inputs.push(InputValueDef::new(
                connection.as_str(),
                TypeRef::named(connection_where.as_str()),
            ));
            inputs.push(InputValueDef::new(
                format!("{}_NOT", connection),
                TypeRef::named(connection_where.as_str()),
            ));
        }

        if field.target_kind != TargetKind::Union {
            inputs.push(InputValueDef::new(
                names.aggregate_field(),
                TypeRef::named(names.aggregate_input()),
            ));
        }
        inputs
    }

    /// `SFConnectionWhere`; keyed by member for union targets.
    pub(super) fn add_connection_where(&mut self, owner: &str, field: &RelationshipField) {
        let names = RelationshipNames::new(owner, field);
        if field.target_kind == TargetKind::Union {
            let mut keyed = Vec::new();
            for member in self.union_members(field) {
                let member_names = names.member(&member);
                keyed.push(InputValueDef::new(
                    member.as_str(),
                    TypeRef::named(member_names.connection_where()),
                ));
                let shape = self.edge_shape(owner, field);
                self.insert_connection_where(&member_names, &member, &shape);
            }
            self.catalogue
                .insert(TypeDefinition::input(names.connection_where(), keyed));
        } else {
            let shape = self.edge_shape(owner, field);
            self.insert_connection_where(&names, &field.target, &shape);
        }
    }

    fn insert_connection_where(
        &mut self,
        names: &RelationshipNames,
        target: &str,
        edge: &EdgeShape<'_>,
    ) {
        let where_name = names.connection_where();
        let node_where = EntityNames::new(target).where_input();
        let mut inputs = composition_fields(&where_name);
        inputs.push(InputValueDef::new("node", TypeRef::named(node_where.as_str())));
        inputs.push(
            InputValueDef::new("node_NOT", TypeRef::named(node_where.as_str()))
                .deprecated("Negation filters will be deprecated, use the NOT operator instead."),
        );
        let edge_where = match edge {
            EdgeShape::None => None,
            EdgeShape::Shared(properties) => Some(EntityNames::new(&properties.name).where_input()),
            EdgeShape::Keyed => Some(names.edge_where()),
        };
        if let Some(edge_where) = edge_where {
            inputs.push(InputValueDef::new("edge", TypeRef::named(edge_where.as_str())));
            inputs.push(
                InputValueDef::new("edge_NOT", TypeRef::named(edge_where))
                    .deprecated("Negation filters will be deprecated, use the NOT operator instead."),
            );
        }
        self.catalogue.insert(TypeDefinition::input(where_name, inputs));
    }

    /// `PWhere` over relationship properties.
    pub(super) fn add_properties_where(&mut self, name: &str, fields: &[ScalarField]) {
        let where_name = EntityNames::new(name).where_input();
        let mut inputs = scalar_where_fields(fields);
        inputs.extend(composition_fields(&where_name));
        self.catalogue.insert(TypeDefinition::input(where_name, inputs));
    }
}
