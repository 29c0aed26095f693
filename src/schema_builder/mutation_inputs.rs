use super::naming::{EntityNames, RelationshipNames};
use super::types::{InputValueDef, TypeDefinition, TypeRef};
use super::ShapeBuilder;
use crate::type_model::{
    NodeType, RelationshipField, RelationshipPropertiesType, ScalarField, TargetKind,
};

/// Which per-field relationship input a mutation shape refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum RelationshipInputKind {
    Create,
    Update,
    Connect,
    Disconnect,
    Delete,
    Relation,
}

pub(super) fn relationship_input_type(
    names: &RelationshipNames,
    field: &RelationshipField,
    kind: RelationshipInputKind,
) -> TypeRef {
    use RelationshipInputKind as K;
    if field.target_kind == TargetKind::Union {
        let name = match kind {
            K::Create => names.union_create_input(),
            K::Update => names.union_update_input(),
            K::Connect => names.union_connect_input(),
            K::Disconnect => names.union_disconnect_input(),
            K::Delete => names.union_delete_input(),
            K::Relation => names.create_field_input(),
        };
        return TypeRef::named(name);
    }
    match kind {
        K::Create => TypeRef::named(names.field_input()),
        K::Update => TypeRef::by_cardinality(names.update_field_input(), field.is_list),
        K::Connect => TypeRef::by_cardinality(names.connect_field_input(), field.is_list),
        K::Disconnect => TypeRef::by_cardinality(names.disconnect_field_input(), field.is_list),
        K::Delete => TypeRef::by_cardinality(names.delete_field_input(), field.is_list),
        K::Relation => TypeRef::by_cardinality(names.create_field_input(), field.is_list),
    }
}

/// Scalar fields accepted on create; `@id` values are generated.
pub(super) fn create_scalar_fields(fields: &[ScalarField]) -> Vec<InputValueDef> {
    fields
        .iter()
        .filter(|f| !f.autogenerate)
        .map(|f| {
            let base = TypeRef::by_cardinality(f.kind.type_name(), f.is_list);
            let ty = if f.required && f.default_value.is_none() {
                base.non_null()
            } else {
                base
            };
            let input = InputValueDef::new(f.name.as_str(), ty);
            match &f.default_value {
                Some(default) => input.with_default(default.clone()),
                None => input,
            }
        })
        .collect()
}

/// Scalar fields accepted on update, with `_INCREMENT`/`_DECREMENT` for numbers.
pub(super) fn update_scalar_fields(fields: &[ScalarField]) -> Vec<InputValueDef> {
    let mut inputs = Vec::new();
    for field in fields.iter().filter(|f| !f.autogenerate) {
        inputs.push(InputValueDef::new(
            field.name.as_str(),
            TypeRef::by_cardinality(field.kind.type_name(), field.is_list),
        ));
        if field.kind.is_numeric() && !field.is_list {
            for suffix in ["_INCREMENT", "_DECREMENT"] {
                inputs.push(InputValueDef::new(
                    format!("{}{}", field.name, suffix),
                    TypeRef::named(field.kind.type_name()),
                ));
            }
        }
    }
    inputs
}

impl ShapeBuilder<'_> {
    pub(super) fn add_node_shapes(&mut self, node: &NodeType) {
        let name = node.name.as_str();
        let names = EntityNames::new(name);

        let fields = self.object_fields(name, &node.fields, &node.relationships);
        self.catalogue.insert(TypeDefinition::Object(super::ObjectTypeDef {
            name: name.to_string(),
            implements: node.interfaces.clone(),
            fields,
        }));
        self.add_entity_where(name, &node.fields, &node.relationships, vec![]);
        self.add_sort_and_options(name, &node.fields);
        self.add_entity_aggregate_selection(name, &node.fields);
        self.add_entity_connection(name);
        self.add_mutation_responses(name);

        let mut create = create_scalar_fields(&node.fields);
        create.extend(self.relationship_inputs(name, &node.relationships, RelationshipInputKind::Create));
        self.catalogue.insert(TypeDefinition::input(names.create_input(), create));

        let mut update = update_scalar_fields(&node.fields);
        update.extend(self.relationship_inputs(name, &node.relationships, RelationshipInputKind::Update));
        self.catalogue.insert(TypeDefinition::input(names.update_input(), update));

        self.add_relationship_keyed_inputs(name, &node.relationships, vec![]);

        for relationship in &node.relationships {
            self.add_connection_where(name, relationship);
            self.add_relationship_field_inputs(name, relationship);
        }
    }

    /// `TConnectInput`, `TDisconnectInput`, `TDeleteInput`, `TRelationInput`, `TConnectWhere`.
    pub(super) fn add_relationship_keyed_inputs(
        &mut self,
        name: &str,
        relationships: &[RelationshipField],
        on: Vec<(RelationshipInputKind, InputValueDef)>,
    ) {
        let names = EntityNames::new(name);
        for (kind, type_name) in [
            (RelationshipInputKind::Connect, names.connect_input()),
            (RelationshipInputKind::Disconnect, names.disconnect_input()),
            (RelationshipInputKind::Delete, names.delete_input()),
            (RelationshipInputKind::Relation, names.relation_input()),
        ] {
            let mut inputs = self.relationship_inputs(name, relationships, kind);
            inputs.extend(on.iter().filter(|(k, _)| *k == kind).map(|(_, i)| i.clone()));
            self.catalogue.insert(TypeDefinition::input(type_name, inputs));
        }
        self.catalogue.insert(TypeDefinition::input(
            names.connect_where(),
            vec![InputValueDef::new(
                "node",
                TypeRef::required(names.where_input()),
            )],
        ));
    }

    pub(super) fn relationship_inputs(
        &self,
        owner: &str,
        relationships: &[RelationshipField],
        kind: RelationshipInputKind,
    ) -> Vec<InputValueDef> {
        relationships
            .iter()
            .map(|field| {
                let names = RelationshipNames::new(owner, field);
                InputValueDef::new(
                    field.name.as_str(),
                    relationship_input_type(&names, field, kind),
                )
            })
            .collect()
    }

    pub(super) fn add_sort_and_options(&mut self, name: &str, fields: &[ScalarField]) {
        let names = EntityNames::new(name);
        self.catalogue.insert(TypeDefinition::input(
            names.sort_input(),
            fields
                .iter()
                .filter(|f| !f.is_list)
                .map(|f| InputValueDef::new(f.name.as_str(), TypeRef::named("SortDirection")))
                .collect(),
        ));
        self.catalogue.insert(TypeDefinition::input(
            names.options_input(),
            vec![
                InputValueDef::new("sort", TypeRef::list(names.sort_input())),
                InputValueDef::new("limit", TypeRef::named("Int")),
                InputValueDef::new("offset", TypeRef::named("Int")),
            ],
        ));
    }

    pub(super) fn add_properties_shapes(&mut self, properties: &RelationshipPropertiesType) {
        let name = properties.name.as_str();
        let names = EntityNames::new(name);
        self.add_properties_object(name, &properties.fields);
        self.add_properties_where(name, &properties.fields);
        self.catalogue.insert(TypeDefinition::input(
            names.sort_input(),
            properties
                .fields
                .iter()
                .filter(|f| !f.is_list)
                .map(|f| InputValueDef::new(f.name.as_str(), TypeRef::named("SortDirection")))
                .collect(),
        ));
        self.catalogue.insert(TypeDefinition::input(
            names.create_input(),
            create_scalar_fields(&properties.fields),
        ));
        self.catalogue.insert(TypeDefinition::input(
            names.update_input(),
            update_scalar_fields(&properties.fields),
        ));
    }
}
