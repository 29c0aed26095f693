//! Interface and union dispatch shapes.
//!
//! Interfaces get flattened shapes over their own fields plus `_on` inputs keyed
//! by implementer. Unions have no shared fields, so every shape is keyed by member.

use super::mutation_inputs::{update_scalar_fields, RelationshipInputKind};
use super::naming::{EntityNames, RelationshipNames};
use super::types::{InputValueDef, ObjectTypeDef, TypeDefinition, TypeRef};
use super::ShapeBuilder;
use crate::type_model::{EdgeProperties, InterfaceType, RelationshipField, UnionType};

impl ShapeBuilder<'_> {
    pub(super) fn add_interface_shapes(&mut self, interface: &InterfaceType) {
        let name = interface.name.as_str();
        let names = EntityNames::new(name);
        let implementers = &interface.implementers;

        let fields = self.object_fields(name, &interface.fields, &interface.relationships);
        self.catalogue.insert(TypeDefinition::Interface(ObjectTypeDef {
            name: name.to_string(),
            implements: vec![],
            fields,
        }));
        self.catalogue.insert(TypeDefinition::Enum {
            name: names.implementation_enum(),
            values: implementers.clone(),
        });

        self.keyed_by_implementer(&names.implementations_input("Where"), implementers, |m| {
            TypeRef::named(EntityNames::new(m).where_input())
        });
        self.add_entity_where(
            name,
            &interface.fields,
            &interface.relationships,
            vec![
                InputValueDef::new("typename_IN", TypeRef::list(names.implementation_enum())),
                InputValueDef::new("_on", TypeRef::named(names.implementations_input("Where"))),
            ],
        );
        self.add_sort_and_options(name, &interface.fields);
        self.add_entity_aggregate_selection(name, &interface.fields);
        self.add_entity_connection(name);

        self.keyed_by_implementer(&names.create_input(), implementers, |m| {
            TypeRef::named(EntityNames::new(m).create_input())
        });

        self.keyed_by_implementer(&names.implementations_input("Update"), implementers, |m| {
            TypeRef::named(EntityNames::new(m).update_input())
        });
        let mut update = update_scalar_fields(&interface.fields);
        update.extend(self.relationship_inputs(
            name,
            &interface.relationships,
            RelationshipInputKind::Update,
        ));
        update.push(InputValueDef::new(
            "_on",
            TypeRef::named(names.implementations_input("Update")),
        ));
        self.catalogue
            .insert(TypeDefinition::input(names.update_input(), update));

        let operations: [(RelationshipInputKind, &str, fn(&EntityNames) -> String); 3] = [
            (RelationshipInputKind::Connect, "Connect", EntityNames::connect_input),
            (RelationshipInputKind::Disconnect, "Disconnect", EntityNames::disconnect_input),
            (RelationshipInputKind::Delete, "Delete", EntityNames::delete_input),
        ];
        let mut on = Vec::new();
        for (kind, operation, member_input) in operations {
            let keyed_name = names.implementations_input(operation);
            self.keyed_by_implementer(&keyed_name, implementers, |m| {
                TypeRef::list(member_input(&EntityNames::new(m)))
            });
            on.push((kind, InputValueDef::new("_on", TypeRef::named(keyed_name))));
        }
        self.add_relationship_keyed_inputs(name, &interface.relationships, on);

        for relationship in &interface.relationships {
            self.add_connection_where(name, relationship);
            self.add_relationship_field_inputs(name, relationship);
        }
    }

    pub(super) fn add_union_shapes(&mut self, union: &UnionType) {
        let names = EntityNames::new(&union.name);
        self.catalogue.insert(TypeDefinition::Union {
            name: union.name.clone(),
            members: union.members.clone(),
        });
        self.keyed_by_implementer(&names.where_input(), &union.members, |m| {
            TypeRef::named(EntityNames::new(m).where_input())
        });
    }

    fn keyed_by_implementer(
        &mut self,
        type_name: &str,
        keys: &[String],
        ty: impl Fn(&str) -> TypeRef,
    ) {
        let inputs = keys
            .iter()
            .map(|key| InputValueDef::new(key.as_str(), ty(key)))
            .collect();
        self.catalogue.insert(TypeDefinition::input(type_name, inputs));
    }

    /// `IFEdgeWhere`, `IFEdgeCreateInput`, `IFEdgeUpdateInput` and `IFEdgeSort`,
    /// keyed by the implementers that carry properties.
    pub(super) fn add_keyed_edge_inputs(&mut self, owner: &str, field: &RelationshipField) {
        let names = RelationshipNames::new(owner, field);
        let EdgeProperties::PerImplementer(variants) = self.model.edge_properties(owner, field)
        else {
            return;
        };
        let with_properties: Vec<(String, String)> = variants
            .iter()
            .filter_map(|(implementer, props)| {
                props.map(|p| (implementer.to_string(), p.name.clone()))
            })
            .collect();

        let shapes: [(String, fn(&EntityNames) -> String); 4] = [
            (names.edge_where(), EntityNames::where_input),
            (names.edge_create_input(), EntityNames::create_input),
            (names.edge_update_input(), EntityNames::update_input),
            (names.edge_sort(), EntityNames::sort_input),
        ];
        for (type_name, properties_input) in shapes {
            let inputs = with_properties
                .iter()
                .map(|(implementer, props)| {
                    InputValueDef::new(
                        implementer.as_str(),
                        TypeRef::named(properties_input(&EntityNames::new(props))),
                    )
                })
                .collect();
            self.catalogue.insert(TypeDefinition::input(type_name, inputs));
        }
    }

    /// `union IFRelationshipProperties = P1 | P2`
    pub(super) fn add_properties_union(&mut self, owner: &str, field: &RelationshipField) {
        let names = RelationshipNames::new(owner, field);
        let Some(polymorphic) = self.model.polymorphic_relationship(owner, &field.name) else {
            return;
        };
        self.catalogue.insert(TypeDefinition::Union {
            name: names.properties_union(),
            members: polymorphic
                .property_types()
                .into_iter()
                .map(str::to_string)
                .collect(),
        });
    }
}
