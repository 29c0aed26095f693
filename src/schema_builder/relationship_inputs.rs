use super::naming::{EntityNames, RelationshipNames};
use super::types::{InputValueDef, TypeDefinition, TypeRef};
use super::{EdgeShape, ShapeBuilder};
use crate::type_model::{RelationshipField, TargetKind};

/// Edge input type names for one relationship, by operation.
struct EdgeInputs {
    create: Option<TypeRef>,
    update: Option<String>,
    sort: Option<String>,
}

impl ShapeBuilder<'_> {
    fn edge_inputs(&self, owner: &str, field: &RelationshipField) -> EdgeInputs {
        let names = RelationshipNames::new(owner, field);
        match self.edge_shape(owner, field) {
            EdgeShape::None => EdgeInputs {
                create: None,
                update: None,
                sort: None,
            },
            EdgeShape::Shared(properties) => {
                let props = EntityNames::new(&properties.name);
                let needs_edge = properties
                    .fields
                    .iter()
                    .any(|f| f.required && f.default_value.is_none() && !f.autogenerate);
                let create = TypeRef::named(props.create_input());
                EdgeInputs {
                    create: Some(if needs_edge { create.non_null() } else { create }),
                    update: Some(props.update_input()),
                    sort: Some(props.sort_input()),
                }
            }
            EdgeShape::Keyed => EdgeInputs {
                create: Some(TypeRef::named(names.edge_create_input())),
                update: Some(names.edge_update_input()),
                sort: Some(names.edge_sort()),
            },
        }
    }

    /// Every per-field input of `owner.field`; union targets get one family per member
    /// plus the member-keyed wrappers.
    pub(super) fn add_relationship_field_inputs(&mut self, owner: &str, field: &RelationshipField) {
        let names = RelationshipNames::new(owner, field);
        let edge = self.edge_inputs(owner, field);

        if field.target_kind != TargetKind::Union {
            self.add_field_input_family(&names, &field.target, field.is_list, &edge);
            self.add_connection_sort(&names, &field.target, &edge);
            self.add_aggregate_input(owner, field);
            if self.edge_shape(owner, field) == EdgeShape::Keyed {
                self.add_keyed_edge_inputs(owner, field);
            }
            return;
        }

        let members = self.union_members(field);
        let mut keyed = vec![Vec::new(), Vec::new(), Vec::new(), Vec::new(), Vec::new(), Vec::new()];
        for member in &members {
            let member_names = names.member(member);
            self.add_field_input_family(&member_names, member, field.is_list, &edge);
            let by_card = |name: String| TypeRef::by_cardinality(name, field.is_list);
            let entries = [
                TypeRef::named(member_names.field_input()),
                by_card(member_names.connect_field_input()),
                by_card(member_names.update_field_input()),
                by_card(member_names.disconnect_field_input()),
                by_card(member_names.delete_field_input()),
                by_card(member_names.create_field_input()),
            ];
            for (slot, ty) in keyed.iter_mut().zip(entries) {
                slot.push(InputValueDef::new(member.as_str(), ty));
            }
        }
        let type_names = [
            names.union_create_input(),
            names.union_connect_input(),
            names.union_update_input(),
            names.union_disconnect_input(),
            names.union_delete_input(),
            names.create_field_input(),
        ];
        for (type_name, inputs) in type_names.into_iter().zip(keyed) {
            self.catalogue.insert(TypeDefinition::input(type_name, inputs));
        }
    }

    fn add_field_input_family(
        &mut self,
        names: &RelationshipNames,
        target: &str,
        is_list: bool,
        edge: &EdgeInputs,
    ) {
        let target_names = EntityNames::new(target);
        let by_card = |name: String| TypeRef::by_cardinality(name, is_list);

        self.catalogue.insert(TypeDefinition::input(
            names.field_input(),
            vec![
                InputValueDef::new("create", by_card(names.create_field_input())),
                InputValueDef::new("connect", by_card(names.connect_field_input())),
            ],
        ));

        let mut create = vec![InputValueDef::new(
            "node",
            TypeRef::required(target_names.create_input()),
        )];
        if let Some(edge_create) = &edge.create {
            create.push(InputValueDef::new("edge", edge_create.clone()));
        }
        self.catalogue
            .insert(TypeDefinition::input(names.create_field_input(), create));

        let mut connect = vec![
            InputValueDef::new("where", TypeRef::named(target_names.connect_where())),
            InputValueDef::new("connect", by_card(target_names.connect_input())),
        ];
        if let Some(edge_create) = &edge.create {
            connect.push(InputValueDef::new("edge", edge_create.clone()));
        }
        connect.push(
            InputValueDef::new("overwrite", TypeRef::required("Boolean"))
                .with_default(serde_json::json!(true)),
        );
        self.catalogue
            .insert(TypeDefinition::input(names.connect_field_input(), connect));

        self.catalogue.insert(TypeDefinition::input(
            names.update_field_input(),
            vec![
                InputValueDef::new("where", TypeRef::named(names.connection_where())),
                InputValueDef::new("update", TypeRef::named(names.update_connection_input())),
                InputValueDef::new("connect", by_card(names.connect_field_input())),
                InputValueDef::new("disconnect", by_card(names.disconnect_field_input())),
                InputValueDef::new("create", by_card(names.create_field_input())),
                InputValueDef::new("delete", by_card(names.delete_field_input())),
            ],
        ));

        let mut update_connection = vec![InputValueDef::new(
            "node",
            TypeRef::named(target_names.update_input()),
        )];
        if let Some(edge_update) = &edge.update {
            update_connection.push(InputValueDef::new("edge", TypeRef::named(edge_update.as_str())));
        }
        self.catalogue.insert(TypeDefinition::input(
            names.update_connection_input(),
            update_connection,
        ));

        self.catalogue.insert(TypeDefinition::input(
            names.disconnect_field_input(),
            vec![
                InputValueDef::new("where", TypeRef::named(names.connection_where())),
                InputValueDef::new("disconnect", TypeRef::named(target_names.disconnect_input())),
            ],
        ));
        self.catalogue.insert(TypeDefinition::input(
            names.delete_field_input(),
            vec![
                InputValueDef::new("where", TypeRef::named(names.connection_where())),
                InputValueDef::new("delete", TypeRef::named(target_names.delete_input())),
            ],
        ));
    }

    fn add_connection_sort(&mut self, names: &RelationshipNames, target: &str, edge: &EdgeInputs) {
        let mut sort = vec![InputValueDef::new(
            "node",
            TypeRef::named(EntityNames::new(target).sort_input()),
        )];
        if let Some(edge_sort) = &edge.sort {
            sort.push(InputValueDef::new("edge", TypeRef::named(edge_sort.as_str())));
        }
        self.catalogue
            .insert(TypeDefinition::input(names.connection_sort(), sort));
    }
}

#[cfg(test)]
mod tests {
    use crate::schema_builder::CompiledSchema;

    #[test]
    fn test_connect_field_input_shape() {
        let schema = CompiledSchema::from_sdl(
            r#"
            type User {
                name: String!
                friends: [User!]! @relationship(type: "FRIENDS_WITH", direction: OUT)
            }
            type Post {
                title: String!
                likes: [User!]! @relationship(type: "LIKES", direction: IN, properties: "Likes")
                author: User @relationship(type: "WROTE", direction: IN)
            }
            type Likes @relationshipProperties { likedAt: DateTime! }
            "#,
        )
        .unwrap();
        let catalogue = &schema.catalogue;

        let connect = catalogue.get("PostLikesConnectFieldInput").unwrap();
        let fields: Vec<String> = connect
            .input_fields()
            .iter()
            .map(|f| format!("{}: {}", f.name, f.ty))
            .collect();
        assert_eq!(
            fields,
            vec![
                "where: UserConnectWhere",
                "connect: [UserConnectInput!]",
                "edge: LikesCreateInput!",
                "overwrite: Boolean!",
            ]
        );
        let overwrite = catalogue
            .input_field("PostLikesConnectFieldInput", "overwrite")
            .unwrap();
        assert_eq!(overwrite.default, Some(serde_json::json!(true)));

        assert_eq!(
            catalogue
                .input_field("PostAuthorConnectFieldInput", "connect")
                .unwrap()
                .ty
                .to_string(),
            "UserConnectInput"
        );
        assert!(catalogue
            .input_field("PostAuthorConnectFieldInput", "edge")
            .is_none());
        assert_eq!(
            catalogue
                .input_field("PostLikesUpdateFieldInput", "where")
                .unwrap()
                .ty
                .to_string(),
            "PostLikesConnectionWhere"
        );
        assert_eq!(
            catalogue
                .input_field("PostLikesConnectionSort", "edge")
                .unwrap()
                .ty
                .to_string(),
            "LikesSort"
        );
    }

    #[test]
    fn test_union_member_keyed_inputs() {
        let schema = CompiledSchema::from_sdl(
            r#"
            type Movie { title: String! }
            type Book { isbn: String! }
            union Media = Movie | Book
            type User {
                name: String!
                favourites: [Media!]! @relationship(type: "LIKES", direction: OUT)
            }
            "#,
        )
        .unwrap();
        let catalogue = &schema.catalogue;
        assert_eq!(
            catalogue
                .input_field("UserFavouritesConnectInput", "Movie")
                .unwrap()
                .ty
                .to_string(),
            "[UserFavouritesMovieConnectFieldInput!]"
        );
        assert_eq!(
            catalogue
                .input_field("UserFavouritesCreateInput", "Book")
                .unwrap()
                .ty
                .to_string(),
            "UserFavouritesBookFieldInput"
        );
        assert_eq!(
            catalogue
                .input_field("UserCreateInput", "favourites")
                .unwrap()
                .ty
                .to_string(),
            "UserFavouritesCreateInput"
        );
        assert_eq!(
            catalogue
                .input_field("UserFavouritesConnectionWhere", "Movie")
                .unwrap()
                .ty
                .to_string(),
            "UserFavouritesMovieConnectionWhere"
        );
        assert!(catalogue.input_field("UserWhere", "favouritesAggregate").is_none());
        assert_eq!(
            catalogue.input_field("MediaWhere", "Book").unwrap().ty.to_string(),
            "BookWhere"
        );
    }
}
