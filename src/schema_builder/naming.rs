//! Generated type and field names.
//!
//! Every builder and the translator derive names from here so the two never drift.

use std::collections::BTreeMap;

use inflector::Inflector;
use serde::Serialize;

use crate::type_model::{lower_first, upper_first, RelationshipField, TypeModel};

/// `User` -> `users`, `BlogPost` -> `blogPosts`: only the last camel-case word is inflected.
pub fn plural(type_name: &str) -> String {
    let camel = lower_first(type_name);
    let split = camel
        .char_indices()
        .filter(|(_, c)| c.is_uppercase())
        .map(|(i, _)| i)
        .last()
        .unwrap_or(0);
    let (head, last) = camel.split_at(split);
    let inflected = last.to_lowercase().to_plural();
    if head.is_empty() {
        inflected
    } else {
        format!("{}{}", head, upper_first(&inflected))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityNames {
    pub name: String,
    /// `users`
    pub plural: String,
    /// `Users`
    pub upper_plural: String,
}

impl EntityNames {
    pub fn new(name: &str) -> Self {
        let plural = plural(name);
        EntityNames {
            name: name.to_string(),
            upper_plural: upper_first(&plural),
            plural,
        }
    }

    fn suffixed(&self, suffix: &str) -> String {
        format!("{}{}", self.name, suffix)
    }

    pub fn where_input(&self) -> String {
        self.suffixed("Where")
    }
    pub fn create_input(&self) -> String {
        self.suffixed("CreateInput")
    }
    pub fn update_input(&self) -> String {
        self.suffixed("UpdateInput")
    }
    pub fn connect_input(&self) -> String {
        self.suffixed("ConnectInput")
    }
    pub fn disconnect_input(&self) -> String {
        self.suffixed("DisconnectInput")
    }
    pub fn delete_input(&self) -> String {
        self.suffixed("DeleteInput")
    }
    pub fn relation_input(&self) -> String {
        self.suffixed("RelationInput")
    }
    pub fn sort_input(&self) -> String {
        self.suffixed("Sort")
    }
    pub fn options_input(&self) -> String {
        self.suffixed("Options")
    }
    pub fn connect_where(&self) -> String {
        self.suffixed("ConnectWhere")
    }
    pub fn aggregate_selection(&self) -> String {
        self.suffixed("AggregateSelection")
    }
    pub fn edge(&self) -> String {
        self.suffixed("Edge")
    }
    pub fn connection(&self) -> String {
        format!("{}Connection", self.upper_plural)
    }
    pub fn create_response(&self) -> String {
        format!("Create{}MutationResponse", self.upper_plural)
    }
    pub fn update_response(&self) -> String {
        format!("Update{}MutationResponse", self.upper_plural)
    }
    pub fn implementation_enum(&self) -> String {
        self.suffixed("Implementation")
    }
    pub fn implementations_input(&self, operation: &str) -> String {
        format!("{}Implementations{}", self.name, operation)
    }

    pub fn read_field(&self) -> String {
        self.plural.clone()
    }
    pub fn aggregate_field(&self) -> String {
        format!("{}Aggregate", self.plural)
    }
    pub fn connection_field(&self) -> String {
        format!("{}Connection", self.plural)
    }
    pub fn create_field(&self) -> String {
        format!("create{}", self.upper_plural)
    }
    pub fn update_field(&self) -> String {
        format!("update{}", self.upper_plural)
    }
    pub fn delete_field(&self) -> String {
        format!("delete{}", self.upper_plural)
    }
}

/// Names for the shapes generated per relationship field `source.field`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipNames {
    /// `PostLikes`
    pub prefix: String,
    pub source: String,
    pub field: String,
    pub target: String,
}

impl RelationshipNames {
    pub fn new(source: &str, field: &RelationshipField) -> Self {
        RelationshipNames {
            prefix: format!("{}{}", source, field.type_fragment()),
            source: source.to_string(),
            field: field.name.clone(),
            target: field.target.clone(),
        }
    }

    /// Per-member names for a union target: `PostSearchMovie...`.
    pub fn member(&self, member: &str) -> Self {
        RelationshipNames {
            prefix: format!("{}{}", self.prefix, member),
            source: self.source.clone(),
            field: self.field.clone(),
            target: member.to_string(),
        }
    }

    fn suffixed(&self, suffix: &str) -> String {
        format!("{}{}", self.prefix, suffix)
    }

    pub fn field_input(&self) -> String {
        self.suffixed("FieldInput")
    }
    pub fn create_field_input(&self) -> String {
        self.suffixed("CreateFieldInput")
    }
    pub fn connect_field_input(&self) -> String {
        self.suffixed("ConnectFieldInput")
    }
    pub fn update_field_input(&self) -> String {
        self.suffixed("UpdateFieldInput")
    }
    pub fn update_connection_input(&self) -> String {
        self.suffixed("UpdateConnectionInput")
    }
    pub fn disconnect_field_input(&self) -> String {
        self.suffixed("DisconnectFieldInput")
    }
    pub fn delete_field_input(&self) -> String {
        self.suffixed("DeleteFieldInput")
    }
    pub fn connection_where(&self) -> String {
        self.suffixed("ConnectionWhere")
    }
    pub fn connection_sort(&self) -> String {
        self.suffixed("ConnectionSort")
    }
    pub fn connection(&self) -> String {
        self.suffixed("Connection")
    }
    pub fn relationship(&self) -> String {
        self.suffixed("Relationship")
    }
    pub fn aggregate_input(&self) -> String {
        self.suffixed("AggregateInput")
    }
    pub fn node_aggregation_where(&self) -> String {
        self.suffixed("NodeAggregationWhereInput")
    }
    pub fn edge_aggregation_where(&self) -> String {
        self.suffixed("EdgeAggregationWhereInput")
    }

    /// `PostUserLikesAggregationSelection`
    pub fn aggregation_selection(&self) -> String {
        format!(
            "{}{}{}AggregationSelection",
            self.source,
            self.target,
            upper_first(&self.field)
        )
    }
    pub fn node_aggregate_selection(&self) -> String {
        format!(
            "{}{}{}NodeAggregateSelection",
            self.source,
            self.target,
            upper_first(&self.field)
        )
    }
    pub fn edge_aggregate_selection(&self) -> String {
        format!(
            "{}{}{}EdgeAggregateSelection",
            self.source,
            self.target,
            upper_first(&self.field)
        )
    }

    // Keyed edge shapes, used when implementers disagree on the properties type.
    pub fn edge_where(&self) -> String {
        self.suffixed("EdgeWhere")
    }
    pub fn edge_create_input(&self) -> String {
        self.suffixed("EdgeCreateInput")
    }
    pub fn edge_update_input(&self) -> String {
        self.suffixed("EdgeUpdateInput")
    }
    pub fn edge_sort(&self) -> String {
        self.suffixed("EdgeSort")
    }
    pub fn properties_union(&self) -> String {
        self.suffixed("RelationshipProperties")
    }

    // Member-keyed inputs for union targets.
    pub fn union_create_input(&self) -> String {
        self.suffixed("CreateInput")
    }
    pub fn union_connect_input(&self) -> String {
        self.suffixed("ConnectInput")
    }
    pub fn union_update_input(&self) -> String {
        self.suffixed("UpdateInput")
    }
    pub fn union_disconnect_input(&self) -> String {
        self.suffixed("DisconnectInput")
    }
    pub fn union_delete_input(&self) -> String {
        self.suffixed("DeleteInput")
    }

    pub fn aggregate_field(&self) -> String {
        format!("{}Aggregate", self.field)
    }
    pub fn connection_field(&self) -> String {
        format!("{}Connection", self.field)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RootKind {
    Read,
    Aggregate,
    Connection,
    Create,
    Update,
    Delete,
}

impl RootKind {
    pub fn is_mutation(&self) -> bool {
        matches!(self, RootKind::Create | RootKind::Update | RootKind::Delete)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RootField {
    pub kind: RootKind,
    pub entity: String,
}

/// Every root query and mutation field, keyed by field name.
pub fn root_fields(model: &TypeModel) -> BTreeMap<String, RootField> {
    let mut fields = BTreeMap::new();
    let mut insert = |name: String, kind: RootKind, entity: &str| {
        fields.insert(
            name,
            RootField {
                kind,
                entity: entity.to_string(),
            },
        );
    };

    for node in model.nodes() {
        let names = EntityNames::new(&node.name);
        insert(names.read_field(), RootKind::Read, &node.name);
        insert(names.aggregate_field(), RootKind::Aggregate, &node.name);
        insert(names.connection_field(), RootKind::Connection, &node.name);
        insert(names.create_field(), RootKind::Create, &node.name);
        insert(names.update_field(), RootKind::Update, &node.name);
        insert(names.delete_field(), RootKind::Delete, &node.name);
    }
    for interface in model.interfaces() {
        let names = EntityNames::new(&interface.name);
        insert(names.read_field(), RootKind::Read, &interface.name);
        insert(names.aggregate_field(), RootKind::Aggregate, &interface.name);
        insert(names.connection_field(), RootKind::Connection, &interface.name);
    }
    for union in model.unions() {
        let names = EntityNames::new(&union.name);
        insert(names.read_field(), RootKind::Read, &union.name);
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::type_model::{Direction, TargetKind};

    #[test]
    fn test_entity_names() {
        let names = EntityNames::new("User");
        assert_eq!(names.plural, "users");
        assert_eq!(names.connection(), "UsersConnection");
        assert_eq!(names.create_field(), "createUsers");
        assert_eq!(names.create_response(), "CreateUsersMutationResponse");
        assert_eq!(EntityNames::new("Person").plural, "people");
        assert_eq!(EntityNames::new("Child").plural, "children");
        assert_eq!(EntityNames::new("Series").plural, "series");
        assert_eq!(EntityNames::new("TvSeries").plural, "tvSeries");
        assert_eq!(EntityNames::new("BlogPost").plural, "blogPosts");
        assert_eq!(EntityNames::new("Category").plural, "categories");
    }

    #[test]
    fn test_relationship_names() {
        let field = RelationshipField {
            name: "likes".to_string(),
            direction: Direction::In,
            rel_type: "LIKES".to_string(),
            target: "User".to_string(),
            target_kind: TargetKind::Node,
            is_list: true,
            required: true,
            properties: Some("Likes".to_string()),
            declared: false,
        };
        let names = RelationshipNames::new("Post", &field);
        assert_eq!(names.connect_field_input(), "PostLikesConnectFieldInput");
        assert_eq!(names.aggregation_selection(), "PostUserLikesAggregationSelection");
        assert_eq!(names.aggregate_field(), "likesAggregate");
        assert_eq!(
            names.member("Movie").create_field_input(),
            "PostLikesMovieCreateFieldInput"
        );
    }
}
