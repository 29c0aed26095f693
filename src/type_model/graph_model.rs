use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Semantic type of a scalar field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarKind {
    Id,
    String,
    Int,
    BigInt,
    Float,
    Boolean,
    DateTime,
    LocalDateTime,
    Date,
    Time,
    LocalTime,
    Duration,
    /// Reference to a declared enum type
    Enum(String),
}

impl ScalarKind {
    /// Built-in scalar for a type name; enums are resolved by the builder.
    pub fn from_type_name(name: &str) -> Option<Self> {
        let kind = match name {
            "ID" => ScalarKind::Id,
            "String" => ScalarKind::String,
            "Int" => ScalarKind::Int,
            "BigInt" => ScalarKind::BigInt,
            "Float" => ScalarKind::Float,
            "Boolean" => ScalarKind::Boolean,
            "DateTime" => ScalarKind::DateTime,
            "LocalDateTime" => ScalarKind::LocalDateTime,
            "Date" => ScalarKind::Date,
            "Time" => ScalarKind::Time,
            "LocalTime" => ScalarKind::LocalTime,
            "Duration" => ScalarKind::Duration,
            _ => return None,
        };
        Some(kind)
    }

    pub fn type_name(&self) -> &str {
        match self {
            ScalarKind::Id => "ID",
            ScalarKind::String => "String",
            ScalarKind::Int => "Int",
            ScalarKind::BigInt => "BigInt",
            ScalarKind::Float => "Float",
            ScalarKind::Boolean => "Boolean",
            ScalarKind::DateTime => "DateTime",
            ScalarKind::LocalDateTime => "LocalDateTime",
            ScalarKind::Date => "Date",
            ScalarKind::Time => "Time",
            ScalarKind::LocalTime => "LocalTime",
            ScalarKind::Duration => "Duration",
            ScalarKind::Enum(name) => name,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ScalarKind::Int | ScalarKind::BigInt | ScalarKind::Float)
    }

    pub fn is_temporal(&self) -> bool {
        self.temporal_function().is_some()
    }

    /// String-like values: substring comparators and length aggregations.
    pub fn is_textual(&self) -> bool {
        matches!(self, ScalarKind::String | ScalarKind::Id)
    }

    /// Types that accept `_LT/_LTE/_GT/_GTE`.
    pub fn is_ordered(&self) -> bool {
        self.is_numeric() || self.is_temporal() || matches!(self, ScalarKind::String)
    }

    pub fn is_aggregatable(&self) -> bool {
        self.is_numeric() || self.is_textual() || self.is_temporal()
    }

    /// Cypher constructor used to turn a parameter into a temporal value.
    pub fn temporal_function(&self) -> Option<&'static str> {
        match self {
            ScalarKind::DateTime => Some("datetime"),
            ScalarKind::LocalDateTime => Some("localdatetime"),
            ScalarKind::Date => Some("date"),
            ScalarKind::Time => Some("time"),
            ScalarKind::LocalTime => Some("localtime"),
            ScalarKind::Duration => Some("duration"),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarField {
    pub name: String,
    pub kind: ScalarKind,
    pub is_list: bool,
    pub required: bool,
    /// Property key in the database (`@alias(property:)`), defaults to `name`
    pub db_property: String,
    /// `@id`: value generated with `randomUUID()` on create
    pub autogenerate: bool,
    /// `@default(value:)`: applied on create when the input omits the field
    pub default_value: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "IN" => Some(Direction::In),
            "OUT" => Some(Direction::Out),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::In => write!(f, "IN"),
            Direction::Out => write!(f, "OUT"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetKind {
    Node,
    Interface,
    Union,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipField {
    pub name: String,
    pub direction: Direction,
    /// Database relationship type label (e.g. `LIKES`)
    pub rel_type: String,
    pub target: String,
    pub target_kind: TargetKind,
    pub is_list: bool,
    pub required: bool,
    pub properties: Option<String>,
    /// Interface field declared with `@declareRelationship`
    pub declared: bool,
}

impl RelationshipField {
    /// Pascal-cased field name used inside generated type names.
    pub fn type_fragment(&self) -> String {
        upper_first(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeType {
    pub name: String,
    pub fields: Vec<ScalarField>,
    pub relationships: Vec<RelationshipField>,
    pub interfaces: Vec<String>,
}

impl NodeType {
    pub fn field(&self, name: &str) -> Option<&ScalarField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn relationship(&self, name: &str) -> Option<&RelationshipField> {
        self.relationships.iter().find(|r| r.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceType {
    pub name: String,
    pub fields: Vec<ScalarField>,
    pub relationships: Vec<RelationshipField>,
    pub implementers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnionType {
    pub name: String,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipPropertiesType {
    pub name: String,
    pub fields: Vec<ScalarField>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumType {
    pub name: String,
    pub values: Vec<String>,
}

/// One implementer's concrete version of a declared interface relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipVariant {
    pub implementer: String,
    pub target: String,
    pub properties: Option<String>,
}

/// Closed variant set for `interface.field`, computed once at build time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolymorphicRelationship {
    pub interface: String,
    pub field: String,
    pub variants: Vec<RelationshipVariant>,
}

impl PolymorphicRelationship {
    /// Distinct properties types in variant order.
    pub fn property_types(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for variant in &self.variants {
            if let Some(props) = variant.properties.as_deref() {
                if !names.contains(&props) {
                    names.push(props);
                }
            }
        }
        names
    }

    /// True when every variant carries exactly the same properties type.
    pub fn shares_properties(&self) -> bool {
        let mut iter = self.variants.iter().map(|v| v.properties.as_deref());
        match iter.next() {
            Some(first) => iter.all(|p| p == first),
            None => true,
        }
    }
}

/// Edge properties visible through a relationship field.
#[derive(Debug, Clone, PartialEq)]
pub enum EdgeProperties<'a> {
    None,
    Shared(&'a RelationshipPropertiesType),
    /// Implementers of an interface relationship disagree on the properties type
    PerImplementer(Vec<(&'a str, Option<&'a RelationshipPropertiesType>)>),
}

impl EdgeProperties<'_> {
    pub fn is_none(&self) -> bool {
        matches!(self, EdgeProperties::None)
    }
}

/// Borrowed view over a relationship target or query root.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Entity<'a> {
    Node(&'a NodeType),
    Interface(&'a InterfaceType),
    Union(&'a UnionType),
}

impl<'a> Entity<'a> {
    pub fn name(&self) -> &'a str {
        match self {
            Entity::Node(node) => &node.name,
            Entity::Interface(interface) => &interface.name,
            Entity::Union(union) => &union.name,
        }
    }

    pub fn fields(&self) -> &'a [ScalarField] {
        match self {
            Entity::Node(node) => &node.fields,
            Entity::Interface(interface) => &interface.fields,
            Entity::Union(_) => &[],
        }
    }

    pub fn relationships(&self) -> &'a [RelationshipField] {
        match self {
            Entity::Node(node) => &node.relationships,
            Entity::Interface(interface) => &interface.relationships,
            Entity::Union(_) => &[],
        }
    }

    pub fn field(&self, name: &str) -> Option<&'a ScalarField> {
        self.fields().iter().find(|f| f.name == name)
    }

    pub fn relationship(&self, name: &str) -> Option<&'a RelationshipField> {
        self.relationships().iter().find(|r| r.name == name)
    }
}

/// Immutable graph of declared entities.
///
/// Built once by [`build_type_model`](super::build_type_model) and only read afterwards;
/// shape builders and the translator take it by reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeModel {
    pub(crate) nodes: BTreeMap<String, NodeType>,
    pub(crate) interfaces: BTreeMap<String, InterfaceType>,
    pub(crate) unions: BTreeMap<String, UnionType>,
    pub(crate) relationship_properties: BTreeMap<String, RelationshipPropertiesType>,
    pub(crate) enums: BTreeMap<String, EnumType>,
    pub(crate) polymorphic: BTreeMap<String, PolymorphicRelationship>,
}

impl TypeModel {
    pub fn node(&self, name: &str) -> Option<&NodeType> {
        self.nodes.get(name)
    }

    pub fn interface(&self, name: &str) -> Option<&InterfaceType> {
        self.interfaces.get(name)
    }

    pub fn union(&self, name: &str) -> Option<&UnionType> {
        self.unions.get(name)
    }

    pub fn properties(&self, name: &str) -> Option<&RelationshipPropertiesType> {
        self.relationship_properties.get(name)
    }

    pub fn enum_type(&self, name: &str) -> Option<&EnumType> {
        self.enums.get(name)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeType> {
        self.nodes.values()
    }

    pub fn interfaces(&self) -> impl Iterator<Item = &InterfaceType> {
        self.interfaces.values()
    }

    pub fn unions(&self) -> impl Iterator<Item = &UnionType> {
        self.unions.values()
    }

    pub fn relationship_properties(&self) -> impl Iterator<Item = &RelationshipPropertiesType> {
        self.relationship_properties.values()
    }

    pub fn enums(&self) -> impl Iterator<Item = &EnumType> {
        self.enums.values()
    }

    pub fn entity(&self, name: &str) -> Option<Entity<'_>> {
        if let Some(node) = self.nodes.get(name) {
            return Some(Entity::Node(node));
        }
        if let Some(interface) = self.interfaces.get(name) {
            return Some(Entity::Interface(interface));
        }
        self.unions.get(name).map(Entity::Union)
    }

    /// Concrete node types a value of `entity` can be: itself, implementers or members.
    pub fn concrete_types<'a>(&'a self, entity: Entity<'a>) -> Vec<&'a NodeType> {
        let names: Vec<&String> = match entity {
            Entity::Node(node) => return vec![node],
            Entity::Interface(interface) => interface.implementers.iter().collect(),
            Entity::Union(union) => union.members.iter().collect(),
        };
        names
            .into_iter()
            .filter_map(|name| self.nodes.get(name.as_str()))
            .collect()
    }

    pub fn polymorphic_relationship(
        &self,
        interface: &str,
        field: &str,
    ) -> Option<&PolymorphicRelationship> {
        self.polymorphic.get(&polymorphic_key(interface, field))
    }

    /// Edge properties exposed through `owner.field`.
    pub fn edge_properties(&self, owner: &str, field: &RelationshipField) -> EdgeProperties<'_> {
        if let Some(poly) = self.polymorphic_relationship(owner, &field.name) {
            if !poly.shares_properties() {
                return EdgeProperties::PerImplementer(
                    poly.variants
                        .iter()
                        .map(|v| {
                            (
                                v.implementer.as_str(),
                                v.properties.as_deref().and_then(|p| self.properties(p)),
                            )
                        })
                        .collect(),
                );
            }
        }
        match field.properties.as_deref().and_then(|p| self.properties(p)) {
            Some(props) => EdgeProperties::Shared(props),
            None => EdgeProperties::None,
        }
    }

    /// Implementer-specific version of a relationship declared on `owner`.
    pub fn implementation_of<'a>(
        &'a self,
        node: &'a NodeType,
        field: &RelationshipField,
    ) -> Option<&'a RelationshipField> {
        node.relationships.iter().find(|r| r.name == field.name)
    }
}

pub(crate) fn polymorphic_key(interface: &str, field: &str) -> String {
    format!("{}.{}", interface, field)
}

pub fn upper_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

pub fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
