use serde_json::{Map, Number};

/// A parsed type-definition document.
#[derive(Debug, PartialEq, Clone)]
pub struct Document<'a> {
    pub definitions: Vec<Definition<'a>>,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Definition<'a> {
    Object(ObjectDefinition<'a>),
    Interface(InterfaceDefinition<'a>),
    Union(UnionDefinition<'a>),
    Enum(EnumDefinition<'a>),
}

impl<'a> Definition<'a> {
    pub fn name(&self) -> &'a str {
        match self {
            Definition::Object(def) => def.name,
            Definition::Interface(def) => def.name,
            Definition::Union(def) => def.name,
            Definition::Enum(def) => def.name,
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct ObjectDefinition<'a> {
    pub name: &'a str,
    pub implements: Vec<&'a str>,
    pub directives: Vec<Directive<'a>>,
    pub fields: Vec<FieldDefinition<'a>>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct InterfaceDefinition<'a> {
    pub name: &'a str,
    pub directives: Vec<Directive<'a>>,
    pub fields: Vec<FieldDefinition<'a>>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct UnionDefinition<'a> {
    pub name: &'a str,
    pub directives: Vec<Directive<'a>>,
    pub members: Vec<&'a str>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct EnumDefinition<'a> {
    pub name: &'a str,
    pub values: Vec<&'a str>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct FieldDefinition<'a> {
    pub name: &'a str,
    pub ty: TypeAnnotation<'a>,
    pub directives: Vec<Directive<'a>>,
}

impl<'a> FieldDefinition<'a> {
    pub fn directive(&self, name: &str) -> Option<&Directive<'a>> {
        self.directives.iter().find(|d| d.name == name)
    }
}

/// Field type as written: `Post`, `Post!`, `[Post!]!` ...
#[derive(Debug, PartialEq, Clone)]
pub enum TypeAnnotation<'a> {
    Named {
        name: &'a str,
        non_null: bool,
    },
    List {
        item: Box<TypeAnnotation<'a>>,
        non_null: bool,
    },
}

impl<'a> TypeAnnotation<'a> {
    /// Innermost named type.
    pub fn base_name(&self) -> &'a str {
        match self {
            TypeAnnotation::Named { name, .. } => name,
            TypeAnnotation::List { item, .. } => item.base_name(),
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, TypeAnnotation::List { .. })
    }

    pub fn is_non_null(&self) -> bool {
        match self {
            TypeAnnotation::Named { non_null, .. } | TypeAnnotation::List { non_null, .. } => {
                *non_null
            }
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct Directive<'a> {
    pub name: &'a str,
    pub arguments: Vec<(&'a str, Value<'a>)>,
}

impl<'a> Directive<'a> {
    pub fn argument(&self, name: &str) -> Option<&Value<'a>> {
        self.arguments
            .iter()
            .find(|(arg, _)| *arg == name)
            .map(|(_, value)| value)
    }
}

/// Constant value inside a directive argument.
#[derive(Debug, PartialEq, Clone)]
pub enum Value<'a> {
    String(&'a str),
    Int(i64),
    Float(f64),
    Boolean(bool),
    Null,
    Enum(&'a str),
    List(Vec<Value<'a>>),
    Object(Vec<(&'a str, Value<'a>)>),
}

impl<'a> Value<'a> {
    /// String and enum values both read as plain text (`"LIKES"` / `IN`).
    pub fn as_str(&self) -> Option<&'a str> {
        match self {
            Value::String(s) | Value::Enum(s) => Some(s),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::String(s) | Value::Enum(s) => serde_json::Value::String(s.to_string()),
            Value::Int(i) => serde_json::Value::Number((*i).into()),
            Value::Float(f) => Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Null => serde_json::Value::Null,
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Object(fields) => {
                let mut map = Map::new();
                for (key, value) in fields {
                    map.insert(key.to_string(), value.to_json());
                }
                serde_json::Value::Object(map)
            }
        }
    }
}
