//! Generated API catalogue: object, input, enum, union and scalar definitions.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Field or argument type reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "of")]
pub enum TypeRef {
    Named(String),
    NonNull(Box<TypeRef>),
    List(Box<TypeRef>),
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        TypeRef::Named(name.into())
    }

    /// `X!`
    pub fn required(name: impl Into<String>) -> Self {
        TypeRef::NonNull(Box::new(TypeRef::named(name)))
    }

    /// `[X!]`
    pub fn list(name: impl Into<String>) -> Self {
        TypeRef::List(Box::new(TypeRef::required(name)))
    }

    /// `[X!]!`
    pub fn required_list(name: impl Into<String>) -> Self {
        TypeRef::NonNull(Box::new(TypeRef::list(name)))
    }

    /// `[X!]` for list cardinality, `X` otherwise.
    pub fn by_cardinality(name: impl Into<String>, is_list: bool) -> Self {
        if is_list {
            TypeRef::list(name)
        } else {
            TypeRef::named(name)
        }
    }

    pub fn non_null(self) -> Self {
        match self {
            TypeRef::NonNull(_) => self,
            other => TypeRef::NonNull(Box::new(other)),
        }
    }

    pub fn base_name(&self) -> &str {
        match self {
            TypeRef::Named(name) => name,
            TypeRef::NonNull(inner) | TypeRef::List(inner) => inner.base_name(),
        }
    }

    pub fn is_non_null(&self) -> bool {
        matches!(self, TypeRef::NonNull(_))
    }

    pub fn is_list(&self) -> bool {
        match self {
            TypeRef::Named(_) => false,
            TypeRef::NonNull(inner) => inner.is_list(),
            TypeRef::List(_) => true,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Named(name) => write!(f, "{}", name),
            TypeRef::NonNull(inner) => write!(f, "{}!", inner),
            TypeRef::List(inner) => write!(f, "[{}]", inner),
        }
    }
}

/// Input object field or field argument.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputValueDef {
    pub name: String,
    pub ty: TypeRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecation: Option<String>,
}

impl InputValueDef {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        InputValueDef {
            name: name.into(),
            ty,
            default: None,
            deprecation: None,
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn deprecated(mut self, reason: impl Into<String>) -> Self {
        self.deprecation = Some(reason.into());
        self
    }
}

/// Output object or interface field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<InputValueDef>,
    pub ty: TypeRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecation: Option<String>,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        FieldDef {
            name: name.into(),
            args: vec![],
            ty,
            deprecation: None,
        }
    }

    pub fn with_args(mut self, args: Vec<InputValueDef>) -> Self {
        self.args = args;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectTypeDef {
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub implements: Vec<String>,
    pub fields: Vec<FieldDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TypeDefinition {
    Object(ObjectTypeDef),
    Interface(ObjectTypeDef),
    Union {
        name: String,
        members: Vec<String>,
    },
    Input {
        name: String,
        fields: Vec<InputValueDef>,
    },
    Enum {
        name: String,
        values: Vec<String>,
    },
    Scalar {
        name: String,
    },
}

impl TypeDefinition {
    pub fn object(name: impl Into<String>, fields: Vec<FieldDef>) -> Self {
        TypeDefinition::Object(ObjectTypeDef {
            name: name.into(),
            implements: vec![],
            fields,
        })
    }

    pub fn input(name: impl Into<String>, fields: Vec<InputValueDef>) -> Self {
        TypeDefinition::Input {
            name: name.into(),
            fields,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            TypeDefinition::Object(object) | TypeDefinition::Interface(object) => &object.name,
            TypeDefinition::Union { name, .. }
            | TypeDefinition::Input { name, .. }
            | TypeDefinition::Enum { name, .. }
            | TypeDefinition::Scalar { name } => name,
        }
    }

    /// Output fields of objects and interfaces.
    pub fn fields(&self) -> &[FieldDef] {
        match self {
            TypeDefinition::Object(object) | TypeDefinition::Interface(object) => &object.fields,
            _ => &[],
        }
    }

    pub fn input_fields(&self) -> &[InputValueDef] {
        match self {
            TypeDefinition::Input { fields, .. } => fields,
            _ => &[],
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            TypeDefinition::Object(object) | TypeDefinition::Interface(object) => {
                object.fields.is_empty()
            }
            TypeDefinition::Union { members, .. } => members.is_empty(),
            TypeDefinition::Input { fields, .. } => fields.is_empty(),
            TypeDefinition::Enum { values, .. } => values.is_empty(),
            TypeDefinition::Scalar { .. } => false,
        }
    }
}

const BUILT_IN_SCALARS: [&str; 5] = ["ID", "String", "Int", "Float", "Boolean"];

/// Every generated type plus the two root operation types.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ApiCatalogue {
    pub types: BTreeMap<String, TypeDefinition>,
    pub query: Vec<FieldDef>,
    pub mutation: Vec<FieldDef>,
}

impl ApiCatalogue {
    pub fn get(&self, name: &str) -> Option<&TypeDefinition> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn input_field(&self, type_name: &str, field: &str) -> Option<&InputValueDef> {
        self.get(type_name)?
            .input_fields()
            .iter()
            .find(|f| f.name == field)
    }

    pub fn output_field(&self, type_name: &str, field: &str) -> Option<&FieldDef> {
        self.get(type_name)?.fields().iter().find(|f| f.name == field)
    }

    pub fn root_field(&self, name: &str) -> Option<&FieldDef> {
        self.query
            .iter()
            .chain(self.mutation.iter())
            .find(|f| f.name == name)
    }

    /// First definition of a name wins; shared shapes are offered by several builders.
    pub(crate) fn insert(&mut self, definition: TypeDefinition) {
        let name = definition.name().to_string();
        if self.types.contains_key(&name) {
            log::trace!("Type {} already generated", name);
            return;
        }
        self.types.insert(name, definition);
    }

    /// Drop empty types and every field or argument that refers to a dropped type,
    /// repeating until nothing changes.
    pub(crate) fn prune_empty(&mut self) {
        loop {
            let empty: Vec<String> = self
                .types
                .values()
                .filter(|t| t.is_empty())
                .map(|t| t.name().to_string())
                .collect();
            for name in &empty {
                log::debug!("Omitting empty type {}", name);
                self.types.remove(name);
            }

            let known = |ty: &TypeRef, types: &BTreeMap<String, TypeDefinition>| {
                let base = ty.base_name();
                BUILT_IN_SCALARS.contains(&base) || types.contains_key(base)
            };
            let snapshot: Vec<String> = self.types.keys().cloned().collect();
            let mut changed = !empty.is_empty();
            for name in snapshot {
                let Some(mut definition) = self.types.remove(&name) else {
                    continue;
                };
                match &mut definition {
                    TypeDefinition::Object(object) | TypeDefinition::Interface(object) => {
                        let before = object.fields.len();
                        object.fields.retain(|f| known(&f.ty, &self.types) || f.ty.base_name() == name);
                        for field in &mut object.fields {
                            field.args.retain(|a| known(&a.ty, &self.types));
                        }
                        changed |= object.fields.len() != before;
                    }
                    TypeDefinition::Input { fields, .. } => {
                        let before = fields.len();
                        fields.retain(|f| known(&f.ty, &self.types) || f.ty.base_name() == name);
                        changed |= fields.len() != before;
                    }
                    TypeDefinition::Union { members, .. } => {
                        members.retain(|m| self.types.contains_key(m));
                    }
                    _ => {}
                }
                self.types.insert(name, definition);
            }
            for root in [&mut self.query, &mut self.mutation] {
                root.retain(|f| known(&f.ty, &self.types));
                for field in root.iter_mut() {
                    field.args.retain(|a| known(&a.ty, &self.types));
                }
            }
            if !changed {
                break;
            }
        }
    }
}
