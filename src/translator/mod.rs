//! Query/mutation translator.
//!
//! Turns a validated [`Operation`] against a [`CompiledSchema`] into
//! parameterized Cypher. Translation is a pure function of the schema and the
//! operation: all validation happens here, so an operation that fails never
//! produces a statement.
//!
//! Mutations are emitted as one statement whose phases run in a fixed order at
//! every nesting depth: create, connect, update, disconnect, delete.

mod connect;
mod create;
mod delete;
mod disconnect;
pub mod errors;
mod filters;
mod projection;
mod read;
mod update;
mod values;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::cypher::{
    Clause, CypherContext, Expr, NodePattern, Pattern, PatternDirection, Query, RelPattern,
    Statement,
};
use crate::schema_builder::{CompiledSchema, EntityNames, RootKind};
use crate::type_model::{Direction, Entity, NodeType, RelationshipField, TargetKind, TypeModel};

pub use errors::TranslationError;

/// Default bound on selection and input nesting.
pub const DEFAULT_MAX_DEPTH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Query,
    Mutation,
}

/// One field of a selection set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectedField {
    pub name: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub args: Map<String, Value>,
    #[serde(default)]
    pub selection: Vec<SelectedField>,
    /// Type condition of the fragment this field came from (`... on Movie`)
    #[serde(default)]
    pub on: Option<String>,
}

impl SelectedField {
    pub fn new(name: impl Into<String>) -> Self {
        SelectedField {
            name: name.into(),
            ..SelectedField::default()
        }
    }

    pub fn with_args(mut self, args: Value) -> Self {
        if let Value::Object(args) = args {
            self.args = args;
        }
        self
    }

    pub fn with_selection(mut self, selection: Vec<SelectedField>) -> Self {
        self.selection = selection;
        self
    }

    pub fn aliased(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn on_type(mut self, type_name: impl Into<String>) -> Self {
        self.on = Some(type_name.into());
        self
    }

    /// Key the value is returned under.
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// A single root field invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub kind: OperationKind,
    pub root_field: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub args: Map<String, Value>,
    #[serde(default)]
    pub selection: Vec<SelectedField>,
}

impl Operation {
    pub fn query(root_field: impl Into<String>) -> Self {
        Operation {
            kind: OperationKind::Query,
            root_field: root_field.into(),
            alias: None,
            args: Map::new(),
            selection: vec![],
        }
    }

    pub fn mutation(root_field: impl Into<String>) -> Self {
        Operation {
            kind: OperationKind::Mutation,
            ..Operation::query(root_field)
        }
    }

    pub fn with_args(mut self, args: Value) -> Self {
        if let Value::Object(args) = args {
            self.args = args;
        }
        self
    }

    pub fn with_selection(mut self, selection: Vec<SelectedField>) -> Self {
        self.selection = selection;
        self
    }

    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.root_field)
    }
}

/// What the response mapper needs to shape database rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseShape {
    pub kind: RootKind,
    pub entity: String,
    pub response_key: String,
    /// Column of the result rows holding the projected value
    pub column: String,
    /// Field of mutation responses holding the projected nodes
    pub data_field: Option<String>,
    pub args: Map<String, Value>,
    pub selection: Vec<SelectedField>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranslatedOperation {
    pub root_field: String,
    pub statements: Vec<Statement>,
    pub response: ResponseShape,
}

/// Limits applied while translating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranslateOptions {
    pub max_depth: usize,
}

impl Default for TranslateOptions {
    fn default() -> Self {
        TranslateOptions {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

pub fn translate(
    schema: &CompiledSchema,
    operation: &Operation,
) -> Result<TranslatedOperation, TranslationError> {
    translate_with_options(schema, operation, &TranslateOptions::default())
}

pub fn translate_with_options(
    schema: &CompiledSchema,
    operation: &Operation,
    options: &TranslateOptions,
) -> Result<TranslatedOperation, TranslationError> {
    let root = schema
        .root_field(&operation.root_field)
        .ok_or_else(|| TranslationError::UnknownType {
            name: operation.root_field.clone(),
        })?;
    let expected = if root.kind.is_mutation() {
        OperationKind::Mutation
    } else {
        OperationKind::Query
    };
    if operation.kind != expected {
        return Err(TranslationError::validation_with_context(
            &operation.root_field,
            format!("`{}` is not a {:?} field", operation.root_field, operation.kind),
        ));
    }
    check_root_args(schema, operation)?;
    check_depth(&operation.selection, options.max_depth, &operation.root_field)?;
    for (key, value) in &operation.args {
        check_value_depth(value, options.max_depth, &format!("{}.{}", operation.root_field, key))?;
    }

    let entity = schema
        .model
        .entity(&root.entity)
        .ok_or_else(|| TranslationError::UnknownType {
            name: root.entity.clone(),
        })?;

    let mut translator = Translator::new(schema);
    let (query, column, data_field) = match root.kind {
        RootKind::Read => (translator.translate_read(entity, operation)?, "this", None),
        RootKind::Aggregate => (translator.translate_aggregate(entity, operation)?, "this", None),
        RootKind::Connection => (translator.translate_connection(entity, operation)?, "this", None),
        RootKind::Create | RootKind::Update | RootKind::Delete => {
            let node = translator.node(&root.entity)?;
            match root.kind {
                RootKind::Create => (
                    translator.translate_create(node, operation)?,
                    "data",
                    Some(plural_field(&root.entity)),
                ),
                RootKind::Update => (
                    translator.translate_update(node, operation)?,
                    "data",
                    Some(plural_field(&root.entity)),
                ),
                _ => (translator.translate_delete(node, operation)?, "data", None),
            }
        }
    };

    let statement = translator.ctx.into_statement(&query);
    log::debug!(
        "Translated `{}` ({} params):\n{}",
        operation.root_field,
        statement.params.len(),
        statement.text
    );

    Ok(TranslatedOperation {
        root_field: operation.root_field.clone(),
        statements: vec![statement],
        response: ResponseShape {
            kind: root.kind,
            entity: root.entity.clone(),
            response_key: operation.response_key().to_string(),
            column: column.to_string(),
            data_field,
            args: operation.args.clone(),
            selection: operation.selection.clone(),
        },
    })
}

fn plural_field(entity: &str) -> String {
    crate::schema_builder::EntityNames::new(entity).plural
}

fn check_root_args(schema: &CompiledSchema, operation: &Operation) -> Result<(), TranslationError> {
    let Some(field) = schema.catalogue.root_field(&operation.root_field) else {
        return Ok(());
    };
    for key in operation.args.keys() {
        if !field.args.iter().any(|arg| &arg.name == key) {
            return Err(TranslationError::unknown_field(&operation.root_field, key));
        }
    }
    for arg in &field.args {
        let missing = operation.args.get(&arg.name).is_none_or(Value::is_null);
        if arg.ty.is_non_null() && missing && arg.default.is_none() {
            return Err(TranslationError::validation_with_context(
                format!("{}.{}", operation.root_field, arg.name),
                "required argument is missing",
            ));
        }
    }
    Ok(())
}

fn check_depth(selection: &[SelectedField], remaining: usize, path: &str) -> Result<(), TranslationError> {
    for field in selection.iter().filter(|f| !f.selection.is_empty()) {
        let field_path = format!("{}.{}", path, field.response_key());
        if remaining == 0 {
            return Err(TranslationError::validation_with_context(
                field_path,
                "selection exceeds the maximum depth",
            ));
        }
        check_depth(&field.selection, remaining - 1, &field_path)?;
    }
    Ok(())
}

fn check_value_depth(value: &Value, remaining: usize, path: &str) -> Result<(), TranslationError> {
    let children: Box<dyn Iterator<Item = &Value>> = match value {
        Value::Object(object) => Box::new(object.values()),
        Value::Array(items) => Box::new(items.iter()),
        _ => return Ok(()),
    };
    let mut children = children.peekable();
    if children.peek().is_none() {
        return Ok(());
    }
    if remaining == 0 {
        return Err(TranslationError::validation_with_context(
            path,
            "input exceeds the maximum depth",
        ));
    }
    // lists do not add a level of input nesting
    let next = if value.is_array() { remaining } else { remaining - 1 };
    for child in children {
        check_value_depth(child, next, path)?;
    }
    Ok(())
}

/// Node variable plus the type its inputs were shaped for.
///
/// `via` differs from `node.name` when the inputs came through an interface,
/// which changes how keyed edge inputs are read.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Owner<'a> {
    pub var: &'a str,
    pub node: &'a NodeType,
    pub via: &'a str,
}

impl<'a> Owner<'a> {
    pub fn node(var: &'a str, node: &'a NodeType) -> Self {
        Owner {
            var,
            node,
            via: &node.name,
        }
    }
}

/// Per-operation translation state.
pub(crate) struct Translator<'s> {
    pub(crate) schema: &'s CompiledSchema,
    pub(crate) model: &'s TypeModel,
    pub(crate) ctx: CypherContext,
}

impl<'s> Translator<'s> {
    pub fn new(schema: &'s CompiledSchema) -> Self {
        Translator {
            schema,
            model: &schema.model,
            ctx: CypherContext::new(),
        }
    }

    pub fn entity(&self, name: &str) -> Result<Entity<'s>, TranslationError> {
        self.model
            .entity(name)
            .ok_or_else(|| TranslationError::UnknownType {
                name: name.to_string(),
            })
    }

    pub fn node(&self, name: &str) -> Result<&'s NodeType, TranslationError> {
        self.model
            .node(name)
            .ok_or_else(|| TranslationError::UnknownType {
                name: name.to_string(),
            })
    }

    /// Relationship of `via` named like `field`; used to read interface-shaped inputs.
    pub fn via_relationship(&self, via: &str, field: &'s RelationshipField) -> &'s RelationshipField {
        self.model
            .entity(via)
            .and_then(|entity| entity.relationship(&field.name))
            .unwrap_or(field)
    }

    /// `(var:Label)` for node targets, `(var)` plus a label guard otherwise.
    pub fn target_node(&self, var: &str, target: Entity<'s>) -> (NodePattern, Option<Expr>) {
        match target {
            Entity::Node(node) => (NodePattern::labelled(var, node.name.as_str()), None),
            _ => (NodePattern::new(var), self.label_guard(var, target)),
        }
    }

    pub fn label_guard(&self, var: &str, target: Entity<'s>) -> Option<Expr> {
        Expr::or(
            self.model
                .concrete_types(target)
                .into_iter()
                .map(|node| Expr::has_label(var, &node.name))
                .collect(),
        )
    }

    /// Run `build` for each concrete type `var` can have. Polymorphic values get
    /// one label-guarded unit subquery per implementer.
    pub fn for_each_concrete(
        &mut self,
        query: &mut Query,
        var: &str,
        entity: Entity<'s>,
        build: &mut dyn FnMut(&mut Self, &mut Query, &'s NodeType) -> Result<(), TranslationError>,
    ) -> Result<(), TranslationError> {
        if let Entity::Node(node) = entity {
            return build(self, query, node);
        }
        for node in self.model.concrete_types(entity) {
            let mut body = guarded_import(var, &node.name);
            build(self, &mut body, node)?;
            if body.clauses.len() > 2 {
                query.push(Clause::Call(body));
            }
        }
        Ok(())
    }
}

/// Nested mutation phases, in the order they run across all relationship
/// fields of one input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Create,
    Connect,
    Update,
    Disconnect,
    Delete,
}

impl Phase {
    pub(crate) const ALL: [Phase; 5] = [
        Phase::Create,
        Phase::Connect,
        Phase::Update,
        Phase::Disconnect,
        Phase::Delete,
    ];

    /// Input key holding this phase's items.
    pub(crate) fn key(self) -> &'static str {
        match self {
            Phase::Create => "create",
            Phase::Connect => "connect",
            Phase::Update => "update",
            Phase::Disconnect => "disconnect",
            Phase::Delete => "delete",
        }
    }
}

/// Handler for one relationship key of a connect, disconnect or delete input.
pub(crate) type FieldHandler<'s> = fn(
    &mut Translator<'s>,
    &mut Query,
    Owner<'_>,
    &'s RelationshipField,
    &Value,
    &str,
) -> Result<(), TranslationError>;

impl<'s> Translator<'s> {
    /// Relationship-keyed input (`TConnectInput`, `TDisconnectInput`,
    /// `TDeleteInput`) applied to every row of `var`. Interface values may add
    /// `_on` lists keyed by implementer.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn keyed_input(
        &mut self,
        query: &mut Query,
        var: &str,
        entity: Entity<'s>,
        value: &Value,
        path: &str,
        operation: &str,
        handler: FieldHandler<'s>,
    ) -> Result<(), TranslationError> {
        let object = as_object(value, path)?;
        let names = EntityNames::new(entity.name());
        let mut shared = Vec::new();
        for (key, value) in object {
            if value.is_null() || (key == "_on" && matches!(entity, Entity::Interface(_))) {
                continue;
            }
            let field = entity.relationship(key).ok_or_else(|| {
                TranslationError::unknown_field(format!("{}{}Input", names.name, operation), key.as_str())
            })?;
            shared.push((field, value));
        }

        if !shared.is_empty() {
            let via = entity.name();
            self.for_each_concrete(query, var, entity, &mut |translator, body, node| {
                for (declared, value) in &shared {
                    let Some(field) = node.relationship(&declared.name) else {
                        continue;
                    };
                    let owner = Owner { var, node, via };
                    handler(translator, body, owner, field, value, &format!("{}.{}", path, declared.name))?;
                }
                Ok(())
            })?;
        }

        let on = object.get("_on").filter(|v| !v.is_null());
        if let (Entity::Interface(interface), Some(on)) = (entity, on) {
            let on_path = format!("{}._on", path);
            for (implementer, items) in as_object(on, &on_path)? {
                if !interface.implementers.contains(implementer) {
                    return Err(TranslationError::unknown_field(
                        names.implementations_input(operation),
                        implementer.as_str(),
                    ));
                }
                let node = self.node(implementer)?;
                let mut body = guarded_import(var, &node.name);
                let items = match items {
                    Value::Array(items) => items.iter().filter(|v| !v.is_null()).collect(),
                    Value::Null => vec![],
                    other => vec![other],
                };
                for (i, item) in items.into_iter().enumerate() {
                    let item_path = format!("{}.{}[{}]", on_path, implementer, i);
                    self.keyed_input(&mut body, var, Entity::Node(node), item, &item_path, operation, handler)?;
                }
                if body.clauses.len() > 2 {
                    query.push(Clause::Call(body));
                }
            }
        }
        Ok(())
    }
}

/// `WITH var` then `WITH var WHERE var:Label`.
pub(crate) fn guarded_import(var: &str, label: &str) -> Query {
    Query::from_clauses(vec![
        Clause::with_variables(&[var]),
        Clause::With {
            projection: crate::cypher::Projection::variables(&[var]),
            filter: Some(Expr::has_label(var, label)),
        },
    ])
}

/// Pattern from `source` along `field`, honouring its direction unless undirected.
pub(crate) fn relationship_pattern(
    source: NodePattern,
    field: &RelationshipField,
    rel_var: Option<&str>,
    target: NodePattern,
    directed: bool,
) -> Pattern {
    let direction = match (directed, field.direction) {
        (false, _) => PatternDirection::Undirected,
        (true, Direction::Out) => PatternDirection::Right,
        (true, Direction::In) => PatternDirection::Left,
    };
    Pattern::relationship(
        source,
        RelPattern {
            variable: rel_var.map(str::to_string),
            rel_type: field.rel_type.clone(),
            direction,
        },
        target,
    )
}

pub(crate) fn as_object<'v>(
    value: &'v Value,
    path: &str,
) -> Result<&'v Map<String, Value>, TranslationError> {
    value
        .as_object()
        .ok_or_else(|| TranslationError::validation_with_context(path, "expected an input object"))
}

pub(crate) fn as_array<'v>(value: &'v Value, path: &str) -> Result<&'v Vec<Value>, TranslationError> {
    value
        .as_array()
        .ok_or_else(|| TranslationError::validation_with_context(path, "expected a list"))
}

/// Items of a relationship input honouring cardinality: list fields accept a
/// list or a single value, singular fields only a single value.
pub(crate) fn cardinality_items<'v>(
    value: Option<&'v Value>,
    is_list: bool,
    path: &str,
) -> Result<Vec<&'v Value>, TranslationError> {
    match value {
        None | Some(Value::Null) => Ok(vec![]),
        Some(Value::Array(items)) if is_list => Ok(items.iter().filter(|v| !v.is_null()).collect()),
        Some(Value::Array(_)) => Err(TranslationError::validation_with_context(
            path,
            "a singular relationship accepts a single value, not a list",
        )),
        Some(other) => Ok(vec![other]),
    }
}

/// The one populated member of a member-keyed union input.
pub(crate) fn single_member<'v>(
    object: &'v Map<String, Value>,
    path: &str,
) -> Result<Option<(&'v str, &'v Value)>, TranslationError> {
    let mut populated = object.iter().filter(|(_, v)| !v.is_null());
    let first = populated.next();
    if let Some((second, _)) = populated.next() {
        let (first_key, _) = first.map(|(k, v)| (k.as_str(), v)).unwrap_or(("", &Value::Null));
        return Err(TranslationError::validation_with_context(
            path,
            format!(
                "only one member may be given per value, found `{}` and `{}`",
                first_key, second
            ),
        ));
    }
    Ok(first.map(|(k, v)| (k.as_str(), v)))
}

/// Members a union-keyed input may name.
pub(crate) fn union_member<'s>(
    translator: &Translator<'s>,
    field: &RelationshipField,
    member: &str,
) -> Result<&'s NodeType, TranslationError> {
    let allowed = match translator.model.union(&field.target) {
        Some(union) => union.members.iter().any(|m| m == member),
        None => field.target_kind != TargetKind::Union,
    };
    if !allowed {
        return Err(TranslationError::unknown_field(&field.target, member));
    }
    translator.node(member)
}
