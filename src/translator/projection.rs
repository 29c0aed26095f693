//! Selection projection.
//!
//! Every node in a result is returned as a map projection. Relationship,
//! connection and aggregate fields are each computed in their own `CALL`
//! subquery and referenced from the map by variable. Polymorphic targets get
//! one `UNION` branch per concrete type, each tagging its rows with
//! `__typename`.

use serde_json::{Map, Value};

use super::{relationship_pattern, TranslationError, Translator};
use crate::cypher::{
    Clause, Expr, NodePattern, Pattern, Projection, ProjectionItem, Query, SortOrder,
};
use crate::response::cursor::cursor_to_offset;
use crate::schema_builder::{EntityNames, RelationshipNames};
use crate::translator::SelectedField;
use crate::type_model::{EdgeProperties, Entity, NodeType, RelationshipField, ScalarField};

/// Parsed `options` argument.
#[derive(Debug, Default)]
pub(crate) struct ReadOptions<'s> {
    pub sort: Vec<(&'s ScalarField, SortOrder)>,
    pub limit: Option<Expr>,
    pub offset: Option<Expr>,
}

impl ReadOptions<'_> {
    pub fn is_empty(&self) -> bool {
        self.sort.is_empty() && self.limit.is_none() && self.offset.is_none()
    }

    /// `WITH <items> ORDER BY ... SKIP ... LIMIT ...`, keyed by `key`.
    pub fn clause(self, items: Vec<ProjectionItem>, key: impl Fn(&ScalarField) -> Expr) -> Clause {
        Clause::With {
            projection: Projection {
                distinct: false,
                items,
                order_by: self.sort.iter().map(|(f, order)| (key(f), *order)).collect(),
                skip: self.offset,
                limit: self.limit,
            },
            filter: None,
        }
    }
}

/// What a selected field name refers to on a node.
enum FieldRole<'s> {
    Typename,
    Scalar(&'s ScalarField),
    Relationship(&'s RelationshipField),
    Connection(&'s RelationshipField),
    Aggregate(&'s RelationshipField),
}

fn resolve_field<'s>(node: &'s NodeType, name: &str) -> Option<FieldRole<'s>> {
    if name == "__typename" {
        return Some(FieldRole::Typename);
    }
    if let Some(field) = node.fields.iter().find(|f| f.name == name) {
        return Some(FieldRole::Scalar(field));
    }
    for field in &node.relationships {
        let names = RelationshipNames::new(&node.name, field);
        if field.name == name {
            return Some(FieldRole::Relationship(field));
        }
        if names.connection_field() == name {
            return Some(FieldRole::Connection(field));
        }
        if names.aggregate_field() == name {
            return Some(FieldRole::Aggregate(field));
        }
    }
    None
}

fn sort_direction(value: &Value, path: &str) -> Result<SortOrder, TranslationError> {
    match value.as_str() {
        Some("ASC") => Ok(SortOrder::Asc),
        Some("DESC") => Ok(SortOrder::Desc),
        _ => Err(TranslationError::validation_with_context(
            path,
            "sort direction must be ASC or DESC",
        )),
    }
}

/// `{ field: ASC }` entries against sortable (non-list) fields.
fn parse_sort<'s>(
    value: &Value,
    fields: &'s [ScalarField],
    sort_input: &str,
    path: &str,
) -> Result<Vec<(&'s ScalarField, SortOrder)>, TranslationError> {
    let mut sort = Vec::new();
    for (key, direction) in super::as_object(value, path)? {
        if direction.is_null() {
            continue;
        }
        let field = fields
            .iter()
            .find(|f| &f.name == key && !f.is_list)
            .ok_or_else(|| TranslationError::unknown_field(sort_input, key.as_str()))?;
        sort.push((field, sort_direction(direction, &format!("{}.{}", path, key))?));
    }
    Ok(sort)
}

fn check_args(field: &SelectedField, allowed: &[&str], path: &str) -> Result<(), TranslationError> {
    match field.args.keys().find(|k| !allowed.contains(&k.as_str())) {
        Some(key) => Err(TranslationError::validation_with_context(
            path,
            format!("unknown argument `{}`", key),
        )),
        None => Ok(()),
    }
}

fn directed_arg(args: &Map<String, Value>, path: &str) -> Result<bool, TranslationError> {
    match args.get("directed") {
        None | Some(Value::Null) => Ok(true),
        Some(Value::Bool(directed)) => Ok(*directed),
        Some(_) => Err(TranslationError::validation_with_context(
            format!("{}.directed", path),
            "expected a Boolean",
        )),
    }
}

fn non_negative(value: &Value, path: &str) -> Result<u64, TranslationError> {
    value
        .as_u64()
        .ok_or_else(|| TranslationError::validation_with_context(path, "expected a non-negative Int"))
}

fn nested_property(base: &str, key: &str, field: &str) -> Expr {
    Expr::Property {
        base: Box::new(Expr::property(base, key)),
        key: field.to_string(),
    }
}

/// What one aggregate subquery matches.
#[derive(Debug, Clone, Copy)]
struct AggregateScope<'a, 's> {
    target: Entity<'s>,
    traversal: Option<Traversal<'a, 's>>,
    where_value: Option<&'a Value>,
    path: &'a str,
}

/// Relationship the selected value is reached through; `None` for root queries.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Traversal<'a, 's> {
    pub source: &'a str,
    pub owner: &'s NodeType,
    pub field: &'s RelationshipField,
    pub directed: bool,
}

impl<'s> Translator<'s> {
    pub(crate) fn parse_options(
        &mut self,
        entity: Entity<'s>,
        value: Option<&Value>,
        path: &str,
    ) -> Result<ReadOptions<'s>, TranslationError> {
        let mut options = ReadOptions::default();
        let Some(value) = value.filter(|v| !v.is_null()) else {
            return Ok(options);
        };
        let names = EntityNames::new(entity.name());
        let options_input = match entity {
            Entity::Union(_) => "QueryOptions".to_string(),
            _ => names.options_input(),
        };
        for (key, value) in super::as_object(value, path)? {
            if value.is_null() {
                continue;
            }
            let key_path = format!("{}.{}", path, key);
            match key.as_str() {
                "sort" if !matches!(entity, Entity::Union(_)) => {
                    for (i, item) in super::as_array(value, &key_path)?.iter().enumerate() {
                        options.sort.extend(parse_sort(
                            item,
                            entity.fields(),
                            &names.sort_input(),
                            &format!("{}[{}]", key_path, i),
                        )?);
                    }
                }
                "limit" => {
                    let limit = non_negative(value, &key_path)?;
                    options.limit = Some(self.ctx.param(Value::from(limit)));
                }
                "offset" => {
                    let offset = non_negative(value, &key_path)?;
                    options.offset = Some(self.ctx.param(Value::from(offset)));
                }
                other => return Err(TranslationError::unknown_field(&options_input, other)),
            }
        }
        Ok(options)
    }

    fn applies_to(&self, field: &SelectedField, node: &NodeType) -> bool {
        match field.on.as_deref() {
            None => true,
            Some(on) => {
                on == node.name
                    || node.interfaces.iter().any(|i| i == on)
                    || self
                        .model
                        .union(on)
                        .is_some_and(|u| u.members.contains(&node.name))
            }
        }
    }

    /// Map projection of `var` as `node`, plus the subqueries its entries read.
    ///
    /// `typename` tags the map with the concrete type; `hidden` fields are
    /// added under their own name so polymorphic results can be sorted.
    pub(crate) fn project_node(
        &mut self,
        var: &str,
        node: &'s NodeType,
        selection: &[SelectedField],
        typename: bool,
        hidden: &[&'s ScalarField],
    ) -> Result<(Vec<Clause>, Expr), TranslationError> {
        let mut calls = Vec::new();
        let mut entries: Vec<(String, Expr)> = Vec::new();

        for field in selection {
            if !self.applies_to(field, node) {
                continue;
            }
            let key = field.response_key().to_string();
            if entries.iter().any(|(k, _)| *k == key) {
                continue;
            }
            let role = resolve_field(node, &field.name)
                .ok_or_else(|| TranslationError::unknown_field(&node.name, &field.name))?;
            let value = match role {
                FieldRole::Typename => Expr::string(node.name.as_str()),
                FieldRole::Scalar(scalar) => Expr::property(var, scalar.db_property.as_str()),
                FieldRole::Relationship(relationship) => {
                    let (call, result) = self.project_relationship(var, node, relationship, field)?;
                    calls.push(call);
                    Expr::var(result)
                }
                FieldRole::Connection(relationship) => {
                    let path = format!("{}.{}", node.name, field.response_key());
                    check_args(field, &["where", "first", "after", "sort", "directed"], &path)?;
                    let traversal = Traversal {
                        source: var,
                        owner: node,
                        field: relationship,
                        directed: directed_arg(&field.args, &path)?,
                    };
                    let target = self.entity(&relationship.target)?;
                    let (clauses, value) =
                        self.connection_clauses(target, Some(traversal), field, &path)?;
                    let result = self.ctx.var("var");
                    let mut body = Query::from_clauses(vec![Clause::with_variables(&[var])]);
                    body.extend(clauses);
                    body.push(Clause::returning(vec![ProjectionItem::aliased(value, result.clone())]));
                    calls.push(Clause::Call(body));
                    Expr::var(result)
                }
                FieldRole::Aggregate(relationship) => {
                    let path = format!("{}.{}", node.name, field.response_key());
                    check_args(field, &["where", "directed"], &path)?;
                    let traversal = Traversal {
                        source: var,
                        owner: node,
                        field: relationship,
                        directed: directed_arg(&field.args, &path)?,
                    };
                    let target = self.entity(&relationship.target)?;
                    let (clauses, value) =
                        self.aggregate_clauses(target, Some(traversal), field, &path)?;
                    calls.extend(clauses);
                    value
                }
            };
            entries.push((key, value));
        }

        if typename && !entries.iter().any(|(k, _)| k == "__typename") {
            entries.push(("__typename".to_string(), Expr::string(node.name.as_str())));
        }
        for field in hidden {
            if !entries.iter().any(|(k, _)| *k == field.name) {
                entries.push((field.name.clone(), Expr::property(var, field.db_property.as_str())));
            }
        }

        Ok((
            calls,
            Expr::MapProjection {
                variable: var.to_string(),
                entries,
            },
        ))
    }

    /// `CALL { ... RETURN collect(...) AS varN }` for a relationship field.
    fn project_relationship(
        &mut self,
        source: &str,
        owner: &'s NodeType,
        relationship: &'s RelationshipField,
        field: &SelectedField,
    ) -> Result<(Clause, String), TranslationError> {
        let path = format!("{}.{}", owner.name, field.response_key());
        check_args(field, &["where", "options", "directed"], &path)?;
        let directed = directed_arg(&field.args, &path)?;
        let target = self.entity(&relationship.target)?;
        let options =
            self.parse_options(target, field.args.get("options"), &format!("{}.options", path))?;
        let where_path = format!("{}.where", path);
        let result = self.ctx.var("var");

        let mut body = Query::from_clauses(vec![Clause::with_variables(&[source])]);
        let collected = match target {
            Entity::Node(node) => {
                let node_var = self.ctx.var("this");
                let pattern = relationship_pattern(
                    NodePattern::new(source),
                    relationship,
                    None,
                    NodePattern::labelled(node_var.as_str(), node.name.as_str()),
                    directed,
                );
                self.compile_where(&node_var, target, field.args.get("where"), &where_path)?
                    .apply(&mut body, pattern, None);
                if !options.is_empty() {
                    body.push(options.clause(vec![], |f| {
                        Expr::property(&node_var, f.db_property.as_str())
                    }));
                }
                let (calls, projection) = self.project_node(&node_var, node, &field.selection, false, &[])?;
                body.extend(calls);
                Expr::function("collect", vec![projection])
            }
            _ => {
                let item = self.ctx.var("var");
                let hidden: Vec<&ScalarField> = options.sort.iter().map(|(f, _)| *f).collect();
                let mut branches = Query::new();
                let model = self.model;
                for node in model.concrete_types(target) {
                    if !branches.is_empty() {
                        branches.push(Clause::Union);
                    }
                    branches.push(Clause::with_variables(&[source]));
                    let node_var = self.ctx.var("this");
                    let pattern = relationship_pattern(
                        NodePattern::new(source),
                        relationship,
                        None,
                        NodePattern::labelled(node_var.as_str(), node.name.as_str()),
                        directed,
                    );
                    self.compile_where(&node_var, target, field.args.get("where"), &where_path)?
                        .apply(&mut branches, pattern, None);
                    let (calls, projection) =
                        self.project_node(&node_var, node, &field.selection, true, &hidden)?;
                    branches.extend(calls);
                    branches.push(Clause::returning(vec![ProjectionItem::aliased(
                        projection,
                        item.clone(),
                    )]));
                }
                if branches.is_empty() {
                    Expr::List(vec![])
                } else {
                    body.push(Clause::Call(branches));
                    if !options.is_empty() {
                        body.push(options.clause(
                            vec![ProjectionItem::bare(Expr::var(item.as_str()))],
                            |f| Expr::property(&item, f.name.as_str()),
                        ));
                    }
                    Expr::function("collect", vec![Expr::var(item.as_str())])
                }
            }
        };

        let value = if relationship.is_list {
            collected
        } else {
            Expr::function("head", vec![collected])
        };
        body.push(Clause::returning(vec![ProjectionItem::aliased(value, result.clone())]));
        Ok((Clause::Call(body), result))
    }

    /// Clauses computing `{ edges, totalCount }` for a connection, root or nested.
    ///
    /// Edges are projected per concrete type, sorted, collected, then sliced
    /// by `after`/`first`. Cursors and `pageInfo` are derived from the slice
    /// offset by the response mapper.
    pub(crate) fn connection_clauses(
        &mut self,
        target: Entity<'s>,
        traversal: Option<Traversal<'_, 's>>,
        field: &SelectedField,
        path: &str,
    ) -> Result<(Vec<Clause>, Expr), TranslationError> {
        let args = &field.args;
        let first = match args.get("first").filter(|v| !v.is_null()) {
            Some(first) => Some(non_negative(first, &format!("{}.first", path))?),
            None => None,
        };
        let offset = match args.get("after").filter(|v| !v.is_null()) {
            Some(after) => {
                let after_path = format!("{}.after", path);
                let cursor = after.as_str().ok_or_else(|| {
                    TranslationError::validation_with_context(&after_path, "expected a cursor string")
                })?;
                cursor_to_offset(cursor)
                    .and_then(|index| (index as u64).checked_add(1))
                    .ok_or_else(|| TranslationError::validation_with_context(&after_path, "invalid cursor"))?
            }
            None => 0,
        };

        let edge_properties = match traversal {
            Some(t) => match self.model.edge_properties(&t.owner.name, t.field) {
                EdgeProperties::Shared(properties) => Some(properties),
                _ => None,
            },
            None => None,
        };

        // node and edge sort keys
        let mut sort: Vec<(&str, &'s ScalarField, SortOrder)> = Vec::new();
        if let Some(value) = args.get("sort").filter(|v| !v.is_null()) {
            let sort_path = format!("{}.sort", path);
            let node_sort = EntityNames::new(target.name()).sort_input();
            for (i, item) in super::as_array(value, &sort_path)?.iter().enumerate() {
                let item_path = format!("{}[{}]", sort_path, i);
                match traversal {
                    None => {
                        for (f, o) in parse_sort(item, target.fields(), &node_sort, &item_path)? {
                            sort.push(("node", f, o));
                        }
                    }
                    Some(t) => {
                        let names = RelationshipNames::new(&t.owner.name, t.field);
                        for (key, value) in super::as_object(item, &item_path)? {
                            if value.is_null() {
                                continue;
                            }
                            let (side, fields, input) = match (key.as_str(), edge_properties) {
                                ("node", _) => ("node", target.fields(), node_sort.clone()),
                                ("edge", Some(p)) => (
                                    "properties",
                                    p.fields.as_slice(),
                                    EntityNames::new(&p.name).sort_input(),
                                ),
                                (other, _) => {
                                    return Err(TranslationError::unknown_field(
                                        names.connection_sort(),
                                        other,
                                    ))
                                }
                            };
                            let key_path = format!("{}.{}", item_path, key);
                            for (f, o) in parse_sort(value, fields, &input, &key_path)? {
                                sort.push((side, f, o));
                            }
                        }
                    }
                }
            }
        }

        // merge every `edges` selection
        let mut node_selection = Vec::new();
        let mut properties_selection = Vec::new();
        for edges in field.selection.iter().filter(|f| f.name == "edges") {
            for part in &edges.selection {
                match part.name.as_str() {
                    "node" => node_selection.extend(part.selection.iter().cloned()),
                    "properties" => properties_selection.extend(part.selection.iter().cloned()),
                    _ => {}
                }
            }
        }
        let hidden_node: Vec<&ScalarField> = sort
            .iter()
            .filter(|(side, _, _)| *side == "node")
            .map(|(_, f, _)| *f)
            .collect();
        let hidden_edge: Vec<&ScalarField> = sort
            .iter()
            .filter(|(side, _, _)| *side == "properties")
            .map(|(_, f, _)| *f)
            .collect();
        let polymorphic = !matches!(target, Entity::Node(_));

        let item = self.ctx.var("edge");
        let mut branches = Query::new();
        let model = self.model;
        for node in model.concrete_types(target) {
            if !branches.is_empty() {
                branches.push(Clause::Union);
            }
            let node_var = self.ctx.var("this");
            let node_pattern = NodePattern::labelled(node_var.as_str(), node.name.as_str());
            let mut edge_var = None;
            match traversal {
                Some(t) => {
                    let rel_var = self.ctx.var("this");
                    branches.push(Clause::with_variables(&[t.source]));
                    let pattern = relationship_pattern(
                        NodePattern::new(t.source),
                        t.field,
                        Some(rel_var.as_str()),
                        node_pattern,
                        t.directed,
                    );
                    self.compile_connection_where(
                        t.source,
                        &t.owner.name,
                        t.field,
                        target,
                        &node_var,
                        &rel_var,
                        args.get("where"),
                        &format!("{}.where", path),
                    )?
                    .apply(&mut branches, pattern, None);
                    edge_var = Some(rel_var);
                }
                None => {
                    self.compile_where(&node_var, target, args.get("where"), &format!("{}.where", path))?
                        .apply(&mut branches, Pattern::node(node_pattern), None);
                }
            }

            let (calls, node_projection) =
                self.project_node(&node_var, node, &node_selection, polymorphic, &hidden_node)?;
            branches.extend(calls);
            let mut entries = vec![("node".to_string(), node_projection)];
            if let (Some(edge_var), Some(properties)) = (&edge_var, edge_properties) {
                if !properties_selection.is_empty() || !hidden_edge.is_empty() {
                    let mut projected = vec![(
                        "__typename".to_string(),
                        Expr::string(properties.name.as_str()),
                    )];
                    for selected in &properties_selection {
                        let other_type = selected
                            .on
                            .as_deref()
                            .is_some_and(|on| on != properties.name && self.model.properties(on).is_some());
                        if selected.name == "__typename" || other_type {
                            continue;
                        }
                        let property = properties
                            .fields
                            .iter()
                            .find(|f| f.name == selected.name)
                            .ok_or_else(|| {
                                TranslationError::unknown_field(&properties.name, &selected.name)
                            })?;
                        projected.push((
                            selected.response_key().to_string(),
                            Expr::property(edge_var, property.db_property.as_str()),
                        ));
                    }
                    for f in &hidden_edge {
                        if !projected.iter().any(|(k, _)| *k == f.name) {
                            projected.push((f.name.clone(), Expr::property(edge_var, f.db_property.as_str())));
                        }
                    }
                    entries.push((
                        "properties".to_string(),
                        Expr::MapProjection {
                            variable: edge_var.clone(),
                            entries: projected,
                        },
                    ));
                }
            }
            branches.push(Clause::returning(vec![ProjectionItem::aliased(
                Expr::Map(entries),
                item.clone(),
            )]));
        }

        let edges = self.ctx.var("edges");
        let total = self.ctx.var("totalCount");
        let mut clauses = Vec::new();
        if branches.is_empty() {
            clauses.push(Clause::With {
                projection: Projection::items(vec![ProjectionItem::aliased(
                    Expr::List(vec![]),
                    edges.clone(),
                )]),
                filter: None,
            });
        } else {
            clauses.push(Clause::Call(branches));
            if !sort.is_empty() {
                clauses.push(Clause::With {
                    projection: Projection {
                        items: vec![ProjectionItem::bare(Expr::var(item.as_str()))],
                        order_by: sort
                            .iter()
                            .map(|(side, f, o)| (nested_property(&item, side, &f.name), *o))
                            .collect(),
                        ..Projection::default()
                    },
                    filter: None,
                });
            }
            clauses.push(Clause::With {
                projection: Projection::items(vec![ProjectionItem::aliased(
                    Expr::function("collect", vec![Expr::var(item.as_str())]),
                    edges.clone(),
                )]),
                filter: None,
            });
        }
        clauses.push(Clause::With {
            projection: Projection::items(vec![
                ProjectionItem::bare(Expr::var(edges.as_str())),
                ProjectionItem::aliased(
                    Expr::function("size", vec![Expr::var(edges.as_str())]),
                    total.clone(),
                ),
            ]),
            filter: None,
        });

        let from = (offset > 0).then(|| Box::new(self.ctx.param(Value::from(offset))));
        let to = first.map(|first| Box::new(self.ctx.param(Value::from(offset + first))));
        let edges_value = if from.is_none() && to.is_none() {
            Expr::var(edges.as_str())
        } else {
            Expr::Slice {
                base: Box::new(Expr::var(edges.as_str())),
                from,
                to,
            }
        };
        Ok((
            clauses,
            Expr::Map(vec![
                ("edges".to_string(), edges_value),
                ("totalCount".to_string(), Expr::var(total.as_str())),
            ]),
        ))
    }

    /// Fresh `[WITH source] MATCH pattern WHERE ...` for one aggregate subquery.
    fn aggregate_match(
        &mut self,
        scope: AggregateScope<'_, 's>,
    ) -> Result<(Query, String, Option<String>), TranslationError> {
        let node_var = self.ctx.var("this");
        let (node_pattern, guard) = self.target_node(&node_var, scope.target);
        let predicate = self.compile_where(
            &node_var,
            scope.target,
            scope.where_value,
            &format!("{}.where", scope.path),
        )?;
        let mut query = Query::new();
        match scope.traversal {
            Some(t) => {
                let edge_var = self.ctx.var("this");
                query.push(Clause::with_variables(&[t.source]));
                let pattern = relationship_pattern(
                    NodePattern::new(t.source),
                    t.field,
                    Some(edge_var.as_str()),
                    node_pattern,
                    t.directed,
                );
                predicate.apply(&mut query, pattern, guard);
                Ok((query, node_var, Some(edge_var)))
            }
            None => {
                predicate.apply(&mut query, Pattern::node(node_pattern), guard);
                Ok((query, node_var, None))
            }
        }
    }

    /// One subquery per selected count or field; returns them plus the result map.
    ///
    /// Root aggregates select fields directly, relationship aggregates under
    /// `node` and `edge`.
    pub(crate) fn aggregate_clauses(
        &mut self,
        target: Entity<'s>,
        traversal: Option<Traversal<'_, 's>>,
        field: &SelectedField,
        path: &str,
    ) -> Result<(Vec<Clause>, Expr), TranslationError> {
        let selection_type = match traversal {
            Some(t) => RelationshipNames::new(&t.owner.name, t.field).aggregation_selection(),
            None => EntityNames::new(target.name()).aggregate_selection(),
        };
        let edge_properties = match traversal {
            Some(t) => match self.model.edge_properties(&t.owner.name, t.field) {
                EdgeProperties::Shared(properties) => Some(properties),
                _ => None,
            },
            None => None,
        };
        let scope = AggregateScope {
            target,
            traversal,
            where_value: field.args.get("where"),
            path,
        };
        let mut clauses = Vec::new();
        let mut entries = Vec::new();

        for selected in &field.selection {
            let key = selected.response_key().to_string();
            match selected.name.as_str() {
                "__typename" => entries.push((key, Expr::string(selection_type.as_str()))),
                "count" => {
                    let (mut query, node_var, _) = self.aggregate_match(scope)?;
                    let result = self.ctx.var("var");
                    query.push(Clause::returning(vec![ProjectionItem::aliased(
                        Expr::function("count", vec![Expr::var(node_var.as_str())]),
                        result.clone(),
                    )]));
                    clauses.push(Clause::Call(query));
                    entries.push((key, Expr::var(result)));
                }
                side @ ("node" | "edge") if traversal.is_some() => {
                    let fields = match (side, edge_properties) {
                        ("node", _) => target.fields(),
                        (_, Some(properties)) => properties.fields.as_slice(),
                        _ => return Err(TranslationError::unknown_field(&selection_type, side)),
                    };
                    let mut reduced = Vec::new();
                    for reduced_field in selected.selection.iter().filter(|f| f.name != "__typename") {
                        let value = self.reduce_selected(
                            scope,
                            fields,
                            side == "edge",
                            reduced_field,
                            &selection_type,
                            &mut clauses,
                        )?;
                        reduced.push((reduced_field.response_key().to_string(), value));
                    }
                    entries.push((key, Expr::Map(reduced)));
                }
                _ if traversal.is_none() => {
                    let value = self.reduce_selected(
                        scope,
                        target.fields(),
                        false,
                        selected,
                        &selection_type,
                        &mut clauses,
                    )?;
                    entries.push((key, value));
                }
                other => return Err(TranslationError::unknown_field(&selection_type, other)),
            }
        }
        Ok((clauses, Expr::Map(entries)))
    }

    fn reduce_selected(
        &mut self,
        scope: AggregateScope<'_, 's>,
        fields: &'s [ScalarField],
        on_edge: bool,
        selected: &SelectedField,
        selection_type: &str,
        clauses: &mut Vec<Clause>,
    ) -> Result<Expr, TranslationError> {
        let scalar = fields
            .iter()
            .find(|f| f.name == selected.name && f.kind.is_aggregatable() && !f.is_list)
            .ok_or_else(|| TranslationError::unknown_field(selection_type, &selected.name))?;
        let (mut query, node_var, edge_var) = self.aggregate_match(scope)?;
        let var = match (on_edge, edge_var) {
            (true, Some(edge_var)) => edge_var,
            _ => node_var,
        };
        let result = self.ctx.var("var");
        self.reduce_field(&mut query, &var, scalar, &result);
        clauses.push(Clause::Call(query));
        Ok(Expr::var(result))
    }

    /// Reductions of one scalar: shortest/longest for text, min/max/average/sum
    /// for numbers, min/max for temporals.
    fn reduce_field(&mut self, query: &mut Query, var: &str, field: &ScalarField, result: &str) {
        let property = Expr::property(var, field.db_property.as_str());
        let reduction = |function: &str| Expr::function(function, vec![property.clone()]);
        if field.kind.is_textual() {
            let list = self.ctx.var("list");
            query.push(Clause::With {
                projection: Projection {
                    items: vec![ProjectionItem::bare(Expr::var(var))],
                    order_by: vec![(Expr::function("size", vec![property.clone()]), SortOrder::Desc)],
                    ..Projection::default()
                },
                filter: None,
            });
            query.push(Clause::With {
                projection: Projection::items(vec![ProjectionItem::aliased(
                    Expr::function("collect", vec![property.clone()]),
                    list.clone(),
                )]),
                filter: None,
            });
            query.push(Clause::returning(vec![ProjectionItem::aliased(
                Expr::Map(vec![
                    ("longest".to_string(), Expr::function("head", vec![Expr::var(list.as_str())])),
                    ("shortest".to_string(), Expr::function("last", vec![Expr::var(list.as_str())])),
                ]),
                result,
            )]));
            return;
        }
        let mut entries = vec![
            ("min".to_string(), reduction("min")),
            ("max".to_string(), reduction("max")),
        ];
        if field.kind.is_numeric() {
            entries.push(("average".to_string(), reduction("avg")));
            entries.push(("sum".to_string(), reduction("sum")));
        }
        query.push(Clause::returning(vec![ProjectionItem::aliased(Expr::Map(entries), result)]));
    }
}
