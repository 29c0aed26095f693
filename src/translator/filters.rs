//! `Where` input compilation.
//!
//! A filter compiles to a boolean expression plus the subqueries it reads
//! from. Only aggregation filters need subqueries; everything else is an
//! inline predicate or an `EXISTS`/`COUNT` pattern subquery.

use serde_json::Value;

use super::{as_array, as_object, relationship_pattern, TranslationError, Translator};
use crate::aggregation::{compile_aggregate, parse_aggregate_where, AggregatePattern, AggregateScope};
use crate::cypher::{Clause, CompareOp, Expr, NodePattern, Pattern, Projection, Query};
use crate::schema_builder::{parse_where_key, EntityNames, RelationshipNames, WhereOperator};
use crate::type_model::{
    EdgeProperties, Entity, RelationshipField, RelationshipPropertiesType, ScalarField,
};

/// Compiled filter: run `preclauses` first, then test `expr`.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Predicate {
    pub preclauses: Vec<Clause>,
    pub expr: Option<Expr>,
}

impl Predicate {
    /// `MATCH pattern WHERE guard AND filter`, moving the filter behind a
    /// `WITH *` when subqueries have to run between the two.
    pub fn apply(self, query: &mut Query, pattern: Pattern, guard: Option<Expr>) {
        if self.preclauses.is_empty() {
            let filter = Expr::and(guard.into_iter().chain(self.expr).collect());
            query.push(Clause::matching(pattern, filter));
            return;
        }
        query.push(Clause::matching(pattern, guard));
        query.extend(self.preclauses);
        if let Some(expr) = self.expr {
            query.push(Clause::With {
                projection: Projection::star(),
                filter: Some(expr),
            });
        }
    }

    fn subquery(&self, pattern: Pattern, guard: Option<Expr>, negate: bool) -> Query {
        let expr = if negate {
            self.expr.clone().map(Expr::not)
        } else {
            self.expr.clone()
        };
        let mut query = Query::new();
        Predicate {
            preclauses: self.preclauses.clone(),
            expr,
        }
        .apply(&mut query, pattern, guard);
        query
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quantifier {
    All,
    None,
    Single,
    Some,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RelationshipFilter {
    /// List relationships: `f_SOME`, `f_NONE`, ... and the deprecated `f`/`f_NOT`
    Quantified { connection: bool, quantifier: Quantifier },
    /// Singular relationships: `f` and `f_NOT`
    Singular { connection: bool, negated: bool },
    Aggregate,
}

fn parse_relationship_filter<'r>(
    owner: &str,
    key: &str,
    relationships: &'r [RelationshipField],
) -> Option<(&'r RelationshipField, RelationshipFilter)> {
    for field in relationships {
        let names = RelationshipNames::new(owner, field);
        if key == names.aggregate_field() {
            return Some((field, RelationshipFilter::Aggregate));
        }
        for (base, connection) in [(field.name.clone(), false), (names.connection_field(), true)] {
            let Some(rest) = key.strip_prefix(base.as_str()) else {
                continue;
            };
            let filter = match (rest, field.is_list) {
                ("", true) => RelationshipFilter::Quantified {
                    connection,
                    quantifier: Quantifier::Some,
                },
                ("_NOT", true) => RelationshipFilter::Quantified {
                    connection,
                    quantifier: Quantifier::None,
                },
                ("", false) => RelationshipFilter::Singular {
                    connection,
                    negated: false,
                },
                ("_NOT", false) => RelationshipFilter::Singular {
                    connection,
                    negated: true,
                },
                (suffix, true) => {
                    let quantifier = match suffix {
                        "_ALL" => Quantifier::All,
                        "_NONE" => Quantifier::None,
                        "_SINGLE" => Quantifier::Single,
                        "_SOME" => Quantifier::Some,
                        _ => continue,
                    };
                    RelationshipFilter::Quantified {
                        connection,
                        quantifier,
                    }
                }
                _ => continue,
            };
            return Some((field, filter));
        }
    }
    None
}

fn junction(key: &str, items: Vec<Expr>) -> Option<Expr> {
    if key == "AND" {
        Expr::and(items)
    } else {
        Expr::or(items)
    }
}

impl<'s> Translator<'s> {
    /// Compile `TWhere` against `var`.
    pub(crate) fn compile_where(
        &mut self,
        var: &str,
        entity: Entity<'s>,
        value: Option<&Value>,
        path: &str,
    ) -> Result<Predicate, TranslationError> {
        let mut preclauses = Vec::new();
        let expr = match value {
            None | Some(Value::Null) => None,
            Some(value) => self.where_conditions(var, entity, value, path, &mut preclauses)?,
        };
        Ok(Predicate { preclauses, expr })
    }

    /// Compile `SFConnectionWhere` against a matched `(source)-[edge]-(node)`.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn compile_connection_where(
        &mut self,
        source: &str,
        via: &str,
        field: &'s RelationshipField,
        target: Entity<'s>,
        node_var: &str,
        edge_var: &str,
        value: Option<&Value>,
        path: &str,
    ) -> Result<Predicate, TranslationError> {
        let mut preclauses = Vec::new();
        let expr = match value {
            None | Some(Value::Null) => None,
            Some(value) => {
                let scope = ConnectionScope {
                    source,
                    via,
                    field,
                    node_var,
                    edge_var,
                };
                self.connection_conditions(&scope, target, value, path, &mut preclauses)?
            }
        };
        Ok(Predicate { preclauses, expr })
    }

    fn where_conditions(
        &mut self,
        var: &str,
        entity: Entity<'s>,
        value: &Value,
        path: &str,
        preclauses: &mut Vec<Clause>,
    ) -> Result<Option<Expr>, TranslationError> {
        let object = as_object(value, path)?;
        let input_name = EntityNames::new(entity.name()).where_input();
        let mut conditions = Vec::new();

        if let Entity::Union(union) = entity {
            // members are alternatives: a node matches when its own member filter does
            for (member, member_where) in object {
                if member_where.is_null() {
                    continue;
                }
                if !union.members.contains(member) {
                    return Err(TranslationError::unknown_field(&input_name, member.as_str()));
                }
                let node = Entity::Node(self.node(member)?);
                let member_path = format!("{}.{}", path, member);
                let condition =
                    self.where_conditions(var, node, member_where, &member_path, preclauses)?;
                let label = Expr::has_label(var, member);
                conditions.push(match condition {
                    Some(condition) => Expr::And(vec![label, condition]),
                    None => label,
                });
            }
            return Ok(Expr::or(conditions));
        }

        for (key, value) in object {
            let key_path = format!("{}.{}", path, key);
            match key.as_str() {
                "AND" | "OR" => {
                    if value.is_null() {
                        continue;
                    }
                    let mut items = Vec::new();
                    for (i, item) in as_array(value, &key_path)?.iter().enumerate() {
                        let item_path = format!("{}[{}]", key_path, i);
                        if let Some(expr) =
                            self.where_conditions(var, entity, item, &item_path, preclauses)?
                        {
                            items.push(expr);
                        }
                    }
                    conditions.extend(junction(key, items));
                }
                "NOT" => {
                    if value.is_null() {
                        continue;
                    }
                    if let Some(expr) =
                        self.where_conditions(var, entity, value, &key_path, preclauses)?
                    {
                        conditions.push(Expr::not(expr));
                    }
                }
                "typename_IN" if matches!(entity, Entity::Interface(_)) => {
                    if value.is_null() {
                        continue;
                    }
                    let mut labels = Vec::new();
                    for name in as_array(value, &key_path)? {
                        let name = name.as_str().unwrap_or_default();
                        let implements = match entity {
                            Entity::Interface(interface) => {
                                interface.implementers.iter().any(|i| i == name)
                            }
                            _ => false,
                        };
                        if !implements {
                            return Err(TranslationError::validation_with_context(
                                &key_path,
                                format!("`{}` does not implement `{}`", name, entity.name()),
                            ));
                        }
                        labels.push(Expr::has_label(var, name));
                    }
                    conditions.push(Expr::or(labels).unwrap_or(Expr::boolean(false)));
                }
                "_on" if matches!(entity, Entity::Interface(_)) => {
                    let Entity::Interface(interface) = entity else {
                        continue;
                    };
                    if value.is_null() {
                        continue;
                    }
                    for (implementer, implementer_where) in as_object(value, &key_path)? {
                        if !interface.implementers.contains(implementer) {
                            return Err(TranslationError::unknown_field(
                                EntityNames::new(&interface.name).implementations_input("Where"),
                                implementer.as_str(),
                            ));
                        }
                        if implementer_where.is_null() {
                            continue;
                        }
                        let node = self.node(implementer)?;
                        let on_path = format!("{}.{}", key_path, implementer);
                        if let Some(expr) = self.where_conditions(
                            var,
                            Entity::Node(node),
                            implementer_where,
                            &on_path,
                            preclauses,
                        )? {
                            // implementer filters leave other implementers untouched
                            conditions.push(Expr::Or(vec![
                                Expr::not(Expr::has_label(var, implementer)),
                                expr,
                            ]));
                        }
                    }
                }
                _ => {
                    if let Some((field, operator)) = parse_where_key(key, entity.fields()) {
                        conditions.extend(self.scalar_condition(var, field, operator, value, &key_path)?);
                    } else if let Some((field, filter)) =
                        parse_relationship_filter(entity.name(), key, entity.relationships())
                    {
                        conditions.extend(self.relationship_condition(
                            var,
                            entity.name(),
                            field,
                            filter,
                            value,
                            &key_path,
                            preclauses,
                        )?);
                    } else {
                        return Err(TranslationError::unknown_field(&input_name, key.as_str()));
                    }
                }
            }
        }
        Ok(Expr::and(conditions))
    }

    fn scalar_condition(
        &mut self,
        var: &str,
        field: &ScalarField,
        operator: WhereOperator,
        value: &Value,
        path: &str,
    ) -> Result<Option<Expr>, TranslationError> {
        let property = Expr::property(var, field.db_property.as_str());
        let (positive, negated) = operator.positive();

        if value.is_null() {
            return Ok(match positive {
                WhereOperator::Equal if negated => Some(Expr::IsNotNull(Box::new(property))),
                WhereOperator::Equal => Some(Expr::IsNull(Box::new(property))),
                _ => None,
            });
        }

        let expr = match positive {
            WhereOperator::Equal => {
                let operand = self.bind_scalar(&field.kind, value, field.is_list, path)?;
                Expr::eq(property, operand)
            }
            WhereOperator::In => {
                let operand = self.bind_scalar(&field.kind, value, true, path)?;
                Expr::compare(property, CompareOp::In, operand)
            }
            WhereOperator::Includes => {
                let operand = self.bind_scalar(&field.kind, value, false, path)?;
                Expr::compare(operand, CompareOp::In, property)
            }
            other => {
                let op = match other {
                    WhereOperator::Lt => CompareOp::Lt,
                    WhereOperator::Lte => CompareOp::Lte,
                    WhereOperator::Gt => CompareOp::Gt,
                    WhereOperator::Gte => CompareOp::Gte,
                    WhereOperator::Contains => CompareOp::Contains,
                    WhereOperator::StartsWith => CompareOp::StartsWith,
                    _ => CompareOp::EndsWith,
                };
                let operand = self.bind_scalar(&field.kind, value, false, path)?;
                Expr::compare(property, op, operand)
            }
        };
        Ok(Some(if negated { Expr::not(expr) } else { expr }))
    }

    #[allow(clippy::too_many_arguments)]
    fn relationship_condition(
        &mut self,
        var: &str,
        owner: &str,
        field: &'s RelationshipField,
        filter: RelationshipFilter,
        value: &Value,
        path: &str,
        preclauses: &mut Vec<Clause>,
    ) -> Result<Option<Expr>, TranslationError> {
        let target = self.entity(&field.target)?;
        if filter == RelationshipFilter::Aggregate {
            if value.is_null() {
                return Ok(None);
            }
            return self.aggregate_condition(var, owner, field, target, value, path, preclauses);
        }

        let node_var = self.ctx.var("this");
        let (connection, quantifier) = match filter {
            RelationshipFilter::Quantified {
                connection,
                quantifier,
            } => (connection, Some(quantifier)),
            RelationshipFilter::Singular { connection, .. } => (connection, None),
            RelationshipFilter::Aggregate => unreachable!("handled above"),
        };
        let edge_var = connection.then(|| self.ctx.var("this"));
        let (target_pattern, guard) = self.target_node(&node_var, target);
        let pattern = relationship_pattern(
            NodePattern::new(var),
            field,
            edge_var.as_deref(),
            target_pattern,
            true,
        );

        if value.is_null() {
            let exists = Expr::exists(Predicate::default().subquery(pattern, guard, false));
            return Ok(match filter {
                RelationshipFilter::Singular { negated: false, .. } => Some(Expr::not(exists)),
                RelationshipFilter::Singular { negated: true, .. } => Some(exists),
                _ => None,
            });
        }

        let inner = match &edge_var {
            Some(edge_var) => self.compile_connection_where(
                var,
                owner,
                field,
                target,
                &node_var,
                edge_var,
                Some(value),
                path,
            )?,
            None => self.compile_where(&node_var, target, Some(value), path)?,
        };

        let expr = match (filter, quantifier) {
            (RelationshipFilter::Singular { negated, .. }, _) => {
                let exists = Expr::exists(inner.subquery(pattern, guard, false));
                if negated {
                    Expr::not(exists)
                } else {
                    exists
                }
            }
            (_, Some(Quantifier::Some)) => Expr::exists(inner.subquery(pattern, guard, false)),
            (_, Some(Quantifier::None)) => {
                Expr::not(Expr::exists(inner.subquery(pattern, guard, false)))
            }
            (_, Some(Quantifier::Single)) => Expr::eq(
                Expr::Count(Box::new(inner.subquery(pattern, guard, false))),
                Expr::integer(1),
            ),
            (_, Some(Quantifier::All)) => {
                let some = Expr::exists(inner.subquery(pattern.clone(), guard.clone(), false));
                if inner.expr.is_none() {
                    some
                } else {
                    Expr::And(vec![
                        some,
                        Expr::not(Expr::exists(inner.subquery(pattern, guard, true))),
                    ])
                }
            }
            (_, None) => unreachable!("quantified filters always carry a quantifier"),
        };
        Ok(Some(expr))
    }

    #[allow(clippy::too_many_arguments)]
    fn aggregate_condition(
        &mut self,
        var: &str,
        owner: &str,
        field: &'s RelationshipField,
        target: Entity<'s>,
        value: &Value,
        path: &str,
        preclauses: &mut Vec<Clause>,
    ) -> Result<Option<Expr>, TranslationError> {
        let names = RelationshipNames::new(owner, field);
        let input_name = names.aggregate_input();
        let model = self.model;
        let edge_fields = match model.edge_properties(owner, field) {
            EdgeProperties::Shared(properties) => Some(properties.fields.as_slice()),
            _ => None,
        };
        let scope = AggregateScope {
            input_name: &input_name,
            node_fields: target.fields(),
            edge_fields,
        };
        let predicate = parse_aggregate_where(value, &scope, path)?;
        if predicate.is_empty() {
            return Ok(None);
        }

        let edge_var = self.ctx.var("this");
        let node_var = self.ctx.var("this");
        let (target_pattern, guard) = self.target_node(&node_var, target);
        let pattern = relationship_pattern(
            NodePattern::new(var),
            field,
            Some(&edge_var),
            target_pattern,
            true,
        );
        let compiled = compile_aggregate(
            &mut self.ctx,
            AggregatePattern {
                source_var: var.to_string(),
                pattern,
                node_var,
                edge_var,
                guard,
            },
            &predicate,
        );
        Ok(compiled.map(|compiled| {
            preclauses.push(compiled.preclause);
            compiled.predicate
        }))
    }

    fn connection_conditions(
        &mut self,
        scope: &ConnectionScope<'_, 's>,
        target: Entity<'s>,
        value: &Value,
        path: &str,
        preclauses: &mut Vec<Clause>,
    ) -> Result<Option<Expr>, TranslationError> {
        let object = as_object(value, path)?;
        let names = RelationshipNames::new(scope.via, scope.field);
        let mut conditions = Vec::new();

        if let Entity::Union(union) = target {
            for (member, member_where) in object {
                if member_where.is_null() {
                    continue;
                }
                if !union.members.contains(member) {
                    return Err(TranslationError::unknown_field(names.connection_where(), member.as_str()));
                }
                let node = Entity::Node(self.node(member)?);
                let member_path = format!("{}.{}", path, member);
                let label = Expr::has_label(scope.node_var, member);
                conditions.push(
                    match self.connection_conditions(scope, node, member_where, &member_path, preclauses)? {
                        Some(condition) => Expr::And(vec![label, condition]),
                        None => label,
                    },
                );
            }
            return Ok(Expr::or(conditions));
        }

        for (key, value) in object {
            if value.is_null() {
                continue;
            }
            let key_path = format!("{}.{}", path, key);
            match key.as_str() {
                "AND" | "OR" => {
                    let mut items = Vec::new();
                    for (i, item) in as_array(value, &key_path)?.iter().enumerate() {
                        let item_path = format!("{}[{}]", key_path, i);
                        items.extend(self.connection_conditions(scope, target, item, &item_path, preclauses)?);
                    }
                    conditions.extend(junction(key, items));
                }
                "NOT" => {
                    if let Some(expr) =
                        self.connection_conditions(scope, target, value, &key_path, preclauses)?
                    {
                        conditions.push(Expr::not(expr));
                    }
                }
                "node" | "node_NOT" => {
                    if let Some(expr) =
                        self.where_conditions(scope.node_var, target, value, &key_path, preclauses)?
                    {
                        conditions.push(if key == "node" { expr } else { Expr::not(expr) });
                    }
                }
                "edge" | "edge_NOT" => {
                    if let Some(expr) = self.edge_conditions(scope, value, &key_path)? {
                        conditions.push(if key == "edge" { expr } else { Expr::not(expr) });
                    }
                }
                other => {
                    return Err(TranslationError::unknown_field(names.connection_where(), other));
                }
            }
        }
        Ok(Expr::and(conditions))
    }

    fn edge_conditions(
        &mut self,
        scope: &ConnectionScope<'_, 's>,
        value: &Value,
        path: &str,
    ) -> Result<Option<Expr>, TranslationError> {
        let model = self.model;
        match model.edge_properties(scope.via, scope.field) {
            EdgeProperties::None => Err(TranslationError::unknown_field(
                RelationshipNames::new(scope.via, scope.field).connection_where(),
                "edge",
            )),
            EdgeProperties::Shared(properties) => {
                self.properties_conditions(scope.edge_var, properties, value, path)
            }
            EdgeProperties::PerImplementer(variants) => {
                let mut conditions = Vec::new();
                for (implementer, implementer_where) in as_object(value, path)? {
                    if implementer_where.is_null() {
                        continue;
                    }
                    let properties = variants
                        .iter()
                        .find(|(name, _)| *name == implementer.as_str())
                        .and_then(|(_, properties)| *properties)
                        .ok_or_else(|| {
                            TranslationError::unknown_field(
                                RelationshipNames::new(scope.via, scope.field).edge_where(),
                                implementer.as_str(),
                            )
                        })?;
                    let implementer_path = format!("{}.{}", path, implementer);
                    let label = Expr::has_label(scope.source, implementer);
                    conditions.push(
                        match self.properties_conditions(
                            scope.edge_var,
                            properties,
                            implementer_where,
                            &implementer_path,
                        )? {
                            Some(condition) => Expr::And(vec![label, condition]),
                            None => label,
                        },
                    );
                }
                Ok(Expr::or(conditions))
            }
        }
    }

    /// `PWhere` over relationship properties.
    fn properties_conditions(
        &mut self,
        var: &str,
        properties: &RelationshipPropertiesType,
        value: &Value,
        path: &str,
    ) -> Result<Option<Expr>, TranslationError> {
        let mut conditions = Vec::new();
        for (key, value) in as_object(value, path)? {
            let key_path = format!("{}.{}", path, key);
            match key.as_str() {
                "AND" | "OR" => {
                    if value.is_null() {
                        continue;
                    }
                    let mut items = Vec::new();
                    for (i, item) in as_array(value, &key_path)?.iter().enumerate() {
                        let item_path = format!("{}[{}]", key_path, i);
                        items.extend(self.properties_conditions(var, properties, item, &item_path)?);
                    }
                    conditions.extend(junction(key, items));
                }
                "NOT" => {
                    if value.is_null() {
                        continue;
                    }
                    if let Some(expr) = self.properties_conditions(var, properties, value, &key_path)? {
                        conditions.push(Expr::not(expr));
                    }
                }
                _ => {
                    let (field, operator) = parse_where_key(key, &properties.fields).ok_or_else(|| {
                        TranslationError::unknown_field(
                            EntityNames::new(&properties.name).where_input(),
                            key.as_str(),
                        )
                    })?;
                    conditions.extend(self.scalar_condition(var, field, operator, value, &key_path)?);
                }
            }
        }
        Ok(Expr::and(conditions))
    }
}

/// Variables and typing of a connection filter.
struct ConnectionScope<'a, 's> {
    source: &'a str,
    via: &'a str,
    field: &'s RelationshipField,
    node_var: &'a str,
    edge_var: &'a str,
}
