use serde_json::{Map, Value};

use super::operators::{parse_comparator, AggregateComparator, AggregateComparison};
use crate::translator::errors::TranslationError;
use crate::type_model::{ScalarField, ScalarKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateTarget {
    Node,
    Edge,
}

/// Typed aggregation-where tree.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregatePredicate {
    Count {
        comparison: AggregateComparison,
        value: i64,
    },
    Field {
        target: AggregateTarget,
        /// Database property key
        property: String,
        kind: ScalarKind,
        comparator: AggregateComparator,
        value: Value,
    },
    And(Vec<AggregatePredicate>),
    Or(Vec<AggregatePredicate>),
    Not(Box<AggregatePredicate>),
}

impl AggregatePredicate {
    /// A conjunction with nothing in it places no constraint.
    pub fn is_empty(&self) -> bool {
        match self {
            AggregatePredicate::And(items) => items.iter().all(AggregatePredicate::is_empty),
            _ => false,
        }
    }
}

/// Fields the aggregation may reduce over.
#[derive(Debug, Clone, Copy)]
pub struct AggregateScope<'a> {
    /// Generated input name, used in error messages
    pub input_name: &'a str,
    pub node_fields: &'a [ScalarField],
    /// `None` when the relationship carries no usable edge properties
    pub edge_fields: Option<&'a [ScalarField]>,
}

const COUNT_KEYS: [(&str, AggregateComparison); 5] = [
    ("count", AggregateComparison::Equal),
    ("count_LT", AggregateComparison::Lt),
    ("count_LTE", AggregateComparison::Lte),
    ("count_GT", AggregateComparison::Gt),
    ("count_GTE", AggregateComparison::Gte),
];

fn as_object<'v>(value: &'v Value, path: &str) -> Result<&'v Map<String, Value>, TranslationError> {
    value
        .as_object()
        .ok_or_else(|| TranslationError::validation_with_context(path, "expected an input object"))
}

fn as_array<'v>(value: &'v Value, path: &str) -> Result<&'v Vec<Value>, TranslationError> {
    value
        .as_array()
        .ok_or_else(|| TranslationError::validation_with_context(path, "expected a list"))
}

/// Parse `SFAggregateInput`: counts, `node`, `edge` and boolean composition.
pub fn parse_aggregate_where(
    value: &Value,
    scope: &AggregateScope<'_>,
    path: &str,
) -> Result<AggregatePredicate, TranslationError> {
    let object = as_object(value, path)?;
    let mut conditions = Vec::new();

    for (key, value) in object {
        if value.is_null() {
            continue;
        }
        let key_path = format!("{}.{}", path, key);

        if let Some((_, comparison)) = COUNT_KEYS.iter().find(|(k, _)| *k == key.as_str()) {
            let count = value.as_i64().ok_or_else(|| {
                TranslationError::validation_with_context(&key_path, "count must be an integer")
            })?;
            conditions.push(AggregatePredicate::Count {
                comparison: *comparison,
                value: count,
            });
            continue;
        }

        match key.as_str() {
            "AND" | "OR" => {
                let mut items = Vec::new();
                for (i, item) in as_array(value, &key_path)?.iter().enumerate() {
                    items.push(parse_aggregate_where(item, scope, &format!("{}[{}]", key_path, i))?);
                }
                conditions.push(if key == "AND" {
                    AggregatePredicate::And(items)
                } else {
                    AggregatePredicate::Or(items)
                });
            }
            "NOT" => conditions.push(AggregatePredicate::Not(Box::new(parse_aggregate_where(
                value, scope, &key_path,
            )?))),
            "node" => conditions.push(parse_field_conditions(
                value,
                AggregateTarget::Node,
                scope.node_fields,
                scope,
                &key_path,
            )?),
            "edge" => {
                let fields = scope
                    .edge_fields
                    .ok_or_else(|| TranslationError::unknown_field(scope.input_name, "edge"))?;
                conditions.push(parse_field_conditions(
                    value,
                    AggregateTarget::Edge,
                    fields,
                    scope,
                    &key_path,
                )?);
            }
            other => return Err(TranslationError::unknown_field(scope.input_name, other)),
        }
    }

    Ok(AggregatePredicate::And(conditions))
}

fn parse_field_conditions(
    value: &Value,
    target: AggregateTarget,
    fields: &[ScalarField],
    scope: &AggregateScope<'_>,
    path: &str,
) -> Result<AggregatePredicate, TranslationError> {
    let object = as_object(value, path)?;
    let mut conditions = Vec::new();

    for (key, value) in object {
        if value.is_null() {
            continue;
        }
        let key_path = format!("{}.{}", path, key);
        match key.as_str() {
            "AND" | "OR" => {
                let mut items = Vec::new();
                for (i, item) in as_array(value, &key_path)?.iter().enumerate() {
                    items.push(parse_field_conditions(
                        item,
                        target,
                        fields,
                        scope,
                        &format!("{}[{}]", key_path, i),
                    )?);
                }
                conditions.push(if key == "AND" {
                    AggregatePredicate::And(items)
                } else {
                    AggregatePredicate::Or(items)
                });
            }
            "NOT" => conditions.push(AggregatePredicate::Not(Box::new(parse_field_conditions(
                value, target, fields, scope, &key_path,
            )?))),
            _ => {
                let (field, comparator) = parse_comparator(key, fields)
                    .ok_or_else(|| TranslationError::unknown_field(scope.input_name, key.as_str()))?;
                if comparator.deprecated {
                    log::debug!("Deprecated aggregation comparator `{}` used", key);
                }
                conditions.push(AggregatePredicate::Field {
                    target,
                    property: field.db_property.clone(),
                    kind: field.kind.clone(),
                    comparator,
                    value: value.clone(),
                });
            }
        }
    }

    Ok(AggregatePredicate::And(conditions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::operators::AggregateFunction;
    use serde_json::json;

    fn field(name: &str, kind: ScalarKind) -> ScalarField {
        ScalarField {
            name: name.to_string(),
            kind,
            is_list: false,
            required: false,
            db_property: name.to_string(),
            autogenerate: false,
            default_value: None,
        }
    }

    #[test]
    fn test_parse_count_node_and_edge() {
        let node_fields = vec![field("name", ScalarKind::String)];
        let edge_fields = vec![field("likedAt", ScalarKind::DateTime)];
        let scope = AggregateScope {
            input_name: "PostLikesAggregateInput",
            node_fields: &node_fields,
            edge_fields: Some(edge_fields.as_slice()),
        };
        let parsed = parse_aggregate_where(
            &json!({
                "AND": [
                    { "count": 2 },
                    { "edge": { "likedAt_MIN_LTE": "2024-01-01T00:00:00Z" } },
                    { "node": { "name_SHORTEST_LT": 5 } }
                ]
            }),
            &scope,
            "where",
        )
        .unwrap();

        let AggregatePredicate::And(top) = parsed else {
            panic!("expected conjunction");
        };
        let AggregatePredicate::And(items) = &top[0] else {
            panic!("expected AND list");
        };
        assert_eq!(items.len(), 3);
        assert_eq!(
            items[0],
            AggregatePredicate::And(vec![AggregatePredicate::Count {
                comparison: AggregateComparison::Equal,
                value: 2
            }])
        );
        let AggregatePredicate::And(node) = &items[2] else {
            panic!("expected node conditions");
        };
        match &node[0] {
            AggregatePredicate::And(inner) => match &inner[0] {
                AggregatePredicate::Field { comparator, .. } => {
                    assert_eq!(comparator.function, AggregateFunction::ShortestLength);
                    assert!(comparator.deprecated);
                }
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_edge_without_properties_is_unknown() {
        let node_fields = vec![field("name", ScalarKind::String)];
        let scope = AggregateScope {
            input_name: "UserFriendsAggregateInput",
            node_fields: &node_fields,
            edge_fields: None,
        };
        let error = parse_aggregate_where(&json!({ "edge": {} }), &scope, "where").unwrap_err();
        assert_eq!(
            error,
            TranslationError::unknown_field("UserFriendsAggregateInput", "edge")
        );
    }

    #[test]
    fn test_count_must_be_integer() {
        let scope = AggregateScope {
            input_name: "X",
            node_fields: &[],
            edge_fields: None,
        };
        assert!(matches!(
            parse_aggregate_where(&json!({ "count": "two" }), &scope, "where"),
            Err(TranslationError::Validation { .. })
        ));
        assert!(parse_aggregate_where(&json!({}), &scope, "where")
            .unwrap()
            .is_empty());
    }
}
