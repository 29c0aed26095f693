use serde_json::Value;

use super::predicate::{AggregatePredicate, AggregateTarget};
use crate::cypher::{
    Clause, CypherContext, Expr, Pattern, ProjectionItem, Query,
};

/// Relationship pattern the aggregate reduces over.
#[derive(Debug, Clone)]
pub struct AggregatePattern {
    pub source_var: String,
    pub pattern: Pattern,
    pub node_var: String,
    pub edge_var: String,
    /// Label guard for interface and union targets
    pub guard: Option<Expr>,
}

/// A compiled aggregation filter: run `preclause`, then filter on `predicate`.
#[derive(Debug, Clone)]
pub struct CompiledAggregate {
    pub preclause: Clause,
    pub predicate: Expr,
    /// Boolean aggregate expression returned by the subquery
    pub condition: Expr,
    pub node_var: String,
    pub edge_var: String,
    pub result_var: String,
}

/// Compile an aggregation-where tree into
/// `CALL { WITH src MATCH pattern RETURN <condition> AS varN }` plus `varN = true`.
///
/// Returns `None` when the input constrains nothing.
pub fn compile_aggregate(
    ctx: &mut CypherContext,
    target: AggregatePattern,
    predicate: &AggregatePredicate,
) -> Option<CompiledAggregate> {
    let condition = compile_condition(ctx, &target, predicate)?;
    let result_var = ctx.var("var");

    let mut body = Query::new();
    body.push(Clause::with_variables(&[target.source_var.as_str()]));
    body.push(Clause::matching(target.pattern.clone(), target.guard.clone()));
    body.push(Clause::returning(vec![ProjectionItem::aliased(
        condition.clone(),
        result_var.clone(),
    )]));

    Some(CompiledAggregate {
        preclause: Clause::Call(body),
        predicate: Expr::eq(Expr::var(result_var.as_str()), Expr::boolean(true)),
        condition,
        node_var: target.node_var,
        edge_var: target.edge_var,
        result_var,
    })
}

fn compile_condition(
    ctx: &mut CypherContext,
    target: &AggregatePattern,
    predicate: &AggregatePredicate,
) -> Option<Expr> {
    match predicate {
        AggregatePredicate::Count { comparison, value } => Some(Expr::compare(
            Expr::function("count", vec![Expr::var(target.node_var.as_str())]),
            comparison.compare_op(),
            ctx.param(Value::from(*value)),
        )),
        AggregatePredicate::Field {
            target: side,
            property,
            kind,
            comparator,
            value,
        } => {
            let variable = match side {
                AggregateTarget::Node => &target.node_var,
                AggregateTarget::Edge => &target.edge_var,
            };
            let (function, measures_length) = comparator.function.cypher();
            let mut reduced = Expr::property(variable, property.as_str());
            if measures_length {
                reduced = Expr::function("size", vec![reduced]);
            }
            let mut operand = ctx.param(value.clone());
            if !measures_length {
                if let Some(constructor) = kind.temporal_function() {
                    operand = Expr::function(constructor, vec![operand]);
                }
            }
            Some(Expr::compare(
                Expr::function(function, vec![reduced]),
                comparator.comparison.compare_op(),
                operand,
            ))
        }
        AggregatePredicate::And(items) => {
            let compiled = items
                .iter()
                .filter_map(|item| compile_condition(ctx, target, item))
                .collect();
            Expr::and(compiled)
        }
        AggregatePredicate::Or(items) => {
            let compiled = items
                .iter()
                .filter_map(|item| compile_condition(ctx, target, item))
                .collect();
            Expr::or(compiled)
        }
        AggregatePredicate::Not(inner) => compile_condition(ctx, target, inner).map(Expr::not),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::predicate::{parse_aggregate_where, AggregateScope};
    use crate::cypher::{CompareOp, Literal, NodePattern, PatternDirection, RelPattern, ToCypher};
    use crate::type_model::{ScalarField, ScalarKind};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use serde_json::{json, Map};
    use std::collections::HashMap;

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

    fn likes_pattern(ctx: &mut CypherContext) -> AggregatePattern {
        let edge_var = ctx.var("this");
        let node_var = ctx.var("this");
        AggregatePattern {
            source_var: "this".to_string(),
            pattern: Pattern::relationship(
                NodePattern::new("this"),
                RelPattern {
                    variable: Some(edge_var.clone()),
                    rel_type: "LIKES".to_string(),
                    direction: PatternDirection::Left,
                },
                NodePattern::labelled(node_var.clone(), "User"),
            ),
            node_var,
            edge_var,
            guard: None,
        }
    }

    fn compile(input: Value) -> (CompiledAggregate, Map<String, Value>) {
        let node_fields = vec![field("name", ScalarKind::String)];
        let edge_fields = vec![
            field("weight", ScalarKind::Int),
            field("likedAt", ScalarKind::DateTime),
        ];
        let scope = AggregateScope {
            input_name: "PostLikesAggregateInput",
            node_fields: &node_fields,
            edge_fields: Some(edge_fields.as_slice()),
        };
        let predicate = parse_aggregate_where(&input, &scope, "likesAggregate").unwrap();
        let mut ctx = CypherContext::new();
        let target = likes_pattern(&mut ctx);
        let compiled = compile_aggregate(&mut ctx, target, &predicate).unwrap();
        let params = ctx.params().clone();
        (compiled, params)
    }

    #[test]
    fn test_compile_count_renders_subquery() {
        let (compiled, params) = compile(json!({ "count": 2 }));
        let mut query = Query::new();
        query.push(compiled.preclause.clone());
        assert_eq!(
            query.to_cypher(),
            "CALL {\n    WITH this\n    MATCH (this)<-[this0:LIKES]-(this1:User)\n    RETURN count(this1) = $param0 AS var2\n}"
        );
        assert_eq!(compiled.predicate.to_cypher(), "var2 = true");
        assert_eq!(params.get("param0"), Some(&json!(2)));
    }

    #[test]
    fn test_conjunction_of_count_edge_and_node() {
        let (compiled, _) = compile(json!({
            "AND": [
                { "count": 2 },
                { "edge": { "likedAt_MIN_LTE": "2024-01-01T00:00:00Z" } },
                { "node": { "name_SHORTEST_LENGTH_LT": 6 } }
            ]
        }));
        assert_eq!(
            compiled.condition.to_cypher(),
            "count(this1) = $param0 AND min(this0.likedAt) <= datetime($param1) AND min(size(this1.name)) < $param2"
        );
    }

    #[test]
    fn test_legacy_and_canonical_keys_compile_identically() {
        let (legacy, _) = compile(json!({ "node": { "name_SHORTEST_LT": 4 } }));
        let (unqualified, _) = compile(json!({ "node": { "name_LT": 4 } }));
        let (canonical, _) = compile(json!({ "node": { "name_SHORTEST_LENGTH_LT": 4 } }));
        assert_eq!(legacy.condition, canonical.condition);
        assert_eq!(unqualified.condition, canonical.condition);
    }

    #[test]
    fn test_not_wraps_whole_subexpression() {
        let (compiled, _) = compile(json!({
            "NOT": { "count_GT": 1, "edge": { "weight_SUM_LT": 10 } }
        }));
        assert_eq!(
            compiled.condition.to_cypher(),
            "NOT (count(this1) > $param0 AND sum(this0.weight) < $param1)"
        );
    }

    #[test]
    fn test_empty_input_compiles_to_nothing() {
        let node_fields = vec![field("name", ScalarKind::String)];
        let scope = AggregateScope {
            input_name: "X",
            node_fields: &node_fields,
            edge_fields: None,
        };
        let predicate = parse_aggregate_where(&json!({ "node": {} }), &scope, "w").unwrap();
        let mut ctx = CypherContext::new();
        let target = likes_pattern(&mut ctx);
        assert!(compile_aggregate(&mut ctx, target, &predicate).is_none());
    }

    // In-memory evaluation of compiled aggregate conditions.

    #[derive(Debug, Clone)]
    struct Like {
        weight: i64,
        name: String,
    }

    #[derive(Debug, Clone, PartialEq, PartialOrd)]
    enum Val {
        Null,
        Num(f64),
        Str(String),
    }

    fn to_val(value: &Value) -> Val {
        match value {
            Value::Number(n) => n.as_f64().map(Val::Num).unwrap_or(Val::Null),
            Value::String(s) => Val::Str(s.clone()),
            _ => Val::Null,
        }
    }

    struct Interpreter<'a> {
        compiled: &'a CompiledAggregate,
        params: &'a Map<String, Value>,
    }

    impl Interpreter<'_> {
        fn scalar(&self, expr: &Expr, row: Option<&Like>) -> Val {
            match expr {
                Expr::Parameter(name) => self.params.get(name).map(to_val).unwrap_or(Val::Null),
                Expr::Literal(Literal::Integer(i)) => Val::Num(*i as f64),
                // a bound row variable is never null here
                Expr::Variable(_) if row.is_some() => Val::Num(1.0),
                Expr::Property { base, key } => {
                    let (Some(like), Expr::Variable(var)) = (row, base.as_ref()) else {
                        return Val::Null;
                    };
                    if *var == self.compiled.edge_var && key == "weight" {
                        Val::Num(like.weight as f64)
                    } else if *var == self.compiled.node_var && key == "name" {
                        Val::Str(like.name.clone())
                    } else {
                        Val::Null
                    }
                }
                Expr::Function { name, args, .. } if name == "size" => {
                    match self.scalar(&args[0], row) {
                        Val::Str(s) => Val::Num(s.chars().count() as f64),
                        _ => Val::Null,
                    }
                }
                Expr::Function { name, args, .. } if name == "datetime" => self.scalar(&args[0], row),
                other => panic!("unsupported scalar expression {:?}", other),
            }
        }

        fn aggregate(&self, expr: &Expr, rows: &[Like]) -> Val {
            let Expr::Function { name, args, .. } = expr else {
                return self.scalar(expr, None);
            };
            let values: Vec<Val> = rows
                .iter()
                .map(|row| self.scalar(&args[0], Some(row)))
                .filter(|v| *v != Val::Null)
                .collect();
            match name.as_str() {
                "count" => Val::Num(rows.len() as f64),
                "min" => values
                    .into_iter()
                    .reduce(|a, b| if b < a { b } else { a })
                    .unwrap_or(Val::Null),
                "max" => values
                    .into_iter()
                    .reduce(|a, b| if b > a { b } else { a })
                    .unwrap_or(Val::Null),
                "sum" => Val::Num(
                    values
                        .iter()
                        .map(|v| match v {
                            Val::Num(n) => *n,
                            _ => 0.0,
                        })
                        .sum(),
                ),
                "avg" if values.is_empty() => Val::Null,
                "avg" => {
                    let total: f64 = values
                        .iter()
                        .map(|v| match v {
                            Val::Num(n) => *n,
                            _ => 0.0,
                        })
                        .sum();
                    Val::Num(total / values.len() as f64)
                }
                _ => self.scalar(expr, None),
            }
        }

        fn truth(&self, expr: &Expr, rows: &[Like]) -> Option<bool> {
            match expr {
                Expr::Compare { left, op, right } => {
                    let l = self.aggregate(left, rows);
                    let r = self.aggregate(right, rows);
                    if l == Val::Null || r == Val::Null {
                        return None;
                    }
                    Some(match op {
                        CompareOp::Eq => l == r,
                        CompareOp::Lt => l < r,
                        CompareOp::Lte => l <= r,
                        CompareOp::Gt => l > r,
                        CompareOp::Gte => l >= r,
                        other => panic!("unexpected operator {:?}", other),
                    })
                }
                Expr::And(items) => items.iter().fold(Some(true), |acc, item| {
                    match (acc, self.truth(item, rows)) {
                        (Some(false), _) | (_, Some(false)) => Some(false),
                        (Some(true), Some(true)) => Some(true),
                        _ => None,
                    }
                }),
                Expr::Or(items) => items.iter().fold(Some(false), |acc, item| {
                    match (acc, self.truth(item, rows)) {
                        (Some(true), _) | (_, Some(true)) => Some(true),
                        (Some(false), Some(false)) => Some(false),
                        _ => None,
                    }
                }),
                Expr::Not(inner) => self.truth(inner, rows).map(|b| !b),
                other => panic!("unsupported boolean expression {:?}", other),
            }
        }
    }

    const COMPARISONS: [(&str, fn(f64, f64) -> bool); 5] = [
        ("EQUAL", |a, b| a == b),
        ("GT", |a, b| a > b),
        ("GTE", |a, b| a >= b),
        ("LT", |a, b| a < b),
        ("LTE", |a, b| a <= b),
    ];

    /// Direct evaluation of one generated condition over a post's likes.
    fn brute_force(
        rows: &[Like],
        count: (usize, i64),
        edge: (&str, usize, i64),
        node: (&str, usize, i64),
    ) -> Option<bool> {
        let count_holds = COMPARISONS[count.0].1(rows.len() as f64, count.1 as f64);

        let weights: Vec<f64> = rows.iter().map(|r| r.weight as f64).collect();
        let edge_value = match edge.0 {
            "MIN" => weights.iter().cloned().reduce(f64::min),
            "MAX" => weights.iter().cloned().reduce(f64::max),
            "SUM" => Some(weights.iter().sum()),
            _ => (!weights.is_empty()).then(|| weights.iter().sum::<f64>() / weights.len() as f64),
        };
        let edge_holds = edge_value.map(|v| COMPARISONS[edge.1].1(v, edge.2 as f64));

        let lengths: Vec<f64> = rows.iter().map(|r| r.name.chars().count() as f64).collect();
        let node_value = match node.0 {
            "SHORTEST_LENGTH" => lengths.iter().cloned().reduce(f64::min),
            "LONGEST_LENGTH" => lengths.iter().cloned().reduce(f64::max),
            _ => (!lengths.is_empty()).then(|| lengths.iter().sum::<f64>() / lengths.len() as f64),
        };
        let node_holds = node_value.map(|v| COMPARISONS[node.1].1(v, node.2 as f64));

        [Some(count_holds), edge_holds, node_holds]
            .into_iter()
            .fold(Some(true), |acc, item| match (acc, item) {
                (Some(false), _) | (_, Some(false)) => Some(false),
                (Some(true), Some(true)) => Some(true),
                _ => None,
            })
    }

    fn fixture(rng: &mut StdRng) -> HashMap<String, Vec<Like>> {
        let mut posts = HashMap::new();
        for p in 0..16 {
            let likes = (0..rng.random_range(0..5))
                .map(|u| Like {
                    weight: rng.random_range(0..10),
                    name: "u".repeat(rng.random_range(1..7)) + &u.to_string(),
                })
                .collect();
            posts.insert(format!("Post{}", p), likes);
        }
        posts
    }

    #[test]
    fn test_conjunction_matches_brute_force_evaluation() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let posts = fixture(&mut rng);
        let edge_functions = ["MIN", "MAX", "SUM", "AVERAGE"];
        let node_functions = ["SHORTEST_LENGTH", "LONGEST_LENGTH", "AVERAGE_LENGTH"];
        let count_keys = ["count", "count_GT", "count_GTE", "count_LT", "count_LTE"];

        for _ in 0..200 {
            let count = (rng.random_range(0..5usize), rng.random_range(0..5i64));
            let edge = (
                edge_functions[rng.random_range(0..edge_functions.len())],
                rng.random_range(0..5usize),
                rng.random_range(0..20i64),
            );
            let node = (
                node_functions[rng.random_range(0..node_functions.len())],
                rng.random_range(0..5usize),
                rng.random_range(1..8i64),
            );

            let mut edge_input = Map::new();
            edge_input.insert(
                format!("weight_{}_{}", edge.0, COMPARISONS[edge.1].0),
                json!(edge.2),
            );
            let mut node_input = Map::new();
            node_input.insert(
                format!("name_{}_{}", node.0, COMPARISONS[node.1].0),
                json!(node.2),
            );
            let mut count_input = Map::new();
            count_input.insert(count_keys[count.0].to_string(), json!(count.1));

            let (compiled, params) = compile(json!({
                "AND": [count_input, { "edge": edge_input }, { "node": node_input }]
            }));
            let interpreter = Interpreter {
                compiled: &compiled,
                params: &params,
            };

            // count keys are ordered EQUAL, GT, GTE, LT, LTE like COMPARISONS
            for (post, likes) in &posts {
                assert_eq!(
                    interpreter.truth(&compiled.condition, likes),
                    brute_force(likes, count, edge, node),
                    "{} with count {:?}, edge {:?}, node {:?}",
                    post,
                    count,
                    edge,
                    node
                );
            }
        }
    }
}
