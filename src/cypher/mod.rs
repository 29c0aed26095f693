//! Cypher statement model.
//!
//! Expressions and clauses are built as values and rendered with [`ToCypher`].
//! All user-supplied values go through [`CypherContext::param`]; nothing from
//! an operation is ever spliced into statement text except identifiers, which
//! are escaped.

pub mod expr;
pub mod query;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use expr::{CompareOp, Expr, Literal};
pub use query::{
    Clause, NodePattern, Pattern, PatternDirection, Projection, ProjectionItem, Query, RelPattern,
    SetItem, SortOrder,
};

pub trait ToCypher {
    fn to_cypher(&self) -> String;
}

lazy_static! {
    static ref PLAIN_IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

/// Backtick-quote identifiers that are not plain names.
pub fn escape_identifier(name: &str) -> String {
    if PLAIN_IDENTIFIER.is_match(name) {
        name.to_string()
    } else {
        format!("`{}`", name.replace('`', "``"))
    }
}

pub(crate) fn indent_block(text: &str) -> String {
    text.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("    {}", line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// A parameterized statement ready for the database collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub text: String,
    pub params: Map<String, Value>,
}

/// Per-statement naming state: parameter bindings plus a shared counter for variables.
#[derive(Debug, Default)]
pub struct CypherContext {
    params: Map<String, Value>,
    next_param: usize,
    next_var: usize,
}

impl CypherContext {
    pub fn new() -> Self {
        CypherContext::default()
    }

    /// Bind `value` and return the `$paramN` expression that refers to it.
    pub fn param(&mut self, value: Value) -> Expr {
        let name = format!("param{}", self.next_param);
        self.next_param += 1;
        self.params.insert(name.clone(), value);
        Expr::Parameter(name)
    }

    /// Fresh variable such as `this3` or `var4`.
    pub fn var(&mut self, prefix: &str) -> String {
        let name = format!("{}{}", prefix, self.next_var);
        self.next_var += 1;
        name
    }

    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    pub fn into_statement(self, query: &Query) -> Statement {
        Statement {
            text: query.to_cypher(),
            params: self.params,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_escape_identifier() {
        assert_eq!(escape_identifier("this0"), "this0");
        assert_eq!(escape_identifier("ACTED_IN"), "ACTED_IN");
        assert_eq!(escape_identifier("has space"), "`has space`");
        assert_eq!(escape_identifier("a`b"), "`a``b`");
        assert_eq!(escape_identifier("1abc"), "`1abc`");
    }

    #[test]
    fn test_context_names_are_sequential() {
        let mut ctx = CypherContext::new();
        assert_eq!(ctx.var("this"), "this0");
        assert_eq!(ctx.var("var"), "var1");
        assert_eq!(ctx.param(json!(2)), Expr::param("param0"));
        assert_eq!(ctx.param(json!("x")), Expr::param("param1"));
        assert_eq!(ctx.params().get("param0"), Some(&json!(2)));
    }

    #[test]
    fn test_indent_block() {
        assert_eq!(indent_block("a\n\nb"), "    a\n\n    b");
    }
}
