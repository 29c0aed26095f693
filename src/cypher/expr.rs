use super::{escape_identifier, indent_block, query::Query, ToCypher};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
    Contains,
    StartsWith,
    EndsWith,
}

impl CompareOp {
    fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Neq => "<>",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::In => "IN",
            CompareOp::Contains => "CONTAINS",
            CompareOp::StartsWith => "STARTS WITH",
            CompareOp::EndsWith => "ENDS WITH",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Boolean(bool),
    Integer(i64),
    String(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Variable(String),
    /// Rendered as `$name`
    Parameter(String),
    Literal(Literal),
    Property {
        base: Box<Expr>,
        key: String,
    },
    Compare {
        left: Box<Expr>,
        op: CompareOp,
        right: Box<Expr>,
    },
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
    IsNull(Box<Expr>),
    IsNotNull(Box<Expr>),
    HasLabel {
        variable: String,
        label: String,
    },
    Function {
        name: String,
        distinct: bool,
        args: Vec<Expr>,
    },
    Add(Box<Expr>, Box<Expr>),
    Subtract(Box<Expr>, Box<Expr>),
    List(Vec<Expr>),
    Map(Vec<(String, Expr)>),
    /// `this { .title, likes: var1 }`
    MapProjection {
        variable: String,
        entries: Vec<(String, Expr)>,
    },
    /// `[x IN list WHERE pred | expr]`
    ListComprehension {
        variable: String,
        list: Box<Expr>,
        filter: Option<Box<Expr>>,
        map: Option<Box<Expr>>,
    },
    Index {
        base: Box<Expr>,
        index: i64,
    },
    /// `list[from..to]`
    Slice {
        base: Box<Expr>,
        from: Option<Box<Expr>>,
        to: Option<Box<Expr>>,
    },
    Exists(Box<Query>),
    Count(Box<Query>),
    Case {
        branches: Vec<(Expr, Expr)>,
        otherwise: Option<Box<Expr>>,
    },
}

impl Expr {
    pub fn var(name: impl Into<String>) -> Self {
        Expr::Variable(name.into())
    }

    pub fn param(name: impl Into<String>) -> Self {
        Expr::Parameter(name.into())
    }

    pub fn string(value: impl Into<String>) -> Self {
        Expr::Literal(Literal::String(value.into()))
    }

    pub fn integer(value: i64) -> Self {
        Expr::Literal(Literal::Integer(value))
    }

    pub fn boolean(value: bool) -> Self {
        Expr::Literal(Literal::Boolean(value))
    }

    pub fn null() -> Self {
        Expr::Literal(Literal::Null)
    }

    pub fn property(variable: &str, key: impl Into<String>) -> Self {
        Expr::Property {
            base: Box::new(Expr::var(variable)),
            key: key.into(),
        }
    }

    pub fn compare(left: Expr, op: CompareOp, right: Expr) -> Self {
        Expr::Compare {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn eq(left: Expr, right: Expr) -> Self {
        Expr::compare(left, CompareOp::Eq, right)
    }

    pub fn function(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Function {
            name: name.into(),
            distinct: false,
            args,
        }
    }

    pub fn has_label(variable: &str, label: &str) -> Self {
        Expr::HasLabel {
            variable: variable.to_string(),
            label: label.to_string(),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(expr: Expr) -> Self {
        Expr::Not(Box::new(expr))
    }

    /// Conjunction that collapses empty and single-element lists.
    pub fn and(mut exprs: Vec<Expr>) -> Option<Expr> {
        match exprs.len() {
            0 => None,
            1 => exprs.pop(),
            _ => Some(Expr::And(exprs)),
        }
    }

    pub fn or(mut exprs: Vec<Expr>) -> Option<Expr> {
        match exprs.len() {
            0 => None,
            1 => exprs.pop(),
            _ => Some(Expr::Or(exprs)),
        }
    }

    pub fn exists(query: Query) -> Self {
        Expr::Exists(Box::new(query))
    }

    fn is_atomic(&self) -> bool {
        matches!(
            self,
            Expr::Variable(_)
                | Expr::Parameter(_)
                | Expr::Literal(_)
                | Expr::Property { .. }
                | Expr::Function { .. }
                | Expr::List(_)
                | Expr::Map(_)
                | Expr::MapProjection { .. }
                | Expr::ListComprehension { .. }
                | Expr::Index { .. }
                | Expr::Slice { .. }
                | Expr::Exists(_)
                | Expr::Count(_)
                | Expr::Case { .. }
        )
    }

    /// Operand of AND / OR: only nested junctions need parentheses.
    fn junction_operand(&self) -> String {
        match self {
            Expr::And(_) | Expr::Or(_) => format!("({})", self.to_cypher()),
            _ => self.to_cypher(),
        }
    }

    fn operand(&self) -> String {
        if self.is_atomic() {
            self.to_cypher()
        } else {
            format!("({})", self.to_cypher())
        }
    }
}

fn render_literal(literal: &Literal) -> String {
    match literal {
        Literal::Null => "null".to_string(),
        Literal::Boolean(b) => b.to_string(),
        Literal::Integer(i) => i.to_string(),
        Literal::String(s) => format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
    }
}

fn render_map_key(key: &str) -> String {
    escape_identifier(key)
}

fn render_subquery(keyword: &str, query: &Query) -> String {
    format!("{} {{\n{}\n}}", keyword, indent_block(&query.to_cypher()))
}

impl ToCypher for Expr {
    fn to_cypher(&self) -> String {
        match self {
            Expr::Variable(name) => escape_identifier(name),
            Expr::Parameter(name) => format!("${}", name),
            Expr::Literal(literal) => render_literal(literal),
            Expr::Property { base, key } => {
                format!("{}.{}", base.operand(), escape_identifier(key))
            }
            Expr::Compare { left, op, right } => {
                format!("{} {} {}", left.operand(), op.as_str(), right.operand())
            }
            Expr::And(items) => items
                .iter()
                .map(Expr::junction_operand)
                .collect::<Vec<_>>()
                .join(" AND "),
            Expr::Or(items) => items
                .iter()
                .map(Expr::junction_operand)
                .collect::<Vec<_>>()
                .join(" OR "),
            Expr::Not(inner) => format!("NOT {}", inner.operand()),
            Expr::IsNull(inner) => format!("{} IS NULL", inner.operand()),
            Expr::IsNotNull(inner) => format!("{} IS NOT NULL", inner.operand()),
            Expr::HasLabel { variable, label } => {
                format!("{}:{}", escape_identifier(variable), escape_identifier(label))
            }
            Expr::Function {
                name,
                distinct,
                args,
            } => {
                let args = args
                    .iter()
                    .map(ToCypher::to_cypher)
                    .collect::<Vec<_>>()
                    .join(", ");
                if *distinct {
                    format!("{}(DISTINCT {})", name, args)
                } else {
                    format!("{}({})", name, args)
                }
            }
            Expr::Add(left, right) => format!("{} + {}", left.operand(), right.operand()),
            Expr::Subtract(left, right) => format!("{} - {}", left.operand(), right.operand()),
            Expr::List(items) => format!(
                "[{}]",
                items
                    .iter()
                    .map(ToCypher::to_cypher)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Expr::Map(entries) => {
                if entries.is_empty() {
                    return "{ }".to_string();
                }
                let body = entries
                    .iter()
                    .map(|(k, v)| format!("{}: {}", render_map_key(k), v.to_cypher()))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{{ {} }}", body)
            }
            Expr::MapProjection { variable, entries } => {
                let body = entries
                    .iter()
                    .map(|(key, value)| match value {
                        Expr::Property { base, key: prop }
                            if prop == key && **base == Expr::Variable(variable.clone()) =>
                        {
                            format!(".{}", escape_identifier(key))
                        }
                        _ => format!("{}: {}", render_map_key(key), value.to_cypher()),
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                if body.is_empty() {
                    format!("{} {{ }}", escape_identifier(variable))
                } else {
                    format!("{} {{ {} }}", escape_identifier(variable), body)
                }
            }
            Expr::ListComprehension {
                variable,
                list,
                filter,
                map,
            } => {
                let mut out = format!("[{} IN {}", escape_identifier(variable), list.to_cypher());
                if let Some(filter) = filter {
                    out.push_str(&format!(" WHERE {}", filter.to_cypher()));
                }
                if let Some(map) = map {
                    out.push_str(&format!(" | {}", map.to_cypher()));
                }
                out.push(']');
                out
            }
            Expr::Index { base, index } => format!("{}[{}]", base.operand(), index),
            Expr::Slice { base, from, to } => format!(
                "{}[{}..{}]",
                base.operand(),
                from.as_ref().map(|e| e.operand()).unwrap_or_default(),
                to.as_ref().map(|e| e.operand()).unwrap_or_default()
            ),
            Expr::Exists(query) => render_subquery("EXISTS", query),
            Expr::Count(query) => render_subquery("COUNT", query),
            Expr::Case {
                branches,
                otherwise,
            } => {
                let mut out = String::from("CASE");
                for (when, then) in branches {
                    out.push_str(&format!(" WHEN {} THEN {}", when.to_cypher(), then.to_cypher()));
                }
                if let Some(otherwise) = otherwise {
                    out.push_str(&format!(" ELSE {}", otherwise.to_cypher()));
                }
                out.push_str(" END");
                out
            }
        }
    }
}
