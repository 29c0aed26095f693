use super::{escape_identifier, expr::Expr, indent_block, ToCypher};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternDirection {
    /// `(a)-[r]->(b)`
    Right,
    /// `(a)<-[r]-(b)`
    Left,
    /// `(a)-[r]-(b)`
    Undirected,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodePattern {
    pub variable: Option<String>,
    pub labels: Vec<String>,
}

impl NodePattern {
    pub fn new(variable: impl Into<String>) -> Self {
        NodePattern {
            variable: Some(variable.into()),
            labels: vec![],
        }
    }

    pub fn labelled(variable: impl Into<String>, label: impl Into<String>) -> Self {
        NodePattern {
            variable: Some(variable.into()),
            labels: vec![label.into()],
        }
    }

    pub fn anonymous(label: Option<&str>) -> Self {
        NodePattern {
            variable: None,
            labels: label.into_iter().map(str::to_string).collect(),
        }
    }
}

impl ToCypher for NodePattern {
    fn to_cypher(&self) -> String {
        let mut out = String::from("(");
        if let Some(variable) = &self.variable {
            out.push_str(&escape_identifier(variable));
        }
        for label in &self.labels {
            out.push(':');
            out.push_str(&escape_identifier(label));
        }
        out.push(')');
        out
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelPattern {
    pub variable: Option<String>,
    pub rel_type: String,
    pub direction: PatternDirection,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    pub start: NodePattern,
    pub hops: Vec<(RelPattern, NodePattern)>,
}

impl Pattern {
    pub fn node(start: NodePattern) -> Self {
        Pattern {
            start,
            hops: vec![],
        }
    }

    pub fn relationship(start: NodePattern, rel: RelPattern, end: NodePattern) -> Self {
        Pattern {
            start,
            hops: vec![(rel, end)],
        }
    }
}

impl ToCypher for Pattern {
    fn to_cypher(&self) -> String {
        let mut out = self.start.to_cypher();
        for (rel, node) in &self.hops {
            let mut inner = String::new();
            if let Some(variable) = &rel.variable {
                inner.push_str(&escape_identifier(variable));
            }
            inner.push(':');
            inner.push_str(&escape_identifier(&rel.rel_type));
            match rel.direction {
                PatternDirection::Right => out.push_str(&format!("-[{}]->", inner)),
                PatternDirection::Left => out.push_str(&format!("<-[{}]-", inner)),
                PatternDirection::Undirected => out.push_str(&format!("-[{}]-", inner)),
            }
            out.push_str(&node.to_cypher());
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionItem {
    pub expr: Expr,
    pub alias: Option<String>,
}

impl ProjectionItem {
    pub fn aliased(expr: Expr, alias: impl Into<String>) -> Self {
        ProjectionItem {
            expr,
            alias: Some(alias.into()),
        }
    }

    pub fn bare(expr: Expr) -> Self {
        ProjectionItem { expr, alias: None }
    }
}

/// Body shared by `WITH` and `RETURN`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Projection {
    pub distinct: bool,
    /// Empty means `*`
    pub items: Vec<ProjectionItem>,
    pub order_by: Vec<(Expr, SortOrder)>,
    pub skip: Option<Expr>,
    pub limit: Option<Expr>,
}

impl Projection {
    pub fn star() -> Self {
        Projection::default()
    }

    pub fn items(items: Vec<ProjectionItem>) -> Self {
        Projection {
            items,
            ..Projection::default()
        }
    }

    /// `WITH a, b` style pass-through of variables.
    pub fn variables<S: AsRef<str>>(names: &[S]) -> Self {
        Projection::items(
            names
                .iter()
                .map(|n| ProjectionItem::bare(Expr::var(n.as_ref())))
                .collect(),
        )
    }

    fn render(&self, keyword: &str) -> String {
        let mut out = String::from(keyword);
        if self.distinct {
            out.push_str(" DISTINCT");
        }
        if self.items.is_empty() {
            out.push_str(" *");
        } else {
            let items = self
                .items
                .iter()
                .map(|item| match &item.alias {
                    Some(alias) if Expr::var(alias.as_str()) != item.expr => {
                        format!("{} AS {}", item.expr.to_cypher(), escape_identifier(alias))
                    }
                    _ => item.expr.to_cypher(),
                })
                .collect::<Vec<_>>()
                .join(", ");
            out.push(' ');
            out.push_str(&items);
        }
        if !self.order_by.is_empty() {
            let order = self
                .order_by
                .iter()
                .map(|(expr, order)| match order {
                    SortOrder::Asc => format!("{} ASC", expr.to_cypher()),
                    SortOrder::Desc => format!("{} DESC", expr.to_cypher()),
                })
                .collect::<Vec<_>>()
                .join(", ");
            out.push_str(&format!("\nORDER BY {}", order));
        }
        if let Some(skip) = &self.skip {
            out.push_str(&format!("\nSKIP {}", skip.to_cypher()));
        }
        if let Some(limit) = &self.limit {
            out.push_str(&format!("\nLIMIT {}", limit.to_cypher()));
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetItem {
    pub target: Expr,
    pub value: Expr,
}

impl SetItem {
    pub fn new(target: Expr, value: Expr) -> Self {
        SetItem { target, value }
    }
}

fn render_set_items(items: &[SetItem]) -> String {
    items
        .iter()
        .map(|item| format!("{} = {}", item.target.to_cypher(), item.value.to_cypher()))
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    Match {
        optional: bool,
        pattern: Pattern,
        filter: Option<Expr>,
    },
    With {
        projection: Projection,
        filter: Option<Expr>,
    },
    Unwind {
        list: Expr,
        alias: String,
    },
    /// `CALL { ... }`; the body imports outer variables with a leading `WITH`
    Call(Query),
    /// `CALL apoc.util.validate(...)`
    Procedure {
        name: String,
        args: Vec<Expr>,
    },
    Create(Pattern),
    Merge {
        pattern: Pattern,
        on_create: Vec<SetItem>,
    },
    Set(Vec<SetItem>),
    Delete {
        detach: bool,
        items: Vec<Expr>,
    },
    Return(Projection),
    Union,
}

impl Clause {
    pub fn matching(pattern: Pattern, filter: Option<Expr>) -> Self {
        Clause::Match {
            optional: false,
            pattern,
            filter,
        }
    }

    pub fn with_star() -> Self {
        Clause::With {
            projection: Projection::star(),
            filter: None,
        }
    }

    pub fn with_variables<S: AsRef<str>>(names: &[S]) -> Self {
        Clause::With {
            projection: Projection::variables(names),
            filter: None,
        }
    }

    pub fn returning(items: Vec<ProjectionItem>) -> Self {
        Clause::Return(Projection::items(items))
    }

    /// Clauses that write to the graph; reading after them needs a `WITH`.
    pub fn is_update(&self) -> bool {
        matches!(
            self,
            Clause::Create(_) | Clause::Merge { .. } | Clause::Set(_) | Clause::Delete { .. }
        )
    }
}

impl ToCypher for Clause {
    fn to_cypher(&self) -> String {
        match self {
            Clause::Match {
                optional,
                pattern,
                filter,
            } => {
                let keyword = if *optional { "OPTIONAL MATCH" } else { "MATCH" };
                let mut out = format!("{} {}", keyword, pattern.to_cypher());
                if let Some(filter) = filter {
                    out.push_str(&format!("\nWHERE {}", filter.to_cypher()));
                }
                out
            }
            Clause::With { projection, filter } => {
                let mut out = projection.render("WITH");
                if let Some(filter) = filter {
                    out.push_str(&format!("\nWHERE {}", filter.to_cypher()));
                }
                out
            }
            Clause::Unwind { list, alias } => {
                format!("UNWIND {} AS {}", list.to_cypher(), escape_identifier(alias))
            }
            Clause::Call(body) => format!("CALL {{\n{}\n}}", indent_block(&body.to_cypher())),
            Clause::Procedure { name, args } => format!(
                "CALL {}({})",
                name,
                args.iter()
                    .map(ToCypher::to_cypher)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Clause::Create(pattern) => format!("CREATE {}", pattern.to_cypher()),
            Clause::Merge { pattern, on_create } => {
                let mut out = format!("MERGE {}", pattern.to_cypher());
                if !on_create.is_empty() {
                    out.push_str(&format!("\nON CREATE SET {}", render_set_items(on_create)));
                }
                out
            }
            Clause::Set(items) => format!("SET {}", render_set_items(items)),
            Clause::Delete { detach, items } => {
                let items = items
                    .iter()
                    .map(ToCypher::to_cypher)
                    .collect::<Vec<_>>()
                    .join(", ");
                if *detach {
                    format!("DETACH DELETE {}", items)
                } else {
                    format!("DELETE {}", items)
                }
            }
            Clause::Return(projection) => projection.render("RETURN"),
            Clause::Union => "UNION".to_string(),
        }
    }
}

/// Ordered list of clauses; also the body of `CALL`, `EXISTS` and `COUNT` blocks.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Query {
    pub clauses: Vec<Clause>,
}

impl Query {
    pub fn new() -> Self {
        Query::default()
    }

    pub fn from_clauses(clauses: Vec<Clause>) -> Self {
        Query { clauses }
    }

    /// Append, inserting `WITH *` where a read or subquery follows a write.
    pub fn push(&mut self, clause: Clause) {
        let needs_with = self.clauses.last().is_some_and(Clause::is_update)
            && matches!(
                clause,
                Clause::Match { .. } | Clause::Call(_) | Clause::Unwind { .. } | Clause::Procedure { .. }
            );
        if needs_with {
            self.clauses.push(Clause::with_star());
        }
        self.clauses.push(clause);
    }

    pub fn extend(&mut self, clauses: impl IntoIterator<Item = Clause>) {
        for clause in clauses {
            self.push(clause);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Whether the query ends without a `RETURN`, making it a unit subquery.
    pub fn is_unit(&self) -> bool {
        !matches!(self.clauses.last(), Some(Clause::Return(_)))
    }
}

impl ToCypher for Query {
    fn to_cypher(&self) -> String {
        self.clauses
            .iter()
            .map(ToCypher::to_cypher)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
