//! Root query fields: `ts`, `tsAggregate` and `tsConnection`.

use super::{Operation, SelectedField, TranslationError, Translator};
use crate::cypher::{Clause, Expr, NodePattern, Pattern, ProjectionItem, Query};
use crate::type_model::{Entity, ScalarField};

/// Every root query binds its result to this column.
pub(crate) const ROOT_VAR: &str = "this";

fn root_field(operation: &Operation) -> SelectedField {
    SelectedField {
        name: operation.root_field.clone(),
        alias: None,
        args: operation.args.clone(),
        selection: operation.selection.clone(),
        on: None,
    }
}

impl<'s> Translator<'s> {
    /// One row per matched node, each the projected map.
    ///
    /// Interface and union roots run one `UNION` branch per concrete type and
    /// apply options to the combined rows.
    pub(crate) fn translate_read(
        &mut self,
        entity: Entity<'s>,
        operation: &Operation,
    ) -> Result<Query, TranslationError> {
        let path = operation.root_field.as_str();
        let options = self.parse_options(
            entity,
            operation.args.get("options"),
            &format!("{}.options", path),
        )?;
        let where_value = operation.args.get("where");
        let where_path = format!("{}.where", path);
        let mut query = Query::new();

        if let Entity::Node(node) = entity {
            self.compile_where(ROOT_VAR, entity, where_value, &where_path)?.apply(
                &mut query,
                Pattern::node(NodePattern::labelled(ROOT_VAR, node.name.as_str())),
                None,
            );
            if !options.is_empty() {
                query.push(options.clause(vec![], |f| Expr::property(ROOT_VAR, f.db_property.as_str())));
            }
            let (calls, projection) =
                self.project_node(ROOT_VAR, node, &operation.selection, false, &[])?;
            query.extend(calls);
            query.push(Clause::returning(vec![ProjectionItem::aliased(projection, ROOT_VAR)]));
            return Ok(query);
        }

        let hidden: Vec<&ScalarField> = options.sort.iter().map(|(f, _)| *f).collect();
        let mut branches = Query::new();
        let model = self.model;
        for node in model.concrete_types(entity) {
            if !branches.is_empty() {
                branches.push(Clause::Union);
            }
            let var = self.ctx.var("this");
            self.compile_where(&var, entity, where_value, &where_path)?.apply(
                &mut branches,
                Pattern::node(NodePattern::labelled(var.as_str(), node.name.as_str())),
                None,
            );
            let (calls, projection) = self.project_node(&var, node, &operation.selection, true, &hidden)?;
            branches.extend(calls);
            branches.push(Clause::returning(vec![ProjectionItem::aliased(projection, ROOT_VAR)]));
        }
        if branches.is_empty() {
            query.push(Clause::Unwind {
                list: Expr::List(vec![]),
                alias: ROOT_VAR.to_string(),
            });
        } else {
            query.push(Clause::Call(branches));
        }
        if !options.is_empty() {
            query.push(options.clause(vec![ProjectionItem::bare(Expr::var(ROOT_VAR))], |f| {
                Expr::property(ROOT_VAR, f.name.as_str())
            }));
        }
        query.push(Clause::returning(vec![ProjectionItem::bare(Expr::var(ROOT_VAR))]));
        Ok(query)
    }

    /// A single row holding the aggregate map.
    pub(crate) fn translate_aggregate(
        &mut self,
        entity: Entity<'s>,
        operation: &Operation,
    ) -> Result<Query, TranslationError> {
        let field = root_field(operation);
        let (clauses, value) = self.aggregate_clauses(entity, None, &field, &operation.root_field)?;
        let mut query = Query::from_clauses(clauses);
        query.push(Clause::returning(vec![ProjectionItem::aliased(value, ROOT_VAR)]));
        Ok(query)
    }

    /// A single row holding `{ edges, totalCount }`.
    pub(crate) fn translate_connection(
        &mut self,
        entity: Entity<'s>,
        operation: &Operation,
    ) -> Result<Query, TranslationError> {
        let field = root_field(operation);
        let (clauses, value) = self.connection_clauses(entity, None, &field, &operation.root_field)?;
        let mut query = Query::from_clauses(clauses);
        query.push(Clause::returning(vec![ProjectionItem::aliased(value, ROOT_VAR)]));
        Ok(query)
    }
}

#[cfg(test)]
mod tests {
    use crate::schema_builder::CompiledSchema;
    use crate::translator::{translate, Operation, SelectedField};
    use serde_json::json;

    const TYPE_DEFS: &str = r#"
        interface Production {
            title: String!
        }
        type Movie implements Production {
            title: String!
            runtime: Int
        }
        type Series implements Production {
            title: String!
            episodes: Int
        }
    "#;

    fn schema() -> CompiledSchema {
        CompiledSchema::from_sdl(TYPE_DEFS).unwrap()
    }

    #[test]
    fn test_node_root_read() {
        let op = Operation::query("movies")
            .with_args(json!({"where": {"runtime_GT": 90}, "options": {"sort": [{"title": "ASC"}], "limit": 10}}))
            .with_selection(vec![SelectedField::new("title")]);
        let translated = translate(&schema(), &op).unwrap();
        let statement = &translated.statements[0];
        assert_eq!(
            statement.text,
            "MATCH (this:Movie)\nWHERE this.runtime > $param1\nWITH *\nORDER BY this.title ASC\nLIMIT $param0\nRETURN this { .title } AS this"
        );
        assert_eq!(statement.params["param0"], json!(10));
        assert_eq!(statement.params["param1"], json!(90));
    }

    #[test]
    fn test_interface_root_read_unions_implementers() {
        let op = Operation::query("productions")
            .with_args(json!({"where": {"title_CONTAINS": "a"}, "options": {"sort": [{"title": "DESC"}]}}))
            .with_selection(vec![
                SelectedField::new("title"),
                SelectedField::new("runtime").on_type("Movie"),
            ]);
        let text = translate(&schema(), &op).unwrap().statements[0].text.clone();
        assert!(text.starts_with("CALL {\n    MATCH (this0:Movie)\n    WHERE this0.title CONTAINS $param0"));
        assert!(text.contains("RETURN this0 { .title, .runtime, __typename: \"Movie\" } AS this\n    UNION\n    MATCH (this1:Series)"));
        assert!(text.contains("RETURN this1 { .title, __typename: \"Series\" } AS this"));
        assert!(text.ends_with("}\nWITH this\nORDER BY this.title DESC\nRETURN this"));
    }

    #[test]
    fn test_root_aggregate() {
        let op = Operation::query("moviesAggregate").with_selection(vec![
            SelectedField::new("count"),
            SelectedField::new("runtime").with_selection(vec![SelectedField::new("max")]),
        ]);
        let text = translate(&schema(), &op).unwrap().statements[0].text.clone();
        assert!(text.contains("RETURN count(this0) AS var1"));
        assert!(text.contains(
            "RETURN { min: min(this2.runtime), max: max(this2.runtime), average: avg(this2.runtime), sum: sum(this2.runtime) } AS var3"
        ));
        assert!(text.ends_with("RETURN { count: var1, runtime: var3 } AS this"));

        let op = Operation::query("moviesAggregate")
            .with_args(json!({"where": {"title": "Up"}}))
            .with_selection(vec![SelectedField::new("count")]);
        let text = translate(&schema(), &op).unwrap().statements[0].text.clone();
        assert_eq!(
            text,
            "CALL {\n    MATCH (this0:Movie)\n    WHERE this0.title = $param0\n    RETURN count(this0) AS var1\n}\nRETURN { count: var1 } AS this"
        );
    }

    #[test]
    fn test_root_connection_slices_after_cursor() {
        let op = Operation::query("moviesConnection")
            .with_args(json!({"first": 5, "after": "YXJyYXljb25uZWN0aW9uOjQ="}))
            .with_selection(vec![
                SelectedField::new("totalCount"),
                SelectedField::new("edges")
                    .with_selection(vec![SelectedField::new("node").with_selection(vec![SelectedField::new("title")])]),
            ]);
        let translated = translate(&schema(), &op).unwrap();
        let statement = &translated.statements[0];
        assert!(statement.text.contains("RETURN { node: this1 { .title } } AS edge0"));
        assert!(statement.text.ends_with("RETURN { edges: edges2[$param0..$param1], totalCount: totalCount3 } AS this"));
        assert_eq!(statement.params["param0"], json!(5));
        assert_eq!(statement.params["param1"], json!(10));
    }

    #[test]
    fn test_invalid_cursor_is_rejected() {
        let op = Operation::query("moviesConnection")
            .with_args(json!({"after": "not-a-cursor"}))
            .with_selection(vec![SelectedField::new("totalCount")]);
        assert!(translate(&schema(), &op).is_err());
    }
}
