//! Disconnect: remove edges between a source node and matching related nodes.

use serde_json::{Map, Value};

use super::{as_object, cardinality_items, relationship_pattern, Owner, TranslationError, Translator};
use crate::cypher::{Clause, Expr, NodePattern, Query};
use crate::schema_builder::RelationshipNames;
use crate::type_model::{Entity, RelationshipField};

/// Variables bound by [`Translator::match_related`].
pub(crate) struct RelatedMatch {
    pub body: Query,
    pub node_var: String,
    pub edge_var: String,
}

impl<'s> Translator<'s> {
    /// `TDisconnectInput` (or `IDisconnectInput`) applied to every row of `var`.
    pub(crate) fn disconnect_input(
        &mut self,
        query: &mut Query,
        var: &str,
        entity: Entity<'s>,
        value: &Value,
        path: &str,
    ) -> Result<(), TranslationError> {
        self.keyed_input(query, var, entity, value, path, "Disconnect", Translator::disconnect_field)
    }

    pub(crate) fn disconnect_field(
        &mut self,
        query: &mut Query,
        owner: Owner<'_>,
        field: &'s RelationshipField,
        value: &Value,
        path: &str,
    ) -> Result<(), TranslationError> {
        let (target, value, path) = self.resolve_member(field, value, path)?;
        let Some(target) = target else {
            return Ok(());
        };
        for (i, item) in cardinality_items(Some(value), field.is_list, &path)?.into_iter().enumerate() {
            let item_path = if field.is_list {
                format!("{}[{}]", path, i)
            } else {
                path.clone()
            };
            self.nested_disconnect(query, owner, field, target, item, &item_path)?;
        }
        Ok(())
    }

    /// `WITH owner` and a MATCH of the related nodes selected by a
    /// connection `where`, opening a subquery body.
    pub(crate) fn match_related(
        &mut self,
        owner: Owner<'_>,
        field: &'s RelationshipField,
        target: Entity<'s>,
        object: &Map<String, Value>,
        path: &str,
    ) -> Result<RelatedMatch, TranslationError> {
        let node_var = self.ctx.var("this");
        let edge_var = self.ctx.var("this");
        let (node_pattern, guard) = self.target_node(&node_var, target);
        let predicate = self.compile_connection_where(
            owner.var,
            owner.via,
            field,
            target,
            &node_var,
            &edge_var,
            object.get("where"),
            &format!("{}.where", path),
        )?;
        let mut body = Query::from_clauses(vec![Clause::with_variables(&[owner.var])]);
        let pattern = relationship_pattern(
            NodePattern::new(owner.var),
            field,
            Some(edge_var.as_str()),
            node_pattern,
            true,
        );
        predicate.apply(&mut body, pattern, guard);
        Ok(RelatedMatch {
            body,
            node_var,
            edge_var,
        })
    }

    /// `SFDisconnectFieldInput { where, disconnect }`. Nested disconnects run
    /// before the edge itself is removed.
    pub(crate) fn nested_disconnect(
        &mut self,
        query: &mut Query,
        owner: Owner<'_>,
        field: &'s RelationshipField,
        target: Entity<'s>,
        item: &Value,
        path: &str,
    ) -> Result<(), TranslationError> {
        let object = as_object(item, path)?;
        if let Some(key) = object.keys().find(|k| *k != "where" && *k != "disconnect") {
            return Err(TranslationError::unknown_field(
                RelationshipNames::new(owner.via, field).disconnect_field_input(),
                key.as_str(),
            ));
        }
        let RelatedMatch {
            mut body,
            node_var,
            edge_var,
        } = self.match_related(owner, field, target, object, path)?;

        if let Some(nested) = object.get("disconnect").filter(|v| !v.is_null()) {
            let nested_path = format!("{}.disconnect", path);
            for (i, item) in cardinality_items(Some(nested), true, &nested_path)?.into_iter().enumerate() {
                self.disconnect_input(&mut body, &node_var, target, item, &format!("{}[{}]", nested_path, i))?;
            }
        }
        body.push(Clause::Delete {
            detach: false,
            items: vec![Expr::var(edge_var)],
        });
        query.push(Clause::Call(body));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::schema_builder::CompiledSchema;
    use crate::translator::{translate, Operation, TranslationError};
    use serde_json::json;

    const TYPE_DEFS: &str = r#"
        type User {
            name: String!
            liked: [Post!]! @relationship(type: "LIKES", direction: OUT, properties: "Likes")
        }
        type Post {
            title: String!
            tags: [Tag!]! @relationship(type: "TAGGED", direction: OUT)
        }
        type Tag {
            label: String!
        }
        type Likes @relationshipProperties {
            score: Int
        }
    "#;

    fn disconnect(disconnect: serde_json::Value) -> Result<String, TranslationError> {
        let schema = CompiledSchema::from_sdl(TYPE_DEFS).unwrap();
        let op = Operation::mutation("updateUsers").with_args(json!({
            "where": {"name": "Ann"},
            "disconnect": disconnect,
        }));
        Ok(translate(&schema, &op)?.statements.remove(0).text)
    }

    #[test]
    fn test_disconnect_removes_matching_edges() {
        let text = disconnect(json!({"liked": [{"where": {"node": {"title": "A"}}}]})).unwrap();
        assert!(text.starts_with(
            "MATCH (this:User)\nWHERE this.name = $param0\nCALL {\n    WITH this\n    MATCH (this)-[this1:LIKES]->(this0:Post)\n    WHERE this0.title = $param1\n    DELETE this1\n}"
        ));
    }

    #[test]
    fn test_nested_disconnect_runs_before_outer_edge() {
        let text = disconnect(json!({"liked": [{
            "where": {"node": {"title": "A"}},
            "disconnect": {"tags": [{"where": {"node": {"label": "old"}}}]},
        }]}))
        .unwrap();
        assert!(text.contains(
            "    CALL {\n        WITH this0\n        MATCH (this0)-[this3:TAGGED]->(this2:Tag)\n        WHERE this2.label = $param2\n        DELETE this3\n    }\n    DELETE this1\n}"
        ));
    }

    #[test]
    fn test_unknown_disconnect_key() {
        let err = disconnect(json!({"liked": [{"where": {}, "edge": {"score": 1}}]})).unwrap_err();
        assert!(matches!(err, TranslationError::UnknownField { ref field, .. } if field == "edge"));
    }
}
