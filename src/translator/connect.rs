//! Connect: attach existing nodes to a source node.

use serde_json::Value;

use super::{
    as_object, cardinality_items, relationship_pattern, single_member, union_member, Owner,
    TranslationError, Translator,
};
use crate::cypher::{Clause, CompareOp, Expr, NodePattern, Pattern, Query};
use crate::schema_builder::{EntityNames, RelationshipNames};
use crate::type_model::{Entity, RelationshipField, TargetKind};

impl<'s> Translator<'s> {
    /// `TConnectInput` (or `IConnectInput`) applied to every row of `var`.
    pub(crate) fn connect_input(
        &mut self,
        query: &mut Query,
        var: &str,
        entity: Entity<'s>,
        value: &Value,
        path: &str,
    ) -> Result<(), TranslationError> {
        self.keyed_input(query, var, entity, value, path, "Connect", Translator::connect_field)
    }

    /// One relationship key of a connect input: `SFConnectFieldInput` by
    /// cardinality, or the member-keyed wrapper for unions.
    pub(crate) fn connect_field(
        &mut self,
        query: &mut Query,
        owner: Owner<'_>,
        field: &'s RelationshipField,
        value: &Value,
        path: &str,
    ) -> Result<(), TranslationError> {
        let (target, value, path) = if field.target_kind == TargetKind::Union {
            let keyed = as_object(value, path)?;
            let Some((member, member_value)) = single_member(keyed, path)? else {
                return Ok(());
            };
            let node = union_member(self, field, member)?;
            (Entity::Node(node), member_value, format!("{}.{}", path, member))
        } else {
            (self.entity(&field.target)?, value, path.to_string())
        };
        for (i, item) in cardinality_items(Some(value), field.is_list, &path)?.into_iter().enumerate() {
            let item_path = if field.is_list {
                format!("{}[{}]", path, i)
            } else {
                path.clone()
            };
            self.nested_connect(query, owner, field, target, item, &item_path)?;
        }
        Ok(())
    }

    /// `SFConnectFieldInput { where, connect, edge, overwrite }`.
    ///
    /// A singular field either replaces its current edge (`overwrite: true`)
    /// or fails the statement when a different node is already connected.
    pub(crate) fn nested_connect(
        &mut self,
        query: &mut Query,
        owner: Owner<'_>,
        field: &'s RelationshipField,
        target: Entity<'s>,
        item: &Value,
        path: &str,
    ) -> Result<(), TranslationError> {
        let object = as_object(item, path)?;
        let names = RelationshipNames::new(owner.via, field);
        if let Some(key) = object
            .keys()
            .find(|k| !["where", "connect", "edge", "overwrite"].contains(&k.as_str()))
        {
            return Err(TranslationError::unknown_field(names.connect_field_input(), key.as_str()));
        }
        let overwrite = match object.get("overwrite") {
            None | Some(Value::Null) => true,
            Some(Value::Bool(overwrite)) => *overwrite,
            Some(_) => {
                return Err(TranslationError::validation_with_context(
                    format!("{}.overwrite", path),
                    "expected a Boolean",
                ))
            }
        };

        let where_path = format!("{}.where", path);
        let node_where = match object.get("where").filter(|v| !v.is_null()) {
            Some(value) => {
                let connect_where = as_object(value, &where_path)?;
                if let Some(key) = connect_where.keys().find(|k| *k != "node") {
                    return Err(TranslationError::unknown_field(
                        EntityNames::new(target.name()).connect_where(),
                        key.as_str(),
                    ));
                }
                connect_where.get("node")
            }
            None => None,
        };

        let node_var = self.ctx.var("this");
        let (node_pattern, guard) = self.target_node(&node_var, target);
        let predicate = self.compile_where(&node_var, target, node_where, &format!("{}.node", where_path))?;
        let mut body = Query::from_clauses(vec![Clause::with_variables(&[owner.var])]);
        predicate.apply(&mut body, Pattern::node(node_pattern), guard);
        let edge_var = self.ctx.var("this");

        if !field.is_list {
            let other = self.ctx.var("this");
            let existing = relationship_pattern(
                NodePattern::new(owner.var),
                field,
                None,
                NodePattern::new(other.as_str()),
                true,
            );
            let different = Expr::compare(
                Expr::var(other.as_str()),
                CompareOp::Neq,
                Expr::var(node_var.as_str()),
            );
            if overwrite {
                let old_edge = self.ctx.var("this");
                let mut detach = Query::from_clauses(vec![Clause::with_variables(&[owner.var, node_var.as_str()])]);
                detach.push(Clause::matching(
                    relationship_pattern(
                        NodePattern::new(owner.var),
                        field,
                        Some(old_edge.as_str()),
                        NodePattern::new(other.as_str()),
                        true,
                    ),
                    Some(different),
                ));
                detach.push(Clause::Delete {
                    detach: false,
                    items: vec![Expr::var(old_edge)],
                });
                body.push(Clause::Call(detach));
            } else {
                let conflict = Expr::exists(Query::from_clauses(vec![Clause::matching(existing, Some(different))]));
                body.push(Clause::Procedure {
                    name: "apoc.util.validate".to_string(),
                    args: vec![
                        conflict,
                        Expr::string(format!(
                            "CARDINALITY_VIOLATION: {}.{} is already connected to another node",
                            owner.node.name, field.name
                        )),
                        Expr::List(vec![Expr::integer(0)]),
                    ],
                });
            }
        }

        let merge = relationship_pattern(
            NodePattern::new(owner.var),
            field,
            Some(edge_var.as_str()),
            NodePattern::new(node_var.as_str()),
            true,
        );
        let edge = self.edge_create_items(&edge_var, owner, field, object.get("edge"), &format!("{}.edge", path))?;
        if field.is_list && !overwrite {
            // an existing edge keeps its properties
            body.push(Clause::Merge {
                pattern: merge,
                on_create: edge,
            });
        } else {
            body.push(Clause::Merge {
                pattern: merge,
                on_create: vec![],
            });
            if !edge.is_empty() {
                body.push(Clause::Set(edge));
            }
        }

        if let Some(nested) = object.get("connect").filter(|v| !v.is_null()) {
            let connect_path = format!("{}.connect", path);
            for (i, item) in cardinality_items(Some(nested), true, &connect_path)?.into_iter().enumerate() {
                self.connect_input(&mut body, &node_var, target, item, &format!("{}[{}]", connect_path, i))?;
            }
        }
        query.push(Clause::Call(body));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::schema_builder::CompiledSchema;
    use crate::translator::{translate, Operation};
    use serde_json::json;

    const TYPE_DEFS: &str = r#"
        type User {
            name: String!
            favourite: Post @relationship(type: "FAVOURITE", direction: OUT)
            liked: [Post!]! @relationship(type: "LIKES", direction: OUT, properties: "Likes")
        }
        type Post {
            title: String!
        }
        type Likes @relationshipProperties {
            score: Int
        }
    "#;

    fn connect(connect: serde_json::Value) -> String {
        let schema = CompiledSchema::from_sdl(TYPE_DEFS).unwrap();
        let op = Operation::mutation("updateUsers").with_args(json!({
            "where": {"name": "Ann"},
            "connect": connect,
        }));
        translate(&schema, &op).unwrap().statements.remove(0).text
    }

    #[test]
    fn test_singular_connect_overwrites_by_default() {
        let text = connect(json!({"favourite": {"where": {"node": {"title": "A"}}}}));
        assert!(text.contains(
            "CALL {\n    WITH this\n    MATCH (this0:Post)\n    WHERE this0.title = $param1\n    CALL {\n        WITH this, this0\n        MATCH (this)-[this3:FAVOURITE]->(this2)\n        WHERE this2 <> this0\n        DELETE this3\n    }\n    MERGE (this)-[this1:FAVOURITE]->(this0)\n}"
        ));
    }

    #[test]
    fn test_singular_connect_without_overwrite_validates() {
        let text = connect(json!({"favourite": {"where": {"node": {"title": "A"}}, "overwrite": false}}));
        assert!(text.contains("CALL apoc.util.validate(EXISTS {\n        MATCH (this)-[:FAVOURITE]->(this2)\n        WHERE this2 <> this0\n    }, \"CARDINALITY_VIOLATION: User.favourite is already connected to another node\", [0])"));
        assert!(!text.contains("DELETE this"));
    }

    #[test]
    fn test_list_connect_keeps_existing_edge_properties() {
        let text = connect(json!({"liked": [{"where": {"node": {"title": "A"}}, "edge": {"score": 3}, "overwrite": false}]}));
        assert!(text.contains("MERGE (this)-[this1:LIKES]->(this0)\n    ON CREATE SET this1.score = $param2"));

        let text = connect(json!({"liked": [{"where": {"node": {"title": "A"}}, "edge": {"score": 3}}]}));
        assert!(text.contains("MERGE (this)-[this1:LIKES]->(this0)\n    SET this1.score = $param2"));
    }
}
