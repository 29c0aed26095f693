//! Delete: root `deleteTs` and nested `delete` inputs.
//!
//! Related nodes named by nested inputs are removed before the node they
//! hang off, so a cascade reads top-down in the input but runs bottom-up.

use serde_json::Value;

use super::disconnect::RelatedMatch;
use super::{as_object, cardinality_items, Operation, Owner, TranslationError, Translator};
use crate::cypher::{Clause, Expr, NodePattern, Pattern, Query};
use crate::schema_builder::RelationshipNames;
use crate::type_model::{Entity, NodeType, RelationshipField};

impl<'s> Translator<'s> {
    pub(crate) fn translate_delete(
        &mut self,
        node: &'s NodeType,
        operation: &Operation,
    ) -> Result<Query, TranslationError> {
        let args = &operation.args;
        let path = operation.root_field.as_str();
        let entity = Entity::Node(node);

        let mut query = Query::new();
        self.compile_where("this", entity, args.get("where"), &format!("{}.where", path))?
            .apply(&mut query, Pattern::node(NodePattern::labelled("this", node.name.as_str())), None);
        if let Some(delete) = args.get("delete").filter(|v| !v.is_null()) {
            self.delete_input(&mut query, "this", entity, delete, &format!("{}.delete", path))?;
        }
        query.push(Clause::Delete {
            detach: true,
            items: vec![Expr::var("this")],
        });
        Ok(query)
    }

    /// `TDeleteInput` (or `IDeleteInput`) applied to every row of `var`.
    pub(crate) fn delete_input(
        &mut self,
        query: &mut Query,
        var: &str,
        entity: Entity<'s>,
        value: &Value,
        path: &str,
    ) -> Result<(), TranslationError> {
        self.keyed_input(query, var, entity, value, path, "Delete", Translator::delete_field)
    }

    pub(crate) fn delete_field(
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
            self.nested_delete(query, owner, field, target, item, &item_path)?;
        }
        Ok(())
    }

    /// `SFDeleteFieldInput { where, delete }`: detach-delete every related
    /// node matching the connection `where`.
    pub(crate) fn nested_delete(
        &mut self,
        query: &mut Query,
        owner: Owner<'_>,
        field: &'s RelationshipField,
        target: Entity<'s>,
        item: &Value,
        path: &str,
    ) -> Result<(), TranslationError> {
        let object = as_object(item, path)?;
        if let Some(key) = object.keys().find(|k| *k != "where" && *k != "delete") {
            return Err(TranslationError::unknown_field(
                RelationshipNames::new(owner.via, field).delete_field_input(),
                key.as_str(),
            ));
        }
        let RelatedMatch { mut body, node_var, .. } = self.match_related(owner, field, target, object, path)?;

        if let Some(nested) = object.get("delete").filter(|v| !v.is_null()) {
            let nested_path = format!("{}.delete", path);
            for (i, item) in cardinality_items(Some(nested), true, &nested_path)?.into_iter().enumerate() {
                self.delete_input(&mut body, &node_var, target, item, &format!("{}[{}]", nested_path, i))?;
            }
        }
        body.push(Clause::Delete {
            detach: true,
            items: vec![Expr::var(node_var)],
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
            posts: [Post!]! @relationship(type: "WROTE", direction: OUT)
        }
        type Post {
            title: String!
            comments: [Comment!]! @relationship(type: "HAS_COMMENT", direction: OUT)
        }
        type Comment {
            text: String!
        }
    "#;

    fn schema() -> CompiledSchema {
        CompiledSchema::from_sdl(TYPE_DEFS).unwrap()
    }

    #[test]
    fn test_root_delete() {
        let op = Operation::mutation("deleteUsers").with_args(json!({"where": {"name": "Ann"}}));
        let translated = translate(&schema(), &op).unwrap();
        assert_eq!(
            translated.statements[0].text,
            "MATCH (this:User)\nWHERE this.name = $param0\nDETACH DELETE this"
        );
        assert_eq!(translated.response.data_field, None);
    }

    #[test]
    fn test_delete_cascades_bottom_up() {
        let op = Operation::mutation("deleteUsers").with_args(json!({
            "where": {"name": "Ann"},
            "delete": {"posts": [{
                "where": {"node": {"title": "A"}},
                "delete": {"comments": [{}]},
            }]},
        }));
        let text = translate(&schema(), &op).unwrap().statements.remove(0).text;
        assert_eq!(
            text,
            "MATCH (this:User)\nWHERE this.name = $param0\nCALL {\n    WITH this\n    MATCH (this)-[this1:WROTE]->(this0:Post)\n    WHERE this0.title = $param1\n    CALL {\n        WITH this0\n        MATCH (this0)-[this3:HAS_COMMENT]->(this2:Comment)\n        DETACH DELETE this2\n    }\n    DETACH DELETE this0\n}\nDETACH DELETE this"
        );
    }

    #[test]
    fn test_delete_rejects_unknown_relationship() {
        let op = Operation::mutation("deleteUsers").with_args(json!({"delete": {"friends": []}}));
        let err = translate(&schema(), &op).unwrap_err();
        assert!(matches!(err, TranslationError::UnknownField { ref type_name, .. } if type_name == "UserDeleteInput"));
    }
}
