//! Create: root `createTs` and nested `create` inputs.
//!
//! Each created node gets its own `CALL` so variables never leak between
//! inputs. Singular relationships are checked once the node and all of its
//! edges exist.

use serde_json::{Map, Value};

use super::{
    as_array, as_object, cardinality_items, relationship_pattern, single_member, union_member,
    Operation, Owner, Phase, TranslationError, Translator,
};
use crate::cypher::{
    Clause, CompareOp, Expr, NodePattern, Pattern, ProjectionItem, Query, SetItem,
};
use crate::schema_builder::{EntityNames, RelationshipNames};
use crate::type_model::{
    EdgeProperties, Entity, NodeType, RelationshipField, ScalarField, TargetKind,
};

/// Selection of the nodes field (`movies { ... }`) inside a mutation response.
pub(crate) fn data_selection(operation: &Operation, data_field: &str) -> Vec<super::SelectedField> {
    operation
        .selection
        .iter()
        .filter(|f| f.name == data_field)
        .flat_map(|f| f.selection.iter().cloned())
        .collect()
}

impl<'s> Translator<'s> {
    pub(crate) fn translate_create(
        &mut self,
        node: &'s NodeType,
        operation: &Operation,
    ) -> Result<Query, TranslationError> {
        let path = format!("{}.input", operation.root_field);
        let inputs = as_array(operation.args.get("input").unwrap_or(&Value::Null), &path)?;
        let mut query = Query::new();
        let mut created = Vec::new();

        for (i, input) in inputs.iter().enumerate() {
            let var = self.ctx.var("this");
            let mut body = Query::new();
            let checks = self.create_node(&mut body, &var, node, input, &format!("{}[{}]", path, i))?;
            body.extend(checks);
            body.push(Clause::returning(vec![ProjectionItem::bare(Expr::var(var.as_str()))]));
            query.push(Clause::Call(body));
            created.push(Expr::var(var));
        }

        query.push(Clause::Unwind {
            list: Expr::List(created),
            alias: "this".to_string(),
        });
        let selection = data_selection(operation, &EntityNames::new(&node.name).plural);
        let (calls, projection) = self.project_node("this", node, &selection, false, &[])?;
        query.extend(calls);
        query.push(Clause::returning(vec![ProjectionItem::aliased(
            Expr::function("collect", vec![projection]),
            "data",
        )]));
        Ok(query)
    }

    /// `CREATE (var:T) SET ...` plus nested relationship inputs.
    ///
    /// Returns the cardinality checks for `var`; callers push them once any
    /// edge to `var` has been created.
    pub(crate) fn create_node(
        &mut self,
        query: &mut Query,
        var: &str,
        node: &'s NodeType,
        input: &Value,
        path: &str,
    ) -> Result<Vec<Clause>, TranslationError> {
        let object = as_object(input, path)?;
        let create_input = EntityNames::new(&node.name).create_input();
        for key in object.keys() {
            let scalar = node.fields.iter().any(|f| f.name == *key && !f.autogenerate);
            if !scalar && node.relationship(key).is_none() {
                return Err(TranslationError::unknown_field(&create_input, key.as_str()));
            }
        }

        let set = self.create_set_items(var, &node.fields, Some(object), path)?;
        query.push(Clause::Create(Pattern::node(NodePattern::labelled(var, node.name.as_str()))));
        if !set.is_empty() {
            query.push(Clause::Set(set));
        }

        let owner = Owner::node(var, node);
        let given: Vec<_> = node
            .relationships
            .iter()
            .filter_map(|r| object.get(&r.name).filter(|v| !v.is_null()).map(|v| (r, v)))
            .collect();
        // all creates at this depth precede all connects
        for phase in [Phase::Create, Phase::Connect] {
            for &(relationship, value) in &given {
                let field_path = format!("{}.{}", path, relationship.name);
                self.field_input(query, owner, relationship, value, &field_path, phase)?;
            }
        }

        let mut checks = Vec::new();
        for relationship in node.relationships.iter().filter(|r| !r.is_list) {
            checks.push(self.cardinality_check(var, node, relationship));
        }
        Ok(checks)
    }

    /// SET items for a created node or edge: given values, `@id` and `@default`.
    pub(crate) fn create_set_items(
        &mut self,
        var: &str,
        fields: &[ScalarField],
        object: Option<&Map<String, Value>>,
        path: &str,
    ) -> Result<Vec<SetItem>, TranslationError> {
        let mut set = Vec::new();
        for field in fields {
            let target = Expr::property(var, field.db_property.as_str());
            if field.autogenerate {
                set.push(SetItem::new(target, Expr::function("randomUUID", vec![])));
                continue;
            }
            let field_path = format!("{}.{}", path, field.name);
            let given = object
                .and_then(|o| o.get(&field.name))
                .filter(|v| !v.is_null());
            let value = match (given, &field.default_value) {
                (Some(value), _) | (None, Some(value)) => value,
                (None, None) if field.required => {
                    return Err(TranslationError::validation_with_context(
                        field_path,
                        "required field is missing",
                    ))
                }
                (None, None) => continue,
            };
            let bound = self.bind_scalar(&field.kind, value, field.is_list, &field_path)?;
            set.push(SetItem::new(target, bound));
        }
        Ok(set)
    }

    /// SET items for a new edge created through `owner.field`.
    pub(crate) fn edge_create_items(
        &mut self,
        edge_var: &str,
        owner: Owner<'_>,
        field: &RelationshipField,
        value: Option<&Value>,
        path: &str,
    ) -> Result<Vec<SetItem>, TranslationError> {
        let value = value.filter(|v| !v.is_null());
        let properties = match self.model.edge_properties(owner.via, field) {
            EdgeProperties::None => {
                return match value {
                    Some(_) => Err(TranslationError::unknown_field(
                        RelationshipNames::new(owner.via, field).create_field_input(),
                        "edge",
                    )),
                    None => Ok(vec![]),
                };
            }
            EdgeProperties::Shared(properties) => Some((properties, value)),
            EdgeProperties::PerImplementer(variants) => {
                let keyed = match value {
                    Some(value) => Some(as_object(value, path)?),
                    None => None,
                };
                variants
                    .into_iter()
                    .find(|(implementer, _)| *implementer == owner.node.name.as_str())
                    .and_then(|(_, properties)| properties)
                    .map(|properties| {
                        (
                            properties,
                            keyed.and_then(|k| k.get(&owner.node.name)).filter(|v| !v.is_null()),
                        )
                    })
            }
        };
        let Some((properties, value)) = properties else {
            return Ok(vec![]);
        };
        let object = match value {
            Some(value) => Some(as_object(value, path)?),
            None => None,
        };
        if let Some(object) = object {
            if let Some(key) = object
                .keys()
                .find(|k| !properties.fields.iter().any(|f| f.name == **k && !f.autogenerate))
            {
                return Err(TranslationError::unknown_field(
                    EntityNames::new(&properties.name).create_input(),
                    key.as_str(),
                ));
            }
        }
        self.create_set_items(edge_var, &properties.fields, object, path)
    }

    /// `CALL apoc.util.validate(...)` failing when `var.field` does not have
    /// exactly one (required) or at most one (optional) related node.
    pub(crate) fn cardinality_check(
        &mut self,
        var: &str,
        node: &NodeType,
        field: &RelationshipField,
    ) -> Clause {
        let other = self.ctx.var("this");
        let (target, guard) = match self.model.entity(&field.target) {
            Some(entity) => self.target_node(&other, entity),
            None => (NodePattern::new(other.as_str()), None),
        };
        let count = Expr::Count(Box::new(Query::from_clauses(vec![Clause::matching(
            relationship_pattern(NodePattern::new(var), field, None, target, true),
            guard,
        )])));
        let (op, expectation) = if field.required {
            (CompareOp::Neq, "exactly one")
        } else {
            (CompareOp::Gt, "at most one")
        };
        Clause::Procedure {
            name: "apoc.util.validate".to_string(),
            args: vec![
                Expr::compare(count, op, Expr::integer(1)),
                Expr::string(format!(
                    "CARDINALITY_VIOLATION: {}.{} must have {} related node",
                    node.name, field.name, expectation
                )),
                Expr::List(vec![Expr::integer(0)]),
            ],
        }
    }

    /// One phase of `SFFieldInput { create, connect }`, or for unions of the
    /// member-keyed wrapper.
    pub(crate) fn field_input(
        &mut self,
        query: &mut Query,
        owner: Owner<'_>,
        field: &'s RelationshipField,
        value: &Value,
        path: &str,
        phase: Phase,
    ) -> Result<(), TranslationError> {
        let object = as_object(value, path)?;
        if field.target_kind == TargetKind::Union {
            if let Some((member, member_value)) = single_member(object, path)? {
                let node = union_member(self, field, member)?;
                let member_path = format!("{}.{}", path, member);
                let member_object = as_object(member_value, &member_path)?;
                return self.create_or_connect(query, owner, field, Entity::Node(node), member_object, &member_path, phase);
            }
            return Ok(());
        }
        let target = self.entity(&field.target)?;
        self.create_or_connect(query, owner, field, target, object, path, phase)
    }

    #[allow(clippy::too_many_arguments)]
    fn create_or_connect(
        &mut self,
        query: &mut Query,
        owner: Owner<'_>,
        field: &'s RelationshipField,
        target: Entity<'s>,
        object: &Map<String, Value>,
        path: &str,
        phase: Phase,
    ) -> Result<(), TranslationError> {
        if let Some(key) = object.keys().find(|k| *k != "create" && *k != "connect") {
            return Err(TranslationError::unknown_field(
                RelationshipNames::new(owner.via, field).field_input(),
                key.as_str(),
            ));
        }
        let create_path = format!("{}.create", path);
        let connect_path = format!("{}.connect", path);
        let creates = cardinality_items(object.get("create"), field.is_list, &create_path)?;
        let connects = cardinality_items(object.get("connect"), field.is_list, &connect_path)?;
        if !field.is_list && creates.len() + connects.len() > 1 {
            return Err(TranslationError::CardinalityViolation {
                type_name: owner.node.name.clone(),
                field: field.name.clone(),
                message: "a singular relationship cannot be both created and connected".to_string(),
            });
        }
        match phase {
            Phase::Create => {
                for (i, item) in creates.into_iter().enumerate() {
                    self.nested_create(query, owner, field, target, item, &format!("{}[{}]", create_path, i))?;
                }
            }
            Phase::Connect => {
                for (i, item) in connects.into_iter().enumerate() {
                    self.nested_connect(query, owner, field, target, item, &format!("{}[{}]", connect_path, i))?;
                }
            }
            Phase::Update | Phase::Disconnect | Phase::Delete => {}
        }
        Ok(())
    }

    /// `SFCreateFieldInput { node, edge }`: create the target and the edge to it.
    pub(crate) fn nested_create(
        &mut self,
        query: &mut Query,
        owner: Owner<'_>,
        field: &'s RelationshipField,
        target: Entity<'s>,
        item: &Value,
        path: &str,
    ) -> Result<(), TranslationError> {
        let object = as_object(item, path)?;
        let input_name = RelationshipNames::new(owner.via, field).create_field_input();
        if let Some(key) = object.keys().find(|k| *k != "node" && *k != "edge") {
            return Err(TranslationError::unknown_field(&input_name, key.as_str()));
        }
        let node_path = format!("{}.node", path);
        let node_value = object
            .get("node")
            .filter(|v| !v.is_null())
            .ok_or_else(|| TranslationError::validation_with_context(&node_path, "node is required"))?;

        let (node, node_value, node_path) = match target {
            Entity::Node(node) => (node, node_value, node_path),
            Entity::Interface(interface) => {
                let keyed = as_object(node_value, &node_path)?;
                let (implementer, value) = single_member(keyed, &node_path)?.ok_or_else(|| {
                    TranslationError::validation_with_context(&node_path, "one implementer must be given")
                })?;
                if !interface.implementers.iter().any(|i| i == implementer) {
                    return Err(TranslationError::unknown_field(
                        EntityNames::new(&interface.name).create_input(),
                        implementer,
                    ));
                }
                let member_path = format!("{}.{}", node_path, implementer);
                (self.node(implementer)?, value, member_path)
            }
            Entity::Union(union) => {
                return Err(TranslationError::validation_with_context(
                    path,
                    format!("`{}` values must name a member", union.name),
                ))
            }
        };

        let node_var = self.ctx.var("this");
        let mut body = Query::from_clauses(vec![Clause::with_variables(&[owner.var])]);
        let checks = self.create_node(&mut body, &node_var, node, node_value, &node_path)?;
        let edge_var = self.ctx.var("this");
        body.push(Clause::Create(relationship_pattern(
            NodePattern::new(owner.var),
            field,
            Some(edge_var.as_str()),
            NodePattern::new(node_var.as_str()),
            true,
        )));
        let edge = self.edge_create_items(&edge_var, owner, field, object.get("edge"), &format!("{}.edge", path))?;
        if !edge.is_empty() {
            body.push(Clause::Set(edge));
        }
        body.extend(checks);
        query.push(Clause::Call(body));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::schema_builder::CompiledSchema;
    use crate::translator::{translate, Operation, SelectedField, TranslationError};
    use serde_json::json;

    const TYPE_DEFS: &str = r#"
        type User {
            id: ID! @id
            name: String!
            posts: [Post!]! @relationship(type: "WROTE", direction: OUT)
        }
        type Post {
            title: String!
            views: Int @default(value: 0)
            author: User! @relationship(type: "WROTE", direction: IN)
            likes: [User!]! @relationship(type: "LIKES", direction: IN, properties: "Likes")
        }
        type Likes @relationshipProperties {
            likedAt: DateTime!
        }
    "#;

    fn schema() -> CompiledSchema {
        CompiledSchema::from_sdl(TYPE_DEFS).unwrap()
    }

    #[test]
    fn test_create_sets_generated_and_default_values() {
        let op = Operation::mutation("createUsers")
            .with_args(json!({"input": [{"name": "Ann"}]}))
            .with_selection(vec![SelectedField::new("users").with_selection(vec![SelectedField::new("name")])]);
        let statement = translate(&schema(), &op).unwrap().statements.remove(0);
        assert_eq!(
            statement.text,
            "CALL {\n    CREATE (this0:User)\n    SET this0.id = randomUUID(), this0.name = $param0\n    RETURN this0\n}\nUNWIND [this0] AS this\nRETURN collect(this { .name }) AS data"
        );
        assert_eq!(statement.params["param0"], json!("Ann"));
    }

    #[test]
    fn test_nested_create_with_edge_properties() {
        let op = Operation::mutation("createPosts").with_args(json!({
            "input": [{
                "title": "Hello",
                "author": {"connect": {"where": {"node": {"name": "Ann"}}}},
                "likes": {"create": [{"node": {"name": "Bob"}, "edge": {"likedAt": "2024-01-01T00:00:00Z"}}]}
            }]
        }));
        let text = translate(&schema(), &op).unwrap().statements.remove(0).text;
        assert!(text.contains("SET this0.title = $param0, this0.views = $param1"));
        assert!(text.contains("CREATE (this0)<-[this2:LIKES]-(this1)\n        SET this2.likedAt = datetime($param3)"));
        assert!(text.contains(
            "CALL apoc.util.validate(COUNT {\n        MATCH (this0)<-[:WROTE]-(this7:User)\n    } <> 1, \"CARDINALITY_VIOLATION: Post.author must have exactly one related node\", [0])"
        ));
    }

    #[test]
    fn test_creates_on_every_field_precede_connects() {
        // `author` is declared before `likes`, yet its connect must see the
        // user created through `likes`.
        let op = Operation::mutation("createPosts").with_args(json!({
            "input": [{
                "title": "Hello",
                "author": {"connect": {"where": {"node": {"name": "Fresh"}}}},
                "likes": {"create": [{"node": {"name": "Fresh"}, "edge": {"likedAt": "2024-01-01T00:00:00Z"}}]}
            }]
        }));
        let text = translate(&schema(), &op).unwrap().statements.remove(0).text;
        let created_user = text.find("CREATE (this1:User)").unwrap();
        let connect = text.find("MERGE (this0)<-[").unwrap();
        assert!(created_user < connect, "{}", text);
        assert!(text.contains("MATCH (this3:User)\n        WHERE this3.name = $param4"));
    }

    #[test]
    fn test_missing_required_field() {
        let op = Operation::mutation("createPosts").with_args(json!({"input": [{"views": 3}]}));
        let err = translate(&schema(), &op).unwrap_err();
        assert_eq!(
            err,
            TranslationError::validation_with_context("createPosts.input[0].title", "required field is missing")
        );
    }

    #[test]
    fn test_singular_create_and_connect_conflict() {
        let op = Operation::mutation("createPosts").with_args(json!({
            "input": [{
                "title": "Hello",
                "author": {
                    "create": {"node": {"name": "Ann"}},
                    "connect": {"where": {"node": {"name": "Bob"}}}
                }
            }]
        }));
        assert!(matches!(
            translate(&schema(), &op),
            Err(TranslationError::CardinalityViolation { .. })
        ));
    }

    #[test]
    fn test_missing_edge_properties_are_rejected() {
        let op = Operation::mutation("createUsers").with_args(json!({
            "input": [{"name": "Ann", "posts": {"create": [{"node": {"title": "T", "likes": {"create": [{"node": {"name": "Bob"}}]}}}]}}]
        }));
        let err = translate(&schema(), &op).unwrap_err();
        assert!(matches!(err, TranslationError::Validation { ref path, .. } if path.ends_with("edge.likedAt")));
    }
}
