//! Update: root `updateTs`, nested `update` inputs and the per-field
//! create/connect/update/disconnect/delete phases.

use serde_json::{Map, Value};

use super::create::data_selection;
use super::{
    as_object, cardinality_items, guarded_import, relationship_pattern, single_member,
    union_member, Operation, Owner, Phase, TranslationError, Translator,
};
use crate::cypher::{Clause, Expr, NodePattern, Pattern, ProjectionItem, Query, SetItem};
use crate::schema_builder::{EntityNames, RelationshipNames};
use crate::type_model::{EdgeProperties, Entity, NodeType, RelationshipField, ScalarField, TargetKind};

const UPDATE_FIELD_KEYS: [&str; 6] = ["where", "update", "connect", "disconnect", "create", "delete"];

impl<'s> Translator<'s> {
    pub(crate) fn translate_update(
        &mut self,
        node: &'s NodeType,
        operation: &Operation,
    ) -> Result<Query, TranslationError> {
        let args = &operation.args;
        let path = operation.root_field.as_str();
        let entity = Entity::Node(node);
        let arg = |name: &str| args.get(name).filter(|v| !v.is_null());

        let mut query = Query::new();
        self.compile_where("this", entity, args.get("where"), &format!("{}.where", path))?
            .apply(&mut query, Pattern::node(NodePattern::labelled("this", node.name.as_str())), None);

        let owner = Owner::node("this", node);
        let mut touched = false;
        if let Some(create) = arg("create") {
            touched = true;
            self.relation_input(&mut query, owner, create, &format!("{}.create", path))?;
        }
        if let Some(connect) = arg("connect") {
            touched = true;
            self.connect_input(&mut query, "this", entity, connect, &format!("{}.connect", path))?;
        }
        if let Some(update) = arg("update") {
            touched |= self.update_node(&mut query, "this", entity, update, &format!("{}.update", path))?;
        }
        if let Some(disconnect) = arg("disconnect") {
            touched = true;
            self.disconnect_input(&mut query, "this", entity, disconnect, &format!("{}.disconnect", path))?;
        }
        if let Some(delete) = arg("delete") {
            touched = true;
            self.delete_input(&mut query, "this", entity, delete, &format!("{}.delete", path))?;
        }
        if touched {
            for relationship in node.relationships.iter().filter(|r| !r.is_list) {
                let check = self.cardinality_check("this", node, relationship);
                query.push(check);
            }
        }

        let selection = data_selection(operation, &EntityNames::new(&node.name).plural);
        let (calls, projection) = self.project_node("this", node, &selection, false, &[])?;
        query.extend(calls);
        query.push(Clause::returning(vec![ProjectionItem::aliased(
            Expr::Function {
                name: "collect".to_string(),
                distinct: true,
                args: vec![projection],
            },
            "data",
        )]));
        Ok(query)
    }

    /// `TRelationInput`: the `create` argument of a root update.
    fn relation_input(
        &mut self,
        query: &mut Query,
        owner: Owner<'_>,
        value: &Value,
        path: &str,
    ) -> Result<(), TranslationError> {
        let node: &'s NodeType = self.node(&owner.node.name)?;
        for (key, value) in as_object(value, path)? {
            if value.is_null() {
                continue;
            }
            let field = node.relationship(key).ok_or_else(|| {
                TranslationError::unknown_field(EntityNames::new(&node.name).relation_input(), key.as_str())
            })?;
            let field_path = format!("{}.{}", path, key);
            let (target, value, field_path) = self.resolve_member(field, value, &field_path)?;
            let Some(target) = target else {
                continue;
            };
            for (i, item) in cardinality_items(Some(value), field.is_list, &field_path)?.into_iter().enumerate() {
                self.nested_create(query, owner, field, target, item, &format!("{}[{}]", field_path, i))?;
            }
        }
        Ok(())
    }

    /// For union fields, the single member named by `value`; otherwise the
    /// declared target. `None` when a union value names no member.
    pub(crate) fn resolve_member<'v>(
        &self,
        field: &'s RelationshipField,
        value: &'v Value,
        path: &str,
    ) -> Result<(Option<Entity<'s>>, &'v Value, String), TranslationError> {
        if field.target_kind != TargetKind::Union {
            return Ok((Some(self.entity(&field.target)?), value, path.to_string()));
        }
        let keyed = as_object(value, path)?;
        match single_member(keyed, path)? {
            Some((member, member_value)) => {
                let node = union_member(self, field, member)?;
                Ok((Some(Entity::Node(node)), member_value, format!("{}.{}", path, member)))
            }
            None => Ok((None, value, path.to_string())),
        }
    }

    /// SET one scalar key of an update input, including `_INCREMENT`/`_DECREMENT`.
    /// `None` when `key` is not a scalar key.
    pub(crate) fn scalar_update(
        &mut self,
        var: &str,
        fields: &[ScalarField],
        key: &str,
        value: &Value,
        path: &str,
    ) -> Result<Option<SetItem>, TranslationError> {
        let key_path = format!("{}.{}", path, key);
        if let Some(field) = fields.iter().find(|f| f.name == key && !f.autogenerate) {
            if value.is_null() && field.required {
                return Err(TranslationError::validation_with_context(key_path, "cannot be set to null"));
            }
            let bound = self.bind_scalar(&field.kind, value, field.is_list, &key_path)?;
            return Ok(Some(SetItem::new(Expr::property(var, field.db_property.as_str()), bound)));
        }
        for (suffix, increment) in [("_INCREMENT", true), ("_DECREMENT", false)] {
            let Some(base) = key.strip_suffix(suffix) else {
                continue;
            };
            let Some(field) = fields
                .iter()
                .find(|f| f.name == base && f.kind.is_numeric() && !f.is_list && !f.autogenerate)
            else {
                continue;
            };
            if value.is_null() {
                return Err(TranslationError::validation_with_context(key_path, "expected a number"));
            }
            let amount = self.bind_scalar(&field.kind, value, false, &key_path)?;
            let current = Expr::property(var, field.db_property.as_str());
            let updated = if increment {
                Expr::Add(Box::new(current.clone()), Box::new(amount))
            } else {
                Expr::Subtract(Box::new(current.clone()), Box::new(amount))
            };
            return Ok(Some(SetItem::new(current, updated)));
        }
        Ok(None)
    }

    /// `TUpdateInput` / `IUpdateInput` applied to `var`. Returns whether any
    /// relationship was written, which decides if cardinality checks follow.
    pub(crate) fn update_node(
        &mut self,
        query: &mut Query,
        var: &str,
        entity: Entity<'s>,
        value: &Value,
        path: &str,
    ) -> Result<bool, TranslationError> {
        let object = as_object(value, path)?;
        let is_interface = matches!(entity, Entity::Interface(_));
        let mut set = Vec::new();
        let mut relationships = Vec::new();
        for (key, value) in object {
            if key == "_on" && is_interface {
                continue;
            }
            if let Some(item) = self.scalar_update(var, entity.fields(), key, value, path)? {
                set.push(item);
                continue;
            }
            match entity.relationship(key) {
                Some(field) if !value.is_null() => relationships.push((field, value)),
                Some(_) => {}
                None => {
                    return Err(TranslationError::unknown_field(
                        EntityNames::new(entity.name()).update_input(),
                        key.as_str(),
                    ))
                }
            }
        }
        if !set.is_empty() {
            query.push(Clause::Set(set));
        }

        let mut touched = !relationships.is_empty();
        if touched {
            let via = entity.name();
            self.for_each_concrete(query, var, entity, &mut |translator, body, node| {
                for phase in Phase::ALL {
                    for (declared, value) in &relationships {
                        let Some(field) = node.relationship(&declared.name) else {
                            continue;
                        };
                        let owner = Owner { var, node, via };
                        let field_path = format!("{}.{}", path, declared.name);
                        translator.update_field(body, owner, field, value, &field_path, phase)?;
                    }
                }
                Ok(())
            })?;
        }

        if let (Entity::Interface(interface), Some(on)) = (entity, object.get("_on").filter(|v| !v.is_null())) {
            let on_path = format!("{}._on", path);
            for (implementer, value) in as_object(on, &on_path)? {
                if value.is_null() {
                    continue;
                }
                if !interface.implementers.contains(implementer) {
                    return Err(TranslationError::unknown_field(
                        EntityNames::new(&interface.name).implementations_input("Update"),
                        implementer.as_str(),
                    ));
                }
                let node = self.node(implementer)?;
                let mut body = guarded_import(var, &node.name);
                touched |= self.update_node(
                    &mut body,
                    var,
                    Entity::Node(node),
                    value,
                    &format!("{}.{}", on_path, implementer),
                )?;
                if body.clauses.len() > 2 {
                    query.push(Clause::Call(body));
                }
            }
        }
        Ok(touched)
    }

    /// One phase of a relationship key of an update input: `SFUpdateFieldInput`
    /// by cardinality, or the member-keyed wrapper for unions.
    fn update_field(
        &mut self,
        query: &mut Query,
        owner: Owner<'_>,
        field: &'s RelationshipField,
        value: &Value,
        path: &str,
        phase: Phase,
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
            self.update_field_item(query, owner, field, target, as_object(item, &item_path)?, &item_path, phase)?;
        }
        Ok(())
    }

    /// One phase of one `SFUpdateFieldInput`.
    #[allow(clippy::too_many_arguments)]
    fn update_field_item(
        &mut self,
        query: &mut Query,
        owner: Owner<'_>,
        field: &'s RelationshipField,
        target: Entity<'s>,
        object: &Map<String, Value>,
        path: &str,
        phase: Phase,
    ) -> Result<(), TranslationError> {
        if let Some(key) = object.keys().find(|k| !UPDATE_FIELD_KEYS.contains(&k.as_str())) {
            return Err(TranslationError::unknown_field(
                RelationshipNames::new(owner.via, field).update_field_input(),
                key.as_str(),
            ));
        }
        if phase == Phase::Update {
            if let Some(update) = object.get("update").filter(|v| !v.is_null()) {
                self.nested_update(query, owner, field, target, object.get("where"), update, path)?;
            }
            return Ok(());
        }

        let phase_path = format!("{}.{}", path, phase.key());
        let items = cardinality_items(object.get(phase.key()), field.is_list, &phase_path)?;
        for (i, item) in items.into_iter().enumerate() {
            let item_path = if field.is_list {
                format!("{}[{}]", phase_path, i)
            } else {
                phase_path.clone()
            };
            match phase {
                Phase::Create => self.nested_create(query, owner, field, target, item, &item_path)?,
                Phase::Connect => self.nested_connect(query, owner, field, target, item, &item_path)?,
                Phase::Disconnect => self.nested_disconnect(query, owner, field, target, item, &item_path)?,
                Phase::Delete => self.nested_delete(query, owner, field, target, item, &item_path)?,
                Phase::Update => {}
            }
        }
        Ok(())
    }

    /// `SFUpdateConnectionInput { node, edge }` for every related node
    /// matching the connection `where`. `item_path` locates the enclosing
    /// `SFUpdateFieldInput`.
    #[allow(clippy::too_many_arguments)]
    fn nested_update(
        &mut self,
        query: &mut Query,
        owner: Owner<'_>,
        field: &'s RelationshipField,
        target: Entity<'s>,
        where_value: Option<&Value>,
        update: &Value,
        item_path: &str,
    ) -> Result<(), TranslationError> {
        let path = format!("{}.update", item_path);
        let path = path.as_str();
        let object = as_object(update, path)?;
        if let Some(key) = object.keys().find(|k| *k != "node" && *k != "edge") {
            return Err(TranslationError::unknown_field(
                RelationshipNames::new(owner.via, field).update_connection_input(),
                key.as_str(),
            ));
        }
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
            where_value,
            &format!("{}.where", item_path),
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

        if let Some(edge) = object.get("edge").filter(|v| !v.is_null()) {
            let set = self.edge_update_items(&edge_var, owner, field, edge, &format!("{}.edge", path))?;
            if !set.is_empty() {
                body.push(Clause::Set(set));
            }
        }
        if let Some(node) = object.get("node").filter(|v| !v.is_null()) {
            let touched = self.update_node(&mut body, &node_var, target, node, &format!("{}.node", path))?;
            if let (true, Entity::Node(node)) = (touched, target) {
                for relationship in node.relationships.iter().filter(|r| !r.is_list) {
                    let check = self.cardinality_check(&node_var, node, relationship);
                    body.push(check);
                }
            }
        }
        if body.clauses.len() > 2 {
            query.push(Clause::Call(body));
        }
        Ok(())
    }

    /// SET items for an existing edge reached through `owner.field`.
    fn edge_update_items(
        &mut self,
        edge_var: &str,
        owner: Owner<'_>,
        field: &RelationshipField,
        value: &Value,
        path: &str,
    ) -> Result<Vec<SetItem>, TranslationError> {
        let (properties, value, path) = match self.model.edge_properties(owner.via, field) {
            EdgeProperties::None => {
                return Err(TranslationError::unknown_field(
                    RelationshipNames::new(owner.via, field).update_connection_input(),
                    "edge",
                ))
            }
            EdgeProperties::Shared(properties) => (properties, value, path.to_string()),
            EdgeProperties::PerImplementer(variants) => {
                let keyed = as_object(value, path)?;
                let found = variants
                    .into_iter()
                    .find(|(implementer, _)| *implementer == owner.node.name.as_str())
                    .and_then(|(_, properties)| properties);
                match (found, keyed.get(&owner.node.name).filter(|v| !v.is_null())) {
                    (Some(properties), Some(value)) => {
                        (properties, value, format!("{}.{}", path, owner.node.name))
                    }
                    _ => return Ok(vec![]),
                }
            }
        };
        let mut set = Vec::new();
        for (key, value) in as_object(value, &path)? {
            let item = self.scalar_update(edge_var, &properties.fields, key, value, &path)?.ok_or_else(|| {
                TranslationError::unknown_field(EntityNames::new(&properties.name).update_input(), key.as_str())
            })?;
            set.push(item);
        }
        Ok(set)
    }
}
