use super::naming::{EntityNames, RelationshipNames};
use super::types::{FieldDef, InputValueDef, TypeDefinition, TypeRef};
use super::{EdgeShape, ShapeBuilder};
use crate::aggregation::comparators_for;
use crate::type_model::{RelationshipField, ScalarField, ScalarKind};

/// Output reductions offered for a scalar kind, `None` when it cannot be aggregated.
fn scalar_reductions(kind: &ScalarKind) -> Option<Vec<(&'static str, String)>> {
    let own = kind.type_name().to_string();
    if kind.is_textual() {
        Some(vec![("shortest", own.clone()), ("longest", own)])
    } else if kind.is_numeric() {
        let average = match kind {
            ScalarKind::BigInt => "BigInt".to_string(),
            _ => "Float".to_string(),
        };
        Some(vec![
            ("max", own.clone()),
            ("min", own.clone()),
            ("average", average),
            ("sum", own),
        ])
    } else if kind.is_temporal() {
        Some(vec![("min", own.clone()), ("max", own)])
    } else {
        None
    }
}

impl ShapeBuilder<'_> {
    /// `IntAggregateSelection` and friends, generated on first use.
    fn scalar_aggregate_selection(&mut self, kind: &ScalarKind) -> Option<String> {
        let reductions = scalar_reductions(kind)?;
        let name = format!("{}AggregateSelection", kind.type_name());
        self.catalogue.insert(TypeDefinition::object(
            name.as_str(),
            reductions
                .into_iter()
                .map(|(field, ty)| FieldDef::new(field, TypeRef::named(ty)))
                .collect(),
        ));
        Some(name)
    }

    fn aggregate_selection_fields(&mut self, fields: &[ScalarField]) -> Vec<FieldDef> {
        let mut selection = Vec::new();
        for field in fields.iter().filter(|f| !f.is_list) {
            if let Some(type_name) = self.scalar_aggregate_selection(&field.kind) {
                selection.push(FieldDef::new(field.name.as_str(), TypeRef::required(type_name)));
            }
        }
        selection
    }

    /// `TAggregateSelection` used by the root aggregate query.
    pub(super) fn add_entity_aggregate_selection(&mut self, name: &str, fields: &[ScalarField]) {
        let mut selection = vec![FieldDef::new("count", TypeRef::required("Int"))];
        selection.extend(self.aggregate_selection_fields(fields));
        self.catalogue.insert(TypeDefinition::object(
            EntityNames::new(name).aggregate_selection(),
            selection,
        ));
    }

    /// `SXFAggregationSelection` with its node and edge halves.
    pub(super) fn add_relationship_aggregate_selection(
        &mut self,
        owner: &str,
        field: &RelationshipField,
    ) {
        let names = RelationshipNames::new(owner, field);
        let target_fields = self
            .model
            .entity(&field.target)
            .map(|e| e.fields().to_vec())
            .unwrap_or_default();
        let mut selection = vec![FieldDef::new("count", TypeRef::required("Int"))];

        let node_fields = self.aggregate_selection_fields(&target_fields);
        self.catalogue.insert(TypeDefinition::object(
            names.node_aggregate_selection(),
            node_fields,
        ));
        selection.push(FieldDef::new(
            "node",
            TypeRef::named(names.node_aggregate_selection()),
        ));

        if let EdgeShape::Shared(properties) = self.edge_shape(owner, field) {
            let edge_fields = self.aggregate_selection_fields(&properties.fields);
            self.catalogue.insert(TypeDefinition::object(
                names.edge_aggregate_selection(),
                edge_fields,
            ));
            selection.push(FieldDef::new(
                "edge",
                TypeRef::named(names.edge_aggregate_selection()),
            ));
        }

        self.catalogue
            .insert(TypeDefinition::object(names.aggregation_selection(), selection));
    }

    /// `SFAggregateInput` plus the node and edge aggregation-where inputs.
    pub(super) fn add_aggregate_input(&mut self, owner: &str, field: &RelationshipField) {
        let names = RelationshipNames::new(owner, field);
        let input_name = names.aggregate_input();
        let mut inputs = vec![
            InputValueDef::new("count", TypeRef::named("Int")),
            InputValueDef::new("count_LT", TypeRef::named("Int")),
            InputValueDef::new("count_LTE", TypeRef::named("Int")),
            InputValueDef::new("count_GT", TypeRef::named("Int")),
            InputValueDef::new("count_GTE", TypeRef::named("Int")),
            InputValueDef::new("AND", TypeRef::list(input_name.as_str())),
            InputValueDef::new("OR", TypeRef::list(input_name.as_str())),
            InputValueDef::new("NOT", TypeRef::named(input_name.as_str())),
        ];

        let target_fields = self
            .model
            .entity(&field.target)
            .map(|e| e.fields().to_vec())
            .unwrap_or_default();
        self.insert_aggregation_where(names.node_aggregation_where(), &target_fields);
        inputs.push(InputValueDef::new(
            "node",
            TypeRef::named(names.node_aggregation_where()),
        ));

        // per-implementer properties have no common reduction
        if let EdgeShape::Shared(properties) = self.edge_shape(owner, field) {
            self.insert_aggregation_where(names.edge_aggregation_where(), &properties.fields);
            inputs.push(InputValueDef::new(
                "edge",
                TypeRef::named(names.edge_aggregation_where()),
            ));
        }

        self.catalogue.insert(TypeDefinition::input(input_name, inputs));
    }

    fn insert_aggregation_where(&mut self, name: String, fields: &[ScalarField]) {
        let mut inputs = vec![
            InputValueDef::new("AND", TypeRef::list(name.as_str())),
            InputValueDef::new("OR", TypeRef::list(name.as_str())),
            InputValueDef::new("NOT", TypeRef::named(name.as_str())),
        ];
        let mut comparators = 0;
        for field in fields.iter().filter(|f| !f.is_list) {
            for comparator in comparators_for(&field.kind) {
                let mut input = InputValueDef::new(
                    format!("{}{}", field.name, comparator.suffix),
                    TypeRef::named(comparator.value_type(&field.kind)),
                );
                if let Some(reason) = comparator.deprecation() {
                    input = input.deprecated(reason);
                }
                inputs.push(input);
                comparators += 1;
            }
        }
        if comparators == 0 {
            // composition alone constrains nothing
            inputs.clear();
        }
        self.catalogue.insert(TypeDefinition::input(name, inputs));
    }
}

#[cfg(test)]
mod tests {
    use crate::schema_builder::CompiledSchema;

    const TYPE_DEFS: &str = r#"
        type User {
            name: String!
            age: Int
            active: Boolean
        }
        type Post {
            title: String!
            likes: [User!]! @relationship(type: "LIKES", direction: IN, properties: "Likes")
            flags: [Flag!]! @relationship(type: "FLAGGED", direction: OUT)
        }
        type Flag { raised: Boolean }
        type Likes @relationshipProperties { likedAt: DateTime! }
    "#;

    #[test]
    fn test_aggregation_where_inputs() {
        let schema = CompiledSchema::from_sdl(TYPE_DEFS).unwrap();
        let catalogue = &schema.catalogue;

        let node = catalogue.get("PostLikesNodeAggregationWhereInput").unwrap();
        let names: Vec<&str> = node.input_fields().iter().map(|f| f.name.as_str()).collect();
        assert!(names.contains(&"name_SHORTEST_LENGTH_LT"));
        assert!(names.contains(&"name_SHORTEST_LT"));
        assert!(names.contains(&"age_AVERAGE_GTE"));
        assert!(!names.iter().any(|n| n.starts_with("active")));

        let legacy = catalogue
            .input_field("PostLikesNodeAggregationWhereInput", "name_LT")
            .unwrap();
        assert_eq!(
            legacy.deprecation.as_deref(),
            Some("Please use the explicit _SHORTEST_LENGTH_LT version")
        );
        assert_eq!(
            catalogue
                .input_field("PostLikesNodeAggregationWhereInput", "age_AVERAGE_GT")
                .unwrap()
                .ty
                .to_string(),
            "Float"
        );

        assert!(catalogue
            .input_field("PostLikesEdgeAggregationWhereInput", "likedAt_MIN_LTE")
            .is_some());
        assert!(catalogue.input_field("PostLikesAggregateInput", "edge").is_some());
        assert!(catalogue.input_field("PostLikesAggregateInput", "count_GTE").is_some());
    }

    #[test]
    fn test_unaggregatable_target_drops_node_input() {
        let schema = CompiledSchema::from_sdl(TYPE_DEFS).unwrap();
        assert!(!schema.catalogue.contains("PostFlagsNodeAggregationWhereInput"));
        assert!(schema
            .catalogue
            .input_field("PostFlagsAggregateInput", "node")
            .is_none());
        assert!(schema
            .catalogue
            .input_field("PostFlagsAggregateInput", "count")
            .is_some());
    }

    #[test]
    fn test_aggregation_selection_shapes() {
        let schema = CompiledSchema::from_sdl(TYPE_DEFS).unwrap();
        let catalogue = &schema.catalogue;
        assert_eq!(
            catalogue
                .output_field("PostUserLikesAggregationSelection", "edge")
                .unwrap()
                .ty
                .to_string(),
            "PostUserLikesEdgeAggregateSelection"
        );
        assert!(catalogue
            .output_field("PostUserLikesNodeAggregateSelection", "name")
            .is_some());
        assert!(catalogue
            .output_field("IntAggregateSelection", "average")
            .is_some());
        assert!(catalogue
            .output_field("DateTimeAggregateSelection", "min")
            .is_some());
    }
}
