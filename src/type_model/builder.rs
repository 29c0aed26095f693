use std::collections::{BTreeMap, HashSet};

use crate::sdl_parser::ast::{
    Definition, Directive, Document, FieldDefinition, InterfaceDefinition, ObjectDefinition,
    TypeAnnotation,
};

use super::errors::SchemaBuildError;
use super::graph_model::{
    Direction, EnumType, InterfaceType, NodeType, RelationshipField, RelationshipPropertiesType,
    ScalarField, ScalarKind, TargetKind, TypeModel, UnionType,
};
use super::polymorphism;

const RELATIONSHIP: &str = "relationship";
const DECLARE_RELATIONSHIP: &str = "declareRelationship";
const RELATIONSHIP_PROPERTIES: &str = "relationshipProperties";

/// What a type name in the document refers to.
#[derive(Debug, Clone, Copy, PartialEq)]
enum TypeKind {
    Node,
    Interface,
    Union,
    Properties,
    Enum,
}

struct Names<'d> {
    kinds: BTreeMap<&'d str, TypeKind>,
}

impl<'d> Names<'d> {
    fn collect(document: &Document<'d>) -> Result<Self, SchemaBuildError> {
        let mut kinds = BTreeMap::new();
        for definition in &document.definitions {
            let kind = match definition {
                Definition::Object(object) if has_directive(&object.directives, RELATIONSHIP_PROPERTIES) => {
                    TypeKind::Properties
                }
                Definition::Object(_) => TypeKind::Node,
                Definition::Interface(_) => TypeKind::Interface,
                Definition::Union(_) => TypeKind::Union,
                Definition::Enum(_) => TypeKind::Enum,
            };
            if ScalarKind::from_type_name(definition.name()).is_some()
                || kinds.insert(definition.name(), kind).is_some()
            {
                return Err(SchemaBuildError::DuplicateType {
                    name: definition.name().to_string(),
                });
            }
        }
        Ok(Names { kinds })
    }

    fn kind(&self, name: &str) -> Option<TypeKind> {
        self.kinds.get(name).copied()
    }

    fn target_kind(&self, name: &str) -> Option<TargetKind> {
        match self.kind(name)? {
            TypeKind::Node => Some(TargetKind::Node),
            TypeKind::Interface => Some(TargetKind::Interface),
            TypeKind::Union => Some(TargetKind::Union),
            TypeKind::Properties | TypeKind::Enum => None,
        }
    }
}

fn has_directive(directives: &[Directive<'_>], name: &str) -> bool {
    directives.iter().any(|d| d.name == name)
}

/// Build the immutable model from a parsed document.
pub fn build_type_model(document: &Document<'_>) -> Result<TypeModel, SchemaBuildError> {
    let names = Names::collect(document)?;
    let mut model = TypeModel::default();

    for definition in &document.definitions {
        if let Definition::Enum(def) = definition {
            model.enums.insert(
                def.name.to_string(),
                EnumType {
                    name: def.name.to_string(),
                    values: def.values.iter().map(|v| v.to_string()).collect(),
                },
            );
        }
    }

    for definition in &document.definitions {
        match definition {
            Definition::Object(def) if names.kind(def.name) == Some(TypeKind::Properties) => {
                let properties = build_properties_type(&names, def)?;
                model
                    .relationship_properties
                    .insert(properties.name.clone(), properties);
            }
            Definition::Object(def) => {
                let node = build_node(&names, def)?;
                model.nodes.insert(node.name.clone(), node);
            }
            Definition::Interface(def) => {
                let interface = build_interface(&names, def)?;
                model.interfaces.insert(interface.name.clone(), interface);
            }
            Definition::Union(def) => {
                let mut members = Vec::with_capacity(def.members.len());
                for member in &def.members {
                    if names.kind(member) != Some(TypeKind::Node) {
                        return Err(SchemaBuildError::unknown_type_with_context(
                            *member,
                            format!("union {}", def.name),
                        ));
                    }
                    if !members.iter().any(|m: &String| m == member) {
                        members.push(member.to_string());
                    }
                }
                model.unions.insert(
                    def.name.to_string(),
                    UnionType {
                        name: def.name.to_string(),
                        members,
                    },
                );
            }
            Definition::Enum(_) => {}
        }
    }

    link_implementers(&mut model)?;
    polymorphism::resolve_interface_relationships(&mut model)?;

    log::debug!(
        "Built type model: {} nodes, {} interfaces, {} unions, {} relationship property types",
        model.nodes.len(),
        model.interfaces.len(),
        model.unions.len(),
        model.relationship_properties.len()
    );
    Ok(model)
}

fn build_properties_type(
    names: &Names<'_>,
    def: &ObjectDefinition<'_>,
) -> Result<RelationshipPropertiesType, SchemaBuildError> {
    let mut fields = Vec::new();
    for field in &def.fields {
        if field.directive(RELATIONSHIP).is_some() {
            return Err(SchemaBuildError::malformed_directive_with_context(
                format!("{}.{}", def.name, field.name),
                RELATIONSHIP,
                "relationship properties may only contain scalar fields",
            ));
        }
        fields.push(build_scalar_field(names, def.name, field)?);
    }
    Ok(RelationshipPropertiesType {
        name: def.name.to_string(),
        fields,
    })
}

fn build_node(names: &Names<'_>, def: &ObjectDefinition<'_>) -> Result<NodeType, SchemaBuildError> {
    let mut node = NodeType {
        name: def.name.to_string(),
        fields: Vec::new(),
        relationships: Vec::new(),
        interfaces: Vec::new(),
    };

    for interface in &def.implements {
        if names.kind(interface) != Some(TypeKind::Interface) {
            return Err(SchemaBuildError::unknown_type_with_context(
                *interface,
                format!("{} implements", def.name),
            ));
        }
        node.interfaces.push(interface.to_string());
    }

    for field in &def.fields {
        if field.directive(DECLARE_RELATIONSHIP).is_some() {
            return Err(SchemaBuildError::malformed_directive_with_context(
                format!("{}.{}", def.name, field.name),
                DECLARE_RELATIONSHIP,
                "only interface fields may declare a relationship",
            ));
        }
        match field.directive(RELATIONSHIP) {
            Some(directive) => node
                .relationships
                .push(build_relationship(names, def.name, field, directive)?),
            None => node.fields.push(build_scalar_field(names, def.name, field)?),
        }
    }

    Ok(node)
}

fn build_interface(
    names: &Names<'_>,
    def: &InterfaceDefinition<'_>,
) -> Result<InterfaceType, SchemaBuildError> {
    let mut interface = InterfaceType {
        name: def.name.to_string(),
        fields: Vec::new(),
        relationships: Vec::new(),
        implementers: Vec::new(),
    };

    for field in &def.fields {
        let concrete = field.directive(RELATIONSHIP);
        let declared = field.directive(DECLARE_RELATIONSHIP);
        match (concrete, declared) {
            (Some(_), Some(_)) => {
                return Err(SchemaBuildError::malformed_directive_with_context(
                    format!("{}.{}", def.name, field.name),
                    DECLARE_RELATIONSHIP,
                    "cannot be combined with @relationship",
                ))
            }
            (Some(directive), None) => interface
                .relationships
                .push(build_relationship(names, def.name, field, directive)?),
            (None, Some(_)) => {
                let (target, target_kind) = resolve_target(names, def.name, field)?;
                // direction, label and properties come from the implementers
                interface.relationships.push(RelationshipField {
                    name: field.name.to_string(),
                    direction: Direction::Out,
                    rel_type: String::new(),
                    target,
                    target_kind,
                    is_list: field.ty.is_list(),
                    required: field.ty.is_non_null(),
                    properties: None,
                    declared: true,
                });
            }
            (None, None) => interface
                .fields
                .push(build_scalar_field(names, def.name, field)?),
        }
    }

    Ok(interface)
}

fn resolve_target(
    names: &Names<'_>,
    owner: &str,
    field: &FieldDefinition<'_>,
) -> Result<(String, TargetKind), SchemaBuildError> {
    let target = field.ty.base_name();
    match names.target_kind(target) {
        Some(kind) => Ok((target.to_string(), kind)),
        None if names.kind(target).is_some() || ScalarKind::from_type_name(target).is_some() => {
            Err(SchemaBuildError::malformed_directive_with_context(
                format!("{}.{}", owner, field.name),
                RELATIONSHIP,
                format!("`{}` is not a node, interface or union type", target),
            ))
        }
        None => Err(SchemaBuildError::unknown_type_with_context(
            target,
            format!("{}.{}", owner, field.name),
        )),
    }
}

fn build_relationship(
    names: &Names<'_>,
    owner: &str,
    field: &FieldDefinition<'_>,
    directive: &Directive<'_>,
) -> Result<RelationshipField, SchemaBuildError> {
    let location = format!("{}.{}", owner, field.name);
    let (target, target_kind) = resolve_target(names, owner, field)?;

    let rel_type = directive
        .argument("type")
        .and_then(|v| v.as_str())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            SchemaBuildError::malformed_directive_with_context(
                &location,
                RELATIONSHIP,
                "missing `type` argument",
            )
        })?;

    let direction = directive
        .argument("direction")
        .and_then(|v| v.as_str())
        .ok_or_else(|| {
            SchemaBuildError::malformed_directive_with_context(
                &location,
                RELATIONSHIP,
                "missing `direction` argument",
            )
        })?;
    let direction = Direction::from_keyword(direction).ok_or_else(|| {
        SchemaBuildError::malformed_directive_with_context(
            &location,
            RELATIONSHIP,
            format!("direction must be IN or OUT, found `{}`", direction),
        )
    })?;

    let properties = match directive.argument("properties") {
        None => None,
        Some(value) => {
            let name = value.as_str().ok_or_else(|| {
                SchemaBuildError::malformed_directive_with_context(
                    &location,
                    RELATIONSHIP,
                    "`properties` must be a type name",
                )
            })?;
            match names.kind(name) {
                Some(TypeKind::Properties) => Some(name.to_string()),
                Some(_) => {
                    return Err(SchemaBuildError::malformed_directive_with_context(
                        &location,
                        RELATIONSHIP,
                        format!("`{}` is not annotated with @{}", name, RELATIONSHIP_PROPERTIES),
                    ))
                }
                None => return Err(SchemaBuildError::unknown_type_with_context(name, &location)),
            }
        }
    };

    Ok(RelationshipField {
        name: field.name.to_string(),
        direction,
        rel_type: rel_type.to_string(),
        target,
        target_kind,
        is_list: field.ty.is_list(),
        required: field.ty.is_non_null(),
        properties,
        declared: false,
    })
}

fn build_scalar_field(
    names: &Names<'_>,
    owner: &str,
    field: &FieldDefinition<'_>,
) -> Result<ScalarField, SchemaBuildError> {
    let location = format!("{}.{}", owner, field.name);
    let type_name = field.ty.base_name();
    let kind = match ScalarKind::from_type_name(type_name) {
        Some(kind) => kind,
        None => match names.kind(type_name) {
            Some(TypeKind::Enum) => ScalarKind::Enum(type_name.to_string()),
            Some(TypeKind::Node) | Some(TypeKind::Interface) | Some(TypeKind::Union) => {
                return Err(SchemaBuildError::malformed_directive_with_context(
                    location,
                    RELATIONSHIP,
                    format!("field of entity type `{}` needs @relationship", type_name),
                ))
            }
            Some(TypeKind::Properties) => {
                return Err(SchemaBuildError::malformed_directive_with_context(
                    location,
                    RELATIONSHIP_PROPERTIES,
                    format!("`{}` can only be used as relationship properties", type_name),
                ))
            }
            None => return Err(SchemaBuildError::unknown_type_with_context(type_name, location)),
        },
    };

    if let TypeAnnotation::List { item, .. } = &field.ty {
        if item.is_list() {
            return Err(SchemaBuildError::malformed_directive_with_context(
                location,
                "field",
                "nested list types are not supported",
            ));
        }
    }

    let db_property = match field.directive("alias") {
        Some(alias) => alias
            .argument("property")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                SchemaBuildError::malformed_directive_with_context(
                    &location,
                    "alias",
                    "missing `property` argument",
                )
            })?
            .to_string(),
        None => field.name.to_string(),
    };

    let autogenerate = field.directive("id").is_some();
    if autogenerate && kind != ScalarKind::Id {
        return Err(SchemaBuildError::malformed_directive_with_context(
            location,
            "id",
            "only ID fields can be generated",
        ));
    }

    let default_value = match field.directive("default") {
        Some(default) => Some(
            default
                .argument("value")
                .map(|v| v.to_json())
                .ok_or_else(|| {
                    SchemaBuildError::malformed_directive_with_context(
                        &location,
                        "default",
                        "missing `value` argument",
                    )
                })?,
        ),
        None => None,
    };

    Ok(ScalarField {
        name: field.name.to_string(),
        kind,
        is_list: field.ty.is_list(),
        required: field.ty.is_non_null(),
        db_property,
        autogenerate,
        default_value,
    })
}

/// Fill `implementers` and copy interface-level scalar fields onto implementers that omit them.
fn link_implementers(model: &mut TypeModel) -> Result<(), SchemaBuildError> {
    let mut links: Vec<(String, String)> = Vec::new();
    for node in model.nodes.values() {
        for interface in &node.interfaces {
            links.push((interface.clone(), node.name.clone()));
        }
    }

    for (interface_name, node_name) in links {
        let Some(interface) = model.interfaces.get_mut(&interface_name) else {
            continue;
        };
        interface.implementers.push(node_name.clone());
        let inherited = interface.fields.clone();

        let Some(node) = model.nodes.get_mut(&node_name) else {
            continue;
        };
        let declared: HashSet<String> = node.fields.iter().map(|f| f.name.clone()).collect();
        for field in inherited {
            if !declared.contains(&field.name) {
                node.fields.push(field);
            }
        }
    }
    Ok(())
}
