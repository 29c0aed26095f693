//! Reconciles interface relationship fields with their implementers.
//!
//! For every relationship declared on an interface the implementers must agree on
//! direction and database label. Target narrowing and differing properties types
//! are allowed and recorded as a closed variant set per `interface.field`.

use super::errors::SchemaBuildError;
use super::graph_model::{
    polymorphic_key, PolymorphicRelationship, RelationshipField, RelationshipVariant, TargetKind,
    TypeModel,
};

pub(super) fn resolve_interface_relationships(model: &mut TypeModel) -> Result<(), SchemaBuildError> {
    let interface_names: Vec<String> = model.interfaces.keys().cloned().collect();

    for interface_name in interface_names {
        let Some(interface) = model.interfaces.get(&interface_name).cloned() else {
            continue;
        };

        for (index, declared) in interface.relationships.iter().enumerate() {
            let mut variants = Vec::with_capacity(interface.implementers.len());
            let mut reference: Option<(String, RelationshipField)> = None;

            for implementer in &interface.implementers {
                let concrete = implementation(model, &interface_name, implementer, declared)?;

                if let Some((first_impl, first)) = &reference {
                    if first.direction != concrete.direction {
                        return Err(conflict(
                            &interface_name,
                            declared,
                            implementer,
                            format!("direction {} (as on {})", first.direction, first_impl),
                            format!("direction {}", concrete.direction),
                        ));
                    }
                    if first.rel_type != concrete.rel_type {
                        return Err(conflict(
                            &interface_name,
                            declared,
                            implementer,
                            format!("type \"{}\" (as on {})", first.rel_type, first_impl),
                            format!("type \"{}\"", concrete.rel_type),
                        ));
                    }
                } else {
                    reference = Some((implementer.clone(), concrete.clone()));
                }

                check_narrowing(model, implementer, declared, &concrete)?;

                variants.push(RelationshipVariant {
                    implementer: implementer.clone(),
                    target: concrete.target.clone(),
                    properties: concrete.properties.clone(),
                });
            }

            let polymorphic = PolymorphicRelationship {
                interface: interface_name.clone(),
                field: declared.name.clone(),
                variants,
            };

            if declared.declared {
                let shared = if polymorphic.shares_properties() {
                    polymorphic
                        .variants
                        .first()
                        .and_then(|v| v.properties.clone())
                } else {
                    None
                };
                if let Some(field) = model
                    .interfaces
                    .get_mut(&interface_name)
                    .and_then(|i| i.relationships.get_mut(index))
                {
                    if let Some((_, first)) = &reference {
                        field.direction = first.direction;
                        field.rel_type = first.rel_type.clone();
                    }
                    field.properties = shared;
                }
            }

            log::debug!(
                "Resolved {}.{} across {} implementers (shared properties: {})",
                interface_name,
                declared.name,
                polymorphic.variants.len(),
                polymorphic.shares_properties()
            );
            model.polymorphic.insert(
                polymorphic_key(&interface_name, &declared.name),
                polymorphic,
            );
        }
    }
    Ok(())
}

/// The implementer's own field, inheriting concrete interface relationships it omits.
fn implementation(
    model: &mut TypeModel,
    interface: &str,
    implementer: &str,
    declared: &RelationshipField,
) -> Result<RelationshipField, SchemaBuildError> {
    let Some(node) = model.nodes.get_mut(implementer) else {
        return Err(SchemaBuildError::unknown_type_with_context(implementer, interface));
    };

    if let Some(existing) = node.relationships.iter().find(|r| r.name == declared.name) {
        if !declared.declared
            && (existing.direction != declared.direction || existing.rel_type != declared.rel_type)
        {
            return Err(conflict(
                interface,
                declared,
                implementer,
                format!("{} \"{}\"", declared.direction, declared.rel_type),
                format!("{} \"{}\"", existing.direction, existing.rel_type),
            ));
        }
        return Ok(existing.clone());
    }

    if declared.declared {
        return Err(SchemaBuildError::MissingImplementation {
            interface: interface.to_string(),
            field: declared.name.clone(),
            implementer: implementer.to_string(),
        });
    }

    if node.fields.iter().any(|f| f.name == declared.name) {
        return Err(conflict(
            interface,
            declared,
            implementer,
            "a relationship".to_string(),
            "a scalar field".to_string(),
        ));
    }

    let inherited = declared.clone();
    node.relationships.push(inherited.clone());
    Ok(inherited)
}

fn check_narrowing(
    model: &TypeModel,
    implementer: &str,
    declared: &RelationshipField,
    concrete: &RelationshipField,
) -> Result<(), SchemaBuildError> {
    if concrete.target == declared.target {
        return Ok(());
    }
    let allowed = match declared.target_kind {
        TargetKind::Node => false,
        TargetKind::Interface => {
            concrete.target_kind == TargetKind::Node
                && model
                    .interface(&declared.target)
                    .is_some_and(|i| i.implementers.contains(&concrete.target))
        }
        TargetKind::Union => {
            concrete.target_kind == TargetKind::Node
                && model
                    .union(&declared.target)
                    .is_some_and(|u| u.members.contains(&concrete.target))
        }
    };
    if allowed {
        Ok(())
    } else {
        Err(SchemaBuildError::InvalidNarrowing {
            implementer: implementer.to_string(),
            field: declared.name.clone(),
            declared: declared.target.clone(),
            narrowed: concrete.target.clone(),
        })
    }
}

fn conflict(
    interface: &str,
    declared: &RelationshipField,
    implementer: &str,
    expected: String,
    found: String,
) -> SchemaBuildError {
    SchemaBuildError::ConflictingRelationship {
        interface: interface.to_string(),
        field: declared.name.clone(),
        implementer: implementer.to_string(),
        expected,
        found,
    }
}
