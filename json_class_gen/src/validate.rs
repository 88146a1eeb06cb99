//! Consistency checks over a frozen registry.
//!
//! Walks every class and collects all issues that would make the generated
//! code or the materialized instances incomplete, without stopping at the first.

use crate::codegen::field_ident;
use crate::error::{SchemaIssue, SchemaIssueKind, SchemaValidationError};
use crate::registry::SchemaRegistry;
use crate::relationship::Relationship;
use crate::schema::SchemaClass;
use std::collections::BTreeMap;

fn check_relationship(
    registry: &SchemaRegistry,
    class: &SchemaClass,
    relationship: &Relationship,
    issues: &mut Vec<SchemaIssue>,
) {
    let Some(target) = registry.get(relationship.target_class()) else {
        issues.push(SchemaIssue {
            class_name: class.name().to_string(),
            member: relationship.name().to_string(),
            kind: SchemaIssueKind::UnresolvedTarget {
                target_class: relationship.target_class().to_string(),
            },
        });
        return;
    };
    if let Some(index_field) = relationship.index_field()
        && !target.has_attribute(index_field)
    {
        issues.push(SchemaIssue {
            class_name: class.name().to_string(),
            member: relationship.name().to_string(),
            kind: SchemaIssueKind::IndexFieldNotAttribute {
                target_class: target.name().to_string(),
                index_field: index_field.to_string(),
            },
        });
    }
}

/// Members whose generated field identifiers collide, e.g. `prixUnitaire`
/// and `prix_unitaire`.
fn check_identifiers(class: &SchemaClass, issues: &mut Vec<SchemaIssue>) {
    let mut seen: BTreeMap<String, String> = BTreeMap::new();
    let attributes = class.attributes().iter().map(|(name, _)| name.clone());
    let relationships = class.relationships().iter().map(Relationship::storage_key);
    for member in attributes.chain(relationships) {
        let identifier: String = field_ident(&member);
        if let Some(other) = seen.get(&identifier) {
            issues.push(SchemaIssue {
                class_name: class.name().to_string(),
                member,
                kind: SchemaIssueKind::IdentifierCollision {
                    other: other.clone(),
                    identifier,
                },
            });
        } else {
            seen.insert(identifier, member);
        }
    }
}

/// Validates the registry. Returns `Ok(())` if no issues, or
/// `Err(SchemaValidationError)` with all collected issues in class order.
///
/// # Errors
///
/// Returns `SchemaValidationError` listing every issue found.
pub fn validate_registry(registry: &SchemaRegistry) -> Result<(), SchemaValidationError> {
    let mut issues: Vec<SchemaIssue> = Vec::new();
    for class in registry.iter() {
        for relationship in class.relationships() {
            check_relationship(registry, class, relationship, &mut issues);
        }
        check_identifiers(class, &mut issues);
    }
    if issues.is_empty() {
        Ok(())
    } else {
        Err(SchemaValidationError { issues })
    }
}
