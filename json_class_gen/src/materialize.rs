//! Rebuilds a JSON document as a tree of live instances.

use crate::error::JsonClassGenError;
use crate::instance::Instance;
use crate::json_pointer::{self, JsonPointer};
use crate::loader::Parameters;
use crate::registry::SchemaRegistry;
use crate::relationship::{Relationship, StorageShape};
use crate::schema::SchemaClass;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

struct Materializer<'r> {
    registry: &'r SchemaRegistry,
}

impl Materializer<'_> {
    fn visit(
        &self,
        class_name: &str,
        fragment: &Value,
        pointer: &JsonPointer,
    ) -> Result<Instance, JsonClassGenError> {
        let class: &SchemaClass = self.registry.require(class_name)?;
        let handle = class
            .type_handle()
            .ok_or_else(|| JsonClassGenError::TypeNotLoaded {
                class_name: class_name.to_string(),
            })?;
        let Value::Object(members) = fragment else {
            return Err(JsonClassGenError::UnsupportedFragment {
                class_name: class_name.to_string(),
                pointer: pointer.to_string(),
                expected: "an object",
                found: json_pointer::kind_of(fragment),
            });
        };
        debug!(class_name, %pointer, "materializing instance");

        let parameters: Parameters = class
            .attributes()
            .iter()
            .map(|(name, _)| (name.clone(), members.get(name).cloned()))
            .collect();
        let mut instance: Instance = handle.construct(parameters)?;

        for relationship in class.relationships() {
            let elements: Vec<(JsonPointer, &Value)> =
                related_elements(class_name, relationship, members, pointer);
            if elements.is_empty() {
                continue;
            }
            let target: &SchemaClass = self
                .registry
                .get(relationship.target_class())
                .ok_or_else(|| JsonClassGenError::ClassNotFound {
                    class_name: relationship.target_class().to_string(),
                    relationship: Some(relationship.name().to_string()),
                })?;
            for (at, element) in elements {
                let related: Instance = self.visit(target.name(), element, &at)?;
                instance.add(relationship.name(), related)?;
            }
        }
        Ok(instance)
    }
}

/// Elements a fragment holds for one relationship, with their locations.
///
/// The relationship's own JSON key is looked up first, then its storage key
/// (`liste_<name>s`, `table_<name>s`). A missing or null member has no
/// elements, and so has a member whose JSON kind does not fit the storage:
/// with overwritten shapes, earlier fragments of a class may hold another kind.
fn related_elements<'v>(
    class_name: &str,
    relationship: &Relationship,
    members: &'v Map<String, Value>,
    pointer: &JsonPointer,
) -> Vec<(JsonPointer, &'v Value)> {
    let storage_key: String = relationship.storage_key();
    let found: Option<(&str, &Value)> = [relationship.json_key(), storage_key.as_str()]
        .into_iter()
        .find_map(|key| members.get(key).map(|value| (key, value)));
    let Some((key, value)) = found else {
        return Vec::new();
    };
    let at: JsonPointer = pointer.key(key);
    match (relationship.storage_shape(), value) {
        (_, Value::Null) => Vec::new(),
        (StorageShape::Sequence, Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(index, item)| (at.index(index), item))
            .collect(),
        (StorageShape::Indexed { .. }, Value::Object(entries)) => entries
            .iter()
            .map(|(entry_key, entry)| (at.key(entry_key), entry))
            .collect(),
        (StorageShape::Single, Value::Object(_)) => vec![(at, value)],
        (shape, other) => {
            let expected: &'static str = match shape {
                StorageShape::Sequence => "an array",
                StorageShape::Indexed { .. } | StorageShape::Single => "an object",
            };
            warn!(
                class_name,
                relationship = relationship.name(),
                pointer = %at,
                expected,
                found = json_pointer::kind_of(other),
                "member does not fit the relationship storage; treated as empty"
            );
            Vec::new()
        }
    }
}

/// Build an instance of `class_name` from `fragment`, recursing through
/// every relationship. Every class reached must have been loaded.
///
/// # Errors
///
/// Returns `TypeNotLoaded` for a class without a type handle,
/// `ClassNotFound` if a relationship with elements targets an unknown class,
/// and `UnsupportedFragment` if `fragment` is not an object.
pub fn materialize(
    registry: &SchemaRegistry,
    class_name: &str,
    fragment: &Value,
) -> Result<Instance, JsonClassGenError> {
    Materializer { registry }.visit(class_name, fragment, &JsonPointer::root())
}

/// Materialize a whole document as an instance of the registry's root class.
///
/// # Errors
///
/// Returns `GenericError` if the registry has no root, and the errors of
/// `materialize`.
pub fn materialize_document(
    registry: &SchemaRegistry,
    document: &Value,
) -> Result<Instance, JsonClassGenError> {
    let root: &SchemaClass = registry.root()?;
    let instance: Instance = materialize(registry, root.name(), document)?;
    info!(root = root.name(), "document materialized");
    Ok(instance)
}
