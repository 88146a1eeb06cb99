//! Schema inference: turns an example document into registry classes.

use crate::error::JsonClassGenError;
use crate::json_pointer::{self, JsonPointer};
use crate::registry::SchemaRegistry;
use crate::relationship::{LIST_PREFIX, Relationship, TABLE_PREFIX, related_class_name};
use crate::schema::{AttributeKind, SchemaClass};
use crate::settings::ShapeMerge;
use serde_json::{Map, Value};
use tracing::{debug, info};

/// Keys of a table element starting with this prefix are index field candidates.
const INDEX_FIELD_PREFIX: &str = "id";

/// Walks JSON fragments and writes the inferred classes into a registry.
pub struct SchemaInferrer<'r> {
    registry: &'r mut SchemaRegistry,
    merge: ShapeMerge,
}

impl<'r> SchemaInferrer<'r> {
    #[must_use]
    pub fn new(registry: &'r mut SchemaRegistry, merge: ShapeMerge) -> Self {
        Self { registry, merge }
    }

    /// Infer `class_name` from `fragment`, recursing into every nested
    /// object and array, and return the class as stored in the registry.
    ///
    /// Every visited class name is inserted or updated in the registry. With
    /// `ShapeMerge::Overwrite` a later visit of the same name replaces the
    /// shape of the earlier one.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedFragment` if `fragment` (or any array element) is
    /// not an object, `SchemaConflict` if a member name is declared twice,
    /// and `RegistryFrozen` once inference is over.
    pub fn infer_class(
        &mut self,
        class_name: &str,
        fragment: &Value,
    ) -> Result<&SchemaClass, JsonClassGenError> {
        self.visit(class_name, fragment, &JsonPointer::root())?;
        self.registry.require(class_name)
    }

    fn visit(
        &mut self,
        class_name: &str,
        fragment: &Value,
        pointer: &JsonPointer,
    ) -> Result<(), JsonClassGenError> {
        let Value::Object(members) = fragment else {
            return Err(JsonClassGenError::UnsupportedFragment {
                class_name: class_name.to_string(),
                pointer: pointer.to_string(),
                expected: "an object",
                found: json_pointer::kind_of(fragment),
            });
        };
        debug!(class_name, %pointer, keys = members.len(), "inferring class");

        self.registry.touch(class_name)?;
        let mut class = SchemaClass::new(class_name, self.registry.namespace());
        for (key, value) in members {
            let at: JsonPointer = pointer.key(key);
            match value {
                Value::Array(elements) => self.visit_list(&mut class, key, elements, &at)?,
                Value::Object(entries) if key.starts_with(TABLE_PREFIX) => {
                    self.visit_table(&mut class, key, entries, &at)?;
                }
                Value::Object(_) => self.visit_nested(&mut class, key, value, &at)?,
                scalar => {
                    if let Some(kind) = AttributeKind::of(scalar) {
                        class.add_attribute(key, kind)?;
                    }
                }
            }
        }
        self.registry.merge_shape(class, self.merge)
    }

    /// An array is an unindexed one-to-many relationship.
    fn visit_list(
        &mut self,
        class: &mut SchemaClass,
        key: &str,
        elements: &[Value],
        pointer: &JsonPointer,
    ) -> Result<(), JsonClassGenError> {
        let related: String = related_class_name(key, LIST_PREFIX);
        let relationship = Relationship::one_to_many(&related, class.name(), &related, key);
        class.add_relationship(relationship)?;
        for (index, element) in elements.iter().enumerate() {
            self.visit(&related, element, &pointer.index(index))?;
        }
        Ok(())
    }

    /// A `table_` object is a one-to-many relationship indexed by a field of
    /// its elements.
    fn visit_table(
        &mut self,
        class: &mut SchemaClass,
        key: &str,
        entries: &Map<String, Value>,
        pointer: &JsonPointer,
    ) -> Result<(), JsonClassGenError> {
        let related: String = related_class_name(key, TABLE_PREFIX);
        let index_field: String = entries
            .values()
            .next()
            .and_then(Value::as_object)
            .and_then(|sample| {
                sample
                    .keys()
                    .find(|candidate| candidate.starts_with(INDEX_FIELD_PREFIX))
                    .cloned()
            })
            .unwrap_or_else(|| format!("id_{related}"));
        let relationship =
            Relationship::indexed(&related, class.name(), &related, &index_field, key);
        class.add_relationship(relationship)?;
        for (entry_key, value) in entries {
            self.visit(&related, value, &pointer.key(entry_key))?;
        }
        Ok(())
    }

    /// Any other object is a one-to-one relationship to a class named by the key.
    fn visit_nested(
        &mut self,
        class: &mut SchemaClass,
        key: &str,
        value: &Value,
        pointer: &JsonPointer,
    ) -> Result<(), JsonClassGenError> {
        let relationship = Relationship::one_to_one(key, class.name(), key, key);
        class.add_relationship(relationship)?;
        self.visit(key, value, pointer)
    }
}

/// Infer a whole document into a fresh registry whose root class is `root_name`.
///
/// # Errors
///
/// Returns the errors of `SchemaInferrer::infer_class`.
pub fn infer_document(
    root_name: &str,
    document: &Value,
    namespace: &str,
    merge: ShapeMerge,
) -> Result<SchemaRegistry, JsonClassGenError> {
    let mut registry = SchemaRegistry::new(namespace);
    registry.set_root_name(root_name);
    SchemaInferrer::new(&mut registry, merge).infer_class(root_name, document)?;
    info!(
        root = root_name,
        classes = registry.len(),
        "schema inference finished"
    );
    Ok(registry)
}
