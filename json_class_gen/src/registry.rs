//! The registry of inferred classes shared by every pipeline stage.

use crate::error::JsonClassGenError;
use crate::loader::TypeHandle;
use crate::schema::{ArtifactRef, SchemaClass};
use crate::settings::ShapeMerge;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Mapping from class name to `SchemaClass`.
///
/// Populated during inference, then frozen: after `freeze` the shape of a
/// class can no longer change, only its artifact ref and type handle are
/// recorded. Classes iterate in the order inference first encountered them.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    namespace: String,
    root_name: Option<String>,
    classes: BTreeMap<String, SchemaClass>,
    order: Vec<String>,
    frozen: bool,
}

#[derive(Serialize)]
struct RegistrySnapshot<'a> {
    namespace: &'a str,
    root: Option<&'a str>,
    classes: Vec<&'a SchemaClass>,
}

impl SchemaRegistry {
    /// An empty registry whose classes belong to `namespace`.
    #[must_use]
    pub fn new(namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Name of the class inferred from the whole document, once known.
    #[must_use]
    pub fn root_name(&self) -> Option<&str> {
        self.root_name.as_deref()
    }

    pub(crate) fn set_root_name(&mut self, root_name: &str) {
        self.root_name = Some(root_name.to_string());
    }

    #[must_use]
    pub fn get(&self, class_name: &str) -> Option<&SchemaClass> {
        self.classes.get(class_name)
    }

    /// Look up a class that must exist.
    ///
    /// # Errors
    ///
    /// Returns `ClassNotFound` if no class has this name.
    pub fn require(&self, class_name: &str) -> Result<&SchemaClass, JsonClassGenError> {
        self.classes
            .get(class_name)
            .ok_or_else(|| JsonClassGenError::ClassNotFound {
                class_name: class_name.to_string(),
                relationship: None,
            })
    }

    /// The root class.
    ///
    /// # Errors
    ///
    /// Returns `GenericError` before inference ran, `ClassNotFound` if the
    /// root is missing.
    pub fn root(&self) -> Result<&SchemaClass, JsonClassGenError> {
        let root_name: &str = self
            .root_name
            .as_deref()
            .ok_or("registry has no root class; run inference first")?;
        self.require(root_name)
    }

    #[must_use]
    pub fn contains(&self, class_name: &str) -> bool {
        self.classes.contains_key(class_name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Class names in first-encounter order.
    #[must_use]
    pub fn class_names(&self) -> &[String] {
        &self.order
    }

    /// Classes in first-encounter order.
    pub fn iter(&self) -> impl Iterator<Item = &SchemaClass> + '_ {
        self.order.iter().filter_map(|name| self.classes.get(name))
    }

    /// End the inference stage. Idempotent.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Create an empty entry for `class_name` if this is its first encounter.
    pub(crate) fn touch(&mut self, class_name: &str) -> Result<(), JsonClassGenError> {
        self.ensure_writable(class_name)?;
        if !self.classes.contains_key(class_name) {
            self.classes.insert(
                class_name.to_string(),
                SchemaClass::new(class_name, &self.namespace),
            );
            self.order.push(class_name.to_string());
        }
        Ok(())
    }

    /// Write the shape inferred by one visit into the registry.
    pub(crate) fn merge_shape(
        &mut self,
        class: SchemaClass,
        merge: ShapeMerge,
    ) -> Result<(), JsonClassGenError> {
        self.touch(class.name())?;
        let existing: &mut SchemaClass = self
            .classes
            .get_mut(class.name())
            .ok_or_else(|| JsonClassGenError::ClassNotFound {
                class_name: class.name().to_string(),
                relationship: None,
            })?;
        existing.merge_shape(class, merge)
    }

    pub(crate) fn record_artifact(
        &mut self,
        class_name: &str,
        artifact: ArtifactRef,
    ) -> Result<(), JsonClassGenError> {
        self.class_mut(class_name)?.set_generated_artifact(artifact);
        Ok(())
    }

    pub(crate) fn record_type_handle(
        &mut self,
        class_name: &str,
        handle: TypeHandle,
    ) -> Result<(), JsonClassGenError> {
        self.class_mut(class_name)?.set_type_handle(handle);
        Ok(())
    }

    /// The registry as JSON: namespace, root and every class in order.
    ///
    /// # Errors
    ///
    /// Returns `JsonError` if serialization fails.
    pub fn to_json(&self) -> Result<serde_json::Value, JsonClassGenError> {
        let snapshot = RegistrySnapshot {
            namespace: &self.namespace,
            root: self.root_name.as_deref(),
            classes: self.iter().collect(),
        };
        Ok(serde_json::to_value(snapshot)?)
    }

    fn class_mut(&mut self, class_name: &str) -> Result<&mut SchemaClass, JsonClassGenError> {
        self.classes
            .get_mut(class_name)
            .ok_or_else(|| JsonClassGenError::ClassNotFound {
                class_name: class_name.to_string(),
                relationship: None,
            })
    }

    fn ensure_writable(&self, class_name: &str) -> Result<(), JsonClassGenError> {
        if self.frozen {
            return Err(JsonClassGenError::RegistryFrozen {
                class_name: class_name.to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for SchemaRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for class in self.iter() {
            write!(f, "{class}")?;
        }
        Ok(())
    }
}
