//! Binds generated artifacts to constructible type handles.

use crate::error::JsonClassGenError;
use crate::instance::Instance;
use crate::registry::SchemaRegistry;
use crate::relationship::Relationship;
use crate::schema::{ArtifactRef, AttributeKind, SchemaClass};
use serde_json::Value;
use std::collections::BTreeMap;
use std::rc::Rc;
use tracing::{debug, info};

/// Constructor arguments by attribute name. `None` is the absent marker.
pub type Parameters = Vec<(String, Option<Value>)>;

/// A loaded class: the constructor signature and relationship storage of the
/// generated struct its artifact declares.
#[derive(Debug)]
pub struct LoadedType {
    class_name: String,
    namespace: String,
    artifact: ArtifactRef,
    parameters: Vec<(String, AttributeKind)>,
    relationships: Vec<Relationship>,
}

/// Shared handle to a loaded class. Loading the same class twice yields the
/// same handle.
pub type TypeHandle = Rc<LoadedType>;

impl LoadedType {
    fn bind(class: &SchemaClass, artifact: &ArtifactRef) -> Self {
        Self {
            class_name: class.name().to_string(),
            namespace: class.namespace().to_string(),
            artifact: artifact.clone(),
            parameters: class.attributes().to_vec(),
            relationships: class.relationships().to_vec(),
        }
    }

    #[must_use]
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    #[must_use]
    pub fn artifact(&self) -> &ArtifactRef {
        &self.artifact
    }

    /// Constructor parameters in declaration order.
    #[must_use]
    pub fn parameters(&self) -> &[(String, AttributeKind)] {
        &self.parameters
    }

    /// Construct an instance, like calling the generated `new`. Parameters
    /// that are not supplied are absent; every relationship starts empty.
    ///
    /// # Errors
    ///
    /// Returns `UnknownAttribute` if a parameter names no attribute of the class.
    pub fn construct(&self, parameters: Parameters) -> Result<Instance, JsonClassGenError> {
        let mut instance = Instance::empty(
            &self.class_name,
            self.parameters.iter().map(|(name, _)| name.as_str()),
            &self.relationships,
        );
        for (name, value) in parameters {
            instance.set_attribute(&name, value)?;
        }
        Ok(instance)
    }
}

/// Table of loaded classes, keyed by class name.
#[derive(Debug, Default)]
pub struct TypeLoader {
    types: BTreeMap<String, TypeHandle>,
}

impl TypeLoader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the generated artifact of `class_name` and record the handle on
    /// the registry class. Idempotent: a class loaded before returns its
    /// existing handle.
    ///
    /// # Errors
    ///
    /// Returns `ClassNotFound` for an unknown class and `NotGenerated` if no
    /// artifact was generated for it.
    pub fn load(
        &mut self,
        registry: &mut SchemaRegistry,
        class_name: &str,
    ) -> Result<TypeHandle, JsonClassGenError> {
        if let Some(handle) = self.types.get(class_name) {
            return Ok(Rc::clone(handle));
        }
        let class: &SchemaClass = registry.require(class_name)?;
        let artifact: &ArtifactRef =
            class
                .generated_artifact()
                .ok_or_else(|| JsonClassGenError::NotGenerated {
                    class_name: class_name.to_string(),
                })?;
        let handle: TypeHandle = Rc::new(LoadedType::bind(class, artifact));
        debug!(
            class_name,
            module = %handle.artifact.module_path,
            "loaded generated type"
        );
        registry.record_type_handle(class_name, Rc::clone(&handle))?;
        self.types.insert(class_name.to_string(), Rc::clone(&handle));
        Ok(handle)
    }

    /// Load every class of the registry.
    ///
    /// # Errors
    ///
    /// Returns the first error of `load`.
    pub fn load_all(&mut self, registry: &mut SchemaRegistry) -> Result<(), JsonClassGenError> {
        let names: Vec<String> = registry.class_names().to_vec();
        for name in &names {
            self.load(registry, name)?;
        }
        info!(types = self.types.len(), "generated types loaded");
        Ok(())
    }

    #[must_use]
    pub fn get(&self, class_name: &str) -> Option<&TypeHandle> {
        self.types.get(class_name)
    }

    /// Construct an instance of a loaded class by name.
    ///
    /// # Errors
    ///
    /// Returns `TypeNotLoaded` if the class was never loaded, and the errors
    /// of `LoadedType::construct`.
    pub fn construct(
        &self,
        class_name: &str,
        parameters: Parameters,
    ) -> Result<Instance, JsonClassGenError> {
        self.types
            .get(class_name)
            .ok_or_else(|| JsonClassGenError::TypeNotLoaded {
                class_name: class_name.to_string(),
            })?
            .construct(parameters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen;
    use crate::infer::infer_document;
    use crate::settings::ShapeMerge;
    use serde_json::json;

    fn generated_registry() -> SchemaRegistry {
        let document = json!({
            "id": "b1",
            "produits": [ { "id": "p1", "nom": "chaise" } ]
        });
        let mut registry =
            infer_document("boutique", &document, "generated", ShapeMerge::Overwrite)
                .expect("inference should succeed");
        codegen::generate_all(&mut registry).expect("generation should succeed");
        registry
    }

    #[test]
    fn load_before_generation_fails() {
        let document = json!({ "id": "b1" });
        let mut registry =
            infer_document("boutique", &document, "generated", ShapeMerge::Overwrite)
                .expect("inference should succeed");
        let result = TypeLoader::new().load(&mut registry, "boutique");
        assert!(matches!(
            result,
            Err(JsonClassGenError::NotGenerated { ref class_name }) if class_name == "boutique"
        ));
    }

    #[test]
    fn load_is_idempotent_and_recorded_on_the_class() {
        let mut registry = generated_registry();
        let mut loader = TypeLoader::new();
        let first = loader.load(&mut registry, "produit").expect("produit loads");
        let second = loader.load(&mut registry, "produit").expect("produit loads");
        assert!(Rc::ptr_eq(&first, &second));

        let recorded = registry
            .require("produit")
            .expect("produit exists")
            .type_handle()
            .expect("handle is recorded");
        assert!(Rc::ptr_eq(&first, recorded));
        assert_eq!("generated::produit", first.artifact().module_path);
    }

    #[test]
    fn construct_by_name_with_partial_parameters() {
        let mut registry = generated_registry();
        let mut loader = TypeLoader::new();
        loader.load_all(&mut registry).expect("every class loads");

        let produit = loader
            .construct("produit", vec![("nom".to_string(), Some(json!("chaise")))])
            .expect("nom is a parameter");
        assert_eq!(None, produit.attribute("id").expect("id is declared"));
        assert_eq!("nom: chaise", produit.dump());
    }

    #[test]
    fn construct_rejects_unknown_parameters() {
        let mut registry = generated_registry();
        let mut loader = TypeLoader::new();
        loader.load_all(&mut registry).expect("every class loads");
        let result = loader.construct("produit", vec![("prix".to_string(), Some(json!(3)))]);
        assert!(matches!(
            result,
            Err(JsonClassGenError::UnknownAttribute { ref attribute, .. }) if attribute == "prix"
        ));
    }

    #[test]
    fn construct_unloaded_type_fails() {
        let loader = TypeLoader::new();
        assert!(matches!(
            loader.construct("produit", Vec::new()),
            Err(JsonClassGenError::TypeNotLoaded { .. })
        ));
    }
}
