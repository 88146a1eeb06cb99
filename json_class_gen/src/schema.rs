//! Inferred description of one entity type.

use crate::error::JsonClassGenError;
use crate::loader::TypeHandle;
use crate::relationship::Relationship;
use crate::settings::ShapeMerge;
use serde::Serialize;
use std::fmt;

/// JSON primitive kind of an attribute. `Any` is inferred from `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    String,
    Number,
    Boolean,
    Any,
}

impl AttributeKind {
    /// Kind of a scalar JSON value; `None` for arrays and objects.
    #[must_use]
    pub fn of(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(_) => Some(Self::String),
            serde_json::Value::Number(_) => Some(Self::Number),
            serde_json::Value::Bool(_) => Some(Self::Boolean),
            serde_json::Value::Null => Some(Self::Any),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
        }
    }

    /// The Rust type a generated field of this kind holds (inside `Option`).
    #[must_use]
    pub fn rust_type(self) -> &'static str {
        match self {
            Self::String => "String",
            Self::Number => "f64",
            Self::Boolean => "bool",
            Self::Any => "serde_json::Value",
        }
    }
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name: &str = match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Any => "any",
        };
        f.write_str(name)
    }
}

/// Where the generated source of a class lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactRef {
    /// Path of the generated module, e.g. `generated::ligne_commande`.
    pub module_path: String,
    /// File name of the artifact, e.g. `ligne_commande.rs`.
    pub file_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SchemaClass {
    name: String,
    namespace: String,
    attributes: Vec<(String, AttributeKind)>,
    relationships: Vec<Relationship>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generated_artifact: Option<ArtifactRef>,
    #[serde(skip)]
    type_handle: Option<TypeHandle>,
}

impl SchemaClass {
    #[must_use]
    pub fn new(name: &str, namespace: &str) -> Self {
        Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
            attributes: Vec::new(),
            relationships: Vec::new(),
            generated_artifact: None,
            type_handle: None,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// `namespace::name`, or just the name when the namespace is empty.
    #[must_use]
    pub fn fully_qualified_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}::{}", self.namespace, self.name)
        }
    }

    /// Attributes in insertion order.
    #[must_use]
    pub fn attributes(&self) -> &[(String, AttributeKind)] {
        &self.attributes
    }

    #[must_use]
    pub fn attribute_kind(&self, name: &str) -> Option<AttributeKind> {
        self.attributes
            .iter()
            .find(|(attribute, _)| attribute == name)
            .map(|(_, kind)| *kind)
    }

    #[must_use]
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute_kind(name).is_some()
    }

    /// Relationships in insertion order.
    #[must_use]
    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    #[must_use]
    pub fn relationship(&self, name: &str) -> Option<&Relationship> {
        self.relationships.iter().find(|r| r.name() == name)
    }

    #[must_use]
    pub fn generated_artifact(&self) -> Option<&ArtifactRef> {
        self.generated_artifact.as_ref()
    }

    #[must_use]
    pub fn type_handle(&self) -> Option<&TypeHandle> {
        self.type_handle.as_ref()
    }

    /// True when the class has neither attributes nor relationships.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.relationships.is_empty()
    }

    /// Register an attribute.
    ///
    /// # Errors
    ///
    /// Returns `SchemaConflict` if the name is already an attribute or a relationship.
    pub fn add_attribute(
        &mut self,
        name: &str,
        kind: AttributeKind,
    ) -> Result<(), JsonClassGenError> {
        if self.has_attribute(name) || self.relationship(name).is_some() {
            return Err(self.conflict(format!("'{name}' is declared twice")));
        }
        self.attributes.push((name.to_string(), kind));
        Ok(())
    }

    /// Register a relationship.
    ///
    /// # Errors
    ///
    /// Returns `SchemaConflict` if the name is already an attribute or a relationship.
    pub fn add_relationship(
        &mut self,
        relationship: Relationship,
    ) -> Result<(), JsonClassGenError> {
        let name: &str = relationship.name();
        if self.has_attribute(name) || self.relationship(name).is_some() {
            return Err(self.conflict(format!("'{name}' is declared twice")));
        }
        self.relationships.push(relationship);
        Ok(())
    }

    /// Combine the shape inferred by a later visit into this class.
    ///
    /// # Errors
    ///
    /// With `ShapeMerge::Union`, returns `SchemaConflict` when an attribute
    /// changes kind, when a relationship changes descriptor, or when a name
    /// switches between attribute and relationship.
    pub(crate) fn merge_shape(
        &mut self,
        later: Self,
        merge: ShapeMerge,
    ) -> Result<(), JsonClassGenError> {
        match merge {
            ShapeMerge::Overwrite => {
                self.attributes = later.attributes;
                self.relationships = later.relationships;
                Ok(())
            }
            ShapeMerge::Union => self.union_shape(later),
        }
    }

    fn union_shape(&mut self, later: Self) -> Result<(), JsonClassGenError> {
        for (name, kind) in later.attributes {
            match self.attribute_kind(&name) {
                None => self.add_attribute(&name, kind)?,
                Some(existing) if existing == kind || kind == AttributeKind::Any => {}
                Some(AttributeKind::Any) => {
                    if let Some(slot) = self.attributes.iter_mut().find(|(n, _)| *n == name) {
                        slot.1 = kind;
                    }
                }
                Some(existing) => {
                    return Err(self.conflict(format!(
                        "attribute '{name}' is {existing} in one fragment and {kind} in another"
                    )));
                }
            }
        }
        for relationship in later.relationships {
            match self.relationship(relationship.name()) {
                None => self.add_relationship(relationship)?,
                Some(existing) if *existing == relationship => {}
                Some(existing) => {
                    return Err(self.conflict(format!(
                        "relationship '{existing}' conflicts with '{relationship}'"
                    )));
                }
            }
        }
        Ok(())
    }

    pub(crate) fn set_generated_artifact(&mut self, artifact: ArtifactRef) {
        self.generated_artifact = Some(artifact);
    }

    pub(crate) fn set_type_handle(&mut self, handle: TypeHandle) {
        self.type_handle = Some(handle);
    }

    fn conflict(&self, detail: String) -> JsonClassGenError {
        JsonClassGenError::SchemaConflict {
            class_name: self.name.clone(),
            detail,
        }
    }
}

impl fmt::Display for SchemaClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.fully_qualified_name())?;
        writeln!(f, "  attributes:")?;
        for (name, kind) in &self.attributes {
            writeln!(f, "    {name}: {kind}")?;
        }
        writeln!(f, "  relationships:")?;
        for relationship in &self.relationships {
            writeln!(f, "    {relationship}")?;
        }
        Ok(())
    }
}
