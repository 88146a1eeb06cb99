use std::error;
use std::fmt;

/// Error type for schema inference, code generation, loading and materialization.
#[derive(Debug)]
pub enum JsonClassGenError {
    /// Generic error with a message.
    GenericError(String),

    /// I/O error (e.g., reading the input document, writing artifacts).
    IoError(std::io::Error),

    /// JSON parsing error.
    JsonError(serde_json::Error),

    /// Two incompatible shapes were inferred for the same class or member name.
    SchemaConflict { class_name: String, detail: String },

    /// An attribute name that the class does not declare.
    UnknownAttribute {
        class_name: String,
        attribute: String,
    },

    /// A relationship name that the class does not declare.
    UnknownRelationship {
        class_name: String,
        relationship: String,
    },

    /// Keyed lookup on a relationship that is not indexed.
    NotIndexed {
        class_name: String,
        relationship: String,
    },

    /// An instance of the wrong class was passed to a relationship accessor.
    TypeMismatch {
        class_name: String,
        relationship: String,
        expected: String,
        found: String,
    },

    /// A class name (usually a relationship target) is missing from the registry.
    ClassNotFound {
        class_name: String,
        relationship: Option<String>,
    },

    /// Loading was attempted before code generation for the class.
    NotGenerated { class_name: String },

    /// Materialization was attempted before the class was loaded.
    TypeNotLoaded { class_name: String },

    /// A fragment of the wrong JSON kind (e.g. a scalar array element).
    UnsupportedFragment {
        class_name: String,
        pointer: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A shape write after the registry was frozen.
    RegistryFrozen { class_name: String },

    /// The frozen registry has issues and strict validation was requested.
    SchemaValidation(SchemaValidationError),
}

impl error::Error for JsonClassGenError {}

impl fmt::Display for JsonClassGenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GenericError(message) => write!(f, "{message}"),
            Self::IoError(io_error) => fmt::Display::fmt(io_error, f),
            Self::JsonError(json_error) => fmt::Display::fmt(json_error, f),
            Self::SchemaConflict { class_name, detail } => {
                write!(f, "schema conflict in class '{class_name}': {detail}")
            }
            Self::UnknownAttribute {
                class_name,
                attribute,
            } => write!(
                f,
                "attribute '{attribute}' does not exist in class '{class_name}'"
            ),
            Self::UnknownRelationship {
                class_name,
                relationship,
            } => write!(
                f,
                "relationship '{relationship}' does not exist in class '{class_name}'"
            ),
            Self::NotIndexed {
                class_name,
                relationship,
            } => write!(
                f,
                "relationship '{relationship}' of class '{class_name}' is not indexed"
            ),
            Self::TypeMismatch {
                class_name,
                relationship,
                expected,
                found,
            } => write!(
                f,
                "relationship '{relationship}' of class '{class_name}' expects '{expected}', got '{found}'"
            ),
            Self::ClassNotFound {
                class_name,
                relationship: Some(relationship),
            } => write!(
                f,
                "class '{class_name}' targeted by relationship '{relationship}' is not in the registry"
            ),
            Self::ClassNotFound {
                class_name,
                relationship: None,
            } => write!(f, "class '{class_name}' is not in the registry"),
            Self::NotGenerated { class_name } => {
                write!(f, "no code has been generated for class '{class_name}'")
            }
            Self::TypeNotLoaded { class_name } => {
                write!(f, "type for class '{class_name}' has not been loaded")
            }
            Self::UnsupportedFragment {
                class_name,
                pointer,
                expected,
                found,
            } => write!(
                f,
                "class '{class_name}' expects {expected} at '{pointer}', found {found}"
            ),
            Self::RegistryFrozen { class_name } => write!(
                f,
                "registry is frozen; cannot change the shape of class '{class_name}'"
            ),
            Self::SchemaValidation(validation_error) => fmt::Display::fmt(validation_error, f),
        }
    }
}

impl From<&str> for JsonClassGenError {
    fn from(message: &str) -> Self {
        Self::GenericError(message.to_string())
    }
}

impl From<String> for JsonClassGenError {
    fn from(message: String) -> Self {
        Self::GenericError(message)
    }
}

impl From<std::io::Error> for JsonClassGenError {
    fn from(io_error: std::io::Error) -> Self {
        Self::IoError(io_error)
    }
}

impl From<serde_json::Error> for JsonClassGenError {
    fn from(json_error: serde_json::Error) -> Self {
        Self::JsonError(json_error)
    }
}

impl From<SchemaValidationError> for JsonClassGenError {
    fn from(validation_error: SchemaValidationError) -> Self {
        Self::SchemaValidation(validation_error)
    }
}

/// What is wrong with one class member of a frozen registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaIssueKind {
    /// The relationship target is not a class in the registry.
    UnresolvedTarget { target_class: String },
    /// The index field is not an attribute of the target class.
    IndexFieldNotAttribute {
        target_class: String,
        index_field: String,
    },
    /// Two members of the class map to the same generated identifier.
    IdentifierCollision { other: String, identifier: String },
}

/// A single issue found while validating a registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaIssue {
    pub class_name: String,
    pub member: String,
    pub kind: SchemaIssueKind,
}

impl fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            class_name,
            member,
            kind,
        } = self;
        match kind {
            SchemaIssueKind::UnresolvedTarget { target_class } => write!(
                f,
                "{class_name}.{member}: target class '{target_class}' is not in the registry"
            ),
            SchemaIssueKind::IndexFieldNotAttribute {
                target_class,
                index_field,
            } => write!(
                f,
                "{class_name}.{member}: index field '{index_field}' is not an attribute of '{target_class}'"
            ),
            SchemaIssueKind::IdentifierCollision { other, identifier } => write!(
                f,
                "{class_name}.{member}: generated identifier '{identifier}' collides with '{other}'"
            ),
        }
    }
}

/// All issues collected from one registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaValidationError {
    pub issues: Vec<SchemaIssue>,
}

impl error::Error for SchemaValidationError {}

impl fmt::Display for SchemaValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} schema issue(s)", self.issues.len())?;
        for issue in &self.issues {
            write!(f, "\n  {issue}")?;
        }
        Ok(())
    }
}
