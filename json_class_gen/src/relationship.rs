//! Links between inferred classes.

use serde::Serialize;
use std::fmt;

/// Prefix of document keys holding an unindexed one-to-many relation.
pub const LIST_PREFIX: &str = "liste_";

/// Prefix of document keys holding an indexed one-to-many relation.
pub const TABLE_PREFIX: &str = "table_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Multiplicity {
    OneToOne,
    OneToMany,
}

impl fmt::Display for Multiplicity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OneToOne => f.write_str("one-to-one"),
            Self::OneToMany => f.write_str("one-to-many"),
        }
    }
}

/// How instances store the contents of a relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageShape<'a> {
    /// A single optional slot.
    Single,
    /// An ordered sequence.
    Sequence,
    /// A mapping keyed by the value of `index_field` on each element.
    Indexed { index_field: &'a str },
}

/// Immutable descriptor of a link from `owner_class` to `target_class`.
///
/// The constructors are the only way to build one, so a one-to-one
/// relationship never carries an index field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relationship {
    name: String,
    owner_class: String,
    target_class: String,
    multiplicity: Multiplicity,
    #[serde(skip_serializing_if = "Option::is_none")]
    index_field: Option<String>,
    json_key: String,
}

impl Relationship {
    #[must_use]
    pub fn one_to_one(name: &str, owner_class: &str, target_class: &str, json_key: &str) -> Self {
        Self {
            name: name.to_string(),
            owner_class: owner_class.to_string(),
            target_class: target_class.to_string(),
            multiplicity: Multiplicity::OneToOne,
            index_field: None,
            json_key: json_key.to_string(),
        }
    }

    /// An unindexed one-to-many relationship, stored as a sequence.
    #[must_use]
    pub fn one_to_many(name: &str, owner_class: &str, target_class: &str, json_key: &str) -> Self {
        Self {
            name: name.to_string(),
            owner_class: owner_class.to_string(),
            target_class: target_class.to_string(),
            multiplicity: Multiplicity::OneToMany,
            index_field: None,
            json_key: json_key.to_string(),
        }
    }

    /// A one-to-many relationship stored as a mapping keyed by `index_field`.
    #[must_use]
    pub fn indexed(
        name: &str,
        owner_class: &str,
        target_class: &str,
        index_field: &str,
        json_key: &str,
    ) -> Self {
        Self {
            name: name.to_string(),
            owner_class: owner_class.to_string(),
            target_class: target_class.to_string(),
            multiplicity: Multiplicity::OneToMany,
            index_field: Some(index_field.to_string()),
            json_key: json_key.to_string(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn owner_class(&self) -> &str {
        &self.owner_class
    }

    #[must_use]
    pub fn target_class(&self) -> &str {
        &self.target_class
    }

    #[must_use]
    pub fn multiplicity(&self) -> Multiplicity {
        self.multiplicity
    }

    #[must_use]
    pub fn index_field(&self) -> Option<&str> {
        self.index_field.as_deref()
    }

    /// The document key this relationship was inferred from.
    #[must_use]
    pub fn json_key(&self) -> &str {
        &self.json_key
    }

    #[must_use]
    pub fn is_indexed(&self) -> bool {
        self.index_field.is_some()
    }

    #[must_use]
    pub fn storage_shape(&self) -> StorageShape<'_> {
        match (self.multiplicity, self.index_field.as_deref()) {
            (Multiplicity::OneToOne, _) => StorageShape::Single,
            (Multiplicity::OneToMany, None) => StorageShape::Sequence,
            (Multiplicity::OneToMany, Some(index_field)) => StorageShape::Indexed { index_field },
        }
    }

    /// Name of the storage holding this relationship: `liste_{name}s` for a
    /// sequence, `table_{name}s` for a mapping, the name itself for a single slot.
    #[must_use]
    pub fn storage_key(&self) -> String {
        match self.storage_shape() {
            StorageShape::Single => self.name.clone(),
            StorageShape::Sequence => format!("{LIST_PREFIX}{}s", self.name),
            StorageShape::Indexed { .. } => format!("{TABLE_PREFIX}{}s", self.name),
        }
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} -> {} ({}",
            self.name, self.owner_class, self.target_class, self.multiplicity
        )?;
        if let Some(index_field) = &self.index_field {
            write!(f, ", indexed by {index_field}")?;
        }
        f.write_str(")")
    }
}

/// Derive the related class name from a document key: strip `prefix` if
/// present, then strip one trailing `s` if present.
#[must_use]
pub fn related_class_name(key: &str, prefix: &str) -> String {
    let stripped: &str = key.strip_prefix(prefix).unwrap_or(key);
    stripped.strip_suffix('s').unwrap_or(stripped).to_string()
}
