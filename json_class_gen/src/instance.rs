//! Live objects built through loaded type handles.
//!
//! An `Instance` behaves exactly like a value of the struct generated for its
//! class: the same constructor parameters, the same relationship storage and
//! accessor semantics, and the same textual dump.

use crate::error::JsonClassGenError;
use crate::relationship::{Relationship, StorageShape};
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;

/// Dump of an instance that has no attribute value and no related instance.
pub const EMPTY_DUMP: &str = "Empty JSONClass Object";

/// Render a scalar the way generated code displays it: strings without
/// quotes, numbers through `f64`, anything else as JSON text.
#[must_use]
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => number
            .as_f64()
            .map_or_else(|| number.to_string(), |float| float.to_string()),
        other => other.to_string(),
    }
}

/// Key under which an indexed relationship stores an element whose index
/// field holds `value`. An absent value maps to the empty key.
#[must_use]
pub fn index_key(value: Option<&Value>) -> String {
    value.map(render_value).unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq)]
enum RelationStore {
    Single(Option<Box<Instance>>),
    Sequence(Vec<Instance>),
    Indexed {
        index_field: String,
        entries: IndexMap<String, Instance>,
    },
}

#[derive(Debug, Clone, PartialEq)]
struct RelationSlot {
    name: String,
    target_class: String,
    store: RelationStore,
}

impl RelationSlot {
    fn empty(relationship: &Relationship) -> Self {
        let store = match relationship.storage_shape() {
            StorageShape::Single => RelationStore::Single(None),
            StorageShape::Sequence => RelationStore::Sequence(Vec::new()),
            StorageShape::Indexed { index_field } => RelationStore::Indexed {
                index_field: index_field.to_string(),
                entries: IndexMap::new(),
            },
        };
        Self {
            name: relationship.name().to_string(),
            target_class: relationship.target_class().to_string(),
            store,
        }
    }

    fn iter(&self) -> RelationIter<'_> {
        match &self.store {
            RelationStore::Single(slot) => RelationIter::Single(slot.as_deref().into_iter()),
            RelationStore::Sequence(items) => RelationIter::Sequence(items.iter()),
            RelationStore::Indexed { entries, .. } => RelationIter::Indexed(entries.values()),
        }
    }
}

/// Iterator over the current contents of one relationship, values only.
#[derive(Debug, Clone)]
pub enum RelationIter<'a> {
    Single(std::option::IntoIter<&'a Instance>),
    Sequence(std::slice::Iter<'a, Instance>),
    Indexed(indexmap::map::Values<'a, String, Instance>),
}

impl<'a> Iterator for RelationIter<'a> {
    type Item = &'a Instance;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Self::Single(inner) => inner.next(),
            Self::Sequence(inner) => inner.next(),
            Self::Indexed(inner) => inner.next(),
        }
    }
}

/// An object of a loaded class.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    class_name: String,
    attributes: Vec<(String, Option<Value>)>,
    relations: Vec<RelationSlot>,
}

impl Instance {
    /// An instance with every attribute absent and every relationship empty.
    pub(crate) fn empty<'a>(
        class_name: &str,
        attribute_names: impl IntoIterator<Item = &'a str>,
        relationships: &[Relationship],
    ) -> Self {
        Self {
            class_name: class_name.to_string(),
            attributes: attribute_names
                .into_iter()
                .map(|name| (name.to_string(), None))
                .collect(),
            relations: relationships.iter().map(RelationSlot::empty).collect(),
        }
    }

    #[must_use]
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Current value of an attribute; `None` when absent.
    ///
    /// # Errors
    ///
    /// Returns `UnknownAttribute` if the class declares no such attribute.
    pub fn attribute(&self, name: &str) -> Result<Option<&Value>, JsonClassGenError> {
        self.attributes
            .iter()
            .find(|(attribute, _)| attribute == name)
            .map(|(_, value)| value.as_ref())
            .ok_or_else(|| self.unknown_attribute(name))
    }

    /// Set an attribute; `None` and JSON `null` make it absent.
    ///
    /// # Errors
    ///
    /// Returns `UnknownAttribute` if the class declares no such attribute.
    pub fn set_attribute(
        &mut self,
        name: &str,
        value: Option<Value>,
    ) -> Result<(), JsonClassGenError> {
        let unknown = self.unknown_attribute(name);
        let slot: &mut Option<Value> = self
            .attributes
            .iter_mut()
            .find(|(attribute, _)| attribute == name)
            .map(|(_, value)| value)
            .ok_or(unknown)?;
        *slot = value.filter(|v| !v.is_null());
        Ok(())
    }

    /// Add `item` to a relationship: append to a sequence, store under the
    /// item's index value in a mapping (replacing any entry with that key),
    /// or fill a single slot.
    ///
    /// # Errors
    ///
    /// Returns `UnknownRelationship` for an undeclared relationship and
    /// `TypeMismatch` if `item` is not an instance of the target class.
    pub fn add(&mut self, relationship: &str, item: Self) -> Result<(), JsonClassGenError> {
        let class_name: String = self.class_name.clone();
        let slot: &mut RelationSlot = self.slot_mut(relationship)?;
        if item.class_name != slot.target_class {
            return Err(JsonClassGenError::TypeMismatch {
                class_name,
                relationship: relationship.to_string(),
                expected: slot.target_class.clone(),
                found: item.class_name,
            });
        }
        match &mut slot.store {
            RelationStore::Single(current) => *current = Some(Box::new(item)),
            RelationStore::Sequence(items) => items.push(item),
            RelationStore::Indexed {
                index_field,
                entries,
            } => {
                let key: String = item.index_value(index_field);
                entries.insert(key, item);
            }
        }
        Ok(())
    }

    /// Remove `item` from a relationship: the first equal element of a
    /// sequence, the entry under the item's index value of a mapping, or the
    /// single slot if it holds an equal instance. A no-op when nothing matches.
    ///
    /// # Errors
    ///
    /// Returns `UnknownRelationship` for an undeclared relationship.
    pub fn remove(&mut self, relationship: &str, item: &Self) -> Result<(), JsonClassGenError> {
        let slot: &mut RelationSlot = self.slot_mut(relationship)?;
        match &mut slot.store {
            RelationStore::Single(current) => {
                if current.as_deref() == Some(item) {
                    *current = None;
                }
            }
            RelationStore::Sequence(items) => {
                if let Some(position) = items.iter().position(|candidate| candidate == item) {
                    items.remove(position);
                }
            }
            RelationStore::Indexed {
                index_field,
                entries,
            } => {
                entries.shift_remove(&item.index_value(index_field));
            }
        }
        Ok(())
    }

    /// Iterate over the current contents of a relationship. Each call starts
    /// a fresh iteration.
    ///
    /// # Errors
    ///
    /// Returns `UnknownRelationship` for an undeclared relationship.
    pub fn iter(&self, relationship: &str) -> Result<RelationIter<'_>, JsonClassGenError> {
        Ok(self.slot(relationship)?.iter())
    }

    /// Keyed lookup in an indexed relationship.
    ///
    /// # Errors
    ///
    /// Returns `UnknownRelationship` for an undeclared relationship and
    /// `NotIndexed` if the relationship is not stored as a mapping.
    pub fn get(&self, relationship: &str, key: &Value) -> Result<Option<&Self>, JsonClassGenError> {
        match &self.slot(relationship)?.store {
            RelationStore::Indexed { entries, .. } => Ok(entries.get(&render_value(key))),
            RelationStore::Single(_) | RelationStore::Sequence(_) => {
                Err(JsonClassGenError::NotIndexed {
                    class_name: self.class_name.clone(),
                    relationship: relationship.to_string(),
                })
            }
        }
    }

    /// Textual dump: `name: value` for every present attribute, then
    /// `name: [{...}, {...}]` for every non-empty relationship, joined by
    /// `", "`; `EMPTY_DUMP` when there is nothing to show.
    #[must_use]
    pub fn dump(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        for (name, value) in &self.attributes {
            if let Some(value) = value {
                parts.push(format!("{name}: {}", render_value(value)));
            }
        }
        for slot in &self.relations {
            let items: Vec<String> = slot.iter().map(|item| format!("{{{item}}}")).collect();
            if !items.is_empty() {
                parts.push(format!("{}: [{}]", slot.name, items.join(", ")));
            }
        }
        if parts.is_empty() {
            return EMPTY_DUMP.to_string();
        }
        parts.join(", ")
    }

    fn index_value(&self, index_field: &str) -> String {
        let value: Option<&Value> = self
            .attributes
            .iter()
            .find(|(attribute, _)| attribute == index_field)
            .and_then(|(_, value)| value.as_ref());
        index_key(value)
    }

    fn slot(&self, relationship: &str) -> Result<&RelationSlot, JsonClassGenError> {
        self.relations
            .iter()
            .find(|slot| slot.name == relationship)
            .ok_or_else(|| self.unknown_relationship(relationship))
    }

    fn slot_mut(&mut self, relationship: &str) -> Result<&mut RelationSlot, JsonClassGenError> {
        let unknown = self.unknown_relationship(relationship);
        self.relations
            .iter_mut()
            .find(|slot| slot.name == relationship)
            .ok_or(unknown)
    }

    fn unknown_attribute(&self, name: &str) -> JsonClassGenError {
        JsonClassGenError::UnknownAttribute {
            class_name: self.class_name.clone(),
            attribute: name.to_string(),
        }
    }

    fn unknown_relationship(&self, name: &str) -> JsonClassGenError {
        JsonClassGenError::UnknownRelationship {
            class_name: self.class_name.clone(),
            relationship: name.to_string(),
        }
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dump())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ligne(id_produit: &str, quantite: f64) -> Instance {
        let mut ligne = Instance::empty("ligne_commande", ["id_produit", "quantite"], &[]);
        ligne
            .set_attribute("id_produit", Some(json!(id_produit)))
            .expect("id_produit is declared");
        ligne
            .set_attribute("quantite", Some(json!(quantite)))
            .expect("quantite is declared");
        ligne
    }

    fn commande() -> Instance {
        let relationships = [
            Relationship::indexed(
                "ligne_commande",
                "commande",
                "ligne_commande",
                "id_produit",
                "table_ligne_commandes",
            ),
            Relationship::one_to_many("note", "commande", "ligne_commande", "notes"),
            Relationship::one_to_one("principale", "commande", "ligne_commande", "principale"),
        ];
        Instance::empty("commande", ["id"], &relationships)
    }

    #[test]
    fn render_value_matches_generated_display() {
        assert_eq!("chaise", render_value(&json!("chaise")));
        assert_eq!("10", render_value(&json!(10.0)));
        assert_eq!("2.5", render_value(&json!(2.5)));
        assert_eq!("7", render_value(&json!(7)));
        assert_eq!("true", render_value(&json!(true)));
        assert_eq!("[1,2]", render_value(&json!([1, 2])));
    }

    #[test]
    fn indexed_add_overwrites_same_key() {
        let mut commande = commande();
        commande
            .add("ligne_commande", ligne("p1", 1.0))
            .expect("relationship exists");
        commande
            .add("ligne_commande", ligne("p1", 5.0))
            .expect("relationship exists");

        let items: Vec<&Instance> = commande.iter("ligne_commande").expect("exists").collect();
        assert_eq!(1, items.len());
        assert_eq!(Some(&json!(5.0)), items[0].attribute("quantite").expect("declared"));
    }

    #[test]
    fn indexed_get_and_remove_use_the_index_value() {
        let mut commande = commande();
        commande
            .add("ligne_commande", ligne("p1", 1.0))
            .expect("relationship exists");
        commande
            .add("ligne_commande", ligne("p2", 2.0))
            .expect("relationship exists");

        let found = commande
            .get("ligne_commande", &json!("p2"))
            .expect("relationship is indexed");
        assert_eq!(Some(&ligne("p2", 2.0)), found);
        assert_eq!(
            None,
            commande.get("ligne_commande", &json!("p9")).expect("indexed")
        );

        commande
            .remove("ligne_commande", &ligne("p1", 99.0))
            .expect("relationship exists");
        assert_eq!(1, commande.iter("ligne_commande").expect("exists").count());
    }

    #[test]
    fn indexed_iteration_follows_insertion_order() {
        let mut commande = commande();
        for (id, quantite) in [("z", 1.0), ("a", 2.0), ("m", 3.0), ("10", 4.0), ("2", 5.0)] {
            commande
                .add("ligne_commande", ligne(id, quantite))
                .expect("relationship exists");
        }
        commande
            .add("ligne_commande", ligne("a", 20.0))
            .expect("relationship exists");
        commande
            .remove("ligne_commande", &ligne("m", 0.0))
            .expect("relationship exists");

        let ids: Vec<String> = commande
            .iter("ligne_commande")
            .expect("exists")
            .map(|item| {
                let id: Option<&Value> = item.attribute("id_produit").expect("declared");
                index_key(id)
            })
            .collect();
        assert_eq!(vec!["z", "a", "10", "2"], ids);
        let replaced = commande
            .get("ligne_commande", &json!("a"))
            .expect("relationship is indexed")
            .expect("a is present");
        assert_eq!(Some(&json!(20.0)), replaced.attribute("quantite").expect("declared"));
    }

    #[test]
    fn sequence_keeps_duplicates_and_removes_first_occurrence() {
        let mut commande = commande();
        commande.add("note", ligne("p1", 1.0)).expect("exists");
        commande.add("note", ligne("p2", 2.0)).expect("exists");
        commande.add("note", ligne("p1", 1.0)).expect("exists");

        commande.remove("note", &ligne("p1", 1.0)).expect("exists");
        let remaining: Vec<String> = commande
            .iter("note")
            .expect("exists")
            .map(Instance::dump)
            .collect();
        assert_eq!(
            vec!["id_produit: p2, quantite: 2", "id_produit: p1, quantite: 1"],
            remaining
        );
    }

    #[test]
    fn removing_an_item_never_added_is_a_no_op() {
        let mut commande = commande();
        commande.add("note", ligne("p1", 1.0)).expect("exists");
        let before: Instance = commande.clone();
        commande.remove("note", &ligne("p7", 7.0)).expect("exists");
        assert_eq!(before, commande);
    }

    #[test]
    fn single_slot_is_replaced_and_cleared() {
        let mut commande = commande();
        commande.add("principale", ligne("p1", 1.0)).expect("exists");
        commande.add("principale", ligne("p2", 2.0)).expect("exists");
        assert_eq!(1, commande.iter("principale").expect("exists").count());

        commande.remove("principale", &ligne("p1", 1.0)).expect("exists");
        assert_eq!(1, commande.iter("principale").expect("exists").count());
        commande.remove("principale", &ligne("p2", 2.0)).expect("exists");
        assert_eq!(0, commande.iter("principale").expect("exists").count());
    }

    #[test]
    fn iteration_is_restartable() {
        let mut commande = commande();
        commande.add("note", ligne("p1", 1.0)).expect("exists");
        let first: usize = commande.iter("note").expect("exists").count();
        let second: usize = commande.iter("note").expect("exists").count();
        assert_eq!(first, second);
    }

    #[test]
    fn keyed_lookup_on_sequence_is_not_indexed() {
        let commande = commande();
        assert!(matches!(
            commande.get("note", &json!("p1")),
            Err(JsonClassGenError::NotIndexed { .. })
        ));
    }

    #[test]
    fn unknown_members_are_reported() {
        let mut commande = commande();
        assert!(matches!(
            commande.set_attribute("date", Some(json!("2024-01-01"))),
            Err(JsonClassGenError::UnknownAttribute { ref attribute, .. }) if attribute == "date"
        ));
        assert!(matches!(
            commande.add("client", ligne("p1", 1.0)),
            Err(JsonClassGenError::UnknownRelationship { .. })
        ));
    }

    #[test]
    fn adding_another_class_is_a_type_mismatch() {
        let mut commande = commande();
        let other = Instance::empty("client", ["id"], &[]);
        assert!(matches!(
            commande.add("note", other),
            Err(JsonClassGenError::TypeMismatch { ref found, .. }) if found == "client"
        ));
    }

    #[test]
    fn dump_nests_related_instances() {
        let mut commande = commande();
        commande
            .set_attribute("id", Some(json!("cmd1")))
            .expect("id is declared");
        commande
            .add("ligne_commande", ligne("p2", 2.0))
            .expect("exists");
        commande
            .add("ligne_commande", ligne("p1", 1.5))
            .expect("exists");
        let expected: &str = "id: cmd1, ligne_commande: \
            [{id_produit: p2, quantite: 2}, {id_produit: p1, quantite: 1.5}]";
        assert_eq!(expected, commande.dump());
    }

    #[test]
    fn dump_of_empty_instance_is_the_sentinel() {
        let mut commande = commande();
        commande.set_attribute("id", Some(Value::Null)).expect("declared");
        assert_eq!(EMPTY_DUMP, commande.dump());
        assert_eq!(EMPTY_DUMP, commande.to_string());
    }
}
