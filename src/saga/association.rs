//! Association values: the correlation keys that connect events to saga instances.
//!
//! An [`AssociationValue`] is a plain (key, value) pair. A saga owns a set of them
//! ([`AssociationValues`]) and the store's association index maps each pair to the
//! saga identifiers interested in it. The set tracks the net delta since the last
//! commit so the index can be updated incrementally instead of rewritten.

use std::collections::HashSet;
use std::fmt;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// A correlation key-value pair identifying which saga instances should receive
/// a given event.
///
/// Compared and hashed on both fields. This is a lookup key, never an identity:
/// many sagas may share the same association value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssociationValue {
    key: String,
    value: String,
}

impl AssociationValue {
    /// Create an association value from a property name and its value.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// The property name this association is keyed on.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The property value.
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for AssociationValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

#[derive(Debug, Default)]
struct AssociationSet {
    values: HashSet<AssociationValue>,
    added: HashSet<AssociationValue>,
    removed: HashSet<AssociationValue>,
}

/// The set of association values owned by one saga instance.
///
/// Invariant: no duplicate pairs. `add` and `remove` report whether the set
/// actually changed, and the pending delta (`added_since_last_sync` /
/// `removed_since_last_sync`) reflects the net effect of all mutations since
/// the last [`mark_synced`](Self::mark_synced): an add followed by a remove of
/// the same pair (or vice versa) cancels out.
///
/// Interior mutability keeps this usable from [`Saga::handle`](crate::saga::Saga)
/// which takes `&self`; the event router serializes mutating access per instance.
#[derive(Debug, Default)]
pub struct AssociationValues {
    inner: RwLock<AssociationSet>,
}

impl AssociationValues {
    /// Create an empty association set with no pending delta.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an association. Returns `true` if the set changed.
    pub fn add(&self, value: AssociationValue) -> bool {
        let mut set = self.inner.write();
        if !set.values.insert(value.clone()) {
            return false;
        }
        // A pair removed and re-added within one sync window nets out to no delta.
        if !set.removed.remove(&value) {
            set.added.insert(value);
        }
        true
    }

    /// Remove an association. Returns `true` if the set changed.
    pub fn remove(&self, value: &AssociationValue) -> bool {
        let mut set = self.inner.write();
        if !set.values.remove(value) {
            return false;
        }
        if !set.added.remove(value) {
            set.removed.insert(value.clone());
        }
        true
    }

    /// Whether the given association is currently part of the set.
    pub fn contains(&self, value: &AssociationValue) -> bool {
        self.inner.read().values.contains(value)
    }

    /// Number of associations currently in the set.
    pub fn len(&self) -> usize {
        self.inner.read().values.len()
    }

    /// Whether the set is currently empty.
    pub fn is_empty(&self) -> bool {
        self.inner.read().values.is_empty()
    }

    /// Snapshot of the current associations.
    pub fn snapshot(&self) -> Vec<AssociationValue> {
        self.inner.read().values.iter().cloned().collect()
    }

    /// Associations added since the last sync with the store.
    pub fn added_since_last_sync(&self) -> Vec<AssociationValue> {
        self.inner.read().added.iter().cloned().collect()
    }

    /// Associations removed since the last sync with the store.
    pub fn removed_since_last_sync(&self) -> Vec<AssociationValue> {
        self.inner.read().removed.iter().cloned().collect()
    }

    /// Clear the pending delta. Called by the store after it has durably
    /// applied the delta to its association index.
    pub fn mark_synced(&self) {
        let mut set = self.inner.write();
        set.added.clear();
        set.removed.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_and_hashing_use_both_fields() {
        let a = AssociationValue::new("order", "42");
        let b = AssociationValue::new("order", "42");
        let c = AssociationValue::new("order", "43");
        let d = AssociationValue::new("customer", "42");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
        assert!(!set.contains(&c));
    }

    #[test]
    fn add_reports_whether_the_set_changed() {
        let values = AssociationValues::new();
        let av = AssociationValue::new("k", "v");

        assert!(values.add(av.clone()));
        assert!(!values.add(av.clone()));
        assert_eq!(values.len(), 1);
        assert!(values.contains(&av));
    }

    #[test]
    fn remove_reports_whether_the_set_changed() {
        let values = AssociationValues::new();
        let av = AssociationValue::new("k", "v");
        values.add(av.clone());

        assert!(values.remove(&av));
        assert!(!values.remove(&av));
        assert!(values.is_empty());
    }

    #[test]
    fn delta_tracks_net_changes_only() {
        let values = AssociationValues::new();
        let kept = AssociationValue::new("kept", "1");
        let churned = AssociationValue::new("churned", "1");

        values.add(kept.clone());
        values.add(churned.clone());
        values.remove(&churned);

        assert_eq!(values.added_since_last_sync(), vec![kept.clone()]);
        assert!(values.removed_since_last_sync().is_empty());

        values.mark_synced();
        assert!(values.added_since_last_sync().is_empty());

        // Remove-then-re-add of a synced pair nets out as well.
        values.remove(&kept);
        values.add(kept.clone());
        assert!(values.added_since_last_sync().is_empty());
        assert!(values.removed_since_last_sync().is_empty());

        values.remove(&kept);
        assert_eq!(values.removed_since_last_sync(), vec![kept]);
    }
}
