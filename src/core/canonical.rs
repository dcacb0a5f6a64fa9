// src/core/canonical.rs

//! # Canonical Order
//!
//! Collections that are logically sets (dependencies, the task references of a variant,
//! display tasks and their members) are stored as plain vectors in whatever order the
//! caller built them. At render time they are emitted sorted by name, every remaining field
//! breaking ties, with entries that compare equal collapsed to one. Two graphs that differ
//! only in insertion order therefore render to identical text.

use serde::{Serialize, Serializer, ser::SerializeSeq};
use std::cmp::Ordering;

/// A value with a canonical position inside an unordered collection.
///
/// The ordering must be total and must consider every rendered field: two entries compare
/// `Equal` only when they render identically, since equal entries are collapsed.
pub trait CanonicalKey {
    /// Compares two entries, name first.
    fn canonical_cmp(&self, other: &Self) -> Ordering;
}

impl CanonicalKey for String {
    fn canonical_cmp(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }
}

/// Returns references to `items` in canonical order, duplicates removed.
pub fn canonical_order<T: CanonicalKey>(items: &[T]) -> Vec<&T> {
    let mut ordered: Vec<&T> = items.iter().collect();
    ordered.sort_by(|a, b| a.canonical_cmp(b));
    ordered.dedup_by(|a, b| a.canonical_cmp(b) == Ordering::Equal);
    ordered
}

/// Compares two collections by their canonical forms.
pub fn canonical_cmp_all<T: CanonicalKey>(a: &[T], b: &[T]) -> Ordering {
    let (a, b) = (canonical_order(a), canonical_order(b));
    for (left, right) in a.iter().zip(b.iter()) {
        match left.canonical_cmp(right) {
            Ordering::Equal => continue,
            unequal => return unequal,
        }
    }
    a.len().cmp(&b.len())
}

/// `serialize_with` adapter emitting a collection in canonical order.
pub fn serialize_canonical<S, T>(items: &[T], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: CanonicalKey + Serialize,
{
    let ordered = canonical_order(items);
    let mut seq = serializer.serialize_seq(Some(ordered.len()))?;
    for item in ordered {
        seq.serialize_element(item)?;
    }
    seq.end()
}
