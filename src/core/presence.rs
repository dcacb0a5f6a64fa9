// src/core/presence.rs

//! # Presence
//!
//! The single rule deciding whether an optional field reaches the rendered document.
//! Every entity routes its `skip_serializing_if` through [`is_absent`], so the rule lives
//! in exactly one place.
//!
//! A value is absent when it is `None`, an empty sequence or an empty mapping. Scalars are
//! always present once set: `Some(false)`, `Some(0)` and `Some("")` are all emitted.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, de};

/// Decides whether a field value counts as "set" for rendering purposes.
pub trait Presence {
    /// Returns `true` when the value must be left out of the rendered document.
    fn is_absent(&self) -> bool;
}

/// The shared presence predicate used by every `skip_serializing_if` in the crate.
pub fn is_absent<T: Presence + ?Sized>(value: &T) -> bool {
    value.is_absent()
}

impl<T: Presence> Presence for Option<T> {
    fn is_absent(&self) -> bool {
        match self {
            None => true,
            Some(inner) => inner.is_absent(),
        }
    }
}

impl<T> Presence for Vec<T> {
    fn is_absent(&self) -> bool {
        self.is_empty()
    }
}

impl<K, V> Presence for IndexMap<K, V> {
    fn is_absent(&self) -> bool {
        self.is_empty()
    }
}

impl Presence for serde_yaml::Mapping {
    fn is_absent(&self) -> bool {
        self.is_empty()
    }
}

impl Presence for serde_yaml::Value {
    fn is_absent(&self) -> bool {
        match self {
            serde_yaml::Value::Null => true,
            serde_yaml::Value::Sequence(items) => items.is_empty(),
            serde_yaml::Value::Mapping(map) => map.is_empty(),
            _ => false,
        }
    }
}

/// Marks types whose values are always present once they exist (scalars, enums, and
/// nested records that are emitted whole).
#[macro_export]
macro_rules! always_present {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::core::presence::Presence for $ty {
                fn is_absent(&self) -> bool {
                    false
                }
            }
        )+
    };
}

always_present!(bool, u64, i64, String);

/// Reads a collection field, treating an explicit `null` the same as a missing key.
///
/// Hand-written documents frequently leave a key with no value (`depends_on:`); the
/// collection is then simply empty.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Reads a string-to-string table (environment variables, expansions) whose values may be
/// written as any scalar: `fizz: true` and `buzz: 1` load as `"true"` and `"1"`, and a
/// key with no value loads as `""`. Sequences and mappings are rejected.
pub fn scalars_as_strings<'de, D>(deserializer: D) -> Result<IndexMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<IndexMap<String, serde_yaml::Value>>::deserialize(deserializer)?
        .unwrap_or_default();
    raw.into_iter()
        .map(|(key, value)| match scalar_text(value) {
            Some(text) => Ok((key, text)),
            None => Err(de::Error::custom(format!(
                "expected a scalar value for '{}'",
                key
            ))),
        })
        .collect()
}

fn scalar_text(value: serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(text) => Some(text),
        serde_yaml::Value::Bool(flag) => Some(flag.to_string()),
        serde_yaml::Value::Number(number) => Some(number.to_string()),
        serde_yaml::Value::Null => Some(String::new()),
        serde_yaml::Value::Tagged(tagged) => scalar_text(tagged.value),
        serde_yaml::Value::Sequence(_) | serde_yaml::Value::Mapping(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Env {
        #[serde(default, deserialize_with = "scalars_as_strings")]
        env: IndexMap<String, String>,
    }

    #[test]
    fn test_scalar_table_values_load_as_text() {
        let parsed: Env =
            serde_yaml::from_str("env:\n  fizz: true\n  buzz: 1\n  ratio: 2.5\n  name: x\n  empty:\n")
                .unwrap();
        let pairs: Vec<(&str, &str)> = parsed
            .env
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![("fizz", "true"), ("buzz", "1"), ("ratio", "2.5"), ("name", "x"), ("empty", "")]
        );
    }

    #[test]
    fn test_scalar_table_rejects_nested_values() {
        let err = serde_yaml::from_str::<Env>("env:\n  list: [a]\n").unwrap_err();
        assert!(err.to_string().contains("expected a scalar value for 'list'"));

        let missing: Env = serde_yaml::from_str("{}").unwrap();
        assert!(missing.env.is_empty());
        let null: Env = serde_yaml::from_str("env:\n").unwrap();
        assert!(null.env.is_empty());
    }

    #[test]
    fn test_false_and_zero_are_present() {
        assert!(!is_absent(&Some(false)));
        assert!(!is_absent(&Some(0_u64)));
        assert!(!is_absent(&Some(String::new())));
    }

    #[test]
    fn test_none_and_empty_containers_are_absent() {
        assert!(is_absent(&None::<bool>));
        assert!(is_absent(&Vec::<String>::new()));
        assert!(is_absent(&IndexMap::<String, String>::new()));
        assert!(is_absent(&Some(Vec::<u64>::new())));
        assert!(is_absent(&serde_yaml::Value::Null));
    }

    #[test]
    fn test_non_empty_containers_are_present() {
        assert!(!is_absent(&vec!["a".to_string()]));
        let mut map = IndexMap::new();
        map.insert("k".to_string(), "v".to_string());
        assert!(!is_absent(&map));
    }

    #[test]
    fn test_null_collection_reads_as_empty() {
        #[derive(Deserialize)]
        struct Holder {
            #[serde(default, deserialize_with = "null_as_default")]
            items: Vec<String>,
        }

        let holder: Holder = serde_yaml::from_str("items:\n").unwrap();
        assert!(holder.items.is_empty());

        let holder: Holder = serde_yaml::from_str("{}").unwrap();
        assert!(holder.items.is_empty());

        let holder: Holder = serde_yaml::from_str("items: [a, b]").unwrap();
        assert_eq!(holder.items, vec!["a", "b"]);
    }
}
