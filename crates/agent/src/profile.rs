//! Agent profile normalization.
//!
//! Profiles are open JSON objects. Before they go into a prompt the top-level
//! keys are put in a deterministic order so equal profiles always render the
//! same text. The order follows locale collation levels: base letters
//! first (accents and case ignored), then accents, then case with lowercase
//! first, so `édad` sorts before `fecha` and `alpha` before `Alpha`.

use std::cmp::Ordering;

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// An agent profile with its top-level keys in canonical order.
///
/// Serializes as a JSON object in that order, independent of how the
/// underlying JSON map orders keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedProfile {
    entries: Vec<(String, Value)>,
}

impl NormalizedProfile {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Back to a plain JSON object.
    pub fn to_value(&self) -> Value {
        Value::Object(self.entries.iter().cloned().collect())
    }

    /// Two-space indented JSON, keys in canonical order.
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| String::from("{}"))
    }
}

impl Serialize for NormalizedProfile {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Base letters only: decomposed, combining marks dropped, lowercased.
fn primary_key(key: &str) -> String {
    key.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Letters with their accents, case folded.
fn secondary_key(key: &str) -> String {
    key.nfd().flat_map(char::to_lowercase).collect()
}

/// Per-character case, lowercase before uppercase.
fn tertiary_key(key: &str) -> Vec<bool> {
    key.nfd().map(char::is_uppercase).collect()
}

/// Canonical key order.
pub fn compare_keys(a: &str, b: &str) -> Ordering {
    primary_key(a)
        .cmp(&primary_key(b))
        .then_with(|| secondary_key(a).cmp(&secondary_key(b)))
        .then_with(|| tertiary_key(a).cmp(&tertiary_key(b)))
        .then_with(|| a.cmp(b))
}

/// Sort a profile's top-level keys. Anything but an object yields an empty
/// profile. `null` values are kept; JSON has no absent values to drop.
pub fn normalize_profile(profile: &Value) -> NormalizedProfile {
    let Value::Object(map) = profile else {
        return NormalizedProfile::default();
    };

    let mut entries: Vec<(String, Value)> = map
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    entries.sort_by(|(a, _), (b, _)| compare_keys(a, b));

    NormalizedProfile { entries }
}
