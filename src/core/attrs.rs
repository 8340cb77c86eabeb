//! Attribute values and attribute maps for access requests
//!
//! Request attributes arrive as heterogeneous scalars (numbers, booleans,
//! strings). They are carried as a discriminated [`AttrValue`] and compared
//! against policy conditions through one canonical string rendering, so
//! matching is deterministic regardless of the caller's value types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single scalar attribute value.
///
/// The canonical string form (the `Display` impl) is what condition matching
/// compares against:
///
/// - `Bool` renders as `"true"` / `"false"`
/// - `Int` renders in decimal with no decimal point
/// - `Float` renders in Rust's shortest form (`2.5` → `"2.5"`, `2.0` → `"2"`)
/// - `String` renders as the string itself
///
/// # Examples
///
/// ```
/// use turnstile_rs::AttrValue;
///
/// assert_eq!(AttrValue::from(42).to_string(), "42");
/// assert_eq!(AttrValue::from(true).to_string(), "true");
/// assert_eq!(AttrValue::from("admin").to_string(), "admin");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Bool(b) => write!(f, "{}", b),
            AttrValue::Int(i) => write!(f, "{}", i),
            AttrValue::Float(x) => write!(f, "{}", x),
            AttrValue::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for AttrValue {
    fn from(v: bool) -> Self {
        AttrValue::Bool(v)
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::Int(v)
    }
}

impl From<i32> for AttrValue {
    fn from(v: i32) -> Self {
        AttrValue::Int(v as i64)
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::Float(v)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::String(v.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        AttrValue::String(v)
    }
}

/// A mapping from attribute name to attribute value.
///
/// Backed by a `BTreeMap` so iteration order is deterministic; the decision
/// cache fingerprints requests by walking this map in order.
///
/// # Examples
///
/// ```
/// use turnstile_rs::Attributes;
///
/// let subject: Attributes = [("role", "admin"), ("team", "core")].into();
/// assert_eq!(subject.get("role").unwrap().to_string(), "admin");
/// assert!(subject.get("missing").is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(BTreeMap<String, AttrValue>);

impl Attributes {
    /// Create an empty attribute map
    pub fn new() -> Self {
        Attributes(BTreeMap::new())
    }

    /// Look up an attribute by name
    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.0.get(key)
    }

    /// Insert an attribute, replacing any previous value for the same name
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<AttrValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Number of attributes in the map
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the map holds no attributes
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(name, value)` pairs in name order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttrValue)> {
        self.0.iter()
    }

    /// Render every value through the canonical string conversion,
    /// preserving name order. Used by the decision cache fingerprint.
    pub(crate) fn rendered(&self) -> BTreeMap<&str, String> {
        self.0
            .iter()
            .map(|(k, v)| (k.as_str(), v.to_string()))
            .collect()
    }
}

impl<K, V> FromIterator<(K, V)> for Attributes
where
    K: Into<String>,
    V: Into<AttrValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Attributes(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Attributes
where
    K: Into<String>,
    V: Into<AttrValue>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl From<BTreeMap<String, AttrValue>> for Attributes {
    fn from(map: BTreeMap<String, AttrValue>) -> Self {
        Attributes(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_rendering() {
        assert_eq!(AttrValue::Bool(true).to_string(), "true");
        assert_eq!(AttrValue::Bool(false).to_string(), "false");
        assert_eq!(AttrValue::Int(42).to_string(), "42");
        assert_eq!(AttrValue::Int(-7).to_string(), "-7");
        assert_eq!(AttrValue::Float(2.5).to_string(), "2.5");
        assert_eq!(AttrValue::Float(2.0).to_string(), "2");
        assert_eq!(AttrValue::String("doc".to_string()).to_string(), "doc");
    }

    #[test]
    fn test_from_impls() {
        assert_eq!(AttrValue::from(3i32), AttrValue::Int(3));
        assert_eq!(AttrValue::from("x"), AttrValue::String("x".to_string()));
        assert_eq!(AttrValue::from(false), AttrValue::Bool(false));
    }

    #[test]
    fn test_untagged_deserialization() {
        let v: AttrValue = serde_json::from_str("true").unwrap();
        assert_eq!(v, AttrValue::Bool(true));

        let v: AttrValue = serde_json::from_str("17").unwrap();
        assert_eq!(v, AttrValue::Int(17));

        let v: AttrValue = serde_json::from_str("1.25").unwrap();
        assert_eq!(v, AttrValue::Float(1.25));

        let v: AttrValue = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(v, AttrValue::String("admin".to_string()));
    }

    #[test]
    fn test_attributes_map_roundtrip() {
        let attrs: Attributes = [
            ("role", AttrValue::from("admin")),
            ("level", AttrValue::from(3)),
        ]
        .into();

        let json = serde_json::to_string(&attrs).unwrap();
        assert_eq!(json, r#"{"level":3,"role":"admin"}"#);

        let back: Attributes = serde_json::from_str(&json).unwrap();
        assert_eq!(back, attrs);
    }

    #[test]
    fn test_rendered_is_name_ordered() {
        let attrs: Attributes = [("b", 2), ("a", 1)].into();
        let rendered: Vec<_> = attrs.rendered().into_iter().collect();
        assert_eq!(
            rendered,
            vec![("a", "1".to_string()), ("b", "2".to_string())]
        );
    }
}
