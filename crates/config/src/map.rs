//! In-memory configuration values

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;

/// String key to string value configuration.
///
/// Keys are kept sorted so persisted files are stable across writes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigMap(BTreeMap<String, String>);

impl ConfigMap {
    /// Create an empty map.
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Merge layers in order, later layers overwrite earlier ones on shared keys.
    pub fn layered<'a, I>(layers: I) -> Self
    where
        I: IntoIterator<Item = &'a ConfigMap>,
    {
        let mut merged = Self::new();
        for layer in layers {
            merged.merge(layer);
        }
        merged
    }

    /// Value stored for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Value stored for `key`, or `default` when absent.
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// Set `key`, returning the value it replaced.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    /// Remove `key`, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    /// Whether `key` has a value.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the map has no entry.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Copy every entry of `overlay` into this map, overlay wins.
    pub fn merge(&mut self, overlay: &ConfigMap) {
        self.0
            .extend(overlay.0.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    /// Copy of this map with every value passed through [`sanitize_value`].
    pub fn sanitized(&self) -> ConfigMap {
        self.0
            .iter()
            .map(|(k, v)| (k.clone(), sanitize_value(v).into_owned()))
            .collect()
    }

    /// Whether every value is already in sanitized form.
    pub fn is_sanitized(&self) -> bool {
        self.0.values().all(|v| !v.chars().any(needs_sanitizing))
    }
}

fn needs_sanitizing(c: char) -> bool {
    matches!(c, '\t' | '\r' | '\n' | '\u{8}' | '\u{c}' | '\\')
}

/// Replace control characters and backslashes with visible markers.
///
/// `\t` becomes `/t`, `\r` `/r`, `\n` `/n`, backspace `/b`, form feed `/f`
/// and a backslash a single `/`.
pub fn sanitize_value(value: &str) -> Cow<'_, str> {
    if !value.chars().any(needs_sanitizing) {
        return Cow::Borrowed(value);
    }

    let mut out = String::with_capacity(value.len() + 4);
    for c in value.chars() {
        match c {
            '\t' => out.push_str("/t"),
            '\r' => out.push_str("/r"),
            '\n' => out.push_str("/n"),
            '\u{8}' => out.push_str("/b"),
            '\u{c}' => out.push_str("/f"),
            '\\' => out.push('/'),
            other => out.push(other),
        }
    }
    Cow::Owned(out)
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ConfigMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for ConfigMap {
    fn from(entries: [(K, V); N]) -> Self {
        entries.into_iter().collect()
    }
}

impl From<BTreeMap<String, String>> for ConfigMap {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

impl From<ConfigMap> for BTreeMap<String, String> {
    fn from(map: ConfigMap) -> Self {
        map.0
    }
}

impl IntoIterator for ConfigMap {
    type Item = (String, String);
    type IntoIter = std::collections::btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layered_later_wins() {
        let defaults = ConfigMap::from([("default", "true"), ("defaultOnly", "true")]);
        let file = ConfigMap::from([("default", "false")]);

        let merged = ConfigMap::layered([&defaults, &file]);

        assert_eq!(merged.get("default"), Some("false"));
        assert_eq!(merged.get("defaultOnly"), Some("true"));
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_sanitize_backslash() {
        assert_eq!(sanitize_value("C:\\test"), "C:/test");
    }

    #[test]
    fn test_sanitize_control_characters() {
        assert_eq!(
            sanitize_value("a\tb\rc\nd\u{8}e\u{c}f"),
            "a/tb/rc/nd/be/ff"
        );
    }

    #[test]
    fn test_sanitize_borrows_clean_values() {
        assert!(matches!(sanitize_value("plain value"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_sanitized_map_is_idempotent() {
        let map = ConfigMap::from([("path", "C:\\dir\\file"), ("plain", "x")]);
        let once = map.sanitized();
        assert!(!map.is_sanitized());
        assert!(once.is_sanitized());
        assert_eq!(once.sanitized(), once);
        assert_eq!(once.get("path"), Some("C:/dir/file"));
    }

    #[test]
    fn test_keys_are_not_sanitized() {
        let map = ConfigMap::from([("a\\b", "v")]);
        assert!(map.sanitized().contains_key("a\\b"));
    }

    #[test]
    fn test_serde_transparent() {
        let map = ConfigMap::from([("b", "2"), ("a", "1")]);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"a":"1","b":"2"}"#);

        let back: ConfigMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }
}
