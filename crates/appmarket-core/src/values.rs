//! Parsed view of a values document with recursive key search
//!
//! The rewriters never write this tree back; it only answers structural
//! questions ("where are the `image` mappings?") about the text they edit.

use serde_yaml::Value as YamlValue;
use std::collections::BTreeMap;

use crate::error::Result;
use crate::structure::ROOT_SEGMENT;

/// Values tree in document order
#[derive(Debug, Clone, Default)]
pub struct Values(pub YamlValue);

impl Values {
    /// Parse values from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let value: YamlValue = serde_yaml::from_str(yaml)?;
        Ok(Self(value))
    }

    /// First occurrence of `key` at any depth
    ///
    /// The current mapping is checked before descending, and nested
    /// mappings are visited in document order. Sequences are not entered.
    pub fn find_key(&self, key: &str) -> Option<&YamlValue> {
        find_first(&self.0, key)
    }

    /// Every occurrence of `key` at any depth
    ///
    /// Entries are keyed by the structural path of the mapping holding the
    /// key, rooted at `_` (`_`, `_.controller`, ...). This is the same string
    /// the path tracker reports for lines directly inside that mapping.
    pub fn find_key_all(&self, key: &str) -> BTreeMap<String, &YamlValue> {
        let mut found = BTreeMap::new();
        let mut path = vec![ROOT_SEGMENT.to_string()];
        collect_all(&self.0, key, &mut path, &mut found);
        found
    }
}

/// Render a scalar YAML value the way it reads in the document
pub fn scalar_to_string(value: &YamlValue) -> Option<String> {
    match value {
        YamlValue::String(s) => Some(s.clone()),
        YamlValue::Number(n) => Some(n.to_string()),
        YamlValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn find_first<'a>(value: &'a YamlValue, key: &str) -> Option<&'a YamlValue> {
    let map = value.as_mapping()?;
    if let Some(found) = map.get(key) {
        return Some(found);
    }
    map.values()
        .filter(|v| v.is_mapping())
        .find_map(|v| find_first(v, key))
}

fn collect_all<'a>(
    value: &'a YamlValue,
    key: &str,
    path: &mut Vec<String>,
    found: &mut BTreeMap<String, &'a YamlValue>,
) {
    let Some(map) = value.as_mapping() else {
        return;
    };

    if let Some(hit) = map.get(key) {
        found.entry(path.join(".")).or_insert(hit);
    }

    for (k, v) in map {
        if !v.is_mapping() {
            continue;
        }
        let Some(segment) = scalar_to_string(k) else {
            continue;
        };
        path.push(segment);
        collect_all(v, key, path, found);
        path.pop();
    }
}
