//! Attribute values of one resource instance.
//!
//! The same type carries the desired configuration handed in by the
//! orchestrator and the state read back from the API. Nested blocks are arrays
//! of objects, string maps are objects.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ProviderError, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceData {
    attributes: Map<String, Value>,
}

impl ResourceData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a JSON object.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(attributes) => Ok(Self { attributes }),
            other => Err(ProviderError::invalid(
                "<root>",
                format!("expected an object, found {}", type_name(&other)),
            )),
        }
    }

    /// Attribute value; `null` counts as absent.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key).filter(|v| !v.is_null())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    /// Items of a nested block list; non-object items are skipped.
    pub fn get_blocks(&self, key: &str) -> Vec<ResourceData> {
        self.get(key)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.as_object().cloned())
                    .map(|attributes| ResourceData { attributes })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// A string map attribute such as `tags`.
    pub fn get_string_map(&self, key: &str) -> Option<BTreeMap<String, String>> {
        self.get(key).and_then(Value::as_object).map(|m| {
            m.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.attributes.insert(key.to_string(), value.into());
    }

    /// Set only when the API reported a value, leaving known values alone otherwise.
    pub fn set_opt<T: Into<Value>>(&mut self, key: &str, value: Option<T>) {
        if let Some(value) = value {
            self.set(key, value);
        }
    }

    pub fn set_blocks(&mut self, key: &str, blocks: Vec<ResourceData>) {
        let items = blocks.into_iter().map(Value::from).collect::<Vec<_>>();
        self.set(key, Value::Array(items));
    }

    pub fn set_string_map(&mut self, key: &str, map: BTreeMap<String, String>) {
        let object = map
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect::<Map<_, _>>();
        self.set(key, Value::Object(object));
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.attributes.remove(key)
    }

    /// `prior` with every attribute of `self` laid over it.
    pub fn merge_over(&self, prior: &ResourceData) -> ResourceData {
        let mut merged = prior.clone();
        for (key, value) in &self.attributes {
            if !value.is_null() {
                merged.attributes.insert(key.clone(), value.clone());
            }
        }
        merged
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.attributes
    }

    pub(crate) fn as_map_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.attributes
    }

    /// Flat `key -> string` view: lists contribute `name.#` and `name.N...`,
    /// maps contribute `name.%` and `name.key`.
    pub fn flatten(&self) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        for (key, value) in &self.attributes {
            flatten_into(&mut out, key, value);
        }
        out
    }
}

fn flatten_into(out: &mut BTreeMap<String, String>, prefix: &str, value: &Value) {
    match value {
        Value::Null => {}
        Value::Bool(b) => {
            out.insert(prefix.to_string(), b.to_string());
        }
        Value::Number(n) => {
            out.insert(prefix.to_string(), n.to_string());
        }
        Value::String(s) => {
            out.insert(prefix.to_string(), s.clone());
        }
        Value::Array(items) => {
            out.insert(format!("{prefix}.#"), items.len().to_string());
            for (i, item) in items.iter().enumerate() {
                let item_prefix = format!("{prefix}.{i}");
                match item {
                    Value::Object(block) => {
                        for (k, v) in block {
                            flatten_into(out, &format!("{item_prefix}.{k}"), v);
                        }
                    }
                    other => flatten_into(out, &item_prefix, other),
                }
            }
        }
        Value::Object(map) => {
            out.insert(format!("{prefix}.%"), map.len().to_string());
            for (k, v) in map {
                flatten_into(out, &format!("{prefix}.{k}"), v);
            }
        }
    }
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

impl From<ResourceData> for Value {
    fn from(data: ResourceData) -> Self {
        Value::Object(data.attributes)
    }
}

impl From<Map<String, Value>> for ResourceData {
    fn from(attributes: Map<String, Value>) -> Self {
        Self { attributes }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn data(value: Value) -> ResourceData {
        ResourceData::from_value(value).unwrap()
    }

    #[test]
    fn flatten_uses_count_keys() {
        let d = data(json!({
            "name": "c1",
            "dns_service_enabled": true,
            "tags": {"Test": "value"},
            "node_type": [
                {"name": "test1", "data_disk_size_gb": 130, "placement_properties": {"a": "b"}},
                {"name": "test2", "data_disk_size_gb": 140}
            ],
            "password": null
        }));
        let flat = d.flatten();

        assert_eq!(flat["name"], "c1");
        assert_eq!(flat["dns_service_enabled"], "true");
        assert_eq!(flat["tags.%"], "1");
        assert_eq!(flat["tags.Test"], "value");
        assert_eq!(flat["node_type.#"], "2");
        assert_eq!(flat["node_type.0.name"], "test1");
        assert_eq!(flat["node_type.1.data_disk_size_gb"], "140");
        assert_eq!(flat["node_type.0.placement_properties.%"], "1");
        assert_eq!(flat["node_type.0.placement_properties.a"], "b");
        assert!(!flat.contains_key("node_type.0.%"));
        assert!(!flat.contains_key("password"));
    }

    #[test]
    fn merge_keeps_prior_values_for_absent_keys() {
        let prior = data(json!({"password": "secret", "sku": "Basic"}));
        let fetched = data(json!({"sku": "Standard", "username": null}));

        let merged = fetched.merge_over(&prior);
        assert_eq!(merged.get_str("password"), Some("secret"));
        assert_eq!(merged.get_str("sku"), Some("Standard"));
        assert!(!merged.contains("username"));
    }

    #[test]
    fn typed_getters() {
        let d = data(json!({
            "streaming_units": 3,
            "enabled": false,
            "tags": {"a": "1", "b": 2},
            "identity": [{"type": "SystemAssigned"}, "junk"]
        }));
        assert_eq!(d.get_i64("streaming_units"), Some(3));
        assert_eq!(d.get_bool("enabled"), Some(false));
        assert_eq!(d.get_str("streaming_units"), None);

        let tags = d.get_string_map("tags").unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags["a"], "1");

        let identity = d.get_blocks("identity");
        assert_eq!(identity.len(), 1);
        assert_eq!(identity[0].get_str("type"), Some("SystemAssigned"));
    }

    #[test]
    fn rejects_non_object_documents() {
        assert!(ResourceData::from_value(json!([1, 2])).is_err());
    }
}
