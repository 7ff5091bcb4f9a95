//! Attribute schemas for resource types.
//!
//! A schema declares, per attribute, its type, whether the caller must, may or
//! must not supply it, its default and the predicates a value must satisfy.
//! Desired configurations are checked against the schema before any request
//! is made.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Diagnostic, ProviderError, Result};
use crate::state::{ResourceData, type_name};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    String,
    Int,
    Bool,
    /// Map of string to string.
    Map,
    /// List of nested blocks.
    Block,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Presence {
    Required,
    Optional,
    /// May be supplied; the API fills it in otherwise.
    OptionalComputed,
    /// Only ever set by the API.
    Computed,
}

/// Predicate on an attribute value.
#[derive(Clone, Copy)]
pub enum Validation {
    NotEmpty,
    OneOf(&'static [&'static str]),
    IntBetween(i64, i64),
    MaxEntries(usize),
    Custom(fn(&Value) -> std::result::Result<(), String>),
}

impl Validation {
    fn check(&self, value: &Value) -> std::result::Result<(), String> {
        match self {
            Validation::NotEmpty => match value.as_str() {
                Some(s) if !s.trim().is_empty() => Ok(()),
                _ => Err("must not be empty".to_string()),
            },
            Validation::OneOf(allowed) => match value.as_str() {
                Some(s) if allowed.contains(&s) => Ok(()),
                _ => Err(format!("must be one of {}", allowed.join(", "))),
            },
            Validation::IntBetween(min, max) => match value.as_i64() {
                Some(n) if (*min..=*max).contains(&n) => Ok(()),
                _ => Err(format!("must be between {min} and {max}")),
            },
            Validation::MaxEntries(max) => match value.as_object() {
                Some(m) if m.len() <= *max => Ok(()),
                _ => Err(format!("must have at most {max} entries")),
            },
            Validation::Custom(f) => f(value),
        }
    }
}

impl fmt::Debug for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Validation::NotEmpty => write!(f, "NotEmpty"),
            Validation::OneOf(v) => write!(f, "OneOf({v:?})"),
            Validation::IntBetween(a, b) => write!(f, "IntBetween({a}, {b})"),
            Validation::MaxEntries(n) => write!(f, "MaxEntries({n})"),
            Validation::Custom(_) => write!(f, "Custom"),
        }
    }
}

/// Declaration of a single attribute.
#[derive(Debug, Clone, Serialize)]
pub struct Attribute {
    #[serde(rename = "type")]
    pub value_type: ValueType,
    pub presence: Presence,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub force_new: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub sensitive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_items: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block: Option<Schema>,
    #[serde(skip)]
    pub validations: Vec<Validation>,
    #[serde(skip)]
    pub normalize: Option<fn(&str) -> String>,
}

impl Attribute {
    fn of(value_type: ValueType) -> Self {
        Self {
            value_type,
            presence: Presence::Optional,
            force_new: false,
            sensitive: false,
            default: None,
            min_items: None,
            max_items: None,
            block: None,
            validations: Vec::new(),
            normalize: None,
        }
    }

    pub fn string() -> Self {
        Self::of(ValueType::String)
    }

    pub fn int() -> Self {
        Self::of(ValueType::Int)
    }

    pub fn bool() -> Self {
        Self::of(ValueType::Bool)
    }

    pub fn map() -> Self {
        Self::of(ValueType::Map)
    }

    pub fn block(schema: Schema) -> Self {
        Self {
            block: Some(schema),
            ..Self::of(ValueType::Block)
        }
    }

    pub fn required(mut self) -> Self {
        self.presence = Presence::Required;
        self
    }

    pub fn optional_computed(mut self) -> Self {
        self.presence = Presence::OptionalComputed;
        self
    }

    pub fn computed(mut self) -> Self {
        self.presence = Presence::Computed;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn min_items(mut self, n: usize) -> Self {
        self.min_items = Some(n);
        self
    }

    pub fn max_items(mut self, n: usize) -> Self {
        self.max_items = Some(n);
        self
    }

    pub fn validate(mut self, validation: Validation) -> Self {
        self.validations.push(validation);
        self
    }

    pub fn normalize(mut self, f: fn(&str) -> String) -> Self {
        self.normalize = Some(f);
        self
    }

    pub fn is_computed(&self) -> bool {
        self.presence == Presence::Computed
    }

    fn type_matches(&self, value: &Value) -> bool {
        match self.value_type {
            ValueType::String => value.is_string(),
            ValueType::Int => value.is_i64() || value.is_u64(),
            ValueType::Bool => value.is_boolean(),
            ValueType::Map => value
                .as_object()
                .is_some_and(|m| m.values().all(Value::is_string)),
            ValueType::Block => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_object)),
        }
    }
}

/// Attribute declarations of one resource type (or nested block).
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Schema {
    attributes: BTreeMap<&'static str, Attribute>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &'static str, attribute: Attribute) -> Self {
        self.attributes.insert(name, attribute);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Attribute)> {
        self.attributes.iter().map(|(k, v)| (*k, v))
    }

    /// Fill in defaults and normalise values, recursing into blocks.
    pub fn prepare(&self, data: &mut ResourceData) {
        self.prepare_object(data.as_map_mut());
    }

    fn prepare_object(&self, object: &mut Map<String, Value>) {
        for (name, attribute) in &self.attributes {
            let present = object.get(*name).is_some_and(|v| !v.is_null());
            if !present {
                if let Some(default) = &attribute.default {
                    object.insert(name.to_string(), default.clone());
                }
                continue;
            }
            let Some(value) = object.get_mut(*name) else {
                continue;
            };
            if let (Some(normalize), Value::String(s)) = (attribute.normalize, &*value) {
                *value = Value::String(normalize(s));
            }
            if let (Some(block), Value::Array(items)) = (&attribute.block, value) {
                for item in items.iter_mut() {
                    if let Value::Object(inner) = item {
                        block.prepare_object(inner);
                    }
                }
            }
        }
    }

    /// Check a desired configuration, reporting every problem at once.
    pub fn validate(&self, data: &ResourceData) -> Result<()> {
        let mut diagnostics = Vec::new();
        self.validate_object(data.as_map(), "", &mut diagnostics);
        if diagnostics.is_empty() {
            Ok(())
        } else {
            Err(ProviderError::Validation(diagnostics))
        }
    }

    fn validate_object(&self, object: &Map<String, Value>, prefix: &str, out: &mut Vec<Diagnostic>) {
        for key in object.keys() {
            if !self.attributes.contains_key(key.as_str()) {
                out.push(Diagnostic::new(
                    format!("{prefix}{key}"),
                    "unsupported attribute",
                ));
            }
        }

        for (name, attribute) in &self.attributes {
            let path = format!("{prefix}{name}");
            let value = object.get(*name).filter(|v| !v.is_null());

            let Some(value) = value else {
                if attribute.presence == Presence::Required {
                    out.push(Diagnostic::new(path, "required attribute is not set"));
                }
                continue;
            };

            if attribute.is_computed() {
                out.push(Diagnostic::new(path, "computed attribute cannot be set"));
                continue;
            }

            if !attribute.type_matches(value) {
                out.push(Diagnostic::new(
                    path,
                    format!(
                        "expected {:?}, found {}",
                        attribute.value_type,
                        type_name(value)
                    ),
                ));
                continue;
            }

            for validation in &attribute.validations {
                if let Err(message) = validation.check(value) {
                    out.push(Diagnostic::new(path.clone(), message));
                }
            }

            if let (Some(block), Some(items)) = (&attribute.block, value.as_array()) {
                if let Some(min) = attribute.min_items.filter(|min| items.len() < *min) {
                    out.push(Diagnostic::new(
                        path.clone(),
                        format!("requires at least {min} block(s)"),
                    ));
                }
                if let Some(max) = attribute.max_items.filter(|max| items.len() > *max) {
                    out.push(Diagnostic::new(
                        path.clone(),
                        format!("allows at most {max} block(s)"),
                    ));
                }
                for (i, item) in items.iter().enumerate() {
                    if let Some(inner) = item.as_object() {
                        block.validate_object(inner, &format!("{path}.{i}."), out);
                    }
                }
            }
        }
    }

    /// Top-level `force_new` attributes whose desired value differs from the
    /// current one.
    pub fn force_new_changes(&self, current: &ResourceData, desired: &ResourceData) -> Vec<String> {
        self.attributes
            .iter()
            .filter(|(_, a)| a.force_new)
            .filter_map(|(name, _)| match (current.get(name), desired.get(name)) {
                (Some(before), Some(after)) if before != after => Some(name.to_string()),
                _ => None,
            })
            .collect()
    }
}
