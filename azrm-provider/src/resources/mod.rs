//! Resource bindings and the attribute helpers they share.

pub mod service_fabric_managed_cluster;
pub mod stream_analytics_job;

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::{ProviderError, Result};
use crate::schema::{Attribute, Validation};
use crate::state::ResourceData;

pub use service_fabric_managed_cluster::ServiceFabricManagedCluster;
pub use stream_analytics_job::StreamAnalyticsJob;

/// Lower-case and strip spaces, so `West Europe` and `westeurope` compare equal.
pub fn normalize_location(location: &str) -> String {
    location.replace(' ', "").to_lowercase()
}

fn validate_resource_group_name(value: &Value) -> std::result::Result<(), String> {
    let name = value.as_str().unwrap_or_default();
    if name.is_empty() || name.len() > 90 {
        return Err("must be between 1 and 90 characters".to_string());
    }
    if name.ends_with('.') {
        return Err("cannot end with a period".to_string());
    }
    if !name
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | '(' | ')'))
    {
        return Err(
            "may only contain alphanumerics, underscores, parentheses, hyphens and periods"
                .to_string(),
        );
    }
    Ok(())
}

/// Names that end up as a path segment of the resource id: letters, digits,
/// hyphens and underscores only.
pub(crate) fn check_segment_name(
    value: &Value,
    min: usize,
    max: usize,
) -> std::result::Result<(), String> {
    let name = value.as_str().unwrap_or_default();
    if !(min..=max).contains(&name.len()) {
        return Err(format!("must be between {min} and {max} characters"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err("may only contain letters, digits, hyphens and underscores".to_string());
    }
    Ok(())
}

pub(crate) fn resource_group_name() -> Attribute {
    Attribute::string()
        .required()
        .force_new()
        .validate(Validation::Custom(validate_resource_group_name))
}

pub(crate) fn location() -> Attribute {
    Attribute::string()
        .required()
        .force_new()
        .normalize(normalize_location)
        .validate(Validation::NotEmpty)
}

pub(crate) fn tags() -> Attribute {
    Attribute::map().validate(Validation::MaxEntries(50))
}

/// A string attribute the schema marks as required.
pub(crate) fn required_str<'a>(data: &'a ResourceData, key: &str) -> Result<&'a str> {
    data.get_str(key)
        .ok_or_else(|| ProviderError::invalid(key, "required attribute is not set"))
}

/// A required integer attribute that must fit the API's 32-bit field.
pub(crate) fn required_i32(data: &ResourceData, key: &str) -> Result<i32> {
    let value = data
        .get_i64(key)
        .ok_or_else(|| ProviderError::invalid(key, "required attribute is not set"))?;
    i32::try_from(value).map_err(|_| ProviderError::invalid(key, "out of range"))
}

pub(crate) fn optional_i32(data: &ResourceData, key: &str) -> Option<i32> {
    data.get_i64(key).and_then(|v| i32::try_from(v).ok())
}

/// Tags as sent to the API; absent tags become an empty map.
pub(crate) fn expand_tags(data: &ResourceData) -> BTreeMap<String, String> {
    data.get_string_map("tags").unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn location_normalisation() {
        assert_eq!(normalize_location("West Europe"), "westeurope");
        assert_eq!(normalize_location("eastus2"), "eastus2");
    }

    #[test]
    fn resource_group_names() {
        assert!(validate_resource_group_name(&json!("acctestRG-sf-1")).is_ok());
        assert!(validate_resource_group_name(&json!("rg(1)_x.y")).is_ok());
        assert!(validate_resource_group_name(&json!("")).is_err());
        assert!(validate_resource_group_name(&json!("rg.")).is_err());
        assert!(validate_resource_group_name(&json!("rg/1")).is_err());
        assert!(validate_resource_group_name(&json!("r".repeat(91))).is_err());
    }

    #[test]
    fn segment_names() {
        assert!(check_segment_name(&json!("acctest_job-1"), 3, 63).is_ok());
        for bad in ["a/b", "job?x", "job#1", "job%2F", "job name", "ab"] {
            assert!(check_segment_name(&json!(bad), 3, 63).is_err(), "{bad}");
        }
        assert!(check_segment_name(&json!("j".repeat(64)), 3, 63).is_err());
    }

    #[test]
    fn required_i32_rejects_overflow() {
        let d = ResourceData::from_value(json!({"a": 5, "b": 10_000_000_000i64})).unwrap();
        assert_eq!(required_i32(&d, "a").unwrap(), 5);
        assert!(required_i32(&d, "b").is_err());
        assert!(required_i32(&d, "c").is_err());
        assert_eq!(optional_i32(&d, "c"), None);
    }
}
