//! Provider error types.

use std::fmt;
use std::time::Duration;

use azrm_arm::{ArmError, ResourceIdError};
use thiserror::Error;

/// A problem with one attribute of a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub attribute: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(attribute: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.attribute, self.message)
    }
}

fn join(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors returned by the reconciler entry points.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The desired configuration does not satisfy the schema.
    #[error("invalid configuration: {}", join(.0))]
    Validation(Vec<Diagnostic>),

    /// A persisted identifier could not be parsed.
    #[error(transparent)]
    InvalidId(#[from] ResourceIdError),

    /// Create found a resource that is not tracked yet.
    #[error(
        "a resource with the ID {id:?} already exists - to be managed it needs to be imported into the state as {resource_type:?}"
    )]
    AlreadyExists { resource_type: String, id: String },

    /// The addressed resource does not exist.
    #[error("{operation} {id}: resource not found")]
    NotFound { operation: String, id: String },

    /// An immutable attribute changed.
    #[error("{id} must be replaced, immutable attributes changed: {}", .attributes.join(", "))]
    RequiresReplacement { id: String, attributes: Vec<String> },

    /// The management API reported a failure.
    #[error("{operation} {id}: {source}")]
    Api {
        operation: String,
        id: String,
        #[source]
        source: ArmError,
    },

    /// The operation did not finish within its deadline.
    #[error("{operation} {id}: timed out after {after:?}")]
    Timeout {
        operation: String,
        id: String,
        after: Duration,
    },

    /// Provider configuration is unusable.
    #[error("provider configuration: {0}")]
    Config(String),
}

impl ProviderError {
    /// Wrap an API error with the operation and resource it belongs to.
    /// A 404 becomes [`ProviderError::NotFound`].
    pub fn api(operation: &str, id: &impl fmt::Display, source: ArmError) -> Self {
        if source.is_not_found() {
            ProviderError::NotFound {
                operation: operation.to_string(),
                id: id.to_string(),
            }
        } else {
            ProviderError::Api {
                operation: operation.to_string(),
                id: id.to_string(),
                source,
            }
        }
    }

    /// Shorthand for a single-attribute validation failure.
    pub fn invalid(attribute: impl Into<String>, message: impl Into<String>) -> Self {
        ProviderError::Validation(vec![Diagnostic::new(attribute, message)])
    }
}

/// Result type for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_wraps_operation_and_id() {
        let err = ProviderError::api(
            "creating",
            &"/subscriptions/s/resourceGroups/rg/providers/Microsoft.StreamAnalytics/streamingjobs/j",
            ArmError::from_response(409, br#"{"error":{"code":"Conflict","message":"busy"}}"#),
        );
        assert_eq!(
            err.to_string(),
            "creating /subscriptions/s/resourceGroups/rg/providers/Microsoft.StreamAnalytics/streamingjobs/j: unexpected status 409 (Conflict): busy"
        );
    }

    #[test]
    fn api_maps_404_to_not_found() {
        let err = ProviderError::api("deleting", &"x", ArmError::from_response(404, b""));
        assert!(matches!(err, ProviderError::NotFound { .. }));
    }

    #[test]
    fn validation_lists_every_diagnostic() {
        let err = ProviderError::Validation(vec![
            Diagnostic::new("name", "must not be empty"),
            Diagnostic::new("streaming_units", "must be 1, 3 or a multiple of 6 up to 120"),
        ]);
        assert_eq!(
            err.to_string(),
            "invalid configuration: name: must not be empty; streaming_units: must be 1, 3 or a multiple of 6 up to 120"
        );
    }
}
