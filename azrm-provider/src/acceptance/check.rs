//! Assertions evaluated after an acceptance step.

use std::fmt;

use crate::reconciler::Reconciler;
use crate::resource::Resource;
use crate::state::ResourceData;

/// One assertion about the resource after a step.
#[derive(Debug, Clone)]
pub enum Check {
    /// The resource exists remotely.
    Exists,
    /// A flat-map key holds exactly this value.
    HasValue { key: String, value: String },
    /// A flat-map key holds a non-empty value.
    IsSet { key: String },
}

/// Builder returned by [`Check::key`].
pub struct KeyCheck {
    key: String,
}

impl KeyCheck {
    pub fn has_value(self, value: impl Into<String>) -> Check {
        Check::HasValue {
            key: self.key,
            value: value.into(),
        }
    }

    pub fn is_set(self) -> Check {
        Check::IsSet { key: self.key }
    }
}

impl Check {
    pub fn exists() -> Self {
        Check::Exists
    }

    /// Address a key in flat-map notation (`tags.%`, `node_type.0.name`).
    pub fn key(key: impl Into<String>) -> KeyCheck {
        KeyCheck { key: key.into() }
    }

    pub(crate) async fn evaluate<R: Resource>(
        &self,
        reconciler: &Reconciler<R>,
        id: &str,
        state: &ResourceData,
    ) -> Result<(), String> {
        match self {
            Check::Exists => match reconciler.exists(id).await {
                Ok(true) => Ok(()),
                Ok(false) => Err(format!("{id} does not exist")),
                Err(e) => Err(e.to_string()),
            },
            Check::HasValue { key, value } => {
                let flat = state.flatten();
                match flat.get(key) {
                    Some(actual) if actual == value => Ok(()),
                    actual => Err(format!("{key}: expected {value:?}, got {actual:?}")),
                }
            }
            Check::IsSet { key } => match state.flatten().get(key) {
                Some(actual) if !actual.is_empty() => Ok(()),
                _ => Err(format!("{key}: expected a value")),
            },
        }
    }
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Check::Exists => write!(f, "exists"),
            Check::HasValue { key, value } => write!(f, "{key} = {value:?}"),
            Check::IsSet { key } => write!(f, "{key} is set"),
        }
    }
}
