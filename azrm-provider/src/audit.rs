//! Audit logging of resource lifecycle events.
//!
//! Events are emitted as tracing events on the `audit` target so they can be
//! routed separately from operational logs.

use tracing::info;

/// Audit logger with lifecycle-specific methods.
#[derive(Debug, Clone)]
pub struct AuditLogger {
    component: String,
    enabled: bool,
}

impl AuditLogger {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            enabled: true,
        }
    }

    /// Create a noop audit logger (for testing)
    pub fn new_noop() -> Self {
        Self {
            component: String::new(),
            enabled: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn log(&self, resource_type: &str, id: &str, message: String) {
        if !self.enabled {
            return;
        }
        info!(
            target: "audit",
            component = %self.component,
            resource_type,
            id,
            "{}",
            message
        );
    }

    // === Lifecycle Events ===

    pub fn created(&self, resource_type: &str, id: &str) {
        self.log(resource_type, id, format!("{} '{}' created", resource_type, id));
    }

    pub fn updated(&self, resource_type: &str, id: &str) {
        self.log(resource_type, id, format!("{} '{}' updated", resource_type, id));
    }

    pub fn deleted(&self, resource_type: &str, id: &str) {
        self.log(resource_type, id, format!("{} '{}' deleted", resource_type, id));
    }

    /// The resource vanished remotely and is dropped from state.
    pub fn removed_from_state(&self, resource_type: &str, id: &str) {
        self.log(
            resource_type,
            id,
            format!("{} '{}' was not found, removing from state", resource_type, id),
        );
    }
}
