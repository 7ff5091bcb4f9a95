//! azrm-provider: declarative lifecycle management for Azure resources.
//!
//! Each managed resource type is a [`resource::Resource`] binding driven by a
//! generic [`reconciler::Reconciler`] that exposes four entry points:
//! create-or-update, read, delete and exists.
//!
//! Managed resource types:
//! - `azurerm_stream_analytics_job`
//! - `azurerm_service_fabric_managed_cluster`

pub mod audit;
pub mod config;
pub mod error;
pub mod provider;
pub mod reconciler;
pub mod resource;
pub mod resources;
pub mod schema;
pub mod state;

#[cfg(any(test, feature = "test-util"))]
pub mod acceptance;

pub use audit::AuditLogger;
pub use config::{ProviderArgs, ProviderConfig, load_resource_data};
pub use error::{Diagnostic, ProviderError, Result};
pub use provider::{Provider, RESOURCE_TYPES};
pub use reconciler::Reconciler;
pub use resource::{Resource, Timeouts};
pub use schema::Schema;
pub use state::ResourceData;
