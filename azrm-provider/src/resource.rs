//! The per-type binding a [`Reconciler`](crate::reconciler::Reconciler) drives.

use std::time::Duration;

use async_trait::async_trait;
use azrm_arm::ResourceId;

use crate::error::Result;
use crate::schema::Schema;
use crate::state::ResourceData;

/// Per-operation deadlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub create: Duration,
    pub read: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Timeouts {
    /// Timeouts given in minutes.
    pub const fn minutes(create: u64, read: u64, update: u64, delete: u64) -> Self {
        Self {
            create: Duration::from_secs(create * 60),
            read: Duration::from_secs(read * 60),
            update: Duration::from_secs(update * 60),
            delete: Duration::from_secs(delete * 60),
        }
    }

    /// The same deadline for every operation.
    pub const fn uniform(timeout: Duration) -> Self {
        Self {
            create: timeout,
            read: timeout,
            update: timeout,
            delete: timeout,
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self::minutes(30, 5, 30, 30)
    }
}

/// Binding of one managed resource type to the management API.
///
/// Implementations only translate between [`ResourceData`] and API calls and
/// wait for long-running operations. Validation, conflict detection, timeouts
/// and state merging are handled by the reconciler.
#[async_trait]
pub trait Resource: Send + Sync {
    /// Structured identifier of an instance.
    type Id: ResourceId;

    /// Resource type name, e.g. `azurerm_stream_analytics_job`.
    fn type_name(&self) -> &'static str;

    fn schema(&self) -> Schema;

    fn timeouts(&self) -> Timeouts {
        Timeouts::default()
    }

    /// Identifier the desired configuration would be created under.
    fn candidate_id(&self, desired: &ResourceData) -> Result<Self::Id>;

    /// Whether the resource exists remotely.
    async fn probe(&self, id: &Self::Id) -> Result<bool> {
        Ok(self.fetch(id, None).await?.is_some())
    }

    /// Current remote state, `None` if absent. `prior` only orders nested
    /// blocks; merging is done by the caller.
    async fn fetch(&self, id: &Self::Id, prior: Option<&ResourceData>)
    -> Result<Option<ResourceData>>;

    /// Create from the full desired configuration and wait for completion.
    async fn create(&self, id: &Self::Id, desired: &ResourceData) -> Result<()>;

    /// Apply the mutable subset of `desired` to an existing resource.
    async fn update(
        &self,
        id: &Self::Id,
        desired: &ResourceData,
        current: &ResourceData,
    ) -> Result<()>;

    /// Delete and wait for completion.
    async fn remove(&self, id: &Self::Id) -> Result<()>;
}
