//! Generic resource lifecycle reconciler.
//!
//! One [`Reconciler`] exists per managed resource type. It owns the policy
//! shared by every type (validation before any request, conflict detection on
//! create, immutable-attribute checks on update, deadlines and state merging)
//! and delegates the API calls to its [`Resource`] binding.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::audit::AuditLogger;
use crate::error::{ProviderError, Result};
use crate::resource::{Resource, Timeouts};
use crate::schema::Schema;
use crate::state::ResourceData;

pub struct Reconciler<R: Resource> {
    resource: R,
    timeouts: Timeouts,
    audit: AuditLogger,
}

impl<R: Resource> Reconciler<R> {
    pub fn new(resource: R, audit: AuditLogger) -> Self {
        let timeouts = resource.timeouts();
        Self {
            resource,
            timeouts,
            audit,
        }
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn resource(&self) -> &R {
        &self.resource
    }

    pub fn type_name(&self) -> &'static str {
        self.resource.type_name()
    }

    pub fn schema(&self) -> Schema {
        self.resource.schema()
    }

    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    pub fn parse_id(&self, id: &str) -> Result<R::Id> {
        Ok(id.parse::<R::Id>()?)
    }

    /// Validate `desired` and create or update the resource, returning the
    /// identifier to persist.
    ///
    /// Without `existing` the resource must not exist yet. With `existing` the
    /// resource must exist and may only change mutable attributes.
    pub async fn create_or_update(
        &self,
        desired: &ResourceData,
        existing: Option<&str>,
    ) -> Result<String> {
        let schema = self.resource.schema();
        let mut desired = desired.clone();
        schema.prepare(&mut desired);
        schema.validate(&desired)?;

        let candidate = self.resource.candidate_id(&desired)?;

        match existing {
            None => {
                let id = candidate.to_string();
                bounded("creating", &id, self.timeouts.create, self.create(&candidate, &desired))
                    .await?;
                self.audit.created(self.type_name(), &id);
                Ok(id)
            }
            Some(existing) => {
                let parsed = self.parse_id(existing)?;
                let id = parsed.to_string();
                bounded(
                    "updating",
                    &id,
                    self.timeouts.update,
                    self.update(&parsed, &candidate, &schema, &desired),
                )
                .await?;
                self.audit.updated(self.type_name(), &id);
                Ok(id)
            }
        }
    }

    async fn create(&self, id: &R::Id, desired: &ResourceData) -> Result<()> {
        info!("Creating {} {}", self.type_name(), id);

        if self.resource.probe(id).await? {
            return Err(ProviderError::AlreadyExists {
                resource_type: self.type_name().to_string(),
                id: id.to_string(),
            });
        }

        self.resource.create(id, desired).await
    }

    async fn update(
        &self,
        id: &R::Id,
        candidate: &R::Id,
        schema: &Schema,
        desired: &ResourceData,
    ) -> Result<()> {
        info!("Updating {} {}", self.type_name(), id);

        let current = self.resource.fetch(id, None).await?.ok_or_else(|| {
            ProviderError::NotFound {
                operation: "updating".to_string(),
                id: id.to_string(),
            }
        })?;

        let mut changed = schema.force_new_changes(&current, desired);
        if changed.is_empty() && id != candidate {
            changed.push("id".to_string());
        }
        if !changed.is_empty() {
            return Err(ProviderError::RequiresReplacement {
                id: id.to_string(),
                attributes: changed,
            });
        }

        self.resource.update(id, desired, &current).await
    }

    /// Read the remote state, merged over `prior`. `None` means the resource
    /// is gone and should be dropped from state.
    pub async fn read(&self, id: &str, prior: Option<&ResourceData>) -> Result<Option<ResourceData>> {
        let parsed = self.parse_id(id)?;
        let id = parsed.to_string();
        debug!("Reading {} {}", self.type_name(), id);

        let fetched = bounded(
            "retrieving",
            &id,
            self.timeouts.read,
            self.resource.fetch(&parsed, prior),
        )
        .await?;

        match fetched {
            Some(state) => Ok(Some(match prior {
                Some(prior) => state.merge_over(prior),
                None => state,
            })),
            None => {
                warn!("{} {} was not found, removing from state", self.type_name(), id);
                self.audit.removed_from_state(self.type_name(), &id);
                Ok(None)
            }
        }
    }

    /// Delete the resource and wait until it is gone.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let parsed = self.parse_id(id)?;
        let id = parsed.to_string();
        info!("Deleting {} {}", self.type_name(), id);

        bounded("deleting", &id, self.timeouts.delete, self.resource.remove(&parsed)).await?;
        self.audit.deleted(self.type_name(), &id);
        Ok(())
    }

    pub async fn exists(&self, id: &str) -> Result<bool> {
        let parsed = self.parse_id(id)?;
        let id = parsed.to_string();
        bounded(
            "checking for presence of",
            &id,
            self.timeouts.read,
            self.resource.probe(&parsed),
        )
        .await
    }
}

/// Run `fut` under `after`, mapping expiry to [`ProviderError::Timeout`].
async fn bounded<T>(
    operation: &str,
    id: &str,
    after: Duration,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(after, fut).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout {
            operation: operation.to_string(),
            id: id.to_string(),
            after,
        }),
    }
}
