//! Entry point that wires the configured client into the resource reconcilers.

use std::sync::Arc;

use azrm_arm::{ArmClient, StaticTokenCredential};
use tracing::info;

use crate::audit::AuditLogger;
use crate::config::ProviderConfig;
use crate::error::{ProviderError, Result};
use crate::reconciler::Reconciler;
use crate::resource::{Resource, Timeouts};
use crate::resources::{
    ServiceFabricManagedCluster, StreamAnalyticsJob, service_fabric_managed_cluster,
    stream_analytics_job,
};

/// Resource types this provider manages.
pub const RESOURCE_TYPES: &[&str] = &[
    stream_analytics_job::TYPE_NAME,
    service_fabric_managed_cluster::TYPE_NAME,
];

pub struct Provider {
    config: ProviderConfig,
    arm: ArmClient,
    audit: AuditLogger,
}

impl Provider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        config.validate()?;

        let credential = Arc::new(StaticTokenCredential::new(config.access_token.clone()));
        let arm = ArmClient::new(&config.endpoint, credential)
            .map_err(|e| ProviderError::Config(e.to_string()))?
            .with_poll_interval(config.poll_interval);

        info!(
            "Provider configured for subscription {} at {}",
            config.subscription_id, config.endpoint
        );

        Ok(Self {
            config,
            arm,
            audit: AuditLogger::new("azrm"),
        })
    }

    pub fn with_audit(mut self, audit: AuditLogger) -> Self {
        self.audit = audit;
        self
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn reconciler<R: Resource>(&self, resource: R) -> Reconciler<R> {
        let reconciler = Reconciler::new(resource, self.audit.clone());
        match self.config.operation_timeout {
            Some(timeout) => reconciler.with_timeouts(Timeouts::uniform(timeout)),
            None => reconciler,
        }
    }

    pub fn stream_analytics_job(&self) -> Reconciler<StreamAnalyticsJob> {
        self.reconciler(StreamAnalyticsJob::new(
            &self.config.subscription_id,
            self.arm.clone(),
        ))
    }

    pub fn service_fabric_managed_cluster(&self) -> Reconciler<ServiceFabricManagedCluster> {
        self.reconciler(ServiceFabricManagedCluster::new(
            &self.config.subscription_id,
            self.arm.clone(),
        ))
    }
}
