//! `Microsoft.StreamAnalytics` streaming jobs and transformations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::{ArmClient, found};
use crate::error::Result;
use crate::id::{ResourceId, StreamingJobId, TransformationId};
use crate::poller::Poller;

pub const API_VERSION: &str = "2020-03-01-preview";

/// SKU name of every job created through this client.
pub const SKU_STANDARD: &str = "Standard";

/// `$expand` value that inlines the job's transformation.
pub const EXPAND_TRANSFORMATION: &str = "transformation";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamingJob {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<Identity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<StreamingJobProperties>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamingJobProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<StreamingJobSku>,
    /// Server-assigned GUID of the job.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_state: Option<String>,
    /// `Adjust` or `Drop`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events_out_of_order_policy: Option<String>,
    /// `Stop` or `Drop`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_error_policy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events_out_of_order_max_delay_in_seconds: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events_late_arrival_max_delay_in_seconds: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_locale: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compatibility_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transformation: Option<Transformation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster: Option<ClusterInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamingJobSku {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Reference to a dedicated Stream Analytics cluster. An empty object detaches
/// the job from any cluster.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub identity_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transformation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<TransformationProperties>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformationProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub streaming_units: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

/// Client for streaming jobs.
#[derive(Clone)]
pub struct StreamingJobsClient {
    arm: ArmClient,
}

impl StreamingJobsClient {
    pub fn new(arm: ArmClient) -> Self {
        Self { arm }
    }

    /// Get a job, optionally expanding nested sub-resources. `None` if absent.
    pub async fn get(
        &self,
        id: &StreamingJobId,
        expand: Option<&str>,
    ) -> Result<Option<StreamingJob>> {
        debug!("Getting streaming job {}", id);
        let query: Vec<(&str, &str)> = expand.map(|e| ("$expand", e)).into_iter().collect();
        found(self.arm.get(&id.path(), API_VERSION, &query).await)
    }

    /// Create or fully replace a job. The returned poller tracks provisioning.
    pub async fn create_or_replace(
        &self,
        id: &StreamingJobId,
        job: &StreamingJob,
    ) -> Result<Poller> {
        debug!("Creating or replacing streaming job {}", id);
        let response = self.arm.put(&id.path(), API_VERSION, job).await?;
        Ok(self.arm.poller(&response))
    }

    /// Patch the job's top-level properties. Transformations are not updated
    /// through this call.
    pub async fn update(&self, id: &StreamingJobId, job: &StreamingJob) -> Result<StreamingJob> {
        debug!("Updating streaming job {}", id);
        self.arm.patch(&id.path(), API_VERSION, job).await?.json()
    }

    pub async fn delete(&self, id: &StreamingJobId) -> Result<Poller> {
        debug!("Deleting streaming job {}", id);
        let response = self.arm.delete(&id.path(), API_VERSION).await?;
        Ok(self.arm.poller(&response))
    }
}

/// Client for the transformation sub-resource of a job.
#[derive(Clone)]
pub struct TransformationsClient {
    arm: ArmClient,
}

impl TransformationsClient {
    pub fn new(arm: ArmClient) -> Self {
        Self { arm }
    }

    pub async fn get(&self, id: &TransformationId) -> Result<Option<Transformation>> {
        debug!("Getting transformation {}", id);
        found(self.arm.get(&id.path(), API_VERSION, &[]).await)
    }

    pub async fn update(
        &self,
        id: &TransformationId,
        transformation: &Transformation,
    ) -> Result<Transformation> {
        debug!("Updating transformation {}", id);
        self.arm
            .patch(&id.path(), API_VERSION, transformation)
            .await?
            .json()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn serializes_wire_names_and_skips_unset_fields() {
        let job = StreamingJob {
            location: Some("westeurope".into()),
            properties: Some(StreamingJobProperties {
                sku: Some(StreamingJobSku {
                    name: Some(SKU_STANDARD.into()),
                }),
                events_late_arrival_max_delay_in_seconds: Some(5),
                cluster: Some(ClusterInfo::default()),
                transformation: Some(Transformation {
                    name: Some("main".into()),
                    properties: Some(TransformationProperties {
                        streaming_units: Some(3),
                        query: Some("SELECT * INTO o FROM i".into()),
                        etag: None,
                    }),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        };

        assert_eq!(
            serde_json::to_value(&job).unwrap(),
            json!({
                "location": "westeurope",
                "properties": {
                    "sku": {"name": "Standard"},
                    "eventsLateArrivalMaxDelayInSeconds": 5,
                    "cluster": {},
                    "transformation": {
                        "name": "main",
                        "properties": {"streamingUnits": 3, "query": "SELECT * INTO o FROM i"}
                    }
                }
            })
        );
    }

    #[test]
    fn decodes_identity() {
        let job: StreamingJob = serde_json::from_value(json!({
            "identity": {"type": "SystemAssigned", "principalId": "p", "tenantId": "t"},
            "properties": {"jobId": "j"}
        }))
        .unwrap();
        let identity = job.identity.unwrap();
        assert_eq!(identity.identity_type.as_deref(), Some("SystemAssigned"));
        assert_eq!(identity.principal_id.as_deref(), Some("p"));
        assert_eq!(job.properties.unwrap().job_id.as_deref(), Some("j"));
    }
}
