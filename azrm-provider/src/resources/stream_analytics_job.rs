//! `azurerm_stream_analytics_job`: a Stream Analytics streaming job and its
//! single transformation.
//!
//! The transformation is sent inline on create but has its own endpoint for
//! updates, so an update patches the job first and then the transformation
//! the service reports for it.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use azrm_arm::ArmClient;
use azrm_arm::StreamingJobId;
use azrm_arm::streamanalytics::{
    ClusterInfo, EXPAND_TRANSFORMATION, Identity, SKU_STANDARD, StreamingJob,
    StreamingJobProperties, StreamingJobSku, StreamingJobsClient, Transformation,
    TransformationProperties, TransformationsClient,
};

use super::{expand_tags, location, normalize_location, optional_i32, required_i32, required_str};
use crate::error::{ProviderError, Result};
use crate::resource::{Resource, Timeouts};
use crate::schema::{Attribute, Schema, Validation};
use crate::state::ResourceData;

pub const TYPE_NAME: &str = "azurerm_stream_analytics_job";

/// Name of the transformation created together with the job.
const TRANSFORMATION_NAME: &str = "main";

fn validate_streaming_units(value: &Value) -> std::result::Result<(), String> {
    match value.as_i64() {
        Some(1 | 3) => Ok(()),
        Some(n) if n > 0 && n <= 120 && n % 6 == 0 => Ok(()),
        _ => Err("must be 1, 3 or a multiple of 6 up to 120".to_string()),
    }
}

fn validate_job_name(value: &Value) -> std::result::Result<(), String> {
    super::check_segment_name(value, 3, 63)
}

pub fn schema() -> Schema {
    let identity = Schema::new()
        .with(
            "type",
            Attribute::string()
                .required()
                .validate(Validation::OneOf(&["SystemAssigned"])),
        )
        .with("principal_id", Attribute::string().computed())
        .with("tenant_id", Attribute::string().computed());

    Schema::new()
        .with(
            "name",
            Attribute::string()
                .required()
                .force_new()
                .validate(Validation::Custom(validate_job_name)),
        )
        .with("resource_group_name", super::resource_group_name())
        .with("location", location())
        .with(
            "stream_analytics_cluster_id",
            Attribute::string().validate(Validation::NotEmpty),
        )
        .with(
            "compatibility_level",
            Attribute::string()
                .optional_computed()
                .validate(Validation::OneOf(&["1.0", "1.1"])),
        )
        .with(
            "data_locale",
            Attribute::string()
                .optional_computed()
                .validate(Validation::NotEmpty),
        )
        .with(
            "events_late_arrival_max_delay_in_seconds",
            Attribute::int()
                .default(5)
                .validate(Validation::IntBetween(-1, 1_814_399)),
        )
        .with(
            "events_out_of_order_max_delay_in_seconds",
            Attribute::int()
                .default(0)
                .validate(Validation::IntBetween(0, 599)),
        )
        .with(
            "events_out_of_order_policy",
            Attribute::string()
                .default("Adjust")
                .validate(Validation::OneOf(&["Adjust", "Drop"])),
        )
        .with(
            "output_error_policy",
            Attribute::string()
                .default("Drop")
                .validate(Validation::OneOf(&["Drop", "Stop"])),
        )
        .with(
            "streaming_units",
            Attribute::int()
                .required()
                .validate(Validation::Custom(validate_streaming_units)),
        )
        .with(
            "transformation_query",
            Attribute::string()
                .required()
                .validate(Validation::NotEmpty),
        )
        .with("identity", Attribute::block(identity).max_items(1))
        .with("job_id", Attribute::string().computed())
        .with("tags", super::tags())
}

/// Binding for Stream Analytics jobs in one subscription.
pub struct StreamAnalyticsJob {
    subscription_id: String,
    jobs: StreamingJobsClient,
    transformations: TransformationsClient,
}

impl StreamAnalyticsJob {
    pub fn new(subscription_id: impl Into<String>, arm: ArmClient) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            jobs: StreamingJobsClient::new(arm.clone()),
            transformations: TransformationsClient::new(arm),
        }
    }
}

/// Job payload without the transformation.
fn expand(id: &StreamingJobId, desired: &ResourceData) -> Result<StreamingJob> {
    let cluster = match desired
        .get_str("stream_analytics_cluster_id")
        .filter(|c| !c.is_empty())
    {
        Some(cluster_id) => ClusterInfo {
            id: Some(cluster_id.to_string()),
        },
        None => ClusterInfo::default(),
    };

    let identity = desired.get_blocks("identity").first().map(|b| Identity {
        identity_type: b.get_str("type").map(str::to_string),
        ..Default::default()
    });

    Ok(StreamingJob {
        name: Some(id.name.clone()),
        location: Some(normalize_location(required_str(desired, "location")?)),
        tags: Some(expand_tags(desired)),
        identity,
        properties: Some(StreamingJobProperties {
            sku: Some(StreamingJobSku {
                name: Some(SKU_STANDARD.to_string()),
            }),
            compatibility_level: desired
                .get_str("compatibility_level")
                .filter(|l| !l.is_empty())
                .map(str::to_string),
            data_locale: desired.get_str("data_locale").map(str::to_string),
            events_late_arrival_max_delay_in_seconds: optional_i32(
                desired,
                "events_late_arrival_max_delay_in_seconds",
            ),
            events_out_of_order_max_delay_in_seconds: optional_i32(
                desired,
                "events_out_of_order_max_delay_in_seconds",
            ),
            events_out_of_order_policy: desired
                .get_str("events_out_of_order_policy")
                .map(str::to_string),
            output_error_policy: desired.get_str("output_error_policy").map(str::to_string),
            cluster: Some(cluster),
            ..Default::default()
        }),
        ..Default::default()
    })
}

fn expand_transformation(desired: &ResourceData) -> Result<Transformation> {
    Ok(Transformation {
        name: Some(TRANSFORMATION_NAME.to_string()),
        properties: Some(TransformationProperties {
            streaming_units: Some(required_i32(desired, "streaming_units")?),
            query: Some(required_str(desired, "transformation_query")?.to_string()),
            etag: None,
        }),
        ..Default::default()
    })
}

fn flatten(id: &StreamingJobId, job: StreamingJob) -> ResourceData {
    let mut state = ResourceData::new();
    state.set("name", id.name.as_str());
    state.set("resource_group_name", id.resource_group.as_str());
    state.set_opt("location", job.location.as_deref().map(normalize_location));

    let identity = job
        .identity
        .map(|identity| {
            let mut block = ResourceData::new();
            block.set("type", identity.identity_type.unwrap_or_default());
            block.set("principal_id", identity.principal_id.unwrap_or_default());
            block.set("tenant_id", identity.tenant_id.unwrap_or_default());
            block
        })
        .into_iter()
        .collect();
    state.set_blocks("identity", identity);

    if let Some(props) = job.properties {
        state.set_opt("compatibility_level", props.compatibility_level);
        state.set_opt("data_locale", props.data_locale);
        state.set_opt(
            "events_late_arrival_max_delay_in_seconds",
            props.events_late_arrival_max_delay_in_seconds,
        );
        state.set_opt(
            "events_out_of_order_max_delay_in_seconds",
            props.events_out_of_order_max_delay_in_seconds,
        );
        // Nullable: a detached job reports `cluster: {}`, which must clear
        // a previously known id.
        if let Some(cluster) = props.cluster {
            state.set("stream_analytics_cluster_id", cluster.id.unwrap_or_default());
        }
        state.set_opt("events_out_of_order_policy", props.events_out_of_order_policy);
        state.set_opt("output_error_policy", props.output_error_policy);
        state.set_opt("job_id", props.job_id);

        if let Some(transformation) = props.transformation.and_then(|t| t.properties) {
            state.set_opt("streaming_units", transformation.streaming_units);
            state.set_opt("transformation_query", transformation.query);
        }
    }

    state.set_string_map("tags", job.tags.unwrap_or_default());
    state
}

#[async_trait]
impl Resource for StreamAnalyticsJob {
    type Id = StreamingJobId;

    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        schema()
    }

    fn timeouts(&self) -> Timeouts {
        Timeouts::minutes(30, 5, 30, 30)
    }

    fn candidate_id(&self, desired: &ResourceData) -> Result<StreamingJobId> {
        Ok(StreamingJobId::new(
            &self.subscription_id,
            required_str(desired, "resource_group_name")?,
            required_str(desired, "name")?,
        ))
    }

    async fn probe(&self, id: &StreamingJobId) -> Result<bool> {
        let existing = self
            .jobs
            .get(id, None)
            .await
            .map_err(|e| ProviderError::api("checking for presence of existing", id, e))?;
        Ok(existing.is_some())
    }

    async fn fetch(
        &self,
        id: &StreamingJobId,
        _prior: Option<&ResourceData>,
    ) -> Result<Option<ResourceData>> {
        let job = self
            .jobs
            .get(id, Some(EXPAND_TRANSFORMATION))
            .await
            .map_err(|e| ProviderError::api("retrieving", id, e))?;
        Ok(job.map(|job| flatten(id, job)))
    }

    async fn create(&self, id: &StreamingJobId, desired: &ResourceData) -> Result<()> {
        let mut job = expand(id, desired)?;
        if let Some(props) = job.properties.as_mut() {
            props.transformation = Some(expand_transformation(desired)?);
        }

        self.jobs
            .create_or_replace(id, &job)
            .await
            .map_err(|e| ProviderError::api("creating", id, e))?
            .wait()
            .await
            .map_err(|e| ProviderError::api("waiting for creation of", id, e))?;

        info!("Created streaming job {}", id);
        Ok(())
    }

    async fn update(
        &self,
        id: &StreamingJobId,
        desired: &ResourceData,
        _current: &ResourceData,
    ) -> Result<()> {
        let job = expand(id, desired)?;
        let transformation = expand_transformation(desired)?;

        self.jobs
            .update(id, &job)
            .await
            .map_err(|e| ProviderError::api("updating", id, e))?;

        let existing = self
            .jobs
            .get(id, Some(EXPAND_TRANSFORMATION))
            .await
            .map_err(|e| ProviderError::api("retrieving", id, e))?
            .ok_or_else(|| ProviderError::NotFound {
                operation: "updating".to_string(),
                id: id.to_string(),
            })?;

        match existing.properties.and_then(|p| p.transformation) {
            Some(current) => {
                let name = current
                    .name
                    .unwrap_or_else(|| TRANSFORMATION_NAME.to_string());
                self.transformations
                    .update(&id.transformation(name), &transformation)
                    .await
                    .map_err(|e| ProviderError::api("updating transformation for", id, e))?;
            }
            None => debug!("Streaming job {} has no transformation to update", id),
        }

        info!("Updated streaming job {}", id);
        Ok(())
    }

    async fn remove(&self, id: &StreamingJobId) -> Result<()> {
        self.jobs
            .delete(id)
            .await
            .map_err(|e| ProviderError::api("deleting", id, e))?
            .wait()
            .await
            .map_err(|e| ProviderError::api("waiting for deletion of", id, e))?;

        info!("Deleted streaming job {}", id);
        Ok(())
    }
}
