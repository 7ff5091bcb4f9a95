//! Structured ARM resource identifiers.
//!
//! Every identifier has one canonical string form,
//! `/subscriptions/{sub}/resourceGroups/{rg}/providers/{namespace}/{type}/{name}[/{child}/{name}]`,
//! and a parser that rejects anything else. Keys are matched exactly.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A resource id string could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("parsing resource id {input:?}: {reason}")]
pub struct ResourceIdError {
    pub input: String,
    pub reason: String,
}

impl ResourceIdError {
    fn new(input: &str, reason: impl Into<String>) -> Self {
        Self {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// Common bound for typed resource identifiers.
pub trait ResourceId:
    fmt::Display
    + fmt::Debug
    + FromStr<Err = ResourceIdError>
    + Clone
    + PartialEq
    + Send
    + Sync
    + 'static
{
    /// Path of the resource, relative to the management endpoint.
    fn path(&self) -> String {
        self.to_string()
    }
}

/// One expected `key/value` pair of an id.
enum Expect {
    /// Key whose value is captured.
    Value(&'static str),
    /// Key whose value must be this literal.
    Literal(&'static str, &'static str),
}

/// Split `input` into `key/value` pairs and match them against `pattern`,
/// returning the captured values in order.
fn match_segments(input: &str, pattern: &[Expect]) -> Result<Vec<String>, ResourceIdError> {
    let rest = input
        .strip_prefix('/')
        .ok_or_else(|| ResourceIdError::new(input, "must start with '/'"))?;

    let parts: Vec<&str> = rest.split('/').collect();
    if parts.iter().any(|p| p.is_empty()) {
        return Err(ResourceIdError::new(input, "contains an empty segment"));
    }
    if parts.len() % 2 != 0 {
        return Err(ResourceIdError::new(
            input,
            "expected an even number of segments",
        ));
    }

    let pairs: Vec<(&str, &str)> = parts.chunks(2).map(|c| (c[0], c[1])).collect();
    if pairs.len() != pattern.len() {
        return Err(ResourceIdError::new(
            input,
            format!(
                "expected {} key/value pairs, found {}",
                pattern.len(),
                pairs.len()
            ),
        ));
    }

    let mut values = Vec::new();
    for ((key, value), expect) in pairs.iter().zip(pattern) {
        match expect {
            Expect::Value(expected_key) => {
                if key != expected_key {
                    return Err(ResourceIdError::new(
                        input,
                        format!("expected segment {expected_key:?}, found {key:?}"),
                    ));
                }
                values.push(value.to_string());
            }
            Expect::Literal(expected_key, expected_value) => {
                if key != expected_key || value != expected_value {
                    return Err(ResourceIdError::new(
                        input,
                        format!(
                            "expected {expected_key}/{expected_value}, found {key}/{value}"
                        ),
                    ));
                }
            }
        }
    }
    Ok(values)
}

const STREAM_ANALYTICS: &str = "Microsoft.StreamAnalytics";
const SERVICE_FABRIC: &str = "Microsoft.ServiceFabric";

// =============================================================================
// Stream Analytics
// =============================================================================

/// Identifier of a Stream Analytics streaming job.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamingJobId {
    pub subscription_id: String,
    pub resource_group: String,
    pub name: String,
}

impl StreamingJobId {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
            name: name.into(),
        }
    }

    /// Id of a transformation belonging to this job.
    pub fn transformation(&self, name: impl Into<String>) -> TransformationId {
        TransformationId {
            job: self.clone(),
            name: name.into(),
        }
    }
}

impl fmt::Display for StreamingJobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/subscriptions/{}/resourceGroups/{}/providers/{}/streamingjobs/{}",
            self.subscription_id, self.resource_group, STREAM_ANALYTICS, self.name
        )
    }
}

impl FromStr for StreamingJobId {
    type Err = ResourceIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let v = match_segments(
            s,
            &[
                Expect::Value("subscriptions"),
                Expect::Value("resourceGroups"),
                Expect::Literal("providers", STREAM_ANALYTICS),
                Expect::Value("streamingjobs"),
            ],
        )?;
        Ok(Self::new(&v[0], &v[1], &v[2]))
    }
}

impl ResourceId for StreamingJobId {}

/// Identifier of a transformation (query) of a streaming job.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransformationId {
    pub job: StreamingJobId,
    pub name: String,
}

impl fmt::Display for TransformationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/transformations/{}", self.job, self.name)
    }
}

impl FromStr for TransformationId {
    type Err = ResourceIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let v = match_segments(
            s,
            &[
                Expect::Value("subscriptions"),
                Expect::Value("resourceGroups"),
                Expect::Literal("providers", STREAM_ANALYTICS),
                Expect::Value("streamingjobs"),
                Expect::Value("transformations"),
            ],
        )?;
        Ok(StreamingJobId::new(&v[0], &v[1], &v[2]).transformation(&v[3]))
    }
}

impl ResourceId for TransformationId {}

// =============================================================================
// Service Fabric managed clusters
// =============================================================================

/// Identifier of a Service Fabric managed cluster.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ManagedClusterId {
    pub subscription_id: String,
    pub resource_group: String,
    pub cluster_name: String,
}

impl ManagedClusterId {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        cluster_name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
            cluster_name: cluster_name.into(),
        }
    }

    /// Id of a node type belonging to this cluster.
    pub fn node_type(&self, name: impl Into<String>) -> NodeTypeId {
        NodeTypeId {
            cluster: self.clone(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ManagedClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/subscriptions/{}/resourceGroups/{}/providers/{}/managedClusters/{}",
            self.subscription_id, self.resource_group, SERVICE_FABRIC, self.cluster_name
        )
    }
}

impl FromStr for ManagedClusterId {
    type Err = ResourceIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let v = match_segments(
            s,
            &[
                Expect::Value("subscriptions"),
                Expect::Value("resourceGroups"),
                Expect::Literal("providers", SERVICE_FABRIC),
                Expect::Value("managedClusters"),
            ],
        )?;
        Ok(Self::new(&v[0], &v[1], &v[2]))
    }
}

impl ResourceId for ManagedClusterId {}

/// Identifier of a node type inside a managed cluster.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeTypeId {
    pub cluster: ManagedClusterId,
    pub name: String,
}

impl fmt::Display for NodeTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/nodeTypes/{}", self.cluster, self.name)
    }
}

impl FromStr for NodeTypeId {
    type Err = ResourceIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let v = match_segments(
            s,
            &[
                Expect::Value("subscriptions"),
                Expect::Value("resourceGroups"),
                Expect::Literal("providers", SERVICE_FABRIC),
                Expect::Value("managedClusters"),
                Expect::Value("nodeTypes"),
            ],
        )?;
        Ok(ManagedClusterId::new(&v[0], &v[1], &v[2]).node_type(&v[3]))
    }
}

impl ResourceId for NodeTypeId {}
