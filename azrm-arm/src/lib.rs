//! azrm-arm: client for the Azure Resource Manager management API.
//!
//! Provides the pieces resource bindings are built from:
//! - Structured resource identifiers with canonical encodings
//! - An authenticated JSON transport over HTTPS
//! - Long-running operation polling
//! - Typed models and clients for Stream Analytics jobs and
//!   Service Fabric managed clusters

pub mod client;
pub mod error;
pub mod id;
pub mod poller;
pub mod servicefabric;
pub mod streamanalytics;

pub use client::{ArmClient, ArmResponse, StaticTokenCredential, TokenCredential};
pub use error::{ArmError, Result};
pub use id::{
    ManagedClusterId, NodeTypeId, ResourceId, ResourceIdError, StreamingJobId, TransformationId,
};
pub use poller::Poller;
