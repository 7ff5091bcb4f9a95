//! `Microsoft.ServiceFabric` managed clusters and their node types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::{ArmClient, found};
use crate::error::Result;
use crate::id::{ManagedClusterId, NodeTypeId, ResourceId};
use crate::poller::Poller;

pub const API_VERSION: &str = "2021-05-01";

/// Addon feature that enables the cluster DNS service.
pub const ADDON_DNS_SERVICE: &str = "DnsService";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManagedCluster {
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
    pub sku: Option<Sku>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<ManagedClusterProperties>,
}

/// `Basic` or `Standard`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sku {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedClusterProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_connection_port: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_gateway_connection_port: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_user_name: Option<String>,
    /// Write-only; never returned by the service.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_balancing_rules: Option<Vec<LoadBalancingRule>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub addon_features: Option<Vec<String>>,
    /// `Wave0`, `Wave1` or `Wave2`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_upgrade_cadence: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancingRule {
    pub frontend_port: i32,
    pub backend_port: i32,
    /// `tcp` or `udp`.
    pub protocol: String,
    /// `tcp`, `http` or `https`.
    pub probe_protocol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probe_request_path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeType {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<NodeTypeProperties>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeTypeProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_primary: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vm_instance_count: Option<i32>,
    #[serde(rename = "dataDiskSizeGB", skip_serializing_if = "Option::is_none")]
    pub data_disk_size_gb: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_disk_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placement_properties: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacities: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_ports: Option<EndpointRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ephemeral_ports: Option<EndpointRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vm_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vm_image_publisher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vm_image_offer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vm_image_sku: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vm_image_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_stateless: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiple_placement_groups: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

/// Inclusive port range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointRange {
    pub start_port: i32,
    pub end_port: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NodeTypeList {
    #[serde(default)]
    value: Vec<NodeType>,
    next_link: Option<String>,
}

/// Client for managed clusters.
#[derive(Clone)]
pub struct ManagedClustersClient {
    arm: ArmClient,
}

impl ManagedClustersClient {
    pub fn new(arm: ArmClient) -> Self {
        Self { arm }
    }

    pub async fn get(&self, id: &ManagedClusterId) -> Result<Option<ManagedCluster>> {
        debug!("Getting managed cluster {}", id);
        found(self.arm.get(&id.path(), API_VERSION, &[]).await)
    }

    pub async fn create_or_update(
        &self,
        id: &ManagedClusterId,
        cluster: &ManagedCluster,
    ) -> Result<Poller> {
        debug!("Creating or updating managed cluster {}", id);
        let response = self.arm.put(&id.path(), API_VERSION, cluster).await?;
        Ok(self.arm.poller(&response))
    }

    /// Delete the cluster together with all of its node types.
    pub async fn delete(&self, id: &ManagedClusterId) -> Result<Poller> {
        debug!("Deleting managed cluster {}", id);
        let response = self.arm.delete(&id.path(), API_VERSION).await?;
        Ok(self.arm.poller(&response))
    }
}

/// Client for the node types of a managed cluster.
#[derive(Clone)]
pub struct NodeTypesClient {
    arm: ArmClient,
}

impl NodeTypesClient {
    pub fn new(arm: ArmClient) -> Self {
        Self { arm }
    }

    pub async fn get(&self, id: &NodeTypeId) -> Result<Option<NodeType>> {
        debug!("Getting node type {}", id);
        found(self.arm.get(&id.path(), API_VERSION, &[]).await)
    }

    /// All node types of a cluster, following `nextLink` pages.
    pub async fn list_by_managed_cluster(&self, cluster: &ManagedClusterId) -> Result<Vec<NodeType>> {
        debug!("Listing node types of {}", cluster);
        let path = format!("{}/nodeTypes", cluster.path());
        let mut page: NodeTypeList = self.arm.get(&path, API_VERSION, &[]).await?.json()?;
        let mut node_types = std::mem::take(&mut page.value);
        while let Some(link) = page.next_link.take() {
            page = self.arm.get_link(&link).await?.json()?;
            node_types.append(&mut page.value);
        }
        Ok(node_types)
    }

    pub async fn create_or_update(&self, id: &NodeTypeId, node_type: &NodeType) -> Result<Poller> {
        debug!("Creating or updating node type {}", id);
        let response = self.arm.put(&id.path(), API_VERSION, node_type).await?;
        Ok(self.arm.poller(&response))
    }

    pub async fn delete(&self, id: &NodeTypeId) -> Result<Poller> {
        debug!("Deleting node type {}", id);
        let response = self.arm.delete(&id.path(), API_VERSION).await?;
        Ok(self.arm.poller(&response))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn node_type_uses_service_casing() {
        let nt = NodeType {
            properties: Some(NodeTypeProperties {
                is_primary: Some(true),
                data_disk_size_gb: Some(130),
                application_ports: Some(EndpointRange {
                    start_port: 7000,
                    end_port: 9000,
                }),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&nt).unwrap(),
            json!({
                "properties": {
                    "isPrimary": true,
                    "dataDiskSizeGB": 130,
                    "applicationPorts": {"startPort": 7000, "endPort": 9000}
                }
            })
        );
    }

    #[test]
    fn cluster_properties_round_trip_through_json() {
        let value = json!({
            "location": "westeurope",
            "sku": {"name": "Standard"},
            "properties": {
                "dnsName": "sfmc",
                "clientConnectionPort": 12345,
                "httpGatewayConnectionPort": 23456,
                "adminUserName": "testUser",
                "addonFeatures": ["DnsService"],
                "loadBalancingRules": [{
                    "frontendPort": 443,
                    "backendPort": 8000,
                    "protocol": "tcp",
                    "probeProtocol": "http",
                    "probeRequestPath": "/"
                }]
            }
        });
        let cluster: ManagedCluster = serde_json::from_value(value.clone()).unwrap();
        let props = cluster.properties.as_ref().unwrap();
        assert_eq!(props.http_gateway_connection_port, Some(23456));
        assert_eq!(props.load_balancing_rules.as_ref().unwrap()[0].backend_port, 8000);
        assert_eq!(serde_json::to_value(&cluster).unwrap(), value);
    }
}
