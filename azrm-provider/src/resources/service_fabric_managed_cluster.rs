//! `azurerm_service_fabric_managed_cluster`: a Service Fabric managed cluster
//! together with its node types.
//!
//! Node types are child resources with their own endpoint. They are carried as
//! `node_type` blocks and reconciled one by one after the cluster itself:
//! changed node types are written, unchanged ones are left alone and node
//! types that disappeared from the configuration are deleted.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use azrm_arm::servicefabric::{
    ADDON_DNS_SERVICE, EndpointRange, LoadBalancingRule, ManagedCluster,
    ManagedClusterProperties, ManagedClustersClient, NodeType, NodeTypeProperties,
    NodeTypesClient, Sku,
};
use azrm_arm::{ArmClient, ManagedClusterId};

use super::{expand_tags, location, normalize_location, optional_i32, required_i32, required_str};
use crate::error::{ProviderError, Result};
use crate::resource::{Resource, Timeouts};
use crate::schema::{Attribute, Schema, Validation};
use crate::state::ResourceData;

pub const TYPE_NAME: &str = "azurerm_service_fabric_managed_cluster";

const NODE_TYPE: &str = "node_type";

fn validate_cluster_name(value: &Value) -> std::result::Result<(), String> {
    let name = value.as_str().unwrap_or_default();
    if !(4..=23).contains(&name.len()) {
        return Err("must be between 4 and 23 characters".to_string());
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err("may only contain lowercase letters, digits and hyphens".to_string());
    }
    Ok(())
}

/// Parse a `start-end` port range.
pub fn parse_port_range(range: &str) -> std::result::Result<EndpointRange, String> {
    let invalid = || format!("{range:?} is not a port range of the form start-end");
    let (start, end) = range.split_once('-').ok_or_else(invalid)?;
    let start_port: i32 = start.trim().parse().map_err(|_| invalid())?;
    let end_port: i32 = end.trim().parse().map_err(|_| invalid())?;
    if !(0..=65535).contains(&start_port) || !(0..=65535).contains(&end_port) {
        return Err(format!("ports in {range:?} must be between 0 and 65535"));
    }
    if start_port > end_port {
        return Err(format!("start of {range:?} must not exceed its end"));
    }
    Ok(EndpointRange {
        start_port,
        end_port,
    })
}

fn format_port_range(range: EndpointRange) -> String {
    format!("{}-{}", range.start_port, range.end_port)
}

fn validate_port_range(value: &Value) -> std::result::Result<(), String> {
    parse_port_range(value.as_str().unwrap_or_default()).map(|_| ())
}

fn port() -> Attribute {
    Attribute::int().validate(Validation::IntBetween(1, 65535))
}

fn validate_node_type_name(value: &Value) -> std::result::Result<(), String> {
    super::check_segment_name(value, 1, 64)
}

fn required_string() -> Attribute {
    Attribute::string().required().validate(Validation::NotEmpty)
}

fn lb_rule_schema() -> Schema {
    Schema::new()
        .with("backend_port", port().required())
        .with("frontend_port", port().required())
        .with(
            "probe_protocol",
            Attribute::string()
                .required()
                .validate(Validation::OneOf(&["http", "https", "tcp"])),
        )
        .with(
            "protocol",
            Attribute::string()
                .required()
                .validate(Validation::OneOf(&["tcp", "udp"])),
        )
        .with("probe_request_path", Attribute::string())
}

fn node_type_schema() -> Schema {
    Schema::new()
        .with("id", Attribute::string().computed())
        .with(
            "name",
            Attribute::string()
                .required()
                .validate(Validation::Custom(validate_node_type_name)),
        )
        .with("primary", Attribute::bool().default(false))
        .with(
            "data_disk_size_gb",
            Attribute::int()
                .required()
                .validate(Validation::IntBetween(1, i64::from(i32::MAX))),
        )
        .with(
            "data_disk_type",
            Attribute::string().default("Standard_LRS").validate(Validation::OneOf(&[
                "Standard_LRS",
                "StandardSSD_LRS",
                "Premium_LRS",
            ])),
        )
        .with(
            "application_port_range",
            Attribute::string()
                .required()
                .validate(Validation::Custom(validate_port_range)),
        )
        .with(
            "ephemeral_port_range",
            Attribute::string()
                .required()
                .validate(Validation::Custom(validate_port_range)),
        )
        .with("vm_size", required_string())
        .with("vm_image_publisher", required_string())
        .with("vm_image_offer", required_string())
        .with("vm_image_sku", required_string())
        .with("vm_image_version", required_string())
        .with(
            "vm_instance_count",
            Attribute::int()
                .required()
                .validate(Validation::IntBetween(0, 1000)),
        )
        .with("stateless", Attribute::bool().default(false))
        .with("multiple_placement_groups", Attribute::bool().default(false))
        .with("placement_properties", Attribute::map())
        .with("capacities", Attribute::map())
}

pub fn schema() -> Schema {
    Schema::new()
        .with(
            "name",
            Attribute::string()
                .required()
                .force_new()
                .validate(Validation::Custom(validate_cluster_name)),
        )
        .with("resource_group_name", super::resource_group_name())
        .with("location", location())
        .with(
            "sku",
            Attribute::string()
                .default("Basic")
                .validate(Validation::OneOf(&["Basic", "Standard"])),
        )
        .with("username", required_string())
        .with(
            "password",
            Attribute::string().sensitive().validate(Validation::NotEmpty),
        )
        .with(
            "dns_name",
            Attribute::string()
                .optional_computed()
                .validate(Validation::NotEmpty),
        )
        .with("dns_service_enabled", Attribute::bool().default(false))
        .with("client_connection_port", port().default(19000))
        .with("http_gateway_port", port().default(19080))
        .with(
            "upgrade_wave",
            Attribute::string()
                .default("Wave0")
                .validate(Validation::OneOf(&["Wave0", "Wave1", "Wave2"])),
        )
        .with("lb_rule", Attribute::block(lb_rule_schema()))
        .with(
            NODE_TYPE,
            Attribute::block(node_type_schema()).required().min_items(1),
        )
        .with("tags", super::tags())
}

/// Binding for managed clusters in one subscription.
pub struct ServiceFabricManagedCluster {
    subscription_id: String,
    clusters: ManagedClustersClient,
    node_types: NodeTypesClient,
}

impl ServiceFabricManagedCluster {
    pub fn new(subscription_id: impl Into<String>, arm: ArmClient) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            clusters: ManagedClustersClient::new(arm.clone()),
            node_types: NodeTypesClient::new(arm),
        }
    }

    /// PUT the cluster and wait; `operation` and `waiting` name the two
    /// phases in errors.
    async fn put_cluster(
        &self,
        id: &ManagedClusterId,
        cluster: &ManagedCluster,
        operation: &str,
        waiting: &str,
    ) -> Result<()> {
        self.clusters
            .create_or_update(id, cluster)
            .await
            .map_err(|e| ProviderError::api(operation, id, e))?
            .wait()
            .await
            .map_err(|e| ProviderError::api(waiting, id, e))
    }

    async fn put_node_type(&self, id: &ManagedClusterId, block: &ResourceData) -> Result<()> {
        let name = required_str(block, "name")?;
        let node_type_id = id.node_type(name);
        let node_type = expand_node_type(block)?;

        info!("Writing node type {} of cluster {}", name, id.cluster_name);
        self.node_types
            .create_or_update(&node_type_id, &node_type)
            .await
            .map_err(|e| ProviderError::api("writing node type", &node_type_id, e))?
            .wait()
            .await
            .map_err(|e| ProviderError::api("waiting for node type", &node_type_id, e))
    }

    async fn list_node_types(&self, id: &ManagedClusterId) -> Result<Vec<ResourceData>> {
        let listed = self
            .node_types
            .list_by_managed_cluster(id)
            .await
            .map_err(|e| ProviderError::api("listing node types of", id, e))?;
        Ok(listed.into_iter().map(flatten_node_type).collect())
    }

    /// Bring the remote node types in line with `desired`.
    async fn reconcile_node_types(&self, id: &ManagedClusterId, desired: &[ResourceData]) -> Result<()> {
        let remote: HashMap<String, ResourceData> = self
            .list_node_types(id)
            .await?
            .into_iter()
            .filter_map(|nt| nt.get_str("name").map(|n| (n.to_string(), nt.clone())))
            .collect();

        for block in primary_first(desired) {
            let name = required_str(block, "name")?;
            match remote.get(name) {
                Some(current) if node_type_matches(block, current) => {
                    debug!("Node type {} of cluster {} is unchanged", name, id.cluster_name);
                }
                _ => self.put_node_type(id, block).await?,
            }
        }

        for name in remote.keys() {
            if desired.iter().any(|b| b.get_str("name") == Some(name.as_str())) {
                continue;
            }
            let node_type_id = id.node_type(name);
            info!("Deleting node type {} of cluster {}", name, id.cluster_name);
            self.node_types
                .delete(&node_type_id)
                .await
                .map_err(|e| ProviderError::api("deleting node type", &node_type_id, e))?
                .wait()
                .await
                .map_err(|e| ProviderError::api("waiting for deletion of node type", &node_type_id, e))?;
        }
        Ok(())
    }
}

/// Primary node types must exist before secondary ones.
fn primary_first(blocks: &[ResourceData]) -> Vec<&ResourceData> {
    let mut ordered: Vec<&ResourceData> = blocks.iter().collect();
    ordered.sort_by_key(|b| !b.get_bool("primary").unwrap_or(false));
    ordered
}

/// Whether every configured attribute of `desired` already holds remotely.
fn node_type_matches(desired: &ResourceData, current: &ResourceData) -> bool {
    desired
        .as_map()
        .iter()
        .filter(|(key, value)| key.as_str() != "id" && !value.is_null())
        .all(|(key, value)| match current.get(key) {
            Some(remote) => remote == value,
            // Empty maps are not reported back.
            None => value.as_object().is_some_and(|m| m.is_empty()),
        })
}

fn expand_cluster(
    id: &ManagedClusterId,
    desired: &ResourceData,
    current: Option<&ResourceData>,
) -> Result<ManagedCluster> {
    let dns_name = desired
        .get_str("dns_name")
        .or_else(|| current.and_then(|c| c.get_str("dns_name")))
        .unwrap_or(id.cluster_name.as_str())
        .to_string();

    let addon_features = if desired.get_bool("dns_service_enabled").unwrap_or(false) {
        vec![ADDON_DNS_SERVICE.to_string()]
    } else {
        Vec::new()
    };

    let load_balancing_rules = desired
        .get_blocks("lb_rule")
        .iter()
        .map(|rule| {
            Ok(LoadBalancingRule {
                frontend_port: required_i32(rule, "frontend_port")?,
                backend_port: required_i32(rule, "backend_port")?,
                protocol: required_str(rule, "protocol")?.to_string(),
                probe_protocol: required_str(rule, "probe_protocol")?.to_string(),
                probe_request_path: rule.get_str("probe_request_path").map(str::to_string),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ManagedCluster {
        location: Some(normalize_location(required_str(desired, "location")?)),
        tags: Some(expand_tags(desired)),
        sku: desired.get_str("sku").map(|name| Sku {
            name: name.to_string(),
        }),
        properties: Some(ManagedClusterProperties {
            dns_name: Some(dns_name),
            client_connection_port: optional_i32(desired, "client_connection_port"),
            http_gateway_connection_port: optional_i32(desired, "http_gateway_port"),
            admin_user_name: Some(required_str(desired, "username")?.to_string()),
            admin_password: desired.get_str("password").map(str::to_string),
            load_balancing_rules: Some(load_balancing_rules),
            addon_features: Some(addon_features),
            cluster_upgrade_cadence: desired.get_str("upgrade_wave").map(str::to_string),
            ..Default::default()
        }),
        ..Default::default()
    })
}

fn expand_port_range(block: &ResourceData, key: &str) -> Result<EndpointRange> {
    parse_port_range(required_str(block, key)?).map_err(|message| ProviderError::invalid(key, message))
}

fn expand_node_type(block: &ResourceData) -> Result<NodeType> {
    let string = |key: &str| block.get_str(key).map(str::to_string);

    Ok(NodeType {
        name: Some(required_str(block, "name")?.to_string()),
        properties: Some(NodeTypeProperties {
            is_primary: block.get_bool("primary"),
            vm_instance_count: Some(required_i32(block, "vm_instance_count")?),
            data_disk_size_gb: Some(required_i32(block, "data_disk_size_gb")?),
            data_disk_type: string("data_disk_type"),
            placement_properties: block.get_string_map("placement_properties"),
            capacities: block.get_string_map("capacities"),
            application_ports: Some(expand_port_range(block, "application_port_range")?),
            ephemeral_ports: Some(expand_port_range(block, "ephemeral_port_range")?),
            vm_size: string("vm_size"),
            vm_image_publisher: string("vm_image_publisher"),
            vm_image_offer: string("vm_image_offer"),
            vm_image_sku: string("vm_image_sku"),
            vm_image_version: string("vm_image_version"),
            is_stateless: block.get_bool("stateless"),
            multiple_placement_groups: block.get_bool("multiple_placement_groups"),
            provisioning_state: None,
        }),
        ..Default::default()
    })
}

fn flatten_cluster(id: &ManagedClusterId, cluster: ManagedCluster) -> ResourceData {
    let mut state = ResourceData::new();
    state.set("name", id.cluster_name.as_str());
    state.set("resource_group_name", id.resource_group.as_str());
    state.set_opt("location", cluster.location.as_deref().map(normalize_location));
    state.set_opt("sku", cluster.sku.map(|s| s.name));

    if let Some(props) = cluster.properties {
        state.set_opt("username", props.admin_user_name);
        state.set_opt("dns_name", props.dns_name);
        state.set(
            "dns_service_enabled",
            props
                .addon_features
                .unwrap_or_default()
                .iter()
                .any(|f| f == ADDON_DNS_SERVICE),
        );
        state.set_opt("client_connection_port", props.client_connection_port);
        state.set_opt("http_gateway_port", props.http_gateway_connection_port);
        state.set_opt("upgrade_wave", props.cluster_upgrade_cadence);

        let rules = props
            .load_balancing_rules
            .unwrap_or_default()
            .into_iter()
            .map(|rule| {
                let mut block = ResourceData::new();
                block.set("backend_port", rule.backend_port);
                block.set("frontend_port", rule.frontend_port);
                block.set("probe_protocol", rule.probe_protocol);
                block.set("protocol", rule.protocol);
                block.set_opt("probe_request_path", rule.probe_request_path);
                block
            })
            .collect();
        state.set_blocks("lb_rule", rules);
    }

    state.set_string_map("tags", cluster.tags.unwrap_or_default());
    state
}

fn flatten_node_type(node_type: NodeType) -> ResourceData {
    let mut block = ResourceData::new();
    block.set_opt("id", node_type.id);
    block.set_opt("name", node_type.name);

    let props = node_type.properties.unwrap_or_default();
    block.set("primary", props.is_primary.unwrap_or(false));
    block.set_opt("data_disk_size_gb", props.data_disk_size_gb);
    block.set_opt("data_disk_type", props.data_disk_type);
    block.set_opt("application_port_range", props.application_ports.map(format_port_range));
    block.set_opt("ephemeral_port_range", props.ephemeral_ports.map(format_port_range));
    block.set_opt("vm_size", props.vm_size);
    block.set_opt("vm_image_publisher", props.vm_image_publisher);
    block.set_opt("vm_image_offer", props.vm_image_offer);
    block.set_opt("vm_image_sku", props.vm_image_sku);
    block.set_opt("vm_image_version", props.vm_image_version);
    block.set_opt("vm_instance_count", props.vm_instance_count);
    block.set("stateless", props.is_stateless.unwrap_or(false));
    block.set(
        "multiple_placement_groups",
        props.multiple_placement_groups.unwrap_or(false),
    );
    if let Some(placement) = props.placement_properties.filter(|m| !m.is_empty()) {
        block.set_string_map("placement_properties", placement);
    }
    if let Some(capacities) = props.capacities.filter(|m| !m.is_empty()) {
        block.set_string_map("capacities", capacities);
    }
    block
}

/// Order node types like `prior`; ones it does not know follow, by name.
fn order_like_prior(node_types: Vec<ResourceData>, prior: Option<&ResourceData>) -> Vec<ResourceData> {
    let known: Vec<String> = prior
        .map(|p| p.get_blocks(NODE_TYPE))
        .unwrap_or_default()
        .iter()
        .filter_map(|b| b.get_str("name").map(str::to_string))
        .collect();

    let mut by_name: BTreeMap<String, ResourceData> = node_types
        .into_iter()
        .map(|nt| (nt.get_str("name").unwrap_or_default().to_string(), nt))
        .collect();

    let mut ordered: Vec<ResourceData> = known.iter().filter_map(|n| by_name.remove(n)).collect();
    ordered.extend(by_name.into_values());
    ordered
}

#[async_trait]
impl Resource for ServiceFabricManagedCluster {
    type Id = ManagedClusterId;

    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        schema()
    }

    fn timeouts(&self) -> Timeouts {
        Timeouts::minutes(90, 5, 90, 90)
    }

    fn candidate_id(&self, desired: &ResourceData) -> Result<ManagedClusterId> {
        Ok(ManagedClusterId::new(
            &self.subscription_id,
            required_str(desired, "resource_group_name")?,
            required_str(desired, "name")?,
        ))
    }

    async fn probe(&self, id: &ManagedClusterId) -> Result<bool> {
        let existing = self
            .clusters
            .get(id)
            .await
            .map_err(|e| ProviderError::api("checking for presence of existing", id, e))?;
        Ok(existing.is_some())
    }

    async fn fetch(
        &self,
        id: &ManagedClusterId,
        prior: Option<&ResourceData>,
    ) -> Result<Option<ResourceData>> {
        let Some(cluster) = self
            .clusters
            .get(id)
            .await
            .map_err(|e| ProviderError::api("retrieving", id, e))?
        else {
            return Ok(None);
        };

        let mut state = flatten_cluster(id, cluster);
        let node_types = self.list_node_types(id).await?;
        state.set_blocks(NODE_TYPE, order_like_prior(node_types, prior));
        Ok(Some(state))
    }

    async fn create(&self, id: &ManagedClusterId, desired: &ResourceData) -> Result<()> {
        let cluster = expand_cluster(id, desired, None)?;
        self.put_cluster(id, &cluster, "creating", "waiting for creation of")
            .await?;

        let blocks = desired.get_blocks(NODE_TYPE);
        for block in primary_first(&blocks) {
            self.put_node_type(id, block).await?;
        }

        info!("Created managed cluster {} with {} node type(s)", id, blocks.len());
        Ok(())
    }

    async fn update(
        &self,
        id: &ManagedClusterId,
        desired: &ResourceData,
        current: &ResourceData,
    ) -> Result<()> {
        let cluster = expand_cluster(id, desired, Some(current))?;
        self.put_cluster(id, &cluster, "updating", "waiting for update of")
            .await?;
        self.reconcile_node_types(id, &desired.get_blocks(NODE_TYPE))
            .await?;

        info!("Updated managed cluster {}", id);
        Ok(())
    }

    async fn remove(&self, id: &ManagedClusterId) -> Result<()> {
        self.clusters
            .delete(id)
            .await
            .map_err(|e| ProviderError::api("deleting", id, e))?
            .wait()
            .await
            .map_err(|e| ProviderError::api("waiting for deletion of", id, e))?;

        info!("Deleted managed cluster {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn node_type(name: &str, primary: bool, disk: i64) -> Value {
        json!({
            "name": name,
            "primary": primary,
            "data_disk_size_gb": disk,
            "application_port_range": "7000-9000",
            "ephemeral_port_range": "10000-20000",
            "vm_size": "Standard_DS2_v2",
            "vm_image_publisher": "MicrosoftWindowsServer",
            "vm_image_sku": "2016-Datacenter",
            "vm_image_offer": "WindowsServer",
            "vm_image_version": "latest",
            "vm_instance_count": 5
        })
    }

    fn desired(node_types: Vec<Value>) -> ResourceData {
        let mut d = ResourceData::from_value(json!({
            "name": "testacc-sfmc-abcde",
            "resource_group_name": "acctestRG-sfmc-1",
            "location": "westeurope",
            "sku": "Standard",
            "username": "testUser",
            "password": "NotV3ryS3cur3P@$$w0rd",
            "dns_service_enabled": true,
            "client_connection_port": 12345,
            "http_gateway_port": 23456,
            "lb_rule": [{
                "backend_port": 8000,
                "frontend_port": 443,
                "probe_protocol": "http",
                "protocol": "tcp",
                "probe_request_path": "/"
            }],
            "node_type": node_types,
            "tags": {"Test": "value"}
        }))
        .unwrap();
        schema().prepare(&mut d);
        d
    }

    fn id() -> ManagedClusterId {
        ManagedClusterId::new("sub", "acctestRG-sfmc-1", "testacc-sfmc-abcde")
    }

    #[test]
    fn port_ranges() {
        assert_eq!(
            parse_port_range("7000-9000").unwrap(),
            EndpointRange {
                start_port: 7000,
                end_port: 9000
            }
        );
        assert_eq!(format_port_range(parse_port_range("10000-20000").unwrap()), "10000-20000");
        for bad in ["", "7000", "9000-7000", "a-b", "1-70000"] {
            assert!(parse_port_range(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn cluster_names() {
        assert!(validate_cluster_name(&json!("testacc-sfmc-abcde")).is_ok());
        assert!(validate_cluster_name(&json!("abc")).is_err());
        assert!(validate_cluster_name(&json!("Upper-case")).is_err());
        assert!(validate_cluster_name(&json!("a".repeat(24))).is_err());
    }

    #[test]
    fn fixture_validates_and_needs_a_node_type() {
        schema().validate(&desired(vec![node_type("test1", true, 130)])).unwrap();

        let err = schema().validate(&desired(vec![])).unwrap_err();
        assert!(err.to_string().contains("node_type: requires at least 1 block(s)"));
    }

    #[test]
    fn expand_defaults_dns_name_and_enables_addon() {
        let d = desired(vec![node_type("test1", true, 130)]);
        let cluster = expand_cluster(&id(), &d, None).unwrap();
        let props = cluster.properties.unwrap();
        assert_eq!(props.dns_name.as_deref(), Some("testacc-sfmc-abcde"));
        assert_eq!(props.addon_features, Some(vec!["DnsService".to_string()]));
        assert_eq!(props.cluster_upgrade_cadence.as_deref(), Some("Wave0"));
        assert_eq!(props.load_balancing_rules.unwrap()[0].frontend_port, 443);
        assert_eq!(cluster.sku.unwrap().name, "Standard");

        let current = ResourceData::from_value(json!({"dns_name": "kept"})).unwrap();
        let cluster = expand_cluster(&id(), &d, Some(&current)).unwrap();
        assert_eq!(cluster.properties.unwrap().dns_name.as_deref(), Some("kept"));
    }

    #[test]
    fn node_type_round_trips_through_api_model() {
        let d = desired(vec![node_type("test1", true, 130)]);
        let block = &d.get_blocks(NODE_TYPE)[0];

        let mut api = expand_node_type(block).unwrap();
        api.id = Some(id().node_type("test1").to_string());
        let flattened = flatten_node_type(api);

        assert!(node_type_matches(block, &flattened));
        assert_eq!(flattened.get_str("application_port_range"), Some("7000-9000"));

        let altered = &desired(vec![node_type("test1", true, 140)]).get_blocks(NODE_TYPE)[0];
        assert!(!node_type_matches(altered, &flattened));
    }

    #[test]
    fn empty_maps_match_absent_ones() {
        let mut configured = node_type("test1", true, 130);
        configured["placement_properties"] = json!({});
        configured["capacities"] = json!({});
        let d = desired(vec![configured]);
        let block = &d.get_blocks(NODE_TYPE)[0];

        let flattened = flatten_node_type(expand_node_type(block).unwrap());
        assert!(!flattened.contains("placement_properties"));
        assert!(node_type_matches(block, &flattened));

        let mut remote = flattened.clone();
        remote.set_string_map(
            "capacities",
            [("gpu".to_string(), "1".to_string())].into_iter().collect(),
        );
        assert!(!node_type_matches(block, &remote));
    }

    #[test]
    fn node_type_names_must_be_path_segments() {
        assert!(validate_node_type_name(&json!("test1")).is_ok());
        for bad in ["", "a/b", "nt?x", "nt#1", "nt%2F"] {
            assert!(validate_node_type_name(&json!(bad)).is_err(), "{bad}");
        }

        let err = schema()
            .validate(&desired(vec![node_type("a/b", true, 130)]))
            .unwrap_err();
        assert!(err.to_string().contains("node_type.0.name"));
    }

    #[test]
    fn primary_node_types_come_first() {
        let d = desired(vec![node_type("b", false, 1), node_type("a", true, 1)]);
        let blocks = d.get_blocks(NODE_TYPE);
        let names: Vec<_> = primary_first(&blocks)
            .iter()
            .filter_map(|b| b.get_str("name"))
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn ordering_follows_prior_then_name() {
        let block = |name: &str| ResourceData::from_value(json!({"name": name})).unwrap();
        let prior = desired(vec![node_type("zeta", true, 1), node_type("alpha", false, 1)]);

        let ordered = order_like_prior(
            vec![block("alpha"), block("gamma"), block("zeta"), block("beta")],
            Some(&prior),
        );
        let names: Vec<_> = ordered.iter().filter_map(|b| b.get_str("name")).collect();
        assert_eq!(names, vec!["zeta", "alpha", "beta", "gamma"]);
    }
}
