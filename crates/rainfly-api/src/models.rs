// Cloud API wire types
//
// Models for the cloud's JSON surface. Fields use `#[serde(default)]`
// liberally because the backend is inconsistent about field presence
// across deployments and firmware generations.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Status envelope ──────────────────────────────────────────────────

/// Generic `{status, description}` envelope many endpoints return.
///
/// `status` is `"success"` or `"failure"` (case-insensitive on the
/// wire); anything else is treated as failure by [`ApiStatus::is_success`].
#[derive(Debug, Clone, Deserialize)]
pub struct ApiStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub error_code: Option<i64>,
}

impl ApiStatus {
    pub fn is_success(&self) -> bool {
        self.status.eq_ignore_ascii_case("success")
    }
}

// ── Batched parameter writes ─────────────────────────────────────────

/// One element of the batched multi-node parameter-set request:
/// `{node_id, payload}` where `payload` is the service-keyed JSON the
/// node firmware consumes verbatim.
#[derive(Debug, Clone, Serialize)]
pub struct NodePayload {
    pub node_id: String,
    pub payload: Value,
}

/// Per-node outcome of a batched parameter-set call.
///
/// The cloud answers the batch with one entry per node; a batch is
/// never rejected wholesale for a single bad node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeResponse {
    #[serde(default)]
    pub node_id: Option<String>,
    pub status: String,
    #[serde(default)]
    pub error_code: Option<i64>,
    #[serde(default)]
    pub description: String,
}

impl NodeResponse {
    pub fn is_success(&self) -> bool {
        self.status.eq_ignore_ascii_case("success")
    }
}

// ── Node details ─────────────────────────────────────────────────────

/// Response wrapper for `user/nodes?node_details=true`.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeDetailsPage {
    #[serde(default)]
    pub node_details: Vec<NodeDetail>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub next_id: Option<String>,
}

/// Full node object: configuration, connectivity, and current params.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeDetail {
    pub id: String,
    #[serde(default)]
    pub config: NodeConfig,
    #[serde(default)]
    pub status: Option<NodeStatus>,
    /// Current parameter values keyed by device/service name.
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub primary: Vec<String>,
    #[serde(default)]
    pub secondary: Vec<String>,
    /// Catch-all for undocumented fields.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// The node's static configuration block.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeConfig {
    #[serde(default)]
    pub config_version: Option<String>,
    #[serde(default)]
    pub info: Option<NodeInfo>,
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
    #[serde(default)]
    pub services: Vec<ServiceConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub fw_version: Option<String>,
    #[serde(default, rename = "type")]
    pub node_type: Option<String>,
}

/// Device entry inside the node config.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    pub name: String,
    #[serde(default, rename = "type")]
    pub device_type: Option<String>,
    #[serde(default)]
    pub primary: Option<String>,
    #[serde(default)]
    pub params: Vec<ParamConfig>,
}

/// Service entry (named parameter group) inside the node config.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    #[serde(default, rename = "type")]
    pub service_type: Option<String>,
    #[serde(default)]
    pub params: Vec<ParamConfig>,
}

/// Parameter descriptor shared by devices and services.
#[derive(Debug, Clone, Deserialize)]
pub struct ParamConfig {
    pub name: String,
    #[serde(default)]
    pub data_type: Option<String>,
    #[serde(default, rename = "type")]
    pub param_type: Option<String>,
    #[serde(default)]
    pub ui_type: Option<String>,
    #[serde(default)]
    pub properties: Vec<String>,
    #[serde(default)]
    pub bounds: Option<ParamBounds>,
    #[serde(default)]
    pub valid_strs: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ParamBounds {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub step: Option<f64>,
}

/// Connectivity block of a node's status.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeStatus {
    #[serde(default)]
    pub connectivity: Option<Connectivity>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Connectivity {
    #[serde(default)]
    pub connected: bool,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

// ── Node groups ──────────────────────────────────────────────────────

/// A user-defined grouping of nodes.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeGroupDetail {
    pub group_id: String,
    #[serde(default)]
    pub group_name: String,
    #[serde(default)]
    pub nodes: Vec<String>,
    /// Catch-all for undocumented fields.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct NodeGroupsPage {
    #[serde(default)]
    pub groups: Vec<NodeGroupDetail>,
}

// ── Node sharing ─────────────────────────────────────────────────────

/// Body for sharing one or more nodes with another user.
#[derive(Debug, Clone, Serialize)]
pub struct ShareNodesBody {
    pub nodes: Vec<String>,
    pub user_name: String,
}

/// A pending or resolved sharing request.
#[derive(Debug, Clone, Deserialize)]
pub struct SharingRequest {
    pub request_id: String,
    #[serde(default)]
    pub request_status: Option<String>,
    #[serde(default)]
    pub node_ids: Vec<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub primary_user_name: Option<String>,
    /// Catch-all for undocumented fields.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SharingRequestsPage {
    #[serde(default)]
    pub sharing_requests: Vec<SharingRequest>,
}
