// ── Node domain types ──
//
// A node is the unit the cloud talks to: one physical gadget (or
// group) owning one or more devices plus named service parameter
// groups. Capability flags and capacity counters gate what the
// schedule/scene engines may do per node.

use serde::{Deserialize, Serialize};

use super::device::Device;
use super::param::Param;

/// A physical/logical device group known to the cloud.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(default)]
    pub config_version: Option<String>,
    #[serde(default)]
    pub info: Option<NodeMeta>,
    #[serde(default)]
    pub devices: Vec<Device>,
    #[serde(default)]
    pub services: Vec<NodeService>,
    /// Sharing metadata: users with primary / secondary access.
    #[serde(default)]
    pub primary_users: Vec<String>,
    #[serde(default)]
    pub secondary_users: Vec<String>,

    /// Live connectivity. Not persisted -- a restored node is offline
    /// until the next refresh proves otherwise.
    #[serde(skip)]
    pub connected: bool,
    /// Unix timestamp of the last connectivity change, when reported.
    #[serde(skip)]
    pub connectivity_timestamp: Option<i64>,

    // ── Scheduling capability ──
    #[serde(default)]
    pub scheduling_supported: bool,
    /// Advertised limit; `-1` when the node does not declare one.
    #[serde(default = "no_limit")]
    pub max_schedules: i32,
    #[serde(default)]
    pub current_schedules: u32,
    /// Per-node service/param key-name overrides.
    #[serde(default = "default_schedule_key")]
    pub schedule_key: String,
    #[serde(default = "default_schedules_key")]
    pub schedules_key: String,

    // ── Scene capability ──
    #[serde(default)]
    pub scenes_supported: bool,
    #[serde(default = "no_limit")]
    pub max_scenes: i32,
    #[serde(default)]
    pub current_scenes: u32,
    #[serde(default = "default_scene_key")]
    pub scene_key: String,
    #[serde(default = "default_scenes_key")]
    pub scenes_key: String,
}

fn no_limit() -> i32 {
    -1
}
fn default_schedule_key() -> String {
    "Schedule".into()
}
fn default_schedules_key() -> String {
    "Schedules".into()
}
fn default_scene_key() -> String {
    "Scene".into()
}
fn default_scenes_key() -> String {
    "Scenes".into()
}

/// Static identity block from the node config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeMeta {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub fw_version: Option<String>,
    #[serde(default)]
    pub node_type: Option<String>,
}

/// A named parameter group (e.g. the schedule or timezone service).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeService {
    pub name: String,
    #[serde(default)]
    pub service_type: Option<String>,
    #[serde(default)]
    pub params: Vec<Param>,
}

impl Node {
    /// A bare node with default capability flags and key names.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            config_version: None,
            info: None,
            devices: Vec::new(),
            services: Vec::new(),
            primary_users: Vec::new(),
            secondary_users: Vec::new(),
            connected: false,
            connectivity_timestamp: None,
            scheduling_supported: false,
            max_schedules: no_limit(),
            current_schedules: 0,
            schedule_key: default_schedule_key(),
            schedules_key: default_schedules_key(),
            scenes_supported: false,
            max_scenes: no_limit(),
            current_scenes: 0,
            scene_key: default_scene_key(),
            scenes_key: default_scenes_key(),
        }
    }

    /// Whether another schedule slot is available on this node.
    ///
    /// A node that does not advertise a limit always has room.
    pub fn is_scheduling_allowed(&self) -> bool {
        self.max_schedules < 0 || self.current_schedules < self.max_schedules.unsigned_abs()
    }

    /// Whether another scene slot is available on this node.
    pub fn is_scene_allowed(&self) -> bool {
        self.max_scenes < 0 || self.current_scenes < self.max_scenes.unsigned_abs()
    }

    /// Point every child device's back-reference at this node.
    ///
    /// Called after decoding (API or storage) -- the back-reference is
    /// never serialized.
    pub fn relink_devices(&mut self) {
        for device in &mut self.devices {
            device.node_id.clone_from(&self.id);
        }
    }

    pub fn device(&self, name: &str) -> Option<&Device> {
        self.devices.iter().find(|d| d.name == name)
    }

    /// Human-readable connectivity line. The cloud reports the last
    /// connectivity change as a millisecond timestamp.
    pub fn status_line(&self) -> String {
        if self.connected {
            return "Online".into();
        }
        match self
            .connectivity_timestamp
            .and_then(chrono::DateTime::from_timestamp_millis)
        {
            Some(at) => format!("Offline since {}", at.format("%d/%m/%y, %H:%M")),
            None => "Offline".into(),
        }
    }
}

/// Find a node by id in a fleet slice.
pub fn find_node<'a>(nodes: &'a [Node], id: &str) -> Option<&'a Node> {
    nodes.iter().find(|n| n.id == id)
}

/// A user-defined grouping of nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeGroup {
    pub group_id: String,
    pub group_name: String,
    #[serde(default)]
    pub nodes: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(max: i32, current: u32) -> Node {
        let mut node = Node::new("n1");
        node.connected = true;
        node.scheduling_supported = true;
        node.max_schedules = max;
        node.current_schedules = current;
        node
    }

    #[test]
    fn unadvertised_limit_always_allows() {
        assert!(node(-1, 1000).is_scheduling_allowed());
    }

    #[test]
    fn capacity_exhaustion_blocks_new_schedules() {
        assert!(node(5, 4).is_scheduling_allowed());
        assert!(!node(5, 5).is_scheduling_allowed());
        assert!(!node(0, 0).is_scheduling_allowed());
    }

    #[test]
    fn relink_sets_back_references() {
        let mut n = node(-1, 0);
        n.devices.push(Device::action_stub("", "Light"));
        n.devices.push(Device::action_stub("stale", "Fan"));

        n.relink_devices();

        assert!(n.devices.iter().all(|d| d.node_id == "n1"));
    }
}
