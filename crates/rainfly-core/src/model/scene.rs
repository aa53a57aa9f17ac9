// ── Scene domain type ──

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::device::Device;
use super::schedule::{Operation, short_id};

/// A user-defined on-demand set of param writes across devices.
///
/// Like schedules, the cloud stores one copy per participating node;
/// fragments merge locally by [`Scene::composite_key`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Free-text description shown alongside the name.
    #[serde(default)]
    pub info: String,
    /// Node id → devices (with selected params) captured at save time.
    #[serde(default)]
    pub actions: IndexMap<String, Vec<Device>>,
    /// Pending write operation. Edit-session state, never persisted.
    #[serde(skip)]
    pub operation: Option<Operation>,
}

impl Scene {
    /// A fresh scene with a locally generated short id.
    pub fn new() -> Self {
        Self {
            id: short_id(),
            name: String::new(),
            info: String::new(),
            actions: IndexMap::new(),
            operation: Some(Operation::Add),
        }
    }

    /// Composite identity across per-node fragments.
    pub fn composite_key(&self) -> String {
        format!("{}.{}.{}", self.id, self.name, self.info)
    }

    /// Re-point the action devices' node back-references at their map
    /// keys. Needed after decoding from storage.
    pub fn relink_actions(&mut self) {
        for (node_id, devices) in &mut self.actions {
            for device in devices {
                device.node_id.clone_from(node_id);
            }
        }
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}
