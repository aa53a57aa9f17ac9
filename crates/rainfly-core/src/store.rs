// ── Local persistence bridge ──
//
// Durable JSON snapshots of the reconciled model between sessions: the
// node list, the merged schedule/scene maps, and the node-group list,
// one file per collection. Restore re-links every device's node
// back-reference (it is never serialized) before the engines touch the
// data.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::debug;

use crate::error::CoreError;
use crate::model::{Node, NodeGroup, Scene, Schedule};

const NODES_FILE: &str = "nodes.json";
const SCHEDULES_FILE: &str = "schedules.json";
const SCENES_FILE: &str = "scenes.json";
const NODE_GROUPS_FILE: &str = "node_groups.json";

/// File-backed snapshot store for one user's fleet state.
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    /// Open a store rooted at `dir`. The directory is created lazily
    /// on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Platform default data directory for the store.
    pub fn default_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("io", "rainfly", "rainfly")
            .map(|dirs| dirs.data_dir().to_path_buf())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    // ── Nodes ────────────────────────────────────────────────────────

    pub fn save_nodes(&self, nodes: &[Node]) -> Result<(), CoreError> {
        self.write(NODES_FILE, nodes)
    }

    /// Restore the node list. Devices come back re-linked to their
    /// owning nodes and offline -- connectivity is live state the next
    /// refresh re-establishes.
    pub fn fetch_nodes(&self) -> Result<Vec<Node>, CoreError> {
        let mut nodes: Vec<Node> = self.read(NODES_FILE)?.unwrap_or_default();
        for node in &mut nodes {
            node.relink_devices();
        }
        Ok(nodes)
    }

    // ── Schedules ────────────────────────────────────────────────────

    pub fn save_schedules(&self, schedules: &IndexMap<String, Schedule>) -> Result<(), CoreError> {
        self.write(SCHEDULES_FILE, schedules)
    }

    pub fn fetch_schedules(&self) -> Result<IndexMap<String, Schedule>, CoreError> {
        let mut schedules: IndexMap<String, Schedule> =
            self.read(SCHEDULES_FILE)?.unwrap_or_default();
        for schedule in schedules.values_mut() {
            schedule.relink_actions();
        }
        Ok(schedules)
    }

    // ── Scenes ───────────────────────────────────────────────────────

    pub fn save_scenes(&self, scenes: &IndexMap<String, Scene>) -> Result<(), CoreError> {
        self.write(SCENES_FILE, scenes)
    }

    pub fn fetch_scenes(&self) -> Result<IndexMap<String, Scene>, CoreError> {
        let mut scenes: IndexMap<String, Scene> = self.read(SCENES_FILE)?.unwrap_or_default();
        for scene in scenes.values_mut() {
            scene.relink_actions();
        }
        Ok(scenes)
    }

    // ── Node groups ──────────────────────────────────────────────────

    pub fn save_node_groups(&self, groups: &[NodeGroup]) -> Result<(), CoreError> {
        self.write(NODE_GROUPS_FILE, groups)
    }

    pub fn fetch_node_groups(&self) -> Result<Vec<NodeGroup>, CoreError> {
        Ok(self.read(NODE_GROUPS_FILE)?.unwrap_or_default())
    }

    // ── Cleanup ──────────────────────────────────────────────────────

    /// Remove every stored collection (user sign-out).
    pub fn cleanup_all(&self) -> Result<(), CoreError> {
        for file in [NODES_FILE, SCHEDULES_FILE, SCENES_FILE, NODE_GROUPS_FILE] {
            let path = self.dir.join(file);
            if path.exists() {
                std::fs::remove_file(&path)?;
            }
        }
        Ok(())
    }

    // ── IO helpers ───────────────────────────────────────────────────

    fn write<T: serde::Serialize + ?Sized>(&self, file: &str, value: &T) -> Result<(), CoreError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(file);
        let json = serde_json::to_vec_pretty(value)?;
        std::fs::write(&path, json)?;
        debug!(path = %path.display(), "snapshot written");
        Ok(())
    }

    fn read<T: serde::de::DeserializeOwned>(&self, file: &str) -> Result<Option<T>, CoreError> {
        let path = self.dir.join(file);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(&path)?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }
}
