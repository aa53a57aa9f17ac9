// ── Scene engine ──
//
// Mirrors the scheduler for on-demand automations: merged scene map,
// scene-capable availability projection, current edit state, plus the
// activate operation schedules don't have.

use indexmap::IndexMap;
use serde_json::{Value, json};

use rainfly_api::ApiClient;

use super::{BatchReport, DeviceServices, Outcome, ServiceType, decode_action_devices};
use crate::error::CoreError;
use crate::model::{Device, Node, Operation, Scene};

const SAVE_FAILURE_TEXT: &str = "Unable to save scene for";
const DELETE_FAILURE_TEXT: &str = "Unable to delete scene for";
const ACTIVATE_FAILURE_TEXT: &str = "Unable to activate scene for";

/// Manages the fleet's scenes.
pub struct SceneManager {
    /// Merged scenes keyed by composite key.
    pub scenes: IndexMap<String, Scene>,
    available: IndexMap<String, Device>,
    /// The scene currently being created or edited, if any.
    pub current: Option<Scene>,
    online: bool,
}

impl DeviceServices for SceneManager {
    fn service_type(&self) -> ServiceType {
        ServiceType::Scene
    }

    fn available_devices(&self) -> &IndexMap<String, Device> {
        &self.available
    }

    fn available_devices_mut(&mut self) -> &mut IndexMap<String, Device> {
        &mut self.available
    }

    fn online(&self) -> bool {
        self.online
    }
}

impl SceneManager {
    pub fn new() -> Self {
        Self {
            scenes: IndexMap::new(),
            available: IndexMap::new(),
            current: None,
            online: true,
        }
    }

    pub fn set_online(&mut self, online: bool) {
        self.online = online;
    }

    /// Start editing a fresh scene.
    pub fn start_new(&mut self) -> &mut Scene {
        self.current.insert(Scene::new())
    }

    /// Start editing an existing scene.
    pub fn edit(&mut self, key: &str) -> Result<(), CoreError> {
        let mut scene = self
            .scenes
            .get(key)
            .cloned()
            .ok_or_else(|| CoreError::SceneNotFound { key: key.to_owned() })?;
        scene.operation = Some(Operation::Edit);
        self.current = Some(scene);
        self.configure_for_current();
        Ok(())
    }

    /// Drop every scene, the projection, and the edit state ahead of a
    /// refetch.
    pub fn refresh_list(&mut self) {
        self.scenes.clear();
        self.available.clear();
        self.current = None;
    }

    /// Look up a projection device for selection editing.
    pub fn device_mut(&mut self, node_id: &str, device_name: &str) -> Option<&mut Device> {
        self.available.get_mut(&format!("{node_id}.{device_name}"))
    }

    /// Replay the current scene's captured params onto the
    /// availability projection, resetting stale selections first.
    pub fn configure_for_current(&mut self) {
        self.reset_available_devices();
        let Some(scene) = self.current.clone() else {
            return;
        };
        for (node_id, devices) in &scene.actions {
            for device in devices {
                let key = format!("{node_id}.{}", device.name);
                if let Some(projected) = self.available.get_mut(&key) {
                    for param in &device.params {
                        if let Some(value) = &param.value {
                            projected.select_param_with_value(&param.name, value.clone());
                        }
                    }
                }
            }
        }
    }

    /// Merge one node's scene fragment into the map.
    pub fn load_fragment(&mut self, node_id: &str, fragment: &Value) {
        if node_id.is_empty() {
            return;
        }
        let id = fragment
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        let name = fragment
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        let info = fragment
            .get("info")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();

        let devices = decode_action_devices(node_id, fragment.get("action"));

        let key = format!("{id}.{name}.{info}");
        if let Some(existing) = self.scenes.get_mut(&key) {
            existing.actions.insert(node_id.to_owned(), devices);
        } else {
            let mut scene = Scene {
                id,
                name,
                info,
                actions: IndexMap::new(),
                operation: None,
            };
            scene.actions.insert(node_id.to_owned(), devices);
            self.scenes.insert(key, scene);
        }
    }

    // ── Scene operations ─────────────────────────────────────────────

    /// Save the current scene (add or edit) for every node with a
    /// selected device.
    pub async fn save_current(
        &mut self,
        api: &ApiClient,
        nodes: &[Node],
    ) -> Result<BatchReport, CoreError> {
        let Some(scene) = self.current.clone() else {
            return Err(CoreError::ValidationFailed {
                message: "no scene is being edited".into(),
            });
        };

        let actions = self.actions_from_selection();
        if actions.is_empty() {
            return Ok(BatchReport::failure());
        }

        let operation = scene.operation.unwrap_or(Operation::Add);
        let payload = json!({
            "name": scene.name,
            "id": scene.id,
            "info": scene.info,
            "operation": operation.to_string(),
        });
        let node_ids: Vec<String> = actions.keys().cloned().collect();

        let report = self
            .invoke_service_action(
                api,
                nodes,
                &node_ids,
                &payload,
                SAVE_FAILURE_TEXT,
                &actions,
                true,
            )
            .await?;

        if report.is_success() {
            let mut saved = scene;
            saved.actions = actions;
            saved.operation = None;
            self.scenes.insert(saved.composite_key(), saved);
        }
        Ok(report)
    }

    /// Apply a scene on its devices.
    pub async fn activate(
        &self,
        api: &ApiClient,
        nodes: &[Node],
        key: &str,
    ) -> Result<BatchReport, CoreError> {
        let scene = self
            .scenes
            .get(key)
            .ok_or_else(|| CoreError::SceneNotFound { key: key.to_owned() })?;

        let payload = json!({
            "id": scene.id,
            "operation": "activate",
        });
        let node_ids: Vec<String> = scene.actions.keys().cloned().collect();

        self.invoke_service_action(
            api,
            nodes,
            &node_ids,
            &payload,
            ACTIVATE_FAILURE_TEXT,
            &scene.actions,
            false,
        )
        .await
    }

    /// Delete a scene from every node it lives on. The local entry is
    /// removed only after a fully confirmed server-side delete.
    pub async fn delete(
        &mut self,
        api: &ApiClient,
        nodes: &[Node],
        key: &str,
    ) -> Result<BatchReport, CoreError> {
        let scene = self
            .scenes
            .get(key)
            .cloned()
            .ok_or_else(|| CoreError::SceneNotFound { key: key.to_owned() })?;
        self.current = Some(scene.clone());
        self.configure_for_current();

        let payload = json!({
            "id": scene.id,
            "operation": "remove",
        });
        let node_ids: Vec<String> = scene.actions.keys().cloned().collect();

        let report = self
            .invoke_service_action(
                api,
                nodes,
                &node_ids,
                &payload,
                DELETE_FAILURE_TEXT,
                &scene.actions,
                false,
            )
            .await?;

        if report.outcome == (Outcome::Success { some_nodes_failed: false }) {
            self.scenes.shift_remove(key);
            self.current = None;
        }
        Ok(report)
    }

    /// Remove a subset of nodes from a scene.
    pub async fn delete_nodes(
        &mut self,
        api: &ApiClient,
        nodes: &[Node],
        key: &str,
        node_ids: &[String],
    ) -> Result<BatchReport, CoreError> {
        let scene = self
            .scenes
            .get(key)
            .cloned()
            .ok_or_else(|| CoreError::SceneNotFound { key: key.to_owned() })?;

        let payload = json!({
            "name": scene.name,
            "id": scene.id,
            "operation": "remove",
        });

        let report = self
            .invoke_service_action(
                api,
                nodes,
                node_ids,
                &payload,
                DELETE_FAILURE_TEXT,
                &scene.actions,
                false,
            )
            .await?;

        if report.outcome == (Outcome::Success { some_nodes_failed: false }) {
            if let Some(stored) = self.scenes.get_mut(key) {
                for node_id in node_ids {
                    stored.actions.shift_remove(node_id);
                }
            }
        }
        Ok(report)
    }
}

impl Default for SceneManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fragment(id: &str, name: &str, info: &str) -> Value {
        json!({
            "id": id,
            "name": name,
            "info": info,
            "action": { "Light": { "Power": false } },
        })
    }

    #[test]
    fn fragments_merge_on_id_name_info() {
        let mut manager = SceneManager::new();
        manager.load_fragment("n1", &fragment("s1", "Movie night", "dim everything"));
        manager.load_fragment("n2", &fragment("s1", "Movie night", "dim everything"));

        assert_eq!(manager.scenes.len(), 1);
        assert_eq!(manager.scenes.values().next().unwrap().actions.len(), 2);
    }

    #[test]
    fn different_info_stays_distinct() {
        let mut manager = SceneManager::new();
        manager.load_fragment("n1", &fragment("s1", "Movie night", "v1"));
        manager.load_fragment("n2", &fragment("s1", "Movie night", "v2"));

        assert_eq!(manager.scenes.len(), 2);
    }

    #[test]
    fn empty_node_id_is_ignored() {
        let mut manager = SceneManager::new();
        manager.load_fragment("", &fragment("s1", "Movie night", ""));
        assert!(manager.scenes.is_empty());
    }
}
