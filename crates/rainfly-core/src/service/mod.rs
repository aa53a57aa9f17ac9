// ── Device-service engines ──
//
// Shared machinery for the schedule and scene managers: availability
// projection, selection bookkeeping, batched request construction, and
// reconciliation of per-node cloud responses. The two engines differ
// only in their operation JSON and capability flags, so everything
// common lives in the `DeviceServices` trait as default method bodies.

pub mod scenes;
pub mod scheduler;

pub use scenes::SceneManager;
pub use scheduler::Scheduler;

use indexmap::IndexMap;
use serde_json::{Value, json};
use tracing::{debug, warn};

use rainfly_api::{ApiClient, NodePayload, NodeResponse};

use crate::error::CoreError;
use crate::model::{Device, Node, Param, find_node};

/// Which device service an engine drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ServiceType {
    Schedule,
    Scene,
}

impl ServiceType {
    /// Global default service/param key names, used when a node does
    /// not override them.
    pub fn default_keys(self) -> (&'static str, &'static str) {
        match self {
            Self::Schedule => ("Schedule", "Schedules"),
            Self::Scene => ("Scene", "Scenes"),
        }
    }
}

/// Overall outcome of a batched service operation.
///
/// Partial failure is a *success* variant: the cloud applied the
/// operation on some nodes, and the UI shows a qualified success while
/// listing the devices that missed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success { some_nodes_failed: bool },
    Failure,
}

/// Reconciled result of one batched call.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub outcome: Outcome,
    /// User-visible names of devices on nodes that failed.
    pub failed_devices: Vec<String>,
    /// Caller-supplied failure text joined with the device list, only
    /// present when there is something to show.
    pub message: Option<String>,
}

impl BatchReport {
    pub(crate) fn failure() -> Self {
        Self {
            outcome: Outcome::Failure,
            failed_devices: Vec::new(),
            message: None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success { .. })
    }
}

/// Resolve the service & param key names for a node.
///
/// Nodes may rename the service keys in their config; unknown nodes
/// fall back to the global defaults.
pub fn service_keys(nodes: &[Node], node_id: &str, service: ServiceType) -> (String, String) {
    match (find_node(nodes, node_id), service) {
        (Some(node), ServiceType::Schedule) => {
            (node.schedule_key.clone(), node.schedules_key.clone())
        }
        (Some(node), ServiceType::Scene) => (node.scene_key.clone(), node.scenes_key.clone()),
        (None, service) => {
            let (a, b) = service.default_keys();
            (a.to_owned(), b.to_owned())
        }
    }
}

/// Shared engine behavior for schedule/scene managers.
pub trait DeviceServices {
    fn service_type(&self) -> ServiceType;
    fn available_devices(&self) -> &IndexMap<String, Device>;
    fn available_devices_mut(&mut self) -> &mut IndexMap<String, Device>;
    /// Proactive connectivity flag; batch calls short-circuit when
    /// offline instead of burning a round trip per node.
    fn online(&self) -> bool;

    /// Build the availability projection from the node list: a deep
    /// copy of each capable node's devices, filtered to
    /// service-eligible params, keyed `"{node_id}.{device_name}"`.
    ///
    /// The copies are decoupled from the live device graph so that
    /// selection toggles never touch operational state.
    fn rebuild_available_devices(&mut self, nodes: &[Node]) {
        let service = self.service_type();
        for node in nodes {
            let supported = match service {
                ServiceType::Schedule => node.scheduling_supported,
                ServiceType::Scene => node.scenes_supported,
            };
            if !supported {
                continue;
            }
            for device in &node.devices {
                let mut copy = device.projection_copy();
                copy.params = device
                    .params
                    .iter()
                    .filter(|p| p.service_eligible)
                    .cloned()
                    .map(|mut p| {
                        p.selected = false;
                        p
                    })
                    .collect();
                if !copy.params.is_empty() {
                    self.available_devices_mut().insert(copy.key(), copy);
                }
            }
        }
    }

    /// Deselect everything in the projection and drop memoized action
    /// statuses. Must run before replaying an automation onto the
    /// projection -- stale selections from a prior edit session are a
    /// correctness hazard.
    fn reset_available_devices(&mut self) {
        for device in self.available_devices_mut().values_mut() {
            device.reset_selection();
        }
    }

    /// Comma-separated, sorted list of devices participating in the
    /// current edit.
    fn action_list(&self) -> String {
        let mut names: Vec<&str> = self
            .available_devices()
            .values()
            .filter(|d| d.is_selected())
            .map(Device::user_visible_name)
            .collect();
        names.sort_unstable();
        names.join(", ")
    }

    /// Group the currently selected projection devices by node id --
    /// the shape every batched operation is built from.
    fn actions_from_selection(&self) -> IndexMap<String, Vec<Device>> {
        let mut actions: IndexMap<String, Vec<Device>> = IndexMap::new();
        for device in self.available_devices().values() {
            if device.is_selected() {
                actions
                    .entry(device.node_id.clone())
                    .or_default()
                    .push(device.clone());
            }
        }
        actions
    }

    /// Build the batched payload for `node_ids`, issue it, and
    /// reconcile the per-node responses.
    ///
    /// In save mode each node's operation JSON additionally carries
    /// the `action` sub-object: `{device_name: {param: value}}`
    /// restricted to selected params.
    fn invoke_service_action(
        &self,
        api: &ApiClient,
        nodes: &[Node],
        node_ids: &[String],
        operation: &Value,
        failure_text: &str,
        actions: &IndexMap<String, Vec<Device>>,
        is_save: bool,
    ) -> impl std::future::Future<Output = Result<BatchReport, CoreError>> {
        async move {
            if !self.online() {
                return Err(CoreError::Offline);
            }

            let mut batch = Vec::with_capacity(node_ids.len());
            for node_id in node_ids {
                let mut op = operation.clone();
                if is_save {
                    let mut device_json = serde_json::Map::new();
                    if let Some(devices) = actions.get(node_id) {
                        for device in devices {
                            let mut action_json = serde_json::Map::new();
                            for (name, value) in device.selected_param_values() {
                                action_json.insert(name.to_owned(), value.to_json());
                            }
                            device_json.insert(device.name.clone(), Value::Object(action_json));
                        }
                    }
                    if let Value::Object(map) = &mut op {
                        map.insert("action".into(), Value::Object(device_json));
                    }
                }

                let (service_key, params_key) =
                    service_keys(nodes, node_id, self.service_type());
                batch.push(NodePayload {
                    node_id: node_id.clone(),
                    payload: json!({ service_key: { params_key: [op] } }),
                });
            }

            debug!(
                service = %self.service_type(),
                nodes = batch.len(),
                "issuing batched service operation"
            );
            let responses = api.set_node_params(&batch).await?;
            Ok(reconcile(
                &responses,
                actions,
                self.available_devices(),
                failure_text,
            ))
        }
    }
}

/// Partition per-node responses and fold them into a [`BatchReport`].
pub(crate) fn reconcile(
    responses: &[NodeResponse],
    actions: &IndexMap<String, Vec<Device>>,
    available: &IndexMap<String, Device>,
    failure_text: &str,
) -> BatchReport {
    if responses.is_empty() {
        return BatchReport::failure();
    }

    let (succeeded, failed): (Vec<&NodeResponse>, Vec<&NodeResponse>) =
        responses.iter().partition(|r| r.is_success());

    let failed_devices = device_names_for(&failed, actions, available);

    if succeeded.is_empty() {
        return BatchReport {
            outcome: Outcome::Failure,
            failed_devices,
            message: None,
        };
    }

    if failed_devices.is_empty() {
        BatchReport {
            outcome: Outcome::Success {
                some_nodes_failed: false,
            },
            failed_devices,
            message: None,
        }
    } else {
        let message = format!("{failure_text} {}", failed_devices.join(", "));
        warn!(%message, failed = failed.len(), "batched operation partially failed");
        BatchReport {
            outcome: Outcome::Success {
                some_nodes_failed: true,
            },
            failed_devices,
            message: Some(message),
        }
    }
}

/// Resolve the user-visible device names affected by failed nodes,
/// preferring the availability projection and falling back to the raw
/// action device name.
fn device_names_for(
    failed: &[&NodeResponse],
    actions: &IndexMap<String, Vec<Device>>,
    available: &IndexMap<String, Device>,
) -> Vec<String> {
    let mut names = Vec::new();
    for response in failed {
        let Some(node_id) = response.node_id.as_deref() else {
            continue;
        };
        let Some(devices) = actions.get(node_id) else {
            continue;
        };
        for device in devices {
            let key = format!("{node_id}.{}", device.name);
            let name = available
                .get(&key)
                .map_or_else(|| device.user_visible_name(), Device::user_visible_name);
            names.push(name.to_owned());
        }
    }
    names
}

/// Decode the `action` object of a schedule/scene fragment into
/// device stubs carrying their captured params.
pub(crate) fn decode_action_devices(node_id: &str, action: Option<&Value>) -> Vec<Device> {
    let mut devices = Vec::new();
    let Some(map) = action.and_then(Value::as_object) else {
        return devices;
    };
    for (device_name, params) in map {
        let mut device = Device::action_stub(node_id, device_name);
        if let Some(params) = params.as_object() {
            for (param_name, value) in params {
                device.params.push(Param::action_param(param_name, value));
            }
        }
        devices.push(device);
    }
    devices
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(node_id: &str, status: &str) -> NodeResponse {
        NodeResponse {
            node_id: Some(node_id.into()),
            status: status.into(),
            error_code: None,
            description: String::new(),
        }
    }

    fn actions_with(node_devices: &[(&str, &[&str])]) -> IndexMap<String, Vec<Device>> {
        let mut actions = IndexMap::new();
        for (node_id, devices) in node_devices {
            let list: Vec<Device> = devices
                .iter()
                .map(|name| Device::action_stub(*node_id, *name))
                .collect();
            actions.insert((*node_id).to_owned(), list);
        }
        actions
    }

    #[test]
    fn all_success_reports_clean_success() {
        let actions = actions_with(&[("n1", &["Light"]), ("n2", &["Fan"])]);
        let responses = vec![response("n1", "success"), response("n2", "success")];

        let report = reconcile(&responses, &actions, &IndexMap::new(), "Unable to save schedule for");

        assert_eq!(
            report.outcome,
            Outcome::Success {
                some_nodes_failed: false
            }
        );
        assert!(report.failed_devices.is_empty());
        assert!(report.message.is_none());
    }

    #[test]
    fn partial_failure_is_success_with_flag_and_f_entries() {
        let actions = actions_with(&[("n1", &["Light"]), ("n2", &["Fan"]), ("n3", &["Plug"])]);
        let responses = vec![
            response("n1", "success"),
            response("n2", "failure"),
            response("n3", "failure"),
        ];

        let report = reconcile(&responses, &actions, &IndexMap::new(), "Unable to save schedule for");

        assert_eq!(
            report.outcome,
            Outcome::Success {
                some_nodes_failed: true
            }
        );
        // Exactly F entries for F failed single-device nodes.
        assert_eq!(report.failed_devices, vec!["Fan", "Plug"]);
        assert_eq!(
            report.message.as_deref(),
            Some("Unable to save schedule for Fan, Plug")
        );
    }

    #[test]
    fn all_failed_is_overall_failure_never_partial() {
        let actions = actions_with(&[("n1", &["Light"]), ("n2", &["Fan"])]);
        let responses = vec![response("n1", "failure"), response("n2", "failure")];

        let report = reconcile(&responses, &actions, &IndexMap::new(), "Unable to save schedule for");

        assert_eq!(report.outcome, Outcome::Failure);
        assert_eq!(report.failed_devices.len(), 2);
    }

    #[test]
    fn empty_response_list_is_failure() {
        let report = reconcile(&[], &IndexMap::new(), &IndexMap::new(), "x");
        assert_eq!(report.outcome, Outcome::Failure);
    }

    #[test]
    fn failed_names_resolve_through_projection() {
        let actions = actions_with(&[("n1", &["Light"])]);
        let mut available = IndexMap::new();
        let mut projected = Device::action_stub("n1", "Light");
        projected.display_name = "Porch light".into();
        available.insert(projected.key(), projected);

        let responses = vec![response("n1", "failure"), response("n2", "success")];
        let report = reconcile(&responses, &actions, &available, "Unable to delete schedule for");

        assert_eq!(report.failed_devices, vec!["Porch light"]);
    }

    #[test]
    fn decode_action_devices_builds_stubs() {
        let action = json!({
            "Light": { "Power": true, "Brightness": 80 },
            "Fan": { "Speed": 3 }
        });

        let mut devices = decode_action_devices("n1", Some(&action));
        devices.sort_by(|a, b| a.name.cmp(&b.name));

        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].name, "Fan");
        assert_eq!(devices[0].node_id, "n1");
        assert_eq!(devices[1].params.len(), 2);
    }

    #[test]
    fn service_keys_fall_back_to_defaults() {
        let (service, params) = service_keys(&[], "ghost", ServiceType::Scene);
        assert_eq!(service, "Scene");
        assert_eq!(params, "Scenes");
    }
}
