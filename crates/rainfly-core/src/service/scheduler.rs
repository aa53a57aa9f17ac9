// ── Schedule engine ──
//
// Owns the merged schedule map, the schedule-capable availability
// projection, and the schedule being edited. One active editor at a
// time by construction: the engine is an owned service object, not
// process-global state.

use indexmap::IndexMap;
use serde_json::{Value, json};

use rainfly_api::ApiClient;

use super::{BatchReport, DeviceServices, Outcome, ServiceType, decode_action_devices};
use crate::error::CoreError;
use crate::model::{Device, Node, Operation, Schedule, Trigger, Week};

const SAVE_FAILURE_TEXT: &str = "Unable to save schedule for";
const EDIT_FAILURE_TEXT: &str = "Unable to edit schedule for";
const DELETE_FAILURE_TEXT: &str = "Unable to delete schedule for";

/// Manages the fleet's schedules.
pub struct Scheduler {
    /// Merged schedules keyed by composite key.
    pub schedules: IndexMap<String, Schedule>,
    available: IndexMap<String, Device>,
    /// The schedule currently being created or edited, if any.
    pub current: Option<Schedule>,
    online: bool,
}

impl DeviceServices for Scheduler {
    fn service_type(&self) -> ServiceType {
        ServiceType::Schedule
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

impl Scheduler {
    pub fn new() -> Self {
        Self {
            schedules: IndexMap::new(),
            available: IndexMap::new(),
            current: None,
            online: true,
        }
    }

    /// Update the proactive connectivity flag consulted before every
    /// batch call.
    pub fn set_online(&mut self, online: bool) {
        self.online = online;
    }

    /// Start editing a fresh schedule.
    pub fn start_new(&mut self) -> &mut Schedule {
        self.current.insert(Schedule::new())
    }

    /// Start editing an existing schedule: loads it as `current` and
    /// replays its selections onto the availability projection.
    pub fn edit(&mut self, key: &str) -> Result<(), CoreError> {
        let mut schedule = self
            .schedules
            .get(key)
            .cloned()
            .ok_or_else(|| CoreError::ScheduleNotFound { key: key.to_owned() })?;
        schedule.operation = Some(Operation::Edit);
        self.current = Some(schedule);
        self.configure_for_current();
        Ok(())
    }

    /// Drop every schedule, the projection, and the edit state ahead
    /// of a refetch.
    pub fn refresh_list(&mut self) {
        self.schedules.clear();
        self.available.clear();
        self.current = None;
    }

    /// Look up a projection device for selection editing.
    pub fn device_mut(&mut self, node_id: &str, device_name: &str) -> Option<&mut Device> {
        self.available.get_mut(&format!("{node_id}.{device_name}"))
    }

    /// Replay the current schedule's captured params onto the
    /// availability projection, resetting stale selections first.
    pub fn configure_for_current(&mut self) {
        self.reset_available_devices();
        let Some(schedule) = self.current.clone() else {
            return;
        };
        for (node_id, devices) in &schedule.actions {
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

    /// Merge one node's schedule fragment into the map.
    ///
    /// The cloud stores the same logical schedule independently per
    /// node, so fragments join on the composite key; an existing entry
    /// only gains the node's action list.
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

        let mut trigger = Trigger::default();
        if let Some(first) = fragment
            .get("triggers")
            .and_then(Value::as_array)
            .and_then(|t| t.first())
        {
            trigger.days = first.get("d").and_then(Value::as_u64).unwrap_or(0) as u8;
            trigger.minutes = first.get("m").and_then(Value::as_u64).unwrap_or(0) as u16;
        }
        let enabled = fragment
            .get("enabled")
            .map(|v| v.as_bool().unwrap_or(v.as_i64() == Some(1)))
            .unwrap_or(false);

        let devices = decode_action_devices(node_id, fragment.get("action"));

        let key = format!(
            "{id}.{name}.{}.{}.{enabled}",
            trigger.days, trigger.minutes
        );
        if let Some(existing) = self.schedules.get_mut(&key) {
            existing.actions.insert(node_id.to_owned(), devices);
        } else {
            let mut schedule = Schedule {
                id,
                name,
                actions: IndexMap::new(),
                week: Week(trigger.days),
                trigger,
                enabled,
                operation: None,
            };
            schedule.actions.insert(node_id.to_owned(), devices);
            self.schedules.insert(key, schedule);
        }
    }

    // ── Schedule operations ──────────────────────────────────────────

    /// Save the current schedule (add or edit) for every node with a
    /// selected device.
    pub async fn save_current(
        &mut self,
        api: &ApiClient,
        nodes: &[Node],
    ) -> Result<BatchReport, CoreError> {
        let Some(schedule) = self.current.clone() else {
            return Err(CoreError::ValidationFailed {
                message: "no schedule is being edited".into(),
            });
        };

        let actions = self.actions_from_selection();
        if actions.is_empty() {
            return Ok(BatchReport::failure());
        }

        let operation = schedule.operation.unwrap_or(Operation::Add);
        let payload = json!({
            "name": schedule.name,
            "id": schedule.id,
            "operation": operation.to_string(),
            "triggers": [{ "d": schedule.trigger.days, "m": schedule.trigger.minutes }],
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
            let mut saved = schedule;
            saved.actions = actions;
            saved.operation = None;
            self.schedules.insert(saved.composite_key(), saved);
        }
        Ok(report)
    }

    /// Enable or disable a schedule across its nodes.
    pub async fn set_enabled(
        &mut self,
        api: &ApiClient,
        nodes: &[Node],
        key: &str,
        enabled: bool,
    ) -> Result<BatchReport, CoreError> {
        let mut schedule = self
            .schedules
            .get(key)
            .cloned()
            .ok_or_else(|| CoreError::ScheduleNotFound { key: key.to_owned() })?;
        schedule.enabled = enabled;
        self.current = Some(schedule.clone());
        self.configure_for_current();

        let actions = self.actions_from_selection();
        if actions.is_empty() {
            return Ok(BatchReport::failure());
        }

        let payload = json!({
            "id": schedule.id,
            "operation": if enabled { "enable" } else { "disable" },
        });
        let node_ids: Vec<String> = actions.keys().cloned().collect();

        let report = self
            .invoke_service_action(
                api,
                nodes,
                &node_ids,
                &payload,
                EDIT_FAILURE_TEXT,
                &actions,
                false,
            )
            .await?;

        // The enabled flag is part of the composite key, so a
        // confirmed flip re-keys the entry.
        if report.outcome == (Outcome::Success { some_nodes_failed: false }) {
            self.schedules.shift_remove(key);
            self.schedules.insert(schedule.composite_key(), schedule);
        }
        Ok(report)
    }

    /// Delete a schedule from every node it lives on. The local entry
    /// is removed only after a fully confirmed server-side delete.
    pub async fn delete(
        &mut self,
        api: &ApiClient,
        nodes: &[Node],
        key: &str,
    ) -> Result<BatchReport, CoreError> {
        let schedule = self
            .schedules
            .get(key)
            .cloned()
            .ok_or_else(|| CoreError::ScheduleNotFound { key: key.to_owned() })?;
        self.current = Some(schedule.clone());
        self.configure_for_current();

        let payload = json!({
            "name": schedule.name,
            "id": schedule.id,
            "operation": "remove",
        });
        let node_ids: Vec<String> = schedule.actions.keys().cloned().collect();

        let report = self
            .invoke_service_action(
                api,
                nodes,
                &node_ids,
                &payload,
                DELETE_FAILURE_TEXT,
                &schedule.actions,
                false,
            )
            .await?;

        if report.outcome == (Outcome::Success { some_nodes_failed: false }) {
            self.schedules.shift_remove(key);
            self.current = None;
        }
        Ok(report)
    }

    /// Remove a subset of nodes from a schedule (the user edited the
    /// device set down). Issues `remove` only for the deselected
    /// nodes; re-saving the remainder is the caller's follow-up.
    pub async fn delete_nodes(
        &mut self,
        api: &ApiClient,
        nodes: &[Node],
        key: &str,
        node_ids: &[String],
    ) -> Result<BatchReport, CoreError> {
        let schedule = self
            .schedules
            .get(key)
            .cloned()
            .ok_or_else(|| CoreError::ScheduleNotFound { key: key.to_owned() })?;

        let payload = json!({
            "name": schedule.name,
            "id": schedule.id,
            "operation": "remove",
        });

        let report = self
            .invoke_service_action(
                api,
                nodes,
                node_ids,
                &payload,
                DELETE_FAILURE_TEXT,
                &schedule.actions,
                false,
            )
            .await?;

        if report.outcome == (Outcome::Success { some_nodes_failed: false }) {
            if let Some(stored) = self.schedules.get_mut(key) {
                for node_id in node_ids {
                    stored.actions.shift_remove(node_id);
                }
            }
        }
        Ok(report)
    }

    // ── Helpers ──────────────────────────────────────────────────────

    /// Propagate a device rename into the projection so action lists
    /// show the fresh name.
    pub fn update_device_name(&mut self, node_id: &str, device_name: &str, display_name: &str) {
        if let Some(device) = self.device_mut(node_id, device_name) {
            device.display_name = display_name.to_owned();
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{Param, ParamValue};
    use serde_json::json;

    fn projection_device(node_id: &str, name: &str, params: &[&str]) -> Device {
        let mut device = Device::action_stub(node_id, name);
        device.params = params
            .iter()
            .map(|p| {
                let mut param = Param::action_param(*p, &json!(false));
                param.service_eligible = true;
                param
            })
            .collect();
        device
    }

    fn scheduler_with_projection() -> Scheduler {
        let mut scheduler = Scheduler::new();
        for (node, dev) in [("n1", "Light"), ("n1", "Fan"), ("n2", "Plug")] {
            let device = projection_device(node, dev, &["Power", "Brightness"]);
            scheduler.available.insert(device.key(), device);
        }
        scheduler
    }

    fn fragment(id: &str, name: &str, days: u64, minutes: u64, enabled: bool) -> Value {
        json!({
            "id": id,
            "name": name,
            "enabled": enabled,
            "triggers": [{ "d": days, "m": minutes }],
            "action": { "Light": { "Power": true } },
        })
    }

    #[test]
    fn fragments_merge_by_composite_key() {
        let mut scheduler = Scheduler::new();
        scheduler.load_fragment("n1", &fragment("ab12", "Morning", 31, 450, true));
        scheduler.load_fragment("n2", &fragment("ab12", "Morning", 31, 450, true));

        assert_eq!(scheduler.schedules.len(), 1);
        let schedule = scheduler.schedules.values().next().unwrap();
        assert_eq!(schedule.actions.len(), 2);
        assert!(schedule.actions.contains_key("n1"));
        assert!(schedule.actions.contains_key("n2"));
    }

    #[test]
    fn same_id_different_trigger_stays_distinct() {
        let mut scheduler = Scheduler::new();
        scheduler.load_fragment("n1", &fragment("ab12", "Morning", 31, 450, true));
        scheduler.load_fragment("n2", &fragment("ab12", "Morning", 31, 480, true));

        assert_eq!(scheduler.schedules.len(), 2);
    }

    #[test]
    fn integer_enabled_flag_is_accepted() {
        let mut scheduler = Scheduler::new();
        let mut frag = fragment("ab12", "Morning", 0, 0, true);
        frag["enabled"] = json!(1);
        scheduler.load_fragment("n1", &frag);

        assert!(scheduler.schedules.values().next().unwrap().enabled);
    }

    #[test]
    fn configure_replays_actions_onto_projection() {
        let mut scheduler = scheduler_with_projection();
        scheduler.load_fragment("n1", &fragment("ab12", "Morning", 31, 450, true));
        let key = scheduler.schedules.keys().next().unwrap().clone();
        scheduler.edit(&key).unwrap();

        let light = scheduler.device_mut("n1", "Light").unwrap();
        assert_eq!(light.selected_params, 1);
        let power = light.params.iter().find(|p| p.name == "Power").unwrap();
        assert!(power.selected);
        assert_eq!(power.value, Some(ParamValue::Bool(true)));

        // Devices outside the schedule stay untouched.
        assert_eq!(scheduler.device_mut("n2", "Plug").unwrap().selected_params, 0);
    }

    #[test]
    fn configure_resets_stale_selections_first() {
        let mut scheduler = scheduler_with_projection();
        scheduler
            .device_mut("n2", "Plug")
            .unwrap()
            .set_param_selected("Power", true);

        scheduler.load_fragment("n1", &fragment("ab12", "Morning", 31, 450, true));
        let key = scheduler.schedules.keys().next().unwrap().clone();
        scheduler.edit(&key).unwrap();

        // The stale selection from the prior edit session is gone.
        assert_eq!(scheduler.device_mut("n2", "Plug").unwrap().selected_params, 0);
    }

    #[test]
    fn actions_group_selected_devices_by_node() {
        let mut scheduler = scheduler_with_projection();
        scheduler
            .device_mut("n1", "Light")
            .unwrap()
            .set_param_selected("Power", true);
        scheduler
            .device_mut("n1", "Fan")
            .unwrap()
            .set_param_selected("Brightness", true);
        scheduler
            .device_mut("n2", "Plug")
            .unwrap()
            .set_param_selected("Power", true);

        let actions = scheduler.actions_from_selection();

        assert_eq!(actions.len(), 2);
        assert_eq!(actions["n1"].len(), 2);
        assert_eq!(actions["n2"].len(), 1);
    }

    #[test]
    fn refresh_clears_everything() {
        let mut scheduler = scheduler_with_projection();
        scheduler.load_fragment("n1", &fragment("ab12", "Morning", 31, 450, true));
        scheduler.start_new();

        scheduler.refresh_list();

        assert!(scheduler.schedules.is_empty());
        assert!(scheduler.available_devices().is_empty());
        assert!(scheduler.current.is_none());
    }
}
