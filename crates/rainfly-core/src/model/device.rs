// ── Device domain type ──

use serde::{Deserialize, Serialize};

use super::param::{Param, ParamValue};
use crate::policy::ActionStatus;

/// An addressable sub-unit of a node exposing one or more params.
///
/// Devices appear in two roles: live entries in a node's device list,
/// and deep copies inside the availability projection / schedule-scene
/// action maps. Selection state (`selected_params`, per-param
/// `selected` flags, the status caches) only ever means something on
/// the projection copies and is never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    /// Wire identifier, unique within the owning node.
    pub name: String,
    #[serde(default)]
    pub device_type: Option<String>,
    #[serde(default)]
    pub primary: Option<String>,
    /// User-visible name (name-param value when present, else `name`).
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub params: Vec<Param>,
    /// Back-reference to the owning node. Not serialized -- restored
    /// by the persistence bridge after decoding.
    #[serde(skip)]
    pub node_id: String,
    /// UI grouping state for edit sessions.
    #[serde(skip, default = "default_collapsed")]
    pub collapsed: bool,
    /// Count of params currently selected for the schedule/scene being
    /// edited. Invariant: always equals the number of params with
    /// `selected == true`; every toggle path must go through
    /// [`Device::set_param_selected`] or keep the two in sync itself.
    #[serde(skip)]
    pub selected_params: usize,
    #[serde(skip)]
    pub(crate) schedule_status: Option<ActionStatus>,
    #[serde(skip)]
    pub(crate) scene_status: Option<ActionStatus>,
}

fn default_collapsed() -> bool {
    true
}

impl Device {
    /// Minimal device for a decoded schedule/scene action fragment.
    pub fn action_stub(node_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            device_type: None,
            primary: None,
            display_name: String::new(),
            params: Vec::new(),
            node_id: node_id.into(),
            collapsed: true,
            selected_params: 0,
            schedule_status: None,
            scene_status: None,
        }
    }

    /// Copy for the availability projection: identity fields only, the
    /// caller refills `params` with the eligible subset.
    pub(crate) fn projection_copy(&self) -> Self {
        Self {
            name: self.name.clone(),
            device_type: self.device_type.clone(),
            primary: self.primary.clone(),
            display_name: self.display_name.clone(),
            params: Vec::new(),
            node_id: self.node_id.clone(),
            collapsed: true,
            selected_params: 0,
            schedule_status: None,
            scene_status: None,
        }
    }

    /// Projection key: `"{node_id}.{device_name}"`.
    pub fn key(&self) -> String {
        format!("{}.{}", self.node_id, self.name)
    }

    /// The name shown to users: the name-param value when one exists,
    /// otherwise the stored display name, otherwise the wire name.
    pub fn user_visible_name(&self) -> &str {
        if let Some(name) = self
            .params
            .iter()
            .find(|p| p.is_name_param())
            .and_then(|p| p.value.as_ref())
        {
            if let ParamValue::Text(s) = name {
                if !s.is_empty() {
                    return s;
                }
            }
        }
        if self.display_name.is_empty() {
            &self.name
        } else {
            &self.display_name
        }
    }

    /// True when at least one param is selected for the current edit.
    pub fn is_selected(&self) -> bool {
        self.selected_params > 0
    }

    /// Toggle a param's selection, keeping `selected_params` in sync.
    ///
    /// Returns `false` if the param does not exist or was already in
    /// the requested state.
    pub fn set_param_selected(&mut self, param_name: &str, selected: bool) -> bool {
        let Some(param) = self.params.iter_mut().find(|p| p.name == param_name) else {
            return false;
        };
        if param.selected == selected {
            return false;
        }
        param.selected = selected;
        if selected {
            self.selected_params += 1;
        } else {
            self.selected_params -= 1;
        }
        true
    }

    /// Select a param and stage the value it should carry in the
    /// schedule/scene action. Used when replaying a stored automation
    /// onto the projection and when the user picks a value.
    pub fn select_param_with_value(&mut self, param_name: &str, value: ParamValue) -> bool {
        let Some(param) = self.params.iter_mut().find(|p| p.name == param_name) else {
            return false;
        };
        param.value = Some(value);
        if !param.selected {
            param.selected = true;
            self.selected_params += 1;
        }
        true
    }

    /// Clear all selection state and the memoized action statuses.
    pub fn reset_selection(&mut self) {
        self.selected_params = 0;
        self.collapsed = true;
        self.schedule_status = None;
        self.scene_status = None;
        for param in &mut self.params {
            param.selected = false;
        }
    }

    /// Drop the memoized eligibility statuses (node state changed).
    pub fn clear_status_cache(&mut self) {
        self.schedule_status = None;
        self.scene_status = None;
    }

    /// Params currently selected, with their staged values.
    pub fn selected_param_values(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.params
            .iter()
            .filter(|p| p.selected)
            .filter_map(|p| p.value.as_ref().map(|v| (p.name.as_str(), v)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn device_with_params(names: &[&str]) -> Device {
        let mut d = Device::action_stub("n1", "Light");
        d.params = names
            .iter()
            .map(|n| Param::action_param(*n, &json!(false)))
            .collect();
        d
    }

    #[test]
    fn toggle_keeps_counter_in_sync() {
        let mut d = device_with_params(&["Power", "Brightness", "Hue"]);

        assert!(d.set_param_selected("Power", true));
        assert!(d.set_param_selected("Hue", true));
        assert_eq!(d.selected_params, 2);

        // Re-selecting an already-selected param must not double count.
        assert!(!d.set_param_selected("Power", true));
        assert_eq!(d.selected_params, 2);

        assert!(d.set_param_selected("Power", false));
        assert_eq!(d.selected_params, 1);
        assert!(d.is_selected());
    }

    #[test]
    fn random_toggle_sequences_never_desynchronize() {
        let mut d = device_with_params(&["a", "b", "c", "d", "e"]);
        let names = ["a", "b", "c", "d", "e"];

        // Deterministic xorshift keeps the test reproducible.
        let mut state: u64 = 0x9e37_79b9_7f4a_7c15;
        for _ in 0..500 {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let idx = (state % 5) as usize;
            let on = state & 1 == 0;
            d.set_param_selected(names[idx], on);

            let actual = d.params.iter().filter(|p| p.selected).count();
            assert_eq!(d.selected_params, actual);
        }
    }

    #[test]
    fn reset_clears_selection_and_caches() {
        let mut d = device_with_params(&["Power"]);
        d.set_param_selected("Power", true);
        d.schedule_status = Some(ActionStatus::Offline);

        d.reset_selection();

        assert_eq!(d.selected_params, 0);
        assert!(d.params.iter().all(|p| !p.selected));
        assert!(d.schedule_status.is_none());
    }

    #[test]
    fn user_visible_name_prefers_name_param() {
        let mut d = Device::action_stub("n1", "Light");
        d.display_name = "Hallway".into();
        assert_eq!(d.user_visible_name(), "Hallway");

        let mut name_param = Param::action_param("Name", &json!("Porch light"));
        name_param.param_type = Some("esp.param.name".into());
        d.params.push(name_param);
        assert_eq!(d.user_visible_name(), "Porch light");
    }
}
