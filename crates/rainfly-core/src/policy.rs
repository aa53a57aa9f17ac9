// ── Action eligibility policy ──
//
// Pure function of (service type, node, device) → status, memoized on
// the device for the duration of an edit session. The offline check
// always wins: a disconnected node is never eligible regardless of
// selection state or remaining capacity.

use serde::{Deserialize, Serialize};

use crate::model::{Device, Node};

/// Whether a schedule/scene action is currently allowed for a device.
///
/// Not an error: UI layers consume this to disable affected controls
/// proactively, preventing invalid requests before they are sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionStatus {
    Allowed,
    /// The owning node is not connected to the cloud.
    Offline,
    /// The node's capacity slots are exhausted; carries the limit.
    MaxReached(i32),
}

impl std::fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Allowed => Ok(()),
            Self::Offline => f.write_str("Offline"),
            Self::MaxReached(limit) => write!(f, "Max supported count {limit} reached"),
        }
    }
}

fn evaluate(
    connected: bool,
    already_selected: bool,
    slot_available: bool,
    limit: i32,
) -> ActionStatus {
    if !connected {
        ActionStatus::Offline
    } else if !already_selected && !slot_available {
        ActionStatus::MaxReached(limit)
    } else {
        ActionStatus::Allowed
    }
}

impl Device {
    /// Scheduling eligibility, memoized until the projection resets.
    pub fn schedule_action(&mut self, node: &Node) -> ActionStatus {
        if let Some(status) = self.schedule_status {
            return status;
        }
        let status = evaluate(
            node.connected,
            self.is_selected(),
            node.is_scheduling_allowed(),
            node.max_schedules,
        );
        self.schedule_status = Some(status);
        status
    }

    /// Scene eligibility, memoized until the projection resets.
    pub fn scene_action(&mut self, node: &Node) -> ActionStatus {
        if let Some(status) = self.scene_status {
            return status;
        }
        let status = evaluate(
            node.connected,
            self.is_selected(),
            node.is_scene_allowed(),
            node.max_scenes,
        );
        self.scene_status = Some(status);
        status
    }
}
