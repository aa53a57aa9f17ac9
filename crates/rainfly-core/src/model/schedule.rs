// ── Schedule domain types ──

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::device::Device;

/// Pending write operation for a schedule or scene being edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Operation {
    Add,
    Edit,
}

/// Time-of-day trigger: a repeat-days bitmask plus minutes past
/// midnight. On the wire this travels as `{"d": days, "m": minutes}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    pub days: u8,
    pub minutes: u16,
}

impl Trigger {
    /// Render the time as `hh:mm AM/PM`.
    pub fn time_description(&self) -> String {
        let hours = u32::from(self.minutes) / 60;
        let minutes = u32::from(self.minutes) % 60;
        let (display_hours, suffix) = match hours {
            0 | 24 => (12, "AM"),
            12 => (12, "PM"),
            h if h > 12 => (h - 12, "PM"),
            h => (h, "AM"),
        };
        format!("{display_hours:02}:{minutes:02} {suffix}")
    }
}

/// Repeat-days helper over the trigger's 7-bit mask.
///
/// The LSB is Monday; e.g. `0b0001_1111` (31) means all weekdays.
/// Zero means the schedule triggers once and does not repeat.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Week(pub u8);

const DAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

const WEEKDAYS: u8 = 0b0001_1111;
const WEEKENDS: u8 = 0b0110_0000;
const ALL_DAYS: u8 = 0b0111_1111;

impl Week {
    pub fn is_set(&self, day: usize) -> bool {
        day < 7 && self.0 & (1 << day) != 0
    }

    pub fn set(&mut self, day: usize, on: bool) {
        if day < 7 {
            if on {
                self.0 |= 1 << day;
            } else {
                self.0 &= !(1 << day);
            }
        }
    }

    /// Parse a day name ("mon", "Monday", ...) to its bit index.
    pub fn day_index(name: &str) -> Option<usize> {
        DAY_NAMES
            .iter()
            .position(|d| d.to_ascii_lowercase().starts_with(&name.to_ascii_lowercase()))
    }

    /// Short human description of the selected days.
    pub fn short_description(&self) -> String {
        match self.0 & ALL_DAYS {
            0 => "Once".into(),
            ALL_DAYS => "Daily".into(),
            WEEKDAYS => "Weekdays".into(),
            WEEKENDS => "Weekends".into(),
            mask => {
                let mut parts = Vec::new();
                for (i, name) in DAY_NAMES.iter().enumerate() {
                    if mask & (1 << i) != 0 {
                        parts.push(&name[..3]);
                    }
                }
                parts.join(", ")
            }
        }
    }
}

/// A user-defined time-triggered set of param writes across devices.
///
/// The cloud stores one copy of a schedule per participating node; the
/// engine merges those per-node fragments by [`Schedule::composite_key`]
/// so the same logical schedule appears once locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Node id → devices (with selected params) captured at save time.
    #[serde(default)]
    pub actions: IndexMap<String, Vec<Device>>,
    #[serde(default)]
    pub trigger: Trigger,
    #[serde(default)]
    pub week: Week,
    #[serde(default = "enabled_default")]
    pub enabled: bool,
    /// Pending write operation. Edit-session state, never persisted.
    #[serde(skip)]
    pub operation: Option<Operation>,
}

fn enabled_default() -> bool {
    true
}

impl Schedule {
    /// A fresh schedule with a locally generated short id.
    pub fn new() -> Self {
        Self {
            id: short_id(),
            name: String::new(),
            actions: IndexMap::new(),
            trigger: Trigger::default(),
            week: Week::default(),
            enabled: true,
            operation: Some(Operation::Add),
        }
    }

    /// Composite identity: the same logical schedule stored on several
    /// nodes yields identical keys, while id collisions with different
    /// triggers stay distinct.
    pub fn composite_key(&self) -> String {
        format!(
            "{}.{}.{}.{}.{}",
            self.id, self.name, self.trigger.days, self.trigger.minutes, self.enabled
        )
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

impl Default for Schedule {
    fn default() -> Self {
        Self::new()
    }
}

/// Locally generated short identifier for new schedules/scenes.
///
/// The cloud treats the id as an opaque short string and echoes it
/// back on every fragment.
pub fn short_id() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    id[..8].to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn week_bitmask_positions() {
        let mut week = Week::default();
        week.set(0, true); // Monday
        week.set(6, true); // Sunday
        assert_eq!(week.0, 0b0100_0001);
        assert!(week.is_set(0));
        assert!(!week.is_set(3));
    }

    #[test]
    fn week_short_descriptions() {
        assert_eq!(Week(0).short_description(), "Once");
        assert_eq!(Week(127).short_description(), "Daily");
        assert_eq!(Week(31).short_description(), "Weekdays");
        assert_eq!(Week(96).short_description(), "Weekends");
        assert_eq!(Week(0b0000_0011).short_description(), "Mon, Tue");
    }

    #[test]
    fn trigger_time_description() {
        assert_eq!(Trigger { days: 0, minutes: 0 }.time_description(), "12:00 AM");
        assert_eq!(Trigger { days: 0, minutes: 450 }.time_description(), "07:30 AM");
        assert_eq!(Trigger { days: 0, minutes: 720 }.time_description(), "12:00 PM");
        assert_eq!(Trigger { days: 0, minutes: 1065 }.time_description(), "05:45 PM");
    }

    #[test]
    fn composite_key_separates_same_id_different_trigger() {
        let mut a = Schedule::new();
        a.id = "ab12".into();
        a.name = "Morning".into();
        a.trigger = Trigger { days: 31, minutes: 450 };

        let mut b = a.clone();
        b.trigger.minutes = 480;

        assert_ne!(a.composite_key(), b.composite_key());
    }

    #[test]
    fn short_ids_are_eight_chars() {
        let id = short_id();
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
