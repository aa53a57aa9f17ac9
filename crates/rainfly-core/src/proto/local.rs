// ── Local-control protocol frames ──

use serde::{Deserialize, Serialize};

use super::MsgStatus;

/// Message discriminator for the local-control protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocalMsg {
    GetPropertyCount,
    GetPropertyValues,
    SetPropertyValues,
}

/// A single property slot on the device.
///
/// `value` is an opaque JSON blob owned by the firmware; the session
/// layer decodes it after reassembly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyValue {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: Vec<u8>,
}

/// The single local-control envelope type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalCtrlFrame {
    pub msg: LocalMsg,
    /// Meaningful on responses only.
    #[serde(default)]
    pub status: MsgStatus,
    /// Property count (get-count responses).
    #[serde(default)]
    pub count: u32,
    /// Requested property indices (get-values requests).
    #[serde(default)]
    pub indices: Vec<u32>,
    /// Property payloads (get-values responses, set-values requests).
    #[serde(default)]
    pub props: Vec<PropertyValue>,
}

impl LocalCtrlFrame {
    pub fn get_count() -> Self {
        Self {
            msg: LocalMsg::GetPropertyCount,
            status: MsgStatus::Success,
            count: 0,
            indices: Vec::new(),
            props: Vec::new(),
        }
    }

    /// Request a single property by index. Values are fetched one at a
    /// time -- the protocol has no bulk read.
    pub fn get_value(index: u32) -> Self {
        Self {
            msg: LocalMsg::GetPropertyValues,
            status: MsgStatus::Success,
            count: 0,
            indices: vec![index],
            props: Vec::new(),
        }
    }

    /// Write one property payload.
    pub fn set_value(value: Vec<u8>) -> Self {
        Self {
            msg: LocalMsg::SetPropertyValues,
            status: MsgStatus::Success,
            count: 0,
            indices: Vec::new(),
            props: vec![PropertyValue {
                index: 1,
                name: String::new(),
                value,
            }],
        }
    }
}
