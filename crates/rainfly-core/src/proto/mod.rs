// ── Device protocol envelopes ──
//
// Typed renditions of the two device-side wire contracts: the claiming
// handshake and the local-control property protocol. The binary on-air
// encoding belongs to the provisioning component; these frames travel
// through `rainfly_api::DeviceTransport` implementations, which own
// the actual framing. The JSON codec here is what the plain-HTTP LAN
// transport ships.

pub mod claim;
pub mod local;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Response status shared by both device protocols.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MsgStatus {
    #[default]
    Success,
    InvalidParam,
    InvalidState,
    InternalError,
}

impl std::fmt::Display for MsgStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Success => "success",
            Self::InvalidParam => "invalid_param",
            Self::InvalidState => "invalid_state",
            Self::InternalError => "internal_error",
        };
        f.write_str(s)
    }
}

/// Encode a frame for the transport.
pub(crate) fn encode<T: Serialize>(frame: &T) -> Result<Vec<u8>, String> {
    serde_json::to_vec(frame).map_err(|e| e.to_string())
}

/// Decode a frame received from the transport.
pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, String> {
    serde_json::from_slice(bytes).map_err(|e| e.to_string())
}
