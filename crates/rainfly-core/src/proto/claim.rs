// ── Claiming protocol frames ──

use serde::{Deserialize, Serialize};

use super::MsgStatus;

/// Message discriminator for the claiming handshake.
///
/// Requests and responses share the envelope; direction is implied by
/// who is sending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimMsg {
    ClaimStart,
    ClaimInit,
    ClaimVerify,
    ClaimAbort,
}

/// Chunked payload buffer for multi-part transfers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadBuf {
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub total_len: u32,
    #[serde(default)]
    pub payload: Vec<u8>,
}

/// The single claiming envelope type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimFrame {
    pub msg: ClaimMsg,
    /// Meaningful on responses only; requests leave the default.
    #[serde(default)]
    pub status: MsgStatus,
    #[serde(default)]
    pub buf: PayloadBuf,
}

impl ClaimFrame {
    /// Empty-payload "claim start" command.
    pub fn start() -> Self {
        Self {
            msg: ClaimMsg::ClaimStart,
            status: MsgStatus::Success,
            buf: PayloadBuf::default(),
        }
    }

    /// First "claim init" request, carrying the cloud's initiate
    /// response verbatim.
    pub fn init_with(payload: Vec<u8>) -> Self {
        let total_len = payload.len() as u32;
        Self {
            msg: ClaimMsg::ClaimInit,
            status: MsgStatus::Success,
            buf: PayloadBuf {
                offset: 0,
                total_len,
                payload,
            },
        }
    }

    /// Subsequent "claim init" request asking for the next CSR chunk.
    pub fn init_next() -> Self {
        Self {
            msg: ClaimMsg::ClaimInit,
            status: MsgStatus::Success,
            buf: PayloadBuf::default(),
        }
    }

    /// One certificate chunk, tagged with its offset and the full
    /// certificate length.
    pub fn verify_chunk(offset: u32, total_len: u32, chunk: Vec<u8>) -> Self {
        Self {
            msg: ClaimMsg::ClaimVerify,
            status: MsgStatus::Success,
            buf: PayloadBuf {
                offset,
                total_len,
                payload: chunk,
            },
        }
    }

    /// "Claim abort" command; its own outcome is always ignored.
    pub fn abort() -> Self {
        Self {
            msg: ClaimMsg::ClaimAbort,
            status: MsgStatus::Success,
            buf: PayloadBuf::default(),
        }
    }
}
