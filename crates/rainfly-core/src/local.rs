// ── Local-control session ──
//
// Direct LAN communication with a device, bypassing the cloud. The
// property protocol has no bulk read: values are fetched one index at
// a time and accumulated client-side into a name → JSON map.

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use rainfly_api::{DeviceError, DeviceTransport};

use crate::proto::local::{LocalCtrlFrame, LocalMsg};
use crate::proto::{MsgStatus, decode, encode};

/// Device endpoint the property protocol is served on.
pub const CONTROL_ENDPOINT: &str = "control";

/// Errors from a local-control session.
#[derive(Debug, Error)]
pub enum LocalError {
    #[error("error while sending request to device: {0}")]
    Transport(String),

    #[error("device answered with status '{0}'")]
    Failure(MsgStatus),

    #[error("error decoding device response: {0}")]
    Decode(String),

    #[error("error encoding device request: {0}")]
    Encode(String),

    #[error("found no property in device response")]
    ZeroProperties,
}

/// A property session against one LAN-reachable device.
pub struct LocalSession<T: DeviceTransport> {
    transport: T,
}

impl<T: DeviceTransport> LocalSession<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Fetch all property values as a name → JSON map.
    ///
    /// Queries the count first, then walks indices `0..count`
    /// sequentially.
    pub async fn property_info(&mut self) -> Result<serde_json::Map<String, Value>, LocalError> {
        let resp = self.send(LocalCtrlFrame::get_count()).await?;
        let count = resp.count;
        debug!(count, "device property count");
        if count < 1 {
            return Err(LocalError::ZeroProperties);
        }

        let mut info = serde_json::Map::new();
        for index in 0..count {
            let resp = self.send(LocalCtrlFrame::get_value(index)).await?;
            let Some(prop) = resp.props.first() else {
                return Err(LocalError::ZeroProperties);
            };
            let value: Value =
                serde_json::from_slice(&prop.value).map_err(|e| LocalError::Decode(e.to_string()))?;
            info.insert(prop.name.clone(), value);
        }
        Ok(info)
    }

    /// Write a property payload (a name → value JSON object).
    pub async fn set_property(&mut self, payload: &Value) -> Result<(), LocalError> {
        let bytes = serde_json::to_vec(payload).map_err(|e| LocalError::Encode(e.to_string()))?;
        self.send(LocalCtrlFrame::set_value(bytes)).await?;
        Ok(())
    }

    /// One exchange with the documented retry-once policy: a transport
    /// failure is retried a single time (the session is re-established
    /// underneath), then surfaced.
    async fn send(&mut self, frame: LocalCtrlFrame) -> Result<LocalCtrlFrame, LocalError> {
        let bytes = encode(&frame).map_err(LocalError::Encode)?;

        let resp = match self.transport.exchange(CONTROL_ENDPOINT, bytes.clone()).await {
            Ok(resp) => resp,
            Err(first) => {
                debug!(error = %first, "local exchange failed; retrying once");
                self.transport
                    .exchange(CONTROL_ENDPOINT, bytes)
                    .await
                    .map_err(|e: DeviceError| LocalError::Transport(e.to_string()))?
            }
        };

        let frame: LocalCtrlFrame = decode(&resp).map_err(LocalError::Decode)?;
        if frame.status != MsgStatus::Success {
            return Err(LocalError::Failure(frame.status));
        }
        Ok(frame)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::proto::local::PropertyValue;
    use serde_json::json;

    /// Scripted fake device: yields canned frames, optionally failing
    /// the first `flaky` exchanges.
    struct FakeDevice {
        responses: Vec<LocalCtrlFrame>,
        flaky: usize,
        exchanges: usize,
    }

    impl DeviceTransport for FakeDevice {
        async fn exchange(
            &mut self,
            _endpoint: &str,
            _payload: Vec<u8>,
        ) -> Result<Vec<u8>, DeviceError> {
            self.exchanges += 1;
            if self.flaky > 0 {
                self.flaky -= 1;
                return Err(DeviceError::Unreachable("connection reset".into()));
            }
            let frame = self.responses.remove(0);
            Ok(encode(&frame).unwrap())
        }
    }

    fn count_frame(count: u32) -> LocalCtrlFrame {
        LocalCtrlFrame {
            msg: LocalMsg::GetPropertyCount,
            status: MsgStatus::Success,
            count,
            indices: Vec::new(),
            props: Vec::new(),
        }
    }

    fn value_frame(index: u32, name: &str, value: &Value) -> LocalCtrlFrame {
        LocalCtrlFrame {
            msg: LocalMsg::GetPropertyValues,
            status: MsgStatus::Success,
            count: 0,
            indices: Vec::new(),
            props: vec![PropertyValue {
                index,
                name: name.into(),
                value: serde_json::to_vec(value).unwrap(),
            }],
        }
    }

    #[tokio::test]
    async fn property_info_walks_indices_one_by_one() {
        let device = FakeDevice {
            responses: vec![
                count_frame(2),
                value_frame(0, "config", &json!({"name": "Lamp"})),
                value_frame(1, "params", &json!({"Light": {"Power": true}})),
            ],
            flaky: 0,
            exchanges: 0,
        };
        let mut session = LocalSession::new(device);

        let info = session.property_info().await.unwrap();

        assert_eq!(info.len(), 2);
        assert_eq!(info["config"]["name"], "Lamp");
        assert_eq!(info["params"]["Light"]["Power"], true);
        // count + one request per property, no bulk fetch
        assert_eq!(session.transport.exchanges, 3);
    }

    #[tokio::test]
    async fn zero_properties_is_a_distinct_error() {
        let device = FakeDevice {
            responses: vec![count_frame(0)],
            flaky: 0,
            exchanges: 0,
        };
        let mut session = LocalSession::new(device);

        assert!(matches!(
            session.property_info().await,
            Err(LocalError::ZeroProperties)
        ));
    }

    #[tokio::test]
    async fn transport_failure_retries_exactly_once() {
        let device = FakeDevice {
            responses: vec![count_frame(1), value_frame(0, "config", &json!({}))],
            flaky: 1,
            exchanges: 0,
        };
        let mut session = LocalSession::new(device);

        session.property_info().await.unwrap();
        // 1 failed + 1 retry for the count, then 1 for the value
        assert_eq!(session.transport.exchanges, 3);
    }

    #[tokio::test]
    async fn two_consecutive_failures_surface() {
        let device = FakeDevice {
            responses: vec![],
            flaky: 2,
            exchanges: 0,
        };
        let mut session = LocalSession::new(device);

        assert!(matches!(
            session.property_info().await,
            Err(LocalError::Transport(_))
        ));
        assert_eq!(session.transport.exchanges, 2);
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let mut frame = count_frame(1);
        frame.status = MsgStatus::InvalidState;
        let device = FakeDevice {
            responses: vec![frame],
            flaky: 0,
            exchanges: 0,
        };
        let mut session = LocalSession::new(device);

        assert!(matches!(
            session.property_info().await,
            Err(LocalError::Failure(MsgStatus::InvalidState))
        ));
    }
}
