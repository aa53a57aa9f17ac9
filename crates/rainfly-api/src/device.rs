// LAN device transport
//
// Devices expose named endpoints over a reliable request/response
// channel. The on-air encoding and session security are owned by the
// provisioning component; this module only defines the byte-level
// exchange seam plus the plain-HTTP rendition used for devices
// reachable on the local network.

use tracing::debug;
use url::Url;

/// Errors from a device-side transport.
///
/// `EndpointMissing` is a distinct variant (rather than a description
/// match) so callers can special-case the "claiming endpoint not
/// present on this firmware" condition regardless of the underlying
/// channel.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// The named endpoint does not exist on the device.
    #[error("device endpoint not found")]
    EndpointMissing,

    /// The device could not be reached at all.
    #[error("device unreachable: {0}")]
    Unreachable(String),

    /// The exchange failed after the device was reached.
    #[error("device exchange failed: {0}")]
    Send(String),
}

/// A request/response channel to a single device.
///
/// Implementations own framing, encryption, and session state. Each
/// exchange is strictly sequential -- device-side session state is not
/// reentrant, so callers never pipeline requests.
pub trait DeviceTransport {
    fn exchange(
        &mut self,
        endpoint: &str,
        payload: Vec<u8>,
    ) -> impl std::future::Future<Output = Result<Vec<u8>, DeviceError>> + Send;
}

/// Plain-HTTP device transport for LAN-reachable devices.
///
/// POSTs the payload to `http://{host}/{endpoint}` with a short
/// timeout. Unencrypted -- secured sessions are established by the
/// provisioning component before this transport is handed out.
pub struct HttpDeviceTransport {
    http: reqwest::Client,
    base: Url,
}

impl HttpDeviceTransport {
    /// Connect to a device at `host` (e.g. `192.168.4.1:80`).
    pub fn new(host: &str) -> Result<Self, crate::Error> {
        let base = Url::parse(&format!("http://{host}/"))?;
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(2))
            .build()?;
        Ok(Self { http, base })
    }

    pub fn host(&self) -> &str {
        self.base.host_str().unwrap_or_default()
    }
}

impl DeviceTransport for HttpDeviceTransport {
    async fn exchange(&mut self, endpoint: &str, payload: Vec<u8>) -> Result<Vec<u8>, DeviceError> {
        let url = self
            .base
            .join(endpoint)
            .map_err(|e| DeviceError::Send(e.to_string()))?;
        debug!(%url, len = payload.len(), "POST device endpoint");

        let resp = self
            .http
            .post(url)
            .body(payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    DeviceError::Unreachable(e.to_string())
                } else {
                    DeviceError::Send(e.to_string())
                }
            })?;

        match resp.status() {
            reqwest::StatusCode::NOT_FOUND => Err(DeviceError::EndpointMissing),
            status if !status.is_success() => {
                Err(DeviceError::Send(format!("device returned HTTP {status}")))
            }
            _ => {
                let bytes = resp.bytes().await.map_err(|e| DeviceError::Send(e.to_string()))?;
                Ok(bytes.to_vec())
            }
        }
    }
}
