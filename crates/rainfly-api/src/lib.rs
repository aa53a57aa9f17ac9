//! Async client for the RainMaker-style smart-home cloud and its LAN
//! device endpoints.
//!
//! Two network surfaces live here:
//!
//! - **[`ApiClient`]** — the cloud REST API: node fleet reads, the
//!   batched multi-node parameter write, the claiming service
//!   (initiate/verify), and node-sharing CRUD. Bearer-token auth via
//!   [`AccessToken`], `{status, description}` envelope handling, and
//!   per-node batch responses as [`NodeResponse`] values.
//! - **[`DeviceTransport`]** — the byte-level request/response seam to
//!   a single device, with [`HttpDeviceTransport`] as the plain-HTTP
//!   LAN rendition. Framing and session security belong to the
//!   provisioning component; engines in `rainfly-core` drive typed
//!   protocols across this seam.

pub mod auth;
pub mod client;
pub mod device;
pub mod error;
pub mod models;
pub mod transport;

pub use auth::AccessToken;
pub use client::ApiClient;
pub use device::{DeviceError, DeviceTransport, HttpDeviceTransport};
pub use error::Error;
pub use models::{
    ApiStatus, Connectivity, DeviceConfig, NodeConfig, NodeDetail, NodeGroupDetail, NodeInfo,
    NodePayload, NodeResponse, NodeStatus, ParamBounds, ParamConfig, ServiceConfig,
    ShareNodesBody, SharingRequest,
};
pub use transport::{TlsMode, TransportConfig};
