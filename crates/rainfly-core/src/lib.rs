//! Domain layer between `rainfly-api` and UI consumers (CLI today).
//!
//! This crate owns the business logic and domain model for the rainfly
//! workspace:
//!
//! - **Domain model** ([`model`]) — the in-memory fleet graph:
//!   [`Node`]s owning [`Device`]s owning [`Param`]s with validated
//!   [`ParamValue`]s, plus [`Schedule`] / [`Scene`] automation units
//!   merged from per-node cloud fragments.
//!
//! - **Service engines** ([`service`]) — [`Scheduler`] and
//!   [`SceneManager`] share the [`DeviceServices`] reconciliation
//!   machinery: availability projection, selection bookkeeping,
//!   batched multi-node requests, and per-node success/failure
//!   folding into [`BatchReport`] values.
//!
//! - **Eligibility policy** ([`policy`]) — per-device
//!   [`ActionStatus`] (allowed / offline / max-count-reached) with
//!   per-edit-session memoization, consumed by UI layers to disable
//!   controls before an invalid request can be built.
//!
//! - **Claiming engine** ([`claim`]) — drives an unclaimed device
//!   through the certificate handshake: chunked CSR fetch, cloud
//!   verification, chunked certificate transfer, abort semantics, and
//!   cooperative cancellation.
//!
//! - **Local control** ([`local`]) — LAN property sessions bypassing
//!   the cloud, with the documented retry-once send policy.
//!
//! - **Persistence bridge** ([`store`]) — JSON snapshots of the
//!   reconciled model between sessions, restoring device↔node links
//!   on load.

pub mod claim;
pub mod convert;
pub mod error;
pub mod local;
pub mod model;
pub mod policy;
pub mod proto;
pub mod service;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use claim::{CLAIM_ENDPOINT, ClaimEngine, ClaimError, ClaimStep};
pub use error::CoreError;
pub use local::{CONTROL_ENDPOINT, LocalError, LocalSession};
pub use policy::ActionStatus;
pub use service::{
    BatchReport, DeviceServices, Outcome, SceneManager, Scheduler, ServiceType, service_keys,
};
pub use store::LocalStore;

// Re-export model types at the crate root for ergonomics.
pub use model::{
    Bounds,
    Device,
    Node,
    NodeGroup,
    NodeMeta,
    NodeService,
    Operation,
    Param,
    ParamValue,
    Scene,
    Schedule,
    Trigger,
    UiKind,
    Week,
    find_node,
    short_id,
};
