// ── Unified domain model ──
//
// Every type in this module is the canonical in-memory representation
// of a fleet entity. They merge data from the cloud node-details API
// and local storage into a single interface the engines and CLI
// depend on.

pub mod device;
pub mod node;
pub mod param;
pub mod scene;
pub mod schedule;

// ── Re-exports ──────────────────────────────────────────────────────
// Flat access: `use rainfly_core::model::*` gives you everything.

pub use device::Device;
pub use node::{Node, NodeGroup, NodeMeta, NodeService, find_node};
pub use param::{Bounds, Param, ParamValue, UiKind};
pub use scene::Scene;
pub use schedule::{Operation, Schedule, Trigger, Week, short_id};
