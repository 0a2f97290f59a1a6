//! Compute control-plane abstraction for stratus
//!
//! TigerStyle: One capability trait, concrete backends behind it.
//!
//! The orchestrator in `stratus-provision` is written once against
//! [`ControlPlane`] and [`ReadinessProbe`]; any concrete backend (an
//! OpenStack-style REST binding, a vSphere-style SDK binding, the in-memory
//! [`MockControlPlane`]) satisfies the traits independently.

mod address;
mod auth;
mod control_plane;
mod details;
mod machine;
pub mod mock;
mod template;

pub use address::AddressRecord;
pub use auth::Credential;
pub use control_plane::{ControlPlane, ReadinessProbe};
pub use details::MachineDetails;
pub use machine::{MachineRecord, MachineRef, MachineStatus};
pub use mock::{MockCallCounts, MockControlPlane, MockReadinessProbe};
pub use template::{MachineTemplate, MachineTemplateBuilder};
