//! Core types and ambient infrastructure for stratus
//!
//! TigerStyle: Explicit errors, explicit time, explicit limits.

pub mod clock;
pub mod config;
pub mod constants;
pub mod error;
pub mod http;
pub mod telemetry;

pub use clock::{Clock, Deadline, ManualClock, SystemClock};
pub use config::{ProvisionConfig, ReadinessConfig, StratusConfig};
pub use error::{Error, Result};
pub use telemetry::{init_telemetry, TelemetryConfig};
