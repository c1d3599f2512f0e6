//! Core library for the network buffer tuner
//!
//! This crate provides the analyzer pipeline:
//! - Typed parameter reads from the kernel parameter store (`/proc/sys`)
//! - Runtime telemetry capture (socket memory, drop counters, per-connection
//!   buffer occupancy)
//! - The consistency check battery producing severity-classified findings
//! - Tuning profiles with diff, plan and backup-then-apply
//!
//! Rendering of findings and plans is a consumer concern; everything this
//! crate emits is plain serializable data.

pub mod checks;
pub mod error;
pub mod models;
pub mod profile;
pub mod snapshot;
pub mod store;
pub mod telemetry;

pub use checks::{evaluate, Thresholds};
pub use error::TunerError;
pub use models::*;
pub use snapshot::{capture, CaptureConfig, Snapshot};
pub use store::{ParameterStore, ProcfsStore};
pub use telemetry::{ProcfsTelemetry, TelemetrySource};
