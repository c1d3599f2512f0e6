//! CLI command handlers

pub mod audit;
pub mod profiles;
pub mod tune;

use std::path::{Path, PathBuf};
use tuner_lib::{ProcfsStore, ProcfsTelemetry};

/// Parameter store rooted under the given proc filesystem
pub fn store_for(proc_root: &Path) -> ProcfsStore {
    ProcfsStore::with_root(proc_root.join("sys"))
}

/// Telemetry source rooted under the given proc filesystem
pub fn telemetry_for(proc_root: &Path) -> ProcfsTelemetry {
    ProcfsTelemetry::with_proc_root(PathBuf::from(proc_root))
}
