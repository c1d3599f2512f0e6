//! Error taxonomy for the tuner core
//!
//! Missing or unreadable data never surfaces here; the readers degrade it
//! to `Unavailable` markers and the evaluator always returns a finding
//! list. Only caller mistakes (unknown profile, bad backup blob) and
//! apply-path write failures become hard errors.

use crate::store::Backup;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TunerError {
    /// The requested profile id is not in the static catalog
    #[error("unknown profile {0:?}; run `nbt profiles` to list available profiles")]
    ProfileNotFound(String),

    /// A parameter write failed during apply. The pre-change backup is
    /// carried along so the caller can always roll back.
    #[error("failed to write {name}: {reason}")]
    WriteFailed {
        name: String,
        reason: String,
        backup: Box<Backup>,
    },

    /// A parameter write failed during restore
    #[error("failed to restore {name}: {reason}")]
    RestoreFailed { name: String, reason: String },

    /// A backup blob did not deserialize
    #[error("backup blob is not valid: {0}")]
    MalformedBackup(String),
}
