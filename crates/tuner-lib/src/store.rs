//! Parameter store access
//!
//! Reads the fixed catalog of kernel tunables from the system parameter
//! store (`/proc/sys` on Linux) into typed readings. A missing or
//! unreadable parameter never aborts the whole read; it degrades to
//! [`Reading::Unavailable`] so an unprivileged run still yields a partial
//! report.

use crate::error::TunerError;
use crate::models::{names, ParamKind, ParamValue, Reading, Triple};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs;

/// One entry in the required-parameter catalog
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
}

/// The fixed, versioned list of parameters every snapshot must attempt to
/// read. Checks and profiles reference these by name.
pub const PARAM_CATALOG: &[ParamSpec] = &[
    ParamSpec {
        name: names::TCP_RMEM,
        kind: ParamKind::Triple,
    },
    ParamSpec {
        name: names::TCP_WMEM,
        kind: ParamKind::Triple,
    },
    ParamSpec {
        name: names::TCP_MEM,
        kind: ParamKind::Triple,
    },
    ParamSpec {
        name: names::RMEM_MAX,
        kind: ParamKind::Scalar,
    },
    ParamSpec {
        name: names::WMEM_MAX,
        kind: ParamKind::Scalar,
    },
    ParamSpec {
        name: names::RMEM_DEFAULT,
        kind: ParamKind::Scalar,
    },
    ParamSpec {
        name: names::WMEM_DEFAULT,
        kind: ParamKind::Scalar,
    },
    ParamSpec {
        name: names::TCP_WINDOW_SCALING,
        kind: ParamKind::Scalar,
    },
    ParamSpec {
        name: names::TCP_MODERATE_RCVBUF,
        kind: ParamKind::Scalar,
    },
    ParamSpec {
        name: names::NETDEV_MAX_BACKLOG,
        kind: ParamKind::Scalar,
    },
];

/// Look up the expected kind for a catalog parameter
pub fn catalog_kind(name: &str) -> Option<ParamKind> {
    PARAM_CATALOG
        .iter()
        .find(|spec| spec.name == name)
        .map(|spec| spec.kind)
}

/// Narrow contract over the system parameter store.
///
/// Values cross this boundary as raw text; typing happens in this module's
/// parsers so that "how do I get this value" stays decoupled from "what
/// does this value mean".
#[async_trait]
pub trait ParameterStore: Send + Sync {
    /// Read the raw textual value of a named parameter
    async fn read(&self, name: &str) -> Result<String>;

    /// Write a raw textual value to a named parameter. One attempt, no
    /// retries; failure is surfaced to the caller.
    async fn write(&self, name: &str, value: &str) -> Result<()>;
}

/// Parameter store backed by a `/proc/sys`-style file hierarchy
pub struct ProcfsStore {
    root: PathBuf,
}

impl ProcfsStore {
    /// Store over the live kernel interface
    pub fn new() -> Self {
        Self {
            root: PathBuf::from("/proc/sys"),
        }
    }

    /// Store over a custom root (for tests and mounted snapshots)
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(name.replace('.', "/"))
    }
}

impl Default for ProcfsStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ParameterStore for ProcfsStore {
    async fn read(&self, name: &str) -> Result<String> {
        let path = self.path_for(name);
        fs::read_to_string(&path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))
    }

    async fn write(&self, name: &str, value: &str) -> Result<()> {
        let path = self.path_for(name);
        fs::write(&path, value)
            .await
            .with_context(|| format!("failed to write {}", path.display()))
    }
}

/// Parse a scalar parameter value
pub fn parse_scalar(raw: &str) -> Option<i64> {
    raw.trim().parse().ok()
}

/// Parse a min/default/max triple. The kernel separates the components
/// with tabs or spaces depending on the parameter.
pub fn parse_triple(raw: &str) -> Option<Triple> {
    let fields: Vec<i64> = raw
        .split_whitespace()
        .map(|f| f.parse().ok())
        .collect::<Option<Vec<_>>>()?;
    if fields.len() != 3 {
        return None;
    }
    Some(Triple::new(fields[0], fields[1], fields[2]))
}

/// Parse a raw reading according to its declared kind
pub fn parse_value(kind: ParamKind, raw: &str) -> Option<ParamValue> {
    match kind {
        ParamKind::Scalar => parse_scalar(raw).map(ParamValue::Scalar),
        ParamKind::Triple => parse_triple(raw).map(ParamValue::Triple),
    }
}

/// Read the whole parameter catalog into typed readings.
///
/// Every read is individually bounded by `timeout`; errors, timeouts and
/// parse failures degrade to [`Reading::Unavailable`] / [`Reading::Malformed`]
/// rather than aborting.
pub async fn read_params(
    store: &dyn ParameterStore,
    timeout: Duration,
) -> BTreeMap<String, Reading> {
    let mut params = BTreeMap::new();
    for spec in PARAM_CATALOG {
        let reading = match tokio::time::timeout(timeout, store.read(spec.name)).await {
            Err(_) => {
                tracing::warn!(parameter = spec.name, "parameter read timed out");
                Reading::unavailable("read timed out")
            }
            Ok(Err(err)) => {
                tracing::debug!(parameter = spec.name, error = %err, "parameter unavailable");
                Reading::unavailable(err.to_string())
            }
            Ok(Ok(raw)) => match parse_value(spec.kind, &raw) {
                Some(value) => Reading::Value(value),
                None => {
                    tracing::warn!(parameter = spec.name, raw = raw.trim(), "malformed value");
                    Reading::Malformed {
                        raw: raw.trim().to_string(),
                    }
                }
            },
        };
        params.insert(spec.name.to_string(), reading);
    }
    params
}

/// Pre-change export of the current parameter values, kept so a failed or
/// regretted apply can always be rolled back
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backup {
    pub taken_at: DateTime<Utc>,
    /// Raw store values keyed by parameter name; parameters that were
    /// unavailable at export time are absent
    pub values: BTreeMap<String, String>,
}

impl Backup {
    /// Serialize to the opaque blob handed to callers
    pub fn to_blob(&self) -> String {
        // the structure is plain data; serialization cannot fail
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Deserialize a blob previously produced by [`Backup::to_blob`]
    pub fn from_blob(blob: &str) -> Result<Self, TunerError> {
        serde_json::from_str(blob).map_err(|err| TunerError::MalformedBackup(err.to_string()))
    }
}

/// Export the current raw values of every catalog parameter that can be
/// read. Unreadable parameters are skipped; the backup covers what was
/// observable at export time.
pub async fn export_backup(store: &dyn ParameterStore) -> Backup {
    let mut values = BTreeMap::new();
    for spec in PARAM_CATALOG {
        match store.read(spec.name).await {
            Ok(raw) => {
                values.insert(spec.name.to_string(), raw.trim().to_string());
            }
            Err(err) => {
                tracing::debug!(parameter = spec.name, error = %err, "excluded from backup");
            }
        }
    }
    Backup {
        taken_at: Utc::now(),
        values,
    }
}

/// Write every value in a backup back to the store. Stops at the first
/// failed write and names the parameter.
pub async fn restore_backup(store: &dyn ParameterStore, backup: &Backup) -> Result<(), TunerError> {
    for (name, raw) in &backup.values {
        store
            .write(name, raw)
            .await
            .map_err(|err| TunerError::RestoreFailed {
                name: name.clone(),
                reason: err.to_string(),
            })?;
        tracing::info!(parameter = name, value = raw.as_str(), "restored");
    }
    Ok(())
}
