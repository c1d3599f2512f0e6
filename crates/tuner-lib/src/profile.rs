//! Tuning profiles
//!
//! A static catalog of recommended parameter bundles keyed by workload and
//! deployment topology, plus the diff / plan / apply pipeline. Planning is
//! pure; mutation happens only in [`apply`], which takes a backup first so
//! rollback is always possible.

use crate::error::TunerError;
use crate::models::{names, ParamValue, Reading, Triple};
use crate::snapshot::Snapshot;
use crate::store::{Backup, ParameterStore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Traffic pattern the profile is tuned for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Workload {
    /// Many small messages, latency-sensitive
    MessageDelivery,
    /// Few large transfers, throughput-sensitive
    BulkTransfer,
}

impl std::fmt::Display for Workload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Workload::MessageDelivery => write!(f, "message-delivery"),
            Workload::BulkTransfer => write!(f, "bulk-transfer"),
        }
    }
}

/// Network path the profile is tuned for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topology {
    /// Low-RTT, stable links (backend datacenter)
    Datacenter,
    /// High-RTT, lossy links (internet-facing WAN)
    Wan,
}

impl std::fmt::Display for Topology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Topology::Datacenter => write!(f, "datacenter"),
            Topology::Wan => write!(f, "wan"),
        }
    }
}

/// A named bundle of recommended parameter values.
///
/// Every profile fully specifies the parameter catalog, so applying one
/// always yields an internally consistent configuration.
#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub id: &'static str,
    pub workload: Workload,
    pub topology: Topology,
    pub description: &'static str,
    pub recommended: BTreeMap<String, ParamValue>,
}

fn scalar(v: i64) -> ParamValue {
    ParamValue::Scalar(v)
}

fn triple(min: i64, default: i64, max: i64) -> ParamValue {
    ParamValue::Triple(Triple::new(min, default, max))
}

fn build_profile(
    id: &'static str,
    workload: Workload,
    topology: Topology,
    description: &'static str,
    tcp_rmem: ParamValue,
    tcp_wmem: ParamValue,
    tcp_mem: ParamValue,
    buffer_max: i64,
    buffer_default: i64,
    backlog: i64,
) -> Profile {
    Profile {
        id,
        workload,
        topology,
        description,
        recommended: BTreeMap::from([
            (names::TCP_RMEM.to_string(), tcp_rmem),
            (names::TCP_WMEM.to_string(), tcp_wmem),
            (names::TCP_MEM.to_string(), tcp_mem),
            (names::RMEM_MAX.to_string(), scalar(buffer_max)),
            (names::WMEM_MAX.to_string(), scalar(buffer_max)),
            (names::RMEM_DEFAULT.to_string(), scalar(buffer_default)),
            (names::WMEM_DEFAULT.to_string(), scalar(buffer_default)),
            (names::TCP_WINDOW_SCALING.to_string(), scalar(1)),
            (names::TCP_MODERATE_RCVBUF.to_string(), scalar(1)),
            (names::NETDEV_MAX_BACKLOG.to_string(), scalar(backlog)),
        ]),
    }
}

static CATALOG: OnceLock<Vec<Profile>> = OnceLock::new();

/// The static profile catalog: workload x topology, defined once at
/// startup and never mutated.
pub fn catalog() -> &'static [Profile] {
    CATALOG.get_or_init(|| {
        vec![
            build_profile(
                "message-delivery-datacenter",
                Workload::MessageDelivery,
                Topology::Datacenter,
                "Small latency-sensitive messages over low-RTT stable links",
                triple(4096, 87380, 16777216),
                triple(4096, 65536, 16777216),
                triple(786432, 1048576, 1572864),
                16777216,
                131072,
                5000,
            ),
            build_profile(
                "message-delivery-wan",
                Workload::MessageDelivery,
                Topology::Wan,
                "Small latency-sensitive messages over high-RTT lossy links",
                triple(4096, 131072, 33554432),
                triple(4096, 87380, 33554432),
                triple(1572864, 2097152, 3145728),
                33554432,
                262144,
                10000,
            ),
            build_profile(
                "bulk-transfer-datacenter",
                Workload::BulkTransfer,
                Topology::Datacenter,
                "Large throughput-sensitive transfers over low-RTT stable links",
                triple(4096, 262144, 33554432),
                triple(4096, 262144, 33554432),
                triple(1572864, 2097152, 3145728),
                33554432,
                262144,
                10000,
            ),
            build_profile(
                "bulk-transfer-wan",
                Workload::BulkTransfer,
                Topology::Wan,
                "Large throughput-sensitive transfers over high-RTT lossy links",
                triple(4096, 524288, 67108864),
                triple(4096, 524288, 67108864),
                triple(3145728, 4194304, 6291456),
                67108864,
                524288,
                30000,
            ),
        ]
    })
}

/// Look up a profile by id. An unknown id is a caller mistake and surfaces
/// as a hard error rather than degrading.
pub fn find(id: &str) -> Result<&'static Profile, TunerError> {
    catalog()
        .iter()
        .find(|p| p.id == id)
        .ok_or_else(|| TunerError::ProfileNotFound(id.to_string()))
}

/// One row of the current-vs-recommended comparison
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffEntry {
    pub name: String,
    pub current: Reading,
    pub recommended: ParamValue,
    /// Exact equality, triples compared component-wise
    pub matches: bool,
}

/// Diff a snapshot against a profile. Every parameter in the profile's
/// recommendation map appears exactly once, in deterministic order.
pub fn diff(snapshot: &Snapshot, profile: &Profile) -> Vec<DiffEntry> {
    profile
        .recommended
        .iter()
        .map(|(name, recommended)| {
            let current = snapshot
                .reading(name)
                .cloned()
                .unwrap_or_else(|| Reading::unavailable("not in snapshot"));
            let matches = matches!(&current, Reading::Value(v) if v == recommended);
            DiffEntry {
                name: name.clone(),
                current,
                recommended: *recommended,
                matches,
            }
        })
        .collect()
}

/// A single planned parameter assignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetAction {
    pub name: String,
    pub value: ParamValue,
}

/// Ordered remediation plan derived from a diff. Computing a plan has no
/// side effects; only [`apply`] mutates anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemediationPlan {
    pub profile_id: String,
    pub actions: Vec<SetAction>,
}

impl RemediationPlan {
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Build the remediation plan for the parameters that do not already match
pub fn plan(profile: &Profile, diff: &[DiffEntry]) -> RemediationPlan {
    let actions = diff
        .iter()
        .filter(|entry| !entry.matches)
        .map(|entry| SetAction {
            name: entry.name.clone(),
            value: entry.recommended,
        })
        .collect();
    RemediationPlan {
        profile_id: profile.id.to_string(),
        actions,
    }
}

/// Result of a successful apply
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyOutcome {
    /// Pre-change export, the caller's rollback handle
    pub backup: Backup,
    /// Parameters written, in order
    pub applied: Vec<String>,
}

/// Apply a plan to the parameter store.
///
/// The caller must export (and persist) a pre-change [`Backup`] first and
/// hand it in; requiring it as an argument keeps the plan/apply safety
/// boundary structural. Each write is a single attempt; the first failure
/// stops the apply and surfaces the failing parameter together with the
/// backup, so rollback remains possible even after a partial apply.
pub async fn apply(
    plan: &RemediationPlan,
    store: &dyn ParameterStore,
    backup: Backup,
) -> Result<ApplyOutcome, TunerError> {
    let mut applied = Vec::with_capacity(plan.actions.len());
    for action in &plan.actions {
        match store
            .write(&action.name, &action.value.to_store_string())
            .await
        {
            Ok(()) => {
                tracing::info!(
                    parameter = action.name.as_str(),
                    value = %action.value,
                    "applied"
                );
                applied.push(action.name.clone());
            }
            Err(err) => {
                return Err(TunerError::WriteFailed {
                    name: action.name.clone(),
                    reason: err.to_string(),
                    backup: Box::new(backup),
                });
            }
        }
    }
    Ok(ApplyOutcome { backup, applied })
}
