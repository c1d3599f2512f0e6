//! Consistency evaluation
//!
//! The ordered battery of rule checks run against one snapshot. Each check
//! is a pure function of the snapshot and thresholds, independent of every
//! other check's outcome, and degrades to an `Info` "skipped" finding when
//! its inputs are unavailable. [`evaluate`] itself never fails; worst case
//! it returns a list of skips.

use crate::models::{
    names, Finding, MetricId, ParamValue, Reading, Remediation, Severity, Triple,
};
use crate::snapshot::Snapshot;
use crate::store;
use serde::{Deserialize, Serialize};

/// Stable check identifiers, part of the output contract
pub mod check_id {
    pub const MALFORMED_VALUE: &str = "malformed-value";
    pub const TRIPLE_ORDER: &str = "triple-order";
    pub const CEILING_CONSISTENCY: &str = "ceiling-consistency";
    pub const WINDOW_SCALING_GATE: &str = "window-scaling-gate";
    pub const AUTOTUNE_ENABLED: &str = "autotune-enabled";
    pub const MIN_FLOOR: &str = "min-floor";
    pub const DEFAULT_FLOOR: &str = "default-floor";
    pub const CONNECTION_CAPACITY: &str = "connection-capacity";
    pub const MEMORY_PRESSURE: &str = "memory-pressure";
    pub const DEFAULT_MISMATCH: &str = "default-mismatch";
}

/// Canonical check thresholds.
///
/// The shell tooling this replaces carried divergent cutoffs between its
/// scripts; they are resolved into this single configurable set rather
/// than hardcoded per check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thresholds {
    /// Smallest sane per-socket buffer minimum, in bytes
    pub min_floor: i64,
    /// Assumed typical message size; buffer defaults below this are
    /// flagged as critical
    pub assumed_message_size: i64,
    /// Fewest connections the host should sustain at full per-connection
    /// buffer utilization before entering memory pressure
    pub capacity_floor: i64,
    /// Largest usable TCP window without the window-scaling extension
    pub unscaled_window_limit: i64,
    /// Page size used to convert `tcp_mem` page counts to bytes
    pub page_size: i64,
    /// Core vs TCP default divergence ratio above which an advisory is
    /// emitted
    pub default_divergence_ratio: i64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_floor: 4096,
            assumed_message_size: 16384,
            capacity_floor: 100,
            unscaled_window_limit: 65536,
            page_size: 4096,
            default_divergence_ratio: 2,
        }
    }
}

/// Buffer triples the per-socket floor checks apply to
const BUFFER_TRIPLES: [&str; 2] = [names::TCP_RMEM, names::TCP_WMEM];

/// Run the full ordered check battery over a snapshot.
///
/// Always returns the full-length finding list; checks with missing
/// inputs contribute skip findings instead of being dropped. The output is
/// deterministic for a given snapshot.
pub fn evaluate(snapshot: &Snapshot, thresholds: &Thresholds) -> Vec<Finding> {
    let mut findings = Vec::new();
    report_malformed(snapshot, &mut findings);
    check_triple_order(snapshot, &mut findings);
    check_ceiling_consistency(snapshot, &mut findings);
    check_window_scaling_gate(snapshot, thresholds, &mut findings);
    check_autotune_enabled(snapshot, &mut findings);
    check_min_floor(snapshot, thresholds, &mut findings);
    check_default_floor(snapshot, thresholds, &mut findings);
    check_connection_capacity(snapshot, thresholds, &mut findings);
    check_memory_pressure(snapshot, &mut findings);
    check_default_mismatch(snapshot, thresholds, &mut findings);
    findings
}

/// One distinct finding per malformed reading, so the operator knows the
/// store itself needs investigating rather than just "missing"
fn report_malformed(snapshot: &Snapshot, findings: &mut Vec<Finding>) {
    for (name, reading) in &snapshot.params {
        if let Reading::Malformed { raw } = reading {
            let kind = store::catalog_kind(name)
                .map(|k| k.to_string())
                .unwrap_or_else(|| "value".to_string());
            findings.push(
                Finding::new(
                    Severity::Warning,
                    check_id::MALFORMED_VALUE,
                    format!(
                        "{name} read as {raw:?}, which does not parse as a {kind}; \
                         the parameter store itself should be investigated"
                    ),
                )
                .with_parameter(name.clone()),
            );
        }
    }
}

/// min <= default <= max for every auto-tuning triple. The store accepts
/// inverted ranges and the kernel silently misbehaves with them.
fn check_triple_order(snapshot: &Snapshot, findings: &mut Vec<Finding>) {
    for name in [names::TCP_RMEM, names::TCP_WMEM, names::TCP_MEM] {
        let Some(t) = snapshot.triple(name) else {
            findings.push(Finding::skipped(check_id::TRIPLE_ORDER, name));
            continue;
        };
        if t.is_ordered() {
            findings.push(
                Finding::new(
                    Severity::Pass,
                    check_id::TRIPLE_ORDER,
                    format!("{name} is properly ordered (min <= default <= max)"),
                )
                .with_parameter(name)
                .with_current(ParamValue::Triple(t)),
            );
        } else {
            let mut sorted = [t.min, t.default, t.max];
            sorted.sort_unstable();
            findings.push(
                Finding::new(
                    Severity::Critical,
                    check_id::TRIPLE_ORDER,
                    format!(
                        "{name} = {t} violates min <= default <= max; \
                         the kernel accepts this and misbehaves silently"
                    ),
                )
                .with_parameter(name)
                .with_current(ParamValue::Triple(t))
                .with_remediation(vec![Remediation::new(
                    name,
                    ParamValue::Triple(Triple::new(sorted[0], sorted[1], sorted[2])),
                )]),
            );
        }
    }
}

/// Auto-tune maxima must fit under the corresponding hard ceilings; when
/// they do not, auto-tuning silently under-delivers with no error raised
/// anywhere.
fn check_ceiling_consistency(snapshot: &Snapshot, findings: &mut Vec<Finding>) {
    for (triple_name, ceiling_name, direction) in [
        (names::TCP_RMEM, names::RMEM_MAX, "receive"),
        (names::TCP_WMEM, names::WMEM_MAX, "send"),
    ] {
        let (Some(t), Some(ceiling)) =
            (snapshot.triple(triple_name), snapshot.scalar(ceiling_name))
        else {
            findings.push(Finding::skipped(check_id::CEILING_CONSISTENCY, triple_name));
            continue;
        };
        if t.max <= ceiling {
            findings.push(
                Finding::new(
                    Severity::Pass,
                    check_id::CEILING_CONSISTENCY,
                    format!(
                        "{triple_name} max {} fits under {ceiling_name} ({ceiling})",
                        t.max
                    ),
                )
                .with_parameter(triple_name)
                .with_current(ParamValue::Triple(t)),
            );
        } else {
            findings.push(
                Finding::new(
                    Severity::Critical,
                    check_id::CEILING_CONSISTENCY,
                    format!(
                        "{triple_name} max {} exceeds {ceiling_name} ({ceiling}); \
                         {direction} auto-tuning is silently capped at the lower value. \
                         Either raise the ceiling or lower the auto-tune max.",
                        t.max
                    ),
                )
                .with_parameter(triple_name)
                .with_current(ParamValue::Triple(t))
                .with_remediation(vec![
                    Remediation::new(ceiling_name, ParamValue::Scalar(t.max)),
                    Remediation::new(
                        triple_name,
                        ParamValue::Triple(Triple::new(t.min, t.default.min(ceiling), ceiling)),
                    ),
                ]),
            );
        }
    }
}

/// Buffers beyond the 64 KiB protocol window need the window-scaling
/// extension enabled, otherwise the configured capacity is wasted.
fn check_window_scaling_gate(
    snapshot: &Snapshot,
    thresholds: &Thresholds,
    findings: &mut Vec<Finding>,
) {
    for name in BUFFER_TRIPLES {
        let Some(t) = snapshot.triple(name) else {
            findings.push(Finding::skipped(check_id::WINDOW_SCALING_GATE, name));
            continue;
        };
        if t.max <= thresholds.unscaled_window_limit {
            findings.push(
                Finding::new(
                    Severity::Pass,
                    check_id::WINDOW_SCALING_GATE,
                    format!(
                        "{name} max {} does not exceed the unscaled window limit",
                        t.max
                    ),
                )
                .with_parameter(name)
                .with_current(ParamValue::Triple(t)),
            );
            continue;
        }
        let Some(scaling) = snapshot.scalar(names::TCP_WINDOW_SCALING) else {
            findings.push(Finding::skipped(
                check_id::WINDOW_SCALING_GATE,
                names::TCP_WINDOW_SCALING,
            ));
            continue;
        };
        if scaling == 1 {
            findings.push(
                Finding::new(
                    Severity::Pass,
                    check_id::WINDOW_SCALING_GATE,
                    format!("window scaling is enabled for {name} max {}", t.max),
                )
                .with_parameter(name)
                .with_current(ParamValue::Triple(t)),
            );
        } else {
            findings.push(
                Finding::new(
                    Severity::Critical,
                    check_id::WINDOW_SCALING_GATE,
                    format!(
                        "{name} max {} exceeds {} but window scaling is disabled; \
                         effective window is truncated to {} regardless of configuration",
                        t.max, thresholds.unscaled_window_limit, thresholds.unscaled_window_limit
                    ),
                )
                .with_parameter(name)
                .with_current(ParamValue::Triple(t))
                .with_remediation(vec![Remediation::new(
                    names::TCP_WINDOW_SCALING,
                    ParamValue::Scalar(1),
                )]),
            );
        }
    }
}

/// Receive-buffer auto-tuning must be on, or configured maxima are never
/// reached and sockets stay at their defaults.
fn check_autotune_enabled(snapshot: &Snapshot, findings: &mut Vec<Finding>) {
    let Some(flag) = snapshot.scalar(names::TCP_MODERATE_RCVBUF) else {
        findings.push(Finding::skipped(
            check_id::AUTOTUNE_ENABLED,
            names::TCP_MODERATE_RCVBUF,
        ));
        return;
    };
    if flag == 1 {
        findings.push(
            Finding::new(
                Severity::Pass,
                check_id::AUTOTUNE_ENABLED,
                "receive buffer auto-tuning is enabled",
            )
            .with_parameter(names::TCP_MODERATE_RCVBUF)
            .with_current(ParamValue::Scalar(flag)),
        );
    } else {
        findings.push(
            Finding::new(
                Severity::Warning,
                check_id::AUTOTUNE_ENABLED,
                "receive buffer auto-tuning is disabled; configured maxima will never be \
                 reached automatically and only default buffer sizes will be used",
            )
            .with_parameter(names::TCP_MODERATE_RCVBUF)
            .with_current(ParamValue::Scalar(flag))
            .with_remediation(vec![Remediation::new(
                names::TCP_MODERATE_RCVBUF,
                ParamValue::Scalar(1),
            )]),
        );
    }
}

/// Degenerate buffer minima cause pathological allocation behaviour under
/// memory pressure.
fn check_min_floor(snapshot: &Snapshot, thresholds: &Thresholds, findings: &mut Vec<Finding>) {
    for name in BUFFER_TRIPLES {
        let Some(t) = snapshot.triple(name) else {
            findings.push(Finding::skipped(check_id::MIN_FLOOR, name));
            continue;
        };
        if t.min >= thresholds.min_floor {
            findings.push(
                Finding::new(
                    Severity::Pass,
                    check_id::MIN_FLOOR,
                    format!("{name} min {} is at or above the floor", t.min),
                )
                .with_parameter(name)
                .with_current(ParamValue::Triple(t)),
            );
        } else {
            findings.push(
                Finding::new(
                    Severity::Warning,
                    check_id::MIN_FLOOR,
                    format!(
                        "{name} min {} is below the sane floor of {}",
                        t.min, thresholds.min_floor
                    ),
                )
                .with_parameter(name)
                .with_current(ParamValue::Triple(t))
                .with_remediation(vec![Remediation::new(
                    name,
                    ParamValue::Triple(Triple::new(thresholds.min_floor, t.default, t.max)),
                )]),
            );
        }
    }
}

/// Buffer defaults below the assumed message size force immediate growth
/// (or drops) on every connection.
fn check_default_floor(snapshot: &Snapshot, thresholds: &Thresholds, findings: &mut Vec<Finding>) {
    for name in BUFFER_TRIPLES {
        let Some(t) = snapshot.triple(name) else {
            findings.push(Finding::skipped(check_id::DEFAULT_FLOOR, name));
            continue;
        };
        if t.default >= thresholds.assumed_message_size {
            findings.push(
                Finding::new(
                    Severity::Pass,
                    check_id::DEFAULT_FLOOR,
                    format!(
                        "{name} default {} covers the assumed message size of {}",
                        t.default, thresholds.assumed_message_size
                    ),
                )
                .with_parameter(name)
                .with_current(ParamValue::Triple(t)),
            );
        } else {
            findings.push(
                Finding::new(
                    Severity::Critical,
                    check_id::DEFAULT_FLOOR,
                    format!(
                        "{name} default {} is below the assumed message size of {}; \
                         typical messages will not fit in a fresh socket's buffer",
                        t.default, thresholds.assumed_message_size
                    ),
                )
                .with_parameter(name)
                .with_current(ParamValue::Triple(t))
                .with_remediation(vec![Remediation::new(
                    name,
                    ParamValue::Triple(Triple::new(
                        t.min,
                        thresholds.assumed_message_size,
                        t.max.max(thresholds.assumed_message_size),
                    )),
                )]),
            );
        }
    }
}

/// The global TCP memory ceiling must sustain a reasonable connection
/// count at full per-connection buffer utilization.
fn check_connection_capacity(
    snapshot: &Snapshot,
    thresholds: &Thresholds,
    findings: &mut Vec<Finding>,
) {
    let (Some(mem), Some(rmem), Some(wmem)) = (
        snapshot.triple(names::TCP_MEM),
        snapshot.triple(names::TCP_RMEM),
        snapshot.triple(names::TCP_WMEM),
    ) else {
        findings.push(Finding::skipped(
            check_id::CONNECTION_CAPACITY,
            names::TCP_MEM,
        ));
        return;
    };
    let per_connection = rmem.max.saturating_add(wmem.max);
    if per_connection <= 0 {
        findings.push(Finding::skipped(
            check_id::CONNECTION_CAPACITY,
            names::TCP_RMEM,
        ));
        return;
    }
    let ceiling_bytes = mem.max.saturating_mul(thresholds.page_size);
    let max_connections = ceiling_bytes / per_connection;
    if max_connections < thresholds.capacity_floor {
        // smallest high watermark that restores the floor
        let needed_pages = (thresholds.capacity_floor.saturating_mul(per_connection)
            + thresholds.page_size
            - 1)
            / thresholds.page_size;
        findings.push(
            Finding::new(
                Severity::Warning,
                check_id::CONNECTION_CAPACITY,
                format!(
                    "global TCP memory ceiling supports only ~{max_connections} connections \
                     at full buffer utilization ({} + {} bytes each); floor is {}",
                    rmem.max, wmem.max, thresholds.capacity_floor
                ),
            )
            .with_parameter(names::TCP_MEM)
            .with_current(ParamValue::Triple(mem))
            .with_remediation(vec![Remediation::new(
                names::TCP_MEM,
                ParamValue::Triple(Triple::new(
                    mem.min,
                    mem.default.min(needed_pages),
                    needed_pages.max(mem.max),
                )),
            )]),
        );
    } else {
        findings.push(
            Finding::new(
                Severity::Pass,
                check_id::CONNECTION_CAPACITY,
                format!(
                    "global TCP memory ceiling sustains ~{max_connections} connections \
                     at full buffer utilization"
                ),
            )
            .with_parameter(names::TCP_MEM)
            .with_current(ParamValue::Triple(mem)),
        );
    }
}

/// Classify current TCP memory usage against the low/pressure/high
/// watermarks of `tcp_mem`.
fn check_memory_pressure(snapshot: &Snapshot, findings: &mut Vec<Finding>) {
    let (Some(mem), Some(pages)) = (
        snapshot.triple(names::TCP_MEM),
        snapshot.metric(MetricId::TcpMemPages),
    ) else {
        findings.push(Finding::skipped(check_id::MEMORY_PRESSURE, names::TCP_MEM));
        return;
    };
    let (severity, state) = if pages < mem.min {
        (Severity::Pass, "normal")
    } else if pages < mem.default {
        (Severity::Info, "approaching pressure")
    } else if pages < mem.max {
        (Severity::Warning, "under pressure")
    } else {
        (Severity::Critical, "at or above the hard limit")
    };
    findings.push(
        Finding::new(
            severity,
            check_id::MEMORY_PRESSURE,
            format!(
                "TCP memory usage is {state}: {pages} pages against \
                 low/pressure/high watermarks {mem}"
            ),
        )
        .with_parameter(names::TCP_MEM)
        .with_current(ParamValue::Triple(mem)),
    );
}

/// Advisory comparison of the generic socket defaults against the TCP
/// defaults. Divergence can be intentional, so this never exceeds `Info`.
fn check_default_mismatch(
    snapshot: &Snapshot,
    thresholds: &Thresholds,
    findings: &mut Vec<Finding>,
) {
    for (core_name, triple_name) in [
        (names::RMEM_DEFAULT, names::TCP_RMEM),
        (names::WMEM_DEFAULT, names::TCP_WMEM),
    ] {
        let (Some(core_default), Some(t)) =
            (snapshot.scalar(core_name), snapshot.triple(triple_name))
        else {
            findings.push(Finding::skipped(check_id::DEFAULT_MISMATCH, core_name));
            continue;
        };
        let (hi, lo) = if core_default >= t.default {
            (core_default, t.default)
        } else {
            (t.default, core_default)
        };
        if lo <= 0 || hi / lo > thresholds.default_divergence_ratio {
            findings.push(
                Finding::new(
                    Severity::Info,
                    check_id::DEFAULT_MISMATCH,
                    format!(
                        "{core_name} ({core_default}) and {triple_name} default ({}) \
                         diverge significantly; this may be intentional",
                        t.default
                    ),
                )
                .with_parameter(core_name)
                .with_current(ParamValue::Scalar(core_default)),
            );
        } else {
            findings.push(
                Finding::new(
                    Severity::Pass,
                    check_id::DEFAULT_MISMATCH,
                    format!("{core_name} and {triple_name} defaults are in the same range"),
                )
                .with_parameter(core_name)
                .with_current(ParamValue::Scalar(core_default)),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetricReading;
    use std::collections::BTreeMap;

    /// Number of findings a full evaluation always yields when no reading
    /// is malformed: 3 triple-order + 2 ceiling + 2 scaling-gate +
    /// 1 autotune + 2 min-floor + 2 default-floor + 1 capacity +
    /// 1 pressure + 2 default-mismatch
    const FULL_LENGTH: usize = 16;

    fn triple(min: i64, default: i64, max: i64) -> ParamValue {
        ParamValue::Triple(Triple::new(min, default, max))
    }

    /// A snapshot that passes every check under default thresholds
    fn healthy_params() -> BTreeMap<String, ParamValue> {
        BTreeMap::from([
            (names::TCP_RMEM.to_string(), triple(4096, 87380, 16777216)),
            (names::TCP_WMEM.to_string(), triple(4096, 65536, 16777216)),
            (
                names::TCP_MEM.to_string(),
                triple(786432, 1048576, 1572864),
            ),
            (names::RMEM_MAX.to_string(), ParamValue::Scalar(16777216)),
            (names::WMEM_MAX.to_string(), ParamValue::Scalar(16777216)),
            (names::RMEM_DEFAULT.to_string(), ParamValue::Scalar(131072)),
            (names::WMEM_DEFAULT.to_string(), ParamValue::Scalar(131072)),
            (
                names::TCP_WINDOW_SCALING.to_string(),
                ParamValue::Scalar(1),
            ),
            (
                names::TCP_MODERATE_RCVBUF.to_string(),
                ParamValue::Scalar(1),
            ),
            (
                names::NETDEV_MAX_BACKLOG.to_string(),
                ParamValue::Scalar(5000),
            ),
        ])
    }

    fn count(findings: &[Finding], severity: Severity) -> usize {
        findings.iter().filter(|f| f.severity == severity).count()
    }

    fn by_check<'a>(findings: &'a [Finding], id: &str) -> Vec<&'a Finding> {
        findings.iter().filter(|f| f.check_id == id).collect()
    }

    #[test]
    fn test_healthy_snapshot_has_no_warnings_or_criticals() {
        let snapshot = Snapshot::synthetic(healthy_params());
        let findings = evaluate(&snapshot, &Thresholds::default());

        assert_eq!(findings.len(), FULL_LENGTH);
        assert_eq!(count(&findings, Severity::Warning), 0);
        assert_eq!(count(&findings, Severity::Critical), 0);
    }

    #[test]
    fn test_evaluation_is_idempotent() {
        let snapshot = Snapshot::synthetic(healthy_params());
        let thresholds = Thresholds::default();
        assert_eq!(
            evaluate(&snapshot, &thresholds),
            evaluate(&snapshot, &thresholds)
        );
    }

    #[test]
    fn test_ceiling_violation_detected() {
        let snapshot = Snapshot::synthetic(BTreeMap::from([
            (names::TCP_RMEM.to_string(), triple(4096, 87380, 16777216)),
            (names::RMEM_MAX.to_string(), ParamValue::Scalar(212992)),
        ]));
        let findings = evaluate(&snapshot, &Thresholds::default());

        let criticals: Vec<_> = findings
            .iter()
            .filter(|f| f.severity == Severity::Critical)
            .collect();
        assert_eq!(criticals.len(), 1);
        let finding = criticals[0];
        assert_eq!(finding.check_id, check_id::CEILING_CONSISTENCY);
        // remediation offers raising the ceiling to at least the triple max
        let raise = finding
            .remediation
            .iter()
            .find(|r| r.name == names::RMEM_MAX)
            .unwrap();
        assert!(matches!(raise.value, ParamValue::Scalar(v) if v >= 16777216));
        // and the alternative of lowering the auto-tune max
        assert!(finding.remediation.iter().any(|r| r.name == names::TCP_RMEM));
    }

    #[test]
    fn test_window_scaling_gate_detected() {
        let snapshot = Snapshot::synthetic(BTreeMap::from([
            (names::TCP_RMEM.to_string(), triple(4096, 87380, 8388608)),
            (
                names::TCP_WINDOW_SCALING.to_string(),
                ParamValue::Scalar(0),
            ),
        ]));
        let findings = evaluate(&snapshot, &Thresholds::default());

        let gated = by_check(&findings, check_id::WINDOW_SCALING_GATE);
        assert!(gated
            .iter()
            .any(|f| f.severity == Severity::Critical
                && f.parameter.as_deref() == Some(names::TCP_RMEM)));
        let critical = gated
            .iter()
            .find(|f| f.severity == Severity::Critical)
            .unwrap();
        assert_eq!(
            critical.remediation,
            vec![Remediation::new(
                names::TCP_WINDOW_SCALING,
                ParamValue::Scalar(1)
            )]
        );
    }

    #[test]
    fn test_small_buffers_do_not_need_window_scaling() {
        let snapshot = Snapshot::synthetic(BTreeMap::from([
            (names::TCP_RMEM.to_string(), triple(4096, 16384, 65536)),
            (
                names::TCP_WINDOW_SCALING.to_string(),
                ParamValue::Scalar(0),
            ),
        ]));
        let findings = evaluate(&snapshot, &Thresholds::default());
        let gated = by_check(&findings, check_id::WINDOW_SCALING_GATE);
        assert!(gated
            .iter()
            .all(|f| f.severity != Severity::Critical));
    }

    #[test]
    fn test_autotune_disabled_is_a_warning() {
        let mut params = healthy_params();
        params.insert(
            names::TCP_MODERATE_RCVBUF.to_string(),
            ParamValue::Scalar(0),
        );
        let findings = evaluate(&Snapshot::synthetic(params), &Thresholds::default());

        let autotune = by_check(&findings, check_id::AUTOTUNE_ENABLED);
        assert_eq!(autotune.len(), 1);
        assert_eq!(autotune[0].severity, Severity::Warning);
    }

    #[test]
    fn test_inverted_triple_is_critical() {
        let mut params = healthy_params();
        params.insert(names::TCP_RMEM.to_string(), triple(87380, 4096, 16777216));
        let findings = evaluate(&Snapshot::synthetic(params), &Thresholds::default());

        let order = by_check(&findings, check_id::TRIPLE_ORDER);
        let bad = order
            .iter()
            .find(|f| f.parameter.as_deref() == Some(names::TCP_RMEM))
            .unwrap();
        assert_eq!(bad.severity, Severity::Critical);
        assert_eq!(
            bad.remediation[0].value,
            triple(4096, 87380, 16777216)
        );
    }

    #[test]
    fn test_min_and_default_floors() {
        let mut params = healthy_params();
        params.insert(names::TCP_WMEM.to_string(), triple(1024, 2048, 16777216));
        let findings = evaluate(&Snapshot::synthetic(params), &Thresholds::default());

        let min = by_check(&findings, check_id::MIN_FLOOR);
        assert!(min.iter().any(|f| f.severity == Severity::Warning
            && f.parameter.as_deref() == Some(names::TCP_WMEM)));

        let default = by_check(&findings, check_id::DEFAULT_FLOOR);
        assert!(default.iter().any(|f| f.severity == Severity::Critical
            && f.parameter.as_deref() == Some(names::TCP_WMEM)));
    }

    #[test]
    fn test_capacity_floor_scenario() {
        // ceiling and per-connection sum in the same unit: page_size = 1
        let thresholds = Thresholds {
            page_size: 1,
            ..Thresholds::default()
        };
        let snapshot = Snapshot::synthetic(BTreeMap::from([
            (names::TCP_MEM.to_string(), triple(100, 300, 690)),
            (names::TCP_RMEM.to_string(), triple(16, 32, 64)),
            (names::TCP_WMEM.to_string(), triple(16, 32, 64)),
        ]));
        let findings = evaluate(&snapshot, &thresholds);

        let capacity = by_check(&findings, check_id::CONNECTION_CAPACITY);
        assert_eq!(capacity.len(), 1);
        assert_eq!(capacity[0].severity, Severity::Warning);
        // 690 / 128 = 5 connections
        assert!(capacity[0].message.contains("~5 connections"));
    }

    #[test]
    fn test_pressure_severity_is_monotonic_across_the_sweep() {
        let mem = Triple::new(100, 200, 300);
        let mut params = healthy_params();
        params.insert(
            names::TCP_MEM.to_string(),
            ParamValue::Triple(mem),
        );

        let mut last = Severity::Pass;
        for pages in 0..400 {
            let mut snapshot = Snapshot::synthetic(params.clone());
            snapshot
                .telemetry
                .insert(MetricId::TcpMemPages, MetricReading::Value(pages));
            let findings = evaluate(&snapshot, &Thresholds::default());
            let pressure = by_check(&findings, check_id::MEMORY_PRESSURE);
            assert_eq!(pressure.len(), 1);
            let severity = pressure[0].severity;
            assert!(severity >= last, "severity regressed at {pages} pages");
            // transitions exactly at the watermarks
            match pages {
                99 => assert_eq!(severity, Severity::Pass),
                100 => assert_eq!(severity, Severity::Info),
                199 => assert_eq!(severity, Severity::Info),
                200 => assert_eq!(severity, Severity::Warning),
                299 => assert_eq!(severity, Severity::Warning),
                300 => assert_eq!(severity, Severity::Critical),
                _ => {}
            }
            last = severity;
        }
    }

    #[test]
    fn test_default_mismatch_never_exceeds_info() {
        let mut params = healthy_params();
        params.insert(names::RMEM_DEFAULT.to_string(), ParamValue::Scalar(1048576));
        let findings = evaluate(&Snapshot::synthetic(params), &Thresholds::default());

        let mismatch = by_check(&findings, check_id::DEFAULT_MISMATCH);
        assert_eq!(mismatch.len(), 2);
        assert!(mismatch.iter().all(|f| f.severity <= Severity::Info));
        assert!(mismatch.iter().any(|f| f.severity == Severity::Info));
    }

    #[test]
    fn test_graceful_degradation_with_unavailable_parameters() {
        let mut snapshot = Snapshot::synthetic(healthy_params());
        for name in [names::TCP_MEM, names::RMEM_MAX, names::TCP_MODERATE_RCVBUF] {
            snapshot
                .params
                .insert(name.to_string(), Reading::unavailable("permission denied"));
        }
        let findings = evaluate(&snapshot, &Thresholds::default());

        // full-length list, no panic, affected checks downgraded to Info
        assert_eq!(findings.len(), FULL_LENGTH);
        assert_eq!(count(&findings, Severity::Critical), 0);
        assert_eq!(count(&findings, Severity::Warning), 0);
        assert!(findings
            .iter()
            .filter(|f| f.message.starts_with("check skipped"))
            .all(|f| f.severity == Severity::Info));
        assert!(findings
            .iter()
            .any(|f| f.check_id == check_id::AUTOTUNE_ENABLED
                && f.message.starts_with("check skipped")));
    }

    #[test]
    fn test_malformed_reading_gets_its_own_finding() {
        let mut snapshot = Snapshot::synthetic(healthy_params());
        snapshot.params.insert(
            names::TCP_MEM.to_string(),
            Reading::Malformed {
                raw: "786432 1048576".to_string(),
            },
        );
        let findings = evaluate(&snapshot, &Thresholds::default());

        let malformed = by_check(&findings, check_id::MALFORMED_VALUE);
        assert_eq!(malformed.len(), 1);
        assert_eq!(malformed[0].severity, Severity::Warning);
        assert_eq!(malformed[0].parameter.as_deref(), Some(names::TCP_MEM));
        // and the checks that needed it degraded instead of crashing
        assert!(by_check(&findings, check_id::CONNECTION_CAPACITY)[0]
            .message
            .starts_with("check skipped"));
    }

    #[test]
    fn test_findings_are_machine_consumable() {
        let snapshot = Snapshot::synthetic(BTreeMap::from([
            (names::TCP_RMEM.to_string(), triple(4096, 87380, 16777216)),
            (names::RMEM_MAX.to_string(), ParamValue::Scalar(212992)),
        ]));
        let findings = evaluate(&snapshot, &Thresholds::default());
        let json = serde_json::to_string(&findings).unwrap();
        let back: Vec<Finding> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, findings);
    }
}
