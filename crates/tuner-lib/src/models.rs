//! Core data models for the network buffer tuner

use serde::{Deserialize, Serialize};

/// Well-known kernel parameter names used throughout the analyzer
pub mod names {
    pub const TCP_RMEM: &str = "net.ipv4.tcp_rmem";
    pub const TCP_WMEM: &str = "net.ipv4.tcp_wmem";
    pub const TCP_MEM: &str = "net.ipv4.tcp_mem";
    pub const RMEM_MAX: &str = "net.core.rmem_max";
    pub const WMEM_MAX: &str = "net.core.wmem_max";
    pub const RMEM_DEFAULT: &str = "net.core.rmem_default";
    pub const WMEM_DEFAULT: &str = "net.core.wmem_default";
    pub const TCP_WINDOW_SCALING: &str = "net.ipv4.tcp_window_scaling";
    pub const TCP_MODERATE_RCVBUF: &str = "net.ipv4.tcp_moderate_rcvbuf";
    pub const NETDEV_MAX_BACKLOG: &str = "net.core.netdev_max_backlog";
}

/// Shape of a kernel tunable value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    /// Single integer (bytes, pages or a flag)
    Scalar,
    /// Ordered min/default/max auto-tuning range
    Triple,
}

impl std::fmt::Display for ParamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamKind::Scalar => write!(f, "scalar"),
            ParamKind::Triple => write!(f, "triple"),
        }
    }
}

/// A min/default/max auto-tuning range as exposed by the kernel
/// (e.g. `net.ipv4.tcp_rmem`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triple {
    pub min: i64,
    pub default: i64,
    pub max: i64,
}

impl Triple {
    pub fn new(min: i64, default: i64, max: i64) -> Self {
        Self { min, default, max }
    }

    /// Whether `min <= default <= max` holds. The kernel accepts inverted
    /// ranges without complaint, so this has to be checked explicitly.
    pub fn is_ordered(&self) -> bool {
        self.min <= self.default && self.default <= self.max
    }
}

impl std::fmt::Display for Triple {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.min, self.default, self.max)
    }
}

/// A typed parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamValue {
    Scalar(i64),
    Triple(Triple),
}

impl ParamValue {
    /// Render in the whitespace-separated form the parameter store accepts
    /// for writes
    pub fn to_store_string(&self) -> String {
        match self {
            ParamValue::Scalar(v) => v.to_string(),
            ParamValue::Triple(t) => t.to_string(),
        }
    }
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_store_string())
    }
}

/// Result of reading one parameter from the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reading {
    /// Parsed successfully
    Value(ParamValue),
    /// Could not be read (missing, permission denied, timed out)
    Unavailable { reason: String },
    /// Read but did not parse as the expected kind; treated as unavailable
    /// by rule evaluation but reported separately
    Malformed { raw: String },
}

impl Reading {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Reading::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Reading::Value(_))
    }

    pub fn scalar(&self) -> Option<i64> {
        match self {
            Reading::Value(ParamValue::Scalar(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn triple(&self) -> Option<Triple> {
        match self {
            Reading::Value(ParamValue::Triple(t)) => Some(*t),
            _ => None,
        }
    }
}

/// Unit a telemetry metric is reported in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Pages,
    Bytes,
    Count,
}

/// Identifier of a runtime telemetry metric
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum MetricId {
    /// Pages of memory currently used by TCP sockets
    TcpMemPages,
    /// Orphaned TCP sockets (closed by the application, still held by the
    /// kernel)
    TcpOrphans,
    /// Total sockets in use on the host
    SocketsInUse,
    /// Cumulative receive drops summed over physical interfaces
    RxDrops,
    /// Cumulative transmit drops summed over physical interfaces
    TxDrops,
}

impl MetricId {
    /// All metrics a snapshot is expected to carry
    pub const ALL: [MetricId; 5] = [
        MetricId::TcpMemPages,
        MetricId::TcpOrphans,
        MetricId::SocketsInUse,
        MetricId::RxDrops,
        MetricId::TxDrops,
    ];

    pub fn unit(self) -> Unit {
        match self {
            MetricId::TcpMemPages => Unit::Pages,
            MetricId::TcpOrphans | MetricId::SocketsInUse => Unit::Count,
            MetricId::RxDrops | MetricId::TxDrops => Unit::Count,
        }
    }
}

/// Result of reading one telemetry metric
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricReading {
    Value(i64),
    Unavailable { reason: String },
}

impl MetricReading {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        MetricReading::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn value(&self) -> Option<i64> {
        match self {
            MetricReading::Value(v) => Some(*v),
            MetricReading::Unavailable { .. } => None,
        }
    }
}

/// Point-in-time buffer occupancy of a single TCP connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionBuffers {
    pub local: String,
    pub peer: String,
    /// Bytes of receive buffer currently in use
    pub rmem_used: u64,
    /// Allocated receive buffer size
    pub rcv_buffer: u64,
    /// Bytes of send buffer currently in use
    pub wmem_used: u64,
    /// Allocated send buffer size
    pub snd_buffer: u64,
}

/// Severity of a finding, ordered from least to most severe
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Pass,
    Info,
    Warning,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Pass => write!(f, "pass"),
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// A concrete suggested parameter assignment attached to a finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Remediation {
    pub name: String,
    pub value: ParamValue,
}

impl Remediation {
    pub fn new(name: impl Into<String>, value: ParamValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// One diagnostic result produced by the consistency evaluator.
///
/// Findings are immutable once created and fully serializable so an
/// external renderer (text, JSON, machine consumer) can act on them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    /// Stable identifier of the rule that produced this finding
    pub check_id: String,
    /// Parameter the finding is primarily about, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
    pub message: String,
    /// Current value of the parameter under examination
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<ParamValue>,
    /// Suggested assignments that would resolve the finding
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remediation: Vec<Remediation>,
}

impl Finding {
    pub fn new(severity: Severity, check_id: &str, message: impl Into<String>) -> Self {
        Self {
            severity,
            check_id: check_id.to_string(),
            parameter: None,
            message: message.into(),
            current: None,
            remediation: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>) -> Self {
        self.parameter = Some(name.into());
        self
    }

    pub fn with_current(mut self, value: ParamValue) -> Self {
        self.current = Some(value);
        self
    }

    pub fn with_remediation(mut self, remediation: Vec<Remediation>) -> Self {
        self.remediation = remediation;
        self
    }

    /// Standard finding for a check that could not run because an input
    /// was unavailable or malformed
    pub fn skipped(check_id: &str, parameter: &str) -> Self {
        Finding::new(
            Severity::Info,
            check_id,
            format!("check skipped: {parameter} unavailable"),
        )
        .with_parameter(parameter)
    }
}
