//! Snapshot capture
//!
//! One analysis run operates on exactly one immutable [`Snapshot`]. The
//! parameter and telemetry legs are independent, so they are read
//! concurrently and joined before evaluation; nothing else runs in
//! parallel. Every external read is bounded by a timeout and a timeout is
//! indistinguishable from an unavailable source.

use crate::models::{ConnectionBuffers, MetricId, MetricReading, ParamValue, Reading, Triple};
use crate::store::{self, ParameterStore};
use crate::telemetry::TelemetrySource;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Bounds on a single capture run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Per-read timeout for parameter and telemetry reads
    pub read_timeout: Duration,
    /// Upper bound on sampled connections, keeping the enumeration O(limit)
    /// rather than O(open connections)
    pub connection_sample_limit: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_millis(250),
            connection_sample_limit: 50,
        }
    }
}

/// Immutable point-in-time capture of parameters and telemetry.
///
/// Constructed once per analysis run, never cached across runs, and never
/// mutated after capture; every rule is a pure function over it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub captured_at: DateTime<Utc>,
    pub params: BTreeMap<String, Reading>,
    pub telemetry: BTreeMap<MetricId, MetricReading>,
    pub connections: Vec<ConnectionBuffers>,
}

impl Snapshot {
    /// Build a snapshot from bare parameter values, with no telemetry.
    /// Used for profile self-consistency evaluation and tests.
    pub fn synthetic(params: BTreeMap<String, ParamValue>) -> Self {
        let params = params
            .into_iter()
            .map(|(name, value)| (name, Reading::Value(value)))
            .collect();
        let telemetry = MetricId::ALL
            .into_iter()
            .map(|id| (id, MetricReading::unavailable("not captured")))
            .collect();
        Self {
            captured_at: Utc::now(),
            params,
            telemetry,
            connections: Vec::new(),
        }
    }

    pub fn reading(&self, name: &str) -> Option<&Reading> {
        self.params.get(name)
    }

    /// Scalar value of a parameter, if it was read and parsed as one
    pub fn scalar(&self, name: &str) -> Option<i64> {
        self.params.get(name).and_then(Reading::scalar)
    }

    /// Triple value of a parameter, if it was read and parsed as one
    pub fn triple(&self, name: &str) -> Option<Triple> {
        self.params.get(name).and_then(Reading::triple)
    }

    /// Telemetry metric value, if it was captured
    pub fn metric(&self, id: MetricId) -> Option<i64> {
        self.telemetry.get(&id).and_then(MetricReading::value)
    }
}

/// Capture a fresh snapshot from the two collaborators.
///
/// Never fails: unreadable inputs are recorded as unavailable and the
/// evaluation downstream degrades per check.
pub async fn capture(
    store: &dyn ParameterStore,
    telemetry: &dyn TelemetrySource,
    config: &CaptureConfig,
) -> Snapshot {
    let (params, (metrics, connections)) = tokio::join!(
        store::read_params(store, config.read_timeout),
        read_telemetry(telemetry, config)
    );
    Snapshot {
        captured_at: Utc::now(),
        params,
        telemetry: metrics,
        connections,
    }
}

async fn read_telemetry(
    source: &dyn TelemetrySource,
    config: &CaptureConfig,
) -> (BTreeMap<MetricId, MetricReading>, Vec<ConnectionBuffers>) {
    let mut metrics = BTreeMap::new();
    for id in MetricId::ALL {
        let reading = match tokio::time::timeout(config.read_timeout, source.read_metric(id)).await
        {
            Err(_) => {
                tracing::warn!(metric = ?id, "telemetry read timed out");
                MetricReading::unavailable("read timed out")
            }
            Ok(Err(err)) => {
                tracing::debug!(metric = ?id, error = %err, "metric unavailable");
                MetricReading::unavailable(err.to_string())
            }
            Ok(Ok(value)) => MetricReading::Value(value),
        };
        metrics.insert(id, reading);
    }

    let connections = match tokio::time::timeout(
        config.read_timeout,
        source.list_connections(config.connection_sample_limit),
    )
    .await
    {
        Ok(Ok(connections)) => connections,
        Ok(Err(err)) => {
            tracing::debug!(error = %err, "connection enumeration unavailable");
            Vec::new()
        }
        Err(_) => {
            tracing::warn!("connection enumeration timed out");
            Vec::new()
        }
    };

    (metrics, connections)
}
