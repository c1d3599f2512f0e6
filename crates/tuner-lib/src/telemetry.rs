//! Runtime telemetry collection
//!
//! Point-in-time counters backing the memory-pressure and drop checks:
//! - `/proc/net/sockstat` for socket counts and TCP memory pages
//! - `/proc/net/dev` for cumulative interface drop counters
//! - `ss -tmn` output for per-connection buffer occupancy
//!
//! Drop counters are cumulative since boot and interpreted as such; no
//! rate computation happens here. All parsers are pure functions over the
//! raw text so they can be tested against canned fixtures.

use crate::models::{ConnectionBuffers, MetricId};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;
use tokio::process::Command;

/// Narrow contract over the runtime telemetry source
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    /// Read a single point-in-time counter
    async fn read_metric(&self, metric: MetricId) -> Result<i64>;

    /// Enumerate per-connection buffer occupancy, bounded by `limit` in
    /// the order the source reports them so repeated runs are comparable
    async fn list_connections(&self, limit: usize) -> Result<Vec<ConnectionBuffers>>;
}

/// Telemetry source backed by `/proc` files and the `ss` utility
pub struct ProcfsTelemetry {
    proc_root: PathBuf,
}

impl ProcfsTelemetry {
    pub fn new() -> Self {
        Self {
            proc_root: PathBuf::from("/proc"),
        }
    }

    /// Telemetry over a custom proc root (for tests)
    pub fn with_proc_root(proc_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
        }
    }

    async fn read_proc_file(&self, relative: &str) -> Result<String> {
        let path = self.proc_root.join(relative);
        fs::read_to_string(&path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))
    }
}

impl Default for ProcfsTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TelemetrySource for ProcfsTelemetry {
    async fn read_metric(&self, metric: MetricId) -> Result<i64> {
        match metric {
            MetricId::TcpMemPages | MetricId::TcpOrphans | MetricId::SocketsInUse => {
                let content = self.read_proc_file("net/sockstat").await?;
                match parse_sockstat(&content, metric) {
                    Some(value) => Ok(value),
                    None => bail!("metric {metric:?} not present in sockstat"),
                }
            }
            MetricId::RxDrops | MetricId::TxDrops => {
                let content = self.read_proc_file("net/dev").await?;
                let (rx, tx) = match parse_netdev_drops(&content) {
                    Some(totals) => totals,
                    None => bail!("no interface statistics in /proc/net/dev"),
                };
                Ok(if metric == MetricId::RxDrops { rx } else { tx })
            }
        }
    }

    async fn list_connections(&self, limit: usize) -> Result<Vec<ConnectionBuffers>> {
        let output = Command::new("ss")
            .args(["-t", "-m", "-n"])
            .output()
            .await
            .context("failed to run ss")?;
        if !output.status.success() {
            bail!("ss exited with {}", output.status);
        }
        let text = String::from_utf8_lossy(&output.stdout);
        Ok(parse_ss_connections(&text, limit))
    }
}

/// Extract one metric from `/proc/net/sockstat` content.
///
/// ```text
/// sockets: used 296
/// TCP: inuse 9 orphan 1 tw 2 alloc 12 mem 4
/// ```
pub fn parse_sockstat(content: &str, metric: MetricId) -> Option<i64> {
    let (prefix, key) = match metric {
        MetricId::SocketsInUse => ("sockets:", "used"),
        MetricId::TcpOrphans => ("TCP:", "orphan"),
        MetricId::TcpMemPages => ("TCP:", "mem"),
        _ => return None,
    };
    for line in content.lines() {
        if let Some(rest) = line.strip_prefix(prefix) {
            let fields: Vec<&str> = rest.split_whitespace().collect();
            let pos = fields.iter().position(|f| *f == key)?;
            return fields.get(pos + 1)?.parse().ok();
        }
    }
    None
}

/// Sum receive and transmit drop counters over all interfaces except
/// loopback. Returns `None` if no interface line parsed.
///
/// `/proc/net/dev` carries 16 numeric columns per interface; receive drop
/// is column 4 and transmit drop is column 12.
pub fn parse_netdev_drops(content: &str) -> Option<(i64, i64)> {
    let mut rx_total = 0i64;
    let mut tx_total = 0i64;
    let mut seen = false;
    for line in content.lines().skip(2) {
        let Some((name, rest)) = line.split_once(':') else {
            continue;
        };
        if name.trim() == "lo" {
            continue;
        }
        let fields: Vec<i64> = rest
            .split_whitespace()
            .filter_map(|f| f.parse().ok())
            .collect();
        if fields.len() >= 12 {
            rx_total += fields[3];
            tx_total += fields[11];
            seen = true;
        }
    }
    seen.then_some((rx_total, tx_total))
}

/// Parse `ss -tmn` output into bounded per-connection buffer samples.
///
/// `ss` prints the socket line and its `skmem:(...)` detail either on one
/// line or with the detail wrapped onto a continuation line; both layouts
/// occur in the wild and both are handled.
pub fn parse_ss_connections(output: &str, limit: usize) -> Vec<ConnectionBuffers> {
    let mut connections = Vec::new();
    let mut pending: Option<(String, String)> = None;

    for line in output.lines() {
        if connections.len() >= limit {
            break;
        }
        if let Some(idx) = line.find("skmem:(") {
            let head: Vec<&str> = line[..idx].split_whitespace().collect();
            let addresses = if head.len() >= 5 {
                Some((head[3].to_string(), head[4].to_string()))
            } else {
                pending.take()
            };
            let (Some((local, peer)), Some((rmem_used, rcv_buffer, wmem_used, snd_buffer))) =
                (addresses, parse_skmem(&line[idx..]))
            else {
                continue;
            };
            connections.push(ConnectionBuffers {
                local,
                peer,
                rmem_used,
                rcv_buffer,
                wmem_used,
                snd_buffer,
            });
        } else {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() >= 5 && fields[3].contains(':') && fields[4].contains(':') {
                pending = Some((fields[3].to_string(), fields[4].to_string()));
            }
        }
    }
    connections
}

/// Pull (r, rb, t, tb) out of an `skmem:(r0,rb131072,t0,tb87040,...)` token
fn parse_skmem(token: &str) -> Option<(u64, u64, u64, u64)> {
    let inner = token.strip_prefix("skmem:(")?.split(')').next()?;
    let mut r = None;
    let mut rb = None;
    let mut t = None;
    let mut tb = None;
    for field in inner.split(',') {
        // rb/tb must be matched before their r/t prefixes
        if let Some(v) = field.strip_prefix("rb") {
            rb = v.parse().ok();
        } else if let Some(v) = field.strip_prefix("tb") {
            tb = v.parse().ok();
        } else if let Some(v) = field.strip_prefix('r') {
            r = v.parse().ok();
        } else if let Some(v) = field.strip_prefix('t') {
            t = v.parse().ok();
        }
    }
    Some((r?, rb?, t?, tb?))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOCKSTAT: &str = "sockets: used 296\n\
TCP: inuse 9 orphan 1 tw 2 alloc 12 mem 44\n\
UDP: inuse 3 mem 2\n\
UDPLITE: inuse 0\n\
RAW: inuse 0\n\
FRAG: inuse 0 memory 0\n";

    const NETDEV: &str = "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
    lo: 1234567    1000    0    9    0     0          0         0  1234567    1000    0    9    0     0       0          0
  eth0: 99887766   50000    2    5    0     0          0       120  55443322   40000    1    3    0     0       0          0
  eth1: 11223344   20000    0    7    0     0          0        30  44332211   15000    0    4    0     0       0          0
";

    const SS_WRAPPED: &str = "\
State  Recv-Q  Send-Q     Local Address:Port      Peer Address:Port  Process
ESTAB  0       0           192.168.1.10:22        192.168.1.20:51234
\t skmem:(r0,rb131072,t0,tb87040,f4096,w0,o0,bl0,d0)
ESTAB  4352    0           192.168.1.10:443       203.0.113.7:40022
\t skmem:(r4352,rb262144,t0,tb46080,f0,w0,o0,bl0,d3)
";

    const SS_INLINE: &str = "\
State  Recv-Q  Send-Q     Local Address:Port      Peer Address:Port
ESTAB  0       128         10.0.0.1:8080          10.0.0.2:55000  skmem:(r0,rb87380,t128,tb16384,f0,w256,o0,bl0,d0)
";

    #[test]
    fn test_parse_sockstat_metrics() {
        assert_eq!(
            parse_sockstat(SOCKSTAT, MetricId::SocketsInUse),
            Some(296)
        );
        assert_eq!(parse_sockstat(SOCKSTAT, MetricId::TcpOrphans), Some(1));
        assert_eq!(parse_sockstat(SOCKSTAT, MetricId::TcpMemPages), Some(44));
    }

    #[test]
    fn test_parse_sockstat_not_a_sockstat_metric() {
        assert_eq!(parse_sockstat(SOCKSTAT, MetricId::RxDrops), None);
    }

    #[test]
    fn test_parse_sockstat_missing_section() {
        assert_eq!(
            parse_sockstat("sockets: used 5\n", MetricId::TcpMemPages),
            None
        );
    }

    #[test]
    fn test_parse_netdev_sums_drops_excluding_loopback() {
        // eth0 drop 5/3 + eth1 drop 7/4; lo's 9/9 excluded
        assert_eq!(parse_netdev_drops(NETDEV), Some((12, 7)));
    }

    #[test]
    fn test_parse_netdev_empty() {
        assert_eq!(parse_netdev_drops("header\nheader\n"), None);
    }

    #[test]
    fn test_parse_ss_wrapped_skmem_lines() {
        let conns = parse_ss_connections(SS_WRAPPED, 50);
        assert_eq!(conns.len(), 2);
        assert_eq!(conns[0].local, "192.168.1.10:22");
        assert_eq!(conns[0].peer, "192.168.1.20:51234");
        assert_eq!(conns[0].rcv_buffer, 131072);
        assert_eq!(conns[0].snd_buffer, 87040);
        assert_eq!(conns[1].rmem_used, 4352);
        assert_eq!(conns[1].rcv_buffer, 262144);
    }

    #[test]
    fn test_parse_ss_inline_skmem() {
        let conns = parse_ss_connections(SS_INLINE, 50);
        assert_eq!(conns.len(), 1);
        assert_eq!(conns[0].local, "10.0.0.1:8080");
        assert_eq!(conns[0].wmem_used, 128);
        assert_eq!(conns[0].snd_buffer, 16384);
    }

    #[test]
    fn test_parse_ss_respects_limit() {
        let conns = parse_ss_connections(SS_WRAPPED, 1);
        assert_eq!(conns.len(), 1);
        assert_eq!(conns[0].local, "192.168.1.10:22");
    }

    #[test]
    fn test_parse_ss_header_only() {
        let header = "State  Recv-Q  Send-Q  Local Address:Port  Peer Address:Port\n";
        assert!(parse_ss_connections(header, 50).is_empty());
    }

    #[tokio::test]
    async fn test_procfs_telemetry_reads_fixture_root() {
        let dir = tempfile::tempdir().unwrap();
        let net = dir.path().join("net");
        tokio::fs::create_dir_all(&net).await.unwrap();
        tokio::fs::write(net.join("sockstat"), SOCKSTAT).await.unwrap();
        tokio::fs::write(net.join("dev"), NETDEV).await.unwrap();

        let telemetry = ProcfsTelemetry::with_proc_root(dir.path());
        assert_eq!(
            telemetry.read_metric(MetricId::TcpMemPages).await.unwrap(),
            44
        );
        assert_eq!(telemetry.read_metric(MetricId::RxDrops).await.unwrap(), 12);
        assert_eq!(telemetry.read_metric(MetricId::TxDrops).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_procfs_telemetry_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let telemetry = ProcfsTelemetry::with_proc_root(dir.path());
        assert!(telemetry.read_metric(MetricId::TcpMemPages).await.is_err());
    }
}
