//! Node alive status from scraped exporter metrics.
//!
//! The metrics backend is outside the planner. A caller runs the query
//! described by [`AliveStatusQuery`] and hands the result to
//! [`universe_alive_status`], which reports per-node process liveness and
//! marks nodes whose node exporter stopped answering as `Unreachable`.

use crate::config::{ExporterPorts, LivenessConfig};
use crate::types::{NodeRecord, NodeState, Universe, UniverseId};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Metric that reports 1 while a scraped target is up.
pub const UNIVERSE_ALIVE_METRIC: &str = "node_up";

/// Kind of exporter behind a scraped port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetType {
    NodeExporter,
    Master,
    Tserver,
    Redis,
    Cql,
    Unknown,
}

impl TargetType {
    pub fn from_port(port: u16, ports: &ExporterPorts) -> Self {
        match port {
            p if p == ports.node_exporter => TargetType::NodeExporter,
            p if p == ports.master => TargetType::Master,
            p if p == ports.tserver => TargetType::Tserver,
            p if p == ports.redis => TargetType::Redis,
            p if p == ports.cql => TargetType::Cql,
            _ => TargetType::Unknown,
        }
    }
}

/// Samples for one `ip:port` target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSeries {
    pub name: String,
    #[serde(rename = "y")]
    pub values: Vec<String>,
}

impl MetricSeries {
    fn target(&self) -> Option<(&str, &str)> {
        self.name.split_once(':')
    }

    fn is_up(&self) -> bool {
        self.values.iter().any(|v| v == "1")
    }
}

/// Result of running an [`AliveStatusQuery`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricQueryResult {
    Error(String),
    Series(Vec<MetricSeries>),
}

/// Status of one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NodeAliveStatus {
    pub tserver_alive: bool,
    pub master_alive: bool,
    pub node_status: NodeState,
}

/// Status of every node in a universe, keyed by node name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UniverseAliveStatus {
    pub universe_id: UniverseId,
    pub nodes: BTreeMap<String, NodeAliveStatus>,
}

/// Metrics query window for a universe's liveness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliveStatusQuery {
    pub metric: String,
    pub node_prefix: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub step_secs: u64,
}

impl AliveStatusQuery {
    /// Query ending at `now`, spanning the configured window.
    pub fn new(universe: &Universe, now: DateTime<Utc>, config: &LivenessConfig) -> Self {
        let window = Duration::seconds(config.window_secs as i64);
        Self {
            metric: UNIVERSE_ALIVE_METRIC.to_string(),
            node_prefix: universe.details.node_prefix.clone(),
            start: now - window,
            end: now,
            step_secs: config.step_secs,
        }
    }

    /// Flat query parameters, times in epoch seconds.
    pub fn params(&self) -> BTreeMap<String, String> {
        let filters = serde_json::json!({ "node_prefix": self.node_prefix });
        let mut params = BTreeMap::new();
        params.insert("start".to_string(), self.start.timestamp().to_string());
        params.insert("end".to_string(), self.end.timestamp().to_string());
        params.insert("step".to_string(), self.step_secs.to_string());
        params.insert("filters".to_string(), filters.to_string());
        params.insert("metrics[0]".to_string(), self.metric.clone());
        params
    }
}

/// Derive per-node status from a query result, updating node states.
///
/// An errored query marks every node `Unreachable`. Otherwise a queryable
/// node with no node-exporter sample reporting up becomes `Unreachable`.
pub fn universe_alive_status(
    universe: &mut Universe,
    result: &MetricQueryResult,
    config: &LivenessConfig,
) -> UniverseAliveStatus {
    let mut nodes = BTreeMap::new();

    match result {
        MetricQueryResult::Error(message) => {
            warn!(universe = %universe.universe_id, %message, "Liveness query failed");
            for node in universe.details.nodes.iter_mut() {
                node.state = NodeState::Unreachable;
                nodes.insert(
                    node.node_name.clone(),
                    NodeAliveStatus {
                        tserver_alive: false,
                        master_alive: false,
                        node_status: node.state,
                    },
                );
            }
        }
        MetricQueryResult::Series(series) => {
            for node in universe.details.nodes.iter_mut() {
                let status = node_alive_status(node, series, &config.ports);
                nodes.insert(node.node_name.clone(), status);
            }
        }
    }

    UniverseAliveStatus {
        universe_id: universe.universe_id,
        nodes,
    }
}

fn node_alive_status(
    node: &mut NodeRecord,
    series: &[MetricSeries],
    ports: &ExporterPorts,
) -> NodeAliveStatus {
    let mut node_alive = false;
    let mut tserver_alive = false;
    let mut master_alive = false;

    let ip = node.cloud_info.private_ip.as_deref();
    for s in series {
        let (host, port) = match s.target() {
            Some(target) => target,
            None => continue,
        };
        if Some(host) != ip {
            continue;
        }
        let port: u16 = match port.parse() {
            Ok(port) => port,
            Err(_) => {
                warn!(target = %s.name, "Unparseable port in liveness series");
                continue;
            }
        };
        match TargetType::from_port(port, ports) {
            TargetType::NodeExporter => node_alive |= s.is_up(),
            TargetType::Tserver => tserver_alive |= s.is_up(),
            TargetType::Master => master_alive |= s.is_up(),
            TargetType::Redis | TargetType::Cql => {}
            TargetType::Unknown if port == 0 => {}
            TargetType::Unknown => warn!(port, "Invalid port in liveness series"),
        }
    }

    if !node_alive && node.state.is_queryable() {
        debug!(node = %node.node_name, "Node exporter down");
        node.state = NodeState::Unreachable;
    }

    NodeAliveStatus {
        tserver_alive,
        master_alive,
        node_status: node.state,
    }
}
