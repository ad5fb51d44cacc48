//! Domain types for the Stellar fleet state.
//!
//! Nodes, metric samples, the auto-scaling policy and fleet summaries.
//! All types serialize with snake_case enums so a wire layer can expose
//! them without further mapping.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use stellar_core::config;

pub use stellar_core::config::{AutoScalingConfig, NodeSpec};
pub use stellar_core::{NodeId, NodeType};

use crate::error::{StateError, StateResult};

// ── Status ────────────────────────────────────────────────────────

/// Health states derived automatically from metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Online,
    Warning,
    Critical,
}

/// States set only by an administrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminState {
    Paused,
    Restarting,
}

/// Discrete status of a node.
///
/// Automatic states are recomputed every tick; administrative states are
/// left alone until `resume` or restart completion clears them.
/// Serializes as the bare state name (`"online"`, `"paused"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeStatus {
    Automatic(HealthState),
    Administrative(AdminState),
}

impl NodeStatus {
    pub const ONLINE: Self = Self::Automatic(HealthState::Online);
    pub const WARNING: Self = Self::Automatic(HealthState::Warning);
    pub const CRITICAL: Self = Self::Automatic(HealthState::Critical);
    pub const PAUSED: Self = Self::Administrative(AdminState::Paused);
    pub const RESTARTING: Self = Self::Administrative(AdminState::Restarting);

    pub const ALL: [NodeStatus; 5] = [
        Self::ONLINE,
        Self::WARNING,
        Self::CRITICAL,
        Self::PAUSED,
        Self::RESTARTING,
    ];

    pub fn is_administrative(&self) -> bool {
        matches!(self, NodeStatus::Administrative(_))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Automatic(HealthState::Online) => "online",
            NodeStatus::Automatic(HealthState::Warning) => "warning",
            NodeStatus::Automatic(HealthState::Critical) => "critical",
            NodeStatus::Administrative(AdminState::Paused) => "paused",
            NodeStatus::Administrative(AdminState::Restarting) => "restarting",
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "online" => Ok(NodeStatus::ONLINE),
            "warning" => Ok(NodeStatus::WARNING),
            "critical" => Ok(NodeStatus::CRITICAL),
            "paused" => Ok(NodeStatus::PAUSED),
            "restarting" => Ok(NodeStatus::RESTARTING),
            other => Err(format!("unknown node status: {other}")),
        }
    }
}

// ── Node ──────────────────────────────────────────────────────────

/// Instantaneous resource readings of one node.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeMetrics {
    pub cpu_usage_pct: f64,
    pub memory_usage_pct: f64,
    pub disk_usage_pct: f64,
    pub network_throughput_mbps: f64,
    pub active_connections: u32,
}

impl NodeMetrics {
    /// Clamp percentages into `[0, 100]` and throughput to `>= 0`.
    ///
    /// NaN readings collapse to zero.
    pub fn clamped(self) -> Self {
        Self {
            cpu_usage_pct: clamp_pct(self.cpu_usage_pct),
            memory_usage_pct: clamp_pct(self.memory_usage_pct),
            disk_usage_pct: clamp_pct(self.disk_usage_pct),
            network_throughput_mbps: if self.network_throughput_mbps.is_nan() {
                0.0
            } else {
                self.network_throughput_mbps.max(0.0)
            },
            active_connections: self.active_connections,
        }
    }

    /// Reading of a single metric type.
    pub fn value(&self, metric: MetricType) -> f64 {
        match metric {
            MetricType::Cpu => self.cpu_usage_pct,
            MetricType::Memory => self.memory_usage_pct,
            MetricType::Disk => self.disk_usage_pct,
            MetricType::Network => self.network_throughput_mbps,
        }
    }

    /// Snapshot left behind by a restart: everything but disk is zeroed.
    pub fn after_restart(self) -> Self {
        Self {
            cpu_usage_pct: 0.0,
            memory_usage_pct: 0.0,
            network_throughput_mbps: 0.0,
            active_connections: 0,
            ..self
        }
    }
}

fn clamp_pct(v: f64) -> f64 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 100.0) }
}

/// One monitored node and its current snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub address: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub location: String,
    pub status: NodeStatus,
    #[serde(flatten)]
    pub metrics: NodeMetrics,
    /// Unix timestamp (seconds) of the last mutation.
    pub last_updated: u64,
    pub uptime_seconds: u64,
}

impl Node {
    /// Build a node from its bootstrap entry. Status starts `online`;
    /// callers derive the real status from the initial snapshot.
    pub fn from_spec(spec: &NodeSpec, now: u64) -> Self {
        let metrics = NodeMetrics {
            cpu_usage_pct: spec.cpu_usage_pct.unwrap_or(0.0),
            memory_usage_pct: spec.memory_usage_pct.unwrap_or(0.0),
            disk_usage_pct: spec.disk_usage_pct.unwrap_or(0.0),
            network_throughput_mbps: spec.network_throughput_mbps.unwrap_or(0.0),
            active_connections: spec.active_connections.unwrap_or(0),
        };
        Self {
            id: spec.id.clone(),
            name: spec.name.clone(),
            address: spec.address.clone(),
            node_type: spec.node_type,
            location: spec.location.clone(),
            status: NodeStatus::ONLINE,
            metrics: metrics.clamped(),
            last_updated: now,
            uptime_seconds: spec.uptime_seconds.unwrap_or(0),
        }
    }
}

// ── Metric history ────────────────────────────────────────────────

/// Kind of reading carried by a [`MetricSample`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    Cpu,
    Memory,
    Disk,
    Network,
}

impl MetricType {
    pub const ALL: [MetricType; 4] = [
        MetricType::Cpu,
        MetricType::Memory,
        MetricType::Disk,
        MetricType::Network,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Cpu => "cpu",
            MetricType::Memory => "memory",
            MetricType::Disk => "disk",
            MetricType::Network => "network",
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpu" => Ok(MetricType::Cpu),
            "memory" => Ok(MetricType::Memory),
            "disk" => Ok(MetricType::Disk),
            "network" => Ok(MetricType::Network),
            other => Err(format!("unknown metric type: {other}")),
        }
    }
}

/// Immutable reading of one metric type for one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub node_id: NodeId,
    /// Unix timestamp (seconds).
    pub timestamp: u64,
    pub metric_type: MetricType,
    pub value: f64,
    /// Auxiliary values recorded alongside the main reading.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub additional: BTreeMap<String, f64>,
}

impl MetricSample {
    pub fn new(node_id: &str, timestamp: u64, metric_type: MetricType, value: f64) -> Self {
        Self {
            node_id: node_id.to_string(),
            timestamp,
            metric_type,
            value,
            additional: BTreeMap::new(),
        }
    }

    pub fn with_additional(mut self, key: &str, value: f64) -> Self {
        self.additional.insert(key.to_string(), value);
        self
    }
}

// ── Auto-scaling ──────────────────────────────────────────────────

/// Threshold policy read by the auto-scaling controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoScalingPolicy {
    pub min_nodes: u32,
    pub max_nodes: u32,
    pub cpu_threshold: f64,
    pub memory_threshold: f64,
    pub storage_threshold: f64,
    pub enabled: bool,
}

impl Default for AutoScalingPolicy {
    fn default() -> Self {
        Self {
            min_nodes: config::DEFAULT_MIN_NODES,
            max_nodes: config::DEFAULT_MAX_NODES,
            cpu_threshold: config::DEFAULT_CPU_SCALE_THRESHOLD,
            memory_threshold: config::DEFAULT_MEMORY_SCALE_THRESHOLD,
            storage_threshold: config::DEFAULT_STORAGE_SCALE_THRESHOLD,
            enabled: false,
        }
    }
}

impl AutoScalingPolicy {
    /// Reject policies that could never be satisfied.
    pub fn validate(&self) -> StateResult<()> {
        if self.min_nodes > self.max_nodes {
            return Err(StateError::InvalidConfiguration(format!(
                "min_nodes ({}) exceeds max_nodes ({})",
                self.min_nodes, self.max_nodes
            )));
        }
        let thresholds = [
            ("cpu_threshold", self.cpu_threshold),
            ("memory_threshold", self.memory_threshold),
            ("storage_threshold", self.storage_threshold),
        ];
        for (name, value) in thresholds {
            if !stellar_core::is_percentage(value) {
                return Err(StateError::InvalidConfiguration(format!(
                    "{name} ({value}) is outside [0, 100]"
                )));
            }
        }
        Ok(())
    }
}

impl From<&AutoScalingConfig> for AutoScalingPolicy {
    fn from(config: &AutoScalingConfig) -> Self {
        let defaults = AutoScalingPolicy::default();
        Self {
            min_nodes: config.min_nodes.unwrap_or(defaults.min_nodes),
            max_nodes: config.max_nodes.unwrap_or(defaults.max_nodes),
            cpu_threshold: config.cpu_threshold.unwrap_or(defaults.cpu_threshold),
            memory_threshold: config.memory_threshold.unwrap_or(defaults.memory_threshold),
            storage_threshold: config.storage_threshold.unwrap_or(defaults.storage_threshold),
            enabled: config.enabled.unwrap_or(defaults.enabled),
        }
    }
}

// ── Fleet summary ─────────────────────────────────────────────────

/// Fleet-wide averages and totals over the currently listed nodes.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FleetSummary {
    pub avg_cpu: f64,
    pub avg_memory: f64,
    pub avg_disk: f64,
    pub total_network_throughput: f64,
    pub total_active_connections: u64,
    pub node_count: u32,
    pub online_nodes: u32,
}

/// Current unix time in seconds.
pub fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_as_bare_name() {
        assert_eq!(serde_json::to_string(&NodeStatus::WARNING).unwrap(), "\"warning\"");
        assert_eq!(serde_json::to_string(&NodeStatus::PAUSED).unwrap(), "\"paused\"");

        let parsed: NodeStatus = serde_json::from_str("\"restarting\"").unwrap();
        assert_eq!(parsed, NodeStatus::RESTARTING);
        let parsed: NodeStatus = serde_json::from_str("\"critical\"").unwrap();
        assert_eq!(parsed, NodeStatus::CRITICAL);
    }

    #[test]
    fn status_from_str_matches_display() {
        for status in [
            NodeStatus::ONLINE,
            NodeStatus::WARNING,
            NodeStatus::CRITICAL,
            NodeStatus::PAUSED,
            NodeStatus::RESTARTING,
        ] {
            assert_eq!(status.to_string().parse::<NodeStatus>(), Ok(status));
        }
        assert!("degraded".parse::<NodeStatus>().is_err());
    }

    #[test]
    fn metrics_clamped() {
        let m = NodeMetrics {
            cpu_usage_pct: 104.2,
            memory_usage_pct: -3.0,
            disk_usage_pct: f64::NAN,
            network_throughput_mbps: -12.0,
            active_connections: 7,
        }
        .clamped();
        assert_eq!(m.cpu_usage_pct, 100.0);
        assert_eq!(m.memory_usage_pct, 0.0);
        assert_eq!(m.disk_usage_pct, 0.0);
        assert_eq!(m.network_throughput_mbps, 0.0);
        assert_eq!(m.active_connections, 7);
    }

    #[test]
    fn restart_keeps_disk() {
        let m = NodeMetrics {
            cpu_usage_pct: 50.0,
            memory_usage_pct: 60.0,
            disk_usage_pct: 70.0,
            network_throughput_mbps: 80.0,
            active_connections: 90,
        }
        .after_restart();
        assert_eq!(m.cpu_usage_pct, 0.0);
        assert_eq!(m.memory_usage_pct, 0.0);
        assert_eq!(m.network_throughput_mbps, 0.0);
        assert_eq!(m.active_connections, 0);
        assert_eq!(m.disk_usage_pct, 70.0);
    }

    #[test]
    fn node_serializes_flat() {
        let spec = &stellar_core::config::sample_fleet()[0];
        let node = Node::from_spec(spec, 1000);
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["type"], "storage");
        assert_eq!(json["status"], "online");
        assert_eq!(json["cpu_usage_pct"], 45.5);
        assert_eq!(json["active_connections"], 150);
    }

    #[test]
    fn policy_validation() {
        assert!(AutoScalingPolicy::default().validate().is_ok());

        let inverted = AutoScalingPolicy {
            min_nodes: 5,
            max_nodes: 2,
            ..Default::default()
        };
        assert!(matches!(inverted.validate(), Err(StateError::InvalidConfiguration(_))));

        let out_of_range = AutoScalingPolicy {
            memory_threshold: 120.0,
            ..Default::default()
        };
        assert!(out_of_range.validate().is_err());

        let nan = AutoScalingPolicy {
            cpu_threshold: f64::NAN,
            ..Default::default()
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn policy_from_partial_config() {
        let config = AutoScalingConfig {
            enabled: Some(true),
            max_nodes: Some(6),
            ..Default::default()
        };
        let policy = AutoScalingPolicy::from(&config);
        assert!(policy.enabled);
        assert_eq!(policy.max_nodes, 6);
        assert_eq!(policy.min_nodes, 3);
        assert_eq!(policy.memory_threshold, 85.0);
    }
}
