//! stellar.toml configuration parser.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{NodeType, format_duration, is_percentage, parse_duration};

pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(24 * 3600);
pub const DEFAULT_RESTART_DELAY: Duration = Duration::from_secs(5);
pub const DEFAULT_WARNING_THRESHOLD: f64 = 80.0;
pub const DEFAULT_CRITICAL_THRESHOLD: f64 = 90.0;
pub const DEFAULT_MIN_NODES: u32 = 3;
pub const DEFAULT_MAX_NODES: u32 = 10;
pub const DEFAULT_CPU_SCALE_THRESHOLD: f64 = 80.0;
pub const DEFAULT_MEMORY_SCALE_THRESHOLD: f64 = 85.0;
pub const DEFAULT_STORAGE_SCALE_THRESHOLD: f64 = 90.0;

/// Errors raised while loading or validating a config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("invalid duration for {field}: {value:?}")]
    InvalidDuration { field: &'static str, value: String },

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StellarConfig {
    pub sampler: Option<SamplerConfig>,
    pub status: Option<StatusConfig>,
    pub autoscaling: Option<AutoScalingConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<NodeSpec>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SamplerConfig {
    pub interval: Option<String>,
    pub retention: Option<String>,
    pub restart_delay: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusConfig {
    pub warning_threshold: Option<f64>,
    pub critical_threshold: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AutoScalingConfig {
    pub enabled: Option<bool>,
    pub min_nodes: Option<u32>,
    pub max_nodes: Option<u32>,
    pub cpu_threshold: Option<f64>,
    pub memory_threshold: Option<f64>,
    pub storage_threshold: Option<f64>,
}

/// One entry of the bootstrap node list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub id: String,
    pub name: String,
    pub address: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub location: String,
    pub cpu_usage_pct: Option<f64>,
    pub memory_usage_pct: Option<f64>,
    pub disk_usage_pct: Option<f64>,
    pub network_throughput_mbps: Option<f64>,
    pub active_connections: Option<u32>,
    pub uptime_seconds: Option<u64>,
}

/// Sampler timings with defaults applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerSettings {
    pub interval: Duration,
    pub retention: Duration,
    pub restart_delay: Duration,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_SAMPLE_INTERVAL,
            retention: DEFAULT_RETENTION,
            restart_delay: DEFAULT_RESTART_DELAY,
        }
    }
}

impl StellarConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: StellarConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Resolve sampler timings, falling back to defaults for absent keys.
    pub fn sampler_settings(&self) -> Result<SamplerSettings, ConfigError> {
        let defaults = SamplerSettings::default();
        let Some(sampler) = &self.sampler else {
            return Ok(defaults);
        };
        Ok(SamplerSettings {
            interval: resolve_duration("sampler.interval", &sampler.interval, defaults.interval)?,
            retention: resolve_duration(
                "sampler.retention",
                &sampler.retention,
                defaults.retention,
            )?,
            restart_delay: resolve_duration(
                "sampler.restart_delay",
                &sampler.restart_delay,
                defaults.restart_delay,
            )?,
        })
    }

    /// Warning and critical thresholds for status derivation.
    pub fn status_thresholds(&self) -> (f64, f64) {
        let status = self.status.clone().unwrap_or_default();
        (
            status.warning_threshold.unwrap_or(DEFAULT_WARNING_THRESHOLD),
            status.critical_threshold.unwrap_or(DEFAULT_CRITICAL_THRESHOLD),
        )
    }

    /// The bootstrap fleet. An empty list means the sample fleet.
    pub fn bootstrap_nodes(&self) -> Vec<NodeSpec> {
        if self.nodes.is_empty() {
            sample_fleet()
        } else {
            self.nodes.clone()
        }
    }

    /// Check everything that can be checked without building runtime state.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let settings = self.sampler_settings()?;
        if settings.interval.is_zero() {
            return Err(ConfigError::Invalid("sampler.interval must be non-zero".into()));
        }
        if settings.retention < settings.interval {
            return Err(ConfigError::Invalid(
                "sampler.retention must cover at least one interval".into(),
            ));
        }

        let (warning, critical) = self.status_thresholds();
        if !is_percentage(warning) || !is_percentage(critical) {
            return Err(ConfigError::Invalid(
                "status thresholds must be within [0, 100]".into(),
            ));
        }
        if warning >= critical {
            return Err(ConfigError::Invalid(format!(
                "status.warning_threshold ({warning}) must be below critical_threshold ({critical})"
            )));
        }

        if let Some(autoscaling) = &self.autoscaling {
            autoscaling.validate()?;
        }

        let mut seen = HashSet::new();
        for node in &self.nodes {
            if node.id.trim().is_empty() {
                return Err(ConfigError::Invalid("node id must not be empty".into()));
            }
            if !seen.insert(node.id.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate node id: {}", node.id)));
            }
            node.validate()?;
        }
        Ok(())
    }

    /// Scaffold a config with the sample fleet and default policy.
    pub fn scaffold() -> Self {
        let defaults = SamplerSettings::default();
        StellarConfig {
            sampler: Some(SamplerConfig {
                interval: Some(format_duration(defaults.interval)),
                retention: Some(format_duration(defaults.retention)),
                restart_delay: Some(format_duration(defaults.restart_delay)),
            }),
            status: Some(StatusConfig {
                warning_threshold: Some(DEFAULT_WARNING_THRESHOLD),
                critical_threshold: Some(DEFAULT_CRITICAL_THRESHOLD),
            }),
            autoscaling: Some(AutoScalingConfig {
                enabled: Some(false),
                min_nodes: Some(DEFAULT_MIN_NODES),
                max_nodes: Some(DEFAULT_MAX_NODES),
                cpu_threshold: Some(DEFAULT_CPU_SCALE_THRESHOLD),
                memory_threshold: Some(DEFAULT_MEMORY_SCALE_THRESHOLD),
                storage_threshold: Some(DEFAULT_STORAGE_SCALE_THRESHOLD),
            }),
            nodes: sample_fleet(),
        }
    }
}

impl AutoScalingConfig {
    /// Absent keys take their defaults before the bounds are checked.
    fn validate(&self) -> Result<(), ConfigError> {
        let min = self.min_nodes.unwrap_or(DEFAULT_MIN_NODES);
        let max = self.max_nodes.unwrap_or(DEFAULT_MAX_NODES);
        if min > max {
            return Err(ConfigError::Invalid(format!(
                "autoscaling.min_nodes ({min}) exceeds max_nodes ({max})"
            )));
        }
        let thresholds = [
            ("cpu_threshold", self.cpu_threshold),
            ("memory_threshold", self.memory_threshold),
            ("storage_threshold", self.storage_threshold),
        ];
        for (field, value) in thresholds {
            if let Some(v) = value
                && !is_percentage(v)
            {
                return Err(ConfigError::Invalid(format!(
                    "autoscaling.{field} = {v} is outside [0, 100]"
                )));
            }
        }
        Ok(())
    }
}

impl NodeSpec {
    fn validate(&self) -> Result<(), ConfigError> {
        let percentages = [
            ("cpu_usage_pct", self.cpu_usage_pct),
            ("memory_usage_pct", self.memory_usage_pct),
            ("disk_usage_pct", self.disk_usage_pct),
        ];
        for (field, value) in percentages {
            if let Some(v) = value
                && !is_percentage(v)
            {
                return Err(ConfigError::Invalid(format!(
                    "node {}: {field} = {v} is outside [0, 100]",
                    self.id
                )));
            }
        }
        if let Some(net) = self.network_throughput_mbps
            && !(net >= 0.0 && net.is_finite())
        {
            return Err(ConfigError::Invalid(format!(
                "node {}: network_throughput_mbps = {net} must be non-negative",
                self.id
            )));
        }
        Ok(())
    }
}

fn resolve_duration(
    field: &'static str,
    value: &Option<String>,
    default: Duration,
) -> Result<Duration, ConfigError> {
    match value {
        None => Ok(default),
        Some(raw) => parse_duration(raw).ok_or_else(|| ConfigError::InvalidDuration {
            field,
            value: raw.clone(),
        }),
    }
}

#[allow(clippy::too_many_arguments)]
fn sample_node(
    id: &str,
    name: &str,
    address: &str,
    node_type: NodeType,
    location: &str,
    cpu: f64,
    memory: f64,
    disk: f64,
    network: f64,
    connections: u32,
    uptime: u64,
) -> NodeSpec {
    NodeSpec {
        id: id.to_string(),
        name: name.to_string(),
        address: address.to_string(),
        node_type,
        location: location.to_string(),
        cpu_usage_pct: Some(cpu),
        memory_usage_pct: Some(memory),
        disk_usage_pct: Some(disk),
        network_throughput_mbps: Some(network),
        active_connections: Some(connections),
        uptime_seconds: Some(uptime),
    }
}

/// The four-node fleet used when no nodes are configured.
pub fn sample_fleet() -> Vec<NodeSpec> {
    vec![
        sample_node(
            "node-1", "Storage Node 1", "192.168.1.101", NodeType::Storage, "US-East",
            45.5, 60.2, 75.8, 125.5, 150, 3600,
        ),
        sample_node(
            "node-2", "Compute Node 1", "192.168.1.102", NodeType::Compute, "US-West",
            65.8, 45.3, 55.2, 85.7, 200, 7200,
        ),
        sample_node(
            "node-3", "Gateway Node 1", "192.168.1.103", NodeType::Gateway, "EU",
            85.2, 75.6, 45.8, 250.3, 300, 1800,
        ),
        sample_node(
            "node-4", "Storage Node 2", "192.168.1.104", NodeType::Storage, "Asia",
            95.5, 90.2, 85.8, 45.5, 50, 900,
        ),
    ]
}
