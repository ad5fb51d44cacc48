//! Fleet health report derived from a fleet summary.

use serde::{Deserialize, Serialize};

use stellar_state::{AutoScalingPolicy, FleetSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallHealth {
    Healthy,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceHealth {
    Ok,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodesHealth {
    Ok,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub overall: OverallHealth,
    pub cpu: ResourceHealth,
    pub memory: ResourceHealth,
    pub storage: ResourceHealth,
    pub nodes: NodesHealth,
}

fn level(value: f64, threshold: f64) -> ResourceHealth {
    if value < threshold {
        ResourceHealth::Ok
    } else {
        ResourceHealth::High
    }
}

/// Condense a summary into ok/high flags against the policy thresholds.
///
/// `nodes` is ok only when every listed node is online; an empty fleet
/// counts as ok.
pub fn health_report(summary: &FleetSummary, policy: &AutoScalingPolicy) -> HealthReport {
    let cpu = level(summary.avg_cpu, policy.cpu_threshold);
    let memory = level(summary.avg_memory, policy.memory_threshold);
    let storage = level(summary.avg_disk, policy.storage_threshold);
    let nodes = if summary.online_nodes == summary.node_count {
        NodesHealth::Ok
    } else {
        NodesHealth::Warning
    };

    let all_ok = [cpu, memory, storage]
        .iter()
        .all(|r| *r == ResourceHealth::Ok)
        && nodes == NodesHealth::Ok;

    HealthReport {
        overall: if all_ok {
            OverallHealth::Healthy
        } else {
            OverallHealth::Warning
        },
        cpu,
        memory,
        storage,
        nodes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(cpu: f64, memory: f64, disk: f64, online: u32, total: u32) -> FleetSummary {
        FleetSummary {
            avg_cpu: cpu,
            avg_memory: memory,
            avg_disk: disk,
            node_count: total,
            online_nodes: online,
            ..Default::default()
        }
    }

    #[test]
    fn healthy_fleet() {
        let report = health_report(&summary(40.0, 50.0, 60.0, 4, 4), &AutoScalingPolicy::default());
        assert_eq!(report.overall, OverallHealth::Healthy);
        assert_eq!(report.cpu, ResourceHealth::Ok);
        assert_eq!(report.nodes, NodesHealth::Ok);
    }

    #[test]
    fn each_resource_flags_independently() {
        let policy = AutoScalingPolicy::default();

        let report = health_report(&summary(80.0, 50.0, 60.0, 4, 4), &policy);
        assert_eq!(report.cpu, ResourceHealth::High);
        assert_eq!(report.memory, ResourceHealth::Ok);
        assert_eq!(report.overall, OverallHealth::Warning);

        let report = health_report(&summary(10.0, 86.0, 95.0, 4, 4), &policy);
        assert_eq!(report.cpu, ResourceHealth::Ok);
        assert_eq!(report.memory, ResourceHealth::High);
        assert_eq!(report.storage, ResourceHealth::High);
    }

    #[test]
    fn degraded_node_count() {
        let report = health_report(&summary(10.0, 10.0, 10.0, 3, 4), &AutoScalingPolicy::default());
        assert_eq!(report.nodes, NodesHealth::Warning);
        assert_eq!(report.overall, OverallHealth::Warning);
    }

    #[test]
    fn empty_fleet_is_healthy() {
        let report = health_report(&FleetSummary::default(), &AutoScalingPolicy::default());
        assert_eq!(report.overall, OverallHealth::Healthy);
    }

    #[test]
    fn serializes_snake_case() {
        let report = health_report(&summary(95.0, 10.0, 10.0, 4, 4), &AutoScalingPolicy::default());
        let json = serde_json::to_value(report).unwrap();
        assert_eq!(json["overall"], "warning");
        assert_eq!(json["cpu"], "high");
        assert_eq!(json["nodes"], "ok");
    }
}
