//! Fleet aggregation — averages and totals over a node listing.

use stellar_state::{FleetSummary, Node, NodeStatus};

/// Summarize the given nodes.
///
/// Averages are arithmetic means over every listed node, paused and
/// restarting ones included. An empty slice yields the all-zero summary.
/// Always computed fresh; nodes change every tick.
pub fn summarize(nodes: &[Node]) -> FleetSummary {
    if nodes.is_empty() {
        return FleetSummary::default();
    }

    let count = nodes.len() as f64;
    let mean = |f: fn(&Node) -> f64| nodes.iter().map(f).sum::<f64>() / count;

    FleetSummary {
        avg_cpu: mean(|n| n.metrics.cpu_usage_pct),
        avg_memory: mean(|n| n.metrics.memory_usage_pct),
        avg_disk: mean(|n| n.metrics.disk_usage_pct),
        total_network_throughput: nodes.iter().map(|n| n.metrics.network_throughput_mbps).sum(),
        total_active_connections: nodes
            .iter()
            .map(|n| u64::from(n.metrics.active_connections))
            .sum(),
        node_count: nodes.len() as u32,
        online_nodes: nodes
            .iter()
            .filter(|n| n.status == NodeStatus::ONLINE)
            .count() as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stellar_core::config::sample_fleet;

    fn fleet() -> Vec<Node> {
        sample_fleet().iter().map(|s| Node::from_spec(s, 0)).collect()
    }

    #[test]
    fn empty_fleet_is_all_zero() {
        let summary = summarize(&[]);
        assert_eq!(summary, FleetSummary::default());
        assert_eq!(summary.avg_cpu, 0.0);
        assert_eq!(summary.total_active_connections, 0);
        assert!(!summary.avg_memory.is_nan());
    }

    #[test]
    fn averages_and_totals() {
        let summary = summarize(&fleet());
        assert!((summary.avg_cpu - (45.5 + 65.8 + 85.2 + 95.5) / 4.0).abs() < 1e-9);
        assert!((summary.avg_memory - (60.2 + 45.3 + 75.6 + 90.2) / 4.0).abs() < 1e-9);
        assert!((summary.avg_disk - (75.8 + 55.2 + 45.8 + 85.8) / 4.0).abs() < 1e-9);
        assert!((summary.total_network_throughput - (125.5 + 85.7 + 250.3 + 45.5)).abs() < 1e-9);
        assert_eq!(summary.total_active_connections, 150 + 200 + 300 + 50);
        assert_eq!(summary.node_count, 4);
    }

    #[test]
    fn online_count_excludes_other_states() {
        let mut nodes = fleet();
        nodes[1].status = NodeStatus::PAUSED;
        nodes[2].status = NodeStatus::WARNING;
        let summary = summarize(&nodes);
        assert_eq!(summary.online_nodes, 2);
        assert_eq!(summary.node_count, 4);
    }

    #[test]
    fn single_node() {
        let nodes = &fleet()[..1];
        let summary = summarize(nodes);
        assert_eq!(summary.avg_cpu, 45.5);
        assert_eq!(summary.total_network_throughput, 125.5);
    }
}
