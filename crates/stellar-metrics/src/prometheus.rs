//! Prometheus text exposition format.
//!
//! Renders node snapshots and the fleet summary into the Prometheus text
//! exposition format for scraping by a Prometheus server or compatible agent.

use std::fmt::Write;

use stellar_state::{FleetSummary, Node, NodeStatus};

fn header(out: &mut String, name: &str, help: &str) {
    let _ = writeln!(out, "# HELP {name} {help}");
    let _ = writeln!(out, "# TYPE {name} gauge");
}

fn node_gauge(out: &mut String, nodes: &[Node], name: &str, help: &str, value: fn(&Node) -> String) {
    header(out, name, help);
    for n in nodes {
        let _ = writeln!(out, "{name}{{node=\"{}\"}} {}", escape(&n.id), value(n));
    }
}

/// Label values may not carry raw quotes, backslashes or newlines.
fn escape(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

/// Render per-node gauges (labelled by `node`) followed by fleet aggregates.
///
/// Node status is exported as a one-hot gauge: one series per node and
/// status name in the `status` label, valued 1 for the current status and
/// 0 for the other four.
pub fn render_prometheus(nodes: &[Node], summary: &FleetSummary) -> String {
    let mut out = String::new();

    node_gauge(&mut out, nodes, "stellar_node_cpu_usage_pct", "CPU usage percentage.", |n| {
        format!("{:.2}", n.metrics.cpu_usage_pct)
    });
    node_gauge(&mut out, nodes, "stellar_node_memory_usage_pct", "Memory usage percentage.", |n| {
        format!("{:.2}", n.metrics.memory_usage_pct)
    });
    node_gauge(&mut out, nodes, "stellar_node_disk_usage_pct", "Disk usage percentage.", |n| {
        format!("{:.2}", n.metrics.disk_usage_pct)
    });
    node_gauge(
        &mut out,
        nodes,
        "stellar_node_network_throughput_mbps",
        "Network throughput in Mbps.",
        |n| format!("{:.2}", n.metrics.network_throughput_mbps),
    );
    node_gauge(&mut out, nodes, "stellar_node_active_connections", "Open connections.", |n| {
        n.metrics.active_connections.to_string()
    });
    node_gauge(&mut out, nodes, "stellar_node_uptime_seconds", "Seconds since last restart.", |n| {
        n.uptime_seconds.to_string()
    });

    header(&mut out, "stellar_node_status", "Node status, 1 for the current status and 0 otherwise.");
    for n in nodes {
        let id = escape(&n.id);
        for status in NodeStatus::ALL {
            let _ = writeln!(
                out,
                "stellar_node_status{{node=\"{id}\",status=\"{status}\"}} {}",
                u8::from(n.status == status)
            );
        }
    }

    let fleet = [
        ("stellar_fleet_avg_cpu_pct", "Average CPU usage across the fleet.", format!("{:.2}", summary.avg_cpu)),
        ("stellar_fleet_avg_memory_pct", "Average memory usage across the fleet.", format!("{:.2}", summary.avg_memory)),
        ("stellar_fleet_avg_disk_pct", "Average disk usage across the fleet.", format!("{:.2}", summary.avg_disk)),
        (
            "stellar_fleet_network_throughput_mbps",
            "Total network throughput across the fleet.",
            format!("{:.2}", summary.total_network_throughput),
        ),
        (
            "stellar_fleet_active_connections",
            "Total open connections across the fleet.",
            summary.total_active_connections.to_string(),
        ),
        ("stellar_fleet_nodes", "Number of nodes in the fleet.", summary.node_count.to_string()),
        ("stellar_fleet_online_nodes", "Number of nodes currently online.", summary.online_nodes.to_string()),
    ];
    for (name, help, value) in fleet {
        header(&mut out, name, help);
        let _ = writeln!(out, "{name} {value}");
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use stellar_state::{NodeMetrics, NodeType};

    fn test_node(id: &str) -> Node {
        Node {
            id: id.to_string(),
            name: format!("Node {id}"),
            address: "10.0.0.1".into(),
            node_type: NodeType::Compute,
            location: "US-East".into(),
            status: NodeStatus::WARNING,
            metrics: NodeMetrics {
                cpu_usage_pct: 85.2,
                memory_usage_pct: 75.6,
                disk_usage_pct: 45.8,
                network_throughput_mbps: 250.3,
                active_connections: 300,
            },
            last_updated: 1000,
            uptime_seconds: 1800,
        }
    }

    #[test]
    fn render_empty() {
        let output = render_prometheus(&[], &FleetSummary::default());
        // Declarations are emitted even with no nodes.
        assert!(output.contains("# HELP stellar_node_cpu_usage_pct"));
        assert!(output.contains("# TYPE stellar_node_cpu_usage_pct gauge"));
        assert!(output.contains("stellar_fleet_nodes 0\n"));
        assert!(output.contains("stellar_fleet_avg_cpu_pct 0.00\n"));
    }

    #[test]
    fn render_single_node() {
        let nodes = vec![test_node("node-3")];
        let summary = crate::summarize(&nodes);
        let output = render_prometheus(&nodes, &summary);

        assert!(output.contains("stellar_node_cpu_usage_pct{node=\"node-3\"} 85.20"));
        assert!(output.contains("stellar_node_memory_usage_pct{node=\"node-3\"} 75.60"));
        assert!(output.contains("stellar_node_disk_usage_pct{node=\"node-3\"} 45.80"));
        assert!(output.contains("stellar_node_network_throughput_mbps{node=\"node-3\"} 250.30"));
        assert!(output.contains("stellar_node_active_connections{node=\"node-3\"} 300"));
        assert!(output.contains("stellar_node_uptime_seconds{node=\"node-3\"} 1800"));
        assert!(output.contains("stellar_node_status{node=\"node-3\",status=\"warning\"} 1"));
        assert!(output.contains("stellar_fleet_nodes 1\n"));
        assert!(output.contains("stellar_fleet_online_nodes 0\n"));
        assert!(output.contains("stellar_fleet_active_connections 300\n"));
    }

    #[test]
    fn status_gauge_covers_every_status() {
        let mut paused = test_node("node-2");
        paused.status = NodeStatus::PAUSED;
        let nodes = vec![test_node("node-1"), paused];
        let output = render_prometheus(&nodes, &crate::summarize(&nodes));

        let status_lines: Vec<&str> = output
            .lines()
            .filter(|l| l.starts_with("stellar_node_status{"))
            .collect();
        assert_eq!(status_lines.len(), 10);
        assert_eq!(status_lines.iter().filter(|l| l.ends_with(" 1")).count(), 2);

        for status in ["online", "critical", "paused", "restarting"] {
            assert!(output.contains(&format!(
                "stellar_node_status{{node=\"node-1\",status=\"{status}\"}} 0\n"
            )));
        }
        assert!(output.contains("stellar_node_status{node=\"node-1\",status=\"warning\"} 1\n"));
        assert!(output.contains("stellar_node_status{node=\"node-2\",status=\"paused\"} 1\n"));
        assert!(output.contains("stellar_node_status{node=\"node-2\",status=\"warning\"} 0\n"));
    }

    #[test]
    fn render_multiple_nodes() {
        let nodes = vec![test_node("node-1"), test_node("node-2")];
        let output = render_prometheus(&nodes, &crate::summarize(&nodes));

        assert!(output.contains("node=\"node-1\""));
        assert!(output.contains("node=\"node-2\""));
        assert!(output.contains("stellar_fleet_nodes 2\n"));
    }

    #[test]
    fn label_values_are_escaped() {
        let nodes = vec![test_node("we\"ird")];
        let output = render_prometheus(&nodes, &FleetSummary::default());
        assert!(output.contains("node=\"we\\\"ird\""));
    }

    #[test]
    fn render_format_is_prometheus_compatible() {
        let nodes = vec![test_node("test")];
        let output = render_prometheus(&nodes, &crate::summarize(&nodes));

        // Every sample line is `name{labels} value` or `name value`.
        for line in output.lines() {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (series, value) = line.rsplit_once(' ').expect("sample line has a value");
            assert!(value.parse::<f64>().is_ok(), "bad value in: {line}");
            if series.starts_with("stellar_node_") {
                assert!(
                    series.contains('{') && series.ends_with('}'),
                    "node series should have labels: {line}"
                );
            } else {
                assert!(series.starts_with("stellar_fleet_"), "unexpected series: {line}");
            }
        }
    }
}
