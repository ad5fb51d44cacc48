//! Status evaluator — pure mapping from load to node status.

use serde::{Deserialize, Serialize};
use tracing::trace;

use stellar_state::NodeStatus;

/// Load levels above which a node is marked warning or critical.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatusThresholds {
    pub warning: f64,
    pub critical: f64,
}

impl Default for StatusThresholds {
    fn default() -> Self {
        Self {
            warning: 80.0,
            critical: 90.0,
        }
    }
}

impl StatusThresholds {
    pub fn new(warning: f64, critical: f64) -> Self {
        Self { warning, critical }
    }

    /// Derive the next status from CPU and memory usage.
    ///
    /// Both comparisons are strict: exactly 90% is a warning, not critical.
    /// Administrative states pass through untouched.
    pub fn evaluate(&self, cpu: f64, memory: f64, previous: NodeStatus) -> NodeStatus {
        if previous.is_administrative() {
            return previous;
        }
        let next = if cpu > self.critical || memory > self.critical {
            NodeStatus::CRITICAL
        } else if cpu > self.warning || memory > self.warning {
            NodeStatus::WARNING
        } else {
            NodeStatus::ONLINE
        };
        if next != previous {
            trace!(%previous, %next, cpu, memory, "status transition");
        }
        next
    }
}

/// [`StatusThresholds::evaluate`] with the default 80/90 thresholds.
pub fn evaluate_status(cpu: f64, memory: f64, previous: NodeStatus) -> NodeStatus {
    StatusThresholds::default().evaluate(cpu, memory, previous)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_node_fleet() {
        let cpu = [45.0, 65.0, 85.0, 95.0];
        let memory = [60.0, 45.0, 75.0, 90.0];
        let statuses: Vec<NodeStatus> = cpu
            .iter()
            .zip(memory)
            .map(|(&c, m)| evaluate_status(c, m, NodeStatus::ONLINE))
            .collect();
        assert_eq!(
            statuses,
            [
                NodeStatus::ONLINE,
                NodeStatus::ONLINE,
                NodeStatus::WARNING,
                NodeStatus::CRITICAL
            ]
        );
    }

    #[test]
    fn memory_alone_triggers() {
        assert_eq!(evaluate_status(10.0, 85.0, NodeStatus::ONLINE), NodeStatus::WARNING);
        assert_eq!(evaluate_status(10.0, 91.0, NodeStatus::ONLINE), NodeStatus::CRITICAL);
    }

    #[test]
    fn boundaries_are_strict() {
        assert_eq!(evaluate_status(80.0, 80.0, NodeStatus::ONLINE), NodeStatus::ONLINE);
        assert_eq!(evaluate_status(90.0, 0.0, NodeStatus::ONLINE), NodeStatus::WARNING);
        assert_eq!(evaluate_status(90.01, 0.0, NodeStatus::ONLINE), NodeStatus::CRITICAL);
    }

    #[test]
    fn recovers_from_critical() {
        assert_eq!(evaluate_status(20.0, 20.0, NodeStatus::CRITICAL), NodeStatus::ONLINE);
        assert_eq!(evaluate_status(85.0, 20.0, NodeStatus::CRITICAL), NodeStatus::WARNING);
    }

    #[test]
    fn administrative_states_are_sticky() {
        for previous in [NodeStatus::PAUSED, NodeStatus::RESTARTING] {
            assert_eq!(evaluate_status(99.0, 99.0, previous), previous);
            assert_eq!(evaluate_status(0.0, 0.0, previous), previous);
        }
    }

    #[test]
    fn re_evaluation_is_idempotent() {
        let once = evaluate_status(83.0, 40.0, NodeStatus::ONLINE);
        let twice = evaluate_status(83.0, 40.0, once);
        assert_eq!(once, twice);
    }

    #[test]
    fn custom_thresholds() {
        let thresholds = StatusThresholds::new(50.0, 70.0);
        assert_eq!(thresholds.evaluate(60.0, 0.0, NodeStatus::ONLINE), NodeStatus::WARNING);
        assert_eq!(thresholds.evaluate(0.0, 75.0, NodeStatus::ONLINE), NodeStatus::CRITICAL);
    }
}
