//! Auto-scaling controller — policy ownership and scale decisions.
//!
//! The decision itself is a pure function of the summary and the policy.
//! The controller owns the active policy behind a lock so configuration
//! updates and tick evaluations never interleave, and remembers the
//! decision of the latest evaluation.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use stellar_state::{AutoScalingPolicy, FleetSummary, StateResult};

/// Headroom factor below which utilisation counts as comfortably low.
const SCALE_DOWN_FACTOR: f64 = 0.5;

/// Outcome of evaluating fleet utilisation against the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleDecision {
    ScaleUp,
    ScaleDown,
    Noop,
}

/// Decide how the fleet should change size.
pub fn evaluate(summary: &FleetSummary, policy: &AutoScalingPolicy) -> ScaleDecision {
    if !policy.enabled {
        return ScaleDecision::Noop;
    }

    let nodes = summary.node_count;
    if nodes < policy.min_nodes {
        debug!(nodes, min = policy.min_nodes, "fleet below minimum");
        return ScaleDecision::ScaleUp;
    }
    if nodes > policy.max_nodes {
        debug!(nodes, max = policy.max_nodes, "fleet above maximum");
        return ScaleDecision::ScaleDown;
    }

    let hot = summary.avg_cpu > policy.cpu_threshold
        || summary.avg_memory > policy.memory_threshold
        || summary.avg_disk > policy.storage_threshold;
    if hot {
        return if nodes < policy.max_nodes {
            ScaleDecision::ScaleUp
        } else {
            ScaleDecision::Noop
        };
    }

    let cool = summary.avg_cpu < policy.cpu_threshold * SCALE_DOWN_FACTOR
        && summary.avg_memory < policy.memory_threshold * SCALE_DOWN_FACTOR
        && summary.avg_disk < policy.storage_threshold * SCALE_DOWN_FACTOR;
    if cool && nodes > policy.min_nodes {
        return ScaleDecision::ScaleDown;
    }

    ScaleDecision::Noop
}

/// Owns the active policy and the most recent decision.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct AutoScalingController {
    policy: Arc<RwLock<AutoScalingPolicy>>,
    last_decision: Arc<RwLock<ScaleDecision>>,
}

impl AutoScalingController {
    /// Create a controller with a validated initial policy.
    pub fn new(policy: AutoScalingPolicy) -> StateResult<Self> {
        policy.validate()?;
        Ok(Self {
            policy: Arc::new(RwLock::new(policy)),
            last_decision: Arc::new(RwLock::new(ScaleDecision::Noop)),
        })
    }

    /// Copy of the active policy.
    pub async fn policy(&self) -> AutoScalingPolicy {
        self.policy.read().await.clone()
    }

    /// Replace the active policy. Invalid policies are rejected and the
    /// previous one stays in force.
    pub async fn configure(&self, policy: AutoScalingPolicy) -> StateResult<()> {
        if let Err(e) = policy.validate() {
            warn!(error = %e, "auto-scaling policy rejected");
            return Err(e);
        }
        *self.policy.write().await = policy;
        info!("auto-scaling policy updated");
        Ok(())
    }

    pub async fn enable(&self) {
        self.policy.write().await.enabled = true;
        info!("auto-scaling enabled");
    }

    pub async fn disable(&self) {
        self.policy.write().await.enabled = false;
        info!("auto-scaling disabled");
    }

    /// Evaluate `summary` against the active policy and record the result.
    pub async fn decide(&self, summary: &FleetSummary) -> ScaleDecision {
        let policy = self.policy.read().await;
        let decision = evaluate(summary, &policy);
        *self.last_decision.write().await = decision;

        if decision != ScaleDecision::Noop {
            info!(
                ?decision,
                nodes = summary.node_count,
                avg_cpu = summary.avg_cpu,
                avg_memory = summary.avg_memory,
                avg_disk = summary.avg_disk,
                "scaling recommended"
            );
        }
        decision
    }

    /// Decision recorded by the latest [`decide`](Self::decide) call.
    pub async fn last_decision(&self) -> ScaleDecision {
        *self.last_decision.read().await
    }
}
