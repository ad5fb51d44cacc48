//! Fleet monitor — the query and administration facade.
//!
//! Wires the registry, history store, status thresholds and auto-scaling
//! controller together. A host (CLI, HTTP layer) talks to the fleet only
//! through this type and drives the [`Sampler`] it hands out.

use std::time::Duration;

use thiserror::Error;
use tracing::info;

use stellar_autoscale::{AutoScalingController, ScaleDecision, evaluate};
use stellar_core::{ConfigError, StellarConfig};
use stellar_health::{HealthReport, StatusThresholds, health_report};
use stellar_state::*;

use crate::aggregate::summarize;
use crate::sampler::Sampler;

/// Errors raised while assembling or operating the monitor.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("state error: {0}")]
    State(#[from] StateError),
}

/// Handle to the monitored fleet. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct FleetMonitor {
    registry: NodeRegistry,
    history: MetricHistoryStore,
    fleet_history: FleetHistory,
    replication: ReplicationTracker,
    controller: AutoScalingController,
    thresholds: StatusThresholds,
    interval: Duration,
}

impl FleetMonitor {
    /// Build the fleet described by `config`, validating it first.
    pub fn from_config(config: &StellarConfig) -> Result<Self, MonitorError> {
        config.validate()?;
        let settings = config.sampler_settings()?;
        let (warning, critical) = config.status_thresholds();
        let policy = config
            .autoscaling
            .as_ref()
            .map(AutoScalingPolicy::from)
            .unwrap_or_default();

        Self::new(
            &config.bootstrap_nodes(),
            policy,
            StatusThresholds::new(warning, critical),
            settings.interval,
            settings.retention,
            settings.restart_delay,
        )
    }

    /// Build a fleet from explicit parts. Initial statuses are derived
    /// from each node's bootstrap readings. A zero interval is rejected.
    pub fn new(
        specs: &[NodeSpec],
        policy: AutoScalingPolicy,
        thresholds: StatusThresholds,
        interval: Duration,
        retention: Duration,
        restart_delay: Duration,
    ) -> Result<Self, MonitorError> {
        if interval.is_zero() {
            return Err(StateError::InvalidConfiguration(
                "sampler interval must be non-zero".into(),
            )
            .into());
        }
        let controller = AutoScalingController::new(policy)?;

        let now = epoch_secs();
        let nodes: Vec<Node> = specs
            .iter()
            .map(|spec| {
                let mut node = Node::from_spec(spec, now);
                node.metrics = node.metrics.clamped();
                node.status = thresholds.evaluate(
                    node.metrics.cpu_usage_pct,
                    node.metrics.memory_usage_pct,
                    NodeStatus::ONLINE,
                );
                node
            })
            .collect();
        info!(nodes = nodes.len(), "fleet registry initialized");

        Ok(Self {
            registry: NodeRegistry::new(nodes, restart_delay),
            history: MetricHistoryStore::new(retention),
            fleet_history: FleetHistory::new(retention),
            replication: ReplicationTracker::new(),
            controller,
            thresholds,
            interval,
        })
    }

    /// A sampler over this fleet, using random noise. Each tick's summary
    /// lands in [`summary_history`](Self::summary_history).
    pub fn sampler(&self) -> Sampler {
        Sampler::new(
            self.registry.clone(),
            self.history.clone(),
            self.controller.clone(),
            self.interval,
        )
        .with_thresholds(self.thresholds)
        .with_fleet_history(self.fleet_history.clone())
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    // ── Queries ────────────────────────────────────────────────────

    pub async fn list_nodes(&self) -> Vec<Node> {
        self.registry.list_all().await
    }

    pub async fn node(&self, id: &str) -> Option<Node> {
        self.registry.get(id).await
    }

    pub async fn nodes_by_status(&self, status: NodeStatus) -> Vec<Node> {
        self.registry.filter_by_status(status).await
    }

    pub async fn nodes_by_type(&self, node_type: NodeType) -> Vec<Node> {
        self.registry.filter_by_type(node_type).await
    }

    pub async fn nodes_by_location(&self, location: &str) -> Vec<Node> {
        self.registry.filter_by_location(location).await
    }

    /// Samples for one node and metric over the last `hours`. Unknown
    /// nodes yield an empty list.
    pub async fn history(&self, node_id: &str, metric: MetricType, hours: u32) -> Vec<MetricSample> {
        self.history.query(node_id, metric, hours).await
    }

    /// Fleet summary computed from the current snapshot.
    pub async fn summary(&self) -> FleetSummary {
        summarize(&self.registry.list_all().await)
    }

    /// Fleet summaries recorded by the sampler over the last `hours`,
    /// oldest first.
    pub async fn summary_history(&self, hours: u32) -> Vec<FleetSnapshot> {
        self.fleet_history.query(hours).await
    }

    pub async fn health(&self) -> HealthReport {
        let summary = self.summary().await;
        health_report(&summary, &self.controller.policy().await)
    }

    // ── Administration ─────────────────────────────────────────────

    pub async fn restart(&self, id: &str) -> Result<(), MonitorError> {
        Ok(self.registry.restart(id).await?)
    }

    pub async fn pause(&self, id: &str) -> Result<(), MonitorError> {
        Ok(self.registry.pause(id).await?)
    }

    pub async fn resume(&self, id: &str) -> Result<(), MonitorError> {
        Ok(self.registry.resume(id).await?)
    }

    // ── Replication ────────────────────────────────────────────────

    pub async fn replication_status(&self) -> ReplicationStatus {
        self.replication.status().await
    }

    pub async fn report_replication(&self, counters: ReplicationCounters) -> Result<(), MonitorError> {
        Ok(self.replication.report_counters(counters).await?)
    }

    pub async fn report_file_class(&self, class: FileClassReplication) -> Result<(), MonitorError> {
        Ok(self.replication.report_file_class(class).await?)
    }

    // ── Auto-scaling ───────────────────────────────────────────────

    pub async fn policy(&self) -> AutoScalingPolicy {
        self.controller.policy().await
    }

    pub async fn configure_autoscaling(&self, policy: AutoScalingPolicy) -> Result<(), MonitorError> {
        Ok(self.controller.configure(policy).await?)
    }

    pub async fn enable_autoscaling(&self) {
        self.controller.enable().await;
    }

    pub async fn disable_autoscaling(&self) {
        self.controller.disable().await;
    }

    /// Evaluate the current fleet against the active policy. Does not
    /// touch the decision recorded by the sampler.
    pub async fn scale_decision(&self) -> ScaleDecision {
        let summary = self.summary().await;
        evaluate(&summary, &self.controller.policy().await)
    }

    /// Decision recorded by the latest sampler tick.
    pub async fn last_scale_decision(&self) -> ScaleDecision {
        self.controller.last_decision().await
    }

    /// Cancel pending restarts and reject new ones. The sampler is stopped
    /// through its own shutdown channel.
    pub async fn shutdown(&self) {
        self.registry.shutdown().await;
    }
}
