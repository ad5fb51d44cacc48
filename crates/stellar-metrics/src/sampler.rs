//! Sampler — the periodic driver of node metrics.
//!
//! Each tick applies a bounded random walk to every automatic node's
//! readings. The noise source is injectable so tests can drive the walk
//! deterministically.

use std::time::Duration;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use stellar_autoscale::{AutoScalingController, ScaleDecision};
use stellar_health::StatusThresholds;
use stellar_state::*;

use crate::aggregate::summarize;

/// Source of metric noise.
///
/// Each call returns a value in `[-0.5, 0.5)`, scaled per metric by
/// [`WalkAmplitudes`]. Per node the readings are drawn in the order
/// cpu, memory, disk, network, connections.
pub trait Perturbation: Send {
    fn jitter(&mut self) -> f64;
}

impl<F> Perturbation for F
where
    F: FnMut() -> f64 + Send,
{
    fn jitter(&mut self) -> f64 {
        self()
    }
}

/// Uniform noise from a small, fast RNG.
pub struct RandomJitter {
    rng: SmallRng,
}

impl RandomJitter {
    pub fn new() -> Self {
        Self {
            rng: SmallRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomJitter {
    fn default() -> Self {
        Self::new()
    }
}

impl Perturbation for RandomJitter {
    fn jitter(&mut self) -> f64 {
        self.rng.gen_range(-0.5..0.5)
    }
}

/// Full swing of the random walk per metric and tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WalkAmplitudes {
    pub cpu: f64,
    pub memory: f64,
    pub disk: f64,
    pub network: f64,
    pub connections: f64,
}

impl Default for WalkAmplitudes {
    fn default() -> Self {
        Self {
            cpu: 5.0,
            memory: 3.0,
            disk: 2.0,
            network: 10.0,
            connections: 20.0,
        }
    }
}

/// One random-walk step from `prev`, clamped to valid ranges.
pub fn perturb(
    prev: &NodeMetrics,
    amplitudes: &WalkAmplitudes,
    noise: &mut dyn Perturbation,
) -> NodeMetrics {
    let cpu = prev.cpu_usage_pct + noise.jitter() * amplitudes.cpu;
    let memory = prev.memory_usage_pct + noise.jitter() * amplitudes.memory;
    let disk = prev.disk_usage_pct + noise.jitter() * amplitudes.disk;
    let network = prev.network_throughput_mbps + noise.jitter() * amplitudes.network;
    let connections =
        (f64::from(prev.active_connections) + noise.jitter() * amplitudes.connections)
            .round()
            .max(0.0);

    NodeMetrics {
        cpu_usage_pct: cpu,
        memory_usage_pct: memory,
        disk_usage_pct: disk,
        network_throughput_mbps: network,
        active_connections: connections.min(f64::from(u32::MAX)) as u32,
    }
    .clamped()
}

/// What a single tick did.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    /// Nodes whose metrics were updated.
    pub sampled: usize,
    /// Nodes left alone (paused, restarting, or gone mid-tick).
    pub skipped: usize,
    /// History samples dropped by the retention sweep.
    pub evicted: usize,
    pub summary: FleetSummary,
    pub decision: ScaleDecision,
}

/// Periodic sampler. Owned by the background task that drives it.
pub struct Sampler {
    registry: NodeRegistry,
    history: MetricHistoryStore,
    fleet_history: Option<FleetHistory>,
    controller: AutoScalingController,
    thresholds: StatusThresholds,
    amplitudes: WalkAmplitudes,
    interval: Duration,
    noise: Box<dyn Perturbation>,
}

impl Sampler {
    pub fn new(
        registry: NodeRegistry,
        history: MetricHistoryStore,
        controller: AutoScalingController,
        interval: Duration,
    ) -> Self {
        Self {
            registry,
            history,
            fleet_history: None,
            controller,
            thresholds: StatusThresholds::default(),
            amplitudes: WalkAmplitudes::default(),
            interval,
            noise: Box::new(RandomJitter::new()),
        }
    }

    pub fn with_thresholds(mut self, thresholds: StatusThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Record every tick's fleet summary into `fleet_history`.
    pub fn with_fleet_history(mut self, fleet_history: FleetHistory) -> Self {
        self.fleet_history = Some(fleet_history);
        self
    }

    pub fn with_amplitudes(mut self, amplitudes: WalkAmplitudes) -> Self {
        self.amplitudes = amplitudes;
        self
    }

    /// Replace the noise source.
    pub fn with_perturbation(mut self, noise: impl Perturbation + 'static) -> Self {
        self.noise = Box::new(noise);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run one sampling cycle.
    pub async fn tick(&mut self) -> TickReport {
        let now = epoch_secs();
        let nodes = self.registry.list_all().await;
        let mut batch = Vec::with_capacity(nodes.len() * MetricType::ALL.len());
        let mut sampled = 0;
        let mut skipped = 0;

        for node in &nodes {
            if node.status.is_administrative() {
                skipped += 1;
                continue;
            }

            let metrics = perturb(&node.metrics, &self.amplitudes, self.noise.as_mut());
            let status = self.thresholds.evaluate(
                metrics.cpu_usage_pct,
                metrics.memory_usage_pct,
                node.status,
            );

            match self.registry.apply_metric_update(&node.id, metrics, status).await {
                UpdateOutcome::Applied => {
                    sampled += 1;
                    if status != node.status {
                        info!(node_id = %node.id, from = %node.status, to = %status, "node status changed");
                    }
                    let uptime = node.uptime_seconds + now.saturating_sub(node.last_updated);
                    batch.extend(samples_for(&node.id, now, &metrics, uptime));
                }
                UpdateOutcome::Skipped(_) | UpdateOutcome::NotFound => skipped += 1,
            }
        }

        self.history.append_batch(batch).await;
        let evicted = self.history.evict(self.history.retention()).await;

        let summary = summarize(&self.registry.list_all().await);
        if let Some(fleet_history) = &self.fleet_history {
            fleet_history.record(summary).await;
        }
        let decision = self.controller.decide(&summary).await;

        debug!(
            sampled,
            skipped,
            evicted,
            avg_cpu = summary.avg_cpu,
            avg_memory = summary.avg_memory,
            ?decision,
            "sampler tick"
        );

        TickReport {
            sampled,
            skipped,
            evicted,
            summary,
            decision,
        }
    }

    /// Tick on the fixed interval until shutdown is signalled.
    ///
    /// The first tick fires immediately. No tick starts once the shutdown
    /// signal has been observed.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        info!(interval_ms = self.interval.as_millis() as u64, "sampler started");

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                biased;
                _ = shutdown.changed() => {
                    break;
                }
                _ = interval.tick() => {
                    self.tick().await;
                }
            }
        }
        info!("sampler shutting down");
    }
}

/// One sample per metric type; the network sample carries connection
/// count and uptime as auxiliary values.
fn samples_for(node_id: &str, now: u64, metrics: &NodeMetrics, uptime: u64) -> Vec<MetricSample> {
    MetricType::ALL
        .iter()
        .map(|&metric_type| {
            let sample = MetricSample::new(node_id, now, metric_type, metrics.value(metric_type));
            if metric_type == MetricType::Network {
                sample
                    .with_additional("active_connections", f64::from(metrics.active_connections))
                    .with_additional("uptime_seconds", uptime as f64)
            } else {
                sample
            }
        })
        .collect()
}
