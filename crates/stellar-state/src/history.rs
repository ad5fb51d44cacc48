//! MetricHistoryStore — per-node, time-bounded sample history.
//!
//! Samples are kept in insertion order per node and dropped once they
//! fall outside the retention window. Queries for nodes without history
//! return an empty sequence.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::debug;

use crate::types::*;

/// Thread-safe metric history. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct MetricHistoryStore {
    samples: Arc<RwLock<HashMap<NodeId, VecDeque<MetricSample>>>>,
    retention: Duration,
}

impl MetricHistoryStore {
    pub fn new(retention: Duration) -> Self {
        Self {
            samples: Arc::new(RwLock::new(HashMap::new())),
            retention,
        }
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Append one sample, creating the node's sequence on first use.
    pub async fn append(&self, sample: MetricSample) {
        let mut samples = self.samples.write().await;
        samples
            .entry(sample.node_id.clone())
            .or_default()
            .push_back(sample);
    }

    /// Append a tick's worth of samples under a single lock.
    pub async fn append_batch(&self, batch: Vec<MetricSample>) {
        let mut samples = self.samples.write().await;
        for sample in batch {
            samples
                .entry(sample.node_id.clone())
                .or_default()
                .push_back(sample);
        }
    }

    /// Samples of `metric_type` for `node_id` from the last `since_hours`,
    /// oldest first. The window never reaches past the retention window.
    pub async fn query(
        &self,
        node_id: &str,
        metric_type: MetricType,
        since_hours: u32,
    ) -> Vec<MetricSample> {
        self.query_at(node_id, metric_type, since_hours, epoch_secs())
            .await
    }

    /// [`query`](Self::query) evaluated at an explicit `now`.
    pub async fn query_at(
        &self,
        node_id: &str,
        metric_type: MetricType,
        since_hours: u32,
        now: u64,
    ) -> Vec<MetricSample> {
        let window = Duration::from_secs(u64::from(since_hours) * 3600).min(self.retention);
        let cutoff = now.saturating_sub(window.as_secs());

        let samples = self.samples.read().await;
        samples
            .get(node_id)
            .map(|seq| {
                seq.iter()
                    .filter(|s| s.metric_type == metric_type && s.timestamp >= cutoff)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Drop every sample older than `retention`. Returns how many went.
    pub async fn evict(&self, retention: Duration) -> usize {
        self.evict_at(retention, epoch_secs()).await
    }

    /// [`evict`](Self::evict) evaluated at an explicit `now`.
    pub async fn evict_at(&self, retention: Duration, now: u64) -> usize {
        let cutoff = now.saturating_sub(retention.as_secs());
        let mut samples = self.samples.write().await;
        let mut evicted = 0;
        for seq in samples.values_mut() {
            let before = seq.len();
            seq.retain(|s| s.timestamp >= cutoff);
            evicted += before - seq.len();
        }
        samples.retain(|_, seq| !seq.is_empty());
        if evicted > 0 {
            debug!(evicted, cutoff, "metric history evicted");
        }
        evicted
    }

    /// Total samples held for a node, across all metric types.
    pub async fn sample_count(&self, node_id: &str) -> usize {
        let samples = self.samples.read().await;
        samples.get(node_id).map(VecDeque::len).unwrap_or(0)
    }

    /// Timestamp of the oldest sample held for any node.
    pub async fn oldest_timestamp(&self) -> Option<u64> {
        let samples = self.samples.read().await;
        samples
            .values()
            .filter_map(|seq| seq.iter().map(|s| s.timestamp).min())
            .min()
    }
}
