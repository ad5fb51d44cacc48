//! FleetHistory — time-bounded ring of fleet summaries.
//!
//! The sampler records one snapshot per tick; the ring is trimmed to the
//! retention window on every insert.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::types::{FleetSummary, epoch_secs};

/// A fleet summary stamped with the tick that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FleetSnapshot {
    pub timestamp: u64,
    #[serde(flatten)]
    pub summary: FleetSummary,
}

/// Thread-safe summary history. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct FleetHistory {
    snapshots: Arc<RwLock<VecDeque<FleetSnapshot>>>,
    retention: Duration,
}

impl FleetHistory {
    pub fn new(retention: Duration) -> Self {
        Self {
            snapshots: Arc::new(RwLock::new(VecDeque::new())),
            retention,
        }
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Record a summary taken now.
    pub async fn record(&self, summary: FleetSummary) {
        self.record_at(summary, epoch_secs()).await;
    }

    /// [`record`](Self::record) at an explicit `now`. Snapshots that fall
    /// out of the retention window are dropped in the same step.
    pub async fn record_at(&self, summary: FleetSummary, now: u64) {
        let cutoff = now.saturating_sub(self.retention.as_secs());
        let mut snapshots = self.snapshots.write().await;
        snapshots.push_back(FleetSnapshot {
            timestamp: now,
            summary,
        });
        while snapshots.front().is_some_and(|s| s.timestamp < cutoff) {
            snapshots.pop_front();
        }
    }

    /// Snapshots from the last `since_hours`, oldest first, never reaching
    /// past the retention window.
    pub async fn query(&self, since_hours: u32) -> Vec<FleetSnapshot> {
        self.query_at(since_hours, epoch_secs()).await
    }

    /// [`query`](Self::query) evaluated at an explicit `now`.
    pub async fn query_at(&self, since_hours: u32, now: u64) -> Vec<FleetSnapshot> {
        let window = Duration::from_secs(u64::from(since_hours) * 3600).min(self.retention);
        let cutoff = now.saturating_sub(window.as_secs());
        let snapshots = self.snapshots.read().await;
        snapshots
            .iter()
            .filter(|s| s.timestamp >= cutoff)
            .copied()
            .collect()
    }

    /// The most recent snapshot, if any tick has run.
    pub async fn latest(&self) -> Option<FleetSnapshot> {
        self.snapshots.read().await.back().copied()
    }

    pub async fn len(&self) -> usize {
        self.snapshots.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.snapshots.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: u64 = 3600;
    const NOW: u64 = 2_000_000;

    fn summary(cpu: f64) -> FleetSummary {
        FleetSummary {
            avg_cpu: cpu,
            node_count: 4,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn empty_history() {
        let history = FleetHistory::new(Duration::from_secs(24 * HOUR));
        assert!(history.query(24).await.is_empty());
        assert_eq!(history.latest().await, None);
        assert!(history.is_empty().await);
    }

    #[tokio::test]
    async fn query_by_hours_oldest_first() {
        let history = FleetHistory::new(Duration::from_secs(24 * HOUR));
        history.record_at(summary(10.0), NOW - 5 * HOUR).await;
        history.record_at(summary(20.0), NOW - 2 * HOUR).await;
        history.record_at(summary(30.0), NOW - 60).await;

        let last_hour = history.query_at(1, NOW).await;
        assert_eq!(last_hour.len(), 1);
        assert_eq!(last_hour[0].summary.avg_cpu, 30.0);

        let cpus: Vec<f64> = history
            .query_at(6, NOW)
            .await
            .iter()
            .map(|s| s.summary.avg_cpu)
            .collect();
        assert_eq!(cpus, [10.0, 20.0, 30.0]);
        assert_eq!(history.latest().await.unwrap().timestamp, NOW - 60);
    }

    #[tokio::test]
    async fn record_trims_to_retention() {
        let history = FleetHistory::new(Duration::from_secs(2 * HOUR));
        history.record_at(summary(1.0), NOW - 3 * HOUR).await;
        history.record_at(summary(2.0), NOW - HOUR).await;
        assert_eq!(history.len().await, 2);

        history.record_at(summary(3.0), NOW).await;
        assert_eq!(history.len().await, 2);
        // Wide queries are clamped to the window as well.
        assert_eq!(history.query_at(48, NOW).await.len(), 2);
    }

    #[test]
    fn snapshot_serializes_flat() {
        let snapshot = FleetSnapshot {
            timestamp: 42,
            summary: summary(12.5),
        };
        let json = serde_json::to_value(snapshot).unwrap();
        assert_eq!(json["timestamp"], 42);
        assert_eq!(json["avg_cpu"], 12.5);
        assert_eq!(json["node_count"], 4);
    }
}
