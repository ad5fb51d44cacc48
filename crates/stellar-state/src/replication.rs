//! ReplicationTracker — reported replication status.
//!
//! Replication itself runs outside this process. The tracker only holds
//! what the storage layer last reported: fleet-wide file counters and a
//! per-file-class breakdown of copy counts.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::{StateError, StateResult};
use crate::types::epoch_secs;

/// Fleet-wide replication counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReplicationCounters {
    pub total_files: u64,
    pub replicated_files: u64,
    pub pending_replications: u64,
    pub failed_replications: u64,
}

impl ReplicationCounters {
    /// Fraction of files fully replicated. An empty store counts as 1.
    pub fn replicated_ratio(&self) -> f64 {
        if self.total_files == 0 {
            1.0
        } else {
            self.replicated_files as f64 / self.total_files as f64
        }
    }

    fn validate(&self) -> StateResult<()> {
        let accounted = self
            .replicated_files
            .checked_add(self.pending_replications)
            .and_then(|n| n.checked_add(self.failed_replications));
        match accounted {
            Some(n) if n <= self.total_files => Ok(()),
            _ => Err(StateError::InvalidReport(format!(
                "replicated + pending + failed exceeds total_files ({})",
                self.total_files
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplicationHealth {
    Healthy,
    Warning,
    Critical,
}

/// Copy count reported for one class of files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileClassReplication {
    pub file_type: String,
    pub copies: u32,
    pub status: ReplicationHealth,
}

/// Everything last reported, with the time of the latest report.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReplicationStatus {
    #[serde(flatten)]
    pub counters: ReplicationCounters,
    pub file_classes: Vec<FileClassReplication>,
    /// Unix seconds of the latest report; 0 if nothing was reported yet.
    pub reported_at: u64,
}

/// Thread-safe replication status. Cheap to clone; clones share state.
#[derive(Clone, Default)]
pub struct ReplicationTracker {
    status: Arc<RwLock<ReplicationStatus>>,
}

impl ReplicationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn status(&self) -> ReplicationStatus {
        self.status.read().await.clone()
    }

    /// Replace the fleet-wide counters. Inconsistent counters are rejected
    /// and the previous report stays.
    pub async fn report_counters(&self, counters: ReplicationCounters) -> StateResult<()> {
        if let Err(e) = counters.validate() {
            warn!(error = %e, "replication report rejected");
            return Err(e);
        }
        let mut status = self.status.write().await;
        status.counters = counters;
        status.reported_at = epoch_secs();
        info!(
            total = counters.total_files,
            pending = counters.pending_replications,
            failed = counters.failed_replications,
            "replication counters reported"
        );
        Ok(())
    }

    /// Insert or replace the entry for `class.file_type`. Registration
    /// order is kept.
    pub async fn report_file_class(&self, class: FileClassReplication) -> StateResult<()> {
        if class.file_type.trim().is_empty() {
            return Err(StateError::InvalidReport("file_type must not be empty".into()));
        }
        let mut status = self.status.write().await;
        match status
            .file_classes
            .iter_mut()
            .find(|c| c.file_type == class.file_type)
        {
            Some(existing) => *existing = class,
            None => status.file_classes.push(class),
        }
        status.reported_at = epoch_secs();
        Ok(())
    }

    /// Classes whose last report was not healthy.
    pub async fn degraded_classes(&self) -> Vec<FileClassReplication> {
        let status = self.status.read().await;
        status
            .file_classes
            .iter()
            .filter(|c| c.status != ReplicationHealth::Healthy)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counters(total: u64, replicated: u64, pending: u64, failed: u64) -> ReplicationCounters {
        ReplicationCounters {
            total_files: total,
            replicated_files: replicated,
            pending_replications: pending,
            failed_replications: failed,
        }
    }

    fn class(file_type: &str, copies: u32, status: ReplicationHealth) -> FileClassReplication {
        FileClassReplication {
            file_type: file_type.into(),
            copies,
            status,
        }
    }

    #[tokio::test]
    async fn starts_empty() {
        let tracker = ReplicationTracker::new();
        let status = tracker.status().await;
        assert_eq!(status, ReplicationStatus::default());
        assert_eq!(status.counters.replicated_ratio(), 1.0);
    }

    #[tokio::test]
    async fn report_counters_replaces_previous() {
        let tracker = ReplicationTracker::new();
        tracker.report_counters(counters(10_000, 9_000, 1_000, 0)).await.unwrap();
        let status = tracker.status().await;
        assert_eq!(status.counters.pending_replications, 1_000);
        assert!((status.counters.replicated_ratio() - 0.9).abs() < 1e-12);
        assert!(status.reported_at > 0);

        tracker.report_counters(counters(10_000, 10_000, 0, 0)).await.unwrap();
        assert_eq!(tracker.status().await.counters.replicated_ratio(), 1.0);
    }

    #[tokio::test]
    async fn inconsistent_counters_are_rejected() {
        let tracker = ReplicationTracker::new();
        tracker.report_counters(counters(100, 90, 10, 0)).await.unwrap();

        let err = tracker.report_counters(counters(100, 90, 10, 5)).await.unwrap_err();
        assert!(matches!(err, StateError::InvalidReport(_)));
        assert!(tracker.report_counters(counters(0, u64::MAX, 1, 0)).await.is_err());
        assert_eq!(tracker.status().await.counters, counters(100, 90, 10, 0));
    }

    #[tokio::test]
    async fn file_classes_upsert_in_order() {
        let tracker = ReplicationTracker::new();
        tracker.report_file_class(class("Documents", 3, ReplicationHealth::Healthy)).await.unwrap();
        tracker.report_file_class(class("Videos", 2, ReplicationHealth::Warning)).await.unwrap();
        tracker.report_file_class(class("Archives", 1, ReplicationHealth::Critical)).await.unwrap();
        tracker.report_file_class(class("Videos", 3, ReplicationHealth::Healthy)).await.unwrap();

        let status = tracker.status().await;
        let types: Vec<&str> = status.file_classes.iter().map(|c| c.file_type.as_str()).collect();
        assert_eq!(types, ["Documents", "Videos", "Archives"]);
        assert_eq!(status.file_classes[1].copies, 3);

        let degraded = tracker.degraded_classes().await;
        assert_eq!(degraded.len(), 1);
        assert_eq!(degraded[0].file_type, "Archives");

        assert!(tracker.report_file_class(class(" ", 1, ReplicationHealth::Healthy)).await.is_err());
    }

    #[test]
    fn status_serializes_flat() {
        let status = ReplicationStatus {
            counters: counters(10, 9, 1, 0),
            file_classes: vec![class("Images", 3, ReplicationHealth::Healthy)],
            reported_at: 7,
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["total_files"], 10);
        assert_eq!(json["pending_replications"], 1);
        assert_eq!(json["file_classes"][0]["status"], "healthy");
    }
}
