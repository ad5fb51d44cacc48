//! NodeRegistry — the authoritative, lock-guarded set of nodes.
//!
//! A single `RwLock` serializes the sampler's metric writes against
//! administrative transitions, so a tick never overwrites an in-flight
//! pause or restart. Readers always receive copies.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{StateError, StateResult};
use crate::types::*;

/// Result of [`NodeRegistry::apply_metric_update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The snapshot and status were replaced.
    Applied,
    /// The node is under administrative control; nothing changed.
    Skipped(NodeStatus),
    /// No node with that id exists.
    NotFound,
}

struct PendingRestart {
    generation: u64,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct Fleet {
    nodes: Vec<Node>,
    pending_restarts: HashMap<NodeId, PendingRestart>,
    next_generation: u64,
}

impl Fleet {
    fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    fn cancel_restart(&mut self, id: &str) {
        if let Some(pending) = self.pending_restarts.remove(id) {
            pending.handle.abort();
            debug!(node_id = %id, generation = pending.generation, "pending restart cancelled");
        }
    }
}

struct Inner {
    fleet: RwLock<Fleet>,
    restart_delay: Duration,
    shutdown: watch::Sender<bool>,
}

/// Thread-safe node registry. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct NodeRegistry {
    inner: Arc<Inner>,
}

impl NodeRegistry {
    /// Create a registry owning `nodes`. Registration order is preserved
    /// in every listing.
    pub fn new(nodes: Vec<Node>, restart_delay: Duration) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                fleet: RwLock::new(Fleet {
                    nodes,
                    ..Default::default()
                }),
                restart_delay,
                shutdown,
            }),
        }
    }

    pub fn restart_delay(&self) -> Duration {
        self.inner.restart_delay
    }

    // ── Queries ────────────────────────────────────────────────────

    /// Point-in-time copy of every node.
    pub async fn list_all(&self) -> Vec<Node> {
        self.inner.fleet.read().await.nodes.clone()
    }

    pub async fn get(&self, id: &str) -> Option<Node> {
        let fleet = self.inner.fleet.read().await;
        fleet.nodes.iter().find(|n| n.id == id).cloned()
    }

    pub async fn filter_by_status(&self, status: NodeStatus) -> Vec<Node> {
        self.filter(|n| n.status == status).await
    }

    pub async fn filter_by_type(&self, node_type: NodeType) -> Vec<Node> {
        self.filter(|n| n.node_type == node_type).await
    }

    pub async fn filter_by_location(&self, location: &str) -> Vec<Node> {
        self.filter(|n| n.location == location).await
    }

    pub async fn len(&self) -> usize {
        self.inner.fleet.read().await.nodes.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn filter<F>(&self, predicate: F) -> Vec<Node>
    where
        F: Fn(&Node) -> bool,
    {
        let fleet = self.inner.fleet.read().await;
        fleet.nodes.iter().filter(|n| predicate(n)).cloned().collect()
    }

    // ── Sampler writes ─────────────────────────────────────────────

    /// Atomically replace one node's snapshot and automatic status.
    ///
    /// Unknown ids are a no-op. A node found in `paused` or `restarting`
    /// keeps its snapshot untouched, so an administrative transition that
    /// landed after the sampler read the fleet is never overwritten.
    /// An administrative `status` argument is ignored; only the
    /// administrator sets those.
    pub async fn apply_metric_update(
        &self,
        id: &str,
        metrics: NodeMetrics,
        status: NodeStatus,
    ) -> UpdateOutcome {
        let mut fleet = self.inner.fleet.write().await;
        let Some(node) = fleet.node_mut(id) else {
            return UpdateOutcome::NotFound;
        };
        if node.status.is_administrative() {
            debug!(node_id = %id, status = %node.status, "metric update skipped");
            return UpdateOutcome::Skipped(node.status);
        }

        let now = epoch_secs();
        node.uptime_seconds += now.saturating_sub(node.last_updated);
        node.metrics = metrics.clamped();
        if !status.is_administrative() {
            node.status = status;
        }
        node.last_updated = now;
        UpdateOutcome::Applied
    }

    // ── Administrative operations ──────────────────────────────────

    /// Put a node into `restarting`, zero its load, and schedule the
    /// transition back to `online` after the restart delay.
    ///
    /// Returns as soon as the transition is scheduled. Restarting a node
    /// that is already restarting supersedes the earlier timer.
    pub async fn restart(&self, id: &str) -> StateResult<()> {
        let mut fleet = self.inner.fleet.write().await;
        if self.is_shut_down() {
            warn!(node_id = %id, "restart rejected during shutdown");
            return Err(StateError::ShuttingDown);
        }
        let now = epoch_secs();
        let Some(node) = fleet.node_mut(id) else {
            warn!(node_id = %id, "restart of unknown node");
            return Err(StateError::NotFound(id.to_string()));
        };
        node.status = NodeStatus::RESTARTING;
        node.metrics = node.metrics.after_restart();
        node.uptime_seconds = 0;
        node.last_updated = now;

        fleet.cancel_restart(id);
        fleet.next_generation += 1;
        let generation = fleet.next_generation;

        let registry = self.clone();
        let node_id = id.to_string();
        let delay = self.inner.restart_delay;
        let mut shutdown = self.inner.shutdown.subscribe();
        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {
                    registry.complete_restart(&node_id, generation).await;
                }
                _ = shutdown.changed() => {
                    debug!(%node_id, "restart timer dropped on shutdown");
                }
            }
        });
        fleet
            .pending_restarts
            .insert(id.to_string(), PendingRestart { generation, handle });

        info!(node_id = %id, delay_ms = delay.as_millis() as u64, "node restarting");
        Ok(())
    }

    async fn complete_restart(&self, id: &str, generation: u64) {
        let mut fleet = self.inner.fleet.write().await;
        if self.is_shut_down() {
            return;
        }
        match fleet.pending_restarts.get(id) {
            Some(pending) if pending.generation == generation => {
                fleet.pending_restarts.remove(id);
            }
            // Superseded or cancelled.
            _ => return,
        }
        let Some(node) = fleet.node_mut(id) else {
            return;
        };
        if node.status != NodeStatus::RESTARTING {
            return;
        }
        node.status = NodeStatus::ONLINE;
        node.metrics = node.metrics.after_restart();
        node.last_updated = epoch_secs();
        info!(node_id = %id, "node restart complete");
    }

    /// Move a node to `paused`. Cancels a pending restart.
    pub async fn pause(&self, id: &str) -> StateResult<()> {
        self.set_admin_status(id, NodeStatus::PAUSED).await
    }

    /// Return a node to `online`. Clears `paused` and `restarting` alike.
    pub async fn resume(&self, id: &str) -> StateResult<()> {
        self.set_admin_status(id, NodeStatus::ONLINE).await
    }

    async fn set_admin_status(&self, id: &str, status: NodeStatus) -> StateResult<()> {
        let mut fleet = self.inner.fleet.write().await;
        let Some(node) = fleet.node_mut(id) else {
            warn!(node_id = %id, %status, "status change for unknown node");
            return Err(StateError::NotFound(id.to_string()));
        };
        let previous = node.status;
        node.status = status;
        node.last_updated = epoch_secs();
        fleet.cancel_restart(id);
        info!(node_id = %id, from = %previous, to = %status, "node status set");
        Ok(())
    }

    // ── Lifecycle ──────────────────────────────────────────────────

    /// Number of restarts still waiting for their delay to elapse.
    pub async fn pending_restarts(&self) -> usize {
        self.inner.fleet.read().await.pending_restarts.len()
    }

    pub fn is_shut_down(&self) -> bool {
        *self.inner.shutdown.borrow()
    }

    /// Cancel every pending restart timer and refuse new ones.
    pub async fn shutdown(&self) {
        self.inner.shutdown.send_replace(true);
        let mut fleet = self.inner.fleet.write().await;
        for (id, pending) in fleet.pending_restarts.drain() {
            pending.handle.abort();
            debug!(node_id = %id, "pending restart aborted");
        }
        info!("node registry shut down");
    }
}
