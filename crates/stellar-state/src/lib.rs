//! stellar-state — in-process state for the Stellar fleet monitor.
//!
//! Owns the authoritative node set and the time-bounded metric history.
//! Nothing here is persisted; a host that needs durability snapshots the
//! registry and history externally.
//!
//! # Architecture
//!
//! ```text
//! NodeRegistry (Clone, Arc<RwLock<..>>)
//!   ├── list_all / get / filter_by_* → point-in-time copies
//!   ├── apply_metric_update()        ← sampler, single writer of metrics
//!   └── restart / pause / resume     ← administrator, serialized on the same lock
//!
//! MetricHistoryStore (Clone, Arc<RwLock<..>>)
//!   ├── append()  ← sampler, one sample per metric type per tick
//!   ├── query()   → samples newer than min(hours, retention)
//!   └── evict()   → drop samples older than the retention window
//!
//! FleetHistory (Clone, Arc<RwLock<VecDeque<..>>>)
//!   ├── record()  ← sampler, one fleet summary per tick, trimmed to retention
//!   └── query()   → snapshots newer than min(hours, retention)
//!
//! ReplicationTracker (Clone, Arc<RwLock<..>>)
//!   ├── report_counters / report_file_class  ← storage layer
//!   └── status()                             → last reported status
//! ```

pub mod error;
pub mod fleet_history;
pub mod history;
pub mod registry;
pub mod replication;
pub mod types;

pub use error::{StateError, StateResult};
pub use fleet_history::{FleetHistory, FleetSnapshot};
pub use history::MetricHistoryStore;
pub use registry::{NodeRegistry, UpdateOutcome};
pub use replication::{
    FileClassReplication, ReplicationCounters, ReplicationHealth, ReplicationStatus,
    ReplicationTracker,
};
pub use types::*;
