//! stellar-metrics — sampling and aggregation for the Stellar fleet.
//!
//! The sampler is the single writer of node metrics. Every tick it walks
//! the fleet, perturbs each automatic node's readings, re-derives its
//! status, appends one sample per metric type to history, evicts expired
//! samples and hands a fresh fleet summary to the auto-scaler.
//!
//! # Architecture
//!
//! ```text
//! Sampler::run()  (fixed interval, cancelled by watch channel)
//!   └── tick()
//!       ├── NodeRegistry::list_all()            snapshot
//!       ├── perturb() + StatusThresholds::evaluate()
//!       ├── NodeRegistry::apply_metric_update() per automatic node
//!       ├── MetricHistoryStore::append_batch() + evict()
//!       ├── summarize() → FleetHistory::record()
//!       └── AutoScalingController::decide()
//!
//! FleetMonitor → query/admin facade for a host (HTTP layer, CLI)
//! render_prometheus() → text/plain exposition of node gauges
//! ```

pub mod aggregate;
pub mod monitor;
pub mod prometheus;
pub mod sampler;

pub use aggregate::summarize;
pub use monitor::{FleetMonitor, MonitorError};
pub use prometheus::render_prometheus;
pub use sampler::{Perturbation, RandomJitter, Sampler, TickReport, WalkAmplitudes, perturb};
