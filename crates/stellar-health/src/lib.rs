//! stellar-health — status derivation and fleet health for Stellar.
//!
//! The evaluator maps a node's CPU and memory readings onto one of the
//! automatic states. It is status-aware: a node that an administrator
//! has paused or is restarting keeps that state regardless of load.
//!
//! ```text
//! cpu > 90 || mem > 90  → critical
//! cpu > 80 || mem > 80  → warning
//! otherwise             → online
//! paused / restarting   → unchanged
//! ```
//!
//! The fleet health report condenses a `FleetSummary` into per-resource
//! ok/high flags using the auto-scaling thresholds.

pub mod evaluator;
pub mod report;

pub use evaluator::{StatusThresholds, evaluate_status};
pub use report::{HealthReport, NodesHealth, OverallHealth, ResourceHealth, health_report};
