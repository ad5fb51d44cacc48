//! stellar-autoscale — threshold-driven fleet scaling decisions.
//!
//! Compares a `FleetSummary` against the active `AutoScalingPolicy` and
//! emits a `ScaleDecision`. Acting on the decision (provisioning or
//! draining nodes) belongs to the caller.
//!
//! # Decision Rule
//!
//! ```text
//! disabled                                   → noop
//! nodes < min_nodes                          → scale_up
//! nodes > max_nodes                          → scale_down
//! cpu > cpu_t || mem > mem_t || disk > st_t
//!     and nodes < max_nodes                  → scale_up
//! cpu < cpu_t/2 && mem < mem_t/2 && disk < st_t/2
//!     and nodes > min_nodes                  → scale_down
//! otherwise                                  → noop
//! ```

pub mod scaler;

pub use scaler::{AutoScalingController, ScaleDecision, evaluate};
