//! # Flow Sources Module
//!
//! Continuous demand generation at lane entries and outflow accounting at
//! network exits.
//!
//! ## Key Components
//!
//! - [`FlowSource`] - A per-lane vehicle generator with a fractional carry so
//!   demand is conserved across ticks
//! - [`FlowKind`] - Constant-rate or random (per-tick probability) generation
//!
//! Sources fire only inside their `[start_tick, end_tick]` window and only
//! when the lane entry gap is actually free; withheld demand stays in the
//! carry. All randomness comes from the scheduler's seeded RNG, so generation
//! is deterministic under the determinism contract.

mod flow_source;

pub use self::flow_source::*;
