//! # Simulation module
//!
//! **Top-level orchestration module** – Coordinates all major components of
//! the adaptive hybrid traffic simulation.
//!
//! This module owns the scheduler: the single object holding the road
//! network, the vehicle arena, every lane's representation and mode record,
//! the seeded RNG, the worker pool and the snapshot tap. It is the main
//! entry point for running, controlling, and inspecting the simulation.
//!
//! ## Purpose
//!
//! - Validates configuration and network at construction (CFL, thresholds,
//!   dwell, cell counts)
//! - Advances simulation time in fixed `dt` ticks with a deterministic
//!   seven-phase pipeline
//! - Applies external influences (vehicle add/remove, forced modes, critical
//!   flags, flow sources) at well-defined points
//! - Publishes read-only snapshots for external consumers
//!
//! ## Tick pipeline
//!
//! The scheduler executes the following pipeline in
//! [`Simulation::step()`](crate::simulation::Simulation::step):
//! ```text
//! 1. Mode controller pass (sequential)   ← adaptive module
//! 2. Translation pass                    ← translate module
//! 3. Stepper pass, parallel across lanes ← micro / macroscopic modules
//! 4. Barrier
//! 5. Resolution pass (sequential): lane changes, transfers, boundary flux,
//!    influences, flow sources            ← resolution
//! 6. Commit: rebuild indices, advance the tick
//! 7. Snapshot publish                    ← states / snapshot tap
//! ```
//!
//! ## Components
//!
//! - [`SimulationConfig`] – Validated scheduler configuration (builder API)
//! - [`Simulation`] – The scheduler itself
//! - [`Snapshot`] / [`VehicleRecord`] / [`LaneRecord`] / [`TickCounters`] –
//!   The read-only state published each tick
//! - [`SimulationStatistics`] – Cumulative counters and timing
//! - [`SimulationError`] – Unified error type for all simulation operations
//!
//! ## Determinism
//!
//! Given identical configuration, initial population, influence sequence and
//! seed, two runs produce byte-identical snapshots: all cross-lane work runs
//! sequentially in registration order, every conflict resolves by fixed
//! (incentive, id) tie-breaks, and the only RNG is seeded from the
//! configuration.

mod config;
mod lane_runtime;
mod resolution;
mod scheduler;
mod snapshot_tap;
mod states;

pub use self::{config::*, lane_runtime::*, scheduler::*, snapshot_tap::*, states::*};
