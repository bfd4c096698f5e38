//! # Microscopic Stepper Module
//!
//! The per-vehicle representation of a lane and its tick update.
//!
//! ## Key Components
//!
//! - [`MicroState`] - Ordered vehicle sequence plus the lane's bucket index
//! - [`perceive_lane`] - Phase 1: materialize each vehicle's neighborhood
//!   into a dense scratch buffer
//! - [`step_lane`] - Phases 2–3: decide (IDM + MOBIL) and integrate, writing
//!   to scratch only
//! - [`MicroStepOutput`] - The scratch result the sequential resolution pass
//!   commits: per-vehicle motion, lane-end crossings, queued lane-change
//!   requests and the consistency-patch count
//!
//! ## Tick contract
//!
//! Within one tick no vehicle observes another vehicle's post-integration
//! state: perception reads pre-tick state, decisions and integration write to
//! scratch, and the scheduler commits scratch after the barrier. After the
//! commit, the sequence on each lane is strictly ordered by position with
//! pairwise spacing of at least the leader's length; integration overlaps are
//! clamped and counted as patches.

mod perception;
mod state;
mod stepper;

pub use self::{perception::*, state::*, stepper::*};
