//! # Macroscopic Module
//!
//! The continuum representation of a lane: a grid of density cells advanced
//! by a first-order Godunov scheme over the triangular (CTM) fundamental
//! diagram.
//!
//! ## Key Components
//!
//! - [`CellGrid`] - Density cells `ρᵢ ∈ [0, ρ_jam]` with a downstream flux
//!   cache
//! - [`MacroStepOutput`] - The parallel phase's scratch result: interior
//!   update plus the end-cell sending/receiving capacities the sequential
//!   resolution pass needs for inter-lane flux
//! - [`step_interior`] - One interior Godunov update over a grid
//!
//! Boundary cells exchange flux with predecessor/successor lanes in the
//! sequential resolution pass; the stepper here touches interior boundaries
//! only. The CFL constraint `dt ≤ Δx / max(v_f, w)` is enforced when the
//! simulation is constructed, never re-checked in the hot loop.

mod cell_grid;
mod stepper;

pub use self::{cell_grid::*, stepper::*};
