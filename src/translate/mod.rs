//! # Translation Module
//!
//! The state-preserving encoder between the two lane representations, plus
//! the per-tick boundary-flux helpers used where a microscopic and a
//! macroscopic lane meet.
//!
//! ## Key Components
//!
//! - [`encode_macro`] - Micro → macro: bin vehicles into density cells
//!   (count-based, so mass stays integral), retaining a [`DriverSummary`]
//!   of the evicted population
//! - [`decode_micro`] - Macro → micro: sweep cells with a fractional carry,
//!   emitting vehicles at equilibrium speeds
//! - [`accrue_boundary_carry`] - Fractional-vehicle carry for macro→micro
//!   boundary flux, persisting across ticks
//! - [`verify_conservation`] - The ±1 vehicle contract; violations are fatal
//! - [`extract_density_profile`] / [`extract_flow_profile`] /
//!   [`extract_speed_profile`] - Read-only observability profiles over a
//!   microscopic lane
//!
//! ## Conservation contract
//!
//! Over any switching event the lane's mass changes by less than one vehicle
//! (the sub-vehicle sweep remainder); per tick, boundary flux loses no mass
//! beyond the carry retained across ticks.
//!
//! [`DriverSummary`]: crate::agents::DriverSummary

mod profiles;
mod translator;

pub use self::{profiles::*, translator::*};
