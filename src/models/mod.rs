//! # Driver Models Module
//!
//! The pure model functions of the kernel: car-following acceleration,
//! lane-change evaluation and the macroscopic fundamental diagram.
//!
//! ## Key Components
//!
//! - [`CarFollowingModel`] - Tagged variants (`Idm`, `IdmPlus`) behind one
//!   acceleration function; no hidden state, no dispatch in the hot loop
//! - [`LaneChangePolicy`] - Tagged variants (`Mobil`, `KeepLane`) producing a
//!   side decision from pre-computed accelerations
//! - [`FundamentalDiagram`] - Triangular (CTM) flow-density relation with
//!   sending/receiving capacities and equilibrium speeds
//!
//! All model evaluations are pure functions of their inputs so they can run
//! inside the parallel lane phases without synchronisation.

mod car_following;
mod fundamental_diagram;
mod lane_change;

pub use self::{car_following::*, fundamental_diagram::*, lane_change::*};
