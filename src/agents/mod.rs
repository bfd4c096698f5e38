// src/agents/mod.rs
//! # Agents Module
//!
//! The per-vehicle state of the microscopic representation.
//!
//! ## Key Components
//!
//! - [`Vehicle`] - Longitudinal state `(s, v, a)` plus the lane reference and
//!   driver parameters of one simulated vehicle
//! - [`DriverProfile`] - IDM/MOBIL parameter bundle, with a registry of named
//!   defaults ("car", "bus", "truck")
//! - [`DriverSummary`] - Running statistics over evicted vehicles, retained
//!   per lane for macro→micro restoration
//! - [`VehiclesStorage`] - Deterministically ordered vehicle arena
//!
//! Vehicles are mutated only by their owning lane's stepper, by the
//! translator, or by explicit system influences; nothing else writes to them.
//!
//! ## Usage
//!
//! ```rust
//! use hybrid_traffic_sim_core::agents::{DriverProfile, Vehicle};
//!
//! let vehicle = Vehicle::new(1)
//!     .with_lane(10)
//!     .with_position(250.0)
//!     .with_speed(20.0)
//!     .with_profile(DriverProfile::named("car"))
//!     .build();
//! assert_eq!(vehicle.lane, 10);
//! ```

mod driver;
mod vehicle;
mod vehicles_storage;

pub use self::{driver::*, vehicle::*, vehicles_storage::*};
