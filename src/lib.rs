//! # hybrid_traffic_sim_core
//!
//! Core library for adaptive hybrid traffic flow simulation: every lane of a
//! multi-lane road network dynamically switches between a microscopic
//! (per-vehicle, IDM + MOBIL) and a macroscopic (density-cell, Godunov/CTM)
//! representation, keeping large networks tractable while staying accurate
//! at intersections, ramps and incidents.
//!
//! ## Architecture
//!
//! - [`geom`] / [`network`] - Euclidean geometry and the immutable road model
//! - [`agents`] - Vehicles, driver profiles and the vehicle arena
//! - [`spatial_index`] - Per-lane bucketed leader/follower queries
//! - [`models`] - IDM/IDM+ car-following, MOBIL lane changes, the triangular
//!   fundamental diagram
//! - [`micro`] / [`macroscopic`] - The two lane steppers
//! - [`translate`] - The state-preserving micro⇄macro encoder and boundary
//!   flux helpers
//! - [`adaptive`] - The per-lane mode FSM with hysteresis and dwell
//! - [`flows`] - Inflow sources and outflow accounting
//! - [`simulation`] - Configuration, the tick scheduler, resolution and
//!   snapshots
//! - [`verbose`] / [`utils`] - Structured logging, seeded RNG and fixtures
//!
//! ## Quick start
//!
//! ```rust
//! use hybrid_traffic_sim_core::agents::DriverProfile;
//! use hybrid_traffic_sim_core::simulation::{Simulation, SimulationConfig};
//! use hybrid_traffic_sim_core::utils::{generate_straight_road, spawn_uniform};
//!
//! let network = generate_straight_road(1, "highway", 1000.0, 2, 30.0).unwrap();
//! let vehicles = spawn_uniform(1, 1, 1000.0, 10, 20.0, DriverProfile::named("car"));
//! let config = SimulationConfig::new().with_seed(7).build().unwrap();
//! let mut simulation = Simulation::new(network, config, vehicles).unwrap();
//! let snapshot = simulation.step_n(10).unwrap();
//! assert_eq!(snapshot.tick, 10);
//! ```
//!
//! ## Determinism
//!
//! Given identical configuration, initial population, influence sequence and
//! seed, two runs produce byte-identical snapshots; see
//! [`simulation`] for how the tick pipeline guarantees this.

pub mod adaptive;
pub mod agents;
pub mod flows;
pub mod geom;
pub mod macroscopic;
pub mod micro;
pub mod models;
pub mod network;
pub mod simulation;
pub mod spatial_index;
pub mod translate;
pub mod utils;
pub mod verbose;
