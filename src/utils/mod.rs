//! # Utilities Module
//!
//! Deterministic RNG helpers and network/population generators shared by
//! tests, benches and examples.
//!
//! - [`seeded_rng`] - The one way simulation code obtains randomness
//! - [`generate_straight_road`] - Multi-lane straight road with lateral
//!   adjacency wired up
//! - [`generate_ring`] - Closed single-lane ring (no entries or exits), the
//!   canonical mass-conservation fixture
//! - [`spawn_uniform`] - Evenly spaced vehicle population on one lane

mod generators;
mod rand;

pub use self::{generators::*, rand::*};
