//! # Geometry Module
//!
//! Geometric primitives for the road model: Euclidean points, polylines with
//! cumulative arc-length tables, and heading calculations.
//!
//! ## Key Components
//!
//! - [`Point`] - A point in the Euclidean plane
//! - [`Polyline`] - A polyline pre-processed for O(log n) arc-length queries
//! - [`heading_between`] - Heading angle between two points
//!
//! Lanes are parameterized by arc length `s` along their polyline; all
//! position and heading lookups go through [`Polyline::position_at`] and
//! [`Polyline::heading_at`].
//!
//! ## Usage
//!
//! ```rust
//! use hybrid_traffic_sim_core::geom::{Point, Polyline};
//!
//! let polyline = Polyline::new(vec![
//!     Point::new(0.0, 0.0),
//!     Point::new(100.0, 0.0),
//!     Point::new(100.0, 50.0),
//! ]).unwrap();
//! assert!((polyline.length() - 150.0).abs() < 1e-9);
//! let midpoint = polyline.position_at(100.0);
//! ```

mod point;
mod polyline;
mod spatial;

pub use self::{point::*, polyline::*, spatial::*};
