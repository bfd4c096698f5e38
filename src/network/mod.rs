//! # Road Network Module
//!
//! The immutable road model consumed by the simulation: lanes with polyline
//! geometry, arc-length parameterization, lateral adjacency and longitudinal
//! connectivity, plus the [`RoadNetwork`] storage that owns them.
//!
//! ## Key Components
//!
//! - [`Lane`] - A single lane, immutable after construction (builder API)
//! - [`RoadNetwork`] - Deterministically ordered storage of all lanes
//! - [`NetworkError`] - Construction and validation failures
//!
//! Lanes of the same road are laterally adjacent through their explicit
//! left/right neighbor references; cross-road adjacency is never assumed.
//! Longitudinal connectivity is expressed by ordered predecessor/successor
//! lane lists.
//!
//! ## Usage
//!
//! ```rust
//! use hybrid_traffic_sim_core::geom::Point;
//! use hybrid_traffic_sim_core::network::{Lane, RoadNetwork};
//!
//! let lane = Lane::new(1)
//!     .with_points(vec![Point::new(0.0, 0.0), Point::new(1000.0, 0.0)])
//!     .with_speed_limit(33.3)
//!     .with_road("highway1", 0)
//!     .build()
//!     .unwrap();
//!
//! let mut network = RoadNetwork::new();
//! network.add_lane(lane).unwrap();
//! network.validate().unwrap();
//! ```

mod lane;
mod road_network;

pub use self::{lane::*, road_network::*};
