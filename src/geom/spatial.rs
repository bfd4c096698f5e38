//! Heading calculations over Euclidean points.

use crate::geom::Point;

/// Calculates the heading from `pt1` to `pt2`.
///
/// The heading is the angle measured counter-clockwise from the positive
/// x-axis, in radians, in `(-π, π]`.
///
/// # Arguments
///
/// * `pt1` - The start point.
/// * `pt2` - The end point.
///
/// # Returns
///
/// The heading from `pt1` to `pt2` in radians.
///
/// # Example
///
/// ```
/// use hybrid_traffic_sim_core::geom::{heading_between, Point};
/// let from = Point::new(0.0, 0.0);
/// let to = Point::new(0.0, 10.0);
/// let heading = heading_between(&from, &to);
/// assert!((heading - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
/// ```
pub fn heading_between(pt1: &Point, pt2: &Point) -> f64 {
    (pt2.y - pt1.y).atan2(pt2.x - pt1.x)
}
