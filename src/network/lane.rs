use crate::geom::{Point, Polyline, PolylineError};
use std::fmt;

pub type LaneID = u64; // Alias for LaneID

/// Custom error types for lane and network construction.
#[derive(Debug, Clone)]
pub enum NetworkError {
    /// Lane geometry could not be built from the provided control points.
    BadGeometry {
        lane_id: LaneID,
        source: PolylineError,
    },
    /// A lane with the same identifier has already been registered.
    DuplicateLane(LaneID),
    /// A lane references a neighbor/predecessor/successor that does not exist.
    DanglingReference {
        lane_id: LaneID,
        missing_id: LaneID,
    },
    /// A lane references itself as neighbor, predecessor or successor.
    SelfReference(LaneID),
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkError::BadGeometry { lane_id, source } => {
                write!(f, "Bad geometry for lane '{}': {}", lane_id, source)
            }
            NetworkError::DuplicateLane(lane_id) => {
                write!(f, "Lane '{}' has already been registered", lane_id)
            }
            NetworkError::DanglingReference { lane_id, missing_id } => {
                write!(
                    f,
                    "Lane '{}' references lane '{}' which does not exist",
                    lane_id, missing_id
                )
            }
            NetworkError::SelfReference(lane_id) => {
                write!(f, "Lane '{}' references itself", lane_id)
            }
        }
    }
}

impl std::error::Error for NetworkError {}

/// A single lane of the road network. Immutable after construction.
///
/// A lane is a 1-D coordinate system: vehicles and density cells live on the
/// arc length `s ∈ [0, L)` along the lane's polyline. Lateral adjacency
/// (`left_neighbor` / `right_neighbor`) connects lanes of the same road;
/// ordered predecessor/successor lists connect lane ends longitudinally.
#[derive(Debug, Clone)]
pub struct Lane {
    /// Unique identifier for the lane.
    id: LaneID,
    /// Centerline geometry with its cumulative arc-length table.
    polyline: Polyline,
    /// Cached total arc length in metres.
    length: f64,
    /// Lane width in metres.
    width: f64,
    /// Speed limit in m/s.
    speed_limit: f64,
    /// Name of the parent road.
    road: String,
    /// Index of this lane within its parent road (0 = rightmost).
    index_in_road: usize,
    /// Laterally adjacent lane on the left, if any.
    left_neighbor: Option<LaneID>,
    /// Laterally adjacent lane on the right, if any.
    right_neighbor: Option<LaneID>,
    /// Upstream lanes feeding into this lane, in priority order.
    predecessors: Vec<LaneID>,
    /// Downstream lanes this lane feeds into, in priority order.
    successors: Vec<LaneID>,
    /// Whether the lane is part of an intersection or ramp and must always be
    /// simulated microscopically.
    critical: bool,
}

impl Lane {
    /// Constructs a new `LaneBuilder` for building a `Lane` object.
    ///
    /// # Arguments
    /// * `id` - A unique identifier for the lane.
    ///
    /// # Returns
    /// A `LaneBuilder` used to configure and build the `Lane`.
    ///
    /// # Example
    /// ```
    /// use hybrid_traffic_sim_core::geom::Point;
    /// use hybrid_traffic_sim_core::network::Lane;
    /// let lane = Lane::new(1)
    ///     .with_points(vec![Point::new(0.0, 0.0), Point::new(500.0, 0.0)])
    ///     .with_speed_limit(27.8)
    ///     .build()
    ///     .unwrap();
    /// assert!((lane.length() - 500.0).abs() < 1e-9);
    /// ```
    pub fn new(id: LaneID) -> LaneBuilder {
        LaneBuilder {
            id,
            points: Vec::new(),
            width: 3.5,
            speed_limit: 13.9,
            road: String::new(),
            index_in_road: 0,
            left_neighbor: None,
            right_neighbor: None,
            predecessors: Vec::new(),
            successors: Vec::new(),
            critical: false,
        }
    }

    /// Returns the unique identifier of the lane.
    pub fn id(&self) -> LaneID {
        self.id
    }

    /// Returns the cached total arc length `L` in metres.
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Returns the lane width in metres.
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Returns the speed limit in m/s.
    pub fn speed_limit(&self) -> f64 {
        self.speed_limit
    }

    /// Returns the parent road name.
    pub fn road(&self) -> &str {
        &self.road
    }

    /// Returns the index of this lane within its parent road.
    pub fn index_in_road(&self) -> usize {
        self.index_in_road
    }

    /// Returns the `(x, y)` position at arc length `s`. O(log segments).
    pub fn position_at(&self, s: f64) -> Point {
        self.polyline.position_at(s)
    }

    /// Returns the heading angle at arc length `s`, in radians.
    pub fn heading_at(&self, s: f64) -> f64 {
        self.polyline.heading_at(s)
    }

    /// Returns the laterally adjacent lane on the left, if any.
    pub fn left_neighbor(&self) -> Option<LaneID> {
        self.left_neighbor
    }

    /// Returns the laterally adjacent lane on the right, if any.
    pub fn right_neighbor(&self) -> Option<LaneID> {
        self.right_neighbor
    }

    /// Returns the upstream lanes feeding into this lane.
    pub fn predecessors(&self) -> &[LaneID] {
        &self.predecessors
    }

    /// Returns the downstream lanes this lane feeds into.
    pub fn successors(&self) -> &[LaneID] {
        &self.successors
    }

    /// Whether the lane was registered as critical (intersection/ramp).
    pub fn is_critical(&self) -> bool {
        self.critical
    }

    /// All lane ids referenced by this lane (neighbors, predecessors,
    /// successors). Used by network validation.
    pub(crate) fn referenced_lanes(&self) -> impl Iterator<Item = LaneID> + '_ {
        self.left_neighbor
            .iter()
            .chain(self.right_neighbor.iter())
            .copied()
            .chain(self.predecessors.iter().copied())
            .chain(self.successors.iter().copied())
    }
}

/// A builder pattern implementation for constructing `Lane` objects.
///
/// `LaneBuilder` allows optional configuration of `Lane` fields before the
/// final, immutable `Lane` is built.
pub struct LaneBuilder {
    id: LaneID,
    points: Vec<Point>,
    width: f64,
    speed_limit: f64,
    road: String,
    index_in_road: usize,
    left_neighbor: Option<LaneID>,
    right_neighbor: Option<LaneID>,
    predecessors: Vec<LaneID>,
    successors: Vec<LaneID>,
    critical: bool,
}

impl LaneBuilder {
    /// Sets the control points of the lane's centerline.
    ///
    /// # Arguments
    /// * `points` - At least two points; consumed by `build()`.
    ///
    /// # Returns
    /// A `LaneBuilder` instance for further method chaining.
    pub fn with_points(mut self, points: Vec<Point>) -> Self {
        self.points = points;
        self
    }

    /// Sets the lane width in metres.
    pub fn with_width(mut self, width: f64) -> Self {
        self.width = width;
        self
    }

    /// Sets the speed limit in m/s.
    pub fn with_speed_limit(mut self, speed_limit: f64) -> Self {
        self.speed_limit = speed_limit;
        self
    }

    /// Sets the parent road name and this lane's index within that road.
    ///
    /// # Arguments
    /// * `road` - The parent road name.
    /// * `index_in_road` - Lane index within the road, 0 being the rightmost.
    pub fn with_road(mut self, road: impl Into<String>, index_in_road: usize) -> Self {
        self.road = road.into();
        self.index_in_road = index_in_road;
        self
    }

    /// Sets the laterally adjacent lane on the left.
    pub fn with_left_neighbor(mut self, lane_id: LaneID) -> Self {
        self.left_neighbor = Some(lane_id);
        self
    }

    /// Sets the laterally adjacent lane on the right.
    pub fn with_right_neighbor(mut self, lane_id: LaneID) -> Self {
        self.right_neighbor = Some(lane_id);
        self
    }

    /// Sets the ordered list of upstream lanes.
    pub fn with_predecessors(mut self, lanes: Vec<LaneID>) -> Self {
        self.predecessors = lanes;
        self
    }

    /// Sets the ordered list of downstream lanes.
    pub fn with_successors(mut self, lanes: Vec<LaneID>) -> Self {
        self.successors = lanes;
        self
    }

    /// Marks the lane as critical (intersection/ramp); critical lanes are
    /// pinned to the microscopic representation.
    pub fn with_critical(mut self, critical: bool) -> Self {
        self.critical = critical;
        self
    }

    /// Builds the final immutable `Lane` object.
    ///
    /// # Returns
    /// The `Lane`, or a `NetworkError` when the geometry is degenerate or the
    /// lane references itself.
    pub fn build(self) -> Result<Lane, NetworkError> {
        let id = self.id;
        let polyline = Polyline::new(self.points)
            .map_err(|source| NetworkError::BadGeometry { lane_id: id, source })?;
        let length = polyline.length();
        let lane = Lane {
            id,
            polyline,
            length,
            width: self.width,
            speed_limit: self.speed_limit,
            road: self.road,
            index_in_road: self.index_in_road,
            left_neighbor: self.left_neighbor,
            right_neighbor: self.right_neighbor,
            predecessors: self.predecessors,
            successors: self.successors,
            critical: self.critical,
        };
        if lane.referenced_lanes().any(|other| other == id) {
            return Err(NetworkError::SelfReference(id));
        }
        Ok(lane)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lane_builder() {
        let lane = Lane::new(7)
            .with_points(vec![Point::new(0.0, 0.0), Point::new(800.0, 0.0)])
            .with_speed_limit(27.8)
            .with_road("highway3", 1)
            .with_right_neighbor(6)
            .with_successors(vec![8])
            .build()
            .expect("valid lane must build");
        assert_eq!(lane.id(), 7);
        assert!((lane.length() - 800.0).abs() < 1e-9, "Cached length is wrong");
        assert_eq!(lane.right_neighbor(), Some(6));
        assert_eq!(lane.left_neighbor(), None);
        assert_eq!(lane.successors(), &[8]);
        assert_eq!(lane.road(), "highway3");
        assert!(!lane.is_critical());
    }

    #[test]
    fn test_lane_rejects_bad_geometry() {
        let result = Lane::new(1).with_points(vec![Point::new(0.0, 0.0)]).build();
        assert!(
            matches!(result, Err(NetworkError::BadGeometry { lane_id: 1, .. })),
            "Single-point geometry must be rejected, got {:?}",
            result
        );
    }

    #[test]
    fn test_lane_rejects_self_reference() {
        let result = Lane::new(3)
            .with_points(vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)])
            .with_successors(vec![3])
            .build();
        assert!(
            matches!(result, Err(NetworkError::SelfReference(3))),
            "Self-referencing lane must be rejected, got {:?}",
            result
        );
    }

    #[test]
    fn test_position_and_heading_lookup() {
        let lane = Lane::new(1)
            .with_points(vec![Point::new(0.0, 0.0), Point::new(0.0, 200.0)])
            .build()
            .unwrap();
        let pos = lane.position_at(50.0);
        assert!((pos.y - 50.0).abs() < 1e-12);
        assert!(
            (lane.heading_at(50.0) - std::f64::consts::FRAC_PI_2).abs() < 1e-12,
            "Lane along +y must head π/2"
        );
    }
}
