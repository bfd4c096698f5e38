use crate::agents::{DriverProfile, Vehicle, VehicleID};
use crate::geom::Point;
use crate::network::{Lane, LaneID, NetworkError, RoadNetwork};

/// Generates a straight multi-lane road with lateral adjacency wired up.
///
/// Lane ids are `first_id, first_id + 1, ...` with lane 0 the rightmost;
/// each lane's left/right neighbors point at its siblings. The lanes carry
/// no predecessors or successors, so vehicles exit at the far end.
///
/// # Arguments
///
/// - `first_id` - Id of the rightmost lane.
/// - `road` - Parent road name.
/// - `length` - Road length in metres.
/// - `num_lanes` - Number of parallel lanes.
/// - `speed_limit` - Speed limit in m/s for every lane.
///
/// # Returns
///
/// A validated [`RoadNetwork`] holding the lanes.
///
/// # Layout
///
/// ```text
/// Lane first_id+1: ─────────────────→
/// Lane first_id:   ─────────────────→   (rightmost)
/// ```
///
/// # Examples
///
/// ```rust
/// use hybrid_traffic_sim_core::utils::generate_straight_road;
///
/// let network = generate_straight_road(1, "highway", 1000.0, 3, 33.3).unwrap();
/// assert_eq!(network.len(), 3);
/// let middle = network.get_lane(2).unwrap();
/// assert_eq!(middle.right_neighbor(), Some(1));
/// assert_eq!(middle.left_neighbor(), Some(3));
/// ```
pub fn generate_straight_road(
    first_id: LaneID,
    road: &str,
    length: f64,
    num_lanes: usize,
    speed_limit: f64,
) -> Result<RoadNetwork, NetworkError> {
    let mut network = RoadNetwork::new();
    for index in 0..num_lanes {
        let id = first_id + index as LaneID;
        let y = index as f64 * 3.5;
        let mut builder = Lane::new(id)
            .with_points(vec![Point::new(0.0, y), Point::new(length, y)])
            .with_speed_limit(speed_limit)
            .with_road(road, index);
        if index > 0 {
            builder = builder.with_right_neighbor(id - 1);
        }
        if index + 1 < num_lanes {
            builder = builder.with_left_neighbor(id + 1);
        }
        network.add_lane(builder.build()?)?;
    }
    network.validate()?;
    Ok(network)
}

/// Generates a closed single-lane ring of `num_segments` connected lanes.
///
/// Each segment's successor is the next segment, the last wrapping to the
/// first, so the network has no entries or exits; total mass can only change
/// through translation rounding. The ring is laid out as a regular polygon.
///
/// # Arguments
///
/// - `first_id` - Id of the first segment.
/// - `segment_length` - Arc length of each segment in metres.
/// - `num_segments` - Number of segments, at least 2.
/// - `speed_limit` - Speed limit in m/s.
///
/// # Examples
///
/// ```rust
/// use hybrid_traffic_sim_core::utils::generate_ring;
///
/// let network = generate_ring(1, 500.0, 4, 30.0).unwrap();
/// assert_eq!(network.len(), 4);
/// assert_eq!(network.get_lane(4).unwrap().successors(), &[1]);
/// ```
pub fn generate_ring(
    first_id: LaneID,
    segment_length: f64,
    num_segments: usize,
    speed_limit: f64,
) -> Result<RoadNetwork, NetworkError> {
    let mut network = RoadNetwork::new();
    let radius = segment_length * num_segments as f64 / (2.0 * std::f64::consts::PI);
    for index in 0..num_segments {
        let id = first_id + index as LaneID;
        let angle = |k: usize| 2.0 * std::f64::consts::PI * k as f64 / num_segments as f64;
        let start = Point::new(radius * angle(index).cos(), radius * angle(index).sin());
        let end = Point::new(radius * angle(index + 1).cos(), radius * angle(index + 1).sin());
        let successor = first_id + ((index + 1) % num_segments) as LaneID;
        let predecessor = first_id + ((index + num_segments - 1) % num_segments) as LaneID;
        let lane = Lane::new(id)
            .with_points(vec![start, end])
            .with_speed_limit(speed_limit)
            .with_road("ring", index)
            .with_predecessors(vec![predecessor])
            .with_successors(vec![successor])
            .build()?;
        network.add_lane(lane)?;
    }
    network.validate()?;
    Ok(network)
}

/// Spawns `count` vehicles evenly spaced over a lane, the way demand
/// fixtures seed scenarios: spacing `L / (count + 1)`, the first vehicle one
/// spacing from the lane start.
///
/// # Arguments
///
/// - `first_vehicle_id` - Id of the rearmost vehicle; ids ascend downstream.
/// - `lane_id` - The lane to populate.
/// - `lane_length` - The lane's length in metres.
/// - `count` - Number of vehicles.
/// - `speed` - Initial speed in m/s.
/// - `profile` - Driver parameters for every spawned vehicle.
///
/// # Examples
///
/// ```rust
/// use hybrid_traffic_sim_core::agents::DriverProfile;
/// use hybrid_traffic_sim_core::utils::spawn_uniform;
///
/// let vehicles = spawn_uniform(1, 10, 1000.0, 4, 20.0, DriverProfile::named("car"));
/// assert_eq!(vehicles.len(), 4);
/// assert!((vehicles[0].s - 200.0).abs() < 1e-9);
/// ```
pub fn spawn_uniform(
    first_vehicle_id: VehicleID,
    lane_id: LaneID,
    lane_length: f64,
    count: usize,
    speed: f64,
    profile: DriverProfile,
) -> Vec<Vehicle> {
    let spacing = lane_length / (count + 1) as f64;
    (0..count)
        .map(|index| {
            Vehicle::new(first_vehicle_id + index as VehicleID)
                .with_lane(lane_id)
                .with_position((index + 1) as f64 * spacing)
                .with_speed(speed)
                .with_profile(profile)
                .build()
        })
        .collect()
}
