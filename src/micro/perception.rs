use crate::agents::{VehicleID, VehiclesStorage};
use crate::micro::MicroState;
use crate::models::Side;
use crate::network::{Lane, LaneID};
use crate::spatial_index::BucketIndex;

/// What a vehicle sees on one adjacent lane: the leader and follower it would
/// have after a hypothetical move, looked up through that lane's index.
#[derive(Debug, Clone, Copy)]
pub struct SidePerception {
    /// The adjacent lane.
    pub lane: LaneID,
    /// Speed limit of the adjacent lane, m/s.
    pub speed_limit: f64,
    /// Vehicle that would be ahead after the move.
    pub leader: Option<VehicleID>,
    /// Vehicle that would be behind after the move.
    pub follower: Option<VehicleID>,
}

/// One vehicle's materialized neighborhood, produced by the perceive phase
/// and consumed read-only by the decide phase.
#[derive(Debug, Clone, Copy)]
pub struct PerceivedVehicle {
    /// The perceiving vehicle.
    pub vehicle: VehicleID,
    /// Leader on the own lane, if any.
    pub leader: Option<VehicleID>,
    /// Follower on the own lane, if any.
    pub follower: Option<VehicleID>,
    /// Neighborhood on the left adjacent lane, when one exists and is
    /// microscopic this tick.
    pub left: Option<SidePerception>,
    /// Neighborhood on the right adjacent lane, when one exists and is
    /// microscopic this tick.
    pub right: Option<SidePerception>,
}

impl PerceivedVehicle {
    /// The perception for the requested side.
    pub fn side(&self, side: Side) -> Option<SidePerception> {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }
}

/// An adjacent lane eligible as a lane-change target this tick: the lane and
/// its pre-tick bucket index.
#[derive(Clone, Copy)]
pub struct AdjacentLane<'a> {
    pub lane: &'a Lane,
    pub index: &'a BucketIndex,
}

/// Phase 1 of the micro tick: walks the ordered vehicle list and materializes
/// each vehicle's neighborhood into a dense scratch buffer.
///
/// Reads pre-tick state only. Adjacent lanes that are macroscopic this tick
/// are not lane-change targets and appear as `None`.
///
/// # Arguments
/// * `state` - The lane's microscopic state.
/// * `vehicles` - The vehicle arena.
/// * `left` - The left adjacent lane, when present and microscopic.
/// * `right` - The right adjacent lane, when present and microscopic.
/// * `interaction_range` - Radius for hypothetical neighbor lookups, metres.
///
/// # Returns
/// One `PerceivedVehicle` per vehicle, in lane order.
pub fn perceive_lane(
    state: &MicroState,
    vehicles: &VehiclesStorage,
    left: Option<AdjacentLane<'_>>,
    right: Option<AdjacentLane<'_>>,
    interaction_range: f64,
) -> Vec<PerceivedVehicle> {
    let mut perceptions = Vec::with_capacity(state.len());
    for &vehicle_id in state.order() {
        let Some(vehicle) = vehicles.get(vehicle_id) else {
            continue;
        };
        let leader = state.index().leader(vehicle.s, vehicle_id).map(|entry| entry.id);
        let follower = state.index().follower(vehicle.s, vehicle_id).map(|entry| entry.id);
        let left_view = left.map(|adjacent| side_perception(adjacent, vehicle.s, interaction_range));
        let right_view = right.map(|adjacent| side_perception(adjacent, vehicle.s, interaction_range));
        perceptions.push(PerceivedVehicle {
            vehicle: vehicle_id,
            leader,
            follower,
            left: left_view,
            right: right_view,
        });
    }
    perceptions
}

fn side_perception(adjacent: AdjacentLane<'_>, s: f64, interaction_range: f64) -> SidePerception {
    let neighborhood = adjacent.index.neighbors_on(s, interaction_range);
    SidePerception {
        lane: adjacent.lane.id(),
        speed_limit: adjacent.lane.speed_limit(),
        leader: neighborhood.leader.map(|entry| entry.id),
        follower: neighborhood.follower.map(|entry| entry.id),
    }
}
