use crate::agents::{Vehicle, VehicleID, VehiclesStorage};
use crate::micro::{PerceivedVehicle, SidePerception};
use crate::models::{
    CarFollowingModel, LaneChangePolicy, LeaderView, Side, SideAssessment,
};
use crate::network::{Lane, LaneID};

/// Clearance left between a patched vehicle and its predecessor, metres.
const PATCH_MARGIN: f64 = 0.01;

/// Post-integration motion of one vehicle staying on its lane.
#[derive(Debug, Clone, Copy)]
pub struct VehicleMotion {
    pub id: VehicleID,
    pub new_s: f64,
    pub new_v: f64,
    pub new_a: f64,
}

/// A vehicle whose integration carried it across the lane end.
#[derive(Debug, Clone, Copy)]
pub struct Crossing {
    pub id: VehicleID,
    /// Distance already travelled past the lane end, metres; becomes the
    /// position on the successor lane.
    pub overflow: f64,
    pub new_v: f64,
    pub new_a: f64,
}

/// A queued lane-change request, committed (or dropped) by the resolution
/// pass under the reservation rule.
#[derive(Debug, Clone, Copy)]
pub struct LaneChangeRequest {
    pub vehicle: VehicleID,
    pub from_lane: LaneID,
    pub to_lane: LaneID,
    /// Net MOBIL incentive; larger wins reservation conflicts.
    pub incentive: f64,
    /// Post-integration position the vehicle will occupy on the target lane.
    pub new_s: f64,
    /// Vehicle length, for the reservation interval.
    pub length: f64,
    /// Requester's minimum gap, used as the reservation margin.
    pub min_gap: f64,
}

impl LaneChangeRequest {
    /// The arc-length interval the incoming vehicle will occupy on the
    /// target lane, including the safety margin.
    pub fn interval(&self) -> (f64, f64) {
        (self.new_s - self.length - self.min_gap, self.new_s + self.min_gap)
    }
}

/// Scratch result of one microscopic lane tick (phases 2–3).
#[derive(Debug, Clone, Default)]
pub struct MicroStepOutput {
    /// Vehicles staying on the lane, in lane order.
    pub motions: Vec<VehicleMotion>,
    /// Vehicles that crossed the lane end, in lane order (rearmost first).
    pub crossings: Vec<Crossing>,
    /// Queued lane-change requests.
    pub change_requests: Vec<LaneChangeRequest>,
    /// Consistency patches applied while resolving integration overlaps.
    pub patches: u64,
}

/// Phases 2–3 of the micro tick for one lane: compute IDM accelerations and
/// MOBIL intents from the perception buffer, integrate into scratch, and
/// clamp integration overlaps.
///
/// Never touches live vehicle state; the scheduler commits the returned
/// scratch after the barrier.
///
/// # Arguments
/// * `lane` - The lane being stepped.
/// * `perceptions` - Phase-1 output for this lane.
/// * `vehicles` - The vehicle arena (read-only).
/// * `model` - Car-following model variant.
/// * `policy` - Lane-change policy variant.
/// * `dt` - Tick length, seconds.
///
/// # Returns
/// The lane's scratch output.
pub fn step_lane(
    lane: &Lane,
    perceptions: &[PerceivedVehicle],
    vehicles: &VehiclesStorage,
    model: CarFollowingModel,
    policy: LaneChangePolicy,
    dt: f64,
) -> MicroStepOutput {
    let mut output = MicroStepOutput {
        motions: Vec::with_capacity(perceptions.len()),
        ..Default::default()
    };

    for perception in perceptions {
        let Some(ego) = vehicles.get(perception.vehicle) else {
            continue;
        };

        // Decide: longitudinal acceleration against the own-lane leader.
        let desired = ego.profile.desired_speed.min(lane.speed_limit());
        let leader_view = perception
            .leader
            .and_then(|id| vehicles.get(id))
            .map(|leader| leader_view_of(ego, leader));
        let accel = model.acceleration(ego.v, desired, &ego.profile, leader_view);

        // Decide: lane-change intent from the four-acceleration comparison
        // on each candidate side.
        let decision = policy.decide(
            &ego.profile,
            assess_side(perception, Side::Left, ego, vehicles, lane, model),
            assess_side(perception, Side::Right, ego, vehicles, lane, model),
        );

        // Integrate into scratch. Displacement never goes negative: braking
        // stops a vehicle, it does not reverse it.
        let displacement = (ego.v * dt + 0.5 * accel * dt * dt).max(0.0);
        let new_v = (ego.v + accel * dt).max(0.0);
        let new_s = ego.s + displacement;

        if new_s >= lane.length() {
            output.crossings.push(Crossing {
                id: ego.id,
                overflow: new_s - lane.length(),
                new_v,
                new_a: accel,
            });
            // A vehicle leaving the lane this tick abandons its change intent.
            continue;
        }

        output.motions.push(VehicleMotion { id: ego.id, new_s, new_v, new_a: accel });

        if let Some(decision) = decision {
            if let Some(side) = perception.side(decision.side) {
                output.change_requests.push(LaneChangeRequest {
                    vehicle: ego.id,
                    from_lane: lane.id(),
                    to_lane: side.lane,
                    incentive: decision.incentive,
                    new_s,
                    length: ego.length,
                    min_gap: ego.profile.min_gap,
                });
            }
        }
    }

    output.patches = patch_overlaps(lane, vehicles, &mut output.motions, &output.crossings);
    output
}

/// Builds the leader view of `leader` as seen by `ego` on the same lane.
fn leader_view_of(ego: &Vehicle, leader: &Vehicle) -> LeaderView {
    LeaderView {
        gap: leader.s - leader.length - ego.s,
        speed: leader.v,
    }
}

/// Computes the six MOBIL accelerations for one candidate side, or `None`
/// when no adjacent lane was offered there.
fn assess_side(
    perception: &PerceivedVehicle,
    side: Side,
    ego: &Vehicle,
    vehicles: &VehiclesStorage,
    lane: &Lane,
    model: CarFollowingModel,
) -> Option<SideAssessment> {
    let side_view: SidePerception = perception.side(side)?;

    let own_leader = perception.leader.and_then(|id| vehicles.get(id));
    let own_follower = perception.follower.and_then(|id| vehicles.get(id));
    let new_leader = side_view.leader.and_then(|id| vehicles.get(id));
    let new_follower = side_view.follower.and_then(|id| vehicles.get(id));

    let ego_desired = ego.profile.desired_speed.min(lane.speed_limit());
    let ego_desired_changed = ego.profile.desired_speed.min(side_view.speed_limit);

    let ego_current = model.acceleration(
        ego.v,
        ego_desired,
        &ego.profile,
        own_leader.map(|leader| leader_view_of(ego, leader)),
    );
    let ego_changed = model.acceleration(
        ego.v,
        ego_desired_changed,
        &ego.profile,
        new_leader.map(|leader| leader_view_of(ego, leader)),
    );

    let (new_follower_current, new_follower_changed) = match new_follower {
        None => (0.0, 0.0),
        Some(follower) => {
            let desired = follower.profile.desired_speed.min(side_view.speed_limit);
            let current = model.acceleration(
                follower.v,
                desired,
                &follower.profile,
                new_leader.map(|leader| leader_view_of(follower, leader)),
            );
            let changed = model.acceleration(
                follower.v,
                desired,
                &follower.profile,
                Some(leader_view_of(follower, ego)),
            );
            (current, changed)
        }
    };

    let (old_follower_current, old_follower_changed) = match own_follower {
        None => (0.0, 0.0),
        Some(follower) => {
            let desired = follower.profile.desired_speed.min(lane.speed_limit());
            let current = model.acceleration(
                follower.v,
                desired,
                &follower.profile,
                Some(leader_view_of(follower, ego)),
            );
            let changed = model.acceleration(
                follower.v,
                desired,
                &follower.profile,
                own_leader.map(|leader| leader_view_of(follower, leader)),
            );
            (current, changed)
        }
    };

    Some(SideAssessment {
        ego_current,
        ego_changed,
        new_follower_current,
        new_follower_changed,
        old_follower_current,
        old_follower_changed,
    })
}

/// Clamps any vehicle that integration placed into its predecessor, walking
/// front to back. Returns the number of patches applied.
fn patch_overlaps(
    lane: &Lane,
    vehicles: &VehiclesStorage,
    motions: &mut [VehicleMotion],
    crossings: &[Crossing],
) -> u64 {
    let mut patches = 0;

    // The constraint ahead of the frontmost staying vehicle is the rearmost
    // crossing vehicle, already past the lane end.
    let mut ahead: Option<(f64, f64, f64)> = crossings.first().map(|crossing| {
        let length = vehicles.get(crossing.id).map_or(0.0, |vehicle| vehicle.length);
        (lane.length() + crossing.overflow, length, crossing.new_v)
    });

    for motion in motions.iter_mut().rev() {
        if let Some((ahead_s, ahead_length, ahead_v)) = ahead {
            let limit = ahead_s - ahead_length - PATCH_MARGIN;
            if motion.new_s > limit {
                motion.new_s = limit.max(0.0);
                motion.new_v = motion.new_v.min(ahead_v);
                patches += 1;
            }
        }
        let length = vehicles.get(motion.id).map_or(0.0, |vehicle| vehicle.length);
        ahead = Some((motion.new_s, length, motion.new_v));
    }
    patches
}
