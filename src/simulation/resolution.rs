use crate::agents::{Vehicle, VehicleID, VehiclesStorage};
use crate::flows::FlowSource;
use crate::log_detailed;
use crate::macroscopic::{self, MacroStepOutput};
use crate::micro::{LaneChangeRequest, MicroState, MicroStepOutput};
use crate::models::FundamentalDiagram;
use crate::network::{LaneID, RoadNetwork};
use crate::simulation::{LaneRuntime, LaneState, SimulationConfig, TickCounters};
use crate::verbose::{
    EVENT_EXIT, EVENT_INFLUENCE_DROPPED, EVENT_LANE_CHANGE_COMMIT, EVENT_LANE_CHANGE_CONFLICT,
    EVENT_TRANSFER,
};
use indexmap::IndexMap;
use rand::rngs::StdRng;
use std::collections::HashSet;

/// Clearance enforced when the commit pass separates overlapping vehicles,
/// metres.
const COMMIT_MARGIN: f64 = 0.01;

/// One lane's scratch output from the parallel stepper pass.
#[derive(Debug, Clone)]
pub(crate) enum LaneStepOutput {
    Micro(MicroStepOutput),
    Macro(MacroStepOutput),
}

/// External influences applied at the next resolution pass.
#[derive(Debug, Clone)]
pub(crate) enum Influence {
    AddVehicle(Vehicle),
    RemoveVehicle(VehicleID),
}

/// Everything the sequential resolution pass works on. Borrowed from the
/// scheduler for exactly the duration of phase 5.
pub(crate) struct ResolveContext<'a> {
    pub network: &'a RoadNetwork,
    pub config: &'a SimulationConfig,
    pub diagram: &'a FundamentalDiagram,
    pub vehicles: &'a mut VehiclesStorage,
    pub runtimes: &'a mut [LaneRuntime],
    pub boundary_carries: &'a mut IndexMap<(LaneID, LaneID), f64>,
    pub influences: &'a mut Vec<Influence>,
    pub flow_sources: &'a mut [FlowSource],
    pub rng: &'a mut StdRng,
    pub next_vehicle_id: &'a mut VehicleID,
    pub tick: u64,
}

/// What resolution reports back to the scheduler.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct ResolveOutcome {
    pub counters: TickCounters,
    /// Vehicles that left the network through exits this tick.
    pub exits: u64,
}

/// Phase 5 of the tick: all cross-lane work, strictly sequential, in network
/// registration order with fixed tie-breaks.
///
/// Order of sub-passes: commit per-lane scratch, transfer crossing vehicles,
/// settle macroscopic boundary flux, commit lane changes under the
/// reservation rule, apply queued influences, run flow sources, then rebuild
/// every mutated microscopic lane (restoring the ordering and spacing
/// invariants, counting patches).
pub(crate) fn resolve_tick(
    mut ctx: ResolveContext<'_>,
    outputs: Vec<LaneStepOutput>,
) -> ResolveOutcome {
    let lane_count = ctx.runtimes.len();
    let mut outcome = ResolveOutcome::default();
    // Post-integration (id, s) membership per microscopic lane; the micro
    // states are rebuilt from these lists at the end of the pass.
    let mut lane_vehicles: Vec<Vec<(VehicleID, f64)>> = vec![Vec::new(); lane_count];
    let mut change_requests: Vec<LaneChangeRequest> = Vec::new();
    // Remaining sending capacity of each macroscopic lane's last cell.
    let mut sending_remaining: Vec<f64> = vec![0.0; lane_count];

    // Commit per-lane scratch: vehicle motion and interior cell updates.
    for (idx, output) in outputs.iter().enumerate() {
        match output {
            LaneStepOutput::Micro(micro) => {
                for motion in &micro.motions {
                    if let Some(vehicle) = ctx.vehicles.get_mut(motion.id) {
                        vehicle.s = motion.new_s;
                        vehicle.v = motion.new_v;
                        vehicle.a = motion.new_a;
                        lane_vehicles[idx].push((motion.id, motion.new_s));
                    }
                }
                outcome.counters.patches += micro.patches;
                change_requests.extend(micro.change_requests.iter().copied());
            }
            LaneStepOutput::Macro(output) => {
                sending_remaining[idx] = output.sending_last;
                if let Some(grid) = ctx.runtimes[idx].state.as_macro_mut() {
                    macroscopic::commit(grid, output.clone());
                }
            }
        }
    }

    // Transfer vehicles that crossed their lane end.
    transfer_crossings(&mut ctx, &outputs, &mut lane_vehicles, &mut outcome);

    // Settle inter-lane flux at macroscopic lane ends.
    settle_macro_boundaries(&mut ctx, &mut sending_remaining, &mut lane_vehicles);

    // Commit queued lane changes under the reservation rule.
    commit_lane_changes(&mut ctx, change_requests, &mut lane_vehicles, &mut outcome.counters);

    // Apply external influences.
    apply_influences(&mut ctx, &mut lane_vehicles, &mut outcome.counters);

    // Run flow sources.
    run_flow_sources(&mut ctx, &mut lane_vehicles);

    // Rebuild microscopic lanes: restore ordering and spacing invariants.
    outcome.counters.patches += rebuild_micro_lanes(&mut ctx, lane_vehicles);

    outcome
}

/// Moves vehicles whose integration crossed out of their lane to the chosen
/// successor, or out of the network.
fn transfer_crossings(
    ctx: &mut ResolveContext<'_>,
    outputs: &[LaneStepOutput],
    lane_vehicles: &mut [Vec<(VehicleID, f64)>],
    outcome: &mut ResolveOutcome,
) {
    for (idx, output) in outputs.iter().enumerate() {
        let LaneStepOutput::Micro(micro) = output else {
            continue;
        };
        let Some(source_lane) = ctx.network.lane_at(idx) else {
            continue;
        };
        for crossing in &micro.crossings {
            let Some(vehicle) = ctx.vehicles.get_mut(crossing.id) else {
                continue;
            };
            vehicle.v = crossing.new_v;
            vehicle.a = crossing.new_a;
            let successor = vehicle.pick_successor(source_lane.successors());
            let Some(successor_id) = successor else {
                // Network exit.
                log_detailed!(EVENT_EXIT, "vehicle left the network", vehicle_id = crossing.id);
                ctx.vehicles.remove_vehicle(crossing.id);
                outcome.exits += 1;
                continue;
            };
            let Some(successor_idx) = ctx.network.lane_index(successor_id) else {
                continue;
            };
            match &mut ctx.runtimes[successor_idx].state {
                LaneState::Micro(_) => {
                    let successor_lane = ctx.network.lane_at(successor_idx).unwrap_or(source_lane);
                    let entry_s = crossing.overflow.min(successor_lane.length() - COMMIT_MARGIN);
                    if let Some(vehicle) = ctx.vehicles.get_mut(crossing.id) {
                        vehicle.lane = successor_id;
                        vehicle.s = entry_s;
                    }
                    lane_vehicles[successor_idx].push((crossing.id, entry_s));
                    log_detailed!(
                        EVENT_TRANSFER,
                        "vehicle crossed to successor lane",
                        vehicle_id = crossing.id,
                        lane_id = successor_id
                    );
                }
                LaneState::Macro(grid) => {
                    // Whole-vehicle admission only: a full first cell makes
                    // the vehicle wait at the end of its lane.
                    let capacity =
                        (grid.jam_density() - grid.first_density()) * grid.cell_length();
                    if capacity >= 1.0 {
                        grid.add_mass(0, 1.0);
                        ctx.vehicles.remove_vehicle(crossing.id);
                        log_detailed!(
                            EVENT_TRANSFER,
                            "vehicle absorbed by macroscopic successor",
                            vehicle_id = crossing.id,
                            lane_id = successor_id
                        );
                    } else {
                        let hold_s = source_lane.length() - COMMIT_MARGIN;
                        if let Some(vehicle) = ctx.vehicles.get_mut(crossing.id) {
                            vehicle.lane = source_lane.id();
                            vehicle.s = hold_s;
                            vehicle.v = 0.0;
                        }
                        lane_vehicles[idx].push((crossing.id, hold_s));
                    }
                }
            }
        }
    }
}

/// Settles flux across macroscopic lane ends: macro→macro Godunov exchange,
/// macro→micro carry-based vehicle emission, and free outflow at exits.
fn settle_macro_boundaries(
    ctx: &mut ResolveContext<'_>,
    sending_remaining: &mut [f64],
    lane_vehicles: &mut [Vec<(VehicleID, f64)>],
) {
    let dt = ctx.config.dt;
    for idx in 0..ctx.runtimes.len() {
        if !matches!(ctx.runtimes[idx].state, LaneState::Macro(_)) {
            continue;
        }
        let Some(lane) = ctx.network.lane_at(idx) else {
            continue;
        };
        if lane.successors().is_empty() {
            // Free outflow at a network exit.
            let outflow = sending_remaining[idx] * dt;
            if let Some(grid) = ctx.runtimes[idx].state.as_macro_mut() {
                grid.add_mass(grid.num_cells() - 1, -outflow);
            }
            continue;
        }
        for &successor_id in lane.successors() {
            let Some(successor_idx) = ctx.network.lane_index(successor_id) else {
                continue;
            };
            if sending_remaining[idx] <= 0.0 {
                break;
            }
            if matches!(ctx.runtimes[successor_idx].state, LaneState::Macro(_)) {
                let (up, down) = two_runtimes(ctx.runtimes, idx, successor_idx);
                let (Some(up_grid), Some(down_grid)) =
                    (up.state.as_macro_mut(), down.state.as_macro_mut())
                else {
                    continue;
                };
                let flux =
                    sending_remaining[idx].min(ctx.diagram.receiving(down_grid.first_density()));
                if flux <= 0.0 {
                    continue;
                }
                let absorbed = down_grid.add_mass(0, flux * dt);
                up_grid.add_mass(up_grid.num_cells() - 1, -absorbed);
                sending_remaining[idx] -= absorbed / dt;
            } else {
                // Macro → micro boundary: mass drains into a per-boundary
                // carry; whole vehicles spawn at the successor entry while
                // the entry gap is free.
                let entry_margin =
                    ctx.config.nominal_vehicle_length + ctx.config.default_profile.min_gap;
                let entry_free = |members: &[(VehicleID, f64)]| {
                    members.iter().all(|&(_, s)| s > entry_margin)
                };
                let receiving = if entry_free(&lane_vehicles[successor_idx]) {
                    ctx.config.max_flow
                } else {
                    0.0
                };
                let flux = sending_remaining[idx].min(receiving);
                let emitted_speed = ctx.runtimes[idx]
                    .state
                    .as_macro()
                    .map_or(ctx.diagram.free_flow_speed, |grid| {
                        ctx.diagram.equilibrium_speed(grid.last_density())
                    });
                let carry = ctx
                    .boundary_carries
                    .entry((lane.id(), successor_id))
                    .or_insert(0.0);
                if flux > 0.0 {
                    if let Some(up_grid) = ctx.runtimes[idx].state.as_macro_mut() {
                        let removed = -up_grid.add_mass(up_grid.num_cells() - 1, -(flux * dt));
                        *carry += removed;
                        sending_remaining[idx] -= removed / dt;
                    }
                }
                while *carry >= 1.0 && entry_free(&lane_vehicles[successor_idx]) {
                    *carry -= 1.0;
                    let id = *ctx.next_vehicle_id;
                    *ctx.next_vehicle_id += 1;
                    let vehicle = Vehicle::new(id)
                        .with_lane(successor_id)
                        .with_position(0.0)
                        .with_speed(emitted_speed)
                        .with_length(ctx.config.nominal_vehicle_length)
                        .with_profile(ctx.config.default_profile)
                        .build();
                    ctx.vehicles.insert_vehicle(vehicle);
                    lane_vehicles[successor_idx].push((id, 0.0));
                }
            }
        }
    }
}

/// Commits queued lane changes in (incentive desc, id asc) order under the
/// per-target-lane reservation rule.
fn commit_lane_changes(
    ctx: &mut ResolveContext<'_>,
    mut requests: Vec<LaneChangeRequest>,
    lane_vehicles: &mut [Vec<(VehicleID, f64)>],
    counters: &mut TickCounters,
) {
    requests.sort_by(|a, b| {
        b.incentive
            .total_cmp(&a.incentive)
            .then_with(|| a.vehicle.cmp(&b.vehicle))
    });

    let requesting: HashSet<VehicleID> = requests.iter().map(|request| request.vehicle).collect();
    let mut reservations: Vec<(LaneID, (f64, f64))> = Vec::new();
    let mut departed: HashSet<VehicleID> = HashSet::new();
    let mut denied: HashSet<VehicleID> = HashSet::new();

    let overlaps = |a: (f64, f64), b: (f64, f64)| a.0 <= b.1 && b.0 <= a.1;

    'requests: for request in requests {
        let interval = request.interval();

        // (a) An earlier (higher-priority) reservation on the target lane.
        // (c) An earlier reservation intruding on the requester's own lane:
        //     the requester must react to the intruder instead of leaving.
        for &(lane_id, reserved) in &reservations {
            let clashes = (lane_id == request.to_lane || lane_id == request.from_lane)
                && overlaps(reserved, interval);
            if clashes {
                counters.lane_change_conflicts += 1;
                denied.insert(request.vehicle);
                log_detailed!(
                    EVENT_LANE_CHANGE_CONFLICT,
                    "lane change dropped by reservation",
                    vehicle_id = request.vehicle,
                    lane_id = request.to_lane
                );
                continue 'requests;
            }
        }

        // (b) A remaining occupant of the target lane. An occupant still
        // queued with its own change is treated as departing; should its
        // request later be dropped, the end-of-tick patch separates the
        // overlap. This is what lets a mutual swap commit its winning side.
        let Some(target_idx) = ctx.network.lane_index(request.to_lane) else {
            counters.lane_change_conflicts += 1;
            denied.insert(request.vehicle);
            continue;
        };
        for &(occupant_id, occupant_s) in &lane_vehicles[target_idx] {
            if occupant_id == request.vehicle || departed.contains(&occupant_id) {
                continue;
            }
            if requesting.contains(&occupant_id) && !denied.contains(&occupant_id) {
                continue;
            }
            let occupant_length = ctx
                .vehicles
                .get(occupant_id)
                .map_or(ctx.config.nominal_vehicle_length, |vehicle| vehicle.length);
            if overlaps((occupant_s - occupant_length, occupant_s), interval) {
                counters.lane_change_conflicts += 1;
                denied.insert(request.vehicle);
                log_detailed!(
                    EVENT_LANE_CHANGE_CONFLICT,
                    "lane change dropped by occupant",
                    vehicle_id = request.vehicle,
                    lane_id = request.to_lane
                );
                continue 'requests;
            }
        }

        // Granted.
        let Some(from_idx) = ctx.network.lane_index(request.from_lane) else {
            continue;
        };
        if let Some(vehicle) = ctx.vehicles.get_mut(request.vehicle) {
            vehicle.lane = request.to_lane;
        }
        lane_vehicles[from_idx].retain(|&(id, _)| id != request.vehicle);
        lane_vehicles[target_idx].push((request.vehicle, request.new_s));
        reservations.push((request.to_lane, interval));
        departed.insert(request.vehicle);
        counters.lane_change_commits += 1;
        log_detailed!(
            EVENT_LANE_CHANGE_COMMIT,
            "lane change committed",
            vehicle_id = request.vehicle,
            lane_id = request.to_lane
        );
    }
}

/// Applies queued vehicle additions and removals; invalid influences are
/// reported and dropped.
fn apply_influences(
    ctx: &mut ResolveContext<'_>,
    lane_vehicles: &mut [Vec<(VehicleID, f64)>],
    counters: &mut TickCounters,
) {
    let influences = std::mem::take(ctx.influences);
    for influence in influences {
        match influence {
            Influence::AddVehicle(mut vehicle) => {
                let Some(idx) = ctx.network.lane_index(vehicle.lane) else {
                    tracing::warn!(
                        event = EVENT_INFLUENCE_DROPPED,
                        vehicle_id = vehicle.id,
                        lane_id = vehicle.lane,
                        "add_vehicle on unknown lane"
                    );
                    counters.influence_drops += 1;
                    continue;
                };
                let Some(lane) = ctx.network.lane_at(idx) else {
                    continue;
                };
                vehicle.s = vehicle.s.clamp(0.0, lane.length() - COMMIT_MARGIN);
                match &mut ctx.runtimes[idx].state {
                    LaneState::Micro(_) => {
                        lane_vehicles[idx].push((vehicle.id, vehicle.s));
                        ctx.vehicles.insert_vehicle(vehicle);
                    }
                    LaneState::Macro(grid) => {
                        // On a macroscopic lane the vehicle enters as mass.
                        let cell = ((vehicle.s / grid.cell_length()) as usize)
                            .min(grid.num_cells() - 1);
                        let capacity =
                            (grid.jam_density() - grid.densities()[cell]) * grid.cell_length();
                        if capacity >= 1.0 {
                            grid.add_mass(cell, 1.0);
                        } else {
                            tracing::warn!(
                                event = EVENT_INFLUENCE_DROPPED,
                                vehicle_id = vehicle.id,
                                lane_id = vehicle.lane,
                                "add_vehicle into a jammed macroscopic cell"
                            );
                            counters.influence_drops += 1;
                        }
                    }
                }
            }
            Influence::RemoveVehicle(vehicle_id) => match ctx.vehicles.remove_vehicle(vehicle_id) {
                Some(vehicle) => {
                    if let Some(idx) = ctx.network.lane_index(vehicle.lane) {
                        lane_vehicles[idx].retain(|&(id, _)| id != vehicle_id);
                    }
                }
                None => {
                    tracing::warn!(
                        event = EVENT_INFLUENCE_DROPPED,
                        vehicle_id = vehicle_id,
                        "remove_vehicle of unknown id"
                    );
                    counters.influence_drops += 1;
                }
            },
        }
    }
}

/// Polls flow sources and spawns what the entries can absorb; the rest stays
/// in each source's carry.
fn run_flow_sources(ctx: &mut ResolveContext<'_>, lane_vehicles: &mut [Vec<(VehicleID, f64)>]) {
    for source in ctx.flow_sources.iter_mut() {
        let Some(idx) = ctx.network.lane_index(source.lane) else {
            continue;
        };
        let wanted = source.poll(ctx.tick, ctx.config.dt, ctx.rng);
        if wanted == 0 {
            continue;
        }
        let Some(lane) = ctx.network.lane_at(idx) else {
            continue;
        };
        match &mut ctx.runtimes[idx].state {
            LaneState::Macro(grid) => {
                for spawned in 0..wanted {
                    let capacity = (grid.jam_density() - grid.first_density()) * grid.cell_length();
                    if capacity >= 1.0 {
                        grid.add_mass(0, 1.0);
                    } else {
                        source.defer(wanted - spawned);
                        break;
                    }
                }
            }
            LaneState::Micro(_) => {
                let entry_margin = source.vehicle_length + source.profile.min_gap;
                for spawned in 0..wanted {
                    let entry_free =
                        lane_vehicles[idx].iter().all(|&(_, s)| s > entry_margin);
                    if !entry_free {
                        source.defer(wanted - spawned);
                        break;
                    }
                    let id = *ctx.next_vehicle_id;
                    *ctx.next_vehicle_id += 1;
                    let vehicle = Vehicle::new(id)
                        .with_lane(source.lane)
                        .with_position(0.0)
                        .with_speed(source.speed.min(lane.speed_limit()))
                        .with_length(source.vehicle_length)
                        .with_profile(source.profile)
                        .build();
                    ctx.vehicles.insert_vehicle(vehicle);
                    lane_vehicles[idx].push((id, 0.0));
                }
            }
        }
    }
}

/// Rebuilds every microscopic lane from its membership list, restoring the
/// ordering and spacing invariants. Returns the number of spacing patches
/// applied.
fn rebuild_micro_lanes(
    ctx: &mut ResolveContext<'_>,
    lane_vehicles: Vec<Vec<(VehicleID, f64)>>,
) -> u64 {
    let mut patches = 0;
    for (idx, mut members) in lane_vehicles.into_iter().enumerate() {
        if !ctx.runtimes[idx].state.is_micro() {
            continue;
        }
        let Some(lane) = ctx.network.lane_at(idx) else {
            continue;
        };
        members.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

        // Walk front to back clamping anything inside its predecessor.
        for i in (0..members.len().saturating_sub(1)).rev() {
            let (ahead_id, ahead_s) = members[i + 1];
            let ahead_length = ctx
                .vehicles
                .get(ahead_id)
                .map_or(ctx.config.nominal_vehicle_length, |vehicle| vehicle.length);
            let ahead_v = ctx.vehicles.get(ahead_id).map_or(0.0, |vehicle| vehicle.v);
            let limit = ahead_s - ahead_length - COMMIT_MARGIN;
            if members[i].1 > limit {
                members[i].1 = limit.max(0.0);
                if let Some(vehicle) = ctx.vehicles.get_mut(members[i].0) {
                    vehicle.s = members[i].1;
                    vehicle.v = vehicle.v.min(ahead_v);
                }
                patches += 1;
            }
        }

        ctx.runtimes[idx].state = LaneState::Micro(MicroState::from_vehicles(
            lane.length(),
            ctx.config.interaction_range,
            members,
        ));
    }
    patches
}

/// Two distinct mutable lane runtimes out of the slice.
fn two_runtimes(
    runtimes: &mut [LaneRuntime],
    a: usize,
    b: usize,
) -> (&mut LaneRuntime, &mut LaneRuntime) {
    debug_assert_ne!(a, b);
    if a < b {
        let (left, right) = runtimes.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = runtimes.split_at_mut(a);
        (&mut right[0], &mut left[b])
    }
}
