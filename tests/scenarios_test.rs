use hybrid_traffic_sim_core::adaptive::LaneMode;
use hybrid_traffic_sim_core::agents::DriverProfile;
use hybrid_traffic_sim_core::geom::Point;
use hybrid_traffic_sim_core::models::CarFollowingModel;
use hybrid_traffic_sim_core::network::{Lane, LaneID, RoadNetwork};
use hybrid_traffic_sim_core::simulation::{Simulation, SimulationConfig, Snapshot};
use hybrid_traffic_sim_core::utils::{generate_straight_road, spawn_uniform};

/// A driver that can actually use a motorway: the stock car profile with the
/// acceleration reserve the scenario fixtures assume.
fn brisk_car() -> DriverProfile {
    DriverProfile {
        max_accel: 3.0,
        ..DriverProfile::named("car")
    }
}

/// A parked driver: zero desired speed pins vehicles in place so a lane can
/// hold an exact density for as long as a scenario needs.
fn parked() -> DriverProfile {
    DriverProfile {
        desired_speed: 0.0,
        ..DriverProfile::named("car")
    }
}

fn single_lane_network(id: LaneID, length: f64) -> RoadNetwork {
    let mut network = RoadNetwork::new();
    network
        .add_lane(
            Lane::new(id)
                .with_points(vec![Point::new(0.0, 0.0), Point::new(length, 0.0)])
                .with_speed_limit(30.0)
                .build()
                .unwrap(),
        )
        .unwrap();
    network
}

fn lane_record(snapshot: &Snapshot, lane_id: LaneID) -> &hybrid_traffic_sim_core::simulation::LaneRecord {
    snapshot
        .lanes
        .iter()
        .find(|record| record.lane_id == lane_id)
        .expect("lane must appear in the snapshot")
}

/// Free-flow on a single microscopic lane: two vehicles accelerate to the
/// speed limit, keep their order, and the lane never leaves MICRO.
#[test]
fn test_free_flow_micro_straight() {
    let network = single_lane_network(1, 1000.0);
    let config = SimulationConfig::new()
        .with_car_following(CarFollowingModel::IdmPlus)
        .build()
        .unwrap();
    let vehicles = vec![
        hybrid_traffic_sim_core::agents::Vehicle::new(1)
            .with_lane(1)
            .with_position(100.0)
            .with_speed(20.0)
            .with_profile(brisk_car())
            .build(),
        hybrid_traffic_sim_core::agents::Vehicle::new(2)
            .with_lane(1)
            .with_position(200.0)
            .with_speed(20.0)
            .with_profile(brisk_car())
            .build(),
    ];
    let mut simulation = Simulation::new(network, config, vehicles).unwrap();

    let snapshot = simulation.step_n(100).unwrap();
    assert_eq!(snapshot.tick, 100);
    assert_eq!(snapshot.vehicles.len(), 2, "Nobody exits a 1 km lane in 10 s from 200 m");
    let follower = &snapshot.vehicles[0];
    let leader = &snapshot.vehicles[1];
    assert!(
        follower.s < leader.s,
        "Ordering must hold: follower at {}, leader at {}",
        follower.s,
        leader.s
    );
    for vehicle in &snapshot.vehicles {
        assert!(
            (vehicle.v - 30.0).abs() < 0.5,
            "Vehicle {} should be within 0.5 of the 30 m/s limit, got {}",
            vehicle.id,
            vehicle.v
        );
    }
    assert_eq!(lane_record(&snapshot, 1).mode, LaneMode::Micro);
    assert_eq!(
        simulation.statistics().translations_total,
        0,
        "Density far below the enter threshold must never switch"
    );
}

/// Mode switch under load: 70 vehicles stay MICRO, 20 more pushed in at tick
/// 1 drive the density over the threshold, and by tick 3 the lane is MACRO
/// with the mass preserved.
#[test]
fn test_mode_switch_under_load() {
    let network = single_lane_network(1, 1000.0);
    let config = SimulationConfig::new()
        // Count thresholds out of the way: this scenario switches on density.
        .with_count_thresholds(500.0, 20.0)
        .build()
        .unwrap();
    let vehicles = spawn_uniform(1, 1, 1000.0, 70, 10.0, DriverProfile::named("car"));
    let mut simulation = Simulation::new(network, config, vehicles).unwrap();

    let snapshot = simulation.step().unwrap();
    assert_eq!(
        lane_record(&snapshot, 1).mode,
        LaneMode::Micro,
        "At density 0.07 the lane must stay microscopic"
    );

    for i in 0..20 {
        simulation.add_vehicle(1, 17.0 + i as f64 * 49.0, 10.0, 5.0, DriverProfile::named("car"));
    }
    let snapshot = simulation.step().unwrap();
    assert_eq!(snapshot.vehicles.len(), 90, "Influences apply at the tick-1 resolution");
    assert_eq!(lane_record(&snapshot, 1).mode, LaneMode::Micro);

    let snapshot = simulation.step().unwrap();
    assert_eq!(snapshot.tick, 3);
    let record = lane_record(&snapshot, 1);
    assert_eq!(record.mode, LaneMode::Macro, "Density 0.09 must have forced the switch");
    assert!(
        (record.vehicle_count - 90.0).abs() <= 1.0,
        "Translated mass must stay within one vehicle of 90, got {}",
        record.vehicle_count
    );
    assert_eq!(simulation.statistics().translations_total, 1);
}

/// Hysteresis hold: density oscillating inside the band (0.05 ↔ 0.07 with
/// enter 0.08 / leave 0.04) never triggers a switch over 200 ticks.
#[test]
fn test_hysteresis_hold() {
    let network = single_lane_network(1, 1000.0);
    let config = SimulationConfig::new()
        .with_count_thresholds(500.0, 20.0)
        .build()
        .unwrap();
    // 50 parked vehicles: density 0.05.
    let vehicles = spawn_uniform(1, 1, 1000.0, 50, 0.0, parked());
    let mut simulation = Simulation::new(network, config, vehicles).unwrap();

    let mut extra: Vec<u64> = Vec::new();
    for cycle in 0..5 {
        // 20 ticks at 0.05.
        let snapshot = simulation.step_n(20).unwrap();
        assert_eq!(
            lane_record(&snapshot, 1).mode,
            LaneMode::Micro,
            "Cycle {}: inside the band the lane must hold MICRO",
            cycle
        );
        // Raise to 0.07 for 20 ticks.
        for i in 0..20 {
            extra.push(simulation.add_vehicle(1, 7.0 + i as f64 * 49.0, 0.0, 5.0, parked()));
        }
        let snapshot = simulation.step_n(20).unwrap();
        assert_eq!(lane_record(&snapshot, 1).mode, LaneMode::Micro);
        // Back down to 0.05.
        for id in extra.drain(..) {
            simulation.remove_vehicle(id);
        }
    }
    let statistics = simulation.statistics();
    assert_eq!(
        statistics.translations_total, 0,
        "No switch may occur while the signal stays inside the hysteresis band"
    );
    assert_eq!(statistics.influence_drops_total, 0, "All influences were valid");
}

/// A critical intersection lane holds MICRO at density 0.1 while loaded
/// non-critical long lanes switch to MACRO on their own.
#[test]
fn test_forced_micro_at_intersection() {
    let mut network = RoadNetwork::new();
    network
        .add_lane(
            Lane::new(1)
                .with_points(vec![Point::new(0.0, 0.0), Point::new(50.0, 0.0)])
                .with_speed_limit(16.7)
                .with_critical(true)
                .build()
                .unwrap(),
        )
        .unwrap();
    for id in [2u64, 3] {
        network
            .add_lane(
                Lane::new(id)
                    .with_points(vec![
                        Point::new(0.0, id as f64 * 10.0),
                        Point::new(1000.0, id as f64 * 10.0),
                    ])
                    .with_speed_limit(30.0)
                    .build()
                    .unwrap(),
            )
            .unwrap();
    }

    let config = SimulationConfig::new().with_count_thresholds(500.0, 20.0).build().unwrap();
    let mut vehicles = spawn_uniform(1, 1, 50.0, 5, 0.0, parked());
    vehicles.extend(spawn_uniform(100, 2, 1000.0, 90, 0.0, parked()));
    vehicles.extend(spawn_uniform(300, 3, 1000.0, 90, 0.0, parked()));
    let mut simulation = Simulation::new(network, config, vehicles).unwrap();

    let snapshot = simulation.step_n(20).unwrap();
    assert_eq!(
        lane_record(&snapshot, 1).mode,
        LaneMode::Micro,
        "The critical lane must stay microscopic at density 0.1"
    );
    assert_eq!(lane_record(&snapshot, 2).mode, LaneMode::Macro);
    assert_eq!(lane_record(&snapshot, 3).mode, LaneMode::Macro);
    assert_eq!(
        simulation.statistics().translations_total,
        2,
        "Exactly the two long lanes switch"
    );
}

/// MICRO→MACRO→MICRO round trip: a loaded lane switches to MACRO, drains
/// through its downstream boundary into a microscopic successor, switches
/// back once light, and the mass balance closes within two vehicles.
#[test]
fn test_macro_round_trip_conserves_mass() {
    let mut network = RoadNetwork::new();
    network
        .add_lane(
            Lane::new(1)
                .with_points(vec![Point::new(0.0, 0.0), Point::new(1000.0, 0.0)])
                .with_speed_limit(30.0)
                .with_successors(vec![2])
                .build()
                .unwrap(),
        )
        .unwrap();
    network
        .add_lane(
            Lane::new(2)
                .with_points(vec![Point::new(1000.0, 0.0), Point::new(3000.0, 0.0)])
                .with_speed_limit(30.0)
                .with_predecessors(vec![1])
                .build()
                .unwrap(),
        )
        .unwrap();

    let config = SimulationConfig::new().build().unwrap();
    // 60 slow vehicles: count 60 ≥ enter_macro_count 50 switches immediately.
    let vehicles = spawn_uniform(1, 1, 1000.0, 60, 5.0, DriverProfile::named("car"));
    let mut simulation = Simulation::new(network, config, vehicles).unwrap();

    let snapshot = simulation.step().unwrap();
    assert_eq!(lane_record(&snapshot, 1).mode, LaneMode::Macro, "60 ≥ 50 switches at once");

    let mut returned_micro_at = None;
    let mut last = snapshot;
    for _ in 0..1500 {
        last = simulation.step().unwrap();
        if returned_micro_at.is_none() && lane_record(&last, 1).mode == LaneMode::Micro {
            returned_micro_at = Some(last.tick);
        }
    }
    let returned = returned_micro_at.expect("the drained lane must switch back to MICRO");
    assert!(returned > 10, "Dwell forbids an immediate return, got tick {}", returned);

    let statistics = simulation.statistics();
    assert!(
        statistics.translations_total >= 2,
        "The round trip needs at least two translations"
    );
    let total = last.total_mass() + statistics.exits_total as f64;
    assert!(
        (total - 60.0).abs() <= 2.0,
        "Mass must close within ±2 across the round trip: {} on network + {} exited",
        last.total_mass(),
        statistics.exits_total
    );
}

/// Lane-change reservation: mirror-image incentives aiming at the same
/// middle-lane gap; exactly one change commits and the id decides the tie.
#[test]
fn test_lane_change_reservation_tiebreak() {
    let network = generate_straight_road(1, "trunk", 1000.0, 3, 30.0).unwrap();
    let config = SimulationConfig::new().with_count_thresholds(500.0, 20.0).build().unwrap();

    // No keep-right bias: both candidates carry identical incentives.
    let unbiased = DriverProfile {
        bias_right: 0.0,
        ..DriverProfile::named("car")
    };
    // Selfish slow leaders: zero politeness keeps them from courteously
    // clearing the lane themselves.
    let slow = DriverProfile {
        desired_speed: 10.0,
        politeness: 0.0,
        ..DriverProfile::named("car")
    };
    let vehicles = vec![
        hybrid_traffic_sim_core::agents::Vehicle::new(1)
            .with_lane(1)
            .with_position(500.0)
            .with_speed(20.0)
            .with_profile(unbiased)
            .build(),
        hybrid_traffic_sim_core::agents::Vehicle::new(2)
            .with_lane(3)
            .with_position(500.0)
            .with_speed(20.0)
            .with_profile(unbiased)
            .build(),
        // Mirror-image slow leaders trapping both candidates.
        hybrid_traffic_sim_core::agents::Vehicle::new(11)
            .with_lane(1)
            .with_position(530.0)
            .with_speed(10.0)
            .with_profile(slow)
            .build(),
        hybrid_traffic_sim_core::agents::Vehicle::new(12)
            .with_lane(3)
            .with_position(530.0)
            .with_speed(10.0)
            .with_profile(slow)
            .build(),
    ];
    let mut simulation = Simulation::new(network, config, vehicles).unwrap();

    let snapshot = simulation.step().unwrap();
    assert_eq!(
        snapshot.counters.lane_change_commits, 1,
        "Exactly one of the two competing changes commits"
    );
    assert_eq!(
        snapshot.counters.lane_change_conflicts, 1,
        "The loser is dropped this tick"
    );
    let winner = snapshot.vehicles.iter().find(|record| record.id == 1).unwrap();
    let loser = snapshot.vehicles.iter().find(|record| record.id == 2).unwrap();
    assert_eq!(winner.lane_id, 2, "The lower id wins the identical-incentive tie");
    assert_eq!(loser.lane_id, 3, "The loser stays in place");

    // No collision anywhere: per-lane ordering with spacing.
    for lane_id in 1..=3u64 {
        let mut on_lane: Vec<_> = snapshot
            .vehicles
            .iter()
            .filter(|record| record.lane_id == lane_id)
            .collect();
        on_lane.sort_by(|a, b| a.s.total_cmp(&b.s));
        for pair in on_lane.windows(2) {
            assert!(
                pair[1].s - pair[0].s >= pair[1].length - 1e-9,
                "Spacing violated on lane {}: {} then {}",
                lane_id,
                pair[0].s,
                pair[1].s
            );
        }
    }
}

/// The literal mutual-swap case: two adjacent MICRO lanes, one vehicle each
/// at the same arc length, each wanting the other's lane with identical
/// incentive. Exactly one change commits, lower id first; the other vehicle
/// remains in place and the committed state holds no overlap.
#[test]
fn test_mutual_swap_commits_exactly_one() {
    let network = generate_straight_road(1, "trunk", 1000.0, 2, 30.0).unwrap();
    let config = SimulationConfig::new().with_count_thresholds(500.0, 20.0).build().unwrap();
    // Eager, unbiased drivers: a negative change threshold makes the
    // neighboring lane attractive even with nothing to gain, which is what
    // produces the mirror-image swap intent in the first place.
    let eager = DriverProfile {
        bias_right: 0.0,
        change_threshold: -0.5,
        ..DriverProfile::named("car")
    };
    let vehicles = vec![
        hybrid_traffic_sim_core::agents::Vehicle::new(1)
            .with_lane(1)
            .with_position(500.0)
            .with_speed(20.0)
            .with_profile(eager)
            .build(),
        hybrid_traffic_sim_core::agents::Vehicle::new(2)
            .with_lane(2)
            .with_position(500.0)
            .with_speed(20.0)
            .with_profile(eager)
            .build(),
    ];
    let mut simulation = Simulation::new(network, config, vehicles).unwrap();

    let snapshot = simulation.step().unwrap();
    assert_eq!(
        snapshot.counters.lane_change_commits, 1,
        "Exactly one side of the swap commits"
    );
    assert_eq!(
        snapshot.counters.lane_change_conflicts, 1,
        "The mirror request is dropped this tick"
    );
    let winner = snapshot.vehicles.iter().find(|record| record.id == 1).unwrap();
    let loser = snapshot.vehicles.iter().find(|record| record.id == 2).unwrap();
    assert_eq!(winner.lane_id, 2, "The lower id wins the identical-incentive tie");
    assert_eq!(loser.lane_id, 2, "The loser remains in place");
    let gap = (loser.s - winner.s).abs();
    assert!(
        gap >= winner.length - 1e-9,
        "No collision: spacing must be restored after the commit, got {}",
        gap
    );
    assert!(
        snapshot.counters.patches >= 1,
        "The transient overlap is resolved by a counted patch"
    );
}

/// Density bounds: a macroscopic lane never leaves `[0, ρ_jam]` however the
/// upstream demand hammers it.
#[test]
fn test_density_bounds_under_demand() {
    let mut network = RoadNetwork::new();
    network
        .add_lane(
            Lane::new(1)
                .with_points(vec![Point::new(0.0, 0.0), Point::new(1000.0, 0.0)])
                .with_speed_limit(30.0)
                .with_successors(vec![2])
                .build()
                .unwrap(),
        )
        .unwrap();
    network
        .add_lane(
            Lane::new(2)
                .with_points(vec![Point::new(1000.0, 0.0), Point::new(2000.0, 0.0)])
                .with_speed_limit(30.0)
                .with_predecessors(vec![1])
                .build()
                .unwrap(),
        )
        .unwrap();
    let config = SimulationConfig::new().build().unwrap();
    let mut vehicles = spawn_uniform(1, 1, 1000.0, 80, 10.0, DriverProfile::named("car"));
    vehicles.extend(spawn_uniform(100, 2, 1000.0, 80, 10.0, DriverProfile::named("car")));
    let mut simulation = Simulation::new(network, config, vehicles).unwrap();

    for _ in 0..200 {
        let snapshot = simulation.step().unwrap();
        for lane in &snapshot.lanes {
            assert!(
                lane.mean_density <= 0.15 + 1e-9,
                "Tick {}: lane {} mean density {} above jam",
                snapshot.tick,
                lane.lane_id,
                lane.mean_density
            );
            assert!(lane.mean_density >= -1e-12);
        }
    }
}
