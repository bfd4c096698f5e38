use hybrid_traffic_sim_core::agents::DriverProfile;
use hybrid_traffic_sim_core::simulation::{Simulation, SimulationConfig};
use hybrid_traffic_sim_core::spatial_index::BucketIndex;
use hybrid_traffic_sim_core::utils::{generate_straight_road, spawn_uniform};

use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

pub fn benchmark_micro_step(c: &mut Criterion) {
    // Three busy microscopic lanes: the perceive/decide/integrate hot loop
    // plus lane-change evaluation dominate this benchmark.
    let network = generate_straight_road(1, "bench", 5000.0, 3, 30.0).unwrap();
    let config = SimulationConfig::new()
        .with_count_thresholds(10_000.0, 20.0)
        .build()
        .unwrap();
    let mut vehicles = Vec::new();
    for lane in 1..=3u64 {
        vehicles.extend(spawn_uniform(
            lane * 1000,
            lane,
            5000.0,
            300,
            15.0,
            DriverProfile::named("car"),
        ));
    }
    let mut simulation = Simulation::new(network, config, vehicles).unwrap();

    c.bench_function("micro_step_900_vehicles", |b| {
        b.iter(|| match simulation.step() {
            Ok(snapshot) => {
                let _ = black_box(snapshot);
            }
            Err(e) => panic!("Error during simulation step: {:?}", e),
        })
    });
}

pub fn benchmark_neighbor_queries(c: &mut Criterion) {
    // The leader/follower lookup is the innermost operation of the kernel.
    let index = BucketIndex::from_entries(
        5000.0,
        150.0,
        (0..1000u64).map(|i| (i + 1, 2.0 + i as f64 * 4.99)),
    );

    c.bench_function("bucket_index_leader_follower", |b| {
        b.iter(|| {
            let mut found = 0usize;
            for i in 0..1000u64 {
                let s = 2.0 + i as f64 * 4.99;
                if index.leader(black_box(s), black_box(i + 1)).is_some() {
                    found += 1;
                }
                if index.follower(black_box(s), black_box(i + 1)).is_some() {
                    found += 1;
                }
            }
            black_box(found)
        })
    });
}

criterion_group!(benches, benchmark_micro_step, benchmark_neighbor_queries);
criterion_main!(benches);
