use crate::agents::VehiclesStorage;
use crate::micro::MicroState;
use crate::network::Lane;

/// Per-cell vehicle density over a microscopic lane, vehicles per metre.
///
/// Vehicles are binned by midpoint, matching the encoder, so the profile a
/// consumer reads is exactly the density the lane would switch to.
///
/// # Arguments
/// * `lane` - The lane.
/// * `state` - Its microscopic state.
/// * `vehicles` - The vehicle arena.
/// * `num_cells` - Profile resolution.
pub fn extract_density_profile(
    lane: &Lane,
    state: &MicroState,
    vehicles: &VehiclesStorage,
    num_cells: usize,
) -> Vec<f64> {
    let cell_length = lane.length() / num_cells as f64;
    let mut counts = vec![0.0_f64; num_cells];
    for &vehicle_id in state.order() {
        if let Some(vehicle) = vehicles.get(vehicle_id) {
            let midpoint = (vehicle.s - vehicle.length / 2.0).clamp(0.0, lane.length() - 1e-9);
            let cell = ((midpoint / cell_length) as usize).min(num_cells - 1);
            counts[cell] += 1.0;
        }
    }
    counts.iter().map(|count| count / cell_length).collect()
}

/// Per-cell mean speed over a microscopic lane, m/s. Empty cells report the
/// lane's speed limit.
pub fn extract_speed_profile(
    lane: &Lane,
    state: &MicroState,
    vehicles: &VehiclesStorage,
    num_cells: usize,
) -> Vec<f64> {
    let cell_length = lane.length() / num_cells as f64;
    let mut counts = vec![0.0_f64; num_cells];
    let mut speed_sums = vec![0.0_f64; num_cells];
    for &vehicle_id in state.order() {
        if let Some(vehicle) = vehicles.get(vehicle_id) {
            let midpoint = (vehicle.s - vehicle.length / 2.0).clamp(0.0, lane.length() - 1e-9);
            let cell = ((midpoint / cell_length) as usize).min(num_cells - 1);
            counts[cell] += 1.0;
            speed_sums[cell] += vehicle.v;
        }
    }
    counts
        .iter()
        .zip(&speed_sums)
        .map(|(&count, &sum)| if count > 0.0 { sum / count } else { lane.speed_limit() })
        .collect()
}

/// Per-cell flow over a microscopic lane, vehicles per second: density times
/// mean speed per cell.
pub fn extract_flow_profile(
    lane: &Lane,
    state: &MicroState,
    vehicles: &VehiclesStorage,
    num_cells: usize,
) -> Vec<f64> {
    let densities = extract_density_profile(lane, state, vehicles, num_cells);
    let speeds = extract_speed_profile(lane, state, vehicles, num_cells);
    densities
        .iter()
        .zip(&speeds)
        .map(|(&density, &speed)| if density > 0.0 { density * speed } else { 0.0 })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::Vehicle;
    use crate::geom::Point;

    fn lane() -> Lane {
        Lane::new(1)
            .with_points(vec![Point::new(0.0, 0.0), Point::new(100.0, 0.0)])
            .with_speed_limit(30.0)
            .build()
            .unwrap()
    }

    fn populate() -> (VehiclesStorage, MicroState) {
        // Two vehicles in the first quarter, one in the last.
        let mut vehicles = VehiclesStorage::new();
        for (id, s, v) in [(1u64, 10.0, 10.0), (2, 20.0, 20.0), (3, 90.0, 30.0)] {
            vehicles
                .insert_vehicle(Vehicle::new(id).with_lane(1).with_position(s).with_speed(v).build());
        }
        let state = MicroState::from_vehicles(100.0, 150.0, [(1, 10.0), (2, 20.0), (3, 90.0)]);
        (vehicles, state)
    }

    #[test]
    fn test_density_profile_bins_by_midpoint() {
        let lane = lane();
        let (vehicles, state) = populate();
        let profile = extract_density_profile(&lane, &state, &vehicles, 4);
        assert!((profile[0] - 2.0 / 25.0).abs() < 1e-12, "First quarter holds two vehicles");
        assert_eq!(profile[1], 0.0);
        assert_eq!(profile[2], 0.0);
        assert!((profile[3] - 1.0 / 25.0).abs() < 1e-12, "Last quarter holds one vehicle");
    }

    #[test]
    fn test_speed_and_flow_profiles() {
        let lane = lane();
        let (vehicles, state) = populate();
        let speeds = extract_speed_profile(&lane, &state, &vehicles, 4);
        assert!((speeds[0] - 15.0).abs() < 1e-12, "Mean of 10 and 20 m/s");
        assert_eq!(speeds[1], 30.0, "Empty cells report the speed limit");
        let flows = extract_flow_profile(&lane, &state, &vehicles, 4);
        assert!((flows[0] - (2.0 / 25.0) * 15.0).abs() < 1e-12);
        assert_eq!(flows[1], 0.0, "Empty cells carry no flow");
    }
}
