use crate::agents::{DriverProfile, DriverSummary, Vehicle, VehicleID, VehiclesStorage};
use crate::macroscopic::CellGrid;
use crate::micro::MicroState;
use crate::models::FundamentalDiagram;
use crate::network::{Lane, LaneID};
use std::fmt;

/// Clearance enforced between vehicles emitted by `decode_micro`, metres.
const EMISSION_MARGIN: f64 = 0.01;

/// Custom error type for translation failures.
#[derive(Debug, Clone)]
pub enum TranslationError {
    /// A switching event changed the lane's mass by more than one vehicle.
    MassMismatch {
        lane_id: LaneID,
        before: f64,
        after: f64,
    },
}

impl fmt::Display for TranslationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranslationError::MassMismatch { lane_id, before, after } => {
                write!(
                    f,
                    "Translation on lane '{}' broke conservation: mass {} -> {}",
                    lane_id, before, after
                )
            }
        }
    }
}

impl std::error::Error for TranslationError {}

/// Which driver parameters restored vehicles receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TranslationProfilePolicy {
    /// Use the configured default profile.
    #[default]
    DefaultProfile,
    /// Use the retained statistical summary of the vehicles last evicted
    /// from this lane, falling back to the default when none exists.
    RetainedSummary,
}

impl fmt::Display for TranslationProfilePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let as_str = match self {
            TranslationProfilePolicy::DefaultProfile => "default_profile",
            TranslationProfilePolicy::RetainedSummary => "retained_summary",
        };
        write!(f, "{}", as_str)
    }
}

/// Result of encoding a microscopic lane into cells.
#[derive(Debug, Clone)]
pub struct MacroEncoding {
    /// The cell grid replacing the vehicle sequence.
    pub grid: CellGrid,
    /// Vehicles to delete from the arena, in lane order.
    pub evicted: Vec<VehicleID>,
    /// Statistics of the evicted population.
    pub summary: DriverSummary,
}

/// Micro → macro: partitions `[0, L)` into cells and sets each cell's
/// density to its vehicle count over `Δx`, binning by vehicle midpoint.
///
/// Cells crowded past `ρ_jam` spill the excess upstream so no mass is lost
/// to clamping; jam capacity cannot be exceeded lane-wide because vehicle
/// spacing is at least one vehicle length.
///
/// # Arguments
/// * `lane` - The switching lane.
/// * `state` - Its microscopic state.
/// * `vehicles` - The vehicle arena (read-only; the caller deletes the
///   evicted ids afterwards).
/// * `num_cells` - Number of cells for the grid.
/// * `jam_density` - `ρ_jam` bound.
///
/// # Returns
/// The encoding, with conservation already verified against the vehicle
/// count.
pub fn encode_macro(
    lane: &Lane,
    state: &MicroState,
    vehicles: &VehiclesStorage,
    num_cells: usize,
    jam_density: f64,
) -> Result<MacroEncoding, TranslationError> {
    let cell_length = lane.length() / num_cells as f64;
    let mut counts = vec![0.0_f64; num_cells];
    let mut evicted = Vec::with_capacity(state.len());
    let mut summary = DriverSummary::new();

    for &vehicle_id in state.order() {
        let Some(vehicle) = vehicles.get(vehicle_id) else {
            continue;
        };
        let midpoint = (vehicle.s - vehicle.length / 2.0).clamp(0.0, lane.length() - 1e-9);
        let cell = ((midpoint / cell_length) as usize).min(num_cells - 1);
        counts[cell] += 1.0;
        summary.record(&vehicle.profile, vehicle.length);
        evicted.push(vehicle_id);
    }

    // Spill crowded cells upstream instead of clamping mass away.
    let capacity = jam_density * cell_length;
    for cell in (1..num_cells).rev() {
        if counts[cell] > capacity {
            let excess = counts[cell] - capacity;
            counts[cell] = capacity;
            counts[cell - 1] += excess;
        }
    }

    let densities: Vec<f64> = counts.iter().map(|count| count / cell_length).collect();
    let grid = CellGrid::from_densities(densities, cell_length, jam_density)
        .map_err(|_| TranslationError::MassMismatch {
            lane_id: lane.id(),
            before: evicted.len() as f64,
            after: 0.0,
        })?;

    verify_conservation(lane.id(), evicted.len() as f64, grid.total_mass())?;

    Ok(MacroEncoding { grid, evicted, summary })
}

/// Macro → micro: sweeps cells upstream to downstream accumulating a
/// fractional carry; each time the carry reaches one vehicle, a vehicle is
/// emitted inside the current cell at the arc length where the running mass
/// crossed the integer, with the cell's equilibrium speed.
///
/// The sub-vehicle remainder of the sweep is dropped; that is the one-vehicle
/// rounding the conservation contract allows per switching event.
///
/// # Arguments
/// * `lane` - The switching lane.
/// * `grid` - Its macroscopic state.
/// * `diagram` - Fundamental diagram supplying equilibrium speeds.
/// * `profile` - Driver parameters for the restored vehicles.
/// * `nominal_length` - Vehicle length for the restored vehicles, metres.
/// * `next_id` - Allocator for fresh vehicle ids; called once per vehicle in
///   emission order so ids ascend downstream deterministically.
///
/// # Returns
/// The restored vehicles ascending by position, conservation verified.
pub fn decode_micro(
    lane: &Lane,
    grid: &CellGrid,
    diagram: &FundamentalDiagram,
    profile: DriverProfile,
    nominal_length: f64,
    next_id: &mut dyn FnMut() -> VehicleID,
) -> Result<Vec<Vehicle>, TranslationError> {
    let cell_length = grid.cell_length();
    let mass_before = grid.total_mass();
    let mut vehicles = Vec::new();
    let mut carry = 0.0_f64;

    for (cell, &density) in grid.densities().iter().enumerate() {
        let cell_mass = density * cell_length;
        if cell_mass <= 0.0 {
            continue;
        }
        let cell_start = cell as f64 * cell_length;
        let speed = diagram.equilibrium_speed(density);
        let before = carry;
        carry += cell_mass;
        let mut emitted_in_cell = 0.0;
        while carry >= 1.0 {
            // Arc length within the cell where the running mass crossed the
            // next integer.
            let fraction = ((1.0 - before + emitted_in_cell) / cell_mass).clamp(0.0, 1.0);
            let s = cell_start + fraction * cell_length;
            vehicles.push(
                Vehicle::new(next_id())
                    .with_lane(lane.id())
                    .with_position(s.min(lane.length() - EMISSION_MARGIN))
                    .with_speed(speed)
                    .with_length(nominal_length)
                    .with_profile(profile)
                    .build(),
            );
            carry -= 1.0;
            emitted_in_cell += 1.0;
        }
    }

    // Walk front to back restoring the spacing invariant where cell
    // boundaries produced tight pairs.
    for i in (0..vehicles.len().saturating_sub(1)).rev() {
        let limit = vehicles[i + 1].s - vehicles[i + 1].length - EMISSION_MARGIN;
        if vehicles[i].s > limit {
            vehicles[i].s = limit.max(0.0);
        }
    }

    verify_conservation(lane.id(), mass_before, vehicles.len() as f64)?;
    Ok(vehicles)
}

/// Accumulates macro→micro boundary flux into a fractional-vehicle carry and
/// returns the number of whole vehicles ready to spawn.
///
/// The carry persists across ticks in the scheduler's per-boundary map, so
/// no mass is lost to sub-vehicle flux.
///
/// # Arguments
/// * `carry` - The boundary's carry, updated in place.
/// * `flux` - Boundary flux in vehicles per second.
/// * `dt` - Tick length, seconds.
pub fn accrue_boundary_carry(carry: &mut f64, flux: f64, dt: f64) -> u32 {
    *carry += flux * dt;
    let whole = carry.floor().max(0.0);
    *carry -= whole;
    whole as u32
}

/// Checks the translator conservation contract
/// `|mass_before − mass_after| ≤ 1`.
///
/// # Returns
/// `Ok(())`, or the fatal `TranslationError::MassMismatch`.
pub fn verify_conservation(
    lane_id: LaneID,
    before: f64,
    after: f64,
) -> Result<(), TranslationError> {
    if (before - after).abs() <= 1.0 + 1e-9 {
        Ok(())
    } else {
        Err(TranslationError::MassMismatch { lane_id, before, after })
    }
}
