use crate::macroscopic::CellGrid;
use crate::models::FundamentalDiagram;

/// Scratch result of one lane's interior Godunov update.
///
/// Produced by a worker during the parallel stepper pass; the sequential
/// resolution pass applies `densities`/`fluxes` to the live grid and uses the
/// end-cell capacities to settle inter-lane boundary flux.
#[derive(Debug, Clone)]
pub struct MacroStepOutput {
    /// Updated densities, boundary flux not yet applied.
    pub densities: Vec<f64>,
    /// Interior boundary fluxes; `fluxes[i]` crossed from cell `i` to
    /// cell `i+1`.
    pub fluxes: Vec<f64>,
    /// Sending capacity of the most downstream cell, vehicles per second.
    pub sending_last: f64,
    /// Receiving capacity of the most upstream cell, vehicles per second.
    pub receiving_first: f64,
}

/// Runs the interior part of one CTM tick over a cell grid.
///
/// For each interior boundary the flux is
/// `F = min(sending(ρ_up), receiving(ρ_down))`; each cell then updates as
/// `ρᵢ ← ρᵢ + (dt/Δx)·(F_{i−½} − F_{i+½})`. The lane-end boundaries carry no
/// flux here — predecessor/successor exchange happens in the sequential
/// resolution pass using the returned end-cell capacities, all computed
/// against the same pre-tick densities.
///
/// # Arguments
/// * `grid` - The lane's pre-tick cell grid.
/// * `diagram` - The fundamental diagram.
/// * `dt` - Tick length in seconds; must satisfy the CFL constraint.
///
/// # Returns
/// The scratch output to be committed by the resolution pass.
pub fn step_interior(grid: &CellGrid, diagram: &FundamentalDiagram, dt: f64) -> MacroStepOutput {
    let densities = grid.densities();
    let n = densities.len();
    let scale = dt / grid.cell_length();

    let mut fluxes = Vec::with_capacity(n - 1);
    for i in 0..n - 1 {
        fluxes.push(diagram.godunov_flux(densities[i], densities[i + 1]));
    }

    let mut updated = Vec::with_capacity(n);
    for i in 0..n {
        let inflow = if i == 0 { 0.0 } else { fluxes[i - 1] };
        let outflow = if i == n - 1 { 0.0 } else { fluxes[i] };
        updated.push(densities[i] + scale * (inflow - outflow));
    }

    MacroStepOutput {
        densities: updated,
        fluxes,
        sending_last: diagram.sending(grid.last_density()),
        receiving_first: diagram.receiving(grid.first_density()),
    }
}

/// Applies a scratch output to the live grid.
pub fn commit(grid: &mut CellGrid, output: MacroStepOutput) {
    grid.apply_update(output.densities, output.fluxes);
}
