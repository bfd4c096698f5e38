/// Triangular (CTM) fundamental diagram of a lane.
///
/// Relates density `ρ` (vehicles per metre) to flow `Q(ρ)` (vehicles per
/// second): flow rises with the free-flow speed `v_f` up to the capacity
/// `Q_max`, then falls with the congestion wave speed `w` towards the jam
/// density `ρ_jam`.
///
/// # Example
///
/// ```
/// use hybrid_traffic_sim_core::models::FundamentalDiagram;
/// let fd = FundamentalDiagram::new(30.0, 5.56, 0.15, 1.125);
/// assert!(fd.flow(0.0).abs() < 1e-12);
/// assert!(fd.flow(0.15).abs() < 1e-9, "No flow at jam density");
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FundamentalDiagram {
    /// Free-flow speed `v_f` in m/s.
    pub free_flow_speed: f64,
    /// Congestion wave speed `w` in m/s (positive).
    pub wave_speed: f64,
    /// Jam density `ρ_jam` in vehicles per metre.
    pub jam_density: f64,
    /// Capacity `Q_max` in vehicles per second.
    pub max_flow: f64,
}

impl FundamentalDiagram {
    /// Creates a triangular diagram.
    ///
    /// # Arguments
    /// * `free_flow_speed` - `v_f` in m/s.
    /// * `wave_speed` - `w` in m/s.
    /// * `jam_density` - `ρ_jam` in vehicles per metre.
    /// * `max_flow` - `Q_max` in vehicles per second.
    pub fn new(free_flow_speed: f64, wave_speed: f64, jam_density: f64, max_flow: f64) -> Self {
        FundamentalDiagram {
            free_flow_speed,
            wave_speed,
            jam_density,
            max_flow,
        }
    }

    /// Flow at density `ρ`: `min(v_f·ρ, w·(ρ_jam − ρ), Q_max)`, never
    /// negative.
    pub fn flow(&self, density: f64) -> f64 {
        let free = self.free_flow_speed * density;
        let congested = self.wave_speed * (self.jam_density - density);
        free.min(congested).min(self.max_flow).max(0.0)
    }

    /// Sending (demand) capacity of an upstream cell at density `ρ`:
    /// `min(v_f·ρ, Q_max)`.
    pub fn sending(&self, density: f64) -> f64 {
        (self.free_flow_speed * density).min(self.max_flow).max(0.0)
    }

    /// Receiving (supply) capacity of a downstream cell at density `ρ`:
    /// `min(w·(ρ_jam − ρ), Q_max)`.
    pub fn receiving(&self, density: f64) -> f64 {
        (self.wave_speed * (self.jam_density - density))
            .min(self.max_flow)
            .max(0.0)
    }

    /// Godunov flux across a cell boundary:
    /// `min(sending(ρ_up), receiving(ρ_down))`.
    pub fn godunov_flux(&self, density_up: f64, density_down: f64) -> f64 {
        self.sending(density_up).min(self.receiving(density_down))
    }

    /// Equilibrium speed `V(ρ) = Q(ρ)/ρ`, tending to `v_f` for `ρ → 0`.
    pub fn equilibrium_speed(&self, density: f64) -> f64 {
        if density <= 1e-9 {
            return self.free_flow_speed;
        }
        (self.flow(density) / density).min(self.free_flow_speed)
    }

    /// Density at which the free-flow and congested branches meet.
    pub fn critical_density(&self) -> f64 {
        self.max_flow / self.free_flow_speed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> FundamentalDiagram {
        // spec defaults: v_f = 30 m/s, ρ_jam = 0.15 /m, Q_max = v_f·ρ_jam/4
        FundamentalDiagram::new(30.0, 5.56, 0.15, 30.0 * 0.15 / 4.0)
    }

    #[test]
    fn test_flow_branches() {
        let fd = reference();
        assert!(
            (fd.flow(0.01) - 0.3).abs() < 1e-12,
            "Light traffic flows at v_f·ρ"
        );
        assert!(
            (fd.flow(0.0375) - fd.max_flow).abs() < 1e-12,
            "Critical density saturates at Q_max"
        );
        assert!(
            (fd.flow(0.14) - 5.56 * 0.01).abs() < 1e-9,
            "Dense traffic flows on the congested branch"
        );
        assert_eq!(fd.flow(0.15), 0.0, "Jam density blocks all flow");
    }

    #[test]
    fn test_godunov_flux_takes_minimum() {
        let fd = reference();
        let flux = fd.godunov_flux(0.02, 0.14);
        let expected = fd.sending(0.02).min(fd.receiving(0.14));
        assert!((flux - expected).abs() < 1e-12);
        assert!(
            flux < fd.sending(0.02),
            "A congested downstream cell must throttle the flux"
        );
    }

    #[test]
    fn test_equilibrium_speed_limits() {
        let fd = reference();
        assert_eq!(fd.equilibrium_speed(0.0), 30.0, "Empty road flows at v_f");
        assert!(
            fd.equilibrium_speed(0.15) < 1e-9,
            "Jam density means standstill"
        );
        let mid = fd.equilibrium_speed(0.075);
        assert!(mid > 0.0 && mid < 30.0, "Intermediate densities slow down, got {}", mid);
    }

    #[test]
    fn test_capacities_non_negative() {
        let fd = reference();
        assert_eq!(fd.receiving(0.2), 0.0, "Super-jam density must not go negative");
        assert_eq!(fd.sending(-0.01), 0.0, "Negative density clamps to zero");
    }
}
