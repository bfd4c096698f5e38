use crate::adaptive::ModeController;
use crate::agents::DriverProfile;
use crate::models::{CarFollowingModel, FundamentalDiagram, LaneChangePolicy};
use crate::network::LaneID;
use crate::translate::TranslationProfilePolicy;
use std::fmt;

/// Custom error types for configuration validation.
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// `dt` must be positive.
    BadTimeStep(f64),
    /// Fewer than 2 cells per lane.
    BadCellCount(usize),
    /// `dt > Δx / max(v_f, w)` on a macro-eligible lane.
    CflViolation {
        lane_id: LaneID,
        dt: f64,
        cell_length: f64,
        max_speed: f64,
    },
    /// A leave threshold at or above its enter threshold.
    ThresholdInversion {
        name: &'static str,
        enter: f64,
        leave: f64,
    },
    /// The configured hysteresis factor demands a wider band than the
    /// thresholds provide.
    HysteresisBandTooNarrow {
        name: &'static str,
        enter: f64,
        leave: f64,
        factor: f64,
    },
    /// Jam spacing `1/ρ_jam` tighter than the nominal vehicle length: the
    /// translator could not restore such a population.
    JamSpacingTooTight {
        jam_density: f64,
        vehicle_length: f64,
    },
    /// Worker count of zero.
    NoWorkers,
    /// Negative or non-finite model parameter.
    BadParameter {
        name: &'static str,
        value: f64,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::BadTimeStep(dt) => {
                write!(f, "Time step must be positive, got {}", dt)
            }
            ConfigError::BadCellCount(cells) => {
                write!(f, "Cells per lane must be at least 2, got {}", cells)
            }
            ConfigError::CflViolation { lane_id, dt, cell_length, max_speed } => {
                write!(
                    f,
                    "CFL violation on lane '{}': dt {} exceeds {} / {}",
                    lane_id, dt, cell_length, max_speed
                )
            }
            ConfigError::ThresholdInversion { name, enter, leave } => {
                write!(
                    f,
                    "Leave threshold must be below enter threshold for {}: {} >= {}",
                    name, leave, enter
                )
            }
            ConfigError::HysteresisBandTooNarrow { name, enter, leave, factor } => {
                write!(
                    f,
                    "Hysteresis band for {} too narrow: enter {} < leave {} x factor {}",
                    name, enter, leave, factor
                )
            }
            ConfigError::JamSpacingTooTight { jam_density, vehicle_length } => {
                write!(
                    f,
                    "Jam spacing 1/{} is tighter than the nominal vehicle length {}",
                    jam_density, vehicle_length
                )
            }
            ConfigError::NoWorkers => {
                write!(f, "Worker count must be at least 1")
            }
            ConfigError::BadParameter { name, value } => {
                write!(f, "Parameter {} must be positive and finite, got {}", name, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Validated scheduler configuration.
///
/// Built through [`SimulationConfig::new`]; `build()` performs every
/// construction-time check of the error taxonomy except the per-lane CFL
/// check, which needs the network and runs when the simulation is created.
///
/// # Example
///
/// ```
/// use hybrid_traffic_sim_core::simulation::SimulationConfig;
/// let config = SimulationConfig::new()
///     .with_dt(0.1)
///     .with_workers(4)
///     .with_seed(7)
///     .build()
///     .unwrap();
/// assert_eq!(config.dt, 0.1);
/// ```
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Tick length in seconds.
    pub dt: f64,
    /// Default number of density cells per lane.
    pub cells_per_lane: usize,
    /// A MICRO lane at or above this density switches to MACRO, veh/m.
    pub enter_macro_density: f64,
    /// A MACRO lane must drop to this density to switch back, veh/m.
    pub leave_macro_density: f64,
    /// A MICRO lane with at least this many vehicles switches to MACRO.
    pub enter_macro_count: f64,
    /// A MACRO lane must drop to this much mass to switch back.
    pub leave_macro_count: f64,
    /// Required ratio between enter and leave thresholds.
    pub hysteresis_factor: f64,
    /// Minimum ticks between mode switches of one lane.
    pub dwell_ticks: u64,
    /// Worker threads for the parallel lane phases.
    pub workers: usize,
    /// Free-flow speed `v_f`, m/s.
    pub free_flow_speed: f64,
    /// Congestion wave speed `w`, m/s.
    pub wave_speed: f64,
    /// Jam density `ρ_jam`, veh/m.
    pub jam_density: f64,
    /// Capacity `Q_max`, veh/s.
    pub max_flow: f64,
    /// Default driver parameters for restored and injected vehicles.
    pub default_profile: DriverProfile,
    /// Nominal vehicle length for mass/vehicle conversions, metres.
    pub nominal_vehicle_length: f64,
    /// Neighbor-query radius and bucket size, metres.
    pub interaction_range: f64,
    /// Car-following model variant.
    pub car_following: CarFollowingModel,
    /// Lane-change policy variant.
    pub lane_change: LaneChangePolicy,
    /// Driver parameters policy for macro→micro restoration.
    pub profile_policy: TranslationProfilePolicy,
    /// Seed for all simulation randomness.
    pub seed: u64,
}

impl SimulationConfig {
    /// Constructs a new `SimulationConfigBuilder` with the default
    /// parameters (thresholds 0.08/0.04 veh/m and 50/20 vehicles, 50 cells,
    /// `v_f` 30 m/s, `w` 5.56 m/s, `ρ_jam` 0.15 veh/m, dwell 10, dt 0.1 s).
    pub fn new() -> SimulationConfigBuilder {
        let free_flow_speed = 30.0;
        let jam_density = 0.15;
        SimulationConfigBuilder {
            config: SimulationConfig {
                dt: 0.1,
                cells_per_lane: 50,
                enter_macro_density: 0.08,
                leave_macro_density: 0.04,
                enter_macro_count: 50.0,
                leave_macro_count: 20.0,
                hysteresis_factor: 1.2,
                dwell_ticks: 10,
                workers: 4,
                free_flow_speed,
                wave_speed: 5.56,
                jam_density,
                max_flow: free_flow_speed * jam_density / 4.0,
                default_profile: DriverProfile::named("car"),
                nominal_vehicle_length: 5.0,
                interaction_range: 150.0,
                car_following: CarFollowingModel::Idm,
                lane_change: LaneChangePolicy::Mobil,
                profile_policy: TranslationProfilePolicy::DefaultProfile,
                seed: 42,
            },
        }
    }

    /// The fundamental diagram these parameters describe.
    pub fn diagram(&self) -> FundamentalDiagram {
        FundamentalDiagram::new(self.free_flow_speed, self.wave_speed, self.jam_density, self.max_flow)
    }

    /// The mode controller these thresholds describe.
    pub fn controller(&self) -> ModeController {
        ModeController {
            enter_macro_density: self.enter_macro_density,
            leave_macro_density: self.leave_macro_density,
            enter_macro_count: self.enter_macro_count,
            leave_macro_count: self.leave_macro_count,
            dwell_ticks: self.dwell_ticks,
        }
    }

    /// The fastest characteristic speed of the diagram, bounding CFL.
    pub fn max_characteristic_speed(&self) -> f64 {
        self.free_flow_speed.max(self.wave_speed)
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        // The defaults always pass validation.
        SimulationConfig::new().build().unwrap_or_else(|_| unreachable!())
    }
}

/// A builder pattern implementation for constructing validated
/// `SimulationConfig` objects.
pub struct SimulationConfigBuilder {
    config: SimulationConfig,
}

impl SimulationConfigBuilder {
    /// Sets the tick length in seconds.
    pub fn with_dt(mut self, dt: f64) -> Self {
        self.config.dt = dt;
        self
    }

    /// Sets the default number of density cells per lane.
    pub fn with_cells_per_lane(mut self, cells: usize) -> Self {
        self.config.cells_per_lane = cells;
        self
    }

    /// Sets the density thresholds in veh/m.
    pub fn with_density_thresholds(mut self, enter: f64, leave: f64) -> Self {
        self.config.enter_macro_density = enter;
        self.config.leave_macro_density = leave;
        self
    }

    /// Sets the vehicle-count thresholds.
    pub fn with_count_thresholds(mut self, enter: f64, leave: f64) -> Self {
        self.config.enter_macro_count = enter;
        self.config.leave_macro_count = leave;
        self
    }

    /// Sets the required enter/leave threshold ratio.
    pub fn with_hysteresis_factor(mut self, factor: f64) -> Self {
        self.config.hysteresis_factor = factor;
        self
    }

    /// Sets the minimum ticks between mode switches.
    pub fn with_dwell_ticks(mut self, dwell: u64) -> Self {
        self.config.dwell_ticks = dwell;
        self
    }

    /// Sets the worker thread count for the parallel lane phases.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    /// Sets the fundamental-diagram parameters.
    pub fn with_diagram(
        mut self,
        free_flow_speed: f64,
        wave_speed: f64,
        jam_density: f64,
        max_flow: f64,
    ) -> Self {
        self.config.free_flow_speed = free_flow_speed;
        self.config.wave_speed = wave_speed;
        self.config.jam_density = jam_density;
        self.config.max_flow = max_flow;
        self
    }

    /// Sets the default driver profile.
    pub fn with_default_profile(mut self, profile: DriverProfile) -> Self {
        self.config.default_profile = profile;
        self
    }

    /// Sets the nominal vehicle length in metres.
    pub fn with_nominal_vehicle_length(mut self, length: f64) -> Self {
        self.config.nominal_vehicle_length = length;
        self
    }

    /// Sets the neighbor-query radius and bucket size in metres.
    pub fn with_interaction_range(mut self, range: f64) -> Self {
        self.config.interaction_range = range;
        self
    }

    /// Sets the car-following model variant.
    pub fn with_car_following(mut self, model: CarFollowingModel) -> Self {
        self.config.car_following = model;
        self
    }

    /// Sets the lane-change policy variant.
    pub fn with_lane_change(mut self, policy: LaneChangePolicy) -> Self {
        self.config.lane_change = policy;
        self
    }

    /// Sets the macro→micro driver-parameter policy.
    pub fn with_profile_policy(mut self, policy: TranslationProfilePolicy) -> Self {
        self.config.profile_policy = policy;
        self
    }

    /// Sets the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    /// Validates and builds the configuration.
    ///
    /// # Returns
    /// The configuration, or the first `ConfigError` found.
    pub fn build(self) -> Result<SimulationConfig, ConfigError> {
        let config = self.config;
        if !(config.dt > 0.0) || !config.dt.is_finite() {
            return Err(ConfigError::BadTimeStep(config.dt));
        }
        if config.cells_per_lane < 2 {
            return Err(ConfigError::BadCellCount(config.cells_per_lane));
        }
        if config.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        for (name, value) in [
            ("free_flow_speed", config.free_flow_speed),
            ("wave_speed", config.wave_speed),
            ("jam_density", config.jam_density),
            ("max_flow", config.max_flow),
            ("nominal_vehicle_length", config.nominal_vehicle_length),
            ("interaction_range", config.interaction_range),
            ("hysteresis_factor", config.hysteresis_factor),
        ] {
            if !(value > 0.0) || !value.is_finite() {
                return Err(ConfigError::BadParameter { name, value });
            }
        }
        if config.leave_macro_density >= config.enter_macro_density {
            return Err(ConfigError::ThresholdInversion {
                name: "density",
                enter: config.enter_macro_density,
                leave: config.leave_macro_density,
            });
        }
        if config.leave_macro_count >= config.enter_macro_count {
            return Err(ConfigError::ThresholdInversion {
                name: "count",
                enter: config.enter_macro_count,
                leave: config.leave_macro_count,
            });
        }
        if config.enter_macro_density < config.leave_macro_density * config.hysteresis_factor {
            return Err(ConfigError::HysteresisBandTooNarrow {
                name: "density",
                enter: config.enter_macro_density,
                leave: config.leave_macro_density,
                factor: config.hysteresis_factor,
            });
        }
        if config.enter_macro_count < config.leave_macro_count * config.hysteresis_factor {
            return Err(ConfigError::HysteresisBandTooNarrow {
                name: "count",
                enter: config.enter_macro_count,
                leave: config.leave_macro_count,
                factor: config.hysteresis_factor,
            });
        }
        if config.jam_density * config.nominal_vehicle_length > 1.0 + 1e-12 {
            return Err(ConfigError::JamSpacingTooTight {
                jam_density: config.jam_density,
                vehicle_length: config.nominal_vehicle_length,
            });
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SimulationConfig::new().build().expect("defaults must validate");
        assert_eq!(config.dt, 0.1);
        assert_eq!(config.cells_per_lane, 50);
        assert!((config.max_flow - 1.125).abs() < 1e-12, "Q_max defaults to v_f·ρ_jam/4");
    }

    #[test]
    fn test_rejects_bad_dt() {
        assert!(matches!(
            SimulationConfig::new().with_dt(0.0).build(),
            Err(ConfigError::BadTimeStep(_))
        ));
    }

    #[test]
    fn test_rejects_threshold_inversion() {
        let result = SimulationConfig::new().with_density_thresholds(0.04, 0.08).build();
        assert!(
            matches!(result, Err(ConfigError::ThresholdInversion { name: "density", .. })),
            "leave >= enter must be rejected, got {:?}",
            result
        );
    }

    #[test]
    fn test_rejects_narrow_hysteresis_band() {
        let result = SimulationConfig::new()
            .with_density_thresholds(0.05, 0.045)
            .with_hysteresis_factor(1.2)
            .build();
        assert!(
            matches!(result, Err(ConfigError::HysteresisBandTooNarrow { .. })),
            "A band narrower than the factor must be rejected, got {:?}",
            result
        );
    }

    #[test]
    fn test_rejects_tight_jam_spacing() {
        let result = SimulationConfig::new()
            .with_diagram(30.0, 5.56, 0.25, 1.125)
            .with_nominal_vehicle_length(5.0)
            .build();
        assert!(matches!(result, Err(ConfigError::JamSpacingTooTight { .. })));
    }

    #[test]
    fn test_rejects_bad_cells_and_workers() {
        assert!(matches!(
            SimulationConfig::new().with_cells_per_lane(1).build(),
            Err(ConfigError::BadCellCount(1))
        ));
        assert!(matches!(
            SimulationConfig::new().with_workers(0).build(),
            Err(ConfigError::NoWorkers)
        ));
    }
}
