use lazy_static::lazy_static;
use std::collections::HashMap;

/// Driver-model parameters of a single vehicle.
///
/// Bundles everything the car-following (IDM) and lane-change (MOBIL) models
/// need: desired speed, time headway, minimum gap, acceleration bounds,
/// politeness and the keep-right bias. Values are in SI units (metres,
/// seconds, m/s, m/s²).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriverProfile {
    /// Desired free-flow speed `v*` in m/s.
    pub desired_speed: f64,
    /// Desired time headway `T` in seconds.
    pub time_headway: f64,
    /// Minimum standstill gap `s₀` in metres.
    pub min_gap: f64,
    /// Maximum acceleration `a_max` in m/s².
    pub max_accel: f64,
    /// Comfortable deceleration `b` in m/s² (positive).
    pub comfort_decel: f64,
    /// Hard braking bound `b_hard` in m/s² (positive, ≥ `comfort_decel`).
    pub hard_decel: f64,
    /// MOBIL politeness factor `p` in `[0, 1]`.
    pub politeness: f64,
    /// MOBIL incentive threshold in m/s².
    pub change_threshold: f64,
    /// Extra incentive threshold applied to overtaking-side changes, in m/s².
    /// Positive values bias drivers toward keeping right.
    pub bias_right: f64,
    /// Maximum deceleration `b_safe` a lane change may impose on the new
    /// follower, in m/s² (positive).
    pub safe_decel: f64,
}

impl Default for DriverProfile {
    fn default() -> Self {
        PROFILES["car"]
    }
}

lazy_static! {
    /// Registry of named driver profiles used as construction defaults.
    static ref PROFILES: HashMap<&'static str, DriverProfile> = {
        let mut m = HashMap::new();
        m.insert(
            "car",
            DriverProfile {
                desired_speed: 30.0,
                time_headway: 1.5,
                min_gap: 2.0,
                max_accel: 1.0,
                comfort_decel: 1.5,
                hard_decel: 6.0,
                politeness: 0.5,
                change_threshold: 0.1,
                bias_right: 0.3,
                safe_decel: 4.0,
            },
        );
        m.insert(
            "bus",
            DriverProfile {
                desired_speed: 22.0,
                time_headway: 1.8,
                min_gap: 3.0,
                max_accel: 0.8,
                comfort_decel: 1.2,
                hard_decel: 5.0,
                politeness: 0.7,
                change_threshold: 0.2,
                bias_right: 0.4,
                safe_decel: 3.5,
            },
        );
        m.insert(
            "truck",
            DriverProfile {
                desired_speed: 25.0,
                time_headway: 2.0,
                min_gap: 3.5,
                max_accel: 0.6,
                comfort_decel: 1.0,
                hard_decel: 4.5,
                politeness: 0.6,
                change_threshold: 0.2,
                bias_right: 0.5,
                safe_decel: 3.0,
            },
        );
        m
    };
}

impl DriverProfile {
    /// Returns the named profile from the registry, falling back to "car"
    /// when the name is unknown.
    ///
    /// # Arguments
    /// * `name` - One of "car", "bus", "truck".
    ///
    /// # Example
    /// ```
    /// use hybrid_traffic_sim_core::agents::DriverProfile;
    /// let bus = DriverProfile::named("bus");
    /// assert!(bus.desired_speed < DriverProfile::named("car").desired_speed);
    /// ```
    pub fn named(name: &str) -> Self {
        PROFILES.get(name).copied().unwrap_or(PROFILES["car"])
    }

    /// Overrides the desired speed, returning the modified profile.
    pub fn with_desired_speed(mut self, desired_speed: f64) -> Self {
        self.desired_speed = desired_speed;
        self
    }

    /// Overrides the politeness factor, returning the modified profile.
    pub fn with_politeness(mut self, politeness: f64) -> Self {
        self.politeness = politeness;
        self
    }

    /// Overrides the incentive threshold, returning the modified profile.
    pub fn with_change_threshold(mut self, change_threshold: f64) -> Self {
        self.change_threshold = change_threshold;
        self
    }
}

/// Running per-lane statistics over vehicles evicted by a micro→macro
/// switch. When the lane later switches back, the retained means can seed the
/// restored population instead of the static default profile.
#[derive(Debug, Clone, Default)]
pub struct DriverSummary {
    count: u64,
    sum_desired_speed: f64,
    sum_time_headway: f64,
    sum_min_gap: f64,
    sum_length: f64,
}

impl DriverSummary {
    /// Creates an empty summary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one evicted vehicle's parameters.
    ///
    /// # Arguments
    /// * `profile` - The evicted vehicle's driver profile.
    /// * `length` - The evicted vehicle's length in metres.
    pub fn record(&mut self, profile: &DriverProfile, length: f64) {
        self.count += 1;
        self.sum_desired_speed += profile.desired_speed;
        self.sum_time_headway += profile.time_headway;
        self.sum_min_gap += profile.min_gap;
        self.sum_length += length;
    }

    /// Number of vehicles recorded.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Mean vehicle length of the recorded population, or `fallback` when the
    /// summary is empty.
    pub fn mean_length(&self, fallback: f64) -> f64 {
        if self.count == 0 {
            fallback
        } else {
            self.sum_length / self.count as f64
        }
    }

    /// Returns `base` with desired speed, time headway and minimum gap
    /// replaced by the recorded means. Returns `base` unchanged when the
    /// summary is empty.
    ///
    /// # Arguments
    /// * `base` - The profile supplying all non-averaged parameters.
    pub fn mean_profile(&self, base: DriverProfile) -> DriverProfile {
        if self.count == 0 {
            return base;
        }
        let n = self.count as f64;
        DriverProfile {
            desired_speed: self.sum_desired_speed / n,
            time_headway: self.sum_time_headway / n,
            min_gap: self.sum_min_gap / n,
            ..base
        }
    }

    /// Clears the summary.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
