use crate::agents::DriverProfile;
use std::fmt;

/// Acceleration exponent of the IDM free-flow term.
const IDM_DELTA: f64 = 4.0;

/// Smallest gap fed into the interaction term, metres. Keeps the model
/// defined when vehicles touch.
pub const GAP_EPSILON: f64 = 0.1;

/// The leader as seen by the car-following model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeaderView {
    /// Net gap to the leader's rear bumper, metres.
    pub gap: f64,
    /// Leader speed, m/s.
    pub speed: f64,
}

/// Car-following model variants.
///
/// A fixed set of tagged variants behind one narrow acceleration interface;
/// the hot loop matches on the tag instead of going through virtual dispatch.
///
/// - `Idm` - the Intelligent Driver Model
/// - `IdmPlus` - the IDM+ variant taking the minimum of the free-flow and
///   interaction terms, which removes the over-braking the product form shows
///   in dense traffic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CarFollowingModel {
    /// Intelligent Driver Model.
    #[default]
    Idm,
    /// IDM+ (minimum of free-flow and interaction terms).
    IdmPlus,
}

impl fmt::Display for CarFollowingModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let as_str = match self {
            CarFollowingModel::Idm => "idm",
            CarFollowingModel::IdmPlus => "idm_plus",
        };
        write!(f, "{}", as_str)
    }
}

impl CarFollowingModel {
    /// Computes the longitudinal acceleration of an ego vehicle.
    ///
    /// Pure function of its inputs: no hidden state. The result is clamped to
    /// `[-hard_decel, max_accel]`.
    ///
    /// # Arguments
    /// * `speed` - Ego speed `v` in m/s.
    /// * `desired_speed` - Effective desired speed `v*` (driver desire capped
    ///   by the lane's speed limit), m/s.
    /// * `profile` - The ego driver parameters.
    /// * `leader` - The leader view, or `None` on a free road.
    ///
    /// # Returns
    /// The acceleration in m/s².
    ///
    /// # Example
    /// ```
    /// use hybrid_traffic_sim_core::agents::DriverProfile;
    /// use hybrid_traffic_sim_core::models::CarFollowingModel;
    /// let profile = DriverProfile::named("car");
    /// let a = CarFollowingModel::Idm.acceleration(20.0, 30.0, &profile, None);
    /// assert!(a > 0.0, "Free road below desired speed must accelerate");
    /// ```
    pub fn acceleration(
        &self,
        speed: f64,
        desired_speed: f64,
        profile: &DriverProfile,
        leader: Option<LeaderView>,
    ) -> f64 {
        let free_term = if desired_speed > 0.0 {
            1.0 - (speed / desired_speed).powf(IDM_DELTA)
        } else {
            // Desired speed of zero means the driver wants to stop and,
            // once stopped, stay stopped.
            if speed > 0.0 { f64::NEG_INFINITY } else { 0.0 }
        };

        let accel = match leader {
            None => profile.max_accel * free_term,
            Some(leader) => {
                let gap = leader.gap.max(GAP_EPSILON);
                let approach = speed - leader.speed;
                let dynamic = speed * profile.time_headway
                    + speed * approach / (2.0 * (profile.max_accel * profile.comfort_decel).sqrt());
                let desired_gap = profile.min_gap + dynamic.max(0.0);
                let interaction = (desired_gap / gap).powi(2);
                match self {
                    CarFollowingModel::Idm => profile.max_accel * (free_term - interaction),
                    CarFollowingModel::IdmPlus => {
                        profile.max_accel * free_term.min(1.0 - interaction)
                    }
                }
            }
        };

        accel.clamp(-profile.hard_decel, profile.max_accel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> DriverProfile {
        DriverProfile::named("car")
    }

    #[test]
    fn test_free_road_accelerates_towards_desired_speed() {
        let model = CarFollowingModel::Idm;
        let slow = model.acceleration(10.0, 30.0, &profile(), None);
        let near = model.acceleration(29.5, 30.0, &profile(), None);
        assert!(slow > near, "Acceleration must taper approaching v*");
        let at_desired = model.acceleration(30.0, 30.0, &profile(), None);
        assert!(
            at_desired.abs() < 1e-9,
            "At desired speed the free term vanishes, got {}",
            at_desired
        );
    }

    #[test]
    fn test_close_leader_forces_braking() {
        let model = CarFollowingModel::Idm;
        let a = model.acceleration(
            25.0,
            30.0,
            &profile(),
            Some(LeaderView { gap: 5.0, speed: 10.0 }),
        );
        assert!(a < 0.0, "Fast approach on a short gap must brake, got {}", a);
        assert!(
            a >= -profile().hard_decel,
            "Braking is clamped at the hard bound"
        );
    }

    #[test]
    fn test_zero_gap_is_defined() {
        let model = CarFollowingModel::Idm;
        let a = model.acceleration(
            10.0,
            30.0,
            &profile(),
            Some(LeaderView { gap: 0.0, speed: 10.0 }),
        );
        assert!(a.is_finite(), "Zero gap must not divide by zero");
        assert_eq!(a, -profile().hard_decel, "Zero gap means full braking");
    }

    #[test]
    fn test_idm_plus_brakes_no_harder_than_idm() {
        let cases = [
            (20.0, LeaderView { gap: 15.0, speed: 18.0 }),
            (25.0, LeaderView { gap: 30.0, speed: 20.0 }),
            (10.0, LeaderView { gap: 8.0, speed: 10.0 }),
        ];
        for (speed, leader) in cases {
            let idm = CarFollowingModel::Idm.acceleration(speed, 30.0, &profile(), Some(leader));
            let idm_plus =
                CarFollowingModel::IdmPlus.acceleration(speed, 30.0, &profile(), Some(leader));
            assert!(
                idm_plus >= idm - 1e-12,
                "IDM+ must never brake harder than IDM: {} vs {}",
                idm_plus,
                idm
            );
        }
    }

    #[test]
    fn test_zero_desired_speed_parks_the_vehicle() {
        let model = CarFollowingModel::Idm;
        let stopped = model.acceleration(0.0, 0.0, &profile(), None);
        assert_eq!(stopped, 0.0, "A parked vehicle with no desire to move stays parked");
        let rolling = model.acceleration(5.0, 0.0, &profile(), None);
        assert_eq!(rolling, -profile().hard_decel, "A rolling vehicle brakes to a stop");
    }

    #[test]
    fn test_equilibrium_gap_is_stable() {
        // At the equilibrium gap s* with matching speeds, acceleration is
        // close to the free-road value scaled by the interaction term; a
        // vehicle sitting at twice s* should barely react.
        let model = CarFollowingModel::Idm;
        let p = profile();
        let v = 20.0;
        let s_star = p.min_gap + v * p.time_headway;
        let a = model.acceleration(v, 30.0, &p, Some(LeaderView { gap: 2.0 * s_star, speed: v }));
        assert!(a.abs() < 0.5, "Far equilibrium following should be calm, got {}", a);
    }
}
