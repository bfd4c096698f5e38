use crate::agents::DriverProfile;
use std::fmt;

/// The side of a candidate lane change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let as_str = match self {
            Side::Left => "left",
            Side::Right => "right",
        };
        write!(f, "{}", as_str)
    }
}

/// The six accelerations MOBIL weighs for one candidate side, all computed by
/// the perceive phase against pre-tick state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SideAssessment {
    /// Ego acceleration if it stays in its lane.
    pub ego_current: f64,
    /// Ego acceleration if it moved to the candidate lane.
    pub ego_changed: f64,
    /// Prospective new follower's acceleration as things stand.
    pub new_follower_current: f64,
    /// Prospective new follower's acceleration with the ego in front of it.
    pub new_follower_changed: f64,
    /// Old follower's acceleration as things stand.
    pub old_follower_current: f64,
    /// Old follower's acceleration once the ego has left.
    pub old_follower_changed: f64,
}

/// A lane-change decision: the chosen side and its net incentive (the margin
/// above the threshold, used to rank competing reservations).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaneChangeDecision {
    pub side: Side,
    pub incentive: f64,
}

/// Lane-change policy variants.
///
/// Like the car-following models, a fixed set of tagged variants: the hot
/// loop never dispatches through trait objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LaneChangePolicy {
    /// MOBIL: safety criterion plus politeness-weighted incentive.
    #[default]
    Mobil,
    /// Never change lanes.
    KeepLane,
}

impl fmt::Display for LaneChangePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let as_str = match self {
            LaneChangePolicy::Mobil => "mobil",
            LaneChangePolicy::KeepLane => "keep_lane",
        };
        write!(f, "{}", as_str)
    }
}

impl LaneChangePolicy {
    /// Evaluates both candidate sides and returns the winning decision, if
    /// any.
    ///
    /// A side passes the safety criterion iff the prospective new follower
    /// would not have to brake harder than `safe_decel`. A safe side is
    /// beneficial iff
    /// `Δa_ego + p·(Δa_new_follower + Δa_old_follower)` exceeds the incentive
    /// threshold, where the threshold for the left (overtaking) side carries
    /// the additional keep-right bias. When both sides qualify the larger net
    /// incentive wins; on a tie the right side is taken.
    ///
    /// # Arguments
    /// * `profile` - The ego driver parameters.
    /// * `left` - Assessment of the left side, when a left lane exists.
    /// * `right` - Assessment of the right side, when a right lane exists.
    ///
    /// # Returns
    /// The winning decision, or `None` when no side is both safe and
    /// beneficial.
    pub fn decide(
        &self,
        profile: &DriverProfile,
        left: Option<SideAssessment>,
        right: Option<SideAssessment>,
    ) -> Option<LaneChangeDecision> {
        match self {
            LaneChangePolicy::KeepLane => None,
            LaneChangePolicy::Mobil => {
                let left_incentive =
                    left.and_then(|assessment| Self::side_incentive(profile, Side::Left, &assessment));
                let right_incentive = right
                    .and_then(|assessment| Self::side_incentive(profile, Side::Right, &assessment));
                match (left_incentive, right_incentive) {
                    (None, None) => None,
                    (Some(incentive), None) => Some(LaneChangeDecision { side: Side::Left, incentive }),
                    (None, Some(incentive)) => {
                        Some(LaneChangeDecision { side: Side::Right, incentive })
                    }
                    (Some(l), Some(r)) => {
                        // Ties go to the keep-right direction.
                        if l > r {
                            Some(LaneChangeDecision { side: Side::Left, incentive: l })
                        } else {
                            Some(LaneChangeDecision { side: Side::Right, incentive: r })
                        }
                    }
                }
            }
        }
    }

    /// Net incentive of one side, or `None` when the side is unsafe or not
    /// beneficial.
    fn side_incentive(
        profile: &DriverProfile,
        side: Side,
        assessment: &SideAssessment,
    ) -> Option<f64> {
        // Safety: the new follower must not be forced beyond b_safe.
        if assessment.new_follower_changed < -profile.safe_decel {
            return None;
        }
        let ego_gain = assessment.ego_changed - assessment.ego_current;
        let new_follower_gain =
            assessment.new_follower_changed - assessment.new_follower_current;
        let old_follower_gain =
            assessment.old_follower_changed - assessment.old_follower_current;
        let weighted = ego_gain + profile.politeness * (new_follower_gain + old_follower_gain);
        let threshold = match side {
            Side::Left => profile.change_threshold + profile.bias_right,
            Side::Right => profile.change_threshold,
        };
        let net = weighted - threshold;
        if net > 0.0 { Some(net) } else { None }
    }
}
