use crate::adaptive::{ForcedMode, LaneMode, LaneModeRecord};

/// The representation a lane should translate to this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingMode {
    ToMacro,
    ToMicro,
}

/// Instantaneous per-lane load, measured by the scheduler before the
/// controller pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaneLoad {
    /// Vehicle count (MICRO) or `∫ρ dx` (MACRO).
    pub count: f64,
    /// Mean density in vehicles per metre.
    pub density: f64,
}

/// The threshold policy of the adaptive mode controller.
///
/// The controller computes a pending mode per lane each tick; it never
/// mutates lane state itself — the scheduler picks pending modes up and runs
/// the translator.
#[derive(Debug, Clone, Copy)]
pub struct ModeController {
    /// A MICRO lane at or above this density schedules a switch to MACRO.
    pub enter_macro_density: f64,
    /// A MACRO lane at or below this density may return to MICRO.
    pub leave_macro_density: f64,
    /// A MICRO lane with at least this many vehicles schedules a switch.
    pub enter_macro_count: f64,
    /// A MACRO lane holding at most this much mass may return to MICRO.
    pub leave_macro_count: f64,
    /// Minimum ticks between switches of one lane.
    pub dwell_ticks: u64,
}

impl ModeController {
    /// Decides whether a lane should change representation this tick.
    ///
    /// Transition rules, in order:
    /// - `FORCE_MICRO` or a critical lane hold MICRO (a MACRO lane translates
    ///   back immediately, ignoring dwell — operator overrides outrank it).
    /// - `FORCE_MACRO` holds MACRO, subject to macro eligibility.
    /// - From MICRO: count **or** density at the enter thresholds, dwell
    ///   satisfied, schedules `ToMacro`.
    /// - From MACRO: count **and** density at the leave thresholds, dwell
    ///   satisfied, schedules `ToMicro`.
    ///
    /// # Arguments
    /// * `record` - The lane's mode record.
    /// * `load` - Instantaneous count and density.
    /// * `macro_eligible` - Whether the lane may use the macroscopic
    ///   representation at all (not critical, CFL-valid cell grid).
    /// * `tick` - The current tick.
    ///
    /// # Returns
    /// The pending mode, or `None` to stay put.
    pub fn decide(
        &self,
        record: &LaneModeRecord,
        load: LaneLoad,
        macro_eligible: bool,
        tick: u64,
    ) -> Option<PendingMode> {
        let hold_micro = record.is_critical() || record.forced() == ForcedMode::ForceMicro;
        if hold_micro {
            return match record.mode() {
                LaneMode::Macro => Some(PendingMode::ToMicro),
                _ => None,
            };
        }
        if record.forced() == ForcedMode::ForceMacro {
            return match record.mode() {
                LaneMode::Micro if macro_eligible => Some(PendingMode::ToMacro),
                _ => None,
            };
        }
        match record.mode() {
            LaneMode::Micro => {
                let loaded = load.count >= self.enter_macro_count
                    || load.density >= self.enter_macro_density;
                if loaded && macro_eligible && record.dwell_satisfied(tick, self.dwell_ticks) {
                    Some(PendingMode::ToMacro)
                } else {
                    None
                }
            }
            LaneMode::Macro => {
                let light = load.count <= self.leave_macro_count
                    && load.density <= self.leave_macro_density;
                if light && record.dwell_satisfied(tick, self.dwell_ticks) {
                    Some(PendingMode::ToMicro)
                } else {
                    None
                }
            }
            // Transitioning states settle within their own tick; the
            // controller never sees them.
            LaneMode::TransitioningToMicro | LaneMode::TransitioningToMacro => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> ModeController {
        ModeController {
            enter_macro_density: 0.08,
            leave_macro_density: 0.04,
            enter_macro_count: 50.0,
            leave_macro_count: 20.0,
            dwell_ticks: 10,
        }
    }

    fn micro_record() -> LaneModeRecord {
        LaneModeRecord::new(LaneMode::Micro, false)
    }

    #[test]
    fn test_micro_enters_macro_on_density() {
        let pending = controller().decide(
            &micro_record(),
            LaneLoad { count: 30.0, density: 0.09 },
            true,
            0,
        );
        assert_eq!(pending, Some(PendingMode::ToMacro), "Density at the enter threshold switches");
    }

    #[test]
    fn test_micro_enters_macro_on_count() {
        let pending = controller().decide(
            &micro_record(),
            LaneLoad { count: 55.0, density: 0.03 },
            true,
            0,
        );
        assert_eq!(pending, Some(PendingMode::ToMacro), "Count alone suffices (OR rule)");
    }

    #[test]
    fn test_hysteresis_band_holds() {
        // Inside the band (between leave and enter) neither direction fires.
        let mut record = micro_record();
        let load = LaneLoad { count: 30.0, density: 0.06 };
        assert_eq!(controller().decide(&record, load, true, 0), None);
        record.set_mode(LaneMode::Macro);
        assert_eq!(
            controller().decide(&record, load, true, 0),
            None,
            "A macro lane inside the band must also hold (AND rule)"
        );
    }

    #[test]
    fn test_macro_leaves_only_below_both_thresholds() {
        let mut record = micro_record();
        record.set_mode(LaneMode::Macro);
        let still_heavy = LaneLoad { count: 25.0, density: 0.03 };
        assert_eq!(
            controller().decide(&record, still_heavy, true, 0),
            None,
            "Count above leave_macro_count must hold MACRO"
        );
        let light = LaneLoad { count: 15.0, density: 0.03 };
        assert_eq!(controller().decide(&record, light, true, 0), Some(PendingMode::ToMicro));
    }

    #[test]
    fn test_dwell_blocks_switch() {
        let mut record = micro_record();
        record.mark_switched(0);
        let load = LaneLoad { count: 80.0, density: 0.12 };
        assert_eq!(
            controller().decide(&record, load, true, 5),
            None,
            "A switch 5 ticks after the last one violates dwell 10"
        );
        assert_eq!(
            controller().decide(&record, load, true, 10),
            Some(PendingMode::ToMacro),
            "Dwell expires after 10 ticks"
        );
    }

    #[test]
    fn test_critical_lane_holds_micro() {
        let mut record = LaneModeRecord::new(LaneMode::Micro, true);
        let heavy = LaneLoad { count: 80.0, density: 0.12 };
        assert_eq!(
            controller().decide(&record, heavy, true, 0),
            None,
            "A critical lane never enters MACRO"
        );
        record.set_mode(LaneMode::Macro);
        assert_eq!(
            controller().decide(&record, heavy, true, 0),
            Some(PendingMode::ToMicro),
            "A critical lane stuck in MACRO must translate back"
        );
    }

    #[test]
    fn test_forced_macro() {
        let mut record = micro_record();
        record.set_forced(ForcedMode::ForceMacro);
        let empty = LaneLoad { count: 0.0, density: 0.0 };
        assert_eq!(
            controller().decide(&record, empty, true, 0),
            Some(PendingMode::ToMacro),
            "FORCE_MACRO switches regardless of load"
        );
        assert_eq!(
            controller().decide(&record, empty, false, 0),
            None,
            "FORCE_MACRO cannot override macro ineligibility"
        );
    }

    #[test]
    fn test_ineligible_lane_never_switches() {
        let heavy = LaneLoad { count: 80.0, density: 0.12 };
        assert_eq!(
            controller().decide(&micro_record(), heavy, false, 0),
            None,
            "A macro-ineligible lane stays MICRO under any load"
        );
    }
}
