use crate::adaptive::{ForcedMode, LaneMode};
use std::collections::VecDeque;

/// Length of the per-lane density history window, ticks.
pub const HISTORY_WINDOW: usize = 16;

/// Per-lane mode bookkeeping.
///
/// Mutated only by the mode controller (before the steppers) and by the
/// translator (while settling a transition); read-only during the parallel
/// stepper pass.
#[derive(Debug, Clone)]
pub struct LaneModeRecord {
    /// Current representation.
    mode: LaneMode,
    /// Tick of the last committed mode switch, `None` before the first.
    last_switch_tick: Option<u64>,
    /// Operator override.
    forced: ForcedMode,
    /// Intersection/ramp flag: critical lanes are pinned to MICRO.
    critical: bool,
    /// Recent per-tick mean densities, newest last.
    history: VecDeque<f64>,
}

impl LaneModeRecord {
    /// Creates a record in the given initial mode.
    ///
    /// # Arguments
    /// * `mode` - Initial representation, usually `LaneMode::Micro`.
    /// * `critical` - Whether the lane was registered as critical.
    pub fn new(mode: LaneMode, critical: bool) -> Self {
        LaneModeRecord {
            mode,
            last_switch_tick: None,
            forced: ForcedMode::None,
            critical,
            history: VecDeque::with_capacity(HISTORY_WINDOW),
        }
    }

    /// Current representation.
    pub fn mode(&self) -> LaneMode {
        self.mode
    }

    /// Sets the representation. Called by the scheduler when a pending mode
    /// is picked up and by the translator when a transition settles.
    pub fn set_mode(&mut self, mode: LaneMode) {
        self.mode = mode;
    }

    /// Records a committed switch at `tick` for dwell accounting.
    pub fn mark_switched(&mut self, tick: u64) {
        self.last_switch_tick = Some(tick);
    }

    /// Whether the dwell period has passed at `tick`.
    ///
    /// # Arguments
    /// * `tick` - The current tick.
    /// * `dwell_ticks` - Minimum ticks between switches.
    pub fn dwell_satisfied(&self, tick: u64, dwell_ticks: u64) -> bool {
        match self.last_switch_tick {
            None => true,
            Some(switched) => tick.saturating_sub(switched) >= dwell_ticks,
        }
    }

    /// The operator override.
    pub fn forced(&self) -> ForcedMode {
        self.forced
    }

    /// Sets the operator override.
    pub fn set_forced(&mut self, forced: ForcedMode) {
        self.forced = forced;
    }

    /// Whether the lane is critical (intersection/ramp).
    pub fn is_critical(&self) -> bool {
        self.critical
    }

    /// Sets the critical flag.
    pub fn set_critical(&mut self, critical: bool) {
        self.critical = critical;
    }

    /// Pushes this tick's mean density into the history window.
    pub fn push_history(&mut self, density: f64) {
        if self.history.len() == HISTORY_WINDOW {
            self.history.pop_front();
        }
        self.history.push_back(density);
    }

    /// Mean of the recorded history window, or 0 when empty. Exposed for
    /// trend observability; mode transitions use instantaneous values.
    pub fn history_mean(&self) -> f64 {
        if self.history.is_empty() {
            return 0.0;
        }
        self.history.iter().sum::<f64>() / self.history.len() as f64
    }

    /// The recorded history, oldest first.
    pub fn history(&self) -> impl Iterator<Item = f64> + '_ {
        self.history.iter().copied()
    }
}
