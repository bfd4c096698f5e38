use crate::adaptive::{LaneLoad, LaneMode, LaneModeRecord};
use crate::agents::DriverSummary;
use crate::macroscopic::CellGrid;
use crate::micro::MicroState;
use crate::network::Lane;

/// The mode-dependent representation of one lane. Exactly one of the two is
/// live at any time.
#[derive(Debug, Clone)]
pub enum LaneState {
    /// Ordered vehicle sequence plus spatial index.
    Micro(MicroState),
    /// Density cell grid.
    Macro(CellGrid),
}

impl LaneState {
    /// The microscopic state, if live.
    pub fn as_micro(&self) -> Option<&MicroState> {
        match self {
            LaneState::Micro(state) => Some(state),
            LaneState::Macro(_) => None,
        }
    }

    /// The macroscopic state, if live.
    pub fn as_macro(&self) -> Option<&CellGrid> {
        match self {
            LaneState::Micro(_) => None,
            LaneState::Macro(grid) => Some(grid),
        }
    }

    /// The macroscopic state, mutable, if live.
    pub fn as_macro_mut(&mut self) -> Option<&mut CellGrid> {
        match self {
            LaneState::Micro(_) => None,
            LaneState::Macro(grid) => Some(grid),
        }
    }

    /// Whether the microscopic representation is live.
    pub fn is_micro(&self) -> bool {
        matches!(self, LaneState::Micro(_))
    }
}

/// Everything mutable the scheduler keeps per lane, indexed densely in the
/// network's registration order.
#[derive(Debug, Clone)]
pub struct LaneRuntime {
    /// The live representation.
    pub state: LaneState,
    /// Mode FSM bookkeeping.
    pub record: LaneModeRecord,
    /// Retained statistics of the last evicted population.
    pub summary: DriverSummary,
    /// Cell count this lane uses when macroscopic.
    pub cells: usize,
    /// Whether the lane may use the macroscopic representation at all.
    pub macro_eligible: bool,
}

impl LaneRuntime {
    /// Creates the initial (microscopic, empty) runtime for a lane.
    ///
    /// # Arguments
    /// * `lane` - The lane.
    /// * `cells` - Cell count when macroscopic.
    /// * `bucket_size` - Bucket width for the spatial index.
    pub fn new(lane: &Lane, cells: usize, bucket_size: f64) -> Self {
        LaneRuntime {
            state: LaneState::Micro(MicroState::new(lane.length(), bucket_size)),
            record: LaneModeRecord::new(LaneMode::Micro, lane.is_critical()),
            summary: DriverSummary::new(),
            cells,
            macro_eligible: !lane.is_critical(),
        }
    }

    /// Instantaneous load of the lane: vehicle count (or `∫ρ dx`) and mean
    /// density over the lane length.
    pub fn load(&self, lane: &Lane) -> LaneLoad {
        match &self.state {
            LaneState::Micro(state) => {
                let count = state.len() as f64;
                LaneLoad { count, density: count / lane.length() }
            }
            LaneState::Macro(grid) => LaneLoad {
                count: grid.total_mass(),
                density: grid.mean_density(),
            },
        }
    }
}
