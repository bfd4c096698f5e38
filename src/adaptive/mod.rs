//! # Adaptive Mode Module
//!
//! The per-lane state machine deciding which representation a lane uses:
//! discrete vehicles (MICRO) or density cells (MACRO).
//!
//! ## Key Components
//!
//! - [`LaneMode`] - The four FSM states; the transitioning states exist only
//!   within the tick on which the translator runs
//! - [`ForcedMode`] - Operator override pinning a lane to one representation
//! - [`LaneModeRecord`] - Per-lane mode bookkeeping: last switch tick,
//!   critical flag, recent density history
//! - [`ModeController`] - Threshold policy with hysteresis and dwell; computes
//!   pending modes, never mutates lane state directly
//!
//! ## Switching policy
//!
//! A MICRO lane schedules a switch to MACRO when its vehicle count **or**
//! density reaches the enter thresholds; a MACRO lane returns to MICRO only
//! when count **and** density drop below the leave thresholds. The gap
//! between enter and leave thresholds (validated against the configured
//! hysteresis factor) and the dwell time between switches prevent mode
//! flapping.

mod controller;
mod mode;
mod record;

pub use self::{controller::*, mode::*, record::*};
