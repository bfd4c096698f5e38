//! # Logging Module
//!
//! Structured logging system for simulation debugging and monitoring,
//! using the `tracing` crate with JSON output format.
//!
//! ## Key Components
//!
//! - [`VerboseLevel`] - Hierarchical logging levels from `None` to `All`
//! - [`init_logger`] / [`set_verbose_level`] - One-time tracing setup and
//!   global level control
//! - Event constants (`EVENT_*`) naming every phase of the tick pipeline
//! - The [`log_main!`](crate::log_main), [`log_additional!`](crate::log_additional)
//!   and [`log_detailed!`](crate::log_detailed) macros, which skip all
//!   formatting work unless the level is enabled
//!
//! The hot loops (perceive/decide/integrate, cell updates) log nothing at
//! all; phase-level events are emitted by the scheduler and the resolution
//! pass only.

mod verbose;

pub use self::verbose::*;
