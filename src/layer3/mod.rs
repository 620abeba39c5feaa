// Layer 3 - Coincidence analysis
// Gap thresholds, coincidence groups and per-group window sweeps

// Common utilities
pub mod common;

pub mod counter;
pub mod groups;
pub mod analysis;

pub use common::WindowRamp;
pub use counter::{
    CoincidenceCounter, CoincidenceError, InvalidWindowError,
    count, deltas, sweep, window_threshold, window_thresholds,
};
pub use groups::{groups, multiplicity_histogram, station_pairs};
pub use analysis::{CoincidenceAnalysis, CoincidenceReport};
