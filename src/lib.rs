// Station Coincidences - multi-station coincidence detection
// Merges per-station detection streams and counts coincidences per window

pub mod core;
pub mod layer1;
pub mod layer2;
pub mod layer3;

pub use crate::core::{CoincidenceGroup, Event, StationId, Timestamp};
pub use crate::layer1::{StationEventTable, StationGroup};
pub use crate::layer2::{EventStreamMerger, MergedStream, MergeStats};
pub use crate::layer3::{
    deltas, groups, CoincidenceAnalysis, CoincidenceCounter, CoincidenceError,
    CoincidenceReport, InvalidWindowError, WindowRamp,
};
