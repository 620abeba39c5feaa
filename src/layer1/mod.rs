// Layer 1 - Input boundary
// Per-station event tables as handed over by the data-loading collaborator

pub mod station_table;

pub use station_table::{StationEventTable, StationGroup};
