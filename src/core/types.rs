// Core Type Definitions for Station Coincidences
// Detection events and coincidence groups shared by every layer

use serde::{Deserialize, Serialize};
use std::fmt;

/// Nanoseconds since the epoch, as recorded by the station GPS clock
pub type Timestamp = i64;

/// Station number within the detector network
pub type StationId = u32;

// ============================================================================
// Event
// ============================================================================

/// A single detection reported by one station
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Event {
    pub timestamp: Timestamp,
    pub station_id: StationId,
}

impl Event {
    pub fn new(timestamp: Timestamp, station_id: StationId) -> Self {
        Self { timestamp, station_id }
    }

    /// Global ordering key: time first, station id breaks ties
    pub fn sort_key(&self) -> (Timestamp, StationId) {
        (self.timestamp, self.station_id)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Event(t={}ns, station={})", self.timestamp, self.station_id)
    }
}

// ============================================================================
// Coincidence Group
// ============================================================================

/// Maximal run of consecutive filtered events whose gaps are all below the window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoincidenceGroup {
    pub events: Vec<Event>,
}

impl CoincidenceGroup {
    pub fn new(events: Vec<Event>) -> Self {
        Self { events }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn first(&self) -> Option<&Event> {
        self.events.first()
    }

    pub fn last(&self) -> Option<&Event> {
        self.events.last()
    }

    /// Time between the first and last event of the group
    pub fn span_ns(&self) -> u64 {
        match (self.first(), self.last()) {
            (Some(first), Some(last)) => last.timestamp.abs_diff(first.timestamp),
            _ => 0,
        }
    }

    /// Distinct stations taking part, ascending
    pub fn station_ids(&self) -> Vec<StationId> {
        let mut ids: Vec<StationId> = self.events.iter().map(|e| e.station_id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    pub fn n_stations(&self) -> usize {
        self.station_ids().len()
    }
}

impl fmt::Display for CoincidenceGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let start = self.first().map(|e| e.timestamp).unwrap_or(0);
        write!(
            f,
            "CoincidenceGroup(start={}ns, events={}, stations={:?}, span={}ns)",
            start,
            self.len(),
            self.station_ids(),
            self.span_ns()
        )
    }
}
