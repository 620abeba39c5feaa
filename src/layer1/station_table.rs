// Station Event Tables - boundary records from the data-loading collaborator
// One table per station, grouped into named clusters for analysis

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::types::{Event, StationId, Timestamp};

/// Detection timestamps of a single station
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationEventTable {
    pub station_id: StationId,
    pub timestamps: Vec<Timestamp>,
}

impl StationEventTable {
    pub fn new(station_id: StationId, timestamps: Vec<Timestamp>) -> Self {
        Self { station_id, timestamps }
    }

    /// Build from already-tagged events, keeping only those of `station_id`
    pub fn from_events(station_id: StationId, events: &[Event]) -> Self {
        Self {
            station_id,
            timestamps: events
                .iter()
                .filter(|e| e.station_id == station_id)
                .map(|e| e.timestamp)
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Non-decreasing timestamps, as the loader is expected to hand them over
    pub fn is_time_ordered(&self) -> bool {
        self.timestamps.windows(2).all(|pair| pair[0] <= pair[1])
    }

    pub fn events(&self) -> impl Iterator<Item = Event> + '_ {
        let station_id = self.station_id;
        self.timestamps.iter().map(move |&ts| Event::new(ts, station_id))
    }

    pub fn to_events(&self) -> Vec<Event> {
        self.events().collect()
    }
}

impl fmt::Display for StationEventTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StationEventTable(station={}, events={})", self.station_id, self.len())
    }
}

/// Named set of stations analysed together (a cluster, or the whole network)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationGroup {
    pub name: String,
    pub tables: Vec<StationEventTable>,
}

impl StationGroup {
    pub fn new(name: impl Into<String>, tables: Vec<StationEventTable>) -> Self {
        Self { name: name.into(), tables }
    }

    pub fn n_stations(&self) -> usize {
        self.tables.len()
    }

    /// Stations that actually recorded events
    pub fn n_active_stations(&self) -> usize {
        self.tables.iter().filter(|t| !t.is_empty()).count()
    }

    pub fn n_events(&self) -> usize {
        self.tables.iter().map(StationEventTable::len).sum()
    }

    pub fn station_ids(&self) -> Vec<StationId> {
        self.tables.iter().map(|t| t.station_id).collect()
    }
}

impl fmt::Display for StationGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "StationGroup(name={}, stations={}, events={})",
            self.name,
            self.n_stations(),
            self.n_events()
        )
    }
}
