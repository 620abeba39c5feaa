// Event Stream Merger - Pure Rust Implementation
// Builds one time-ordered, self-coincidence-free stream from per-station lists

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, info, warn};

use crate::core::config::MergerConfig;
use crate::core::types::{Event, StationId, Timestamp};
use crate::layer1::station_table::StationEventTable;

// ============================================================================
// Errors and Warnings
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MergeError {
    #[error("appended stream starts at {next_start}ns, before the current end {current_end}ns")]
    OverlappingRanges {
        current_end: Timestamp,
        next_start: Timestamp,
    },
}

/// Non-fatal conditions noticed while merging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MergeWarning {
    /// No events at all were supplied
    EmptyInput,
    /// A station list was not time-ordered; the global sort still orders it
    UnorderedStation { station_id: StationId },
}

impl fmt::Display for MergeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeWarning::EmptyInput => write!(f, "empty input"),
            MergeWarning::UnorderedStation { station_id } => {
                write!(f, "station {} events not time-ordered", station_id)
            }
        }
    }
}

// ============================================================================
// Statistics
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    pub n_stations: usize,
    /// Events before self-coincidence filtering
    pub n_events: usize,
    /// Events left after self-coincidence filtering
    pub n_filtered: usize,
    pub self_coincidences_removed: usize,
    pub warnings: Vec<MergeWarning>,
}

impl fmt::Display for MergeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MergeStats(stations={}, events={}, filtered={}, removed={}, warnings={})",
            self.n_stations,
            self.n_events,
            self.n_filtered,
            self.self_coincidences_removed,
            self.warnings.len()
        )
    }
}

// ============================================================================
// Merged Stream
// ============================================================================

/// Ascending by (timestamp, station_id); no two neighbours share a station
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergedStream {
    events: Vec<Event>,
    stations: BTreeSet<StationId>,
    stats: MergeStats,
}

impl MergedStream {
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn into_events(self) -> Vec<Event> {
        self.events
    }

    pub fn stats(&self) -> &MergeStats {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Gaps between neighbouring events
    pub fn deltas(&self) -> Vec<u64> {
        crate::layer3::counter::deltas(&self.events)
    }

    /// Concatenate the merged stream of a later, disjoint time range.
    ///
    /// Both sides are already filtered, so only the seam can hold a new
    /// same-station pair: the first event of `other` is dropped when it
    /// repeats the station of the last event here.
    pub fn append(&mut self, other: MergedStream) -> Result<(), MergeError> {
        if let (Some(last), Some(first)) = (self.events.last(), other.events.first()) {
            if first.sort_key() < last.sort_key() {
                return Err(MergeError::OverlappingRanges {
                    current_end: last.timestamp,
                    next_start: first.timestamp,
                });
            }
        }

        let MergedStream { events, stations, stats } = other;
        let seam_repeat = match (self.events.last(), events.first()) {
            (Some(last), Some(first)) => last.station_id == first.station_id,
            _ => false,
        };
        let removed = usize::from(seam_repeat);
        self.events.extend(events.into_iter().skip(removed));

        self.stations.extend(stations);
        self.stats.n_stations = self.stations.len();
        self.stats.n_events += stats.n_events;
        self.stats.self_coincidences_removed += stats.self_coincidences_removed + removed;
        self.stats.n_filtered = self.events.len();
        for warning in stats.warnings {
            if warning != MergeWarning::EmptyInput && !self.stats.warnings.contains(&warning) {
                self.stats.warnings.push(warning);
            }
        }
        if !self.events.is_empty() {
            self.stats.warnings.retain(|w| *w != MergeWarning::EmptyInput);
        }

        debug!(seam_removed = removed, total = self.events.len(), "Appended merged stream");
        Ok(())
    }
}

/// Drop the later event of every adjacent same-station pair.
///
/// Keeps the earliest event of each same-station run, which is exactly the
/// fixed point of repeatedly deleting the later element of an adjacent
/// same-station pair. Running it again on its output removes nothing.
/// Returns the number of events removed.
pub fn filter_self_coincidences(events: &mut Vec<Event>) -> usize {
    let before = events.len();
    events.dedup_by_key(|e| e.station_id);
    before - events.len()
}

/// True when no two neighbouring events share a station
pub fn has_self_coincidences(events: &[Event]) -> bool {
    events.windows(2).any(|pair| pair[0].station_id == pair[1].station_id)
}

// ============================================================================
// Merger
// ============================================================================

pub struct EventStreamMerger {
    config: MergerConfig,
}

impl EventStreamMerger {
    pub fn new(config: MergerConfig) -> Self {
        Self { config }
    }

    /// Merge per-station event lists into one ordered, filtered stream.
    ///
    /// Ties on timestamp are broken by ascending station id, so the result
    /// does not depend on the order in which the lists are supplied.
    pub fn merge(&self, streams: &[Vec<Event>]) -> MergedStream {
        let n_events: usize = streams.iter().map(Vec::len).sum();
        let mut warnings = Vec::new();
        let mut stations = BTreeSet::new();

        if self.config.check_station_order {
            for stream in streams {
                let unordered = stream.windows(2).find(|pair| pair[1].timestamp < pair[0].timestamp);
                if let Some(pair) = unordered {
                    push_unordered(&mut warnings, pair[1].station_id);
                }
            }
        }

        // One contiguous buffer for the whole day of data
        let mut events = Vec::with_capacity(n_events);
        for stream in streams {
            stations.extend(stream.iter().map(|e| e.station_id));
            events.extend_from_slice(stream);
        }

        self.finish(events, stations, warnings)
    }

    /// Merge the tables of a station group
    pub fn merge_tables(&self, tables: &[StationEventTable]) -> MergedStream {
        let mut warnings = Vec::new();
        let mut stations = BTreeSet::new();
        let n_events: usize = tables.iter().map(StationEventTable::len).sum();

        let mut events = Vec::with_capacity(n_events);
        for table in tables {
            if self.config.check_station_order && !table.is_time_ordered() {
                push_unordered(&mut warnings, table.station_id);
            }
            if !table.is_empty() {
                stations.insert(table.station_id);
            }
            events.extend(table.events());
        }

        self.finish(events, stations, warnings)
    }

    fn finish(
        &self,
        mut events: Vec<Event>,
        stations: BTreeSet<StationId>,
        mut warnings: Vec<MergeWarning>,
    ) -> MergedStream {
        let n_events = events.len();

        if events.is_empty() {
            warn!("No events supplied, merged stream is empty");
            warnings.push(MergeWarning::EmptyInput);
            return MergedStream {
                events,
                stations,
                stats: MergeStats { warnings, ..MergeStats::default() },
            };
        }

        events.sort_by_key(Event::sort_key);
        let removed = filter_self_coincidences(&mut events);
        events.shrink_to_fit();

        let stats = MergeStats {
            n_stations: stations.len(),
            n_events,
            n_filtered: events.len(),
            self_coincidences_removed: removed,
            warnings,
        };
        info!(
            n_stations = stats.n_stations,
            n_events = stats.n_events,
            n_filtered = stats.n_filtered,
            "Event streams merged"
        );

        MergedStream { events, stations, stats }
    }
}

impl Default for EventStreamMerger {
    fn default() -> Self {
        Self::new(MergerConfig::default())
    }
}

/// Record an unordered station once, however many lists it appears in
fn push_unordered(warnings: &mut Vec<MergeWarning>, station_id: StationId) {
    let warning = MergeWarning::UnorderedStation { station_id };
    if !warnings.contains(&warning) {
        warn!(station_id, "Station events not time-ordered");
        warnings.push(warning);
    }
}
