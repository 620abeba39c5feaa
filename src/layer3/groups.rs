// Coincidence Groups - maximal runs of events closer than the window
// Single left-to-right scan over the filtered stream

use std::collections::BTreeMap;
use tracing::debug;

use crate::core::types::{CoincidenceGroup, Event, StationId};
use crate::layer3::counter::{window_threshold, InvalidWindowError};

/// Maximal runs of consecutive events whose every gap is below `window`.
///
/// Singletons are not reported. The gap into and out of each group is at
/// least `window`.
pub fn groups(stream: &[Event], window: f64) -> Result<Vec<CoincidenceGroup>, InvalidWindowError> {
    let threshold = window_threshold(window)?;
    let mut found = Vec::new();
    let mut run_start = 0;

    for i in 1..=stream.len() {
        let continues = i < stream.len() && stream[i].timestamp.abs_diff(stream[i - 1].timestamp) < threshold;
        if !continues {
            if i - run_start >= 2 {
                found.push(CoincidenceGroup::new(stream[run_start..i].to_vec()));
            }
            run_start = i;
        }
    }

    debug!(window, n_groups = found.len(), "Coincidence groups found");
    Ok(found)
}

/// Group size -> number of groups of that size (2-fold, 3-fold, ...)
pub fn multiplicity_histogram(groups: &[CoincidenceGroup]) -> BTreeMap<usize, usize> {
    let mut histogram = BTreeMap::new();
    for group in groups {
        *histogram.entry(group.len()).or_insert(0) += 1;
    }
    histogram
}

/// How often each unordered station pair appears together in a group
pub fn station_pairs(groups: &[CoincidenceGroup]) -> BTreeMap<(StationId, StationId), usize> {
    let mut pairs = BTreeMap::new();
    for group in groups {
        let ids = group.station_ids();
        for (i, &a) in ids.iter().enumerate() {
            for &b in &ids[i + 1..] {
                *pairs.entry((a, b)).or_insert(0) += 1;
            }
        }
    }
    pairs
}
