// Coincidence Counter - gap thresholds over the filtered stream
// Deltas are computed once; every window is a binary search on the sorted gaps

use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

use crate::core::types::Event;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvalidWindowError {
    #[error("window must be non-negative, got {0}ns")]
    Negative(f64),
    #[error("window must be finite, got {0}")]
    NotFinite(f64),
    #[error("windows must be strictly ascending: windows[{index}] = {current} after {previous}")]
    NotAscending {
        index: usize,
        previous: f64,
        current: f64,
    },
    #[error("invalid window ramp: {0}")]
    InvalidRamp(String),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoincidenceError {
    #[error(transparent)]
    InvalidWindow(#[from] InvalidWindowError),
    #[error("window sweep cancelled after {completed} of {total} windows")]
    Cancelled { completed: usize, total: usize },
}

// ============================================================================
// Window validation
// ============================================================================

/// Integer gap threshold equivalent to `gap < window`.
///
/// Gaps are whole nanoseconds, so `gap < w` holds exactly when
/// `gap < ceil(w)`. Rejects NaN, infinities and negative windows.
pub fn window_threshold(window: f64) -> Result<u64, InvalidWindowError> {
    if !window.is_finite() {
        return Err(InvalidWindowError::NotFinite(window));
    }
    if window < 0.0 {
        return Err(InvalidWindowError::Negative(window));
    }
    // `as` saturates for windows beyond u64::MAX
    Ok(window.ceil() as u64)
}

/// Validate a sweep: every window usable and the sequence strictly ascending
pub fn window_thresholds(windows: &[f64]) -> Result<Vec<u64>, InvalidWindowError> {
    let mut thresholds = Vec::with_capacity(windows.len());
    for (index, &window) in windows.iter().enumerate() {
        thresholds.push(window_threshold(window)?);
        if index > 0 && windows[index - 1] >= window {
            return Err(InvalidWindowError::NotAscending {
                index,
                previous: windows[index - 1],
                current: window,
            });
        }
    }
    Ok(thresholds)
}

// ============================================================================
// Deltas and single-window count
// ============================================================================

/// Gaps between neighbouring events of an ascending stream
pub fn deltas(stream: &[Event]) -> Vec<u64> {
    debug_assert!(
        stream.windows(2).all(|p| p[0].timestamp <= p[1].timestamp),
        "stream must be time-ordered"
    );
    stream
        .windows(2)
        .map(|pair| pair[1].timestamp.abs_diff(pair[0].timestamp))
        .collect()
}

/// Number of gaps strictly below `window`, by a linear scan
pub fn count(deltas: &[u64], window: f64) -> Result<usize, InvalidWindowError> {
    let threshold = window_threshold(window)?;
    Ok(deltas.iter().filter(|&&gap| gap < threshold).count())
}

/// Counts for an ascending window sequence, using the sorted strategy
pub fn sweep(deltas: &[u64], windows: &[f64]) -> Result<Vec<usize>, InvalidWindowError> {
    CoincidenceCounter::new(deltas.to_vec()).sweep(windows)
}

// ============================================================================
// Sorted counter
// ============================================================================

/// Gap sequence sorted once, answering any number of window queries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoincidenceCounter {
    sorted: Vec<u64>,
}

impl CoincidenceCounter {
    pub fn new(mut deltas: Vec<u64>) -> Self {
        deltas.sort_unstable();
        Self { sorted: deltas }
    }

    pub fn from_stream(stream: &[Event]) -> Self {
        Self::new(deltas(stream))
    }

    pub fn n_deltas(&self) -> usize {
        self.sorted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    pub fn sorted_deltas(&self) -> &[u64] {
        &self.sorted
    }

    fn count_below(&self, threshold: u64) -> usize {
        self.sorted.partition_point(|&gap| gap < threshold)
    }

    pub fn count(&self, window: f64) -> Result<usize, InvalidWindowError> {
        Ok(self.count_below(window_threshold(window)?))
    }

    /// Counts for every window; the sequence is validated before any counting
    pub fn sweep(&self, windows: &[f64]) -> Result<Vec<usize>, InvalidWindowError> {
        let thresholds = window_thresholds(windows)?;
        debug!(n_windows = windows.len(), n_deltas = self.sorted.len(), "Sweeping windows");
        Ok(thresholds.into_iter().map(|t| self.count_below(t)).collect())
    }

    /// Sweep in chunks, checking `cancel` between chunks.
    ///
    /// A cancelled sweep returns an error, never a truncated count list.
    pub fn sweep_cancellable(
        &self,
        windows: &[f64],
        chunk_size: usize,
        cancel: &AtomicBool,
    ) -> Result<Vec<usize>, CoincidenceError> {
        let thresholds = window_thresholds(windows)?;
        let mut counts = Vec::with_capacity(thresholds.len());

        for chunk in thresholds.chunks(chunk_size.max(1)) {
            if cancel.load(Ordering::Relaxed) {
                warn!(completed = counts.len(), total = thresholds.len(), "Window sweep cancelled");
                return Err(CoincidenceError::Cancelled {
                    completed: counts.len(),
                    total: thresholds.len(),
                });
            }
            counts.extend(chunk.iter().map(|&t| self.count_below(t)));
        }

        Ok(counts)
    }

    /// Same result as `sweep`, windows evaluated on the rayon pool
    #[cfg(feature = "parallel")]
    pub fn sweep_parallel(&self, windows: &[f64]) -> Result<Vec<usize>, InvalidWindowError> {
        use rayon::prelude::*;

        let thresholds = window_thresholds(windows)?;
        Ok(thresholds.par_iter().map(|&t| self.count_below(t)).collect())
    }
}
