// Window Ramp - logarithmically spaced coincidence windows
// Exponents are start + i * step, so long ramps do not accumulate drift

use serde::Serialize;

use crate::core::config::WindowRampConfig;
use crate::layer3::counter::{window_thresholds, InvalidWindowError};

/// Upper bound on ramp length
pub const MAX_WINDOWS: usize = 1_000_000;

/// Strictly ascending sequence of windows (ns) for a sweep
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowRamp {
    windows: Vec<f64>,
}

impl WindowRamp {
    /// 10^x ns for x in [start_exponent, stop_exponent) by `step`
    pub fn logarithmic(start_exponent: f64, stop_exponent: f64, step: f64) -> Result<Self, InvalidWindowError> {
        if !(step.is_finite() && step > 0.0) {
            return Err(InvalidWindowError::InvalidRamp(format!("step must be positive, got {}", step)));
        }
        if !(start_exponent.is_finite() && stop_exponent.is_finite()) {
            return Err(InvalidWindowError::InvalidRamp("exponents must be finite".to_string()));
        }

        let span = stop_exponent - start_exponent;
        let mut n = if span > 0.0 { (span / step).ceil() as usize } else { 0 };
        if n > MAX_WINDOWS {
            return Err(InvalidWindowError::InvalidRamp(format!(
                "{} windows requested, limit is {}",
                n, MAX_WINDOWS
            )));
        }
        // Keep the stop exponent exclusive despite rounding in span / step
        while n > 0 && start_exponent + (n - 1) as f64 * step >= stop_exponent {
            n -= 1;
        }

        let windows = (0..n)
            .map(|i| 10f64.powf(start_exponent + i as f64 * step))
            .collect();
        Self::from_windows(windows)
    }

    pub fn from_config(config: &WindowRampConfig) -> Result<Self, InvalidWindowError> {
        Self::logarithmic(config.start_exponent, config.stop_exponent, config.step)
    }

    /// Caller-supplied windows; must be finite, non-negative, strictly ascending
    pub fn from_windows(windows: Vec<f64>) -> Result<Self, InvalidWindowError> {
        window_thresholds(&windows)?;
        Ok(Self { windows })
    }

    pub fn windows(&self) -> &[f64] {
        &self.windows
    }

    /// log10 of each window, for plotting against
    pub fn exponents(&self) -> Vec<f64> {
        self.windows.iter().map(|w| w.log10()).collect()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}
