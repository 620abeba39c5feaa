// Configuration Management for Station Coincidences
// Window ramps, merger options and analysis policy, loaded from JSON and env

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

// ============================================================================
// Configuration Structures
// ============================================================================

/// Logarithmic window ramp: windows are 10^x ns for x in [start, stop) by step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowRampConfig {
    pub start_exponent: f64,
    pub stop_exponent: f64,
    pub step: f64,
}

impl Default for WindowRampConfig {
    fn default() -> Self {
        // 10^14 ns is a little over a day
        Self {
            start_exponent: 0.0,
            stop_exponent: 14.0,
            step: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergerConfig {
    /// Warn when a station list handed over is not time-ordered
    pub check_station_order: bool,
}

impl Default for MergerConfig {
    fn default() -> Self {
        Self { check_station_order: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Station groups with fewer stations are skipped in per-cluster runs
    pub min_stations: usize,
    /// Drop reports whose sweep found no coincidence at any window
    pub skip_empty: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_stations: 2,
            skip_empty: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub log_level: String,
    pub json_format: bool,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            log_level: "INFO".to_string(),
            json_format: false,
        }
    }
}

// ============================================================================
// Configuration Summary
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ConfigSummary {
    pub n_windows: usize,
    pub first_window_exponent: f64,
    pub last_window_exponent: f64,
    pub min_stations: usize,
    pub log_level: String,
}

// ============================================================================
// Configuration Manager
// ============================================================================

pub struct ConfigManager {
    window_ramp: Arc<RwLock<WindowRampConfig>>,
    merger: Arc<RwLock<MergerConfig>>,
    analysis: Arc<RwLock<AnalysisConfig>>,
    monitoring: Arc<RwLock<MonitoringConfig>>,
}

impl ConfigManager {
    pub fn new(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut manager = Self {
            window_ramp: Arc::new(RwLock::new(WindowRampConfig::default())),
            merger: Arc::new(RwLock::new(MergerConfig::default())),
            analysis: Arc::new(RwLock::new(AnalysisConfig::default())),
            monitoring: Arc::new(RwLock::new(MonitoringConfig::default())),
        };

        if let Some(path) = config_path {
            manager.load_from_file(path)?;
        }

        manager.load_from_env();

        info!("Configuration initialized");
        Ok(manager)
    }

    /// Load configuration from JSON file
    pub fn load_from_file(&mut self, config_path: &str) -> Result<(), ConfigError> {
        let path = Path::new(config_path);
        if !path.exists() {
            warn!(path = config_path, "Config file not found");
            return Ok(());
        }

        let content = fs::read_to_string(path)?;
        let config_data: HashMap<String, serde_json::Value> = serde_json::from_str(&content)?;

        if let Some(data) = config_data.get("window_ramp") {
            match serde_json::from_value::<WindowRampConfig>(data.clone()) {
                Ok(ramp) => *self.window_ramp.write() = ramp,
                Err(e) => warn!(section = "window_ramp", error = %e, "Ignoring malformed config section"),
            }
        }

        if let Some(data) = config_data.get("merger") {
            match serde_json::from_value::<MergerConfig>(data.clone()) {
                Ok(merger) => *self.merger.write() = merger,
                Err(e) => warn!(section = "merger", error = %e, "Ignoring malformed config section"),
            }
        }

        if let Some(data) = config_data.get("analysis") {
            match serde_json::from_value::<AnalysisConfig>(data.clone()) {
                Ok(analysis) => *self.analysis.write() = analysis,
                Err(e) => warn!(section = "analysis", error = %e, "Ignoring malformed config section"),
            }
        }

        if let Some(data) = config_data.get("monitoring") {
            match serde_json::from_value::<MonitoringConfig>(data.clone()) {
                Ok(monitoring) => *self.monitoring.write() = monitoring,
                Err(e) => warn!(section = "monitoring", error = %e, "Ignoring malformed config section"),
            }
        }

        info!(path = config_path, "Configuration loaded");
        Ok(())
    }

    /// Apply overrides from environment variables
    pub fn load_from_env(&mut self) {
        if let Ok(level) = std::env::var("COINCIDENCE_LOG_LEVEL") {
            self.monitoring.write().log_level = level;
        }
        if let Ok(step) = std::env::var("COINCIDENCE_WINDOW_STEP") {
            match step.parse::<f64>() {
                Ok(step) => self.window_ramp.write().step = step,
                Err(_) => warn!(value = %step, "COINCIDENCE_WINDOW_STEP is not a number"),
            }
        }
    }

    /// Save configuration to JSON file
    pub fn save_to_file(&self, config_path: &str) -> Result<(), ConfigError> {
        let mut config_map = HashMap::new();
        config_map.insert("window_ramp", serde_json::to_value(&*self.window_ramp.read())?);
        config_map.insert("merger", serde_json::to_value(&*self.merger.read())?);
        config_map.insert("analysis", serde_json::to_value(&*self.analysis.read())?);
        config_map.insert("monitoring", serde_json::to_value(&*self.monitoring.read())?);

        if let Some(parent) = Path::new(config_path).parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(&config_map)?;
        fs::write(config_path, json)?;

        info!(path = config_path, "Configuration saved");
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<bool, ConfigError> {
        let mut errors = Vec::new();
        let ramp = self.window_ramp.read();
        let analysis = self.analysis.read();
        let monitoring = self.monitoring.read();

        if !(ramp.step.is_finite() && ramp.step > 0.0) {
            errors.push(format!("window_ramp.step must be positive, got {}", ramp.step));
        }
        if !(ramp.start_exponent.is_finite() && ramp.stop_exponent.is_finite()) {
            errors.push("window_ramp exponents must be finite".to_string());
        } else if ramp.stop_exponent <= ramp.start_exponent {
            errors.push(format!(
                "window_ramp.stop_exponent ({}) must exceed start_exponent ({})",
                ramp.stop_exponent, ramp.start_exponent
            ));
        }

        if analysis.min_stations < 1 {
            errors.push("analysis.min_stations must be at least 1".to_string());
        }

        if !matches!(
            monitoring.log_level.to_uppercase().as_str(),
            "TRACE" | "DEBUG" | "INFO" | "WARN" | "WARNING" | "ERROR"
        ) {
            errors.push(format!("unknown log level '{}'", monitoring.log_level));
        }

        if !errors.is_empty() {
            for error in &errors {
                warn!(error = %error, "Config validation error");
            }
            return Ok(false);
        }

        info!("Configuration validated successfully");
        Ok(true)
    }

    /// Like `validate`, but turns the first problem into an error
    pub fn validated(self) -> Result<Self, ConfigError> {
        if self.validate()? {
            Ok(self)
        } else {
            Err(ConfigError::Validation("invalid configuration, see log".to_string()))
        }
    }

    pub fn get_summary(&self) -> ConfigSummary {
        let ramp = self.window_ramp.read();
        let n_windows = if ramp.step > 0.0 && ramp.stop_exponent > ramp.start_exponent {
            ((ramp.stop_exponent - ramp.start_exponent) / ramp.step).ceil() as usize
        } else {
            0
        };

        ConfigSummary {
            n_windows,
            first_window_exponent: ramp.start_exponent,
            last_window_exponent: ramp.start_exponent + n_windows.saturating_sub(1) as f64 * ramp.step,
            min_stations: self.analysis.read().min_stations,
            log_level: self.monitoring.read().log_level.clone(),
        }
    }

    // Getters for each config section
    pub fn window_ramp(&self) -> WindowRampConfig {
        self.window_ramp.read().clone()
    }

    pub fn merger(&self) -> MergerConfig {
        self.merger.read().clone()
    }

    pub fn analysis(&self) -> AnalysisConfig {
        self.analysis.read().clone()
    }

    pub fn monitoring(&self) -> MonitoringConfig {
        self.monitoring.read().clone()
    }

    pub fn set_window_ramp(&self, ramp: WindowRampConfig) {
        *self.window_ramp.write() = ramp;
    }

    pub fn set_analysis(&self, analysis: AnalysisConfig) {
        *self.analysis.write() = analysis;
    }
}
