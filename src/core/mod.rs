// Core Module - Foundational types, config, logging

pub mod types;
pub mod config;
pub mod logger;

pub use types::*;
pub use config::{
    WindowRampConfig, MergerConfig, AnalysisConfig, MonitoringConfig,
    ConfigManager, ConfigSummary, ConfigError,
};
pub use logger::{setup_logging, setup_logging_from_config};
