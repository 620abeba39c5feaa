// Coincidence Analysis - merge, delta and sweep for one station group
// Produces the per-group report handed to the plotting layer

use serde::Serialize;
use std::fmt;
use tracing::{info, info_span, warn};

use crate::core::config::{AnalysisConfig, ConfigManager, MergerConfig};
use crate::core::types::CoincidenceGroup;
use crate::layer1::station_table::StationGroup;
use crate::layer2::merger::{EventStreamMerger, MergeWarning};
use crate::layer3::common::window_ramp::WindowRamp;
use crate::layer3::counter::{CoincidenceCounter, CoincidenceError};
use crate::layer3::groups::groups;

// ============================================================================
// Report
// ============================================================================

/// Coincidence counts versus window for one station group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoincidenceReport {
    pub group_name: String,
    pub n_stations: usize,
    /// Events before self-coincidence filtering
    pub n_events: usize,
    /// Events after self-coincidence filtering
    pub n_filtered: usize,
    pub windows: Vec<f64>,
    pub counts: Vec<usize>,
    pub warnings: Vec<MergeWarning>,
}

impl CoincidenceReport {
    pub fn total_coincidences(&self) -> usize {
        self.counts.iter().sum()
    }

    pub fn has_coincidences(&self) -> bool {
        self.counts.iter().any(|&c| c > 0)
    }

    /// (log10 window, count) points
    pub fn curve(&self) -> Vec<(f64, usize)> {
        self.windows
            .iter()
            .zip(&self.counts)
            .map(|(w, &c)| (w.log10(), c))
            .collect()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Log a multi-line summary
    pub fn print_report(&self) {
        info!("=== COINCIDENCES: {} ===", self.group_name);
        info!("  Stations:     {}", self.n_stations);
        info!("  Events:       total={} without_self_coincidences={}", self.n_events, self.n_filtered);
        for warning in &self.warnings {
            info!("  Warning:      {}", warning);
        }
        for (exponent, count) in self.curve() {
            info!("  10^{:<5.1}ns   {}", exponent, count);
        }
    }
}

impl fmt::Display for CoincidenceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CoincidenceReport(group={}, stations={}, events={}, filtered={}, windows={})",
            self.group_name,
            self.n_stations,
            self.n_events,
            self.n_filtered,
            self.windows.len()
        )
    }
}

// ============================================================================
// Analysis
// ============================================================================

pub struct CoincidenceAnalysis {
    merger: EventStreamMerger,
    ramp: WindowRamp,
    config: AnalysisConfig,
}

impl CoincidenceAnalysis {
    pub fn new(ramp: WindowRamp, merger_config: MergerConfig, config: AnalysisConfig) -> Self {
        Self {
            merger: EventStreamMerger::new(merger_config),
            ramp,
            config,
        }
    }

    pub fn from_config(manager: &ConfigManager) -> Result<Self, CoincidenceError> {
        let ramp = WindowRamp::from_config(&manager.window_ramp())?;
        Ok(Self::new(ramp, manager.merger(), manager.analysis()))
    }

    pub fn ramp(&self) -> &WindowRamp {
        &self.ramp
    }

    /// Merge the group, compute its gaps once and sweep every window
    pub fn run(&self, group: &StationGroup) -> Result<CoincidenceReport, CoincidenceError> {
        let span = info_span!("coincidence_analysis", group = %group.name);
        let _enter = span.enter();

        let merged = self.merger.merge_tables(&group.tables);
        let counter = CoincidenceCounter::from_stream(merged.events());
        let counts = counter.sweep(self.ramp.windows())?;
        let stats = merged.stats();

        info!(
            n_events = stats.n_events,
            n_filtered = stats.n_filtered,
            n_windows = counts.len(),
            "Coincidence sweep complete"
        );

        Ok(CoincidenceReport {
            group_name: group.name.clone(),
            n_stations: stats.n_stations,
            n_events: stats.n_events,
            n_filtered: stats.n_filtered,
            windows: self.ramp.windows().to_vec(),
            counts,
            warnings: stats.warnings.clone(),
        })
    }

    /// Run every group (e.g. every cluster) that qualifies
    pub fn run_each(&self, station_groups: &[StationGroup]) -> Result<Vec<CoincidenceReport>, CoincidenceError> {
        let mut reports = Vec::new();
        for group in station_groups {
            if let Some(report) = self.run_if_qualified(group)? {
                reports.push(report);
            }
        }
        Ok(reports)
    }

    /// `run_each` with groups analysed on the rayon pool; report order follows input order
    #[cfg(feature = "parallel")]
    pub fn run_each_parallel(&self, station_groups: &[StationGroup]) -> Result<Vec<CoincidenceReport>, CoincidenceError> {
        use rayon::prelude::*;

        let results: Vec<Option<CoincidenceReport>> = station_groups
            .par_iter()
            .map(|group| self.run_if_qualified(group))
            .collect::<Result<_, _>>()?;
        Ok(results.into_iter().flatten().collect())
    }

    /// Coincidence groups of a station group at a single window
    pub fn groups_at(&self, group: &StationGroup, window: f64) -> Result<Vec<CoincidenceGroup>, CoincidenceError> {
        let merged = self.merger.merge_tables(&group.tables);
        Ok(groups(merged.events(), window)?)
    }

    fn run_if_qualified(&self, group: &StationGroup) -> Result<Option<CoincidenceReport>, CoincidenceError> {
        let active = group.n_active_stations();
        if active < self.config.min_stations {
            info!(group = %group.name, active_stations = active, "Skipping group, too few stations with data");
            return Ok(None);
        }

        let report = self.run(group)?;
        if self.config.skip_empty && !report.has_coincidences() {
            warn!(group = %group.name, "No coincidences at any window, report dropped");
            return Ok(None);
        }
        Ok(Some(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer1::station_table::StationEventTable;
    use crate::layer3::counter::InvalidWindowError;

    fn analysis(windows: Vec<f64>, config: AnalysisConfig) -> CoincidenceAnalysis {
        CoincidenceAnalysis::new(WindowRamp::from_windows(windows).unwrap(), MergerConfig::default(), config)
    }

    fn cluster(name: &str, tables: &[(u32, Vec<i64>)]) -> StationGroup {
        StationGroup::new(
            name,
            tables
                .iter()
                .map(|(id, ts)| StationEventTable::new(*id, ts.clone()))
                .collect(),
        )
    }

    #[test]
    fn test_run_reports_counts_and_totals() {
        let analysis = analysis(vec![10.0, 60.0, 1_000.0], AnalysisConfig::default());
        let group = cluster("Science Park", &[(501, vec![0, 100, 300]), (502, vec![50, 90]), (503, vec![1000])]);

        let report = analysis.run(&group).unwrap();
        assert_eq!(report.n_stations, 3);
        assert_eq!(report.n_events, 6);
        assert_eq!(report.n_filtered, 4);
        assert_eq!(report.counts, vec![0, 2, 3]);
        assert_eq!(report.total_coincidences(), 5);
        assert!(report.has_coincidences());
    }

    #[test]
    fn test_run_each_skips_small_and_empty_groups() {
        let analysis = analysis(vec![10.0, 100.0], AnalysisConfig::default());
        let groups = vec![
            cluster("Single", &[(501, vec![0, 5])]),
            cluster("Quiet", &[(501, vec![0]), (502, vec![1_000_000])]),
            cluster("Busy", &[(501, vec![0, 200]), (502, vec![5, 250])]),
            cluster("Idle station", &[(501, vec![0]), (502, vec![])]),
        ];

        let reports = analysis.run_each(&groups).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].group_name, "Busy");
        assert_eq!(reports[0].counts, vec![1, 2]);
    }

    #[test]
    fn test_run_each_keeps_empty_when_configured() {
        let config = AnalysisConfig { min_stations: 2, skip_empty: false };
        let analysis = analysis(vec![10.0], config);
        let groups = vec![cluster("Quiet", &[(501, vec![0]), (502, vec![1_000_000])])];

        let reports = analysis.run_each(&groups).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].counts, vec![0]);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_run_each_parallel_matches_run_each() {
        let analysis = analysis(vec![10.0, 100.0, 1_000.0], AnalysisConfig::default());
        let groups = vec![
            cluster("Single", &[(501, vec![0, 5])]),
            cluster("Busy", &[(501, vec![0, 200]), (502, vec![5, 250])]),
            cluster("Quiet", &[(501, vec![0]), (502, vec![1_000_000])]),
            cluster("Idle station", &[(501, vec![0]), (502, vec![])]),
            cluster("Science Park", &[(501, vec![0, 100, 300]), (502, vec![50, 90]), (503, vec![1000])]),
        ];

        let parallel = analysis.run_each_parallel(&groups).unwrap();
        assert_eq!(parallel, analysis.run_each(&groups).unwrap());

        let names: Vec<&str> = parallel.iter().map(|r| r.group_name.as_str()).collect();
        assert_eq!(names, vec!["Busy", "Science Park"]);
        assert_eq!(parallel[1].counts, vec![0, 2, 3]);
    }

    #[test]
    fn test_groups_at() {
        let analysis = analysis(vec![10.0], AnalysisConfig::default());
        let group = cluster("Pair", &[(501, vec![0, 500]), (502, vec![4, 9_000])]);

        let found = analysis.groups_at(&group, 10.0).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].station_ids(), vec![501, 502]);

        assert_eq!(
            analysis.groups_at(&group, -10.0),
            Err(CoincidenceError::InvalidWindow(InvalidWindowError::Negative(-10.0)))
        );
    }

    #[test]
    fn test_empty_group_reports_zero() {
        let analysis = analysis(vec![1.0, 10.0], AnalysisConfig::default());
        let report = analysis.run(&StationGroup::new("Nothing", vec![])).unwrap();
        assert_eq!(report.counts, vec![0, 0]);
        assert_eq!(report.warnings, vec![MergeWarning::EmptyInput]);
    }

    #[test]
    fn test_report_json() {
        let analysis = analysis(vec![100.0], AnalysisConfig::default());
        let report = analysis.run(&cluster("Pair", &[(501, vec![0]), (502, vec![10])])).unwrap();
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

        assert_eq!(json["group_name"], "Pair");
        assert_eq!(json["counts"][0], 1);
        assert_eq!(json["n_filtered"], 2);
    }

    #[test]
    fn test_from_config() {
        let manager = ConfigManager::new(None).unwrap();
        manager.set_window_ramp(crate::core::config::WindowRampConfig::default());
        let analysis = CoincidenceAnalysis::from_config(&manager).unwrap();
        assert_eq!(analysis.ramp().len(), 70);
    }
}
