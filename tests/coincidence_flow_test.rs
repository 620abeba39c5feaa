// End-to-End Flow Tests for Station Coincidences
//
// These tests exercise the full analysis path on synthetic station data:
//   Station tables (Layer 1) → EventStreamMerger (Layer 2) → counter / groups / analysis (Layer 3)
//
// Run with: cargo test --test coincidence_flow_test

use std::sync::atomic::AtomicBool;

use station_coincidences::core::{ConfigManager, MergerConfig, WindowRampConfig};
use station_coincidences::layer2::{EventStreamMerger, MergeWarning};
use station_coincidences::layer3::{
    count, deltas, groups, multiplicity_histogram, station_pairs, sweep,
    CoincidenceAnalysis, CoincidenceCounter, CoincidenceError, InvalidWindowError, WindowRamp,
};
use station_coincidences::{Event, StationEventTable, StationGroup};

// ============================================================================
// Helpers
// ============================================================================

fn station(id: u32, timestamps: &[i64]) -> Vec<Event> {
    timestamps.iter().map(|&ts| Event::new(ts, id)).collect()
}

/// Deterministic pseudo-random detection times for one station
fn synthetic_station(id: u32, n: usize, seed: u64) -> StationEventTable {
    let mut state = seed;
    let mut t: i64 = 1_375_315_200_000_000_000;
    let mut timestamps = Vec::with_capacity(n);
    for _ in 0..n {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        t += ((state >> 33) % 2_000_000_000) as i64 + 1;
        timestamps.push(t);
    }
    StationEventTable::new(id, timestamps)
}

// ============================================================================
// TEST 1 – Merge and filter
// ============================================================================

#[test]
fn test_three_station_scenario_counts() {
    let merger = EventStreamMerger::default();
    let merged = merger.merge(&[
        station(1, &[0, 100, 300]),
        station(2, &[50, 90]),
        station(3, &[1000]),
    ]);

    // 90 repeats station 2 after 50, 300 repeats station 1 after 100
    let filtered: Vec<(i64, u32)> = merged.events().iter().map(Event::sort_key).collect();
    assert_eq!(filtered, vec![(0, 1), (50, 2), (100, 1), (1000, 3)]);

    let gaps = merged.deltas();
    assert_eq!(gaps, vec![50, 50, 900]);
    // 900 is not below 60, so only the two gaps of 50 count
    assert_eq!(count(&gaps, 60.0).unwrap(), 2);
    assert_eq!(count(&gaps, 1_000.0).unwrap(), 3);
    assert_eq!(count(&gaps, 50.0).unwrap(), 0);
}

#[test]
fn test_self_coincidence_run_collapses_before_other_station() {
    let merger = EventStreamMerger::default();
    let merged = merger.merge(&[station(1, &[0, 1, 2]), station(2, &[5])]);

    assert_eq!(merged.events(), &[Event::new(0, 1), Event::new(5, 2)]);
    assert_eq!(merged.stats().self_coincidences_removed, 2);
}

#[test]
fn test_merge_is_independent_of_input_order() {
    let merger = EventStreamMerger::default();
    let a = station(501, &[0, 10, 10, 40]);
    let b = station(502, &[10, 20, 40]);
    let c = station(503, &[5, 10, 45]);

    let abc = merger.merge(&[a.clone(), b.clone(), c.clone()]);
    let cab = merger.merge(&[c, a, b]);

    assert_eq!(abc.events(), cab.events());
    assert_eq!(abc.deltas(), cab.deltas());
}

#[test]
fn test_empty_input_gives_empty_results() {
    let merger = EventStreamMerger::default();
    let merged = merger.merge(&[]);

    assert!(merged.is_empty());
    assert_eq!(merged.stats().warnings, vec![MergeWarning::EmptyInput]);
    assert_eq!(sweep(&merged.deltas(), &[1.0, 10.0]).unwrap(), vec![0, 0]);
    assert!(groups(merged.events(), 10.0).unwrap().is_empty());
}

// ============================================================================
// TEST 2 – Counting and sweeping
// ============================================================================

#[test]
fn test_gap_equal_to_window_not_counted() {
    let gaps = deltas(&[Event::new(0, 1), Event::new(40, 2), Event::new(100, 1)]);
    assert_eq!(gaps, vec![40, 60]);
    assert_eq!(count(&gaps, 40.0).unwrap(), 0);
    assert_eq!(count(&gaps, 60.0).unwrap(), 1);
    assert_eq!(count(&gaps, 60.000001).unwrap(), 2);
}

#[test]
fn test_invalid_windows_fail_fast() {
    let counter = CoincidenceCounter::new(vec![1, 2, 3]);
    assert_eq!(counter.count(-1.0), Err(InvalidWindowError::Negative(-1.0)));
    assert!(matches!(
        counter.sweep(&[1.0, 100.0, 10.0]),
        Err(InvalidWindowError::NotAscending { index: 2, .. })
    ));
}

#[test]
fn test_sweep_over_synthetic_day() {
    let tables: Vec<StationEventTable> = (0..5)
        .map(|i| synthetic_station(501 + i, 2_000, 17 + i as u64))
        .collect();
    let merged = EventStreamMerger::default().merge_tables(&tables);
    let gaps = merged.deltas();
    let ramp = WindowRamp::from_config(&WindowRampConfig::default()).unwrap();

    let counts = sweep(&gaps, ramp.windows()).unwrap();
    assert_eq!(counts.len(), ramp.len());
    assert!(counts.windows(2).all(|p| p[0] <= p[1]));
    assert_eq!(*counts.last().unwrap(), gaps.len());

    for (window, &n) in ramp.windows().iter().zip(&counts).step_by(7) {
        assert_eq!(count(&gaps, *window).unwrap(), n);
    }
}

#[test]
fn test_cancelled_sweep_returns_no_partial_result() {
    let counter = CoincidenceCounter::new(vec![5, 50, 500]);
    let cancel = AtomicBool::new(true);
    let result = counter.sweep_cancellable(&[1.0, 10.0, 100.0, 1_000.0], 2, &cancel);
    assert_eq!(result, Err(CoincidenceError::Cancelled { completed: 0, total: 4 }));
}

// ============================================================================
// TEST 3 – Groups
// ============================================================================

#[test]
fn test_groups_are_maximal() {
    let merged = EventStreamMerger::default().merge(&[
        station(1, &[0, 30, 1_000, 1_200]),
        station(2, &[10, 1_005]),
        station(3, &[20, 1_010]),
    ]);
    let events = merged.events();
    let window = 15.0;
    let found = groups(events, window).unwrap();

    let mut cursor = 0;
    for group in &found {
        let start = events[cursor..].iter().position(|e| e == &group.events[0]).unwrap() + cursor;
        let end = start + group.len();
        assert_eq!(&events[start..end], group.events.as_slice());
        assert!(group.events.windows(2).all(|p| ((p[1].timestamp - p[0].timestamp) as f64) < window));
        if start > 0 {
            assert!((events[start].timestamp - events[start - 1].timestamp) as f64 >= window);
        }
        if end < events.len() {
            assert!((events[end].timestamp - events[end - 1].timestamp) as f64 >= window);
        }
        cursor = end;
    }

    assert_eq!(found.len(), 2);
    assert_eq!(multiplicity_histogram(&found).get(&4), Some(&1));
    let pairs = station_pairs(&found);
    assert_eq!(pairs.get(&(1, 2)), Some(&1));
    assert_eq!(pairs.get(&(2, 3)), Some(&2));
}

// ============================================================================
// TEST 4 – Analysis from configuration
// ============================================================================

#[test]
fn test_analysis_per_cluster_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("coincidences.json");
    std::fs::write(
        &path,
        r#"{
            "window_ramp": {"start_exponent": 1.0, "stop_exponent": 15.0, "step": 0.5},
            "analysis": {"min_stations": 2, "skip_empty": true}
        }"#,
    )
    .unwrap();

    let mut manager = ConfigManager::new(None).unwrap();
    manager.load_from_file(path.to_str().unwrap()).unwrap();
    assert_eq!(manager.merger(), MergerConfig::default());

    let analysis = CoincidenceAnalysis::from_config(&manager).unwrap();
    assert_eq!(analysis.ramp().len(), 28);

    let clusters = vec![
        StationGroup::new(
            "Amsterdam",
            vec![synthetic_station(501, 500, 1), synthetic_station(502, 500, 2)],
        ),
        StationGroup::new("Lonely", vec![synthetic_station(1001, 500, 3)]),
    ];
    let reports = analysis.run_each(&clusters).unwrap();

    assert_eq!(reports.len(), 1);
    let report = &reports[0];
    assert_eq!(report.group_name, "Amsterdam");
    assert_eq!(report.n_events, 1_000);
    assert!(report.n_filtered <= report.n_events);
    assert!(report.counts.windows(2).all(|p| p[0] <= p[1]));
    report.print_report();
}
