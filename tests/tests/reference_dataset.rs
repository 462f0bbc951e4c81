//! Baselines for the reference navigation log.
//!
//! Skipped unless `NAVIGATION_CONFIG_PATH` names a configuration document
//! whose data import section points at the log. The snapshot test runs when
//! `NAVIGATION_SNAPSHOT_PATH` names a saved analyzer.

use std::path::Path;

use analytics_core::NavigationConfig;
use navigation_data::{load_csv, NavigationDataAnalyzer};
use session_analyzer::stats;

const TOLERANCE: f64 = 1e-5;

fn reference_analyzer() -> Option<NavigationDataAnalyzer> {
    let config_path = match std::env::var("NAVIGATION_CONFIG_PATH") {
        Ok(path) => path,
        Err(_) => {
            eprintln!("NAVIGATION_CONFIG_PATH not set, skipping reference dataset test");
            return None;
        }
    };

    let config = NavigationConfig::load(&config_path).unwrap();
    let table = load_csv(&config).unwrap();
    Some(NavigationDataAnalyzer::new(table, config.metadata).unwrap())
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() <= TOLERANCE,
        "expected {} got {}",
        expected,
        actual
    );
}

#[test]
fn test_baseline_click_through_rate() {
    let Some(analyzer) = reference_analyzer() else {
        return;
    };
    let sessions = analyzer.session_analyzer();

    assert_close(sessions.compute_click_through_rate(None).unwrap(), 0.388839);
    assert_close(sessions.compute_click_through_rate(Some("a")).unwrap(), 0.669657);
    assert_close(sessions.compute_click_through_rate(Some("b")).unwrap(), 0.174762);
}

#[test]
fn test_baseline_zero_result_rate() {
    let Some(analyzer) = reference_analyzer() else {
        return;
    };
    let sessions = analyzer.session_analyzer();

    assert_close(sessions.compute_zero_result_rate(None).unwrap(), 0.18444);
    assert_close(sessions.compute_zero_result_rate(Some("a")).unwrap(), 0.18360);
    assert_close(sessions.compute_zero_result_rate(Some("b")).unwrap(), 0.18617);
}

#[test]
fn test_baseline_session_length() {
    let Some(analyzer) = reference_analyzer() else {
        return;
    };
    let sessions = analyzer.session_analyzer();

    let a = sessions.compute_session_length(Some("a")).unwrap();
    let b = sessions.compute_session_length(Some("b")).unwrap();
    assert_close(stats::median(&a).unwrap(), 114.0);
    assert_close(stats::median(&b).unwrap(), 0.0);
}

#[test]
fn test_baseline_most_common_result() {
    let Some(analyzer) = reference_analyzer() else {
        return;
    };

    let distribution = analyzer
        .session_analyzer()
        .compute_search_frequency(None)
        .unwrap();
    assert_close(distribution.get(1.0).unwrap(), 0.668576);
    assert_eq!(distribution.most_common().unwrap().value, 1.0);
}

#[test]
fn test_saved_analyzer_can_be_loaded() {
    let Ok(path) = std::env::var("NAVIGATION_SNAPSHOT_PATH") else {
        eprintln!("NAVIGATION_SNAPSHOT_PATH not set, skipping snapshot test");
        return;
    };

    let analyzer = NavigationDataAnalyzer::load(Path::new(&path)).unwrap();
    assert!(analyzer.session_analyzer().cached_keys().len() > 1);
}
