//! CSV loading, snapshot save/load, and spreadsheet export end to end.

use analytics_core::NavigationConfig;
use integration_tests::fixtures;
use navigation_data::{load_csv, NavigationDataAnalyzer};
use session_analyzer::{KpiValue, Metric};

#[test]
fn test_csv_to_snapshot_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    fixtures::write_event_log(dir.path(), "events_log.csv", &fixtures::population(40));
    let config = NavigationConfig::load(fixtures::write_config(dir.path(), "events_log.csv")).unwrap();

    let table = load_csv(&config).unwrap();
    assert_eq!(table, fixtures::table(40));

    let analyzer = NavigationDataAnalyzer::new(table, config.metadata).unwrap();
    let entries = analyzer.session_analyzer().compute_all().unwrap();
    assert!(entries > 1);

    let snapshot = dir.path().join("analyzer.snapshot");
    analyzer.save(Some(snapshot.as_path())).unwrap();
    let loaded = NavigationDataAnalyzer::load(&snapshot).unwrap();

    let before = analyzer.session_analyzer().kpi_results();
    let after = loaded.session_analyzer().kpi_results();
    assert_eq!(after.len(), entries);
    assert_eq!(
        before.keys().collect::<Vec<_>>(),
        after.keys().collect::<Vec<_>>()
    );
    for ((_, original), (_, restored)) in before.iter().zip(after.iter()) {
        assert_eq!(original.computed_at, restored.computed_at);
        match (&original.value, &restored.value) {
            (KpiValue::Rate(a), KpiValue::Rate(b)) => assert_eq!(a.to_bits(), b.to_bits()),
            (KpiValue::Series(a), KpiValue::Series(b)) => {
                assert!(a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits()));
                assert_eq!(a.len(), b.len());
            }
            (KpiValue::Distribution(a), KpiValue::Distribution(b)) => assert_eq!(a, b),
            (a, b) => panic!("value kind changed: {} -> {}", a.kind(), b.kind()),
        }
    }
}

#[test]
fn test_loaded_analyzer_answers_from_cache() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = dir.path().join("analyzer.snapshot");

    let analyzer = fixtures::analyzer(30);
    let expected = analyzer
        .session_analyzer()
        .compute_click_through_rate(Some("a"))
        .unwrap();
    analyzer.save(Some(snapshot.as_path())).unwrap();

    let loaded = NavigationDataAnalyzer::load(&snapshot).unwrap();
    let rate = loaded
        .session_analyzer()
        .compute_click_through_rate(Some("a"))
        .unwrap();
    assert_eq!(rate.to_bits(), expected.to_bits());
    assert_eq!(loaded.session_analyzer().metrics().grouping_passes, 0);

    // Keys missing from the snapshot are still computed on demand.
    loaded
        .session_analyzer()
        .compute_search_frequency(Some("b"))
        .unwrap();
    assert_eq!(loaded.session_analyzer().metrics().grouping_passes, 1);
}

#[test]
fn test_load_missing_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let err = NavigationDataAnalyzer::load(&dir.path().join("absent.snapshot")).unwrap_err();
    assert_eq!(err.error_code(), Some("PERSIST_001"));
}

#[test]
fn test_excel_export_of_cached_results() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kpi_results.xlsx");

    let analyzer = fixtures::analyzer(24);
    let sessions = analyzer.session_analyzer();
    sessions.compute_click_through_rate(None).unwrap();
    sessions.compute_session_length(Some("a")).unwrap();
    let distribution = sessions.compute_search_frequency(None).unwrap();

    let rows = analyzer.to_excel(&path).unwrap();
    assert_eq!(rows, 2 + distribution.len());
    assert!(std::fs::metadata(&path).unwrap().len() > 0);
    assert!(sessions
        .cached_keys()
        .iter()
        .all(|k| k.metric != Metric::ZeroResultRate));
}
