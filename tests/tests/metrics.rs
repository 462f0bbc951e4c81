//! KPI computation and caching over a synthetic population.
//!
//! With 12 sessions: clicks in s0000, s0003, s0006, s0009; zero-result
//! searches in s0000, s0004, s0008.

use analytics_core::limits::FREQUENCY_SUM_TOLERANCE;
use integration_tests::fixtures;
use session_analyzer::{KpiKey, Metric};

#[test]
fn test_rates_by_group() {
    let analyzer = fixtures::session_analyzer(12);

    let ctr = analyzer.compute_click_through_rate(None).unwrap();
    assert!((ctr - 1.0 / 3.0).abs() < 1e-12);
    assert!((analyzer.compute_click_through_rate(Some("a")).unwrap() - 1.0 / 3.0).abs() < 1e-12);

    assert_eq!(analyzer.compute_zero_result_rate(None).unwrap(), 0.25);
    assert_eq!(analyzer.compute_zero_result_rate(Some("a")).unwrap(), 0.5);
    assert_eq!(analyzer.compute_zero_result_rate(Some("b")).unwrap(), 0.0);
}

#[test]
fn test_rates_stay_in_unit_interval() {
    let analyzer = fixtures::session_analyzer(200);

    for group in [None, Some("a"), Some("b")] {
        let ctr = analyzer.compute_click_through_rate(group).unwrap();
        let zrr = analyzer.compute_zero_result_rate(group).unwrap();
        assert!((0.0..=1.0).contains(&ctr), "ctr {} for {:?}", ctr, group);
        assert!((0.0..=1.0).contains(&zrr), "zrr {} for {:?}", zrr, group);
    }
}

#[test]
fn test_session_lengths_ordered_by_session_id() {
    let analyzer = fixtures::session_analyzer(12);

    assert_eq!(
        analyzer.compute_session_length(Some("b")).unwrap(),
        vec![0.0, 15.0, 0.0, 0.0, 10.0, 0.0]
    );
    assert_eq!(analyzer.compute_session_length(None).unwrap().len(), 12);
}

#[test]
fn test_search_frequency_sums_to_one() {
    let analyzer = fixtures::session_analyzer(500);

    for group in [None, Some("a"), Some("b")] {
        let distribution = analyzer.compute_search_frequency(group).unwrap();
        assert!((distribution.total() - 1.0).abs() < FREQUENCY_SUM_TOLERANCE);
        assert!(distribution.buckets().iter().all(|b| (1.0..=5.0).contains(&b.value)));
    }
}

#[test]
fn test_repeated_request_served_from_cache() {
    let analyzer = fixtures::session_analyzer(50);

    let first = analyzer.compute_zero_result_rate(Some("a")).unwrap();
    let passes = analyzer.metrics().grouping_passes;
    for _ in 0..3 {
        let again = analyzer.compute_zero_result_rate(Some("a")).unwrap();
        assert_eq!(again.to_bits(), first.to_bits());
    }

    let metrics = analyzer.metrics();
    assert_eq!(metrics.grouping_passes, passes);
    assert_eq!(metrics.cache_hits, 3);
}

#[test]
fn test_concurrent_requests_compute_once() {
    let analyzer = fixtures::session_analyzer(100);

    let rates: Vec<f64> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| s.spawn(|| analyzer.compute_click_through_rate(Some("b")).unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(rates.windows(2).all(|w| w[0].to_bits() == w[1].to_bits()));
    let metrics = analyzer.metrics();
    assert_eq!(metrics.grouping_passes, 1);
    assert_eq!(metrics.cache_misses, 1);
    assert_eq!(metrics.cache_hits, 7);
}

#[test]
fn test_unknown_group_is_empty_scope() {
    let analyzer = fixtures::session_analyzer(12);

    let err = analyzer.compute_session_length(Some("c")).unwrap_err();
    assert!(err.is_empty_scope());
    assert_eq!(err.error_code(), Some("SCOPE_001"));
    assert!(analyzer.cached(&KpiKey::new(Metric::SessionLength, Some("c"))).is_none());
}

#[test]
fn test_compute_all_covers_every_group() {
    let analyzer = fixtures::session_analyzer(12);

    assert_eq!(analyzer.compute_all().unwrap(), 12);
    for group in [None, Some("a"), Some("b")] {
        for metric in Metric::ALL {
            assert!(analyzer.cached(&KpiKey::new(metric, group)).is_some());
        }
    }
}
