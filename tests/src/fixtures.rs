//! Test fixtures and event generators.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use analytics_core::{
    ColumnRoles, DataImport, EventTable, Metadata, NavigationConfig, NavigationEvent,
    DEFAULT_DATE_FORMAT,
};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use navigation_data::NavigationDataAnalyzer;
use session_analyzer::SessionAnalyzer;

fn base_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2016, 3, 1)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap()
}

/// Generate a synthetic population of `n` sessions.
///
/// Session `i` (id `s{i:04}`):
/// - belongs to group `a` when `i` is even, `b` otherwise
/// - opens with a search returning zero results when `i % 4 == 0`
/// - clicks result `i % 5 + 1` after `5 * (i % 7)` seconds when `i % 3 == 0`
pub fn population(n: usize) -> Vec<NavigationEvent> {
    let mut events = Vec::new();

    for i in 0..n {
        let session_id = format!("s{:04}", i);
        let group = if i % 2 == 0 { "a" } else { "b" };
        let start = base_time() + Duration::seconds(i as i64 * 100);

        events.push(NavigationEvent {
            session_id: session_id.clone(),
            group: group.to_string(),
            timestamp: start,
            action: "searchResultPage".to_string(),
            n_results: Some(if i % 4 == 0 { 0.0 } else { 10.0 }),
            result_position: None,
        });

        if i % 3 == 0 {
            events.push(NavigationEvent {
                session_id,
                group: group.to_string(),
                timestamp: start + Duration::seconds(5 * (i % 7) as i64),
                action: "visitPage".to_string(),
                n_results: None,
                result_position: Some((i % 5 + 1) as f64),
            });
        }
    }

    events
}

/// Event table over [`population`].
pub fn table(n: usize) -> EventTable {
    EventTable::from_events(&population(n), &ColumnRoles::default()).unwrap()
}

/// Session analyzer over [`population`].
pub fn session_analyzer(n: usize) -> SessionAnalyzer {
    SessionAnalyzer::new(Arc::new(table(n)), ColumnRoles::default())
}

/// Navigation data analyzer over [`population`].
pub fn analyzer(n: usize) -> NavigationDataAnalyzer {
    NavigationDataAnalyzer::new(table(n), Metadata::navigation_defaults()).unwrap()
}

/// Write events as a CSV log in `dir`, timestamps rendered with the default
/// date format and missing values as `NA`. Columns follow the order of
/// [`EventTable::from_events`].
pub fn write_event_log(dir: &Path, file_name: &str, events: &[NavigationEvent]) -> PathBuf {
    let path = dir.join(file_name);
    let mut writer = csv::Writer::from_path(&path).unwrap();
    writer
        .write_record([
            "session_id",
            "group",
            "timestamp",
            "action",
            "n_results",
            "result_position",
        ])
        .unwrap();

    let cell = |value: Option<f64>| value.map(|v| v.to_string()).unwrap_or_else(|| "NA".to_string());
    for event in events {
        writer
            .write_record([
                event.session_id.clone(),
                event.group.clone(),
                event.timestamp.format(DEFAULT_DATE_FORMAT).to_string(),
                event.action.clone(),
                cell(event.n_results),
                cell(event.result_position),
            ])
            .unwrap();
    }
    writer.flush().unwrap();
    path
}

/// Write a configuration document pointing at `dir/file_name`.
pub fn write_config(dir: &Path, file_name: &str) -> PathBuf {
    let config = NavigationConfig {
        data_import: DataImport {
            file_path: dir.display().to_string(),
            file_name: file_name.to_string(),
        },
        metadata: Metadata::navigation_defaults(),
    };

    let path = dir.join("navigation.json");
    std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
    path
}
