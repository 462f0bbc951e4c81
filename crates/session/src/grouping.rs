//! Row filtering and session grouping.

use std::collections::BTreeMap;

use analytics_core::{Column, ColumnRoles, EventTable, Result, Session};

use crate::cache::GroupFilter;

/// Groups the rows matching `filter` into sessions, ordered by session id.
///
/// The group filter is applied per row before grouping. Timestamps are
/// attached when the timestamp column holds parsed timestamps.
pub fn group_sessions(
    table: &EventTable,
    roles: &ColumnRoles,
    filter: &GroupFilter,
) -> Result<Vec<Session>> {
    let session_ids = table.text(&roles.session)?;
    let groups = table.text(&roles.group)?;
    let timestamps = match table.column(&roles.timestamp) {
        Ok(Column::Timestamp(values)) => Some(values.as_slice()),
        _ => None,
    };

    let mut sessions: BTreeMap<&str, Session> = BTreeMap::new();

    for (row, (session_id, group)) in session_ids.iter().zip(groups).enumerate() {
        // Null identifiers are rejected when the table is validated.
        let (Some(session_id), Some(group)) = (session_id.as_deref(), group.as_deref()) else {
            continue;
        };
        if !filter.matches(group) {
            continue;
        }

        let timestamp = timestamps.and_then(|ts| ts[row]);
        sessions
            .entry(session_id)
            .or_insert_with(|| Session::new(session_id, group))
            .record_event(row, timestamp);
    }

    Ok(sessions.into_values().collect())
}

/// Distinct group identifiers, sorted.
pub fn distinct_groups(table: &EventTable, roles: &ColumnRoles) -> Result<Vec<String>> {
    let mut groups: Vec<String> = table
        .text(&roles.group)?
        .iter()
        .flatten()
        .cloned()
        .collect();
    groups.sort();
    groups.dedup();
    Ok(groups)
}
