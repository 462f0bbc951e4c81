//! Per-session reductions and their aggregates.
//!
//! Every function receives the sessions already filtered and grouped, and
//! expects at least one session. Empty scopes are rejected by the caller.

use analytics_core::{ColumnRoles, EventTable, Result, Session};

use crate::cache::FrequencyDistribution;

/// Fraction of sessions with at least one click.
pub fn click_through_rate(
    table: &EventTable,
    roles: &ColumnRoles,
    sessions: &[Session],
) -> Result<f64> {
    let actions = table.text(&roles.action)?;

    let clicked = sessions
        .iter()
        .filter(|session| {
            session
                .rows
                .iter()
                .any(|&row| actions[row].as_deref() == Some(roles.click_action.as_str()))
        })
        .count();

    Ok(clicked as f64 / sessions.len() as f64)
}

/// Fraction of sessions where a search returned the zero-results sentinel.
pub fn zero_result_rate(
    table: &EventTable,
    roles: &ColumnRoles,
    sessions: &[Session],
) -> Result<f64> {
    let actions = table.text(&roles.action)?;
    let counts = table.numeric(&roles.result_count)?;

    let is_search = |row: usize| match &roles.search_action {
        Some(search) => actions[row].as_deref() == Some(search.as_str()),
        None => !counts.is_null(row),
    };

    let zero_sessions = sessions
        .iter()
        .filter(|session| {
            session.rows.iter().any(|&row| {
                is_search(row) && counts.numeric(row) == Some(roles.zero_result_value)
            })
        })
        .count();

    Ok(zero_sessions as f64 / sessions.len() as f64)
}

/// Seconds between the first and last event of each session.
pub fn session_lengths(
    table: &EventTable,
    roles: &ColumnRoles,
    sessions: &[Session],
) -> Result<Vec<f64>> {
    // Durations come from the grouped timestamps; this only enforces the schema.
    table.timestamp(&roles.timestamp)?;

    Ok(sessions
        .iter()
        .map(|session| session.duration().num_milliseconds() as f64 / 1000.0)
        .collect())
}

/// Distribution of result positions over click events.
///
/// Sessions without a positioned click contribute nothing. `None` when no
/// session in scope has one.
pub fn search_frequency(
    table: &EventTable,
    roles: &ColumnRoles,
    sessions: &[Session],
) -> Result<Option<FrequencyDistribution>> {
    let actions = table.text(&roles.action)?;
    let positions = table.numeric(&roles.result_position)?;

    let clicked_positions = |session: &Session| -> Vec<f64> {
        session
            .rows
            .iter()
            .filter(|&&row| actions[row].as_deref() == Some(roles.click_action.as_str()))
            .filter_map(|&row| positions.numeric(row))
            .filter(|p| !p.is_nan())
            .collect()
    };

    let values: Vec<f64> = sessions.iter().flat_map(clicked_positions).collect();
    Ok(FrequencyDistribution::from_values(values))
}
