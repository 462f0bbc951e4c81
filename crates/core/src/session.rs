//! Derived session type.

use chrono::{Duration, NaiveDateTime};

/// All rows sharing a session identifier, derived on demand by grouping.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// Session identifier
    pub id: String,
    /// Experiment group of the session's rows
    pub group: String,
    /// Row indices into the event table, in table order
    pub rows: Vec<usize>,
    /// Earliest event time
    pub started_at: Option<NaiveDateTime>,
    /// Latest event time
    pub last_active_at: Option<NaiveDateTime>,
}

impl Session {
    pub fn new(id: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            group: group.into(),
            rows: Vec::new(),
            started_at: None,
            last_active_at: None,
        }
    }

    /// Adds a row to the session, widening its time span.
    pub fn record_event(&mut self, row: usize, timestamp: Option<NaiveDateTime>) {
        self.rows.push(row);
        if let Some(ts) = timestamp {
            self.started_at = Some(self.started_at.map_or(ts, |s| s.min(ts)));
            self.last_active_at = Some(self.last_active_at.map_or(ts, |l| l.max(ts)));
        }
    }

    pub fn event_count(&self) -> usize {
        self.rows.len()
    }

    /// Time between first and last event. Zero when fewer than two timestamps.
    pub fn duration(&self) -> Duration {
        match (self.started_at, self.last_active_at) {
            (Some(start), Some(end)) => end - start,
            _ => Duration::zero(),
        }
    }
}
