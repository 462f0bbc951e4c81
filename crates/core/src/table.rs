//! Column-oriented, typed event table.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::metadata::{ColumnRoles, ColumnType, Metadata};

/// Values of one column. `None` marks a missing cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Column {
    Text(Vec<Option<String>>),
    Integer(Vec<Option<i64>>),
    Float(Vec<Option<f64>>),
    Boolean(Vec<Option<bool>>),
    Timestamp(Vec<Option<NaiveDateTime>>),
}

impl Column {
    /// An empty column of the given type with room for `capacity` rows.
    pub fn with_capacity(ty: ColumnType, capacity: usize) -> Self {
        match ty {
            ColumnType::Text => Self::Text(Vec::with_capacity(capacity)),
            ColumnType::Integer => Self::Integer(Vec::with_capacity(capacity)),
            ColumnType::Float => Self::Float(Vec::with_capacity(capacity)),
            ColumnType::Boolean => Self::Boolean(Vec::with_capacity(capacity)),
            ColumnType::Timestamp => Self::Timestamp(Vec::with_capacity(capacity)),
        }
    }

    pub fn column_type(&self) -> ColumnType {
        match self {
            Self::Text(_) => ColumnType::Text,
            Self::Integer(_) => ColumnType::Integer,
            Self::Float(_) => ColumnType::Float,
            Self::Boolean(_) => ColumnType::Boolean,
            Self::Timestamp(_) => ColumnType::Timestamp,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Text(v) => v.len(),
            Self::Integer(v) => v.len(),
            Self::Float(v) => v.len(),
            Self::Boolean(v) => v.len(),
            Self::Timestamp(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the cell at `row` is missing.
    pub fn is_null(&self, row: usize) -> bool {
        match self {
            Self::Text(v) => v[row].is_none(),
            Self::Integer(v) => v[row].is_none(),
            Self::Float(v) => v[row].is_none(),
            Self::Boolean(v) => v[row].is_none(),
            Self::Timestamp(v) => v[row].is_none(),
        }
    }

    /// Numeric view of the cell at `row`; integers widen to f64.
    pub fn numeric(&self, row: usize) -> Option<f64> {
        match self {
            Self::Integer(v) => v[row].map(|n| n as f64),
            Self::Float(v) => v[row],
            _ => None,
        }
    }
}

/// A named column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedColumn {
    pub name: String,
    pub values: Column,
}

/// Ordered collection of equally long named columns.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EventTable {
    columns: Vec<NamedColumn>,
    rows: usize,
}

impl EventTable {
    /// Builds a table, rejecting duplicate names and ragged columns.
    pub fn new(columns: Vec<NamedColumn>) -> Result<Self> {
        let rows = columns.first().map(|c| c.values.len()).unwrap_or(0);

        for (i, column) in columns.iter().enumerate() {
            if column.values.len() != rows {
                return Err(Error::schema(format!(
                    "column '{}' has {} rows, expected {}",
                    column.name,
                    column.values.len(),
                    rows
                )));
            }
            if columns[..i].iter().any(|c| c.name == column.name) {
                return Err(Error::schema(format!(
                    "duplicate column '{}'",
                    column.name
                )));
            }
        }

        Ok(Self { columns, rows })
    }

    /// Builds a table from typed rows, naming columns after `roles`.
    pub fn from_events(events: &[NavigationEvent], roles: &ColumnRoles) -> Result<Self> {
        let column = |name: &str, values: Column| NamedColumn {
            name: name.to_string(),
            values,
        };

        Self::new(vec![
            column(
                &roles.session,
                Column::Text(events.iter().map(|e| Some(e.session_id.clone())).collect()),
            ),
            column(
                &roles.group,
                Column::Text(events.iter().map(|e| Some(e.group.clone())).collect()),
            ),
            column(
                &roles.timestamp,
                Column::Timestamp(events.iter().map(|e| Some(e.timestamp)).collect()),
            ),
            column(
                &roles.action,
                Column::Text(events.iter().map(|e| Some(e.action.clone())).collect()),
            ),
            column(
                &roles.result_count,
                Column::Float(events.iter().map(|e| e.n_results).collect()),
            ),
            column(
                &roles.result_position,
                Column::Float(events.iter().map(|e| e.result_position).collect()),
            ),
        ])
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn column(&self, name: &str) -> Result<&Column> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| &c.values)
            .ok_or_else(|| Error::schema(format!("missing column '{}'", name)))
    }

    pub fn text(&self, name: &str) -> Result<&[Option<String>]> {
        match self.column(name)? {
            Column::Text(values) => Ok(values),
            other => Err(mistyped(name, ColumnType::Text, other)),
        }
    }

    pub fn float(&self, name: &str) -> Result<&[Option<f64>]> {
        match self.column(name)? {
            Column::Float(values) => Ok(values),
            other => Err(mistyped(name, ColumnType::Float, other)),
        }
    }

    pub fn timestamp(&self, name: &str) -> Result<&[Option<NaiveDateTime>]> {
        match self.column(name)? {
            Column::Timestamp(values) => Ok(values),
            other => Err(mistyped(name, ColumnType::Timestamp, other)),
        }
    }

    /// A numeric column (integer or float), checked once up front.
    pub fn numeric(&self, name: &str) -> Result<&Column> {
        let column = self.column(name)?;
        if column.column_type().is_numeric() {
            Ok(column)
        } else {
            Err(mistyped(name, ColumnType::Float, column))
        }
    }

    /// Checks the table against the metadata's column roles.
    ///
    /// Session and group identifiers must be text and present on every row.
    pub fn validate(&self, metadata: &Metadata) -> Result<()> {
        let roles = &metadata.columns;

        for (role, name) in [("session", &roles.session), ("group", &roles.group)] {
            let values = self.text(name)?;
            if let Some(row) = values.iter().position(Option::is_none) {
                return Err(Error::schema(format!(
                    "row {} has no {} identifier ('{}')",
                    row, role, name
                )));
            }
        }

        self.text(&roles.action)?;
        self.timestamp(&roles.timestamp)?;
        self.numeric(&roles.result_count)?;
        self.numeric(&roles.result_position)?;
        Ok(())
    }
}

fn mistyped(name: &str, expected: ColumnType, actual: &Column) -> Error {
    Error::schema(format!(
        "column '{}' has type {}, expected {}",
        name,
        actual.column_type(),
        expected
    ))
}

/// One navigation event as a typed row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationEvent {
    pub session_id: String,
    pub group: String,
    pub timestamp: NaiveDateTime,
    pub action: String,
    pub n_results: Option<f64>,
    pub result_position: Option<f64>,
}
