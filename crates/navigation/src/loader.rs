//! CSV event log loading.

use std::path::Path;

use analytics_core::{
    Column, ColumnType, Error, EventTable, Metadata, NamedColumn, NavigationConfig, Result,
};
use chrono::{NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::{debug, info};

/// Loads the file named by the configuration's data import section.
pub fn load_csv(config: &NavigationConfig) -> Result<EventTable> {
    load_csv_from(&config.data_import.path(), &config.metadata)
}

/// Loads a CSV event log, typing each column from `metadata`.
///
/// Cells matching the NA sentinels are missing. The timestamp role column is
/// parsed with the configured date format whatever its declared type.
/// Columns without a declared type load as text.
pub fn load_csv_from(path: &Path, metadata: &Metadata) -> Result<EventTable> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .from_path(path)
        .map_err(|e| Error::schema(format!("cannot open {}: {}", path.display(), e)))?;

    let headers = reader
        .headers()
        .map_err(|e| Error::schema(format!("cannot read header of {}: {}", path.display(), e)))?
        .clone();

    let types: Vec<ColumnType> = headers
        .iter()
        .map(|name| {
            if name == metadata.columns.timestamp {
                ColumnType::Timestamp
            } else {
                metadata.column_type(name).unwrap_or(ColumnType::Text)
            }
        })
        .collect();
    debug!(path = %path.display(), columns = headers.len(), "Read CSV header");

    let mut columns: Vec<Column> = types
        .iter()
        .map(|&ty| Column::with_capacity(ty, 1024))
        .collect();

    let mut record = StringRecord::new();
    while reader
        .read_record(&mut record)
        .map_err(|e| Error::schema(format!("cannot read {}: {}", path.display(), e)))?
    {
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        for ((raw, column), name) in record.iter().zip(columns.iter_mut()).zip(headers.iter()) {
            push_cell(column, raw, metadata).map_err(|detail| {
                Error::schema(format!(
                    "{} line {}, column '{}': {}",
                    path.display(),
                    line,
                    name,
                    detail
                ))
            })?;
        }
    }

    let table = EventTable::new(
        headers
            .iter()
            .zip(columns)
            .map(|(name, values)| NamedColumn {
                name: name.to_string(),
                values,
            })
            .collect(),
    )?;
    table.validate(metadata)?;

    info!(path = %path.display(), rows = table.len(), "Loaded event log");
    Ok(table)
}

fn push_cell(column: &mut Column, raw: &str, metadata: &Metadata) -> std::result::Result<(), String> {
    let missing = metadata.is_na(raw);

    match column {
        Column::Text(values) => values.push((!missing).then(|| raw.to_string())),
        Column::Integer(values) => values.push(if missing { None } else { Some(parse_integer(raw)?) }),
        Column::Float(values) => values.push(if missing {
            None
        } else {
            Some(
                raw.parse::<f64>()
                    .map_err(|_| format!("'{}' is not a number", raw))?,
            )
        }),
        Column::Boolean(values) => values.push(if missing { None } else { Some(parse_bool(raw)?) }),
        Column::Timestamp(values) => values.push(if missing {
            None
        } else {
            Some(parse_timestamp(raw, &metadata.date_format)?)
        }),
    }
    Ok(())
}

fn parse_integer(raw: &str) -> std::result::Result<i64, String> {
    if let Ok(n) = raw.parse::<i64>() {
        return Ok(n);
    }
    match raw.parse::<f64>() {
        Ok(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(f as i64),
        _ => Err(format!("'{}' is not an integer", raw)),
    }
}

fn parse_bool(raw: &str) -> std::result::Result<bool, String> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "t" | "1" => Ok(true),
        "false" | "f" | "0" => Ok(false),
        _ => Err(format!("'{}' is not a boolean", raw)),
    }
}

/// Parses a timestamp cell, accepting numeric renderings such as
/// `2.0160301103842e13` of digit-only formats.
fn parse_timestamp(raw: &str, format: &str) -> std::result::Result<NaiveDateTime, String> {
    let normalized = normalize_numeric(raw);
    let text = normalized.as_deref().unwrap_or(raw);

    NaiveDateTime::parse_from_str(text, format)
        .or_else(|e| {
            NaiveDate::parse_from_str(text, format)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .ok_or(e)
        })
        .map_err(|e| format!("'{}' does not match '{}': {}", raw, format, e))
}

fn normalize_numeric(raw: &str) -> Option<String> {
    if !raw.contains(|c: char| matches!(c, '.' | 'e' | 'E')) {
        return None;
    }
    let value = raw.parse::<f64>().ok()?;
    (value.is_finite() && value >= 0.0 && value.fract() == 0.0).then(|| format!("{:.0}", value))
}
