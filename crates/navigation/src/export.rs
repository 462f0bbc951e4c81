//! Spreadsheet export of cached KPIs.

use std::path::Path;

use analytics_core::{Error, Result};
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use session_analyzer::{stats, KpiCache, KpiValue};
use tracing::info;

const RESULTS_SHEET: &str = "kpi_results";
const SERIES_SHEET: &str = "session_length";
const HEADERS: [&str; 6] = ["metric", "group", "kind", "value", "sessions", "computed_at"];

/// One line of the `kpi_results` sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRow {
    pub metric: String,
    pub group: String,
    pub kind: String,
    pub value: f64,
    pub sessions: usize,
    pub computed_at: String,
}

/// Flattens the cache into rows: one per rate, the median of each series,
/// and one per distribution bucket.
pub fn export_rows(cache: &KpiCache) -> Vec<ExportRow> {
    let mut rows = Vec::new();

    for (key, record) in cache.iter() {
        let row = |kind: String, value: f64| ExportRow {
            metric: key.metric.to_string(),
            group: key.group.to_string(),
            kind,
            value,
            sessions: record.sessions,
            computed_at: record.computed_at.to_rfc3339(),
        };

        match &record.value {
            KpiValue::Rate(rate) => rows.push(row("rate".to_string(), *rate)),
            KpiValue::Series(series) => {
                if let Some(median) = stats::median(series) {
                    rows.push(row("median".to_string(), median));
                }
            }
            KpiValue::Distribution(distribution) => {
                for bucket in distribution.buckets() {
                    rows.push(row(format!("frequency[{}]", bucket.value), bucket.frequency));
                }
            }
        }
    }

    rows
}

/// Writes every cached KPI to an xlsx workbook. Returns the rows written to
/// the results sheet.
pub fn write_workbook(cache: &KpiCache, path: &Path) -> Result<usize> {
    let rows = export_rows(cache);
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();

    {
        let sheet = workbook.add_worksheet();
        sheet.set_name(RESULTS_SHEET).map_err(xlsx)?;
        for (col, title) in HEADERS.iter().enumerate() {
            sheet
                .write_string_with_format(0, col as u16, *title, &header)
                .map_err(xlsx)?;
        }

        for (i, row) in rows.iter().enumerate() {
            let r = i as u32 + 1;
            sheet.write_string(r, 0, &row.metric).map_err(xlsx)?;
            sheet.write_string(r, 1, &row.group).map_err(xlsx)?;
            sheet.write_string(r, 2, &row.kind).map_err(xlsx)?;
            sheet.write_number(r, 3, row.value).map_err(xlsx)?;
            sheet.write_number(r, 4, row.sessions as f64).map_err(xlsx)?;
            sheet.write_string(r, 5, &row.computed_at).map_err(xlsx)?;
        }
        sheet.set_column_width(0, 22).map_err(xlsx)?;
        sheet.set_column_width(5, 34).map_err(xlsx)?;
    }

    let series: Vec<_> = cache
        .iter()
        .filter_map(|(key, record)| match &record.value {
            KpiValue::Series(values) => Some((key, values)),
            _ => None,
        })
        .collect();

    if !series.is_empty() {
        let sheet = workbook.add_worksheet();
        sheet.set_name(SERIES_SHEET).map_err(xlsx)?;
        for (col, (key, values)) in series.iter().enumerate() {
            let col = col as u16;
            sheet
                .write_string_with_format(0, col, key.group.to_string(), &header)
                .map_err(xlsx)?;
            for (i, value) in values.iter().enumerate() {
                sheet.write_number(i as u32 + 1, col, *value).map_err(xlsx)?;
            }
        }
    }

    workbook.save(path).map_err(xlsx)?;
    info!(path = %path.display(), rows = rows.len(), series = series.len(), "Exported KPI results");
    Ok(rows.len())
}

fn xlsx(e: XlsxError) -> Error {
    Error::export(e.to_string())
}
