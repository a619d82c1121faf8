// src/load/mod.rs
use anyhow::{Context, Result};
use calamine::{open_workbook_auto, Data, Reader};
use chrono::{NaiveDate, NaiveDateTime};
use csv::ReaderBuilder;
use std::path::Path;
use tracing::{debug, info};

use crate::process::raw_table::Cell;

/// Read every row of `sheet` from a workbook, or every record of a csv export
/// (`sheet` is ignored for csv). No header is assumed.
#[tracing::instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
pub fn load_rows<P: AsRef<Path>>(path: P, sheet: &str) -> Result<Vec<Vec<Cell>>> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    let rows = match ext.as_str() {
        "csv" | "txt" => load_csv(path)?,
        _ => load_workbook(path, sheet)?,
    };
    info!(rows = rows.len(), "sheet loaded");
    Ok(rows)
}

/// Csv export → rows of text cells; empty fields become `Cell::Empty`.
/// Bytes that are not UTF-8 (Latin-1 exports) are replaced per field.
pub fn load_csv(path: &Path) -> Result<Vec<Vec<Cell>>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true) // preamble rows rarely have the full width
        .from_path(path)
        .with_context(|| format!("Failed to open csv file: {:?}", path))?;

    let mut rows = Vec::new();
    for (idx, result) in rdr.byte_records().enumerate() {
        let record =
            result.with_context(|| format!("CSV parse error in {:?} at record {}", path, idx))?;
        rows.push(
            record
                .iter()
                .map(|field| {
                    if field.is_empty() {
                        Cell::Empty
                    } else {
                        Cell::text(String::from_utf8_lossy(field).into_owned())
                    }
                })
                .collect(),
        );
    }
    Ok(rows)
}

/// Workbook sheet → rows, padded so that indices are absolute sheet rows and
/// columns (calamine ranges start at the first used cell).
pub fn load_workbook(path: &Path, sheet: &str) -> Result<Vec<Vec<Cell>>> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("Failed to open workbook: {:?}", path))?;
    let range = workbook
        .worksheet_range(sheet)
        .with_context(|| format!("Failed to read sheet `{}` from {:?}", sheet, path))?;

    let (row_offset, col_offset) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));
    debug!(row_offset, col_offset, "used range start");

    let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); row_offset];
    for source in range.rows() {
        let mut row = vec![Cell::Empty; col_offset];
        row.extend(source.iter().map(cell_from_data));
        rows.push(row);
    }
    Ok(rows)
}

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::text(s.as_str()),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => serial_to_datetime(dt.as_f64())
            .map(Cell::Date)
            .unwrap_or(Cell::Number(dt.as_f64())),
        Data::DateTimeIso(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })
            .map(Cell::Date)
            .unwrap_or_else(|| Cell::text(s.as_str())),
        Data::DurationIso(s) => Cell::text(s.as_str()),
        Data::Error(_) => Cell::Empty,
    }
}

/// Spreadsheet serial (days since 1899-12-30, fraction = time of day).
fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    epoch.checked_add_signed(chrono::Duration::milliseconds(millis))
}
