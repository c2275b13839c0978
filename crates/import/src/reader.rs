//! File decoding: CSV and spreadsheet workbooks into a [`Grid`].
//!
//! Nothing here interprets the cells. Numbers and dates stored natively in a
//! workbook are rendered back to text the locale codec understands, so a
//! sheet behaves the same whether it arrives as `.xlsx` or `.csv`.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use cartola_core::Money;
use chrono::{Duration, NaiveDate};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::codec;
use crate::grid::{Cell, Grid, InputError, RawRow};

const CSV_EXTENSIONS: &[&str] = &["csv", "txt"];
const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Workbook error: {0}")]
    Workbook(#[from] calamine::Error),
    #[error("Workbook has no sheets")]
    NoSheets,
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),
    #[error(transparent)]
    Input(#[from] InputError),
}

/// Reads the first sheet of a workbook, or a whole CSV file, picking the
/// decoder from the file extension.
pub fn read_grid(path: &Path) -> Result<Grid, LoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let grid = if CSV_EXTENSIONS.contains(&ext.as_str()) {
        let mut raw = Vec::new();
        File::open(path)?.read_to_end(&mut raw)?;
        read_csv(raw.as_slice(), sniff_delimiter(&raw))?
    } else if WORKBOOK_EXTENSIONS.contains(&ext.as_str()) {
        read_workbook(path)?
    } else {
        return Err(LoadError::UnsupportedFormat(path.display().to_string()));
    };

    tracing::debug!(
        path = %path.display(),
        rows = grid.len(),
        width = grid.width(),
        "Read sheet"
    );
    grid.ensure_usable()?;
    Ok(grid)
}

/// Parses CSV without treating any row as a header; ragged rows are kept.
/// Fields that are not valid UTF-8 are decoded as Latin-1, which is what
/// most bank portals still export.
pub fn read_csv<R: Read>(data: R, delimiter: u8) -> Result<Grid, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(data);

    let mut rows: Vec<RawRow> = Vec::new();
    for record in reader.byte_records() {
        let record = record?;
        rows.push(record.iter().map(decode_field).collect());
    }
    Ok(Grid::new(rows))
}

/// `;` when the first line has more semicolons than commas, else `,`.
pub fn sniff_delimiter(raw: &[u8]) -> u8 {
    let first_line = raw.split(|b| *b == b'\n').next().unwrap_or_default();
    let semicolons = first_line.iter().filter(|b| **b == b';').count();
    let commas = first_line.iter().filter(|b| **b == b',').count();
    if semicolons > commas {
        b';'
    } else {
        b','
    }
}

fn decode_field(bytes: &[u8]) -> Cell {
    let text = match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    };
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

pub fn read_workbook(path: &Path) -> Result<Grid, LoadError> {
    let mut workbook = open_workbook_auto(path)?;
    let first = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(LoadError::NoSheets)?;
    let range = workbook.worksheet_range(&first)?;

    let rows = range
        .rows()
        .map(|row| row.iter().map(render_cell).collect())
        .collect();
    Ok(Grid::new(rows))
}

/// Text form of a workbook cell. Floats use the locale decimal mark and
/// integral floats drop their fraction; date cells become ISO dates.
pub fn render_cell(cell: &Data) -> Cell {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Data::Int(n) => Some(n.to_string()),
        Data::Float(f) => Some(render_float(*f)),
        Data::Bool(b) => Some(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64()).map(codec::to_iso),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(s.clone()),
    }
}

fn render_float(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        return format!("{}", f as i64);
    }
    match Decimal::from_f64(f) {
        Some(d) => codec::format_amount(Money::new(d)),
        None => f.to_string(),
    }
}

/// Excel day serial to date. The epoch is 1899-12-30, which absorbs the
/// 1900 leap-year bug for every date after February 1900.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() {
        return None;
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_signed(Duration::try_days(serial.floor() as i64)?)
}
