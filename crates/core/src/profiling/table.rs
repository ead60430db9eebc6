//! In-memory table representation and the CSV / Excel readers.

use std::collections::HashSet;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use chrono::{Duration, NaiveDate, Timelike};

use super::ProfileError;
use crate::upload::FileKind;

/// Cell tokens treated as missing, in addition to blank cells.
const MISSING_TOKENS: &[&str] = &[
    "NA", "N/A", "n/a", "NaN", "nan", "-nan", "null", "NULL", "None", "#N/A", "<NA>",
];

/// A rectangular table of string cells with a header row.
///
/// Every row has exactly `headers.len()` cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Build a table, padding short rows with blank cells.
    ///
    /// Rows longer than the header are an error; `first_line` is the
    /// 1-based source line of the first data row, used in the message.
    pub fn from_rows(
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
        first_line: usize,
    ) -> Result<Self, ProfileError> {
        let width = headers.len();
        let mut normalized = Vec::with_capacity(rows.len());
        for (i, mut row) in rows.into_iter().enumerate() {
            if row.len() > width {
                return Err(ProfileError::RaggedRow {
                    line: first_line + i,
                    found: row.len(),
                    expected: width,
                });
            }
            row.resize(width, String::new());
            normalized.push(row);
        }
        Ok(Self {
            headers: dedupe_headers(headers),
            rows: normalized,
        })
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Iterate over the cells of column `idx`.
    pub fn column(&self, idx: usize) -> impl Iterator<Item = &str> + '_ {
        self.rows.iter().map(move |r| r[idx].as_str())
    }

    /// Write the table as UTF-8 CSV; missing cells become empty fields.
    pub fn write_csv(&self, path: &Path) -> Result<(), ProfileError> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(|c| if is_missing(c) { "" } else { c.as_str() }))?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Whether a cell counts as a missing value.
pub fn is_missing(cell: &str) -> bool {
    let trimmed = cell.trim();
    trimmed.is_empty() || MISSING_TOKENS.contains(&trimmed)
}

/// Load a table from disk according to its kind.
pub fn load(path: &Path, kind: FileKind) -> Result<Table, ProfileError> {
    match kind {
        FileKind::Csv => {
            let bytes = std::fs::read(path)?;
            parse_csv(&decode_text(&bytes))
        }
        FileKind::Xlsx | FileKind::Xls => load_workbook(path),
    }
}

/// Decode raw bytes to text: UTF-8 (BOM stripped) when valid, otherwise
/// Windows-1252, which maps every byte.
pub fn decode_text(bytes: &[u8]) -> String {
    let (text, _, had_errors) = encoding_rs::UTF_8.decode(bytes);
    if !had_errors {
        return text.into_owned();
    }
    tracing::debug!("Input is not valid UTF-8, decoding as Windows-1252");
    let (text, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    text.into_owned()
}

/// Parse CSV text with a header row.
pub fn parse_csv(text: &str) -> Result<Table, ProfileError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        rows.push(record?.iter().map(str::to_string).collect());
    }

    let table = Table::from_rows(headers, rows, 2)?;
    if table.headers.iter().all(|h| h.trim().is_empty()) {
        return Err(ProfileError::NoColumns);
    }
    Ok(table)
}

/// Read the first worksheet of an `.xlsx` / `.xls` workbook.
fn load_workbook(path: &Path) -> Result<Table, ProfileError> {
    let mut workbook =
        open_workbook_auto(path).map_err(|e| ProfileError::Excel(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(ProfileError::NoColumns)?
        .map_err(|e| ProfileError::Excel(e.to_string()))?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header) => header.iter().map(cell_to_string).collect(),
        None => return Err(ProfileError::NoColumns),
    };
    let body: Vec<Vec<String>> = rows
        .map(|r| r.iter().map(cell_to_string).collect())
        .collect();

    Table::from_rows(headers, body, 2)
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => excel_serial_to_string(dt.as_f64()),
    }
}

/// Render an Excel serial date (days since 1899-12-30) as ISO text.
fn excel_serial_to_string(serial: f64) -> String {
    let Some(epoch) = NaiveDate::from_ymd_opt(1899, 12, 30).and_then(|d| d.and_hms_opt(0, 0, 0))
    else {
        return serial.to_string();
    };
    let millis = (serial * 86_400_000.0).round();
    let Some(at) = Duration::try_milliseconds(millis as i64)
        .filter(|_| millis.is_finite())
        .and_then(|offset| epoch.checked_add_signed(offset))
    else {
        return serial.to_string();
    };
    if at.num_seconds_from_midnight() == 0 {
        at.format("%Y-%m-%d").to_string()
    } else {
        at.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// Make header names unique by suffixing repeats with `.1`, `.2`, ...
///
/// A suffixed name never collides with a header that already exists.
fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let originals: HashSet<String> = headers.iter().cloned().collect();
    let mut taken: HashSet<String> = HashSet::with_capacity(headers.len());
    let mut deduped = Vec::with_capacity(headers.len());
    for header in headers {
        let name = if taken.contains(&header) {
            (1..)
                .map(|n| format!("{header}.{n}"))
                .find(|candidate| !taken.contains(candidate) && !originals.contains(candidate))
                .unwrap_or_default()
        } else {
            header
        };
        taken.insert(name.clone());
        deduped.push(name);
    }
    deduped
}
