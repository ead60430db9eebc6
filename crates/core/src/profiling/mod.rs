//! Table profiling pipeline.
//!
//! [`profile_file`] loads an uploaded CSV or Excel file, infers a schema for
//! every column and computes dataset quality figures. The result can be
//! persisted next to the upload with [`ProfileOutcome::write_artifacts`] and
//! read back later by the results endpoint.

pub mod schema;
pub mod stats;
pub mod table;

use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};
use utoipa::ToSchema;

pub use schema::{ColumnProfile, ColumnType, TableSchema};
pub use stats::DatasetStats;
pub use table::Table;

use crate::upload::FileKind;

/// Normalised copy of the uploaded table.
pub const CLEANED_DATA_FILE: &str = "cleaned_data.csv";
/// One line per pipeline step.
pub const PROCESSING_LOG_FILE: &str = "cleaning_log.txt";
/// Serialised [`Profile`].
pub const PROFILE_FILE: &str = "profile.json";

/// Files produced by the pipeline, in the order they are written.
pub const ARTIFACT_FILES: &[&str] = &[CLEANED_DATA_FILE, PROCESSING_LOG_FILE, PROFILE_FILE];

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to read workbook: {0}")]
    Excel(String),

    #[error("Failed to encode profile: {0}")]
    Json(#[from] serde_json::Error),

    #[error("File is empty")]
    Empty,

    #[error("No columns found")]
    NoColumns,

    #[error("Too many rows: {rows} (maximum {max})")]
    TooManyRows { rows: usize, max: usize },

    #[error("Row on line {line} has {found} fields, expected {expected}")]
    RaggedRow {
        line: usize,
        found: usize,
        expected: usize,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct ProfileOptions {
    /// Upper bound on data rows (header excluded).
    pub max_rows: usize,
}

impl Default for ProfileOptions {
    fn default() -> Self {
        Self { max_rows: 10_000 }
    }
}

/// Schema and quality figures of a table, as stored in `profile.json`.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Profile {
    pub schema: TableSchema,
    pub stats: DatasetStats,
}

/// Everything produced by one pipeline run.
#[derive(Debug, Clone)]
pub struct ProfileOutcome {
    pub table: Table,
    pub profile: Profile,
    /// Human-readable step log.
    pub log: Vec<String>,
}

impl ProfileOutcome {
    pub fn quality_score(&self) -> i64 {
        self.profile.stats.whole_score()
    }

    /// Write the normalised CSV, the step log and the profile into `dir`.
    pub fn write_artifacts(&self, dir: &Path) -> Result<(), ProfileError> {
        self.table.write_csv(&dir.join(CLEANED_DATA_FILE))?;

        let mut log = self.log.join("\n");
        log.push('\n');
        std::fs::write(dir.join(PROCESSING_LOG_FILE), log)?;

        let json = serde_json::to_vec_pretty(&self.profile)?;
        std::fs::write(dir.join(PROFILE_FILE), json)?;

        tracing::debug!(dir = %dir.display(), "Profile artifacts written");
        Ok(())
    }
}

/// Run the full pipeline on the file at `path`.
pub fn profile_file(
    path: &Path,
    kind: FileKind,
    options: &ProfileOptions,
) -> Result<ProfileOutcome, ProfileError> {
    let table = table::load(path, kind)?;
    profile_table(table, options)
}

/// Profile an already loaded table.
pub fn profile_table(table: Table, options: &ProfileOptions) -> Result<ProfileOutcome, ProfileError> {
    if table.column_count() == 0 {
        return Err(ProfileError::NoColumns);
    }
    if table.row_count() == 0 {
        return Err(ProfileError::Empty);
    }
    if table.row_count() > options.max_rows {
        return Err(ProfileError::TooManyRows {
            rows: table.row_count(),
            max: options.max_rows,
        });
    }

    let mut log = Vec::with_capacity(3);

    let loaded = format!(
        "File loaded successfully: {} rows, {} columns",
        table.row_count(),
        table.column_count()
    );
    tracing::info!(rows = table.row_count(), columns = table.column_count(), "{loaded}");
    log.push(loaded);

    let schema = schema::infer_schema(&table);
    let inferred = format!("Schema inferred: {} columns analyzed", schema.columns.len());
    tracing::info!("{inferred}");
    log.push(inferred);

    let stats = stats::compute_stats(&table);
    let profiled = format!("Data profiled: Quality score: {:.1}/100", stats.quality_score);
    tracing::info!(quality_score = stats.quality_score, "{profiled}");
    log.push(profiled);

    Ok(ProfileOutcome {
        table,
        profile: Profile { schema, stats },
        log,
    })
}

/// Read the step log written by [`ProfileOutcome::write_artifacts`].
///
/// A missing log yields an empty list.
pub fn read_processing_log(dir: &Path) -> Result<Vec<String>, ProfileError> {
    match std::fs::read_to_string(dir.join(PROCESSING_LOG_FILE)) {
        Ok(text) => Ok(text.lines().map(str::to_string).collect()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

/// Read the stored profile back as untyped JSON.
pub fn read_profile(dir: &Path) -> Result<Option<Value>, ProfileError> {
    match std::fs::read(dir.join(PROFILE_FILE)) {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// First `n` rows of a normalised CSV as JSON objects.
///
/// Numeric cells become JSON numbers and empty cells become `null`.
pub fn preview_csv(path: &Path, n: usize) -> Result<Vec<Map<String, Value>>, ProfileError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = reader.headers()?.clone();

    let mut rows = Vec::with_capacity(n);
    for record in reader.records().take(n) {
        let record = record?;
        let row = headers
            .iter()
            .zip(record.iter())
            .map(|(h, cell)| (h.to_string(), cell_to_json(cell)))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

fn cell_to_json(cell: &str) -> Value {
    if table::is_missing(cell) {
        return Value::Null;
    }
    if let Ok(i) = cell.trim().parse::<i64>() {
        return Value::from(i);
    }
    schema::parse_number(cell)
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(cell.to_string()))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const SALES: &str = "Date,Product,Sales,Region,Active\n\
        2024-01-01,A,1200,North,yes\n\
        2024-01-02,B,800,South,no\n\
        2024-01-03,A,1500,North,yes\n\
        2024-01-04,C,950,East,no\n";

    fn write(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn profiles_a_clean_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "sales.csv", SALES);

        let outcome = profile_file(&path, FileKind::Csv, &ProfileOptions::default()).unwrap();
        let types: Vec<ColumnType> = outcome
            .profile
            .schema
            .columns
            .iter()
            .map(|c| c.inferred_type)
            .collect();
        assert_eq!(
            types,
            vec![
                ColumnType::Datetime,
                ColumnType::Categorical,
                ColumnType::Numeric,
                ColumnType::Categorical,
                ColumnType::Boolean,
            ]
        );
        assert_eq!(outcome.quality_score(), 100);
        assert_eq!(
            outcome.log,
            vec![
                "File loaded successfully: 4 rows, 5 columns",
                "Schema inferred: 5 columns analyzed",
                "Data profiled: Quality score: 100.0/100",
            ]
        );
    }

    #[test]
    fn header_only_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "empty.csv", "a,b,c\n");
        let err = profile_file(&path, FileKind::Csv, &ProfileOptions::default()).unwrap_err();
        assert_matches!(err, ProfileError::Empty);
        assert_eq!(err.to_string(), "File is empty");
    }

    #[test]
    fn blank_file_has_no_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "blank.csv", "");
        let err = profile_file(&path, FileKind::Csv, &ProfileOptions::default()).unwrap_err();
        assert_matches!(err, ProfileError::NoColumns);
    }

    #[test]
    fn row_limit_is_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "big.csv", "n\n1\n2\n3\n");
        let err = profile_file(&path, FileKind::Csv, &ProfileOptions { max_rows: 2 }).unwrap_err();
        assert_matches!(err, ProfileError::TooManyRows { rows: 3, max: 2 });
    }

    #[test]
    fn corrupt_workbook_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "broken.xlsx", "PK\u{3}\u{4}not really a zip");
        let err = profile_file(&path, FileKind::Xlsx, &ProfileOptions::default()).unwrap_err();
        assert_matches!(err, ProfileError::Excel(_));
    }

    #[test]
    fn artifacts_round_trip_through_results_readers() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "sales.csv", "id,amount,note\n1,10.5,\n2,NA,ok\n");
        let outcome = profile_file(&path, FileKind::Csv, &ProfileOptions::default()).unwrap();
        outcome.write_artifacts(dir.path()).unwrap();

        for name in ARTIFACT_FILES {
            assert!(dir.path().join(name).exists(), "{name} missing");
        }
        assert_eq!(read_processing_log(dir.path()).unwrap(), outcome.log);

        let preview = preview_csv(&dir.path().join(CLEANED_DATA_FILE), 5).unwrap();
        assert_eq!(preview.len(), 2);
        assert_eq!(preview[0]["id"], Value::from(1));
        assert_eq!(preview[0]["amount"], Value::from(10.5));
        assert_eq!(preview[0]["note"], Value::Null);
        assert_eq!(preview[1]["amount"], Value::Null);
        assert_eq!(preview[1]["note"], Value::from("ok"));

        let stored = read_profile(dir.path()).unwrap().expect("profile.json");
        assert_eq!(stored["stats"]["row_count"], 2);
        assert_eq!(stored["schema"]["columns"][0]["name"], "id");
    }

    #[test]
    fn missing_log_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_processing_log(dir.path()).unwrap().is_empty());
        assert!(read_profile(dir.path()).unwrap().is_none());
    }
}
