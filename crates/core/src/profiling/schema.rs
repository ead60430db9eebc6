//! Per-column schema inference.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;
use utoipa::ToSchema;

use super::table::{is_missing, Table};

/// Only the first values of a column are parsed when probing its type.
const TYPE_PROBE_LIMIT: usize = 100;

/// Columns with more distinct values than this are high-cardinality.
const CARDINALITY_THRESHOLD: usize = 50;

/// Share of distinct values above which a column is treated as an identifier.
const ID_UNIQUENESS: f64 = 0.95;

const SAMPLE_SIZE: usize = 3;
const TOP_CATEGORIES: usize = 10;

const BOOLEAN_TOKENS: &[&str] = &["true", "false", "yes", "no", "y", "n", "1", "0", "t", "f"];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%m/%d/%Y", "%d-%m-%Y", "%d.%m.%Y", "%b %d, %Y",
    "%B %d, %Y", "%d %b %Y", "%d %B %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d/%m/%Y %H:%M",
];

/// Semantic type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Numeric,
    Datetime,
    Boolean,
    Id,
    Categorical,
    Text,
    Unknown,
}

/// Summary statistics for numeric columns.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct NumericSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Sample standard deviation; absent for fewer than two values.
    pub std: Option<f64>,
}

/// Value distribution for categorical columns.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CategorySummary {
    /// Most frequent values, highest count first.
    pub categories: Vec<CategoryCount>,
    /// `"high"` above 50 distinct values, otherwise `"low"`.
    pub cardinality: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CategoryCount {
    pub value: String,
    pub count: usize,
}

/// Everything inferred about one column.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ColumnProfile {
    pub name: String,
    pub inferred_type: ColumnType,
    pub null_count: usize,
    pub null_percentage: f64,
    /// Distinct non-missing values.
    pub unique_count: usize,
    pub sample_values: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numeric: Option<NumericSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categorical: Option<CategorySummary>,
}

/// Inferred schema of a whole table, columns in header order.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TableSchema {
    pub row_count: usize,
    pub column_count: usize,
    pub columns: Vec<ColumnProfile>,
}

/// Infer the schema of every column in `table`.
pub fn infer_schema(table: &Table) -> TableSchema {
    let columns = table
        .headers
        .iter()
        .enumerate()
        .map(|(idx, name)| analyze_column(name, table.column(idx), table.row_count()))
        .collect();

    TableSchema {
        row_count: table.row_count(),
        column_count: table.column_count(),
        columns,
    }
}

/// Profile a single column given its cells.
pub fn analyze_column<'a>(
    name: &str,
    cells: impl Iterator<Item = &'a str>,
    row_count: usize,
) -> ColumnProfile {
    let values: Vec<&str> = cells.filter(|c| !is_missing(c)).map(str::trim).collect();
    let null_count = row_count - values.len();
    let distinct: HashSet<&str> = values.iter().copied().collect();
    let inferred_type = infer_column_type(&values, distinct.len(), row_count);

    let numeric = (inferred_type == ColumnType::Numeric)
        .then(|| summarize_numeric(&values))
        .flatten();
    let categorical =
        (inferred_type == ColumnType::Categorical).then(|| summarize_categories(&values, distinct.len()));

    ColumnProfile {
        name: name.to_string(),
        inferred_type,
        null_count,
        null_percentage: percentage(null_count, row_count),
        unique_count: distinct.len(),
        sample_values: values.iter().take(SAMPLE_SIZE).map(|v| v.to_string()).collect(),
        numeric,
        categorical,
    }
}

/// Decide the semantic type of a column from its non-missing values.
///
/// Rules are tried in order and the first match wins.
pub fn infer_column_type(values: &[&str], unique_count: usize, row_count: usize) -> ColumnType {
    if values.is_empty() {
        return ColumnType::Unknown;
    }

    let probe = &values[..values.len().min(TYPE_PROBE_LIMIT)];
    if probe.iter().all(|v| parse_number(v).is_some()) {
        return ColumnType::Numeric;
    }
    if probe.iter().all(|v| is_datetime(v)) {
        return ColumnType::Datetime;
    }

    let lowered: HashSet<String> = values.iter().map(|v| v.to_lowercase()).collect();
    if lowered.len() <= 2 && lowered.iter().all(|v| BOOLEAN_TOKENS.contains(&v.as_str())) {
        return ColumnType::Boolean;
    }

    if row_count > 0 && unique_count as f64 / row_count as f64 > ID_UNIQUENESS {
        return ColumnType::Id;
    }

    if unique_count < CARDINALITY_THRESHOLD {
        ColumnType::Categorical
    } else {
        ColumnType::Text
    }
}

/// Parse a cell as a finite number.
pub fn parse_number(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Whether a cell parses as a date or a date-time in a common layout.
pub fn is_datetime(value: &str) -> bool {
    let value = value.trim();
    DateTime::parse_from_rfc3339(value).is_ok()
        || DATE_FORMATS
            .iter()
            .any(|f| NaiveDate::parse_from_str(value, f).is_ok())
        || DATETIME_FORMATS
            .iter()
            .any(|f| NaiveDateTime::parse_from_str(value, f).is_ok())
}

fn summarize_numeric(values: &[&str]) -> Option<NumericSummary> {
    let numbers: Vec<f64> = values.iter().filter_map(|v| parse_number(v)).collect();
    if numbers.is_empty() {
        return None;
    }

    let n = numbers.len() as f64;
    let mean = numbers.iter().sum::<f64>() / n;
    let std = (numbers.len() > 1).then(|| {
        let var = numbers.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
        var.sqrt()
    });

    Some(NumericSummary {
        min: numbers.iter().copied().fold(f64::INFINITY, f64::min),
        max: numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        mean,
        std,
    })
}

fn summarize_categories(values: &[&str], unique_count: usize) -> CategorySummary {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for v in values {
        *counts.entry(*v).or_insert(0) += 1;
    }

    // BTreeMap keyed by (-count, value) gives a stable most-frequent-first order.
    let ordered: BTreeMap<(std::cmp::Reverse<usize>, &str), ()> = counts
        .into_iter()
        .map(|(value, count)| ((std::cmp::Reverse(count), value), ()))
        .collect();

    CategorySummary {
        categories: ordered
            .into_keys()
            .take(TOP_CATEGORIES)
            .map(|(std::cmp::Reverse(count), value)| CategoryCount {
                value: value.to_string(),
                count,
            })
            .collect(),
        cardinality: if unique_count > CARDINALITY_THRESHOLD {
            "high".to_string()
        } else {
            "low".to_string()
        },
    }
}

/// `part / whole * 100`, or 0 for an empty whole.
pub(crate) fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}
