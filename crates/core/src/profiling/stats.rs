use std::collections::HashSet;

use serde::Serialize;
use utoipa::ToSchema;

use super::schema::percentage;
use super::table::{is_missing, Table};

const MISSING_WEIGHT: f64 = 0.6;
const DUPLICATE_WEIGHT: f64 = 0.4;

/// Dataset-level data quality figures.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DatasetStats {
    pub row_count: usize,
    pub column_count: usize,
    pub total_cells: usize,
    pub missing_cells: usize,
    /// Rows identical to an earlier row.
    pub duplicate_rows: usize,
    pub missing_percentage: f64,
    pub duplicate_percentage: f64,
    /// Weighted score in `0..=100`.
    pub quality_score: f64,
}

impl DatasetStats {
    /// Whole-number score as stored on the job; the fraction is dropped.
    pub fn whole_score(&self) -> i64 {
        self.quality_score.trunc().clamp(0.0, 100.0) as i64
    }
}

pub fn compute_stats(table: &Table) -> DatasetStats {
    let row_count = table.row_count();
    let column_count = table.column_count();
    let total_cells = row_count * column_count;

    let missing_cells = table
        .rows
        .iter()
        .flat_map(|r| r.iter())
        .filter(|c| is_missing(c))
        .count();

    // Missing cells compare equal whatever token spells them.
    let mut seen: HashSet<Vec<Option<&str>>> = HashSet::with_capacity(row_count);
    let duplicate_rows = table
        .rows
        .iter()
        .map(|r| {
            r.iter()
                .map(|c| (!is_missing(c)).then_some(c.as_str()))
                .collect::<Vec<_>>()
        })
        .filter(|key| !seen.insert(key.clone()))
        .count();

    let missing_percentage = percentage(missing_cells, total_cells);
    let duplicate_percentage = percentage(duplicate_rows, row_count);

    DatasetStats {
        row_count,
        column_count,
        total_cells,
        missing_cells,
        duplicate_rows,
        missing_percentage,
        duplicate_percentage,
        quality_score: quality_score(missing_percentage, duplicate_percentage),
    }
}

/// `(100 - missing%) * 0.6 + (100 - duplicate%) * 0.4`
pub fn quality_score(missing_percentage: f64, duplicate_percentage: f64) -> f64 {
    let score = (100.0 - missing_percentage) * MISSING_WEIGHT
        + (100.0 - duplicate_percentage) * DUPLICATE_WEIGHT;
    score.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiling::table::parse_csv;

    #[test]
    fn clean_table_scores_full_marks() {
        let table = parse_csv("a,b\n1,x\n2,y\n3,z\n").unwrap();
        let stats = compute_stats(&table);
        assert_eq!(stats.total_cells, 6);
        assert_eq!(stats.missing_cells, 0);
        assert_eq!(stats.duplicate_rows, 0);
        assert_eq!(stats.quality_score, 100.0);
        assert_eq!(stats.whole_score(), 100);
    }

    #[test]
    fn counts_missing_cells_and_duplicates() {
        let table = parse_csv("a,b\n1,x\n1,x\n2,NA\n,y\n").unwrap();
        let stats = compute_stats(&table);
        assert_eq!(stats.missing_cells, 2);
        assert_eq!(stats.duplicate_rows, 1);
        assert_eq!(stats.missing_percentage, 25.0);
        assert_eq!(stats.duplicate_percentage, 25.0);
        assert_eq!(stats.quality_score, 75.0);
    }

    #[test]
    fn missing_tokens_are_equal_when_matching_duplicates() {
        let table = parse_csv("a,b\n1,NA\n1,\n1,null\n2,NA\n").unwrap();
        let stats = compute_stats(&table);
        assert_eq!(stats.duplicate_rows, 2);
        assert_eq!(stats.missing_cells, 4);
    }

    #[test]
    fn stored_score_drops_the_fraction() {
        // 1 missing cell out of 250: 99.6 * 0.6 + 100 * 0.4 = 99.76
        let mut csv = String::from("a,b,c,d,e\n");
        for i in 0..50 {
            let last = if i == 0 { String::new() } else { i.to_string() };
            csv.push_str(&format!("{i},{i},{i},{i},{last}\n"));
        }
        let stats = compute_stats(&parse_csv(&csv).unwrap());
        assert!((stats.quality_score - 99.76).abs() < 1e-9);
        assert_eq!(stats.whole_score(), 99);
    }

    #[test]
    fn score_weights() {
        assert_eq!(quality_score(0.0, 0.0), 100.0);
        assert_eq!(quality_score(100.0, 100.0), 0.0);
        assert!((quality_score(50.0, 0.0) - 70.0).abs() < 1e-9);
    }

    #[test]
    fn header_only_table_has_no_percentages() {
        let table = parse_csv("a,b\n").unwrap();
        let stats = compute_stats(&table);
        assert_eq!(stats.row_count, 0);
        assert_eq!(stats.missing_percentage, 0.0);
        assert_eq!(stats.duplicate_percentage, 0.0);
    }
}
