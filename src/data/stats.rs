use serde::Serialize;

use super::model::{CleanedTable, ColumnType};
use crate::error::{PipelineError, Result, Stage};

// ---------------------------------------------------------------------------
// Descriptive statistics
// ---------------------------------------------------------------------------

/// Descriptive statistics of one numeric column.
///
/// `std` is the sample standard deviation and is `None` for fewer than two
/// values. Quartiles use linear interpolation between closest ranks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnStats {
    pub column: String,
    pub count: usize,
    pub mean: f64,
    pub std: Option<f64>,
    pub min: f64,
    #[serde(rename = "25%")]
    pub q1: f64,
    #[serde(rename = "50%")]
    pub median: f64,
    #[serde(rename = "75%")]
    pub q3: f64,
    pub max: f64,
}

/// Result of [`summarize`]: either per-column statistics or an explicit
/// no-data signal for an empty cleaned table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "columns", rename_all = "snake_case")]
pub enum Summary {
    NoData,
    Stats(Vec<ColumnStats>),
}

impl Summary {
    pub fn columns(&self) -> &[ColumnStats] {
        match self {
            Summary::NoData => &[],
            Summary::Stats(cols) => cols,
        }
    }

    pub fn get(&self, column: &str) -> Option<&ColumnStats> {
        self.columns().iter().find(|s| s.column == column)
    }
}

/// Statistics for every numeric critical column, in header order.
///
/// An empty table yields [`Summary::NoData`]. `drop_incomplete_rows` empties
/// any table missing a critical column, so the `ColumnNotFound` failure only
/// guards tables assembled some other way inside the crate.
pub fn summarize(table: &CleanedTable) -> Result<Summary> {
    if table.is_empty() {
        return Ok(Summary::NoData);
    }

    for name in table.critical_columns() {
        if !table.table().has_column(name) {
            return Err(PipelineError::column_not_found(name, Stage::Summarize));
        }
    }

    let stats = table
        .columns()
        .iter()
        .filter(|name| table.critical_columns().contains(*name))
        .filter(|name| table.column_type(name) == Some(ColumnType::Numeric))
        .filter_map(|name| {
            let values: Vec<f64> = table
                .table()
                .column_values(name)?
                .into_iter()
                .filter_map(|c| c.as_f64())
                .collect();
            describe(name, &values)
        })
        .collect();

    Ok(Summary::Stats(stats))
}

/// Describe a list of values; `None` when it is empty.
pub fn describe(column: &str, values: &[f64]) -> Option<ColumnStats> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len();
    let mean = sorted.iter().sum::<f64>() / n as f64;
    let std = (n > 1).then(|| {
        let ss: f64 = sorted.iter().map(|v| (v - mean).powi(2)).sum();
        (ss / (n - 1) as f64).sqrt()
    });

    Some(ColumnStats {
        column: column.to_string(),
        count: n,
        mean,
        std,
        min: sorted[0],
        q1: quantile(&sorted, 0.25),
        median: quantile(&sorted, 0.5),
        q3: quantile(&sorted, 0.75),
        max: sorted[n - 1],
    })
}

/// Linear-interpolation quantile of an already sorted, non-empty slice.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let pos = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            let frac = pos - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::clean::{coerce_column, drop_incomplete_rows};
    use crate::data::model::{text_table, CleanedTable, ColumnSpec};

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn describe_matches_sample_statistics() {
        let s = describe("x", &[4.0, 1.0, 3.0, 2.0]).unwrap();
        assert_eq!(s.count, 4);
        assert!(approx(s.mean, 2.5));
        assert!(approx(s.std.unwrap(), 1.2909944487358056));
        assert!(approx(s.q1, 1.75));
        assert!(approx(s.median, 2.5));
        assert!(approx(s.q3, 3.25));
        assert_eq!((s.min, s.max), (1.0, 4.0));
    }

    #[test]
    fn single_value_has_no_std() {
        let s = describe("x", &[0.53]).unwrap();
        assert_eq!(s.std, None);
        assert_eq!(s.q1, 0.53);
        assert!(describe("x", &[]).is_none());
    }

    #[test]
    fn quantile_interpolates() {
        assert!(approx(quantile(&[1.0, 2.0, 3.0], 0.25), 1.5));
        assert!(approx(quantile(&[10.0, 20.0], 0.75), 17.5));
    }

    #[test]
    fn summarize_covers_numeric_critical_columns_only() {
        let specs = vec![
            ColumnSpec::new("dimension", ColumnType::Categorical),
            ColumnSpec::new("rt", ColumnType::Numeric),
            ColumnSpec {
                critical: false,
                ..ColumnSpec::new("extra", ColumnType::Numeric)
            },
        ];
        let t = text_table(&["dimension", "rt", "extra"], &[&["2D", "1", "5"], &["3D", "3", "7"]]);
        let t = coerce_column(t, "dimension", ColumnType::Categorical);
        let t = coerce_column(t, "rt", ColumnType::Numeric);
        let t = coerce_column(t, "extra", ColumnType::Numeric);
        let summary = summarize(&drop_incomplete_rows(t, &specs)).unwrap();
        assert_eq!(summary.columns().len(), 1);
        assert!(approx(summary.get("rt").unwrap().mean, 2.0));
    }

    #[test]
    fn empty_table_reports_no_data() {
        let specs = vec![ColumnSpec::new("rt", ColumnType::Numeric)];
        let cleaned = drop_incomplete_rows(text_table(&["rt"], &[]), &specs);
        assert_eq!(summarize(&cleaned).unwrap(), Summary::NoData);
    }

    #[test]
    fn rows_without_a_critical_column_fail() {
        let specs = vec![
            ColumnSpec::new("rt", ColumnType::Numeric),
            ColumnSpec::new("angle", ColumnType::Categorical),
        ];
        let t = coerce_column(text_table(&["rt"], &[&["1"]]), "rt", ColumnType::Numeric);
        let err = summarize(&CleanedTable::new(t, &specs)).unwrap_err();
        assert_eq!(err, PipelineError::column_not_found("angle", Stage::Summarize));
    }
}
