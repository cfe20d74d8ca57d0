use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::model::{CellValue, CleanedTable};
use super::stats::{describe, quantile, ColumnStats};
use crate::error::{PipelineError, Result, Stage};

// ---------------------------------------------------------------------------
// Reductions
// ---------------------------------------------------------------------------

/// How the values of one group collapse into a single number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reduction {
    #[default]
    Mean,
    Count,
    Sum,
    Median,
    Min,
    Max,
}

impl fmt::Display for Reduction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Reduction::Mean => "mean",
            Reduction::Count => "count",
            Reduction::Sum => "sum",
            Reduction::Median => "median",
            Reduction::Min => "min",
            Reduction::Max => "max",
        };
        write!(f, "{name}")
    }
}

impl Reduction {
    /// Reduce the numeric values of a group holding `rows` rows.
    ///
    /// `Count` counts rows; the others return `None` when no value is numeric.
    pub fn apply(self, rows: usize, values: &[f64]) -> Option<f64> {
        match self {
            Reduction::Count => Some(rows as f64),
            _ if values.is_empty() => None,
            Reduction::Mean => Some(values.iter().sum::<f64>() / values.len() as f64),
            Reduction::Sum => Some(values.iter().sum()),
            Reduction::Median => {
                let mut sorted = values.to_vec();
                sorted.sort_by(f64::total_cmp);
                Some(quantile(&sorted, 0.5))
            }
            Reduction::Min => Some(values.iter().copied().fold(f64::INFINITY, f64::min)),
            Reduction::Max => Some(values.iter().copied().fold(f64::NEG_INFINITY, f64::max)),
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregate tables
// ---------------------------------------------------------------------------

/// One group of an [`AggregateTable`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    /// Values of the group keys, in key order.
    pub key: Vec<CellValue>,
    /// Rows that fell into the group.
    pub rows: usize,
    pub value: Option<f64>,
}

/// A cleaned table grouped by one or more keys with a reduction applied to
/// one value column. Groups appear in first-seen order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateTable {
    pub group_keys: Vec<String>,
    pub value_column: String,
    pub reduction: Reduction,
    pub groups: Vec<Group>,
}

impl AggregateTable {
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Look up the group whose key cells display as `key`.
    pub fn find(&self, key: &[&str]) -> Option<&Group> {
        self.groups.iter().find(|g| {
            g.key.len() == key.len() && g.key.iter().zip(key).all(|(c, k)| c.to_string() == *k)
        })
    }
}

/// Group `table` by `group_keys` and reduce `value_column` within each group.
pub fn aggregate(
    table: &CleanedTable,
    group_keys: &[&str],
    value_column: &str,
    reduction: Reduction,
) -> Result<AggregateTable> {
    let (value_idx, groups) = group_rows(table, group_keys, value_column)?;

    let groups = groups
        .into_iter()
        .map(|(key, members)| {
            let values = numeric_values(table, &members, value_idx);
            Group {
                key,
                rows: members.len(),
                value: reduction.apply(members.len(), &values),
            }
        })
        .collect();

    Ok(AggregateTable {
        group_keys: group_keys.iter().map(|k| k.to_string()).collect(),
        value_column: value_column.to_string(),
        reduction,
        groups,
    })
}

// ---------------------------------------------------------------------------
// Distribution tables (box-plot summaries)
// ---------------------------------------------------------------------------

/// Five-number summary of one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionGroup {
    pub key: Vec<CellValue>,
    pub stats: Option<ColumnStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionTable {
    pub group_keys: Vec<String>,
    pub value_column: String,
    pub groups: Vec<DistributionGroup>,
}

/// Per-group descriptive statistics of `value_column`, for box plots.
pub fn distribution(
    table: &CleanedTable,
    group_keys: &[&str],
    value_column: &str,
) -> Result<DistributionTable> {
    let (value_idx, groups) = group_rows(table, group_keys, value_column)?;

    let groups = groups
        .into_iter()
        .map(|(key, members)| {
            let values = numeric_values(table, &members, value_idx);
            DistributionGroup {
                key,
                stats: describe(value_column, &values),
            }
        })
        .collect();

    Ok(DistributionTable {
        group_keys: group_keys.iter().map(|k| k.to_string()).collect(),
        value_column: value_column.to_string(),
        groups,
    })
}

// -- helpers --

type Groups = Vec<(Vec<CellValue>, Vec<usize>)>;

/// Resolve column indices and bucket row indices by key, first-seen order.
/// Rows with a missing key cell belong to no group.
fn group_rows(
    table: &CleanedTable,
    group_keys: &[&str],
    value_column: &str,
) -> Result<(usize, Groups)> {
    let raw = table.table();
    let key_idx = group_keys
        .iter()
        .map(|k| {
            raw.column_index(k)
                .ok_or_else(|| PipelineError::column_not_found(k, Stage::Aggregate))
        })
        .collect::<Result<Vec<usize>>>()?;
    let value_idx = raw
        .column_index(value_column)
        .ok_or_else(|| PipelineError::column_not_found(value_column, Stage::Aggregate))?;

    let mut slots: HashMap<Vec<CellValue>, usize> = HashMap::new();
    let mut groups: Groups = Vec::new();
    for (row_no, row) in raw.rows().iter().enumerate() {
        if key_idx.iter().any(|i| row[*i].is_missing()) {
            continue;
        }
        let key: Vec<CellValue> = key_idx.iter().map(|i| row[*i].clone()).collect();
        let slot = *slots.entry(key.clone()).or_insert_with(|| {
            groups.push((key, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(row_no);
    }

    Ok((value_idx, groups))
}

fn numeric_values(table: &CleanedTable, members: &[usize], idx: usize) -> Vec<f64> {
    members
        .iter()
        .filter_map(|r| table.rows()[*r][idx].as_f64())
        .collect()
}
