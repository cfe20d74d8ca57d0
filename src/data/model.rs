use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

// ---------------------------------------------------------------------------
// CellValue – a single cell of an uploaded table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell. `Missing` is the missing marker: it stands for
/// both an absent cell and one that failed coercion.
///
/// Groups are keyed by `CellValue`, so it must be `Eq + Hash + Ord`. Equality
/// follows `Ord` (bitwise for floats) so that it agrees with `Hash`; build
/// floats with [`CellValue::float`] so `-0.0` and `0.0` land in one group.
#[derive(Debug, Clone)]
pub enum CellValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Missing,
}

// -- Manual Eq/Ord so we can key groups and sort legends --

impl PartialEq for CellValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use CellValue::*;
        fn discriminant(v: &CellValue) -> u8 {
            match v {
                Missing => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                String(_) => 4,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Missing, Missing) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (String(a), String(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for CellValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CellValue::String(s) => s.hash(state),
            CellValue::Integer(i) => i.hash(state),
            CellValue::Float(f) => f.to_bits().hash(state),
            CellValue::Bool(b) => b.hash(state),
            CellValue::Missing => {}
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(true) => write!(f, "True"),
            CellValue::Bool(false) => write!(f, "False"),
            CellValue::Missing => write!(f, "<missing>"),
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::String(s) => serializer.serialize_str(s),
            CellValue::Integer(i) => serializer.serialize_i64(*i),
            CellValue::Float(v) => serializer.serialize_f64(*v),
            CellValue::Bool(b) => serializer.serialize_bool(*b),
            CellValue::Missing => serializer.serialize_none(),
        }
    }
}

impl CellValue {
    /// A float cell with negative zero folded into zero.
    pub fn float(v: f64) -> Self {
        CellValue::Float(if v == 0.0 { 0.0 } else { v })
    }

    /// Numeric view of the cell, if it holds a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, CellValue::Missing)
    }

    /// Whether the cell holds a non-missing value of the given semantic type.
    pub fn conforms_to(&self, ty: ColumnType) -> bool {
        match (ty, self) {
            (ColumnType::Numeric, CellValue::Float(v)) => !v.is_nan(),
            (ColumnType::Boolean, CellValue::Bool(_)) => true,
            (ColumnType::Categorical, CellValue::String(_)) => true,
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Column declarations
// ---------------------------------------------------------------------------

/// Semantic type a column is coerced to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Categorical,
    Boolean,
    Numeric,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Categorical => write!(f, "categorical"),
            ColumnType::Boolean => write!(f, "boolean"),
            ColumnType::Numeric => write!(f, "numeric"),
        }
    }
}

/// Declares the target type of a required column and whether rows missing
/// it are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ColumnType,
    #[serde(default = "default_critical")]
    pub critical: bool,
}

fn default_critical() -> bool {
    true
}

impl ColumnSpec {
    pub fn new(name: &str, ty: ColumnType) -> Self {
        ColumnSpec {
            name: name.to_string(),
            ty,
            critical: true,
        }
    }
}

/// Column names of the mental-rotation experiment export.
pub mod columns {
    pub const DIMENSION: &str = "dimension";
    pub const ANGLE: &str = "angle";
    pub const WM: &str = "wm";
    pub const CORRECT: &str = "key_resp.corr";
    pub const VIVIDNESS: &str = "vivid_response";
    pub const STRATEGY: &str = "strategy_response";
    pub const RESPONSE_TIME: &str = "key_resp.rt";
}

/// The seven critical columns of the experiment export.
pub fn experiment_columns() -> Vec<ColumnSpec> {
    use columns::*;
    vec![
        ColumnSpec::new(DIMENSION, ColumnType::Categorical),
        ColumnSpec::new(ANGLE, ColumnType::Categorical),
        ColumnSpec::new(WM, ColumnType::Boolean),
        ColumnSpec::new(CORRECT, ColumnType::Numeric),
        ColumnSpec::new(VIVIDNESS, ColumnType::Numeric),
        ColumnSpec::new(STRATEGY, ColumnType::Numeric),
        ColumnSpec::new(RESPONSE_TIME, ColumnType::Numeric),
    ]
}

// ---------------------------------------------------------------------------
// RawTable – the uploaded file as parsed
// ---------------------------------------------------------------------------

/// Ordered rows of untyped cells under a header. Every row has exactly
/// `columns.len()` cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl RawTable {
    /// Build a table, padding short rows with `Missing` and truncating long ones.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, CellValue::Missing);
                row
            })
            .collect();
        RawTable { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Cell at `(row, column)`; `None` when the column does not exist.
    pub fn cell(&self, row: usize, column: &str) -> Option<&CellValue> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// All cells of one column, top to bottom.
    pub fn column_values(&self, name: &str) -> Option<Vec<&CellValue>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| &r[idx]).collect())
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub(crate) fn into_parts(self) -> (Vec<String>, Vec<Vec<CellValue>>) {
        (self.columns, self.rows)
    }
}

// ---------------------------------------------------------------------------
// CleanedTable – rows that passed the critical-column check
// ---------------------------------------------------------------------------

/// A table whose every row holds a non-missing, correctly-typed value in
/// each critical column. Only [`crate::data::clean::drop_incomplete_rows`]
/// constructs one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanedTable {
    table: RawTable,
    types: HashMap<String, ColumnType>,
    critical: Vec<String>,
}

impl CleanedTable {
    pub(crate) fn new(table: RawTable, specs: &[ColumnSpec]) -> Self {
        let types = specs
            .iter()
            .filter(|s| table.has_column(&s.name))
            .map(|s| (s.name.clone(), s.ty))
            .collect();
        let critical = specs
            .iter()
            .filter(|s| s.critical)
            .map(|s| s.name.clone())
            .collect();
        CleanedTable {
            table,
            types,
            critical,
        }
    }

    pub fn table(&self) -> &RawTable {
        &self.table
    }

    pub fn columns(&self) -> &[String] {
        self.table.columns()
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        self.table.rows()
    }

    /// Declared type of a column, when it was covered by a [`ColumnSpec`].
    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.types.get(name).copied()
    }

    /// Critical columns this table was validated against.
    pub fn critical_columns(&self) -> &[String] {
        &self.critical
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// Serialized as a list of `{column: value}` records in header order.
impl Serialize for CleanedTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::{SerializeMap, SerializeSeq};

        struct Record<'a>(&'a [String], &'a [CellValue]);

        impl Serialize for Record<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut map = serializer.serialize_map(Some(self.0.len()))?;
                for (name, cell) in self.0.iter().zip(self.1) {
                    map.serialize_entry(name, cell)?;
                }
                map.end()
            }
        }

        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for row in self.rows() {
            seq.serialize_element(&Record(self.columns(), row))?;
        }
        seq.end()
    }
}

/// Build a table of string cells; empty strings become `Missing`.
#[cfg(test)]
pub(crate) fn text_table(header: &[&str], rows: &[&[&str]]) -> RawTable {
    RawTable::new(
        header.iter().map(|h| h.to_string()).collect(),
        rows.iter()
            .map(|r| {
                r.iter()
                    .map(|c| {
                        if c.is_empty() {
                            CellValue::Missing
                        } else {
                            CellValue::String(c.to_string())
                        }
                    })
                    .collect()
            })
            .collect(),
    )
}
