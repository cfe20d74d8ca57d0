use log::{debug, warn};

use super::model::{CellValue, CleanedTable, ColumnSpec, ColumnType, RawTable};

// ---------------------------------------------------------------------------
// Column pruning
// ---------------------------------------------------------------------------

/// Names of columns in which every cell is missing, in header order.
///
/// A table without rows reports every column.
pub fn empty_columns(table: &RawTable) -> Vec<String> {
    table
        .columns()
        .iter()
        .enumerate()
        .filter(|(idx, _)| table.rows().iter().all(|row| row[*idx].is_missing()))
        .map(|(_, name)| name.clone())
        .collect()
}

/// Remove every column in which all cells are missing. The remaining
/// columns keep their left-to-right order.
pub fn drop_empty_columns(table: RawTable) -> RawTable {
    let (columns, rows) = table.into_parts();
    let keep: Vec<bool> = (0..columns.len())
        .map(|idx| rows.iter().any(|row| !row[idx].is_missing()))
        .collect();

    if keep.iter().all(|k| *k) {
        return RawTable::new(columns, rows);
    }

    let columns: Vec<String> = columns
        .into_iter()
        .zip(&keep)
        .filter_map(|(name, k)| k.then_some(name))
        .collect();
    let rows = rows
        .into_iter()
        .map(|row| {
            row.into_iter()
                .zip(&keep)
                .filter_map(|(cell, k)| k.then_some(cell))
                .collect()
        })
        .collect();

    debug!("{} columns left after dropping empty ones", columns.len());
    RawTable::new(columns, rows)
}

// ---------------------------------------------------------------------------
// Coercion
// ---------------------------------------------------------------------------

/// Coerce one column to `ty`. Cells that cannot be represented become
/// `Missing`; this never fails. Coercing an absent column is a no-op.
pub fn coerce_column(table: RawTable, column: &str, ty: ColumnType) -> RawTable {
    let Some(idx) = table.column_index(column) else {
        warn!("cannot coerce '{column}' to {ty}: column not in upload");
        return table;
    };

    let (columns, mut rows) = table.into_parts();
    let mut degraded = 0usize;
    for row in &mut rows {
        let cell = std::mem::replace(&mut row[idx], CellValue::Missing);
        let was_missing = cell.is_missing();
        row[idx] = coerce_cell(cell, ty);
        if !was_missing && row[idx].is_missing() {
            degraded += 1;
        }
    }

    if degraded > 0 {
        debug!("'{column}': {degraded} cells could not be read as {ty}");
    }
    RawTable::new(columns, rows)
}

/// Coerce a single cell. Applying it to its own output returns the same cell.
pub fn coerce_cell(cell: CellValue, ty: ColumnType) -> CellValue {
    match ty {
        ColumnType::Numeric => to_numeric(cell),
        ColumnType::Boolean => to_boolean(cell),
        ColumnType::Categorical => to_categorical(cell),
    }
}

fn to_numeric(cell: CellValue) -> CellValue {
    let value = match cell {
        CellValue::Float(v) => Some(v),
        CellValue::Integer(i) => Some(i as f64),
        CellValue::Bool(b) => Some(if b { 1.0 } else { 0.0 }),
        CellValue::String(s) => s.trim().parse::<f64>().ok(),
        CellValue::Missing => None,
    };
    match value {
        Some(v) if !v.is_nan() => CellValue::float(v),
        _ => CellValue::Missing,
    }
}

fn to_boolean(cell: CellValue) -> CellValue {
    match cell {
        CellValue::Bool(b) => CellValue::Bool(b),
        CellValue::Integer(1) => CellValue::Bool(true),
        CellValue::Integer(0) => CellValue::Bool(false),
        CellValue::Float(v) if v == 1.0 => CellValue::Bool(true),
        CellValue::Float(v) if v == 0.0 => CellValue::Bool(false),
        CellValue::String(s) => {
            let s = s.trim();
            if s.eq_ignore_ascii_case("true") || s == "1" {
                CellValue::Bool(true)
            } else if s.eq_ignore_ascii_case("false") || s == "0" {
                CellValue::Bool(false)
            } else {
                CellValue::Missing
            }
        }
        _ => CellValue::Missing,
    }
}

fn to_categorical(cell: CellValue) -> CellValue {
    match cell {
        CellValue::Missing => CellValue::Missing,
        CellValue::String(s) => CellValue::String(s),
        other => CellValue::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Row filtering
// ---------------------------------------------------------------------------

/// Keep only rows whose critical columns all hold a non-missing value of the
/// declared type.
///
/// If a critical column is absent from the table, no row qualifies and the
/// result is empty. An empty result is not an error.
pub fn drop_incomplete_rows(table: RawTable, specs: &[ColumnSpec]) -> CleanedTable {
    let mut checks = Vec::new();
    let mut absent = Vec::new();
    for spec in specs.iter().filter(|s| s.critical) {
        match table.column_index(&spec.name) {
            Some(idx) => checks.push((idx, spec.ty)),
            None => absent.push(spec.name.as_str()),
        }
    }

    let (columns, rows) = table.into_parts();
    let before = rows.len();
    let rows: Vec<Vec<CellValue>> = if absent.is_empty() {
        rows.into_iter()
            .filter(|row| checks.iter().all(|(idx, ty)| row[*idx].conforms_to(*ty)))
            .collect()
    } else {
        warn!("critical columns missing from upload: {}", absent.join(", "));
        Vec::new()
    };

    debug!("dropped {} of {before} rows with missing critical values", before - rows.len());
    CleanedTable::new(RawTable::new(columns, rows), specs)
}

/// Per-column count of missing cells, in header order.
pub fn missing_counts(table: &CleanedTable) -> Vec<(String, usize)> {
    table
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let n = table.rows().iter().filter(|row| row[idx].is_missing()).count();
            (name.clone(), n)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{experiment_columns, text_table};

    fn cells(table: &RawTable, column: &str) -> Vec<CellValue> {
        table.column_values(column).unwrap().into_iter().cloned().collect()
    }

    #[test]
    fn drops_only_all_empty_columns() {
        let t = text_table(&["a", "empty", "b"], &[&["1", "", ""], &["", "", "x"]]);
        assert_eq!(empty_columns(&t), ["empty"]);
        let t = drop_empty_columns(t);
        assert_eq!(t.columns(), ["a", "b"]);
        assert_eq!(t.cell(1, "b"), Some(&CellValue::String("x".into())));
    }

    #[test]
    fn boolean_coercion_marks_unrecognized_missing() {
        let t = text_table(&["wm"], &[&["True"], &["False"], &["yes"], &["1"]]);
        let t = coerce_column(t, "wm", ColumnType::Boolean);
        assert_eq!(
            cells(&t, "wm"),
            [
                CellValue::Bool(true),
                CellValue::Bool(false),
                CellValue::Missing,
                CellValue::Bool(true),
            ]
        );
    }

    #[test]
    fn boolean_coercion_accepts_numbers() {
        assert_eq!(coerce_cell(CellValue::Integer(0), ColumnType::Boolean), CellValue::Bool(false));
        assert_eq!(coerce_cell(CellValue::Float(1.0), ColumnType::Boolean), CellValue::Bool(true));
        assert_eq!(coerce_cell(CellValue::Integer(2), ColumnType::Boolean), CellValue::Missing);
        assert_eq!(
            coerce_cell(CellValue::String("TRUE".into()), ColumnType::Boolean),
            CellValue::Bool(true)
        );
    }

    #[test]
    fn numeric_coercion_degrades_to_missing() {
        let num = |c| coerce_cell(c, ColumnType::Numeric);
        assert_eq!(num(CellValue::String(" 4 ".into())), CellValue::Float(4.0));
        assert_eq!(num(CellValue::String("None".into())), CellValue::Missing);
        assert_eq!(num(CellValue::Integer(3)), CellValue::Float(3.0));
        assert_eq!(num(CellValue::Bool(true)), CellValue::Float(1.0));
        assert_eq!(num(CellValue::String("NaN".into())), CellValue::Missing);
    }

    #[test]
    fn categorical_coercion_stringifies() {
        let cat = |c| coerce_cell(c, ColumnType::Categorical);
        assert_eq!(cat(CellValue::Integer(45)), CellValue::String("45".into()));
        assert_eq!(cat(CellValue::Bool(false)), CellValue::String("False".into()));
        assert_eq!(cat(CellValue::Missing), CellValue::Missing);
    }

    #[test]
    fn coercion_is_idempotent() {
        let cells = [
            CellValue::String("1".into()),
            CellValue::String("maybe".into()),
            CellValue::Integer(0),
            CellValue::Float(2.5),
            CellValue::Bool(true),
            CellValue::Missing,
        ];
        for ty in [ColumnType::Numeric, ColumnType::Boolean, ColumnType::Categorical] {
            for cell in &cells {
                let once = coerce_cell(cell.clone(), ty);
                let twice = coerce_cell(once.clone(), ty);
                assert_eq!(once, twice, "{cell:?} as {ty}");
            }
        }
    }

    #[test]
    fn coercing_absent_column_is_noop() {
        let t = text_table(&["a"], &[&["x"]]);
        assert_eq!(coerce_column(t.clone(), "missing", ColumnType::Numeric), t);
    }

    #[test]
    fn incomplete_rows_are_dropped() {
        let specs = vec![
            ColumnSpec::new("x", ColumnType::Numeric),
            ColumnSpec {
                critical: false,
                ..ColumnSpec::new("note", ColumnType::Categorical)
            },
        ];
        let t = text_table(&["x", "note"], &[&["1", ""], &["oops", "kept?"], &["2", "y"]]);
        let t = coerce_column(t, "x", ColumnType::Numeric);
        let cleaned = drop_incomplete_rows(t, &specs);
        assert_eq!(cleaned.len(), 2);
        assert_eq!(cleaned.critical_columns(), ["x"]);
        assert_eq!(missing_counts(&cleaned), [("x".to_string(), 0), ("note".to_string(), 1)]);
    }

    #[test]
    fn uncoerced_critical_column_does_not_qualify() {
        let specs = vec![ColumnSpec::new("x", ColumnType::Numeric)];
        let t = text_table(&["x"], &[&["1"]]);
        assert!(drop_incomplete_rows(t, &specs).is_empty());
    }

    #[test]
    fn absent_critical_column_empties_the_table() {
        let t = text_table(&["dimension"], &[&["2D"]]);
        let cleaned = drop_incomplete_rows(t, &experiment_columns());
        assert!(cleaned.is_empty());
        assert_eq!(cleaned.columns(), ["dimension"]);
    }
}
