use std::sync::Arc;

use arrow::array::{ArrayRef, BooleanArray, Float64Array, StringArray, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;

use crate::data::model::{CellValue, CleanedTable, ColumnType};
use crate::data::stats::{ColumnStats, Summary};
use crate::pipeline::ViewTable;

// ---------------------------------------------------------------------------
// Report tables → Arrow record batches
// ---------------------------------------------------------------------------

/// The cleaned table as a record batch. Numeric and boolean columns keep
/// their type; everything else is rendered as text. Missing cells are null.
pub fn cleaned_batch(table: &CleanedTable) -> Result<RecordBatch, ArrowError> {
    if table.columns().is_empty() {
        return Ok(RecordBatch::new_empty(Arc::new(Schema::empty())));
    }

    let mut fields = Vec::with_capacity(table.columns().len());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(table.columns().len());

    for (idx, name) in table.columns().iter().enumerate() {
        let cells = table.rows().iter().map(|row| &row[idx]);
        let (dtype, array): (DataType, ArrayRef) = match table.column_type(name) {
            Some(ColumnType::Numeric) => (
                DataType::Float64,
                Arc::new(Float64Array::from(cells.map(CellValue::as_f64).collect::<Vec<_>>())),
            ),
            Some(ColumnType::Boolean) => (
                DataType::Boolean,
                Arc::new(BooleanArray::from(
                    cells
                        .map(|c| match c {
                            CellValue::Bool(b) => Some(*b),
                            _ => None,
                        })
                        .collect::<Vec<_>>(),
                )),
            ),
            _ => (DataType::Utf8, Arc::new(text_array(cells))),
        };
        fields.push(Field::new(name, dtype, true));
        arrays.push(array);
    }

    RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)
}

/// One row per summarized column, laid out like a `describe()` table.
pub fn summary_batch(summary: &Summary) -> Result<RecordBatch, ArrowError> {
    let stats = summary.columns();
    let float = |f: fn(&ColumnStats) -> f64| -> ArrayRef {
        Arc::new(Float64Array::from(stats.iter().map(f).collect::<Vec<_>>()))
    };

    let schema = Schema::new(vec![
        Field::new("column", DataType::Utf8, false),
        Field::new("count", DataType::UInt64, false),
        Field::new("mean", DataType::Float64, false),
        Field::new("std", DataType::Float64, true),
        Field::new("min", DataType::Float64, false),
        Field::new("25%", DataType::Float64, false),
        Field::new("50%", DataType::Float64, false),
        Field::new("75%", DataType::Float64, false),
        Field::new("max", DataType::Float64, false),
    ]);
    let arrays: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(
            stats.iter().map(|s| s.column.clone()).collect::<Vec<_>>(),
        )),
        Arc::new(UInt64Array::from(
            stats.iter().map(|s| s.count as u64).collect::<Vec<_>>(),
        )),
        float(|s| s.mean),
        Arc::new(Float64Array::from(stats.iter().map(|s| s.std).collect::<Vec<_>>())),
        float(|s| s.min),
        float(|s| s.q1),
        float(|s| s.median),
        float(|s| s.q3),
        float(|s| s.max),
    ];
    RecordBatch::try_new(Arc::new(schema), arrays)
}

/// A view table with one key column per group key.
pub fn view_batch(view: &ViewTable) -> Result<RecordBatch, ArrowError> {
    let (keys, key_cells): (&[String], Vec<&[CellValue]>) = match view {
        ViewTable::Bar(t) => (
            t.group_keys.as_slice(),
            t.groups.iter().map(|g| g.key.as_slice()).collect(),
        ),
        ViewTable::Box(t) => (
            t.group_keys.as_slice(),
            t.groups.iter().map(|g| g.key.as_slice()).collect(),
        ),
    };

    let mut fields: Vec<Field> = Vec::new();
    let mut arrays: Vec<ArrayRef> = Vec::new();
    for (i, key) in keys.iter().enumerate() {
        fields.push(Field::new(key, DataType::Utf8, true));
        arrays.push(Arc::new(text_array(key_cells.iter().filter_map(|k| k.get(i)))));
    }

    match view {
        ViewTable::Bar(t) => {
            fields.push(Field::new("rows", DataType::UInt64, false));
            arrays.push(Arc::new(UInt64Array::from(
                t.groups.iter().map(|g| g.rows as u64).collect::<Vec<_>>(),
            )));
            fields.push(Field::new(
                format!("{}({})", t.reduction, t.value_column),
                DataType::Float64,
                true,
            ));
            arrays.push(Arc::new(Float64Array::from(
                t.groups.iter().map(|g| g.value).collect::<Vec<_>>(),
            )));
        }
        ViewTable::Box(t) => {
            let stat = |f: fn(&ColumnStats) -> f64| -> ArrayRef {
                Arc::new(Float64Array::from(
                    t.groups
                        .iter()
                        .map(|g| g.stats.as_ref().map(f))
                        .collect::<Vec<_>>(),
                ))
            };
            fields.push(Field::new("count", DataType::UInt64, false));
            arrays.push(Arc::new(UInt64Array::from(
                t.groups
                    .iter()
                    .map(|g| g.stats.as_ref().map_or(0, |s| s.count as u64))
                    .collect::<Vec<_>>(),
            )));
            let columns: [(&str, fn(&ColumnStats) -> f64); 5] = [
                ("min", |s| s.min),
                ("25%", |s| s.q1),
                ("50%", |s| s.median),
                ("75%", |s| s.q3),
                ("max", |s| s.max),
            ];
            for (name, f) in columns {
                fields.push(Field::new(name, DataType::Float64, true));
                arrays.push(stat(f));
            }
        }
    }

    RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)
}

/// Render a batch as a text grid, keeping at most `limit` rows.
pub fn pretty(batch: &RecordBatch, limit: Option<usize>) -> Result<String, ArrowError> {
    let batch = match limit {
        Some(n) if n < batch.num_rows() => batch.slice(0, n),
        _ => batch.clone(),
    };
    Ok(pretty_format_batches(&[batch])?.to_string())
}

fn text_array<'a>(cells: impl Iterator<Item = &'a CellValue>) -> StringArray {
    StringArray::from(
        cells
            .map(|c| (!c.is_missing()).then(|| c.to_string()))
            .collect::<Vec<_>>(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::pipeline::{Pipeline, ViewResult};

    const UPLOAD: &[u8] = b"\
dimension,angle,wm,key_resp.corr,vivid_response,strategy_response,key_resp.rt
2D,0,True,1,4,3,0.53
3D,45,False,0,2,5,1.25
";

    #[test]
    fn cleaned_batch_keeps_types() {
        let (cleaned, _) = Pipeline::default().clean(UPLOAD).unwrap();
        let batch = cleaned_batch(&cleaned).unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.schema().field(0).data_type(), &DataType::Utf8);
        assert_eq!(batch.schema().field(2).data_type(), &DataType::Boolean);
        assert_eq!(batch.schema().field(6).data_type(), &DataType::Float64);
    }

    #[test]
    fn empty_table_renders() {
        let (cleaned, _) = Pipeline::default().clean(b"").unwrap();
        assert_eq!(cleaned_batch(&cleaned).unwrap().num_rows(), 0);
    }

    #[test]
    fn summary_and_views_render_as_grids() {
        let report = Pipeline::new(PipelineConfig::default()).run(UPLOAD).unwrap();
        let text = pretty(&summary_batch(report.summary.as_ref().unwrap()).unwrap(), None).unwrap();
        assert!(text.contains("key_resp.rt"));
        assert!(text.contains("25%"));

        for view in &report.views {
            let ViewResult::Ready { table, .. } = view else {
                panic!("view failed: {view:?}");
            };
            let batch = view_batch(table).unwrap();
            assert_eq!(batch.num_rows(), 2);
        }
    }

    #[test]
    fn pretty_limits_rows() {
        let (cleaned, _) = Pipeline::default().clean(UPLOAD).unwrap();
        let text = pretty(&cleaned_batch(&cleaned).unwrap(), Some(1)).unwrap();
        assert!(text.contains("2D"));
        assert!(!text.contains("3D"));
    }
}
