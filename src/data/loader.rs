use std::path::Path;

use anyhow::{Context, bail};
use log::debug;

use super::model::{CellValue, RawTable};
use crate::error::{PipelineError, Result};

/// Tokens read as a missing cell, on top of the empty string.
const NA_TOKENS: &[&str] = &[
    "NA", "N/A", "n/a", "NaN", "nan", "-nan", "NULL", "null", "None", "<NA>", "#N/A",
];

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Parse the raw bytes of an uploaded comma-separated file.
///
/// The first record is the header; blank header names become `Unnamed: N`
/// after their position. Empty input yields an empty table with no columns.
/// Fails when the bytes are not UTF-8, a header name repeats, or
/// a row's field count differs from the header's.
pub fn load(bytes: &[u8]) -> Result<RawTable> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| PipelineError::parse(format!("upload is not valid UTF-8: {e}")))?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b',')
        .has_headers(true)
        .flexible(false)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(idx, h)| match h.trim() {
            "" => format!("Unnamed: {idx}"),
            name => name.to_string(),
        })
        .collect();

    for (i, name) in headers.iter().enumerate() {
        if headers[..i].contains(name) {
            return Err(PipelineError::parse(format!("duplicate column '{name}' in header")));
        }
    }

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        rows.push(record.iter().map(guess_cell_type).collect());
    }

    debug!("loaded {} rows x {} columns", rows.len(), headers.len());
    Ok(RawTable::new(headers, rows))
}

/// Read a file from disk and [`load`] it.
pub fn load_file(path: &Path) -> anyhow::Result<RawTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" | "txt" | "" => {}
        other => bail!("Unsupported file extension: .{other}"),
    }

    let bytes = std::fs::read(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let table = load(&bytes).with_context(|| format!("parsing {}", path.display()))?;
    Ok(table)
}

// ---------------------------------------------------------------------------
// Cell typing
// ---------------------------------------------------------------------------

fn guess_cell_type(raw: &str) -> CellValue {
    let s = raw.trim();
    if s.is_empty() || NA_TOKENS.contains(&s) {
        return CellValue::Missing;
    }
    if let Ok(i) = s.parse::<i64>() {
        return CellValue::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        if f.is_nan() {
            return CellValue::Missing;
        }
        return CellValue::float(f);
    }
    if s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("false") {
        return CellValue::Bool(s.eq_ignore_ascii_case("true"));
    }
    CellValue::String(s.to_string())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn infers_cell_types() {
        let t = load(b"dimension,angle,wm,key_resp.rt,vivid_response\n2D,0,True,0.53,None\n")
            .unwrap();
        assert_eq!(t.columns(), ["dimension", "angle", "wm", "key_resp.rt", "vivid_response"]);
        assert_eq!(
            t.rows()[0],
            vec![
                CellValue::String("2D".into()),
                CellValue::Integer(0),
                CellValue::Bool(true),
                CellValue::Float(0.53),
                CellValue::Missing,
            ]
        );
    }

    #[test]
    fn empty_upload_is_an_empty_table() {
        let t = load(b"").unwrap();
        assert!(t.is_empty());
        assert!(t.columns().is_empty());
    }

    #[test]
    fn header_only_has_columns_but_no_rows() {
        let t = load(b"a,b\n").unwrap();
        assert_eq!(t.columns().len(), 2);
        assert!(t.is_empty());
    }

    #[test]
    fn ragged_rows_fail() {
        let err = load(b"a,b\n1,2\n3\n").unwrap_err();
        assert!(matches!(err, PipelineError::Parse { .. }), "{err}");
    }

    #[test]
    fn invalid_utf8_fails() {
        let err = load(&[b'a', b'\n', 0xff, 0xfe, b'\n']).unwrap_err();
        assert!(matches!(err, PipelineError::Parse { .. }));
    }

    #[test]
    fn duplicate_header_fails() {
        let err = load(b"a,a\n1,2\n").unwrap_err();
        assert!(err.to_string().contains("duplicate column 'a'"));
    }

    #[test]
    fn blank_header_names_are_positional() {
        let t = load(b"a,,\n1,,\n").unwrap();
        assert_eq!(t.columns(), ["a", "Unnamed: 1", "Unnamed: 2"]);
        assert_eq!(t.cell(0, "Unnamed: 2"), Some(&CellValue::Missing));
    }

    #[test]
    fn quoted_fields_keep_commas() {
        let t = load(b"note,n\n\"a, b\",1\n").unwrap();
        assert_eq!(t.cell(0, "note"), Some(&CellValue::String("a, b".into())));
    }

    #[test]
    fn load_file_reads_csv_from_disk() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "dimension,angle\n3D,45").unwrap();
        let t = load_file(file.path()).unwrap();
        assert_eq!(t.cell(0, "angle"), Some(&CellValue::Integer(45)));
    }

    #[test]
    fn load_file_rejects_other_extensions() {
        let file = tempfile::Builder::new().suffix(".xlsx").tempfile().unwrap();
        assert!(load_file(file.path()).is_err());
    }
}
