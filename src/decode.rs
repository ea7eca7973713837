use anyhow::{anyhow, bail, Context, Result};
use calamine::{open_workbook_auto, Data, Reader};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::data::{Dataset, Value};

/// Decode an uploaded file into a dataset based on its extension.
///
/// Unsupported extensions are rejected before any parse attempt; parse
/// failures carry context naming the file. Per-field coercion failures are
/// never errors, the value just stays text.
pub fn decode_path(path: &Path) -> Result<Dataset> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("csv") => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open '{}'", path.display()))?;
            decode_csv(file).with_context(|| format!("Failed to parse '{}'", path.display()))
        }
        Some("xlsx") | Some("xls") => decode_workbook(path),
        Some("json") => {
            let mut text = String::new();
            File::open(path)
                .and_then(|mut f| f.read_to_string(&mut text))
                .with_context(|| format!("Failed to open '{}'", path.display()))?;
            let json = serde_json::from_str(&text)
                .with_context(|| format!("Failed to parse '{}'", path.display()))?;
            Dataset::from_json(&json)
        }
        _ => bail!(
            "Unsupported file format '{}' (expected .csv, .xlsx, .xls or .json)",
            path.display()
        ),
    }
}

/// Decode comma-separated text: first row is the header, every later row
/// becomes a record with per-field numeric coercion. Short rows are allowed
/// and padded by the dataset.
pub fn decode_csv<R: Read>(input: R) -> Result<Dataset> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(input);

    let columns: Vec<String> = reader
        .headers()
        .context("Failed to read CSV header")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.context("Malformed CSV record")?;
        rows.push(record.iter().map(Value::coerce).collect());
    }

    Ok(Dataset::new(columns, rows))
}

/// Decode a spreadsheet workbook: first sheet only, first row is the header.
fn decode_workbook(path: &Path) -> Result<Dataset> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("Failed to open workbook '{}'", path.display()))?;

    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| anyhow!("Workbook '{}' has no sheets", path.display()))?;

    let range = workbook
        .worksheet_range(&sheet)
        .with_context(|| format!("Failed to read sheet '{}'", sheet))?;

    let mut sheet_rows = range.rows();
    let columns: Vec<String> = sheet_rows
        .next()
        .ok_or_else(|| anyhow!("Sheet '{}' is empty", sheet))?
        .iter()
        .map(|cell| cell.to_string())
        .collect();

    let rows = sheet_rows
        .map(|row| row.iter().map(cell_to_value).collect())
        .collect();

    Ok(Dataset::new(columns, rows))
}

fn cell_to_value(cell: &Data) -> Value {
    match cell {
        Data::Int(i) => Value::Number(*i as f64),
        Data::Float(f) => Value::Number(*f),
        Data::String(s) => Value::coerce(s),
        Data::Bool(b) => Value::Text(b.to_string()),
        Data::Empty => Value::empty(),
        other => Value::Text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_csv_basic() {
        let csv = "month,region,sales\n2024-01,east,100\n2024-01,west,50\n";
        let data = decode_csv(csv.as_bytes()).unwrap();
        assert_eq!(data.columns, vec!["month", "region", "sales"]);
        assert_eq!(data.rows.len(), 2);
        assert_eq!(data.rows[0][2], Value::Number(100.0));
        assert_eq!(data.rows[1][1], Value::Text("west".to_string()));
    }

    #[test]
    fn test_decode_csv_header_only() {
        let data = decode_csv("x,y\n".as_bytes()).unwrap();
        assert!(data.is_empty());
        assert_eq!(data.columns, vec!["x", "y"]);
    }

    #[test]
    fn test_decode_csv_short_row() {
        let data = decode_csv("a,b,c\n1,2\n".as_bytes()).unwrap();
        assert_eq!(data.rows[0].len(), 3);
        assert_eq!(data.rows[0][2], Value::empty());
    }

    #[test]
    fn test_decode_csv_mixed_types() {
        let data = decode_csv("x,y\n1,abc\n2,3.5\n".as_bytes()).unwrap();
        assert_eq!(data.rows[0][1], Value::Text("abc".to_string()));
        assert_eq!(data.rows[1][1], Value::Number(3.5));
    }

    #[test]
    fn test_unsupported_extension_rejected() {
        let err = decode_path(Path::new("data.txt")).unwrap_err();
        assert!(err.to_string().contains("Unsupported file format"));
    }

    #[test]
    fn test_missing_extension_rejected() {
        assert!(decode_path(Path::new("data")).is_err());
    }

    #[test]
    fn test_cell_to_value() {
        assert_eq!(cell_to_value(&Data::Int(7)), Value::Number(7.0));
        assert_eq!(cell_to_value(&Data::Float(0.25)), Value::Number(0.25));
        assert_eq!(
            cell_to_value(&Data::String("east".to_string())),
            Value::Text("east".to_string())
        );
        assert_eq!(
            cell_to_value(&Data::String("42".to_string())),
            Value::Number(42.0)
        );
        assert_eq!(cell_to_value(&Data::Empty), Value::empty());
    }
}
