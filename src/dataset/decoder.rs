//! Tabular Decoder
//!
//! Turns an uploaded CSV, spreadsheet or JSON file into ordered records.

use std::collections::HashSet;
use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use csv::{ReaderBuilder, Trim};
use serde_json::{Number, Value};
use tracing::debug;

use super::Record;
use crate::types::{AppError, AppResult};

/// Supported upload formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Csv,
    Spreadsheet,
    Json,
}

impl FileKind {
    /// Parse an explicit type hint (`csv`, `xlsx`, `xls`, `json`, or a MIME type)
    pub fn from_hint(hint: &str) -> AppResult<Self> {
        match hint.trim().to_lowercase().as_str() {
            "csv" | "text/csv" => Ok(FileKind::Csv),
            "xlsx" | "xls" | "xlsm" | "ods"
            | "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            | "application/vnd.ms-excel" => Ok(FileKind::Spreadsheet),
            "json" | "application/json" => Ok(FileKind::Json),
            other => Err(AppError::Decode(format!("Unsupported file type: {}", other))),
        }
    }

    /// Detect the kind from a file name's extension
    pub fn from_filename(filename: &str) -> AppResult<Self> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| AppError::Decode(format!("Cannot detect file type of {}", filename)))?;
        Self::from_hint(extension)
    }
}

pub trait TabularDecoder: Send + Sync {
    fn decode(&self, content: &[u8], kind: FileKind) -> AppResult<Vec<Record>>;
}

/// Decoder backed by `csv`, `calamine` and `serde_json`
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultDecoder;

impl TabularDecoder for DefaultDecoder {
    fn decode(&self, content: &[u8], kind: FileKind) -> AppResult<Vec<Record>> {
        let records = match kind {
            FileKind::Csv => decode_csv(content)?,
            FileKind::Spreadsheet => decode_spreadsheet(content)?,
            FileKind::Json => decode_json(content)?,
        };
        debug!(kind = ?kind, records = records.len(), "Decoded tabular file");
        Ok(records)
    }
}

fn decode_csv(content: &[u8]) -> AppResult<Vec<Record>> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(content);

    let headers = unique_headers(
        rdr.headers()
            .map_err(|e| AppError::Decode(format!("Invalid CSV header: {}", e)))?
            .iter()
            .enumerate()
            .map(|(idx, h)| header_name(h, idx)),
    );

    let mut records = Vec::new();
    for row in rdr.records() {
        let row = row.map_err(|e| AppError::Decode(format!("Invalid CSV row: {}", e)))?;
        let record: Record = headers
            .iter()
            .enumerate()
            .map(|(idx, header)| (header.clone(), row.get(idx).map(parse_cell).unwrap_or(Value::Null)))
            .collect();
        records.push(record);
    }
    Ok(records)
}

fn decode_spreadsheet(content: &[u8]) -> AppResult<Vec<Record>> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(content.to_vec()))
        .map_err(|e| AppError::Decode(format!("Unreadable spreadsheet: {}", e)))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AppError::Decode("Spreadsheet has no worksheets".to_string()))?
        .map_err(|e| AppError::Decode(format!("Unreadable worksheet: {}", e)))?;

    let mut rows = range.rows();
    let headers = match rows.next() {
        Some(first) => unique_headers(
            first
                .iter()
                .enumerate()
                .map(|(idx, cell)| header_name(&cell.to_string(), idx)),
        ),
        None => return Ok(Vec::new()),
    };

    let records = rows
        .map(|row| {
            headers
                .iter()
                .enumerate()
                .map(|(idx, header)| (header.clone(), row.get(idx).map(cell_value).unwrap_or(Value::Null)))
                .collect()
        })
        .collect();
    Ok(records)
}

fn decode_json(content: &[u8]) -> AppResult<Vec<Record>> {
    let value: Value = serde_json::from_slice(content)
        .map_err(|e| AppError::Decode(format!("Invalid JSON: {}", e)))?;

    let rows = match value {
        Value::Array(rows) => rows,
        Value::Object(map) => map
            .into_iter()
            .find_map(|(_, v)| match v {
                Value::Array(rows) => Some(rows),
                _ => None,
            })
            .ok_or_else(|| AppError::Decode("JSON object holds no array of records".to_string()))?,
        _ => {
            return Err(AppError::Decode(
                "JSON must be an array of objects".to_string(),
            ))
        }
    };

    rows.into_iter()
        .enumerate()
        .map(|(idx, row)| match row {
            Value::Object(map) => Ok(map),
            _ => Err(AppError::Decode(format!("JSON element {} is not an object", idx))),
        })
        .collect()
}

fn header_name(raw: &str, idx: usize) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        format!("column_{}", idx + 1)
    } else {
        trimmed.to_string()
    }
}

/// Suffix repeated names (`a`, `a_2`, `a_3`) so no column is overwritten
fn unique_headers(names: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .map(|name| {
            let mut candidate = name.clone();
            let mut n = 2;
            while seen.contains(&candidate) {
                candidate = format!("{}_{}", name, n);
                n += 1;
            }
            seen.insert(candidate.clone());
            candidate
        })
        .collect()
}

fn parse_cell(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::Null;
    }
    if let Ok(int) = raw.parse::<i64>() {
        return Value::Number(int.into());
    }
    if let Some(number) = raw.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(number);
    }
    match raw.to_lowercase().as_str() {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(raw.to_string()),
    }
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::Int(i) => Value::Number((*i).into()),
        Data::Float(f) => Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(f.to_string())),
        Data::Bool(b) => Value::Bool(*b),
        Data::String(s) => Value::String(s.clone()),
        other => Value::String(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_detection() {
        assert_eq!(FileKind::from_filename("data.CSV").unwrap(), FileKind::Csv);
        assert_eq!(FileKind::from_filename("book.xlsx").unwrap(), FileKind::Spreadsheet);
        assert_eq!(FileKind::from_filename("rows.json").unwrap(), FileKind::Json);
        assert!(matches!(FileKind::from_filename("notes.txt"), Err(AppError::Decode(_))));
        assert!(matches!(FileKind::from_filename("noextension"), Err(AppError::Decode(_))));
        assert_eq!(FileKind::from_hint("text/csv").unwrap(), FileKind::Csv);
    }

    #[test]
    fn test_decode_csv_types_and_order() {
        let csv = b"year,region,sales,active\n2020,north,10.5,true\n2021,south,,false\n";
        let records = DefaultDecoder.decode(csv, FileKind::Csv).unwrap();
        assert_eq!(records.len(), 2);

        let keys: Vec<&String> = records[0].keys().collect();
        assert_eq!(keys, vec!["year", "region", "sales", "active"]);
        assert_eq!(records[0]["year"], Value::from(2020));
        assert_eq!(records[0]["sales"], Value::from(10.5));
        assert_eq!(records[0]["active"], Value::Bool(true));
        assert_eq!(records[1]["sales"], Value::Null);
    }

    #[test]
    fn test_decode_csv_short_rows_fill_null() {
        let csv = b"a,b,c\n1,2\n";
        let records = DefaultDecoder.decode(csv, FileKind::Csv).unwrap();
        assert_eq!(records[0]["c"], Value::Null);
    }

    #[test]
    fn test_decode_csv_blank_header() {
        let csv = b"a,,c\n1,2,3\n";
        let records = DefaultDecoder.decode(csv, FileKind::Csv).unwrap();
        assert!(records[0].contains_key("column_2"));
    }

    #[test]
    fn test_decode_csv_repeated_headers_keep_every_column() {
        let csv = b"a,a,b,a,a_2\n1,2,3,4,5\n";
        let records = DefaultDecoder.decode(csv, FileKind::Csv).unwrap();
        let keys: Vec<&String> = records[0].keys().collect();
        assert_eq!(keys, vec!["a", "a_2", "b", "a_3", "a_2_2"]);
        assert_eq!(records[0]["a"], Value::from(1));
        assert_eq!(records[0]["a_2"], Value::from(2));
        assert_eq!(records[0]["a_3"], Value::from(4));
        assert_eq!(records[0]["a_2_2"], Value::from(5));
    }

    #[test]
    fn test_decode_json_array_and_wrapped() {
        let array = br#"[{"b": 1, "a": 2}, {"b": 3, "a": 4}]"#;
        let records = DefaultDecoder.decode(array, FileKind::Json).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].keys().next().map(String::as_str), Some("b"));

        let wrapped = br#"{"meta": "x", "rows": [{"a": 1}]}"#;
        let records = DefaultDecoder.decode(wrapped, FileKind::Json).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_decode_json_rejects_scalars() {
        assert!(matches!(
            DefaultDecoder.decode(b"42", FileKind::Json),
            Err(AppError::Decode(_))
        ));
        assert!(matches!(
            DefaultDecoder.decode(b"[1, 2]", FileKind::Json),
            Err(AppError::Decode(_))
        ));
        assert!(matches!(
            DefaultDecoder.decode(b"not json", FileKind::Json),
            Err(AppError::Decode(_))
        ));
    }

    #[test]
    fn test_decode_garbage_spreadsheet() {
        assert!(matches!(
            DefaultDecoder.decode(b"definitely not a workbook", FileKind::Spreadsheet),
            Err(AppError::Decode(_))
        ));
    }
}
