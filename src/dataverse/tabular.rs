//! CSV input for bulk loads.
//!
//! Headers become row keys. Each column gets one type from all of its cells:
//! integer, then float, then boolean, otherwise text. Blank cells and the
//! usual missing-value markers (`NaN`, `NA`, `null`, ...) are null in every
//! column, so an integer column with gaps stays integral.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use serde_json::{Number, Value};

use crate::dataverse::payload::Row;
use crate::error::DataverseError;

const MISSING_MARKERS: &[&str] = &["nan", "-nan", "na", "n/a", "#n/a", "null", "none", "<na>"];

/// Type shared by every non-missing cell of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Integer,
    Float,
    Boolean,
    Text,
}

impl ColumnKind {
    fn infer<'a>(cells: impl Iterator<Item = &'a str> + Clone) -> Self {
        let mut present = cells.map(str::trim).filter(|cell| !is_missing(cell));

        if present.clone().all(|cell| cell.parse::<i64>().is_ok()) {
            ColumnKind::Integer
        } else if present.clone().all(|cell| parse_float(cell).is_some()) {
            ColumnKind::Float
        } else if present.all(|cell| parse_bool(cell).is_some()) {
            ColumnKind::Boolean
        } else {
            ColumnKind::Text
        }
    }

    fn value(self, cell: &str) -> Value {
        let cell = cell.trim();
        if is_missing(cell) {
            return Value::Null;
        }

        let typed = match self {
            ColumnKind::Integer => cell.parse::<i64>().ok().map(Value::from),
            ColumnKind::Float => parse_float(cell).map(Value::Number),
            ColumnKind::Boolean => parse_bool(cell).map(Value::Bool),
            ColumnKind::Text => None,
        };
        typed.unwrap_or_else(|| Value::String(cell.to_string()))
    }
}

/// Read every record of the CSV file at `path`.
pub fn read_csv(path: &Path) -> Result<Vec<Row>, DataverseError> {
    let file = File::open(path)?;
    read_csv_from(file)
}

/// Read every record from `reader`, which must start with a header line.
pub fn read_csv_from<R: Read>(reader: R) -> Result<Vec<Row>, DataverseError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|header| header.trim().to_string())
        .collect();

    let records = reader.records().collect::<Result<Vec<StringRecord>, _>>()?;

    let kinds: Vec<ColumnKind> = (0..headers.len())
        .map(|index| {
            ColumnKind::infer(
                records
                    .iter()
                    .map(move |record| record.get(index).unwrap_or_default()),
            )
        })
        .collect();

    let rows: Vec<Row> = records
        .iter()
        .map(|record| {
            headers
                .iter()
                .zip(&kinds)
                .enumerate()
                .map(|(index, (header, kind))| {
                    (header.clone(), kind.value(record.get(index).unwrap_or_default()))
                })
                .collect()
        })
        .collect();

    log::debug!("Read {} rows with {} columns", rows.len(), headers.len());
    Ok(rows)
}

fn is_missing(cell: &str) -> bool {
    cell.is_empty()
        || MISSING_MARKERS
            .iter()
            .any(|marker| cell.eq_ignore_ascii_case(marker))
}

fn parse_float(cell: &str) -> Option<Number> {
    cell.parse::<f64>()
        .ok()
        .filter(|float| float.is_finite())
        .and_then(Number::from_f64)
}

fn parse_bool(cell: &str) -> Option<bool> {
    if cell.eq_ignore_ascii_case("true") {
        Some(true)
    } else if cell.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn infers_one_type_per_column() {
        let csv = "AU,State,Count,Ratio,Active\n\
                   AU-01,Arizona,1,0.5,true\n\
                   0042,Utah,,2,FALSE\n\
                   AU-03,NaN,NA,,\n";

        let rows = read_csv_from(csv.as_bytes()).unwrap();

        assert_eq!(rows[0]["AU"], json!("AU-01"));
        assert_eq!(rows[1]["AU"], json!("0042"));
        assert_eq!(rows[0]["Count"], json!(1));
        assert_eq!(rows[1]["Count"], Value::Null);
        assert_eq!(rows[2]["Count"], Value::Null);
        assert_eq!(rows[0]["Ratio"], json!(0.5));
        assert_eq!(rows[1]["Ratio"], json!(2.0));
        assert_eq!(rows[0]["Active"], json!(true));
        assert_eq!(rows[1]["Active"], json!(false));
        assert_eq!(rows[2]["Active"], Value::Null);
        assert_eq!(rows[2]["State"], Value::Null);
    }

    #[test]
    fn column_kind_falls_back_to_text() {
        assert_eq!(ColumnKind::infer(["1", "-2", " "].into_iter()), ColumnKind::Integer);
        assert_eq!(ColumnKind::infer(["1", "2.5"].into_iter()), ColumnKind::Float);
        assert_eq!(ColumnKind::infer(["TRUE", "false"].into_iter()), ColumnKind::Boolean);
        assert_eq!(ColumnKind::infer(["1", "true"].into_iter()), ColumnKind::Text);
        assert_eq!(ColumnKind::infer(["inf", "1"].into_iter()), ColumnKind::Text);
        assert_eq!(ColumnKind::Text.value(" Arizona "), json!("Arizona"));
    }

    #[test]
    fn reads_rows_keyed_by_header() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "AU, State ,Status").unwrap();
        writeln!(file, "AU-01,Arizona,1").unwrap();
        writeln!(file, "AU-02,,0").unwrap();
        writeln!(file, "AU-03").unwrap();

        let rows = read_csv(file.path()).unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(
            Value::Object(rows[0].clone()),
            json!({ "AU": "AU-01", "State": "Arizona", "Status": 1 })
        );
        assert_eq!(rows[1]["State"], Value::Null);
        assert_eq!(rows[2]["Status"], Value::Null);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = read_csv(Path::new("does-not-exist.csv")).unwrap_err();
        assert!(matches!(err, DataverseError::Io(_)));
    }
}
