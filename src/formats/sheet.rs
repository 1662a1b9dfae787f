//! Spreadsheet (XLSX/XLSM) reading via calamine

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use serde_json::Value;

use super::table::{apply_header, Table};
use super::SheetConfig;
use crate::error::{Result, SubmitError};

/// Read one worksheet into a [`Table`]. A missing workbook or an absent sheet
/// name is a read error, not an unsupported format.
pub fn read(path: &Path, config: &SheetConfig) -> Result<Table> {
    let mut workbook = open_workbook_auto(path).map_err(|e| SubmitError::FileRead {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let sheet_name = match &config.sheet {
        Some(name) if !name.is_empty() => name.clone(),
        _ => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| SubmitError::FileRead {
                path: path.to_path_buf(),
                reason: "workbook has no sheets".to_string(),
            })?,
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| SubmitError::FileRead {
            path: path.to_path_buf(),
            reason: format!("sheet '{sheet_name}': {e}"),
        })?;

    let raw_rows: Vec<Vec<Value>> = range
        .rows()
        .map(|row| row.iter().map(cell_value).collect())
        .collect();

    Ok(apply_header(raw_rows, config.has_header))
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::Int(i) => Value::from(*i),
        Data::Float(f) => Value::from(*f),
        Data::Bool(b) => Value::Bool(*b),
        Data::String(s) => Value::from(s.as_str()),
        // Serial date number; the formatters treat it as a plain scalar
        Data::DateTime(dt) => Value::from(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::from(s.as_str()),
        Data::Error(e) => Value::from(format!("#ERR:{e:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// Workbook with two sheets: "runs" (t,x with two data rows) and
    /// "summary" (metric,score with one data row).
    fn write_workbook(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("book.xlsx");
        let mut workbook = Workbook::new();

        let runs = workbook.add_worksheet();
        runs.set_name("runs").unwrap();
        runs.write_string(0, 0, "t").unwrap();
        runs.write_string(0, 1, "x").unwrap();
        runs.write_number(1, 0, 0.0).unwrap();
        runs.write_number(1, 1, 1.0).unwrap();
        runs.write_number(2, 0, 1.0).unwrap();
        runs.write_number(2, 1, 3.0).unwrap();

        let summary = workbook.add_worksheet();
        summary.set_name("summary").unwrap();
        summary.write_string(0, 0, "metric").unwrap();
        summary.write_string(0, 1, "score").unwrap();
        summary.write_string(1, 0, "accuracy").unwrap();
        summary.write_number(1, 1, 0.93).unwrap();

        workbook.save(&path).unwrap();
        path
    }

    #[test]
    fn test_read_named_sheet() {
        let dir = TempDir::new().unwrap();
        let path = write_workbook(&dir);

        let config = SheetConfig {
            sheet: Some("summary".to_string()),
            has_header: true,
        };
        let table = read(&path, &config).unwrap();
        assert_eq!(table.columns, vec!["metric", "score"]);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0][0], Value::from("accuracy"));
        assert_eq!(table.rows[0][1], Value::from(0.93));
    }

    #[test]
    fn test_read_defaults_to_first_sheet() {
        let dir = TempDir::new().unwrap();
        let path = write_workbook(&dir);

        let table = read(
            &path,
            &SheetConfig {
                sheet: None,
                has_header: true,
            },
        )
        .unwrap();
        assert_eq!(table.columns, vec!["t", "x"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1], vec![Value::from(1.0), Value::from(3.0)]);

        // An empty sheet name falls back to the first sheet as well
        let table = read(
            &path,
            &SheetConfig {
                sheet: Some(String::new()),
                has_header: true,
            },
        )
        .unwrap();
        assert_eq!(table.columns, vec!["t", "x"]);
    }

    #[test]
    fn test_read_headerless_synthesizes_columns() {
        let dir = TempDir::new().unwrap();
        let path = write_workbook(&dir);

        let config = SheetConfig {
            sheet: Some("summary".to_string()),
            has_header: false,
        };
        let table = read(&path, &config).unwrap();
        assert_eq!(table.columns, vec!["0", "1"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0][0], Value::from("metric"));
    }

    #[test]
    fn test_read_absent_sheet_is_a_read_error() {
        let dir = TempDir::new().unwrap();
        let path = write_workbook(&dir);

        let config = SheetConfig {
            sheet: Some("missing".to_string()),
            has_header: true,
        };
        let err = read(&path, &config).unwrap_err();
        assert!(matches!(err, SubmitError::FileRead { .. }));
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_read_missing_workbook() {
        let err = read(Path::new("/nonexistent/book.xlsx"), &SheetConfig::default())
            .unwrap_err();
        assert!(matches!(err, SubmitError::FileRead { .. }));
    }

    #[test]
    fn test_cell_value_scalars() {
        assert_eq!(cell_value(&Data::Int(3)), Value::from(3));
        assert_eq!(cell_value(&Data::Float(0.5)), Value::from(0.5));
        assert_eq!(cell_value(&Data::Bool(true)), Value::Bool(true));
        assert_eq!(cell_value(&Data::Empty), Value::Null);
        assert_eq!(cell_value(&Data::String("x".into())), Value::from("x"));
    }
}
