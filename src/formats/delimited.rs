//! Delimited (CSV) reading

use std::path::Path;

use serde_json::Value;

use super::table::{apply_header, parse_cell, Table};
use super::DelimitedConfig;
use crate::error::{Result, SubmitError};

/// Read a delimited file into a [`Table`].
///
/// The whole file is read, then parsed from the in-memory buffer; header
/// handling happens at this level, not inside the csv reader, so headerless
/// files get synthesized column names.
pub async fn read(path: &Path, config: &DelimitedConfig) -> Result<Table> {
    let buffer = tokio::fs::read(path).await.map_err(|e| SubmitError::FileRead {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(config.delimiter)
        .has_headers(false) // headers are handled at the table level
        .flexible(true)
        .from_reader(buffer.as_slice());

    let mut raw_rows: Vec<Vec<Value>> = Vec::new();
    for record in csv_reader.records() {
        let record = record.map_err(|e| SubmitError::FileRead {
            path: path.to_path_buf(),
            reason: format!("CSV parse error: {e}"),
        })?;
        raw_rows.push(record.iter().map(parse_cell).collect());
    }

    Ok(apply_header(raw_rows, config.has_header))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    async fn read_str(content: &str, sep: &str, has_header: bool) -> Table {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{content}").unwrap();
        file.flush().unwrap();
        read(file.path(), &DelimitedConfig::from_separator(sep, has_header))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_read_with_header() {
        let table = read_str("t;x;y\n0;1;2\n1;3;4\n", ";", true).await;
        assert_eq!(table.columns, vec!["t", "x", "y"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0], vec![Value::from(0), Value::from(1), Value::from(2)]);
    }

    #[tokio::test]
    async fn test_read_without_header() {
        let table = read_str("accuracy,0.93\nloss,0.12\n", ",", false).await;
        assert_eq!(table.columns, vec!["0", "1"]);
        assert_eq!(table.rows[0][0], Value::from("accuracy"));
        assert_eq!(table.rows[1][1], Value::from(0.12));
    }

    #[tokio::test]
    async fn test_read_tab_separated() {
        let table = read_str("a\tb\n1\t2\n", "\\t", true).await;
        assert_eq!(table.columns, vec!["a", "b"]);
        assert_eq!(table.rows[0], vec![Value::from(1), Value::from(2)]);
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let err = read(
            Path::new("/nonexistent/data.csv"),
            &DelimitedConfig::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SubmitError::FileRead { .. }));
    }
}
