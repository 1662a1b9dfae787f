//! Normalized in-memory table shared by all formatters

use std::path::Path;

use serde_json::Value;

use super::{delimited, sheet, DelimitedConfig, SheetConfig};
use crate::error::{Result, SubmitError};

/// File format resolved once from the extension, then matched exhaustively.
#[derive(Debug, Clone)]
pub enum FileFormat {
    Delimited(DelimitedConfig),
    Sheet(SheetConfig),
    Json,
}

/// Column names plus row data, in file order.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    /// Values of a named column, top to bottom. Rows shorter than the column
    /// index contribute nulls so every column has the same length.
    pub fn column(&self, name: &str) -> Option<Vec<Value>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.get(idx).cloned().unwrap_or(Value::Null))
                .collect(),
        )
    }
}

/// Read a file into a [`Table`] according to its resolved format.
pub async fn read_table(path: &Path, format: &FileFormat) -> Result<Table> {
    match format {
        FileFormat::Delimited(config) => delimited::read(path, config).await,
        FileFormat::Sheet(config) => sheet::read(path, config),
        FileFormat::Json => read_json_table(path).await,
    }
}

/// Read a JSON file as a one-row table: object keys become columns. There is
/// no header concept for JSON.
async fn read_json_table(path: &Path) -> Result<Table> {
    let object = read_json_object(path).await?;
    let mut columns = Vec::with_capacity(object.len());
    let mut row = Vec::with_capacity(object.len());
    for (key, value) in object {
        columns.push(key);
        row.push(value);
    }
    Ok(Table {
        columns,
        rows: vec![row],
    })
}

/// Read a JSON file that must hold a single top-level object.
pub async fn read_json_object(path: &Path) -> Result<serde_json::Map<String, Value>> {
    let bytes = tokio::fs::read(path).await.map_err(|e| SubmitError::FileRead {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let value: Value = serde_json::from_slice(&bytes).map_err(|e| SubmitError::FileRead {
        path: path.to_path_buf(),
        reason: format!("invalid JSON: {e}"),
    })?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(SubmitError::FileRead {
            path: path.to_path_buf(),
            reason: format!("expected a JSON object, got {}", json_type_name(&other)),
        }),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Turn raw rows into a table, honoring the header flag: row 0 becomes the
/// column names when a header is present, otherwise names are synthesized as
/// "0".."N-1" from the widest row.
pub(super) fn apply_header(mut raw: Vec<Vec<Value>>, has_header: bool) -> Table {
    if has_header && !raw.is_empty() {
        let header = raw.remove(0);
        let columns = header.iter().map(cell_to_string).collect();
        Table { columns, rows: raw }
    } else {
        let width = raw.iter().map(Vec::len).max().unwrap_or(0);
        let columns = (0..width).map(|i| i.to_string()).collect();
        Table { columns, rows: raw }
    }
}

/// Header cells may arrive as any scalar; render them the way they were
/// written in the file.
pub(crate) fn cell_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Infer a scalar from a raw text cell: integer, float, boolean, or string.
/// Empty cells become null.
pub(super) fn parse_cell(text: &str) -> Value {
    if text.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = text.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(f) = text.parse::<f64>() {
        if f.is_finite() {
            return Value::from(f);
        }
    }
    match text {
        "true" | "True" | "TRUE" => Value::Bool(true),
        "false" | "False" | "FALSE" => Value::Bool(false),
        _ => Value::String(text.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_cell_inference() {
        assert_eq!(parse_cell("42"), Value::from(42));
        assert_eq!(parse_cell("1.5"), Value::from(1.5));
        assert_eq!(parse_cell("true"), Value::Bool(true));
        assert_eq!(parse_cell("hello"), Value::from("hello"));
        assert_eq!(parse_cell(""), Value::Null);
    }

    #[test]
    fn test_apply_header_present() {
        let raw = vec![
            vec![Value::from("a"), Value::from("b")],
            vec![Value::from(1), Value::from(2)],
        ];
        let table = apply_header(raw, true);
        assert_eq!(table.columns, vec!["a", "b"]);
        assert_eq!(table.rows.len(), 1);
    }

    #[test]
    fn test_apply_header_synthesized_from_widest_row() {
        let raw = vec![
            vec![Value::from(1)],
            vec![Value::from(1), Value::from(2), Value::from(3)],
        ];
        let table = apply_header(raw, false);
        assert_eq!(table.columns, vec!["0", "1", "2"]);
        assert_eq!(table.rows.len(), 2);
    }

    #[test]
    fn test_column_pads_short_rows() {
        let table = Table {
            columns: vec!["a".into(), "b".into()],
            rows: vec![vec![Value::from(1), Value::from(2)], vec![Value::from(3)]],
        };
        let b = table.column("b").unwrap();
        assert_eq!(b, vec![Value::from(2), Value::Null]);
        assert!(table.column("missing").is_none());
    }

    #[tokio::test]
    async fn test_read_json_table() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"lr": 0.01, "model": "cnn"}}"#).unwrap();
        file.flush().unwrap();

        let table = read_table(file.path(), &FileFormat::Json).await.unwrap();
        assert_eq!(table.rows.len(), 1);
        assert!(table.columns.contains(&"lr".to_string()));
        assert!(table.columns.contains(&"model".to_string()));
    }

    #[tokio::test]
    async fn test_read_json_rejects_non_object() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[1, 2, 3]").unwrap();
        file.flush().unwrap();

        let err = read_json_object(file.path()).await.unwrap_err();
        assert!(matches!(err, SubmitError::FileRead { .. }));
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let err = read_json_object(Path::new("/nonexistent/conf.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::FileRead { .. }));
    }
}
