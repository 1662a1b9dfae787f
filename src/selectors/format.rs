//! The four selector formatters
//!
//! Each takes an experiment folder plus one selector descriptor and produces
//! the normalized structure attached to the run. A selector with no file
//! chosen yields an empty result without touching the filesystem.

use std::path::Path;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use super::{
    is_selected, ArtifactsSelector, ConfigSelector, FileDescriptor, MetricsSelector,
    RawDataSelector, ResultsSelector,
};
use crate::error::{Result, SubmitError};
use crate::formats::table::cell_to_string;
use crate::formats::{read_table, DelimitedConfig, FileFormat, FormatKind, SheetConfig};
use crate::uid::derive_uid;

/// Normalized metrics: an optional shared x axis plus per-column series, in
/// selector emission order. When `x_axis` is present every series has the
/// same length and values pair with it by index.
#[derive(Debug, Clone, Default)]
pub struct MetricsData {
    pub x_axis: Option<Vec<f64>>,
    pub columns: IndexMap<String, Vec<f64>>,
}

impl MetricsData {
    pub fn is_empty(&self) -> bool {
        self.x_axis.is_none() && self.columns.is_empty()
    }
}

/// Flatten config from JSON (optionally collapsing nested objects) or from
/// the first row of a tabular file.
pub async fn format_config(folder: &Path, selector: &ConfigSelector) -> Result<Map<String, Value>> {
    if !is_selected(&selector.name) {
        return Ok(Map::new());
    }
    let path = folder.join(&selector.name);

    match FormatKind::detect(&selector.name)? {
        FormatKind::Json => {
            let object = crate::formats::table::read_json_object(&path).await?;
            if selector.options.flatten {
                let mut flat = Map::new();
                flatten_into("", &Value::Object(object), &mut flat);
                Ok(flat)
            } else {
                Ok(object)
            }
        }
        kind => {
            let format = tabular_format(kind, &selector.options.sep, selector.sheet.as_deref(), true);
            let table = read_table(&path, &format).await?;
            let mut map = Map::new();
            if let Some(first_row) = table.rows.first() {
                for (column, value) in table.columns.iter().zip(first_row) {
                    map.insert(column.clone(), value.clone());
                }
            }
            Ok(map)
        }
    }
}

/// Recursively collapse nested objects into underscore-joined keys. Arrays
/// and scalars are kept as-is under their flattened key.
fn flatten_into(prefix: &str, value: &Value, out: &mut Map<String, Value>) {
    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                let flat_key = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}_{key}")
                };
                flatten_into(&flat_key, nested, out);
            }
        }
        other => {
            out.insert(prefix.to_string(), other.clone());
        }
    }
}

/// Read scalar series for the selected columns, routing the time column into
/// the x axis when requested. JSON carries no column series and is rejected.
pub async fn format_metrics(folder: &Path, selector: &MetricsSelector) -> Result<MetricsData> {
    if !is_selected(&selector.name) {
        return Ok(MetricsData::default());
    }
    let path = folder.join(&selector.name);
    let options = &selector.options;

    let format = match FormatKind::detect(&selector.name)? {
        FormatKind::Json => {
            return Err(SubmitError::UnsupportedFormat {
                extension: "json".to_string(),
            })
        }
        kind => tabular_format(kind, &options.sep, selector.sheet.as_deref(), options.header),
    };
    let table = read_table(&path, &format).await?;

    let mut metrics = MetricsData::default();
    for column in &options.selected_cols {
        let values = table
            .column(column)
            .ok_or_else(|| SubmitError::FileRead {
                path: path.clone(),
                reason: format!("column '{column}' not found"),
            })?;
        let series = values
            .iter()
            .map(|v| numeric(v))
            .collect::<Option<Vec<f64>>>()
            .ok_or_else(|| SubmitError::FileRead {
                path: path.clone(),
                reason: format!("column '{column}' holds non-numeric values"),
            })?;

        if options.has_time && *column == options.time_col {
            metrics.x_axis = Some(series);
        } else {
            metrics.columns.insert(column.clone(), series);
        }
    }
    Ok(metrics)
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse::<f64>().ok(),
        _ => None,
    }
}

/// Key-value results from a JSON object, or from the first two columns of a
/// headerless tabular file (one entry per row).
pub async fn format_results(folder: &Path, selector: &ResultsSelector) -> Result<Map<String, Value>> {
    if !is_selected(&selector.name) {
        return Ok(Map::new());
    }
    let path = folder.join(&selector.name);

    match FormatKind::detect(&selector.name)? {
        FormatKind::Json => crate::formats::table::read_json_object(&path).await,
        kind => {
            let format = tabular_format(kind, &selector.options.sep, selector.sheet.as_deref(), false);
            let table = read_table(&path, &format).await?;
            let mut map = Map::new();
            for row in &table.rows {
                let key = match row.first() {
                    Some(Value::Null) | None => continue,
                    Some(cell) => cell_to_string(cell),
                };
                let value = row.get(1).cloned().unwrap_or(Value::Null);
                map.insert(key, value);
            }
            Ok(map)
        }
    }
}

/// Resolve raw-data/artifact selections into file descriptors. A single file
/// produces one descriptor; a subdirectory produces one per listed file.
pub fn format_raw_data(
    folder: &Path,
    name: &str,
    listed_files: &[String],
) -> Result<IndexMap<String, FileDescriptor>> {
    let mut descriptors = IndexMap::new();
    if !is_selected(name) {
        return Ok(descriptors);
    }

    let experiment_name = experiment_name_of(folder);
    let uid = derive_uid(&experiment_name)?;
    let selected_path = folder.join(name);

    if selected_path.is_file() {
        descriptors.insert(name.to_string(), descriptor(&uid, selected_path.clone(), name));
    } else if selected_path.is_dir() {
        for file in listed_files {
            descriptors.insert(file.clone(), descriptor(&uid, selected_path.join(file), file));
        }
    } else {
        return Err(SubmitError::PathNotFound(selected_path));
    }

    Ok(descriptors)
}

fn descriptor(uid: &str, source_path: std::path::PathBuf, file_name: &str) -> FileDescriptor {
    FileDescriptor {
        source_path,
        new_name: format!("{uid}-{file_name}"),
        target_tag: file_name.split('.').next().unwrap_or(file_name).to_string(),
    }
}

/// The experiment takes its name from the folder's base name.
pub fn experiment_name_of(folder: &Path) -> String {
    folder
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| folder.to_string_lossy().into_owned())
}

fn tabular_format(kind: FormatKind, sep: &str, sheet: Option<&str>, has_header: bool) -> FileFormat {
    match kind {
        FormatKind::Csv => FileFormat::Delimited(DelimitedConfig::from_separator(sep, has_header)),
        FormatKind::Sheet => FileFormat::Sheet(SheetConfig {
            sheet: sheet.map(str::to_string).filter(|s| !s.is_empty()),
            has_header,
        }),
        // Callers handle JSON before building a tabular format
        FormatKind::Json => FileFormat::Json,
    }
}

// Convenience wrappers matching the two selector shapes that resolve files.
pub fn raw_data_descriptors(
    folder: &Path,
    selector: &RawDataSelector,
) -> Result<IndexMap<String, FileDescriptor>> {
    format_raw_data(folder, &selector.name, &selector.files)
}

pub fn artifact_descriptors(
    folder: &Path,
    selector: &ArtifactsSelector,
) -> Result<IndexMap<String, FileDescriptor>> {
    format_raw_data(folder, &selector.name, &selector.files)
}
