//! Selector descriptors: which file/sheet/columns to read for each data role

pub mod format;

pub use format::{
    format_config, format_metrics, format_raw_data, format_results, MetricsData,
};

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::dispatch::DispatchOptions;

/// A selector is "not selected" when its name is empty or the UI placeholder
/// `"None"`; every formatter short-circuits on that with an empty result.
pub(crate) fn is_selected(name: &str) -> bool {
    !name.is_empty() && name != "None"
}

/// The five per-role selectors supplied once for the whole submission.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Selectors {
    pub config: ConfigSelector,
    pub metrics: MetricsSelector,
    pub results: ResultsSelector,
    pub raw_data: RawDataSelector,
    pub artifacts: ArtifactsSelector,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigSelector {
    pub name: String,
    pub sheet: Option<String>,
    pub options: ConfigOptions,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConfigOptions {
    /// Fully collapse nested JSON objects into underscore-joined keys.
    pub flatten: bool,
    pub sep: String,
}

impl Default for ConfigOptions {
    fn default() -> Self {
        Self {
            flatten: false,
            sep: ",".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MetricsSelector {
    pub name: String,
    pub sheet: Option<String>,
    pub options: MetricsOptions,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsOptions {
    /// Whether the first row carries column names.
    pub header: bool,
    /// Route `time_col` into the x axis instead of the metric columns.
    pub has_time: bool,
    pub time_col: String,
    /// Columns to emit, in emission order.
    pub selected_cols: Vec<String>,
    pub sep: String,
}

impl Default for MetricsOptions {
    fn default() -> Self {
        Self {
            header: false,
            has_time: false,
            time_col: String::new(),
            selected_cols: Vec::new(),
            sep: ",".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ResultsSelector {
    pub name: String,
    pub sheet: Option<String>,
    pub options: ResultsOptions,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResultsOptions {
    pub sep: String,
}

impl Default for ResultsOptions {
    fn default() -> Self {
        Self {
            sep: ",".to_string(),
        }
    }
}

/// Raw-data selector: a single file, or a subdirectory plus an explicit file
/// list, along with where the files should go.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawDataSelector {
    pub name: String,
    pub files: Vec<String>,
    pub options: DispatchOptions,
}

/// Artifacts share the raw-data resolution but are attached to the run
/// directly, so there are no save options.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ArtifactsSelector {
    pub name: String,
    pub files: Vec<String>,
}

/// Resolved source-path + derived-destination-name pair for one file.
#[derive(Debug, Clone, Serialize)]
pub struct FileDescriptor {
    pub source_path: PathBuf,
    /// `derive_uid(experiment_name) + "-" + original_filename`; unique per
    /// run and deterministically reproducible.
    pub new_name: String,
    /// Original filename up to the first `.`; names the per-file folder at
    /// each destination.
    pub target_tag: String,
}
