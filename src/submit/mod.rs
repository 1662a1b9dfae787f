//! Submission orchestrator
//!
//! Walks the selected experiment folders sequentially; each folder goes
//! through formatting, dispatching and recording in turn. A failure inside a
//! folder fails that folder only, with the stage named in its message, and
//! processing moves on to the next one.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{error, info};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;

use crate::dispatch::{dispatch, TransferManifest};
use crate::error::{Result, SubmitError};
use crate::selectors::format::{artifact_descriptors, experiment_name_of, raw_data_descriptors};
use crate::selectors::{
    format_config, format_metrics, format_results, FileDescriptor, MetricsData, Selectors,
};
use crate::store::{MongoSpec, ObjectStore, ObjectStoreSpec, RunTracker};

/// Everything one submission needs, constructed once by the caller. The core
/// reads no environment or preference state of its own.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmissionRequest {
    pub mongo: MongoSpec,
    #[serde(default)]
    pub minio: ObjectStoreSpec,
    pub experiment: ExperimentRequest,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExperimentRequest {
    pub name: String,
    pub folders: Vec<PathBuf>,
    pub selectors: Selectors,
}

/// Outcome of one folder, in submission order.
#[derive(Debug, Clone, Serialize)]
pub struct FolderOutcome {
    pub folder: String,
    pub ok: bool,
    pub message: String,
    pub run_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmissionResult {
    pub ok: bool,
    pub message: String,
    pub submitted_at: DateTime<Utc>,
    pub per_folder: Vec<FolderOutcome>,
}

pub struct Orchestrator {
    tracker: Arc<dyn RunTracker>,
    object_store: Option<Arc<dyn ObjectStore>>,
}

impl Orchestrator {
    pub fn new(tracker: Arc<dyn RunTracker>, object_store: Option<Arc<dyn ObjectStore>>) -> Self {
        Self {
            tracker,
            object_store,
        }
    }

    /// Process every folder and aggregate the per-folder outcomes.
    pub async fn submit(&self, request: &ExperimentRequest) -> SubmissionResult {
        let submitted_at = Utc::now();
        if request.folders.is_empty() {
            return SubmissionResult {
                ok: false,
                message: "no experiment folders selected".to_string(),
                submitted_at,
                per_folder: Vec::new(),
            };
        }

        let mut per_folder = Vec::with_capacity(request.folders.len());
        for folder in &request.folders {
            let name = experiment_name_of(folder);
            info!("submitting experiment folder '{name}'");
            let outcome = match self.submit_folder(folder, &request.selectors).await {
                Ok(run_id) => FolderOutcome {
                    folder: name,
                    ok: true,
                    message: format!("recorded as run {run_id}"),
                    run_id: Some(run_id),
                },
                Err(e) => {
                    error!("folder '{name}' failed: {e}");
                    FolderOutcome {
                        folder: name,
                        ok: false,
                        message: e.to_string(),
                        run_id: None,
                    }
                }
            };
            per_folder.push(outcome);
        }

        let ok = per_folder.iter().all(|o| o.ok);
        let message = per_folder
            .iter()
            .map(|o| format!("{}: {}", o.folder, o.message))
            .collect::<Vec<_>>()
            .join("; ");
        SubmissionResult {
            ok,
            message,
            submitted_at,
            per_folder,
        }
    }

    async fn submit_folder(&self, folder: &Path, selectors: &Selectors) -> Result<String> {
        // Formatting: normalize every selected role before any side effect
        let mut config = format_config(folder, &selectors.config)
            .await
            .map_err(|e| e.at_stage("formatting"))?;
        let metrics = format_metrics(folder, &selectors.metrics)
            .await
            .map_err(|e| e.at_stage("formatting"))?;
        let results = format_results(folder, &selectors.results)
            .await
            .map_err(|e| e.at_stage("formatting"))?;
        let raw_files = raw_data_descriptors(folder, &selectors.raw_data)
            .map_err(|e| e.at_stage("formatting"))?;
        let artifacts = artifact_descriptors(folder, &selectors.artifacts)
            .map_err(|e| e.at_stage("formatting"))?;

        // Dispatching: move raw data, then fold the destination record into
        // the run's config
        let (manifest, fragment) = dispatch(
            &raw_files,
            &selectors.raw_data.options,
            self.object_store.as_deref(),
        )
        .await
        .map_err(|e| e.at_stage("dispatching"))?;
        if !fragment.is_empty() {
            config.insert("raw_data".to_string(), Value::Object(fragment));
        }

        // Recording
        let name = experiment_name_of(folder);
        self.record(&name, config, metrics, results, manifest, artifacts)
            .await
            .map_err(|e| SubmitError::external(e).at_stage("recording"))
    }

    async fn record(
        &self,
        name: &str,
        config: Map<String, Value>,
        metrics: MetricsData,
        results: Map<String, Value>,
        manifest: TransferManifest,
        artifacts: IndexMap<String, FileDescriptor>,
    ) -> anyhow::Result<String> {
        let mut run = self.tracker.open_run(name, &config).await?;

        for (metric, values) in &metrics.columns {
            match &metrics.x_axis {
                Some(x_axis) => {
                    for (step, value) in x_axis.iter().zip(values) {
                        run.log_scalar(metric, *value, Some(*step)).await?;
                    }
                }
                None => {
                    for value in values {
                        run.log_scalar(metric, *value, None).await?;
                    }
                }
            }
        }

        if !results.is_empty() {
            run.set_info("results", Value::Object(results)).await?;
        }
        run.set_info("raw_data_transfer", serde_json::to_value(&manifest)?)
            .await?;

        for descriptor in artifacts.values() {
            if descriptor.source_path.is_file() {
                run.add_artifact(&descriptor.source_path, Some(&descriptor.new_name))
                    .await?;
            }
        }

        run.close().await
    }
}
