//! High-level runner API for experiment submission.
//!
//! This module provides the public interface that encapsulates connection
//! setup, the per-folder pipeline, and result aggregation.
//!
//! This is the primary API for external users and for the CLI.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::store::{MongoRunTracker, ObjectStore, S3ObjectStore};
use crate::submit::Orchestrator;

pub use crate::submit::{ExperimentRequest, FolderOutcome, SubmissionRequest, SubmissionResult};

/// Run a full submission: connect to the configured stores, then process
/// every selected experiment folder in order.
///
/// Connection failures abort the whole submission; per-folder errors only
/// fail that folder and are reported in the returned [`SubmissionResult`].
///
/// # Example
///
/// ```no_run
/// use labsend::runner::{run_submission, SubmissionRequest};
///
/// # async fn example() -> anyhow::Result<()> {
/// let payload = std::fs::read_to_string("submission.json")?;
/// let request: SubmissionRequest = serde_json::from_str(&payload)?;
/// let result = run_submission(&request).await?;
/// println!("{}", result.message);
/// # Ok(())
/// # }
/// ```
pub async fn run_submission(request: &SubmissionRequest) -> Result<SubmissionResult> {
    let tracker = MongoRunTracker::connect(&request.mongo)
        .await
        .context("connecting to the metadata store")?;

    let object_store = connect_object_store(request)?;

    let orchestrator = Orchestrator::new(Arc::new(tracker), object_store);
    Ok(orchestrator.submit(&request.experiment).await)
}

/// Verify both store connections without touching any experiment folder.
///
/// The metadata store is pinged; if object-store uploads are requested the
/// bucket is checked with a zero-byte probe write.
pub async fn check_connections(request: &SubmissionRequest) -> Result<()> {
    MongoRunTracker::connect(&request.mongo)
        .await
        .context("connecting to the metadata store")?;
    info!("metadata store reachable");

    if let Some(store) = connect_object_store(request)? {
        store
            .probe_write()
            .await
            .with_context(|| format!("probing bucket '{}'", store.bucket()))?;
        info!("bucket '{}' writable", store.bucket());
    }
    Ok(())
}

/// An object-store client is only built when uploads are requested, so
/// local-only submissions need no credentials at all.
fn connect_object_store(request: &SubmissionRequest) -> Result<Option<Arc<dyn ObjectStore>>> {
    if !request.experiment.selectors.raw_data.options.send_minio {
        return Ok(None);
    }
    request.minio.validate()?;
    let store = S3ObjectStore::connect(&request.minio)?;
    Ok(Some(Arc::new(store)))
}
