//! Side-effecting transfer of resolved raw-data files
//!
//! Failures of individual files never abort the batch: each destination
//! attempts every file, aggregates per-file outcomes, and the manifest
//! reports the combined result. Only a missing object-store client is a hard
//! error, because credentials are validated before any folder is processed.

use std::path::Path;

use indexmap::IndexMap;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use super::manifest::{format_size, DestinationReport, FileOutcome, TransferManifest};
use super::DispatchOptions;
use crate::error::{Result, SubmitError};
use crate::selectors::FileDescriptor;
use crate::store::ObjectStore;

/// Copy/upload every descriptor per the requested destinations.
///
/// Returns the transfer manifest plus a config fragment recording, per
/// destination and target tag, what was stored where - merged into the run's
/// persisted configuration so file locations stay auditable.
pub async fn dispatch(
    files: &IndexMap<String, FileDescriptor>,
    options: &DispatchOptions,
    store: Option<&dyn ObjectStore>,
) -> Result<(TransferManifest, Map<String, Value>)> {
    if !options.save_locally && !options.send_minio {
        return Ok((TransferManifest::nothing_requested(), Map::new()));
    }

    // Stat every source once; reports and config fragments share the result
    let sizes = collect_sizes(files).await;

    let mut fragment = Map::new();
    let mut messages = Vec::new();
    let mut ok = true;

    let local = if options.save_locally {
        let report = save_files_locally(files, &sizes, &options.local_path).await;
        ok = ok && report.ok;
        messages.push(report.message.clone());
        fragment.insert(
            "local".to_string(),
            destination_fragment(files, &sizes, &json!({ "local_path": options.local_path })),
        );
        Some(report)
    } else {
        None
    };

    let minio = if options.send_minio {
        let store = store.ok_or(SubmitError::MissingCredentials("object store"))?;
        let report = upload_files(files, &sizes, store).await;
        ok = ok && report.ok;
        messages.push(report.message.clone());
        fragment.insert(
            "minio".to_string(),
            destination_fragment(files, &sizes, &json!({ "bucket": store.bucket() })),
        );
        Some(report)
    } else {
        None
    };

    let manifest = TransferManifest {
        ok,
        message: messages.join(" | "),
        local,
        minio,
    };
    Ok((manifest, fragment))
}

/// Copy each file into `{target_dir}/{tag}/{new_name}`, continuing past
/// individual failures.
async fn save_files_locally(
    files: &IndexMap<String, FileDescriptor>,
    sizes: &IndexMap<String, u64>,
    target_dir: &str,
) -> DestinationReport {
    let root = Path::new(target_dir);
    let mut outcomes = Vec::with_capacity(files.len());
    let mut failed = 0usize;

    for (key, file) in files {
        let folder = root.join(&file.target_tag);
        let destination = folder.join(&file.new_name);
        let size_bytes = sizes.get(key).copied().unwrap_or(0);

        let result = copy_one(&file.source_path, &folder, &destination).await;
        if let Err(ref reason) = result {
            warn!("local copy of '{}' failed: {}", file.new_name, reason);
            failed += 1;
        }
        outcomes.push(FileOutcome {
            tag: file.target_tag.clone(),
            file_name: file.new_name.clone(),
            destination: destination.display().to_string(),
            size_bytes,
            ok: result.is_ok(),
            error: result.err(),
        });
    }

    let ok = failed == 0;
    let message = if ok {
        format!("saved {} files locally to {target_dir}", files.len())
    } else {
        format!(
            "saved {} of {} files locally to {target_dir} ({failed} failed)",
            files.len() - failed,
            files.len()
        )
    };
    if ok {
        info!("{message}");
    }
    DestinationReport {
        destination: target_dir.to_string(),
        ok,
        message,
        files: outcomes,
    }
}

async fn copy_one(source: &Path, folder: &Path, destination: &Path) -> std::result::Result<(), String> {
    tokio::fs::create_dir_all(folder)
        .await
        .map_err(|e| format!("cannot create {}: {e}", folder.display()))?;
    tokio::fs::copy(source, destination)
        .await
        .map_err(|e| format!("cannot copy {}: {e}", source.display()))?;
    Ok(())
}

/// Upload each file to `{tag}/{new_name}`. The bucket is verified first; an
/// unreachable bucket marks every file failed without attempting uploads, so
/// a simultaneous local save still lands.
async fn upload_files(
    files: &IndexMap<String, FileDescriptor>,
    sizes: &IndexMap<String, u64>,
    store: &dyn ObjectStore,
) -> DestinationReport {
    let bucket = store.bucket().to_string();

    if let Err(e) = store.verify_bucket().await {
        let reason = SubmitError::BucketUnreachable {
            bucket: bucket.clone(),
            reason: e.to_string(),
        }
        .to_string();
        warn!("{reason}");
        let outcomes = files
            .values()
            .map(|file| FileOutcome {
                tag: file.target_tag.clone(),
                file_name: file.new_name.clone(),
                destination: format!("{bucket}/{}/{}", file.target_tag, file.new_name),
                size_bytes: 0,
                ok: false,
                error: Some(reason.clone()),
            })
            .collect();
        return DestinationReport {
            destination: bucket,
            ok: false,
            message: reason,
            files: outcomes,
        };
    }

    let mut outcomes = Vec::with_capacity(files.len());
    let mut failed = 0usize;

    for (source_key, file) in files {
        let key = format!("{}/{}", file.target_tag, file.new_name);
        let size_bytes = sizes.get(source_key).copied().unwrap_or(0);

        let result = store
            .upload(&file.source_path, &key)
            .await
            .map_err(|e| e.to_string());
        if let Err(ref reason) = result {
            warn!("upload of '{key}' failed: {reason}");
            failed += 1;
        }
        outcomes.push(FileOutcome {
            tag: file.target_tag.clone(),
            file_name: file.new_name.clone(),
            destination: format!("{bucket}/{key}"),
            size_bytes,
            ok: result.is_ok(),
            error: result.err(),
        });
    }

    let ok = failed == 0;
    let message = if ok {
        format!("uploaded {} files to bucket {bucket}", files.len())
    } else {
        format!(
            "uploaded {} of {} files to bucket {bucket} ({failed} failed)",
            files.len() - failed,
            files.len()
        )
    };
    if ok {
        info!("{message}");
    }
    DestinationReport {
        destination: bucket,
        ok,
        message,
        files: outcomes,
    }
}

/// Source file sizes keyed like the descriptor map. A missing file counts
/// as zero; the copy or upload step reports the real failure.
async fn collect_sizes(files: &IndexMap<String, FileDescriptor>) -> IndexMap<String, u64> {
    let mut sizes = IndexMap::with_capacity(files.len());
    for (key, file) in files {
        let size = tokio::fs::metadata(&file.source_path)
            .await
            .map(|m| m.len())
            .unwrap_or(0);
        sizes.insert(key.clone(), size);
    }
    sizes
}

/// Per-tag record of type, final name, human size, and location for one
/// destination.
fn destination_fragment(
    files: &IndexMap<String, FileDescriptor>,
    sizes: &IndexMap<String, u64>,
    location: &Value,
) -> Value {
    let mut per_tag = Map::new();
    for (key, file) in files {
        let size_bytes = sizes.get(key).copied().unwrap_or(0);
        let mut entry = Map::new();
        entry.insert(
            "type".to_string(),
            Value::from(file.new_name.rsplit('.').next().unwrap_or_default()),
        );
        entry.insert("file_name".to_string(), Value::from(file.new_name.clone()));
        entry.insert("size".to_string(), Value::from(format_size(size_bytes)));
        entry.insert("folder".to_string(), Value::from(file.target_tag.clone()));
        if let Value::Object(fields) = location {
            for (k, v) in fields {
                entry.insert(k.clone(), v.clone());
            }
        }
        per_tag.insert(file.target_tag.clone(), Value::Object(entry));
    }
    Value::Object(per_tag)
}
