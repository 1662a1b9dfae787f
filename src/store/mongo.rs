//! Run tracking against the metadata store
//!
//! The trait pair below is the only surface the orchestrator sees; the Mongo
//! implementation writes a sacred-observer-compatible shape (a `runs`
//! document per run, one `metrics` document per scalar series) so existing
//! dashboards keep working against the same collections.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use mongodb::bson::{doc, to_bson, Bson, DateTime, Document};
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection, Database};
use serde_json::{Map, Value};
use tracing::info;

use super::uri::{build_mongo_url, mask_uri, MongoSpec};
use crate::config::STORE_SELECTION_TIMEOUT;
use crate::error::SubmitError;

/// Opens runs against the metadata store. One run is open at a time; the
/// orchestrator closes each before starting the next folder.
#[async_trait]
pub trait RunTracker: Send + Sync {
    async fn open_run(&self, name: &str, config: &Map<String, Value>)
        -> Result<Box<dyn RunHandle>>;
}

/// One recorded run. Dropped without `close` the run stays RUNNING, which is
/// how interrupted submissions are visible after the fact.
#[async_trait]
pub trait RunHandle: Send + Sync {
    /// Log one scalar value; without an explicit step an auto-incrementing
    /// per-metric step is used.
    async fn log_scalar(&mut self, name: &str, value: f64, step: Option<f64>) -> Result<()>;

    /// Attach a file to the run.
    async fn add_artifact(&mut self, path: &Path, name: Option<&str>) -> Result<()>;

    /// Store an auxiliary key under the run's info document.
    async fn set_info(&mut self, key: &str, value: Value) -> Result<()>;

    /// Mark the run completed and return its identifier.
    async fn close(self: Box<Self>) -> Result<String>;
}

pub struct MongoRunTracker {
    db: Database,
}

impl MongoRunTracker {
    /// Connect and ping. A connection that cannot be established fails the
    /// whole submission before any folder is processed.
    pub async fn connect(spec: &MongoSpec) -> Result<Self, SubmitError> {
        let (url, db_name) = build_mongo_url(spec)?;

        let mut options = ClientOptions::parse(&url)
            .await
            .map_err(SubmitError::external)?;
        options.server_selection_timeout = Some(STORE_SELECTION_TIMEOUT);

        let client = Client::with_options(options).map_err(SubmitError::external)?;
        client
            .database("admin")
            .run_command(doc! {"ping": 1})
            .await
            .map_err(SubmitError::external)?;

        info!("connected to metadata store at {}", mask_uri(&url));
        Ok(Self {
            db: client.database(&db_name),
        })
    }
}

#[async_trait]
impl RunTracker for MongoRunTracker {
    async fn open_run(
        &self,
        name: &str,
        config: &Map<String, Value>,
    ) -> Result<Box<dyn RunHandle>> {
        let config_bson =
            to_bson(&Value::Object(config.clone())).context("config is not BSON-serializable")?;

        let runs: Collection<Document> = self.db.collection("runs");
        let inserted = runs
            .insert_one(doc! {
                "experiment": { "name": name },
                "status": "RUNNING",
                "start_time": DateTime::now(),
                "config": config_bson,
                "artifacts": [],
                "info": {},
            })
            .await
            .context("failed to open run")?;

        info!("opened run {} for '{}'", inserted.inserted_id, name);
        Ok(Box::new(MongoRunHandle {
            runs,
            metrics: self.db.collection("metrics"),
            run_id: inserted.inserted_id,
            auto_steps: HashMap::new(),
        }))
    }
}

struct MongoRunHandle {
    runs: Collection<Document>,
    metrics: Collection<Document>,
    run_id: Bson,
    auto_steps: HashMap<String, i64>,
}

#[async_trait]
impl RunHandle for MongoRunHandle {
    async fn log_scalar(&mut self, name: &str, value: f64, step: Option<f64>) -> Result<()> {
        let step_bson = match step {
            Some(s) => Bson::Double(s),
            None => {
                let counter = self.auto_steps.entry(name.to_string()).or_insert(0);
                let current = *counter;
                *counter += 1;
                Bson::Int64(current)
            }
        };
        self.metrics
            .update_one(
                doc! { "run_id": self.run_id.clone(), "name": name },
                doc! { "$push": {
                    "steps": step_bson,
                    "values": value,
                    "timestamps": DateTime::now(),
                }},
            )
            .upsert(true)
            .await
            .with_context(|| format!("failed to log metric '{name}'"))?;
        Ok(())
    }

    async fn add_artifact(&mut self, path: &Path, name: Option<&str>) -> Result<()> {
        let artifact_name = match name {
            Some(n) => n.to_string(),
            None => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
        };
        self.runs
            .update_one(
                doc! { "_id": self.run_id.clone() },
                doc! { "$push": { "artifacts": {
                    "name": artifact_name,
                    "source_path": path.display().to_string(),
                }}},
            )
            .await
            .context("failed to attach artifact")?;
        Ok(())
    }

    async fn set_info(&mut self, key: &str, value: Value) -> Result<()> {
        let bson = to_bson(&value).with_context(|| format!("info '{key}' not serializable"))?;
        self.runs
            .update_one(
                doc! { "_id": self.run_id.clone() },
                doc! { "$set": { format!("info.{key}"): bson } },
            )
            .await
            .with_context(|| format!("failed to set info '{key}'"))?;
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<String> {
        self.runs
            .update_one(
                doc! { "_id": self.run_id.clone() },
                doc! { "$set": { "status": "COMPLETED", "stop_time": DateTime::now() } },
            )
            .await
            .context("failed to close run")?;

        let run_id = match &self.run_id {
            Bson::ObjectId(oid) => oid.to_hex(),
            other => other.to_string(),
        };
        Ok(run_id)
    }
}
