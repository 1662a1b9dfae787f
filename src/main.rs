use clap::{Parser, Subcommand};
use labsend::prefs::{default_prefs_path, KeyringSecretStore, Preferences, SecretStore};
use labsend::runner::{check_connections, run_submission, SubmissionRequest};
use labsend::uid;
use serde_json::json;
use std::path::{Path, PathBuf};

#[derive(Parser, Clone)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Subcommand)]
enum Command {
    /// Submit one or more experiment folders to the metadata store
    Submit {
        /// Path to the submission request payload (JSON)
        payload: PathBuf,

        /// Verify store connections and show the plan without submitting
        #[arg(long)]
        dry_run: bool,

        /// Quiet mode - minimal output, only show summary
        #[arg(short, long)]
        quiet: bool,
    },

    /// Derive or verify the short identifier for an experiment name
    Uid {
        /// Experiment name (a timestamp must be present in it)
        name: String,

        /// Check the given identifier against the name instead of deriving
        #[arg(long)]
        verify: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    match args.command {
        Command::Submit {
            payload,
            dry_run,
            quiet,
        } => run_submit(payload, dry_run, quiet).await?,
        Command::Uid { name, verify } => run_uid(&name, verify.as_deref())?,
    }
    Ok(())
}

async fn run_submit(payload: PathBuf, dry_run: bool, quiet: bool) -> anyhow::Result<()> {
    // Initialize tracing based on quiet mode
    use tracing_subscriber::{EnvFilter, FmtSubscriber};
    let filter = if quiet {
        EnvFilter::new("labsend=warn")
    } else {
        EnvFilter::new("labsend=info")
    };
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    let raw = std::fs::read_to_string(&payload)
        .map_err(|e| anyhow::anyhow!("Could not read payload '{}': {}", payload.display(), e))?;
    let mut request: SubmissionRequest = serde_json::from_str(&raw)
        .map_err(|e| anyhow::anyhow!("Invalid payload '{}': {}", payload.display(), e))?;

    let prefs_path = default_prefs_path();
    fill_connection_defaults(&mut request, &Preferences::load(&prefs_path));
    fill_secrets(&mut request);

    if !quiet {
        println!("Experiment Submission");
        println!("=====================");
        println!("Experiment: {}", request.experiment.name);
        println!("Folders: {}", request.experiment.folders.len());
        for folder in &request.experiment.folders {
            println!("  {}", folder.display());
        }
        println!();
    }

    if dry_run {
        println!("DRY RUN MODE - Nothing will be submitted");
        check_connections(&request).await?;
        println!("Stores reachable. To execute, run without --dry-run");
        return Ok(());
    }

    let result = run_submission(&request).await?;

    println!();
    println!("Submission Summary");
    println!("==================");
    for outcome in &result.per_folder {
        let status = if outcome.ok { "ok" } else { "FAILED" };
        println!("  [{status}] {}: {}", outcome.folder, outcome.message);
    }
    if result.ok {
        println!("All {} folders submitted", result.per_folder.len());
        // Next submission can omit the connection fields
        if let Err(e) = remember_connection(&request, &prefs_path) {
            eprintln!("Warning: could not save preferences: {e}");
        }
        Ok(())
    } else {
        Err(anyhow::anyhow!("Submission finished with failures"))
    }
}

/// Fill blank connection fields from the saved preferences, so a payload
/// only needs to carry what differs from the last successful submission.
fn fill_connection_defaults(request: &mut SubmissionRequest, prefs: &Preferences) {
    fn fill(field: &mut String, prefs: &Preferences, key: &str) {
        if field.is_empty() {
            if let Some(saved) = prefs.get_str(key) {
                *field = saved.to_string();
            }
        }
    }
    if !request.mongo.use_uri {
        fill(&mut request.mongo.host, prefs, "mongo_host");
        fill(&mut request.mongo.port, prefs, "mongo_port");
        fill(&mut request.mongo.user, prefs, "mongo_user");
        fill(&mut request.mongo.db, prefs, "mongo_db");
    }
    fill(&mut request.minio.endpoint, prefs, "minio_endpoint");
    fill(&mut request.minio.access_key, prefs, "minio_access_key");
    fill(&mut request.minio.bucket, prefs, "minio_bucket");
}

/// Persist the non-secret connection settings. Passwords and secret keys
/// stay in the keyring; `Preferences::save` strips them anyway.
fn remember_connection(request: &SubmissionRequest, path: &Path) -> anyhow::Result<()> {
    let mut prefs = Preferences::load(path);
    if !request.mongo.use_uri {
        prefs.set("mongo_host", json!(request.mongo.host));
        prefs.set("mongo_port", json!(request.mongo.port));
        prefs.set("mongo_user", json!(request.mongo.user));
        prefs.set("mongo_db", json!(request.mongo.db));
    }
    if !request.minio.endpoint.is_empty() {
        prefs.set("minio_endpoint", json!(request.minio.endpoint));
        prefs.set("minio_access_key", json!(request.minio.access_key));
        prefs.set("minio_bucket", json!(request.minio.bucket));
    }
    prefs.save(path)
}

/// Blank credentials in the payload are filled from the platform keyring, so
/// payload files shared between machines never need to carry secrets.
fn fill_secrets(request: &mut SubmissionRequest) {
    let keyring = KeyringSecretStore;
    if !request.mongo.use_uri && request.mongo.password.is_empty() {
        if let Ok(Some(secret)) = keyring.get("mongo", &request.mongo.user) {
            request.mongo.password = secret;
        }
    }
    if request.minio.secret_key.is_empty() {
        if let Ok(Some(secret)) = keyring.get("minio", &request.minio.access_key) {
            request.minio.secret_key = secret;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn request_from(payload: &str) -> SubmissionRequest {
        serde_json::from_str(payload).unwrap()
    }

    #[test]
    fn test_fill_connection_defaults_only_blank_fields() {
        let mut prefs = Preferences::default();
        prefs.set("mongo_host", json!("db.example.org"));
        prefs.set("mongo_port", json!("27018"));
        prefs.set("minio_endpoint", json!("minio.local:9000"));

        let mut request = request_from(
            r#"{"mongo": {"host": "explicit-host"}, "experiment": {}}"#,
        );
        fill_connection_defaults(&mut request, &prefs);

        // Explicit payload values win; blanks come from preferences
        assert_eq!(request.mongo.host, "explicit-host");
        assert_eq!(request.mongo.port, "27018");
        assert_eq!(request.minio.endpoint, "minio.local:9000");
    }

    #[test]
    fn test_fill_connection_defaults_skips_uri_mode() {
        let mut prefs = Preferences::default();
        prefs.set("mongo_host", json!("db.example.org"));

        let mut request = request_from(
            r#"{"mongo": {"use_uri": true, "uri": "mongodb://db/exp"}, "experiment": {}}"#,
        );
        fill_connection_defaults(&mut request, &prefs);
        assert_eq!(request.mongo.host, "");
    }

    #[test]
    fn test_remember_connection_round_trip_without_secrets() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prefs.json");

        let request = request_from(
            r#"{
                "mongo": {"host": "db.example.org", "user": "alice", "password": "hunter2"},
                "minio": {"endpoint": "minio.local:9000", "access_key": "ak", "secret_key": "sk", "bucket": "experiments"},
                "experiment": {}
            }"#,
        );
        remember_connection(&request, &path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("hunter2"));
        assert!(!raw.contains("sk"));

        let reloaded = Preferences::load(&path);
        assert_eq!(reloaded.get_str("mongo_host"), Some("db.example.org"));
        assert_eq!(reloaded.get_str("minio_bucket"), Some("experiments"));

        // A fresh blank request picks the saved settings back up
        let mut next = request_from(r#"{"mongo": {}, "experiment": {}}"#);
        fill_connection_defaults(&mut next, &reloaded);
        assert_eq!(next.mongo.host, "db.example.org");
        assert_eq!(next.minio.endpoint, "minio.local:9000");
    }
}

fn run_uid(name: &str, verify: Option<&str>) -> anyhow::Result<()> {
    match verify {
        Some(candidate) => {
            if uid::verify(name, candidate) {
                println!("{candidate} matches '{name}'");
                Ok(())
            } else {
                Err(anyhow::anyhow!("'{candidate}' does not match '{name}'"))
            }
        }
        None => {
            let derived = uid::derive_uid(name)?;
            println!("{derived}");
            Ok(())
        }
    }
}
