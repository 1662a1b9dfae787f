//! Object-store client over the S3 API (MinIO-compatible)

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use serde::Deserialize;
use uuid::Uuid;

use crate::config::{OBJECT_STORE_REGION, PROBE_KEY_PREFIX};
use crate::error::SubmitError;

/// Connection spec for the object store.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ObjectStoreSpec {
    /// Host[:port], with or without an http/https scheme.
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    pub tls: bool,
}

impl ObjectStoreSpec {
    /// All four fields must be non-blank before any upload is attempted.
    pub fn validate(&self) -> Result<(), SubmitError> {
        if self.endpoint.trim().is_empty() {
            return Err(SubmitError::MissingCredentials("endpoint"));
        }
        if self.access_key.trim().is_empty() {
            return Err(SubmitError::MissingCredentials("access key"));
        }
        if self.secret_key.trim().is_empty() {
            return Err(SubmitError::MissingCredentials("secret key"));
        }
        if self.bucket.trim().is_empty() {
            return Err(SubmitError::MissingCredentials("bucket"));
        }
        Ok(())
    }

    /// Endpoint with a scheme: an explicit http/https prefix is kept,
    /// otherwise one is derived from the TLS flag.
    pub fn endpoint_url(&self) -> String {
        let endpoint = self.endpoint.trim();
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else if self.tls {
            format!("https://{endpoint}")
        } else {
            format!("http://{endpoint}")
        }
    }
}

/// Narrow interface the dispatcher uses; implementations are injected so the
/// pipeline can be tested without a live bucket.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    fn bucket(&self) -> &str;

    /// Check that the bucket exists and the credentials can reach it.
    async fn verify_bucket(&self) -> Result<()>;

    /// Upload one local file under the given key.
    async fn upload(&self, local_path: &Path, key: &str) -> Result<()>;

    /// Zero-byte put + best-effort delete; connectivity testing only.
    async fn probe_write(&self) -> Result<()>;
}

/// S3-backed implementation, pointed at MinIO via a custom endpoint with
/// path-style addressing.
pub struct S3ObjectStore {
    client: S3Client,
    bucket: String,
}

impl S3ObjectStore {
    pub fn connect(spec: &ObjectStoreSpec) -> Result<Self, SubmitError> {
        spec.validate()?;

        let credentials = Credentials::new(
            spec.access_key.trim(),
            spec.secret_key.trim(),
            None,
            None,
            "labsend",
        );
        let config = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(OBJECT_STORE_REGION))
            .endpoint_url(spec.endpoint_url())
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: S3Client::from_conf(config),
            bucket: spec.bucket.trim().to_string(),
        })
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn verify_bucket(&self) -> Result<()> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .with_context(|| format!("bucket '{}' not accessible", self.bucket))?;
        Ok(())
    }

    async fn upload(&self, local_path: &Path, key: &str) -> Result<()> {
        let body = ByteStream::from_path(local_path)
            .await
            .with_context(|| format!("failed to open {}", local_path.display()))?;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .with_context(|| format!("failed to upload '{key}'"))?;
        Ok(())
    }

    async fn probe_write(&self) -> Result<()> {
        let probe_key = format!("{PROBE_KEY_PREFIX}{}", Uuid::new_v4().simple());
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&probe_key)
            .body(ByteStream::from_static(b""))
            .send()
            .await
            .with_context(|| format!("cannot write to bucket '{}'", self.bucket))?;
        // Best-effort cleanup; a leftover probe object is harmless
        let _ = self
            .client
            .delete_object()
            .bucket(&self.bucket)
            .key(&probe_key)
            .send()
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_reports_first_blank_field() {
        let mut spec = ObjectStoreSpec {
            endpoint: "minio.local:9000".to_string(),
            access_key: "ak".to_string(),
            secret_key: "sk".to_string(),
            bucket: "experiments".to_string(),
            tls: false,
        };
        assert!(spec.validate().is_ok());

        spec.secret_key = "  ".to_string();
        match spec.validate().unwrap_err() {
            SubmitError::MissingCredentials(field) => assert_eq!(field, "secret key"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_endpoint_url_scheme() {
        let mut spec = ObjectStoreSpec {
            endpoint: "minio.local:9000".to_string(),
            ..ObjectStoreSpec::default()
        };
        assert_eq!(spec.endpoint_url(), "http://minio.local:9000");

        spec.tls = true;
        assert_eq!(spec.endpoint_url(), "https://minio.local:9000");

        spec.endpoint = "http://already.scheme:9000".to_string();
        assert_eq!(spec.endpoint_url(), "http://already.scheme:9000");
    }
}
