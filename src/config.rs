//! Configuration constants for the submission pipeline
//!
//! This module centralizes all tunable parameters and constants used throughout
//! the application.

use std::time::Duration;

// ============================================================================
// Metadata Store Configuration
// ============================================================================

/// Server-selection timeout for the metadata store connection
///
/// Kept short because the submission UI expects a fast "can I reach Mongo?"
/// answer before any folder is processed; a 4s bound keeps a typo'd host from
/// hanging the whole submission.
pub const STORE_SELECTION_TIMEOUT: Duration = Duration::from_secs(4);

// ============================================================================
// Identifier Configuration
// ============================================================================

/// Number of base-32 characters kept from the 64-bit name hash
///
/// Seven characters give 35 bits of the digest, which keeps collision
/// probability around 2^-35 across a submitted file set. Uniqueness is only
/// required per submission, not globally.
pub const UID_SHORT_LEN: usize = 7;

// ============================================================================
// Object Store Configuration
// ============================================================================

/// Key prefix for the zero-byte write-probe object
pub const PROBE_KEY_PREFIX: &str = ".probe_";

/// Region name handed to the S3 client; MinIO ignores it but the SDK
/// requires one for request signing.
pub const OBJECT_STORE_REGION: &str = "us-east-1";

// ============================================================================
// Preferences Configuration
// ============================================================================

/// Service name used for keyring entries
pub const KEYRING_SERVICE: &str = "labsend";

/// File name of the non-secret preference store, placed in the home directory
pub const PREFS_FILE_NAME: &str = ".labsend_config.json";
