//! Per-file transfer outcome records

use serde::Serialize;

/// Manifest describing what the dispatcher did with each file, per
/// destination. `ok` is the AND over every attempted destination.
#[derive(Debug, Clone, Serialize)]
pub struct TransferManifest {
    pub ok: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local: Option<DestinationReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minio: Option<DestinationReport>,
}

impl TransferManifest {
    /// Manifest for a dispatch call where neither destination was requested.
    pub fn nothing_requested() -> Self {
        Self {
            ok: true,
            message: "no raw-data save requested".to_string(),
            local: None,
            minio: None,
        }
    }
}

/// Outcomes for one destination (local directory or bucket), one entry per
/// input descriptor.
#[derive(Debug, Clone, Serialize)]
pub struct DestinationReport {
    /// Human description of the destination root (path or bucket).
    pub destination: String,
    pub ok: bool,
    pub message: String,
    pub files: Vec<FileOutcome>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    pub tag: String,
    pub file_name: String,
    /// Final location: `{root}/{tag}/{file_name}` rendered per destination.
    pub destination: String,
    pub size_bytes: u64,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Binary-unit human size: bytes up to 1024, then KiB/MiB/GiB.
pub fn format_size(size_bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = KIB * 1024;
    const GIB: u64 = MIB * 1024;
    if size_bytes < KIB {
        format!("{size_bytes} B")
    } else if size_bytes < MIB {
        format!("{:.2} KiB", size_bytes as f64 / KIB as f64)
    } else if size_bytes < GIB {
        format!("{:.2} MiB", size_bytes as f64 / MIB as f64)
    } else {
        format!("{:.2} GiB", size_bytes as f64 / GIB as f64)
    }
}
