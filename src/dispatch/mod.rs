//! Raw-data dispatch: local copies and object-store uploads

pub mod manifest;
pub mod saver;

pub use manifest::{format_size, DestinationReport, FileOutcome, TransferManifest};
pub use saver::dispatch;

use serde::Deserialize;

/// Where the raw-data files should go. The two destinations are independent:
/// both, either, or neither may be requested.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DispatchOptions {
    pub save_locally: bool,
    pub send_minio: bool,
    pub local_path: String,
}
