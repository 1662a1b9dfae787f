//! File format detection and tabular readers

pub mod delimited;
pub mod sheet;
pub mod table;

pub use table::{read_table, FileFormat, Table};

use crate::error::{Result, SubmitError};

/// Configuration for delimited file reading (CSV and friends)
#[derive(Debug, Clone)]
pub struct DelimitedConfig {
    pub delimiter: u8,
    pub has_header: bool,
}

impl DelimitedConfig {
    /// Build from the separator string carried by a selector.
    ///
    /// The UI passes the literal two-character escape `\t` for tabs; an empty
    /// separator falls back to a comma. Only the first byte of anything else
    /// is used.
    pub fn from_separator(sep: &str, has_header: bool) -> Self {
        let delimiter = if sep == "\\t" {
            b'\t'
        } else {
            sep.as_bytes().first().copied().unwrap_or(b',')
        };
        Self {
            delimiter,
            has_header,
        }
    }
}

impl Default for DelimitedConfig {
    fn default() -> Self {
        Self {
            delimiter: b',',
            has_header: true,
        }
    }
}

/// Configuration for spreadsheet reading (XLSX/XLSM)
#[derive(Debug, Clone, Default)]
pub struct SheetConfig {
    /// Target sheet; `None` reads the first sheet in the workbook.
    pub sheet: Option<String>,
    pub has_header: bool,
}

/// Extension-level format classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatKind {
    Csv,
    Sheet,
    Json,
}

impl FormatKind {
    /// Classify a file name by its extension. Anything other than
    /// json/csv/xlsx/xlsm is unsupported.
    pub fn detect(file_name: &str) -> Result<Self> {
        let extension = file_name
            .rsplit('.')
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match extension.as_str() {
            "csv" => Ok(FormatKind::Csv),
            "xlsx" | "xlsm" => Ok(FormatKind::Sheet),
            "json" => Ok(FormatKind::Json),
            _ => Err(SubmitError::UnsupportedFormat { extension }),
        }
    }
}
