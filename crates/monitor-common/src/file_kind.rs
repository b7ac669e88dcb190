//! Stored file kinds, data formats and upload name validation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::{MonitorError, MonitorResult};

/// Longest file name accepted for an upload, in bytes.
const MAX_FILE_NAME_LEN: usize = 255;

/// Which storage area a file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Data,
    Script,
}

impl FileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Data => "data",
            FileKind::Script => "script",
        }
    }

    /// Check whether a file extension may be uploaded as this kind.
    ///
    /// Data files must have a recognised [`DataFormat`] extension; scripts
    /// must match one of `script_extensions` (compared case-insensitively).
    pub fn accepts(&self, extension: &str, script_extensions: &[String]) -> bool {
        match self {
            FileKind::Data => DataFormat::from_extension(extension).is_some(),
            FileKind::Script => script_extensions
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(extension)),
        }
    }

    /// Capitalized label used in user-facing messages.
    pub fn label(&self) -> &'static str {
        match self {
            FileKind::Data => "Data file",
            FileKind::Script => "Script",
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Data file format, detected from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    /// Comma separated values
    Csv,
    /// Tab separated values
    Tsv,
    /// Sea-Bird CTD converted cast
    Cnv,
    /// Excel workbook (stored, not rendered)
    Excel,
    /// R serialized data (stored, not rendered)
    Rds,
    /// Delimited text with an auto-detected separator
    Text,
}

impl DataFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(DataFormat::Csv),
            "tsv" => Some(DataFormat::Tsv),
            "txt" | "dat" => Some(DataFormat::Text),
            "cnv" => Some(DataFormat::Cnv),
            "xlsx" | "xls" => Some(DataFormat::Excel),
            "rds" => Some(DataFormat::Rds),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Whether the dashboard can parse this format into a table.
    pub fn is_tabular(&self) -> bool {
        matches!(
            self,
            DataFormat::Csv | DataFormat::Tsv | DataFormat::Text | DataFormat::Cnv
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DataFormat::Csv => "csv",
            DataFormat::Tsv => "tsv",
            DataFormat::Cnv => "cnv",
            DataFormat::Excel => "excel",
            DataFormat::Rds => "rds",
            DataFormat::Text => "text",
        }
    }
}

/// Validate a client-supplied file name before it touches the filesystem.
///
/// Only bare names are accepted: no separators, no parent references and
/// no hidden files.
pub fn validate_file_name(name: &str) -> MonitorResult<&str> {
    let invalid = |reason: &str| MonitorError::InvalidFileName(format!("'{}' {}", name, reason));

    if name.is_empty() {
        return Err(MonitorError::InvalidFileName("file name is empty".to_string()));
    }
    if name.len() > MAX_FILE_NAME_LEN {
        return Err(invalid("is too long"));
    }
    if name == "." || name == ".." {
        return Err(invalid("is a directory reference"));
    }
    if name.contains(['/', '\\', '\0']) {
        return Err(invalid("contains a path separator"));
    }
    if name.starts_with('.') {
        return Err(invalid("is a hidden file"));
    }
    Ok(name)
}

/// Extension of a bare file name, without the dot.
pub fn extension_of(name: &str) -> Option<&str> {
    Path::new(name).extension().and_then(|ext| ext.to_str())
}
