//! On-disk storage for uploaded data files and scripts.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use monitor_common::{
    extension_of, validate_file_name, DataFormat, FileKind, MonitorError, MonitorResult,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::StorageConfig;

const SCRIPTS_DIR: &str = "scripts";
const DATA_DIR: &str = "uploaded_data";

/// Metadata for one stored file.
#[derive(Debug, Clone, Serialize)]
pub struct StoredFile {
    pub name: String,
    pub kind: FileKind,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
    /// Detected data format; absent for scripts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<DataFormat>,
}

/// Data files found in a user-supplied directory.
#[derive(Debug, Clone, Serialize)]
pub struct DirectoryListing {
    pub path: PathBuf,
    pub files: Vec<ListedFile>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListedFile {
    pub name: String,
    pub format: DataFormat,
    pub size: u64,
}

/// Upload area rooted at a single directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    max_upload_bytes: usize,
    script_extensions: Vec<String>,
}

impl FileStore {
    /// Open the store, creating `scripts/` and `uploaded_data/` as needed.
    pub async fn open(config: &StorageConfig, script_extensions: Vec<String>) -> MonitorResult<Self> {
        tokio::fs::create_dir_all(&config.root).await?;
        let root = tokio::fs::canonicalize(&config.root).await?;

        for dir in [SCRIPTS_DIR, DATA_DIR] {
            tokio::fs::create_dir_all(root.join(dir)).await?;
        }

        info!(root = %root.display(), "Opened file store");
        Ok(Self {
            root,
            max_upload_bytes: config.max_upload_bytes,
            script_extensions,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// Directory holding files of `kind`.
    pub fn dir(&self, kind: FileKind) -> PathBuf {
        match kind {
            FileKind::Data => self.root.join(DATA_DIR),
            FileKind::Script => self.root.join(SCRIPTS_DIR),
        }
    }

    /// Validate and write an upload. An existing file with the same name is replaced.
    pub async fn save(&self, kind: FileKind, name: &str, bytes: &[u8]) -> MonitorResult<StoredFile> {
        let name = validate_file_name(name)?;
        let extension = extension_of(name).unwrap_or_default();
        if !kind.accepts(extension, &self.script_extensions) {
            return Err(MonitorError::UnsupportedExtension {
                kind: kind.to_string(),
                extension: extension.to_string(),
            });
        }
        if bytes.len() > self.max_upload_bytes {
            return Err(MonitorError::UploadTooLarge {
                limit: self.max_upload_bytes,
            });
        }

        let path = self.dir(kind).join(name);
        tokio::fs::write(&path, bytes).await?;
        info!(kind = %kind, file = %name, size = bytes.len(), "Stored upload");

        stored_file(kind, name, &path).await
    }

    /// Regular files of `kind`, sorted by name.
    pub async fn list(&self, kind: FileKind) -> MonitorResult<Vec<StoredFile>> {
        let mut entries = tokio::fs::read_dir(self.dir(kind)).await?;
        let mut files = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if name.starts_with('.') || !entry.file_type().await?.is_file() {
                continue;
            }
            files.push(stored_file(kind, &name, &entry.path()).await?);
        }

        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    pub async fn delete(&self, kind: FileKind, name: &str) -> MonitorResult<()> {
        let path = self.resolve(kind, name).await?;
        tokio::fs::remove_file(&path).await?;
        info!(kind = %kind, file = %name, "Deleted file");
        Ok(())
    }

    /// Path of an existing stored file.
    pub async fn resolve(&self, kind: FileKind, name: &str) -> MonitorResult<PathBuf> {
        let not_found = || MonitorError::NotFound(format!("{} {} not found.", kind.label(), name));

        let name = validate_file_name(name).map_err(|_| not_found())?;
        let path = self.dir(kind).join(name);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(path),
            Ok(_) => Err(not_found()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(not_found()),
            Err(e) => Err(e.into()),
        }
    }

    /// Check a user-supplied directory and list the data files directly inside it.
    pub async fn validate_directory(&self, path: &Path) -> MonitorResult<DirectoryListing> {
        let meta = match tokio::fs::metadata(path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(MonitorError::NotFound(format!(
                    "Directory {} does not exist.",
                    path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };
        if !meta.is_dir() {
            return Err(MonitorError::NotADirectory(path.display().to_string()));
        }

        let path = tokio::fs::canonicalize(path).await?;
        let mut entries = tokio::fs::read_dir(&path).await?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let entry_path = entry.path();
            let Some(format) = DataFormat::from_path(&entry_path) else {
                continue;
            };
            let meta = entry.metadata().await?;
            if !meta.is_file() {
                continue;
            }
            files.push(ListedFile {
                name: entry.file_name().to_string_lossy().into_owned(),
                format,
                size: meta.len(),
            });
        }
        files.sort_by(|a, b| a.name.cmp(&b.name));

        debug!(path = %path.display(), files = files.len(), "Validated directory");
        Ok(DirectoryListing { path, files })
    }
}

async fn stored_file(kind: FileKind, name: &str, path: &Path) -> MonitorResult<StoredFile> {
    let meta = tokio::fs::metadata(path).await?;
    let format = match kind {
        FileKind::Data => DataFormat::from_path(path),
        FileKind::Script => None,
    };
    Ok(StoredFile {
        name: name.to_string(),
        kind,
        size: meta.len(),
        modified: meta.modified().ok().map(DateTime::<Utc>::from),
        format,
    })
}
