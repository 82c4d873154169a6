// # File State Store
//
// File-based implementation of StateStore with crash recovery.
//
// ## Layout
//
// One pretty-printed JSON document per monitored domain, `<dir>/<domain>.json`:
//
// ```json
// {
//   "records": [
//     { "type": "MX", "name": "example.com.", "value": "10 mail.example.com.", "ttl": 300 }
//   ]
// }
// ```
//
// ## Crash Recovery
//
// - Atomic writes: the document is written to `<domain>.json.tmp`, then renamed
// - Backup: the previous document is copied to `<domain>.json.backup` before the rename
// - Recovery: a document that fails to parse is replaced by its backup when the backup parses

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::Error;
use crate::config::StateStoreConfig;
use crate::record::Snapshot;
use crate::traits::state_store::{StateStore, StateStoreFactory};

/// File-based state store
///
/// The state directory is created on the first save.
///
/// # Example
///
/// ```rust,no_run
/// use dnsmon_core::state::FileStateStore;
/// use dnsmon_core::traits::StateStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileStateStore::new("/var/lib/dnsmon");
///     let previous = store.load("example.com").await?;
///     store.save("example.com", &previous).await?;
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct FileStateStore {
    dir: PathBuf,
}

/// Outcome of reading one document
enum Read {
    Missing,
    Parsed(Snapshot),
    Corrupt(Error),
}

impl FileStateStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the document for `domain`
    pub fn document_path(&self, domain: &str) -> Result<PathBuf, Error> {
        if domain.is_empty()
            || domain.contains(['/', '\\'])
            || domain == "."
            || domain == ".."
        {
            return Err(Error::state_store(format!(
                "Domain '{}' cannot be used as a state file name",
                domain
            )));
        }
        Ok(self.dir.join(format!("{domain}.json")))
    }

    fn sibling(path: &Path, suffix: &str) -> PathBuf {
        let mut name = path.file_name().unwrap_or_default().to_os_string();
        name.push(suffix);
        path.with_file_name(name)
    }

    fn temp_path(path: &Path) -> PathBuf {
        Self::sibling(path, ".tmp")
    }

    fn backup_path(path: &Path) -> PathBuf {
        Self::sibling(path, ".backup")
    }

    async fn read_document(path: &Path) -> Result<Read, Error> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Read::Missing),
            Err(e) => {
                return Err(Error::state_store(format!(
                    "Failed to read state file {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        match serde_json::from_str::<Snapshot>(&content) {
            Ok(snapshot) => Ok(Read::Parsed(snapshot)),
            Err(e) => Ok(Read::Corrupt(Error::state_store(format!(
                "Failed to parse state file {}: {}",
                path.display(),
                e
            )))),
        }
    }

    async fn restore_from_backup(path: &Path, backup_path: &Path) -> Result<(), Error> {
        fs::copy(backup_path, path).await.map_err(|e| {
            Error::state_store(format!(
                "Failed to restore from backup {} to {}: {}",
                backup_path.display(),
                path.display(),
                e
            ))
        })?;
        Ok(())
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn load(&self, domain: &str) -> Result<Snapshot, Error> {
        let path = self.document_path(domain)?;

        let corruption = match Self::read_document(&path).await? {
            Read::Parsed(snapshot) => {
                tracing::debug!(
                    domain,
                    records = snapshot.len(),
                    "Loaded state from {}",
                    path.display()
                );
                return Ok(snapshot);
            }
            Read::Missing => {
                tracing::debug!(domain, "No state file at {}", path.display());
                return Ok(Snapshot::new());
            }
            Read::Corrupt(e) => e,
        };

        tracing::warn!(
            domain,
            "State file appears corrupted: {}. Attempting recovery from backup.",
            corruption
        );

        let backup_path = Self::backup_path(&path);
        match Self::read_document(&backup_path).await {
            Ok(Read::Parsed(snapshot)) => {
                tracing::info!(
                    domain,
                    records = snapshot.len(),
                    "Recovered state from backup"
                );
                if let Err(e) = Self::restore_from_backup(&path, &backup_path).await {
                    tracing::error!(domain, "Failed to restore state file from backup: {}", e);
                }
                Ok(snapshot)
            }
            Ok(Read::Missing) => Err(corruption),
            Ok(Read::Corrupt(backup_err)) => {
                tracing::error!(domain, "Backup also corrupted: {}", backup_err);
                Err(corruption)
            }
            Err(backup_err) => {
                tracing::error!(domain, "Failed to read backup: {}", backup_err);
                Err(corruption)
            }
        }
    }

    async fn save(&self, domain: &str, snapshot: &Snapshot) -> Result<(), Error> {
        let path = self.document_path(domain)?;

        fs::create_dir_all(&self.dir).await.map_err(|e| {
            Error::state_store(format!(
                "Failed to create state directory {}: {}",
                self.dir.display(),
                e
            ))
        })?;

        let json = serde_json::to_string_pretty(snapshot)
            .map_err(|e| Error::state_store(format!("Failed to serialize state: {}", e)))?;

        let temp_path = Self::temp_path(&path);
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.write_all(json.as_bytes()).await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to write to temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.sync_all().await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        // Keep the last good document around for recovery
        if let Ok(Read::Parsed(_)) = Self::read_document(&path).await {
            if let Err(e) = fs::copy(&path, Self::backup_path(&path)).await {
                tracing::warn!(domain, "Failed to create backup: {}", e);
            }
        }

        fs::rename(&temp_path, &path).await.map_err(|e| {
            Error::state_store(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                path.display(),
                e
            ))
        })?;

        tracing::trace!(domain, records = snapshot.len(), "State written to {}", path.display());
        Ok(())
    }
}

/// Factory for [`FileStateStore`]
#[derive(Debug, Default, Clone, Copy)]
pub struct FileStateStoreFactory;

impl StateStoreFactory for FileStateStoreFactory {
    fn create(&self, config: &StateStoreConfig) -> Result<Box<dyn StateStore>, Error> {
        match config {
            StateStoreConfig::File { dir } => Ok(Box::new(FileStateStore::new(dir))),
            other => Err(Error::config(format!(
                "File state store cannot be built from '{}' configuration",
                other.type_name()
            ))),
        }
    }
}
