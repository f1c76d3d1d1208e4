//! Local filesystem object store.
//!
//! Objects live at `{root}/{key}`. Keys may contain `/` to nest objects in
//! directories but can never leave `root`.

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::ports::{ObjectStore, StorageError};

/// Object store on the local filesystem.
///
/// # Atomic Writes
///
/// `put` writes `{key}.tmp`, syncs it and renames it over `{key}`, so a
/// crash never leaves a partial object behind.
///
/// # Deletes
///
/// Deleting a key that does not exist succeeds.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolves `key` below `root`, rejecting keys that would escape it.
    fn object_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && !key.ends_with(".tmp")
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));

        if !safe {
            return Err(StorageError::invalid_key(key));
        }
        Ok(self.root.join(relative))
    }

    /// Ensures the directory holding `path` exists.
    async fn ensure_parent(path: &Path) -> Result<(), StorageError> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).await.map_err(|e| {
                StorageError::io(format!(
                    "Failed to create directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, key: &str, content: &[u8], _content_type: &str) -> Result<(), StorageError> {
        let final_path = self.object_path(key)?;
        let temp_path = final_path.with_file_name(format!(
            "{}.tmp",
            final_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        ));

        Self::ensure_parent(&final_path).await?;

        let mut file = fs::File::create(&temp_path).await.map_err(|e| {
            StorageError::io(format!(
                "Failed to create temp file {}: {}",
                temp_path.display(),
                e
            ))
        })?;

        file.write_all(content).await.map_err(|e| {
            StorageError::io(format!(
                "Failed to write to temp file {}: {}",
                temp_path.display(),
                e
            ))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::io(format!(
                "Failed to sync temp file {}: {}",
                temp_path.display(),
                e
            ))
        })?;

        fs::rename(&temp_path, &final_path).await.map_err(|e| {
            StorageError::io(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                final_path.display(),
                e
            ))
        })?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.object_path(key)?;

        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
