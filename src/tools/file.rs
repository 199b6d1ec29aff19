use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex as AsyncMutex;
use tracing::debug;

use crate::error::ForgeError;

/// Text file access for actions
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn read(&self, path: &Path) -> Result<String>;

    /// Write `content`, replacing the file and creating parent directories.
    async fn write(&self, path: &Path, content: &str) -> Result<()>;
}

/// Local filesystem store with one async lock per path.
///
/// Agents of a round may run concurrently, so a read never observes a
/// half-written file and two writes to one path never interleave.
#[derive(Default)]
pub struct LocalFileStore {
    locks: Mutex<HashMap<PathBuf, Arc<AsyncMutex<()>>>>,
}

impl LocalFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, path: &Path) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}

fn io_error(path: &Path, source: std::io::Error) -> ForgeError {
    ForgeError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn read(&self, path: &Path) -> Result<String> {
        let lock = self.lock_for(path);
        let _guard = lock.lock().await;

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| io_error(path, e))?;
        Ok(content)
    }

    async fn write(&self, path: &Path, content: &str) -> Result<()> {
        let lock = self.lock_for(path);
        let _guard = lock.lock().await;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| io_error(parent, e))?;
            }
        }

        tokio::fs::write(path, content)
            .await
            .map_err(|e| io_error(path, e))?;
        debug!(path = %path.display(), bytes = content.len(), "wrote file");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_creates_parents_and_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/impl.cpp");
        let store = LocalFileStore::new();

        store.write(&path, "int x;").await.unwrap();
        assert_eq!(store.read(&path).await.unwrap(), "int x;");
    }

    #[tokio::test]
    async fn missing_file_is_a_typed_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new();

        let err = store.read(&dir.path().join("nope.cpp")).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ForgeError>(),
            Some(ForgeError::Io { .. })
        ));
    }

    #[tokio::test]
    async fn concurrent_writes_to_one_path_do_not_interleave() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shared.cpp");
        let store = Arc::new(LocalFileStore::new());

        let a = "a".repeat(64 * 1024);
        let b = "b".repeat(64 * 1024);
        let (ra, rb) = tokio::join!(store.write(&path, &a), store.write(&path, &b));
        ra.unwrap();
        rb.unwrap();

        let content = store.read(&path).await.unwrap();
        assert!(content == a || content == b);
    }
}
