//! Storage abstraction for the pipeline's working tree
//!
//! All paths are relative, `/`-separated keys inside the tree
//! (`OEBPS/Text/f0.xhtml`).

use crate::error::StorageError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Abstract storage provider trait
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Read data from the given path
    async fn read(&self, path: &str) -> StorageResult<Vec<u8>>;

    /// Write data to the given path, creating parent directories
    async fn write(&self, path: &str, data: Vec<u8>) -> StorageResult<()>;

    /// Delete data at the given path
    async fn delete(&self, path: &str) -> StorageResult<()>;

    /// Move a file, creating the destination's parent directories
    async fn rename(&self, from: &str, to: &str) -> StorageResult<()>;

    /// List every file under the given prefix, recursively, sorted by path
    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// Check if a path exists
    async fn exists(&self, path: &str) -> StorageResult<bool>;

    /// Read a file as UTF-8 text, replacing invalid sequences
    async fn read_text(&self, path: &str) -> StorageResult<String> {
        let data = self.read(path).await?;
        Ok(String::from_utf8_lossy(&data).into_owned())
    }

    /// Write UTF-8 text
    async fn write_text(&self, path: &str, content: &str) -> StorageResult<()> {
        self.write(path, content.as_bytes().to_vec()).await
    }
}

/// Local filesystem storage provider
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    /// Create a new local storage provider with the given root directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Safely resolve a path, preventing path traversal attacks
    fn full_path(&self, path: &str) -> StorageResult<PathBuf> {
        let mut normalized = PathBuf::new();
        for component in Path::new(path).components() {
            match component {
                Component::Normal(c) => normalized.push(c),
                Component::CurDir => {}
                Component::ParentDir | Component::Prefix(_) | Component::RootDir => {
                    return Err(StorageError::BackendError(format!(
                        "Path traversal attempt detected: {path}"
                    )));
                }
            }
        }

        Ok(self.root.join(normalized))
    }

    async fn ensure_parent(path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl StorageProvider for LocalStorage {
    async fn read(&self, path: &str) -> StorageResult<Vec<u8>> {
        let full_path = self.full_path(path)?;
        Ok(tokio::fs::read(full_path).await?)
    }

    async fn write(&self, path: &str, data: Vec<u8>) -> StorageResult<()> {
        let full_path = self.full_path(path)?;
        Self::ensure_parent(&full_path).await?;
        Ok(tokio::fs::write(full_path, data).await?)
    }

    async fn delete(&self, path: &str) -> StorageResult<()> {
        let full_path = self.full_path(path)?;
        Ok(tokio::fs::remove_file(full_path).await?)
    }

    async fn rename(&self, from: &str, to: &str) -> StorageResult<()> {
        let source = self.full_path(from)?;
        let target = self.full_path(to)?;
        Self::ensure_parent(&target).await?;
        Ok(tokio::fs::rename(source, target).await?)
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let start = self.full_path(prefix)?;
        let mut entries = Vec::new();
        if !tokio::fs::try_exists(&start).await? {
            return Ok(entries);
        }

        let mut pending = vec![start];
        while let Some(dir) = pending.pop() {
            let mut read_dir = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = read_dir.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                    continue;
                }
                let Ok(relative) = path.strip_prefix(&self.root) else {
                    continue;
                };
                let key = relative
                    .components()
                    .filter_map(|c| c.as_os_str().to_str())
                    .collect::<Vec<_>>()
                    .join("/");
                entries.push(key);
            }
        }

        entries.sort();
        Ok(entries)
    }

    async fn exists(&self, path: &str) -> StorageResult<bool> {
        let full_path = self.full_path(path)?;
        Ok(tokio::fs::try_exists(full_path).await?)
    }
}

/// In-memory storage provider
#[derive(Default)]
pub struct MemoryStorage {
    data: std::sync::RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> StorageError {
        StorageError::BackendError("memory storage lock poisoned".to_string())
    }
}

#[async_trait]
impl StorageProvider for MemoryStorage {
    async fn read(&self, path: &str) -> StorageResult<Vec<u8>> {
        self.data
            .read()
            .map_err(|_| Self::poisoned())?
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    async fn write(&self, path: &str, data: Vec<u8>) -> StorageResult<()> {
        self.data
            .write()
            .map_err(|_| Self::poisoned())?
            .insert(path.to_string(), data);
        Ok(())
    }

    async fn delete(&self, path: &str) -> StorageResult<()> {
        self.data
            .write()
            .map_err(|_| Self::poisoned())?
            .remove(path)
            .ok_or_else(|| StorageError::NotFound(path.to_string()))?;
        Ok(())
    }

    async fn rename(&self, from: &str, to: &str) -> StorageResult<()> {
        let mut data = self.data.write().map_err(|_| Self::poisoned())?;
        let bytes = data
            .remove(from)
            .ok_or_else(|| StorageError::NotFound(from.to_string()))?;
        data.insert(to.to_string(), bytes);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        // BTreeMap keys are already sorted
        Ok(self
            .data
            .read()
            .map_err(|_| Self::poisoned())?
            .keys()
            .filter(|k| prefix.is_empty() || k.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn exists(&self, path: &str) -> StorageResult<bool> {
        Ok(self
            .data
            .read()
            .map_err(|_| Self::poisoned())?
            .contains_key(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_storage() {
        let storage = MemoryStorage::new();

        storage.write("test.txt", b"hello".to_vec()).await.unwrap();

        let data = storage.read("test.txt").await.unwrap();
        assert_eq!(data, b"hello");

        assert!(storage.exists("test.txt").await.unwrap());
        assert!(!storage.exists("missing.txt").await.unwrap());

        storage.rename("test.txt", "dir/moved.txt").await.unwrap();
        assert!(!storage.exists("test.txt").await.unwrap());
        assert_eq!(storage.read_text("dir/moved.txt").await.unwrap(), "hello");

        storage.delete("dir/moved.txt").await.unwrap();
        assert!(!storage.exists("dir/moved.txt").await.unwrap());
    }

    #[tokio::test]
    async fn test_memory_list_is_sorted_and_prefixed() {
        let storage = MemoryStorage::new();
        for path in ["b/2.txt", "a/1.txt", "b/1.txt"] {
            storage.write_text(path, "x").await.unwrap();
        }

        assert_eq!(
            storage.list("").await.unwrap(),
            vec!["a/1.txt", "b/1.txt", "b/2.txt"]
        );
        assert_eq!(storage.list("b/").await.unwrap(), vec!["b/1.txt", "b/2.txt"]);
    }

    #[tokio::test]
    async fn test_local_storage_recursive_list() {
        let dir = tempfile::TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());

        storage.write_text("OEBPS/Text/a.xhtml", "a").await.unwrap();
        storage.write_text("mimetype", "application/epub+zip").await.unwrap();
        storage
            .rename("OEBPS/Text/a.xhtml", "OEBPS/Text/f0.xhtml")
            .await
            .unwrap();

        assert_eq!(
            storage.list("").await.unwrap(),
            vec!["OEBPS/Text/f0.xhtml", "mimetype"]
        );
        assert!(storage.list("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_local_storage_rejects_traversal() {
        let dir = tempfile::TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());

        let result = storage.write_text("../escape.txt", "x").await;
        assert!(matches!(result, Err(StorageError::BackendError(_))));
    }
}
