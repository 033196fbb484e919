//! Storage Abstraction
//!
//! Key/value object storage for uploaded photos. Keys are flat, generated
//! names; backends never see caller-supplied paths.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("File not found: {0}")]
    NotFound(String),
    #[error("File already exists: {0}")]
    AlreadyExists(String),
    #[error("Invalid path: {0}")]
    InvalidPath(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Metadata computed when an object is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    /// Size in bytes
    pub size: u64,
    /// SHA256 digest, hex encoded
    pub digest: String,
}

impl FileMetadata {
    fn for_data(data: &[u8]) -> Self {
        Self {
            size: data.len() as u64,
            digest: calculate_digest(data),
        }
    }
}

/// Backend holding photo objects under flat keys
#[async_trait]
pub trait Storage: Send + Sync {
    /// Store data under a new key. Fails with `AlreadyExists` rather than
    /// replacing an existing object.
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<FileMetadata>;

    /// Retrieve data by key
    async fn get(&self, key: &str) -> StorageResult<Bytes>;

    /// Delete data by key; deleting a missing key is not an error
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Check if key exists
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Verify the backend currently accepts writes
    async fn probe(&self) -> StorageResult<()>;

    /// Backend name reported in logs and health checks
    fn name(&self) -> &str;
}

/// Reject keys that could address anything outside the storage root
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty()
        || key == "."
        || key.contains("..")
        || key.contains('/')
        || key.contains('\\')
        || key.contains('\0')
        || Path::new(key).is_absolute()
    {
        return Err(StorageError::InvalidPath(key.to_string()));
    }
    Ok(())
}

/// Photos kept as files directly under one cache directory
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    /// Create a storage rooted at an existing directory
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Create a storage, creating the root directory if absent
    pub fn open(root: impl AsRef<Path>) -> std::io::Result<Self> {
        std::fs::create_dir_all(root.as_ref())?;
        Ok(Self::new(root))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a key to a full path inside the root
    fn resolve_path(&self, key: &str) -> StorageResult<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl Storage for LocalStorage {
    #[instrument(skip(self, data), fields(storage = "local"))]
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<FileMetadata> {
        let path = self.resolve_path(key)?;

        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(StorageError::AlreadyExists(key.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        let written = async {
            file.write_all(&data).await?;
            file.sync_all().await
        }
        .await;
        drop(file);
        remove_on_error(&path, written).await?;

        let metadata = FileMetadata::for_data(&data);
        debug!(path = ?path, size = metadata.size, "File stored");
        Ok(metadata)
    }

    #[instrument(skip(self), fields(storage = "local"))]
    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        let path = self.resolve_path(key)?;

        match fs::read(&path).await {
            Ok(buffer) => Ok(Bytes::from(buffer)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self), fields(storage = "local"))]
    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.resolve_path(key)?;

        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = ?path, "File deleted");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.resolve_path(key)?;
        Ok(fs::try_exists(&path).await?)
    }

    async fn probe(&self) -> StorageResult<()> {
        let path = self.root.join(format!(".probe-{}", Uuid::new_v4()));
        fs::write(&path, b"ok").await?;
        fs::remove_file(&path).await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "local"
    }
}

/// Remove a partially written file so a failed put leaves nothing behind
async fn remove_on_error<T>(path: &Path, result: std::io::Result<T>) -> std::io::Result<T> {
    if result.is_err() {
        if let Err(e) = fs::remove_file(path).await {
            warn!(path = ?path, error = %e, "Failed to remove partially written file");
        }
    }
    result
}

/// Photo objects held in a map, for tests
pub struct MemoryStorage {
    files: tokio::sync::RwLock<std::collections::HashMap<String, Bytes>>,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            files: tokio::sync::RwLock::new(std::collections::HashMap::new()),
        }
    }

    /// Number of stored objects
    pub async fn len(&self) -> usize {
        self.files.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.files.read().await.is_empty()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<FileMetadata> {
        validate_key(key)?;
        let metadata = FileMetadata::for_data(&data);

        let mut files = self.files.write().await;
        if files.contains_key(key) {
            return Err(StorageError::AlreadyExists(key.to_string()));
        }
        files.insert(key.to_string(), data);

        Ok(metadata)
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        validate_key(key)?;
        let files = self.files.read().await;
        files
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        validate_key(key)?;
        let mut files = self.files.write().await;
        files.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        validate_key(key)?;
        let files = self.files.read().await;
        Ok(files.contains_key(key))
    }

    async fn probe(&self) -> StorageResult<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Calculate SHA256 digest
pub fn calculate_digest(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Fresh storage key for an upload
///
/// The extension of the uploaded name is kept only when it is short and
/// alphanumeric.
pub fn generate_disk_filename(filename: Option<&str>) -> String {
    let uuid = Uuid::new_v4();
    let ext = filename
        .and_then(|name| Path::new(name).extension())
        .and_then(|s| s.to_str())
        .filter(|ext| ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| ext.to_ascii_lowercase());

    match ext {
        Some(ext) if !ext.is_empty() => format!("{}.{}", uuid, ext),
        _ => uuid.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_storage_put_get() {
        let storage = MemoryStorage::new();
        let data = Bytes::from("Hello, World!");

        let meta = storage.put("test.jpg", data.clone()).await.unwrap();
        assert_eq!(meta.size, 13);
        assert_eq!(meta.digest, calculate_digest(b"Hello, World!"));

        let retrieved = storage.get("test.jpg").await.unwrap();
        assert_eq!(retrieved, data);
    }

    #[tokio::test]
    async fn test_memory_storage_never_overwrites() {
        let storage = MemoryStorage::new();
        storage.put("a.png", Bytes::from("first")).await.unwrap();

        let result = storage.put("a.png", Bytes::from("second")).await;
        assert!(matches!(result, Err(StorageError::AlreadyExists(_))));
        assert_eq!(storage.get("a.png").await.unwrap(), Bytes::from("first"));
    }

    #[tokio::test]
    async fn test_memory_storage_delete() {
        let storage = MemoryStorage::new();
        storage.put("test.jpg", Bytes::from("x")).await.unwrap();
        assert!(storage.exists("test.jpg").await.unwrap());

        storage.delete("test.jpg").await.unwrap();
        assert!(!storage.exists("test.jpg").await.unwrap());
        storage.delete("test.jpg").await.unwrap();
    }

    #[tokio::test]
    async fn test_memory_storage_not_found() {
        let storage = MemoryStorage::new();

        let result = storage.get("nonexistent.jpg").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_local_storage_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::open(dir.path().join("nested/cache")).unwrap();
        assert!(storage.root().is_dir());

        let data = Bytes::from_static(&[0xff, 0xd8, 0xff, 0xe0, 0x00]);
        storage.put("photo.jpg", data.clone()).await.unwrap();
        assert!(storage.exists("photo.jpg").await.unwrap());
        assert_eq!(storage.get("photo.jpg").await.unwrap(), data);

        let again = storage.put("photo.jpg", Bytes::from("other")).await;
        assert!(matches!(again, Err(StorageError::AlreadyExists(_))));

        storage.delete("photo.jpg").await.unwrap();
        assert!(!storage.exists("photo.jpg").await.unwrap());
        assert!(matches!(
            storage.get("photo.jpg").await,
            Err(StorageError::NotFound(_))
        ));
        storage.probe().await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_write_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.jpg");

        std::fs::write(&path, b"half").unwrap();
        let failed: std::io::Result<()> =
            Err(std::io::Error::new(ErrorKind::Other, "disk full"));
        assert!(remove_on_error(&path, failed).await.is_err());
        assert!(!path.exists());

        std::fs::write(&path, b"whole").unwrap();
        remove_on_error(&path, Ok(())).await.unwrap();
        assert!(path.is_file());
    }

    #[tokio::test]
    async fn test_local_storage_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());

        for key in ["../../../etc/passwd", "/etc/passwd", "a/b.jpg", "..\\x", "", ".."] {
            let result = storage.get(key).await;
            assert!(
                matches!(result, Err(StorageError::InvalidPath(_))),
                "key {:?} should be rejected",
                key
            );
        }
    }

    #[test]
    fn test_generate_disk_filename() {
        let filename = generate_disk_filename(Some("drill.JPG"));
        assert!(filename.ends_with(".jpg"));
        assert!(validate_key(&filename).is_ok());

        let no_ext = generate_disk_filename(Some("noext"));
        assert!(!no_ext.contains('.'));

        let odd = generate_disk_filename(Some("evil.j/pg"));
        assert!(!odd.contains('/'));

        assert_ne!(generate_disk_filename(None), generate_disk_filename(None));
    }
}
