use crate::models::ObjectKey;
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncRead, AsyncWriteExt, BufReader};

const PARTIAL_SUFFIX: &str = ".partial";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to create file")]
    Create(#[source] io::Error),

    #[error("Failed to save file")]
    Write(#[source] io::Error),

    #[error("Object already exists: {0}")]
    Collision(ObjectKey),

    #[error("Object not found: {0}")]
    NotFound(ObjectKey),

    #[error("Storage I/O error: {0}")]
    Io(#[from] io::Error),
}

/// A stored object opened for reading
pub struct StoredObject {
    pub reader: Box<dyn AsyncRead + Unpin + Send>,
    pub size: u64,
}

/// Flat, write-once object storage.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Streams `reader` into a new object at `key`. The object only becomes
    /// visible once the whole stream has been written. Returns bytes written.
    async fn put<'a>(
        &self,
        key: &ObjectKey,
        reader: Box<dyn AsyncRead + Unpin + Send + 'a>,
    ) -> Result<u64, StorageError>;

    async fn get(&self, key: &ObjectKey) -> Result<StoredObject, StorageError>;

    async fn exists(&self, key: &ObjectKey) -> Result<bool, StorageError>;

    /// Path of the object on local disk, for backends that have one.
    fn local_path(&self, _key: &ObjectKey) -> Option<PathBuf> {
        None
    }
}

/// Objects as plain files in a single directory
pub struct LocalObjectStore {
    root: PathBuf,
    buffer_size: usize,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>, buffer_size: usize) -> Self {
        Self {
            root: root.into(),
            buffer_size: buffer_size.max(1),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, key: &ObjectKey) -> PathBuf {
        self.root.join(key.as_str())
    }

    fn partial_path(&self, key: &ObjectKey) -> PathBuf {
        self.root.join(format!(".{}{}", key, PARTIAL_SUFFIX))
    }

    /// Removes partial files left behind by interrupted writes. Returns how many were removed.
    pub async fn sweep_partials(&self) -> Result<usize, StorageError> {
        let mut removed = 0;
        let mut entries = fs::read_dir(&self.root).await?;

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };

            if name.starts_with('.') && name.ends_with(PARTIAL_SUFFIX) {
                match fs::remove_file(entry.path()).await {
                    Ok(()) => removed += 1,
                    Err(e) => tracing::warn!("Failed to remove partial file {}: {}", name, e),
                }
            }
        }

        Ok(removed)
    }

    async fn discard(&self, partial: &Path) {
        if let Err(e) = fs::remove_file(partial).await {
            tracing::warn!("Failed to remove partial file {:?}: {}", partial, e);
        }
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put<'a>(
        &self,
        key: &ObjectKey,
        reader: Box<dyn AsyncRead + Unpin + Send + 'a>,
    ) -> Result<u64, StorageError> {
        let partial = self.partial_path(key);
        let target = self.object_path(key);

        let mut dst = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&partial)
            .await
            .map_err(StorageError::Create)?;

        let mut src = BufReader::with_capacity(self.buffer_size, reader);
        let copied = match tokio::io::copy_buf(&mut src, &mut dst).await {
            Ok(n) => n,
            Err(e) => {
                drop(dst);
                self.discard(&partial).await;
                return Err(StorageError::Write(e));
            }
        };

        if let Err(e) = dst.flush().await {
            drop(dst);
            self.discard(&partial).await;
            return Err(StorageError::Write(e));
        }
        drop(dst);

        // hard_link never replaces an existing object, unlike rename
        let published = fs::hard_link(&partial, &target).await;
        self.discard(&partial).await;
        match published {
            Ok(()) => Ok(copied),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                Err(StorageError::Collision(key.clone()))
            }
            Err(e) => Err(StorageError::Write(e)),
        }
    }

    async fn get(&self, key: &ObjectKey) -> Result<StoredObject, StorageError> {
        let file = match File::open(self.object_path(key)).await {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(key.clone()));
            }
            Err(e) => return Err(e.into()),
        };
        let size = file.metadata().await?.len();

        Ok(StoredObject {
            reader: Box::new(file),
            size,
        })
    }

    async fn exists(&self, key: &ObjectKey) -> Result<bool, StorageError> {
        match fs::metadata(self.object_path(key)).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn local_path(&self, key: &ObjectKey) -> Option<PathBuf> {
        Some(self.object_path(key))
    }
}
