use crate::models::ObjectKey;
use crate::services::mime::MimeRegistry;
use crate::services::storage::{ObjectStore, StorageError};
use crate::utils::validation::KeyError;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("Invalid file ID")]
    Empty,

    #[error(transparent)]
    InvalidKey(#[from] KeyError),

    #[error("File not found")]
    NotFound,

    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for RetrievalError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(_) => RetrievalError::NotFound,
            other => RetrievalError::Storage(other),
        }
    }
}

/// A stored object located for serving
#[derive(Debug, Clone)]
pub struct ResolvedObject {
    pub key: ObjectKey,
    pub content_type: String,
}

pub struct RetrievalResolver {
    store: Arc<dyn ObjectStore>,
    mime: MimeRegistry,
}

impl RetrievalResolver {
    pub fn new(store: Arc<dyn ObjectStore>, mime: MimeRegistry) -> Self {
        Self { store, mime }
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Validates `raw_id`, checks the object exists and picks its content type.
    pub async fn resolve(&self, raw_id: &str) -> Result<ResolvedObject, RetrievalError> {
        if raw_id.is_empty() {
            return Err(RetrievalError::Empty);
        }

        let key = ObjectKey::parse(raw_id)?;
        if !self.store.exists(&key).await? {
            return Err(RetrievalError::NotFound);
        }

        let content_type = self.mime.content_type_for(&key);
        Ok(ResolvedObject { key, content_type })
    }
}
