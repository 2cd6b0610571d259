use crate::config::CdnConfig;
use crate::models::{ObjectKey, UploadResult};
use crate::services::sniffer::{self, SniffError};
use crate::services::spool::SpooledUpload;
use crate::services::storage::{ObjectStore, StorageError};
use crate::services::transcoder::{self, NORMALIZED_EXTENSION, Plan};
use crate::utils::validation::original_extension;
use futures::future::join_all;
use std::io::{self, Cursor};
use std::sync::Arc;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Fresh identifiers tried before giving up on a write
pub const MAX_KEY_ATTEMPTS: usize = 3;

/// Per-file failure. The message is what ends up in `UploadResult.error`.
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("Failed to open file")]
    Open(#[source] io::Error),

    #[error(transparent)]
    Sniff(#[from] SniffError),

    #[error("Failed to read file")]
    Read(#[source] io::Error),

    #[error("Failed to convert image")]
    Encode(String),

    #[error("Failed to create file")]
    StorageCreate(#[source] StorageError),

    #[error("Failed to save file")]
    StorageWrite(#[source] StorageError),
}

impl From<StorageError> for ProcessingError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Write(_) => ProcessingError::StorageWrite(err),
            _ => ProcessingError::StorageCreate(err),
        }
    }
}

/// Runs sniffing, optional transcoding and the storage write for each upload.
pub struct UploadService {
    store: Arc<dyn ObjectStore>,
    config: Arc<CdnConfig>,
}

impl UploadService {
    pub fn new(store: Arc<dyn ObjectStore>, config: Arc<CdnConfig>) -> Self {
        Self { store, config }
    }

    /// Processes one upload. Failures are reported in the result, never returned.
    pub async fn process(&self, upload: &SpooledUpload, host: &str) -> UploadResult {
        match self.store_upload(upload).await {
            Ok(key) => {
                tracing::info!(
                    "Stored {:?} ({} bytes) as {}",
                    upload.file_name(),
                    upload.size(),
                    key
                );
                UploadResult::stored(upload.file_name(), self.public_url(host, &key))
            }
            Err(e) => {
                tracing::warn!("Upload of {:?} failed: {:?}", upload.file_name(), e);
                UploadResult::failed(upload.file_name(), e.to_string())
            }
        }
    }

    /// Processes every upload independently. Results keep the input order.
    pub async fn process_batch(&self, uploads: &[SpooledUpload], host: &str) -> Vec<UploadResult> {
        join_all(uploads.iter().map(|upload| self.process(upload, host))).await
    }

    pub fn public_url(&self, host: &str, key: &ObjectKey) -> String {
        format!("{}://{}/files/{}", self.config.public_scheme, host, key)
    }

    async fn store_upload(&self, upload: &SpooledUpload) -> Result<ObjectKey, ProcessingError> {
        let mut file = File::open(upload.path())
            .await
            .map_err(ProcessingError::Open)?;

        let sniffed = sniffer::sniff(&mut file).await?;
        tracing::debug!("Sniffed {:?} as {}", upload.file_name(), sniffed.mime());

        if let Plan::Transcode(format) = transcoder::plan(&sniffed) {
            let mut data = Vec::with_capacity(upload.size() as usize);
            file.read_to_end(&mut data)
                .await
                .map_err(ProcessingError::Read)?;

            if let Some(webp) = self.transcode(data, format).await? {
                return self
                    .write(NORMALIZED_EXTENSION, Box::new(Cursor::new(webp)))
                    .await;
            }
            sniffer::rewind(&mut file).await?;
        }

        let extension = original_extension(upload.file_name());
        self.write(&extension, Box::new(file)).await
    }

    /// `Ok(None)` means the image could not be decoded and is stored verbatim.
    async fn transcode(
        &self,
        data: Vec<u8>,
        format: sniffer::DecodeFormat,
    ) -> Result<Option<Vec<u8>>, ProcessingError> {
        let quality = self.config.webp_quality;
        let outcome =
            tokio::task::spawn_blocking(move || transcoder::transcode(&data, format, quality))
                .await
                .map_err(|e| ProcessingError::Encode(e.to_string()))?;

        match outcome {
            Ok(webp) => Ok(Some(webp)),
            Err(e) if e.is_fallback() => {
                tracing::debug!("Keeping original bytes: {}", e);
                Ok(None)
            }
            Err(e) => Err(ProcessingError::Encode(e.to_string())),
        }
    }

    async fn write(
        &self,
        extension: &str,
        reader: Box<dyn AsyncRead + Unpin + Send>,
    ) -> Result<ObjectKey, ProcessingError> {
        let key = self.fresh_key(extension).await?;
        self.store.put(&key, reader).await?;
        Ok(key)
    }

    async fn fresh_key(&self, extension: &str) -> Result<ObjectKey, ProcessingError> {
        let mut key = ObjectKey::generate(extension);
        for attempt in 1..=MAX_KEY_ATTEMPTS {
            if !self.store.exists(&key).await? {
                return Ok(key);
            }
            tracing::warn!("Generated key {} already in use (attempt {})", key, attempt);
            key = ObjectKey::generate(extension);
        }
        Err(StorageError::Collision(key).into())
    }
}
