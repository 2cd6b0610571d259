use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::fmt::Display;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

/// An uploaded file buffered to a temporary file. The file is deleted on drop.
pub struct SpooledUpload {
    file_name: String,
    file: NamedTempFile,
    size: u64,
}

impl SpooledUpload {
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

#[derive(Debug, Error)]
pub enum SpoolError {
    #[error("File too large")]
    TooLarge,

    #[error("Invalid upload body: {0}")]
    Body(String),

    #[error("Failed to buffer upload: {0}")]
    Io(#[from] io::Error),
}

/// Buffers the parts of one request to disk while enforcing a shared byte budget.
pub struct Spooler {
    dir: PathBuf,
    limit: usize,
    used: usize,
}

impl Spooler {
    pub fn new(dir: impl Into<PathBuf>, limit: usize) -> Self {
        Self {
            dir: dir.into(),
            limit,
            used: 0,
        }
    }

    /// Writes the whole stream into a new temporary file.
    pub async fn spool<S, E>(
        &mut self,
        file_name: impl Into<String>,
        stream: S,
    ) -> Result<SpooledUpload, SpoolError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Display,
    {
        let temp = tempfile::Builder::new()
            .prefix("upload-")
            .tempfile_in(&self.dir)?;
        let mut out = tokio::fs::File::from_std(temp.reopen()?);
        let mut size = 0u64;

        let mut stream = std::pin::pin!(stream);
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| SpoolError::Body(e.to_string()))?;
            self.charge(chunk.len())?;
            out.write_all(&chunk).await?;
            size += chunk.len() as u64;
        }
        out.flush().await?;

        Ok(SpooledUpload {
            file_name: file_name.into(),
            file: temp,
            size,
        })
    }

    /// Consumes a part that is not an upload, still counting it against the budget.
    pub async fn skip<S, E>(&mut self, stream: S) -> Result<(), SpoolError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Display,
    {
        let mut stream = std::pin::pin!(stream);
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| SpoolError::Body(e.to_string()))?;
            self.charge(chunk.len())?;
        }
        Ok(())
    }

    fn charge(&mut self, n: usize) -> Result<(), SpoolError> {
        self.used = self.used.saturating_add(n);
        if self.used > self.limit {
            return Err(SpoolError::TooLarge);
        }
        Ok(())
    }
}
