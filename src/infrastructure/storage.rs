use crate::config::CdnConfig;
use crate::services::storage::LocalObjectStore;
use anyhow::Context;
use std::sync::Arc;
use tracing::{info, warn};

/// Creates the storage root and spool directory and clears interrupted writes.
///
/// Failing to create the storage root is fatal: the service cannot start without it.
pub async fn setup_storage(config: &CdnConfig) -> anyhow::Result<Arc<LocalObjectStore>> {
    tokio::fs::create_dir_all(&config.storage_root)
        .await
        .with_context(|| {
            format!(
                "failed to create storage root {}",
                config.storage_root.display()
            )
        })?;

    tokio::fs::create_dir_all(&config.spool_dir)
        .await
        .with_context(|| {
            format!(
                "failed to create spool directory {}",
                config.spool_dir.display()
            )
        })?;

    let store = LocalObjectStore::new(&config.storage_root, config.copy_buffer_size);
    match store.sweep_partials().await {
        Ok(0) => {}
        Ok(n) => info!("🧹 Removed {} partial object(s) from an earlier run", n),
        Err(e) => warn!("Could not sweep partial objects: {}", e),
    }

    info!("💾 Local storage: {}", config.storage_root.display());
    Ok(Arc::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_setup_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let config = CdnConfig::with_storage_root(dir.path().join("nested/objects"));

        let store = setup_storage(&config).await.unwrap();
        assert!(config.storage_root.is_dir());
        assert!(config.spool_dir.is_dir());
        assert_eq!(store.root(), config.storage_root.as_path());
    }

    #[tokio::test]
    async fn test_setup_fails_when_root_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("taken");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let config = CdnConfig::with_storage_root(&blocker);
        assert!(setup_storage(&config).await.is_err());
    }
}
