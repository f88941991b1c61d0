//! Static asset store.
//!
//! # Responsibilities
//! - Serve file bytes by logical path (`pwa-markup/PWA-HINDI.html`, …)
//! - Refuse paths that escape the store root
//!
//! The dispatch pipeline only depends on the [`AssetStore`] trait; the
//! filesystem implementation is what the binary wires in.

use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("asset not found: {0}")]
    NotFound(String),

    #[error("asset path outside store root: {0}")]
    Forbidden(String),

    #[error("failed to read asset {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Read-only store of static assets addressed by logical path.
#[async_trait]
pub trait AssetStore: Send + Sync {
    async fn read(&self, logical_path: &str) -> Result<Bytes, AssetError>;
}

/// Assets served from a directory on local disk.
#[derive(Debug, Clone)]
pub struct FsAssetStore {
    root: PathBuf,
}

impl FsAssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl AssetStore for FsAssetStore {
    async fn read(&self, logical_path: &str) -> Result<Bytes, AssetError> {
        let relative = logical_path.trim_start_matches('/');
        let requested = self.root.join(relative);

        let canonical = match tokio::fs::canonicalize(&requested).await {
            Ok(path) => path,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AssetError::NotFound(logical_path.to_string()));
            }
            Err(source) => {
                return Err(AssetError::Io {
                    path: logical_path.to_string(),
                    source,
                });
            }
        };
        let root = tokio::fs::canonicalize(&self.root)
            .await
            .map_err(|source| AssetError::Io {
                path: self.root.display().to_string(),
                source,
            })?;

        if !canonical.starts_with(&root) {
            tracing::warn!(path = %logical_path, "Asset path escapes store root");
            return Err(AssetError::Forbidden(logical_path.to_string()));
        }
        if !canonical.is_file() {
            return Err(AssetError::NotFound(logical_path.to_string()));
        }

        tracing::trace!(path = %canonical.display(), "Reading asset");
        tokio::fs::read(&canonical)
            .await
            .map(Bytes::from)
            .map_err(|source| AssetError::Io {
                path: logical_path.to_string(),
                source,
            })
    }
}
