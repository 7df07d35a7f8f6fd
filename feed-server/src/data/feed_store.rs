use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::domain::error::DomainError;
use crate::domain::post::{META_SUFFIX, PostMeta, PostRecord, accepted_extension};

#[async_trait]
pub trait FeedStore: Send + Sync {
    async fn put_artifact(&self, storage_key: &str, bytes: &[u8]) -> Result<PathBuf, DomainError>;
    async fn put_sidecar(&self, storage_key: &str, meta: &PostMeta) -> Result<(), DomainError>;
    async fn list_posts(&self) -> Result<Vec<PostRecord>, DomainError>;
    async fn artifact(&self, storage_key: &str) -> Result<PathBuf, DomainError>;
}

/// Flat-directory store. Each post is one artifact file plus one
/// `{storage_key}.meta` sidecar, correlated only by name.
#[derive(Clone)]
pub struct FsFeedStore {
    root: PathBuf,
}

impl FsFeedStore {
    pub fn open(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Storage keys arriving from the outside must stay inside the root.
    fn entry_path(&self, storage_key: &str) -> Result<PathBuf, DomainError> {
        if storage_key.is_empty()
            || storage_key.contains(['/', '\\'])
            || storage_key.contains("..")
        {
            return Err(DomainError::PostNotFound(storage_key.to_string()));
        }
        Ok(self.root.join(storage_key))
    }

    async fn read_sidecar(&self, storage_key: &str) -> PostMeta {
        let path = self.root.join(format!("{storage_key}{META_SUFFIX}"));
        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => {
                if PostMeta::is_partial(&raw) {
                    warn!(storage_key, "sidecar carries a partial schema, defaulting the rest");
                }
                PostMeta::parse(&raw)
            }
            Err(err) => {
                warn!(storage_key, error = %err, "sidecar missing or unreadable");
                PostMeta::unknown()
            }
        }
    }
}

#[async_trait]
impl FeedStore for FsFeedStore {
    async fn put_artifact(&self, storage_key: &str, bytes: &[u8]) -> Result<PathBuf, DomainError> {
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.root.join(storage_key);
        tokio::fs::write(&path, bytes).await?;
        debug!(storage_key, size = bytes.len(), "artifact written");
        Ok(path)
    }

    async fn put_sidecar(&self, storage_key: &str, meta: &PostMeta) -> Result<(), DomainError> {
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.root.join(format!("{storage_key}{META_SUFFIX}"));
        tokio::fs::write(&path, meta.encode()).await?;
        debug!(storage_key, "sidecar written");
        Ok(())
    }

    /// Scans the directory fresh on every call. Ordering is by artifact
    /// mtime, newest first, with the key itself as a tie-break; the
    /// timestamp inside the sidecar is display data, not an ordering key.
    async fn list_posts(&self) -> Result<Vec<PostRecord>, DomainError> {
        let mut dir = match tokio::fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut artifacts: Vec<(String, PathBuf, SystemTime)> = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if accepted_extension(name).is_none() {
                continue;
            }
            let Ok(metadata) = entry.metadata().await else {
                warn!(name, "artifact vanished during scan");
                continue;
            };
            if !metadata.is_file() {
                continue;
            }
            let Ok(modified) = metadata.modified() else {
                continue;
            };
            artifacts.push((name.to_string(), path, modified));
        }

        artifacts.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| b.0.cmp(&a.0)));

        let mut posts = Vec::with_capacity(artifacts.len());
        for (name, path, _) in artifacts {
            let meta = self.read_sidecar(&name).await;
            posts.push(PostRecord::from_meta(name, path, meta));
        }
        Ok(posts)
    }

    async fn artifact(&self, storage_key: &str) -> Result<PathBuf, DomainError> {
        if accepted_extension(storage_key).is_none() {
            return Err(DomainError::PostNotFound(storage_key.to_string()));
        }
        let path = self.entry_path(storage_key)?;
        match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => Ok(path),
            _ => Err(DomainError::PostNotFound(storage_key.to_string())),
        }
    }
}
