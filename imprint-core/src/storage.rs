//! Object storage for accepted content bytes.
//!
//! Accepted payloads are persisted keyed by content hash so the original
//! bytes can be retrieved later. The storage mechanics are out of scope for
//! the coordinators — they only depend on this narrow contract.

use std::path::PathBuf;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::Result;
use crate::fingerprint::ContentHash;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Persist content bytes under their hash. Idempotent: the bytes for a
    /// given hash are by construction always the same.
    async fn store(&self, content_hash: &ContentHash, bytes: &[u8]) -> Result<()>;

    /// Retrieve content bytes. `Ok(None)` when the hash is unknown.
    async fn fetch(&self, content_hash: &ContentHash) -> Result<Option<Vec<u8>>>;
}

/// In-memory object store for tests and ephemeral deployments.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: DashMap<ContentHash, Vec<u8>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn store(&self, content_hash: &ContentHash, bytes: &[u8]) -> Result<()> {
        self.objects.insert(*content_hash, bytes.to_vec());
        Ok(())
    }

    async fn fetch(&self, content_hash: &ContentHash) -> Result<Option<Vec<u8>>> {
        Ok(self.objects.get(content_hash).map(|b| b.value().clone()))
    }
}

/// Filesystem object store: one file per content hash under a root directory.
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn path_for(&self, content_hash: &ContentHash) -> PathBuf {
        self.root.join(content_hash.to_hex())
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn store(&self, content_hash: &ContentHash, bytes: &[u8]) -> Result<()> {
        tokio::fs::write(self.path_for(content_hash), bytes).await?;
        Ok(())
    }

    async fn fetch(&self, content_hash: &ContentHash) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.path_for(content_hash)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
