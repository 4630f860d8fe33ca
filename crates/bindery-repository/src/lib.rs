//! Repository driver interface, in-memory driver, and revision metadata store.
//!
//! This crate provides the storage layer of the engine: the `Repository` /
//! `PackageRevisionHandle` / `PackageDraft` trait family that backing
//! repository drivers implement, the `PackageResources` file-set type, the
//! repository cache with its narrow `RepositoryOpener` capability, the
//! metadata store owning revision labels and annotations, and request-scoped
//! cancellation.

pub mod cache;
pub mod concurrency;
pub mod memory;
pub mod meta;
pub mod repository;
pub mod resources;

pub use cache::{RepositoryCache, RepositoryOpener};
pub use concurrency::{CancelToken, Canceled};
pub use memory::MemoryRepository;
pub use meta::{FsMetadataStore, MetadataStore, PackageRevisionMeta};
pub use repository::{
    FunctionInfo, PackageDraft, PackageFilter, PackageRevisionHandle, PackageSummary, Repository,
    RepositoryDriver, RepositorySpec, RevisionFilter,
};
pub use resources::PackageResources;

use std::path::Path;
use thiserror::Error;

/// Fsync a directory to ensure that a preceding `rename()` is durable.
///
/// POSIX does not guarantee rename durability without an fsync of the
/// parent directory; calling it makes the rename durable on all
/// filesystems and mount configurations.
pub(crate) fn fsync_dir(dir: &Path) -> Result<(), std::io::Error> {
    let f = std::fs::File::open(dir)?;
    f.sync_all()
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("repository I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("package manifest error: {0}")]
    Packfile(#[from] bindery_schema::PackfileError),
    #[error("package revision not found: {0}")]
    RevisionNotFound(String),
    #[error("package not found: {0}")]
    PackageNotFound(String),
    #[error("no metadata record for revision: {0}")]
    MetadataNotFound(String),
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("integrity check failed for '{name}': expected {expected}, got {actual}")]
    IntegrityFailure {
        name: String,
        expected: String,
        actual: String,
    },
    #[error("lock acquisition failed: {0}")]
    LockFailed(String),
    #[error("repository driver not supported: {0}")]
    DriverNotSupported(String),
    #[error(transparent)]
    Canceled(#[from] Canceled),
}
