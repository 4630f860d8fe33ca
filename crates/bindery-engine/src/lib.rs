//! Core orchestration engine for Bindery package revisions.
//!
//! This crate ties the schema, repository, runtime, and remote layers
//! together into the `Engine`: the component that turns a desired revision
//! (declarative intent plus an ordered task list) into an actual file set
//! inside a backing repository. It enforces lifecycle rules, maps tasks to
//! mutations, replays task pipelines, merges three-way updates when an
//! upstream version changes, and keeps revision metadata in step with
//! content.

pub mod context;
pub mod engine;
pub mod fetcher;
mod mutation;
mod mutations;
pub mod updater;

pub use context::{build_package_config, extract_context_config_map, ContextConfigMap, PackageConfig};
pub use engine::{Engine, PackageRevision};
pub use fetcher::{PackageFetcher, ReferenceResolver, StaticReferenceResolver};
pub use updater::{ensure_merge_keys, DefaultPackageUpdater, PackageUpdater};

use bindery_remote::RemoteError;
use bindery_repository::{Canceled, RepositoryError};
use bindery_runtime::RuntimeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed input: bad lifecycle value, wrong-shaped task payload,
    /// unsupported upstream type.
    #[error("validation error: {0}")]
    Validation(String),
    /// The engine intentionally refuses the operation: removing or
    /// reordering tasks, updating a non-cloned package, updating across a
    /// non-native upstream.
    #[error("not supported: {0}")]
    NotSupported(String),
    #[error("not found: {0}")]
    NotFound(String),
    /// Duplicate context ConfigMap, patch against a missing file, stale
    /// client view of package resources.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Failure fetching or merging upstream content.
    #[error("upstream error: {0}")]
    Upstream(String),
    #[error("runtime error: {0}")]
    Runtime(RuntimeError),
    #[error("storage error: {0}")]
    Storage(RepositoryError),
    #[error(transparent)]
    Canceled(#[from] Canceled),
}

impl From<RepositoryError> for EngineError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::Canceled(c) => EngineError::Canceled(c),
            RepositoryError::RevisionNotFound(_)
            | RepositoryError::PackageNotFound(_)
            | RepositoryError::MetadataNotFound(_) => EngineError::NotFound(e.to_string()),
            other => EngineError::Storage(other),
        }
    }
}

impl From<RuntimeError> for EngineError {
    fn from(e: RuntimeError) -> Self {
        match e {
            RuntimeError::Canceled(c) => EngineError::Canceled(c),
            other => EngineError::Runtime(other),
        }
    }
}

impl From<bindery_schema::PackfileError> for EngineError {
    fn from(e: bindery_schema::PackfileError) -> Self {
        EngineError::Validation(e.to_string())
    }
}

impl From<RemoteError> for EngineError {
    fn from(e: RemoteError) -> Self {
        match e {
            RemoteError::Canceled(c) => EngineError::Canceled(c),
            other => EngineError::Upstream(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_not_found_maps_to_not_found() {
        let e: EngineError = RepositoryError::RevisionNotFound("r.p.v1".to_owned()).into();
        assert!(matches!(e, EngineError::NotFound(_)));
    }

    #[test]
    fn cancellation_is_never_reclassified() {
        let repo: EngineError = RepositoryError::Canceled(Canceled).into();
        assert!(matches!(repo, EngineError::Canceled(_)));
        let runtime: EngineError = RuntimeError::Canceled(Canceled).into();
        assert!(matches!(runtime, EngineError::Canceled(_)));
        let remote: EngineError = RemoteError::Canceled(Canceled).into();
        assert!(matches!(remote, EngineError::Canceled(_)));
    }

    #[test]
    fn remote_failures_surface_as_upstream() {
        let e: EngineError = RemoteError::NotFound("git:x@y".to_owned()).into();
        assert!(matches!(e, EngineError::Upstream(_)));
    }
}
