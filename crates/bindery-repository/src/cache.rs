//! Repository cache and the `RepositoryOpener` capability.

use crate::concurrency::CancelToken;
use crate::repository::{Repository, RepositoryDriver, RepositorySpec};
use crate::{MemoryRepository, RepositoryError};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Narrow capability for opening repositories by spec.
///
/// Mutations that need to reach back into other repositories (clone, edit,
/// update) hold this capability rather than a reference to the engine,
/// keeping ownership acyclic.
pub trait RepositoryOpener: Send + Sync {
    fn open_repository(
        &self,
        cancel: &CancelToken,
        spec: &RepositorySpec,
    ) -> Result<Arc<dyn Repository>, RepositoryError>;
}

/// Memoises open repositories by `(namespace, name)` key.
///
/// In-memory repositories are constructed on first open; other driver kinds
/// must be registered by the host (real git/OCI drivers live outside the
/// engine).
#[derive(Default)]
pub struct RepositoryCache {
    repositories: Mutex<BTreeMap<String, Arc<dyn Repository>>>,
}

impl RepositoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount an externally constructed driver under the spec's key.
    pub fn register(&self, spec: &RepositorySpec, repository: Arc<dyn Repository>) {
        let mut repositories = self
            .repositories
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        repositories.insert(spec.key(), repository);
    }
}

impl RepositoryOpener for RepositoryCache {
    fn open_repository(
        &self,
        cancel: &CancelToken,
        spec: &RepositorySpec,
    ) -> Result<Arc<dyn Repository>, RepositoryError> {
        cancel.check()?;
        let mut repositories = self
            .repositories
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(repo) = repositories.get(&spec.key()) {
            return Ok(Arc::clone(repo));
        }

        match &spec.driver {
            RepositoryDriver::Memory => {
                debug!("opening in-memory repository {}", spec.key());
                let repo: Arc<dyn Repository> = Arc::new(MemoryRepository::new(
                    spec.name.clone(),
                    spec.namespace.clone(),
                ));
                repositories.insert(spec.key(), Arc::clone(&repo));
                Ok(repo)
            }
            RepositoryDriver::Git { url } => Err(RepositoryError::DriverNotSupported(format!(
                "git repository {url} must be registered by the host"
            ))),
            RepositoryDriver::Oci { registry } => {
                Err(RepositoryError::DriverNotSupported(format!(
                    "oci repository {registry} must be registered by the host"
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_repositories_are_memoised() {
        let cache = RepositoryCache::new();
        let cancel = CancelToken::new();
        let spec = RepositorySpec::memory("blueprints", "default");

        let a = cache.open_repository(&cancel, &spec).unwrap();
        let b = cache.open_repository(&cancel, &spec).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn distinct_namespaces_get_distinct_instances() {
        let cache = RepositoryCache::new();
        let cancel = CancelToken::new();

        let a = cache
            .open_repository(&cancel, &RepositorySpec::memory("blueprints", "team-a"))
            .unwrap();
        let b = cache
            .open_repository(&cancel, &RepositorySpec::memory("blueprints", "team-b"))
            .unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn unregistered_git_driver_fails() {
        let cache = RepositoryCache::new();
        let spec = RepositorySpec {
            name: "external".into(),
            namespace: "default".to_owned(),
            driver: RepositoryDriver::Git {
                url: "https://example.com/pkgs.git".to_owned(),
            },
            deployment: false,
        };
        assert!(matches!(
            cache.open_repository(&CancelToken::new(), &spec),
            Err(RepositoryError::DriverNotSupported(_))
        ));
    }

    #[test]
    fn registered_driver_is_served() {
        let cache = RepositoryCache::new();
        let cancel = CancelToken::new();
        let spec = RepositorySpec {
            name: "external".into(),
            namespace: "default".to_owned(),
            driver: RepositoryDriver::Git {
                url: "https://example.com/pkgs.git".to_owned(),
            },
            deployment: false,
        };
        let repo: Arc<dyn Repository> = Arc::new(MemoryRepository::new("external", "default"));
        cache.register(&spec, Arc::clone(&repo));

        let opened = cache.open_repository(&cancel, &spec).unwrap();
        assert!(Arc::ptr_eq(&opened, &repo));
    }

    #[test]
    fn canceled_open_fails() {
        let cache = RepositoryCache::new();
        let cancel = CancelToken::new();
        cancel.cancel();
        assert!(cache
            .open_repository(&cancel, &RepositorySpec::memory("r", "ns"))
            .is_err());
    }
}
