//! Resolving and fetching peer package revisions.

use crate::EngineError;
use bindery_repository::{
    CancelToken, PackageResources, PackageRevisionHandle, RepositoryOpener, RepositorySpec,
    RevisionFilter,
};
use bindery_schema::{ObjectName, RevisionRef, Upstream, UpstreamLock};
use std::sync::Arc;
use tracing::debug;

/// Resolves a revision reference to the repository serving it, honoring
/// cross-namespace visibility rules.
pub trait ReferenceResolver: Send + Sync {
    fn resolve(&self, namespace: &str, name: &ObjectName) -> Result<RepositorySpec, EngineError>;
}

/// Table-driven resolver: revisions are served by the repository whose name
/// prefixes their object name. A repository is visible from its own
/// namespace, or from everywhere when registered as shared.
#[derive(Default)]
pub struct StaticReferenceResolver {
    entries: Vec<(RepositorySpec, bool)>,
}

impl StaticReferenceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a repository visible only from its own namespace.
    #[must_use]
    pub fn add(mut self, spec: RepositorySpec) -> Self {
        self.entries.push((spec, false));
        self
    }

    /// Register a repository visible from every namespace.
    #[must_use]
    pub fn add_shared(mut self, spec: RepositorySpec) -> Self {
        self.entries.push((spec, true));
        self
    }
}

impl ReferenceResolver for StaticReferenceResolver {
    fn resolve(&self, namespace: &str, name: &ObjectName) -> Result<RepositorySpec, EngineError> {
        let repository = name.split('.').next().unwrap_or_default();
        for (spec, shared) in &self.entries {
            if spec.name != repository {
                continue;
            }
            if *shared || spec.namespace == namespace {
                return Ok(spec.clone());
            }
        }
        Err(EngineError::NotFound(format!(
            "no repository serving {name} is visible from namespace {namespace:?}"
        )))
    }
}

/// Fetches peer package revisions through the repository layer.
pub struct PackageFetcher {
    opener: Arc<dyn RepositoryOpener>,
    resolver: Arc<dyn ReferenceResolver>,
}

impl PackageFetcher {
    pub fn new(opener: Arc<dyn RepositoryOpener>, resolver: Arc<dyn ReferenceResolver>) -> Self {
        Self { opener, resolver }
    }

    pub fn fetch_revision(
        &self,
        cancel: &CancelToken,
        reference: &RevisionRef,
        namespace: &str,
    ) -> Result<Arc<dyn PackageRevisionHandle>, EngineError> {
        debug!("fetching peer revision {}", reference.name);
        let spec = self.resolver.resolve(namespace, &reference.name)?;
        let repo = self.opener.open_repository(cancel, &spec)?;
        let mut revisions =
            repo.list_package_revisions(cancel, &RevisionFilter::by_name(reference.name.clone()))?;
        if revisions.is_empty() {
            return Err(EngineError::NotFound(format!(
                "package revision {} not found",
                reference.name
            )));
        }
        Ok(revisions.remove(0))
    }

    pub fn fetch_resources(
        &self,
        cancel: &CancelToken,
        reference: &RevisionRef,
        namespace: &str,
    ) -> Result<PackageResources, EngineError> {
        let revision = self.fetch_revision(cancel, reference, namespace)?;
        Ok(revision.resources()?)
    }

    pub fn fetch_lock(
        &self,
        cancel: &CancelToken,
        reference: &RevisionRef,
        namespace: &str,
    ) -> Result<(Option<Upstream>, Option<UpstreamLock>), EngineError> {
        let revision = self.fetch_revision(cancel, reference, namespace)?;
        Ok(revision.upstream_lock()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolver_matches_repository_prefix() {
        let resolver = StaticReferenceResolver::new()
            .add(RepositorySpec::memory("blueprints", "default"));
        let spec = resolver
            .resolve("default", &"blueprints.net.v1".into())
            .unwrap();
        assert_eq!(spec.name, "blueprints");
    }

    #[test]
    fn resolver_hides_foreign_namespaces() {
        let resolver = StaticReferenceResolver::new()
            .add(RepositorySpec::memory("blueprints", "team-a"));
        assert!(resolver
            .resolve("team-b", &"blueprints.net.v1".into())
            .is_err());
    }

    #[test]
    fn shared_repositories_are_visible_everywhere() {
        let resolver = StaticReferenceResolver::new()
            .add_shared(RepositorySpec::memory("blueprints", "team-a"));
        assert!(resolver
            .resolve("team-b", &"blueprints.net.v1".into())
            .is_ok());
    }

    #[test]
    fn unknown_repository_is_not_found() {
        let resolver = StaticReferenceResolver::new();
        assert!(matches!(
            resolver.resolve("default", &"ghost.net.v1".into()),
            Err(EngineError::NotFound(_))
        ));
    }
}
