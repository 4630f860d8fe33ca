//! In-place upgrade of a cloned package to a new upstream revision.

use crate::fetcher::{PackageFetcher, ReferenceResolver};
use crate::mutation::Mutation;
use crate::updater::{ensure_merge_keys, PackageUpdater};
use crate::EngineError;
use bindery_repository::{CancelToken, PackageResources, RepositoryOpener};
use bindery_schema::{
    parse_packfile_str, PackageName, RevisionRef, Task, UpdateTaskSpec, Upstream, UpstreamLock,
    PACKFILE_NAME,
};
use std::sync::Arc;
use tracing::info;

pub(crate) struct UpdatePackageMutation {
    clone_task: Task,
    update_spec: UpdateTaskSpec,
    task: Task,
    namespace: String,
    package_name: PackageName,
    opener: Arc<dyn RepositoryOpener>,
    resolver: Arc<dyn ReferenceResolver>,
    updater: Arc<dyn PackageUpdater>,
}

impl UpdatePackageMutation {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        clone_task: Task,
        update_spec: UpdateTaskSpec,
        namespace: String,
        package_name: PackageName,
        opener: Arc<dyn RepositoryOpener>,
        resolver: Arc<dyn ReferenceResolver>,
        updater: Arc<dyn PackageUpdater>,
    ) -> Self {
        let task = Task::Update(update_spec.clone());
        Self {
            clone_task,
            update_spec,
            task,
            namespace,
            package_name,
            opener,
            resolver,
            updater,
        }
    }

    /// The original upstream the package was cloned from. Only peer
    /// revisions support in-place update.
    fn current_upstream(&self) -> Result<RevisionRef, EngineError> {
        let Task::Clone(clone) = &self.clone_task else {
            return Err(EngineError::NotSupported(format!(
                "package {} does not have original upstream info",
                self.package_name
            )));
        };
        match &clone.upstream {
            Upstream::Revision(reference) => Ok(reference.clone()),
            other => Err(EngineError::NotSupported(format!(
                "upstream package must be a peer revision, found {}",
                other.kind()
            ))),
        }
    }
}

impl Mutation for UpdatePackageMutation {
    fn apply(
        &self,
        cancel: &CancelToken,
        resources: PackageResources,
    ) -> Result<(PackageResources, Task), EngineError> {
        cancel.check()?;

        let current_upstream = self.current_upstream()?;
        let target = &self.update_spec.upstream;
        let target_ref = match target {
            Upstream::Revision(reference) => reference,
            other => {
                return Err(EngineError::NotSupported(format!(
                    "update is not supported for {} upstream packages",
                    other.kind()
                )))
            }
        };

        let fetcher = PackageFetcher::new(Arc::clone(&self.opener), Arc::clone(&self.resolver));
        let original = fetcher
            .fetch_resources(cancel, &current_upstream, &self.namespace)
            .map_err(|e| {
                EngineError::Upstream(format!(
                    "error fetching original upstream {} for package {}: {e}",
                    current_upstream.name, self.package_name
                ))
            })?;
        let upstream_revision = fetcher.fetch_revision(cancel, target_ref, &self.namespace)?;
        let upstream = upstream_revision.resources()?;

        info!(
            "upgrading package {}: resource counts local[{}] original[{}] upstream[{}]",
            self.package_name,
            resources.len(),
            original.len(),
            upstream.len()
        );

        let mut updated = self
            .updater
            .update(cancel, &resources, &original, &upstream)?;

        // Record the concrete revision we landed on.
        let mut packfile = match updated.get(PACKFILE_NAME) {
            Some(contents) => parse_packfile_str(contents)?,
            None => {
                return Err(EngineError::Upstream(format!(
                    "updated package {} has no {PACKFILE_NAME}",
                    self.package_name
                )))
            }
        };
        packfile.upstream = Some(target.clone());
        packfile.upstream_lock = Some(UpstreamLock {
            resolved: upstream_revision.object_name().into_inner(),
            digest: upstream.digest(),
        });
        updated.insert(PACKFILE_NAME, packfile.to_yaml()?);

        Ok((ensure_merge_keys(updated), self.task.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::updater::DefaultPackageUpdater;
    use bindery_repository::RepositoryCache;
    use bindery_schema::{CloneTaskSpec, GitRef, InitTaskSpec};

    fn mutation(clone_task: Task, target: Upstream) -> UpdatePackageMutation {
        UpdatePackageMutation::new(
            clone_task,
            UpdateTaskSpec { upstream: target },
            "default".to_owned(),
            "net".into(),
            Arc::new(RepositoryCache::new()),
            Arc::new(crate::fetcher::StaticReferenceResolver::new()),
            Arc::new(DefaultPackageUpdater::new()),
        )
    }

    fn revision_upstream(name: &str) -> Upstream {
        Upstream::Revision(RevisionRef { name: name.into() })
    }

    #[test]
    fn non_clone_anchor_is_not_supported() {
        let err = mutation(
            Task::Init(InitTaskSpec::default()),
            revision_upstream("blueprints.base.v2"),
        )
        .apply(&CancelToken::new(), PackageResources::new())
        .unwrap_err();
        assert!(matches!(err, EngineError::NotSupported(_)));
    }

    #[test]
    fn git_target_is_not_supported() {
        let clone_task = Task::Clone(CloneTaskSpec {
            upstream: revision_upstream("blueprints.base.v1"),
        });
        let err = mutation(
            clone_task,
            Upstream::Git(GitRef {
                repo: "https://example.com/pkgs.git".to_owned(),
                reference: "v2".to_owned(),
                directory: String::new(),
            }),
        )
        .apply(&CancelToken::new(), PackageResources::new())
        .unwrap_err();
        assert!(matches!(err, EngineError::NotSupported(_)));
    }

    #[test]
    fn git_original_upstream_is_not_supported() {
        let clone_task = Task::Clone(CloneTaskSpec {
            upstream: Upstream::Git(GitRef {
                repo: "https://example.com/pkgs.git".to_owned(),
                reference: "v1".to_owned(),
                directory: String::new(),
            }),
        });
        let err = mutation(clone_task, revision_upstream("blueprints.base.v2"))
            .apply(&CancelToken::new(), PackageResources::new())
            .unwrap_err();
        assert!(matches!(err, EngineError::NotSupported(_)));
    }
}
