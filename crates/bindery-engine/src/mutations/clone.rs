//! Cloning a package from a peer revision or an external upstream.

use crate::context::{context_config_map_yaml, PackageConfig};
use crate::fetcher::{PackageFetcher, ReferenceResolver};
use crate::mutation::Mutation;
use crate::EngineError;
use bindery_remote::RemoteFetcher;
use bindery_repository::{CancelToken, PackageResources, RepositoryOpener};
use bindery_schema::{
    parse_packfile_str, CloneTaskSpec, PackageName, Packfile, Task, Upstream, UpstreamLock,
    PACKAGE_CONTEXT_FILE, PACKFILE_NAME,
};
use std::sync::Arc;
use tracing::debug;

pub(crate) struct ClonePackageMutation {
    spec: CloneTaskSpec,
    task: Task,
    namespace: String,
    package_name: PackageName,
    is_deployment: bool,
    opener: Arc<dyn RepositoryOpener>,
    resolver: Arc<dyn ReferenceResolver>,
    remote: Arc<dyn RemoteFetcher>,
    config: PackageConfig,
}

impl ClonePackageMutation {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        spec: CloneTaskSpec,
        namespace: String,
        package_name: PackageName,
        is_deployment: bool,
        opener: Arc<dyn RepositoryOpener>,
        resolver: Arc<dyn ReferenceResolver>,
        remote: Arc<dyn RemoteFetcher>,
        config: PackageConfig,
    ) -> Self {
        let task = Task::Clone(spec.clone());
        Self {
            spec,
            task,
            namespace,
            package_name,
            is_deployment,
            opener,
            resolver,
            remote,
            config,
        }
    }
}

impl Mutation for ClonePackageMutation {
    fn apply(
        &self,
        cancel: &CancelToken,
        _resources: PackageResources,
    ) -> Result<(PackageResources, Task), EngineError> {
        cancel.check()?;

        let (mut resources, resolved) = match &self.spec.upstream {
            Upstream::Revision(reference) => {
                let fetcher =
                    PackageFetcher::new(Arc::clone(&self.opener), Arc::clone(&self.resolver));
                let revision = fetcher.fetch_revision(cancel, reference, &self.namespace)?;
                (revision.resources()?, revision.object_name().into_inner())
            }
            upstream @ (Upstream::Git(_) | Upstream::Oci(_)) => {
                let fetched = self.remote.fetch(cancel, upstream)?;
                (fetched.resources, fetched.resolved)
            }
        };
        let digest = resources.digest();
        debug!(
            "cloned {} files from {} upstream into {}",
            resources.len(),
            self.spec.upstream.kind(),
            self.package_name
        );

        // Rewrite the manifest: the clone is a new package pointing at the
        // concrete upstream it came from. External upstreams need not be
        // bindery packages, so a missing Packfile gets a fresh one.
        let mut packfile = match resources.get(PACKFILE_NAME) {
            Some(contents) => parse_packfile_str(contents)
                .map_err(|e| EngineError::Upstream(format!("cloned package manifest: {e}")))?,
            None => Packfile::new(self.package_name.as_str()),
        };
        packfile.metadata.name = self.package_name.to_string();
        packfile.upstream = Some(self.spec.upstream.clone());
        packfile.upstream_lock = Some(UpstreamLock {
            resolved,
            digest,
        });
        resources.insert(PACKFILE_NAME, packfile.to_yaml()?);

        // Deployment clones receive their hierarchical context.
        if self.is_deployment {
            resources.insert(
                PACKAGE_CONTEXT_FILE,
                context_config_map_yaml(&self.package_name, &self.config.ancestor_path),
            );
        }

        Ok((resources, self.task.clone()))
    }
}
