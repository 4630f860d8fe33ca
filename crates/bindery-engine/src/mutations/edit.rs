//! Editing: replace package content with another revision's.

use crate::fetcher::{PackageFetcher, ReferenceResolver};
use crate::mutation::Mutation;
use crate::EngineError;
use bindery_repository::{CancelToken, PackageResources, RepositoryOpener};
use bindery_schema::{EditTaskSpec, Task};
use std::sync::Arc;

pub(crate) struct EditPackageMutation {
    spec: EditTaskSpec,
    task: Task,
    namespace: String,
    opener: Arc<dyn RepositoryOpener>,
    resolver: Arc<dyn ReferenceResolver>,
}

impl EditPackageMutation {
    pub fn new(
        spec: EditTaskSpec,
        namespace: String,
        opener: Arc<dyn RepositoryOpener>,
        resolver: Arc<dyn ReferenceResolver>,
    ) -> Self {
        let task = Task::Edit(spec.clone());
        Self {
            spec,
            task,
            namespace,
            opener,
            resolver,
        }
    }
}

impl Mutation for EditPackageMutation {
    fn apply(
        &self,
        cancel: &CancelToken,
        _resources: PackageResources,
    ) -> Result<(PackageResources, Task), EngineError> {
        cancel.check()?;
        let fetcher = PackageFetcher::new(Arc::clone(&self.opener), Arc::clone(&self.resolver));
        let source = fetcher.fetch_resources(cancel, &self.spec.source, &self.namespace)?;
        Ok((source, self.task.clone()))
    }
}
