//! Central orchestration engine for package revisions.
//!
//! The engine is a stateless orchestrator: all collaborators are injected
//! at construction and every method serves one request, sequencing
//! mutations against a repository draft and keeping the metadata store in
//! step with durable content.

use crate::context::{build_package_config, PackageConfig};
use crate::fetcher::ReferenceResolver;
use crate::mutation::{apply_resource_mutations, Mutation};
use crate::mutations::patch::generate_patch;
use crate::mutations::{
    build_patch_mutation, ClonePackageMutation, EditPackageMutation, EvalFunctionMutation,
    InitPackageMutation, RenderPackageMutation, ReplaceResourcesMutation, UpdatePackageMutation,
};
use crate::updater::PackageUpdater;
use crate::EngineError;
use bindery_remote::RemoteFetcher;
use bindery_repository::{
    CancelToken, FunctionInfo, MetadataStore, PackageDraft, PackageFilter, PackageResources,
    PackageRevisionHandle, PackageRevisionMeta, PackageSummary, Repository, RepositoryCache,
    RepositoryError, RepositoryOpener, RepositorySpec, RevisionFilter,
};
use bindery_runtime::{FunctionRuntime, Renderer};
use bindery_schema as api;
use bindery_schema::{
    InitTaskSpec, Lifecycle, ObjectName, PatchTaskSpec, Task, Upstream, LATEST_REVISION_LABEL,
    LATEST_REVISION_VALUE, PACKFILE_NAME, RENDER_IMAGE_SENTINEL,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// A revision as exposed by the engine: the repository-owned content handle
/// aggregated with the metadata-store-owned record. The engine owns
/// neither.
pub struct PackageRevision {
    handle: Arc<dyn PackageRevisionHandle>,
    meta: PackageRevisionMeta,
}

impl std::fmt::Debug for PackageRevision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageRevision")
            .field("object_name", &self.handle.object_name())
            .field("meta", &self.meta)
            .finish()
    }
}

impl PackageRevision {
    fn new(handle: Arc<dyn PackageRevisionHandle>, meta: PackageRevisionMeta) -> Self {
        Self { handle, meta }
    }

    pub fn object_name(&self) -> ObjectName {
        self.handle.object_name()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.handle.lifecycle()
    }

    pub fn handle(&self) -> &Arc<dyn PackageRevisionHandle> {
        &self.handle
    }

    pub fn meta(&self) -> &PackageRevisionMeta {
        &self.meta
    }

    /// API projection. Labels and annotations come from the metadata
    /// record; the synthetic latest-revision label is re-applied when the
    /// repository flags this revision as latest.
    pub fn package_revision(&self) -> Result<api::PackageRevision, EngineError> {
        let mut projected = self.handle.package_revision()?;
        let is_latest = projected.labels.get(LATEST_REVISION_LABEL).map(String::as_str)
            == Some(LATEST_REVISION_VALUE);
        projected.labels = self.meta.labels.clone();
        if is_latest {
            projected.labels.insert(
                LATEST_REVISION_LABEL.to_owned(),
                LATEST_REVISION_VALUE.to_owned(),
            );
        }
        projected.annotations = self.meta.annotations.clone();
        Ok(projected)
    }

    pub fn resources(&self) -> Result<PackageResources, EngineError> {
        Ok(self.handle.resources()?)
    }
}

pub struct Engine {
    cache: Arc<RepositoryCache>,
    renderer: Arc<dyn Renderer>,
    runtime: Arc<dyn FunctionRuntime>,
    resolver: Arc<dyn ReferenceResolver>,
    remote: Arc<dyn RemoteFetcher>,
    updater: Arc<dyn PackageUpdater>,
    metadata_store: Arc<dyn MetadataStore>,
}

impl Engine {
    pub fn new(
        cache: Arc<RepositoryCache>,
        renderer: Arc<dyn Renderer>,
        runtime: Arc<dyn FunctionRuntime>,
        resolver: Arc<dyn ReferenceResolver>,
        remote: Arc<dyn RemoteFetcher>,
        updater: Arc<dyn PackageUpdater>,
        metadata_store: Arc<dyn MetadataStore>,
    ) -> Self {
        Self {
            cache,
            renderer,
            runtime,
            resolver,
            remote,
            updater,
            metadata_store,
        }
    }

    fn opener(&self) -> Arc<dyn RepositoryOpener> {
        Arc::clone(&self.cache) as Arc<dyn RepositoryOpener>
    }

    pub fn list_package_revisions(
        &self,
        cancel: &CancelToken,
        repo_spec: &RepositorySpec,
        filter: &RevisionFilter,
    ) -> Result<Vec<PackageRevision>, EngineError> {
        let repo = self.cache.open_repository(cancel, repo_spec)?;
        let handles = repo.list_package_revisions(cancel, filter)?;

        let mut revisions = Vec::new();
        for handle in handles {
            match self
                .metadata_store
                .get(&handle.namespace(), &handle.object_name())
            {
                Ok(meta) => revisions.push(PackageRevision::new(handle, meta)),
                // A revision without a metadata record does not exist as far
                // as callers are concerned.
                Err(RepositoryError::MetadataNotFound(_)) => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(revisions)
    }

    pub fn create_package_revision(
        &self,
        cancel: &CancelToken,
        repo_spec: &RepositorySpec,
        desired: &api::PackageRevision,
        parent: Option<&PackageRevision>,
    ) -> Result<PackageRevision, EngineError> {
        let config = build_package_config(desired, parent)?;

        // Cannot create an already-published revision.
        let lifecycle = match desired.spec.lifecycle {
            None => Lifecycle::Draft,
            Some(lifecycle @ (Lifecycle::Draft | Lifecycle::Proposed)) => lifecycle,
            Some(Lifecycle::Published) => {
                return Err(EngineError::Validation(
                    "cannot create a package revision with lifecycle value \"Published\""
                        .to_owned(),
                ))
            }
        };

        info!(
            "creating package revision {} in repository {}",
            desired.spec.package_name, repo_spec.name
        );
        let repo = self.cache.open_repository(cancel, repo_spec)?;
        let mut draft = repo.create_package_revision(cancel, desired)?;
        self.apply_tasks(cancel, draft.as_mut(), repo_spec, desired, &config)?;
        draft.update_lifecycle(cancel, lifecycle)?;

        // Content first, metadata second; a crash in between leaves an
        // orphan that listing hides.
        let handle = draft.close(cancel)?;
        let mut meta = PackageRevisionMeta::new(handle.object_name(), handle.namespace());
        meta.labels = strip_latest_label(&desired.labels);
        meta.annotations = desired.annotations.clone();
        let meta = self.metadata_store.create(meta)?;

        Ok(PackageRevision::new(handle, meta))
    }

    pub fn update_package_revision(
        &self,
        cancel: &CancelToken,
        repo_spec: &RepositorySpec,
        stored: &PackageRevision,
        old: &api::PackageRevision,
        new: &api::PackageRevision,
        parent: Option<&PackageRevision>,
    ) -> Result<PackageRevision, EngineError> {
        let repo = self.cache.open_repository(cancel, repo_spec)?;

        match old.spec.lifecycle {
            Some(Lifecycle::Draft | Lifecycle::Proposed) => {}
            Some(Lifecycle::Published) => {
                // Published revisions are immutable content-wise; only
                // labels and annotations may change, and no draft opens.
                debug!(
                    "metadata-only update of published revision {}",
                    stored.object_name()
                );
                let mut meta = stored.meta.clone();
                meta.labels = strip_latest_label(&new.labels);
                meta.annotations = new.annotations.clone();
                let meta = self.metadata_store.update(meta)?;
                return Ok(PackageRevision::new(Arc::clone(&stored.handle), meta));
            }
            None => {
                return Err(EngineError::Validation(
                    "invalid original lifecycle value: unset".to_owned(),
                ))
            }
        }
        let new_lifecycle = new.spec.lifecycle.ok_or_else(|| {
            EngineError::Validation("invalid desired lifecycle value: unset".to_owned())
        })?;

        if is_reclone_and_replay(old, new) {
            let config = build_package_config(new, parent)?;
            let handle =
                self.reclone_and_replay(cancel, repo.as_ref(), repo_spec, new, new_lifecycle, &config)?;
            let mut meta = stored.meta.clone();
            meta.labels = strip_latest_label(&new.labels);
            meta.annotations = new.annotations.clone();
            let meta = self.metadata_store.update(meta)?;
            return Ok(PackageRevision::new(handle, meta));
        }

        // Append-update: the new task list must extend the old one.
        let old_tasks = &old.spec.tasks;
        let new_tasks = &new.spec.tasks;
        if old_tasks.len() > new_tasks.len() {
            return Err(EngineError::NotSupported(
                "removing tasks is not supported".to_owned(),
            ));
        }
        for (old_task, new_task) in old_tasks.iter().zip(new_tasks.iter()) {
            if old_task.kind() != new_task.kind() {
                return Err(EngineError::NotSupported(
                    "changing task types is not supported".to_owned(),
                ));
            }
        }

        let mut mutations: Vec<Box<dyn Mutation>> = Vec::new();
        if new_tasks.len() > old_tasks.len() {
            if new_tasks.len() > old_tasks.len() + 1 {
                return Err(EngineError::NotSupported(
                    "can only append one task at a time".to_owned(),
                ));
            }

            let appended = &new_tasks[new_tasks.len() - 1];
            let Task::Update(update_spec) = appended else {
                return Err(EngineError::NotSupported(format!(
                    "appended task is type {:?}, must be type \"update\"",
                    appended.kind()
                )));
            };
            let clone_task = old.find_clone_task().ok_or_else(|| {
                EngineError::NotSupported(format!(
                    "upstream source not found for package revision {:?}; only cloned packages can be updated",
                    old.spec.package_name
                ))
            })?;

            mutations.push(Box::new(UpdatePackageMutation::new(
                clone_task.clone(),
                update_spec.clone(),
                request_namespace(repo_spec, old),
                old.spec.package_name.clone(),
                self.opener(),
                Arc::clone(&self.resolver),
                Arc::clone(&self.updater),
            )));
        }

        let mut draft = repo.update_package_revision(cancel, stored.handle.as_ref())?;

        // Fields projected from the Packfile must be written back to it.
        if let Some(patch_spec) = create_packfile_patch_task(stored.handle.as_ref(), new)? {
            mutations.push(build_patch_mutation(&patch_spec)?);
        }

        // One render at the tail of whatever actually changed.
        self.conditional_add_render(&mut mutations);

        // Content mutations only run against drafts; a proposed revision is
        // under review, and silently drifting its content would defeat that
        // review.
        if old.spec.lifecycle == Some(Lifecycle::Draft) {
            let resources = stored.handle.resources()?;
            apply_resource_mutations(cancel, draft.as_mut(), resources, &mutations)?;
        }

        draft.update_lifecycle(cancel, new_lifecycle)?;
        let handle = draft.close(cancel)?;

        let mut meta = stored.meta.clone();
        meta.labels = strip_latest_label(&new.labels);
        meta.annotations = new.annotations.clone();
        let meta = self.metadata_store.update(meta)?;

        Ok(PackageRevision::new(handle, meta))
    }

    /// Whole-file replacement of a draft revision's content. The caller's
    /// previous view (`old`) must match the stored content; no lifecycle
    /// transition happens through this path.
    pub fn update_package_resources(
        &self,
        cancel: &CancelToken,
        repo_spec: &RepositorySpec,
        stored: &PackageRevision,
        old: &PackageResources,
        new: &PackageResources,
    ) -> Result<PackageRevision, EngineError> {
        match stored.handle.lifecycle() {
            Lifecycle::Draft => {}
            lifecycle => {
                return Err(EngineError::Validation(format!(
                    "cannot update resources of a {lifecycle} revision; package must be Draft"
                )))
            }
        }

        let repo = self.cache.open_repository(cancel, repo_spec)?;
        let current = stored.handle.resources()?;
        if *old != current {
            return Err(EngineError::Conflict(format!(
                "resources of {} changed since they were read",
                stored.object_name()
            )));
        }

        let mut draft = repo.update_package_revision(cancel, stored.handle.as_ref())?;
        let mutations: Vec<Box<dyn Mutation>> = vec![
            Box::new(ReplaceResourcesMutation::new(new.clone())),
            self.render_mutation(),
        ];
        apply_resource_mutations(cancel, draft.as_mut(), current, &mutations)?;

        let handle = draft.close(cancel)?;
        Ok(PackageRevision::new(handle, stored.meta.clone()))
    }

    /// Deletes content first, then the metadata record. A metadata failure
    /// after content deletion surfaces as an error and leaves the revision
    /// hidden (no record) rather than half-visible.
    pub fn delete_package_revision(
        &self,
        cancel: &CancelToken,
        repo_spec: &RepositorySpec,
        stored: &PackageRevision,
    ) -> Result<(), EngineError> {
        info!("deleting package revision {}", stored.object_name());
        let repo = self.cache.open_repository(cancel, repo_spec)?;
        repo.delete_package_revision(cancel, stored.handle.as_ref())?;
        self.metadata_store
            .delete(&stored.handle.namespace(), &stored.handle.object_name())?;
        Ok(())
    }

    pub fn list_packages(
        &self,
        cancel: &CancelToken,
        repo_spec: &RepositorySpec,
        filter: &PackageFilter,
    ) -> Result<Vec<PackageSummary>, EngineError> {
        let repo = self.cache.open_repository(cancel, repo_spec)?;
        Ok(repo.list_packages(cancel, filter)?)
    }

    pub fn create_package(
        &self,
        cancel: &CancelToken,
        repo_spec: &RepositorySpec,
        name: &bindery_schema::PackageName,
    ) -> Result<PackageSummary, EngineError> {
        let repo = self.cache.open_repository(cancel, repo_spec)?;
        Ok(repo.create_package(cancel, name)?)
    }

    pub fn update_package(
        &self,
        _cancel: &CancelToken,
        _repo_spec: &RepositorySpec,
        _name: &bindery_schema::PackageName,
    ) -> Result<PackageSummary, EngineError> {
        Err(EngineError::NotSupported(
            "updating packages is not supported".to_owned(),
        ))
    }

    pub fn delete_package(
        &self,
        cancel: &CancelToken,
        repo_spec: &RepositorySpec,
        name: &bindery_schema::PackageName,
    ) -> Result<(), EngineError> {
        let repo = self.cache.open_repository(cancel, repo_spec)?;
        Ok(repo.delete_package(cancel, name)?)
    }

    pub fn list_functions(
        &self,
        cancel: &CancelToken,
        repo_spec: &RepositorySpec,
    ) -> Result<Vec<FunctionInfo>, EngineError> {
        let repo = self.cache.open_repository(cancel, repo_spec)?;
        Ok(repo.list_functions(cancel)?)
    }

    fn apply_tasks(
        &self,
        cancel: &CancelToken,
        draft: &mut dyn PackageDraft,
        repo_spec: &RepositorySpec,
        desired: &api::PackageRevision,
        config: &PackageConfig,
    ) -> Result<(), EngineError> {
        let mut mutations: Vec<Box<dyn Mutation>> = Vec::new();

        // Unless the first task is Init or Clone, prepend an Init so every
        // revision starts from a well-formed package.
        let tasks = &desired.spec.tasks;
        if tasks.first().map_or(true, |t| !t.is_init() && !t.is_clone()) {
            mutations.push(Box::new(InitPackageMutation::new(
                desired.spec.package_name.clone(),
                InitTaskSpec {
                    subpackage: String::new(),
                    description: format!("{} description", desired.spec.package_name),
                },
                config.clone(),
            )));
        }

        for task in tasks {
            mutations.push(self.map_task_to_mutation(desired, task, repo_spec, config)?);
        }

        self.conditional_add_render(&mut mutations);

        apply_resource_mutations(cancel, draft, PackageResources::new(), &mutations)?;
        Ok(())
    }

    /// Exactly one mutation per task; wrong-shaped payloads fail here so the
    /// pipeline never starts on malformed input.
    fn map_task_to_mutation(
        &self,
        desired: &api::PackageRevision,
        task: &Task,
        repo_spec: &RepositorySpec,
        config: &PackageConfig,
    ) -> Result<Box<dyn Mutation>, EngineError> {
        let namespace = request_namespace(repo_spec, desired);
        match task {
            Task::Init(spec) => Ok(Box::new(InitPackageMutation::new(
                desired.spec.package_name.clone(),
                spec.clone(),
                config.clone(),
            ))),
            Task::Clone(spec) => {
                validate_upstream(&spec.upstream)?;
                Ok(Box::new(ClonePackageMutation::new(
                    spec.clone(),
                    namespace,
                    desired.spec.package_name.clone(),
                    repo_spec.deployment,
                    self.opener(),
                    Arc::clone(&self.resolver),
                    Arc::clone(&self.remote),
                    config.clone(),
                )))
            }
            Task::Update(spec) => {
                let clone_task = desired.find_clone_task().ok_or_else(|| {
                    EngineError::NotSupported(format!(
                        "upstream source not found for package revision {:?}; only cloned packages can be updated",
                        desired.spec.package_name
                    ))
                })?;
                Ok(Box::new(UpdatePackageMutation::new(
                    clone_task.clone(),
                    spec.clone(),
                    namespace,
                    desired.spec.package_name.clone(),
                    self.opener(),
                    Arc::clone(&self.resolver),
                    Arc::clone(&self.updater),
                )))
            }
            Task::Patch(spec) => build_patch_mutation(spec),
            Task::Edit(spec) => {
                if spec.source.name.is_empty() {
                    return Err(EngineError::Validation(
                        "edit task with empty source revision".to_owned(),
                    ));
                }
                Ok(Box::new(EditPackageMutation::new(
                    spec.clone(),
                    namespace,
                    self.opener(),
                    Arc::clone(&self.resolver),
                )))
            }
            Task::Eval(spec) => {
                if spec.image == RENDER_IMAGE_SENTINEL {
                    Ok(self.render_mutation())
                } else if spec.image.is_empty() {
                    Err(EngineError::Validation(
                        "eval task with empty function image".to_owned(),
                    ))
                } else {
                    Ok(Box::new(EvalFunctionMutation::new(
                        spec.clone(),
                        Arc::clone(&self.runtime),
                    )))
                }
            }
        }
    }

    fn render_mutation(&self) -> Box<dyn Mutation> {
        Box::new(RenderPackageMutation::new(
            Arc::clone(&self.renderer),
            Arc::clone(&self.runtime),
        ))
    }

    /// Append a trailing render to a non-empty mutation chain, unless the
    /// chain already ends in one.
    fn conditional_add_render(&self, mutations: &mut Vec<Box<dyn Mutation>>) {
        match mutations.last() {
            None => {}
            Some(last) if last.is_render() => {}
            Some(_) => mutations.push(self.render_mutation()),
        }
    }

    /// Discard the stored revision and rebuild it from the new task list.
    /// This is a rebase, where append-update is a merge.
    fn reclone_and_replay(
        &self,
        cancel: &CancelToken,
        repo: &dyn Repository,
        repo_spec: &RepositorySpec,
        new_obj: &api::PackageRevision,
        lifecycle: Lifecycle,
        config: &PackageConfig,
    ) -> Result<Arc<dyn PackageRevisionHandle>, EngineError> {
        info!(
            "reclone-and-replay for package {}",
            new_obj.spec.package_name
        );
        let mut draft = repo.create_package_revision(cancel, new_obj)?;
        self.apply_tasks(cancel, draft.as_mut(), repo_spec, new_obj, config)?;
        draft.update_lifecycle(cancel, lifecycle)?;
        Ok(draft.close(cancel)?)
    }
}

/// Update handled by reclone-and-replay: both task lists start with a
/// Clone, and those Clone tasks differ in some field.
fn is_reclone_and_replay(old: &api::PackageRevision, new: &api::PackageRevision) -> bool {
    match (old.spec.tasks.first(), new.spec.tasks.first()) {
        (Some(old_first @ Task::Clone(_)), Some(new_first @ Task::Clone(_))) => {
            old_first != new_first
        }
        _ => false,
    }
}

fn validate_upstream(upstream: &Upstream) -> Result<(), EngineError> {
    let ok = match upstream {
        Upstream::Revision(reference) => !reference.name.is_empty(),
        Upstream::Git(git) => !git.repo.is_empty() && !git.reference.is_empty(),
        Upstream::Oci(oci) => !oci.image.is_empty(),
    };
    if ok {
        Ok(())
    } else {
        Err(EngineError::Validation(format!(
            "{} upstream with empty reference",
            upstream.kind()
        )))
    }
}

/// Namespace a request's references resolve in.
fn request_namespace(repo_spec: &RepositorySpec, obj: &api::PackageRevision) -> String {
    if obj.namespace.is_empty() {
        repo_spec.namespace.clone()
    } else {
        obj.namespace.clone()
    }
}

/// The latest-revision label is computed at presentation time and must
/// never be written back to stored metadata.
fn strip_latest_label(labels: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    let mut labels = labels.clone();
    labels.remove(LATEST_REVISION_LABEL);
    labels
}

/// Project readiness gates and conditions from the desired object into the
/// stored Packfile, returning a patch task when anything changed.
fn create_packfile_patch_task(
    handle: &dyn PackageRevisionHandle,
    new_obj: &api::PackageRevision,
) -> Result<Option<PatchTaskSpec>, EngineError> {
    let mut packfile = handle.packfile()?;
    let original = packfile.to_yaml()?;

    if !new_obj.spec.readiness_gates.is_empty() {
        packfile
            .info
            .get_or_insert_with(Default::default)
            .readiness_gates = new_obj.spec.readiness_gates.clone();
    }
    if !new_obj.status.conditions.is_empty() {
        packfile
            .status
            .get_or_insert_with(Default::default)
            .conditions = new_obj.status.conditions.clone();
    }

    let updated = packfile.to_yaml()?;
    let patch = generate_patch(PACKFILE_NAME, &original, &updated);
    if patch.contents.is_empty() {
        return Ok(None);
    }
    Ok(Some(PatchTaskSpec {
        patches: vec![patch],
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bindery_schema::{CloneTaskSpec, PackageRevisionSpec, PackageRevisionStatus, RevisionRef};

    fn revision_with_tasks(tasks: Vec<Task>) -> api::PackageRevision {
        api::PackageRevision {
            name: "mem.net.ws1".to_owned(),
            namespace: "default".to_owned(),
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
            spec: PackageRevisionSpec {
                repository: "mem".into(),
                package_name: "net".into(),
                revision: "ws1".to_owned(),
                lifecycle: Some(Lifecycle::Draft),
                tasks,
                readiness_gates: Vec::new(),
            },
            status: PackageRevisionStatus::default(),
        }
    }

    fn clone_task(upstream_name: &str) -> Task {
        Task::Clone(CloneTaskSpec {
            upstream: Upstream::Revision(RevisionRef {
                name: upstream_name.into(),
            }),
        })
    }

    #[test]
    fn reclone_requires_differing_clone_heads() {
        let old = revision_with_tasks(vec![clone_task("base.pkg.v1")]);
        let same = revision_with_tasks(vec![clone_task("base.pkg.v1")]);
        let differs = revision_with_tasks(vec![clone_task("base.pkg.v2")]);
        let no_clone = revision_with_tasks(vec![Task::Init(InitTaskSpec::default())]);

        assert!(!is_reclone_and_replay(&old, &same));
        assert!(is_reclone_and_replay(&old, &differs));
        assert!(!is_reclone_and_replay(&old, &no_clone));
        assert!(!is_reclone_and_replay(&no_clone, &differs));
    }

    #[test]
    fn latest_label_is_stripped_from_metadata_writes() {
        let mut labels = BTreeMap::new();
        labels.insert(LATEST_REVISION_LABEL.to_owned(), LATEST_REVISION_VALUE.to_owned());
        labels.insert("team".to_owned(), "platform".to_owned());

        let stripped = strip_latest_label(&labels);
        assert!(!stripped.contains_key(LATEST_REVISION_LABEL));
        assert_eq!(stripped.get("team").map(String::as_str), Some("platform"));
    }

    #[test]
    fn empty_upstreams_fail_validation() {
        let empty_revision = Upstream::Revision(RevisionRef { name: "".into() });
        assert!(validate_upstream(&empty_revision).is_err());

        let ok = Upstream::Revision(RevisionRef {
            name: "base.pkg.v1".into(),
        });
        assert!(validate_upstream(&ok).is_ok());
    }

    #[test]
    fn request_namespace_prefers_the_object() {
        let spec = RepositorySpec::memory("mem", "repo-ns");
        let mut obj = revision_with_tasks(Vec::new());
        assert_eq!(request_namespace(&spec, &obj), "default");
        obj.namespace = String::new();
        assert_eq!(request_namespace(&spec, &obj), "repo-ns");
    }
}
