//! In-memory repository driver.
//!
//! The reference driver: revisions live in process memory, guarded by a
//! per-repository mutex that serialises concurrent access (the engine holds
//! no locks of its own). Revision numbers are assigned at publish time and
//! the driver maintains the latest-revision flag across publishes and
//! deletes.

use crate::concurrency::CancelToken;
use crate::repository::{
    FunctionInfo, PackageDraft, PackageFilter, PackageRevisionHandle, PackageSummary, Repository,
    RevisionFilter,
};
use crate::resources::PackageResources;
use crate::RepositoryError;
use bindery_schema as api;
use bindery_schema::{
    parse_packfile_str, Lifecycle, ObjectName, PackageName, RepositoryName, Task,
    LATEST_REVISION_LABEL, LATEST_REVISION_VALUE, PACKFILE_NAME,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

pub struct MemoryRepository {
    name: RepositoryName,
    namespace: String,
    functions: Vec<FunctionInfo>,
    state: Arc<Mutex<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    packages: BTreeMap<PackageName, MemoryPackage>,
}

#[derive(Default)]
struct MemoryPackage {
    revisions: Vec<Arc<MemoryRevision>>,
    next_revision: u64,
}

struct MemoryRevision {
    object_name: ObjectName,
    namespace: String,
    repository: RepositoryName,
    package_name: PackageName,
    revision: String,
    lifecycle: Lifecycle,
    tasks: Vec<Task>,
    resources: PackageResources,
    latest: AtomicBool,
}

impl MemoryRepository {
    pub fn new(name: impl Into<RepositoryName>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            functions: Vec::new(),
            state: Arc::new(Mutex::new(MemoryState::default())),
        }
    }

    /// Register the function images this repository advertises.
    #[must_use]
    pub fn with_functions(mut self, functions: Vec<FunctionInfo>) -> Self {
        self.functions = functions;
        self
    }

    fn lock_state(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::LockFailed("repository mutex poisoned".to_owned()))
    }
}

fn object_name_for(
    repository: &RepositoryName,
    package: &PackageName,
    workspace: &str,
) -> ObjectName {
    ObjectName::new(format!("{repository}.{package}.{workspace}"))
}

/// Numeric suffix of a published revision identifier (`v3` -> 3).
fn revision_number(revision: &str) -> Option<u64> {
    revision.strip_prefix('v').and_then(|n| n.parse().ok())
}

fn recompute_latest(package: &MemoryPackage) {
    let latest = package
        .revisions
        .iter()
        .filter(|r| r.lifecycle == Lifecycle::Published)
        .max_by_key(|r| revision_number(&r.revision).unwrap_or(0));
    for rev in &package.revisions {
        let is_latest = latest.map_or(false, |l| l.object_name == rev.object_name);
        rev.latest.store(is_latest, Ordering::SeqCst);
    }
}

impl PackageRevisionHandle for MemoryRevision {
    fn object_name(&self) -> ObjectName {
        self.object_name.clone()
    }

    fn namespace(&self) -> String {
        self.namespace.clone()
    }

    fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    fn package_revision(&self) -> Result<api::PackageRevision, RepositoryError> {
        let mut labels = BTreeMap::new();
        if self.latest.load(Ordering::SeqCst) {
            labels.insert(
                LATEST_REVISION_LABEL.to_owned(),
                LATEST_REVISION_VALUE.to_owned(),
            );
        }

        // The Packfile is the source of truth for projected readiness gates
        // and conditions; a package without one projects empty lists.
        let mut readiness_gates = Vec::new();
        let mut conditions = Vec::new();
        if let Some(contents) = self.resources.get(PACKFILE_NAME) {
            if let Ok(packfile) = parse_packfile_str(contents) {
                if let Some(info) = packfile.info {
                    readiness_gates = info.readiness_gates;
                }
                if let Some(status) = packfile.status {
                    conditions = status.conditions;
                }
            }
        }

        Ok(api::PackageRevision {
            name: self.object_name.to_string(),
            namespace: self.namespace.clone(),
            labels,
            annotations: BTreeMap::new(),
            spec: api::PackageRevisionSpec {
                repository: self.repository.clone(),
                package_name: self.package_name.clone(),
                revision: self.revision.clone(),
                lifecycle: Some(self.lifecycle),
                tasks: self.tasks.clone(),
                readiness_gates,
            },
            status: api::PackageRevisionStatus { conditions },
        })
    }

    fn resources(&self) -> Result<PackageResources, RepositoryError> {
        Ok(self.resources.clone())
    }
}

impl Repository for MemoryRepository {
    fn list_package_revisions(
        &self,
        cancel: &CancelToken,
        filter: &RevisionFilter,
    ) -> Result<Vec<Arc<dyn PackageRevisionHandle>>, RepositoryError> {
        cancel.check()?;
        let state = self.lock_state()?;
        let mut out: Vec<Arc<dyn PackageRevisionHandle>> = Vec::new();
        for package in state.packages.values() {
            for rev in &package.revisions {
                if filter.matches(&rev.package_revision()?) {
                    out.push(Arc::clone(rev) as Arc<dyn PackageRevisionHandle>);
                }
            }
        }
        Ok(out)
    }

    fn create_package_revision(
        &self,
        cancel: &CancelToken,
        desired: &api::PackageRevision,
    ) -> Result<Box<dyn PackageDraft>, RepositoryError> {
        cancel.check()?;
        let workspace = if desired.spec.revision.is_empty() {
            "draft".to_owned()
        } else {
            desired.spec.revision.clone()
        };
        let object_name = object_name_for(&self.name, &desired.spec.package_name, &workspace);
        debug!("opening create draft for {object_name}");

        Ok(Box::new(MemoryDraft {
            state: Arc::clone(&self.state),
            repository: self.name.clone(),
            namespace: self.namespace.clone(),
            package_name: desired.spec.package_name.clone(),
            object_name,
            workspace,
            lifecycle: Lifecycle::Draft,
            was_published: false,
            tasks: Vec::new(),
            resources: PackageResources::new(),
        }))
    }

    fn update_package_revision(
        &self,
        cancel: &CancelToken,
        existing: &dyn PackageRevisionHandle,
    ) -> Result<Box<dyn PackageDraft>, RepositoryError> {
        cancel.check()?;
        let object_name = existing.object_name();
        let state = self.lock_state()?;
        let rev = state
            .packages
            .values()
            .flat_map(|p| p.revisions.iter())
            .find(|r| r.object_name == object_name)
            .ok_or_else(|| RepositoryError::RevisionNotFound(object_name.to_string()))?;
        debug!("opening update draft for {object_name}");

        Ok(Box::new(MemoryDraft {
            state: Arc::clone(&self.state),
            repository: self.name.clone(),
            namespace: self.namespace.clone(),
            package_name: rev.package_name.clone(),
            object_name: rev.object_name.clone(),
            workspace: rev.revision.clone(),
            lifecycle: rev.lifecycle,
            was_published: rev.lifecycle == Lifecycle::Published,
            tasks: rev.tasks.clone(),
            resources: rev.resources.clone(),
        }))
    }

    fn delete_package_revision(
        &self,
        cancel: &CancelToken,
        existing: &dyn PackageRevisionHandle,
    ) -> Result<(), RepositoryError> {
        cancel.check()?;
        let object_name = existing.object_name();
        let mut state = self.lock_state()?;
        for package in state.packages.values_mut() {
            let before = package.revisions.len();
            package.revisions.retain(|r| r.object_name != object_name);
            if package.revisions.len() != before {
                recompute_latest(package);
                return Ok(());
            }
        }
        Err(RepositoryError::RevisionNotFound(object_name.to_string()))
    }

    fn list_packages(
        &self,
        cancel: &CancelToken,
        filter: &PackageFilter,
    ) -> Result<Vec<PackageSummary>, RepositoryError> {
        cancel.check()?;
        let state = self.lock_state()?;
        Ok(state
            .packages
            .iter()
            .filter(|(name, _)| filter.name.as_ref().map_or(true, |n| n == *name))
            .map(|(name, package)| PackageSummary {
                repository: self.name.clone(),
                name: name.clone(),
                revision_count: package.revisions.len(),
            })
            .collect())
    }

    fn create_package(
        &self,
        cancel: &CancelToken,
        name: &PackageName,
    ) -> Result<PackageSummary, RepositoryError> {
        cancel.check()?;
        let mut state = self.lock_state()?;
        if state.packages.contains_key(name) {
            return Err(RepositoryError::AlreadyExists(name.to_string()));
        }
        state.packages.insert(name.clone(), MemoryPackage::default());
        Ok(PackageSummary {
            repository: self.name.clone(),
            name: name.clone(),
            revision_count: 0,
        })
    }

    fn delete_package(
        &self,
        cancel: &CancelToken,
        name: &PackageName,
    ) -> Result<(), RepositoryError> {
        cancel.check()?;
        let mut state = self.lock_state()?;
        state
            .packages
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::PackageNotFound(name.to_string()))
    }

    fn list_functions(&self, cancel: &CancelToken) -> Result<Vec<FunctionInfo>, RepositoryError> {
        cancel.check()?;
        Ok(self.functions.clone())
    }
}

struct MemoryDraft {
    state: Arc<Mutex<MemoryState>>,
    repository: RepositoryName,
    namespace: String,
    package_name: PackageName,
    object_name: ObjectName,
    workspace: String,
    lifecycle: Lifecycle,
    was_published: bool,
    tasks: Vec<Task>,
    resources: PackageResources,
}

impl PackageDraft for MemoryDraft {
    fn update_resources(
        &mut self,
        cancel: &CancelToken,
        resources: PackageResources,
        task: Task,
    ) -> Result<(), RepositoryError> {
        cancel.check()?;
        self.resources = resources;
        self.tasks.push(task);
        Ok(())
    }

    fn update_lifecycle(
        &mut self,
        cancel: &CancelToken,
        lifecycle: Lifecycle,
    ) -> Result<(), RepositoryError> {
        cancel.check()?;
        self.lifecycle = lifecycle;
        Ok(())
    }

    fn close(
        self: Box<Self>,
        cancel: &CancelToken,
    ) -> Result<Arc<dyn PackageRevisionHandle>, RepositoryError> {
        cancel.check()?;
        let mut state = self
            .state
            .lock()
            .map_err(|_| RepositoryError::LockFailed("repository mutex poisoned".to_owned()))?;
        let package = state.packages.entry(self.package_name.clone()).or_default();

        let newly_published = self.lifecycle == Lifecycle::Published && !self.was_published;
        let revision = if newly_published {
            package.next_revision += 1;
            format!("v{}", package.next_revision)
        } else {
            self.workspace.clone()
        };

        let rev = Arc::new(MemoryRevision {
            object_name: self.object_name.clone(),
            namespace: self.namespace,
            repository: self.repository,
            package_name: self.package_name,
            revision,
            lifecycle: self.lifecycle,
            tasks: self.tasks,
            resources: self.resources,
            latest: AtomicBool::new(false),
        });

        // Upsert by object name: closing a create draft over an existing
        // revision replaces it wholesale (reclone-and-replay).
        match package
            .revisions
            .iter()
            .position(|r| r.object_name == self.object_name)
        {
            Some(idx) => package.revisions[idx] = Arc::clone(&rev),
            None => package.revisions.push(Arc::clone(&rev)),
        }
        recompute_latest(package);

        Ok(rev as Arc<dyn PackageRevisionHandle>)
    }
}
