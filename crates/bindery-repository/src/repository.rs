//! The repository driver interface consumed by the engine.
//!
//! Backing repositories (in-memory, git, OCI) implement this trait family.
//! The engine never touches storage directly: it opens a repository through
//! the cache, obtains revision handles and drafts, and lets the driver own
//! naming, revision numbering, and locking.

use crate::concurrency::CancelToken;
use crate::resources::PackageResources;
use crate::RepositoryError;
use bindery_schema as api;
use bindery_schema::{
    Lifecycle, ObjectName, Packfile, PackageName, RepositoryName, Task, Upstream, UpstreamLock,
    PACKFILE_NAME,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Declarative description of a backing repository.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RepositorySpec {
    pub name: RepositoryName,
    #[serde(default)]
    pub namespace: String,
    pub driver: RepositoryDriver,
    /// Deployment repositories receive deploy-time context during clone.
    #[serde(default)]
    pub deployment: bool,
}

impl RepositorySpec {
    pub fn memory(name: impl Into<RepositoryName>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            driver: RepositoryDriver::Memory,
            deployment: false,
        }
    }

    /// Cache key: one repository instance per (namespace, name).
    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RepositoryDriver {
    Memory,
    Git { url: String },
    Oci { registry: String },
}

/// Filter for revision listings. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct RevisionFilter {
    pub name: Option<ObjectName>,
    pub package: Option<PackageName>,
    pub revision: Option<String>,
    pub lifecycle: Option<Lifecycle>,
}

impl RevisionFilter {
    pub fn by_name(name: impl Into<ObjectName>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn matches(&self, revision: &api::PackageRevision) -> bool {
        if let Some(name) = &self.name {
            if *name != revision.name.as_str() {
                return false;
            }
        }
        if let Some(package) = &self.package {
            if *package != revision.spec.package_name {
                return false;
            }
        }
        if let Some(rev) = &self.revision {
            if *rev != revision.spec.revision {
                return false;
            }
        }
        if let Some(lifecycle) = self.lifecycle {
            if revision.spec.lifecycle != Some(lifecycle) {
                return false;
            }
        }
        true
    }
}

/// Filter for package listings.
#[derive(Debug, Clone, Default)]
pub struct PackageFilter {
    pub name: Option<PackageName>,
}

/// A package known to a repository; package-level operations carry no file
/// content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSummary {
    pub repository: RepositoryName,
    pub name: PackageName,
    pub revision_count: usize,
}

/// A function image discoverable in a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionInfo {
    pub image: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

pub trait Repository: Send + Sync {
    fn list_package_revisions(
        &self,
        cancel: &CancelToken,
        filter: &RevisionFilter,
    ) -> Result<Vec<Arc<dyn PackageRevisionHandle>>, RepositoryError>;

    /// Open a draft for a new revision described by `desired`. Closing the
    /// draft upserts by object name, which is how reclone-and-replay
    /// replaces an existing revision wholesale.
    fn create_package_revision(
        &self,
        cancel: &CancelToken,
        desired: &api::PackageRevision,
    ) -> Result<Box<dyn PackageDraft>, RepositoryError>;

    /// Open a draft layered over an existing stored revision.
    fn update_package_revision(
        &self,
        cancel: &CancelToken,
        existing: &dyn PackageRevisionHandle,
    ) -> Result<Box<dyn PackageDraft>, RepositoryError>;

    fn delete_package_revision(
        &self,
        cancel: &CancelToken,
        existing: &dyn PackageRevisionHandle,
    ) -> Result<(), RepositoryError>;

    fn list_packages(
        &self,
        cancel: &CancelToken,
        filter: &PackageFilter,
    ) -> Result<Vec<PackageSummary>, RepositoryError>;

    fn create_package(
        &self,
        cancel: &CancelToken,
        name: &PackageName,
    ) -> Result<PackageSummary, RepositoryError>;

    fn delete_package(
        &self,
        cancel: &CancelToken,
        name: &PackageName,
    ) -> Result<(), RepositoryError>;

    fn list_functions(&self, cancel: &CancelToken) -> Result<Vec<FunctionInfo>, RepositoryError>;
}

/// Read-through handle on a stored package revision.
pub trait PackageRevisionHandle: Send + Sync {
    /// Repository-wide unique object name, stable across lifecycle changes.
    fn object_name(&self) -> ObjectName;

    fn namespace(&self) -> String;

    fn lifecycle(&self) -> Lifecycle;

    /// API projection of the stored revision. Labels include the synthetic
    /// latest-revision label when the repository flags this revision as
    /// latest.
    fn package_revision(&self) -> Result<api::PackageRevision, RepositoryError>;

    fn resources(&self) -> Result<PackageResources, RepositoryError>;

    /// Parse the stored Packfile out of the revision's file set.
    fn packfile(&self) -> Result<Packfile, RepositoryError> {
        let resources = self.resources()?;
        let contents = resources.get(PACKFILE_NAME).ok_or_else(|| {
            RepositoryError::RevisionNotFound(format!(
                "{}: package has no {}",
                self.object_name(),
                PACKFILE_NAME
            ))
        })?;
        Ok(api::parse_packfile_str(contents)?)
    }

    /// Declared upstream and resolved upstream lock, when present.
    fn upstream_lock(
        &self,
    ) -> Result<(Option<Upstream>, Option<UpstreamLock>), RepositoryError> {
        let packfile = self.packfile()?;
        Ok((packfile.upstream, packfile.upstream_lock))
    }
}

/// Transient mutable handle for writing a revision.
///
/// Obtained from [`Repository::create_package_revision`] or
/// [`Repository::update_package_revision`]; destroyed by [`close`]
/// (finalisation) or by being dropped (abandonment, storage reclaimed by
/// the driver).
///
/// [`close`]: PackageDraft::close
pub trait PackageDraft: Send {
    /// Append a task record together with the file set it produced.
    fn update_resources(
        &mut self,
        cancel: &CancelToken,
        resources: PackageResources,
        task: Task,
    ) -> Result<(), RepositoryError>;

    fn update_lifecycle(
        &mut self,
        cancel: &CancelToken,
        lifecycle: Lifecycle,
    ) -> Result<(), RepositoryError>;

    /// Finalise the draft into a durable stored revision.
    fn close(
        self: Box<Self>,
        cancel: &CancelToken,
    ) -> Result<Arc<dyn PackageRevisionHandle>, RepositoryError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use bindery_schema::{PackageRevisionSpec, PackageRevisionStatus};
    use std::collections::BTreeMap;

    fn sample_revision() -> api::PackageRevision {
        api::PackageRevision {
            name: "blueprints.net.v1".to_owned(),
            namespace: "default".to_owned(),
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
            spec: PackageRevisionSpec {
                repository: "blueprints".into(),
                package_name: "net".into(),
                revision: "v1".to_owned(),
                lifecycle: Some(Lifecycle::Published),
                tasks: Vec::new(),
                readiness_gates: Vec::new(),
            },
            status: PackageRevisionStatus::default(),
        }
    }

    #[test]
    fn empty_filter_matches() {
        assert!(RevisionFilter::default().matches(&sample_revision()));
    }

    #[test]
    fn filter_by_package() {
        let mut filter = RevisionFilter::default();
        filter.package = Some("net".into());
        assert!(filter.matches(&sample_revision()));
        filter.package = Some("other".into());
        assert!(!filter.matches(&sample_revision()));
    }

    #[test]
    fn filter_by_lifecycle_and_revision() {
        let mut filter = RevisionFilter::default();
        filter.lifecycle = Some(Lifecycle::Draft);
        assert!(!filter.matches(&sample_revision()));
        filter.lifecycle = Some(Lifecycle::Published);
        filter.revision = Some("v1".to_owned());
        assert!(filter.matches(&sample_revision()));
    }

    #[test]
    fn filter_by_name() {
        let filter = RevisionFilter::by_name("blueprints.net.v1");
        assert!(filter.matches(&sample_revision()));
        let filter = RevisionFilter::by_name("blueprints.net.v2");
        assert!(!filter.matches(&sample_revision()));
    }

    #[test]
    fn spec_key_is_namespaced() {
        let spec = RepositorySpec::memory("blueprints", "team-a");
        assert_eq!(spec.key(), "team-a/blueprints");
    }
}
