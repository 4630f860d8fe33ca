//! The `PackageRevision` desired-state object and its lifecycle.

use crate::packfile::{Condition, ReadinessGate};
use crate::task::Task;
use crate::types::{PackageName, RepositoryName};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Lifecycle of a package revision.
///
/// `Published` revisions are immutable through the engine's update path;
/// only their labels and annotations may change.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Lifecycle {
    Draft,
    Proposed,
    Published,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifecycle::Draft => write!(f, "Draft"),
            Lifecycle::Proposed => write!(f, "Proposed"),
            Lifecycle::Published => write!(f, "Published"),
        }
    }
}

/// Desired state of one package revision: declarative intent plus the
/// ordered task recipe that produces its content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PackageRevision {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    pub spec: PackageRevisionSpec,
    #[serde(default)]
    pub status: PackageRevisionStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PackageRevisionSpec {
    pub repository: RepositoryName,
    pub package_name: PackageName,
    /// Revision identifier, or empty until the repository assigns one.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub revision: String,
    /// `None` means unset; the engine defaults it to Draft on create.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifecycle: Option<Lifecycle>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tasks: Vec<Task>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub readiness_gates: Vec<ReadinessGate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PackageRevisionStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

impl PackageRevision {
    /// The Clone task anchoring this revision's upstream, when the revision
    /// was produced by cloning. Only a Clone in first position counts; any
    /// other shape means the package has no recorded upstream.
    pub fn find_clone_task(&self) -> Option<&Task> {
        match self.spec.tasks.first() {
            Some(task @ Task::Clone(_)) => Some(task),
            _ => None,
        }
    }
}
