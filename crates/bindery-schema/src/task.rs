//! Task recipe steps and upstream references.
//!
//! A package revision's content is always the result of applying its task
//! list, in order, to an empty base. Tasks are sequenced, auditable, and
//! replayable; the engine maps each task to exactly one mutation.

use crate::types::{Digest, ObjectName};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One recipe step. Serialized with an explicit `type` tag so stored task
/// histories remain self-describing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Task {
    Init(InitTaskSpec),
    Clone(CloneTaskSpec),
    Update(UpdateTaskSpec),
    Patch(PatchTaskSpec),
    Edit(EditTaskSpec),
    Eval(EvalTaskSpec),
}

impl Task {
    /// Stable kind name, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Task::Init(_) => "init",
            Task::Clone(_) => "clone",
            Task::Update(_) => "update",
            Task::Patch(_) => "patch",
            Task::Edit(_) => "edit",
            Task::Eval(_) => "eval",
        }
    }

    pub fn is_init(&self) -> bool {
        matches!(self, Task::Init(_))
    }

    pub fn is_clone(&self) -> bool {
        matches!(self, Task::Clone(_))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InitTaskSpec {
    /// When set, the skeleton is created under this subdirectory instead of
    /// the package root.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub subpackage: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CloneTaskSpec {
    pub upstream: Upstream,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskSpec {
    /// Desired new upstream for a previously cloned package.
    pub upstream: Upstream,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PatchTaskSpec {
    #[serde(default)]
    pub patches: Vec<PatchSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EditTaskSpec {
    /// Revision whose contents are copied in.
    pub source: RevisionRef,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EvalTaskSpec {
    /// Function image reference. The literal `render` is reserved and means
    /// "run the full renderer".
    pub image: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config_map: BTreeMap<String, String>,
}

/// A single per-file patch within a Patch task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PatchSpec {
    pub file: String,
    pub patch_type: PatchType,
    /// Full file contents for `Create`, a unified diff for `Modify`,
    /// empty for `Delete`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub contents: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PatchType {
    CreateFile,
    DeleteFile,
    Modify,
}

/// Where a package is cloned or updated from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Upstream {
    /// A peer package revision served by this platform.
    Revision(RevisionRef),
    /// An external git repository.
    Git(GitRef),
    /// An external OCI artifact.
    Oci(OciRef),
}

impl Upstream {
    pub fn kind(&self) -> &'static str {
        match self {
            Upstream::Revision(_) => "revision",
            Upstream::Git(_) => "git",
            Upstream::Oci(_) => "oci",
        }
    }
}

/// Reference to a peer package revision by object name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RevisionRef {
    pub name: ObjectName,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GitRef {
    pub repo: String,
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub directory: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OciRef {
    pub image: String,
}

/// Concrete resolved upstream recorded in a cloned package's Packfile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamLock {
    /// Object name of the resolved peer revision, or the resolved external
    /// ref for git/OCI upstreams.
    pub resolved: String,
    /// Blake3 digest of the fetched content.
    pub digest: Digest,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_tag_roundtrip() {
        let task = Task::Clone(CloneTaskSpec {
            upstream: Upstream::Revision(RevisionRef {
                name: ObjectName::new("blueprints.base.v1"),
            }),
        });
        let yaml = serde_yaml::to_string(&task).unwrap();
        assert!(yaml.contains("type: clone"));
        let back: Task = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, task);
    }

    #[test]
    fn unknown_task_type_rejected() {
        let err = serde_yaml::from_str::<Task>("type: rebase\n");
        assert!(err.is_err());
    }

    #[test]
    fn git_ref_uses_ref_key() {
        let upstream = Upstream::Git(GitRef {
            repo: "https://example.com/pkgs.git".to_owned(),
            reference: "v1.0.2".to_owned(),
            directory: "net".to_owned(),
        });
        let yaml = serde_yaml::to_string(&upstream).unwrap();
        assert!(yaml.contains("ref: v1.0.2"));
        let back: Upstream = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, upstream);
    }

    #[test]
    fn patch_type_names() {
        let yaml = serde_yaml::to_string(&PatchType::CreateFile).unwrap();
        assert_eq!(yaml.trim(), "createFile");
        let yaml = serde_yaml::to_string(&PatchType::DeleteFile).unwrap();
        assert_eq!(yaml.trim(), "deleteFile");
    }

    #[test]
    fn eval_config_map_omitted_when_empty() {
        let task = Task::Eval(EvalTaskSpec {
            image: "gcr.io/fn/set-labels:v0.2".to_owned(),
            config_map: BTreeMap::new(),
        });
        let yaml = serde_yaml::to_string(&task).unwrap();
        assert!(!yaml.contains("configMap"));
    }

    #[test]
    fn task_kind_names() {
        let task = Task::Init(InitTaskSpec::default());
        assert_eq!(task.kind(), "init");
        assert!(task.is_init());
        assert!(!task.is_clone());
    }
}
