//! API data model for the Bindery package-revision engine.
//!
//! This crate defines the schema layer: the `PackageRevision` desired-state
//! object and its lifecycle, the `Task` recipe variants (`Init`, `Clone`,
//! `Update`, `Patch`, `Edit`, `Eval`), upstream references, and the `Packfile`
//! package manifest with its pipeline and upstream-lock stanzas.

pub mod packfile;
pub mod revision;
pub mod task;
pub mod types;

pub use packfile::{
    parse_packfile_str, Condition, ConditionStatus, FunctionSpec, PackageInfo, Packfile,
    PackfileError, PackfileMetadata, PackfileStatus, Pipeline, ReadinessGate,
};
pub use revision::{Lifecycle, PackageRevision, PackageRevisionSpec, PackageRevisionStatus};
pub use task::{
    CloneTaskSpec, EditTaskSpec, EvalTaskSpec, GitRef, InitTaskSpec, OciRef, PatchSpec,
    PatchTaskSpec, PatchType, RevisionRef, Task, UpdateTaskSpec, Upstream, UpstreamLock,
};
pub use types::{Digest, ObjectName, PackageName, RepositoryName};

/// File name of the package manifest at the package root.
pub const PACKFILE_NAME: &str = "Packfile";

/// `apiVersion` carried by every Packfile.
pub const PACKFILE_API_VERSION: &str = "bindery.dev/v1";

/// Name of the reserved context ConfigMap carrying hierarchical
/// package-path information inherited by descendant packages.
pub const PACKAGE_CONTEXT_NAME: &str = "package-context";

/// Conventional file holding the context ConfigMap in a freshly
/// initialized package.
pub const PACKAGE_CONTEXT_FILE: &str = "package-context.yaml";

/// Context ConfigMap data key: the package's own name.
pub const CONFIG_KEY_NAME: &str = "name";

/// Context ConfigMap data key: the hierarchical package path.
pub const CONFIG_KEY_PACKAGE_PATH: &str = "package-path";

/// Synthetic label marking the latest published revision of a package.
/// Computed when presenting a revision; never written back to storage.
pub const LATEST_REVISION_LABEL: &str = "bindery.dev/latest-revision";
pub const LATEST_REVISION_VALUE: &str = "true";

/// Reserved Eval image literal meaning "run the full renderer".
pub const RENDER_IMAGE_SENTINEL: &str = "render";
