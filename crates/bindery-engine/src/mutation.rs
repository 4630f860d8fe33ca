//! The mutation chain: uniform capability behind every task.

use crate::EngineError;
use bindery_repository::{CancelToken, PackageDraft, PackageResources};
use bindery_schema::Task;

/// One transformation on a package's file set.
///
/// Applying a mutation is pure with respect to the draft: it consumes the
/// current file set and returns the new file set together with the audit
/// task recorded in the revision's history.
pub(crate) trait Mutation: Send + Sync {
    fn apply(
        &self,
        cancel: &CancelToken,
        resources: PackageResources,
    ) -> Result<(PackageResources, Task), EngineError>;

    /// True only for the full-render mutation; used to keep render
    /// appends idempotent.
    fn is_render(&self) -> bool {
        false
    }
}

/// Serial mutation pipeline executor.
///
/// Ordering is semantically load-bearing: each mutation sees the previous
/// mutation's output, and every step is recorded on the draft before the
/// next runs. An error aborts the pipeline; partial draft state is
/// tolerated because the draft is never closed on the error path.
pub(crate) fn apply_resource_mutations(
    cancel: &CancelToken,
    draft: &mut dyn PackageDraft,
    base: PackageResources,
    mutations: &[Box<dyn Mutation>],
) -> Result<PackageResources, EngineError> {
    let mut current = base;
    for mutation in mutations {
        let (applied, task) = mutation.apply(cancel, current)?;
        draft.update_resources(cancel, applied.clone(), task)?;
        current = applied;
    }
    Ok(current)
}
