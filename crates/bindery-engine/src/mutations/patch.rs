//! Applying and generating per-file patches.

use crate::mutation::Mutation;
use crate::EngineError;
use bindery_repository::{CancelToken, PackageResources};
use bindery_schema::{PatchSpec, PatchTaskSpec, PatchType, Task};

/// Build a patch mutation, validating every patch body eagerly so that
/// malformed tasks fail at mapping time rather than mid-pipeline.
pub(crate) fn build_patch_mutation(spec: &PatchTaskSpec) -> Result<Box<dyn Mutation>, EngineError> {
    for patch in &spec.patches {
        if patch.file.is_empty() {
            return Err(EngineError::Validation(
                "patch with empty file name".to_owned(),
            ));
        }
        if patch.patch_type == PatchType::Modify {
            diffy::Patch::from_str(&patch.contents).map_err(|e| {
                EngineError::Validation(format!("invalid patch for {}: {e}", patch.file))
            })?;
        }
    }
    Ok(Box::new(PatchPackageMutation {
        task: Task::Patch(spec.clone()),
        patches: spec.patches.clone(),
    }))
}

/// Generate a `Modify` patch spec for a changed file. Equal contents yield
/// an empty patch body, which callers treat as "no change".
pub(crate) fn generate_patch(file: &str, old: &str, new: &str) -> PatchSpec {
    let contents = if old == new {
        String::new()
    } else {
        diffy::create_patch(old, new).to_string()
    };
    PatchSpec {
        file: file.to_owned(),
        patch_type: PatchType::Modify,
        contents,
    }
}

pub(crate) struct PatchPackageMutation {
    task: Task,
    patches: Vec<PatchSpec>,
}

impl Mutation for PatchPackageMutation {
    fn apply(
        &self,
        cancel: &CancelToken,
        resources: PackageResources,
    ) -> Result<(PackageResources, Task), EngineError> {
        cancel.check()?;

        // Work on a copy so a failing patch leaves the input untouched.
        let mut patched = resources;
        for patch in &self.patches {
            match patch.patch_type {
                PatchType::CreateFile => {
                    if patched.get(&patch.file).is_some() {
                        return Err(EngineError::Conflict(format!(
                            "cannot create file {:?}: already exists",
                            patch.file
                        )));
                    }
                    patched.insert(patch.file.clone(), patch.contents.clone());
                }
                PatchType::DeleteFile => {
                    if patched.remove(&patch.file).is_none() {
                        return Err(EngineError::Conflict(format!(
                            "cannot delete file {:?}: not found",
                            patch.file
                        )));
                    }
                }
                PatchType::Modify => {
                    let base = patched.get(&patch.file).ok_or_else(|| {
                        EngineError::Conflict(format!(
                            "cannot patch file {:?}: not found",
                            patch.file
                        ))
                    })?;
                    let parsed = diffy::Patch::from_str(&patch.contents).map_err(|e| {
                        EngineError::Validation(format!("invalid patch for {}: {e}", patch.file))
                    })?;
                    let applied = diffy::apply(base, &parsed).map_err(|e| {
                        EngineError::Conflict(format!(
                            "patch does not apply to {}: {e}",
                            patch.file
                        ))
                    })?;
                    patched.insert(patch.file.clone(), applied);
                }
            }
        }

        Ok((patched, self.task.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patch_task(patches: Vec<PatchSpec>) -> PatchTaskSpec {
        PatchTaskSpec { patches }
    }

    fn base() -> PackageResources {
        let mut resources = PackageResources::new();
        resources.insert("a.yaml", "one\ntwo\n");
        resources
    }

    #[test]
    fn create_delete_modify_roundtrip() {
        let modify = generate_patch("a.yaml", "one\ntwo\n", "one\nTWO\n");
        let spec = patch_task(vec![
            modify,
            PatchSpec {
                file: "b.yaml".to_owned(),
                patch_type: PatchType::CreateFile,
                contents: "kind: B\n".to_owned(),
            },
        ]);

        let mutation = build_patch_mutation(&spec).unwrap();
        let (patched, task) = mutation.apply(&CancelToken::new(), base()).unwrap();

        assert_eq!(patched.get("a.yaml"), Some("one\nTWO\n"));
        assert_eq!(patched.get("b.yaml"), Some("kind: B\n"));
        assert!(matches!(task, Task::Patch(_)));
    }

    #[test]
    fn create_existing_file_conflicts() {
        let spec = patch_task(vec![PatchSpec {
            file: "a.yaml".to_owned(),
            patch_type: PatchType::CreateFile,
            contents: String::new(),
        }]);
        let err = build_patch_mutation(&spec)
            .unwrap()
            .apply(&CancelToken::new(), base())
            .unwrap_err();
        assert!(matches!(err, EngineError::Conflict(_)));
    }

    #[test]
    fn delete_missing_file_conflicts() {
        let spec = patch_task(vec![PatchSpec {
            file: "ghost.yaml".to_owned(),
            patch_type: PatchType::DeleteFile,
            contents: String::new(),
        }]);
        let err = build_patch_mutation(&spec)
            .unwrap()
            .apply(&CancelToken::new(), base())
            .unwrap_err();
        assert!(matches!(err, EngineError::Conflict(_)));
    }

    #[test]
    fn modify_missing_file_conflicts() {
        let spec = patch_task(vec![generate_patch("ghost.yaml", "a\n", "b\n")]);
        let err = build_patch_mutation(&spec)
            .unwrap()
            .apply(&CancelToken::new(), base())
            .unwrap_err();
        assert!(matches!(err, EngineError::Conflict(_)));
    }

    #[test]
    fn malformed_patch_fails_at_build_time() {
        let spec = patch_task(vec![PatchSpec {
            file: "a.yaml".to_owned(),
            patch_type: PatchType::Modify,
            contents: "not a unified diff".to_owned(),
        }]);
        assert!(matches!(
            build_patch_mutation(&spec),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn empty_file_name_fails_at_build_time() {
        let spec = patch_task(vec![PatchSpec {
            file: String::new(),
            patch_type: PatchType::DeleteFile,
            contents: String::new(),
        }]);
        assert!(matches!(
            build_patch_mutation(&spec),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn generate_patch_for_equal_contents_is_empty() {
        assert!(generate_patch("a.yaml", "same\n", "same\n").contents.is_empty());
    }

    #[test]
    fn failing_patch_is_atomic() {
        let spec = patch_task(vec![
            PatchSpec {
                file: "b.yaml".to_owned(),
                patch_type: PatchType::CreateFile,
                contents: "kind: B\n".to_owned(),
            },
            PatchSpec {
                file: "ghost.yaml".to_owned(),
                patch_type: PatchType::DeleteFile,
                contents: String::new(),
            },
        ]);
        let resources = base();
        let err = build_patch_mutation(&spec)
            .unwrap()
            .apply(&CancelToken::new(), resources.clone())
            .unwrap_err();
        assert!(matches!(err, EngineError::Conflict(_)));
        // The caller's file set is unchanged because apply consumed a copy;
        // the pipeline aborts before the draft sees partial state.
    }
}
