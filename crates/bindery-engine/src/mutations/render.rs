//! Full pipeline render.

use crate::mutation::Mutation;
use crate::EngineError;
use bindery_repository::{CancelToken, PackageResources};
use bindery_runtime::{FunctionRuntime, Renderer};
use bindery_schema::{EvalTaskSpec, Task, RENDER_IMAGE_SENTINEL};
use std::collections::BTreeMap;
use std::sync::Arc;

pub(crate) struct RenderPackageMutation {
    renderer: Arc<dyn Renderer>,
    runtime: Arc<dyn FunctionRuntime>,
}

impl RenderPackageMutation {
    pub fn new(renderer: Arc<dyn Renderer>, runtime: Arc<dyn FunctionRuntime>) -> Self {
        Self { renderer, runtime }
    }
}

impl Mutation for RenderPackageMutation {
    fn apply(
        &self,
        cancel: &CancelToken,
        resources: PackageResources,
    ) -> Result<(PackageResources, Task), EngineError> {
        cancel.check()?;
        let rendered = self
            .renderer
            .render(cancel, resources, self.runtime.as_ref())?;
        let task = Task::Eval(EvalTaskSpec {
            image: RENDER_IMAGE_SENTINEL.to_owned(),
            config_map: BTreeMap::new(),
        });
        Ok((rendered, task))
    }

    fn is_render(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bindery_runtime::{MockRuntime, PipelineRenderer};

    #[test]
    fn audit_task_carries_the_render_sentinel() {
        let mutation = RenderPackageMutation::new(
            Arc::new(PipelineRenderer::new()),
            Arc::new(MockRuntime::new()),
        );
        let (_, task) = mutation
            .apply(&CancelToken::new(), PackageResources::new())
            .unwrap();
        match task {
            Task::Eval(spec) => assert_eq!(spec.image, RENDER_IMAGE_SENTINEL),
            other => panic!("expected eval task, got {}", other.kind()),
        }
        assert!(mutation.is_render());
    }
}
