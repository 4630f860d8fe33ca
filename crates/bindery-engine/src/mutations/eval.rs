//! Single function invocation.

use crate::mutation::Mutation;
use crate::EngineError;
use bindery_repository::{CancelToken, PackageResources};
use bindery_runtime::{FunctionConfig, FunctionRuntime};
use bindery_schema::{EvalTaskSpec, Task};
use std::sync::Arc;

pub(crate) struct EvalFunctionMutation {
    spec: EvalTaskSpec,
    task: Task,
    runtime: Arc<dyn FunctionRuntime>,
}

impl EvalFunctionMutation {
    pub fn new(spec: EvalTaskSpec, runtime: Arc<dyn FunctionRuntime>) -> Self {
        let task = Task::Eval(spec.clone());
        Self {
            spec,
            task,
            runtime,
        }
    }
}

impl Mutation for EvalFunctionMutation {
    fn apply(
        &self,
        cancel: &CancelToken,
        resources: PackageResources,
    ) -> Result<(PackageResources, Task), EngineError> {
        cancel.check()?;
        let config = FunctionConfig::new(self.spec.config_map.clone());
        let output = self
            .runtime
            .run(cancel, &self.spec.image, &config, resources)?;
        Ok((output, self.task.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bindery_runtime::MockRuntime;
    use std::collections::BTreeMap;

    #[test]
    fn runs_the_declared_image_with_config() {
        let runtime = Arc::new(MockRuntime::new());
        let mut config_map = BTreeMap::new();
        config_map.insert("k".to_owned(), "v".to_owned());
        let mutation = EvalFunctionMutation::new(
            EvalTaskSpec {
                image: "gcr.io/fn/set-labels:v0.2".to_owned(),
                config_map,
            },
            Arc::clone(&runtime) as Arc<dyn FunctionRuntime>,
        );

        let (_, task) = mutation
            .apply(&CancelToken::new(), PackageResources::new())
            .unwrap();

        assert!(matches!(task, Task::Eval(_)));
        let invocations = runtime.invocations();
        assert_eq!(invocations.len(), 1);
        assert_eq!(invocations[0].0, "gcr.io/fn/set-labels:v0.2");
        assert_eq!(invocations[0].1.data.get("k").map(String::as_str), Some("v"));
    }
}
