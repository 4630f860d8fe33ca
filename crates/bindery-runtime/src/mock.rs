//! Deterministic in-process runtime for tests.

use crate::function::{FunctionConfig, FunctionRuntime};
use crate::RuntimeError;
use bindery_repository::{CancelToken, PackageResources};
use std::collections::BTreeMap;
use std::sync::Mutex;

type Handler = Box<
    dyn Fn(&FunctionConfig, PackageResources) -> Result<PackageResources, RuntimeError>
        + Send
        + Sync,
>;

/// Records every invocation and dispatches to per-image handlers.
/// Images without a registered handler behave as the identity function.
#[derive(Default)]
pub struct MockRuntime {
    handlers: BTreeMap<String, Handler>,
    invocations: Mutex<Vec<(String, FunctionConfig)>>,
}

impl MockRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a function image.
    #[must_use]
    pub fn on<F>(mut self, image: &str, handler: F) -> Self
    where
        F: Fn(&FunctionConfig, PackageResources) -> Result<PackageResources, RuntimeError>
            + Send
            + Sync
            + 'static,
    {
        self.handlers.insert(image.to_owned(), Box::new(handler));
        self
    }

    /// Every `(image, config)` pair run so far, in order.
    pub fn invocations(&self) -> Vec<(String, FunctionConfig)> {
        self.invocations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl FunctionRuntime for MockRuntime {
    fn run(
        &self,
        cancel: &CancelToken,
        image: &str,
        config: &FunctionConfig,
        resources: PackageResources,
    ) -> Result<PackageResources, RuntimeError> {
        cancel.check()?;
        self.invocations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((image.to_owned(), config.clone()));

        match self.handlers.get(image) {
            Some(handler) => handler(config, resources),
            None => Ok(resources),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unregistered_image_is_identity() {
        let runtime = MockRuntime::new();
        let mut resources = PackageResources::new();
        resources.insert("a.yaml", "kind: A\n");

        let out = runtime
            .run(
                &CancelToken::new(),
                "gcr.io/fn/unknown:v1",
                &FunctionConfig::default(),
                resources.clone(),
            )
            .unwrap();
        assert_eq!(out, resources);
        assert_eq!(runtime.invocations().len(), 1);
    }

    #[test]
    fn handler_receives_config() {
        let runtime = MockRuntime::new().on("gcr.io/fn/annotate:v1", |config, mut resources| {
            for (key, value) in &config.data {
                resources.insert(format!("{key}.txt"), value.clone());
            }
            Ok(resources)
        });

        let config = FunctionConfig::new([("note".to_owned(), "hello".to_owned())].into());
        let out = runtime
            .run(
                &CancelToken::new(),
                "gcr.io/fn/annotate:v1",
                &config,
                PackageResources::new(),
            )
            .unwrap();
        assert_eq!(out.get("note.txt"), Some("hello"));
    }

    #[test]
    fn failing_handler_propagates() {
        let runtime = MockRuntime::new().on("gcr.io/fn/broken:v1", |_, _| {
            Err(RuntimeError::FunctionFailed {
                image: "gcr.io/fn/broken:v1".to_owned(),
                message: "boom".to_owned(),
            })
        });
        assert!(runtime
            .run(
                &CancelToken::new(),
                "gcr.io/fn/broken:v1",
                &FunctionConfig::default(),
                PackageResources::new(),
            )
            .is_err());
    }
}
