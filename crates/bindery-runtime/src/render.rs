//! Pipeline rendering: replay a package's declared function chain.

use crate::function::{FunctionConfig, FunctionRuntime};
use crate::RuntimeError;
use bindery_repository::{CancelToken, PackageResources};
use bindery_schema::{parse_packfile_str, PACKFILE_NAME};
use tracing::debug;

/// Runs the full declarative pipeline over a file set.
///
/// Rendering must be idempotent: rendering an already-rendered package is a
/// no-op as long as the declared functions are themselves idempotent.
pub trait Renderer: Send + Sync {
    fn render(
        &self,
        cancel: &CancelToken,
        resources: PackageResources,
        runtime: &dyn FunctionRuntime,
    ) -> Result<PackageResources, RuntimeError>;
}

/// Default renderer: reads the `pipeline` stanza of the package's Packfile
/// and executes each declared mutator in order through the runtime.
///
/// A package without a Packfile, or whose Packfile declares no pipeline,
/// renders to itself.
#[derive(Debug, Default)]
pub struct PipelineRenderer;

impl PipelineRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl Renderer for PipelineRenderer {
    fn render(
        &self,
        cancel: &CancelToken,
        resources: PackageResources,
        runtime: &dyn FunctionRuntime,
    ) -> Result<PackageResources, RuntimeError> {
        cancel.check()?;
        let packfile = match resources.get(PACKFILE_NAME) {
            Some(contents) => parse_packfile_str(contents)?,
            None => {
                debug!("no {PACKFILE_NAME} in package; nothing to render");
                return Ok(resources);
            }
        };

        let mutators = packfile
            .pipeline
            .map(|p| p.mutators)
            .unwrap_or_default();
        if mutators.is_empty() {
            return Ok(resources);
        }

        debug!("rendering pipeline of {} mutators", mutators.len());
        let mut current = resources;
        for function in mutators {
            cancel.check()?;
            let config = FunctionConfig::new(function.config_map);
            current = runtime.run(cancel, &function.image, &config, current)?;
        }
        Ok(current)
    }
}
