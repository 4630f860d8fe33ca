use crate::RuntimeError;
use bindery_repository::{CancelToken, PackageResources};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Configuration handed to a single function invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct FunctionConfig {
    pub data: BTreeMap<String, String>,
}

impl FunctionConfig {
    pub fn new(data: BTreeMap<String, String>) -> Self {
        Self { data }
    }
}

/// Executes one transformation function over a package's file set.
///
/// Implementations own sandboxing, networking, and authentication; the
/// engine only sequences invocations. A run must be side-effect free with
/// respect to the input: the returned file set fully replaces it.
pub trait FunctionRuntime: Send + Sync {
    fn run(
        &self,
        cancel: &CancelToken,
        image: &str,
        config: &FunctionConfig,
        resources: PackageResources,
    ) -> Result<PackageResources, RuntimeError>;
}
