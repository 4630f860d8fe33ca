//! Function execution layer for the Bindery engine.
//!
//! This crate defines the `FunctionRuntime` trait behind which function
//! sandboxes (image, gRPC, native) plug in, the `Renderer` that replays a
//! package's declared pipeline through a runtime, and a deterministic mock
//! runtime for tests.

pub mod function;
pub mod mock;
pub mod render;

pub use function::{FunctionConfig, FunctionRuntime};
pub use mock::MockRuntime;
pub use render::{PipelineRenderer, Renderer};

use bindery_repository::Canceled;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("function {image} failed: {message}")]
    FunctionFailed { image: String, message: String },
    #[error("no runtime available for function image: {0}")]
    ImageUnavailable(String),
    #[error("pipeline manifest error: {0}")]
    Packfile(#[from] bindery_schema::PackfileError),
    #[error(transparent)]
    Canceled(#[from] Canceled),
}
