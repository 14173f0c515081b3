//! stagewise - composable request pipelines
//!
//! A pipeline is an ordered list of stages. Each stage validates its input,
//! fetches new data and transforms the result; nested lists fan out in
//! parallel and merge back in declared order.

pub mod cli;
pub mod core;
pub mod execution;

// Re-export commonly used types
pub use crate::core::{
    ConstructionError, Data, FieldSpec, Node, Pipeline, PipelineContext, PipelineError,
    PipelineResult, Stage, Validate, ValidationError, ValidationSpec,
};
pub use crate::core::config::{HandlerRegistry, PipelineConfig};
pub use execution::{branch, debug, pick, pipe, promisify, run, tap, Middleware, Responder};
