//! Error types for pipeline construction and execution

use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Errors raised while a pipeline is being built
///
/// These are fatal: no runnable pipeline is produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstructionError {
    #[error("You must provide at least one stage")]
    Empty,

    #[error("All pipeline elements must be stages or non-empty groups - index: {path}")]
    NotAStage { path: IndexPath },

    #[error("Unrecognized stage key at index {path}: {key} <-> {suggestion}")]
    UnknownKey {
        path: IndexPath,
        key: String,
        suggestion: String,
    },

    #[error("No {key} handler registered under '{name}' - index: {path}")]
    UnknownHandler {
        path: IndexPath,
        key: String,
        name: String,
    },

    #[error("Invalid pipeline definition: {0}")]
    Parse(String),
}

/// Raised when a stage's validation specification rejects the context
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("ValidationError")]
pub struct ValidationError {
    /// Failing field name -> reason
    pub reasons: BTreeMap<String, String>,
}

impl ValidationError {
    pub fn new(reasons: BTreeMap<String, String>) -> Self {
        Self { reasons }
    }

    /// HTTP-style status classification ("bad request")
    pub fn status(&self) -> u16 {
        400
    }

    /// Reason recorded for a field, if it failed
    pub fn reason(&self, field: &str) -> Option<&str> {
        self.reasons.get(field).map(String::as_str)
    }
}

/// Any failure surfaced by a pipeline invocation
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Construction(#[from] ConstructionError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Failure from a fetch, transform or predicate handler, passed through as-is
    #[error(transparent)]
    Runtime(anyhow::Error),

    /// A handler panicked; the panic is contained to this invocation
    #[error("Stage {stage} panicked: {message}")]
    Panicked { stage: String, message: String },

    #[error("Group member task failed: {0}")]
    TaskFailed(String),
}

impl PipelineError {
    /// Validation details, when this is a validation failure
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            PipelineError::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for PipelineError {
    /// Handler errors that wrap a pipeline or validation error (as nested
    /// `pipe` and `branch` stages produce) are unwrapped back to their kind.
    fn from(err: anyhow::Error) -> Self {
        let err = match err.downcast::<PipelineError>() {
            Ok(inner) => return inner,
            Err(err) => err,
        };
        match err.downcast::<ValidationError>() {
            Ok(validation) => PipelineError::Validation(validation),
            Err(err) => PipelineError::Runtime(err),
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Position of an element inside a nested pipeline, rendered as `0:1:2`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexPath(Vec<usize>);

impl IndexPath {
    pub fn root() -> Self {
        Self::default()
    }

    /// Path of the `index`-th child of this path
    pub fn child(&self, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(index);
        Self(segments)
    }

    pub fn segments(&self) -> &[usize] {
        &self.0
    }
}

impl From<Vec<usize>> for IndexPath {
    fn from(segments: Vec<usize>) -> Self {
        Self(segments)
    }
}

impl fmt::Display for IndexPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.0.iter().map(|i| i.to_string()).collect();
        write!(f, "{}", rendered.join(":"))
    }
}
