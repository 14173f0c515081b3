//! Request boundary - adapts a pipeline to a respond-or-continue handler

use crate::core::{
    context::PipelineContext,
    error::{ConstructionError, PipelineError},
    merge::Data,
    pipeline::{Node, Pipeline},
};
use tracing::warn;

/// Receives the final data of a successful invocation
pub trait Responder {
    fn send_json(&mut self, data: &Data) -> anyhow::Result<()>;
}

/// Responder that serializes the data into an in-memory JSON body
#[derive(Debug, Clone, Default)]
pub struct JsonResponder {
    body: Option<String>,
}

impl JsonResponder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialized body, once a response has been sent
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }
}

impl Responder for JsonResponder {
    fn send_json(&mut self, data: &Data) -> anyhow::Result<()> {
        self.body = Some(serde_json::to_string(data)?);
        Ok(())
    }
}

/// A pipeline compiled into a `(context, responder, next)` handler
#[derive(Debug, Clone)]
pub struct Middleware {
    pipeline: Pipeline,
}

impl Middleware {
    /// Build the handler. Structural errors surface here and no handler is
    /// produced.
    pub fn new(nodes: Vec<Node>) -> Result<Self, ConstructionError> {
        Ok(Self::from_pipeline(Pipeline::new(nodes)?))
    }

    pub fn from_pipeline(pipeline: Pipeline) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Run the pipeline once. On success the final data goes to the
    /// responder; any failure, including one from the responder itself, goes
    /// to `next` instead.
    pub async fn handle<R, N>(&self, ctx: PipelineContext, responder: &mut R, next: N)
    where
        R: Responder + ?Sized,
        N: FnOnce(PipelineError),
    {
        let outcome = match self.pipeline.execute(ctx).await {
            Ok(data) => responder.send_json(&data).map_err(PipelineError::from),
            Err(e) => Err(e),
        };

        if let Err(e) = outcome {
            warn!("Pipeline {} handed error to continuation: {}", self.pipeline.name, e);
            next(e);
        }
    }
}
