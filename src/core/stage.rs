//! Stage domain model
//!
//! A stage is the atomic unit of a pipeline: an optional validation
//! specification, an optional fetch handler and an optional transform
//! handler. Each missing piece falls back to an identity default.

use crate::core::{
    context::PipelineContext,
    error::ValidationError,
    merge::Data,
    validation::ValidationSpec,
};
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Checks a stage's context and yields the validated input for fetch
#[async_trait]
pub trait Validate: Send + Sync {
    async fn validate(&self, ctx: &PipelineContext) -> Result<Data, ValidationError>;
}

/// Produces new data for a stage from its validated input
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, ctx: &PipelineContext, validated: Data) -> anyhow::Result<Data>;
}

/// Shapes a stage's merged data into its final output
#[async_trait]
pub trait Transform: Send + Sync {
    async fn transform(&self, ctx: &PipelineContext, merged: Data) -> anyhow::Result<Data>;
}

#[async_trait]
impl<F, Fut> Validate for F
where
    F: Fn(PipelineContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Data, ValidationError>> + Send + 'static,
{
    async fn validate(&self, ctx: &PipelineContext) -> Result<Data, ValidationError> {
        self(ctx.clone()).await
    }
}

#[async_trait]
impl<F, Fut> Fetch for F
where
    F: Fn(PipelineContext, Data) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Data>> + Send + 'static,
{
    async fn fetch(&self, ctx: &PipelineContext, validated: Data) -> anyhow::Result<Data> {
        self(ctx.clone(), validated).await
    }
}

#[async_trait]
impl<F, Fut> Transform for F
where
    F: Fn(PipelineContext, Data) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Data>> + Send + 'static,
{
    async fn transform(&self, ctx: &PipelineContext, merged: Data) -> anyhow::Result<Data> {
        self(ctx.clone(), merged).await
    }
}

/// A single stage in a pipeline
#[derive(Clone, Default)]
pub struct Stage {
    /// Label used in logs
    pub name: Option<String>,

    validate: Option<Arc<dyn Validate>>,
    fetch: Option<Arc<dyn Fetch>>,
    transform: Option<Arc<dyn Transform>>,
}

impl Stage {
    /// Create a stage with every phase set to its identity default
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Validate the context with a declarative specification
    pub fn validate(self, spec: ValidationSpec) -> Self {
        self.validate_with(Arc::new(spec))
    }

    /// Validate the context with an async function
    pub fn validate_async<F, Fut>(self, validate: F) -> Self
    where
        F: Fn(PipelineContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Data, ValidationError>> + Send + 'static,
    {
        self.validate_with(Arc::new(validate))
    }

    pub fn validate_with(mut self, validate: Arc<dyn Validate>) -> Self {
        self.validate = Some(validate);
        self
    }

    pub fn fetch<F, Fut>(self, fetch: F) -> Self
    where
        F: Fn(PipelineContext, Data) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Data>> + Send + 'static,
    {
        self.fetch_with(Arc::new(fetch))
    }

    /// Fetch with a synchronous function
    pub fn fetch_sync<F>(self, fetch: F) -> Self
    where
        F: Fn(&PipelineContext, Data) -> anyhow::Result<Data> + Send + Sync + 'static,
    {
        self.fetch(move |ctx, data| {
            let result = fetch(&ctx, data);
            async move { result }
        })
    }

    pub fn fetch_with(mut self, fetch: Arc<dyn Fetch>) -> Self {
        self.fetch = Some(fetch);
        self
    }

    pub fn transform<F, Fut>(self, transform: F) -> Self
    where
        F: Fn(PipelineContext, Data) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Data>> + Send + 'static,
    {
        self.transform_with(Arc::new(transform))
    }

    /// Transform with a synchronous function
    pub fn transform_sync<F>(self, transform: F) -> Self
    where
        F: Fn(&PipelineContext, Data) -> anyhow::Result<Data> + Send + Sync + 'static,
    {
        self.transform(move |ctx, data| {
            let result = transform(&ctx, data);
            async move { result }
        })
    }

    pub fn transform_with(mut self, transform: Arc<dyn Transform>) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn has_validation(&self) -> bool {
        self.validate.is_some()
    }

    /// Name for log output
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("<anonymous>")
    }

    /// Run the validation phase.
    ///
    /// Without a specification the context's data is the validated data.
    pub async fn validated_data(&self, ctx: &PipelineContext) -> Result<Data, ValidationError> {
        match &self.validate {
            Some(validate) => validate.validate(ctx).await,
            None => Ok(ctx.data.clone()),
        }
    }

    /// Run the fetch phase; identity when no handler is set
    pub async fn fetched_data(&self, ctx: &PipelineContext, validated: Data) -> anyhow::Result<Data> {
        match &self.fetch {
            Some(fetch) => fetch.fetch(ctx, validated).await,
            None => Ok(validated),
        }
    }

    /// Run the transform phase; identity when no handler is set
    pub async fn transformed_data(&self, ctx: &PipelineContext, merged: Data) -> anyhow::Result<Data> {
        match &self.transform {
            Some(transform) => transform.transform(ctx, merged).await,
            None => Ok(merged),
        }
    }
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage")
            .field("name", &self.name)
            .field("validate", &self.validate.is_some())
            .field("fetch", &self.fetch.is_some())
            .field("transform", &self.transform.is_some())
            .finish()
    }
}
