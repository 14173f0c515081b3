//! Stage constructors built on the runner
//!
//! These let a whole pipeline stand in for a single stage (`pipe`), pick
//! between two sub-pipelines (`branch`), or observe data without changing it
//! (`tap`, `debug`).

use crate::core::{
    context::PipelineContext,
    error::{ConstructionError, PipelineResult},
    merge::Data,
    pipeline::Node,
    stage::Stage,
    structure,
};
use crate::execution::runner::run;
use futures::future::{BoxFuture, FutureExt};
use std::sync::Arc;
use tracing::debug;

/// A stage whose transform calls `observe` and passes data through unchanged
pub fn tap<F>(observe: F) -> Stage
where
    F: Fn(&PipelineContext, &Data) + Send + Sync + 'static,
{
    Stage::new().named("tap").transform_sync(move |ctx, data| {
        observe(ctx, &data);
        Ok(data)
    })
}

/// A `tap` that logs the current data at debug level under `label`
pub fn debug(label: impl Into<String>) -> Stage {
    let label = label.into();
    tap(move |_ctx, data| {
        debug!(label = %label, "{}", serde_json::Value::Object(data.clone()));
    })
    .named("debug")
}

/// A stage that keeps only the listed keys. Keys missing from the data are
/// ignored.
pub fn pick<I, K>(keys: I) -> Stage
where
    I: IntoIterator<Item = K>,
    K: Into<String>,
{
    let keys: Vec<String> = keys.into_iter().map(Into::into).collect();
    Stage::new().named("pick").transform_sync(move |_ctx, data| {
        Ok(data
            .into_iter()
            .filter(|(key, _)| keys.contains(key))
            .collect())
    })
}

/// A stage that runs `nodes` as a nested pipeline.
///
/// The nested pipeline starts from the stage's context with the transform's
/// input as its data, and its final data becomes the stage's output.
pub fn pipe(nodes: Vec<Node>) -> Result<Stage, ConstructionError> {
    structure::check_nodes(&nodes)?;
    let nodes: Arc<[Node]> = nodes.into();

    Ok(Stage::new().named("pipe").transform(move |ctx, data| {
        let nodes = nodes.clone();
        async move { Ok(run(&nodes, ctx.with_data(data)).await?) }
    }))
}

/// A stage that runs exactly one of two sub-pipelines, chosen by `predicate`
/// on the transform's context and input.
pub fn branch<P>(
    predicate: P,
    if_true: impl Into<Node>,
    if_false: impl Into<Node>,
) -> Result<Stage, ConstructionError>
where
    P: Fn(&PipelineContext, &Data) -> anyhow::Result<bool> + Send + Sync + 'static,
{
    let if_true: Node = if_true.into();
    let if_false: Node = if_false.into();
    structure::check_nodes(std::slice::from_ref(&if_true))?;
    structure::check_nodes(std::slice::from_ref(&if_false))?;

    Ok(Stage::new().named("branch").transform(move |ctx, data| {
        let chosen = predicate(&ctx, &data).map(|taken| {
            debug!("Branch predicate returned {}", taken);
            if taken { if_true.clone() } else { if_false.clone() }
        });
        async move {
            let chosen = chosen?;
            Ok(run(&[chosen], ctx.with_data(data)).await?)
        }
    }))
}

/// A nested pipeline exposed as a plain async function of the context
pub type Promised = Arc<dyn Fn(PipelineContext) -> BoxFuture<'static, PipelineResult<Data>> + Send + Sync>;

/// Expose `nodes` as an awaitable function, bypassing any request boundary
pub fn promisify(nodes: Vec<Node>) -> Result<Promised, ConstructionError> {
    structure::check_nodes(&nodes)?;
    let nodes: Arc<[Node]> = nodes.into();

    Ok(Arc::new(move |ctx: PipelineContext| {
        let nodes = nodes.clone();
        async move { run(&nodes, ctx).await }.boxed()
    }))
}
