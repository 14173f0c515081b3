//! Pipeline runner - serial chaining and parallel fan-out
//!
//! Top-level elements run one after another, each seeing exactly the data its
//! predecessor produced. A group spawns every member as its own task from the
//! same context, waits for all of them and folds their data in declared order.

use crate::core::{
    context::PipelineContext,
    error::{PipelineError, PipelineResult},
    merge::{merge, merge_all, Data},
    pipeline::{Node, Pipeline},
    stage::Stage,
};
use futures::future::{try_join_all, BoxFuture, FutureExt};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Run one stage: validate, fetch, merge, transform.
///
/// Returns a new context whose data is the transform output; every other
/// field of `ctx` is carried over unchanged.
pub async fn run_stage(stage: &Stage, ctx: PipelineContext) -> PipelineResult<PipelineContext> {
    debug!("Running stage {}", stage.label());

    let validated = stage.validated_data(&ctx).await?;
    let partial = stage.fetched_data(&ctx, validated).await?;
    let merged = merge(&ctx.data, &partial);
    let final_data = stage.transformed_data(&ctx, merged).await?;

    Ok(ctx.with_data(final_data))
}

/// Run a single element, recursing into groups at any depth.
///
/// A panicking handler surfaces as [`PipelineError::Panicked`] whether its
/// stage runs serially or inside a group.
pub fn run_node(node: Node, ctx: PipelineContext) -> BoxFuture<'static, PipelineResult<PipelineContext>> {
    async move {
        match node {
            Node::Stage(stage) => match AssertUnwindSafe(run_stage(&stage, ctx)).catch_unwind().await {
                Ok(result) => result,
                Err(payload) => Err(PipelineError::Panicked {
                    stage: stage.label().to_string(),
                    message: panic_message(payload.as_ref()),
                }),
            },
            Node::Group(members) => run_group(members, ctx).await,
        }
    }
    .boxed()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Fan out over a group and merge the members' data in declared order.
///
/// The first member failure observed becomes the group's failure. Members
/// already running are left to finish on their own; their results are dropped.
async fn run_group(members: Vec<Node>, ctx: PipelineContext) -> PipelineResult<PipelineContext> {
    debug!("Fanning out over {} group members", members.len());

    let handles: Vec<_> = members
        .into_iter()
        .map(|member| tokio::spawn(run_node(member, ctx.clone())))
        .collect();

    let outputs = try_join_all(handles.into_iter().map(|handle| async move {
        match handle.await {
            Ok(result) => result,
            Err(join_error) => Err(PipelineError::TaskFailed(join_error.to_string())),
        }
    }))
    .await?;

    let merged = merge_all(&ctx.data, outputs.iter().map(|member| &member.data));
    Ok(ctx.with_data(merged))
}

/// Run `nodes` serially from `ctx` and return the final data.
///
/// An empty list returns the context's data untouched. Must be called from
/// within a tokio runtime, since groups spawn their members.
pub async fn run(nodes: &[Node], ctx: PipelineContext) -> PipelineResult<Data> {
    let mut ctx = ctx;
    for node in nodes {
        ctx = run_node(node.clone(), ctx).await?;
    }
    Ok(ctx.into_data())
}

impl Pipeline {
    /// Execute the whole pipeline once for `ctx`
    pub async fn execute(&self, ctx: PipelineContext) -> PipelineResult<Data> {
        let invocation = Uuid::new_v4();
        let span = info_span!("pipeline", name = %self.name, invocation = %invocation);

        async move {
            info!("Starting pipeline execution: {} ({} stages)", self.name, self.stage_count());
            let result = run(self.nodes(), ctx).await;
            match &result {
                Ok(data) => info!("Pipeline execution finished: {} ({} keys)", self.name, data.len()),
                Err(e) => warn!("Pipeline execution failed: {} - {}", self.name, e),
            }
            result
        }
        .instrument(span)
        .await
    }
}
