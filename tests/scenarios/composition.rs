//! Composition helpers: nested pipelines, branching and awaitable pipelines

use crate::helpers::*;
use serde_json::json;
use stagewise::core::{Node, PipelineContext, Stage};
use stagewise::execution::{branch, pick, pipe, promisify, run, tap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[tokio::test]
async fn test_pipe_is_associative() {
    let a = || adds(json!({ "a": 1, "k": "a" }));
    let b = || fetches(json!({ "b": 2, "k": "b" }));
    let c = || adds(json!({ "c": 3 }));
    let input = || context(json!({ "data": { "seed": true } }));

    let right = pipe(vec![a().into(), pipe(vec![b().into(), c().into()]).unwrap().into()]).unwrap();
    let left = pipe(vec![pipe(vec![a().into(), b().into()]).unwrap().into(), c().into()]).unwrap();
    let flat: Vec<Node> = vec![a().into(), b().into(), c().into()];

    let right_out = run(&[right.into()], input()).await.unwrap();
    let left_out = run(&[left.into()], input()).await.unwrap();
    let flat_out = run(&flat, input()).await.unwrap();

    assert_eq!(right_out, left_out);
    assert_eq!(left_out, flat_out);
    assert_eq!(flat_out, data(json!({ "seed": true, "a": 1, "b": 2, "c": 3, "k": "b" })));
}

#[tokio::test]
async fn test_branch_never_runs_the_other_side() {
    let stage = branch(
        |_, current| Ok(current.get("flag") == Some(&json!(true))),
        adds(json!({ "took": "true-side" })),
        fails("false side must not run"),
    )
    .unwrap();

    let out = run(&[stage.into()], context(json!({ "data": { "flag": true } })))
        .await
        .unwrap();
    assert_eq!(out["took"], json!("true-side"));
}

#[tokio::test]
async fn test_branch_sides_can_be_groups() {
    let stage = branch(
        |ctx, _| Ok(ctx.field("fan_out").is_some()),
        Node::group([fetches(json!({ "x": 1 })), fetches(json!({ "y": 2 }))]),
        Stage::new(),
    )
    .unwrap();

    let out = run(&[stage.clone().into()], context(json!({ "fan_out": 1 }))).await.unwrap();
    assert_eq!(out, data(json!({ "x": 1, "y": 2 })));

    let out = run(&[stage.into()], PipelineContext::new()).await.unwrap();
    assert!(out.is_empty());
}

#[tokio::test]
async fn test_pipe_inside_group() {
    let nested = pipe(vec![fetches(json!({ "n": 1 })).into(), adds(json!({ "m": 2 })).into()]).unwrap();
    let nodes = vec![Node::group([nested, fetches(json!({ "o": 3 }))])];

    let out = run(&nodes, PipelineContext::new()).await.unwrap();
    assert_eq!(out, data(json!({ "n": 1, "m": 2, "o": 3 })));
}

#[tokio::test]
async fn test_tap_then_pick() {
    let taps = Arc::new(AtomicUsize::new(0));
    let counter = taps.clone();
    let nodes: Vec<Node> = vec![
        fetches(json!({ "keep": 1, "drop": 2 })).into(),
        tap(move |_, current| {
            if current.contains_key("drop") {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        })
        .into(),
        pick(["keep"]).into(),
    ];

    let out = run(&nodes, PipelineContext::new()).await.unwrap();
    assert_eq!(out, data(json!({ "keep": 1 })));
    assert_eq!(taps.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_promisified_pipeline_can_be_called_repeatedly() {
    let call = promisify(vec![
        Stage::new()
            .fetch_sync(|ctx, _| Ok(data(json!({ "echo": ctx.field("msg").cloned().unwrap_or_default() }))))
            .into(),
    ])
    .unwrap();

    let first = call(context(json!({ "msg": "one" }))).await.unwrap();
    let second = call(context(json!({ "msg": "two" }))).await.unwrap();

    assert_eq!(first, data(json!({ "echo": "one" })));
    assert_eq!(second, data(json!({ "echo": "two" })));
}
