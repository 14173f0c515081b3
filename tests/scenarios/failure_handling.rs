//! Failure propagation through stages, groups and the request boundary

use crate::helpers::*;
use serde_json::json;
use stagewise::core::{rules, ConstructionError, FieldSpec, Node, PipelineContext, PipelineError, Stage, ValidationSpec};
use stagewise::execution::{run, JsonResponder, Middleware};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_failure_stops_later_stages() {
    let log = CallLog::new();
    let nodes: Vec<Node> = vec![log.stage("a").into(), fails("stop here").into(), log.stage("c").into()];

    let err = run(&nodes, PipelineContext::new()).await.unwrap_err();

    assert_eq!(err.to_string(), "stop here");
    assert_eq!(log.calls(), vec!["a"]);
}

#[tokio::test]
async fn test_group_failure_does_not_wait_for_slow_members() {
    let finished = Arc::new(AtomicBool::new(false));
    let flag = finished.clone();
    let slow = Stage::new().fetch(move |_, d| {
        let flag = flag.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            flag.store(true, Ordering::SeqCst);
            Ok(d)
        }
    });

    let nodes = vec![Node::group([slow, fails("fast failure")])];
    let err = run(&nodes, PipelineContext::new()).await.unwrap_err();

    assert_eq!(err.to_string(), "fast failure");
    assert!(!finished.load(Ordering::SeqCst));

    // The sibling is not cancelled; it runs to completion on its own
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(finished.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_validation_reports_every_failing_field() {
    let stage = Stage::new().validate(ValidationSpec::fields([
        ("name", FieldSpec::required().check(rules::is_string())),
        ("age", FieldSpec::required().check(rules::is_number())),
        ("role", FieldSpec::new().check(rules::one_of(vec![json!("admin"), json!("user")]))),
    ]));

    let input = context(json!({ "name": 42, "role": "guest" }));
    let err = run(&[stage.into()], input).await.unwrap_err();

    let validation = err.as_validation().expect("expected a validation error");
    assert_eq!(validation.status(), 400);
    assert_eq!(validation.reason("name"), Some("isString"));
    assert_eq!(validation.reason("age"), Some("required"));
    assert_eq!(validation.reason("role"), Some("oneOf"));
}

#[tokio::test]
async fn test_boundary_sends_final_data() {
    let handler = Middleware::new(vec![
        fetches(json!({ "x": 1 })).into(),
        Node::group([fetches(json!({ "y": 2 })), fetches(json!({ "z": 3 }))]),
    ])
    .unwrap();

    let mut res = JsonResponder::new();
    let mut forwarded = None;
    handler.handle(PipelineContext::new(), &mut res, |e| forwarded = Some(e)).await;

    assert!(forwarded.is_none());
    let body: serde_json::Value = serde_json::from_str(res.body().unwrap()).unwrap();
    assert_eq!(body, json!({ "x": 1, "y": 2, "z": 3 }));
}

#[tokio::test]
async fn test_boundary_forwards_failure_without_responding() {
    let handler = Middleware::new(vec![
        fetches(json!({ "x": 1 })).into(),
        fails("downstream exploded").into(),
    ])
    .unwrap();

    let mut res = RecordingResponder::new();
    let mut forwarded = None;
    handler.handle(PipelineContext::new(), &mut res, |e| forwarded = Some(e)).await;

    assert!(res.sent().is_empty());
    let err = forwarded.expect("failure should be forwarded");
    assert!(matches!(err, PipelineError::Runtime(_)));
    assert_eq!(err.to_string(), "downstream exploded");
}

#[tokio::test]
async fn test_boundary_forwards_panics_wherever_the_stage_sits() {
    let boom = || Stage::new().named("boom").fetch_sync(|_, _| panic!("lookup failed"));

    let placements: [Vec<Node>; 2] = [vec![boom().into()], vec![Node::group([boom(), Stage::new()])]];

    for nodes in placements {
        let handler = Middleware::new(nodes).unwrap();
        let mut res = RecordingResponder::new();
        let mut forwarded = None;
        handler.handle(PipelineContext::new(), &mut res, |e| forwarded = Some(e)).await;

        assert!(res.sent().is_empty());
        let err = forwarded.expect("panic should be forwarded");
        assert!(matches!(err, PipelineError::Panicked { .. }));
        assert_eq!(err.to_string(), "Stage boom panicked: lookup failed");
    }
}

#[test]
fn test_construction_rejects_empty_group() {
    let err = Middleware::new(vec![fetches(json!({})).into(), Node::Group(vec![])]).unwrap_err();
    assert_eq!(err.to_string(), "All pipeline elements must be stages or non-empty groups - index: 1");
    assert!(matches!(err, ConstructionError::NotAStage { .. }));
}
