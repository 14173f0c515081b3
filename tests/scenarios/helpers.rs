//! Test utility functions for stagewise scenarios

use serde_json::Value;
use stagewise::core::{Data, PipelineContext, Stage};
use stagewise::execution::Responder;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Convert a JSON object literal into pipeline data
pub fn data(value: Value) -> Data {
    value
        .as_object()
        .cloned()
        .unwrap_or_else(|| panic!("Expected a JSON object, got {}", value))
}

/// Build a context from a JSON object literal
pub fn context(value: Value) -> PipelineContext {
    PipelineContext::from_value(value).expect("context literal should be an object")
}

/// A stage whose fetch returns `value`
pub fn fetches(value: Value) -> Stage {
    let out = data(value);
    Stage::new().fetch_sync(move |_, _| Ok(out.clone()))
}

/// A stage whose fetch returns `value` after sleeping for `delay`
pub fn fetches_after(delay: Duration, value: Value) -> Stage {
    let out = data(value);
    Stage::new().fetch(move |_, _| {
        let out = out.clone();
        async move {
            tokio::time::sleep(delay).await;
            Ok(out)
        }
    })
}

/// A stage whose transform adds `value`'s keys to the data
pub fn adds(value: Value) -> Stage {
    let extra = data(value);
    Stage::new().transform_sync(move |_, mut current| {
        current.extend(extra.clone());
        Ok(current)
    })
}

/// A stage whose transform always fails with `message`
pub fn fails(message: &'static str) -> Stage {
    Stage::new().transform_sync(move |_, _| Err(anyhow::anyhow!(message)))
}

/// Responder that records what it was sent
#[derive(Debug, Clone, Default)]
pub struct RecordingResponder {
    sent: Arc<Mutex<Vec<Data>>>,
}

impl RecordingResponder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Data> {
        self.sent.lock().unwrap().clone()
    }
}

impl Responder for RecordingResponder {
    fn send_json(&mut self, data: &Data) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(data.clone());
        Ok(())
    }
}

/// Records the order in which stages observed the pipeline
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A stage that appends `label` to the log and adds `{label: true}` to data
    pub fn stage(&self, label: &'static str) -> Stage {
        let calls = self.calls.clone();
        Stage::new().named(label).transform_sync(move |_, mut current| {
            calls.lock().unwrap().push(label.to_string());
            current.insert(label.to_string(), Value::Bool(true));
            Ok(current)
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}
