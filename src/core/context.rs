//! Pipeline context - request-scoped fields and accumulated data

use crate::core::merge::{into_data, merge, Data};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Execution context for a single pipeline invocation
///
/// Holds arbitrary caller-supplied fields plus the reserved `data` mapping
/// that stages accumulate into. A context is never mutated once handed to a
/// stage; every step derives a new one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineContext {
    /// Caller-supplied request fields (everything except `data`)
    #[serde(flatten)]
    pub fields: Map<String, Value>,

    /// Accumulated pipeline output
    #[serde(default)]
    pub data: Data,
}

impl PipelineContext {
    /// Create a new empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context from a JSON object, splitting out the `data` field
    pub fn from_value(value: Value) -> anyhow::Result<Self> {
        let mut fields = into_data(value)?;
        let data = match fields.remove("data") {
            Some(data) => into_data(data)?,
            None => Data::new(),
        };
        Ok(Self { fields, data })
    }

    /// Set a request field
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// Get a request field
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Derive a context that carries `data` in place of the current data.
    ///
    /// Request fields are preserved unchanged.
    pub fn with_data(&self, data: Data) -> Self {
        Self {
            fields: self.fields.clone(),
            data,
        }
    }

    /// Derive a context whose data is `merge(self.data, overlay)`
    pub fn merged_with(&self, overlay: &Data) -> Self {
        self.with_data(merge(&self.data, overlay))
    }

    /// Consume the context, returning the accumulated data
    pub fn into_data(self) -> Data {
        self.data
    }
}
