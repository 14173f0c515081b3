//! Declarative pipeline definitions loaded from YAML
//!
//! A definition names its handlers instead of embedding them:
//!
//! ```yaml
//! name: "profile"
//! stages:
//!   - validate: "user_id"
//!     fetch: "load_user"
//!   - - fetch: "load_orders"
//!     - fetch: "load_prefs"
//!   - transform: "shape_profile"
//! ```
//!
//! Names are resolved against a [`HandlerRegistry`] when the definition is
//! turned into a [`Pipeline`].

use crate::core::{
    error::{ConstructionError, IndexPath},
    merge::Data,
    pipeline::{Node, Pipeline},
    stage::{Fetch, Stage, Transform, Validate},
    structure,
};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Top-level pipeline definition loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pipeline name
    pub name: String,

    /// Optional description
    #[serde(default)]
    pub description: Option<String>,

    /// Ordered stage tree: mappings are stages, nested sequences are groups
    pub stages: Vec<Value>,
}

impl PipelineConfig {
    /// Load a pipeline definition from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse a pipeline definition from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: PipelineConfig = serde_yaml::from_str(yaml)
            .map_err(|e| ConstructionError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the shape of the stage tree
    pub fn validate(&self) -> Result<(), ConstructionError> {
        structure::check_definition(&self.stages)
    }

    /// Every handler name referenced by the definition, as `(key, name)`
    /// pairs in depth-first order
    pub fn handler_refs(&self) -> Vec<(String, String)> {
        fn collect(elements: &[Value], refs: &mut Vec<(String, String)>) {
            for element in elements {
                match element {
                    Value::Object(stage) => {
                        for key in structure::STAGE_KEYS {
                            if let Some(Value::String(name)) = stage.get(key) {
                                refs.push((key.to_string(), name.clone()));
                            }
                        }
                    }
                    Value::Array(members) => collect(members, refs),
                    _ => {}
                }
            }
        }

        let mut refs = Vec::new();
        collect(&self.stages, &mut refs);
        refs
    }

    /// Resolve handler names and build a runnable pipeline
    pub fn to_pipeline(&self, registry: &HandlerRegistry) -> Result<Pipeline, ConstructionError> {
        self.validate()?;
        let nodes = self
            .stages
            .iter()
            .enumerate()
            .map(|(index, element)| registry.resolve(element, IndexPath::root().child(index)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Pipeline::new(nodes)?.named(self.name.clone()))
    }
}

/// Named handlers that declarative stages refer to
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    validations: HashMap<String, Arc<dyn Validate>>,
    fetchers: HashMap<String, Arc<dyn Fetch>>,
    transformers: HashMap<String, Arc<dyn Transform>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the `identity` fetch and transform, and a
    /// `debug` transform that logs the data it passes through
    pub fn with_builtins() -> Self {
        Self::new()
            .with_fetch("identity", |_ctx, data| async move { Ok(data) })
            .with_transform("identity", |_ctx, data| async move { Ok(data) })
            .with_transform("debug", |_ctx, data: Data| async move {
                debug!("{}", serde_json::Value::Object(data.clone()));
                Ok(data)
            })
    }

    /// Register a validation, usually a [`ValidationSpec`](crate::core::ValidationSpec)
    pub fn with_validation<V>(mut self, name: impl Into<String>, validate: V) -> Self
    where
        V: Validate + 'static,
    {
        self.validations.insert(name.into(), Arc::new(validate));
        self
    }

    pub fn with_fetch<F, Fut>(mut self, name: impl Into<String>, fetch: F) -> Self
    where
        F: Fn(crate::core::PipelineContext, Data) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Data>> + Send + 'static,
    {
        self.fetchers.insert(name.into(), Arc::new(fetch));
        self
    }

    pub fn with_transform<F, Fut>(mut self, name: impl Into<String>, transform: F) -> Self
    where
        F: Fn(crate::core::PipelineContext, Data) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Data>> + Send + 'static,
    {
        self.transformers.insert(name.into(), Arc::new(transform));
        self
    }

    /// Whether a handler is registered for `key` under `name`
    pub fn contains(&self, key: &str, name: &str) -> bool {
        match key {
            "validate" => self.validations.contains_key(name),
            "fetch" => self.fetchers.contains_key(name),
            "transform" => self.transformers.contains_key(name),
            _ => false,
        }
    }

    fn resolve(&self, element: &Value, path: IndexPath) -> Result<Node, ConstructionError> {
        match element {
            Value::Array(members) => {
                let members = members
                    .iter()
                    .enumerate()
                    .map(|(index, member)| self.resolve(member, path.child(index)))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Node::Group(members))
            }
            Value::Object(spec) => {
                let lookup = |key: &str| -> Result<Option<String>, ConstructionError> {
                    match spec.get(key) {
                        None => Ok(None),
                        Some(Value::String(name)) if self.contains(key, name) => Ok(Some(name.clone())),
                        Some(Value::String(name)) => Err(ConstructionError::UnknownHandler {
                            path: path.clone(),
                            key: key.to_string(),
                            name: name.clone(),
                        }),
                        Some(_) => Err(ConstructionError::NotAStage { path: path.clone() }),
                    }
                };

                let mut stage = Stage::new().named(format!("stage {}", path));
                if let Some(name) = lookup("validate")? {
                    stage = stage.validate_with(self.validations[&name].clone());
                }
                if let Some(name) = lookup("fetch")? {
                    stage = stage.fetch_with(self.fetchers[&name].clone());
                }
                if let Some(name) = lookup("transform")? {
                    stage = stage.transform_with(self.transformers[&name].clone());
                }

                debug!("Resolved {}", stage.label());
                Ok(stage.into())
            }
            _ => Err(ConstructionError::NotAStage { path }),
        }
    }
}
