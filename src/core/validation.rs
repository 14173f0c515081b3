//! Declarative per-field validation bound to the pipeline context
//!
//! A [`ValidationSpec`] is built from the current context, reads each declared
//! field, sanitizes it and runs its rules in order. Rules may suspend, so a
//! check can look something up before deciding. The spec either yields the
//! validated data or a [`ValidationError`] listing every failing field.

use crate::core::{
    context::PipelineContext,
    error::ValidationError,
    merge::Data,
    stage::Validate,
};
use async_trait::async_trait;
use futures::future::{self, BoxFuture, FutureExt};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::warn;

type ReadFn = dyn Fn(&PipelineContext) -> Option<Value> + Send + Sync;
type SanitizeFn = dyn Fn(Value) -> Value + Send + Sync;
type CheckFn = dyn Fn(Option<Value>, PipelineContext) -> BoxFuture<'static, bool> + Send + Sync;
type SpecFn = dyn Fn(&PipelineContext) -> FieldSpecs + Send + Sync;

/// Field name -> how to read and check it
pub type FieldSpecs = BTreeMap<String, FieldSpec>;

/// A named check. The name doubles as the failure reason.
#[derive(Clone)]
pub struct Rule {
    name: String,
    check: Arc<CheckFn>,
}

impl Rule {
    pub fn new<F>(name: impl Into<String>, check: F) -> Self
    where
        F: Fn(Option<&Value>, &PipelineContext) -> bool + Send + Sync + 'static,
    {
        Self::new_async(name, move |value, ctx| {
            future::ready(check(value.as_ref(), &ctx))
        })
    }

    /// A rule whose check suspends, e.g. to look a value up elsewhere
    pub fn new_async<F, Fut>(name: impl Into<String>, check: F) -> Self
    where
        F: Fn(Option<Value>, PipelineContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        Self {
            name: name.into(),
            check: Arc::new(move |value, ctx| check(value, ctx).boxed()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    async fn passes(&self, value: Option<&Value>, ctx: &PipelineContext) -> bool {
        (self.check)(value.cloned(), ctx.clone()).await
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule").field("name", &self.name).finish()
    }
}

/// Built-in rules
pub mod rules {
    use super::Rule;
    use serde_json::Value;

    fn is_blank(value: Option<&Value>) -> bool {
        match value {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.is_empty(),
            _ => false,
        }
    }

    /// Fails on a missing value, `null` or the empty string
    pub fn required() -> Rule {
        Rule::new("required", |value, _| !is_blank(value))
    }

    /// Fails on empty strings, arrays and objects. Missing values pass.
    pub fn not_empty() -> Rule {
        Rule::new("notEmpty", |value, _| match value {
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Array(a)) => !a.is_empty(),
            Some(Value::Object(o)) => !o.is_empty(),
            _ => true,
        })
    }

    /// Missing values pass; present values must be strings
    pub fn is_string() -> Rule {
        Rule::new("isString", |value, _| {
            value.map_or(true, |v| v.is_string() || v.is_null())
        })
    }

    /// Missing values pass; present values must be numbers
    pub fn is_number() -> Rule {
        Rule::new("isNumber", |value, _| {
            value.map_or(true, |v| v.is_number() || v.is_null())
        })
    }

    /// Missing values pass; present values must equal one of `allowed`
    pub fn one_of(allowed: Vec<Value>) -> Rule {
        Rule::new("oneOf", move |value, _| match value {
            None | Some(Value::Null) => true,
            Some(v) => allowed.contains(v),
        })
    }

    /// A named predicate over the field value alone
    pub fn custom<F>(name: impl Into<String>, predicate: F) -> Rule
    where
        F: Fn(Option<&Value>) -> bool + Send + Sync + 'static,
    {
        Rule::new(name, move |value, _| predicate(value))
    }

    /// A named predicate that may suspend
    pub fn custom_async<F, Fut>(name: impl Into<String>, predicate: F) -> Rule
    where
        F: Fn(Option<Value>) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = bool> + Send + 'static,
    {
        Rule::new_async(name, move |value, _| predicate(value))
    }
}

/// How a single field is read, sanitized and checked
#[derive(Clone, Default)]
pub struct FieldSpec {
    read: Option<Arc<ReadFn>>,
    sanitize: Vec<Arc<SanitizeFn>>,
    checks: Vec<Rule>,
}

impl FieldSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the value with a custom function instead of the default lookup
    pub fn read<F>(mut self, reader: F) -> Self
    where
        F: Fn(&PipelineContext) -> Option<Value> + Send + Sync + 'static,
    {
        self.read = Some(Arc::new(reader));
        self
    }

    /// Read the value from the context's accumulated data under `key`
    pub fn read_data(self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.read(move |ctx| ctx.data.get(&key).cloned())
    }

    /// Append a sanitizer; sanitizers run in order on present values
    pub fn sanitize<F>(mut self, sanitizer: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.sanitize.push(Arc::new(sanitizer));
        self
    }

    /// Append a rule; the first failing rule is the field's reason
    pub fn check(mut self, rule: Rule) -> Self {
        self.checks.push(rule);
        self
    }

    /// Shorthand for `FieldSpec::new().check(rules::required())`
    pub fn required() -> Self {
        Self::new().check(rules::required())
    }

    fn read_value(&self, name: &str, ctx: &PipelineContext) -> Option<Value> {
        let raw = match &self.read {
            Some(reader) => reader(ctx),
            None => ctx
                .field(name)
                .or_else(|| ctx.data.get(name))
                .cloned(),
        };
        raw.map(|value| self.sanitize.iter().fold(value, |v, f| f(v)))
    }

    async fn first_failure(&self, value: Option<&Value>, ctx: &PipelineContext) -> Option<&str> {
        for rule in &self.checks {
            if !rule.passes(value, ctx).await {
                return Some(rule.name());
            }
        }
        None
    }
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("custom_read", &self.read.is_some())
            .field("sanitizers", &self.sanitize.len())
            .field("checks", &self.checks)
            .finish()
    }
}

/// Validation specification, built per invocation from the context
#[derive(Clone)]
pub struct ValidationSpec {
    build: Arc<SpecFn>,
}

impl ValidationSpec {
    /// Specification computed from the context on every invocation
    pub fn new<F>(build: F) -> Self
    where
        F: Fn(&PipelineContext) -> FieldSpecs + Send + Sync + 'static,
    {
        Self {
            build: Arc::new(build),
        }
    }

    /// Specification that does not depend on the context
    pub fn fields<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, FieldSpec)>,
        K: Into<String>,
    {
        let specs: FieldSpecs = fields.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Self::new(move |_| specs.clone())
    }
}

#[async_trait]
impl Validate for ValidationSpec {
    /// Every field is evaluated so the error lists all failing fields.
    /// Validated data holds exactly the declared fields that have a value.
    async fn validate(&self, ctx: &PipelineContext) -> Result<Data, ValidationError> {
        let specs = (self.build)(ctx);
        let mut data = Data::new();
        let mut reasons = BTreeMap::new();

        for (name, spec) in &specs {
            let value = spec.read_value(name, ctx);
            if let Some(reason) = spec.first_failure(value.as_ref(), ctx).await {
                reasons.insert(name.clone(), reason.to_string());
                continue;
            }
            if let Some(value) = value {
                data.insert(name.clone(), value);
            }
        }

        if reasons.is_empty() {
            Ok(data)
        } else {
            warn!("Validation rejected fields: {:?}", reasons.keys().collect::<Vec<_>>());
            Err(ValidationError::new(reasons))
        }
    }
}

impl fmt::Debug for ValidationSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ValidationSpec(..)")
    }
}
