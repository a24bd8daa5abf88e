// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Configuration sources.
//!
//! A [`Provider`] is created by the [`ProviderFactory`], configured once with
//! its (interpolated) configuration map and then asked for its value tree.

mod env;
mod file;
mod inline;

pub use env::EnvProvider;
pub use file::FileProvider;
pub use inline::InlineProvider;

use crate::config::Environment;
use crate::diagnostics::Diagnostic;
use crate::error::ProviderError;
use crate::typing::Type;
use crate::value::Value;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct ConfigureRequest {
    pub source_alias: String,
    /// Configuration map after `${NAME}` interpolation.
    pub config: Value,
    pub query_options: BTreeMap<String, Value>,
    pub environment: Arc<Environment>,
}

#[derive(Debug, Clone)]
pub struct ProvideRequest {
    pub source_alias: String,
    pub query_options: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default)]
pub struct ProvideResponse {
    pub value: Option<Value>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ProvideResponse {
    pub fn value(value: Value) -> Self {
        Self {
            value: Some(value),
            diagnostics: vec![],
        }
    }

    pub fn error(summary: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            value: None,
            diagnostics: vec![Diagnostic::error(summary, details)],
        }
    }
}

#[async_trait]
pub trait Provider: Send + Sync {
    /// Shape the configuration map must have.
    fn config_schema(&self) -> Type;

    async fn configure(&mut self, request: ConfigureRequest) -> Result<(), ProviderError>;

    async fn provide(&self, request: ProvideRequest) -> ProvideResponse;
}

pub type ProviderCtor = Arc<dyn Fn() -> Box<dyn Provider> + Send + Sync>;

/// Provider constructors by name.
#[derive(Clone, Default)]
pub struct ProviderFactory {
    ctors: BTreeMap<String, ProviderCtor>,
}

impl core::fmt::Debug for ProviderFactory {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.debug_set().entries(self.ctors.keys()).finish()
    }
}

impl ProviderFactory {
    /// Factory without any provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory with `inline`, `env` and `file`.
    pub fn with_builtins() -> Self {
        let mut factory = Self::new();
        factory.register("inline", || Box::new(InlineProvider::default()));
        factory.register("env", || Box::new(EnvProvider::default()));
        factory.register("file", || Box::new(FileProvider::default()));
        factory
    }

    pub fn register<F>(&mut self, name: impl Into<String>, ctor: F) -> &mut Self
    where
        F: Fn() -> Box<dyn Provider> + Send + Sync + 'static,
    {
        self.ctors.insert(name.into(), Arc::new(ctor));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.ctors.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.ctors.keys().map(|k| k.as_str())
    }

    pub fn create(&self, name: &str) -> Result<Box<dyn Provider>, ProviderError> {
        match self.ctors.get(name) {
            Some(ctor) => Ok(ctor()),
            None => Err(ProviderError::Unknown(name.to_string())),
        }
    }
}

/// Interpolate every string in `value`, keys excluded.
///
/// Fails with the name of the first unset variable.
pub fn interpolate(value: &Value, env: &Environment) -> Result<Value, String> {
    if let Some(items) = value.as_sequence() {
        let items = items
            .iter()
            .map(|v| interpolate(v, env))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(Value::from_list(items));
    }
    if let Some(entries) = value.as_entries() {
        let entries = entries
            .iter()
            .map(|(k, v)| Ok((k.clone(), interpolate(v, env)?)))
            .collect::<Result<BTreeMap<_, _>, String>>()?;
        return Ok(Value::from(entries));
    }
    match value.unwrapped() {
        Value::String(s) => Ok(Value::from(env.interpolate(s)?)),
        v => Ok(v.clone()),
    }
}

/// String entry `key` of a configuration object.
pub(crate) fn config_str<'a>(config: &'a Value, key: &str) -> Option<&'a str> {
    match config.get_attr(key).map(|v| v.unwrapped()) {
        Some(Value::String(s)) => Some(s.as_ref()),
        _ => None,
    }
}
