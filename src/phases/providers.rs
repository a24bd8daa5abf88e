// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Source lifecycle: create, configure, read.

use crate::blueprint::SourceSpec;
use crate::context::ExecutionContext;
use crate::diagnostics::{Diagnostic, Severity};
use crate::error::ProviderError;
use crate::plan::{Flow, Step};
use crate::providers::{interpolate, ConfigureRequest, ProvideRequest};
use crate::value::Value;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

fn report(ctx: &ExecutionContext, err: ProviderError) {
    ctx.diagnostics.push(Diagnostic::from_error("source failed", &err));
}

fn source<'a>(ctx: &'a ExecutionContext, alias: &str) -> Option<&'a SourceSpec> {
    ctx.blueprint.sources.get(alias)
}

fn query_options(spec: &SourceSpec) -> BTreeMap<String, Value> {
    spec.query_options.clone().unwrap_or_default()
}

pub struct InitializeProvider {
    pub alias: String,
}

#[async_trait]
impl Step for InitializeProvider {
    fn name(&self) -> String {
        format!("initialize `{}`", self.alias)
    }

    async fn execute(&self, ctx: Arc<ExecutionContext>) -> Flow {
        let Some(spec) = source(&ctx, &self.alias) else {
            return Flow::Continue;
        };
        match ctx.factory.create(&spec.provider) {
            Ok(provider) => ctx.add_pending_provider(&self.alias, provider),
            Err(e) => report(&ctx, e),
        }
        Flow::Continue
    }
}

pub struct ConfigureProvider {
    pub alias: String,
}

impl ConfigureProvider {
    async fn load_config(&self, spec: &SourceSpec) -> Result<Value, ProviderError> {
        if let Some(config) = &spec.config {
            return Ok(Value::from(config.clone()));
        }
        let Some(path) = spec.config_file.clone() else {
            return Ok(Value::new_object());
        };
        let loaded = tokio::task::spawn_blocking(move || Value::from_file(path)).await;
        let message = match loaded {
            Ok(Ok(config)) => return Ok(config),
            Ok(Err(e)) => format!("{e:#}"),
            Err(e) => e.to_string(),
        };
        Err(ProviderError::Configure {
            source_alias: self.alias.clone(),
            message,
        })
    }
}

#[async_trait]
impl Step for ConfigureProvider {
    fn name(&self) -> String {
        format!("configure `{}`", self.alias)
    }

    async fn execute(&self, ctx: Arc<ExecutionContext>) -> Flow {
        let Some(spec) = source(&ctx, &self.alias) else {
            return Flow::Continue;
        };
        let Some(mut provider) = ctx.take_pending_provider(&self.alias) else {
            report(
                &ctx,
                ProviderError::NotInitialized {
                    source_alias: self.alias.clone(),
                    provider: spec.provider.clone(),
                },
            );
            return Flow::Continue;
        };

        let config = match self.load_config(spec).await {
            Ok(config) => config,
            Err(e) => {
                report(&ctx, e);
                return Flow::Continue;
            }
        };
        // Configurations can be large. Interpolate off the async workers.
        let environment = ctx.environment.clone();
        let interpolated = ctx
            .pool
            .run_blocking(move || interpolate(&config, &environment))
            .await;
        let config = match interpolated {
            Ok(Ok(config)) => config,
            Ok(Err(variable)) => {
                report(
                    &ctx,
                    ProviderError::MissingVariable {
                        source_alias: self.alias.clone(),
                        variable,
                    },
                );
                return Flow::Continue;
            }
            Err(e) => {
                report(
                    &ctx,
                    ProviderError::Configure {
                        source_alias: self.alias.clone(),
                        message: e.to_string(),
                    },
                );
                return Flow::Continue;
            }
        };

        let schema = provider.config_schema();
        if !schema.accepts(&config) {
            report(
                &ctx,
                ProviderError::Schema {
                    source_alias: self.alias.clone(),
                    expected: schema,
                },
            );
            return Flow::Continue;
        }

        let request = ConfigureRequest {
            source_alias: self.alias.clone(),
            config,
            query_options: query_options(spec),
            environment: ctx.environment.clone(),
        };
        match provider.configure(request).await {
            Ok(()) => ctx.add_ready_provider(&self.alias, provider),
            Err(e) => report(&ctx, e),
        }
        Flow::Continue
    }
}

pub struct ReadSource {
    pub alias: String,
}

#[async_trait]
impl Step for ReadSource {
    fn name(&self) -> String {
        format!("read `{}`", self.alias)
    }

    async fn execute(&self, ctx: Arc<ExecutionContext>) -> Flow {
        let (Some(spec), Some(provider)) = (
            source(&ctx, &self.alias),
            ctx.ready_provider(&self.alias),
        ) else {
            // Creation or configuration already reported why.
            debug!(source = %self.alias, "not ready, skipping read");
            return Flow::Continue;
        };

        let response = provider
            .provide(ProvideRequest {
                source_alias: self.alias.clone(),
                query_options: query_options(spec),
            })
            .await;

        let failed = response
            .diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error);
        ctx.diagnostics.append(response.diagnostics.into());
        match response.value {
            Some(value) => ctx.store.insert_root(&self.alias, value),
            None if !failed => report(
                &ctx,
                ProviderError::Read {
                    source_alias: self.alias.clone(),
                    message: "provider returned no value".to_string(),
                },
            ),
            None => (),
        }
        Flow::Continue
    }
}
