// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::blueprint::Blueprint;
use crate::config::{EngineConfig, Environment};
use crate::context::ExecutionContext;
use crate::diagnostics::{Diagnostic, Severity};
use crate::phases::build_plan;
use crate::plan::ExecutionPlan;
use crate::providers::ProviderFactory;
use crate::rules::RuleResult;
use crate::store::StoreStats;

use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use tracing::{info, info_span, Instrument};

/// The blueprint execution engine.
#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
    factory: Arc<ProviderFactory>,
    environment: Arc<Environment>,
}

/// Create an engine with the built-in providers and the process environment.
impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn factory(&self) -> &ProviderFactory {
        &self.factory
    }

    pub fn plan(&self, blueprint: &Blueprint) -> ExecutionPlan {
        build_plan(blueprint)
    }

    /// Run every phase against `blueprint`.
    pub async fn run(&self, blueprint: &Blueprint) -> Report {
        let ctx = Arc::new(ExecutionContext::new(
            Arc::new(blueprint.clone()),
            self.config.clone(),
            self.environment.clone(),
            self.factory.clone(),
        ));
        let plan = self.plan(blueprint);

        let span = info_span!(
            "blueprint",
            sources = blueprint.sources.len(),
            rules = blueprint.ruleset.len(),
            workers = ctx.pool.size()
        );
        let halted_at = plan.run(&ctx).instrument(span).await;

        let report = Report {
            diagnostics: ctx.diagnostics.drain(),
            rule_results: ctx.rule_results(),
            halted_at: halted_at.map(|p| p.to_string()),
            store: ctx.store.stats(),
        };
        info!(
            errors = report.error_count(),
            halted_at = ?report.halted_at,
            "blueprint executed"
        );
        report
    }

    /// Run on a new multi-thread runtime. For synchronous callers.
    pub fn run_blocking(&self, blueprint: &Blueprint) -> Result<Report> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.workers())
            .enable_all()
            .build()?;
        Ok(runtime.block_on(self.run(blueprint)))
    }
}

#[derive(Debug, Default)]
pub struct EngineBuilder {
    config: Option<EngineConfig>,
    factory: Option<ProviderFactory>,
    environment: Option<Environment>,
}

impl EngineBuilder {
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn factory(mut self, factory: ProviderFactory) -> Self {
        self.factory = Some(factory);
        self
    }

    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = Some(environment);
        self
    }

    pub fn build(self) -> Engine {
        Engine {
            config: self.config.unwrap_or_default(),
            factory: Arc::new(self.factory.unwrap_or_else(ProviderFactory::with_builtins)),
            environment: Arc::new(self.environment.unwrap_or_else(Environment::from_process)),
        }
    }
}

/// Outcome of one execution.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub diagnostics: Vec<Diagnostic>,
    pub rule_results: Vec<RuleResult>,
    /// Phase that stopped the pipeline early.
    pub halted_at: Option<String>,
    #[serde(skip)]
    pub store: StoreStats,
}

impl Report {
    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// True when the pipeline ran to the end without any error.
    pub fn passed(&self) -> bool {
        self.halted_at.is_none() && !self.has_errors()
    }

    /// 0 when no error was reported, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.has_errors() {
            1
        } else {
            0
        }
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
    }
}
