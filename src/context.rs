// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::blueprint::Blueprint;
use crate::config::{EngineConfig, Environment};
use crate::diagnostics::Diagnostics;
use crate::error::ResolutionError;
use crate::path::Path;
use crate::pool::WorkerPool;
use crate::providers::{Provider, ProviderFactory};
use crate::rules::RuleResult;
use crate::scheduler::DependencyGraph;
use crate::store::ValueReferenceStore;
use crate::value::Value;

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

/// State shared by every step of one blueprint execution.
pub struct ExecutionContext {
    pub blueprint: Arc<Blueprint>,
    pub config: EngineConfig,
    pub environment: Arc<Environment>,
    pub factory: Arc<ProviderFactory>,
    pub pool: WorkerPool,
    pub store: ValueReferenceStore,
    pub diagnostics: Diagnostics,

    // Created but not yet configured.
    pending: Mutex<BTreeMap<String, Box<dyn Provider>>>,
    // Configured and ready to serve reads.
    ready: RwLock<BTreeMap<String, Arc<dyn Provider>>>,

    graph: Mutex<DependencyGraph<String>>,
    rule_results: Mutex<Vec<RuleResult>>,
}

impl ExecutionContext {
    pub fn new(
        blueprint: Arc<Blueprint>,
        config: EngineConfig,
        environment: Arc<Environment>,
        factory: Arc<ProviderFactory>,
    ) -> Self {
        let pool = WorkerPool::from_config(&config);
        Self {
            blueprint,
            config,
            environment,
            factory,
            pool,
            store: ValueReferenceStore::new(),
            diagnostics: Diagnostics::new(),
            pending: Mutex::new(BTreeMap::new()),
            ready: RwLock::new(BTreeMap::new()),
            graph: Mutex::new(DependencyGraph::new()),
            rule_results: Mutex::new(vec![]),
        }
    }

    pub fn add_pending_provider(&self, alias: &str, provider: Box<dyn Provider>) {
        self.pending.lock().insert(alias.to_string(), provider);
    }

    pub fn take_pending_provider(&self, alias: &str) -> Option<Box<dyn Provider>> {
        self.pending.lock().remove(alias)
    }

    pub fn add_ready_provider(&self, alias: &str, provider: Box<dyn Provider>) {
        self.ready.write().insert(alias.to_string(), Arc::from(provider));
    }

    pub fn ready_provider(&self, alias: &str) -> Option<Arc<dyn Provider>> {
        self.ready.read().get(alias).cloned()
    }

    /// Replace the dependency graph, returning the previous one.
    pub fn set_graph(&self, graph: DependencyGraph<String>) -> DependencyGraph<String> {
        core::mem::replace(&mut *self.graph.lock(), graph)
    }

    pub fn with_graph<R>(&self, f: impl FnOnce(&DependencyGraph<String>) -> R) -> R {
        f(&self.graph.lock())
    }

    pub fn push_rule_result(&self, result: RuleResult) {
        self.rule_results.lock().push(result);
    }

    /// Rule results ordered by rule position.
    pub fn rule_results(&self) -> Vec<RuleResult> {
        let mut results = self.rule_results.lock().clone();
        results.sort_by_key(|r| r.index);
        results
    }

    /// Parse `path` and resolve it through the store.
    pub fn resolve(&self, path: &str) -> Result<Value, ResolutionError> {
        self.store.get_at_path(&Path::parse(path)?)
    }
}
