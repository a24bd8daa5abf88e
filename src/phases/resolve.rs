// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Dependency ordered reference resolution.
//!
//! Each reference gets a worker. A worker first waits on the barrier of the
//! reference it depends on (if any), then takes a pool permit, resolves its
//! path into the store and opens its own barrier. Permits are only taken
//! once a worker is runnable, so workers blocked on a barrier never starve
//! the pool.

use crate::context::ExecutionContext;
use crate::diagnostics::Diagnostic;
use crate::error::ResolutionError;
use crate::path::Path;
use crate::plan::{Flow, Step};
use crate::scheduler::DependencyGraph;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, trace};

/// Graph of `reference -> root alias` edges. Sources are leaves.
pub fn reference_graph(ctx: &ExecutionContext) -> DependencyGraph<String> {
    let mut graph = DependencyGraph::new();
    for alias in ctx.blueprint.sources.keys() {
        graph.add_node(alias.clone());
    }
    for (alias, path) in &ctx.blueprint.refs {
        graph.add_node(alias.clone());
        if let Ok(path) = Path::parse(path) {
            graph.add_edge(alias.clone(), path.root().to_string());
        }
    }
    graph
}

pub struct ResolveReferences;

#[async_trait]
impl Step for ResolveReferences {
    fn name(&self) -> String {
        "resolve references".into()
    }

    // Each reference is timed individually.
    fn timed(&self) -> bool {
        false
    }

    async fn execute(&self, ctx: Arc<ExecutionContext>) -> Flow {
        let mut graph = reference_graph(&ctx);
        graph.run();

        if graph.has_cycles() {
            for cycle in graph.cycles() {
                let err = ResolutionError::Cycle(cycle.to_string());
                error!("{err}");
                ctx.diagnostics
                    .push(Diagnostic::from_error("reference resolution aborted", &err));
            }
            ctx.set_graph(graph);
            return Flow::Halt;
        }

        let refs = &ctx.blueprint.refs;
        let order: Vec<String> = graph
            .order()
            .iter()
            .filter(|alias| refs.contains_key(*alias))
            .cloned()
            .collect();
        ctx.set_graph(graph);

        let mut barriers = HashMap::new();
        let mut senders = HashMap::new();
        for alias in &order {
            let (tx, rx) = watch::channel(false);
            senders.insert(alias.clone(), tx);
            barriers.insert(alias.clone(), rx);
        }

        let mut set = JoinSet::new();
        for alias in order {
            let Some(path) = refs.get(&alias).cloned() else {
                continue;
            };
            let Some(done) = senders.remove(&alias) else {
                continue;
            };
            let dependency = Path::parse(&path)
                .ok()
                .map(|p| p.root().to_string())
                .filter(|root| refs.contains_key(root));
            let waiting = dependency.as_ref().and_then(|d| barriers.get(d).cloned());

            let ctx = ctx.clone();
            set.spawn(async move {
                if let Some(mut waiting) = waiting {
                    // A dropped sender also releases the dependent.
                    let _ = waiting.wait_for(|resolved| *resolved).await;
                }
                resolve_one(&ctx, &alias, &path, dependency.as_deref()).await;
                let _ = done.send(true);
            });
        }

        while let Some(joined) = set.join_next().await {
            if let Err(e) = joined {
                error!("reference task failed: {e}");
                ctx.diagnostics
                    .error("reference resolution aborted", e.to_string());
            }
        }
        Flow::Continue
    }
}

async fn resolve_one(ctx: &ExecutionContext, alias: &str, path: &str, dependency: Option<&str>) {
    if let Some(dependency) = dependency {
        if !ctx.store.contains_root(dependency) {
            let err = ResolutionError::DependencyFailed {
                alias: alias.to_string(),
                dependency: dependency.to_string(),
            };
            ctx.diagnostics
                .push(Diagnostic::from_error("reference not resolved", &err));
            return;
        }
    }

    trace!(reference = alias, path, "resolving");
    match ctx.pool.run(async { ctx.resolve(path) }).await {
        Ok(Ok(value)) => {
            ctx.store.insert_root(alias, value);
            debug!(reference = alias, "resolved");
        }
        Ok(Err(e)) => {
            ctx.diagnostics.push(Diagnostic::error(
                format!("reference `{alias}` not resolved"),
                e.to_string(),
            ));
        }
        Err(e) => {
            ctx.diagnostics.push(Diagnostic::error(
                format!("reference `{alias}` not resolved"),
                e.to_string(),
            ));
        }
    }
}
