// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::context::ExecutionContext;
use crate::plan::{Flow, Step};
use crate::rules::{Rule, RuleResult};

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

/// Bind one rule of the ruleset and run its predicate.
///
/// Predicates run on the blocking threads of the pool, so the permit and the
/// time limit are taken there rather than around the whole step.
pub struct EvaluateRule {
    pub index: usize,
}

impl EvaluateRule {
    async fn result(&self, ctx: &ExecutionContext) -> Option<RuleResult> {
        let spec = ctx.blueprint.ruleset.get(self.index)?;
        Some(match Rule::bind(self.index, spec, &ctx.store) {
            Ok(rule) => Arc::new(rule).evaluate_on(&ctx.pool).await,
            Err(e) => RuleResult::unbound(self.index, spec, &e),
        })
    }
}

#[async_trait]
impl Step for EvaluateRule {
    fn name(&self) -> String {
        format!("rule #{}", self.index + 1)
    }

    fn timed(&self) -> bool {
        false
    }

    async fn execute(&self, ctx: Arc<ExecutionContext>) -> Flow {
        let Some(result) = self.result(&ctx).await else {
            return Flow::Continue;
        };
        debug!(rule = %result.name, outcome = ?result.outcome, "evaluated");
        if let Some(diagnostic) = result.to_diagnostic() {
            ctx.diagnostics.push(diagnostic);
        }
        ctx.push_rule_result(result);
        Flow::Continue
    }
}
