// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Rules bound to resolved values, and exhaustive ruleset evaluation.

use crate::blueprint::{self, RuleSpec};
use crate::diagnostics::Diagnostic;
use crate::error::{RuleError, ValidationError};
use crate::path::Path;
use crate::pool::WorkerPool;
use crate::predicates::Condition;
use crate::store::ValueReferenceStore;
use crate::value::Value;

use core::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{debug, error};

/// Rendering of every argument declared sensitive, whatever its shape.
pub const MASK: &str = "<sensitive>";

/// A resolved rule argument.
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub value: Value,
    pub sensitive: bool,
}

impl Argument {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            sensitive: false,
        }
    }

    pub fn sensitive(value: Value) -> Self {
        Self {
            value,
            sensitive: true,
        }
    }

    /// Text shown in diagnostics, logs and results.
    pub fn render(&self) -> String {
        if self.sensitive {
            MASK.to_string()
        } else {
            self.value.to_string()
        }
    }
}

fn render_all<I: IntoIterator<Item = String>>(args: I) -> String {
    let args: Vec<String> = args.into_iter().collect();
    format!("[{}]", args.join(", "))
}

/// A predicate applied to a resolved subject value.
#[derive(Debug, Clone)]
pub struct Rule {
    /// Position in the ruleset, zero based.
    pub index: usize,
    pub name: Option<String>,
    /// Path expression the subject was resolved from.
    pub path: String,
    pub condition: Condition,
    pub value: Value,
    pub args: Vec<Argument>,
}

impl Rule {
    /// Resolve the subject and arguments of `spec` through `store`.
    pub fn bind(
        index: usize,
        spec: &RuleSpec,
        store: &ValueReferenceStore,
    ) -> Result<Rule, RuleError> {
        let context = format!("rule `{}`", spec.display_name(index));
        let (predicate, raw_args) = match spec.predicates.as_slice() {
            [one] => one,
            _ => {
                return Err(ValidationError::PredicateCount {
                    context,
                    found: spec.predicates.len(),
                }
                .into())
            }
        };
        let condition: Condition =
            predicate
                .parse()
                .map_err(|_| ValidationError::UnknownPredicate {
                    context: context.clone(),
                    predicate: predicate.clone(),
                })?;

        let value = store.get_at_path(&Path::parse(&spec.value)?)?;
        let args = raw_args
            .iter()
            .map(|a| resolve_argument(a, store))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Rule {
            index,
            name: spec.name.clone(),
            path: spec.value.clone(),
            condition,
            value,
            args,
        })
    }

    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("#{}", self.index + 1),
        }
    }

    pub fn evaluate(&self) -> RuleResult {
        let values: Vec<Value> = self.args.iter().map(|a| a.value.clone()).collect();
        let outcome = match self.condition.evaluate(&self.value, &values) {
            Ok(true) => RuleOutcome::Passed,
            Ok(false) => RuleOutcome::Violated,
            Err(e) => RuleOutcome::Errored {
                message: e.to_string(),
            },
        };
        self.result(outcome)
    }

    /// Evaluate on the blocking threads of `pool`, under its permits and
    /// time limit. A rule that runs out of time is reported as errored.
    pub async fn evaluate_on(self: Arc<Self>, pool: &WorkerPool) -> RuleResult {
        let rule = self.clone();
        match pool.run_blocking(move || rule.evaluate()).await {
            Ok(result) => result,
            Err(e) => RuleResult::aborted(&self, e.to_string()),
        }
    }

    fn result(&self, outcome: RuleOutcome) -> RuleResult {
        RuleResult {
            index: self.index,
            name: self.display_name(),
            path: self.path.clone(),
            predicate: self.condition.name().to_string(),
            args: self.args.iter().map(Argument::render).collect(),
            outcome,
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "`{}` {} {}",
            self.path,
            self.condition,
            render_all(self.args.iter().map(Argument::render))
        )
    }
}

fn resolve_argument(
    arg: &blueprint::Argument,
    store: &ValueReferenceStore,
) -> Result<Argument, RuleError> {
    Ok(match arg {
        blueprint::Argument::Literal(v) => Argument::new(v.clone()),
        blueprint::Argument::Path(p) => Argument::new(store.get_at_path(&Path::parse(p)?)?),
        blueprint::Argument::Sensitive(inner) => {
            Argument::sensitive(resolve_argument(inner, store)?.value)
        }
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum RuleOutcome {
    Passed,
    /// The predicate ran and returned false.
    Violated,
    /// The rule could not be bound or the predicate failed to run.
    Errored { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleResult {
    pub index: usize,
    pub name: String,
    pub path: String,
    pub predicate: String,
    /// Rendered arguments, sensitive ones masked.
    pub args: Vec<String>,
    #[serde(flatten)]
    pub outcome: RuleOutcome,
}

impl RuleResult {
    /// Result for a rule that could not be bound.
    pub fn unbound(index: usize, spec: &RuleSpec, err: &RuleError) -> Self {
        let (predicate, args) = match spec.predicates.first() {
            Some((p, args)) => (p.clone(), args.iter().map(|a| a.to_string()).collect()),
            None => (String::new(), vec![]),
        };
        Self {
            index,
            name: spec.display_name(index),
            path: spec.value.clone(),
            predicate,
            args,
            outcome: RuleOutcome::Errored {
                message: err.to_string(),
            },
        }
    }

    /// Result for a rule whose evaluation did not complete.
    pub fn aborted(rule: &Rule, message: impl Into<String>) -> Self {
        rule.result(RuleOutcome::Errored {
            message: message.into(),
        })
    }

    pub fn passed(&self) -> bool {
        self.outcome == RuleOutcome::Passed
    }

    /// Error diagnostic for a violated or errored rule.
    pub fn to_diagnostic(&self) -> Option<Diagnostic> {
        let target = format!(
            "`{}` {} {}",
            self.path,
            self.predicate,
            render_all(self.args.iter().cloned())
        );
        match &self.outcome {
            RuleOutcome::Passed => None,
            RuleOutcome::Violated => Some(Diagnostic::error(
                format!("rule `{}` failed", self.name),
                target,
            )),
            RuleOutcome::Errored { message } => Some(Diagnostic::error(
                format!("rule `{}` could not be evaluated", self.name),
                format!("{target}: {message}"),
            )),
        }
    }
}

/// Results of one ruleset evaluation, ordered by rule position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RuleSetResult {
    pub results: Vec<RuleResult>,
}

impl RuleSetResult {
    /// Logical AND over every rule.
    pub fn passed(&self) -> bool {
        self.results.iter().all(RuleResult::passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &RuleResult> {
        self.results.iter().filter(|r| !r.passed())
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.results.iter().filter_map(|r| r.to_diagnostic()).collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Arc<Rule>>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            rules: rules.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().map(|r| r.as_ref())
    }

    /// Evaluate every rule, in parallel, under `pool`.
    ///
    /// A failing or stalled rule never prevents the others from being
    /// evaluated.
    pub async fn evaluate(&self, pool: &WorkerPool) -> RuleSetResult {
        let mut set = JoinSet::new();
        for (slot, rule) in self.rules.iter().enumerate() {
            let (pool, rule) = (pool.clone(), rule.clone());
            set.spawn(async move { (slot, rule.evaluate_on(&pool).await) });
        }

        let mut results: Vec<Option<RuleResult>> = vec![None; self.rules.len()];
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((slot, result)) => {
                    debug!(rule = %result.name, outcome = ?result.outcome, "rule evaluated");
                    results[slot] = Some(result);
                }
                Err(e) => error!("rule task failed: {e}"),
            }
        }

        let results = results
            .into_iter()
            .zip(&self.rules)
            .map(|(r, rule)| r.unwrap_or_else(|| RuleResult::aborted(rule, "evaluation aborted")))
            .collect();
        RuleSetResult { results }
    }

    /// Evaluate every rule on the calling thread.
    pub fn evaluate_sequential(&self) -> RuleSetResult {
        RuleSetResult {
            results: self.rules.iter().map(|r| r.evaluate()).collect(),
        }
    }
}
