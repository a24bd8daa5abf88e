// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

// Use README.md as crate documentation.
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/README.md"))]

// Values are shared across worker tasks.
pub(crate) use std::sync::Arc as Rc;

mod blueprint;
mod config;
mod context;
mod diagnostics;
mod engine;
mod error;
mod path;
mod phases;
mod plan;
mod pool;
mod providers;
mod rules;
mod scheduler;
mod store;
mod typing;
mod value;

pub mod predicates;

pub use blueprint::{Argument, Blueprint, RuleSpec, SourceSpec};
pub use config::{default_workers, EngineConfig, Environment};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use engine::{Engine, EngineBuilder, Report};
pub use error::{
    PathError, PredicateError, ProviderError, ResolutionError, RuleError, TaskError, TypeError,
    ValidationError,
};
pub use path::{Path, Step};
pub use pool::WorkerPool;
pub use predicates::{Condition, Signature};
pub use providers::{
    ConfigureRequest, EnvProvider, FileProvider, InlineProvider, ProvideRequest, ProvideResponse,
    Provider, ProviderFactory,
};
pub use rules::{Rule, RuleOutcome, RuleResult, RuleSet, RuleSetResult, MASK};
pub use scheduler::{Cycle, DependencyGraph, SortResult};
pub use store::{StoreStats, ValueReferenceStore};
pub use typing::{Type, TypeKind};
pub use value::Value;

/// Items in `unstable` are likely to change.
pub mod unstable {
    pub use crate::context::ExecutionContext;
    pub use crate::phases::*;
    pub use crate::plan::{ExecutionPlan, Flow, Mode, Phase, Step as PlanStep};
}

#[cfg(test)]
mod tests;
