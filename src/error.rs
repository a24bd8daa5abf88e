// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::typing::Type;

use thiserror::Error;

/// Failure to convert or assign a value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TypeError {
    /// Source value does not fit the destination shape.
    #[error("type mismatch: cannot convert `{source_type}` to `{target}`")]
    Mismatch { source_type: Type, target: Type },
    /// `assign` was called with a value of a different kind.
    #[error("type mismatch: cannot assign `{source_type}` to `{target}`")]
    Assign { source_type: Type, target: Type },
    /// More than one variant candidate accepts the value.
    #[error("ambiguous variant: `{value_type}` matches both `{first}` and `{second}`")]
    AmbiguousVariant {
        value_type: Type,
        first: Type,
        second: Type,
    },
    /// No variant candidate accepts the value.
    #[error("no variant candidate of `{candidates}` accepts `{value_type}`")]
    NoVariantCandidate { value_type: Type, candidates: Type },
}

/// Malformed path expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("empty path")]
    Empty,
    #[error("empty segment at offset {offset} in `{path}`")]
    EmptySegment { path: String, offset: usize },
    #[error("unterminated `{delimiter}` at offset {offset} in `{path}`")]
    Unterminated {
        path: String,
        offset: usize,
        delimiter: char,
    },
    #[error("invalid index `{index}` in `{path}`")]
    InvalidIndex { path: String, index: String },
    #[error("unexpected character `{ch}` at offset {offset} in `{path}`")]
    UnexpectedChar {
        path: String,
        offset: usize,
        ch: char,
    },
}

/// Structural problems in a blueprint. Reported before any provider I/O.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("blueprint does not declare a version")]
    MissingVersion,
    #[error("blueprint does not declare any sources")]
    NoSources,
    #[error("source `{source_alias}` uses unknown provider `{provider}`")]
    UnknownProvider {
        source_alias: String,
        provider: String,
    },
    #[error("source `{0}` must declare exactly one of `config` and `configFile`")]
    ConfigConflict(String),
    #[error("alias `{0}` is declared both as a source and as a reference")]
    DuplicateAlias(String),
    #[error("{context}: invalid path `{path}`: {error}")]
    InvalidPath {
        context: String,
        path: String,
        error: PathError,
    },
    #[error("{context}: unresolved reference root `{root}` in `{path}`")]
    UnresolvedRoot {
        context: String,
        root: String,
        path: String,
    },
    #[error("{context}: unknown predicate `{predicate}`")]
    UnknownPredicate { context: String, predicate: String },
    #[error("{context}: expected exactly one predicate, found {found}")]
    PredicateCount { context: String, found: usize },
}

/// Failure to resolve a reference or path.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolutionError {
    #[error("reference not found: `{0}`")]
    NotFound(String),
    #[error("path `{path}` not found: no `{step}` in `{prefix}`")]
    MissingStep {
        path: String,
        prefix: String,
        step: String,
    },
    #[error("path `{path}`: cannot apply `{step}` to {kind} at `{prefix}`")]
    NotTraversable {
        path: String,
        prefix: String,
        step: String,
        kind: &'static str,
    },
    #[error("cyclic dependency: {0}")]
    Cycle(String),
    #[error("reference `{alias}` depends on unresolved `{dependency}`")]
    DependencyFailed { alias: String, dependency: String },
    #[error("{0}")]
    Path(#[from] PathError),
}

/// A source failed to initialize, configure or read.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    #[error("unknown provider `{0}`")]
    Unknown(String),
    #[error("source `{source_alias}`: provider `{provider}` is not initialized")]
    NotInitialized {
        source_alias: String,
        provider: String,
    },
    #[error("source `{source_alias}`: configuration does not match `{expected}`")]
    Schema {
        source_alias: String,
        expected: Type,
    },
    #[error("source `{source_alias}`: environment variable `{variable}` is not set")]
    MissingVariable {
        source_alias: String,
        variable: String,
    },
    #[error("source `{source_alias}`: {message}")]
    Configure {
        source_alias: String,
        message: String,
    },
    #[error("source `{source_alias}`: {message}")]
    Read {
        source_alias: String,
        message: String,
    },
}

/// Failure to run a predicate, as opposed to a failed assertion.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredicateError {
    #[error("`{predicate}` expects {expected} argument(s), got {actual}")]
    ArgumentCount {
        predicate: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("`{predicate}` expects value of type `{expected}`, got `{actual}`")]
    ValueType {
        predicate: &'static str,
        expected: Type,
        actual: Type,
    },
    #[error("`{predicate}` expects argument {position} of type `{expected}`, got `{actual}`")]
    ArgumentType {
        predicate: &'static str,
        position: usize,
        expected: Type,
        actual: Type,
    },
    #[error("`{predicate}`: {message}")]
    Internal {
        predicate: &'static str,
        message: String,
    },
}

/// A rule could not be bound to its subject and arguments.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuleError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error(transparent)]
    Path(#[from] PathError),
}

/// A unit of work scheduled on the worker pool did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    #[error("timed out after {0:?}")]
    Timeout(core::time::Duration),
    #[error("worker pool is closed")]
    Closed,
    #[error("task panicked: {0}")]
    Panicked(String),
}
