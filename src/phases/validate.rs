// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::blueprint::Blueprint;
use crate::context::ExecutionContext;
use crate::error::ValidationError;
use crate::path::Path;
use crate::plan::{Flow, Step};
use crate::predicates::Condition;
use crate::providers::ProviderFactory;

use std::sync::Arc;

use async_trait::async_trait;

/// Check the structure of a blueprint without touching any source.
///
/// Every problem is reported, not only the first one.
pub fn validate(blueprint: &Blueprint, factory: &ProviderFactory) -> Vec<ValidationError> {
    let mut errors = vec![];

    if blueprint.version.is_none() {
        errors.push(ValidationError::MissingVersion);
    }
    if blueprint.sources.is_empty() {
        errors.push(ValidationError::NoSources);
    }

    for (alias, source) in &blueprint.sources {
        if !factory.contains(&source.provider) {
            errors.push(ValidationError::UnknownProvider {
                source_alias: alias.clone(),
                provider: source.provider.clone(),
            });
        }
        if source.config.is_some() == source.config_file.is_some() {
            errors.push(ValidationError::ConfigConflict(alias.clone()));
        }
        if blueprint.refs.contains_key(alias) {
            errors.push(ValidationError::DuplicateAlias(alias.clone()));
        }
    }

    let mut check_path = |context: String, path: &str| match Path::parse(path) {
        Ok(p) if !blueprint.has_alias(p.root()) => errors.push(ValidationError::UnresolvedRoot {
            context,
            root: p.root().to_string(),
            path: path.to_string(),
        }),
        Ok(_) => (),
        Err(error) => errors.push(ValidationError::InvalidPath {
            context,
            path: path.to_string(),
            error,
        }),
    };

    for (alias, path) in &blueprint.refs {
        check_path(format!("reference `{alias}`"), path);
    }

    let mut rule_errors = vec![];
    for (index, rule) in blueprint.ruleset.iter().enumerate() {
        let context = format!("rule `{}`", rule.display_name(index));
        check_path(context.clone(), &rule.value);

        match rule.predicates.as_slice() {
            [(predicate, args)] => {
                if predicate.parse::<Condition>().is_err() {
                    rule_errors.push(ValidationError::UnknownPredicate {
                        context: context.clone(),
                        predicate: predicate.clone(),
                    });
                }
                for path in args.iter().filter_map(|a| a.path()) {
                    check_path(context.clone(), path);
                }
            }
            predicates => rule_errors.push(ValidationError::PredicateCount {
                context,
                found: predicates.len(),
            }),
        }
    }

    errors.extend(rule_errors);
    errors
}

pub struct ValidateBlueprint;

#[async_trait]
impl Step for ValidateBlueprint {
    fn name(&self) -> String {
        "validate blueprint".into()
    }

    async fn execute(&self, ctx: Arc<ExecutionContext>) -> Flow {
        let errors = validate(&ctx.blueprint, &ctx.factory);
        if errors.is_empty() {
            return Flow::Continue;
        }
        for e in &errors {
            ctx.diagnostics.error("invalid blueprint", e.to_string());
        }
        Flow::Halt
    }
}
