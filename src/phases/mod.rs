// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The six phases of a blueprint execution.

mod evaluate;
mod providers;
mod resolve;
mod validate;

pub use evaluate::EvaluateRule;
pub use providers::{ConfigureProvider, InitializeProvider, ReadSource};
pub use resolve::{reference_graph, ResolveReferences};
pub use validate::{validate, ValidateBlueprint};

use crate::blueprint::Blueprint;
use crate::plan::{ExecutionPlan, Mode, Phase};

pub const VALIDATE: &str = "validate";
pub const INITIALIZE: &str = "initialize";
pub const CONFIGURE: &str = "configure";
pub const READ: &str = "read";
pub const RESOLVE: &str = "resolve";
pub const EVALUATE: &str = "evaluate";

pub fn build_plan(blueprint: &Blueprint) -> ExecutionPlan {
    let sources: Vec<&String> = blueprint.sources.keys().collect();

    let mut initialize = Phase::new(INITIALIZE, Mode::Sequential);
    let mut configure = Phase::new(CONFIGURE, Mode::Sequential);
    // Sources are independent leaves, so reads are not bounded by the pool.
    let mut read = Phase::new(READ, Mode::Parallel { bounded: false });
    for alias in sources {
        initialize = initialize.step(InitializeProvider {
            alias: alias.clone(),
        });
        configure = configure.step(ConfigureProvider {
            alias: alias.clone(),
        });
        read = read.step(ReadSource {
            alias: alias.clone(),
        });
    }

    // Each rule takes its own permit when its predicate runs.
    let mut evaluate = Phase::new(EVALUATE, Mode::Parallel { bounded: false });
    for index in 0..blueprint.ruleset.len() {
        evaluate = evaluate.step(EvaluateRule { index });
    }

    ExecutionPlan::new()
        .phase(
            Phase::new(VALIDATE, Mode::Sequential)
                .fail_fast()
                .step(ValidateBlueprint),
        )
        .phase(initialize)
        .phase(configure)
        .phase(read)
        .phase(Phase::new(RESOLVE, Mode::Sequential).step(ResolveReferences))
        .phase(evaluate)
}
