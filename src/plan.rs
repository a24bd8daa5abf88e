// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Execution plans: ordered phases of steps over a shared context.

use crate::context::ExecutionContext;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinSet;
use tracing::{debug, error, info_span, warn, Instrument};

/// Whether later work may proceed after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Later phases cannot meaningfully run.
    Halt,
}

impl Flow {
    fn and(self, other: Flow) -> Flow {
        if self == Flow::Halt || other == Flow::Halt {
            Flow::Halt
        } else {
            Flow::Continue
        }
    }
}

/// A unit of work. Its observable effects are diagnostics and context
/// mutation.
#[async_trait]
pub trait Step: Send + Sync {
    fn name(&self) -> String;

    /// Whether the step runs under the per-step time limit. Steps that bound
    /// their own units of work opt out.
    fn timed(&self) -> bool {
        true
    }

    async fn execute(&self, ctx: Arc<ExecutionContext>) -> Flow;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Sequential,
    /// All steps at once. `bounded` steps share the worker pool permits.
    Parallel { bounded: bool },
}

pub struct Phase {
    name: &'static str,
    mode: Mode,
    fail_fast: bool,
    steps: Vec<Arc<dyn Step>>,
}

impl Phase {
    pub fn new(name: &'static str, mode: Mode) -> Self {
        Self {
            name,
            mode,
            fail_fast: false,
            steps: vec![],
        }
    }

    /// Stop at the first halting step instead of letting its siblings run.
    pub fn fail_fast(mut self) -> Self {
        self.fail_fast = true;
        self
    }

    pub fn step<S: Step + 'static>(mut self, step: S) -> Self {
        self.steps.push(Arc::new(step));
        self
    }

    pub fn push(&mut self, step: Arc<dyn Step>) {
        self.steps.push(step);
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub async fn run(&self, ctx: &Arc<ExecutionContext>) -> Flow {
        match self.mode {
            Mode::Sequential => {
                let mut flow = Flow::Continue;
                for step in &self.steps {
                    flow = flow.and(run_step(step.clone(), ctx.clone(), false).await);
                    if flow == Flow::Halt && self.fail_fast {
                        break;
                    }
                }
                flow
            }
            Mode::Parallel { bounded } => {
                let mut set = JoinSet::new();
                for step in &self.steps {
                    set.spawn(
                        run_step(step.clone(), ctx.clone(), bounded).in_current_span(),
                    );
                }
                let mut flow = Flow::Continue;
                while let Some(joined) = set.join_next().await {
                    match joined {
                        Ok(f) => flow = flow.and(f),
                        Err(e) => {
                            error!("step task failed: {e}");
                            ctx.diagnostics
                                .error(format!("phase `{}`: step aborted", self.name), e.to_string());
                        }
                    }
                }
                flow
            }
        }
    }
}

async fn run_step(step: Arc<dyn Step>, ctx: Arc<ExecutionContext>, bounded: bool) -> Flow {
    let name = step.name();
    debug!(step = %name, "started");

    let permit = if bounded {
        match ctx.pool.acquire().await {
            Ok(p) => Some(p),
            Err(e) => {
                ctx.diagnostics.error(format!("step `{name}` did not run"), e.to_string());
                return Flow::Continue;
            }
        }
    } else {
        None
    };

    let flow = if step.timed() {
        match ctx.pool.timed(step.execute(ctx.clone())).await {
            Ok(flow) => flow,
            Err(e) => {
                warn!(step = %name, "{e}");
                ctx.diagnostics.error(format!("step `{name}` did not complete"), e.to_string());
                Flow::Continue
            }
        }
    } else {
        step.execute(ctx.clone()).await
    };

    drop(permit);
    debug!(step = %name, ?flow, "finished");
    flow
}

/// Ordered phases.
#[derive(Default)]
pub struct ExecutionPlan {
    phases: Vec<Phase>,
}

impl ExecutionPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(mut self, phase: Phase) -> Self {
        self.phases.push(phase);
        self
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    /// Run every phase in order. Returns the name of the phase that halted
    /// the plan, if any.
    pub async fn run(&self, ctx: &Arc<ExecutionContext>) -> Option<&'static str> {
        for phase in &self.phases {
            let span = info_span!("phase", name = phase.name(), steps = phase.len());
            let flow = phase.run(ctx).instrument(span).await;
            if flow == Flow::Halt {
                debug!(phase = phase.name(), "halted");
                return Some(phase.name());
            }
        }
        None
    }
}
