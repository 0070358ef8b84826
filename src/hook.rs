//! Lifecycle hooks and their registry.
//!
//! Six hook points exist: around the whole run, around each test case and
//! around each test step. After-hooks additionally receive a
//! [`HookResult`] describing what they run after.

use std::fmt;

use crate::{
    ctx::{CaseHookCtx, RunHookCtx, StepHookCtx},
    step::Location,
};

/// Kind of a lifecycle hook.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum HookType {
    /// Before any pickle executes.
    BeforeTestRun,

    /// After every pickle executed.
    AfterTestRun,

    /// Before each test case attempt.
    BeforeTestCase,

    /// After each test case attempt.
    AfterTestCase,

    /// Before each test step.
    BeforeTestStep,

    /// After each test step.
    AfterTestStep,
}

impl HookType {
    /// Wire name used in `Hook` envelopes.
    #[must_use]
    pub(crate) fn wire_name(self) -> &'static str {
        match self {
            Self::BeforeTestRun => "BEFORE_TEST_RUN",
            Self::AfterTestRun => "AFTER_TEST_RUN",
            Self::BeforeTestCase => "BEFORE_TEST_CASE",
            Self::AfterTestCase => "AFTER_TEST_CASE",
            Self::BeforeTestStep => "BEFORE_TEST_STEP",
            Self::AfterTestStep => "AFTER_TEST_STEP",
        }
    }
}

/// One captured failure inside a scenario or run, handed to after-hooks.
#[derive(Clone, Debug)]
pub struct HookError {
    /// URI of the feature the failure happened in, when known.
    pub feature: Option<String>,

    /// Name of the scenario, when known.
    pub scenario: Option<String>,

    /// Text of the step, when the failure is step-scoped.
    pub step: Option<String>,

    /// Failure message.
    pub message: String,
}

/// Result summary passed to after-hooks.
#[derive(Clone, Debug, Default)]
pub enum HookResult {
    /// The wrapped scope passed.
    #[default]
    Passed,

    /// The wrapped scope failed; one entry per captured failure.
    Failed(Vec<HookError>),
}

impl HookResult {
    /// Indicates whether the wrapped scope failed.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// The six handler shapes, by hook point.
pub(crate) enum HookHandler<W> {
    BeforeRun(Box<dyn Fn(&mut RunHookCtx) -> anyhow::Result<()>>),
    AfterRun(Box<dyn Fn(&mut RunHookCtx, &HookResult) -> anyhow::Result<()>>),
    BeforeCase(Box<dyn Fn(&mut W, &mut CaseHookCtx) -> anyhow::Result<()>>),
    AfterCase(
        Box<dyn Fn(&mut W, &mut CaseHookCtx, &HookResult) -> anyhow::Result<()>>,
    ),
    BeforeStep(Box<dyn Fn(&mut W, &mut StepHookCtx) -> anyhow::Result<()>>),
    AfterStep(
        Box<dyn Fn(&mut W, &mut StepHookCtx, &HookResult) -> anyhow::Result<()>>,
    ),
}

/// A registered lifecycle hook.
pub struct Hook<W> {
    /// Unique `hook-N` id.
    pub id: String,

    /// Hook point.
    pub ty: HookType,

    /// Typed handler.
    pub(crate) handler: HookHandler<W>,

    /// Registration call site.
    pub location: Option<Location>,
}

impl<W> fmt::Debug for Hook<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook")
            .field("id", &self.id)
            .field("ty", &self.ty)
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

/// Ordered collection of hooks.
#[derive(Debug)]
pub struct HookRegistry<W> {
    hooks: Vec<Hook<W>>,
}

impl<W> HookRegistry<W> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { hooks: Vec::new() }
    }

    pub(crate) fn push(&mut self, hook: Hook<W>) {
        self.hooks.push(hook);
    }

    /// All hooks, in registration order.
    #[must_use]
    pub fn all(&self) -> &[Hook<W>] {
        &self.hooks
    }

    /// Hooks of the given type, in registration order.
    pub fn by_type(
        &self,
        ty: HookType,
    ) -> impl Iterator<Item = &Hook<W>> + '_ {
        self.hooks.iter().filter(move |h| h.ty == ty)
    }
}

// Implemented manually to omit the redundant `W: Default` bound a
// `#[derive(Default)]` would impose.
impl<W> Default for HookRegistry<W> {
    fn default() -> Self {
        Self::new()
    }
}
