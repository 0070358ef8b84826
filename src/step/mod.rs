//! Step definitions, their registry and first-match-wins lookup.

pub mod args;
pub mod location;
pub(crate) mod suggest;

use std::fmt;

use crate::{
    ctx::Ctx,
    expression::{Expression, StepArg},
    pickle::PickleStepType,
};

pub use self::{
    args::{DocString, FromStepArg, StepArgError},
    location::Location,
};

/// Keyword category a step definition is registered under.
///
/// `Step` matches any step type; the others match their Gherkin
/// counterpart. Steps with an [`Unknown`] type try every definition.
///
/// [`Unknown`]: PickleStepType::Unknown
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum StepKeyword {
    /// Matches `Given` (context) steps.
    Given,

    /// Matches `When` (action) steps.
    When,

    /// Matches `Then` (outcome) steps.
    Then,

    /// Matches steps of any type.
    Step,
}

impl StepKeyword {
    /// Indicates whether a definition under this keyword may match a step
    /// of the given type.
    #[must_use]
    pub fn accepts(self, ty: PickleStepType) -> bool {
        matches!(
            (self, ty),
            (Self::Step, _)
                | (_, PickleStepType::Unknown)
                | (Self::Given, PickleStepType::Context)
                | (Self::When, PickleStepType::Action)
                | (Self::Then, PickleStepType::Outcome)
        )
    }
}

/// Handler of a matched step: receives the scenario's world and the
/// per-invocation [`Ctx`].
pub type StepHandler<W> =
    Box<dyn Fn(&mut W, &mut Ctx) -> anyhow::Result<()>>;

/// A registered step definition.
pub struct StepDefinition<W> {
    /// Unique `sd-N` id.
    pub id: String,

    /// Keyword category.
    pub keyword: StepKeyword,

    /// Original pattern source.
    pub pattern: String,

    /// Compiled expression.
    pub expression: Expression,

    /// Handler closure.
    pub(crate) handler: StepHandler<W>,

    /// Registration call site.
    pub location: Option<Location>,
}

impl<W> fmt::Debug for StepDefinition<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepDefinition")
            .field("id", &self.id)
            .field("keyword", &self.keyword)
            .field("pattern", &self.pattern)
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

/// Outcome of matching a step text against the registry.
#[derive(Debug)]
pub enum StepMatch<'reg, W> {
    /// A definition matched; `args` are its transformed parameters.
    Matched {
        /// The matching definition.
        def: &'reg StepDefinition<W>,

        /// Typed arguments, left to right.
        args: Vec<StepArg>,
    },

    /// No definition matched.
    Undefined {
        /// The unmatched step text.
        step_text: String,

        /// Step type of the unmatched step.
        keyword: PickleStepType,

        /// Generated registration skeleton.
        snippet: String,

        /// Nearest registered patterns, best first.
        suggestions: Vec<String>,
    },
}

/// Ordered collection of step definitions.
///
/// Registration order is match-attempt order; duplicate or ambiguous
/// patterns are not detected, the first match wins.
#[derive(Debug)]
pub struct StepRegistry<W> {
    defs: Vec<StepDefinition<W>>,
}

impl<W> StepRegistry<W> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { defs: Vec::new() }
    }

    pub(crate) fn push(&mut self, def: StepDefinition<W>) {
        self.defs.push(def);
    }

    /// Registered definitions, in registration order.
    #[must_use]
    pub fn defs(&self) -> &[StepDefinition<W>] {
        &self.defs
    }

    /// Matches `text` against the registered definitions in order.
    #[must_use]
    pub fn find_match(
        &self,
        text: &str,
        ty: PickleStepType,
    ) -> StepMatch<'_, W> {
        for def in &self.defs {
            if !def.keyword.accepts(ty) {
                continue;
            }
            if let Some(args) = def.expression.match_against(text) {
                return StepMatch::Matched { def, args };
            }
        }

        StepMatch::Undefined {
            step_text: text.to_owned(),
            keyword: ty,
            snippet: suggest::snippet(text, ty),
            suggestions: suggest::suggestions(
                text,
                self.defs.iter().map(|d| d.pattern.as_str()),
            ),
        }
    }
}

// Implemented manually to omit the redundant `W: Default` bound a
// `#[derive(Default)]` would impose.
impl<W> Default for StepRegistry<W> {
    fn default() -> Self {
        Self::new()
    }
}
