//! Result tree returned to the caller and status aggregation.

use derive_more::Display;

use crate::{event::TestStepResultStatus, feature::ParseErrorInfo};

/// Final status of one executed step.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StepStatus {
    /// Handler returned successfully.
    Passed,

    /// Handler failed; carries its message.
    Failed(String),

    /// Step was not executed, with an optional reason.
    Skipped(Option<String>),

    /// No step definition matched.
    Undefined,

    /// Step is marked pending.
    Pending,
}

impl StepStatus {
    /// Wire status for `TestStepFinished` envelopes.
    pub(crate) fn wire(&self) -> TestStepResultStatus {
        match self {
            Self::Passed => TestStepResultStatus::Passed,
            Self::Failed(_) => TestStepResultStatus::Failed,
            Self::Skipped(_) => TestStepResultStatus::Skipped,
            Self::Undefined => TestStepResultStatus::Undefined,
            Self::Pending => TestStepResultStatus::Pending,
        }
    }

    /// Message accompanying the status, when any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Failed(msg) => Some(msg),
            Self::Skipped(reason) => reason.as_deref(),
            _ => None,
        }
    }
}

/// Final status of one scenario, derived from its step statuses.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ScenarioStatus {
    /// Every step passed.
    Passed,

    /// At least one step or hook failed.
    Failed(String),

    /// Steps were skipped and nothing failed.
    Skipped(Option<String>),

    /// An undefined step was encountered and nothing failed.
    Undefined,

    /// A pending step was encountered and nothing failed or was
    /// undefined.
    Pending,
}

/// Derives a scenario status from its step statuses.
///
/// Precedence is Failed > Undefined > Pending > Skipped > Passed; the
/// first failure message and the first skip reason are preserved. An
/// empty list is `Passed`.
#[must_use]
pub fn scenario_status(steps: &[StepStatus]) -> ScenarioStatus {
    if let Some(msg) = steps.iter().find_map(|s| match s {
        StepStatus::Failed(msg) => Some(msg.clone()),
        _ => None,
    }) {
        return ScenarioStatus::Failed(msg);
    }
    if steps.iter().any(|s| matches!(s, StepStatus::Undefined)) {
        return ScenarioStatus::Undefined;
    }
    if steps.iter().any(|s| matches!(s, StepStatus::Pending)) {
        return ScenarioStatus::Pending;
    }
    if let Some(reason) = steps.iter().find_map(|s| match s {
        StepStatus::Skipped(reason) => Some(reason.clone()),
        _ => None,
    }) {
        return ScenarioStatus::Skipped(reason);
    }
    ScenarioStatus::Passed
}

/// Result of one executed step.
#[derive(Clone, Debug)]
pub struct StepResult {
    /// Step text.
    pub text: String,

    /// Final status.
    pub status: StepStatus,
}

/// Result of one executed scenario (pickle).
#[derive(Clone, Debug)]
pub struct ScenarioResult {
    /// Scenario (pickle) display name.
    pub name: String,

    /// URI of the source feature.
    pub uri: String,

    /// Final status, from the last attempt.
    pub status: ScenarioStatus,

    /// Per-step results, from the last attempt.
    pub steps: Vec<StepResult>,

    /// Number of attempts executed (1 without retries).
    pub attempts: usize,
}

/// Results of every scenario of one feature.
#[derive(Clone, Debug)]
pub struct FeatureResult {
    /// URI of the feature.
    pub uri: String,

    /// Feature name.
    pub name: String,

    /// Scenario results, in execution-plan order.
    pub scenarios: Vec<ScenarioResult>,
}

/// Aggregate counters of a run.
#[derive(Clone, Copy, Debug, Default, Display, Eq, PartialEq)]
#[display(
    fmt = "{} scenarios ({} passed, {} failed, {} skipped, {} undefined, \
           {} pending, {} retried)",
    total,
    passed,
    failed,
    skipped,
    undefined,
    pending,
    retried
)]
pub struct RunSummary {
    /// Scenarios executed (or skipped) in total.
    pub total: usize,

    /// Scenarios that passed.
    pub passed: usize,

    /// Scenarios that failed.
    pub failed: usize,

    /// Scenarios that were skipped.
    pub skipped: usize,

    /// Scenarios with undefined steps.
    pub undefined: usize,

    /// Scenarios with pending steps.
    pub pending: usize,

    /// Scenarios that needed at least one retry.
    pub retried: usize,
}

impl RunSummary {
    pub(crate) fn record(&mut self, result: &ScenarioResult) {
        self.total += 1;
        match &result.status {
            ScenarioStatus::Passed => self.passed += 1,
            ScenarioStatus::Failed(_) => self.failed += 1,
            ScenarioStatus::Skipped(_) => self.skipped += 1,
            ScenarioStatus::Undefined => self.undefined += 1,
            ScenarioStatus::Pending => self.pending += 1,
        }
        if result.attempts > 1 {
            self.retried += 1;
        }
    }
}

/// Everything a run produced.
#[derive(Clone, Debug)]
pub struct RunResult {
    /// Per-feature results, in cache insertion order.
    pub features: Vec<FeatureResult>,

    /// Aggregate counters.
    pub summary: RunSummary,

    /// Features that failed to load.
    pub parse_errors: Vec<ParseErrorInfo>,
}

impl RunResult {
    /// Indicates a fully successful run: nothing failed, undefined or
    /// pending, and every feature parsed.
    #[must_use]
    pub fn success(&self) -> bool {
        self.summary.failed == 0
            && self.summary.undefined == 0
            && self.summary.pending == 0
            && self.parse_errors.is_empty()
    }

    /// All scenario results, across features.
    pub fn scenarios(&self) -> impl Iterator<Item = &ScenarioResult> + '_ {
        self.features.iter().flat_map(|f| f.scenarios.iter())
    }
}
