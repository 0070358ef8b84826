//! Protocol envelopes emitted over the run's lifetime.
//!
//! An [`Envelope`] is a tagged union with exactly one populated variant;
//! serializing one yields the Cucumber-Messages JSON shape, e.g.
//! `{"testCaseStarted": {…}}`. The canonical per-run emission order is
//! enforced by the runner; [`emitter::Emitter`] guarantees that envelope
//! groups from concurrently executing pickles never interleave.

pub(crate) mod emitter;
pub mod messages;

use serde::Serialize;

pub use self::messages::{
    ContentEncoding, Duration, TestStepResultStatus, Timestamp,
};

/// A single protocol message.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::large_enum_variant)]
pub enum Envelope {
    /// Implementation and platform identification; first in every run.
    Meta(messages::Meta),

    /// Source text of a feature.
    Source(messages::Source),

    /// A successfully parsed feature.
    GherkinDocument(messages::GherkinDocument),

    /// A feature that failed to parse.
    ParseError(messages::ParseError),

    /// A compiled pickle.
    Pickle(messages::Pickle),

    /// A registered step definition.
    StepDefinition(messages::StepDefinition),

    /// A registered custom parameter type.
    ParameterType(messages::ParameterType),

    /// A registered hook.
    Hook(messages::Hook),

    /// Execution plan of one pickle.
    TestCase(messages::TestCase),

    /// The run began.
    TestRunStarted(messages::TestRunStarted),

    /// One attempt of a test case began.
    TestCaseStarted(messages::TestCaseStarted),

    /// A test step began.
    TestStepStarted(messages::TestStepStarted),

    /// An embedded attachment.
    Attachment(messages::Attachment),

    /// A reference to externally stored attachment content.
    ExternalAttachment(messages::ExternalAttachment),

    /// A test step finished.
    TestStepFinished(messages::TestStepFinished),

    /// One attempt of a test case finished.
    TestCaseFinished(messages::TestCaseFinished),

    /// A run-level hook began.
    TestRunHookStarted(messages::TestRunHookStarted),

    /// A run-level hook finished.
    TestRunHookFinished(messages::TestRunHookFinished),

    /// The run finished.
    TestRunFinished(messages::TestRunFinished),
}
