//! Cucumber-Messages wire types.
//!
//! Field names serialize in camelCase per upstream convention; statuses
//! and encodings in SCREAMING_SNAKE_CASE. Only the fields this core
//! populates are modelled.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::pickle::{self, PickleStepType};

/// Wall-clock instant as `{seconds, nanos}` since the Unix epoch.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct Timestamp {
    /// Whole seconds.
    pub seconds: i64,

    /// Nanosecond remainder.
    pub nanos: i32,
}

impl Timestamp {
    /// Captures the current wall-clock time.
    #[must_use]
    pub fn now() -> Self {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self {
            seconds: since_epoch.as_secs() as i64,
            nanos: since_epoch.subsec_nanos() as i32,
        }
    }
}

/// Elapsed time as `{seconds, nanos}`.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct Duration {
    /// Whole seconds.
    pub seconds: i64,

    /// Nanosecond remainder.
    pub nanos: i32,
}

impl From<std::time::Duration> for Duration {
    fn from(d: std::time::Duration) -> Self {
        Self {
            seconds: d.as_secs() as i64,
            nanos: d.subsec_nanos() as i32,
        }
    }
}

/// Content encoding of an embedded attachment body.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentEncoding {
    /// Body is the content itself.
    Identity,

    /// Body is Base64-encoded content.
    Base64,
}

/// Wire status of a finished test step.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestStepResultStatus {
    /// Step passed.
    Passed,

    /// Step failed.
    Failed,

    /// Step was skipped.
    Skipped,

    /// No step definition matched.
    Undefined,

    /// Step is marked pending.
    Pending,
}

/// A product identification inside [`Meta`].
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Product name.
    pub name: String,

    /// Product version, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// First envelope of every run.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    /// Version of the Cucumber-Messages protocol.
    pub protocol_version: String,

    /// This implementation.
    pub implementation: Product,

    /// Operating system.
    pub os: Product,

    /// Processor architecture.
    pub cpu: Product,
}

impl Meta {
    pub(crate) fn current() -> Self {
        Self {
            protocol_version: "22.0.0".to_owned(),
            implementation: Product {
                name: "moonspec".to_owned(),
                version: Some(env!("CARGO_PKG_VERSION").to_owned()),
            },
            os: Product {
                name: std::env::consts::OS.to_owned(),
                version: None,
            },
            cpu: Product {
                name: std::env::consts::ARCH.to_owned(),
                version: None,
            },
        }
    }
}

/// Source text of a feature.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    /// URI of the feature.
    pub uri: String,

    /// Original Gherkin text; empty for pre-parsed features.
    pub data: String,

    /// Media type of `data`.
    pub media_type: String,
}

/// Shallow projection of a parsed feature.
///
/// The full AST stays behind the parser boundary; consumers needing it
/// hold the `gherkin` types directly.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GherkinFeature {
    /// Feature keyword.
    pub keyword: String,

    /// Feature name.
    pub name: String,

    /// Number of scenarios, rules included.
    pub scenario_count: usize,
}

/// A successfully parsed feature.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GherkinDocument {
    /// URI of the feature.
    pub uri: String,

    /// Parsed feature projection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature: Option<GherkinFeature>,
}

/// Location inside a source file.
#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceLocation {
    /// 1-based line.
    pub line: usize,

    /// 1-based column, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
}

/// Reference to a place in user sources.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceReference {
    /// Referenced URI (feature file or glue source file).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,

    /// Referenced location.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
}

impl From<crate::step::Location> for SourceReference {
    fn from(loc: crate::step::Location) -> Self {
        Self {
            uri: Some(loc.path.to_owned()),
            location: Some(SourceLocation {
                line: loc.line as usize,
                column: Some(loc.column as usize),
            }),
        }
    }
}

/// A feature that failed to parse.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseError {
    /// Where the failure happened.
    pub source: SourceReference,

    /// Parser diagnostic.
    pub message: String,
}

/// A pickle tag.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PickleTag {
    /// Tag name, `@` sigil included.
    pub name: String,
}

/// A cell of a pickle table row.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PickleTableCell {
    /// Cell text.
    pub value: String,
}

/// A row of a pickle table.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PickleTableRow {
    /// Row cells.
    pub cells: Vec<PickleTableCell>,
}

/// A data table attached to a pickle step.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PickleTable {
    /// Table rows.
    pub rows: Vec<PickleTableRow>,
}

/// A DocString attached to a pickle step.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PickleDocString {
    /// DocString content.
    pub content: String,

    /// Media type annotation, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
}

/// Block argument of a pickle step.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PickleStepArgument {
    /// DocString form.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_string: Option<PickleDocString>,

    /// Data table form.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_table: Option<PickleTable>,
}

/// One step of a pickle.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PickleStep {
    /// Unique step id.
    pub id: String,

    /// Step text.
    pub text: String,

    /// Step type.
    #[serde(rename = "type")]
    pub ty: PickleStepType,

    /// AST nodes the step traces back to.
    pub ast_node_ids: Vec<String>,

    /// Block argument, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub argument: Option<PickleStepArgument>,
}

/// A flattened scenario on the wire.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pickle {
    /// Unique pickle id.
    pub id: String,

    /// URI of the source feature.
    pub uri: String,

    /// Display name.
    pub name: String,

    /// Gherkin dialect.
    pub language: String,

    /// Executable steps.
    pub steps: Vec<PickleStep>,

    /// Inherited tags.
    pub tags: Vec<PickleTag>,

    /// AST nodes the pickle traces back to.
    pub ast_node_ids: Vec<String>,
}

impl From<&pickle::Pickle> for Pickle {
    fn from(p: &pickle::Pickle) -> Self {
        Self {
            id: p.id.clone(),
            uri: p.uri.clone(),
            name: p.name.clone(),
            language: p.language.clone(),
            steps: p.steps.iter().map(Into::into).collect(),
            tags: p
                .tags
                .iter()
                .map(|t| PickleTag { name: format!("@{t}") })
                .collect(),
            ast_node_ids: p.ast_node_ids.clone(),
        }
    }
}

impl From<&pickle::PickleStep> for PickleStep {
    fn from(s: &pickle::PickleStep) -> Self {
        let argument = s.argument.as_ref().map(|arg| match arg {
            pickle::PickleArgument::DocString { content } => {
                PickleStepArgument {
                    doc_string: Some(PickleDocString {
                        content: content.clone(),
                        media_type: None,
                    }),
                    ..PickleStepArgument::default()
                }
            }
            pickle::PickleArgument::DataTable(table) => PickleStepArgument {
                data_table: Some(PickleTable {
                    rows: table
                        .raw()
                        .iter()
                        .map(|row| PickleTableRow {
                            cells: row
                                .iter()
                                .map(|value| PickleTableCell {
                                    value: value.clone(),
                                })
                                .collect(),
                        })
                        .collect(),
                }),
                ..PickleStepArgument::default()
            },
        });

        Self {
            id: s.id.clone(),
            text: s.text.clone(),
            ty: s.ty,
            ast_node_ids: s.ast_node_ids.clone(),
            argument,
        }
    }
}

/// Pattern of a registered step definition.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepDefinitionPattern {
    /// Pattern source text.
    pub source: String,

    /// Pattern flavour.
    #[serde(rename = "type")]
    pub ty: String,
}

/// A registered step definition on the wire.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepDefinition {
    /// Unique `sd-N` id.
    pub id: String,

    /// Registered pattern.
    pub pattern: StepDefinitionPattern,

    /// Registration call site.
    pub source_reference: SourceReference,
}

/// A registered custom parameter type on the wire.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterType {
    /// Unique `pt-N` id.
    pub id: String,

    /// Name referenced inside `{…}`.
    pub name: String,

    /// Regex sub-patterns.
    pub regular_expressions: Vec<String>,

    /// Whether this type is preferred for plain-regex matches.
    pub prefer_for_regular_expression_match: bool,

    /// Whether snippets may use this type.
    pub use_for_snippets: bool,
}

/// A registered hook on the wire.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Hook {
    /// Unique `hook-N` id.
    pub id: String,

    /// Hook point wire name.
    #[serde(rename = "type")]
    pub ty: String,

    /// Registration call site.
    pub source_reference: SourceReference,
}

/// One entry of a [`TestCase`]: either a hook or a pickle step.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestStep {
    /// Unique `ts-N` id.
    pub id: String,

    /// Referenced hook, for hook steps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hook_id: Option<String>,

    /// Referenced pickle step, for regular steps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pickle_step_id: Option<String>,

    /// Matching step definitions (empty when undefined).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_definition_ids: Option<Vec<String>>,
}

/// Execution plan of one pickle.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    /// Unique `tc-N` id.
    pub id: String,

    /// Executed pickle.
    pub pickle_id: String,

    /// Hook and step entries, in execution order.
    pub test_steps: Vec<TestStep>,
}

/// The run began.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRunStarted {
    /// Unique `trs-N` id.
    pub id: String,

    /// Start instant.
    pub timestamp: Timestamp,
}

/// One attempt of a test case began.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseStarted {
    /// Unique `tcs-N` id.
    pub id: String,

    /// Executed test case.
    pub test_case_id: String,

    /// Attempt ordinal; 0 on the first try.
    pub attempt: usize,

    /// Start instant.
    pub timestamp: Timestamp,
}

/// A test step began.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestStepStarted {
    /// Enclosing attempt.
    pub test_case_started_id: String,

    /// Started test step.
    pub test_step_id: String,

    /// Start instant.
    pub timestamp: Timestamp,
}

/// Result of a finished test step or run hook.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestStepResult {
    /// Final status.
    pub status: TestStepResultStatus,

    /// Failure or skip message, when any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Elapsed time.
    pub duration: Duration,
}

/// A test step finished.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestStepFinished {
    /// Enclosing attempt.
    pub test_case_started_id: String,

    /// Finished test step.
    pub test_step_id: String,

    /// Outcome.
    pub test_step_result: TestStepResult,

    /// Finish instant.
    pub timestamp: Timestamp,
}

/// One attempt of a test case finished.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseFinished {
    /// Finished attempt.
    pub test_case_started_id: String,

    /// Whether another attempt of the same pickle follows.
    pub will_be_retried: bool,

    /// Finish instant.
    pub timestamp: Timestamp,
}

/// A run-level hook began.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRunHookStarted {
    /// Unique `trhs-N` id.
    pub id: String,

    /// Enclosing run.
    pub test_run_started_id: String,

    /// Referenced hook.
    pub hook_id: String,

    /// Start instant.
    pub timestamp: Timestamp,
}

/// A run-level hook finished.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRunHookFinished {
    /// Finished hook invocation.
    pub test_run_hook_started_id: String,

    /// Outcome.
    pub result: TestStepResult,

    /// Finish instant.
    pub timestamp: Timestamp,
}

/// The run finished.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRunFinished {
    /// Whether the run was free of failures, undefined or pending steps
    /// and parse errors.
    pub success: bool,

    /// Finish instant.
    pub timestamp: Timestamp,
}

/// An embedded attachment.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// Attachment content, per `content_encoding`.
    pub body: String,

    /// Body encoding.
    pub content_encoding: ContentEncoding,

    /// Media type of the content.
    pub media_type: String,

    /// Suggested file name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,

    /// Enclosing attempt, for case- and step-scoped attachments.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_case_started_id: Option<String>,

    /// Enclosing test step, for step-scoped attachments.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_step_id: Option<String>,

    /// Enclosing run hook, for run-hook-scoped attachments.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_run_hook_started_id: Option<String>,
}

/// A reference to externally stored attachment content.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalAttachment {
    /// Where the content lives.
    pub url: String,

    /// Media type of the content.
    pub media_type: String,

    /// Enclosing attempt, for case- and step-scoped attachments.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_case_started_id: Option<String>,

    /// Enclosing test step, for step-scoped attachments.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_step_id: Option<String>,

    /// Enclosing run hook, for run-hook-scoped attachments.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_run_hook_started_id: Option<String>,
}
