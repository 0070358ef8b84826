//! Per-pickle execution: hook orchestration, retries, attachments.

use std::{
    cell::Cell,
    panic::{self, AssertUnwindSafe},
    time::Instant,
};

use crate::{
    ctx::{
        AttachmentRequest, CaseHookCtx, Ctx, ScenarioInfo, StepHookCtx,
        StepInfo,
    },
    event::{
        emitter::{Emitter, IdGenerator},
        messages, Envelope, Timestamp,
    },
    hook::{HookError, HookHandler, HookResult, HookType},
    macros::{PENDING_SENTINEL, SKIP_SENTINEL},
    pickle::{Pickle, PickleArgument},
    result::{
        scenario_status, ScenarioResult, ScenarioStatus, StepResult,
        StepStatus,
    },
    setup::{Glue, Setup},
    step::StepMatch,
    expression::{StepArg, StepValue},
    tag,
    world::World,
};

/// Outcome of one trapped handler invocation.
#[derive(Clone, Debug)]
pub(crate) enum HandlerOutcome {
    Passed,
    Failed(String),
    Skipped(Option<String>),
    Pending(Option<String>),
}

/// Invokes a handler, converting panics and sentinel panics into
/// outcomes. The default panic hook is silenced for the duration so
/// failing handlers do not spray backtraces over the output.
pub(crate) fn trap(
    f: impl FnOnce() -> anyhow::Result<()>,
) -> HandlerOutcome {
    let previous = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let caught = panic::catch_unwind(AssertUnwindSafe(f));
    panic::set_hook(previous);

    match caught {
        Ok(Ok(())) => HandlerOutcome::Passed,
        Ok(Err(e)) => HandlerOutcome::Failed(format!("{e:#}")),
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_owned())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "handler panicked".to_owned());
            if let Some(rest) = message.strip_prefix(SKIP_SENTINEL) {
                HandlerOutcome::Skipped(sentinel_reason(rest))
            } else if let Some(rest) = message.strip_prefix(PENDING_SENTINEL)
            {
                HandlerOutcome::Pending(sentinel_reason(rest))
            } else {
                HandlerOutcome::Failed(message)
            }
        }
    }
}

fn sentinel_reason(rest: &str) -> Option<String> {
    rest.strip_prefix(": ").map(str::to_owned)
}

/// Execution plan of one pickle, mirrored into its `TestCase` envelope.
#[derive(Clone, Debug)]
pub(crate) struct TestCasePlan {
    pub(crate) id: String,
    pub(crate) pickle_id: String,
    pub(crate) entries: Vec<PlanEntry>,
}

#[derive(Clone, Debug)]
pub(crate) struct PlanEntry {
    pub(crate) test_step_id: String,
    pub(crate) kind: PlanEntryKind,
}

#[derive(Clone, Debug)]
pub(crate) enum PlanEntryKind {
    /// A before- or after-case hook, by ordinal among its type.
    CaseHook { hook_id: String, ordinal: usize, before: bool },

    /// A regular pickle step.
    Step {
        step_index: usize,
        pickle_step_id: String,
        step_definition_ids: Vec<String>,
    },
}

/// Builds the execution plan of one pickle against the glue registries.
pub(crate) fn plan_test_case<W>(
    pickle: &Pickle,
    glue: &Glue<W>,
    ids: &IdGenerator,
) -> TestCasePlan {
    let mut entries = Vec::new();

    for (ordinal, hook) in
        glue.hooks.by_type(HookType::BeforeTestCase).enumerate()
    {
        entries.push(PlanEntry {
            test_step_id: ids.next("ts"),
            kind: PlanEntryKind::CaseHook {
                hook_id: hook.id.clone(),
                ordinal,
                before: true,
            },
        });
    }

    for (step_index, step) in pickle.steps.iter().enumerate() {
        let step_definition_ids =
            match glue.steps.find_match(&step.text, step.ty) {
                StepMatch::Matched { def, .. } => vec![def.id.clone()],
                StepMatch::Undefined { .. } => vec![],
            };
        entries.push(PlanEntry {
            test_step_id: ids.next("ts"),
            kind: PlanEntryKind::Step {
                step_index,
                pickle_step_id: step.id.clone(),
                step_definition_ids,
            },
        });
    }

    for (ordinal, hook) in
        glue.hooks.by_type(HookType::AfterTestCase).enumerate()
    {
        entries.push(PlanEntry {
            test_step_id: ids.next("ts"),
            kind: PlanEntryKind::CaseHook {
                hook_id: hook.id.clone(),
                ordinal,
                before: false,
            },
        });
    }

    TestCasePlan {
        id: ids.next("tc"),
        pickle_id: pickle.id.clone(),
        entries,
    }
}

impl TestCasePlan {
    pub(crate) fn to_message(&self) -> messages::TestCase {
        messages::TestCase {
            id: self.id.clone(),
            pickle_id: self.pickle_id.clone(),
            test_steps: self
                .entries
                .iter()
                .map(|entry| match &entry.kind {
                    PlanEntryKind::CaseHook { hook_id, .. } => {
                        messages::TestStep {
                            id: entry.test_step_id.clone(),
                            hook_id: Some(hook_id.clone()),
                            pickle_step_id: None,
                            step_definition_ids: None,
                        }
                    }
                    PlanEntryKind::Step {
                        pickle_step_id,
                        step_definition_ids,
                        ..
                    } => messages::TestStep {
                        id: entry.test_step_id.clone(),
                        hook_id: None,
                        pickle_step_id: Some(pickle_step_id.clone()),
                        step_definition_ids: Some(
                            step_definition_ids.clone(),
                        ),
                    },
                })
                .collect(),
        }
    }
}

/// Attachment scope, resolved into envelope reference fields.
pub(crate) enum AttachScope<'a> {
    /// Scoped to a test step (regular step, step hook or case hook).
    Step {
        test_case_started_id: &'a str,
        test_step_id: &'a str,
    },

    /// Scoped to a run-level hook invocation.
    RunHook { test_run_hook_started_id: &'a str },
}

/// Turns one buffered attachment into its envelope.
pub(crate) fn attachment_envelope(
    request: AttachmentRequest,
    scope: &AttachScope<'_>,
) -> Envelope {
    let (tcs, ts, trhs) = match scope {
        AttachScope::Step { test_case_started_id, test_step_id } => (
            Some((*test_case_started_id).to_owned()),
            Some((*test_step_id).to_owned()),
            None,
        ),
        AttachScope::RunHook { test_run_hook_started_id } => {
            (None, None, Some((*test_run_hook_started_id).to_owned()))
        }
    };

    match request {
        AttachmentRequest::Embedded {
            body,
            media_type,
            file_name,
            encoding,
        } => Envelope::Attachment(messages::Attachment {
            body,
            content_encoding: encoding,
            media_type,
            file_name,
            test_case_started_id: tcs,
            test_step_id: ts,
            test_run_hook_started_id: trhs,
        }),
        AttachmentRequest::External { url, media_type } => {
            Envelope::ExternalAttachment(messages::ExternalAttachment {
                url,
                media_type,
                test_case_started_id: tcs,
                test_step_id: ts,
                test_run_hook_started_id: trhs,
            })
        }
    }
}

/// Shared, read-only environment of pickle execution.
pub(crate) struct ExecEnv<'a> {
    pub(crate) emitter: &'a Emitter,
    pub(crate) ids: &'a IdGenerator,
    pub(crate) retries: usize,
    pub(crate) dry_run: bool,
    pub(crate) skip_tags: &'a [String],
    pub(crate) fail_fast: bool,
    pub(crate) run_failed: &'a Cell<bool>,
}

/// Runs one pickle to completion, retries included, and returns the
/// final attempt's result.
pub(crate) fn run_pickle<W: World>(
    pickle: &Pickle,
    plan: &TestCasePlan,
    world_factory: &dyn Fn() -> W,
    env: &ExecEnv<'_>,
) -> ScenarioResult {
    // Skip tags win over dry-run and retries: no world, no hooks.
    if let Some(reason) = tag::skip_reason(&pickle.tags, env.skip_tags) {
        return emit_skipped_group(pickle, plan, env, reason);
    }
    if env.fail_fast && env.run_failed.get() {
        return emit_skipped_group(
            pickle,
            plan,
            env,
            Some("fail-fast".to_owned()),
        );
    }

    let max_retries = if env.dry_run {
        0
    } else {
        tag::retry_from_tags(&pickle.tags).unwrap_or(env.retries)
    };

    let mut attempt = 0;
    loop {
        let outcome = run_attempt(
            pickle,
            plan,
            world_factory,
            env,
            attempt,
            max_retries,
        );
        if outcome.will_retry {
            log::debug!(
                "retrying `{}` (attempt {} of {})",
                pickle.name,
                attempt + 1,
                max_retries,
            );
            attempt += 1;
            continue;
        }

        if matches!(
            outcome.result.status,
            ScenarioStatus::Failed(_) | ScenarioStatus::Undefined,
        ) {
            env.run_failed.set(true);
        }
        return outcome.result;
    }
}

struct AttemptOutcome {
    result: ScenarioResult,
    will_retry: bool,
}

#[allow(clippy::too_many_lines)]
fn run_attempt<W: World>(
    pickle: &Pickle,
    plan: &TestCasePlan,
    world_factory: &dyn Fn() -> W,
    env: &ExecEnv<'_>,
    attempt: usize,
    max_retries: usize,
) -> AttemptOutcome {
    // Fresh world and fresh registries per attempt.
    let mut world = world_factory();
    let mut setup = Setup::new();
    W::configure(&mut setup);
    let glue = match setup.build(env.ids) {
        Ok(glue) => glue,
        Err(e) => {
            // The up-front build succeeded with the same configuration,
            // so this only happens if `configure` is non-deterministic.
            return failed_without_execution(
                pickle,
                plan,
                env,
                attempt,
                format!("glue configuration failed: {e}"),
            );
        }
    };

    let scenario_info = ScenarioInfo {
        uri: pickle.uri.clone(),
        name: pickle.name.clone(),
        tags: pickle.tags.clone(),
    };

    let tcs_id = env.ids.next("tcs");
    let mut group = vec![Envelope::TestCaseStarted(
        messages::TestCaseStarted {
            id: tcs_id.clone(),
            test_case_id: plan.id.clone(),
            attempt,
            timestamp: Timestamp::now(),
        },
    )];

    let mut hook_errors: Vec<HookError> = Vec::new();
    let mut before_hook_failure: Option<String> = None;
    let mut scenario_failed = false;
    let mut step_statuses: Vec<StepStatus> = Vec::new();
    let mut step_results: Vec<StepResult> = Vec::new();

    for entry in &plan.entries {
        match &entry.kind {
            PlanEntryKind::CaseHook { ordinal, before: true, .. } => {
                let outcome = run_case_hook(
                    &glue,
                    &mut world,
                    &scenario_info,
                    env,
                    &tcs_id,
                    entry,
                    HookType::BeforeTestCase,
                    *ordinal,
                    &HookResult::Passed,
                    &mut group,
                );
                if let HandlerOutcome::Failed(msg) = outcome {
                    hook_errors.push(HookError {
                        feature: Some(pickle.uri.clone()),
                        scenario: Some(pickle.name.clone()),
                        step: None,
                        message: msg.clone(),
                    });
                    if before_hook_failure.is_none() {
                        before_hook_failure = Some(msg);
                    }
                }
            }
            PlanEntryKind::Step { step_index, .. } => {
                let step = &pickle.steps[*step_index];
                group.push(Envelope::TestStepStarted(
                    messages::TestStepStarted {
                        test_case_started_id: tcs_id.clone(),
                        test_step_id: entry.test_step_id.clone(),
                        timestamp: Timestamp::now(),
                    },
                ));
                let started = Instant::now();
                let mut attachments = Vec::new();

                let outcome = if before_hook_failure.is_some()
                    || scenario_failed
                {
                    StepOutcome {
                        status: StepStatus::Skipped(None),
                        message: None,
                    }
                } else if env.dry_run {
                    dry_run_step(&glue, step)
                } else {
                    execute_step(
                        &glue,
                        &mut world,
                        &scenario_info,
                        step,
                        &mut attachments,
                        &mut hook_errors,
                    )
                };

                let scope = AttachScope::Step {
                    test_case_started_id: &tcs_id,
                    test_step_id: &entry.test_step_id,
                };
                for request in attachments {
                    group.push(attachment_envelope(request, &scope));
                }

                group.push(Envelope::TestStepFinished(
                    messages::TestStepFinished {
                        test_case_started_id: tcs_id.clone(),
                        test_step_id: entry.test_step_id.clone(),
                        test_step_result: messages::TestStepResult {
                            status: outcome.status.wire(),
                            message: outcome.message,
                            duration: started.elapsed().into(),
                        },
                        timestamp: Timestamp::now(),
                    },
                ));

                if matches!(
                    outcome.status,
                    StepStatus::Failed(_) | StepStatus::Undefined,
                ) {
                    scenario_failed = true;
                }
                step_statuses.push(outcome.status.clone());
                step_results.push(StepResult {
                    text: step.text.clone(),
                    status: outcome.status,
                });
            }
            PlanEntryKind::CaseHook { ordinal, before: false, .. } => {
                let case_result = if scenario_failed
                    || before_hook_failure.is_some()
                {
                    let mut errors = Vec::new();
                    if let Some(msg) = &before_hook_failure {
                        errors.push(HookError {
                            feature: Some(pickle.uri.clone()),
                            scenario: Some(pickle.name.clone()),
                            step: None,
                            message: msg.clone(),
                        });
                    }
                    errors.extend(step_failure_errors(
                        pickle,
                        &step_results,
                    ));
                    HookResult::Failed(errors)
                } else {
                    HookResult::Passed
                };
                let outcome = run_case_hook(
                    &glue,
                    &mut world,
                    &scenario_info,
                    env,
                    &tcs_id,
                    entry,
                    HookType::AfterTestCase,
                    *ordinal,
                    &case_result,
                    &mut group,
                );
                // Recorded, but never overwrites the scenario's status.
                if let HandlerOutcome::Failed(msg) = outcome {
                    hook_errors.push(HookError {
                        feature: Some(pickle.uri.clone()),
                        scenario: Some(pickle.name.clone()),
                        step: None,
                        message: msg,
                    });
                }
            }
        }
    }

    if !hook_errors.is_empty() {
        log::debug!(
            "captured {} hook failure(s) in `{}`",
            hook_errors.len(),
            pickle.name,
        );
    }

    let failed = scenario_failed || before_hook_failure.is_some();
    let will_retry = failed && attempt < max_retries;

    group.push(Envelope::TestCaseFinished(messages::TestCaseFinished {
        test_case_started_id: tcs_id,
        will_be_retried: will_retry,
        timestamp: Timestamp::now(),
    }));
    env.emitter.emit_group(group);

    let status = match before_hook_failure {
        Some(msg) => ScenarioStatus::Failed(msg),
        None => scenario_status(&step_statuses),
    };

    AttemptOutcome {
        result: ScenarioResult {
            name: pickle.name.clone(),
            uri: pickle.uri.clone(),
            status,
            steps: step_results,
            attempts: attempt + 1,
        },
        will_retry,
    }
}

struct StepOutcome {
    status: StepStatus,
    message: Option<String>,
}

/// Matches without executing; used in dry-run mode.
fn dry_run_step<W>(
    glue: &Glue<W>,
    step: &crate::pickle::PickleStep,
) -> StepOutcome {
    match glue.steps.find_match(&step.text, step.ty) {
        StepMatch::Matched { .. } => StepOutcome {
            status: StepStatus::Skipped(Some("dry run".to_owned())),
            message: Some("dry run".to_owned()),
        },
        StepMatch::Undefined { snippet, suggestions, .. } => StepOutcome {
            status: StepStatus::Undefined,
            message: Some(undefined_diagnostic(
                &step.text,
                &snippet,
                &suggestions,
            )),
        },
    }
}

/// Runs one regular step: before-step hooks, match, handler, after-step
/// hooks. Attachments from every context land in `attachments` in
/// invocation order.
fn execute_step<W>(
    glue: &Glue<W>,
    world: &mut W,
    scenario: &ScenarioInfo,
    step: &crate::pickle::PickleStep,
    attachments: &mut Vec<AttachmentRequest>,
    hook_errors: &mut Vec<HookError>,
) -> StepOutcome {
    let step_info =
        StepInfo { text: step.text.clone(), ty: step.ty };

    let mut before_failure: Option<String> = None;
    for hook in glue.hooks.by_type(HookType::BeforeTestStep) {
        let mut ctx = StepHookCtx::new(scenario.clone(), step_info.clone());
        let outcome = trap(|| match &hook.handler {
            HookHandler::BeforeStep(f) => f(world, &mut ctx),
            _ => Ok(()),
        });
        attachments.extend(ctx.drain());
        if let HandlerOutcome::Failed(msg) = outcome {
            hook_errors.push(HookError {
                feature: Some(scenario.uri.clone()),
                scenario: Some(scenario.name.clone()),
                step: Some(step.text.clone()),
                message: msg.clone(),
            });
            before_failure = Some(msg);
            break;
        }
    }

    let outcome = if let Some(msg) = before_failure {
        StepOutcome {
            status: StepStatus::Failed(msg.clone()),
            message: Some(msg),
        }
    } else {
        match glue.steps.find_match(&step.text, step.ty) {
            StepMatch::Undefined { snippet, suggestions, .. } => {
                StepOutcome {
                    status: StepStatus::Undefined,
                    message: Some(undefined_diagnostic(
                        &step.text,
                        &snippet,
                        &suggestions,
                    )),
                }
            }
            StepMatch::Matched { def, mut args } => {
                push_block_argument(step, &mut args);
                let mut ctx = Ctx::new(
                    scenario.clone(),
                    step_info.clone(),
                    args,
                );
                let handler_outcome =
                    trap(|| (def.handler)(world, &mut ctx));
                attachments.extend(ctx.drain());
                match handler_outcome {
                    HandlerOutcome::Passed => StepOutcome {
                        status: StepStatus::Passed,
                        message: None,
                    },
                    HandlerOutcome::Failed(msg) => StepOutcome {
                        status: StepStatus::Failed(msg.clone()),
                        message: Some(msg),
                    },
                    HandlerOutcome::Skipped(reason) => StepOutcome {
                        status: StepStatus::Skipped(reason.clone()),
                        message: reason,
                    },
                    HandlerOutcome::Pending(reason) => StepOutcome {
                        status: StepStatus::Pending,
                        message: reason,
                    },
                }
            }
        }
    };

    let step_result = match &outcome.status {
        StepStatus::Failed(msg) => HookResult::Failed(vec![HookError {
            feature: Some(scenario.uri.clone()),
            scenario: Some(scenario.name.clone()),
            step: Some(step.text.clone()),
            message: msg.clone(),
        }]),
        StepStatus::Undefined => HookResult::Failed(vec![HookError {
            feature: Some(scenario.uri.clone()),
            scenario: Some(scenario.name.clone()),
            step: Some(step.text.clone()),
            message: "undefined step".to_owned(),
        }]),
        _ => HookResult::Passed,
    };

    // After-step hooks run whatever the handler did.
    for hook in glue.hooks.by_type(HookType::AfterTestStep) {
        let mut ctx = StepHookCtx::new(scenario.clone(), step_info.clone());
        let hook_outcome = trap(|| match &hook.handler {
            HookHandler::AfterStep(f) => f(world, &mut ctx, &step_result),
            _ => Ok(()),
        });
        attachments.extend(ctx.drain());
        if let HandlerOutcome::Failed(msg) = hook_outcome {
            hook_errors.push(HookError {
                feature: Some(scenario.uri.clone()),
                scenario: Some(scenario.name.clone()),
                step: Some(step.text.clone()),
                message: msg,
            });
        }
    }

    outcome
}

/// Appends the step's DocString or DataTable as a synthetic trailing
/// argument.
fn push_block_argument(
    step: &crate::pickle::PickleStep,
    args: &mut Vec<StepArg>,
) {
    match &step.argument {
        Some(PickleArgument::DocString { content }) => {
            args.push(StepArg {
                value: StepValue::DocString(content.clone()),
                raw: content.clone(),
            });
        }
        Some(PickleArgument::DataTable(table)) => {
            args.push(StepArg {
                value: StepValue::DataTable(table.clone()),
                raw: String::new(),
            });
        }
        None => {}
    }
}

#[allow(clippy::too_many_arguments)]
fn run_case_hook<W>(
    glue: &Glue<W>,
    world: &mut W,
    scenario: &ScenarioInfo,
    env: &ExecEnv<'_>,
    tcs_id: &str,
    entry: &PlanEntry,
    ty: HookType,
    ordinal: usize,
    case_result: &HookResult,
    group: &mut Vec<Envelope>,
) -> HandlerOutcome {
    group.push(Envelope::TestStepStarted(messages::TestStepStarted {
        test_case_started_id: tcs_id.to_owned(),
        test_step_id: entry.test_step_id.clone(),
        timestamp: Timestamp::now(),
    }));
    let started = Instant::now();

    let outcome = if env.dry_run {
        HandlerOutcome::Skipped(Some("dry run".to_owned()))
    } else if let Some(hook) = glue.hooks.by_type(ty).nth(ordinal) {
        let mut ctx = CaseHookCtx::new(scenario.clone());
        let outcome = trap(|| match &hook.handler {
            HookHandler::BeforeCase(f) => f(world, &mut ctx),
            HookHandler::AfterCase(f) => f(world, &mut ctx, case_result),
            _ => Ok(()),
        });
        let scope = AttachScope::Step {
            test_case_started_id: tcs_id,
            test_step_id: &entry.test_step_id,
        };
        for request in ctx.drain() {
            group.push(attachment_envelope(request, &scope));
        }
        outcome
    } else {
        HandlerOutcome::Passed
    };

    let (status, message) = match &outcome {
        HandlerOutcome::Passed => (StepStatus::Passed, None),
        HandlerOutcome::Failed(msg) => {
            (StepStatus::Failed(msg.clone()), Some(msg.clone()))
        }
        HandlerOutcome::Skipped(reason) => {
            (StepStatus::Skipped(reason.clone()), reason.clone())
        }
        HandlerOutcome::Pending(reason) => {
            (StepStatus::Pending, reason.clone())
        }
    };

    group.push(Envelope::TestStepFinished(messages::TestStepFinished {
        test_case_started_id: tcs_id.to_owned(),
        test_step_id: entry.test_step_id.clone(),
        test_step_result: messages::TestStepResult {
            status: status.wire(),
            message,
            duration: started.elapsed().into(),
        },
        timestamp: Timestamp::now(),
    }));

    outcome
}

fn step_failure_errors(
    pickle: &Pickle,
    step_results: &[StepResult],
) -> Vec<HookError> {
    step_results
        .iter()
        .filter_map(|r| match &r.status {
            StepStatus::Failed(msg) => Some(HookError {
                feature: Some(pickle.uri.clone()),
                scenario: Some(pickle.name.clone()),
                step: Some(r.text.clone()),
                message: msg.clone(),
            }),
            StepStatus::Undefined => Some(HookError {
                feature: Some(pickle.uri.clone()),
                scenario: Some(pickle.name.clone()),
                step: Some(r.text.clone()),
                message: "undefined step".to_owned(),
            }),
            _ => None,
        })
        .collect()
}

fn undefined_diagnostic(
    text: &str,
    snippet: &str,
    suggestions: &[String],
) -> String {
    let mut message = format!(
        "no step definition matches `{text}`\n\nimplement it with:\n\n{snippet}",
    );
    if !suggestions.is_empty() {
        message.push_str("\n\ndid you mean:\n");
        for suggestion in suggestions {
            message.push_str("  - ");
            message.push_str(suggestion);
            message.push('\n');
        }
    }
    message
}

/// Emits a full envelope group with every step skipped, without
/// constructing a world or running hooks.
fn emit_skipped_group(
    pickle: &Pickle,
    plan: &TestCasePlan,
    env: &ExecEnv<'_>,
    reason: Option<String>,
) -> ScenarioResult {
    let tcs_id = env.ids.next("tcs");
    let mut group = vec![Envelope::TestCaseStarted(
        messages::TestCaseStarted {
            id: tcs_id.clone(),
            test_case_id: plan.id.clone(),
            attempt: 0,
            timestamp: Timestamp::now(),
        },
    )];

    let mut step_results = Vec::new();
    for entry in &plan.entries {
        group.push(Envelope::TestStepStarted(messages::TestStepStarted {
            test_case_started_id: tcs_id.clone(),
            test_step_id: entry.test_step_id.clone(),
            timestamp: Timestamp::now(),
        }));
        group.push(Envelope::TestStepFinished(
            messages::TestStepFinished {
                test_case_started_id: tcs_id.clone(),
                test_step_id: entry.test_step_id.clone(),
                test_step_result: messages::TestStepResult {
                    status: crate::event::TestStepResultStatus::Skipped,
                    message: reason.clone(),
                    duration: messages::Duration::default(),
                },
                timestamp: Timestamp::now(),
            },
        ));
        if let PlanEntryKind::Step { step_index, .. } = &entry.kind {
            step_results.push(StepResult {
                text: pickle.steps[*step_index].text.clone(),
                status: StepStatus::Skipped(reason.clone()),
            });
        }
    }

    group.push(Envelope::TestCaseFinished(messages::TestCaseFinished {
        test_case_started_id: tcs_id,
        will_be_retried: false,
        timestamp: Timestamp::now(),
    }));
    env.emitter.emit_group(group);

    ScenarioResult {
        name: pickle.name.clone(),
        uri: pickle.uri.clone(),
        status: ScenarioStatus::Skipped(reason),
        steps: step_results,
        attempts: 1,
    }
}

/// Produces a failed result without running anything; used when the
/// per-attempt glue build fails.
fn failed_without_execution(
    pickle: &Pickle,
    plan: &TestCasePlan,
    env: &ExecEnv<'_>,
    attempt: usize,
    message: String,
) -> AttemptOutcome {
    let tcs_id = env.ids.next("tcs");
    env.emitter.emit_group(vec![
        Envelope::TestCaseStarted(messages::TestCaseStarted {
            id: tcs_id.clone(),
            test_case_id: plan.id.clone(),
            attempt,
            timestamp: Timestamp::now(),
        }),
        Envelope::TestCaseFinished(messages::TestCaseFinished {
            test_case_started_id: tcs_id,
            will_be_retried: false,
            timestamp: Timestamp::now(),
        }),
    ]);

    AttemptOutcome {
        result: ScenarioResult {
            name: pickle.name.clone(),
            uri: pickle.uri.clone(),
            status: ScenarioStatus::Failed(message),
            steps: Vec::new(),
            attempts: attempt + 1,
        },
        will_retry: false,
    }
}
