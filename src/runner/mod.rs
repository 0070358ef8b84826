//! The `run()` entry point: loads features, compiles and filters
//! pickles, builds the glue registries, executes every pickle and emits
//! the canonically ordered envelope stream.

pub(crate) mod executor;

use std::{
    cell::{Cell, RefCell},
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::Instant,
};

use futures::{executor::block_on, stream, StreamExt as _};
use smart_default::SmartDefault;

use crate::{
    ctx::RunHookCtx,
    error::{ConfigurationError, RunError},
    event::{
        emitter::{Emitter, IdGenerator},
        messages, Envelope, TestStepResultStatus, Timestamp,
    },
    feature::{Ext as _, FeatureCache, FeatureSource},
    filter::PickleFilter,
    hook::{HookHandler, HookResult, HookType},
    pickle::compiler::compile_pickles,
    result::{
        FeatureResult, RunResult, RunSummary, ScenarioResult,
        ScenarioStatus,
    },
    setup::{Glue, Setup},
    sink::Sink,
    tag::TagExpr,
    world::World,
};

use self::executor::{ExecEnv, HandlerOutcome};

const GHERKIN_MEDIA_TYPE: &str = "text/x.cucumber.gherkin+plain";

/// Options of a [`run()`].
#[derive(SmartDefault)]
pub struct RunOptions {
    /// Features to execute, in order.
    pub sources: Vec<FeatureSource>,

    /// Executes pickles concurrently when set.
    pub parallel: bool,

    /// Bound on concurrently executing pickles in parallel mode.
    #[default = 64]
    pub max_concurrent: usize,

    /// Subscribers to the envelope stream.
    pub sinks: Vec<Box<dyn Sink>>,

    /// Tag expression selecting pickles; empty selects all.
    pub tag_expression: String,

    /// Exact scenario names selecting pickles; empty selects all.
    pub scenario_names: Vec<String>,

    /// Global retry count for failed scenarios, overridden per pickle by
    /// a `@retry(N)` tag.
    pub retries: usize,

    /// Matches and reports without executing handlers or hooks.
    pub dry_run: bool,

    /// Tags short-circuiting a pickle as skipped, `@name` or
    /// `@name("reason")`.
    #[default(vec!["@skip".to_owned(), "@ignore".to_owned()])]
    pub skip_tags: Vec<String>,

    /// Stops executing further pickles after the first failed one.
    pub fail_fast: bool,
}

/// Loads, compiles, filters and executes every configured feature
/// against the given world, returning the full result tree.
///
/// All step, hook and parse failures are captured into the result and
/// the envelope stream.
///
/// # Errors
///
/// Only [`ConfigurationError`]: an invalid tag expression, an invalid or
/// unresolvable step pattern, or a zero concurrency bound.
pub fn run<W, F>(
    world_factory: F,
    options: RunOptions,
) -> Result<RunResult, ConfigurationError>
where
    W: World,
    F: Fn() -> W,
{
    let RunOptions {
        sources,
        parallel,
        max_concurrent,
        sinks,
        tag_expression,
        scenario_names,
        retries,
        dry_run,
        skip_tags,
        fail_fast,
    } = options;

    let tag_filter = TagExpr::parse(&tag_expression).map_err(|e| {
        ConfigurationError::InvalidTagExpression {
            expression: tag_expression.clone(),
            message: e.to_string(),
        }
    })?;
    if parallel && max_concurrent == 0 {
        return Err(ConfigurationError::ZeroConcurrency);
    }

    let ids = IdGenerator::default();

    // One throwaway configuration drives glue-registration envelopes,
    // test-case planning and the run-level hooks.
    let mut setup = Setup::new();
    W::configure(&mut setup);
    let glue = setup.build(&ids)?;

    let mut cache = FeatureCache::new();
    let mut parse_errors = Vec::new();
    for source in sources {
        if let Err(info) = cache.load_from_source(source) {
            log::debug!("feature failed to load: {info}");
            parse_errors.push(info);
        }
    }

    let pickles = compile_pickles(&cache, &ids);
    let filter = PickleFilter::new(tag_filter, scenario_names);
    let pickles = filter.apply(pickles);

    let emitter = Emitter::new(sinks);

    emitter.emit(Envelope::Meta(messages::Meta::current()));

    for (uri, entry) in cache.entries() {
        emitter.emit(Envelope::Source(messages::Source {
            uri: uri.to_owned(),
            data: entry.source.clone().unwrap_or_default(),
            media_type: GHERKIN_MEDIA_TYPE.to_owned(),
        }));
        emitter.emit(Envelope::GherkinDocument(messages::GherkinDocument {
            uri: uri.to_owned(),
            feature: Some(messages::GherkinFeature {
                keyword: entry.feature.keyword.clone(),
                name: entry.feature.name.clone(),
                scenario_count: entry.feature.count_scenarios(),
            }),
        }));
    }
    for error in &parse_errors {
        emitter.emit(Envelope::ParseError(messages::ParseError {
            source: messages::SourceReference {
                uri: Some(error.uri.clone()),
                location: error.line.map(|line| messages::SourceLocation {
                    line,
                    column: None,
                }),
            },
            message: error.message.clone(),
        }));
    }

    for pickle in &pickles {
        emitter.emit(Envelope::Pickle(pickle.into()));
    }

    for def in glue.steps.defs() {
        emitter.emit(Envelope::StepDefinition(messages::StepDefinition {
            id: def.id.clone(),
            pattern: messages::StepDefinitionPattern {
                source: def.pattern.clone(),
                ty: "CUCUMBER_EXPRESSION".to_owned(),
            },
            source_reference: def
                .location
                .map(Into::into)
                .unwrap_or_default(),
        }));
    }

    for param in glue.params.custom_entries() {
        emitter.emit(Envelope::ParameterType(messages::ParameterType {
            id: ids.next("pt"),
            name: param.name().to_owned(),
            regular_expressions: param.patterns().to_vec(),
            prefer_for_regular_expression_match: false,
            use_for_snippets: true,
        }));
    }

    for hook in glue.hooks.all() {
        emitter.emit(Envelope::Hook(messages::Hook {
            id: hook.id.clone(),
            ty: hook.ty.wire_name().to_owned(),
            source_reference: hook
                .location
                .map(Into::into)
                .unwrap_or_default(),
        }));
    }

    let plans: Vec<_> = pickles
        .iter()
        .map(|p| executor::plan_test_case(p, &glue, &ids))
        .collect();
    for plan in &plans {
        emitter.emit(Envelope::TestCase(plan.to_message()));
    }

    let test_run_id = ids.next("trs");
    emitter.emit(Envelope::TestRunStarted(messages::TestRunStarted {
        id: test_run_id.clone(),
        timestamp: Timestamp::now(),
    }));

    run_level_hooks(
        &glue,
        HookType::BeforeTestRun,
        &HookResult::Passed,
        &emitter,
        &ids,
        &test_run_id,
        dry_run,
    );

    let run_failed = Cell::new(false);
    let env = ExecEnv {
        emitter: &emitter,
        ids: &ids,
        retries,
        dry_run,
        skip_tags: &skip_tags,
        fail_fast,
        run_failed: &run_failed,
    };

    let results: Vec<ScenarioResult> = if parallel {
        let slots: RefCell<Vec<Option<ScenarioResult>>> =
            RefCell::new(pickles.iter().map(|_| None).collect());
        block_on(
            stream::iter(pickles.iter().zip(plans.iter()).enumerate())
                .for_each_concurrent(
                    Some(max_concurrent),
                    |(idx, (pickle, plan))| {
                        let slots = &slots;
                        let env = &env;
                        let factory = &world_factory;
                        async move {
                            // Suspension point between pickles; execution
                            // inside one pickle never yields.
                            yield_now().await;
                            let result = executor::run_pickle(
                                pickle, plan, factory, env,
                            );
                            slots.borrow_mut()[idx] = Some(result);
                        }
                    },
                ),
        );
        slots
            .into_inner()
            .into_iter()
            .map(|slot| slot.expect("every pickle task completed"))
            .collect()
    } else {
        pickles
            .iter()
            .zip(plans.iter())
            .map(|(pickle, plan)| {
                executor::run_pickle(pickle, plan, &world_factory, &env)
            })
            .collect()
    };

    let mut summary = RunSummary::default();
    for result in &results {
        summary.record(result);
    }

    let overall = if summary.failed == 0 && summary.undefined == 0 {
        HookResult::Passed
    } else {
        HookResult::Failed(
            results
                .iter()
                .filter_map(|r| match &r.status {
                    ScenarioStatus::Failed(msg) => {
                        Some(crate::hook::HookError {
                            feature: Some(r.uri.clone()),
                            scenario: Some(r.name.clone()),
                            step: None,
                            message: msg.clone(),
                        })
                    }
                    ScenarioStatus::Undefined => {
                        Some(crate::hook::HookError {
                            feature: Some(r.uri.clone()),
                            scenario: Some(r.name.clone()),
                            step: None,
                            message: "undefined step".to_owned(),
                        })
                    }
                    _ => None,
                })
                .collect(),
        )
    };
    run_level_hooks(
        &glue,
        HookType::AfterTestRun,
        &overall,
        &emitter,
        &ids,
        &test_run_id,
        dry_run,
    );

    let success = summary.failed == 0
        && summary.undefined == 0
        && summary.pending == 0
        && parse_errors.is_empty();
    emitter.emit(Envelope::TestRunFinished(messages::TestRunFinished {
        success,
        timestamp: Timestamp::now(),
    }));

    let features = cache
        .entries()
        .map(|(uri, entry)| FeatureResult {
            uri: uri.to_owned(),
            name: entry.feature.name.clone(),
            scenarios: results
                .iter()
                .filter(|r| r.uri == uri)
                .cloned()
                .collect(),
        })
        .collect();

    Ok(RunResult { features, summary, parse_errors })
}

/// Like [`run()`], but errors when the run was not fully successful:
/// failed, undefined or pending scenarios, or parse errors.
///
/// # Errors
///
/// [`RunError::Configuration`] for invalid options,
/// [`RunError::Failed`] carrying the [`RunResult`] otherwise.
pub fn run_or_fail<W, F>(
    world_factory: F,
    options: RunOptions,
) -> Result<RunResult, RunError>
where
    W: World,
    F: Fn() -> W,
{
    let result = run(world_factory, options)?;
    if result.success() {
        Ok(result)
    } else {
        Err(RunError::Failed(result))
    }
}

#[allow(clippy::too_many_arguments)]
fn run_level_hooks<W>(
    glue: &Glue<W>,
    ty: HookType,
    result: &HookResult,
    emitter: &Emitter,
    ids: &IdGenerator,
    test_run_id: &str,
    dry_run: bool,
) {
    for hook in glue.hooks.by_type(ty) {
        let started_id = ids.next("trhs");
        emitter.emit(Envelope::TestRunHookStarted(
            messages::TestRunHookStarted {
                id: started_id.clone(),
                test_run_started_id: test_run_id.to_owned(),
                hook_id: hook.id.clone(),
                timestamp: Timestamp::now(),
            },
        ));
        let started = Instant::now();

        let mut ctx = RunHookCtx::default();
        let outcome = if dry_run {
            HandlerOutcome::Skipped(Some("dry run".to_owned()))
        } else {
            executor::trap(|| match &hook.handler {
                HookHandler::BeforeRun(f) => f(&mut ctx),
                HookHandler::AfterRun(f) => f(&mut ctx, result),
                _ => Ok(()),
            })
        };

        let scope = executor::AttachScope::RunHook {
            test_run_hook_started_id: &started_id,
        };
        for request in ctx.drain() {
            emitter.emit(executor::attachment_envelope(request, &scope));
        }

        let (status, message) = match outcome {
            HandlerOutcome::Passed => (TestStepResultStatus::Passed, None),
            HandlerOutcome::Failed(msg) => {
                (TestStepResultStatus::Failed, Some(msg))
            }
            HandlerOutcome::Skipped(reason) => {
                (TestStepResultStatus::Skipped, reason)
            }
            HandlerOutcome::Pending(reason) => {
                (TestStepResultStatus::Pending, reason)
            }
        };
        emitter.emit(Envelope::TestRunHookFinished(
            messages::TestRunHookFinished {
                test_run_hook_started_id: started_id,
                result: messages::TestStepResult {
                    status,
                    message,
                    duration: started.elapsed().into(),
                },
                timestamp: Timestamp::now(),
            },
        ));
    }
}

/// One-shot cooperative yield, re-waking immediately.
struct YieldNow(bool);

impl Future for YieldNow {
    type Output = ();

    fn poll(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<()> {
        if self.0 {
            Poll::Ready(())
        } else {
            self.0 = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }
}

fn yield_now() -> YieldNow {
    YieldNow(false)
}
