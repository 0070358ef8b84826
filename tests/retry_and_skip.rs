use std::cell::Cell;

use moonspec::{
    event::TestStepResultStatus, run, Envelope, FeatureSource, MessageVec,
    RunOptions, ScenarioStatus, Setup, World,
};

thread_local! {
    static FLAKY_CALLS: Cell<usize> = Cell::new(0);
    static HANDLER_CALLS: Cell<usize> = Cell::new(0);
}

#[derive(Default)]
struct Flaky;

impl World for Flaky {
    fn configure(setup: &mut Setup<Self>) {
        setup.given0("a step that fails once", |_: &mut Self| {
            HANDLER_CALLS.with(|c| c.set(c.get() + 1));
            let call = FLAKY_CALLS.with(|c| {
                let n = c.get();
                c.set(n + 1);
                n
            });
            anyhow::ensure!(call > 0, "first call fails");
            Ok(())
        });
        setup.given0("a passing step", |_: &mut Self| {
            HANDLER_CALLS.with(|c| c.set(c.get() + 1));
            Ok(())
        });
    }
}

fn source(content: &str) -> FeatureSource {
    FeatureSource::Text {
        uri: "retry.feature".into(),
        content: content.into(),
    }
}

#[test]
fn skip_tag_with_reason_skips_without_execution() {
    HANDLER_CALLS.with(|c| c.set(0));
    let sink = MessageVec::new();
    let result = run(|| Flaky, RunOptions {
        sources: vec![source(
            "\
Feature: Skipping
  @skip(\"flaky\")
  Scenario: unstable
    Given a passing step
",
        )],
        sinks: vec![Box::new(sink.clone())],
        ..RunOptions::default()
    })
    .unwrap();

    assert_eq!(result.summary.skipped, 1);
    assert_eq!(HANDLER_CALLS.with(Cell::get), 0);
    assert_eq!(
        result.scenarios().next().unwrap().status,
        ScenarioStatus::Skipped(Some("flaky".into())),
    );

    for envelope in sink.snapshot() {
        if let Envelope::TestStepFinished(m) = envelope {
            assert_eq!(
                m.test_step_result.status,
                TestStepResultStatus::Skipped,
            );
        }
    }
}

#[test]
fn retry_tag_reruns_a_failed_scenario_until_it_passes() {
    FLAKY_CALLS.with(|c| c.set(0));
    let sink = MessageVec::new();
    let result = run(|| Flaky, RunOptions {
        sources: vec![source(
            "\
Feature: Retrying
  @retry(1)
  Scenario: flaky
    Given a step that fails once
",
        )],
        sinks: vec![Box::new(sink.clone())],
        ..RunOptions::default()
    })
    .unwrap();

    assert_eq!(result.summary.passed, 1);
    assert_eq!(result.summary.retried, 1);
    assert_eq!(result.scenarios().next().unwrap().attempts, 2);

    let envelopes = sink.snapshot();
    let attempts: Vec<_> = envelopes
        .iter()
        .filter_map(|e| match e {
            Envelope::TestCaseStarted(m) => Some(m.attempt),
            _ => None,
        })
        .collect();
    assert_eq!(attempts, [0, 1]);

    let retried_flags: Vec<_> = envelopes
        .iter()
        .filter_map(|e| match e {
            Envelope::TestCaseFinished(m) => Some(m.will_be_retried),
            _ => None,
        })
        .collect();
    assert_eq!(retried_flags, [true, false]);
}

#[test]
fn retries_are_exhausted_by_a_persistent_failure() {
    let sink = MessageVec::new();
    let result = run(|| Flaky, RunOptions {
        sources: vec![source(
            "\
Feature: Retrying
  Scenario: hopeless
    Given an unregistered step
",
        )],
        sinks: vec![Box::new(sink.clone())],
        retries: 2,
        ..RunOptions::default()
    })
    .unwrap();

    assert_eq!(result.summary.undefined, 1);
    assert_eq!(result.summary.retried, 1);

    let attempts: Vec<_> = sink
        .snapshot()
        .iter()
        .filter_map(|e| match e {
            Envelope::TestCaseStarted(m) => Some(m.attempt),
            _ => None,
        })
        .collect();
    assert_eq!(attempts, [0, 1, 2]);
}

#[test]
fn skip_tag_wins_over_retry_and_dry_run() {
    HANDLER_CALLS.with(|c| c.set(0));
    let sink = MessageVec::new();
    let result = run(|| Flaky, RunOptions {
        sources: vec![source(
            "\
Feature: Precedence
  @skip @retry(3)
  Scenario: ignored
    Given a passing step
",
        )],
        sinks: vec![Box::new(sink.clone())],
        dry_run: true,
        ..RunOptions::default()
    })
    .unwrap();

    assert_eq!(result.summary.skipped, 1);
    assert_eq!(HANDLER_CALLS.with(Cell::get), 0);

    // Skipped without a reason (not "dry run"), in a single attempt.
    assert_eq!(
        result.scenarios().next().unwrap().status,
        ScenarioStatus::Skipped(None),
    );
    assert_eq!(
        sink.snapshot()
            .iter()
            .filter(|e| matches!(e, Envelope::TestCaseStarted(_)))
            .count(),
        1,
    );
}

#[test]
fn fail_fast_skips_the_remaining_pickles() {
    let sink = MessageVec::new();
    let result = run(|| Flaky, RunOptions {
        sources: vec![source(
            "\
Feature: Fail fast
  Scenario: breaks
    Given an unregistered step

  Scenario: never runs
    Given a passing step
",
        )],
        sinks: vec![Box::new(sink.clone())],
        fail_fast: true,
        ..RunOptions::default()
    })
    .unwrap();

    assert_eq!(result.summary.undefined, 1);
    assert_eq!(result.summary.skipped, 1);
    assert_eq!(
        result.scenarios().nth(1).unwrap().status,
        ScenarioStatus::Skipped(Some("fail-fast".into())),
    );
}
