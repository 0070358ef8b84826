use std::cell::Cell;

use moonspec::{
    event::TestStepResultStatus, run, Envelope, FeatureSource, MessageVec,
    RunOptions, ScenarioStatus, Setup, World,
};

thread_local! {
    static HANDLER_CALLS: Cell<usize> = Cell::new(0);
}

fn bump() {
    HANDLER_CALLS.with(|c| c.set(c.get() + 1));
}

#[derive(Default)]
struct Basket {
    cucumbers: i64,
}

impl World for Basket {
    fn configure(setup: &mut Setup<Self>) {
        setup.given1("I have {int} cucumbers", |w: &mut Self, n: i64| {
            bump();
            w.cucumbers = n;
            Ok(())
        });
        setup.when1("I eat {int} cucumbers", |w: &mut Self, n: i64| {
            bump();
            w.cucumbers -= n;
            Ok(())
        });
        setup.then1(
            "I should have {int} cucumbers",
            |w: &mut Self, n: i64| {
                bump();
                anyhow::ensure!(
                    w.cucumbers == n,
                    "expected {n} cucumbers, have {}",
                    w.cucumbers,
                );
                Ok(())
            },
        );
        setup.when0_ctx("I attach a note", |_w: &mut Self, ctx| {
            ctx.attach("my note", "text/plain", Some("note.txt"));
            Ok(())
        });
        setup.when0("I postpone this check", |_: &mut Self| {
            moonspec::skip!("not today")
        });
        setup.when0("I am not done yet", |_: &mut Self| {
            moonspec::pending!()
        });
    }
}

const MATH: &str = "\
Feature: Simple math
  Scenario: Addition
    Given I have 5 cucumbers
    When I eat 3 cucumbers
    Then I should have 2 cucumbers
";

fn source(content: &str) -> FeatureSource {
    FeatureSource::Text {
        uri: "math.feature".into(),
        content: content.into(),
    }
}

#[test]
fn passing_scenario_reports_passed_and_emits_passed_steps() {
    let sink = MessageVec::new();
    let result = run(Basket::default, RunOptions {
        sources: vec![source(MATH)],
        sinks: vec![Box::new(sink.clone())],
        ..RunOptions::default()
    })
    .unwrap();

    assert_eq!(result.summary.total, 1);
    assert_eq!(result.summary.passed, 1);
    assert_eq!(result.summary.failed, 0);

    let envelopes = sink.snapshot();
    let started: Vec<_> = envelopes
        .iter()
        .filter_map(|e| match e {
            Envelope::TestCaseStarted(m) => Some(m),
            _ => None,
        })
        .collect();
    assert_eq!(started.len(), 1);
    assert_eq!(started[0].attempt, 0);

    let finished: Vec<_> = envelopes
        .iter()
        .filter_map(|e| match e {
            Envelope::TestCaseFinished(m) => Some(m),
            _ => None,
        })
        .collect();
    assert_eq!(finished.len(), 1);
    assert!(!finished[0].will_be_retried);
    assert_eq!(finished[0].test_case_started_id, started[0].id);

    let step_statuses: Vec<_> = envelopes
        .iter()
        .filter_map(|e| match e {
            Envelope::TestStepFinished(m) => {
                Some(m.test_step_result.status)
            }
            _ => None,
        })
        .collect();
    assert_eq!(step_statuses, [
        TestStepResultStatus::Passed,
        TestStepResultStatus::Passed,
        TestStepResultStatus::Passed,
    ]);
}

#[test]
fn failing_assertion_fails_the_scenario_with_its_message() {
    let failing = "\
Feature: Simple math
  Scenario: Bad addition
    Given I have 5 cucumbers
    When I eat 3 cucumbers
    Then I should have 4 cucumbers
";
    let result = run(Basket::default, RunOptions {
        sources: vec![source(failing)],
        ..RunOptions::default()
    })
    .unwrap();

    assert_eq!(result.summary.failed, 1);
    let scenario = result.scenarios().next().unwrap();
    match &scenario.status {
        ScenarioStatus::Failed(msg) => {
            assert!(msg.contains("expected 4 cucumbers"), "got: {msg}");
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

#[test]
fn dry_run_matches_but_never_invokes_handlers() {
    HANDLER_CALLS.with(|c| c.set(0));

    let result = run(Basket::default, RunOptions {
        sources: vec![source(MATH)],
        dry_run: true,
        ..RunOptions::default()
    })
    .unwrap();

    assert_eq!(result.summary.skipped, 1);
    assert_eq!(result.summary.passed, 0);
    assert_eq!(HANDLER_CALLS.with(Cell::get), 0);

    let scenario = result.scenarios().next().unwrap();
    assert_eq!(
        scenario.status,
        ScenarioStatus::Skipped(Some("dry run".into())),
    );
}

#[test]
fn skip_macro_marks_the_step_skipped_with_its_reason() {
    let feature = "\
Feature: Simple math
  Scenario: Postponed
    Given I have 5 cucumbers
    When I postpone this check
    Then I should have 5 cucumbers
";
    let result = run(Basket::default, RunOptions {
        sources: vec![source(feature)],
        ..RunOptions::default()
    })
    .unwrap();

    assert_eq!(result.summary.skipped, 1);
    let scenario = result.scenarios().next().unwrap();
    assert_eq!(
        scenario.status,
        ScenarioStatus::Skipped(Some("not today".into())),
    );
    // A skipped step does not fail the scenario, so the final assertion
    // still ran against the untouched world.
    assert_eq!(
        scenario.steps[2].status,
        moonspec::StepStatus::Passed,
    );
}

#[test]
fn pending_macro_marks_the_step_pending() {
    let feature = "\
Feature: Simple math
  Scenario: Unfinished
    Given I have 5 cucumbers
    When I am not done yet
    Then I should have 5 cucumbers
";
    let result = run(Basket::default, RunOptions {
        sources: vec![source(feature)],
        ..RunOptions::default()
    })
    .unwrap();

    assert_eq!(result.summary.pending, 1);
    let scenario = result.scenarios().next().unwrap();
    assert_eq!(scenario.status, ScenarioStatus::Pending);
    assert_eq!(
        scenario.steps[1].status,
        moonspec::StepStatus::Pending,
    );
}

#[test]
fn attachments_are_scoped_between_their_step_envelopes() {
    let feature = "\
Feature: Notes
  Scenario: Attaching
    Given I have 5 cucumbers
    When I attach a note
";
    let sink = MessageVec::new();
    let result = run(Basket::default, RunOptions {
        sources: vec![source(feature)],
        sinks: vec![Box::new(sink.clone())],
        ..RunOptions::default()
    })
    .unwrap();
    assert_eq!(result.summary.passed, 1);

    let envelopes = sink.snapshot();
    let attachment_idx = envelopes
        .iter()
        .position(|e| matches!(e, Envelope::Attachment(_)))
        .expect("an attachment envelope");

    let Envelope::Attachment(attachment) = &envelopes[attachment_idx]
    else {
        unreachable!();
    };
    assert_eq!(attachment.body, "my note");
    assert_eq!(attachment.media_type, "text/plain");
    assert_eq!(attachment.file_name.as_deref(), Some("note.txt"));
    assert_eq!(
        serde_json::to_value(attachment.content_encoding).unwrap(),
        "IDENTITY",
    );

    // The attachment sits between its step's started and finished
    // envelopes, referencing both scopes.
    let step_id = attachment.test_step_id.clone().unwrap();
    let started_idx = envelopes
        .iter()
        .position(|e| matches!(
            e,
            Envelope::TestStepStarted(m) if m.test_step_id == step_id,
        ))
        .unwrap();
    let finished_idx = envelopes
        .iter()
        .position(|e| matches!(
            e,
            Envelope::TestStepFinished(m) if m.test_step_id == step_id,
        ))
        .unwrap();
    assert!(started_idx < attachment_idx && attachment_idx < finished_idx);
}
