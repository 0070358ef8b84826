use moonspec::{
    event::TestStepResultStatus, run, run_or_fail, Envelope,
    FeatureSource, MessageVec, RunOptions, RunError, Setup, StepStatus,
    World,
};

#[derive(Default)]
struct Registered;

impl World for Registered {
    fn configure(setup: &mut Setup<Self>) {
        setup.given0("the server is running", |_: &mut Self| Ok(()));
        setup.then0("everything is fine", |_: &mut Self| Ok(()));
    }
}

const FEATURE: &str = "\
Feature: Gaps
  Scenario: partially wired
    Given the server is running
    When the server is restarted
    Then everything is fine
";

fn source() -> FeatureSource {
    FeatureSource::Text {
        uri: "gaps.feature".into(),
        content: FEATURE.into(),
    }
}

#[test]
fn unmatched_step_reports_undefined_with_diagnostics() {
    let sink = MessageVec::new();
    let result = run(|| Registered, RunOptions {
        sources: vec![source()],
        sinks: vec![Box::new(sink.clone())],
        ..RunOptions::default()
    })
    .unwrap();

    assert_eq!(result.summary.undefined, 1);

    let statuses: Vec<_> = sink
        .snapshot()
        .iter()
        .filter_map(|e| match e {
            Envelope::TestStepFinished(m) => Some((
                m.test_step_result.status,
                m.test_step_result.message.clone(),
            )),
            _ => None,
        })
        .collect();

    assert_eq!(statuses.len(), 3);
    assert_eq!(statuses[0].0, TestStepResultStatus::Passed);
    assert_eq!(statuses[1].0, TestStepResultStatus::Undefined);
    assert_eq!(statuses[2].0, TestStepResultStatus::Skipped);

    let diagnostic = statuses[1].1.as_deref().unwrap();
    assert!(diagnostic.contains("setup.when("), "got: {diagnostic}");
    assert!(diagnostic.contains("did you mean"), "got: {diagnostic}");
    assert!(
        diagnostic.contains("the server is running"),
        "got: {diagnostic}",
    );
}

#[test]
fn steps_after_an_undefined_one_are_skipped_in_the_result_tree() {
    let result = run(|| Registered, RunOptions {
        sources: vec![source()],
        ..RunOptions::default()
    })
    .unwrap();

    let scenario = result.scenarios().next().unwrap();
    assert_eq!(scenario.steps.len(), 3);
    assert_eq!(scenario.steps[0].status, StepStatus::Passed);
    assert_eq!(scenario.steps[1].status, StepStatus::Undefined);
    assert_eq!(scenario.steps[2].status, StepStatus::Skipped(None));
}

#[test]
fn undefined_steps_fail_run_or_fail() {
    let err = run_or_fail(|| Registered, RunOptions {
        sources: vec![source()],
        ..RunOptions::default()
    })
    .unwrap_err();

    match err {
        RunError::Failed(result) => {
            assert_eq!(result.summary.undefined, 1);
        }
        RunError::Configuration(e) => {
            panic!("unexpected configuration error: {e}")
        }
    }
}

#[test]
fn undefined_test_case_plan_has_no_step_definition_ids() {
    let sink = MessageVec::new();
    _ = run(|| Registered, RunOptions {
        sources: vec![source()],
        sinks: vec![Box::new(sink.clone())],
        ..RunOptions::default()
    })
    .unwrap();

    let envelopes = sink.snapshot();
    let test_case = envelopes
        .iter()
        .find_map(|e| match e {
            Envelope::TestCase(m) => Some(m),
            _ => None,
        })
        .unwrap();

    let definition_counts: Vec<_> = test_case
        .test_steps
        .iter()
        .map(|ts| ts.step_definition_ids.as_ref().map(Vec::len))
        .collect();
    assert_eq!(definition_counts, [Some(1), Some(0), Some(1)]);
}
