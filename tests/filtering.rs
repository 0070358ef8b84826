use moonspec::{
    run, ConfigurationError, Envelope, FeatureSource, MessageVec,
    RunOptions, Setup, World,
};

#[derive(Default)]
struct Plain;

impl World for Plain {
    fn configure(setup: &mut Setup<Self>) {
        setup.step0("anything happens", |_: &mut Self| Ok(()));
    }
}

const TAGGED: &str = "\
Feature: Filtering
  @smoke
  Scenario: fast
    Given anything happens

  @slow
  Scenario: thorough
    When anything happens
";

fn source() -> FeatureSource {
    FeatureSource::Text {
        uri: "filter.feature".into(),
        content: TAGGED.into(),
    }
}

#[test]
fn tag_expression_limits_execution_to_matching_pickles() {
    let sink = MessageVec::new();
    let result = run(|| Plain, RunOptions {
        sources: vec![source()],
        sinks: vec![Box::new(sink.clone())],
        tag_expression: "@smoke".into(),
        ..RunOptions::default()
    })
    .unwrap();

    assert_eq!(result.summary.total, 1);
    assert_eq!(result.summary.passed, 1);

    let envelopes = sink.snapshot();
    let pickle_names: Vec<_> = envelopes
        .iter()
        .filter_map(|e| match e {
            Envelope::Pickle(p) => Some(p.name.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(pickle_names, ["fast"]);

    // The filtered-out scenario produces no plan or execution envelopes.
    assert_eq!(
        envelopes
            .iter()
            .filter(|e| matches!(e, Envelope::TestCase(_)))
            .count(),
        1,
    );
    assert_eq!(
        envelopes
            .iter()
            .filter(|e| matches!(e, Envelope::TestCaseStarted(_)))
            .count(),
        1,
    );
}

#[test]
fn negated_expression_selects_the_complement() {
    let result = run(|| Plain, RunOptions {
        sources: vec![source()],
        tag_expression: "not @smoke".into(),
        ..RunOptions::default()
    })
    .unwrap();

    assert_eq!(result.summary.total, 1);
    let scenario = result.scenarios().next().unwrap();
    assert_eq!(scenario.name, "thorough");
}

#[test]
fn scenario_name_list_is_exact_match() {
    let result = run(|| Plain, RunOptions {
        sources: vec![source()],
        scenario_names: vec!["thorough".into()],
        ..RunOptions::default()
    })
    .unwrap();

    assert_eq!(result.summary.total, 1);
    assert_eq!(result.scenarios().next().unwrap().name, "thorough");
}

#[test]
fn tag_and_name_filters_combine_with_and_semantics() {
    let result = run(|| Plain, RunOptions {
        sources: vec![source()],
        tag_expression: "@smoke".into(),
        scenario_names: vec!["thorough".into()],
        ..RunOptions::default()
    })
    .unwrap();

    assert_eq!(result.summary.total, 0);
}

#[test]
fn invalid_tag_expression_is_a_configuration_error() {
    let err = run(|| Plain, RunOptions {
        sources: vec![source()],
        tag_expression: "smoke and and".into(),
        ..RunOptions::default()
    })
    .unwrap_err();

    assert!(matches!(
        err,
        ConfigurationError::InvalidTagExpression { .. },
    ));
}
