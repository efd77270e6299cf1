//! Outcome records: annotation passthrough, failure payloads, JSON shape.

use attest::prelude::*;

fn sample_suite_report() -> SuiteReport {
    let mut runner = Runner::new();
    runner
        .define_suite(
            SuiteBuilder::new("arith")
                .annotation("basic arithmetic checks")
                .test(
                    TestBuilder::new("adds")
                        .annotation("integers add")
                        .body(|_| Ok(())),
                )
                .test(TestBuilder::new("overflows").body(|_| {
                    Err(AssertionFailure::new("wrapped around")
                        .with_part("(+ max 1)", Value::Number(-128.0))
                        .with_part("max", Value::Number(127.0))
                        .raise())
                })),
        )
        .unwrap();

    match runner.invoke("arith").unwrap() {
        Report::Suite(suite) => suite,
        Report::Test(_) => panic!("expected a suite report"),
    }
}

#[test]
fn annotations_pass_through_opaquely() {
    let suite = sample_suite_report();
    assert_eq!(suite.annotation.as_deref(), Some("basic arithmetic checks"));
    assert_eq!(
        suite.children[0].as_test().unwrap().annotation.as_deref(),
        Some("integers add")
    );
    // No annotation stays absent rather than defaulting.
    assert_eq!(suite.children[1].as_test().unwrap().annotation, None);
}

#[test]
fn failure_payload_keeps_description_and_evaluated_parts() {
    let suite = sample_suite_report();
    let Outcome::Fail(failure) = &suite.children[1].as_test().unwrap().outcome else {
        panic!("expected a failing child");
    };
    assert_eq!(failure.description, "wrapped around");
    assert_eq!(failure.parts.len(), 2);
    assert_eq!(failure.parts[0].expr, "(+ max 1)");
    assert_eq!(failure.parts[1].value, Value::Number(127.0));

    // Display folds the parts under the description for renderers that
    // want plain text.
    let rendered = failure.to_string();
    assert!(rendered.contains("wrapped around"));
    assert!(rendered.contains("(+ max 1)"));
}

#[test]
fn counts_tally_leaf_tests_across_the_subtree() {
    let suite = sample_suite_report();
    let counts = suite.counts();
    assert_eq!(counts.passed, 1);
    assert_eq!(counts.failed, 1);
    assert_eq!(counts.errored, 0);
    assert_eq!(counts.not_run, 0);
    assert_eq!(counts.total(), 2);
    assert!(!suite.passed());
}

#[test]
fn reports_serialize_to_json_for_external_reporters() {
    let suite = sample_suite_report();
    let json = serde_json::to_value(&suite).expect("report must serialize");

    assert_eq!(json["name"], "arith");
    assert_eq!(json["children"][0]["Test"]["name"], "adds");
    assert_eq!(json["children"][0]["Test"]["outcome"], "Pass");
    assert_eq!(
        json["children"][1]["Test"]["outcome"]["Fail"]["description"],
        "wrapped around"
    );
}

#[test]
fn suite_level_failure_is_reported_separately_from_children() {
    let mut runner = Runner::new();
    runner
        .define_suite(
            SuiteBuilder::new("s")
                .wrap(|_ctx, _cont| {
                    Err(AttestError::Unexpected {
                        message: "wrap exploded".into(),
                    })
                })
                .test(TestBuilder::new("t").body(|_| Ok(()))),
        )
        .unwrap();

    let report = runner.invoke("s").unwrap();
    let suite = report.as_suite().unwrap();
    assert!(suite.error.as_deref().unwrap_or_default().contains("wrap exploded"));
    assert!(!suite.passed());
}
