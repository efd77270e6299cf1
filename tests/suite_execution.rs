//! Suite membership, ordering, override rules, and cycle safety.

mod common;

use attest::prelude::*;
use common::{assert_events, Log};

fn logging_test(name: &str, log: &Log) -> TestBuilder {
    let log = log.clone();
    let event = name.to_string();
    TestBuilder::new(name).body(move |_| {
        log.push(event.clone());
        Ok(())
    })
}

#[test]
fn children_run_in_declared_order() {
    let log = Log::new();
    let mut runner = Runner::new();

    runner
        .define_suite(
            SuiteBuilder::new("s")
                .test(logging_test("first", &log))
                .test(logging_test("second", &log))
                .test(logging_test("third", &log)),
        )
        .unwrap();

    runner.invoke("s").unwrap();
    assert_events(&log, &["first", "second", "third"]);
}

#[test]
fn added_children_keep_insertion_order_and_do_not_duplicate() {
    let log = Log::new();
    let mut runner = Runner::new();

    runner.define_suite(SuiteBuilder::new("s")).unwrap();
    runner.define_test(logging_test("b", &log)).unwrap();
    runner.define_test(logging_test("a", &log)).unwrap();

    runner.add_child("s", "b").unwrap();
    runner.add_child("s", "a").unwrap();
    runner.add_child("s", "b").unwrap(); // no duplicate

    runner.invoke("s").unwrap();
    assert_events(&log, &["b", "a"]);
}

#[test]
fn call_site_suite_overrides_the_recorded_owner() {
    let log = Log::new();
    let mut runner = Runner::new();

    let a_setup = log.clone();
    let b_setup = log.clone();
    runner
        .define_suite(
            SuiteBuilder::new("a")
                .setup(move |_| {
                    a_setup.push("a-setup");
                    Ok(())
                })
                .test(logging_test("t", &log)),
        )
        .unwrap();
    runner
        .define_suite(SuiteBuilder::new("b").setup(move |_| {
            b_setup.push("b-setup");
            Ok(())
        }))
        .unwrap();
    runner.add_child("b", "t").unwrap();

    // Run as a member of b: b's fixtures, not the owner a's.
    runner.invoke("b").unwrap();
    assert_events(&log, &["b-setup", "t"]);

    // Standalone: falls back to the recorded owner a.
    let log2 = Log::new();
    let mut runner2 = Runner::new();
    let a_setup2 = log2.clone();
    runner2
        .define_suite(
            SuiteBuilder::new("a")
                .setup(move |_| {
                    a_setup2.push("a-setup");
                    Ok(())
                })
                .test(logging_test("t", &log2)),
        )
        .unwrap();
    runner2.invoke("t").unwrap();
    assert_events(&log2, &["a-setup", "t"]);
}

#[test]
fn invoke_in_uses_the_named_suite_for_fixtures() {
    let log = Log::new();
    let mut runner = Runner::new();

    runner
        .define_suite(SuiteBuilder::new("a").test(logging_test("t", &log)))
        .unwrap();
    let other_setup = log.clone();
    runner
        .define_suite(SuiteBuilder::new("other").setup(move |_| {
            other_setup.push("other-setup");
            Ok(())
        }))
        .unwrap();

    runner.invoke_in("t", "other").unwrap();
    assert_events(&log, &["other-setup", "t"]);
}

#[test]
fn suite_fixtures_are_not_transitive_to_nested_suites() {
    let log = Log::new();
    let mut runner = Runner::new();

    let outer_setup = log.clone();
    let inner_setup = log.clone();
    runner
        .define_suite(
            SuiteBuilder::new("outer")
                .setup(move |_| {
                    outer_setup.push("outer-setup");
                    Ok(())
                })
                .test(logging_test("direct", &log))
                .suite(
                    SuiteBuilder::new("inner")
                        .setup(move |_| {
                            inner_setup.push("inner-setup");
                            Ok(())
                        })
                        .test(logging_test("nested", &log)),
                ),
        )
        .unwrap();

    runner.invoke("outer").unwrap();
    assert_events(
        &log,
        &["outer-setup", "direct", "inner-setup", "nested"],
    );
}

#[test]
fn self_referencing_suite_terminates_and_runs_each_node_once() {
    let log = Log::new();
    let mut runner = Runner::new();

    runner
        .define_suite(SuiteBuilder::new("s").test(logging_test("t", &log)))
        .unwrap();
    runner.add_child("s", "s").unwrap();

    let report = runner.invoke("s").unwrap();
    assert!(report.passed());
    assert_events(&log, &["t"]);
}

#[test]
fn mutually_recursive_suites_terminate() {
    let log = Log::new();
    let mut runner = Runner::new();

    runner
        .define_suite(SuiteBuilder::new("a").test(logging_test("ta", &log)))
        .unwrap();
    runner
        .define_suite(SuiteBuilder::new("b").test(logging_test("tb", &log)))
        .unwrap();
    runner.add_child("a", "b").unwrap();
    runner.add_child("b", "a").unwrap();

    let report = runner.invoke("a").unwrap();
    assert!(report.passed());
    assert_events(&log, &["ta", "tb"]);
}

#[test]
fn failing_child_fails_the_suite_but_not_its_siblings() {
    let log = Log::new();
    let mut runner = Runner::new();

    runner
        .define_suite(
            SuiteBuilder::new("s")
                .test(logging_test("ok-1", &log))
                .test(
                    TestBuilder::new("bad")
                        .body(|_| Err(AssertionFailure::new("nope").raise())),
                )
                .test(logging_test("ok-2", &log)),
        )
        .unwrap();

    let report = runner.invoke("s").unwrap();
    assert!(!report.passed());
    assert_events(&log, &["ok-1", "ok-2"]);

    let suite = report.as_suite().unwrap();
    let counts = suite.counts();
    assert_eq!((counts.passed, counts.failed), (2, 1));
    assert_eq!(counts.total(), 3);
}

#[test]
fn latest_definition_wins() {
    let log = Log::new();
    let mut runner = Runner::new();

    // Define, then silently redefine; the suite picks up the replacement.
    runner.define_test(logging_test("t", &log)).unwrap();
    runner
        .define_suite(SuiteBuilder::new("s2").child("t"))
        .unwrap();

    let replacement = log.clone();
    runner
        .define_test(TestBuilder::new("t").body(move |_| {
            replacement.push("t-v2");
            Ok(())
        }))
        .unwrap();

    runner.invoke("s2").unwrap();
    assert_events(&log, &["t-v2"]);
}

#[test]
fn run_on_define_runs_immediately() {
    let log = Log::new();
    let mut runner = Runner::new();

    let body_log = log.clone();
    let report = runner
        .define_test(
            TestBuilder::new("eager")
                .run_on_define(true)
                .body(move |_| {
                    body_log.push("ran");
                    Ok(())
                }),
        )
        .unwrap();

    assert!(report.expect("run-on-define must produce a report").passed());
    assert_events(&log, &["ran"]);

    let suite_log = log.clone();
    let ran = runner
        .define_suite(
            SuiteBuilder::new("eager-suite")
                .run_on_define(true)
                .test(TestBuilder::new("member").body(move |_| {
                    suite_log.push("member");
                    Ok(())
                })),
        )
        .unwrap();
    assert_eq!(ran.len(), 1);
    assert!(ran[0].passed());
    assert_events(&log, &["ran", "member"]);
}

#[test]
fn wrap_applies_once_per_suite_run_not_once_per_test() {
    let log = Log::new();
    let mut runner = Runner::new();

    let wrap_log = log.clone();
    runner
        .define_suite(
            SuiteBuilder::new("s")
                .wrap(move |ctx, cont| {
                    wrap_log.push("wrap-in");
                    cont.invoke(ctx);
                    wrap_log.push("wrap-out");
                    Ok(())
                })
                .test(logging_test("one", &log))
                .test(logging_test("two", &log)),
        )
        .unwrap();

    runner.invoke("s").unwrap();
    assert_events(&log, &["wrap-in", "one", "two", "wrap-out"]);
}

#[test]
fn wrap_that_never_invokes_its_continuation_marks_the_suite_not_run() {
    let log = Log::new();
    let mut runner = Runner::new();

    runner
        .define_suite(
            SuiteBuilder::new("s")
                .wrap(|_ctx, _cont| Ok(()))
                .test(logging_test("t", &log)),
        )
        .unwrap();

    let report = runner.invoke("s").unwrap();
    assert!(log.events().is_empty());

    let suite = report.as_suite().unwrap();
    assert!(!suite.passed());
    assert!(suite.children.is_empty());
    assert!(suite
        .error
        .as_deref()
        .unwrap_or_default()
        .contains("never invoked"));
}

#[test]
fn undefined_named_child_is_recorded_without_stopping_the_run() {
    let log = Log::new();
    let mut runner = Runner::new();

    // Forward reference that never gets defined.
    runner
        .define_suite(
            SuiteBuilder::new("s")
                .child("missing")
                .test(logging_test("t", &log)),
        )
        .unwrap();

    let report = runner.invoke("s").unwrap();
    assert!(!report.passed());
    assert_events(&log, &["t"]);

    let suite = report.as_suite().unwrap();
    assert!(matches!(
        suite.children[0].as_test().unwrap().outcome,
        Outcome::Error { .. }
    ));

    // `add_child` still refuses unknown names outright.
    assert!(matches!(
        runner.add_child("s", "also-missing").unwrap_err(),
        AttestError::NotFound { .. }
    ));
}

#[test]
fn invoking_an_unknown_name_is_not_found() {
    let mut runner = Runner::new();
    assert!(matches!(
        runner.invoke("nothing").unwrap_err(),
        AttestError::NotFound { .. }
    ));
}
