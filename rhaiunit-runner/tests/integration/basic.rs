// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use color_eyre::eyre::{Result, ensure};
use pretty_assertions::assert_eq;
use rhaiunit_metadata::RhaiUnitExitCode;
use rhaiunit_runner::errors::DriverError;

#[test]
fn calctest_reports() -> Result<()> {
    let run = FixtureRun::new(&["calctest.rhai"])?;
    let outcome = run.result.as_ref().map_err(|err| color_eyre::eyre::eyre!("{err}"))?;
    assert_eq!(outcome.files_run, 1);
    assert_eq!(outcome.exit_code(), RhaiUnitExitCode::TEST_RUN_FAILED);

    let class = FixtureRun::fixture_path("calctest.rhai");

    let summary = normalize_times(&run.summary);
    ensure!(
        summary.starts_with(
            "Running rhaiunit.calctest\nTests run: 5, Failures: 1, Errors: 1, Time elapsed: T\n"
        ),
        "unexpected summary:\n{summary}"
    );
    ensure!(summary.contains(&format!(
        "Test test_add_fail({class})\n\tFAILED: expected:<-2> but was:<2>\n"
    )));
    ensure!(summary.contains(&format!(
        "Test test_add_error({class})\n\tERROR: \n\"{class}\", line 14: I didn't expect this error\n"
    )));

    let xml = run.read_report("TEST-rhaiunit.calctest.xml")?;
    ensure!(xml.starts_with(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" ?>\n\
         <testsuite name=\"rhaiunit.calctest\" tests=\"5\" errors=\"1\" failures=\"1\" time=\"T\" skipped=\"0\" timestamp=\"TS\">\n\
         \x20 <properties>\n"
    ));
    for passing in ["test_add_success", "test_sub", "test_read_file"] {
        ensure!(
            xml.contains(&format!(
                "<testcase classname=\"{class}\" name=\"{passing}\" time=\"T\"/>\n"
            )),
            "{passing} is not a self-closed testcase:\n{xml}"
        );
    }
    ensure!(xml.contains(
        "<failure type=\"rhaiunit::AssertionFailedError\" \
         message=\"expected:&lt;-2&gt; but was:&lt;2&gt;\">"
    ));
    ensure!(xml.contains(
        "<error type=\"rhai::EvalAltResult\" message=\"I didn&apos;t expect this error\">"
    ));
    ensure!(xml.ends_with("</testsuite>"));

    // Failures are filtered, so bootstrap frames never show up in them.
    let plain = run.read_report("TEST-rhaiunit.calctest.txt")?;
    let failed = plain
        .split("\tFAILED\n")
        .nth(1)
        .and_then(|rest| rest.split("\n\n").next())
        .unwrap_or_default();
    assert_eq!(
        failed.lines().next(),
        Some("rhaiunit::AssertionFailedError: expected:<-2> but was:<2>")
    );
    ensure!(
        failed.contains("\tat test_add_fail ("),
        "missing test frame:\n{failed}"
    );
    ensure!(
        !failed.contains("rhaiunit.rhai:"),
        "bootstrap frames were not filtered:\n{failed}"
    );

    Ok(())
}

#[test]
fn todir_with_two_files() -> Result<()> {
    let run = FixtureRun::new(&["calctest.rhai", "math/nested.rhai"])?;
    let outcome = run.result.as_ref().map_err(|err| color_eyre::eyre::eyre!("{err}"))?;
    assert_eq!(outcome.files_run, 2);
    assert_eq!(outcome.failed_files, vec!["calctest.rhai".to_owned()]);

    let mut files: Vec<_> = std::fs::read_dir(run.reports_dir())?
        .map(|entry| entry.map(|entry| entry.file_name().to_string_lossy().into_owned()))
        .collect::<Result<_, _>>()?;
    files.sort();
    assert_eq!(
        files,
        vec![
            "TEST-rhaiunit.calctest.txt",
            "TEST-rhaiunit.calctest.xml",
            "TEST-rhaiunit.math.nested.txt",
            "TEST-rhaiunit.math.nested.xml",
        ]
    );

    // Each file gets its own results.
    let nested = run.read_report("TEST-rhaiunit.math.nested.txt")?;
    ensure!(
        nested.starts_with(
            "Testsuite: rhaiunit.math.nested\nTests run: 1, Failures: 0, Errors: 0, Time elapsed: T\n\n"
        ),
        "unexpected report:\n{nested}"
    );
    Ok(())
}

#[test]
fn missing_file_is_a_warning() -> Result<()> {
    let run = FixtureRun::new(&["missing.rhai"])?;
    let outcome = run.result.as_ref().map_err(|err| color_eyre::eyre::eyre!("{err}"))?;
    assert_eq!(outcome.exit_code(), RhaiUnitExitCode::TEST_RUN_FAILED);

    let class = FixtureRun::fixture_path("missing.rhai");
    let xml = run.read_report("TEST-rhaiunit.missing.xml")?;
    ensure!(xml.contains(r#"tests="1" errors="0" failures="1""#));
    ensure!(xml.contains(&format!(
        "<testcase classname=\"{class}\" name=\"warning\" time=\"T\">\n    \
         <failure type=\"rhaiunit::AssertionFailedError\" \
         message=\"Error loading rhai file: {class}\n\
         rhaiunit::ResourceNotFound: could not find file: {class}\n"
    )));
    Ok(())
}

#[test]
fn syntax_error_is_a_warning() -> Result<()> {
    let run = FixtureRun::new(&["broken.rhai"])?;
    let outcome = run.result.as_ref().map_err(|err| color_eyre::eyre::eyre!("{err}"))?;
    assert_eq!(outcome.failed_files, vec!["broken.rhai".to_owned()]);

    let class = FixtureRun::fixture_path("broken.rhai");
    let plain = run.read_report("TEST-rhaiunit.broken.txt")?;
    ensure!(
        plain.contains(&format!(
            "Testcase: warning({class}) took T sec\n\tFAILED\n\
             rhaiunit::AssertionFailedError: \n\"{class}\", line 5: "
        )),
        "unexpected report:\n{plain}"
    );
    ensure!(plain.contains("\nlet x = (1 + ;\n"));
    Ok(())
}

#[test]
fn no_tests_is_a_warning() -> Result<()> {
    let run = FixtureRun::new(&["empty.rhai"])?;
    let outcome = run.result.as_ref().map_err(|err| color_eyre::eyre::eyre!("{err}"))?;
    assert_eq!(outcome.exit_code(), RhaiUnitExitCode::TEST_RUN_FAILED);

    let class = FixtureRun::fixture_path("empty.rhai");
    ensure!(run.summary.contains(&format!(
        "Test warning({class})\n\tFAILED: No tests found in {class}\n"
    )));
    assert_eq!(run.printed, "empty.rhai has 0 tests\n");
    Ok(())
}

#[test]
fn fixtures_share_bindings() -> Result<()> {
    let run = FixtureRun::new(&["fixtures.rhai"])?;
    let outcome = run.result.as_ref().map_err(|err| color_eyre::eyre::eyre!("{err}"))?;
    ensure!(outcome.is_success(), "summary:\n{}", run.summary);

    let bindings = run.driver.bindings();
    assert_eq!(
        bindings.lookup("set_up_runs").and_then(|v| v.as_int().ok()),
        Some(2)
    );
    assert_eq!(
        bindings.lookup("last_total").and_then(|v| v.as_int().ok()),
        Some(42)
    );
    Ok(())
}

#[test]
fn top_level_code_calls_loaded_functions() -> Result<()> {
    let run = FixtureRun::new(&["loader.rhai"])?;
    let outcome = run.result.as_ref().map_err(|err| color_eyre::eyre::eyre!("{err}"))?;
    ensure!(outcome.is_success(), "summary:\n{}", run.summary);

    assert_eq!(run.printed, "1 + 2 = 3\n");
    let summary = normalize_times(&run.summary);
    ensure!(
        summary.starts_with(
            "Running rhaiunit.loader\nTests run: 1, Failures: 0, Errors: 0, Time elapsed: T\n"
        ),
        "unexpected summary:\n{summary}"
    );
    Ok(())
}

#[test]
fn object_suites_report_their_own_classes() -> Result<()> {
    let run = FixtureRun::new(&["objecttest.rhai"])?;
    let outcome = run.result.as_ref().map_err(|err| color_eyre::eyre::eyre!("{err}"))?;
    assert_eq!(outcome.exit_code(), RhaiUnitExitCode::TEST_RUN_FAILED);

    let class = FixtureRun::fixture_path("objecttest.rhai");
    let object_class = format!("{class}.CalcObjectTest");

    let xml = run.read_report("TEST-rhaiunit.objecttest.xml")?;
    ensure!(
        xml.contains(r#"tests="7" errors="0" failures="3""#),
        "unexpected counts:\n{xml}"
    );
    for passing in ["test_matches", "test_not_same", "test_sum"] {
        ensure!(
            xml.contains(&format!(
                "<testcase classname=\"{object_class}\" name=\"{passing}\" time=\"T\"/>\n"
            )),
            "{passing} is not a self-closed testcase:\n{xml}"
        );
    }
    ensure!(xml.contains(&format!(
        "<testcase classname=\"{class}\" name=\"test_global\" time=\"T\"/>\n"
    )));
    ensure!(xml.contains(&format!(
        "<testcase classname=\"{object_class}\" name=\"test_fails\" time=\"T\">\n    \
         <failure type=\"rhaiunit::AssertionFailedError\" \
         message=\"sum is even expected match:&lt;[13579]$&gt; but was:&lt;2&gt;\">"
    )));
    ensure!(xml.contains(&format!(
        "message=\"No tests found in {class}.TestWithoutTests\""
    )));
    ensure!(xml.contains(&format!(
        "message=\"Invalid object for TestSuite {class}.NotAnObjectTest:string\""
    )));
    Ok(())
}

#[test]
fn directive_without_value_is_a_driver_error() -> Result<()> {
    let run = FixtureRun::new(&["-todir"])?;
    match &run.result {
        Err(DriverError::MissingDirectiveValue { directive }) => {
            assert_eq!(*directive, "-todir");
        }
        other => panic!("unexpected result: {other:?}"),
    }
    Ok(())
}
