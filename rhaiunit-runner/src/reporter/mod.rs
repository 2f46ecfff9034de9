// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Report the results of a suite run in human and machine-readable formats.
//!
//! The main type here is [`ResultWriter`], a [`TestListener`] that accumulates timing and outcomes
//! while a suite runs. When the suite ends, it renders the same accumulated state into up to three
//! outputs:
//!
//! * a console summary,
//! * a plain-text report, and
//! * a JUnit-style XML report.

mod plain;
mod properties;
mod suite_run;
mod summary;
mod xml;

pub use properties::system_properties;

use crate::{
    boundary::{Classified, classify},
    errors::{ReportKind, ReportWriteError},
    model::{AssertionFailedError, TestDescription, TestListener, Throwable},
    stack_trace::StackTraceFilter,
};
use debug_ignore::DebugIgnore;
use std::{
    collections::BTreeMap,
    fmt,
    io::{self, Write},
};
use suite_run::{Outcome, SuiteRun};
use tracing::debug;

type Sink<'a> = DebugIgnore<Box<dyn Write + 'a>>;

/// Writes summary, plain and XML reports for a suite run.
///
/// A writer reports on one suite at a time. [`start_test_suite`](Self::start_test_suite) resets all
/// accumulated state, but a fresh writer per suite is the simplest way to keep results from
/// leaking between suites.
pub struct ResultWriter<'a> {
    summary: Option<Sink<'a>>,
    plain: Option<Sink<'a>>,
    xml: Option<Sink<'a>>,
    filter: StackTraceFilter,
    properties: BTreeMap<String, String>,
    run: SuiteRun,
}

impl<'a> ResultWriter<'a> {
    /// Creates a writer that prints the summary to standard output and writes no report files.
    pub fn new() -> Self {
        Self {
            summary: Some(DebugIgnore(Box::new(io::stdout()))),
            plain: None,
            xml: None,
            filter: StackTraceFilter::default(),
            properties: system_properties(),
            run: SuiteRun::new(),
        }
    }

    /// Writes the console summary to `out` instead of standard output.
    pub fn with_summary(mut self, out: impl Write + 'a) -> Self {
        self.summary = Some(DebugIgnore(Box::new(out)));
        self
    }

    /// Disables the console summary.
    pub fn without_summary(mut self) -> Self {
        self.summary = None;
        self
    }

    /// Writes the plain-text report to `out`.
    pub fn with_plain(mut self, out: impl Write + 'a) -> Self {
        self.plain = Some(DebugIgnore(Box::new(out)));
        self
    }

    /// Writes the XML report to `out`.
    pub fn with_xml(mut self, out: impl Write + 'a) -> Self {
        self.xml = Some(DebugIgnore(Box::new(out)));
        self
    }

    /// Sets the filter applied to the stack dumps of failures.
    pub fn with_filter(mut self, filter: StackTraceFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Replaces the properties recorded in the XML report.
    pub fn with_properties(mut self, properties: BTreeMap<String, String>) -> Self {
        self.properties = properties;
        self
    }

    /// Starts a suite, discarding anything accumulated so far.
    ///
    /// Writes `Running <name>` to the summary and `Testsuite: <name>` to the plain report.
    pub fn start_test_suite(&mut self, name: &str) -> Result<(), ReportWriteError> {
        debug!("starting suite {name}");
        self.run = SuiteRun::new();

        if let Some(out) = &mut self.summary {
            summary::write_header(&mut **out, name)
                .map_err(|err| ReportWriteError::new(ReportKind::Summary, err))?;
        }
        if let Some(out) = &mut self.plain {
            plain::write_header(&mut **out, name)
                .map_err(|err| ReportWriteError::new(ReportKind::Plain, err))?;
        }
        Ok(())
    }

    /// Ends a suite and renders all reports.
    ///
    /// Every configured output is written and flushed even if an earlier one fails; the first
    /// error is returned.
    pub fn end_test_suite(&mut self, name: &str) -> Result<(), ReportWriteError> {
        let finished = std::mem::replace(&mut self.run, SuiteRun::new()).finish(name);
        debug!(
            "finished suite {name}: {} tests, {} failures, {} errors",
            finished.tests.len(),
            finished.failure_count(),
            finished.error_count(),
        );

        let mut first_error = None;
        let mut record = |kind: ReportKind, res: io::Result<()>| {
            if let Err(err) = res {
                first_error.get_or_insert(ReportWriteError::new(kind, err));
            }
        };

        if let Some(out) = &mut self.summary {
            record(
                ReportKind::Summary,
                summary::write_summary(&mut **out, &finished),
            );
        }
        if let Some(out) = &mut self.plain {
            record(
                ReportKind::Plain,
                plain::write_report(&mut **out, &finished, &self.filter),
            );
        }
        if let Some(out) = &mut self.xml {
            record(
                ReportKind::Xml,
                xml::write_report(&mut **out, &finished, &self.properties, &self.filter),
            );
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Default for ResultWriter<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ResultWriter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultWriter")
            .field("summary", &self.summary.is_some())
            .field("plain", &self.plain.is_some())
            .field("xml", &self.xml.is_some())
            .field("run", &self.run)
            .finish_non_exhaustive()
    }
}

impl TestListener for ResultWriter<'_> {
    fn start_test(&mut self, test: &TestDescription) {
        self.run.start_test(test);
    }

    fn end_test(&mut self, test: &TestDescription) {
        self.run.end_test(test);
    }

    fn add_failure(&mut self, test: &TestDescription, failure: AssertionFailedError) {
        self.run.set_outcome(test, Outcome::Failed(failure));
    }

    fn add_error(&mut self, test: &TestDescription, error: Throwable) {
        match classify(error) {
            Classified::Failed(failure) => self.add_failure(test, failure),
            Classified::Errored(error) => self.run.set_outcome(test, Outcome::Errored(error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        boundary::{SourceTable, decode},
        model::{HostException, StackFrame, Test, TestCase, TestResult, TestSuite},
    };
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use chrono::Timelike;
    use regex::Regex;
    use rhai::{Dynamic, EvalAltResult, Position};

    fn normalize_times(text: &[u8]) -> String {
        let text = String::from_utf8_lossy(text);
        let stamp = Regex::new(r#"timestamp="[^"]*""#).expect("valid regex");
        let text = stamp.replace_all(&text, r#"timestamp="TS""#);
        let re = Regex::new(r"\d+\.\d{3}").expect("valid regex");
        re.replace_all(&text, "T").into_owned()
    }

    fn calc_suite() -> TestSuite {
        let mut suite = TestSuite::new("calctest.rhai");
        let add = |name: &str, body: fn() -> Result<(), Throwable>| {
            TestCase::new(TestDescription::new(name, "calctest.rhai"), body)
        };
        suite.add_test(add("test_add", || Ok(())));
        suite.add_test(add("test_sub", || {
            let failure = AssertionFailedError::new(Some("expected:<1> but was:<2>".to_owned()))
                .with_frames(vec![
                    StackFrame::script(
                        "assert_equals",
                        Some("rhaiunit.rhai".to_owned()),
                        Some(16),
                        Some(9),
                    ),
                    StackFrame::script("test_sub", Some("calctest.rhai".to_owned()), Some(8), Some(5)),
                ]);
            Err(failure.into())
        }));
        suite.add_test(add("test_div", || {
            let exc = HostException::new(
                "rhai::EvalAltResult",
                Some("Division by zero: 1 / 0 & <more>".to_owned()),
            );
            Err(exc.into())
        }));
        suite
    }

    fn properties() -> BTreeMap<String, String> {
        [
            ("os.name", "linux"),
            ("line.separator", "\n"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect()
    }

    #[test]
    fn writes_all_three_reports() {
        let mut summary = Vec::new();
        let mut plain = Vec::new();
        let mut xml = Vec::new();
        let suite = calc_suite();

        {
            let mut writer = ResultWriter::new()
                .with_summary(&mut summary)
                .with_plain(&mut plain)
                .with_xml(&mut xml)
                .with_properties(properties());
            writer
                .start_test_suite("rhaiunit.calctest")
                .expect("started suite");
            let mut result = TestResult::new();
            result.add_listener(&mut writer);
            suite.run(&mut result);
            assert!(!result.was_successful());
            writer
                .end_test_suite("rhaiunit.calctest")
                .expect("ended suite");
        }

        assert_eq!(
            normalize_times(&summary),
            indoc! {"
                Running rhaiunit.calctest
                Tests run: 3, Failures: 1, Errors: 1, Time elapsed: T
                Test test_sub(calctest.rhai)
                \tFAILED: expected:<1> but was:<2>
                Test test_div(calctest.rhai)
                \tERROR: rhai::EvalAltResult: Division by zero: 1 / 0 & <more>

            "}
        );

        assert_eq!(
            normalize_times(&plain),
            indoc! {"
                Testsuite: rhaiunit.calctest
                Tests run: 3, Failures: 1, Errors: 1, Time elapsed: T

                Testcase: test_add(calctest.rhai) took T sec
                Testcase: test_sub(calctest.rhai) took T sec
                \tFAILED
                rhaiunit::AssertionFailedError: expected:<1> but was:<2>
                \tat test_sub (calctest.rhai:8:5)

                Testcase: test_div(calctest.rhai) took T sec
                \tCaused an ERROR
                rhai::EvalAltResult: Division by zero: 1 / 0 & <more>

            "}
        );

        assert_eq!(
            normalize_times(&xml),
            indoc! {r#"
                <?xml version="1.0" encoding="UTF-8" ?>
                <testsuite name="rhaiunit.calctest" tests="3" errors="1" failures="1" time="T" skipped="0" timestamp="TS">
                  <properties>
                    <property name="line.separator" value="
                "/>
                    <property name="os.name" value="linux"/>
                  </properties>
                  <testcase classname="calctest.rhai" name="test_add" time="T"/>
                  <testcase classname="calctest.rhai" name="test_sub" time="T">
                    <failure type="rhaiunit::AssertionFailedError" message="expected:&lt;1&gt; but was:&lt;2&gt;">rhaiunit::AssertionFailedError: expected:&lt;1&gt; but was:&lt;2&gt;
                	at test_sub (calctest.rhai:8:5)
                </failure>
                  </testcase>
                  <testcase classname="calctest.rhai" name="test_div" time="T">
                    <error type="rhai::EvalAltResult" message="Division by zero: 1 / 0 &amp; &lt;more&gt;">rhai::EvalAltResult: Division by zero: 1 / 0 &amp; &lt;more&gt;
                </error>
                  </testcase>
                </testsuite>"#}
        );
    }

    #[test]
    fn xml_timestamp_is_suite_start() {
        let mut xml = Vec::new();
        let before = chrono::Local::now().naive_local();
        {
            let mut writer = ResultWriter::new().with_xml(&mut xml);
            writer.start_test_suite("s").expect("started suite");
            writer.end_test_suite("s").expect("ended suite");
        }
        let after = chrono::Local::now().naive_local();

        let xml = String::from_utf8_lossy(&xml).into_owned();
        let stamp = Regex::new(r#"<testsuite [^>]*timestamp="([^"]+)">"#)
            .expect("valid regex")
            .captures(&xml)
            .map(|c| c[1].to_owned())
            .expect("found timestamp");
        let stamp = chrono::NaiveDateTime::parse_from_str(&stamp, "%Y-%m-%dT%H:%M:%S")
            .expect("timestamp has no fraction or zone");
        assert!(
            before.with_nanosecond(0).expect("zero is valid") <= stamp && stamp <= after,
            "{stamp} is not between {before} and {after}"
        );
    }

    #[test]
    fn elapsed_time_matches_across_reports() {
        let mut summary = Vec::new();
        let mut plain = Vec::new();
        let mut xml = Vec::new();

        {
            let mut writer = ResultWriter::new()
                .with_summary(&mut summary)
                .with_plain(&mut plain)
                .with_xml(&mut xml);
            writer.start_test_suite("s").expect("started suite");
            std::thread::sleep(std::time::Duration::from_millis(15));
            writer.end_test_suite("s").expect("ended suite");
        }

        let elapsed = |text: &[u8], re: &str| {
            let text = String::from_utf8_lossy(text).into_owned();
            Regex::new(re)
                .expect("valid regex")
                .captures(&text)
                .map(|c| c[1].to_owned())
                .expect("found elapsed time")
        };
        let from_summary = elapsed(&summary, r"Time elapsed: (\d+\.\d{3})");
        assert_eq!(from_summary, elapsed(&plain, r"Time elapsed: (\d+\.\d{3})"));
        assert_eq!(from_summary, elapsed(&xml, r#"<testsuite [^>]*time="(\d+\.\d{3})""#));
        let seconds: f64 = from_summary.parse().expect("elapsed time is a number");
        assert!(seconds >= 0.015, "elapsed time {seconds} is too short");
    }

    #[test]
    fn warning_is_a_failure() {
        let mut summary = Vec::new();
        let mut suite = TestSuite::new("s");
        suite.add_test(TestCase::warning("s", "No tests found in s.rhai"));

        {
            let mut writer = ResultWriter::new().with_summary(&mut summary);
            writer.start_test_suite("s").expect("started suite");
            let mut result = TestResult::new();
            result.add_listener(&mut writer);
            suite.run(&mut result);
            writer.end_test_suite("s").expect("ended suite");
        }

        let summary = normalize_times(&summary);
        assert!(
            summary.contains("Tests run: 1, Failures: 1, Errors: 0"),
            "unexpected summary: {summary}"
        );
        assert!(summary.contains("Test warning(s)\n\tFAILED: No tests found in s.rhai\n"));
    }

    #[test]
    fn wrapped_assertion_is_a_failure() {
        let mut summary = Vec::new();
        let mut suite = TestSuite::new("s");
        suite.add_test(TestCase::new(TestDescription::new("test_wrapped", "s"), || {
            let failure = AssertionFailedError::new(Some("nope".to_owned()));
            let err = EvalAltResult::ErrorRuntime(Dynamic::from(failure), Position::new(3, 5));
            let exc = decode(Box::new(err), Some("s.rhai"), &SourceTable::default());
            Err(Throwable::Script(exc))
        }));
        suite.add_test(TestCase::new(TestDescription::new("test_thrown", "s"), || {
            let err = EvalAltResult::ErrorRuntime("boom".into(), Position::new(4, 5));
            let exc = decode(Box::new(err), Some("s.rhai"), &SourceTable::default());
            Err(Throwable::Script(exc))
        }));

        {
            let mut writer = ResultWriter::new().with_summary(&mut summary);
            writer.start_test_suite("s").expect("started suite");
            let mut result = TestResult::new();
            result.add_listener(&mut writer);
            suite.run(&mut result);
            writer.end_test_suite("s").expect("ended suite");
        }

        let summary = normalize_times(&summary);
        assert!(
            summary.contains("Tests run: 2, Failures: 1, Errors: 1"),
            "unexpected summary: {summary}"
        );
        assert!(summary.contains("Test test_wrapped(s)\n\tFAILED: nope\n"));
        assert!(summary.contains("Test test_thrown(s)\n\tERROR: \n\"s.rhai\", line 4: boom\n"));
    }

    #[test]
    fn start_resets_state() {
        let mut summary = Vec::new();
        let suite = calc_suite();

        {
            let mut writer = ResultWriter::new().with_summary(&mut summary);
            writer.start_test_suite("first").expect("started suite");
            {
                let mut result = TestResult::new();
                result.add_listener(&mut writer);
                suite.run(&mut result);
            }
            // Starting again discards the previous run.
            writer.start_test_suite("second").expect("started suite");
            writer.end_test_suite("second").expect("ended suite");
        }

        let summary = normalize_times(&summary);
        assert!(summary.ends_with("Running second\nTests run: 0, Failures: 0, Errors: 0, Time elapsed: T\n"));
    }

    #[test]
    fn missing_message_renders_empty() {
        let mut xml = Vec::new();
        let mut suite = TestSuite::new("s");
        suite.add_test(TestCase::new(TestDescription::new("test_x", "s"), || {
            Err(AssertionFailedError::new(None).into())
        }));

        {
            let mut writer = ResultWriter::new()
                .without_summary()
                .with_xml(&mut xml)
                .with_properties(BTreeMap::new());
            writer.start_test_suite("s").expect("started suite");
            let mut result = TestResult::new();
            result.add_listener(&mut writer);
            suite.run(&mut result);
            writer.end_test_suite("s").expect("ended suite");
        }

        let xml = normalize_times(&xml);
        assert!(xml.contains(
            r#"<failure type="rhaiunit::AssertionFailedError" message="">rhaiunit::AssertionFailedError
</failure>"#
        ));
    }
}
