// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The host test model: tests, suites, a result collector and listeners.
//!
//! This is a small xUnit-style model. Script suites are unwrapped into it by the
//! [adapter](crate::adapter), and the [reporter](crate::reporter) listens to it. A test raises a
//! [`Throwable`] to signal anything other than a pass; [`TestResult`] routes assertion failures to
//! [`TestListener::add_failure`] and everything else to [`TestListener::add_error`].

use crate::boundary::{ScriptException, ScriptLocation};
use std::fmt;
use swrite::{SWrite, swrite, swriteln};

/// The identity of a test case: its name and the name of the suite it belongs to.
///
/// The rendered form, `name(class_name)`, is the key listeners use to correlate events.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TestDescription {
    name: String,
    class_name: String,
}

impl TestDescription {
    /// Creates a new description.
    pub fn new(name: impl Into<String>, class_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            class_name: class_name.into(),
        }
    }

    /// The test name, typically a script function name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The name of the suite this test belongs to.
    pub fn class_name(&self) -> &str {
        &self.class_name
    }
}

impl fmt::Display for TestDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.class_name)
    }
}

/// A single frame in a rendered stack dump.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StackFrame {
    function: String,
    kind: StackFrameKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum StackFrameKind {
    Script {
        source: Option<String>,
        line: Option<usize>,
        column: Option<usize>,
    },
    Native,
}

impl StackFrame {
    /// A frame inside a script function or at the top level of a script file.
    pub fn script(
        function: impl Into<String>,
        source: Option<String>,
        line: Option<usize>,
        column: Option<usize>,
    ) -> Self {
        Self {
            function: function.into(),
            kind: StackFrameKind::Script {
                source,
                line,
                column,
            },
        }
    }

    /// A frame for a host function called from a script.
    pub fn native(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            kind: StackFrameKind::Native,
        }
    }

    /// The function this frame belongs to.
    pub fn function(&self) -> &str {
        &self.function
    }
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            StackFrameKind::Native => write!(f, "at {} [native]", self.function),
            StackFrameKind::Script {
                source,
                line,
                column,
            } => {
                write!(f, "at {} (", self.function)?;
                write!(f, "{}", source.as_deref().unwrap_or("<unknown>"))?;
                if let Some(line) = line {
                    write!(f, ":{line}")?;
                    if let Some(column) = column {
                        write!(f, ":{column}")?;
                    }
                }
                write!(f, ")")
            }
        }
    }
}

/// An intentional test failure, raised by assertion helpers.
///
/// Scripts create these with `host::assertion_failed(msg)` and throw them. The value crosses the
/// scripting boundary wrapped in a script exception and is recovered by
/// [`classify`](crate::boundary::classify).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AssertionFailedError {
    message: Option<String>,
    frames: Vec<StackFrame>,
}

impl AssertionFailedError {
    /// The class name reported for assertion failures.
    pub const CLASS_NAME: &'static str = "rhaiunit::AssertionFailedError";

    /// Creates a new assertion failure.
    pub fn new(message: Option<String>) -> Self {
        Self {
            message,
            frames: Vec::new(),
        }
    }

    /// The failure message, if any.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// The frames active when the failure was raised, innermost first.
    pub fn frames(&self) -> &[StackFrame] {
        &self.frames
    }

    pub(crate) fn with_frames(mut self, frames: Vec<StackFrame>) -> Self {
        self.frames = frames;
        self
    }
}

/// An error raised by the host, such as a missing resource in `readFile`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostException {
    class_name: String,
    message: Option<String>,
    frames: Vec<StackFrame>,
    causes: Vec<String>,
}

impl HostException {
    /// Creates a host exception with no frames or causes.
    pub fn new(class_name: impl Into<String>, message: Option<String>) -> Self {
        Self {
            class_name: class_name.into(),
            message,
            frames: Vec::new(),
            causes: Vec::new(),
        }
    }

    /// Creates a host exception from an error and its chain of sources.
    pub fn from_error(class_name: impl Into<String>, error: &dyn std::error::Error) -> Self {
        let mut causes = Vec::new();
        let mut source = error.source();
        while let Some(err) = source {
            causes.push(err.to_string());
            source = err.source();
        }
        Self {
            class_name: class_name.into(),
            message: Some(error.to_string()),
            frames: Vec::new(),
            causes,
        }
    }

    /// Adds a frame, outermost last.
    pub fn push_frame(&mut self, frame: StackFrame) {
        self.frames.push(frame);
    }

    /// Extends frames, outermost last.
    pub(crate) fn extend_frames(&mut self, frames: impl IntoIterator<Item = StackFrame>) {
        self.frames.extend(frames);
    }

    /// The host class name, for example `rhaiunit::ResourceNotFound`.
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// The message, if any.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

impl fmt::Display for HostException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}: {}", self.class_name, message),
            None => write!(f, "{}", self.class_name),
        }
    }
}

/// Anything a test can raise.
#[derive(Clone, Debug)]
pub enum Throwable {
    /// An assertion failure raised directly by the host.
    AssertionFailed(AssertionFailedError),

    /// An exception raised across the scripting boundary.
    Script(ScriptException),

    /// An error raised by the host.
    Host(HostException),
}

impl Throwable {
    /// The class name, used as the `type` of XML failure and error elements.
    pub fn class_name(&self) -> &str {
        match self {
            Self::AssertionFailed(_) => AssertionFailedError::CLASS_NAME,
            Self::Script(exc) => exc.class_name(),
            Self::Host(exc) => exc.class_name(),
        }
    }

    /// The message, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::AssertionFailed(failure) => failure.message(),
            Self::Script(exc) => exc.message(),
            Self::Host(exc) => exc.message(),
        }
    }

    /// The source position for script errors that have one.
    pub fn script_location(&self) -> Option<&ScriptLocation> {
        match self {
            Self::Script(exc) => exc.location(),
            Self::AssertionFailed(_) | Self::Host(_) => None,
        }
    }

    /// Renders the full, unfiltered stack dump.
    ///
    /// The first line is `<class name>: <message>`, followed by one `\tat ...` line per frame and a
    /// `Caused by: ...` line per host cause. Every line ends with a newline.
    pub fn stack_dump(&self) -> String {
        let (frames, causes): (&[StackFrame], &[String]) = match self {
            Self::AssertionFailed(failure) => (failure.frames(), &[]),
            Self::Script(exc) => (exc.frames(), &[]),
            Self::Host(exc) => (&exc.frames, &exc.causes),
        };

        let mut out = String::new();
        match self.message() {
            Some(message) => swriteln!(out, "{}: {}", self.class_name(), message),
            None => swriteln!(out, "{}", self.class_name()),
        }
        for frame in frames {
            swriteln!(out, "\t{frame}");
        }
        for cause in causes {
            swriteln!(out, "Caused by: {cause}");
        }
        out
    }
}

impl From<AssertionFailedError> for Throwable {
    fn from(failure: AssertionFailedError) -> Self {
        Self::AssertionFailed(failure)
    }
}

impl From<HostException> for Throwable {
    fn from(exc: HostException) -> Self {
        Self::Host(exc)
    }
}

/// Receives events while tests run.
///
/// For every test that runs, `start_test` and `end_test` are called exactly once each, in that
/// order. At most one of `add_failure` and `add_error` is called in between.
pub trait TestListener {
    /// A test is about to run.
    fn start_test(&mut self, test: &TestDescription);

    /// A test finished running.
    fn end_test(&mut self, test: &TestDescription);

    /// A test raised an assertion failure.
    fn add_failure(&mut self, test: &TestDescription, failure: AssertionFailedError);

    /// A test raised anything other than a host assertion failure.
    ///
    /// The error may still turn out to be a wrapped assertion failure; listeners are expected to
    /// [classify](crate::boundary::classify) it.
    fn add_error(&mut self, test: &TestDescription, error: Throwable);
}

/// Collects the results of running tests, and fans events out to listeners.
pub struct TestResult<'a> {
    listeners: Vec<&'a mut dyn TestListener>,
    run_count: usize,
    failure_count: usize,
    error_count: usize,
}

impl<'a> TestResult<'a> {
    /// Creates a new result with no listeners.
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
            run_count: 0,
            failure_count: 0,
            error_count: 0,
        }
    }

    /// Registers a listener.
    pub fn add_listener(&mut self, listener: &'a mut dyn TestListener) {
        self.listeners.push(listener);
    }

    /// Runs a single test body, reporting its outcome to all listeners.
    pub fn run_protected(&mut self, test: &TestDescription, body: &dyn TestBody) {
        self.run_count += 1;
        for listener in &mut self.listeners {
            listener.start_test(test);
        }

        match body.run_test() {
            Ok(()) => {}
            Err(Throwable::AssertionFailed(failure)) => {
                self.failure_count += 1;
                for listener in &mut self.listeners {
                    listener.add_failure(test, failure.clone());
                }
            }
            Err(error) => {
                self.error_count += 1;
                for listener in &mut self.listeners {
                    listener.add_error(test, error.clone());
                }
            }
        }

        for listener in &mut self.listeners {
            listener.end_test(test);
        }
    }

    /// The number of tests run.
    pub fn run_count(&self) -> usize {
        self.run_count
    }

    /// The number of tests that raised a host assertion failure.
    pub fn failure_count(&self) -> usize {
        self.failure_count
    }

    /// The number of tests that raised anything else, including wrapped assertion failures.
    pub fn error_count(&self) -> usize {
        self.error_count
    }

    /// Returns true if no test failed or errored.
    pub fn was_successful(&self) -> bool {
        self.failure_count == 0 && self.error_count == 0
    }
}

impl Default for TestResult<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// The body of a test case.
pub trait TestBody {
    /// Runs the test, returning the raised throwable on anything but a pass.
    fn run_test(&self) -> Result<(), Throwable>;
}

impl<F> TestBody for F
where
    F: Fn() -> Result<(), Throwable>,
{
    fn run_test(&self) -> Result<(), Throwable> {
        self()
    }
}

/// Something that can be run against a [`TestResult`].
pub trait Test {
    /// The number of test cases this test will run.
    fn count_test_cases(&self) -> usize;

    /// Runs the test.
    fn run(&self, result: &mut TestResult<'_>);
}

/// A single test case.
pub struct TestCase {
    description: TestDescription,
    body: Box<dyn TestBody>,
}

impl TestCase {
    /// Creates a new test case.
    pub fn new(description: TestDescription, body: impl TestBody + 'static) -> Self {
        Self {
            description,
            body: Box::new(body),
        }
    }

    /// Returns a test that always fails with `message`.
    ///
    /// This is how suites that fail to load are reported: the run continues, and the failure shows
    /// up in every report as a test called `warning`.
    pub fn warning(class_name: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(TestDescription::new("warning", class_name), move || {
            Err(AssertionFailedError::new(Some(message.clone())).into())
        })
    }

    /// The description of this test.
    pub fn description(&self) -> &TestDescription {
        &self.description
    }
}

impl Test for TestCase {
    fn count_test_cases(&self) -> usize {
        1
    }

    fn run(&self, result: &mut TestResult<'_>) {
        result.run_protected(&self.description, &*self.body);
    }
}

impl fmt::Debug for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestCase")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// An ordered collection of tests.
pub struct TestSuite {
    name: String,
    tests: Vec<Box<dyn Test>>,
}

impl TestSuite {
    /// Creates an empty suite.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tests: Vec::new(),
        }
    }

    /// The suite name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds a test to the end of the suite.
    pub fn add_test(&mut self, test: impl Test + 'static) {
        self.tests.push(Box::new(test));
    }

    /// The number of direct children of this suite.
    pub fn test_count(&self) -> usize {
        self.tests.len()
    }
}

impl Test for TestSuite {
    fn count_test_cases(&self) -> usize {
        self.tests.iter().map(|test| test.count_test_cases()).sum()
    }

    fn run(&self, result: &mut TestResult<'_>) {
        for test in &self.tests {
            test.run(result);
        }
    }
}

impl fmt::Debug for TestSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestSuite")
            .field("name", &self.name)
            .field("tests", &self.tests.len())
            .finish()
    }
}

/// Renders a throwable's one-line summary: `<class name>: <message>`.
pub(crate) fn describe(throwable: &Throwable) -> String {
    let mut out = String::new();
    match throwable.message() {
        Some(message) => swrite!(out, "{}: {}", throwable.class_name(), message),
        None => swrite!(out, "{}", throwable.class_name()),
    }
    out
}
