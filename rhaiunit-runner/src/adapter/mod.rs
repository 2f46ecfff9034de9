// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turning test files into host test suites.
//!
//! For each test file, [`SuiteAdapter::obtain_tests`] evaluates the bootstrap script in a fresh
//! [`Sandbox`] and asks it to build a suite for the file. Object suites, declared by functions named
//! `Test*` or `*Test`, are filled in by a second call once the file's functions are visible. The
//! [`ScriptSuite`] that results is unwrapped into a [`TestSuite`] whose test cases call back into
//! the sandbox.
//!
//! Obtaining tests never fails: if anything goes wrong, the returned suite holds a single test
//! called `warning` that fails with a description of the problem.

mod host_api;

pub use host_api::*;

use crate::{
    model::{HostException, Test, TestBody, TestCase, TestDescription, TestSuite, Throwable},
    sandbox::{Sandbox, SandboxConfig},
    stack_trace::format_error,
};
use rhai::{Dynamic, FnPtr, ImmutableString, Map};
use rhaiunit_metadata::REPORT_NAMESPACE;
use std::rc::Rc;
use tracing::{debug, warn};

/// The bootstrap script, resolved through the bundled resources.
pub const BOOTSTRAP_FILE: &str = "rhaiunit.rhai";

/// The bootstrap function that builds a suite for a test file.
pub const SUITE_FACTORY: &str = "rhaiunit_test_suite";

/// The bootstrap function that fills in an object suite.
pub const OBJECT_SUITE_FACTORY: &str = "rhaiunit_object_suite";

/// The bootstrap function that calls a function-valued member of `this`.
const MEMBER_CALL: &str = "rhaiunit_call_member";

const SET_UP: &str = "set_up";
const TEAR_DOWN: &str = "tear_down";

/// Builds host test suites from test files.
#[derive(Clone, Debug)]
pub struct SuiteAdapter {
    config: SandboxConfig,
}

impl SuiteAdapter {
    /// Creates a new adapter. Every suite is evaluated in a new sandbox created from `config`.
    pub fn new(config: SandboxConfig) -> Self {
        Self { config }
    }

    /// Returns the tests in `file`.
    ///
    /// The returned suite is named `rhaiunit` and wraps the suite built by the script.
    pub fn obtain_tests(&self, file: &str) -> TestSuite {
        let mut result = TestSuite::new(REPORT_NAMESPACE);
        match self.load_suite(file) {
            Ok(suite) => {
                debug!(
                    "obtained {} test cases from `{file}`",
                    suite.count_test_cases()
                );
                result.add_test(suite);
            }
            Err(err) => {
                warn!("error loading {BOOTSTRAP_FILE} for `{file}`, reporting a warning");
                let message =
                    format_error(Some("Error loading rhaiunit.rhai"), Some(BOOTSTRAP_FILE), &err);
                result.add_test(TestCase::warning(REPORT_NAMESPACE, message));
            }
        }
        result
    }

    fn load_suite(&self, file: &str) -> Result<TestSuite, Throwable> {
        let mut sandbox = Sandbox::new(self.config.clone());
        register(sandbox.engine_mut());
        // Suites are evaluated one after another in the same process: never reuse compiled
        // scripts across them.
        sandbox.set_ast_caching(false);

        sandbox.load(BOOTSTRAP_FILE)?;
        let value = sandbox.call_fn(SUITE_FACTORY, (ImmutableString::from(file),))?;
        let type_name = value.type_name();
        let mut suite = value
            .try_cast::<ScriptSuite>()
            .ok_or_else(|| unexpected_type(SUITE_FACTORY, type_name))?;
        fill_object_suites(&sandbox, &mut suite);

        Ok(unwrap_suite(&Rc::new(sandbox), &suite))
    }
}

fn unexpected_type(function: &str, type_name: &str) -> Throwable {
    Throwable::Host(HostException::new(
        "rhaiunit::UnexpectedSuiteType",
        Some(format!(
            "`{function}` returned `{type_name}` instead of a ScriptSuite"
        )),
    ))
}

/// Fills in the object suites of `suite`, each in its own host-level call.
///
/// An object suite that can't be built is replaced by a warning.
fn fill_object_suites(sandbox: &Sandbox, suite: &mut ScriptSuite) {
    for entry in suite.entries_mut() {
        let SuiteEntry::Suite(child) = &mut *entry else {
            continue;
        };
        let Some(factory) = child.factory() else {
            fill_object_suites(sandbox, child);
            continue;
        };
        debug!("filling in object suite `{}` from `{factory}`", child.name());

        let name = child.name().to_owned();
        let filled = sandbox
            .call_fn(OBJECT_SUITE_FACTORY, (child.clone(),))
            .and_then(|value| {
                let type_name = value.type_name();
                let filled = if value.is::<ScriptWarning>() {
                    value.try_cast::<ScriptWarning>().map(SuiteEntry::Warning)
                } else {
                    value.try_cast::<ScriptSuite>().map(SuiteEntry::Suite)
                };
                filled.ok_or_else(|| unexpected_type(OBJECT_SUITE_FACTORY, type_name))
            });
        *entry = filled.unwrap_or_else(|err| {
            warn!("error creating object suite `{name}`, reporting a warning");
            let fallback = format!("Error creating TestSuite {name}");
            SuiteEntry::Warning(ScriptWarning::new(format_error(Some(&fallback), None, &err)))
        });
    }
}

/// Converts a script suite into a host suite, recursively.
fn unwrap_suite(sandbox: &Rc<Sandbox>, suite: &ScriptSuite) -> TestSuite {
    let mut result = TestSuite::new(suite.name());
    for entry in suite.entries() {
        match entry {
            SuiteEntry::Test(test) => {
                let description = TestDescription::new(test.fn_name(), suite.name());
                let target = match test.factory() {
                    Some(factory) => TestTarget::Member {
                        factory: factory.to_owned(),
                        key: test.fn_name().to_owned(),
                    },
                    None => TestTarget::Function {
                        fn_name: test.fn_name().to_owned(),
                        set_up: suite.set_up().map(str::to_owned),
                        tear_down: suite.tear_down().map(str::to_owned),
                    },
                };
                let body = ScriptTestCase {
                    sandbox: sandbox.clone(),
                    target,
                };
                result.add_test(TestCase::new(description, body));
            }
            SuiteEntry::Warning(warning) => {
                result.add_test(TestCase::warning(suite.name(), warning.message()));
            }
            SuiteEntry::Suite(child) => {
                result.add_test(unwrap_suite(sandbox, child));
            }
        }
    }
    result
}

/// A test case that runs a script function, with optional fixtures.
struct ScriptTestCase {
    sandbox: Rc<Sandbox>,
    target: TestTarget,
}

enum TestTarget {
    /// A test function. Each run gets a fresh object map bound to `this`, shared by `set_up`, the
    /// test function and `tear_down`.
    Function {
        fn_name: String,
        set_up: Option<String>,
        tear_down: Option<String>,
    },

    /// A function-valued member of the object map returned by `factory`. Each run calls `factory`
    /// again, and the map's own `set_up` and `tear_down` members run around the test.
    Member { factory: String, key: String },
}

impl TestBody for ScriptTestCase {
    fn run_test(&self) -> Result<(), Throwable> {
        match &self.target {
            TestTarget::Function {
                fn_name,
                set_up,
                tear_down,
            } => {
                let mut fixture = Dynamic::from_map(Map::new());
                run_with_fixtures(
                    &mut fixture,
                    set_up.as_deref(),
                    fn_name,
                    tear_down.as_deref(),
                    |name, this| self.sandbox.call_method(name, this),
                )
            }
            TestTarget::Member { factory, key } => {
                let mut instance = self.sandbox.call_fn(factory, ())?;
                let set_up = has_fn_member(&instance, SET_UP).then_some(SET_UP);
                let tear_down = has_fn_member(&instance, TEAR_DOWN).then_some(TEAR_DOWN);
                run_with_fixtures(&mut instance, set_up, key, tear_down, |name, this| {
                    self.sandbox
                        .call_method_with_args(MEMBER_CALL, this, (ImmutableString::from(name),))
                })
            }
        }
    }
}

/// Runs `set_up`, then `test`, then `tear_down` against the same `this`.
///
/// The first error wins: a `tear_down` error is only reported if the test passed. A failing
/// `set_up` skips the rest.
fn run_with_fixtures(
    this: &mut Dynamic,
    set_up: Option<&str>,
    test: &str,
    tear_down: Option<&str>,
    call: impl Fn(&str, &mut Dynamic) -> Result<Dynamic, Throwable>,
) -> Result<(), Throwable> {
    if let Some(set_up) = set_up {
        call(set_up, this)?;
    }

    let result = call(test, this).map(|_| ());

    let tear_down = match tear_down {
        Some(tear_down) => call(tear_down, this).map(|_| ()),
        None => Ok(()),
    };

    result.and(tear_down)
}

fn has_fn_member(instance: &Dynamic, key: &str) -> bool {
    instance
        .read_lock::<Map>()
        .is_some_and(|map| map.get(key).is_some_and(|value| value.is::<FnPtr>()))
}
