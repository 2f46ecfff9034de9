// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `host` module: test model constructors for scripts.
//!
//! ```rhai
//! let suite = host::suite("calctest.rhai");
//! suite.set_up("set_up");
//! suite.add_test(host::test("test_add"));
//! suite.add_test(host::warning("something is off"));
//! suite.add_suite(host::object_suite("calctest.rhai.CalcTest", "CalcTest"));
//! throw host::assertion_failed("expected:<1> but was:<2>");
//! ```
//!
//! An object suite is filled in later from the object map its factory function returns: every
//! `test*` member holding a function becomes a [`ScriptTest`] created with `host::member_test`.

use crate::{
    boundary::ScriptException,
    model::{AssertionFailedError, HostException, Throwable},
    stack_trace::format_error,
};
use regex::Regex;
use rhai::{Dynamic, Engine, EvalAltResult, Module, Position};

/// The name scripts use to reach the host test model.
pub const HOST_MODULE: &str = "host";

/// A suite built by a script.
#[derive(Clone, Debug, Default)]
pub struct ScriptSuite {
    name: String,
    entries: Vec<SuiteEntry>,
    set_up: Option<String>,
    tear_down: Option<String>,
    factory: Option<String>,
}

/// A child of a [`ScriptSuite`].
#[derive(Clone, Debug)]
pub enum SuiteEntry {
    /// A test case backed by a script function.
    Test(ScriptTest),

    /// A test that always fails with a message.
    Warning(ScriptWarning),

    /// A nested suite.
    Suite(ScriptSuite),
}

impl ScriptSuite {
    /// Creates an empty suite.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// The suite name. Test cases use it as their class name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The children of this suite, in the order they were added.
    pub fn entries(&self) -> &[SuiteEntry] {
        &self.entries
    }

    /// The function run before each test case, if any.
    pub fn set_up(&self) -> Option<&str> {
        self.set_up.as_deref()
    }

    /// The function run after each test case, if any.
    pub fn tear_down(&self) -> Option<&str> {
        self.tear_down.as_deref()
    }

    /// For object suites, the function that returns the object map holding the tests.
    pub fn factory(&self) -> Option<&str> {
        self.factory.as_deref()
    }

    /// Returns true if nothing has been added to this suite.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn entries_mut(&mut self) -> &mut [SuiteEntry] {
        &mut self.entries
    }

    /// The number of test cases in this suite and its nested suites.
    pub fn count_test_cases(&self) -> usize {
        self.entries
            .iter()
            .map(|entry| match entry {
                SuiteEntry::Test(_) | SuiteEntry::Warning(_) => 1,
                SuiteEntry::Suite(suite) => suite.count_test_cases(),
            })
            .sum()
    }

    fn push(&mut self, entry: SuiteEntry) {
        self.entries.push(entry);
    }
}

/// A test case backed by a zero-parameter script function, or by a function-valued member of an
/// object map.
#[derive(Clone, Debug)]
pub struct ScriptTest {
    fn_name: String,
    factory: Option<String>,
}

impl ScriptTest {
    /// The function that runs the test. For member tests, this is the member name.
    pub fn fn_name(&self) -> &str {
        &self.fn_name
    }

    /// For member tests, the function that returns a fresh object map for each run.
    pub fn factory(&self) -> Option<&str> {
        self.factory.as_deref()
    }
}

/// A test that always fails with a message.
#[derive(Clone, Debug)]
pub struct ScriptWarning {
    message: String,
}

impl ScriptWarning {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The failure message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Registers the `host` module and its types with an engine.
pub fn register(engine: &mut Engine) {
    engine
        .register_type_with_name::<ScriptSuite>("ScriptSuite")
        .register_type_with_name::<ScriptTest>("ScriptTest")
        .register_type_with_name::<ScriptWarning>("ScriptWarning")
        .register_type_with_name::<AssertionFailedError>("AssertionFailedError")
        .register_type_with_name::<HostException>("HostException")
        .register_type_with_name::<ScriptException>("ScriptException");

    engine
        .register_fn("add_test", |suite: &mut ScriptSuite, test: ScriptTest| {
            suite.push(SuiteEntry::Test(test));
        })
        .register_fn(
            "add_test",
            |suite: &mut ScriptSuite, warning: ScriptWarning| {
                suite.push(SuiteEntry::Warning(warning));
            },
        )
        .register_fn("add_test", |suite: &mut ScriptSuite, child: ScriptSuite| {
            suite.push(SuiteEntry::Suite(child));
        })
        .register_fn("add_suite", |suite: &mut ScriptSuite, child: ScriptSuite| {
            suite.push(SuiteEntry::Suite(child));
        })
        .register_fn("count_test_cases", |suite: &mut ScriptSuite| {
            rhai::INT::try_from(suite.count_test_cases()).unwrap_or(rhai::INT::MAX)
        })
        .register_fn("is_empty", |suite: &mut ScriptSuite| suite.is_empty())
        .register_fn("set_up", |suite: &mut ScriptSuite, fn_name: &str| {
            suite.set_up = Some(fn_name.to_owned());
        })
        .register_fn("tear_down", |suite: &mut ScriptSuite, fn_name: &str| {
            suite.tear_down = Some(fn_name.to_owned());
        })
        .register_get("name", |suite: &mut ScriptSuite| suite.name.clone())
        .register_get("factory", |suite: &mut ScriptSuite| {
            suite.factory.clone().map_or(Dynamic::UNIT, Dynamic::from)
        })
        .register_get("message", |failure: &mut AssertionFailedError| {
            failure.message().map_or(Dynamic::UNIT, |m| m.into())
        })
        .register_fn("to_string", |failure: &mut AssertionFailedError| {
            Throwable::from(failure.clone()).stack_dump()
        })
        .register_fn("to_string", |exc: &mut HostException| exc.to_string());

    engine.register_static_module(HOST_MODULE, host_module().into());
}

fn host_module() -> Module {
    let mut module = Module::new();

    module.set_native_fn("suite", |name: &str| Ok(ScriptSuite::new(name)));
    module.set_native_fn("object_suite", |name: &str, factory: &str| {
        Ok(ScriptSuite {
            factory: Some(factory.to_owned()),
            ..ScriptSuite::new(name)
        })
    });
    module.set_native_fn("test", |fn_name: &str| {
        Ok(ScriptTest {
            fn_name: fn_name.to_owned(),
            factory: None,
        })
    });
    module.set_native_fn("member_test", |factory: &str, key: &str| {
        Ok(ScriptTest {
            fn_name: key.to_owned(),
            factory: Some(factory.to_owned()),
        })
    });
    module.set_native_fn("matches", |pattern: &str, text: &str| {
        matches(pattern, text)
    });
    module.set_native_fn("warning", |message: &str| {
        Ok(ScriptWarning {
            message: message.to_owned(),
        })
    });
    module.set_native_fn("assertion_failed", || Ok(AssertionFailedError::new(None)));
    module.set_native_fn("assertion_failed", |message: Dynamic| {
        let message = (!message.is_unit()).then(|| message.to_string());
        Ok(AssertionFailedError::new(message))
    });
    module.set_native_fn("load_warning", |file: &str, err: Dynamic| {
        Ok(load_warning(file, err))
    });

    module
}

/// Returns true if `pattern` matches anywhere in `text`.
fn matches(pattern: &str, text: &str) -> Result<bool, Box<EvalAltResult>> {
    let regex = Regex::new(pattern).map_err(|err| {
        let exc = HostException::from_error(INVALID_PATTERN_CLASS, &err);
        Box::new(EvalAltResult::ErrorRuntime(Dynamic::from(exc), Position::NONE))
    })?;
    Ok(regex.is_match(text))
}

/// The host class name of the error `host::matches` raises for an invalid pattern.
pub const INVALID_PATTERN_CLASS: &str = "regex::Error";

/// Builds the warning reported when a test file fails to load.
///
/// `err` is the value caught from `load`.
fn load_warning(file: &str, err: Dynamic) -> ScriptWarning {
    let fallback = format!("Error loading rhai file: {file}");
    let throwable = if err.is::<ScriptException>() {
        err.try_cast::<ScriptException>().map(Throwable::Script)
    } else if err.is::<HostException>() {
        err.try_cast::<HostException>().map(Throwable::Host)
    } else if err.is::<AssertionFailedError>() {
        err.try_cast::<AssertionFailedError>()
            .map(Throwable::AssertionFailed)
    } else {
        return ScriptWarning {
            message: format!("{fallback}\n{err}\n"),
        };
    };

    let message = match throwable {
        Some(throwable) => format_error(Some(&fallback), None, &throwable),
        None => fallback,
    };
    ScriptWarning { message }
}
