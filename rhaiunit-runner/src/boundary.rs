// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Decoding errors that cross the scripting boundary.
//!
//! Rhai reports failures as nested [`EvalAltResult`]s: every script function call and module load
//! on the way down wraps the error raised below it. This module is the only place that understands
//! that wrapping. [`decode`] flattens it into a [`ScriptException`] with a source location and
//! stack frames, and [`classify`] decides whether a raised [`Throwable`] is an assertion failure or
//! an error.

use crate::model::{AssertionFailedError, HostException, StackFrame, Throwable, describe};
use rhai::{Dynamic, EvalAltResult, Position};
use std::{collections::HashMap, rc::Rc};

/// The function name used for frames at the top level of a script file.
pub const TOP_LEVEL: &str = "<script>";

/// Where in a script an error was detected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptLocation {
    source: Option<String>,
    line: usize,
    column: Option<usize>,
    line_text: Option<String>,
}

impl ScriptLocation {
    /// Creates a new location. `line` and `column` are 1-based.
    pub fn new(
        source: Option<String>,
        line: usize,
        column: Option<usize>,
        line_text: Option<String>,
    ) -> Self {
        Self {
            source,
            line,
            column,
            line_text,
        }
    }

    /// The name the script was compiled with, if known.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// The 1-based line number.
    pub fn line(&self) -> usize {
        self.line
    }

    /// The 1-based column number, if known.
    pub fn column(&self) -> Option<usize> {
        self.column
    }

    /// The text of the offending line, if the source is known.
    pub fn line_text(&self) -> Option<&str> {
        self.line_text.as_deref()
    }
}

/// A host value thrown by a script with `throw`, or by a host function.
#[derive(Clone, Debug)]
pub enum ThrownValue {
    /// An assertion failure created with `host::assertion_failed`.
    Assertion(AssertionFailedError),

    /// An error raised by a host function such as `readFile`.
    Host(HostException),

    /// A script exception raised while evaluating another file, for example through `load`.
    Script(Box<ScriptException>),
}

/// An exception raised while evaluating a script.
#[derive(Clone, Debug)]
pub struct ScriptException {
    class_name: &'static str,
    details: Option<String>,
    location: Option<ScriptLocation>,
    frames: Vec<StackFrame>,
    thrown: Option<ThrownValue>,
}

impl ScriptException {
    /// The class name for syntax errors.
    pub const PARSE_ERROR: &'static str = "rhai::ParseError";

    /// The class name for all other script errors.
    pub const RUNTIME_ERROR: &'static str = "rhai::EvalAltResult";

    /// The class name: either [`Self::PARSE_ERROR`] or [`Self::RUNTIME_ERROR`].
    pub fn class_name(&self) -> &'static str {
        self.class_name
    }

    /// A description of the error, without position information.
    pub fn message(&self) -> Option<&str> {
        self.details.as_deref()
    }

    /// Where the error was detected, if the engine reported a position.
    pub fn location(&self) -> Option<&ScriptLocation> {
        self.location.as_ref()
    }

    /// Script frames, innermost first.
    pub fn frames(&self) -> &[StackFrame] {
        &self.frames
    }

    /// The host value that was thrown, if any.
    pub fn thrown(&self) -> Option<&ThrownValue> {
        self.thrown.as_ref()
    }

    pub(crate) fn push_frame(&mut self, frame: StackFrame) {
        self.frames.push(frame);
    }
}

/// The texts of the scripts evaluated by a sandbox, and the files each function was declared in.
#[derive(Clone, Debug, Default)]
pub struct SourceTable {
    texts: HashMap<String, Rc<str>>,
    functions: HashMap<String, String>,
}

impl SourceTable {
    /// Records the text a script was compiled from.
    pub fn add_source(&mut self, source: impl Into<String>, text: Rc<str>) {
        self.texts.insert(source.into(), text);
    }

    /// Records the source a function was declared in. Later declarations win.
    pub fn add_function(&mut self, name: impl Into<String>, source: impl Into<String>) {
        self.functions.insert(name.into(), source.into());
    }

    /// Returns the source a function was declared in.
    pub fn function_source(&self, name: &str) -> Option<&str> {
        self.functions.get(name).map(String::as_str)
    }

    /// Returns the text of a 1-based line in a source.
    pub fn line_text(&self, source: &str, line: usize) -> Option<&str> {
        let text = self.texts.get(source)?;
        let line = text.lines().nth(line.checked_sub(1)?)?;
        Some(line.trim_end_matches('\r'))
    }
}

/// Flattens an engine error into a [`ScriptException`].
///
/// `top_source` is the name of the script whose top-level code (or function call) produced the
/// error. Each function call the error passed through becomes a frame positioned at the call site
/// in its caller; the innermost frame is positioned where the error was raised.
pub fn decode(
    err: Box<EvalAltResult>,
    top_source: Option<&str>,
    table: &SourceTable,
) -> ScriptException {
    // Frames are collected outermost first.
    let mut frames = Vec::new();
    let mut function = TOP_LEVEL.to_owned();
    let mut source = top_source.map(str::to_owned);
    let mut current = err;

    loop {
        match *current {
            EvalAltResult::ErrorInFunctionCall(name, src, inner, pos) => {
                if !pos.is_none() {
                    frames.push(script_frame(&function, source.as_deref(), pos));
                }
                source = table
                    .function_source(&name)
                    .map(str::to_owned)
                    .or_else(|| (!src.is_empty()).then_some(src))
                    .or(source);
                function = name;
                current = inner;
            }
            EvalAltResult::ErrorInModule(path, inner, pos) => {
                if !pos.is_none() {
                    frames.push(script_frame(&function, source.as_deref(), pos));
                }
                function = TOP_LEVEL.to_owned();
                source = Some(path);
                current = inner;
            }
            leaf => {
                let pos = leaf.position();
                frames.push(script_frame(&function, source.as_deref(), pos));
                frames.reverse();

                let location = pos.line().map(|line| {
                    let line_text = source
                        .as_deref()
                        .and_then(|source| table.line_text(source, line))
                        .map(str::to_owned);
                    ScriptLocation::new(source.clone(), line, pos.position(), line_text)
                });

                let (class_name, details, thrown) = decode_leaf(leaf);
                return ScriptException {
                    class_name,
                    details,
                    location,
                    frames,
                    thrown,
                };
            }
        }
    }
}

fn decode_leaf(
    mut leaf: EvalAltResult,
) -> (&'static str, Option<String>, Option<ThrownValue>) {
    match leaf {
        EvalAltResult::ErrorRuntime(value, _) => {
            let (details, thrown) = decode_thrown(value);
            (ScriptException::RUNTIME_ERROR, details, thrown)
        }
        EvalAltResult::ErrorParsing(..) => {
            leaf.set_position(Position::NONE);
            (ScriptException::PARSE_ERROR, Some(leaf.to_string()), None)
        }
        _ => {
            leaf.set_position(Position::NONE);
            (ScriptException::RUNTIME_ERROR, Some(leaf.to_string()), None)
        }
    }
}

fn decode_thrown(value: Dynamic) -> (Option<String>, Option<ThrownValue>) {
    if value.is::<AssertionFailedError>() {
        if let Some(failure) = value.try_cast::<AssertionFailedError>() {
            return (
                failure.message().map(str::to_owned),
                Some(ThrownValue::Assertion(failure)),
            );
        }
    } else if value.is::<HostException>() {
        if let Some(exc) = value.try_cast::<HostException>() {
            return (Some(exc.to_string()), Some(ThrownValue::Host(exc)));
        }
    } else if value.is::<ScriptException>() {
        if let Some(exc) = value.try_cast::<ScriptException>() {
            let details = describe(&Throwable::Script(exc.clone()));
            return (Some(details), Some(ThrownValue::Script(Box::new(exc))));
        }
    } else {
        let details = value.to_string();
        return ((!details.is_empty()).then_some(details), None);
    }

    (None, None)
}

fn script_frame(function: &str, source: Option<&str>, pos: Position) -> StackFrame {
    StackFrame::script(
        function,
        source.map(str::to_owned),
        pos.line(),
        pos.position(),
    )
}

/// The result of [`classify`].
#[derive(Clone, Debug)]
pub enum Classified {
    /// The throwable resolved to an assertion failure.
    Failed(AssertionFailedError),

    /// The throwable is an error. This may be a substituted root cause.
    Errored(Throwable),
}

/// Decides whether a raised throwable is a failure or an error.
///
/// Unwrapping goes exactly one level: a script exception whose thrown value is an assertion failure
/// is a failure. If the thrown value is any other host exception, it replaces the script exception
/// as the reported cause, carrying the script frames along.
pub fn classify(throwable: Throwable) -> Classified {
    let exc = match throwable {
        Throwable::AssertionFailed(failure) => return Classified::Failed(failure),
        Throwable::Host(_) => return Classified::Errored(throwable),
        Throwable::Script(exc) => exc,
    };

    let ScriptException {
        class_name,
        details,
        location,
        frames,
        thrown,
    } = exc;

    match thrown {
        Some(ThrownValue::Assertion(failure)) => {
            let mut all_frames = failure.frames().to_vec();
            all_frames.extend(frames);
            Classified::Failed(failure.with_frames(all_frames))
        }
        Some(ThrownValue::Host(mut host)) => {
            host.extend_frames(frames);
            Classified::Errored(Throwable::Host(host))
        }
        Some(ThrownValue::Script(mut inner)) => {
            inner.frames.extend(frames);
            Classified::Errored(Throwable::Script(*inner))
        }
        None => Classified::Errored(Throwable::Script(ScriptException {
            class_name,
            details,
            location,
            frames,
            thrown: None,
        })),
    }
}
