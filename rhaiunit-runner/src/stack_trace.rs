// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stack trace filtering and error message formatting.
//!
//! Stack dumps of failing tests contain frames from the runner itself, from the engine and from the
//! bootstrap script. [`StackTraceFilter`] removes those so that failure reports point at the test.

use crate::{errors::ConfigParseErrorKind, model::Throwable};
use regex::RegexSet;
use swrite::{SWrite, swrite};

/// The built-in noise patterns, matched against individual lines of a stack dump.
pub const DEFAULT_FILTERS: &[&str] = &[
    // The host test model and the rest of the runner.
    r"^\s*at rhaiunit_runner::",
    // Engine call trampolines.
    r"^\s*at rhai::",
    // The bootstrap script's own frames.
    r"^\s*at .*\(rhaiunit\.rhai:",
    // Native host primitives.
    r"^\s*at .* \[native\]$",
    // Build tool and runtime frames.
    r"^\s*at (core::ops::function|std::panicking|std::rt|cargo::)",
];

/// Removes noise lines from stack dumps.
#[derive(Clone, Debug)]
pub struct StackTraceFilter {
    patterns: RegexSet,
}

impl StackTraceFilter {
    /// Creates a filter from the built-in patterns plus `extra` patterns.
    pub fn new<I, S>(extra: I) -> Result<Self, ConfigParseErrorKind>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut patterns: Vec<String> = DEFAULT_FILTERS.iter().map(|&p| p.to_owned()).collect();
        for pattern in extra {
            let pattern = pattern.as_ref();
            // Validate patterns individually so the error names the bad one.
            regex::Regex::new(pattern).map_err(|err| {
                ConfigParseErrorKind::InvalidStackTraceFilter {
                    pattern: pattern.to_owned(),
                    err,
                }
            })?;
            patterns.push(pattern.to_owned());
        }

        let patterns = RegexSet::new(&patterns).map_err(|err| {
            ConfigParseErrorKind::InvalidStackTraceFilter {
                pattern: patterns.join(" | "),
                err,
            }
        })?;
        Ok(Self { patterns })
    }

    /// Returns true if a stack dump line is noise.
    pub fn is_noise(&self, line: &str) -> bool {
        self.patterns.is_match(line)
    }

    /// Removes noise lines from a stack dump.
    ///
    /// Every kept line is followed by a newline. Filtering an already filtered dump returns it
    /// unchanged.
    pub fn filter_stack_trace(&self, dump: &str) -> String {
        let mut out = String::with_capacity(dump.len());
        for line in dump.lines() {
            if !self.is_noise(line) {
                out.push_str(line);
                out.push('\n');
            }
        }
        out
    }
}

impl Default for StackTraceFilter {
    fn default() -> Self {
        Self {
            patterns: RegexSet::new(DEFAULT_FILTERS).expect("default filters are valid"),
        }
    }
}

/// Formats an error for display in reports.
///
/// Script errors with a known location render as
///
/// ```text
///
/// "<source>", line <L>: <details>
/// <line text>
/// ........^
/// ```
///
/// where `<source>` is `source_name` if given, or else the source the error was raised in. The
/// caret line is only written when the line text is known. Other errors render as `fallback`
/// followed by a newline, if given. In both cases the full, unfiltered stack dump follows.
pub fn format_error(fallback: Option<&str>, source_name: Option<&str>, cause: &Throwable) -> String {
    let mut out = String::new();

    if let Some(location) = cause.script_location() {
        let details = cause.message().unwrap_or_default();
        match source_name.or(location.source()) {
            Some(source) => swrite!(out, "\n\"{source}\", line {}: {details}", location.line()),
            None => swrite!(out, "\nline {}: {details}", location.line()),
        }
        match location.line_text() {
            Some(text) => {
                let column = location.column().unwrap_or(1);
                swrite!(out, "\n{text}\n{}^\n", ".".repeat(column.saturating_sub(1)));
            }
            None => out.push('\n'),
        }
    } else if let Some(fallback) = fallback {
        out.push_str(fallback);
        out.push('\n');
    }

    out.push_str(&cause.stack_dump());
    out
}
