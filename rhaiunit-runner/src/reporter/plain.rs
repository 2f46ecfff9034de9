// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The plain-text report.

use super::suite_run::{FinishedSuite, Outcome};
use crate::{
    model::Throwable,
    stack_trace::{StackTraceFilter, format_error},
    time::format_seconds,
};
use std::io::{self, Write};

pub(super) fn write_header(out: &mut dyn Write, name: &str) -> io::Result<()> {
    writeln!(out, "Testsuite: {name}")
}

pub(super) fn write_report(
    out: &mut dyn Write,
    suite: &FinishedSuite,
    filter: &StackTraceFilter,
) -> io::Result<()> {
    writeln!(
        out,
        "Tests run: {}, Failures: {}, Errors: {}, Time elapsed: {}\n",
        suite.tests.len(),
        suite.failure_count(),
        suite.error_count(),
        format_seconds(suite.elapsed),
    )?;

    for record in &suite.tests {
        writeln!(
            out,
            "Testcase: {} took {} sec",
            record.description,
            format_seconds(record.duration),
        )?;
        match &record.outcome {
            Outcome::Passed => {}
            Outcome::Failed(failure) => {
                let dump = Throwable::from(failure.clone()).stack_dump();
                writeln!(out, "\tFAILED")?;
                writeln!(out, "{}", filter.filter_stack_trace(&dump))?;
            }
            Outcome::Errored(error) => {
                writeln!(out, "\tCaused an ERROR")?;
                writeln!(out, "{}", format_error(None, None, error))?;
            }
        }
    }

    out.flush()
}
