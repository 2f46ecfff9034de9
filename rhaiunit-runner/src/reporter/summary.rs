// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The console summary.

use super::suite_run::{FinishedSuite, Outcome};
use crate::{stack_trace::format_error, time::format_seconds};
use std::io::{self, Write};

pub(super) fn write_header(out: &mut dyn Write, name: &str) -> io::Result<()> {
    writeln!(out, "Running {name}")
}

pub(super) fn write_summary(out: &mut dyn Write, suite: &FinishedSuite) -> io::Result<()> {
    writeln!(
        out,
        "Tests run: {}, Failures: {}, Errors: {}, Time elapsed: {}",
        suite.tests.len(),
        suite.failure_count(),
        suite.error_count(),
        format_seconds(suite.elapsed),
    )?;

    for record in &suite.tests {
        match &record.outcome {
            Outcome::Passed => {}
            Outcome::Failed(failure) => writeln!(
                out,
                "Test {}\n\tFAILED: {}",
                record.description,
                failure.message().unwrap_or_default(),
            )?,
            Outcome::Errored(error) => writeln!(
                out,
                "Test {}\n\tERROR: {}",
                record.description,
                format_error(None, None, error),
            )?,
        }
    }

    out.flush()
}
