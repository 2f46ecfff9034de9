// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The JUnit-style XML report.
//!
//! The layout follows the Ant JUnit task's XML formatter, which most CI systems understand: a
//! single `<testsuite>` with a `<properties>` block and one `<testcase>` per test.

use super::suite_run::{FinishedSuite, Outcome};
use crate::{
    model::Throwable,
    stack_trace::{StackTraceFilter, format_error},
    time::{format_seconds, format_timestamp},
};
use quick_xml::escape::escape;
use std::{
    collections::BTreeMap,
    io::{self, Write},
};

pub(super) fn write_report(
    out: &mut dyn Write,
    suite: &FinishedSuite,
    properties: &BTreeMap<String, String>,
    filter: &StackTraceFilter,
) -> io::Result<()> {
    writeln!(out, r#"<?xml version="1.0" encoding="UTF-8" ?>"#)?;
    writeln!(
        out,
        r#"<testsuite name="{}" tests="{}" errors="{}" failures="{}" time="{}" skipped="0" timestamp="{}">"#,
        escape(suite.name.as_str()),
        suite.tests.len(),
        suite.error_count(),
        suite.failure_count(),
        format_seconds(suite.elapsed),
        format_timestamp(suite.started),
    )?;

    writeln!(out, "  <properties>")?;
    for (name, value) in properties {
        writeln!(
            out,
            r#"    <property name="{}" value="{}"/>"#,
            escape(name.as_str()),
            escape(value.as_str()),
        )?;
    }
    writeln!(out, "  </properties>")?;

    for record in &suite.tests {
        write!(
            out,
            r#"  <testcase classname="{}" name="{}" time="{}""#,
            escape(record.description.class_name()),
            escape(record.description.name()),
            format_seconds(record.duration),
        )?;

        let (element, throwable, text) = match &record.outcome {
            Outcome::Passed => {
                writeln!(out, "/>")?;
                continue;
            }
            Outcome::Failed(failure) => {
                // Failures carry the filtered stack, errors the full dump.
                let throwable = Throwable::from(failure.clone());
                let text = filter.filter_stack_trace(&throwable.stack_dump());
                ("failure", throwable, text)
            }
            Outcome::Errored(error) => ("error", error.clone(), format_error(None, None, error)),
        };

        writeln!(out, ">")?;
        writeln!(
            out,
            r#"    <{element} type="{}" message="{}">{}</{element}>"#,
            escape(throwable.class_name()),
            escape(throwable.message().unwrap_or_default()),
            escape(text.as_str()),
        )?;
        writeln!(out, "  </testcase>")?;
    }

    write!(out, "</testsuite>")?;
    out.flush()
}
