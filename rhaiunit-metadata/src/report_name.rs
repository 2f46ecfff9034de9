// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// The namespace every report name is prefixed with.
pub const REPORT_NAMESPACE: &str = "rhaiunit";

/// The file suffix stripped from test file names when deriving report names.
pub const SCRIPT_SUFFIX: &str = ".rhai";

/// Derives the report name for a test file as it was given on the command line.
///
/// The script suffix is stripped, path separators become `.`, and the result is prefixed with
/// [`REPORT_NAMESPACE`], so that reports look like Java-style `package.Class` names to CI tools.
/// The base directory is not part of the name.
pub fn report_name(test_file: &str) -> String {
    let stem = test_file.strip_suffix(SCRIPT_SUFFIX).unwrap_or(test_file);
    format!("{REPORT_NAMESPACE}.{}", stem.replace(['/', '\\'], "."))
}

/// Returns the plain-text report file name for a report name.
pub fn plain_report_file_name(report_name: &str) -> String {
    format!("TEST-{report_name}.txt")
}

/// Returns the XML report file name for a report name.
pub fn xml_report_file_name(report_name: &str) -> String {
    format!("TEST-{report_name}.xml")
}
