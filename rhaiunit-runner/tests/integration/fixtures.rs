// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::{Utf8Path, Utf8PathBuf};
use camino_tempfile::Utf8TempDir;
use color_eyre::eyre::{Result, WrapErr};
use regex::Regex;
use rhaiunit_runner::{
    config::{DefaultConfigWarnings, RhaiUnitConfig},
    driver::{Driver, DriverOutcome},
    errors::DriverError,
    sandbox::PrintSink,
};
use std::sync::LazyLock;

pub(crate) static FIXTURES_DIR: LazyLock<Utf8PathBuf> = LazyLock::new(|| {
    Utf8Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .expect("crate has a parent directory")
        .join("fixtures/rhaiunit-tests")
});

static TIME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\.\d{3}").expect("time regex is valid"));
static TIMESTAMP_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}").expect("timestamp regex is valid")
});

/// A driver run against the fixtures directory.
pub(crate) struct FixtureRun {
    /// Scratch directory the run happens in. Reports go to `reports` within it by default.
    pub(crate) dir: Utf8TempDir,
    pub(crate) driver: Driver,
    pub(crate) summary: String,
    pub(crate) printed: String,
    pub(crate) result: Result<DriverOutcome, DriverError>,
}

impl FixtureRun {
    /// Runs the driver with `-todir <scratch>/reports -basedir <fixtures>` followed by `args`.
    pub(crate) fn new(args: &[&str]) -> Result<Self> {
        let dir = Utf8TempDir::new().wrap_err("failed to create temp dir")?;
        let config = RhaiUnitConfig::from_sources(
            dir.path(),
            None,
            [(
                "RHAIUNIT_RESOURCE_DIRS".to_owned(),
                FIXTURES_DIR.as_str().to_owned(),
            )],
            &mut DefaultConfigWarnings,
        )?;

        let (sink, printed) = PrintSink::buffer();
        let driver = Driver::new(config).with_print_sink(sink);

        let reports = dir.path().join("reports");
        let mut full_args = vec![
            "-todir",
            reports.as_str(),
            "-basedir",
            FIXTURES_DIR.as_str(),
        ];
        full_args.extend_from_slice(args);

        let mut summary = Vec::new();
        let result = driver.run(full_args, &mut summary);
        let summary = String::from_utf8(summary).wrap_err("summary is not UTF-8")?;
        let printed = printed.borrow().clone();

        Ok(Self {
            dir,
            driver,
            summary,
            printed,
            result,
        })
    }

    pub(crate) fn reports_dir(&self) -> Utf8PathBuf {
        self.dir.path().join("reports")
    }

    /// Reads a report from the reports directory, with all times replaced by `T` and timestamps by
    /// `TS`.
    pub(crate) fn read_report(&self, file_name: &str) -> Result<String> {
        let path = self.reports_dir().join(file_name);
        let text = std::fs::read_to_string(&path)
            .wrap_err_with(|| format!("failed to read report {path}"))?;
        Ok(normalize_times(&text))
    }

    /// The full path of a fixture file, which is also its test class name.
    pub(crate) fn fixture_path(file: &str) -> String {
        FIXTURES_DIR.join(file).into_string()
    }
}

pub(crate) fn normalize_times(text: &str) -> String {
    let text = TIMESTAMP_REGEX.replace_all(text, "TS");
    TIME_REGEX.replace_all(&text, "T").into_owned()
}
