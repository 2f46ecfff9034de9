// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Running test files from a flat argument list.
//!
//! Arguments are processed left to right:
//!
//! * `-todir <dir>` sets the directory reports are written to, creating it if necessary;
//! * `-basedir <dir>` sets the directory later test files are resolved against;
//! * anything else is a test file, which is run immediately.
//!
//! Each test file produces a plain-text and an XML report named after the file as it was given,
//! without the base directory. See [`report_name`].

use crate::{
    adapter::SuiteAdapter,
    config::RhaiUnitConfig,
    errors::DriverError,
    model::{Test, TestResult},
    reporter::ResultWriter,
    sandbox::{BindingStore, PrintSink, SandboxConfig},
};
use camino::{Utf8Path, Utf8PathBuf};
use rhaiunit_metadata::{
    RhaiUnitExitCode, plain_report_file_name, report_name, xml_report_file_name,
};
use std::{
    fs::File,
    io::{BufWriter, Write},
};
use tracing::debug;

/// The directive that sets the report directory.
pub const TODIR_DIRECTIVE: &str = "-todir";

/// The directive that sets the base directory for test files.
pub const BASEDIR_DIRECTIVE: &str = "-basedir";

/// Runs test files and writes their reports.
#[derive(Debug)]
pub struct Driver {
    config: RhaiUnitConfig,
    bindings: BindingStore,
    print_sink: PrintSink,
}

impl Driver {
    /// Creates a new driver.
    ///
    /// All test files run by this driver share one binding store.
    pub fn new(config: RhaiUnitConfig) -> Self {
        Self {
            config,
            bindings: BindingStore::new(),
            print_sink: PrintSink::default(),
        }
    }

    /// Sends script output to `print_sink` instead of standard output.
    pub fn with_print_sink(mut self, print_sink: PrintSink) -> Self {
        self.print_sink = print_sink;
        self
    }

    /// The binding store shared by all test files.
    pub fn bindings(&self) -> &BindingStore {
        &self.bindings
    }

    /// Processes `args`, writing the console summary of each suite to `summary`.
    ///
    /// Test failures are reported through the returned [`DriverOutcome`]. An error is only
    /// returned if the driver itself cannot continue; files processed before the error keep their
    /// reports.
    pub fn run<I, S>(&self, args: I, summary: &mut dyn Write) -> Result<DriverOutcome, DriverError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let adapter = SuiteAdapter::new(
            SandboxConfig::new()
                .with_resources(self.config.resource_set())
                .with_print_sink(self.print_sink.clone())
                .with_bindings(self.bindings.clone()),
        );

        let mut state = ArgState {
            todir: self.config.todir().to_owned(),
            basedir: None,
        };
        let mut outcome = DriverOutcome::default();

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_ref() {
                TODIR_DIRECTIVE => {
                    let dir = next_value(&mut args, TODIR_DIRECTIVE)?;
                    create_report_dir(&dir)?;
                    debug!("writing reports to {dir}");
                    state.todir = dir;
                }
                BASEDIR_DIRECTIVE => {
                    let dir = next_value(&mut args, BASEDIR_DIRECTIVE)?;
                    debug!("resolving test files against {dir}");
                    state.basedir = Some(dir);
                }
                test_file => {
                    let successful = self.run_file(&adapter, &state, test_file, summary)?;
                    outcome.files_run += 1;
                    if !successful {
                        outcome.failed_files.push(test_file.to_owned());
                    }
                }
            }
        }

        Ok(outcome)
    }

    fn run_file(
        &self,
        adapter: &SuiteAdapter,
        state: &ArgState,
        test_file: &str,
        summary: &mut dyn Write,
    ) -> Result<bool, DriverError> {
        let path = match &state.basedir {
            Some(basedir) => basedir.join(test_file),
            None => Utf8PathBuf::from(test_file),
        };
        let name = report_name(test_file);
        debug!("running {path} as {name}");

        create_report_dir(&state.todir)?;
        let plain = open_report(&state.todir.join(plain_report_file_name(&name)))?;
        let xml = open_report(&state.todir.join(xml_report_file_name(&name)))?;

        let suite = adapter.obtain_tests(path.as_str());

        let write_error = |err| DriverError::WriteReport {
            test_file: test_file.to_owned(),
            err,
        };
        let mut writer = ResultWriter::new()
            .with_summary(summary)
            .with_plain(plain)
            .with_xml(xml)
            .with_filter(self.config.stack_trace_filter().clone());

        writer.start_test_suite(&name).map_err(write_error)?;
        let successful = {
            let mut result = TestResult::new();
            result.add_listener(&mut writer);
            suite.run(&mut result);
            result.was_successful()
        };
        writer.end_test_suite(&name).map_err(write_error)?;

        // Dropping the writer closes both report files.
        Ok(successful)
    }
}

struct ArgState {
    todir: Utf8PathBuf,
    basedir: Option<Utf8PathBuf>,
}

fn next_value<S: AsRef<str>>(
    args: &mut impl Iterator<Item = S>,
    directive: &'static str,
) -> Result<Utf8PathBuf, DriverError> {
    args.next()
        .map(|value| Utf8PathBuf::from(value.as_ref()))
        .ok_or(DriverError::MissingDirectiveValue { directive })
}

fn create_report_dir(dir: &Utf8Path) -> Result<(), DriverError> {
    std::fs::create_dir_all(dir).map_err(|err| DriverError::CreateReportDir {
        dir: dir.to_owned(),
        err,
    })
}

fn open_report(path: &Utf8Path) -> Result<BufWriter<File>, DriverError> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|err| DriverError::OpenReport {
            path: path.to_owned(),
            err,
        })
}

/// The result of a driver run that processed all of its arguments.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DriverOutcome {
    /// The number of test files run.
    pub files_run: usize,

    /// The test files, as given, whose suites reported a failure or an error.
    pub failed_files: Vec<String>,
}

impl DriverOutcome {
    /// Returns true if every suite passed.
    pub fn is_success(&self) -> bool {
        self.failed_files.is_empty()
    }

    /// The process exit code for this outcome.
    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            RhaiUnitExitCode::OK
        } else {
            RhaiUnitExitCode::TEST_RUN_FAILED
        }
    }
}
