// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::{NO_HEADING_TARGET, StderrStyles};
use camino::FromPathBufError;
use owo_colors::OwoColorize;
use rhaiunit_metadata::RhaiUnitExitCode;
use rhaiunit_runner::errors::{ConfigParseError, DriverError};
use std::error::Error;
use thiserror::Error;
use tracing::error;

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

// The #[error()] strings are placeholders. Errors are meant to be printed with display_to_stderr,
// which colorizes them.

/// An error that stops rhaiunit before every test file has been run.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("could not determine the current directory")]
    CurrentDirFailed {
        #[source]
        err: std::io::Error,
    },
    #[error("current directory is not valid UTF-8")]
    CurrentDirInvalidUtf8 {
        #[source]
        err: FromPathBufError,
    },
    #[error("config parse error")]
    ConfigParseError {
        #[from]
        err: ConfigParseError,
    },
    #[error("driver error")]
    DriverError {
        #[from]
        err: DriverError,
    },
}

impl ExpectedError {
    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::CurrentDirFailed { .. }
            | Self::CurrentDirInvalidUtf8 { .. }
            | Self::ConfigParseError { .. }
            | Self::DriverError { .. } => RhaiUnitExitCode::DRIVER_ERROR,
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match &self {
            Self::CurrentDirFailed { err } => {
                error!("could not determine the current directory");
                Some(err as &dyn Error)
            }
            Self::CurrentDirInvalidUtf8 { err } => {
                error!(
                    "current directory `{}` is not valid UTF-8",
                    err.as_path().display().style(styles.bold)
                );
                None
            }
            Self::ConfigParseError { err } => {
                error!(
                    "failed to parse rhaiunit config at `{}`",
                    err.config_file().style(styles.bold)
                );
                Some(err.kind() as &dyn Error)
            }
            Self::DriverError { err } => match err {
                DriverError::MissingDirectiveValue { directive } => {
                    error!(
                        "`{}` must be followed by a directory",
                        directive.style(styles.bold)
                    );
                    None
                }
                DriverError::CreateReportDir { dir, err } => {
                    error!(
                        "error creating report directory `{}`",
                        dir.style(styles.bold)
                    );
                    Some(err as &dyn Error)
                }
                DriverError::OpenReport { path, err } => {
                    error!("error opening report file `{}`", path.style(styles.bold));
                    Some(err as &dyn Error)
                }
                DriverError::WriteReport { test_file, err } => {
                    error!(
                        "error writing reports for `{}`",
                        test_file.style(styles.bold)
                    );
                    Some(err as &dyn Error)
                }
                other => {
                    error!("{other}");
                    other.source()
                }
            },
        };

        while let Some(err) = next_error {
            error!(target: NO_HEADING_TARGET, "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}
