// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by rhaiunit.
//!
//! Errors that happen *inside* a test file never show up here: they are converted into
//! [`Throwable`](crate::model::Throwable)s and reported as test outcomes. The types in this module
//! describe failures of the runner itself.

use camino::Utf8PathBuf;
use config::ConfigError;
use std::{error::Error, fmt};
use thiserror::Error;

/// An error that occurred while resolving a path through the filesystem and the bundled resource
/// namespace.
///
/// Returned by [`ResourceSet::resolve`](crate::sandbox::ResourceSet::resolve), and thrown into
/// scripts by `load` and `readFile`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ResourceError {
    /// The path was not found as a file, as a resource, or as a resource with a leading `/`.
    #[error("could not find file: {path}")]
    NotFound {
        /// The path as it was requested.
        path: String,
    },

    /// The path was found, but reading it failed.
    #[error("error reading `{path}`")]
    Read {
        /// The location that was read.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        err: std::io::Error,
    },
}

impl ResourceError {
    /// Returns the host class name used for this error when it is reported as a test outcome.
    pub fn class_name(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "rhaiunit::ResourceNotFound",
            Self::Read { .. } => "std::io::Error",
        }
    }
}

/// An error that occurred while parsing rhaiunit config.
#[derive(Debug, Error)]
#[error("failed to parse rhaiunit config at `{config_file}`")]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Utf8PathBuf,
    #[source]
    kind: ConfigParseErrorKind,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: impl Into<Utf8PathBuf>, kind: ConfigParseErrorKind) -> Self {
        Self {
            config_file: config_file.into(),
            kind,
        }
    }

    /// Returns the config file that failed to parse.
    pub fn config_file(&self) -> &Utf8PathBuf {
        &self.config_file
    }

    /// Returns the kind of error that occurred.
    pub fn kind(&self) -> &ConfigParseErrorKind {
        &self.kind
    }
}

/// The kind of error that occurred while parsing config.
///
/// Returned by [`ConfigParseError::kind`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigParseErrorKind {
    /// An error occurred while building the config.
    #[error(transparent)]
    BuildError(Box<ConfigError>),

    /// An error occurred while deserializing the config.
    #[error(transparent)]
    DeserializeError(Box<serde_path_to_error::Error<ConfigError>>),

    /// A stack trace filter in the config is not a valid regular expression.
    #[error("invalid stack trace filter `{pattern}`")]
    InvalidStackTraceFilter {
        /// The pattern that failed to compile.
        pattern: String,

        /// The underlying error.
        #[source]
        err: regex::Error,
    },
}

/// An error that occurred while writing a report.
#[derive(Debug, Error)]
#[error("error writing {kind} report")]
pub struct ReportWriteError {
    kind: ReportKind,
    #[source]
    err: std::io::Error,
}

impl ReportWriteError {
    pub(crate) fn new(kind: ReportKind, err: std::io::Error) -> Self {
        Self { kind, err }
    }

    /// Returns the report that could not be written.
    pub fn kind(&self) -> ReportKind {
        self.kind
    }
}

/// One of the three report outputs.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ReportKind {
    /// The console summary.
    Summary,

    /// The plain-text report file.
    Plain,

    /// The XML report file.
    Xml,
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Summary => write!(f, "summary"),
            Self::Plain => write!(f, "plain"),
            Self::Xml => write!(f, "XML"),
        }
    }
}

/// An error that stops a driver run.
///
/// Test failures never produce this error; see [`DriverOutcome`](crate::driver::DriverOutcome).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DriverError {
    /// A directive was the last argument, with no value after it.
    #[error("`{directive}` must be followed by a directory")]
    MissingDirectiveValue {
        /// The directive, for example `-todir`.
        directive: &'static str,
    },

    /// The report directory could not be created.
    #[error("error creating report directory `{dir}`")]
    CreateReportDir {
        /// The directory.
        dir: Utf8PathBuf,

        /// The underlying error.
        #[source]
        err: std::io::Error,
    },

    /// A report file could not be opened.
    #[error("error opening report file `{path}`")]
    OpenReport {
        /// The report file.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        err: std::io::Error,
    },

    /// A report could not be written for a test file.
    #[error("error writing reports for `{test_file}`")]
    WriteReport {
        /// The test file whose reports failed.
        test_file: String,

        /// The underlying error.
        #[source]
        err: ReportWriteError,
    },
}

/// Displays an error along with its chain of causes.
///
/// The first line is the error itself, and each source follows on its own line, indented and
/// prefixed with `caused by:`.
pub struct DisplayErrorChain<E> {
    error: E,
}

impl<E: Error> DisplayErrorChain<E> {
    /// Creates a new `DisplayErrorChain` for the given error.
    pub fn new(error: E) -> Self {
        Self { error }
    }
}

impl<E: Error> fmt::Display for DisplayErrorChain<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        let mut source = self.error.source();
        while let Some(err) = source {
            write!(f, "\n  caused by: {err}")?;
            source = err.source();
        }

        Ok(())
    }
}
