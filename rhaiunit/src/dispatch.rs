// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    ExpectedError, Result,
    output::{OutputContext, OutputOpts},
};
use camino::Utf8PathBuf;
use clap::Parser;
use rhaiunit_runner::{config::RhaiUnitConfig, driver::Driver};
use std::io::Write;
use tracing::{debug, info};

/// Runs Rhai test scripts and writes plain-text and XML reports for each one.
///
/// Arguments are processed in order. `-todir <dir>` and `-basedir <dir>` stay in effect until
/// they're given again; every other argument is a test script, which is run right away.
///
/// Settings are read from `.config/rhaiunit.toml` in the current directory and from `RHAIUNIT_*`
/// environment variables. Set `RHAIUNIT_LOG` to control logging.
#[derive(Debug, Parser)]
#[command(
    version = crate::version::short(),
    long_version = crate::version::long(),
    styles = crate::output::clap_styles::style(),
    override_usage = "rhaiunit [ -todir <dir> | -basedir <dir> | <scriptFile> ]*",
    max_term_width = 100,
)]
pub struct RhaiUnitApp {
    #[clap(flatten)]
    output: OutputOpts,

    /// Directives and test scripts
    #[arg(
        value_name = "ARGS",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    args: Vec<String>,
}

impl RhaiUnitApp {
    /// Initializes the output context.
    pub fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the app, writing the console summary of each suite to `summary`.
    ///
    /// Returns the process exit code.
    pub fn exec(self, summary: &mut dyn Write) -> Result<i32> {
        let cwd = std::env::current_dir()
            .map_err(|err| ExpectedError::CurrentDirFailed { err })?;
        let cwd = Utf8PathBuf::try_from(cwd)
            .map_err(|err| ExpectedError::CurrentDirInvalidUtf8 { err })?;
        let config = RhaiUnitConfig::from_env(&cwd)?;
        self.run(config, summary)
    }

    fn run(&self, config: RhaiUnitConfig, summary: &mut dyn Write) -> Result<i32> {
        debug!("reports go to {} unless -todir is given", config.todir());

        let driver = Driver::new(config);
        let outcome = driver.run(&self.args, summary)?;

        if !outcome.is_success() {
            info!(
                "{} of {} test files had failures or errors",
                outcome.failed_files.len(),
                outcome.files_run,
            );
        }
        Ok(outcome.exit_code())
    }
}
