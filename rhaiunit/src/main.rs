// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use clap::Parser;
use color_eyre::Result;
use rhaiunit::RhaiUnitApp;
use rhaiunit_metadata::RhaiUnitExitCode;
use std::panic::AssertUnwindSafe;

fn main() -> Result<()> {
    color_eyre::install()?;
    let _ = enable_ansi_support::enable_ansi_support();

    let app = RhaiUnitApp::parse();
    let output = app.init_output();

    let result =
        std::panic::catch_unwind(AssertUnwindSafe(|| app.exec(&mut std::io::stdout().lock())));
    match result {
        Ok(Ok(code)) => std::process::exit(code),
        Ok(Err(error)) => {
            error.display_to_stderr(&output.stderr_styles());
            std::process::exit(error.process_exit_code())
        }
        // The panic hook has already printed the report.
        Err(_) => std::process::exit(RhaiUnitExitCode::DRIVER_ERROR),
    }
}
