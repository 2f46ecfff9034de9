// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Documented exit codes for `rhaiunit` runs.
///
/// A run processes every test file it is given, so a failing file never stops the ones after it.
/// The exit code summarizes all of them.
pub enum RhaiUnitExitCode {}

impl RhaiUnitExitCode {
    /// Every suite ran and reported no failures or errors.
    pub const OK: i32 = 0;

    /// One or more suites reported a failure or an error.
    ///
    /// This includes suites that could not be loaded: those are reported as a single failing
    /// `warning` test.
    pub const TEST_RUN_FAILED: i32 = 1;

    /// The runner itself failed, for example because a directive was missing its value or a report
    /// file could not be written.
    pub const DRIVER_ERROR: i32 = 2;
}
