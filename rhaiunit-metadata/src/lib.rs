// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Structured constants shared between `rhaiunit` and tools that consume its output.
//!
//! The exit codes are stable: build-tool wrappers branch on them to distinguish test failures from
//! problems with the runner itself.

mod exit_codes;
mod report_name;

pub use exit_codes::*;
pub use report_name::*;
