// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runs Rhai test scripts and writes their reports.
//!
//! ```text
//! rhaiunit [ -todir <dir> | -basedir <dir> | <scriptFile> ]*
//! ```
//!
//! Arguments are processed left to right. `-todir` and `-basedir` stay in effect until they're
//! given again, and every other argument is a test script that is run right away. See
//! [`rhaiunit_runner::driver`] for details.

#![warn(missing_docs)]

mod dispatch;
mod errors;
mod output;
mod version;

#[doc(hidden)]
pub use dispatch::*;
#[doc(hidden)]
pub use errors::*;
#[doc(hidden)]
pub use output::{Color, OutputContext, StderrStyles};
