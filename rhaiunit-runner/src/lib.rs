// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core functionality for [rhaiunit](https://crates.io/crates/rhaiunit), a test runner for
//! [Rhai](https://rhai.rs) scripts that writes JUnit-style reports.
//!
//! The basic flow of operations is:
//!
//! 1. The [driver](driver) walks its argument list, and for each test file:
//! 2. the [adapter](adapter) evaluates the file inside a fresh [sandbox](sandbox), and unwraps the
//!    suite the script builds into the host [test model](model);
//! 3. the suite is run against a [`ResultWriter`](reporter::ResultWriter), which
//!    [classifies](boundary::classify) every outcome and renders the summary, plain and XML reports.

pub mod adapter;
pub mod boundary;
pub mod config;
pub mod driver;
pub mod errors;
pub mod model;
pub mod reporter;
pub mod sandbox;
pub mod stack_trace;
mod time;
