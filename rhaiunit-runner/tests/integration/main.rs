// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests that run the fixture scripts in `fixtures/rhaiunit-tests` through the driver
//! and check the reports it writes.

mod basic;
mod fixtures;
