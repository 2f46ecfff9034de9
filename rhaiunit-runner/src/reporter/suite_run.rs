// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Accumulated state for one suite run.

use crate::{
    model::{AssertionFailedError, TestDescription, Throwable},
    time::{StopwatchStart, stopwatch},
};
use chrono::{DateTime, Local};
use debug_ignore::DebugIgnore;
use indexmap::IndexMap;
use std::time::Duration;

/// The outcome of a single test.
#[derive(Clone, Debug)]
pub(super) enum Outcome {
    Passed,
    Failed(AssertionFailedError),
    Errored(Throwable),
}

#[derive(Clone, Debug)]
pub(super) struct TestRecord {
    pub(super) description: TestDescription,
    pub(super) duration: Duration,
    pub(super) outcome: Outcome,
}

/// The state of a suite that is currently running.
#[derive(Debug)]
pub(super) struct SuiteRun {
    stopwatch: StopwatchStart,
    // Keyed by the rendered test identity. A test that runs twice keeps its first position, and
    // the later run replaces its duration and outcome.
    tests: DebugIgnore<IndexMap<String, TestRecord>>,
    running: Option<(String, StopwatchStart)>,
}

impl SuiteRun {
    pub(super) fn new() -> Self {
        Self {
            stopwatch: stopwatch(),
            tests: DebugIgnore(IndexMap::new()),
            running: None,
        }
    }

    pub(super) fn start_test(&mut self, test: &TestDescription) {
        let id = test.to_string();
        self.tests.insert(
            id.clone(),
            TestRecord {
                description: test.clone(),
                duration: Duration::ZERO,
                outcome: Outcome::Passed,
            },
        );
        self.running = Some((id, stopwatch()));
    }

    pub(super) fn end_test(&mut self, test: &TestDescription) {
        let id = test.to_string();
        let duration = match self.running.take() {
            Some((running, start)) if running == id => start.snapshot().duration,
            _ => Duration::ZERO,
        };
        if let Some(record) = self.tests.get_mut(&id) {
            record.duration = duration;
        }
    }

    pub(super) fn set_outcome(&mut self, test: &TestDescription, outcome: Outcome) {
        let record = self
            .tests
            .entry(test.to_string())
            .or_insert_with(|| TestRecord {
                description: test.clone(),
                duration: Duration::ZERO,
                outcome: Outcome::Passed,
            });
        if matches!(record.outcome, Outcome::Passed) {
            record.outcome = outcome;
        }
    }

    /// Stops the suite clock. The elapsed time is computed exactly once, here.
    pub(super) fn finish(self, name: &str) -> FinishedSuite {
        let snapshot = self.stopwatch.snapshot();
        FinishedSuite {
            name: name.to_owned(),
            started: snapshot.start_time,
            elapsed: snapshot.duration,
            tests: self.tests.0.into_values().collect(),
        }
    }
}

/// A suite that has finished running, rendered into each report.
#[derive(Clone, Debug)]
pub(super) struct FinishedSuite {
    pub(super) name: String,
    pub(super) started: DateTime<Local>,
    pub(super) elapsed: Duration,
    pub(super) tests: Vec<TestRecord>,
}

impl FinishedSuite {
    pub(super) fn failure_count(&self) -> usize {
        self.tests
            .iter()
            .filter(|record| matches!(record.outcome, Outcome::Failed(_)))
            .count()
    }

    pub(super) fn error_count(&self) -> usize {
        self.tests
            .iter()
            .filter(|record| matches!(record.outcome, Outcome::Errored(_)))
            .count()
    }
}
