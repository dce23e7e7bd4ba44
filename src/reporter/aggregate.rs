use std::collections::HashSet;

use crate::model::{BatchResult, NormalizedResult, Outcome, TestBuckets, TestCase};

/// Collects a run's suites and test outcomes for a later replay.
#[derive(Debug, Default)]
pub struct Aggregator {
    suites: Vec<String>,
    seen: HashSet<String>,
    tests: TestBuckets,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.suites.is_empty() && self.tests.is_empty()
    }

    /// Note a suite title; repeats are ignored.
    pub fn record_suite(&mut self, title: &str) {
        if self.seen.insert(title.to_owned()) {
            self.suites.push(title.to_owned());
        }
    }

    pub fn record_test(&mut self, outcome: Outcome, test: TestCase) {
        self.tests.bucket_mut(outcome).push(test);
    }

    /// Merge a coordinator's batch into what was collected so far.
    pub fn absorb(&mut self, batch: BatchResult) {
        let BatchResult { suites, tests } = batch;
        for suite in &suites {
            self.record_suite(&suite.title);
        }
        self.tests.passed.extend(tests.passed);
        self.tests.failed.extend(tests.failed);
        self.tests.skipped.extend(tests.skipped);
    }

    /// Hand over everything collected, leaving the aggregator empty.
    pub fn flush(&mut self) -> NormalizedResult {
        self.seen.clear();
        NormalizedResult {
            suites: std::mem::take(&mut self.suites),
            tests: std::mem::take(&mut self.tests),
        }
    }
}
