use serde::{Deserialize, Serialize};

use crate::model::test::{Outcome, SuiteRef, TestCase};

/// Test cases grouped by outcome, each bucket in arrival order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TestBuckets {
    pub passed: Vec<TestCase>,
    pub failed: Vec<TestCase>,
    pub skipped: Vec<TestCase>,
}

impl TestBuckets {
    pub fn bucket(&self, outcome: Outcome) -> &[TestCase] {
        match outcome {
            Outcome::Passed => &self.passed,
            Outcome::Failed => &self.failed,
            Outcome::Skipped => &self.skipped,
        }
    }

    pub fn bucket_mut(&mut self, outcome: Outcome) -> &mut Vec<TestCase> {
        match outcome {
            Outcome::Passed => &mut self.passed,
            Outcome::Failed => &mut self.failed,
            Outcome::Skipped => &mut self.skipped,
        }
    }

    pub fn len(&self) -> usize {
        self.passed.len() + self.failed.len() + self.skipped.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Result object assembled by a multi-worker coordinator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchResult {
    pub suites: Vec<SuiteRef>,
    pub tests: TestBuckets,
}

/// Aggregated run, ready for replay. Suite titles are unique.
#[derive(Debug, Clone, Default)]
pub struct NormalizedResult {
    pub suites: Vec<String>,
    pub tests: TestBuckets,
}

impl NormalizedResult {
    pub fn has_failures(&self) -> bool {
        !self.tests.failed.is_empty()
    }
}
