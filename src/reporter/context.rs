use chrono::{DateTime, Utc};

use crate::reporter::metasteps::MetaSteps;
use crate::reporter::status::Verdict;
use crate::tracker::ItemId;

/// A step item started on the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveStep {
    pub item: ItemId,
    pub started_at: DateTime<Utc>,
}

impl ActiveStep {
    pub fn now(item: ItemId) -> Self {
        Self {
            item,
            started_at: Utc::now(),
        }
    }
}

/// Mutable state of a live run.
///
/// Holds the items currently open on the service and the aggregate
/// statuses of the launch and the current suite. Owned by one reporter.
#[derive(Debug, Default)]
pub struct RunContext {
    pub suite: Option<ItemId>,
    pub test: Option<ItemId>,
    /// Step currently between its start and finish events.
    pub step: Option<ActiveStep>,
    /// Last step that failed in the current test; finished at test end.
    pub failed_step: Option<ActiveStep>,
    pub meta_steps: MetaSteps,
    pub launch_status: Verdict,
    pub suite_status: Verdict,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the previous test's pointers before a new one starts.
    pub fn begin_test(&mut self) {
        self.meta_steps.reset();
        self.test = None;
        self.step = None;
        self.failed_step = None;
    }

    pub fn begin_suite(&mut self, suite: Option<ItemId>) {
        self.suite = suite;
        self.suite_status = Verdict::passed();
    }

    /// Record a failed test against the suite and the launch.
    pub fn fail_test(&mut self) {
        self.suite_status.fail();
        self.launch_status.fail();
    }

    /// Item that runner output should be attached to: the running step, else the test.
    pub fn log_target(&self) -> Option<&ItemId> {
        self.step
            .as_ref()
            .map(|step| &step.item)
            .or(self.test.as_ref())
    }
}
