use serde::{Deserialize, Serialize};

use crate::model::{BatchResult, ErrorPayload, Step, TestCase};
use crate::tracker::LogLevel;

/// Lifecycle event emitted by the host test runner.
///
/// Read as one JSON object per line, tagged by `"event"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunnerEvent {
    RunStarted,
    RunFinished,
    SuiteStarted {
        title: String,
    },
    SuiteFinished {
        #[serde(default)]
        title: Option<String>,
    },
    TestStarted {
        test: TestCase,
    },
    TestPassed {
        test: TestCase,
    },
    TestFailed {
        test: TestCase,
        /// Overrides the error recorded on the test, if given.
        #[serde(default)]
        error: Option<ErrorPayload>,
    },
    TestSkipped {
        test: TestCase,
    },
    TestFinished {
        test: TestCase,
    },
    StepStarted {
        step: Step,
    },
    StepPassed {
        step: Step,
    },
    StepFailed {
        step: Step,
    },
    StepFinished {
        step: Step,
    },
    Log {
        #[serde(default = "default_level")]
        level: LogLevel,
        message: String,
    },
    WorkersResult {
        result: BatchResult,
    },
}

fn default_level() -> LogLevel {
    LogLevel::Info
}

impl RunnerEvent {
    /// Parse one NDJSON line.
    ///
    /// # Errors
    ///
    /// Returns the decoder error if the line is not a known event.
    pub fn from_json_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::RunStarted => "run_started",
            Self::RunFinished => "run_finished",
            Self::SuiteStarted { .. } => "suite_started",
            Self::SuiteFinished { .. } => "suite_finished",
            Self::TestStarted { .. } => "test_started",
            Self::TestPassed { .. } => "test_passed",
            Self::TestFailed { .. } => "test_failed",
            Self::TestSkipped { .. } => "test_skipped",
            Self::TestFinished { .. } => "test_finished",
            Self::StepStarted { .. } => "step_started",
            Self::StepPassed { .. } => "step_passed",
            Self::StepFailed { .. } => "step_failed",
            Self::StepFinished { .. } => "step_finished",
            Self::Log { .. } => "log",
            Self::WorkersResult { .. } => "workers_result",
        }
    }
}
