use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::ReporterConfig;
use crate::model::{NormalizedResult, Outcome, Step, TestCase};
use crate::reporter::LaunchReport;
use crate::reporter::artifacts;
use crate::reporter::display::{failed_step_message, replay_step_title, test_summary};
use crate::reporter::session::Session;
use crate::reporter::status::{Status, normalize_or};
use crate::tracker::{Issue, ItemId, ItemKind, ItemTracker, LaunchRequest, LogEntry, LogLevel};

/// Settings for replaying an aggregated run.
#[derive(Debug, Clone)]
pub struct ReplayOptions {
    /// Classification sent with every failed test.
    pub issue: Option<Issue>,
    /// Where failure artifacts are looked up.
    pub output_dir: PathBuf,
    /// Pause before each step item is started.
    pub step_delay: Duration,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            issue: None,
            output_dir: PathBuf::from("output"),
            step_delay: Duration::from_millis(1),
        }
    }
}

impl ReplayOptions {
    pub fn from_config(config: &ReporterConfig) -> Self {
        Self {
            issue: config.issue.clone(),
            output_dir: config.output_dir.clone(),
            step_delay: config.step_delay(),
        }
    }
}

/// Start a launch, replay `result` into it and finish it.
///
/// Returns `None` when the launch could not be started; the batch is
/// then dropped.
pub fn run<T: ItemTracker>(
    session: &mut Session<T>,
    request: &LaunchRequest,
    result: &NormalizedResult,
    options: &ReplayOptions,
) -> Option<LaunchReport> {
    let launch = match session.start_launch(request) {
        Ok(id) => id,
        Err(err) => {
            tracing::error!(%err, tests = result.tests.len(), "can't start launch, batch not reported");
            return None;
        }
    };

    let status = replay(session, result, options);
    let finished = session.finish_launch(status);
    let url = session
        .launch_url()
        .or_else(|| finished.and_then(|f| f.link));
    Some(LaunchReport {
        launch,
        status,
        url,
    })
}

/// Replay an aggregated run into the current launch and return the launch status.
///
/// 1. Every suite is started and finished right away.
/// 2. Tests are started, summarized and finished: passed, then failed, then skipped.
/// 3. Steps of each replayed test are sent in capture order.
pub fn replay<T: ItemTracker>(
    session: &mut Session<T>,
    result: &NormalizedResult,
    options: &ReplayOptions,
) -> Status {
    let launch_status = if result.has_failures() {
        Status::Failed
    } else {
        Status::Passed
    };

    // 1. Suites, all with the batch-wide status
    let mut suites: HashMap<&str, ItemId> = HashMap::with_capacity(result.suites.len());
    for title in &result.suites {
        if let Some(item) = session.start_item(None, title, ItemKind::Suite) {
            session.finish_item(&item, launch_status, None);
            suites.insert(title.as_str(), item);
        }
    }

    // 2. Tests
    let mut replayed = Vec::with_capacity(result.tests.len());
    for outcome in Outcome::ORDER {
        for test in result.tests.bucket(outcome) {
            let Some(suite) = test.suite_title().and_then(|title| suites.get(title)) else {
                tracing::error!(test = %test.title, suite = ?test.suite_title(), "no suite item for test, skipping it");
                session
                    .journal()
                    .record(format!("test '{}' skipped: no matching suite", test.title));
                continue;
            };
            let Some(item) = session.start_item(Some(suite), &test.title, ItemKind::Test) else {
                continue;
            };

            let level = if outcome == Outcome::Failed {
                LogLevel::Error
            } else {
                LogLevel::Info
            };
            session.send_log(&item, LogEntry::new(level, test_summary(outcome, test)), None);

            let issue = match outcome {
                Outcome::Failed => options.issue.as_ref(),
                _ => None,
            };
            session.finish_item(&item, outcome.status(), issue);
            replayed.push((test, item));
        }
    }

    // 3. Steps
    for (test, item) in &replayed {
        replay_steps(session, test, item, options);
    }

    launch_status
}

fn replay_steps<T: ItemTracker>(
    session: &mut Session<T>,
    test: &TestCase,
    test_item: &ItemId,
    options: &ReplayOptions,
) {
    for slot in &test.steps {
        let Some(step) = slot else {
            break;
        };
        let status = normalize_or(step.status.as_deref(), Status::Passed);

        std::thread::sleep(options.step_delay);
        let title = replay_step_title(step, status);
        let Some(item) = session.start_item(Some(test_item), &title, ItemKind::Step) else {
            continue;
        };

        if status.is_failed() {
            report_failed_step(session, test, step, &item, options);
        }
        session.finish_item(&item, status, None);
    }
}

/// Error log and failure artifacts, sent before the step is finished.
fn report_failed_step<T: ItemTracker>(
    session: &mut Session<T>,
    test: &TestCase,
    step: &Step,
    item: &ItemId,
    options: &ReplayOptions,
) {
    let detail = step
        .error
        .as_ref()
        .or(test.error.as_ref())
        .map(|e| e.describe())
        .unwrap_or_else(|| "step failed".to_owned());
    session.send_log(
        item,
        LogEntry::new(LogLevel::Error, failed_step_message(&detail)),
        None,
    );

    for (kind, attachment) in artifacts::collect(test, &options.output_dir) {
        session.send_log(
            item,
            LogEntry::new(LogLevel::Info, kind.caption()),
            Some(&attachment),
        );
    }
}
