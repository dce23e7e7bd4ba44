pub mod aggregate;
pub mod artifacts;
pub mod context;
pub mod display;
pub mod events;
pub mod journal;
pub mod metasteps;
pub mod replay;
pub mod session;
pub mod status;

use crate::config::ReporterConfig;
use crate::error::{ConfigError, ReportError};
use crate::model::{ErrorPayload, Outcome, Step, TestCase};
use crate::reporter::aggregate::Aggregator;
use crate::reporter::context::{ActiveStep, RunContext};
use crate::reporter::display::{failed_step_message, live_step_title};
use crate::reporter::events::RunnerEvent;
use crate::reporter::journal::Journal;
use crate::reporter::replay::ReplayOptions;
use crate::reporter::session::Session;
use crate::reporter::status::{Status, normalize_or};
use crate::tracker::{ItemId, ItemKind, ItemTracker, LogEntry, LogLevel};

/// How suite and test events are turned into items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Every event is forwarded as it arrives.
    Live,
    /// Events are collected and replayed when the run finishes.
    Aggregated,
}

/// Outcome of a finished launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchReport {
    pub launch: ItemId,
    pub status: Status,
    /// UI link, when it could be resolved.
    pub url: Option<String>,
}

/// Forwards runner events to an [`ItemTracker`].
pub struct Reporter<T> {
    config: ReporterConfig,
    mode: Mode,
    session: Session<T>,
    context: RunContext,
    aggregator: Aggregator,
    options: ReplayOptions,
    report: Option<LaunchReport>,
}

impl<T: ItemTracker> Reporter<T> {
    /// Build a reporter; the config is checked before anything else happens.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] if a required key is empty.
    pub fn new(config: &ReporterConfig, tracker: T, mode: Mode) -> Result<Self, ConfigError> {
        config.validate()?;
        let journal = if config.enabled {
            Journal::open(&config.output_dir)
        } else {
            Journal::disabled()
        };
        Ok(Self {
            config: config.clone(),
            mode,
            session: Session::new(tracker, journal),
            context: RunContext::new(),
            aggregator: Aggregator::new(),
            options: ReplayOptions::from_config(config),
            report: None,
        })
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The last launch this reporter finished.
    pub fn report(&self) -> Option<&LaunchReport> {
        self.report.as_ref()
    }

    pub fn tracker(&self) -> &T {
        self.session.tracker()
    }

    pub fn into_tracker(self) -> T {
        self.session.into_tracker()
    }

    /// Process one runner event.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Connection`] if a live launch cannot be started.
    /// Every other failure is logged and reporting continues.
    pub fn handle(&mut self, event: RunnerEvent) -> Result<(), ReportError> {
        if !self.config.enabled {
            return Ok(());
        }
        tracing::trace!(event = event.name(), "runner event");

        match event {
            RunnerEvent::WorkersResult { result } => {
                self.aggregator.absorb(result);
                self.replay_collected();
            }
            RunnerEvent::RunStarted if self.mode == Mode::Live => self.run_started()?,
            RunnerEvent::RunFinished if self.mode == Mode::Live => self.run_finished(),
            RunnerEvent::RunFinished => {
                if !self.aggregator.is_empty() {
                    self.replay_collected();
                }
            }
            event if self.mode == Mode::Aggregated => self.collect(event),
            RunnerEvent::SuiteStarted { title } => self.suite_started(&title),
            RunnerEvent::SuiteFinished { .. } => self.suite_finished(),
            RunnerEvent::TestStarted { test } => self.test_started(&test),
            RunnerEvent::TestPassed { .. } => self.finish_test(Status::Passed),
            RunnerEvent::TestSkipped { .. } => self.finish_test(Status::Skipped),
            RunnerEvent::TestFailed { test, error } => self.test_failed(&test, error),
            RunnerEvent::TestFinished { .. } => self.test_finished(),
            RunnerEvent::StepStarted { step } => self.step_started(&step),
            RunnerEvent::StepPassed { .. } => {
                self.context.meta_steps.mark_passed();
                self.settle_failed_step();
            }
            RunnerEvent::StepFailed { .. } => self.step_failed(),
            RunnerEvent::StepFinished { step } => self.step_finished(&step),
            RunnerEvent::Log { level, message } => self.forward_log(level, message),
            RunnerEvent::RunStarted => {}
        }
        Ok(())
    }

    fn collect(&mut self, event: RunnerEvent) {
        match event {
            RunnerEvent::SuiteStarted { title } => self.aggregator.record_suite(&title),
            RunnerEvent::TestPassed { test } => self.aggregator.record_test(Outcome::Passed, test),
            RunnerEvent::TestSkipped { test } => {
                self.aggregator.record_test(Outcome::Skipped, test);
            }
            RunnerEvent::TestFailed { mut test, error } => {
                if error.is_some() {
                    test.error = error;
                }
                self.aggregator.record_test(Outcome::Failed, test);
            }
            other => tracing::trace!(event = other.name(), "not needed for replay"),
        }
    }

    fn replay_collected(&mut self) {
        let result = self.aggregator.flush();
        let request = self.config.launch_request();
        self.announce();
        let report = replay::run(&mut self.session, &request, &result, &self.options);
        if let Some(report) = report {
            self.publish(report);
        }
    }

    fn announce(&self) {
        tracing::info!(
            project = %self.config.project_name,
            endpoint = %self.config.endpoint,
            "writing results to ReportPortal"
        );
    }

    fn publish(&mut self, report: LaunchReport) {
        match &report.url {
            Some(url) => tracing::info!(launch = %report.launch, status = %report.status, %url, "launch finished"),
            None => tracing::info!(launch = %report.launch, status = %report.status, "launch finished"),
        }
        self.report = Some(report);
    }

    fn run_started(&mut self) -> Result<(), ReportError> {
        self.announce();
        let request = self.config.launch_request();
        self.session
            .start_launch(&request)
            .map_err(ReportError::Connection)?;
        self.context = RunContext::new();

        match self.session.launch_url() {
            Some(url) => tracing::info!(%url, "launch started"),
            None => tracing::warn!("launch started, but its link is unavailable"),
        }
        Ok(())
    }

    fn run_finished(&mut self) {
        if self.context.suite.is_some() {
            self.suite_finished();
        }
        let Some(launch) = self.session.launch().cloned() else {
            tracing::warn!("run finished without a launch");
            return;
        };
        let status = self.context.launch_status.status();
        let finished = self.session.finish_launch(status);
        let url = self
            .session
            .launch_url()
            .or_else(|| finished.and_then(|f| f.link));
        self.publish(LaunchReport {
            launch,
            status,
            url,
        });
    }

    fn suite_started(&mut self, title: &str) {
        let suite = self.session.start_item(None, title, ItemKind::Suite);
        self.context.begin_suite(suite);
    }

    fn suite_finished(&mut self) {
        if let Some(suite) = self.context.suite.take() {
            let status = self.context.suite_status.status();
            self.session.finish_item(&suite, status, None);
        }
    }

    fn test_started(&mut self, test: &TestCase) {
        self.context.begin_test();
        let parent = self.context.suite.clone();
        self.context.test = self
            .session
            .start_item(parent.as_ref(), &test.title, ItemKind::Test);
    }

    fn finish_test(&mut self, status: Status) {
        let Some(test) = self.context.test.clone() else {
            return;
        };
        self.close_children();
        self.session.finish_item(&test, status, None);
    }

    /// Finish everything still open below the test, innermost first.
    fn close_children(&mut self) {
        self.settle_failed_step();
        self.context.meta_steps.close_all(&mut self.session);
    }

    fn test_failed(&mut self, test: &TestCase, error: Option<ErrorPayload>) {
        self.context.fail_test();
        let Some(test_item) = self.context.test.clone() else {
            tracing::warn!(test = %test.title, "failed test was never started");
            return;
        };
        let detail = error
            .as_ref()
            .or(test.error.as_ref())
            .map(|e| e.describe())
            .unwrap_or_else(|| "test failed".to_owned());

        match self.context.failed_step.clone() {
            Some(step) => {
                let entry = LogEntry::new(LogLevel::Error, failed_step_message(&detail))
                    .at(step.started_at);
                self.session.send_log(&step.item, entry, None);
                if let Some(shot) = artifacts::screenshot(test, &self.options.output_dir) {
                    let caption = LogEntry::new(
                        LogLevel::Info,
                        artifacts::ArtifactKind::Screenshot.caption(),
                    )
                    .at(step.started_at);
                    self.session.send_log(&step.item, caption, Some(&shot));
                }
            }
            None => {
                self.session
                    .send_log(&test_item, LogEntry::new(LogLevel::Error, detail), None);
            }
        }

        self.close_children();
        let issue = self.config.issue.clone();
        self.session
            .finish_item(&test_item, Status::Failed, issue.as_ref());
    }

    fn test_finished(&mut self) {
        // Normally a no-op: the terminal test event already closed the children.
        self.close_children();
        self.context.step = None;
        self.context.test = None;
    }

    fn step_started(&mut self, step: &Step) {
        let Some(test_item) = self.context.test.clone() else {
            tracing::debug!(step = %step.context(), "step outside a test, not reported");
            return;
        };
        let chain = step.nesting_chain();
        let parent = self
            .context
            .meta_steps
            .reconcile(&mut self.session, &chain, &test_item);
        self.context.step = self
            .session
            .start_item(Some(&parent), &live_step_title(step), ItemKind::Step)
            .map(ActiveStep::now);
    }

    fn step_failed(&mut self) {
        self.context.meta_steps.mark_failed();
        let current = self.context.step.clone();
        let same_step = match (&self.context.failed_step, &current) {
            (Some(failed), Some(current)) => failed.item == current.item,
            _ => false,
        };
        if !same_step {
            self.settle_failed_step();
        }
        self.context.failed_step = current;
    }

    /// Finish the remembered failed step, if it is still open.
    fn settle_failed_step(&mut self) {
        if let Some(step) = self.context.failed_step.take()
            && self.session.is_open(&step.item)
        {
            self.session.finish_item(&step.item, Status::Failed, None);
        }
    }

    fn step_finished(&mut self, step: &Step) {
        let Some(active) = self.context.step.take() else {
            return;
        };
        let status = normalize_or(step.status.as_deref(), Status::Passed);
        let is_failed_step = self
            .context
            .failed_step
            .as_ref()
            .is_some_and(|failed| failed.item == active.item);
        // The failed step stays open for the error log and is finished with the test.
        if !is_failed_step {
            self.session.finish_item(&active.item, status, None);
        }
    }

    fn forward_log(&mut self, level: LogLevel, message: String) {
        match self.context.log_target().cloned() {
            Some(item) => {
                self.session.send_log(&item, LogEntry::new(level, message), None);
            }
            None => tracing::debug!(%level, text = %message, "no open item for runner output"),
        }
    }
}
