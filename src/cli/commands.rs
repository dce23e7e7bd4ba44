use std::io::BufRead;
use std::path::{Path, PathBuf};

use crate::config::ReporterConfig;
use crate::model::BatchResult;
use crate::reporter::events::RunnerEvent;
use crate::reporter::{LaunchReport, Mode, Reporter};
use crate::tracker::ItemTracker;
use crate::tracker::http::{HttpTracker, HttpTrackerConfig};
use crate::tracker::recording::RecordingTracker;

/// Settings given on the command line; they win over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config: Option<PathBuf>,
    pub token: Option<String>,
    pub endpoint: Option<String>,
    pub project: Option<String>,
    pub launch_name: Option<String>,
    pub debug: bool,
}

/// Options for the `stream` command.
#[derive(Debug, Clone, Default)]
pub struct StreamOptions {
    /// NDJSON file to read; stdin when `None`.
    pub input: Option<PathBuf>,
    /// Collect suites and tests and replay them at the end of the run.
    pub workers: bool,
    pub dry_run: bool,
}

/// Read the config file (if any) and layer the command-line settings on top.
///
/// # Errors
///
/// Returns an error string if the config file cannot be read or parsed.
pub fn load_config(overrides: &ConfigOverrides) -> Result<ReporterConfig, String> {
    let mut config = match &overrides.config {
        Some(path) => ReporterConfig::load(path).map_err(|e| e.to_string())?,
        None => ReporterConfig::default(),
    };

    if let Some(token) = &overrides.token {
        config.token.clone_from(token);
    }
    if let Some(endpoint) = &overrides.endpoint {
        config.endpoint.clone_from(endpoint);
    }
    if let Some(project) = &overrides.project {
        config.project_name.clone_from(project);
    }
    if let Some(name) = &overrides.launch_name {
        config.launch_name.clone_from(name);
    }
    config.debug |= overrides.debug;
    Ok(config)
}

/// Run the `check` command: validate the config and print it with the token masked.
///
/// # Errors
///
/// Returns an error string naming the first missing required key.
pub fn run_check(config: &ReporterConfig) -> Result<String, String> {
    config.validate().map_err(|e| e.to_string())?;
    let yaml = serde_yaml::to_string(&config.redacted())
        .map_err(|e| format!("failed to render config: {e}"))?;
    Ok(format!("✅ Configuration is valid\n{yaml}"))
}

/// Run the `replay` command: report a coordinator's result file as one launch.
///
/// # Errors
///
/// Returns an error string if the file cannot be read or decoded, or the config is invalid.
pub fn run_replay(config: &ReporterConfig, file: &Path, dry_run: bool) -> Result<String, String> {
    let input = std::fs::read_to_string(file)
        .map_err(|e| format!("failed to read {}: {e}", file.display()))?;
    let batch: BatchResult =
        serde_json::from_str(&input).map_err(|e| format!("{}: {e}", file.display()))?;
    let event = RunnerEvent::WorkersResult { result: batch };

    if dry_run {
        let mut reporter = Reporter::new(config, RecordingTracker::new(), Mode::Aggregated)
            .map_err(|e| e.to_string())?;
        reporter.handle(event).map_err(|e| e.to_string())?;
        let mut output = summary(config, reporter.report());
        output.push_str(&recorded_calls(reporter.tracker())?);
        Ok(output)
    } else {
        let mut reporter = Reporter::new(config, http_tracker(config), Mode::Aggregated)
            .map_err(|e| e.to_string())?;
        reporter.handle(event).map_err(|e| e.to_string())?;
        Ok(summary(config, reporter.report()))
    }
}

/// Run the `stream` command: forward NDJSON runner events as they are read.
///
/// # Errors
///
/// Returns an error string if the input cannot be read, the config is
/// invalid, or a live launch cannot be started.
pub fn run_stream(config: &ReporterConfig, options: &StreamOptions) -> Result<String, String> {
    let mode = if options.workers {
        Mode::Aggregated
    } else {
        Mode::Live
    };

    let input: Box<dyn BufRead> = match &options.input {
        Some(path) => {
            let file = std::fs::File::open(path)
                .map_err(|e| format!("failed to open {}: {e}", path.display()))?;
            Box::new(std::io::BufReader::new(file))
        }
        None => Box::new(std::io::stdin().lock()),
    };

    if options.dry_run {
        let mut reporter =
            Reporter::new(config, RecordingTracker::new(), mode).map_err(|e| e.to_string())?;
        report_events(&mut reporter, input)?;
        let mut output = summary(config, reporter.report());
        output.push_str(&recorded_calls(reporter.tracker())?);
        Ok(output)
    } else {
        let mut reporter =
            Reporter::new(config, http_tracker(config), mode).map_err(|e| e.to_string())?;
        report_events(&mut reporter, input)?;
        Ok(summary(config, reporter.report()))
    }
}

/// Feed every NDJSON line of `input` to the reporter. Returns the number of events handled.
///
/// Blank lines are ignored; lines that are not a known event are skipped with a warning.
///
/// # Errors
///
/// Returns an error string if reading fails or the reporter gives up.
pub fn report_events<T: ItemTracker>(
    reporter: &mut Reporter<T>,
    input: impl BufRead,
) -> Result<usize, String> {
    let mut handled = 0;
    for (index, line) in input.lines().enumerate() {
        let line = line.map_err(|e| format!("failed to read events: {e}"))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let event = match RunnerEvent::from_json_line(line) {
            Ok(event) => event,
            Err(err) => {
                tracing::warn!(line = index + 1, %err, "skipping unreadable event");
                continue;
            }
        };
        reporter.handle(event).map_err(|e| e.to_string())?;
        handled += 1;
    }
    Ok(handled)
}

fn http_tracker(config: &ReporterConfig) -> HttpTracker {
    HttpTracker::new(HttpTrackerConfig::from_config(config))
}

/// Lines printed after a run: where results went and the launch link.
pub fn summary(config: &ReporterConfig, report: Option<&LaunchReport>) -> String {
    let mut out = format!(
        "📋 Writing results to ReportPortal: Project Name: {} > RP Endpoint: {}\n",
        config.project_name, config.endpoint
    );
    match report {
        Some(report) => {
            if let Some(url) = &report.url {
                out.push_str(&format!("📋 ReportPortal Launch Link: {url}\n"));
            }
            out.push_str(&format!(
                "📋 Launch {} finished: {}\n",
                report.launch, report.status
            ));
        }
        None => out.push_str("⚠️ No launch was reported\n"),
    }
    out
}

fn recorded_calls(tracker: &RecordingTracker) -> Result<String, String> {
    serde_yaml::to_string(tracker.calls()).map_err(|e| format!("failed to render calls: {e}"))
}
