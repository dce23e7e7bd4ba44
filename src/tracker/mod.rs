pub mod http;
pub mod link;
pub mod recording;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::reporter::status::Status;

/// Identifier the reporting service assigned to a launch or item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Level of the service's item hierarchy below the launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ItemKind {
    Suite,
    Test,
    Step,
}

impl ItemKind {
    /// Steps are nested entries and do not count towards statistics.
    pub fn has_stats(self) -> bool {
        self != Self::Step
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Suite => write!(f, "SUITE"),
            Self::Test => write!(f, "TEST"),
            Self::Step => write!(f, "STEP"),
        }
    }
}

/// A launch attribute tag; `key` is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub value: String,
}

/// Defect classification attached to failed tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub issue_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default)]
    pub auto_analyzed: bool,
    #[serde(default)]
    pub ignore_analyzer: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    pub name: String,
    pub description: String,
    pub attributes: Vec<Attribute>,
    pub rerun: bool,
    pub rerun_of: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartItem {
    pub name: String,
    pub kind: ItemKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishItem {
    pub status: Status,
    pub issue: Option<Issue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Fatal => "fatal",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    /// Defaults to the time the log is sent.
    pub time: Option<DateTime<Utc>>,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            time: None,
        }
    }

    pub fn at(mut self, time: DateTime<Utc>) -> Self {
        self.time = Some(time);
        self
    }
}

/// A file uploaded alongside a log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub name: String,
    pub mime: String,
    pub content: Vec<u8>,
}

/// What the service reports back when a launch is finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchFinished {
    pub id: ItemId,
    pub link: Option<String>,
}

/// The remote reporting service, seen as an item tracker.
///
/// Every call blocks until the service answered, so a parent's start has
/// always been acknowledged before a child's start is issued.
pub trait ItemTracker {
    /// Open a launch and return the identifier the service assigned.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError`] if the service is unreachable or refuses the launch.
    fn start_launch(&mut self, launch: &LaunchRequest) -> Result<ItemId, TrackerError>;

    /// Open an item under `parent`, or at the launch root when `parent` is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError`] if the call is rejected.
    fn start_item(
        &mut self,
        launch: &ItemId,
        parent: Option<&ItemId>,
        item: &StartItem,
    ) -> Result<ItemId, TrackerError>;

    /// # Errors
    ///
    /// Returns [`TrackerError`] if the call is rejected.
    fn finish_item(
        &mut self,
        launch: &ItemId,
        item: &ItemId,
        finish: &FinishItem,
    ) -> Result<(), TrackerError>;

    /// # Errors
    ///
    /// Returns [`TrackerError`] if the call is rejected.
    fn send_log(
        &mut self,
        launch: &ItemId,
        item: &ItemId,
        entry: &LogEntry,
        attachment: Option<&Attachment>,
    ) -> Result<(), TrackerError>;

    /// # Errors
    ///
    /// Returns [`TrackerError`] if the call is rejected.
    fn finish_launch(
        &mut self,
        launch: &ItemId,
        status: Status,
    ) -> Result<LaunchFinished, TrackerError>;

    /// Human-readable URL of a launch in the service UI.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError`] if the launch cannot be looked up.
    fn launch_url(&mut self, launch: &ItemId) -> Result<String, TrackerError>;
}

impl<T: ItemTracker + ?Sized> ItemTracker for Box<T> {
    fn start_launch(&mut self, launch: &LaunchRequest) -> Result<ItemId, TrackerError> {
        (**self).start_launch(launch)
    }

    fn start_item(
        &mut self,
        launch: &ItemId,
        parent: Option<&ItemId>,
        item: &StartItem,
    ) -> Result<ItemId, TrackerError> {
        (**self).start_item(launch, parent, item)
    }

    fn finish_item(
        &mut self,
        launch: &ItemId,
        item: &ItemId,
        finish: &FinishItem,
    ) -> Result<(), TrackerError> {
        (**self).finish_item(launch, item, finish)
    }

    fn send_log(
        &mut self,
        launch: &ItemId,
        item: &ItemId,
        entry: &LogEntry,
        attachment: Option<&Attachment>,
    ) -> Result<(), TrackerError> {
        (**self).send_log(launch, item, entry, attachment)
    }

    fn finish_launch(
        &mut self,
        launch: &ItemId,
        status: Status,
    ) -> Result<LaunchFinished, TrackerError> {
        (**self).finish_launch(launch, status)
    }

    fn launch_url(&mut self, launch: &ItemId) -> Result<String, TrackerError> {
        (**self).launch_url(launch)
    }
}

/// Errors from calls to the reporting service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrackerError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("{url} answered {status}: {body}")]
    Rejected {
        url: String,
        status: u16,
        body: String,
    },
    #[error("unexpected response from {url}: {message}")]
    Decode { url: String, message: String },
    #[error("launch {0} is not listed by the service")]
    LaunchNotListed(ItemId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_steps_skip_statistics() {
        assert!(ItemKind::Suite.has_stats());
        assert!(ItemKind::Test.has_stats());
        assert!(!ItemKind::Step.has_stats());
    }

    #[test]
    fn item_kind_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&ItemKind::Step).unwrap(), "\"STEP\"");
        assert_eq!(ItemKind::Suite.to_string(), "SUITE");
    }

    #[test]
    fn issue_uses_camel_case_keys() {
        let issue = Issue {
            issue_type: "ti001".into(),
            comment: None,
            auto_analyzed: false,
            ignore_analyzer: true,
        };
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["issueType"], "ti001");
        assert_eq!(json["ignoreAnalyzer"], true);
        assert!(json.get("comment").is_none());
    }

    #[test]
    fn tracker_error_display() {
        let err = TrackerError::Rejected {
            url: "http://rp/api/v1/demo/item".into(),
            status: 400,
            body: "bad request".into(),
        };
        assert_eq!(
            err.to_string(),
            "http://rp/api/v1/demo/item answered 400: bad request"
        );
        assert_eq!(
            TrackerError::LaunchNotListed(ItemId::new("abc")).to_string(),
            "launch abc is not listed by the service"
        );
    }

    #[test]
    fn log_entry_time_is_optional() {
        let entry = LogEntry::new(LogLevel::Error, "boom");
        assert!(entry.time.is_none());
        let stamped = entry.at(Utc::now());
        assert!(stamped.time.is_some());
        assert_eq!(LogLevel::Error.to_string(), "error");
    }
}
