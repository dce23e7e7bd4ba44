use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::model::step::Step;
use crate::model::{null_as_default, step_slots};
use crate::reporter::status::Status;

/// Reference to a suite by title; titles identify suites within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteRef {
    pub title: String,
}

impl SuiteRef {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }
}

/// Captured failure payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ErrorPayload {
    pub fn from_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }

    /// The stack trace if there is one, otherwise the payload as JSON.
    pub fn describe(&self) -> String {
        match &self.stack {
            Some(stack) if !stack.is_empty() => stack.clone(),
            _ => serde_json::to_string(self).unwrap_or_else(|_| "{}".to_owned()),
        }
    }
}

/// Failure artifacts recorded for a test.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactBundle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<PathBuf>,
}

impl ArtifactBundle {
    pub fn is_empty(&self) -> bool {
        self.screenshot.is_none() && self.video.is_none() && self.trace.is_none()
    }
}

/// One test case. `steps` may hold falsy placeholders, read as `None`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestCase {
    pub title: String,
    #[serde(default)]
    pub parent: Option<SuiteRef>,
    #[serde(default, rename = "err", alias = "error")]
    pub error: Option<ErrorPayload>,
    #[serde(default, deserialize_with = "step_slots")]
    pub steps: Vec<Option<Step>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub artifacts: ArtifactBundle,
}

impl TestCase {
    pub fn new(title: impl Into<String>, suite: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            parent: Some(SuiteRef::new(suite)),
            ..Self::default()
        }
    }

    pub fn with_steps(mut self, steps: Vec<Step>) -> Self {
        self.steps = steps.into_iter().map(Some).collect();
        self
    }

    pub fn with_error(mut self, error: ErrorPayload) -> Self {
        self.error = Some(error);
        self
    }

    pub fn suite_title(&self) -> Option<&str> {
        self.parent.as_ref().map(|p| p.title.as_str())
    }
}

/// Terminal outcome bucket of a test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Passed,
    Failed,
    Skipped,
}

impl Outcome {
    /// Replay order of the buckets.
    pub const ORDER: [Outcome; 3] = [Outcome::Passed, Outcome::Failed, Outcome::Skipped];

    pub fn status(self) -> Status {
        match self {
            Self::Passed => Status::Passed,
            Self::Failed => Status::Failed,
            Self::Skipped => Status::Skipped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn describe_prefers_stack() {
        let err = ErrorPayload {
            message: Some("boom".into()),
            stack: Some("Error: boom\n    at login.js:3".into()),
            ..ErrorPayload::default()
        };
        assert_eq!(err.describe(), "Error: boom\n    at login.js:3");
    }

    #[test]
    fn describe_falls_back_to_json() {
        let err: ErrorPayload =
            serde_json::from_value(json!({"message": "expected 200", "actual": 404})).unwrap();
        let text = err.describe();
        assert!(text.contains("\"message\":\"expected 200\""));
        assert!(text.contains("\"actual\":404"));
    }

    #[test]
    fn test_case_deserializes_null_steps_and_artifacts() {
        let test: TestCase = serde_json::from_value(json!({
            "title": "T1",
            "parent": {"title": "S1"},
            "steps": [null],
            "artifacts": null
        }))
        .unwrap();
        assert_eq!(test.suite_title(), Some("S1"));
        assert_eq!(test.steps.len(), 1);
        assert!(test.steps[0].is_none());
        assert!(test.artifacts.is_empty());
    }

    #[test]
    fn falsy_step_placeholders_read_as_absent() {
        for placeholder in [json!(null), json!(false), json!(0), json!(""), json!(0.0)] {
            let test: TestCase = serde_json::from_value(json!({
                "title": "T1",
                "steps": [{"name": "amOnPage"}, placeholder]
            }))
            .unwrap();
            assert_eq!(test.steps.len(), 2);
            assert_eq!(test.steps[0].as_ref().unwrap().name, "amOnPage");
            assert!(test.steps[1].is_none(), "placeholder {placeholder}");
        }
    }

    #[test]
    fn null_step_list_reads_as_empty() {
        let test: TestCase = serde_json::from_value(json!({"title": "T1", "steps": null})).unwrap();
        assert!(test.steps.is_empty());
    }

    #[test]
    fn truthy_non_object_step_is_rejected() {
        let err = serde_json::from_value::<TestCase>(json!({"title": "T1", "steps": [true]}))
            .unwrap_err();
        assert!(err.to_string().contains("expected a step object"));
    }

    #[test]
    fn test_case_reads_err_field() {
        let test: TestCase = serde_json::from_value(json!({
            "title": "T2",
            "err": {"message": "nope", "stack": "Error: nope"}
        }))
        .unwrap();
        assert_eq!(test.error.as_ref().unwrap().stack.as_deref(), Some("Error: nope"));
        assert_eq!(test.suite_title(), None);
    }

    #[test]
    fn outcome_order_is_passed_failed_skipped() {
        assert_eq!(
            Outcome::ORDER,
            [Outcome::Passed, Outcome::Failed, Outcome::Skipped]
        );
        assert_eq!(Outcome::Skipped.status(), Status::Skipped);
    }
}
