use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Terminal status of a report item, as understood by the reporting service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Passed,
    Failed,
    Skipped,
    Interrupted,
    Cancelled,
    Info,
    Warn,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "PASSED",
            Self::Failed => "FAILED",
            Self::Skipped => "SKIPPED",
            Self::Interrupted => "INTERRUPTED",
            Self::Cancelled => "CANCELLED",
            Self::Info => "INFO",
            Self::Warn => "WARN",
        }
    }

    pub fn is_failed(self) -> bool {
        self == Self::Failed
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raw status string that does not name any known status.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized status \"{0}\"")]
pub struct UnknownStatus(pub String);

/// Map a runner status spelling onto [`Status`], ignoring case.
///
/// The runner reports a passing step as `success`; the service's own names
/// are accepted as well so already-normalized values survive a round trip.
///
/// # Errors
///
/// Returns [`UnknownStatus`] for anything else.
pub fn normalize(raw: &str) -> Result<Status, UnknownStatus> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "success" | "passed" => Ok(Status::Passed),
        "failed" => Ok(Status::Failed),
        "skipped" | "pending" => Ok(Status::Skipped),
        "interrupted" => Ok(Status::Interrupted),
        "cancelled" | "canceled" => Ok(Status::Cancelled),
        "info" => Ok(Status::Info),
        "warn" => Ok(Status::Warn),
        _ => Err(UnknownStatus(raw.to_owned())),
    }
}

/// Normalize an optional raw status, falling back when it is absent or unknown.
pub fn normalize_or(raw: Option<&str>, fallback: Status) -> Status {
    let Some(raw) = raw else {
        return fallback;
    };
    normalize(raw).unwrap_or_else(|err| {
        tracing::warn!(%err, %fallback, "falling back to default status");
        fallback
    })
}

impl FromStr for Status {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        normalize(s)
    }
}

/// Aggregate status of a container (launch or suite).
///
/// Starts out passed and can only be downgraded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Verdict {
    failed: bool,
}

impl Verdict {
    pub fn passed() -> Self {
        Self::default()
    }

    pub fn fail(&mut self) {
        self.failed = true;
    }

    /// Fold a child status in; only a failure has any effect.
    pub fn absorb(&mut self, status: Status) {
        if status.is_failed() {
            self.fail();
        }
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    pub fn status(&self) -> Status {
        if self.failed {
            Status::Failed
        } else {
            Status::Passed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_maps_to_passed_in_any_case() {
        assert_eq!(normalize("success"), Ok(Status::Passed));
        assert_eq!(normalize("SUCCESS"), Ok(Status::Passed));
        assert_eq!(normalize("Success"), Ok(Status::Passed));
    }

    #[test]
    fn failed_maps_to_failed_in_any_case() {
        assert_eq!(normalize("failed"), Ok(Status::Failed));
        assert_eq!(normalize("FAILED"), Ok(Status::Failed));
    }

    #[test]
    fn service_names_are_accepted() {
        assert_eq!(normalize("PASSED"), Ok(Status::Passed));
        assert_eq!(normalize("skipped"), Ok(Status::Skipped));
        assert_eq!(normalize("interrupted"), Ok(Status::Interrupted));
        assert_eq!(normalize("canceled"), Ok(Status::Cancelled));
    }

    #[test]
    fn unknown_status_is_reported_not_panicked() {
        let err = normalize("exploded").unwrap_err();
        assert_eq!(err, UnknownStatus("exploded".into()));
        assert_eq!(err.to_string(), "unrecognized status \"exploded\"");
    }

    #[test]
    fn normalize_or_uses_fallback_for_missing_and_unknown() {
        assert_eq!(normalize_or(None, Status::Passed), Status::Passed);
        assert_eq!(normalize_or(Some("weird"), Status::Skipped), Status::Skipped);
        assert_eq!(normalize_or(Some("failed"), Status::Passed), Status::Failed);
    }

    #[test]
    fn from_str_delegates_to_normalize() {
        let status: Status = "Failed".parse().unwrap();
        assert_eq!(status, Status::Failed);
        assert!("nope".parse::<Status>().is_err());
    }

    #[test]
    fn status_display_uses_service_spelling() {
        assert_eq!(Status::Passed.to_string(), "PASSED");
        assert_eq!(Status::Failed.to_string(), "FAILED");
        assert_eq!(Status::Skipped.to_string(), "SKIPPED");
    }

    #[test]
    fn status_serializes_uppercase() {
        let json = serde_json::to_string(&Status::Cancelled).unwrap();
        assert_eq!(json, "\"CANCELLED\"");
    }

    #[test]
    fn verdict_starts_passed() {
        let verdict = Verdict::passed();
        assert!(!verdict.is_failed());
        assert_eq!(verdict.status(), Status::Passed);
    }

    #[test]
    fn verdict_never_upgrades_after_failure() {
        let mut verdict = Verdict::passed();
        verdict.absorb(Status::Passed);
        assert_eq!(verdict.status(), Status::Passed);
        verdict.absorb(Status::Failed);
        verdict.absorb(Status::Passed);
        verdict.absorb(Status::Skipped);
        assert_eq!(verdict.status(), Status::Failed);
    }
}
