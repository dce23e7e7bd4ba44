use std::path::PathBuf;

use crate::tracker::TrackerError;

/// Invalid or unreadable reporter configuration. Always fatal.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reporter config is invalid: key `{field}` is missing (required fields: {})", .required.join(", "))]
    MissingField {
        field: &'static str,
        required: &'static [&'static str],
    },
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },
}

/// Errors that escape the reporter. Everything else is logged and absorbed.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("can't connect to the reporting service: {0}")]
    Connection(#[source] TrackerError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_names_field_and_required_set() {
        let err = ConfigError::MissingField {
            field: "token",
            required: &["projectName", "token", "endpoint"],
        };
        assert_eq!(
            err.to_string(),
            "reporter config is invalid: key `token` is missing (required fields: projectName, token, endpoint)"
        );
    }

    #[test]
    fn connection_error_wraps_tracker_error() {
        let err = ReportError::Connection(TrackerError::Transport {
            url: "http://rp/api/v1/demo/launch".into(),
            message: "connection refused".into(),
        });
        assert!(err.to_string().starts_with("can't connect to the reporting service"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn config_error_converts_into_report_error() {
        let err: ReportError = ConfigError::Parse {
            path: PathBuf::from("rp.yaml"),
            message: "bad indent".into(),
        }
        .into();
        assert_eq!(err.to_string(), "failed to parse config rp.yaml: bad indent");
    }
}
