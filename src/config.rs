use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::model::SECRET_MASK;
use crate::tracker::{Attribute, Issue, LaunchRequest};

/// Keys that must be present before any event is processed.
pub const REQUIRED_FIELDS: &[&str] = &["projectName", "token", "endpoint"];

/// Reporter settings, as read from a YAML or JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReporterConfig {
    pub token: String,
    /// API base, e.g. `https://rp.example.com/api/v1`.
    pub endpoint: String,
    #[serde(alias = "project")]
    pub project_name: String,
    pub launch_name: String,
    pub launch_description: String,
    #[serde(alias = "launchAttributes")]
    pub attributes: Vec<Attribute>,
    pub debug: bool,
    pub rerun: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rerun_of: Option<String>,
    pub enabled: bool,
    /// Classification sent with every failed test.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue: Option<Issue>,
    /// Where artifacts are looked up and the diagnostic log is written.
    pub output_dir: PathBuf,
    /// Pause before each replayed step item.
    pub step_delay_ms: u64,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            endpoint: String::new(),
            project_name: String::new(),
            launch_name: "automated tests".to_owned(),
            launch_description: String::new(),
            attributes: Vec::new(),
            debug: false,
            rerun: false,
            rerun_of: None,
            enabled: true,
            issue: None,
            output_dir: PathBuf::from("output"),
            step_delay_ms: 1,
        }
    }
}

impl ReporterConfig {
    /// Read a config file; `.json` files are parsed as JSON, anything else as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let input = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let parsed = if is_json {
            serde_json::from_str(&input).map_err(|e| e.to_string())
        } else {
            serde_yaml::from_str(&input).map_err(|e| e.to_string())
        };

        parsed.map_err(|message| ConfigError::Parse {
            path: path.to_owned(),
            message,
        })
    }

    /// Check that every required key has a value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] naming the first empty key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let values = [
            ("projectName", &self.project_name),
            ("token", &self.token),
            ("endpoint", &self.endpoint),
        ];
        for (field, value) in values {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingField {
                    field,
                    required: REQUIRED_FIELDS,
                });
            }
        }
        Ok(())
    }

    pub fn launch_request(&self) -> LaunchRequest {
        LaunchRequest {
            name: self.launch_name.clone(),
            description: self.launch_description.clone(),
            attributes: self.attributes.clone(),
            rerun: self.rerun,
            rerun_of: self.rerun_of.clone(),
        }
    }

    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }

    /// Copy safe to print: the token is masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.token.is_empty() {
            copy.token = SECRET_MASK.to_owned();
        }
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn valid() -> ReporterConfig {
        ReporterConfig {
            token: "tok".into(),
            endpoint: "https://rp.example.com/api/v1".into(),
            project_name: "demo".into(),
            ..ReporterConfig::default()
        }
    }

    #[test]
    fn defaults() {
        let config = ReporterConfig::default();
        assert_eq!(config.launch_name, "automated tests");
        assert!(config.enabled);
        assert!(!config.debug);
        assert_eq!(config.output_dir, PathBuf::from("output"));
        assert_eq!(config.step_delay(), Duration::from_millis(1));
    }

    #[test]
    fn valid_config_passes() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn each_required_field_is_enforced() {
        let cases: [(&str, fn(&mut ReporterConfig)); 3] = [
            ("projectName", |c| c.project_name.clear()),
            ("token", |c| c.token.clear()),
            ("endpoint", |c| c.endpoint = "  ".into()),
        ];
        for (expected, clear) in cases {
            let mut config = valid();
            clear(&mut config);
            match config.validate() {
                Err(ConfigError::MissingField { field, required }) => {
                    assert_eq!(field, expected);
                    assert_eq!(required, REQUIRED_FIELDS);
                }
                other => panic!("expected missing {expected}, got {other:?}"),
            }
        }
    }

    #[test]
    fn load_yaml_with_camel_case_keys() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "token: abc\nendpoint: https://rp/api/v1\nprojectName: demo\nlaunchName: nightly\nattributes:\n  - key: env\n    value: staging\n  - value: smoke\nissue:\n  issueType: ti001\n"
        )
        .unwrap();
        let config = ReporterConfig::load(file.path()).unwrap();
        assert_eq!(config.project_name, "demo");
        assert_eq!(config.launch_name, "nightly");
        assert_eq!(config.attributes.len(), 2);
        assert_eq!(config.attributes[1].key, None);
        assert_eq!(config.issue.unwrap().issue_type, "ti001");
        assert!(config.enabled);
    }

    #[test]
    fn load_json_accepts_launch_attributes_alias() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"token":"t","endpoint":"e","project":"p","launchAttributes":[{{"value":"ci"}}],"rerun":true,"rerunOf":"uuid-1"}}"#
        )
        .unwrap();
        let config = ReporterConfig::load(file.path()).unwrap();
        assert_eq!(config.project_name, "p");
        assert_eq!(config.attributes[0].value, "ci");
        let launch = config.launch_request();
        assert!(launch.rerun);
        assert_eq!(launch.rerun_of.as_deref(), Some("uuid-1"));
    }

    #[test]
    fn load_reports_parse_errors_with_path() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, "{{not json").unwrap();
        let err = ReporterConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = ReporterConfig::load(Path::new("/nonexistent/rp.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn redacted_masks_token() {
        let redacted = valid().redacted();
        assert_eq!(redacted.token, SECRET_MASK);
        assert_eq!(redacted.project_name, "demo");
    }
}
