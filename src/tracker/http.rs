use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::ReporterConfig;
use crate::reporter::status::Status;
use crate::tracker::link::{LAUNCH_LISTING_QUERY, LaunchPage, launch_ui_url};
use crate::tracker::{
    Attachment, Attribute, FinishItem, Issue, ItemId, ItemKind, ItemTracker, LaunchFinished,
    LaunchRequest, LogEntry, LogLevel, StartItem, TrackerError,
};

/// Connection settings for the reporting service.
#[derive(Debug, Clone)]
pub struct HttpTrackerConfig {
    /// API base, e.g. `https://rp.example.com/api/v1`.
    pub endpoint: String,
    pub project: String,
    pub token: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl HttpTrackerConfig {
    pub fn from_config(config: &ReporterConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            project: config.project_name.clone(),
            token: config.token.clone(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// [`ItemTracker`] talking to the ReportPortal v1 REST API over `ureq`.
pub struct HttpTracker {
    pub config: HttpTrackerConfig,
    agent: ureq::Agent,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StartLaunchRq<'a> {
    name: &'a str,
    description: &'a str,
    attributes: &'a [Attribute],
    start_time: i64,
    mode: &'static str,
    rerun: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    rerun_of: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StartItemRq<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    kind: ItemKind,
    start_time: i64,
    launch_uuid: &'a str,
    has_stats: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FinishItemRq<'a> {
    end_time: i64,
    status: Status,
    launch_uuid: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    issue: Option<&'a Issue>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SaveLogRq<'a> {
    launch_uuid: &'a str,
    item_uuid: &'a str,
    time: i64,
    level: LogLevel,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    file: Option<FileRef<'a>>,
}

#[derive(Serialize)]
struct FileRef<'a> {
    name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FinishLaunchRq {
    end_time: i64,
    status: Status,
}

#[derive(Deserialize)]
struct EntryCreated {
    id: String,
}

#[derive(Deserialize)]
struct LaunchFinishedRs {
    id: String,
    #[serde(default)]
    link: Option<String>,
}

impl HttpTracker {
    pub fn new(config: HttpTrackerConfig) -> Self {
        let agent_config = ureq::config::Config::builder()
            .http_status_as_error(false)
            .timeout_global(Some(config.timeout))
            .build();

        Self {
            config,
            agent: ureq::Agent::new_with_config(agent_config),
        }
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.project,
            path
        )
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.config.token)
    }

    fn post_json<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, TrackerError> {
        let url = self.url(path);
        let payload = encode(&url, body)?;
        let result = self
            .agent
            .post(&url)
            .header("Authorization", &self.bearer())
            .header("Content-Type", "application/json")
            .send(payload.as_bytes());
        decode(&url, &read_body(&url, result)?)
    }

    fn put_json<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, TrackerError> {
        let url = self.url(path);
        let payload = encode(&url, body)?;
        let result = self
            .agent
            .put(&url)
            .header("Authorization", &self.bearer())
            .header("Content-Type", "application/json")
            .send(payload.as_bytes());
        decode(&url, &read_body(&url, result)?)
    }

    fn get_json<R: DeserializeOwned>(&self, path: &str) -> Result<R, TrackerError> {
        let url = self.url(path);
        let result = self
            .agent
            .get(&url)
            .header("Authorization", &self.bearer())
            .call();
        decode(&url, &read_body(&url, result)?)
    }

    fn post_multipart(
        &self,
        path: &str,
        request: &SaveLogRq<'_>,
        attachment: &Attachment,
    ) -> Result<(), TrackerError> {
        let url = self.url(path);
        let json_part = encode(&url, &[request])?;
        let boundary = format!(
            "rpbridge-{}",
            Utc::now().timestamp_nanos_opt().unwrap_or_default()
        );
        let body = multipart_body(&boundary, json_part.as_bytes(), attachment);
        let result = self
            .agent
            .post(&url)
            .header("Authorization", &self.bearer())
            .header(
                "Content-Type",
                &format!("multipart/form-data; boundary={boundary}"),
            )
            .send(&body[..]);
        read_body(&url, result).map(|_| ())
    }
}

fn millis(time: DateTime<Utc>) -> i64 {
    time.timestamp_millis()
}

fn encode<B: Serialize + ?Sized>(url: &str, body: &B) -> Result<String, TrackerError> {
    serde_json::to_string(body).map_err(|e| TrackerError::Decode {
        url: url.to_owned(),
        message: format!("failed to encode request: {e}"),
    })
}

fn decode<R: DeserializeOwned>(url: &str, body: &str) -> Result<R, TrackerError> {
    // Some endpoints answer with an empty body.
    let body = if body.trim().is_empty() { "null" } else { body };
    serde_json::from_str(body).map_err(|e| TrackerError::Decode {
        url: url.to_owned(),
        message: e.to_string(),
    })
}

fn read_body(
    url: &str,
    result: Result<ureq::http::Response<ureq::Body>, ureq::Error>,
) -> Result<String, TrackerError> {
    let mut response = result.map_err(|e| TrackerError::Transport {
        url: url.to_owned(),
        message: e.to_string(),
    })?;
    let status = response.status().as_u16();
    let body = response
        .body_mut()
        .read_to_string()
        .map_err(|e| TrackerError::Transport {
            url: url.to_owned(),
            message: format!("failed to read response body: {e}"),
        })?;

    if !(200..300).contains(&status) {
        return Err(TrackerError::Rejected {
            url: url.to_owned(),
            status,
            body,
        });
    }
    Ok(body)
}

/// Encode a log request and its file as `multipart/form-data`.
///
/// The service expects the JSON log batch in a part named `json_request_part`
/// and the file in a part named `file` whose filename matches `file.name`.
pub fn multipart_body(boundary: &str, json_part: &[u8], attachment: &Attachment) -> Vec<u8> {
    let mut body = Vec::with_capacity(json_part.len() + attachment.content.len() + 512);
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        b"Content-Disposition: form-data; name=\"json_request_part\"\r\nContent-Type: application/json\r\n\r\n",
    );
    body.extend_from_slice(json_part);
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
            attachment.name.replace('"', "'"),
            attachment.mime
        )
        .as_bytes(),
    );
    body.extend_from_slice(&attachment.content);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

impl ItemTracker for HttpTracker {
    fn start_launch(&mut self, launch: &LaunchRequest) -> Result<ItemId, TrackerError> {
        let request = StartLaunchRq {
            name: &launch.name,
            description: &launch.description,
            attributes: &launch.attributes,
            start_time: millis(Utc::now()),
            mode: "DEFAULT",
            rerun: launch.rerun,
            rerun_of: launch.rerun_of.as_deref(),
        };
        let created: EntryCreated = self.post_json("launch", &request)?;
        Ok(ItemId::new(created.id))
    }

    fn start_item(
        &mut self,
        launch: &ItemId,
        parent: Option<&ItemId>,
        item: &StartItem,
    ) -> Result<ItemId, TrackerError> {
        let request = StartItemRq {
            name: &item.name,
            kind: item.kind,
            start_time: millis(Utc::now()),
            launch_uuid: launch.as_str(),
            has_stats: item.kind.has_stats(),
        };
        let path = match parent {
            Some(parent) => format!("item/{parent}"),
            None => "item".to_owned(),
        };
        let created: EntryCreated = self.post_json(&path, &request)?;
        Ok(ItemId::new(created.id))
    }

    fn finish_item(
        &mut self,
        launch: &ItemId,
        item: &ItemId,
        finish: &FinishItem,
    ) -> Result<(), TrackerError> {
        let request = FinishItemRq {
            end_time: millis(Utc::now()),
            status: finish.status,
            launch_uuid: launch.as_str(),
            issue: finish.issue.as_ref(),
        };
        let _: serde_json::Value = self.put_json(&format!("item/{item}"), &request)?;
        Ok(())
    }

    fn send_log(
        &mut self,
        launch: &ItemId,
        item: &ItemId,
        entry: &LogEntry,
        attachment: Option<&Attachment>,
    ) -> Result<(), TrackerError> {
        let request = SaveLogRq {
            launch_uuid: launch.as_str(),
            item_uuid: item.as_str(),
            time: millis(entry.time.unwrap_or_else(Utc::now)),
            level: entry.level,
            message: &entry.message,
            file: attachment.map(|a| FileRef { name: &a.name }),
        };
        match attachment {
            Some(attachment) => self.post_multipart("log", &request, attachment),
            None => {
                let _: serde_json::Value = self.post_json("log", &request)?;
                Ok(())
            }
        }
    }

    fn finish_launch(
        &mut self,
        launch: &ItemId,
        status: Status,
    ) -> Result<LaunchFinished, TrackerError> {
        let request = FinishLaunchRq {
            end_time: millis(Utc::now()),
            status,
        };
        let finished: LaunchFinishedRs =
            self.put_json(&format!("launch/{launch}/finish"), &request)?;
        Ok(LaunchFinished {
            id: ItemId::new(finished.id),
            link: finished.link,
        })
    }

    fn launch_url(&mut self, launch: &ItemId) -> Result<String, TrackerError> {
        let page: LaunchPage = self.get_json(LAUNCH_LISTING_QUERY)?;
        let number = page
            .find(launch.as_str())
            .ok_or_else(|| TrackerError::LaunchNotListed(launch.clone()))?;
        Ok(launch_ui_url(
            &self.config.endpoint,
            &self.config.project,
            number,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_tracker() -> HttpTracker {
        // Use a port that's (almost certainly) not running a server.
        HttpTracker::new(HttpTrackerConfig {
            endpoint: "http://127.0.0.1:19999/api/v1".into(),
            project: "demo".into(),
            token: "secret".into(),
            timeout: Duration::from_secs(2),
        })
    }

    #[test]
    fn url_joins_endpoint_project_and_path() {
        let mut tracker = unreachable_tracker();
        tracker.config.endpoint = "https://rp.example.com/api/v1/".into();
        assert_eq!(
            tracker.url("item/abc"),
            "https://rp.example.com/api/v1/demo/item/abc"
        );
    }

    #[test]
    fn bearer_header_carries_token() {
        assert_eq!(unreachable_tracker().bearer(), "Bearer secret");
    }

    #[test]
    fn start_item_request_uses_service_field_names() {
        let request = StartItemRq {
            name: "Login",
            kind: ItemKind::Suite,
            start_time: 1,
            launch_uuid: "launch-1",
            has_stats: true,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["type"], "SUITE");
        assert_eq!(json["launchUuid"], "launch-1");
        assert_eq!(json["hasStats"], true);
        assert_eq!(json["startTime"], 1);
    }

    #[test]
    fn finish_request_omits_missing_issue() {
        let request = FinishItemRq {
            end_time: 5,
            status: Status::Failed,
            launch_uuid: "l",
            issue: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["status"], "FAILED");
        assert!(json.get("issue").is_none());
    }

    #[test]
    fn multipart_body_has_json_and_file_parts() {
        let attachment = Attachment {
            name: "shot.png".into(),
            mime: "image/png".into(),
            content: vec![0x89, b'P', b'N', b'G'],
        };
        let body = multipart_body("XYZ", br#"[{"message":"m"}]"#, &attachment);
        let text = String::from_utf8_lossy(&body);
        assert!(text.starts_with("--XYZ\r\n"));
        assert!(text.contains("name=\"json_request_part\""));
        assert!(text.contains(r#"[{"message":"m"}]"#));
        assert!(text.contains("name=\"file\"; filename=\"shot.png\""));
        assert!(text.contains("Content-Type: image/png"));
        assert!(text.ends_with("\r\n--XYZ--\r\n"));
    }

    #[test]
    fn decode_treats_empty_body_as_null() {
        let value: serde_json::Value = decode("u", "").unwrap();
        assert!(value.is_null());
    }

    #[test]
    fn connection_refused_is_a_transport_error() {
        let mut tracker = unreachable_tracker();
        let launch = LaunchRequest {
            name: "nightly".into(),
            description: String::new(),
            attributes: vec![],
            rerun: false,
            rerun_of: None,
        };
        let err = tracker.start_launch(&launch).unwrap_err();
        assert!(matches!(err, TrackerError::Transport { .. }));
    }
}
