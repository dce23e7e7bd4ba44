use serde::Serialize;

use crate::reporter::status::Status;
use crate::tracker::{
    Attachment, FinishItem, ItemId, ItemKind, ItemTracker, LaunchFinished, LaunchRequest,
    LogEntry, LogLevel, StartItem, TrackerError,
};

/// One call observed by a [`RecordingTracker`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum TrackerCall {
    StartLaunch {
        id: ItemId,
        name: String,
    },
    StartItem {
        id: ItemId,
        #[serde(skip_serializing_if = "Option::is_none")]
        parent: Option<ItemId>,
        name: String,
        kind: ItemKind,
    },
    FinishItem {
        id: ItemId,
        status: Status,
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        issue: bool,
    },
    SendLog {
        id: ItemId,
        level: LogLevel,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        attachment: Option<String>,
    },
    FinishLaunch {
        id: ItemId,
        status: Status,
    },
}

/// In-memory [`ItemTracker`] that assigns sequential ids and records every call.
///
/// Used for dry runs and tests. Calls can be made to fail on demand.
#[derive(Debug, Default)]
pub struct RecordingTracker {
    calls: Vec<TrackerCall>,
    next_id: usize,
    refuse_launch: bool,
    reject_names: Vec<String>,
    reject_finish: bool,
    reject_logs: bool,
}

impl RecordingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every `start_launch` call, as an unreachable service would.
    pub fn refusing_launch(mut self) -> Self {
        self.refuse_launch = true;
        self
    }

    /// Fail `start_item` for items with exactly this name.
    pub fn rejecting_item(mut self, name: &str) -> Self {
        self.reject_names.push(name.to_owned());
        self
    }

    pub fn rejecting_finish(mut self) -> Self {
        self.reject_finish = true;
        self
    }

    pub fn rejecting_logs(mut self) -> Self {
        self.reject_logs = true;
        self
    }

    pub fn calls(&self) -> &[TrackerCall] {
        &self.calls
    }

    /// Names of started items of the given kind, in call order.
    pub fn started(&self, kind: ItemKind) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                TrackerCall::StartItem { name, kind: k, .. } if *k == kind => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Id of the first started item with this name.
    pub fn id_of(&self, item_name: &str) -> Option<&ItemId> {
        self.calls.iter().find_map(|call| match call {
            TrackerCall::StartItem { id, name, .. } if name == item_name => Some(id),
            _ => None,
        })
    }

    /// Parent of the first started item with this name.
    pub fn parent_of(&self, item_name: &str) -> Option<&ItemId> {
        self.calls.iter().find_map(|call| match call {
            TrackerCall::StartItem { parent, name, .. } if name == item_name => parent.as_ref(),
            _ => None,
        })
    }

    /// Final status the item was finished with.
    pub fn finish_status(&self, item: &ItemId) -> Option<Status> {
        self.calls.iter().find_map(|call| match call {
            TrackerCall::FinishItem { id, status, .. } if id == item => Some(*status),
            _ => None,
        })
    }

    pub fn count_starts(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, TrackerCall::StartItem { .. }))
            .count()
    }

    pub fn count_finishes(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, TrackerCall::FinishItem { .. }))
            .count()
    }

    /// Index of the first call matching the predicate.
    pub fn position(&self, predicate: impl Fn(&TrackerCall) -> bool) -> Option<usize> {
        self.calls.iter().position(predicate)
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }

    fn assign(&mut self, prefix: &str) -> ItemId {
        self.next_id += 1;
        ItemId::new(format!("{prefix}-{}", self.next_id))
    }

    fn rejected(what: &str) -> TrackerError {
        TrackerError::Rejected {
            url: format!("recording://{what}"),
            status: 500,
            body: "rejected on request".to_owned(),
        }
    }
}

impl ItemTracker for RecordingTracker {
    fn start_launch(&mut self, launch: &LaunchRequest) -> Result<ItemId, TrackerError> {
        if self.refuse_launch {
            return Err(TrackerError::Transport {
                url: "recording://launch".to_owned(),
                message: "connection refused".to_owned(),
            });
        }
        let id = self.assign("launch");
        self.calls.push(TrackerCall::StartLaunch {
            id: id.clone(),
            name: launch.name.clone(),
        });
        Ok(id)
    }

    fn start_item(
        &mut self,
        _launch: &ItemId,
        parent: Option<&ItemId>,
        item: &StartItem,
    ) -> Result<ItemId, TrackerError> {
        if self.reject_names.contains(&item.name) {
            return Err(Self::rejected("item"));
        }
        let id = self.assign("item");
        self.calls.push(TrackerCall::StartItem {
            id: id.clone(),
            parent: parent.cloned(),
            name: item.name.clone(),
            kind: item.kind,
        });
        Ok(id)
    }

    fn finish_item(
        &mut self,
        _launch: &ItemId,
        item: &ItemId,
        finish: &FinishItem,
    ) -> Result<(), TrackerError> {
        if self.reject_finish {
            return Err(Self::rejected("finish"));
        }
        self.calls.push(TrackerCall::FinishItem {
            id: item.clone(),
            status: finish.status,
            issue: finish.issue.is_some(),
        });
        Ok(())
    }

    fn send_log(
        &mut self,
        _launch: &ItemId,
        item: &ItemId,
        entry: &LogEntry,
        attachment: Option<&Attachment>,
    ) -> Result<(), TrackerError> {
        if self.reject_logs {
            return Err(Self::rejected("log"));
        }
        self.calls.push(TrackerCall::SendLog {
            id: item.clone(),
            level: entry.level,
            message: entry.message.clone(),
            attachment: attachment.map(|a| a.name.clone()),
        });
        Ok(())
    }

    fn finish_launch(
        &mut self,
        launch: &ItemId,
        status: Status,
    ) -> Result<LaunchFinished, TrackerError> {
        self.calls.push(TrackerCall::FinishLaunch {
            id: launch.clone(),
            status,
        });
        Ok(LaunchFinished {
            id: launch.clone(),
            link: None,
        })
    }

    fn launch_url(&mut self, launch: &ItemId) -> Result<String, TrackerError> {
        Ok(format!("recording://launches/{launch}"))
    }
}
