use std::collections::HashSet;

use crate::reporter::journal::Journal;
use crate::reporter::status::Status;
use crate::tracker::{
    Attachment, FinishItem, Issue, ItemId, ItemKind, ItemTracker, LaunchFinished, LaunchRequest,
    LogEntry, StartItem, TrackerError,
};

/// A tracker bound to the current launch, with item bookkeeping.
///
/// Every remote call goes through here so the policy is the same for all of
/// them: a rejected start leaves the item unopened, rejected finishes and
/// logs are logged and dropped, and each item is finished at most once.
///
/// The open/finished ledger covers the current launch only and is reset
/// when the next launch starts.
pub struct Session<T> {
    tracker: T,
    journal: Journal,
    launch: Option<ItemId>,
    launch_finished: bool,
    open: HashSet<ItemId>,
    finished: HashSet<ItemId>,
}

impl<T: ItemTracker> Session<T> {
    pub fn new(tracker: T, journal: Journal) -> Self {
        Self {
            tracker,
            journal,
            launch: None,
            launch_finished: false,
            open: HashSet::new(),
            finished: HashSet::new(),
        }
    }

    pub fn tracker(&self) -> &T {
        &self.tracker
    }

    pub fn into_tracker(self) -> T {
        self.tracker
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    pub fn launch(&self) -> Option<&ItemId> {
        self.launch.as_ref()
    }

    pub fn is_open(&self, item: &ItemId) -> bool {
        self.open.contains(item)
    }

    /// Start a launch; subsequent items belong to it.
    ///
    /// # Errors
    ///
    /// Returns the [`TrackerError`] if the service refused or could not be reached.
    pub fn start_launch(&mut self, request: &LaunchRequest) -> Result<ItemId, TrackerError> {
        if let Some(previous) = &self.launch
            && !self.launch_finished
        {
            tracing::warn!(launch = %previous, "starting a new launch while the previous one is unfinished");
        }

        let id = self.tracker.start_launch(request).inspect_err(|err| {
            self.journal
                .record(format!("launch '{}' failed to start: {err}", request.name));
        })?;

        tracing::debug!(launch = %id, name = %request.name, "launch started");
        self.journal
            .record(format!("{id}: launch '{}' started", request.name));
        self.launch = Some(id.clone());
        self.launch_finished = false;
        self.open.clear();
        self.finished.clear();
        Ok(id)
    }

    /// UI link of the current launch, if it can be resolved.
    pub fn launch_url(&mut self) -> Option<String> {
        let launch = self.launch.clone()?;
        match self.tracker.launch_url(&launch) {
            Ok(url) => Some(url),
            Err(err) => {
                tracing::warn!(%launch, %err, "could not resolve launch link");
                None
            }
        }
    }

    /// Open an item; `None` if there is no launch or the service rejected it.
    pub fn start_item(
        &mut self,
        parent: Option<&ItemId>,
        name: &str,
        kind: ItemKind,
    ) -> Option<ItemId> {
        let Some(launch) = self.launch.clone() else {
            tracing::warn!(%kind, name, "no launch in progress, item not started");
            return None;
        };

        let request = StartItem {
            name: name.to_owned(),
            kind,
        };
        match self.tracker.start_item(&launch, parent, &request) {
            Ok(id) => {
                tracing::debug!(item = %id, %kind, name, "item started");
                self.journal.record(format!("{id}: {kind} '{name}' started"));
                self.open.insert(id.clone());
                Some(id)
            }
            Err(err) => {
                tracing::warn!(%kind, name, %err, "failed to start item");
                self.journal
                    .record(format!("{kind} '{name}' failed to start: {err}"));
                None
            }
        }
    }

    /// Finish an open item. Returns whether the service accepted the call.
    ///
    /// Finishing an unknown or already finished item is a no-op with a warning.
    pub fn finish_item(&mut self, item: &ItemId, status: Status, issue: Option<&Issue>) -> bool {
        if self.finished.contains(item) {
            tracing::warn!(%item, "item already finished, ignoring");
            return false;
        }
        if !self.open.remove(item) {
            tracing::warn!(%item, "item was never started, ignoring finish");
            return false;
        }
        self.finished.insert(item.clone());

        let Some(launch) = self.launch.clone() else {
            return false;
        };
        let finish = FinishItem {
            status,
            issue: issue.cloned(),
        };
        match self.tracker.finish_item(&launch, item, &finish) {
            Ok(()) => {
                tracing::debug!(%item, %status, "item finished");
                self.journal.record(format!("{item}: finished {status}"));
                true
            }
            Err(err) => {
                tracing::warn!(%item, %err, "failed to finish item");
                self.journal
                    .record(format!("{item}: failed to finish: {err}"));
                false
            }
        }
    }

    /// Send a log entry, optionally with a file. Returns whether it was accepted.
    pub fn send_log(
        &mut self,
        item: &ItemId,
        entry: LogEntry,
        attachment: Option<&Attachment>,
    ) -> bool {
        let Some(launch) = self.launch.clone() else {
            return false;
        };
        match self.tracker.send_log(&launch, item, &entry, attachment) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(%item, level = %entry.level, %err, "failed to send log");
                self.journal.record(format!("{item}: failed to send log: {err}"));
                false
            }
        }
    }

    /// Finish the current launch, once.
    pub fn finish_launch(&mut self, status: Status) -> Option<LaunchFinished> {
        let Some(launch) = self.launch.clone() else {
            tracing::warn!("no launch in progress, nothing to finish");
            return None;
        };
        if self.launch_finished {
            tracing::warn!(%launch, "launch already finished, ignoring");
            return None;
        }
        self.launch_finished = true;

        match self.tracker.finish_launch(&launch, status) {
            Ok(finished) => {
                tracing::debug!(%launch, %status, "launch finished");
                self.journal
                    .record(format!("{launch}: launch finished {status}"));
                Some(finished)
            }
            Err(err) => {
                tracing::warn!(%launch, %err, "failed to finish launch");
                self.journal
                    .record(format!("{launch}: failed to finish launch: {err}"));
                None
            }
        }
    }
}
