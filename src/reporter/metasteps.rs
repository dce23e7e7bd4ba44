use crate::model::StepContext;
use crate::reporter::display::context_title;
use crate::reporter::session::Session;
use crate::reporter::status::Status;
use crate::tracker::{ItemId, ItemKind, ItemTracker};

/// A meta-step currently open on the service, one per nesting depth.
#[derive(Debug, Clone)]
pub struct OpenItem {
    pub context: StepContext,
    /// `None` when the service rejected the start call.
    pub item: Option<ItemId>,
    /// Last known status; unset means it closes PASSED.
    pub status: Option<Status>,
}

/// The chain of open meta-steps of the current test, outermost first.
#[derive(Debug, Default)]
pub struct MetaSteps {
    open: Vec<OpenItem>,
}

impl MetaSteps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.open.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }

    pub fn open_items(&self) -> &[OpenItem] {
        &self.open
    }

    /// Bring the open chain in line with `chain` and return the parent for
    /// the next leaf step.
    ///
    /// The shared prefix is reused as is. Everything past it is closed,
    /// innermost first, and the rest of `chain` is opened outermost first.
    pub fn reconcile<T: ItemTracker>(
        &mut self,
        session: &mut Session<T>,
        chain: &[StepContext],
        test_item: &ItemId,
    ) -> ItemId {
        let shared = self
            .open
            .iter()
            .zip(chain)
            .take_while(|(open, wanted)| open.context == **wanted)
            .count();

        while self.open.len() > shared {
            if let Some(open) = self.open.pop() {
                close(session, open);
            }
        }

        for context in &chain[shared..] {
            let parent = self.innermost_id().unwrap_or(test_item).clone();
            let item = session.start_item(Some(&parent), &context_title(context), ItemKind::Step);
            self.open.push(OpenItem {
                context: context.clone(),
                item,
                status: None,
            });
        }

        self.innermost_id().unwrap_or(test_item).clone()
    }

    /// A step failed: every open context is now FAILED.
    pub fn mark_failed(&mut self) {
        for open in &mut self.open {
            open.status = Some(Status::Failed);
        }
    }

    /// A step passed: contexts without a status become PASSED.
    pub fn mark_passed(&mut self) {
        for open in &mut self.open {
            open.status.get_or_insert(Status::Passed);
        }
    }

    /// Close every open context, innermost first.
    pub fn close_all<T: ItemTracker>(&mut self, session: &mut Session<T>) {
        while let Some(open) = self.open.pop() {
            close(session, open);
        }
    }

    /// Forget the chain without closing anything.
    pub fn reset(&mut self) {
        if !self.open.is_empty() {
            tracing::debug!(open = self.open.len(), "dropping unclosed meta-steps");
        }
        self.open.clear();
    }

    /// Id of the deepest context that actually started.
    fn innermost_id(&self) -> Option<&ItemId> {
        self.open.iter().rev().find_map(|open| open.item.as_ref())
    }
}

fn close<T: ItemTracker>(session: &mut Session<T>, open: OpenItem) {
    match &open.item {
        Some(item) => {
            session.finish_item(item, open.status.unwrap_or(Status::Passed), None);
        }
        None => {
            tracing::warn!(step = %open.context, "meta-step can't be closed, it has no id");
            session
                .journal()
                .record(format!("meta-step '{}' can't be closed, it has no id", open.context));
        }
    }
}
