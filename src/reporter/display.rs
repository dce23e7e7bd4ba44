use crate::model::{Outcome, Step, StepContext, TestCase};
use crate::reporter::status::Status;

pub const PREFIX_PASSED_TEST: &str = "✅ [TEST]";
pub const PREFIX_FAILED_TEST: &str = "❌ [TEST]";
pub const PREFIX_SKIPPED_TEST: &str = "⏩ [SKIPPED TEST]";
pub const PREFIX_PASSED_STEP: &str = "✅ [STEP]";
pub const PREFIX_FAILED_STEP: &str = "❌ [STEP]";

/// Longest item name sent for a step, in characters.
pub const MAX_STEP_TITLE: usize = 300;

/// Cut `text` down to at most `max` characters, on a character boundary.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => text[..end].to_owned(),
        None => text.to_owned(),
    }
}

fn test_prefix(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Passed => PREFIX_PASSED_TEST,
        Outcome::Failed => PREFIX_FAILED_TEST,
        Outcome::Skipped => PREFIX_SKIPPED_TEST,
    }
}

/// Summary line logged on a replayed test item.
pub fn test_summary(outcome: Outcome, test: &TestCase) -> String {
    let mut line = format!("{} - {}", test_prefix(outcome), test.title);
    if outcome == Outcome::Failed {
        let detail = test
            .error
            .as_ref()
            .map(|e| e.describe())
            .unwrap_or_else(|| "{}".to_owned());
        line.push('\n');
        line.push_str(&detail);
    }
    line
}

/// Item name of a step context: the step text with secrets masked.
pub fn context_title(context: &StepContext) -> String {
    truncate_chars(&context.to_string(), MAX_STEP_TITLE)
}

/// Title of a live step item.
pub fn live_step_title(step: &Step) -> String {
    context_title(&step.context())
}

/// Title of a replayed step item, prefixed with its pass/fail marker.
pub fn replay_step_title(step: &Step, status: Status) -> String {
    let prefix = if status.is_failed() {
        PREFIX_FAILED_STEP
    } else {
        PREFIX_PASSED_STEP
    };
    truncate_chars(&format!("{prefix}: {}", step.context()), MAX_STEP_TITLE)
}

/// Message of the error log attached to a failed step.
pub fn failed_step_message(detail: &str) -> String {
    format!("{PREFIX_FAILED_STEP}: {detail}")
}

/// Turn a test title into a file-name fragment, the way the runner names screenshots.
pub fn clean_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| *c != '\'')
        .map(|c| match c {
            ' ' | '/' | ':' | '\\' | '|' => '_',
            '"' => '\'',
            '<' => '(',
            '>' => ')',
            '?' => '.',
            '*' => '^',
            other => other,
        })
        .collect()
}
