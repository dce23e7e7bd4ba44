use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{SecondsFormat, Utc};

/// File name of the diagnostic log inside `<output_dir>/logs`.
pub const JOURNAL_FILE: &str = "rpbridge.log";

/// Best-effort, append-only diagnostic log of lifecycle transitions.
///
/// The file is opened once; clones share the handle. Write failures are
/// reported through `tracing` and otherwise ignored.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    sink: Option<Arc<Sink>>,
}

#[derive(Debug)]
struct Sink {
    path: PathBuf,
    file: Mutex<File>,
}

impl Journal {
    /// Journal at `<output_dir>/logs/rpbridge.log`, creating the directory if needed.
    pub fn open(output_dir: &Path) -> Self {
        let dir = output_dir.join("logs");
        if let Err(err) = std::fs::create_dir_all(&dir) {
            tracing::warn!(dir = %dir.display(), %err, "diagnostic log disabled");
            return Self::disabled();
        }
        let path = dir.join(JOURNAL_FILE);
        match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => Self {
                sink: Some(Arc::new(Sink {
                    path,
                    file: Mutex::new(file),
                })),
            },
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "diagnostic log disabled");
                Self::disabled()
            }
        }
    }

    pub fn disabled() -> Self {
        Self { sink: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.sink.as_deref().map(|sink| sink.path.as_path())
    }

    pub fn record(&self, message: impl AsRef<str>) {
        let Some(sink) = &self.sink else {
            return;
        };
        let line = format!(
            "[{}] {}\n",
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            message.as_ref()
        );
        let mut file = sink
            .file
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Err(err) = file.write_all(line.as_bytes()) {
            tracing::warn!(path = %sink.path.display(), %err, "failed to write to log file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_creates_logs_directory() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::open(&dir.path().join("output"));
        assert!(dir.path().join("output").join("logs").is_dir());
        assert!(journal.path().unwrap().ends_with("logs/rpbridge.log"));
    }

    #[test]
    fn record_appends_timestamped_lines() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::open(dir.path());
        journal.record("suite 'Login' started");
        journal.record("suite 'Login' finished PASSED");

        let contents = std::fs::read_to_string(journal.path().unwrap()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with('['));
        assert!(lines[0].ends_with("] suite 'Login' started"));
        assert!(lines[1].contains("finished PASSED"));
    }

    #[test]
    fn record_keeps_writing_to_the_opened_file() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::open(dir.path());
        let opened = journal.path().unwrap().to_owned();
        let moved = dir.path().join("moved.log");
        std::fs::rename(&opened, &moved).unwrap();

        journal.clone().record("after move");
        assert!(!opened.exists());
        let contents = std::fs::read_to_string(&moved).unwrap();
        assert!(contents.ends_with("] after move\n"));
    }

    #[test]
    fn disabled_journal_writes_nothing() {
        let journal = Journal::disabled();
        journal.record("ignored");
        assert!(journal.path().is_none());
    }

    #[test]
    fn unwritable_location_is_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        // A plain file where the logs directory should go.
        let blocker = dir.path().join("output");
        std::fs::write(&blocker, b"not a dir").unwrap();
        let journal = Journal::open(&blocker);
        assert!(journal.path().is_none());
        journal.record("still fine");
    }
}
