// ABOUTME: Injected, leveled event log with a bounded background queue.
// ABOUTME: Fire-and-forget sends; the writer drains remaining entries on shutdown.

use chrono::Local;
use std::fmt;
use std::io::Write;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Capacity of the in-flight entry queue. A full queue drops entries rather
/// than blocking the caller.
const QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug)]
struct Entry {
    timestamp: chrono::DateTime<Local>,
    level: Level,
    message: String,
}

impl Entry {
    fn format_line(&self) -> String {
        format!(
            "[{}] [{}] {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.level,
            self.message
        )
    }
}

/// Cloneable handle for emitting log entries.
///
/// Sends never block and never fail the caller: a full queue drops the entry.
#[derive(Debug, Clone)]
pub struct EventLog {
    tx: mpsc::Sender<Entry>,
}

impl EventLog {
    pub fn log(&self, level: Level, message: impl Into<String>) {
        let entry = Entry {
            timestamp: Local::now(),
            level,
            message: message.into(),
        };
        if self.tx.try_send(entry).is_err() {
            // Queue full or writer gone; fire-and-forget means we drop it.
            tracing::debug!("event log entry dropped");
        }
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.log(Level::Debug, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(Level::Info, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.log(Level::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(Level::Error, message);
    }
}

/// Owns the background writer task.
pub struct EventLogWorker {
    handle: JoinHandle<()>,
}

impl EventLogWorker {
    /// Wait for the writer to drain and exit.
    ///
    /// The writer stops once every [`EventLog`] handle has been dropped and
    /// the queue is empty, so drop the handles before calling this.
    pub async fn shutdown(self) {
        if let Err(e) = self.handle.await {
            tracing::warn!(error = %e, "event log writer did not shut down cleanly");
        }
    }
}

/// Spawn the event log writer.
///
/// With `path = None` entries are drained and discarded, which keeps the
/// logging call sites unconditional.
pub fn spawn(path: Option<PathBuf>) -> (EventLog, EventLogWorker) {
    let (tx, mut rx) = mpsc::channel::<Entry>(QUEUE_CAPACITY);

    let handle = tokio::spawn(async move {
        let mut sink = path.and_then(open_sink);
        while let Some(entry) = rx.recv().await {
            let Some(file) = sink.as_mut() else { continue };
            if writeln!(file, "{}", entry.format_line()).and_then(|_| file.flush()).is_err() {
                tracing::warn!("failed to write event log entry, disabling file sink");
                sink = None;
            }
        }
    });

    (EventLog { tx }, EventLogWorker { handle })
}

fn open_sink(path: PathBuf) -> Option<std::fs::File> {
    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        tracing::warn!(error = %e, "could not create event log directory");
        return None;
    }

    match std::fs::OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => Some(file),
        Err(e) => {
            tracing::warn!(error = %e, path = %path.display(), "could not open event log file");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn entries_are_flushed_before_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("events.log");

        let (log, worker) = spawn(Some(log_path.clone()));
        log.info("deploy started");
        log.error("deploy failed");
        drop(log);
        worker.shutdown().await;

        let content = std::fs::read_to_string(&log_path).unwrap();
        assert!(content.contains("[INFO] deploy started"));
        assert!(content.contains("[ERROR] deploy failed"));
    }

    #[tokio::test]
    async fn disabled_sink_still_accepts_entries() {
        let (log, worker) = spawn(None);
        log.debug("nothing to see");
        drop(log);
        worker.shutdown().await;
    }
}
