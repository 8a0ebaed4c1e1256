//! Offset-tracked tailing of a single append-mostly log file.
//!
//! The tailer reads the whole file once at startup, then re-reads from its
//! last offset on every filesystem write notification. A file that shrank
//! below the offset was truncated or rotated; the cursor resets to zero and
//! the new content is read as if the file were fresh. Only complete lines
//! are delivered; a trailing line still missing its terminator stays in the
//! carry buffer until a later write completes it.

use std::io::SeekFrom;
use std::path::PathBuf;

use notify::{RecursiveMode, Watcher};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::mpsc;

use crate::error::TailerError;

/// Capacity of the event channel handed to the consumer.
const EVENT_CHANNEL_CAPACITY: usize = 32;

/// One batch of tailed lines, or the terminal failure.
#[derive(Debug)]
pub enum LogEvent {
    /// Full content present when tailing started; may be empty.
    Initial(Vec<String>),
    /// Lines appended since the previous event; never empty.
    Append(Vec<String>),
    /// Tailing could not start. No further events follow.
    Error(TailerError),
}

/// Tails one log file into a channel of [`LogEvent`]s.
#[derive(Debug, Clone)]
pub struct LogTailer {
    path: PathBuf,
}

impl LogTailer {
    /// Creates a tailer for the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Starts tailing on a background task.
    ///
    /// The stream ends (sender dropped) when the file becomes unreadable or
    /// the receiver goes away. Startup failures emit one
    /// [`LogEvent::Error`] first.
    pub fn spawn(self) -> mpsc::Receiver<LogEvent> {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        tokio::spawn(run(self.path, tx));
        rx
    }
}

/// Read cursor over the tailed file.
#[derive(Debug)]
struct TailCursor {
    path: PathBuf,
    offset: u64,
    carry: String,
}

impl TailCursor {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            offset: 0,
            carry: String::new(),
        }
    }

    /// Reads everything appended since the last call.
    ///
    /// Detects truncation (current size below the cursor) and restarts from
    /// offset zero, discarding any carried partial line from the old
    /// content. Returns the complete lines that arrived, possibly none.
    async fn read_new(&mut self) -> std::io::Result<Vec<String>> {
        let len = fs::metadata(&self.path).await?.len();

        if len < self.offset {
            tracing::debug!(path = %self.path.display(), "Log truncated; restarting from zero");
            self.offset = 0;
            self.carry.clear();
        }

        if len == self.offset {
            return Ok(Vec::new());
        }

        let mut file = fs::File::open(&self.path).await?;
        file.seek(SeekFrom::Start(self.offset)).await?;

        let mut buf = Vec::new();
        file.read_to_end(&mut buf).await?;
        self.offset += buf.len() as u64;

        self.carry.push_str(&String::from_utf8_lossy(&buf));
        Ok(drain_complete_lines(&mut self.carry))
    }
}

/// Splits off every terminated line, leaving a trailing partial line in the
/// buffer. Empty lines are dropped; a trailing `\r` is trimmed so the game's
/// CRLF log and plain-LF fixtures read the same.
fn drain_complete_lines(buffer: &mut String) -> Vec<String> {
    let mut lines = Vec::new();
    let mut start = 0usize;

    for (idx, b) in buffer.as_bytes().iter().enumerate() {
        if *b != b'\n' {
            continue;
        }

        let line = buffer[start..idx].trim_end_matches('\r');
        start = idx + 1;
        if line.is_empty() {
            continue;
        }
        lines.push(line.to_string());
    }

    if start > 0 {
        *buffer = buffer[start..].to_string();
    }
    lines
}

async fn run(path: PathBuf, tx: mpsc::Sender<LogEvent>) {
    // Verify the file opens before registering the watch; a missing log is a
    // startup failure the consumer must hear about.
    if let Err(e) = fs::File::open(&path).await {
        let _ = tx.send(LogEvent::Error(e.into())).await;
        return;
    }

    let (notify_tx, mut notify_rx) = mpsc::unbounded_channel();
    let mut watcher = match notify::recommended_watcher(
        move |res: Result<notify::Event, notify::Error>| {
            if let Ok(event) = res {
                if event.kind.is_modify() {
                    let _ = notify_tx.send(());
                }
            }
        },
    ) {
        Ok(watcher) => watcher,
        Err(e) => {
            let _ = tx.send(LogEvent::Error(e.into())).await;
            return;
        }
    };

    if let Err(e) = watcher.watch(&path, RecursiveMode::NonRecursive) {
        let _ = tx.send(LogEvent::Error(e.into())).await;
        return;
    }

    let mut cursor = TailCursor::new(path);

    // The initial batch is emitted even when empty so the consumer knows the
    // stream is live.
    match cursor.read_new().await {
        Ok(lines) => {
            if tx.send(LogEvent::Initial(lines)).await.is_err() {
                return;
            }
        }
        Err(e) => {
            let _ = tx.send(LogEvent::Error(e.into())).await;
            return;
        }
    }

    while notify_rx.recv().await.is_some() {
        match cursor.read_new().await {
            Ok(lines) => {
                if lines.is_empty() {
                    continue;
                }
                if tx.send(LogEvent::Append(lines)).await.is_err() {
                    return;
                }
            }
            Err(e) => {
                // Mid-stream failures end tailing without a further event.
                tracing::debug!(error = %e, "Log tailer stopped");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::TempDir;
    use tokio::time::{timeout, Duration};

    use super::*;

    fn write_file(path: &std::path::Path, content: &str) {
        std::fs::write(path, content).unwrap();
    }

    fn append_file(path: &std::path::Path, content: &str) {
        let mut file = std::fs::OpenOptions::new().append(true).open(path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
    }

    // ==================== drain_complete_lines Tests ====================

    #[test]
    fn drains_terminated_lines_only() {
        let mut buf = "one\r\ntwo\r\npart".to_string();
        assert_eq!(drain_complete_lines(&mut buf), vec!["one", "two"]);
        assert_eq!(buf, "part");

        buf.push_str("ial\r\n");
        assert_eq!(drain_complete_lines(&mut buf), vec!["partial"]);
        assert!(buf.is_empty());
    }

    #[test]
    fn drops_empty_lines() {
        let mut buf = "\r\n\r\na\n\n".to_string();
        assert_eq!(drain_complete_lines(&mut buf), vec!["a"]);
    }

    #[test]
    fn plain_lf_reads_like_crlf() {
        let mut a = "x\ny\n".to_string();
        let mut b = "x\r\ny\r\n".to_string();
        assert_eq!(drain_complete_lines(&mut a), drain_complete_lines(&mut b));
    }

    // ==================== TailCursor Tests ====================

    #[tokio::test]
    async fn cursor_reads_initial_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("game.log");
        write_file(&path, "alpha\r\nbeta\r\n");

        let mut cursor = TailCursor::new(path);
        assert_eq!(cursor.read_new().await.unwrap(), vec!["alpha", "beta"]);
        assert!(cursor.read_new().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cursor_reads_only_appended_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("game.log");
        write_file(&path, "old\r\n");

        let mut cursor = TailCursor::new(path.clone());
        cursor.read_new().await.unwrap();

        append_file(&path, "new one\r\nnew two\r\n");
        assert_eq!(cursor.read_new().await.unwrap(), vec!["new one", "new two"]);
    }

    #[tokio::test]
    async fn cursor_holds_back_partial_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("game.log");
        write_file(&path, "complete\r\nhalf");

        let mut cursor = TailCursor::new(path.clone());
        assert_eq!(cursor.read_new().await.unwrap(), vec!["complete"]);

        append_file(&path, " done\r\n");
        assert_eq!(cursor.read_new().await.unwrap(), vec!["half done"]);
    }

    #[tokio::test]
    async fn truncation_yields_only_new_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("game.log");
        write_file(&path, "first session line one\r\nfirst session line two\r\n");

        let mut cursor = TailCursor::new(path.clone());
        cursor.read_new().await.unwrap();

        // Rotation: file is recreated shorter than the cursor offset.
        write_file(&path, "fresh\r\n");
        assert_eq!(cursor.read_new().await.unwrap(), vec!["fresh"]);
        assert_eq!(cursor.offset, "fresh\r\n".len() as u64);
    }

    #[tokio::test]
    async fn truncation_discards_carried_partial() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("game.log");
        write_file(&path, "done\r\ndangl");

        let mut cursor = TailCursor::new(path.clone());
        cursor.read_new().await.unwrap();

        write_file(&path, "x\r\n");
        assert_eq!(cursor.read_new().await.unwrap(), vec!["x"]);
    }

    #[tokio::test]
    async fn missing_file_errors() {
        let dir = TempDir::new().unwrap();
        let mut cursor = TailCursor::new(dir.path().join("nope.log"));
        assert!(cursor.read_new().await.is_err());
    }

    // ==================== LogTailer Tests ====================

    #[tokio::test]
    async fn spawn_emits_initial_batch() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("game.log");
        write_file(&path, "LogInit: Display: Engine start\r\n");

        let mut rx = LogTailer::new(&path).spawn();
        match timeout(Duration::from_secs(5), rx.recv()).await.unwrap() {
            Some(LogEvent::Initial(lines)) => {
                assert_eq!(lines, vec!["LogInit: Display: Engine start"]);
            }
            other => panic!("expected initial event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn spawn_emits_empty_initial_for_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("game.log");
        write_file(&path, "");

        let mut rx = LogTailer::new(&path).spawn();
        match timeout(Duration::from_secs(5), rx.recv()).await.unwrap() {
            Some(LogEvent::Initial(lines)) => assert!(lines.is_empty()),
            other => panic!("expected initial event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn spawn_reports_missing_file() {
        let dir = TempDir::new().unwrap();
        let mut rx = LogTailer::new(dir.path().join("nope.log")).spawn();

        match timeout(Duration::from_secs(5), rx.recv()).await.unwrap() {
            Some(LogEvent::Error(TailerError::Io(_))) => {}
            other => panic!("expected error event, got {other:?}"),
        }
        // Stream closes after the terminal error.
        assert!(timeout(Duration::from_secs(5), rx.recv()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn spawn_delivers_appends_in_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("game.log");
        write_file(&path, "start\r\n");

        let mut rx = LogTailer::new(&path).spawn();
        match timeout(Duration::from_secs(5), rx.recv()).await.unwrap() {
            Some(LogEvent::Initial(_)) => {}
            other => panic!("expected initial event, got {other:?}"),
        }

        append_file(&path, "second\r\n");
        append_file(&path, "third\r\n");

        let mut seen = Vec::new();
        while seen != vec!["second".to_string(), "third".to_string()] {
            match timeout(Duration::from_secs(10), rx.recv()).await.unwrap() {
                Some(LogEvent::Append(lines)) => seen.extend(lines),
                other => panic!("expected append event, got {other:?}"),
            }
        }
    }
}
