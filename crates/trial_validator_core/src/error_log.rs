use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, Context};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::identifier::IdentifierProvider;

/// One line of the persistent error log, serialized as a single JSON
/// object:
/// `{"timestamp":"...","correlationId":"...","file":"...","message":"..."}`.
/// The timestamp is RFC 3339 UTC, the correlation id a UUID v4. Keys
/// are only ever added, never renamed, so existing logs stay readable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorLogEntry {
    pub timestamp: String,
    pub correlation_id: String,
    pub file: String,
    pub message: String,
}

/// Append-only JSON-lines log file. Appends go through a mutex so
/// callers validating files from several threads cannot interleave
/// partial lines.
pub struct ErrorLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl ErrorLog {
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create log directory {}", parent.display()))?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("open error log {}", path.display()))?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, entry: &ErrorLogEntry) -> anyhow::Result<()> {
        let mut line = serde_json::to_string(entry).context("serialize error log entry")?;
        line.push('\n');
        let mut file = self
            .file
            .lock()
            .map_err(|_| anyhow!("error log lock poisoned"))?;
        file.write_all(line.as_bytes())
            .and_then(|()| file.flush())
            .with_context(|| format!("append to error log {}", self.path.display()))?;
        Ok(())
    }
}

/// Stamps failures with a timestamp and correlation identifier,
/// appends them to the log and re-surfaces them. Never swallows an
/// error.
pub struct ErrorLogger {
    log: ErrorLog,
    ids: IdentifierProvider,
}

impl ErrorLogger {
    pub fn new(log: ErrorLog, ids: IdentifierProvider) -> Self {
        Self { log, ids }
    }

    pub fn log_path(&self) -> &Path {
        self.log.path()
    }

    /// Appends one entry for `message` in the context of `file`.
    pub fn record(&self, file: &str, message: &str) -> anyhow::Result<ErrorLogEntry> {
        let entry = ErrorLogEntry {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            correlation_id: self.ids.get_id(),
            file: file.to_string(),
            message: message.to_string(),
        };
        self.log.append(&entry)?;
        Ok(entry)
    }

    /// Runs one unit of work. Success passes through unchanged; a
    /// failure is logged with a correlation id and then returned to
    /// the caller.
    pub fn run<T>(
        &self,
        file: &str,
        op: impl FnOnce() -> anyhow::Result<T>,
    ) -> anyhow::Result<T> {
        match op() {
            Ok(value) => Ok(value),
            Err(err) => {
                if let Err(log_err) = self.record(file, &format!("{err:#}")) {
                    warn!("failed to write error log entry: {log_err:#}");
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};
    use uuid::Uuid;

    fn temp_log(prefix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time")
            .as_nanos();
        std::env::temp_dir().join(format!("{}_{}_{}.log", prefix, std::process::id(), nanos))
    }

    fn logger(path: &Path) -> ErrorLogger {
        let log = ErrorLog::open(path).expect("open log");
        ErrorLogger::new(log, IdentifierProvider::local_only())
    }

    #[test]
    fn record_appends_one_parseable_line() {
        let path = temp_log("trialgate_log");
        let logger = logger(&path);

        logger
            .record("CLINICALDATA_20250115120000.CSV", "Invalid filename pattern")
            .expect("record");

        let contents = fs::read_to_string(&path).expect("read log");
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 1);
        let entry: ErrorLogEntry = serde_json::from_str(lines[0]).expect("parse entry");
        assert_eq!(entry.file, "CLINICALDATA_20250115120000.CSV");
        assert_eq!(entry.message, "Invalid filename pattern");
        let parsed = Uuid::parse_str(&entry.correlation_id).expect("uuid");
        assert_eq!(parsed.get_version_num(), 4);

        fs::remove_file(&path).ok();
    }

    #[test]
    fn appends_accumulate_in_order() {
        let path = temp_log("trialgate_log_order");
        let logger = logger(&path);

        logger.record("a.CSV", "first").expect("record");
        logger.record("a.CSV", "second").expect("record");

        let contents = fs::read_to_string(&path).expect("read log");
        let messages: Vec<String> = contents
            .lines()
            .map(|line| serde_json::from_str::<ErrorLogEntry>(line).expect("parse").message)
            .collect();
        assert_eq!(messages, vec!["first", "second"]);

        fs::remove_file(&path).ok();
    }

    #[test]
    fn run_passes_success_through_without_logging() {
        let path = temp_log("trialgate_log_ok");
        let logger = logger(&path);

        let value = logger.run("a.CSV", || Ok(21 * 2)).expect("run");
        assert_eq!(value, 42);
        let contents = fs::read_to_string(&path).expect("read log");
        assert!(contents.is_empty());

        fs::remove_file(&path).ok();
    }

    #[test]
    fn run_logs_failure_and_resurfaces_it() {
        let path = temp_log("trialgate_log_err");
        let logger = logger(&path);

        let result: anyhow::Result<()> = logger.run("b.CSV", || Err(anyhow!("disk on fire")));
        assert!(result.is_err());

        let contents = fs::read_to_string(&path).expect("read log");
        let entry: ErrorLogEntry =
            serde_json::from_str(contents.lines().next().expect("line")).expect("parse");
        assert_eq!(entry.file, "b.CSV");
        assert!(entry.message.contains("disk on fire"));

        fs::remove_file(&path).ok();
    }

    #[test]
    fn concurrent_appends_stay_line_atomic() {
        let path = temp_log("trialgate_log_threads");
        let log = ErrorLog::open(&path).expect("open log");
        let logger = std::sync::Arc::new(ErrorLogger::new(log, IdentifierProvider::local_only()));

        let handles: Vec<_> = (0..4)
            .map(|worker| {
                let logger = logger.clone();
                std::thread::spawn(move || {
                    for i in 0..25 {
                        logger
                            .record(&format!("file{worker}.CSV"), &format!("entry {i}"))
                            .expect("record");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("join");
        }

        let contents = fs::read_to_string(&path).expect("read log");
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 100);
        for line in lines {
            serde_json::from_str::<ErrorLogEntry>(line).expect("every line parses");
        }

        fs::remove_file(&path).ok();
    }
}
