use std::collections::VecDeque;
use std::fmt::{self, Write as _};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tracing_appender::rolling;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_CAPTURE_CAPACITY: usize = 1000;
const LOG_RETENTION_DAYS: u64 = 7;

/// Log severity level, decoupled from the tracing types for report use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<tracing::Level> for LogLevel {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE => LogLevel::Trace,
            tracing::Level::DEBUG => LogLevel::Debug,
            tracing::Level::INFO => LogLevel::Info,
            tracing::Level::WARN => LogLevel::Warn,
            tracing::Level::ERROR => LogLevel::Error,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "TRACE"),
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// One captured log line.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: LogLevel,
    pub target: String,
    pub message: String,
}

/// Bounded, shareable buffer of recent log entries.
///
/// Caller-facing errors stay generic during certification runs; the detail
/// behind a rejection lands here instead. Hosts read the buffer after a run,
/// and tests use it to assert that validation specifics never leak into
/// returned errors. Clones share storage; the oldest entry is dropped once
/// the capacity is reached.
#[derive(Clone)]
pub struct LogBuffer {
    entries: Arc<Mutex<VecDeque<LogEntry>>>,
    capacity: usize,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    fn push(&self, entry: LogEntry) {
        if let Ok(mut entries) = self.entries.lock() {
            if entries.len() >= self.capacity {
                entries.pop_front();
            }
            entries.push_back(entry);
        }
    }

    /// Copy out the buffered entries, oldest first.
    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .map(|entries| entries.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// True when any buffered message contains `needle`.
    pub fn any_message_contains(&self, needle: &str) -> bool {
        self.snapshot()
            .iter()
            .any(|entry| entry.message.contains(needle))
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPTURE_CAPACITY)
    }
}

/// A tracing layer that feeds events into a [`LogBuffer`].
pub struct CaptureLayer {
    buffer: LogBuffer,
}

impl CaptureLayer {
    pub fn new(buffer: LogBuffer) -> Self {
        Self { buffer }
    }
}

impl<S: tracing::Subscriber> Layer<S> for CaptureLayer {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let mut formatter = EventFormatter::default();
        event.record(&mut formatter);

        self.buffer.push(LogEntry {
            level: (*event.metadata().level()).into(),
            target: event.metadata().target().to_string(),
            message: formatter.finish(),
        });
    }
}

/// Flattens an event's message and structured fields into one line.
#[derive(Default)]
struct EventFormatter {
    message: Option<String>,
    fields: String,
}

impl EventFormatter {
    fn push_field(&mut self, name: &str, value: fmt::Arguments<'_>) {
        if !self.fields.is_empty() {
            self.fields.push(' ');
        }
        let _ = write!(self.fields, "{name}={value}");
    }

    fn finish(self) -> String {
        match self.message {
            Some(message) if self.fields.is_empty() => message,
            Some(message) => format!("{message} {}", self.fields),
            None => self.fields,
        }
    }
}

impl tracing::field::Visit for EventFormatter {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{value:?}"));
        } else {
            self.push_field(field.name(), format_args!("{value:?}"));
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.push_field(field.name(), format_args!("{value}"));
        }
    }
}

/// Return the log directory path.
///
/// Precedence: `COSTKIT_LOG_DIR` env var > platform default.
/// macOS: `~/Library/Logs/costkit/`
/// Linux: `$XDG_DATA_HOME/costkit/logs/` or `~/.local/share/costkit/logs/`
pub fn log_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("COSTKIT_LOG_DIR") {
        return PathBuf::from(dir);
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = dirs::home_dir() {
            return home.join("Library").join("Logs").join("costkit");
        }
    }

    #[cfg(not(target_os = "macos"))]
    {
        if let Some(data) = dirs::data_dir() {
            return data.join("costkit").join("logs");
        }
    }

    PathBuf::from("logs")
}

/// Remove costkit log files older than `max_age_days` from the directory.
///
/// Only touches files named with the `costkit.log` prefix used by the daily
/// rolling appender; anything else in a shared log directory is left alone.
fn cleanup_old_logs(log_path: &std::path::Path, max_age_days: u64) {
    let cutoff =
        std::time::SystemTime::now() - std::time::Duration::from_secs(max_age_days * 86400);
    if let Ok(entries) = std::fs::read_dir(log_path) {
        for entry in entries.flatten() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if !name.starts_with("costkit.log") {
                continue;
            }
            if let Ok(meta) = entry.metadata() {
                if let Ok(modified) = meta.modified() {
                    if modified < cutoff {
                        let _ = std::fs::remove_file(entry.path());
                    }
                }
            }
        }
    }
}

/// Install the process-wide logging subsystem for a certifying host.
///
/// Filter controlled by `COSTKIT_LOG` or `RUST_LOG` (default: `info`).
/// File output: daily rotation in `log_dir()`, 7-day retention. The
/// returned buffer captures every accepted event for post-run inspection.
/// Must be called at most once per process; library code never calls it.
pub fn init() -> LogBuffer {
    let buffer = LogBuffer::default();

    let filter = EnvFilter::try_from_env("COSTKIT_LOG")
        .or_else(|_| EnvFilter::try_from_env("RUST_LOG"))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let log_path = log_dir();
    if let Err(e) = std::fs::create_dir_all(&log_path) {
        eprintln!(
            "warning: failed to create log directory {:?}: {}",
            log_path, e
        );
    }

    cleanup_old_logs(&log_path, LOG_RETENTION_DAYS);

    let file_appender = rolling::daily(&log_path, "costkit.log");
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(CaptureLayer::new(buffer.clone()))
        .init();

    buffer
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    // Serialize env-mutating tests to avoid data races.
    static ENV_LOCK: StdMutex<()> = StdMutex::new(());

    #[test]
    fn log_dir_respects_env_override() {
        let _guard = ENV_LOCK.lock().unwrap();
        let original = std::env::var("COSTKIT_LOG_DIR").ok();

        std::env::set_var("COSTKIT_LOG_DIR", "/tmp/costkit-test-logs");
        assert_eq!(log_dir(), PathBuf::from("/tmp/costkit-test-logs"));

        match original {
            Some(v) => std::env::set_var("COSTKIT_LOG_DIR", v),
            None => std::env::remove_var("COSTKIT_LOG_DIR"),
        }
    }

    #[test]
    fn buffer_drops_oldest_entry_at_capacity() {
        let buffer = LogBuffer::new(3);
        for i in 0..5 {
            buffer.push(LogEntry {
                level: LogLevel::Info,
                target: "test".into(),
                message: format!("msg {}", i),
            });
        }
        let entries = buffer.snapshot();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].message, "msg 2");
        assert_eq!(entries[2].message, "msg 4");
    }

    #[test]
    fn buffer_clones_share_storage() {
        let buffer = LogBuffer::new(8);
        let other = buffer.clone();
        buffer.push(LogEntry {
            level: LogLevel::Warn,
            target: "test".into(),
            message: "shared".into(),
        });
        assert_eq!(other.len(), 1);
        assert!(other.any_message_contains("shared"));
    }

    #[test]
    fn capture_layer_records_structured_fields() {
        let buffer = LogBuffer::new(16);
        let subscriber =
            tracing_subscriber::registry().with(CaptureLayer::new(buffer.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(plugin = "static-source", "metadata validation failed");
        });

        let entries = buffer.snapshot();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].level, LogLevel::Warn);
        assert!(entries[0].message.contains("metadata validation failed"));
        assert!(entries[0].message.contains("plugin=static-source"));
    }

    #[test]
    fn formatter_orders_message_before_fields() {
        let mut formatter = EventFormatter::default();
        formatter.message = Some("hello".into());
        formatter.push_field("a", format_args!("1"));
        formatter.push_field("b", format_args!("2"));
        assert_eq!(formatter.finish(), "hello a=1 b=2");
    }

    #[test]
    fn formatter_handles_fields_without_message() {
        let mut formatter = EventFormatter::default();
        formatter.push_field("a", format_args!("1"));
        assert_eq!(formatter.finish(), "a=1");
        assert_eq!(EventFormatter::default().finish(), "");
    }

    #[test]
    fn cleanup_old_logs_removes_stale_files() {
        let tmp = std::env::temp_dir().join("costkit-test-cleanup");
        let _ = std::fs::create_dir_all(&tmp);

        let stale_a = tmp.join("costkit.log.2025-01-01");
        let stale_b = tmp.join("costkit.log.2025-01-02");
        let other = tmp.join("other.txt");
        std::fs::write(&stale_a, "a").unwrap();
        std::fs::write(&stale_b, "b").unwrap();
        std::fs::write(&other, "c").unwrap();

        // max_age_days=0 means the cutoff is "now", so every matching file goes.
        cleanup_old_logs(&tmp, 0);
        assert!(!stale_a.exists());
        assert!(!stale_b.exists());
        assert!(other.exists(), "unrelated file should be preserved");

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
