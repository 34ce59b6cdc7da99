use anyhow::{Context as _, Result};
use camino::Utf8PathBuf;
use std::collections::VecDeque;
use std::fmt;
use std::fs;
use std::sync::{Arc, Mutex};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_appender::rolling;
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// One captured log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: Level,
    pub time: String,
    pub message: String,
}

/// The most recent log lines, shared between the logging layer and whoever
/// displays them (the "about" surface).
#[derive(Debug, Clone, Default)]
pub struct RecentLog(Arc<Mutex<VecDeque<LogEntry>>>);

impl RecentLog {
    /// Lines kept before the oldest is dropped
    pub const CAPACITY: usize = 20;

    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, entry: LogEntry) {
        if let Ok(mut entries) = self.0.lock() {
            if entries.len() == Self::CAPACITY {
                entries.pop_front();
            }
            entries.push_back(entry);
        }
    }

    /// Snapshot, oldest first
    pub fn entries(&self) -> Vec<LogEntry> {
        self.0
            .lock()
            .map(|entries| entries.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Layer feeding this buffer
    pub fn layer(&self) -> RecentLogLayer {
        RecentLogLayer { log: self.clone() }
    }
}

/// `tracing` layer that copies every enabled event into a [`RecentLog`].
pub struct RecentLogLayer {
    log: RecentLog,
}

impl<S: Subscriber> Layer<S> for RecentLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        self.log.push(LogEntry {
            level: *event.metadata().level(),
            time: chrono::Local::now().format("%H:%M:%S%.3f").to_string(),
            message: visitor.message,
        });
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl MessageVisitor {
    fn append(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.insert_str(0, value);
        } else {
            self.message.push_str(&format!(" {}={}", field.name(), value));
        }
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.append(field, value);
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.append(field, &format!("{value:?}"));
    }
}

fn level_filter(debug_mode: bool) -> EnvFilter {
    if debug_mode {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    }
}

fn ensure_log_dir(log_dir: &str) -> Result<()> {
    let log_path = Utf8PathBuf::from(log_dir);
    if !log_path.exists() {
        fs::create_dir_all(&log_path)
            .with_context(|| format!("Failed to create log directory: {}", log_dir))?;
    }
    Ok(())
}

/// Setup logging with rotating file appender.
///
/// Logs are written to the specified directory with daily rotation, and the
/// last few lines are mirrored into `recent`.
///
/// # Arguments
/// * `log_dir` - Directory for log files (the settings directory)
/// * `log_prefix` - Prefix for log files (e.g., "skinhost.log")
/// * `debug_mode` - If true, use debug level; otherwise use info level
/// * `recent` - Buffer for the most recent lines
///
/// # Returns
/// A guard that must be held for the duration of the program to keep logging active
pub fn setup_logging(
    log_dir: &str,
    log_prefix: &str,
    debug_mode: bool,
    recent: &RecentLog,
) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    setup_logging_with_console(log_dir, log_prefix, debug_mode, false, recent)
}

/// Setup logging with optional console output for debugging.
///
/// # Arguments
/// * `log_dir` - Directory for log files
/// * `log_prefix` - Prefix for log files
/// * `debug_mode` - If true, use debug level; otherwise use info level
/// * `console_output` - If true, also log to console
/// * `recent` - Buffer for the most recent lines
///
/// # Returns
/// A guard that must be held for the duration of the program to keep logging active
pub fn setup_logging_with_console(
    log_dir: &str,
    log_prefix: &str,
    debug_mode: bool,
    console_output: bool,
    recent: &RecentLog,
) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    ensure_log_dir(log_dir)?;

    // Create daily rotating file appender
    let file_appender = rolling::daily(log_dir, log_prefix);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false) // No ANSI codes in log files
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let console_layer = console_output.then(|| {
        tracing_subscriber::fmt::layer()
            .with_ansi(true)
            .with_target(false)
    });

    tracing_subscriber::registry()
        .with(level_filter(debug_mode))
        .with(file_layer)
        .with(console_layer)
        .with(recent.layer())
        .try_init()
        .context("Logging is already initialized")?;

    tracing::info!(
        "Logging initialized: dir={}, prefix={}, debug={}, console={}",
        log_dir,
        log_prefix,
        debug_mode,
        console_output
    );

    Ok(guard)
}

/// Setup logging without a log file, for when the `Logging` option is off.
pub fn setup_console_logging(debug_mode: bool, recent: &RecentLog) -> Result<()> {
    tracing_subscriber::registry()
        .with(level_filter(debug_mode))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(true)
                .with_target(false),
        )
        .with(recent.layer())
        .try_init()
        .context("Logging is already initialized")?;
    Ok(())
}
