//! Logging for Galaxy GFX
//!
//! Every message goes through one global `Logger` (colored console output by
//! default). Messages below the minimum severity are dropped before a
//! `LogEntry` is built. Errors carry the file and line of the macro call.

use colored::*;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{OnceLock, RwLock};
use std::time::SystemTime;
use chrono::{DateTime, Local};

static LOGGER: OnceLock<RwLock<Box<dyn Logger>>> = OnceLock::new();

static MIN_SEVERITY: AtomicU8 = AtomicU8::new(LogSeverity::Trace as u8);

/// Destination of GFX log entries
///
/// Implement this trait to route GFX logs elsewhere (file, editor console, etc.)
///
/// # Example
///
/// ```no_run
/// use galaxy_gfx::gfx::log::{Logger, LogEntry};
///
/// struct FileLogger {
///     file: std::fs::File,
/// }
///
/// impl Logger for FileLogger {
///     fn log(&self, entry: &LogEntry) {
///         // Write to file...
///     }
/// }
/// ```
pub trait Logger: Send + Sync {
    fn log(&self, entry: &LogEntry);
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub severity: LogSeverity,
    pub timestamp: SystemTime,
    /// Subsystem, e.g. "gfx::Context" or "gfx::vulkan"
    pub source: String,
    pub message: String,
    /// Call site; only set for errors
    pub file: Option<&'static str>,
    pub line: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum LogSeverity {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
}

impl LogSeverity {
    /// Fixed-width label used in formatted output
    pub fn label(self) -> &'static str {
        match self {
            LogSeverity::Trace => "TRACE",
            LogSeverity::Debug => "DEBUG",
            LogSeverity::Info => "INFO ",
            LogSeverity::Warn => "WARN ",
            LogSeverity::Error => "ERROR",
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => LogSeverity::Trace,
            1 => LogSeverity::Debug,
            2 => LogSeverity::Info,
            3 => LogSeverity::Warn,
            _ => LogSeverity::Error,
        }
    }
}

/// Console logger
///
/// Format: `[timestamp] [SEVERITY] [source] message`, followed by
/// `(file:line)` for errors. Warnings and errors go to stderr.
pub struct DefaultLogger;

impl DefaultLogger {
    fn timestamp(entry: &LogEntry) -> String {
        let datetime: DateTime<Local> = entry.timestamp.into();
        datetime.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
    }

    fn location(entry: &LogEntry) -> String {
        match (entry.file, entry.line) {
            (Some(file), Some(line)) => format!(" ({}:{})", file, line),
            _ => String::new(),
        }
    }

    /// Format an entry without colors (tests, file loggers)
    pub fn format_plain(entry: &LogEntry) -> String {
        format!(
            "[{}] [{}] [{}] {}{}",
            Self::timestamp(entry),
            entry.severity.label(),
            entry.source,
            entry.message,
            Self::location(entry)
        )
    }
}

impl Logger for DefaultLogger {
    fn log(&self, entry: &LogEntry) {
        let label = entry.severity.label();
        let severity = match entry.severity {
            LogSeverity::Trace => label.bright_black(),
            LogSeverity::Debug => label.cyan(),
            LogSeverity::Info => label.green(),
            LogSeverity::Warn => label.yellow(),
            LogSeverity::Error => label.red().bold(),
        };
        let line = format!(
            "[{}] [{}] [{}] {}{}",
            Self::timestamp(entry),
            severity,
            entry.source.bright_blue(),
            entry.message,
            Self::location(entry)
        );
        if entry.severity >= LogSeverity::Warn {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
    }
}

// ===== GLOBAL LOGGER =====

fn logger_slot() -> &'static RwLock<Box<dyn Logger>> {
    LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)))
}

/// Replace the global logger
///
/// # Example
///
/// ```no_run
/// use galaxy_gfx::gfx::log::{self, Logger, LogEntry};
///
/// struct Silent;
/// impl Logger for Silent {
///     fn log(&self, _entry: &LogEntry) {}
/// }
///
/// log::set_logger(Silent);
/// ```
pub fn set_logger<L: Logger + 'static>(logger: L) {
    let mut slot = logger_slot().write().unwrap_or_else(|e| e.into_inner());
    *slot = Box::new(logger);
}

/// Restore the console logger and let every severity through
pub fn reset_logger() {
    let mut slot = logger_slot().write().unwrap_or_else(|e| e.into_inner());
    *slot = Box::new(DefaultLogger);
    set_min_severity(LogSeverity::Trace);
}

/// Drop messages below `severity`
pub fn set_min_severity(severity: LogSeverity) {
    MIN_SEVERITY.store(severity as u8, Ordering::Relaxed);
}

pub fn min_severity() -> LogSeverity {
    LogSeverity::from_u8(MIN_SEVERITY.load(Ordering::Relaxed))
}

/// Whether a message of `severity` would reach the logger
pub fn enabled(severity: LogSeverity) -> bool {
    severity >= min_severity()
}

/// Build an entry and hand it to the global logger (used by the engine_* macros)
pub fn emit(severity: LogSeverity, source: &str, message: String, location: Option<(&'static str, u32)>) {
    if !enabled(severity) {
        return;
    }
    let entry = LogEntry {
        severity,
        timestamp: SystemTime::now(),
        source: source.to_string(),
        message,
        file: location.map(|(file, _)| file),
        line: location.map(|(_, line)| line),
    };
    logger_slot().read().unwrap_or_else(|e| e.into_inner()).log(&entry);
}

// ===== LOGGING MACROS =====

/// Log a TRACE message
///
/// # Example
///
/// ```no_run
/// galaxy_gfx::engine_trace!("gfx::CommandBuffer", "Encoding {} commands", 12);
/// ```
#[macro_export]
macro_rules! engine_trace {
    ($source:expr, $($arg:tt)*) => {
        if $crate::log::enabled($crate::log::LogSeverity::Trace) {
            $crate::log::emit($crate::log::LogSeverity::Trace, $source, format!($($arg)*), None)
        }
    };
}

#[macro_export]
macro_rules! engine_debug {
    ($source:expr, $($arg:tt)*) => {
        if $crate::log::enabled($crate::log::LogSeverity::Debug) {
            $crate::log::emit($crate::log::LogSeverity::Debug, $source, format!($($arg)*), None)
        }
    };
}

/// Log an INFO message
///
/// # Example
///
/// ```no_run
/// galaxy_gfx::engine_info!("gfx::Context", "Context created with {} frames in flight", 2);
/// ```
#[macro_export]
macro_rules! engine_info {
    ($source:expr, $($arg:tt)*) => {
        $crate::log::emit($crate::log::LogSeverity::Info, $source, format!($($arg)*), None)
    };
}

#[macro_export]
macro_rules! engine_warn {
    ($source:expr, $($arg:tt)*) => {
        $crate::log::emit($crate::log::LogSeverity::Warn, $source, format!($($arg)*), None)
    };
}

/// Log an ERROR message with the call site
#[macro_export]
macro_rules! engine_error {
    ($source:expr, $($arg:tt)*) => {
        $crate::log::emit(
            $crate::log::LogSeverity::Error,
            $source,
            format!($($arg)*),
            Some((file!(), line!()))
        )
    };
}

/// Log an ERROR and evaluate to `Error::BackendError` with the same message
///
/// # Example
///
/// ```ignore
/// device.create_fence(&info, None)
///     .map_err(|e| engine_err!("gfx::vulkan", "Failed to create fence: {:?}", e))?;
/// ```
#[macro_export]
macro_rules! engine_err {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::log::emit(
            $crate::log::LogSeverity::Error,
            $source,
            message.clone(),
            Some((file!(), line!()))
        );
        $crate::gfx::Error::BackendError(message)
    }};
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
