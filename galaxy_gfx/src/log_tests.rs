//! Unit tests for log.rs
//!
//! Tests Logger trait, LogEntry, LogSeverity, DefaultLogger and the global
//! logger slot driven by the engine_* macros.

use crate::log::{self, Logger, LogEntry, LogSeverity, DefaultLogger};
use serial_test::serial;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

/// Logger that keeps every entry it receives
#[derive(Clone, Default)]
struct CaptureLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl CaptureLogger {
    fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().unwrap().clone()
    }
}

impl Logger for CaptureLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

fn entry(severity: LogSeverity, file: Option<&'static str>, line: Option<u32>) -> LogEntry {
    LogEntry {
        severity,
        timestamp: SystemTime::now(),
        source: "gfx::Context".to_string(),
        message: "context created".to_string(),
        file,
        line,
    }
}

// ============================================================================
// LOG SEVERITY TESTS
// ============================================================================

#[test]
fn test_log_severity_ordering() {
    assert!(LogSeverity::Trace < LogSeverity::Debug);
    assert!(LogSeverity::Debug < LogSeverity::Info);
    assert!(LogSeverity::Info < LogSeverity::Warn);
    assert!(LogSeverity::Warn < LogSeverity::Error);
}

#[test]
fn test_log_severity_debug() {
    assert_eq!(format!("{:?}", LogSeverity::Trace), "Trace");
    assert_eq!(format!("{:?}", LogSeverity::Error), "Error");
}

// ============================================================================
// DEFAULT LOGGER TESTS
// ============================================================================

#[test]
fn test_default_logger_all_severities() {
    let logger = DefaultLogger;
    for severity in [
        LogSeverity::Trace,
        LogSeverity::Debug,
        LogSeverity::Info,
        LogSeverity::Warn,
        LogSeverity::Error,
    ] {
        logger.log(&entry(severity, None, None));
        logger.log(&entry(severity, Some("context.rs"), Some(42)));
    }
}

#[test]
fn test_format_plain_without_file_line() {
    let text = DefaultLogger::format_plain(&entry(LogSeverity::Info, None, None));
    assert!(text.contains("[INFO ]"));
    assert!(text.contains("[gfx::Context]"));
    assert!(text.ends_with("context created"));
}

#[test]
fn test_format_plain_with_file_line() {
    let text = DefaultLogger::format_plain(&entry(LogSeverity::Error, Some("queue.rs"), Some(7)));
    assert!(text.contains("[ERROR]"));
    assert!(text.ends_with("(queue.rs:7)"));
}

#[test]
fn test_logger_trait_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<DefaultLogger>();
    assert_send_sync::<CaptureLogger>();
}

// ============================================================================
// GLOBAL LOGGER + MACRO TESTS
// ============================================================================

#[test]
#[serial]
fn test_macros_route_to_custom_logger() {
    let capture = CaptureLogger::default();
    log::set_logger(capture.clone());

    crate::engine_trace!("gfx::Test", "trace {}", 1);
    crate::engine_debug!("gfx::Test", "debug {}", 2);
    crate::engine_info!("gfx::Test", "info {}", 3);
    crate::engine_warn!("gfx::Test", "warn {}", 4);
    crate::engine_error!("gfx::Test", "error {}", 5);

    log::reset_logger();

    let entries = capture.entries();
    assert_eq!(entries.len(), 5);
    assert_eq!(entries[0].severity, LogSeverity::Trace);
    assert_eq!(entries[2].message, "info 3");
    assert_eq!(entries[4].severity, LogSeverity::Error);
    assert!(entries[4].file.is_some());
    assert!(entries[4].line.is_some());
    assert!(entries[3].file.is_none());
}

#[test]
#[serial]
fn test_engine_err_logs_and_builds_backend_error() {
    let capture = CaptureLogger::default();
    log::set_logger(capture.clone());

    let err = crate::engine_err!("gfx::vulkan", "vkCreateFence failed: {}", -2);

    log::reset_logger();

    assert_eq!(err, crate::error::Error::BackendError("vkCreateFence failed: -2".to_string()));
    let entries = capture.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].severity, LogSeverity::Error);
    assert_eq!(entries[0].source, "gfx::vulkan");
}

#[test]
#[serial]
fn test_min_severity_filters_lower_messages() {
    let capture = CaptureLogger::default();
    log::set_logger(capture.clone());
    log::set_min_severity(LogSeverity::Warn);

    crate::engine_debug!("gfx::Test", "dropped");
    crate::engine_info!("gfx::Test", "dropped too");
    crate::engine_warn!("gfx::Test", "kept");
    let err = crate::engine_err!("gfx::Test", "still an error");

    log::reset_logger();

    let entries = capture.entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].message, "kept");
    assert_eq!(entries[1].severity, LogSeverity::Error);
    assert_eq!(err, crate::error::Error::BackendError("still an error".to_string()));
}

#[test]
#[serial]
fn test_reset_logger_restores_min_severity() {
    log::set_min_severity(LogSeverity::Error);
    assert!(!log::enabled(LogSeverity::Info));

    log::reset_logger();

    assert_eq!(log::min_severity(), LogSeverity::Trace);
    assert!(log::enabled(LogSeverity::Trace));
}

#[test]
fn test_severity_labels_are_fixed_width() {
    for severity in [
        LogSeverity::Trace,
        LogSeverity::Debug,
        LogSeverity::Info,
        LogSeverity::Warn,
        LogSeverity::Error,
    ] {
        assert_eq!(severity.label().len(), 5);
    }
}
