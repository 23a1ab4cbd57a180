/// Vulkan debug messenger
///
/// Validation layer messages are filtered by severity and category, counted,
/// tagged with their repeat count, and forwarded to the engine logger and/or
/// a log file as configured by `DebugConfig`.

use ash::vk;
use colored::*;
use galaxy_gfx::gfx::log::LogSeverity;
use galaxy_gfx::gfx::{DebugConfig, DebugMessageFilter, DebugOutput, DebugSeverity, ValidationStats};
use rustc_hash::FxHashMap;
use std::ffi::CStr;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

/// Configuration read by the callback; `None` silences it
static DEBUG_CONFIG: Mutex<Option<DebugConfig>> = Mutex::new(None);

static VALIDATION_STATS: StatsCounters = StatsCounters::new();

/// Occurrences per distinct message text
static MESSAGE_COUNTS: Mutex<Option<FxHashMap<String, u32>>> = Mutex::new(None);

struct StatsCounters {
    errors: AtomicU32,
    warnings: AtomicU32,
    info: AtomicU32,
    verbose: AtomicU32,
}

impl StatsCounters {
    const fn new() -> Self {
        Self {
            errors: AtomicU32::new(0),
            warnings: AtomicU32::new(0),
            info: AtomicU32::new(0),
            verbose: AtomicU32::new(0),
        }
    }

    fn snapshot(&self) -> ValidationStats {
        ValidationStats {
            errors: self.errors.load(Ordering::Relaxed),
            warnings: self.warnings.load(Ordering::Relaxed),
            info: self.info.load(Ordering::Relaxed),
            verbose: self.verbose.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        self.errors.store(0, Ordering::Relaxed);
        self.warnings.store(0, Ordering::Relaxed);
        self.info.store(0, Ordering::Relaxed);
        self.verbose.store(0, Ordering::Relaxed);
    }
}

/// Install the callback configuration and reset statistics
pub fn init_debug_config(config: DebugConfig) {
    VALIDATION_STATS.reset();
    *MESSAGE_COUNTS.lock().unwrap_or_else(|e| e.into_inner()) = Some(FxHashMap::default());
    *DEBUG_CONFIG.lock().unwrap_or_else(|e| e.into_inner()) = Some(config);
}

/// Silence the callback (device teardown)
pub(crate) fn cleanup_debug_config() {
    *DEBUG_CONFIG.lock().unwrap_or_else(|e| e.into_inner()) = None;
}

/// Messenger severity mask for a configured severity
pub(crate) fn severity_flags(severity: DebugSeverity) -> vk::DebugUtilsMessageSeverityFlagsEXT {
    match severity {
        DebugSeverity::ErrorsOnly => vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        DebugSeverity::ErrorsAndWarnings => {
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
        }
        DebugSeverity::All => {
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                | vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
        }
    }
}

/// Validation message counters since the last device creation
pub fn get_validation_stats() -> ValidationStats {
    VALIDATION_STATS.snapshot()
}

/// Print the validation statistics to stdout
pub fn print_validation_stats_report() {
    let stats = get_validation_stats();

    if stats.total() == 0 {
        println!("\n{}", "No validation messages".green().bold());
        return;
    }

    println!("\n{}", "=== Validation Statistics ===".bright_blue().bold());
    if stats.errors > 0 {
        println!("  {} {}", "Errors:".red().bold(), stats.errors);
    }
    if stats.warnings > 0 {
        println!("  {} {}", "Warnings:".yellow().bold(), stats.warnings);
    }
    if stats.info > 0 {
        println!("  {} {}", "Info:".cyan(), stats.info);
    }
    if stats.verbose > 0 {
        println!("  {} {}", "Verbose:".bright_black(), stats.verbose);
    }
    println!("  {} {}", "Total:".white().bold(), stats.total());

    let counts = MESSAGE_COUNTS.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(counts) = counts.as_ref() {
        let repeated = counts.values().filter(|&&count| count > 1).count();
        if repeated > 0 {
            println!("\n  {} message(s) appeared multiple times", repeated);
        }
    }
    println!("{}\n", "=============================".bright_blue().bold());
}

/// Record one more occurrence of `message`; returns its count
fn track_message(message: &str) -> u32 {
    let mut counts = MESSAGE_COUNTS.lock().unwrap_or_else(|e| e.into_inner());
    let count = counts
        .get_or_insert_with(FxHashMap::default)
        .entry(message.to_string())
        .or_insert(0);
    *count += 1;
    *count
}

/// Message category, in the order the flags are checked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MessageCategory {
    Validation,
    Performance,
    General,
}

impl MessageCategory {
    pub(crate) fn from_vk(message_type: vk::DebugUtilsMessageTypeFlagsEXT) -> Self {
        if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION) {
            MessageCategory::Validation
        } else if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
            MessageCategory::Performance
        } else {
            MessageCategory::General
        }
    }

    fn shown(self, filter: &DebugMessageFilter) -> bool {
        match self {
            MessageCategory::Validation => filter.show_validation,
            MessageCategory::Performance => filter.show_performance,
            MessageCategory::General => filter.show_general,
        }
    }

    fn name(self) -> &'static str {
        match self {
            MessageCategory::Validation => "Validation",
            MessageCategory::Performance => "Performance",
            MessageCategory::General => "General",
        }
    }
}

/// Engine log severity for a messenger severity (most severe bit wins)
pub(crate) fn log_severity(message_severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> LogSeverity {
    if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        LogSeverity::Error
    } else if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        LogSeverity::Warn
    } else if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        LogSeverity::Debug
    } else {
        LogSeverity::Trace
    }
}

fn counter(severity: LogSeverity) -> &'static AtomicU32 {
    match severity {
        LogSeverity::Error => &VALIDATION_STATS.errors,
        LogSeverity::Warn => &VALIDATION_STATS.warnings,
        LogSeverity::Debug | LogSeverity::Info => &VALIDATION_STATS.info,
        LogSeverity::Trace => &VALIDATION_STATS.verbose,
    }
}

/// Read a layer-owned C string, falling back to `default`
unsafe fn layer_str<'a>(ptr: *const std::os::raw::c_char, default: &'a str) -> std::borrow::Cow<'a, str> {
    if ptr.is_null() {
        default.into()
    } else {
        CStr::from_ptr(ptr).to_string_lossy()
    }
}

/// Vulkan debug messenger callback
///
/// Console output goes through the engine logger under "gfx::validation";
/// file output is written as plain text.
///
/// # Safety
///
/// Called by the validation layers with a valid callback data pointer.
pub unsafe extern "system" fn vulkan_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut std::os::raw::c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() {
        return vk::FALSE;
    }
    let config = match DEBUG_CONFIG.lock().unwrap_or_else(|e| e.into_inner()).as_ref() {
        Some(config) => config.clone(),
        None => return vk::FALSE,
    };
    if !severity_flags(config.severity).intersects(message_severity) {
        return vk::FALSE;
    }
    let category = MessageCategory::from_vk(message_type);
    if !category.shown(&config.message_filter) {
        return vk::FALSE;
    }

    let callback_data = &*p_callback_data;
    let message_id = layer_str(callback_data.p_message_id_name, "Unknown");
    let message = layer_str(callback_data.p_message, "No message");
    let severity = log_severity(message_severity);

    let occurrences = if config.enable_stats {
        counter(severity).fetch_add(1, Ordering::Relaxed);
        track_message(&message)
    } else {
        1
    };
    let repeat = if occurrences > 1 {
        format!(" [x{}]", occurrences)
    } else {
        String::new()
    };
    let text = format!("[{}]{} {}: {}", category.name(), repeat, message_id, message);

    let (to_console, to_file) = match &config.output {
        DebugOutput::Console => (true, None),
        DebugOutput::File(path) => (false, Some(path.as_str())),
        DebugOutput::Both(path) => (true, Some(path.as_str())),
    };
    if to_console {
        // No call site: the message originates in the driver
        galaxy_gfx::log::emit(severity, "gfx::validation", text.clone(), None);
    }
    if let Some(path) = to_file {
        write_to_file(path, &format!("[{}] {}", severity.label().trim_end(), text));
    }

    if severity == LogSeverity::Error && config.panic_on_error {
        panic!("Vulkan validation error (panic_on_error): {}", text);
    }
    if severity == LogSeverity::Error && config.break_on_error {
        eprintln!("{} {}", "BREAK ON VALIDATION ERROR - aborting:".red().bold(), message_id.yellow());
        std::process::abort();
    }

    vk::FALSE
}

fn write_to_file(path: &str, message: &str) {
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
        let _ = writeln!(file, "{}", message);
    }
}
