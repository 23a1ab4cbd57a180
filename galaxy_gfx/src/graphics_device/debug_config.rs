/// Validation-layer configuration and statistics

/// Which validation messages reach the output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DebugSeverity {
    /// Errors only
    ErrorsOnly,
    /// Errors and warnings
    #[default]
    ErrorsAndWarnings,
    /// Everything, including info and verbose messages
    All,
}

/// Where validation messages are written
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DebugOutput {
    /// Colored console output
    #[default]
    Console,
    /// Append to a log file
    File(String),
    /// Console and file
    Both(String),
}

/// Message categories to display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebugMessageFilter {
    pub show_general: bool,
    pub show_validation: bool,
    pub show_performance: bool,
}

impl Default for DebugMessageFilter {
    fn default() -> Self {
        Self {
            show_general: true,
            show_validation: true,
            show_performance: true,
        }
    }
}

/// Debug messenger configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugConfig {
    pub severity: DebugSeverity,
    pub output: DebugOutput,
    pub message_filter: DebugMessageFilter,
    /// Trigger a debugger breakpoint on validation errors
    pub break_on_error: bool,
    /// Panic on validation errors (useful in CI)
    pub panic_on_error: bool,
    /// Count messages per severity
    pub enable_stats: bool,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            severity: DebugSeverity::default(),
            output: DebugOutput::default(),
            message_filter: DebugMessageFilter::default(),
            break_on_error: false,
            panic_on_error: false,
            enable_stats: true,
        }
    }
}

/// Validation message counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValidationStats {
    pub errors: u32,
    pub warnings: u32,
    pub info: u32,
    pub verbose: u32,
}

impl ValidationStats {
    /// Total number of messages
    pub fn total(&self) -> u32 {
        self.errors + self.warnings + self.info + self.verbose
    }

    /// Whether any error was reported
    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }
}
