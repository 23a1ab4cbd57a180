//! Error types for the Galaxy GFX layer
//!
//! This module defines the error types used throughout the graphics layer,
//! including backend, initialization, presentation and resource management.
//!
//! Programmer contract violations (wrong texture layout, mismatched
//! attachment extents, recording outside `begin()`/`end()`) are not
//! represented here: they are checked with `debug_assert!` at the call site.

use std::fmt;

/// Result type for Galaxy GFX operations
pub type Result<T> = std::result::Result<T, Error>;

/// Galaxy GFX errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Backend-specific error (Vulkan, etc.)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (texture, buffer, shader, etc.)
    InvalidResource(String),

    /// Initialization failed (context, device, swapchain)
    InitializationFailed(String),

    /// No backend is registered for the requested API
    UnsupportedApi(String),

    /// The swapchain no longer matches its surface and must be recreated
    SwapchainOutOfDate,

    /// A bindless slot pool ran out of free IDs
    ResourceExhausted(String),

    /// A shader or data file does not exist
    FileNotFound(String),

    /// A shader or data file exists but could not be read
    FileNotReadable(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::UnsupportedApi(api) => write!(f, "Unsupported graphics API: {}", api),
            Error::SwapchainOutOfDate => write!(f, "Swapchain out of date"),
            Error::ResourceExhausted(kind) => write!(f, "Resource exhausted: {}", kind),
            Error::FileNotFound(path) => write!(f, "File not found: {}", path),
            Error::FileNotReadable(path) => write!(f, "File not readable: {}", path),
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    /// Whether the caller is expected to recover (recreate, retry) rather than abort
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::SwapchainOutOfDate | Error::ResourceExhausted(_))
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
