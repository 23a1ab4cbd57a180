//! Unit tests for error.rs
//!
//! Tests all Error variants and their implementations (Display, Debug, Clone, std::error::Error).

use crate::error::{Error, Result};

// ============================================================================
// ERROR DISPLAY TESTS
// ============================================================================

#[test]
fn test_backend_error_display() {
    let err = Error::BackendError("vkQueueSubmit failed".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Backend error"));
    assert!(display.contains("vkQueueSubmit failed"));
}

#[test]
fn test_out_of_memory_display() {
    let err = Error::OutOfMemory;
    assert_eq!(format!("{}", err), "Out of GPU memory");
}

#[test]
fn test_unsupported_api_display() {
    let err = Error::UnsupportedApi("Vulkan".to_string());
    assert_eq!(format!("{}", err), "Unsupported graphics API: Vulkan");
}

#[test]
fn test_swapchain_out_of_date_display() {
    assert_eq!(format!("{}", Error::SwapchainOutOfDate), "Swapchain out of date");
}

#[test]
fn test_resource_exhausted_display() {
    let err = Error::ResourceExhausted("texture slots".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Resource exhausted"));
    assert!(display.contains("texture slots"));
}

#[test]
fn test_file_errors_display() {
    let missing = Error::FileNotFound("shaders/mesh.vert.spv".to_string());
    assert!(format!("{}", missing).contains("File not found"));
    assert!(format!("{}", missing).contains("mesh.vert.spv"));

    let unreadable = Error::FileNotReadable("shaders/mesh.frag.spv".to_string());
    assert!(format!("{}", unreadable).contains("File not readable"));
}

// ============================================================================
// ERROR TRAIT IMPLEMENTATIONS
// ============================================================================

#[test]
fn test_error_is_std_error() {
    let err = Error::OutOfMemory;
    let _: &dyn std::error::Error = &err;
}

#[test]
fn test_error_debug() {
    assert!(format!("{:?}", Error::BackendError("x".to_string())).contains("BackendError"));
    assert!(format!("{:?}", Error::SwapchainOutOfDate).contains("SwapchainOutOfDate"));
    assert!(format!("{:?}", Error::ResourceExhausted("x".to_string())).contains("ResourceExhausted"));
}

#[test]
fn test_error_clone_and_eq() {
    let err1 = Error::InvalidResource("buffer".to_string());
    let err2 = err1.clone();
    assert_eq!(err1, err2);
    assert_ne!(err1, Error::OutOfMemory);
}

#[test]
fn test_recoverable_errors() {
    assert!(Error::SwapchainOutOfDate.is_recoverable());
    assert!(Error::ResourceExhausted("samplers".to_string()).is_recoverable());
    assert!(!Error::OutOfMemory.is_recoverable());
    assert!(!Error::UnsupportedApi("Vulkan".to_string()).is_recoverable());
}

// ============================================================================
// RESULT TYPE TESTS
// ============================================================================

#[test]
fn test_error_propagation_with_question_mark() {
    fn inner() -> Result<i32> {
        Err(Error::SwapchainOutOfDate)
    }

    fn outer() -> Result<i32> {
        inner()?;
        Ok(42)
    }

    assert_eq!(outer(), Err(Error::SwapchainOutOfDate));
}
