use serial_test::serial;

use super::*;
use crate::graphics_device::mock_graphics_device::MockGraphicsDevice;
use crate::graphics_device::Context;

const TEST_API: Api = Api::Custom("registry-test");

fn headless(api: Api) -> ContextCreateInfo {
    ContextCreateInfo {
        api,
        ..ContextCreateInfo::default()
    }
}

// ============================================================================
// Plugin registry
// ============================================================================

#[test]
#[serial]
fn test_register_and_create() {
    register_backend_plugin(TEST_API, |_info| Ok(Box::new(MockGraphicsDevice::new())));
    assert!(is_backend_registered(TEST_API));

    let context = Context::create(&headless(TEST_API)).unwrap();
    assert_eq!(context.api(), Api::Custom("mock"));
    assert_eq!(context.frames_in_flight(), 2);

    assert!(unregister_backend_plugin(TEST_API));
    assert!(!is_backend_registered(TEST_API));
}

#[test]
#[serial]
fn test_unregistered_api_is_unsupported() {
    unregister_backend_plugin(TEST_API);
    let result = Context::create(&headless(TEST_API));
    assert!(matches!(result, Err(Error::UnsupportedApi(_))));
}

#[test]
#[serial]
fn test_unregister_unknown_returns_false() {
    assert!(!unregister_backend_plugin(Api::Custom("never-registered")));
}

#[test]
#[serial]
fn test_factory_receives_create_info() {
    register_backend_plugin(TEST_API, |info| {
        Ok(Box::new(
            MockGraphicsDevice::new().with_frames_in_flight(info.preferred_frames_in_flight),
        ))
    });
    let info = ContextCreateInfo {
        preferred_frames_in_flight: 3,
        ..headless(TEST_API)
    };
    let context = Context::create(&info).unwrap();
    assert_eq!(context.frames_in_flight(), 3);
    unregister_backend_plugin(TEST_API);
}

#[test]
#[serial]
fn test_factory_error_is_propagated() {
    register_backend_plugin(TEST_API, |_info| {
        Err(Error::InitializationFailed("no suitable GPU".to_string()))
    });
    let result = Context::create(&headless(TEST_API));
    assert!(matches!(result, Err(Error::InitializationFailed(_))));
    unregister_backend_plugin(TEST_API);
}

// ============================================================================
// Create info validation
// ============================================================================

#[test]
fn test_default_create_info() {
    let info = ContextCreateInfo::default();
    assert_eq!(info.api, Api::Vulkan);
    assert_eq!(info.window_api, WindowApi::Headless);
    assert!(info.window.is_none());
    assert_eq!(info.preferred_frames_in_flight, 2);
    assert!(info.validate().is_ok());
}

#[test]
fn test_winit_without_window_is_invalid() {
    let info = ContextCreateInfo {
        window_api: WindowApi::Winit,
        ..ContextCreateInfo::default()
    };
    assert!(matches!(info.validate(), Err(Error::InitializationFailed(_))));
}

#[test]
fn test_zero_frames_in_flight_is_invalid() {
    let info = ContextCreateInfo {
        preferred_frames_in_flight: 0,
        ..ContextCreateInfo::default()
    };
    assert!(info.validate().is_err());
}

#[test]
#[serial]
fn test_invalid_info_fails_before_backend() {
    register_backend_plugin(TEST_API, |_info| panic!("factory must not run"));
    let info = ContextCreateInfo {
        preferred_frames_in_flight: 0,
        ..headless(TEST_API)
    };
    assert!(Context::create(&info).is_err());
    unregister_backend_plugin(TEST_API);
}

// ============================================================================
// Device requirements
// ============================================================================

#[test]
fn test_device_without_bindless_is_rejected() {
    let device = MockGraphicsDevice::new();
    let mut support = device.hardware_support();
    support.bindless = false;
    let result = Context::from_device(Box::new(device.with_support(support)));
    assert!(matches!(result, Err(Error::InitializationFailed(_))));
}
