use crate::error::Error;
use crate::graphics_device::mock_graphics_device::*;
use crate::graphics_device::{BufferCreateInfo, MapMode};

// ============================================================================
// Host access
// ============================================================================

#[test]
fn test_mapped_buffer_write_read_round_trip() {
    let (context, _calls) = mock_context();
    let buffer = context.create_buffer(&BufferCreateInfo::mapped(256)).unwrap();
    assert!(buffer.is_mapped());
    assert_eq!(buffer.size(), 256);

    let data: Vec<u8> = (0..64).collect();
    buffer.write(100, &data).unwrap();

    let mut out = vec![0u8; 64];
    buffer.read(100, &mut out).unwrap();
    assert_eq!(out, data);
}

#[test]
fn test_write_pod() {
    let (context, _calls) = mock_context();
    let buffer = context.create_buffer(&BufferCreateInfo::mapped(16)).unwrap();
    buffer.write_pod(0, &[1.0f32, 2.0, 3.0, 4.0]).unwrap();

    let mut out = [0u8; 16];
    buffer.read(0, &mut out).unwrap();
    let floats: &[f32] = bytemuck::cast_slice(&out);
    assert_eq!(floats, &[1.0, 2.0, 3.0, 4.0]);
}

#[test]
fn test_unmapped_buffer_rejects_host_access() {
    let (context, _calls) = mock_context();
    let buffer = context.create_buffer(&BufferCreateInfo::device_local(256)).unwrap();
    assert!(!buffer.is_mapped());

    assert!(matches!(buffer.write(0, &[1, 2, 3, 4]), Err(Error::InvalidResource(_))));
    let mut out = [0u8; 4];
    assert!(matches!(buffer.read(0, &mut out), Err(Error::InvalidResource(_))));
}

#[test]
fn test_out_of_range_write_is_rejected() {
    let (context, _calls) = mock_context();
    let buffer = context.create_buffer(&BufferCreateInfo::mapped(64)).unwrap();

    assert!(buffer.write(60, &[0; 4]).is_ok());
    assert!(matches!(buffer.write(61, &[0; 4]), Err(Error::InvalidResource(_))));
    assert!(matches!(buffer.write(u64::MAX, &[0; 1]), Err(Error::InvalidResource(_))));
}

#[test]
fn test_if_optimal_follows_device_memory() {
    let (context, _calls) = mock_context();
    let buffer = context
        .create_buffer(&BufferCreateInfo {
            size: 32,
            map_mode: MapMode::IfOptimal,
            cached: false,
        })
        .unwrap();
    // Mock device reports no host-visible device-local memory
    assert!(!buffer.is_mapped());
    assert_eq!(buffer.map_mode(), MapMode::IfOptimal);
}

// ============================================================================
// Bindless slot and lifetime
// ============================================================================

#[test]
fn test_buffer_gets_bindless_slot() {
    let (context, calls) = mock_context();
    let buffer = context.create_buffer(&BufferCreateInfo::mapped(64)).unwrap();
    let handle = buffer_handle_of(&buffer);

    assert!(calls.contains(&format!("write_buffer_descriptor {} -> #{}", buffer.id().index(), handle)));
    assert_eq!(context.resource_manager().live_buffers(), 1);
}

#[test]
fn test_distinct_buffers_have_distinct_ids() {
    let (context, _calls) = mock_context();
    let a = context.create_buffer(&BufferCreateInfo::mapped(64)).unwrap();
    let b = context.create_buffer(&BufferCreateInfo::mapped(64)).unwrap();
    assert_ne!(a.id(), b.id());
}

#[test]
fn test_drop_defers_release() {
    let (context, calls) = mock_context();
    let buffer = context.create_buffer(&BufferCreateInfo::mapped(64)).unwrap();
    let handle = buffer_handle_of(&buffer);
    let id = buffer.id();
    drop(buffer);

    // Slot and memory stay reserved until the frame slot retires
    assert!(!calls.contains(&format!("destroy_buffer #{}", handle)));
    assert_eq!(context.pending_deletions(0), 2);
    assert_eq!(context.resource_manager().live_buffers(), 1);

    assert_eq!(context.process_deletions(0), 2);
    assert!(calls.contains(&format!("destroy_buffer #{}", handle)));
    assert!(calls.contains(&format!("write_buffer_descriptor {} -> default", id.index())));
    assert_eq!(context.resource_manager().live_buffers(), 0);
}

#[test]
fn test_zero_size_buffer_is_invalid() {
    let (context, _calls) = mock_context();
    let result = context.create_buffer(&BufferCreateInfo::mapped(0));
    assert!(matches!(result, Err(Error::InvalidResource(_))));
}
