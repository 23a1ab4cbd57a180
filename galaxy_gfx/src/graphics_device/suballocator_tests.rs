use super::*;
use crate::graphics_device::mock_graphics_device::*;
use crate::graphics_device::BufferCreateInfo;

#[test]
fn test_allocate_aligned_slices() {
    let (context, _calls) = mock_context();
    let suballocator = context.create_suballocator(&BufferCreateInfo::mapped(1024)).unwrap();

    let a = suballocator.allocate(10, 1).unwrap();
    let b = suballocator.allocate(64, 256).unwrap();
    assert_eq!(a, BufferSlice { offset: 0, size: 10 });
    assert_eq!(b.offset % 256, 0);
    assert!(b.offset >= a.offset + a.size);
    assert_eq!(suballocator.used_space(), 74);
}

#[test]
fn test_exhausted_suballocator_returns_none() {
    let (context, _calls) = mock_context();
    let suballocator = context.create_suballocator(&BufferCreateInfo::mapped(128)).unwrap();

    let whole = suballocator.allocate(128, 1).unwrap();
    assert!(suballocator.allocate(1, 1).is_none());
    suballocator.free(whole);
    assert_eq!(suballocator.free_space(), 128);
    assert!(suballocator.allocate(128, 1).is_some());
}

#[test]
fn test_write_inside_slice() {
    let (context, _calls) = mock_context();
    let suballocator = context.create_suballocator(&BufferCreateInfo::mapped(256)).unwrap();
    let _padding = suballocator.allocate(16, 1).unwrap();
    let slice = suballocator.allocate(8, 8).unwrap();

    suballocator.write(slice, &[9; 8]).unwrap();
    let mut out = [0u8; 8];
    suballocator.buffer().read(slice.offset, &mut out).unwrap();
    assert_eq!(out, [9; 8]);

    assert!(matches!(suballocator.write(slice, &[0; 9]), Err(Error::InvalidResource(_))));
}

#[test]
fn test_slice_device_address() {
    let (context, _calls) = mock_context();
    let suballocator = context.create_suballocator(&BufferCreateInfo::mapped(256)).unwrap();
    let _first = suballocator.allocate(32, 1).unwrap();
    let slice = suballocator.allocate(32, 32).unwrap();
    assert_eq!(
        suballocator.device_address(slice),
        suballocator.buffer().device_address() + slice.offset
    );
}
