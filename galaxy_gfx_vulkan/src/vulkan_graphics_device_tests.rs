use super::*;

fn complete_features() -> (vk::PhysicalDeviceVulkan12Features<'static>, vk::PhysicalDeviceVulkan13Features<'static>) {
    let features12 = vk::PhysicalDeviceVulkan12Features::default()
        .descriptor_indexing(true)
        .runtime_descriptor_array(true)
        .descriptor_binding_partially_bound(true)
        .descriptor_binding_update_unused_while_pending(true)
        .descriptor_binding_storage_buffer_update_after_bind(true)
        .descriptor_binding_sampled_image_update_after_bind(true)
        .descriptor_binding_storage_image_update_after_bind(true)
        .shader_sampled_image_array_non_uniform_indexing(true)
        .shader_storage_buffer_array_non_uniform_indexing(true)
        .buffer_device_address(true);
    let features13 = vk::PhysicalDeviceVulkan13Features::default()
        .dynamic_rendering(true)
        .synchronization2(true);
    (features12, features13)
}

fn memory_properties(types: &[(vk::MemoryPropertyFlags, u32)], heaps: &[u64]) -> vk::PhysicalDeviceMemoryProperties {
    let mut properties = vk::PhysicalDeviceMemoryProperties::default();
    for (i, &(flags, heap_index)) in types.iter().enumerate() {
        properties.memory_types[i] = vk::MemoryType { property_flags: flags, heap_index };
    }
    properties.memory_type_count = types.len() as u32;
    for (i, &size) in heaps.iter().enumerate() {
        properties.memory_heaps[i] = vk::MemoryHeap { size, flags: vk::MemoryHeapFlags::DEVICE_LOCAL };
    }
    properties.memory_heap_count = heaps.len() as u32;
    properties
}

// ============================================================================
// Device selection
// ============================================================================

#[test]
fn test_device_type_score_prefers_discrete() {
    let discrete = device_type_score(vk::PhysicalDeviceType::DISCRETE_GPU);
    let integrated = device_type_score(vk::PhysicalDeviceType::INTEGRATED_GPU);
    let cpu = device_type_score(vk::PhysicalDeviceType::CPU);

    assert!(discrete > integrated);
    assert!(integrated > cpu);
    assert!(cpu > device_type_score(vk::PhysicalDeviceType::OTHER));
}

#[test]
fn test_missing_features_none_when_complete() {
    let (features12, features13) = complete_features();
    assert!(missing_features(&features12, &features13).is_empty());
}

#[test]
fn test_missing_features_names_what_is_absent() {
    let (features12, features13) = complete_features();
    let features12 = features12.descriptor_binding_partially_bound(false);
    let features13 = features13.dynamic_rendering(false);

    let missing = missing_features(&features12, &features13);
    assert_eq!(missing, vec!["descriptorBindingPartiallyBound", "dynamicRendering"]);
}

#[test]
fn test_missing_features_all_absent_on_default() {
    let missing = missing_features(
        &vk::PhysicalDeviceVulkan12Features::default(),
        &vk::PhysicalDeviceVulkan13Features::default(),
    );
    assert_eq!(missing.len(), 12);
}

#[test]
fn test_clamp_frames_in_flight() {
    assert_eq!(clamp_frames_in_flight(0), 1);
    assert_eq!(clamp_frames_in_flight(2), 2);
    assert_eq!(clamp_frames_in_flight(8), MAX_FRAMES_IN_FLIGHT);
}

// ============================================================================
// Host-visible device memory
// ============================================================================

#[test]
fn test_host_visible_device_memory_large_bar() {
    let properties = memory_properties(
        &[
            (vk::MemoryPropertyFlags::DEVICE_LOCAL, 0),
            (vk::MemoryPropertyFlags::DEVICE_LOCAL | vk::MemoryPropertyFlags::HOST_VISIBLE, 0),
        ],
        &[8 * 1024 * 1024 * 1024],
    );
    assert!(has_host_visible_device_memory(&properties));
}

#[test]
fn test_host_visible_device_memory_small_bar_window() {
    let properties = memory_properties(
        &[
            (vk::MemoryPropertyFlags::DEVICE_LOCAL, 0),
            (vk::MemoryPropertyFlags::DEVICE_LOCAL | vk::MemoryPropertyFlags::HOST_VISIBLE, 1),
        ],
        &[8 * 1024 * 1024 * 1024, 256 * 1024 * 1024 - 1],
    );
    assert!(!has_host_visible_device_memory(&properties));
}

#[test]
fn test_host_visible_device_memory_absent() {
    let properties = memory_properties(
        &[
            (vk::MemoryPropertyFlags::DEVICE_LOCAL, 0),
            (vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT, 1),
        ],
        &[4 * 1024 * 1024 * 1024, 16 * 1024 * 1024 * 1024],
    );
    assert!(!has_host_visible_device_memory(&properties));
}

#[test]
fn test_host_visible_device_memory_ignores_types_past_count() {
    let mut properties = memory_properties(
        &[(vk::MemoryPropertyFlags::DEVICE_LOCAL | vk::MemoryPropertyFlags::HOST_VISIBLE, 0)],
        &[8 * 1024 * 1024 * 1024],
    );
    properties.memory_type_count = 0;
    assert!(!has_host_visible_device_memory(&properties));
}
