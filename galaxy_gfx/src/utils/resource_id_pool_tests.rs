use super::*;
use std::collections::HashSet;
use std::sync::Arc;

// ============================================================================
// Basic allocation tests
// ============================================================================

#[test]
fn test_sequential_allocate() {
    let pool = ResourceIdPool::new(16);
    assert_eq!(pool.allocate(), Some(0));
    assert_eq!(pool.allocate(), Some(1));
    assert_eq!(pool.allocate(), Some(2));
    assert_eq!(pool.len(), 3);
}

#[test]
fn test_new_is_empty() {
    let pool = ResourceIdPool::new(16);
    assert!(pool.is_empty());
    assert_eq!(pool.capacity(), 16);
    assert_eq!(pool.available(), 16);
    assert_eq!(pool.high_water_mark(), 0);
}

#[test]
fn test_default_capacity() {
    let pool = ResourceIdPool::default();
    assert_eq!(pool.capacity(), DEFAULT_POOL_CAPACITY);
    assert_eq!(pool.capacity(), 65536);
}

#[test]
fn test_sequential_ids_are_distinct() {
    let pool = ResourceIdPool::new(1024);
    let ids: HashSet<u32> = (0..1024).map(|_| pool.allocate().unwrap()).collect();
    assert_eq!(ids.len(), 1024);
    assert!(ids.iter().all(|&id| id < 1024));
}

// ============================================================================
// Free and recycle tests
// ============================================================================

#[test]
fn test_free_multiple_recycle_lifo() {
    let pool = ResourceIdPool::new(16);
    let a = pool.allocate().unwrap(); // 0
    let _b = pool.allocate().unwrap(); // 1
    let c = pool.allocate().unwrap(); // 2
    pool.free(a);
    pool.free(c);

    // Free list is a stack: last freed = first recycled
    assert_eq!(pool.allocate(), Some(2));
    assert_eq!(pool.allocate(), Some(0));
    assert_eq!(pool.allocate(), Some(3));
}

#[test]
fn test_live_ids_never_duplicated() {
    let pool = ResourceIdPool::new(64);
    let mut live = HashSet::new();
    for _ in 0..50 {
        live.insert(pool.allocate().unwrap());
    }
    for id in 0..10 {
        pool.free(id);
        live.remove(&id);
    }
    for _ in 0..14 {
        let id = pool.allocate().unwrap();
        assert!(live.insert(id), "duplicate live id: {}", id);
    }
    assert_eq!(live.len(), 54);
    assert_eq!(pool.len(), 54);
}

// ============================================================================
// Exhaustion tests
// ============================================================================

#[test]
fn test_pool_exhaustion_scenario() {
    let pool = ResourceIdPool::new(2);
    let first = pool.allocate().unwrap();
    let second = pool.allocate().unwrap();
    assert_ne!(first, second);

    // Third allocation reports exhaustion instead of a bogus id
    assert_eq!(pool.allocate(), None);
    assert_eq!(pool.available(), 0);

    pool.free(first);
    assert_eq!(pool.allocate(), Some(first));
    assert_eq!(pool.allocate(), None);
}

#[test]
fn test_never_issues_invalid_sentinel() {
    let pool = ResourceIdPool::new(4);
    while let Some(id) = pool.allocate() {
        assert_ne!(id, u32::MAX);
    }
    assert_eq!(pool.len(), 4);
}

// ============================================================================
// Concurrency tests
// ============================================================================

#[test]
fn test_concurrent_allocate_free_keeps_ids_unique() {
    let pool = Arc::new(ResourceIdPool::new(4096));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let pool = Arc::clone(&pool);
            std::thread::spawn(move || {
                let mut mine = Vec::new();
                for i in 0..256 {
                    mine.push(pool.allocate().unwrap());
                    if i % 4 == 0 {
                        let id = mine.remove(0);
                        pool.free(id);
                    }
                }
                mine
            })
        })
        .collect();

    let mut all = HashSet::new();
    for handle in handles {
        for id in handle.join().unwrap() {
            assert!(all.insert(id), "id {} live on two threads", id);
        }
    }
    assert_eq!(all.len() as u32, pool.len());
}
