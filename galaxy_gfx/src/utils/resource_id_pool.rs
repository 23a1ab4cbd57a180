use std::sync::Mutex;

/// Default number of slots per bindless resource kind
pub const DEFAULT_POOL_CAPACITY: u32 = 65536;

/// Thread-safe pool of small `u32` handles for bindless slots.
///
/// Freed handles are kept on a stack and recycled first (LIFO); fresh
/// handles are handed out from a bump cursor until the capacity is reached.
/// Exhaustion is reported as `None` so callers can turn it into a
/// recoverable resource-creation error.
///
/// The capacity is capped below `u32::MAX`, which is the "invalid" sentinel
/// shared by every resource ID type, so the pool can never issue it.
///
/// # Example
///
/// ```ignore
/// let pool = ResourceIdPool::new(2);
/// let a = pool.allocate();   // Some(0)
/// let b = pool.allocate();   // Some(1)
/// assert!(pool.allocate().is_none());
/// pool.free(a.unwrap());
/// assert_eq!(pool.allocate(), Some(0));
/// ```
pub struct ResourceIdPool {
    state: Mutex<PoolState>,
    capacity: u32,
}

struct PoolState {
    free_list: Vec<u32>,
    next_id: u32,
    len: u32,
}

impl ResourceIdPool {
    /// Create a pool handing out IDs in `[0, capacity)`
    pub fn new(capacity: u32) -> Self {
        debug_assert!(capacity < u32::MAX, "pool capacity must stay below the invalid sentinel");
        Self {
            state: Mutex::new(PoolState {
                free_list: Vec::new(),
                next_id: 0,
                len: 0,
            }),
            capacity: capacity.min(u32::MAX - 1),
        }
    }

    /// Allocate the next free ID, or `None` when every slot is live
    pub fn allocate(&self) -> Option<u32> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let id = match state.free_list.pop() {
            Some(id) => id,
            None if state.next_id < self.capacity => {
                let id = state.next_id;
                state.next_id += 1;
                id
            }
            None => return None,
        };
        state.len += 1;
        Some(id)
    }

    /// Return an ID to the pool for reuse
    pub fn free(&self, id: u32) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        debug_assert!(id < state.next_id, "freeing an unallocated id: {}", id);
        debug_assert!(!state.free_list.contains(&id), "double free of id {}", id);
        state.len -= 1;
        state.free_list.push(id);
    }

    /// Number of currently live IDs
    pub fn len(&self) -> u32 {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).len
    }

    /// Whether no IDs are currently live
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of slots
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Number of IDs that can still be allocated
    pub fn available(&self) -> u32 {
        self.capacity - self.len()
    }

    /// Highest ID ever allocated + 1
    pub fn high_water_mark(&self) -> u32 {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).next_id
    }
}

impl Default for ResourceIdPool {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_CAPACITY)
    }
}

#[cfg(test)]
#[path = "resource_id_pool_tests.rs"]
mod tests;
