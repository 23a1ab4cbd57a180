/// Backend-independent helpers: ID pools, offset allocation, deferred deletion

pub mod resource_id_pool;
pub mod virtual_allocator;
pub mod deletion_queue;

pub use resource_id_pool::{ResourceIdPool, DEFAULT_POOL_CAPACITY};
pub use virtual_allocator::{VirtualAllocator, Block, INVALID_OFFSET};
pub use deletion_queue::DeletionQueue;
