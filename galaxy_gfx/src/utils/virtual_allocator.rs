/// Offset value equivalent to a failed allocation
pub const INVALID_OFFSET: u64 = u64::MAX;

/// A contiguous byte range inside the managed extent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    /// Start offset in bytes
    pub offset: u64,
    /// Length in bytes
    pub size: u64,
}

impl Block {
    /// One past the last byte of the block
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }
}

/// Best-fit offset allocator over a single linear byte range.
///
/// Does not own any memory: it hands out offsets into something else,
/// typically one large GPU buffer that is sub-allocated for many small
/// uploads. Free blocks are kept sorted by offset and merged with their
/// neighbours on every `free()`.
///
/// This is a simple linear-scan allocator. Every allocation walks all free
/// blocks and picks the one that leaves the smallest remainder once the
/// alignment padding is accounted for. Alignment padding stays in the free
/// list, so `free_space() + used_space() == size()` always holds.
///
/// # Example
///
/// ```ignore
/// let mut alloc = VirtualAllocator::new(100);
/// assert_eq!(alloc.allocate(60, 1), Some(0));
/// assert_eq!(alloc.allocate(50, 1), None);
/// alloc.free(0, 60);
/// assert_eq!(alloc.allocate(50, 1), Some(0));
/// ```
#[derive(Debug, Clone)]
pub struct VirtualAllocator {
    size: u64,
    free_blocks: Vec<Block>,
    used_blocks: Vec<Block>,
}

impl VirtualAllocator {
    /// Create an allocator managing `[0, size)`
    pub fn new(size: u64) -> Self {
        let free_blocks = if size > 0 {
            vec![Block { offset: 0, size }]
        } else {
            Vec::new()
        };
        Self {
            size,
            free_blocks,
            used_blocks: Vec::new(),
        }
    }

    /// Allocate `size` bytes aligned to `alignment` (0 is treated as 1).
    ///
    /// Returns the aligned offset, or `None` when no free block can hold the
    /// request.
    pub fn allocate(&mut self, size: u64, alignment: u64) -> Option<u64> {
        if size == 0 {
            return None;
        }
        let alignment = alignment.max(1);

        let mut best: Option<(usize, u64, u64)> = None; // (index, aligned offset, leftover)
        for (index, block) in self.free_blocks.iter().enumerate() {
            let Some(aligned) = align_up(block.offset, alignment) else {
                continue;
            };
            let padding = aligned - block.offset;
            let needed = match padding.checked_add(size) {
                Some(needed) => needed,
                None => continue,
            };
            if needed > block.size {
                continue;
            }
            let leftover = block.size - needed;
            if best.map_or(true, |(_, _, best_leftover)| leftover < best_leftover) {
                best = Some((index, aligned, leftover));
            }
        }

        let (index, aligned, _) = best?;
        let block = self.free_blocks.remove(index);

        // Tail first so the head (padding) ends up at `index` and ordering holds
        let tail = Block {
            offset: aligned + size,
            size: block.end() - (aligned + size),
        };
        if tail.size > 0 {
            self.free_blocks.insert(index, tail);
        }
        let head = Block {
            offset: block.offset,
            size: aligned - block.offset,
        };
        if head.size > 0 {
            self.free_blocks.insert(index, head);
        }

        self.used_blocks.push(Block { offset: aligned, size });
        Some(aligned)
    }

    /// Release a range previously returned by `allocate()`
    pub fn free(&mut self, offset: u64, size: u64) {
        let position = self
            .used_blocks
            .iter()
            .position(|block| block.offset == offset && block.size == size);
        debug_assert!(
            position.is_some(),
            "freeing a range that was never allocated: offset {} size {}",
            offset,
            size
        );
        let Some(position) = position else {
            return;
        };
        let block = self.used_blocks.swap_remove(position);

        self.free_blocks.push(block);
        self.free_blocks.sort_by_key(|block| block.offset);
        self.coalesce();
    }

    /// Grow the managed range to `new_size`. Shrinking is ignored.
    pub fn resize(&mut self, new_size: u64) {
        if new_size <= self.size {
            return;
        }
        let old_size = self.size;
        let grown = new_size - old_size;
        self.size = new_size;

        match self.free_blocks.last_mut() {
            Some(last) if last.end() == old_size => last.size += grown,
            _ => self.free_blocks.push(Block {
                offset: old_size,
                size: grown,
            }),
        }
    }

    /// Total managed size in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Sum of all free block sizes
    pub fn free_space(&self) -> u64 {
        self.free_blocks.iter().map(|block| block.size).sum()
    }

    /// Sum of all live allocation sizes
    pub fn used_space(&self) -> u64 {
        self.used_blocks.iter().map(|block| block.size).sum()
    }

    /// Free blocks, sorted by offset
    pub fn free_blocks(&self) -> &[Block] {
        &self.free_blocks
    }

    /// Live allocations, in no particular order
    pub fn used_blocks(&self) -> &[Block] {
        &self.used_blocks
    }

    /// Whether nothing is currently allocated
    pub fn is_empty(&self) -> bool {
        self.used_blocks.is_empty()
    }

    fn coalesce(&mut self) {
        let mut merged: Vec<Block> = Vec::with_capacity(self.free_blocks.len());
        for block in self.free_blocks.drain(..) {
            match merged.last_mut() {
                Some(previous) if previous.end() == block.offset => previous.size += block.size,
                _ => merged.push(block),
            }
        }
        self.free_blocks = merged;
    }
}

fn align_up(value: u64, alignment: u64) -> Option<u64> {
    let remainder = value % alignment;
    if remainder == 0 {
        Some(value)
    } else {
        value.checked_add(alignment - remainder)
    }
}

#[cfg(test)]
#[path = "virtual_allocator_tests.rs"]
mod tests;
