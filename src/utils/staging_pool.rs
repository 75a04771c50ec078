use std::sync::Arc;

use parking_lot::Mutex;

pub const DEFAULT_MIN_BLOCK_SIZE: u32 = 64;

/// Pool shared by the command lists of one device. The device hands out
/// clones of the `Arc`; callers serialize access through the mutex.
pub type SharedStagingPool = Arc<Mutex<StagingMemoryPool>>;

/// Pool-owned bytes holding data copied at record time.
#[derive(Debug)]
pub struct StagingBlock {
    id: u32,
    size: usize,
    data: Vec<u8>,
}

impl StagingBlock {
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Bytes requested by the caller.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Bytes backing the block. Always a power of two.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.size]
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data[..self.size]
    }
}

/// Free lists of byte blocks bucketed by power-of-two size class.
///
/// Requests never fail: when no free block is large enough a new one is
/// allocated. The pool has no lock of its own.
pub struct StagingMemoryPool {
    free: Vec<Vec<Vec<u8>>>,
    min_block_size: usize,
    next_id: u32,
    allocated: usize,
    rented: usize,
}

impl Default for StagingMemoryPool {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_BLOCK_SIZE)
    }
}

impl StagingMemoryPool {
    pub fn new(min_block_size: u32) -> Self {
        Self {
            free: Vec::new(),
            min_block_size: (min_block_size.max(1) as usize).next_power_of_two(),
            next_id: 0,
            allocated: 0,
            rented: 0,
        }
    }

    pub fn into_shared(self) -> SharedStagingPool {
        Arc::new(Mutex::new(self))
    }

    /// Copies `data` into a pool block.
    pub fn stage(&mut self, data: &[u8]) -> StagingBlock {
        let mut block = self.get_block(data.len());
        block.as_mut_slice().copy_from_slice(data);
        block
    }

    /// Reserves a block of `size` bytes. Contents are whatever the previous
    /// user left behind.
    pub fn get_block(&mut self, size: usize) -> StagingBlock {
        let class = self.size_class(size);
        let reused = self
            .free
            .iter_mut()
            .skip(class)
            .find_map(|list| list.pop());

        let data = match reused {
            Some(data) => data,
            None => {
                let capacity = self.class_capacity(class);
                log::debug!("staging pool: allocating {} byte block", capacity);
                self.allocated += 1;
                vec![0u8; capacity]
            }
        };

        self.rented += 1;
        self.next_id = self.next_id.wrapping_add(1);
        log::trace!("staging pool: rent {} bytes (block {})", size, self.next_id);
        StagingBlock {
            id: self.next_id,
            size,
            data,
        }
    }

    /// Returns a block to the free list of its size class.
    pub fn free(&mut self, block: StagingBlock) {
        log::trace!("staging pool: return block {}", block.id);
        let class = self.size_class(block.capacity());
        if self.free.len() <= class {
            self.free.resize_with(class + 1, Vec::new);
        }
        self.free[class].push(block.data);
        self.rented -= 1;
    }

    /// Blocks sitting in free lists.
    pub fn free_count(&self) -> usize {
        self.free.iter().map(Vec::len).sum()
    }

    /// Blocks ever allocated by this pool.
    pub fn allocated_count(&self) -> usize {
        self.allocated
    }

    /// Blocks handed out and not yet freed.
    pub fn rented_count(&self) -> usize {
        self.rented
    }

    /// Size classes are counted from the minimum block size. Rounding
    /// saturates at the top class instead of overflowing.
    fn size_class(&self, size: usize) -> usize {
        let capacity = size
            .max(self.min_block_size)
            .checked_next_power_of_two()
            .unwrap_or(1 << (usize::BITS - 1));
        (capacity.trailing_zeros() - self.min_block_size.trailing_zeros()) as usize
    }

    fn class_capacity(&self, class: usize) -> usize {
        self.min_block_size << class
    }
}
