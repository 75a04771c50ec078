use bytemuck::{bytes_of, pod_read_unaligned};

use super::command::{Entry, EntryId};
use crate::gpu::error::ReplayFault;

pub const DEFAULT_BLOCK_SIZE: usize = 40_000;

//===----------------------------------------------------------------------===//
// Blocks
//===----------------------------------------------------------------------===//

struct EntryBlock {
    bytes: Box<[u8]>,
    used: usize,
}

impl EntryBlock {
    fn new(capacity: usize) -> Self {
        Self {
            bytes: vec![0u8; capacity].into_boxed_slice(),
            used: 0,
        }
    }

    #[inline(always)]
    fn remaining(&self) -> usize {
        self.bytes.len() - self.used
    }

    fn clear(&mut self) {
        let end = (self.used + 1).min(self.bytes.len());
        self.bytes[..end].fill(0);
        self.used = 0;
    }
}

//===----------------------------------------------------------------------===//
// Entry buffer
//===----------------------------------------------------------------------===//

/// Segmented byte arena holding `(id, payload)` entries in recording order.
///
/// Entries never straddle two blocks. When an entry ends before its block
/// does, a zero byte follows it so a reader can tell the rest of the block is
/// empty. [`EntryBuffer::reset`] keeps every block allocated so the block
/// count settles after a few record/reset cycles.
pub struct EntryBuffer {
    blocks: Vec<EntryBlock>,
    current: usize,
    block_size: usize,
    entries: u32,
}

impl Default for EntryBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCK_SIZE)
    }
}

impl EntryBuffer {
    pub fn new(block_size: usize) -> Self {
        Self {
            blocks: Vec::new(),
            current: 0,
            block_size: block_size.max(1),
            entries: 0,
        }
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Number of entries appended since the last reset.
    pub fn len(&self) -> u32 {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Blocks allocated over the lifetime of this buffer.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Blocks holding at least one entry of the current session.
    pub fn blocks_in_use(&self) -> usize {
        self.blocks.iter().filter(|b| b.used > 0).count()
    }

    #[inline(always)]
    pub fn append<E: Entry>(&mut self, entry: &E) {
        let size = 1 + E::SIZE;
        let block = self.block_with_room(size);
        let start = block.used;
        block.bytes[start] = E::ID as u8;
        block.bytes[start + 1..start + size].copy_from_slice(bytes_of(entry));
        block.used += size;
        if block.used < block.bytes.len() {
            block.bytes[block.used] = EntryId::SENTINEL;
        }
        self.entries += 1;
    }

    /// Rewinds to the first block and zeroes what the last session wrote.
    pub fn reset(&mut self) {
        for block in self.blocks.iter_mut().filter(|b| b.used > 0) {
            block.clear();
        }
        self.current = 0;
        self.entries = 0;
    }

    pub fn cursor(&self) -> EntryCursor<'_> {
        EntryCursor {
            buffer: self,
            block: 0,
            offset: 0,
            consumed: 0,
            blocks_visited: 0,
        }
    }

    fn block_with_room(&mut self, size: usize) -> &mut EntryBlock {
        if self.blocks.is_empty() {
            self.allocate_block(size);
            return &mut self.blocks[self.current];
        }

        if self.blocks[self.current].remaining() < size {
            let later = (self.current + 1..self.blocks.len())
                .find(|&i| self.blocks[i].remaining() >= size);
            match later {
                Some(i) => self.current = i,
                None => self.allocate_block(size),
            }
        }

        &mut self.blocks[self.current]
    }

    fn allocate_block(&mut self, min_size: usize) {
        let capacity = self.block_size.max(min_size);
        log::debug!(
            "entry buffer: allocating block {} ({} bytes)",
            self.blocks.len(),
            capacity
        );
        self.blocks.push(EntryBlock::new(capacity));
        self.current = self.blocks.len() - 1;
    }
}

//===----------------------------------------------------------------------===//
// Iteration
//===----------------------------------------------------------------------===//

/// Read position inside an [`EntryBuffer`]. The recorded entry count decides
/// when reading stops; trailing zero bytes are never taken for entries.
pub struct EntryCursor<'a> {
    buffer: &'a EntryBuffer,
    block: usize,
    offset: usize,
    consumed: u32,
    blocks_visited: usize,
}

impl<'a> EntryCursor<'a> {
    /// Entries handed out so far.
    pub fn consumed(&self) -> u32 {
        self.consumed
    }

    pub fn blocks_visited(&self) -> usize {
        self.blocks_visited
    }

    /// Raw id byte of the next entry, or `None` once every recorded entry has
    /// been read.
    pub fn next_id(&mut self) -> Result<Option<u8>, ReplayFault> {
        if self.consumed == self.buffer.entries {
            return Ok(None);
        }

        loop {
            let block = self
                .buffer
                .blocks
                .get(self.block)
                .ok_or(ReplayFault::Truncated {
                    entry: self.consumed,
                })?;

            if self.offset >= block.used {
                self.advance_block();
                continue;
            }

            let id = block.bytes[self.offset];
            if id == EntryId::SENTINEL {
                self.advance_block();
                continue;
            }

            if self.offset == 0 {
                self.blocks_visited += 1;
            }
            self.offset += 1;
            self.consumed += 1;
            return Ok(Some(id));
        }
    }

    /// Payload following the id just returned by [`EntryCursor::next_id`].
    #[inline(always)]
    pub fn read<E: Entry>(&mut self) -> Result<E, ReplayFault> {
        let block = &self.buffer.blocks[self.block];
        let end = self.offset + E::SIZE;
        if end > block.used {
            return Err(ReplayFault::Truncated {
                entry: self.consumed - 1,
            });
        }
        let value = pod_read_unaligned::<E>(&block.bytes[self.offset..end]);
        self.offset = end;
        Ok(value)
    }

    fn advance_block(&mut self) {
        self.block += 1;
        self.offset = 0;
    }
}

//===----------------------------------------------------------------------===//
// Tests
//===----------------------------------------------------------------------===//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::driver::command::{DrawEntry, DrawIndexedEntry, EndEntry};

    fn draw(n: u32) -> DrawEntry {
        DrawEntry {
            vertex_count: n,
            instance_count: 1,
            vertex_start: 0,
            instance_start: 0,
        }
    }

    fn read_draws(buf: &EntryBuffer) -> Vec<u32> {
        let mut out = Vec::new();
        let mut cursor = buf.cursor();
        while let Some(id) = cursor.next_id().unwrap() {
            assert_eq!(id, EntryId::Draw as u8);
            out.push(cursor.read::<DrawEntry>().unwrap().vertex_count);
        }
        out
    }

    #[test]
    fn entries_never_span_blocks() {
        // 17 bytes per draw entry, 40 byte blocks: two entries per block.
        let mut buf = EntryBuffer::new(40);
        for i in 0..7 {
            buf.append(&draw(i));
        }
        assert_eq!(buf.block_count(), 4);
        assert_eq!(read_draws(&buf), (0..7).collect::<Vec<_>>());
    }

    #[test]
    fn sentinel_follows_short_block() {
        let mut buf = EntryBuffer::new(40);
        buf.append(&draw(1));
        assert_eq!(buf.blocks[0].bytes[17], EntryId::SENTINEL);
    }

    #[test]
    fn reset_reuses_blocks() {
        let mut buf = EntryBuffer::new(64);
        for cycle in 0..4 {
            for i in 0..20 {
                buf.append(&draw(cycle * 100 + i));
            }
            assert_eq!(read_draws(&buf).len(), 20);
            let blocks = buf.block_count();
            buf.reset();
            assert!(buf.is_empty());
            assert_eq!(buf.block_count(), blocks);
        }
        assert_eq!(buf.block_count(), 7);
    }

    #[test]
    fn oversized_entry_gets_its_own_block() {
        let mut buf = EntryBuffer::new(8);
        buf.append(&EndEntry {});
        buf.append(&DrawIndexedEntry {
            index_count: 6,
            ..Default::default()
        });
        buf.append(&EndEntry {});
        // Earlier blocks are never revisited, so the trailing End opens a third.
        assert_eq!(buf.block_count(), 3);

        let mut cursor = buf.cursor();
        assert_eq!(cursor.next_id().unwrap(), Some(EntryId::End as u8));
        assert_eq!(cursor.next_id().unwrap(), Some(EntryId::DrawIndexed as u8));
        assert_eq!(cursor.read::<DrawIndexedEntry>().unwrap().index_count, 6);
        assert_eq!(cursor.next_id().unwrap(), Some(EntryId::End as u8));
        assert_eq!(cursor.next_id().unwrap(), None);
        assert_eq!(cursor.blocks_visited(), 3);
    }

    #[test]
    fn counter_stops_reading_on_cleared_bytes() {
        let mut buf = EntryBuffer::new(64);
        buf.append(&draw(3));
        buf.reset();
        assert_eq!(buf.cursor().next_id().unwrap(), None);
    }
}
