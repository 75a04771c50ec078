pub mod command;
pub mod entry_buffer;
pub mod types;

pub use command::{Entry, EntryId, MAX_INLINE_DYNAMIC_OFFSETS};
pub use entry_buffer::{EntryBuffer, EntryCursor, DEFAULT_BLOCK_SIZE};
