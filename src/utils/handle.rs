use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;

use bytemuck::{Pod, Zeroable};

/// Position of an object inside a command list's indirection table.
///
/// A `Tracked<T>` is four bytes of plain data so it can live inside encoded
/// entries. It only means something to the table that produced it and only
/// until that table is cleared.
#[repr(transparent)]
pub struct Tracked<T> {
    pub index: u32,
    phantom: PhantomData<T>,
}

impl<T> Tracked<T> {
    pub const fn new(index: u32) -> Self {
        Self {
            index,
            phantom: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Tracked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Tracked").field(&self.index).finish()
    }
}

impl<T> PartialEq for Tracked<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<T> Eq for Tracked<T> {}

impl<T> Clone for Tracked<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Tracked<T> {}

impl<T> Hash for Tracked<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl<T> Default for Tracked<T> {
    fn default() -> Self {
        Self::new(0)
    }
}

unsafe impl<T: 'static> Zeroable for Tracked<T> {}
unsafe impl<T: 'static> Pod for Tracked<T> {}

#[cfg(test)]
mod tests {
    use super::*;

    struct Marker;

    #[test]
    fn tracked_is_plain_data() {
        let h = Tracked::<Marker>::new(7);
        assert_eq!(std::mem::size_of::<Tracked<Marker>>(), 4);
        assert_eq!(bytemuck::bytes_of(&h), &7u32.to_ne_bytes());
        let back: Tracked<Marker> = bytemuck::pod_read_unaligned(&7u32.to_ne_bytes());
        assert_eq!(back, h);
    }
}
