use crate::gpu::driver::types::{Buffer, Framebuffer, Label, Pipeline, ResourceSet, Texture};
use crate::gpu::error::ReplayFault;
use crate::gpu::execution::ResourceSet as BoundSet;
use crate::gpu::Backend;
use crate::utils::Tracked;

/// Object held by a [`ResourceList`] slot.
pub enum TrackedObject<B: Backend> {
    Buffer(B::Buffer),
    Texture(B::Texture),
    Framebuffer(B::Framebuffer),
    Pipeline(B::Pipeline),
    ResourceSet(BoundSet<B>),
    Label(String),
}

/// Maps a marker type to the object a `Tracked<Marker>` resolves to.
pub trait TrackedKind<B: Backend>: Sized + 'static {
    type Object;
    const NAME: &'static str;

    fn wrap(object: Self::Object) -> TrackedObject<B>;
    fn unwrap(slot: &TrackedObject<B>) -> Option<&Self::Object>;
}

macro_rules! tracked_kinds {
    ($($marker:ident => $object:ty, $name:literal;)*) => {
        $(impl<B: Backend> TrackedKind<B> for $marker {
            type Object = $object;
            const NAME: &'static str = $name;

            #[inline(always)]
            fn wrap(object: Self::Object) -> TrackedObject<B> {
                TrackedObject::$marker(object)
            }

            #[inline(always)]
            fn unwrap(slot: &TrackedObject<B>) -> Option<&Self::Object> {
                match slot {
                    TrackedObject::$marker(o) => Some(o),
                    _ => None,
                }
            }
        })*
    };
}

tracked_kinds! {
    Buffer => B::Buffer, "buffer";
    Texture => B::Texture, "texture";
    Framebuffer => B::Framebuffer, "framebuffer";
    Pipeline => B::Pipeline, "pipeline";
    ResourceSet => BoundSet<B>, "resource set";
    Label => String, "label";
}

/// Append-only list of the objects one recording session references.
///
/// Holding the objects here keeps them alive until the session is cleared,
/// and lets encoded entries carry a plain index instead of a reference.
pub struct ResourceList<B: Backend> {
    entries: Vec<TrackedObject<B>>,
}

impl<B: Backend> Default for ResourceList<B> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<B: Backend> ResourceList<B> {
    pub fn track<K: TrackedKind<B>>(&mut self, object: K::Object) -> Tracked<K> {
        let h = Tracked::new(self.entries.len() as u32);
        self.entries.push(K::wrap(object));
        h
    }

    pub fn resolve<K: TrackedKind<B>>(&self, h: Tracked<K>) -> Result<&K::Object, ReplayFault> {
        self.entries
            .get(h.index as usize)
            .and_then(K::unwrap)
            .ok_or(ReplayFault::UnresolvedHandle {
                index: h.index,
                expected: K::NAME,
            })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every tracked object. Handles from before the call are invalid.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::headless::{Headless, HeadlessDevice};
    use crate::gpu::structs::{BackendKind, BufferUsage};

    #[test]
    fn track_and_resolve_round_trip() {
        let device = HeadlessDevice::new(BackendKind::ImmediateContext);
        let buffer = device.create_buffer(16, BufferUsage::VERTEX);
        let mut list = ResourceList::<Headless>::default();
        let hb = list.track::<Buffer>(buffer.clone());
        let hl = list.track::<Label>("shadow pass".to_string());

        assert_eq!(hb.index, 0);
        assert_eq!(list.resolve(hb).unwrap(), &buffer);
        assert_eq!(list.resolve(hl).unwrap(), "shadow pass");
    }

    #[test]
    fn wrong_kind_does_not_resolve() {
        let mut list = ResourceList::<Headless>::default();
        let label = list.track::<Label>("x".to_string());
        let as_buffer = Tracked::<Buffer>::new(label.index);
        assert_eq!(
            list.resolve(as_buffer),
            Err(ReplayFault::UnresolvedHandle {
                index: 0,
                expected: "buffer"
            })
        );
    }

    #[test]
    fn clear_invalidates_handles() {
        let mut list = ResourceList::<Headless>::default();
        let h = list.track::<Label>("a".to_string());
        list.clear();
        assert!(list.is_empty());
        assert!(list.resolve(h).is_err());

        let h2 = list.track::<Label>("b".to_string());
        assert_eq!(h2.index, 0);
        assert_eq!(list.resolve(h2).unwrap(), "b");
    }
}
