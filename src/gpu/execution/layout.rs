use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;
#[cfg(feature = "encore-serde")]
use serde::{Deserialize, Serialize};

use super::binding::ResourceSlots;
use crate::gpu::error::ValidationError;
use crate::gpu::structs::{BackendKind, BufferUsage, ResourceKind, ShaderStages, TextureUsage};
use crate::gpu::{Backend, BufferResource, TextureResource};

bitflags! {
    #[cfg_attr(feature = "encore-serde", derive(Serialize, Deserialize))]
    #[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ResourceLayoutElementOptions: u8 {
        /// The bound buffer range is offset by a dynamic offset supplied at
        /// bind time.
        const DYNAMIC_BINDING = 1 << 0;
    }
}

// ----- Descriptions ---------------------------------------------------------

#[cfg_attr(feature = "encore-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceLayoutElementDescription {
    pub name: String,
    pub kind: ResourceKind,
    /// An empty mask marks the element unused: it keeps its position but
    /// takes no native slot.
    pub stages: ShaderStages,
    pub options: ResourceLayoutElementOptions,
}

impl ResourceLayoutElementDescription {
    pub fn new(name: &str, kind: ResourceKind, stages: ShaderStages) -> Self {
        Self {
            name: name.to_string(),
            kind,
            stages,
            options: ResourceLayoutElementOptions::empty(),
        }
    }

    pub fn dynamic(name: &str, kind: ResourceKind, stages: ShaderStages) -> Self {
        Self {
            options: ResourceLayoutElementOptions::DYNAMIC_BINDING,
            ..Self::new(name, kind, stages)
        }
    }

    pub fn is_unused(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn is_dynamic(&self) -> bool {
        self.options
            .contains(ResourceLayoutElementOptions::DYNAMIC_BINDING)
    }
}

#[cfg_attr(feature = "encore-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ResourceLayoutDescription {
    pub elements: Vec<ResourceLayoutElementDescription>,
}

impl ResourceLayoutDescription {
    pub fn new(elements: &[ResourceLayoutElementDescription]) -> Self {
        Self {
            elements: elements.to_vec(),
        }
    }
}

// ----- Resource layout ------------------------------------------------------

struct LayoutInner {
    elements: Vec<ResourceLayoutElementDescription>,
    slots: ResourceSlots,
    dynamic_buffer_count: usize,
}

/// Backend-independent declaration of a resource set's slots together with
/// the native slot table for the device it was created on. Cloning shares the
/// same layout; equality is identity.
#[derive(Clone)]
pub struct ResourceLayout(Arc<LayoutInner>);

impl ResourceLayout {
    pub fn new(
        backend: BackendKind,
        desc: &ResourceLayoutDescription,
    ) -> Result<Self, ValidationError> {
        let slots = ResourceSlots::compute(backend, &desc.elements)?;
        let dynamic_buffer_count = desc
            .elements
            .iter()
            .filter(|e| !e.is_unused() && e.is_dynamic())
            .count();

        Ok(Self(Arc::new(LayoutInner {
            elements: desc.elements.clone(),
            slots,
            dynamic_buffer_count,
        })))
    }

    pub fn elements(&self) -> &[ResourceLayoutElementDescription] {
        &self.0.elements
    }

    pub fn slots(&self) -> &ResourceSlots {
        &self.0.slots
    }

    /// Number of dynamic offsets a bind of a set with this layout takes.
    pub fn dynamic_buffer_count(&self) -> usize {
        self.0.dynamic_buffer_count
    }
}

impl PartialEq for ResourceLayout {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for ResourceLayout {}

impl fmt::Debug for ResourceLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceLayout")
            .field("elements", &self.0.elements.len())
            .field("backend", &self.0.slots.backend())
            .finish()
    }
}

// ----- Resource set ---------------------------------------------------------

/// Concrete object bound to one layout element.
#[derive(Debug, Clone, PartialEq)]
pub enum BindableResource<B: Backend> {
    Buffer(B::Buffer),
    BufferRange {
        buffer: B::Buffer,
        offset: u64,
        size: u64,
    },
    Texture(B::Texture),
    Sampler(B::Sampler),
}

impl<B: Backend> BindableResource<B> {
    pub fn describe(&self) -> &'static str {
        match self {
            BindableResource::Buffer(b) | BindableResource::BufferRange { buffer: b, .. } => {
                let usage = b.usage();
                if usage.contains(BufferUsage::UNIFORM) {
                    "uniform buffer"
                } else if usage.contains(BufferUsage::STRUCTURED_READ_WRITE) {
                    "read-write structured buffer"
                } else if usage.contains(BufferUsage::STRUCTURED_READ_ONLY) {
                    "read-only structured buffer"
                } else {
                    "buffer without binding usage"
                }
            }
            BindableResource::Texture(t) => {
                let usage = t.usage();
                if usage.contains(TextureUsage::STORAGE) {
                    "storage texture"
                } else if usage.contains(TextureUsage::SAMPLED) {
                    "sampled texture"
                } else {
                    "texture without binding usage"
                }
            }
            BindableResource::Sampler(_) => "sampler",
        }
    }

    pub fn is_compatible(&self, kind: ResourceKind) -> bool {
        match self {
            BindableResource::Buffer(b) | BindableResource::BufferRange { buffer: b, .. } => {
                let usage = b.usage();
                match kind {
                    ResourceKind::UniformBuffer => usage.contains(BufferUsage::UNIFORM),
                    ResourceKind::StructuredBufferReadOnly => usage.intersects(
                        BufferUsage::STRUCTURED_READ_ONLY | BufferUsage::STRUCTURED_READ_WRITE,
                    ),
                    ResourceKind::StructuredBufferReadWrite => {
                        usage.contains(BufferUsage::STRUCTURED_READ_WRITE)
                    }
                    _ => false,
                }
            }
            BindableResource::Texture(t) => match kind {
                ResourceKind::TextureReadOnly => t.usage().contains(TextureUsage::SAMPLED),
                ResourceKind::TextureReadWrite => t.usage().contains(TextureUsage::STORAGE),
                _ => false,
            },
            BindableResource::Sampler(_) => kind == ResourceKind::Sampler,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResourceSetDescription<B: Backend> {
    pub layout: ResourceLayout,
    pub resources: Vec<BindableResource<B>>,
}

struct SetInner<B: Backend> {
    layout: ResourceLayout,
    resources: Vec<BindableResource<B>>,
}

/// Resources bound to the slots of one layout, validated once at creation.
/// Cloning shares the set; equality is identity.
pub struct ResourceSet<B: Backend>(Arc<SetInner<B>>);

impl<B: Backend> ResourceSet<B> {
    pub fn new(desc: ResourceSetDescription<B>) -> Result<Self, ValidationError> {
        let elements = desc.layout.elements();
        if elements.len() != desc.resources.len() {
            return Err(ValidationError::ResourceCountMismatch {
                expected: elements.len(),
                actual: desc.resources.len(),
            });
        }

        for (slot, (element, resource)) in elements.iter().zip(&desc.resources).enumerate() {
            if !resource.is_compatible(element.kind) {
                return Err(ValidationError::ResourceKindMismatch {
                    slot,
                    expected: element.kind,
                    actual: resource.describe(),
                });
            }
        }

        Ok(Self(Arc::new(SetInner {
            layout: desc.layout,
            resources: desc.resources,
        })))
    }

    pub fn layout(&self) -> &ResourceLayout {
        &self.0.layout
    }

    pub fn resources(&self) -> &[BindableResource<B>] {
        &self.0.resources
    }

    pub fn check_dynamic_offsets(&self, offsets: &[u32]) -> Result<(), ValidationError> {
        let expected = self.0.layout.dynamic_buffer_count();
        if expected != offsets.len() {
            return Err(ValidationError::DynamicOffsetCountMismatch {
                expected,
                actual: offsets.len(),
            });
        }
        Ok(())
    }
}

impl<B: Backend> Clone for ResourceSet<B> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<B: Backend> PartialEq for ResourceSet<B> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<B: Backend> fmt::Debug for ResourceSet<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceSet")
            .field("resources", &self.0.resources)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::headless::{Headless, HeadlessDevice};
    use crate::gpu::BackendDevice;

    fn layout(device: &HeadlessDevice, kinds: &[ResourceKind]) -> ResourceLayout {
        let elements: Vec<_> = kinds
            .iter()
            .enumerate()
            .map(|(i, k)| {
                let name = format!("r{}", i);
                ResourceLayoutElementDescription::new(&name, *k, ShaderStages::FRAGMENT)
            })
            .collect();
        ResourceLayout::new(device.kind(), &ResourceLayoutDescription::new(&elements)).unwrap()
    }

    #[test]
    fn matching_set_is_accepted() {
        let device = HeadlessDevice::new(BackendKind::ImmediateContext);
        let layout = layout(
            &device,
            &[ResourceKind::UniformBuffer, ResourceKind::TextureReadOnly, ResourceKind::Sampler],
        );
        let set = ResourceSet::<Headless>::new(ResourceSetDescription {
            layout: layout.clone(),
            resources: vec![
                BindableResource::Buffer(device.create_buffer(256, BufferUsage::UNIFORM)),
                BindableResource::Texture(device.create_texture(4, 4, 1, TextureUsage::SAMPLED)),
                BindableResource::Sampler(device.create_sampler()),
            ],
        })
        .unwrap();
        assert_eq!(set.layout(), &layout);
        assert_eq!(set.clone(), set);
    }

    #[test]
    fn count_mismatch_is_rejected() {
        let device = HeadlessDevice::new(BackendKind::ImmediateContext);
        let layout = layout(&device, &[ResourceKind::Sampler, ResourceKind::Sampler]);
        let err = ResourceSet::<Headless>::new(ResourceSetDescription {
            layout,
            resources: vec![BindableResource::Sampler(device.create_sampler())],
        })
        .unwrap_err();
        assert_eq!(
            err,
            ValidationError::ResourceCountMismatch {
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn kind_mismatch_names_the_slot() {
        let device = HeadlessDevice::new(BackendKind::ImmediateContext);
        let layout = layout(&device, &[ResourceKind::UniformBuffer, ResourceKind::Sampler]);
        let err = ResourceSet::<Headless>::new(ResourceSetDescription {
            layout,
            resources: vec![
                BindableResource::Buffer(device.create_buffer(64, BufferUsage::UNIFORM)),
                BindableResource::Texture(device.create_texture(1, 1, 1, TextureUsage::SAMPLED)),
            ],
        })
        .unwrap_err();
        assert_eq!(
            err,
            ValidationError::ResourceKindMismatch {
                slot: 1,
                expected: ResourceKind::Sampler,
                actual: "sampled texture",
            }
        );
    }

    #[test]
    fn buffer_usage_must_fit_kind() {
        let device = HeadlessDevice::new(BackendKind::ExplicitMultiQueue);
        let layout = layout(&device, &[ResourceKind::StructuredBufferReadWrite]);
        let err = ResourceSet::<Headless>::new(ResourceSetDescription {
            layout,
            resources: vec![BindableResource::Buffer(
                device.create_buffer(64, BufferUsage::STRUCTURED_READ_ONLY),
            )],
        })
        .unwrap_err();
        assert!(matches!(err, ValidationError::ResourceKindMismatch { slot: 0, .. }));
    }

    #[test]
    fn dynamic_offset_count_follows_layout() {
        let device = HeadlessDevice::new(BackendKind::ImmediateContext);
        let elements = [
            ResourceLayoutElementDescription::dynamic(
                "Camera",
                ResourceKind::UniformBuffer,
                ShaderStages::VERTEX,
            ),
            ResourceLayoutElementDescription::new(
                "Material",
                ResourceKind::UniformBuffer,
                ShaderStages::FRAGMENT,
            ),
        ];
        let layout =
            ResourceLayout::new(device.kind(), &ResourceLayoutDescription::new(&elements)).unwrap();
        assert_eq!(layout.dynamic_buffer_count(), 1);

        let ub = device.create_buffer(512, BufferUsage::UNIFORM | BufferUsage::DYNAMIC);
        let set = ResourceSet::<Headless>::new(ResourceSetDescription {
            layout,
            resources: vec![BindableResource::Buffer(ub.clone()), BindableResource::Buffer(ub)],
        })
        .unwrap();
        assert!(set.check_dynamic_offsets(&[256]).is_ok());
        assert_eq!(
            set.check_dynamic_offsets(&[]),
            Err(ValidationError::DynamicOffsetCountMismatch {
                expected: 1,
                actual: 0
            })
        );
    }
}
