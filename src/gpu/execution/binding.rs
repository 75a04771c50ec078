use smallvec::SmallVec;

use crate::gpu::error::ValidationError;
use crate::gpu::structs::{BackendKind, ResourceKind, ShaderStages};

use super::layout::ResourceLayoutElementDescription;

/// Native binding space a slot lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RegisterClass {
    /// Constant buffer registers (`b#`).
    ConstantBuffer,
    /// Shader resource registers (`t#`), shared by read-only textures and
    /// read-only structured buffers.
    ShaderResource,
    /// Unordered access registers (`u#`).
    UnorderedAccess,
    /// Sampler registers (`s#`), also the global-state sampler binding points.
    Sampler,
    UniformBlock,
    StorageBlock,
    TextureUnit,
    ImageUnit,
    /// Argument table entries of a command-buffer backend.
    Buffer,
    Texture,
    /// Position inside a single descriptor space.
    Descriptor,
}

impl RegisterClass {
    const COUNT: usize = 11;

    fn ordinal(self) -> usize {
        self as usize
    }

    /// Class `kind` maps to on `backend`.
    pub fn for_kind(backend: BackendKind, kind: ResourceKind) -> RegisterClass {
        use ResourceKind::*;
        match backend {
            BackendKind::ImmediateContext => match kind {
                UniformBuffer => RegisterClass::ConstantBuffer,
                StructuredBufferReadOnly | TextureReadOnly => RegisterClass::ShaderResource,
                StructuredBufferReadWrite | TextureReadWrite => RegisterClass::UnorderedAccess,
                Sampler => RegisterClass::Sampler,
            },
            BackendKind::GlobalState => match kind {
                UniformBuffer => RegisterClass::UniformBlock,
                StructuredBufferReadOnly | StructuredBufferReadWrite => RegisterClass::StorageBlock,
                TextureReadOnly => RegisterClass::TextureUnit,
                TextureReadWrite => RegisterClass::ImageUnit,
                Sampler => RegisterClass::Sampler,
            },
            BackendKind::CommandBuffer => match kind {
                UniformBuffer | StructuredBufferReadOnly | StructuredBufferReadWrite => {
                    RegisterClass::Buffer
                }
                TextureReadOnly | TextureReadWrite => RegisterClass::Texture,
                Sampler => RegisterClass::Sampler,
            },
            BackendKind::ExplicitMultiQueue => RegisterClass::Descriptor,
        }
    }
}

/// Where one layout element lands on the native side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceBindingInfo {
    pub class: RegisterClass,
    pub slot: u32,
    pub kind: ResourceKind,
    pub stages: ShaderStages,
    pub dynamic: bool,
}

/// Native slot table of one resource layout, computed when the layout is
/// created and reused by every bind afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSlots {
    backend: BackendKind,
    bindings: SmallVec<[Option<ResourceBindingInfo>; 8]>,
    counts: [u32; RegisterClass::COUNT],
}

impl ResourceSlots {
    pub fn compute(
        backend: BackendKind,
        elements: &[ResourceLayoutElementDescription],
    ) -> Result<Self, ValidationError> {
        let mut counts = [0u32; RegisterClass::COUNT];
        let mut bindings = SmallVec::with_capacity(elements.len());

        for (i, element) in elements.iter().enumerate() {
            if element.is_unused() {
                bindings.push(None);
                continue;
            }

            check_stages(backend, i, element)?;

            let class = RegisterClass::for_kind(backend, element.kind);
            let slot = if class == RegisterClass::Descriptor {
                i as u32
            } else {
                let counter = &mut counts[class.ordinal()];
                let slot = *counter;
                *counter += 1;
                slot
            };

            bindings.push(Some(ResourceBindingInfo {
                class,
                slot,
                kind: element.kind,
                stages: element.stages,
                dynamic: element.is_dynamic(),
            }));
        }

        if backend == BackendKind::ExplicitMultiQueue {
            counts[RegisterClass::Descriptor.ordinal()] = elements.len() as u32;
        }

        log::debug!(
            "resource slots ({}): {:?}",
            backend.name(),
            bindings
                .iter()
                .map(|b: &Option<ResourceBindingInfo>| b.map(|b| (b.class, b.slot)))
                .collect::<Vec<_>>()
        );

        Ok(Self {
            backend,
            bindings,
            counts,
        })
    }

    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Binding for the element at `index`, `None` when the element is unused.
    pub fn get(&self, index: usize) -> Result<Option<&ResourceBindingInfo>, ValidationError> {
        self.bindings
            .get(index)
            .map(Option::as_ref)
            .ok_or(ValidationError::SlotOutOfRange {
                index,
                count: self.bindings.len(),
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &ResourceBindingInfo)> {
        self.bindings
            .iter()
            .enumerate()
            .filter_map(|(i, b)| b.as_ref().map(|b| (i, b)))
    }

    /// Slots consumed in `class`.
    pub fn count(&self, class: RegisterClass) -> u32 {
        self.counts[class.ordinal()]
    }

    pub fn uniform_buffer_count(&self) -> u32 {
        self.count_kinds(&[ResourceKind::UniformBuffer])
    }

    pub fn storage_buffer_count(&self) -> u32 {
        self.count_kinds(&[
            ResourceKind::StructuredBufferReadOnly,
            ResourceKind::StructuredBufferReadWrite,
        ])
    }

    pub fn texture_count(&self) -> u32 {
        self.count_kinds(&[ResourceKind::TextureReadOnly, ResourceKind::TextureReadWrite])
    }

    pub fn sampler_count(&self) -> u32 {
        self.count_kinds(&[ResourceKind::Sampler])
    }

    fn count_kinds(&self, kinds: &[ResourceKind]) -> u32 {
        self.iter().filter(|(_, b)| kinds.contains(&b.kind)).count() as u32
    }
}

fn check_stages(
    backend: BackendKind,
    slot: usize,
    element: &ResourceLayoutElementDescription,
) -> Result<(), ValidationError> {
    // UAVs are only visible to pixel and compute shaders on immediate contexts.
    let allowed = match backend {
        BackendKind::ImmediateContext if element.kind.is_read_write() => {
            ShaderStages::FRAGMENT | ShaderStages::COMPUTE
        }
        _ => ShaderStages::all(),
    };

    if allowed.contains(element.stages) {
        Ok(())
    } else {
        Err(ValidationError::UnsupportedStages {
            slot,
            kind: element.kind,
            stages: element.stages,
            backend: backend.name(),
        })
    }
}
