use std::hash::{Hash, Hasher};

use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};
#[cfg(feature = "encore-serde")]
use serde::{Deserialize, Serialize};

/// Native API family a device talks to. Decides slot numbering and whether
/// execution must be funneled through a dedicated thread.
#[cfg_attr(feature = "encore-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// One context, per-kind register files (constant buffers, shader
    /// resources, unordered access, samplers).
    ImmediateContext,
    /// Explicit command buffers and queues, one descriptor space per set.
    ExplicitMultiQueue,
    /// Single thread-affine context with global binding points.
    GlobalState,
    /// Command-buffer encoders with buffer/texture/sampler argument tables.
    CommandBuffer,
}

impl BackendKind {
    pub fn requires_execution_thread(&self) -> bool {
        matches!(self, BackendKind::GlobalState)
    }

    pub fn name(&self) -> &'static str {
        match self {
            BackendKind::ImmediateContext => "immediate-context",
            BackendKind::ExplicitMultiQueue => "explicit-multi-queue",
            BackendKind::GlobalState => "global-state",
            BackendKind::CommandBuffer => "command-buffer",
        }
    }
}

#[cfg_attr(feature = "encore-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexFormat {
    UInt16,
    UInt32,
}

impl IndexFormat {
    pub fn as_raw(self) -> u32 {
        match self {
            IndexFormat::UInt16 => 0,
            IndexFormat::UInt32 => 1,
        }
    }

    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(IndexFormat::UInt16),
            1 => Some(IndexFormat::UInt32),
            _ => None,
        }
    }

    pub fn size_in_bytes(self) -> u32 {
        match self {
            IndexFormat::UInt16 => 2,
            IndexFormat::UInt32 => 4,
        }
    }
}

/// Linear RGBA color. Compared and hashed bitwise so it can key state caches.
#[cfg_attr(feature = "encore-serde", derive(Serialize, Deserialize))]
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
pub struct RgbaFloat {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl RgbaFloat {
    pub const BLACK: RgbaFloat = RgbaFloat::new(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: RgbaFloat = RgbaFloat::new(1.0, 1.0, 1.0, 1.0);
    pub const CLEAR: RgbaFloat = RgbaFloat::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    fn bits(&self) -> [u32; 4] {
        [
            self.r.to_bits(),
            self.g.to_bits(),
            self.b.to_bits(),
            self.a.to_bits(),
        ]
    }
}

impl PartialEq for RgbaFloat {
    fn eq(&self, other: &Self) -> bool {
        self.bits() == other.bits()
    }
}

impl Eq for RgbaFloat {}

impl Hash for RgbaFloat {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bits().hash(state);
    }
}

#[cfg_attr(feature = "encore-serde", derive(Serialize, Deserialize))]
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    pub fn new(x: f32, y: f32, width: f32, height: f32, min_depth: f32, max_depth: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            min_depth,
            max_depth,
        }
    }
}

#[cfg_attr(feature = "encore-serde", derive(Serialize, Deserialize))]
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct ScissorRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Texel region copied by `copy_texture`.
#[cfg_attr(feature = "encore-serde", derive(Serialize, Deserialize))]
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct TextureCopyRegion {
    pub src_x: u32,
    pub src_y: u32,
    pub src_z: u32,
    pub src_mip_level: u32,
    pub src_base_array_layer: u32,
    pub dst_x: u32,
    pub dst_y: u32,
    pub dst_z: u32,
    pub dst_mip_level: u32,
    pub dst_base_array_layer: u32,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub layer_count: u32,
}

bitflags! {
    #[cfg_attr(feature = "encore-serde", derive(Serialize, Deserialize))]
    #[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaderStages: u8 {
        const VERTEX = 1 << 0;
        const GEOMETRY = 1 << 1;
        const TESSELLATION_CONTROL = 1 << 2;
        const TESSELLATION_EVALUATION = 1 << 3;
        const FRAGMENT = 1 << 4;
        const COMPUTE = 1 << 5;
    }
}

bitflags! {
    #[cfg_attr(feature = "encore-serde", derive(Serialize, Deserialize))]
    #[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u8 {
        const VERTEX = 1 << 0;
        const INDEX = 1 << 1;
        const UNIFORM = 1 << 2;
        const STRUCTURED_READ_ONLY = 1 << 3;
        const STRUCTURED_READ_WRITE = 1 << 4;
        const INDIRECT = 1 << 5;
        const DYNAMIC = 1 << 6;
        const STAGING = 1 << 7;
    }
}

bitflags! {
    #[cfg_attr(feature = "encore-serde", derive(Serialize, Deserialize))]
    #[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u8 {
        const SAMPLED = 1 << 0;
        const STORAGE = 1 << 1;
        const RENDER_TARGET = 1 << 2;
        const DEPTH_STENCIL = 1 << 3;
        const CUBEMAP = 1 << 4;
        const GENERATE_MIPMAPS = 1 << 5;
    }
}

/// Kind of a bindable resource declared by a resource layout element.
#[cfg_attr(feature = "encore-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    UniformBuffer,
    StructuredBufferReadOnly,
    StructuredBufferReadWrite,
    TextureReadOnly,
    TextureReadWrite,
    Sampler,
}

impl ResourceKind {
    pub fn is_read_write(&self) -> bool {
        matches!(
            self,
            ResourceKind::StructuredBufferReadWrite | ResourceKind::TextureReadWrite
        )
    }

    pub fn is_buffer(&self) -> bool {
        matches!(
            self,
            ResourceKind::UniformBuffer
                | ResourceKind::StructuredBufferReadOnly
                | ResourceKind::StructuredBufferReadWrite
        )
    }
}
