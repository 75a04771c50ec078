use bytemuck::{Pod, Zeroable};

use super::types::{Buffer, Framebuffer, Label, Pipeline, ResourceSet, Texture, Tracked};
use crate::gpu::structs::{RgbaFloat, TextureCopyRegion, Viewport};

/// Dynamic offsets up to this count are stored in the entry itself. Longer
/// arrays go to a staging block.
pub const MAX_INLINE_DYNAMIC_OFFSETS: usize = 10;

//===----------------------------------------------------------------------===//
// Entry ids
//===----------------------------------------------------------------------===//

/// Tag byte preceding every entry. Zero is reserved as the end-of-block
/// sentinel and is never a valid id.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum EntryId {
    Begin = 1,
    ClearColorTarget = 2,
    ClearDepthStencil = 3,
    DrawIndexed = 4,
    End = 5,
    SetFramebuffer = 6,
    SetIndexBuffer = 7,
    SetPipeline = 8,
    SetGraphicsResourceSet = 9,
    SetScissorRect = 10,
    SetVertexBuffer = 11,
    SetViewport = 12,
    UpdateBuffer = 13,
    CopyBuffer = 14,
    CopyTexture = 15,
    ResolveTexture = 16,
    Draw = 17,
    Dispatch = 18,
    SetComputeResourceSet = 19,
    DrawIndirect = 20,
    DrawIndexedIndirect = 21,
    DispatchIndirect = 22,
    GenerateMipmaps = 23,
    PushDebugGroup = 24,
    PopDebugGroup = 25,
    InsertDebugMarker = 26,
}

impl EntryId {
    pub const SENTINEL: u8 = 0;

    pub fn from_u8(v: u8) -> Option<Self> {
        let id = match v {
            1 => EntryId::Begin,
            2 => EntryId::ClearColorTarget,
            3 => EntryId::ClearDepthStencil,
            4 => EntryId::DrawIndexed,
            5 => EntryId::End,
            6 => EntryId::SetFramebuffer,
            7 => EntryId::SetIndexBuffer,
            8 => EntryId::SetPipeline,
            9 => EntryId::SetGraphicsResourceSet,
            10 => EntryId::SetScissorRect,
            11 => EntryId::SetVertexBuffer,
            12 => EntryId::SetViewport,
            13 => EntryId::UpdateBuffer,
            14 => EntryId::CopyBuffer,
            15 => EntryId::CopyTexture,
            16 => EntryId::ResolveTexture,
            17 => EntryId::Draw,
            18 => EntryId::Dispatch,
            19 => EntryId::SetComputeResourceSet,
            20 => EntryId::DrawIndirect,
            21 => EntryId::DrawIndexedIndirect,
            22 => EntryId::DispatchIndirect,
            23 => EntryId::GenerateMipmaps,
            24 => EntryId::PushDebugGroup,
            25 => EntryId::PopDebugGroup,
            26 => EntryId::InsertDebugMarker,
            _ => return None,
        };
        Some(id)
    }
}

/// A fixed-layout payload that can be written into an entry buffer.
pub trait Entry: Pod {
    const ID: EntryId;
    const SIZE: usize = std::mem::size_of::<Self>();
}

macro_rules! entries {
    ($($ty:ident => $id:ident),* $(,)?) => {
        $(impl Entry for $ty {
            const ID: EntryId = EntryId::$id;
        })*
    };
}

//===----------------------------------------------------------------------===//
// Payloads
//===----------------------------------------------------------------------===//

/// Index into a command list's staged block list plus the byte count used.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable, PartialEq, Eq)]
pub struct StagingRef {
    pub index: u32,
    pub size: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable, PartialEq, Eq)]
pub struct BeginEntry {}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable, PartialEq, Eq)]
pub struct EndEntry {}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable, PartialEq)]
pub struct ClearColorTargetEntry {
    pub index: u32,
    pub color: RgbaFloat,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable, PartialEq)]
pub struct ClearDepthStencilEntry {
    pub depth: f32,
    pub stencil: u8,
    pub _pad: [u8; 3],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable, PartialEq, Eq)]
pub struct DrawEntry {
    pub vertex_count: u32,
    pub instance_count: u32,
    pub vertex_start: u32,
    pub instance_start: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable, PartialEq, Eq)]
pub struct DrawIndexedEntry {
    pub index_count: u32,
    pub instance_count: u32,
    pub index_start: u32,
    pub vertex_offset: i32,
    pub instance_start: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable, PartialEq, Eq)]
pub struct DrawIndirectEntry {
    pub buffer: Tracked<Buffer>,
    pub offset: u32,
    pub draw_count: u32,
    pub stride: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable, PartialEq, Eq)]
pub struct DrawIndexedIndirectEntry {
    pub buffer: Tracked<Buffer>,
    pub offset: u32,
    pub draw_count: u32,
    pub stride: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable, PartialEq, Eq)]
pub struct DispatchEntry {
    pub group_count_x: u32,
    pub group_count_y: u32,
    pub group_count_z: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable, PartialEq, Eq)]
pub struct DispatchIndirectEntry {
    pub buffer: Tracked<Buffer>,
    pub offset: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable, PartialEq, Eq)]
pub struct SetFramebufferEntry {
    pub framebuffer: Tracked<Framebuffer>,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable, PartialEq, Eq)]
pub struct SetIndexBufferEntry {
    pub buffer: Tracked<Buffer>,
    pub format: u32,
    pub offset: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable, PartialEq, Eq)]
pub struct SetPipelineEntry {
    pub pipeline: Tracked<Pipeline>,
}

/// Payload shared by the graphics and compute resource-set binds.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable, PartialEq, Eq)]
pub struct ResourceSetBinding {
    pub slot: u32,
    pub set: Tracked<ResourceSet>,
    pub dynamic_offset_count: u32,
    pub inline_offsets: [u32; MAX_INLINE_DYNAMIC_OFFSETS],
    pub staged_offsets: StagingRef,
}

#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable, PartialEq, Eq)]
pub struct SetGraphicsResourceSetEntry(pub ResourceSetBinding);

#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable, PartialEq, Eq)]
pub struct SetComputeResourceSetEntry(pub ResourceSetBinding);

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable, PartialEq, Eq)]
pub struct SetScissorRectEntry {
    pub index: u32,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable, PartialEq, Eq)]
pub struct SetVertexBufferEntry {
    pub index: u32,
    pub buffer: Tracked<Buffer>,
    pub offset: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable, PartialEq)]
pub struct SetViewportEntry {
    pub index: u32,
    pub viewport: Viewport,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable, PartialEq, Eq)]
pub struct UpdateBufferEntry {
    pub buffer: Tracked<Buffer>,
    pub offset: u32,
    pub staged: StagingRef,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable, PartialEq, Eq)]
pub struct CopyBufferEntry {
    pub source: Tracked<Buffer>,
    pub source_offset: u32,
    pub destination: Tracked<Buffer>,
    pub destination_offset: u32,
    pub size: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable, PartialEq, Eq)]
pub struct CopyTextureEntry {
    pub source: Tracked<Texture>,
    pub destination: Tracked<Texture>,
    pub region: TextureCopyRegion,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable, PartialEq, Eq)]
pub struct ResolveTextureEntry {
    pub source: Tracked<Texture>,
    pub destination: Tracked<Texture>,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable, PartialEq, Eq)]
pub struct GenerateMipmapsEntry {
    pub texture: Tracked<Texture>,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable, PartialEq, Eq)]
pub struct PushDebugGroupEntry {
    pub name: Tracked<Label>,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable, PartialEq, Eq)]
pub struct PopDebugGroupEntry {}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable, PartialEq, Eq)]
pub struct InsertDebugMarkerEntry {
    pub name: Tracked<Label>,
}

entries! {
    BeginEntry => Begin,
    ClearColorTargetEntry => ClearColorTarget,
    ClearDepthStencilEntry => ClearDepthStencil,
    DrawIndexedEntry => DrawIndexed,
    EndEntry => End,
    SetFramebufferEntry => SetFramebuffer,
    SetIndexBufferEntry => SetIndexBuffer,
    SetPipelineEntry => SetPipeline,
    SetGraphicsResourceSetEntry => SetGraphicsResourceSet,
    SetScissorRectEntry => SetScissorRect,
    SetVertexBufferEntry => SetVertexBuffer,
    SetViewportEntry => SetViewport,
    UpdateBufferEntry => UpdateBuffer,
    CopyBufferEntry => CopyBuffer,
    CopyTextureEntry => CopyTexture,
    ResolveTextureEntry => ResolveTexture,
    DrawEntry => Draw,
    DispatchEntry => Dispatch,
    SetComputeResourceSetEntry => SetComputeResourceSet,
    DrawIndirectEntry => DrawIndirect,
    DrawIndexedIndirectEntry => DrawIndexedIndirect,
    DispatchIndirectEntry => DispatchIndirect,
    GenerateMipmapsEntry => GenerateMipmaps,
    PushDebugGroupEntry => PushDebugGroup,
    PopDebugGroupEntry => PopDebugGroup,
    InsertDebugMarkerEntry => InsertDebugMarker,
}

//===----------------------------------------------------------------------===//
// Tests
//===----------------------------------------------------------------------===//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_never_an_id() {
        assert_eq!(EntryId::from_u8(EntryId::SENTINEL), None);
        assert_eq!(EntryId::from_u8(27), None);
    }

    #[test]
    fn ids_decode_to_themselves() {
        for raw in 1..=26u8 {
            let id = EntryId::from_u8(raw).unwrap();
            assert_eq!(id as u8, raw);
        }
    }

    #[test]
    fn resource_set_binds_have_their_own_ids() {
        assert_eq!(SetGraphicsResourceSetEntry::ID as u8, 9);
        assert_eq!(SetComputeResourceSetEntry::ID as u8, 19);
        assert_eq!(
            SetGraphicsResourceSetEntry::SIZE,
            SetComputeResourceSetEntry::SIZE
        );
    }

    #[test]
    fn payload_sizes_are_fixed() {
        assert_eq!(BeginEntry::SIZE, 0);
        assert_eq!(DrawEntry::SIZE, 16);
        assert_eq!(DrawIndexedEntry::SIZE, 20);
        assert_eq!(ClearDepthStencilEntry::SIZE, 8);
        assert_eq!(SetViewportEntry::SIZE, 28);
        assert_eq!(CopyTextureEntry::SIZE, 64);
        assert_eq!(
            SetGraphicsResourceSetEntry::SIZE,
            12 + 4 * MAX_INLINE_DYNAMIC_OFFSETS + 8
        );
    }
}
