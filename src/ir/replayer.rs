use bytemuck::pod_read_unaligned;
use smallvec::SmallVec;

use crate::gpu::driver::command::*;
use crate::gpu::driver::EntryBuffer;
use crate::gpu::error::ReplayFault;
use crate::gpu::execution::ResourceSet;
use crate::gpu::structs::{IndexFormat, RgbaFloat, TextureCopyRegion, Viewport};
use crate::gpu::Backend;
use crate::utils::{ResourceList, StagingBlock};

/// Backend side of replay: one method per command kind, called with resolved
/// objects in recording order.
pub trait CommandExecutor<B: Backend> {
    fn begin(&mut self);
    fn end(&mut self);

    fn set_framebuffer(&mut self, framebuffer: &B::Framebuffer);
    fn clear_color_target(&mut self, index: u32, color: RgbaFloat);
    fn clear_depth_stencil(&mut self, depth: f32, stencil: u8);
    fn set_viewport(&mut self, index: u32, viewport: &Viewport);
    fn set_scissor_rect(&mut self, index: u32, x: u32, y: u32, width: u32, height: u32);

    fn set_pipeline(&mut self, pipeline: &B::Pipeline);
    fn set_vertex_buffer(&mut self, index: u32, buffer: &B::Buffer, offset: u32);
    fn set_index_buffer(&mut self, buffer: &B::Buffer, format: IndexFormat, offset: u32);
    fn set_graphics_resource_set(
        &mut self,
        slot: u32,
        set: &ResourceSet<B>,
        dynamic_offsets: &[u32],
    );
    fn set_compute_resource_set(
        &mut self,
        slot: u32,
        set: &ResourceSet<B>,
        dynamic_offsets: &[u32],
    );

    fn draw(
        &mut self,
        vertex_count: u32,
        instance_count: u32,
        vertex_start: u32,
        instance_start: u32,
    );
    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        index_start: u32,
        vertex_offset: i32,
        instance_start: u32,
    );
    fn draw_indirect(&mut self, buffer: &B::Buffer, offset: u32, draw_count: u32, stride: u32);
    fn draw_indexed_indirect(
        &mut self,
        buffer: &B::Buffer,
        offset: u32,
        draw_count: u32,
        stride: u32,
    );
    fn dispatch(&mut self, group_count_x: u32, group_count_y: u32, group_count_z: u32);
    fn dispatch_indirect(&mut self, buffer: &B::Buffer, offset: u32);

    fn update_buffer(&mut self, buffer: &B::Buffer, offset: u32, data: &[u8]);
    fn copy_buffer(
        &mut self,
        source: &B::Buffer,
        source_offset: u32,
        destination: &B::Buffer,
        destination_offset: u32,
        size: u32,
    );
    fn copy_texture(
        &mut self,
        source: &B::Texture,
        destination: &B::Texture,
        region: &TextureCopyRegion,
    );
    fn resolve_texture(&mut self, source: &B::Texture, destination: &B::Texture);
    fn generate_mipmaps(&mut self, texture: &B::Texture);

    fn push_debug_group(&mut self, name: &str);
    fn pop_debug_group(&mut self);
    fn insert_debug_marker(&mut self, name: &str);
}

/// What one replay pass went through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    pub entries: u32,
    pub blocks: usize,
}

/// Walks an [`EntryBuffer`] and forwards each entry to a [`CommandExecutor`].
pub struct CommandReplayer<'a, B: Backend> {
    entries: &'a EntryBuffer,
    resources: &'a ResourceList<B>,
    staged: &'a [StagingBlock],
}

impl<'a, B: Backend> CommandReplayer<'a, B> {
    pub fn new(
        entries: &'a EntryBuffer,
        resources: &'a ResourceList<B>,
        staged: &'a [StagingBlock],
    ) -> Self {
        Self {
            entries,
            resources,
            staged,
        }
    }

    /// Executes every recorded entry in order. The first fault stops replay;
    /// nothing after the faulting entry reaches the executor.
    pub fn replay<E: CommandExecutor<B> + ?Sized>(
        &self,
        executor: &mut E,
    ) -> Result<ReplayStats, ReplayFault> {
        self.replay_entries(executor).map_err(|fault| {
            log::error!("replay stopped: {}", fault);
            fault
        })
    }

    fn replay_entries<E: CommandExecutor<B> + ?Sized>(
        &self,
        ex: &mut E,
    ) -> Result<ReplayStats, ReplayFault> {
        let res = self.resources;
        let mut cursor = self.entries.cursor();

        while let Some(raw) = cursor.next_id()? {
            let entry = cursor.consumed() - 1;
            let id = EntryId::from_u8(raw).ok_or(ReplayFault::InvalidEntryId { id: raw, entry })?;
            log::trace!("replay entry {}: {:?}", entry, id);

            match id {
                EntryId::Begin => {
                    cursor.read::<BeginEntry>()?;
                    ex.begin();
                }
                EntryId::End => {
                    cursor.read::<EndEntry>()?;
                    ex.end();
                }
                EntryId::SetFramebuffer => {
                    let e = cursor.read::<SetFramebufferEntry>()?;
                    ex.set_framebuffer(res.resolve(e.framebuffer)?);
                }
                EntryId::ClearColorTarget => {
                    let e = cursor.read::<ClearColorTargetEntry>()?;
                    ex.clear_color_target(e.index, e.color);
                }
                EntryId::ClearDepthStencil => {
                    let e = cursor.read::<ClearDepthStencilEntry>()?;
                    ex.clear_depth_stencil(e.depth, e.stencil);
                }
                EntryId::SetViewport => {
                    let e = cursor.read::<SetViewportEntry>()?;
                    ex.set_viewport(e.index, &e.viewport);
                }
                EntryId::SetScissorRect => {
                    let e = cursor.read::<SetScissorRectEntry>()?;
                    ex.set_scissor_rect(e.index, e.x, e.y, e.width, e.height);
                }
                EntryId::SetPipeline => {
                    let e = cursor.read::<SetPipelineEntry>()?;
                    ex.set_pipeline(res.resolve(e.pipeline)?);
                }
                EntryId::SetVertexBuffer => {
                    let e = cursor.read::<SetVertexBufferEntry>()?;
                    ex.set_vertex_buffer(e.index, res.resolve(e.buffer)?, e.offset);
                }
                EntryId::SetIndexBuffer => {
                    let e = cursor.read::<SetIndexBufferEntry>()?;
                    let format = IndexFormat::from_raw(e.format)
                        .ok_or(ReplayFault::InvalidPayload { id: raw, entry })?;
                    ex.set_index_buffer(res.resolve(e.buffer)?, format, e.offset);
                }
                EntryId::SetGraphicsResourceSet => {
                    let e = cursor.read::<SetGraphicsResourceSetEntry>()?.0;
                    let offsets = self.dynamic_offsets(&e, raw, entry)?;
                    ex.set_graphics_resource_set(e.slot, res.resolve(e.set)?, &offsets);
                }
                EntryId::SetComputeResourceSet => {
                    let e = cursor.read::<SetComputeResourceSetEntry>()?.0;
                    let offsets = self.dynamic_offsets(&e, raw, entry)?;
                    ex.set_compute_resource_set(e.slot, res.resolve(e.set)?, &offsets);
                }
                EntryId::Draw => {
                    let e = cursor.read::<DrawEntry>()?;
                    ex.draw(e.vertex_count, e.instance_count, e.vertex_start, e.instance_start);
                }
                EntryId::DrawIndexed => {
                    let e = cursor.read::<DrawIndexedEntry>()?;
                    ex.draw_indexed(
                        e.index_count,
                        e.instance_count,
                        e.index_start,
                        e.vertex_offset,
                        e.instance_start,
                    );
                }
                EntryId::DrawIndirect => {
                    let e = cursor.read::<DrawIndirectEntry>()?;
                    ex.draw_indirect(res.resolve(e.buffer)?, e.offset, e.draw_count, e.stride);
                }
                EntryId::DrawIndexedIndirect => {
                    let e = cursor.read::<DrawIndexedIndirectEntry>()?;
                    ex.draw_indexed_indirect(
                        res.resolve(e.buffer)?,
                        e.offset,
                        e.draw_count,
                        e.stride,
                    );
                }
                EntryId::Dispatch => {
                    let e = cursor.read::<DispatchEntry>()?;
                    ex.dispatch(e.group_count_x, e.group_count_y, e.group_count_z);
                }
                EntryId::DispatchIndirect => {
                    let e = cursor.read::<DispatchIndirectEntry>()?;
                    ex.dispatch_indirect(res.resolve(e.buffer)?, e.offset);
                }
                EntryId::UpdateBuffer => {
                    let e = cursor.read::<UpdateBufferEntry>()?;
                    let block = self.staged_block(e.staged, raw, entry)?;
                    ex.update_buffer(res.resolve(e.buffer)?, e.offset, block.as_slice());
                }
                EntryId::CopyBuffer => {
                    let e = cursor.read::<CopyBufferEntry>()?;
                    ex.copy_buffer(
                        res.resolve(e.source)?,
                        e.source_offset,
                        res.resolve(e.destination)?,
                        e.destination_offset,
                        e.size,
                    );
                }
                EntryId::CopyTexture => {
                    let e = cursor.read::<CopyTextureEntry>()?;
                    ex.copy_texture(res.resolve(e.source)?, res.resolve(e.destination)?, &e.region);
                }
                EntryId::ResolveTexture => {
                    let e = cursor.read::<ResolveTextureEntry>()?;
                    ex.resolve_texture(res.resolve(e.source)?, res.resolve(e.destination)?);
                }
                EntryId::GenerateMipmaps => {
                    let e = cursor.read::<GenerateMipmapsEntry>()?;
                    ex.generate_mipmaps(res.resolve(e.texture)?);
                }
                EntryId::PushDebugGroup => {
                    let e = cursor.read::<PushDebugGroupEntry>()?;
                    ex.push_debug_group(res.resolve(e.name)?);
                }
                EntryId::PopDebugGroup => {
                    cursor.read::<PopDebugGroupEntry>()?;
                    ex.pop_debug_group();
                }
                EntryId::InsertDebugMarker => {
                    let e = cursor.read::<InsertDebugMarkerEntry>()?;
                    ex.insert_debug_marker(res.resolve(e.name)?);
                }
            }
        }

        Ok(ReplayStats {
            entries: cursor.consumed(),
            blocks: cursor.blocks_visited(),
        })
    }

    fn staged_block(
        &self,
        r: StagingRef,
        id: u8,
        entry: u32,
    ) -> Result<&'a StagingBlock, ReplayFault> {
        self.staged
            .get(r.index as usize)
            .filter(|b| b.size() == r.size as usize)
            .ok_or(ReplayFault::InvalidPayload { id, entry })
    }

    fn dynamic_offsets(
        &self,
        e: &ResourceSetBinding,
        id: u8,
        entry: u32,
    ) -> Result<SmallVec<[u32; MAX_INLINE_DYNAMIC_OFFSETS]>, ReplayFault> {
        let count = e.dynamic_offset_count as usize;
        if count <= MAX_INLINE_DYNAMIC_OFFSETS {
            return Ok(SmallVec::from_slice(&e.inline_offsets[..count]));
        }

        let block = self.staged_block(e.staged_offsets, id, entry)?;
        if block.as_slice().len() != count * 4 {
            return Err(ReplayFault::InvalidPayload { id, entry });
        }
        Ok(block
            .as_slice()
            .chunks_exact(4)
            .map(pod_read_unaligned::<u32>)
            .collect())
    }
}
