use std::marker::PhantomData;

use bytemuck::{cast_slice, Pod};

use crate::gpu::driver::command::*;
use crate::gpu::driver::types::{Buffer, Framebuffer, Label, Pipeline, ResourceSet, Texture};
use crate::gpu::driver::EntryBuffer;
use crate::gpu::error::{GpuError, ReplayFault, ValidationError};
use crate::gpu::execution::{BindableResource, ResourceSet as BoundSet};
use crate::gpu::structs::{IndexFormat, ResourceKind, RgbaFloat, TextureCopyRegion, Viewport};
use crate::gpu::{Backend, BufferResource, PipelineResource};
use crate::ir::{CommandExecutor, CommandReplayer, ReplayStats};
use crate::utils::{ResourceList, SharedStagingPool, StagingBlock};

/// Recorder states. A list moves `Initial -> Recording -> Executable` and
/// back to `Initial` through `reset`.
pub struct Initial;
pub struct Recording;
pub struct Executable;

/// Required alignment of the effective offset of a dynamic buffer binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetAlignment {
    pub uniform: u32,
    pub structured: u32,
}

impl Default for OffsetAlignment {
    fn default() -> Self {
        Self {
            uniform: 256,
            structured: 16,
        }
    }
}

impl OffsetAlignment {
    fn for_kind(&self, kind: ResourceKind) -> u32 {
        match kind {
            ResourceKind::UniformBuffer => self.uniform,
            _ => self.structured,
        }
    }
}

/// Storage owned by exactly one command list.
struct ListStorage<B: Backend> {
    entries: EntryBuffer,
    resources: ResourceList<B>,
    staged: Vec<StagingBlock>,
    pool: SharedStagingPool,
    alignment: OffsetAlignment,
    graphics_pipeline: Option<B::Pipeline>,
    compute_pipeline: Option<B::Pipeline>,
}

impl<B: Backend> ListStorage<B> {
    /// Returns every staged block to the pool and empties the session.
    fn clear(&mut self) {
        if !self.staged.is_empty() {
            let mut pool = self.pool.lock();
            for block in self.staged.drain(..) {
                pool.free(block);
            }
        }
        self.entries.reset();
        self.resources.clear();
        self.graphics_pipeline = None;
        self.compute_pipeline = None;
    }
}

impl<B: Backend> Drop for ListStorage<B> {
    fn drop(&mut self) {
        self.clear();
    }
}

/// Client-facing recorder with type-state tracking.
///
/// Every call appends one entry; object arguments are tracked and CPU data
/// is copied into staging blocks so the caller's memory can be reused right
/// after the call returns.
pub struct CommandList<B: Backend, S = Initial> {
    storage: ListStorage<B>,
    _state: PhantomData<S>,
}

impl<B: Backend, S> CommandList<B, S> {
    fn transition<T>(self) -> CommandList<B, T> {
        CommandList {
            storage: self.storage,
            _state: PhantomData,
        }
    }

    /// Entries recorded in the current session.
    pub fn entry_count(&self) -> u32 {
        self.storage.entries.len()
    }

    pub fn tracked_count(&self) -> usize {
        self.storage.resources.len()
    }

    pub fn staged_count(&self) -> usize {
        self.storage.staged.len()
    }

    pub fn entries(&self) -> &EntryBuffer {
        &self.storage.entries
    }

    /// Releases staging blocks and tracked objects. Dropping the list does
    /// the same.
    pub fn dispose(self) {
        drop(self);
    }
}

impl<B: Backend> CommandList<B, Initial> {
    pub fn new(pool: SharedStagingPool, block_size: usize) -> Self {
        Self {
            storage: ListStorage {
                entries: EntryBuffer::new(block_size),
                resources: ResourceList::default(),
                staged: Vec::new(),
                pool,
                alignment: OffsetAlignment::default(),
                graphics_pipeline: None,
                compute_pipeline: None,
            },
            _state: PhantomData,
        }
    }

    pub fn with_offset_alignment(mut self, alignment: OffsetAlignment) -> Self {
        self.storage.alignment = alignment;
        self
    }

    /// Begin recording commands.
    pub fn begin(mut self) -> CommandList<B, Recording> {
        self.storage.entries.append(&BeginEntry {});
        self.transition()
    }
}

impl<B: Backend> CommandList<B, Recording> {
    /// Finish recording and transition to an executable state.
    pub fn end(mut self) -> CommandList<B, Executable> {
        self.storage.entries.append(&EndEntry {});
        self.transition()
    }

    /// Abandon the current recording.
    pub fn reset(mut self) -> CommandList<B, Initial> {
        self.storage.clear();
        self.transition()
    }

    #[inline(always)]
    fn push<E: Entry>(&mut self, entry: &E) {
        self.storage.entries.append(entry);
    }

    /// Byte counts and staged block indices are stored as `u32`.
    fn recordable(size: usize) -> Result<u32, ValidationError> {
        u32::try_from(size).map_err(|_| ValidationError::DataTooLarge { size })
    }

    fn stage(&mut self, data: &[u8]) -> Result<StagingRef, ValidationError> {
        let size = Self::recordable(data.len())?;
        let index = Self::recordable(self.storage.staged.len())?;
        let block = self.storage.pool.lock().stage(data);
        self.storage.staged.push(block);
        Ok(StagingRef { index, size })
    }

    pub fn set_framebuffer(&mut self, framebuffer: &B::Framebuffer) {
        let framebuffer = self.storage.resources.track::<Framebuffer>(framebuffer.clone());
        self.push(&SetFramebufferEntry { framebuffer });
    }

    pub fn clear_color_target(&mut self, index: u32, color: RgbaFloat) {
        self.push(&ClearColorTargetEntry { index, color });
    }

    pub fn clear_depth_stencil(&mut self, depth: f32, stencil: u8) {
        self.push(&ClearDepthStencilEntry {
            depth,
            stencil,
            _pad: [0; 3],
        });
    }

    pub fn set_viewport(&mut self, index: u32, viewport: &Viewport) {
        self.push(&SetViewportEntry {
            index,
            viewport: *viewport,
        });
    }

    pub fn set_scissor_rect(&mut self, index: u32, x: u32, y: u32, width: u32, height: u32) {
        self.push(&SetScissorRectEntry {
            index,
            x,
            y,
            width,
            height,
        });
    }

    /// Makes `pipeline` the active graphics or compute pipeline, which later
    /// resource-set binds are validated against.
    pub fn set_pipeline(&mut self, pipeline: &B::Pipeline) {
        if pipeline.is_compute() {
            self.storage.compute_pipeline = Some(pipeline.clone());
        } else {
            self.storage.graphics_pipeline = Some(pipeline.clone());
        }
        let pipeline = self.storage.resources.track::<Pipeline>(pipeline.clone());
        self.push(&SetPipelineEntry { pipeline });
    }

    pub fn set_vertex_buffer(&mut self, index: u32, buffer: &B::Buffer, offset: u32) {
        let buffer = self.storage.resources.track::<Buffer>(buffer.clone());
        self.push(&SetVertexBufferEntry {
            index,
            buffer,
            offset,
        });
    }

    pub fn set_index_buffer(&mut self, buffer: &B::Buffer, format: IndexFormat, offset: u32) {
        let buffer = self.storage.resources.track::<Buffer>(buffer.clone());
        self.push(&SetIndexBufferEntry {
            buffer,
            format: format.as_raw(),
            offset,
        });
    }

    /// Binds `set` for draws. The set's layout must match the active
    /// graphics pipeline's layout at `slot`, and `dynamic_offsets` must hold
    /// one aligned offset per dynamic-binding element.
    pub fn set_graphics_resource_set(
        &mut self,
        slot: u32,
        set: &BoundSet<B>,
        dynamic_offsets: &[u32],
    ) -> Result<(), GpuError> {
        let binding = self.resource_set_binding(slot, set, dynamic_offsets, false)?;
        self.push(&SetGraphicsResourceSetEntry(binding));
        Ok(())
    }

    /// Binds `set` for dispatches, validated against the active compute
    /// pipeline.
    pub fn set_compute_resource_set(
        &mut self,
        slot: u32,
        set: &BoundSet<B>,
        dynamic_offsets: &[u32],
    ) -> Result<(), GpuError> {
        let binding = self.resource_set_binding(slot, set, dynamic_offsets, true)?;
        self.push(&SetComputeResourceSetEntry(binding));
        Ok(())
    }

    fn check_pipeline_layout(
        &self,
        slot: u32,
        set: &BoundSet<B>,
        compute: bool,
    ) -> Result<(), ValidationError> {
        let (pipeline, bind_point) = if compute {
            (self.storage.compute_pipeline.as_ref(), "compute")
        } else {
            (self.storage.graphics_pipeline.as_ref(), "graphics")
        };
        let pipeline = pipeline.ok_or(ValidationError::NoActivePipeline { bind_point })?;

        let layouts = pipeline.resource_layouts();
        let expected = layouts
            .get(slot as usize)
            .ok_or(ValidationError::SetSlotOutOfRange {
                slot,
                layouts: layouts.len(),
            })?
            .elements();
        let actual = set.layout().elements();
        if expected.len() != actual.len() {
            return Err(ValidationError::IncompatibleSetLength {
                slot,
                expected: expected.len(),
                actual: actual.len(),
            });
        }
        for (element, (e, a)) in expected.iter().zip(actual).enumerate() {
            if e.kind != a.kind {
                return Err(ValidationError::IncompatibleSetElement {
                    slot,
                    element,
                    expected: e.kind,
                    actual: a.kind,
                });
            }
        }
        Ok(())
    }

    fn check_offset_alignment(
        &self,
        set: &BoundSet<B>,
        dynamic_offsets: &[u32],
    ) -> Result<(), ValidationError> {
        let dynamic = set
            .layout()
            .elements()
            .iter()
            .zip(set.resources())
            .enumerate()
            .filter(|(_, (e, _))| !e.is_unused() && e.is_dynamic());

        for ((element, (desc, resource)), &offset) in dynamic.zip(dynamic_offsets) {
            let base = match resource {
                BindableResource::BufferRange { offset, .. } => *offset,
                _ => 0,
            };
            let alignment = self.storage.alignment.for_kind(desc.kind);
            let effective = base + u64::from(offset);
            if effective % u64::from(alignment.max(1)) != 0 {
                return Err(ValidationError::MisalignedDynamicOffset {
                    element,
                    offset: effective,
                    alignment,
                });
            }
        }
        Ok(())
    }

    fn resource_set_binding(
        &mut self,
        slot: u32,
        set: &BoundSet<B>,
        dynamic_offsets: &[u32],
        compute: bool,
    ) -> Result<ResourceSetBinding, ValidationError> {
        self.check_pipeline_layout(slot, set, compute)?;
        set.check_dynamic_offsets(dynamic_offsets)?;
        self.check_offset_alignment(set, dynamic_offsets)?;
        let dynamic_offset_count = Self::recordable(dynamic_offsets.len())?;

        let mut inline_offsets = [0u32; MAX_INLINE_DYNAMIC_OFFSETS];
        let mut staged_offsets = StagingRef::default();
        if dynamic_offsets.len() <= MAX_INLINE_DYNAMIC_OFFSETS {
            inline_offsets[..dynamic_offsets.len()].copy_from_slice(dynamic_offsets);
        } else {
            staged_offsets = self.stage(cast_slice(dynamic_offsets))?;
        }

        Ok(ResourceSetBinding {
            slot,
            set: self.storage.resources.track::<ResourceSet>(set.clone()),
            dynamic_offset_count,
            inline_offsets,
            staged_offsets,
        })
    }

    pub fn draw(
        &mut self,
        vertex_count: u32,
        instance_count: u32,
        vertex_start: u32,
        instance_start: u32,
    ) {
        self.push(&DrawEntry {
            vertex_count,
            instance_count,
            vertex_start,
            instance_start,
        });
    }

    pub fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        index_start: u32,
        vertex_offset: i32,
        instance_start: u32,
    ) {
        self.push(&DrawIndexedEntry {
            index_count,
            instance_count,
            index_start,
            vertex_offset,
            instance_start,
        });
    }

    pub fn draw_indirect(&mut self, buffer: &B::Buffer, offset: u32, draw_count: u32, stride: u32) {
        let buffer = self.storage.resources.track::<Buffer>(buffer.clone());
        self.push(&DrawIndirectEntry {
            buffer,
            offset,
            draw_count,
            stride,
        });
    }

    pub fn draw_indexed_indirect(
        &mut self,
        buffer: &B::Buffer,
        offset: u32,
        draw_count: u32,
        stride: u32,
    ) {
        let buffer = self.storage.resources.track::<Buffer>(buffer.clone());
        self.push(&DrawIndexedIndirectEntry {
            buffer,
            offset,
            draw_count,
            stride,
        });
    }

    pub fn dispatch(&mut self, group_count_x: u32, group_count_y: u32, group_count_z: u32) {
        self.push(&DispatchEntry {
            group_count_x,
            group_count_y,
            group_count_z,
        });
    }

    pub fn dispatch_indirect(&mut self, buffer: &B::Buffer, offset: u32) {
        let buffer = self.storage.resources.track::<Buffer>(buffer.clone());
        self.push(&DispatchIndirectEntry { buffer, offset });
    }

    /// Copies `data` now; the buffer is written when the list executes.
    /// Empty updates record nothing.
    pub fn update_buffer(
        &mut self,
        buffer: &B::Buffer,
        offset: u32,
        data: &[u8],
    ) -> Result<(), GpuError> {
        let size = data.len() as u64;
        let buffer_size = buffer.size_in_bytes();
        if u64::from(offset) + size > buffer_size {
            return Err(ValidationError::BufferRangeOutOfBounds {
                offset: offset.into(),
                size,
                buffer_size,
            }
            .into());
        }
        if data.is_empty() {
            return Ok(());
        }

        let staged = self.stage(data)?;
        let buffer = self.storage.resources.track::<Buffer>(buffer.clone());
        self.push(&UpdateBufferEntry {
            buffer,
            offset,
            staged,
        });
        Ok(())
    }

    pub fn update_buffer_with<T: Pod>(
        &mut self,
        buffer: &B::Buffer,
        offset: u32,
        data: &[T],
    ) -> Result<(), GpuError> {
        self.update_buffer(buffer, offset, cast_slice(data))
    }

    pub fn copy_buffer(
        &mut self,
        source: &B::Buffer,
        source_offset: u32,
        destination: &B::Buffer,
        destination_offset: u32,
        size: u32,
    ) {
        let source = self.storage.resources.track::<Buffer>(source.clone());
        let destination = self.storage.resources.track::<Buffer>(destination.clone());
        self.push(&CopyBufferEntry {
            source,
            source_offset,
            destination,
            destination_offset,
            size,
        });
    }

    pub fn copy_texture(
        &mut self,
        source: &B::Texture,
        destination: &B::Texture,
        region: &TextureCopyRegion,
    ) {
        let source = self.storage.resources.track::<Texture>(source.clone());
        let destination = self.storage.resources.track::<Texture>(destination.clone());
        self.push(&CopyTextureEntry {
            source,
            destination,
            region: *region,
        });
    }

    pub fn resolve_texture(&mut self, source: &B::Texture, destination: &B::Texture) {
        let source = self.storage.resources.track::<Texture>(source.clone());
        let destination = self.storage.resources.track::<Texture>(destination.clone());
        self.push(&ResolveTextureEntry {
            source,
            destination,
        });
    }

    pub fn generate_mipmaps(&mut self, texture: &B::Texture) {
        let texture = self.storage.resources.track::<Texture>(texture.clone());
        self.push(&GenerateMipmapsEntry { texture });
    }

    pub fn push_debug_group(&mut self, name: &str) {
        let name = self.storage.resources.track::<Label>(name.to_string());
        self.push(&PushDebugGroupEntry { name });
    }

    pub fn pop_debug_group(&mut self) {
        self.push(&PopDebugGroupEntry {});
    }

    pub fn insert_debug_marker(&mut self, name: &str) {
        let name = self.storage.resources.track::<Label>(name.to_string());
        self.push(&InsertDebugMarkerEntry { name });
    }
}

impl<B: Backend> CommandList<B, Executable> {
    /// Replays the recorded entries, in order, on `executor`.
    pub fn execute<E: CommandExecutor<B> + ?Sized>(
        &self,
        executor: &mut E,
    ) -> Result<ReplayStats, ReplayFault> {
        CommandReplayer::new(
            &self.storage.entries,
            &self.storage.resources,
            &self.storage.staged,
        )
        .replay(executor)
    }

    /// Empties the list for reuse. Entry blocks stay allocated; staging
    /// blocks go back to the pool and tracked objects are released.
    pub fn reset(mut self) -> CommandList<B, Initial> {
        self.storage.clear();
        self.transition()
    }
}
