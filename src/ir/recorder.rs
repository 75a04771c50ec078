use smallvec::SmallVec;

use super::replayer::CommandExecutor;
use crate::gpu::execution::ResourceSet;
use crate::gpu::structs::{IndexFormat, RgbaFloat, TextureCopyRegion, Viewport};
use crate::gpu::Backend;

/// One executor call with its decoded arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall<B: Backend> {
    Begin,
    End,
    SetFramebuffer(B::Framebuffer),
    ClearColorTarget(u32, RgbaFloat),
    ClearDepthStencil(f32, u8),
    SetViewport(u32, Viewport),
    SetScissorRect(u32, u32, u32, u32, u32),
    SetPipeline(B::Pipeline),
    SetVertexBuffer(u32, B::Buffer, u32),
    SetIndexBuffer(B::Buffer, IndexFormat, u32),
    SetGraphicsResourceSet(u32, ResourceSet<B>, SmallVec<[u32; 4]>),
    SetComputeResourceSet(u32, ResourceSet<B>, SmallVec<[u32; 4]>),
    Draw(u32, u32, u32, u32),
    DrawIndexed(u32, u32, u32, i32, u32),
    DrawIndirect(B::Buffer, u32, u32, u32),
    DrawIndexedIndirect(B::Buffer, u32, u32, u32),
    Dispatch(u32, u32, u32),
    DispatchIndirect(B::Buffer, u32),
    UpdateBuffer(B::Buffer, u32, Vec<u8>),
    CopyBuffer(B::Buffer, u32, B::Buffer, u32, u32),
    CopyTexture(B::Texture, B::Texture, TextureCopyRegion),
    ResolveTexture(B::Texture, B::Texture),
    GenerateMipmaps(B::Texture),
    PushDebugGroup(String),
    PopDebugGroup,
    InsertDebugMarker(String),
}

/// Executor that only writes down what it was asked to do.
///
/// Useful for tests or headless runs where a command stream has to be
/// inspected instead of executed.
pub struct RecordingExecutor<B: Backend> {
    pub calls: Vec<RecordedCall<B>>,
}

impl<B: Backend> Default for RecordingExecutor<B> {
    fn default() -> Self {
        Self { calls: Vec::new() }
    }
}

impl<B: Backend> RecordingExecutor<B> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&mut self) -> Vec<RecordedCall<B>> {
        std::mem::take(&mut self.calls)
    }
}

impl<B: Backend> CommandExecutor<B> for RecordingExecutor<B> {
    fn begin(&mut self) {
        self.calls.push(RecordedCall::Begin);
    }

    fn end(&mut self) {
        self.calls.push(RecordedCall::End);
    }

    fn set_framebuffer(&mut self, framebuffer: &B::Framebuffer) {
        self.calls.push(RecordedCall::SetFramebuffer(framebuffer.clone()));
    }

    fn clear_color_target(&mut self, index: u32, color: RgbaFloat) {
        self.calls.push(RecordedCall::ClearColorTarget(index, color));
    }

    fn clear_depth_stencil(&mut self, depth: f32, stencil: u8) {
        self.calls.push(RecordedCall::ClearDepthStencil(depth, stencil));
    }

    fn set_viewport(&mut self, index: u32, viewport: &Viewport) {
        self.calls.push(RecordedCall::SetViewport(index, *viewport));
    }

    fn set_scissor_rect(&mut self, index: u32, x: u32, y: u32, width: u32, height: u32) {
        self.calls
            .push(RecordedCall::SetScissorRect(index, x, y, width, height));
    }

    fn set_pipeline(&mut self, pipeline: &B::Pipeline) {
        self.calls.push(RecordedCall::SetPipeline(pipeline.clone()));
    }

    fn set_vertex_buffer(&mut self, index: u32, buffer: &B::Buffer, offset: u32) {
        self.calls
            .push(RecordedCall::SetVertexBuffer(index, buffer.clone(), offset));
    }

    fn set_index_buffer(&mut self, buffer: &B::Buffer, format: IndexFormat, offset: u32) {
        self.calls
            .push(RecordedCall::SetIndexBuffer(buffer.clone(), format, offset));
    }

    fn set_graphics_resource_set(
        &mut self,
        slot: u32,
        set: &ResourceSet<B>,
        dynamic_offsets: &[u32],
    ) {
        self.calls.push(RecordedCall::SetGraphicsResourceSet(
            slot,
            set.clone(),
            SmallVec::from_slice(dynamic_offsets),
        ));
    }

    fn set_compute_resource_set(
        &mut self,
        slot: u32,
        set: &ResourceSet<B>,
        dynamic_offsets: &[u32],
    ) {
        self.calls.push(RecordedCall::SetComputeResourceSet(
            slot,
            set.clone(),
            SmallVec::from_slice(dynamic_offsets),
        ));
    }

    fn draw(
        &mut self,
        vertex_count: u32,
        instance_count: u32,
        vertex_start: u32,
        instance_start: u32,
    ) {
        self.calls.push(RecordedCall::Draw(
            vertex_count,
            instance_count,
            vertex_start,
            instance_start,
        ));
    }

    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        index_start: u32,
        vertex_offset: i32,
        instance_start: u32,
    ) {
        self.calls.push(RecordedCall::DrawIndexed(
            index_count,
            instance_count,
            index_start,
            vertex_offset,
            instance_start,
        ));
    }

    fn draw_indirect(&mut self, buffer: &B::Buffer, offset: u32, draw_count: u32, stride: u32) {
        self.calls
            .push(RecordedCall::DrawIndirect(buffer.clone(), offset, draw_count, stride));
    }

    fn draw_indexed_indirect(
        &mut self,
        buffer: &B::Buffer,
        offset: u32,
        draw_count: u32,
        stride: u32,
    ) {
        self.calls.push(RecordedCall::DrawIndexedIndirect(
            buffer.clone(),
            offset,
            draw_count,
            stride,
        ));
    }

    fn dispatch(&mut self, group_count_x: u32, group_count_y: u32, group_count_z: u32) {
        self.calls
            .push(RecordedCall::Dispatch(group_count_x, group_count_y, group_count_z));
    }

    fn dispatch_indirect(&mut self, buffer: &B::Buffer, offset: u32) {
        self.calls
            .push(RecordedCall::DispatchIndirect(buffer.clone(), offset));
    }

    fn update_buffer(&mut self, buffer: &B::Buffer, offset: u32, data: &[u8]) {
        self.calls
            .push(RecordedCall::UpdateBuffer(buffer.clone(), offset, data.to_vec()));
    }

    fn copy_buffer(
        &mut self,
        source: &B::Buffer,
        source_offset: u32,
        destination: &B::Buffer,
        destination_offset: u32,
        size: u32,
    ) {
        self.calls.push(RecordedCall::CopyBuffer(
            source.clone(),
            source_offset,
            destination.clone(),
            destination_offset,
            size,
        ));
    }

    fn copy_texture(
        &mut self,
        source: &B::Texture,
        destination: &B::Texture,
        region: &TextureCopyRegion,
    ) {
        self.calls.push(RecordedCall::CopyTexture(
            source.clone(),
            destination.clone(),
            *region,
        ));
    }

    fn resolve_texture(&mut self, source: &B::Texture, destination: &B::Texture) {
        self.calls
            .push(RecordedCall::ResolveTexture(source.clone(), destination.clone()));
    }

    fn generate_mipmaps(&mut self, texture: &B::Texture) {
        self.calls.push(RecordedCall::GenerateMipmaps(texture.clone()));
    }

    fn push_debug_group(&mut self, name: &str) {
        self.calls.push(RecordedCall::PushDebugGroup(name.to_string()));
    }

    fn pop_debug_group(&mut self) {
        self.calls.push(RecordedCall::PopDebugGroup);
    }

    fn insert_debug_marker(&mut self, name: &str) {
        self.calls
            .push(RecordedCall::InsertDebugMarker(name.to_string()));
    }
}
