//! In-memory backend. Buffers hold real bytes, everything else only has an
//! identity, and the executor tracks bound state so replays can be checked
//! without a GPU.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::error::GpuError;
use super::execution::{
    BindableResource, PipelineStates, RegisterClass, ResourceLayout, ResourceSet, StateFactory,
};
use super::state::{
    BlendStateDescription, ComputePipelineDescription, DepthStencilStateDescription,
    GraphicsPipelineDescription, RasterizerStateDescription, VertexLayoutDescription,
};
use super::structs::{
    BackendKind, BufferUsage, IndexFormat, RgbaFloat, ShaderStages, TextureCopyRegion,
    TextureUsage, Viewport,
};
use super::{
    Backend, BackendDevice, BufferResource, PipelineResource, Resource, TextureResource,
};
use crate::ir::CommandExecutor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Headless;

impl Backend for Headless {
    type Buffer = HeadlessBuffer;
    type Texture = HeadlessTexture;
    type Sampler = HeadlessSampler;
    type Framebuffer = HeadlessFramebuffer;
    type Pipeline = HeadlessPipeline;
}

macro_rules! identity_resource {
    ($($name:ident),* $(,)?) => {$(
        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                Arc::ptr_eq(&self.0, &other.0)
            }
        }

        impl Eq for $name {}

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", stringify!($name), self.0.id)
            }
        }

        impl Resource for $name {}

        impl $name {
            pub fn id(&self) -> u32 {
                self.0.id
            }
        }
    )*};
}

// ----- Objects --------------------------------------------------------------

struct BufferInner {
    id: u32,
    usage: BufferUsage,
    contents: Mutex<Vec<u8>>,
}

#[derive(Clone)]
pub struct HeadlessBuffer(Arc<BufferInner>);

impl HeadlessBuffer {
    /// Snapshot of the buffer's bytes.
    pub fn read(&self) -> Vec<u8> {
        self.0.contents.lock().clone()
    }

    fn write(&self, offset: u32, data: &[u8]) -> Result<(), String> {
        let mut contents = self.0.contents.lock();
        let start = offset as usize;
        let end = start + data.len();
        if end > contents.len() {
            return Err(format!(
                "write of {} bytes at {} overruns buffer #{} ({} bytes)",
                data.len(),
                offset,
                self.0.id,
                contents.len()
            ));
        }
        contents[start..end].copy_from_slice(data);
        Ok(())
    }

    fn read_range(&self, offset: u32, size: u32) -> Result<Vec<u8>, String> {
        let contents = self.0.contents.lock();
        let start = offset as usize;
        let end = start + size as usize;
        contents.get(start..end).map(<[u8]>::to_vec).ok_or_else(|| {
            format!(
                "read of {} bytes at {} overruns buffer #{} ({} bytes)",
                size,
                offset,
                self.0.id,
                contents.len()
            )
        })
    }
}

impl BufferResource for HeadlessBuffer {
    fn usage(&self) -> BufferUsage {
        self.0.usage
    }

    fn size_in_bytes(&self) -> u64 {
        self.0.contents.lock().len() as u64
    }
}

struct TextureInner {
    id: u32,
    usage: TextureUsage,
    width: u32,
    height: u32,
    mip_levels: u32,
}

#[derive(Clone)]
pub struct HeadlessTexture(Arc<TextureInner>);

impl HeadlessTexture {
    pub fn width(&self) -> u32 {
        self.0.width
    }

    pub fn height(&self) -> u32 {
        self.0.height
    }
}

impl TextureResource for HeadlessTexture {
    fn usage(&self) -> TextureUsage {
        self.0.usage
    }

    fn mip_levels(&self) -> u32 {
        self.0.mip_levels
    }
}

struct ObjectInner {
    id: u32,
}

#[derive(Clone)]
pub struct HeadlessSampler(Arc<ObjectInner>);

#[derive(Clone)]
pub struct HeadlessFramebuffer(Arc<ObjectInner>);

/// Native fixed-function state object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadlessState {
    pub id: u32,
}

struct PipelineInner {
    id: u32,
    /// Blend, depth-stencil, rasterizer and input layout state; `None` for
    /// compute pipelines.
    states: Option<[HeadlessState; 4]>,
    resource_layouts: Vec<ResourceLayout>,
}

#[derive(Clone)]
pub struct HeadlessPipeline(Arc<PipelineInner>);

impl HeadlessPipeline {
    pub fn states(&self) -> Option<[HeadlessState; 4]> {
        self.0.states
    }
}

impl PipelineResource for HeadlessPipeline {
    fn is_compute(&self) -> bool {
        self.0.states.is_none()
    }

    fn resource_layouts(&self) -> &[ResourceLayout] {
        &self.0.resource_layouts
    }
}

identity_resource! {
    HeadlessBuffer,
    HeadlessTexture,
    HeadlessSampler,
    HeadlessFramebuffer,
    HeadlessPipeline,
}

// ----- Device ---------------------------------------------------------------

/// Creates headless objects and counts the native state objects built.
pub struct HeadlessDevice {
    kind: BackendKind,
    next_id: AtomicU32,
    states_created: [AtomicUsize; 4],
}

impl HeadlessDevice {
    /// `kind` selects the slot numbering scheme the device reports.
    pub fn new(kind: BackendKind) -> Self {
        Self {
            kind,
            next_id: AtomicU32::new(1),
            states_created: Default::default(),
        }
    }

    fn next_id(&self) -> u32 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn new_state(&self, category: usize) -> HeadlessState {
        self.states_created[category].fetch_add(1, Ordering::Relaxed);
        HeadlessState { id: self.next_id() }
    }

    pub fn create_buffer(&self, size: u64, usage: BufferUsage) -> HeadlessBuffer {
        HeadlessBuffer(Arc::new(BufferInner {
            id: self.next_id(),
            usage,
            contents: Mutex::new(vec![0; size as usize]),
        }))
    }

    pub fn create_texture(
        &self,
        width: u32,
        height: u32,
        mip_levels: u32,
        usage: TextureUsage,
    ) -> HeadlessTexture {
        HeadlessTexture(Arc::new(TextureInner {
            id: self.next_id(),
            usage,
            width,
            height,
            mip_levels: mip_levels.max(1),
        }))
    }

    pub fn create_sampler(&self) -> HeadlessSampler {
        HeadlessSampler(Arc::new(ObjectInner { id: self.next_id() }))
    }

    pub fn create_framebuffer(&self) -> HeadlessFramebuffer {
        HeadlessFramebuffer(Arc::new(ObjectInner { id: self.next_id() }))
    }

    /// Native state objects built so far: blend, depth-stencil, rasterizer,
    /// input layout.
    pub fn states_created(&self) -> [usize; 4] {
        [
            self.states_created[0].load(Ordering::Relaxed),
            self.states_created[1].load(Ordering::Relaxed),
            self.states_created[2].load(Ordering::Relaxed),
            self.states_created[3].load(Ordering::Relaxed),
        ]
    }

    fn check_layouts(&self, layouts: &[ResourceLayout]) -> Result<(), GpuError> {
        match layouts.iter().find(|l| l.slots().backend() != self.kind) {
            Some(l) => Err(GpuError::Backend(format!(
                "pipeline layout targets {}, device is {}",
                l.slots().backend().name(),
                self.kind.name()
            ))),
            None => Ok(()),
        }
    }
}

impl StateFactory for HeadlessDevice {
    type BlendState = HeadlessState;
    type DepthStencilState = HeadlessState;
    type RasterizerState = HeadlessState;
    type InputLayout = HeadlessState;

    fn create_blend_state(&self, desc: &BlendStateDescription) -> Result<HeadlessState, GpuError> {
        if desc.attachments.is_empty() {
            return Err(GpuError::Backend("blend state without attachments".into()));
        }
        Ok(self.new_state(0))
    }

    fn create_depth_stencil_state(
        &self,
        _desc: &DepthStencilStateDescription,
    ) -> Result<HeadlessState, GpuError> {
        Ok(self.new_state(1))
    }

    fn create_rasterizer_state(
        &self,
        _desc: &RasterizerStateDescription,
        _multisampled: bool,
    ) -> Result<HeadlessState, GpuError> {
        Ok(self.new_state(2))
    }

    fn create_input_layout(
        &self,
        _layouts: &[VertexLayoutDescription],
    ) -> Result<HeadlessState, GpuError> {
        Ok(self.new_state(3))
    }
}

impl BackendDevice<Headless> for HeadlessDevice {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn create_graphics_pipeline(
        &self,
        desc: &GraphicsPipelineDescription,
        states: PipelineStates<Self>,
    ) -> Result<HeadlessPipeline, GpuError> {
        self.check_layouts(&desc.resource_layouts)?;
        Ok(HeadlessPipeline(Arc::new(PipelineInner {
            id: self.next_id(),
            states: Some([
                states.blend,
                states.depth_stencil,
                states.rasterizer,
                states.input_layout,
            ]),
            resource_layouts: desc.resource_layouts.clone(),
        })))
    }

    fn create_compute_pipeline(
        &self,
        desc: &ComputePipelineDescription,
    ) -> Result<HeadlessPipeline, GpuError> {
        if desc.stages != ShaderStages::COMPUTE {
            return Err(GpuError::Backend(format!(
                "compute pipeline with stages {:?}",
                desc.stages
            )));
        }
        self.check_layouts(&desc.resource_layouts)?;
        Ok(HeadlessPipeline(Arc::new(PipelineInner {
            id: self.next_id(),
            states: None,
            resource_layouts: desc.resource_layouts.clone(),
        })))
    }
}

// ----- Executor -------------------------------------------------------------

/// Resource sitting in one native slot after a resource-set bind.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundResource {
    pub resource: BindableResource<Headless>,
    /// Dynamic offset applied to the bind, zero for static elements.
    pub dynamic_offset: u32,
}

/// Key of a native slot: resource-set slot, register class, slot number.
pub type SlotKey = (u32, RegisterClass, u32);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadlessStats {
    pub lists: u32,
    pub draws: u32,
    pub dispatches: u32,
    pub clears: u32,
    pub copies: u32,
    pub markers: u32,
}

/// Replays lists against headless objects, applying buffer writes and
/// tracking what a real context would have bound.
pub struct HeadlessExecutor {
    kind: BackendKind,
    pub stats: HeadlessStats,
    pub framebuffer: Option<HeadlessFramebuffer>,
    pub pipeline: Option<HeadlessPipeline>,
    pub viewports: BTreeMap<u32, Viewport>,
    pub vertex_buffers: BTreeMap<u32, (HeadlessBuffer, u32)>,
    pub index_buffer: Option<(HeadlessBuffer, IndexFormat, u32)>,
    pub graphics_bindings: BTreeMap<SlotKey, BoundResource>,
    pub compute_bindings: BTreeMap<SlotKey, BoundResource>,
    pub debug_groups: Vec<String>,
    recording: bool,
}

impl HeadlessExecutor {
    pub fn new(kind: BackendKind) -> Self {
        Self {
            kind,
            stats: HeadlessStats::default(),
            framebuffer: None,
            pipeline: None,
            viewports: BTreeMap::new(),
            vertex_buffers: BTreeMap::new(),
            index_buffer: None,
            graphics_bindings: BTreeMap::new(),
            compute_bindings: BTreeMap::new(),
            debug_groups: Vec::new(),
            recording: false,
        }
    }

    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    fn bind(
        &mut self,
        graphics: bool,
        slot: u32,
        set: &ResourceSet<Headless>,
        dynamic_offsets: &[u32],
    ) {
        let slots = set.layout().slots();
        if slots.backend() != self.kind {
            log::warn!(
                "binding a {} resource set on a {} executor",
                slots.backend().name(),
                self.kind.name()
            );
        }

        let bindings = if graphics {
            &mut self.graphics_bindings
        } else {
            &mut self.compute_bindings
        };
        bindings.retain(|key, _| key.0 != slot);

        let mut offsets = dynamic_offsets.iter().copied();
        for (element, info) in slots.iter() {
            let dynamic_offset = if info.dynamic {
                offsets.next().unwrap_or(0)
            } else {
                0
            };
            let resource = set.resources()[element].clone();
            log::trace!(
                "set {} element {} -> {:?}{}",
                slot,
                element,
                info.class,
                info.slot
            );
            bindings.insert(
                (slot, info.class, info.slot),
                BoundResource {
                    resource,
                    dynamic_offset,
                },
            );
        }
    }

    fn check_recording(&self, what: &str) {
        if !self.recording {
            log::warn!("{} replayed outside begin/end", what);
        }
    }
}

impl CommandExecutor<Headless> for HeadlessExecutor {
    fn begin(&mut self) {
        self.recording = true;
    }

    fn end(&mut self) {
        if !self.debug_groups.is_empty() {
            log::warn!("list ended with {} open debug groups", self.debug_groups.len());
        }
        self.recording = false;
        self.stats.lists += 1;
    }

    fn set_framebuffer(&mut self, framebuffer: &HeadlessFramebuffer) {
        self.framebuffer = Some(framebuffer.clone());
    }

    fn clear_color_target(&mut self, _index: u32, _color: RgbaFloat) {
        self.check_recording("clear");
        self.stats.clears += 1;
    }

    fn clear_depth_stencil(&mut self, _depth: f32, _stencil: u8) {
        self.check_recording("clear");
        self.stats.clears += 1;
    }

    fn set_viewport(&mut self, index: u32, viewport: &Viewport) {
        self.viewports.insert(index, *viewport);
    }

    fn set_scissor_rect(&mut self, _index: u32, _x: u32, _y: u32, _width: u32, _height: u32) {}

    fn set_pipeline(&mut self, pipeline: &HeadlessPipeline) {
        self.pipeline = Some(pipeline.clone());
    }

    fn set_vertex_buffer(&mut self, index: u32, buffer: &HeadlessBuffer, offset: u32) {
        self.vertex_buffers.insert(index, (buffer.clone(), offset));
    }

    fn set_index_buffer(&mut self, buffer: &HeadlessBuffer, format: IndexFormat, offset: u32) {
        self.index_buffer = Some((buffer.clone(), format, offset));
    }

    fn set_graphics_resource_set(
        &mut self,
        slot: u32,
        set: &ResourceSet<Headless>,
        dynamic_offsets: &[u32],
    ) {
        self.bind(true, slot, set, dynamic_offsets);
    }

    fn set_compute_resource_set(
        &mut self,
        slot: u32,
        set: &ResourceSet<Headless>,
        dynamic_offsets: &[u32],
    ) {
        self.bind(false, slot, set, dynamic_offsets);
    }

    fn draw(
        &mut self,
        _vertex_count: u32,
        _instance_count: u32,
        _vertex_start: u32,
        _instance_start: u32,
    ) {
        self.check_recording("draw");
        self.stats.draws += 1;
    }

    fn draw_indexed(
        &mut self,
        _index_count: u32,
        _instance_count: u32,
        _index_start: u32,
        _vertex_offset: i32,
        _instance_start: u32,
    ) {
        self.check_recording("draw");
        if self.index_buffer.is_none() {
            log::warn!("indexed draw without an index buffer");
        }
        self.stats.draws += 1;
    }

    fn draw_indirect(
        &mut self,
        _buffer: &HeadlessBuffer,
        _offset: u32,
        draw_count: u32,
        _stride: u32,
    ) {
        self.check_recording("draw");
        self.stats.draws += draw_count;
    }

    fn draw_indexed_indirect(
        &mut self,
        _buffer: &HeadlessBuffer,
        _offset: u32,
        draw_count: u32,
        _stride: u32,
    ) {
        self.check_recording("draw");
        self.stats.draws += draw_count;
    }

    fn dispatch(&mut self, _group_count_x: u32, _group_count_y: u32, _group_count_z: u32) {
        self.check_recording("dispatch");
        self.stats.dispatches += 1;
    }

    fn dispatch_indirect(&mut self, _buffer: &HeadlessBuffer, _offset: u32) {
        self.check_recording("dispatch");
        self.stats.dispatches += 1;
    }

    fn update_buffer(&mut self, buffer: &HeadlessBuffer, offset: u32, data: &[u8]) {
        if let Err(e) = buffer.write(offset, data) {
            log::error!("update_buffer: {}", e);
        }
    }

    fn copy_buffer(
        &mut self,
        source: &HeadlessBuffer,
        source_offset: u32,
        destination: &HeadlessBuffer,
        destination_offset: u32,
        size: u32,
    ) {
        let copied = source
            .read_range(source_offset, size)
            .and_then(|bytes| destination.write(destination_offset, &bytes));
        match copied {
            Ok(()) => self.stats.copies += 1,
            Err(e) => log::error!("copy_buffer: {}", e),
        }
    }

    fn copy_texture(
        &mut self,
        source: &HeadlessTexture,
        destination: &HeadlessTexture,
        region: &TextureCopyRegion,
    ) {
        if region.src_mip_level >= source.mip_levels()
            || region.dst_mip_level >= destination.mip_levels()
        {
            log::error!("copy_texture: mip level out of range");
            return;
        }
        self.stats.copies += 1;
    }

    fn resolve_texture(&mut self, _source: &HeadlessTexture, _destination: &HeadlessTexture) {
        self.stats.copies += 1;
    }

    fn generate_mipmaps(&mut self, texture: &HeadlessTexture) {
        if !texture.usage().contains(TextureUsage::GENERATE_MIPMAPS) {
            log::warn!("generate_mipmaps on {:?} without GENERATE_MIPMAPS usage", texture);
        }
    }

    fn push_debug_group(&mut self, name: &str) {
        self.debug_groups.push(name.to_string());
    }

    fn pop_debug_group(&mut self) {
        if self.debug_groups.pop().is_none() {
            log::warn!("pop_debug_group without a matching push");
        }
    }

    fn insert_debug_marker(&mut self, name: &str) {
        log::trace!("marker: {}", name);
        self.stats.markers += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_identity() {
        let device = HeadlessDevice::new(BackendKind::ImmediateContext);
        let a = device.create_buffer(8, BufferUsage::VERTEX);
        let b = device.create_buffer(8, BufferUsage::VERTEX);
        assert_eq!(a.clone(), a);
        assert_ne!(a, b);
        assert_eq!(a.size_in_bytes(), 8);
    }

    #[test]
    fn copy_buffer_moves_bytes() {
        let device = HeadlessDevice::new(BackendKind::ExplicitMultiQueue);
        let src = device.create_buffer(8, BufferUsage::STAGING);
        let dst = device.create_buffer(8, BufferUsage::VERTEX);
        let mut exec = HeadlessExecutor::new(device.kind());
        exec.update_buffer(&src, 0, &[1, 2, 3, 4, 5, 6, 7, 8]);
        exec.copy_buffer(&src, 2, &dst, 4, 4);
        assert_eq!(dst.read(), vec![0, 0, 0, 0, 3, 4, 5, 6]);

        // Overruns are dropped, not partially applied.
        exec.copy_buffer(&src, 6, &dst, 0, 4);
        assert_eq!(dst.read(), vec![0, 0, 0, 0, 3, 4, 5, 6]);
        assert_eq!(exec.stats.copies, 1);
    }

    #[test]
    fn compute_pipeline_requires_compute_stage() {
        let device = HeadlessDevice::new(BackendKind::CommandBuffer);
        let desc = ComputePipelineDescription {
            stages: ShaderStages::VERTEX,
            ..Default::default()
        };
        assert!(device.create_compute_pipeline(&desc).is_err());
        let pipeline = device
            .create_compute_pipeline(&ComputePipelineDescription::default())
            .unwrap();
        assert!(pipeline.is_compute());
    }
}
