use std::fmt;

pub mod cmd;
pub mod device;
pub mod driver;
pub mod error;
pub mod execution;
pub mod headless;
pub mod state;
pub mod structs;

pub use cmd::{CommandList, Executable, Initial, OffsetAlignment, Recording};
pub use device::{Device, DeviceInfo};
pub use error::{GpuError, ReplayFault, ValidationError};
pub use execution::{
    BindableResource, ExecutionThread, PipelineStateCache, PipelineStates, ResourceLayout,
    ResourceLayoutDescription, ResourceLayoutElementDescription, ResourceSet,
    ResourceSetDescription, ResourceSlots, StateFactory,
};
pub use state::*;
pub use structs::*;

/// Object identity a backend hands out. Clones refer to the same native
/// object and compare equal.
pub trait Resource: Clone + fmt::Debug + PartialEq + Send + Sync + 'static {}

pub trait BufferResource: Resource {
    fn usage(&self) -> BufferUsage;
    fn size_in_bytes(&self) -> u64;
}

pub trait TextureResource: Resource {
    fn usage(&self) -> TextureUsage;
    fn mip_levels(&self) -> u32;
}

/// A pipeline as seen by the command list when validating binds.
pub trait PipelineResource: Resource {
    fn is_compute(&self) -> bool;

    /// One layout per resource-set slot, in slot order.
    fn resource_layouts(&self) -> &[ResourceLayout];
}

/// Defines the native object types a rendering backend works with.
///
/// The implementing type is a marker; object creation goes through a
/// [`BackendDevice`].
///
/// # Examples
/// ```ignore
/// use encore::gpu::{Backend, CommandList, Recording};
/// fn bind<B: Backend>(list: &mut CommandList<B, Recording>, pipeline: &B::Pipeline) {
///     list.set_pipeline(pipeline);
/// }
/// ```
pub trait Backend: fmt::Debug + Clone + PartialEq + Send + Sync + 'static {
    type Buffer: BufferResource;
    type Texture: TextureResource;
    type Sampler: Resource;
    type Framebuffer: Resource;
    type Pipeline: PipelineResource;
}

/// Native object construction for one backend.
pub trait BackendDevice<B: Backend>: StateFactory + Sized {
    fn kind(&self) -> BackendKind;

    /// `states` come from the device's state cache.
    fn create_graphics_pipeline(
        &self,
        desc: &GraphicsPipelineDescription,
        states: PipelineStates<Self>,
    ) -> Result<B::Pipeline, GpuError>;

    fn create_compute_pipeline(
        &self,
        desc: &ComputePipelineDescription,
    ) -> Result<B::Pipeline, GpuError>;
}
