#![allow(dead_code)]

use encore::gpu::headless::{Headless, HeadlessDevice, HeadlessPipeline};
use encore::{
    BackendKind, BindableResource, ComputePipelineDescription, Device, DeviceInfo,
    GraphicsPipelineDescription, ResourceKind, ResourceLayout, ResourceLayoutDescription,
    ResourceLayoutElementDescription, ResourceSet, ResourceSetDescription, ShaderStages,
};

pub type HeadlessGpu = Device<Headless, HeadlessDevice>;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn device(kind: BackendKind) -> HeadlessGpu {
    device_with(kind, DeviceInfo::default())
}

pub fn device_with(kind: BackendKind, info: DeviceInfo) -> HeadlessGpu {
    init_logging();
    Device::new(HeadlessDevice::new(kind), info).expect("headless device")
}

/// Layout whose elements are all visible to `stages`, named `r0`, `r1`...
pub fn layout_desc(kinds: &[ResourceKind], stages: ShaderStages) -> ResourceLayoutDescription {
    let elements: Vec<_> = kinds
        .iter()
        .enumerate()
        .map(|(i, k)| ResourceLayoutElementDescription::new(&format!("r{}", i), *k, stages))
        .collect();
    ResourceLayoutDescription::new(&elements)
}

pub fn resource_set(
    gpu: &HeadlessGpu,
    desc: &ResourceLayoutDescription,
    resources: Vec<BindableResource<Headless>>,
) -> ResourceSet<Headless> {
    let layout = gpu.create_resource_layout(desc).expect("layout");
    gpu.create_resource_set(ResourceSetDescription { layout, resources })
        .expect("resource set")
}

/// Graphics pipeline with default state taking `layouts` as its resource
/// set slots.
pub fn graphics_pipeline(gpu: &HeadlessGpu, layouts: &[ResourceLayout]) -> HeadlessPipeline {
    gpu.create_graphics_pipeline(&GraphicsPipelineDescription {
        resource_layouts: layouts.to_vec(),
        ..Default::default()
    })
    .expect("graphics pipeline")
}

pub fn compute_pipeline(gpu: &HeadlessGpu, layouts: &[ResourceLayout]) -> HeadlessPipeline {
    gpu.create_compute_pipeline(&ComputePipelineDescription {
        resource_layouts: layouts.to_vec(),
        ..Default::default()
    })
    .expect("compute pipeline")
}
