mod common;

use encore::gpu::execution::RegisterClass;
use encore::gpu::headless::{Headless, HeadlessExecutor};
use encore::{
    BackendKind, BindableResource, BufferUsage, DeviceInfo, GpuError, ResourceKind,
    ResourceLayoutDescription, ResourceLayoutElementDescription, ShaderStages, TextureUsage,
    ValidationError,
};

use common::HeadlessGpu;
use RegisterClass::*;

fn mixed_set(gpu: &HeadlessGpu, desc: &ResourceLayoutDescription) -> encore::ResourceSet<Headless> {
    let native = gpu.native();
    let resources = desc
        .elements
        .iter()
        .map(|e| match e.kind {
            ResourceKind::UniformBuffer => {
                BindableResource::Buffer(native.create_buffer(256, BufferUsage::UNIFORM))
            }
            ResourceKind::StructuredBufferReadOnly => BindableResource::Buffer(
                native.create_buffer(256, BufferUsage::STRUCTURED_READ_ONLY),
            ),
            ResourceKind::StructuredBufferReadWrite => BindableResource::Buffer(
                native.create_buffer(256, BufferUsage::STRUCTURED_READ_WRITE),
            ),
            ResourceKind::TextureReadOnly => BindableResource::Texture(
                native.create_texture(4, 4, 1, TextureUsage::SAMPLED),
            ),
            ResourceKind::TextureReadWrite => BindableResource::Texture(
                native.create_texture(4, 4, 1, TextureUsage::STORAGE),
            ),
            ResourceKind::Sampler => BindableResource::Sampler(native.create_sampler()),
        })
        .collect();
    common::resource_set(gpu, desc, resources)
}

/// Binds `desc` at set slot 0 and returns the native slots it landed in.
fn bound_slots(kind: BackendKind, desc: &ResourceLayoutDescription) -> Vec<(RegisterClass, u32)> {
    let gpu = common::device(kind);
    let set = mixed_set(&gpu, desc);

    let mut list = gpu.create_command_list().begin();
    list.set_pipeline(&common::graphics_pipeline(&gpu, &[set.layout().clone()]));
    list.set_graphics_resource_set(0, &set, &[]).unwrap();
    let list = list.end();

    let mut exec = HeadlessExecutor::new(kind);
    list.execute(&mut exec).unwrap();
    exec.graphics_bindings
        .keys()
        .map(|&(_, class, slot)| (class, slot))
        .collect()
}

const UB_TEX_SAMP_UB: [ResourceKind; 4] = [
    ResourceKind::UniformBuffer,
    ResourceKind::TextureReadOnly,
    ResourceKind::Sampler,
    ResourceKind::UniformBuffer,
];

#[test]
fn immediate_context_uses_per_kind_registers() {
    let desc = common::layout_desc(&UB_TEX_SAMP_UB, ShaderStages::VERTEX | ShaderStages::FRAGMENT);
    assert_eq!(
        bound_slots(BackendKind::ImmediateContext, &desc),
        vec![(ConstantBuffer, 0), (ConstantBuffer, 1), (ShaderResource, 0), (Sampler, 0)]
    );
}

#[test]
fn slot_table_is_stable_across_layouts() {
    let gpu = common::device(BackendKind::CommandBuffer);
    let desc = common::layout_desc(&UB_TEX_SAMP_UB, ShaderStages::FRAGMENT);
    let a = gpu.create_resource_layout(&desc).unwrap();
    let b = gpu.create_resource_layout(&desc).unwrap();
    assert_ne!(a, b);
    assert_eq!(a.slots(), b.slots());

    let slots: Vec<u32> = a.slots().iter().map(|(_, info)| info.slot).collect();
    assert_eq!(slots, vec![0, 0, 0, 1]);
    assert_eq!(a.slots().count(Buffer), 2);
}

#[test]
fn global_state_splits_blocks_and_units() {
    let desc = common::layout_desc(
        &[
            ResourceKind::UniformBuffer,
            ResourceKind::StructuredBufferReadOnly,
            ResourceKind::TextureReadOnly,
            ResourceKind::TextureReadWrite,
            ResourceKind::Sampler,
            ResourceKind::StructuredBufferReadWrite,
        ],
        ShaderStages::COMPUTE,
    );
    let gpu = common::device(BackendKind::GlobalState);
    let layout = gpu.create_resource_layout(&desc).unwrap();
    let slots: Vec<_> = layout
        .slots()
        .iter()
        .map(|(_, info)| (info.class, info.slot))
        .collect();
    assert_eq!(
        slots,
        vec![
            (UniformBlock, 0),
            (StorageBlock, 0),
            (TextureUnit, 0),
            (ImageUnit, 0),
            (Sampler, 0),
            (StorageBlock, 1),
        ]
    );
}

#[test]
fn unused_elements_take_no_slot() {
    let mut desc = common::layout_desc(
        &[
            ResourceKind::UniformBuffer,
            ResourceKind::UniformBuffer,
            ResourceKind::TextureReadOnly,
            ResourceKind::UniformBuffer,
        ],
        ShaderStages::FRAGMENT,
    );
    desc.elements[1].stages = ShaderStages::empty();

    assert_eq!(
        bound_slots(BackendKind::ImmediateContext, &desc),
        vec![(ConstantBuffer, 0), (ConstantBuffer, 1), (ShaderResource, 0)]
    );
    // A descriptor space keeps declaration positions.
    assert_eq!(
        bound_slots(BackendKind::ExplicitMultiQueue, &desc),
        vec![(Descriptor, 0), (Descriptor, 2), (Descriptor, 3)]
    );
}

#[test]
fn read_write_outside_fragment_or_compute_is_rejected() {
    let gpu = common::device(BackendKind::ImmediateContext);
    let desc = common::layout_desc(
        &[ResourceKind::StructuredBufferReadWrite],
        ShaderStages::VERTEX,
    );
    let err = gpu.create_resource_layout(&desc).unwrap_err();
    assert!(matches!(
        err,
        GpuError::Validation(ValidationError::UnsupportedStages { slot: 0, .. })
    ));

    // Other backends accept the same layout.
    assert!(common::device(BackendKind::ExplicitMultiQueue)
        .create_resource_layout(&desc)
        .is_ok());
}

#[test]
fn dynamic_offsets_reach_their_elements() {
    let gpu = common::device(BackendKind::ImmediateContext);
    let elements: Vec<_> = (0..12)
        .map(|i| {
            ResourceLayoutElementDescription::dynamic(
                &format!("Object{}", i),
                ResourceKind::UniformBuffer,
                ShaderStages::VERTEX,
            )
        })
        .collect();
    let desc = ResourceLayoutDescription::new(&elements);
    let set = mixed_set(&gpu, &desc);
    let offsets: Vec<u32> = (0..12).map(|i| i * 256).collect();

    let mut list = gpu.create_command_list().begin();
    list.set_pipeline(&common::graphics_pipeline(&gpu, &[set.layout().clone()]));
    let err = list.set_graphics_resource_set(0, &set, &offsets[..3]).unwrap_err();
    assert!(matches!(
        err,
        GpuError::Validation(ValidationError::DynamicOffsetCountMismatch {
            expected: 12,
            actual: 3
        })
    ));
    assert_eq!(list.entry_count(), 2);

    // More offsets than fit inline go through a staging block.
    list.set_graphics_resource_set(0, &set, &offsets).unwrap();
    assert_eq!(list.staged_count(), 1);
    let list = list.end();

    let mut exec = HeadlessExecutor::new(BackendKind::ImmediateContext);
    list.execute(&mut exec).unwrap();
    let applied: Vec<u32> = exec
        .graphics_bindings
        .values()
        .map(|bound| bound.dynamic_offset)
        .collect();
    assert_eq!(applied, offsets);

    list.reset();
    assert_eq!(gpu.staging_pool().lock().rented_count(), 0);
}

#[test]
fn compute_and_graphics_bindings_are_separate() {
    let gpu = common::device(BackendKind::CommandBuffer);
    let desc = common::layout_desc(
        &[ResourceKind::StructuredBufferReadWrite, ResourceKind::TextureReadWrite],
        ShaderStages::COMPUTE,
    );
    let set = mixed_set(&gpu, &desc);

    let layouts = [set.layout().clone(), set.layout().clone()];

    let mut list = gpu.create_command_list().begin();
    list.set_pipeline(&common::compute_pipeline(&gpu, &layouts));
    list.set_compute_resource_set(1, &set, &[]).unwrap();
    list.dispatch(8, 8, 1);
    let list = list.end();

    let mut exec = HeadlessExecutor::new(BackendKind::CommandBuffer);
    gpu.submit(&list, &mut exec).unwrap();
    assert!(exec.graphics_bindings.is_empty());
    let keys: Vec<_> = exec.compute_bindings.keys().copied().collect();
    assert_eq!(keys, vec![(1, Buffer, 0), (1, Texture, 0)]);
    assert_eq!(exec.stats.dispatches, 1);
}

#[test]
fn device_alignment_governs_dynamic_offsets() {
    let desc = ResourceLayoutDescription::new(&[ResourceLayoutElementDescription::dynamic(
        "Object",
        ResourceKind::UniformBuffer,
        ShaderStages::VERTEX,
    )]);
    let strict = common::device(BackendKind::CommandBuffer);
    let loose = common::device_with(
        BackendKind::CommandBuffer,
        DeviceInfo {
            uniform_offset_alignment: 64,
            ..Default::default()
        },
    );

    let outcomes: Vec<bool> = [&strict, &loose]
        .iter()
        .map(|gpu| {
            let set = mixed_set(gpu, &desc);
            let mut list = gpu.create_command_list().begin();
            list.set_pipeline(&common::graphics_pipeline(gpu, &[set.layout().clone()]));
            list.set_graphics_resource_set(0, &set, &[64]).is_ok()
        })
        .collect();
    assert_eq!(outcomes, vec![false, true]);
}

#[test]
fn binds_are_checked_against_the_active_pipeline() {
    let gpu = common::device(BackendKind::ExplicitMultiQueue);
    let textured = common::layout_desc(
        &[ResourceKind::TextureReadOnly, ResourceKind::Sampler],
        ShaderStages::FRAGMENT,
    );
    let uniforms = common::layout_desc(
        &[ResourceKind::UniformBuffer, ResourceKind::UniformBuffer],
        ShaderStages::FRAGMENT,
    );
    let textured_set = mixed_set(&gpu, &textured);
    let uniform_set = mixed_set(&gpu, &uniforms);
    let pipeline = common::graphics_pipeline(&gpu, &[textured_set.layout().clone()]);

    let mut list = gpu.create_command_list().begin();
    assert!(matches!(
        list.set_graphics_resource_set(0, &textured_set, &[]),
        Err(GpuError::Validation(ValidationError::NoActivePipeline { .. }))
    ));

    list.set_pipeline(&pipeline);
    assert!(matches!(
        list.set_graphics_resource_set(1, &textured_set, &[]),
        Err(GpuError::Validation(ValidationError::SetSlotOutOfRange { slot: 1, layouts: 1 }))
    ));
    assert!(matches!(
        list.set_graphics_resource_set(0, &uniform_set, &[]),
        Err(GpuError::Validation(ValidationError::IncompatibleSetElement {
            element: 0,
            expected: ResourceKind::TextureReadOnly,
            actual: ResourceKind::UniformBuffer,
            ..
        }))
    ));

    // A separately created layout with the same elements is compatible.
    let twin = mixed_set(&gpu, &textured);
    assert_ne!(twin.layout(), textured_set.layout());
    list.set_graphics_resource_set(0, &twin, &[]).unwrap();
    assert_eq!(list.entry_count(), 3);
}
