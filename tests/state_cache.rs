mod common;

use std::sync::Arc;

use encore::{
    BackendKind, BlendStateDescription, FaceCullMode, GraphicsPipelineDescription,
    VertexElementFormat, VertexElementSemantic, VertexLayoutDescription,
};

fn textured_mesh() -> GraphicsPipelineDescription {
    GraphicsPipelineDescription {
        vertex_layouts: vec![VertexLayoutDescription::packed(&[
            ("Position", VertexElementSemantic::Position, VertexElementFormat::Float3),
            ("Uv", VertexElementSemantic::TextureCoordinate, VertexElementFormat::Float2),
        ])],
        ..Default::default()
    }
}

#[test]
fn equal_descriptions_share_native_state() {
    let gpu = common::device(BackendKind::ImmediateContext);

    let first = gpu.create_graphics_pipeline(&textured_mesh()).unwrap();
    let second = gpu.create_graphics_pipeline(&textured_mesh()).unwrap();
    let mut culled = textured_mesh();
    culled.rasterizer_state.cull_mode = FaceCullMode::None;
    let third = gpu.create_graphics_pipeline(&culled).unwrap();

    assert_ne!(first, second);
    let [a, b, c] = [&first, &second, &third].map(|p| p.states().unwrap());
    assert_eq!(a, b);
    assert_eq!(a[0], c[0]);
    assert_eq!(a[1], c[1]);
    assert_ne!(a[2], c[2]);
    assert_eq!(a[3], c[3]);

    assert_eq!(gpu.state_cache().counts(), [1, 1, 2, 1]);
    assert_eq!(gpu.native().states_created(), [1, 1, 2, 1]);
}

#[test]
fn multisampling_is_part_of_the_rasterizer_key() {
    let gpu = common::device(BackendKind::CommandBuffer);
    let mut desc = textured_mesh();
    gpu.create_graphics_pipeline(&desc).unwrap();
    desc.multisampled = true;
    gpu.create_graphics_pipeline(&desc).unwrap();
    desc.blend_state = BlendStateDescription::single_alpha_blend();
    gpu.create_graphics_pipeline(&desc).unwrap();

    assert_eq!(gpu.state_cache().counts(), [2, 1, 2, 1]);
}

#[test]
fn concurrent_creation_builds_each_state_once() {
    let gpu = Arc::new(common::device(BackendKind::ExplicitMultiQueue));
    let workers: Vec<_> = (0..4)
        .map(|_| {
            let gpu = Arc::clone(&gpu);
            std::thread::spawn(move || {
                for _ in 0..16 {
                    gpu.create_graphics_pipeline(&textured_mesh()).unwrap();
                }
            })
        })
        .collect();
    for w in workers {
        w.join().unwrap();
    }
    assert_eq!(gpu.native().states_created(), [1, 1, 1, 1]);
}
