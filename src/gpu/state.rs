//! Fixed-function state descriptions. Every type here compares by value so a
//! description built twice from scratch keys the same cached native object.

#[cfg(feature = "encore-serde")]
use serde::{Deserialize, Serialize};

use super::structs::{RgbaFloat, ShaderStages};
use crate::gpu::execution::layout::ResourceLayout;

//===----------------------------------------------------------------------===//
// Blend
//===----------------------------------------------------------------------===//

#[cfg_attr(feature = "encore-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SourceAlpha,
    InverseSourceAlpha,
    DestinationAlpha,
    InverseDestinationAlpha,
    SourceColor,
    InverseSourceColor,
    DestinationColor,
    InverseDestinationColor,
    BlendFactor,
    InverseBlendFactor,
}

#[cfg_attr(feature = "encore-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFunction {
    Add,
    Subtract,
    ReverseSubtract,
    Minimum,
    Maximum,
}

#[cfg_attr(feature = "encore-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendAttachmentDescription {
    pub blend_enabled: bool,
    pub source_color_factor: BlendFactor,
    pub destination_color_factor: BlendFactor,
    pub color_function: BlendFunction,
    pub source_alpha_factor: BlendFactor,
    pub destination_alpha_factor: BlendFactor,
    pub alpha_function: BlendFunction,
}

impl BlendAttachmentDescription {
    pub const OVERRIDE_BLEND: Self = Self {
        blend_enabled: true,
        source_color_factor: BlendFactor::One,
        destination_color_factor: BlendFactor::Zero,
        color_function: BlendFunction::Add,
        source_alpha_factor: BlendFactor::One,
        destination_alpha_factor: BlendFactor::Zero,
        alpha_function: BlendFunction::Add,
    };

    pub const ALPHA_BLEND: Self = Self {
        blend_enabled: true,
        source_color_factor: BlendFactor::SourceAlpha,
        destination_color_factor: BlendFactor::InverseSourceAlpha,
        color_function: BlendFunction::Add,
        source_alpha_factor: BlendFactor::SourceAlpha,
        destination_alpha_factor: BlendFactor::InverseSourceAlpha,
        alpha_function: BlendFunction::Add,
    };

    pub const DISABLED: Self = Self {
        blend_enabled: false,
        ..Self::OVERRIDE_BLEND
    };
}

#[cfg_attr(feature = "encore-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlendStateDescription {
    pub blend_factor: RgbaFloat,
    pub attachments: Vec<BlendAttachmentDescription>,
    pub alpha_to_coverage_enabled: bool,
}

impl BlendStateDescription {
    pub fn single(attachment: BlendAttachmentDescription) -> Self {
        Self {
            blend_factor: RgbaFloat::BLACK,
            attachments: vec![attachment],
            alpha_to_coverage_enabled: false,
        }
    }

    pub fn single_override() -> Self {
        Self::single(BlendAttachmentDescription::OVERRIDE_BLEND)
    }

    pub fn single_alpha_blend() -> Self {
        Self::single(BlendAttachmentDescription::ALPHA_BLEND)
    }
}

//===----------------------------------------------------------------------===//
// Depth / stencil
//===----------------------------------------------------------------------===//

#[cfg_attr(feature = "encore-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonKind {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

#[cfg_attr(feature = "encore-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StencilOperation {
    Keep,
    Zero,
    Replace,
    IncrementAndClamp,
    DecrementAndClamp,
    Invert,
    IncrementAndWrap,
    DecrementAndWrap,
}

#[cfg_attr(feature = "encore-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StencilBehaviorDescription {
    pub fail: StencilOperation,
    pub pass: StencilOperation,
    pub depth_fail: StencilOperation,
    pub comparison: ComparisonKind,
}

impl Default for StencilBehaviorDescription {
    fn default() -> Self {
        Self {
            fail: StencilOperation::Keep,
            pass: StencilOperation::Keep,
            depth_fail: StencilOperation::Keep,
            comparison: ComparisonKind::Always,
        }
    }
}

#[cfg_attr(feature = "encore-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthStencilStateDescription {
    pub depth_test_enabled: bool,
    pub depth_write_enabled: bool,
    pub depth_comparison: ComparisonKind,
    pub stencil_test_enabled: bool,
    pub stencil_front: StencilBehaviorDescription,
    pub stencil_back: StencilBehaviorDescription,
    pub stencil_read_mask: u8,
    pub stencil_write_mask: u8,
    pub stencil_reference: u32,
}

impl DepthStencilStateDescription {
    pub fn depth_only(comparison: ComparisonKind) -> Self {
        Self {
            depth_test_enabled: true,
            depth_write_enabled: true,
            depth_comparison: comparison,
            ..Self::disabled()
        }
    }

    pub fn disabled() -> Self {
        Self {
            depth_test_enabled: false,
            depth_write_enabled: false,
            depth_comparison: ComparisonKind::Always,
            stencil_test_enabled: false,
            stencil_front: StencilBehaviorDescription::default(),
            stencil_back: StencilBehaviorDescription::default(),
            stencil_read_mask: 0xff,
            stencil_write_mask: 0xff,
            stencil_reference: 0,
        }
    }
}

impl Default for DepthStencilStateDescription {
    fn default() -> Self {
        Self::depth_only(ComparisonKind::LessEqual)
    }
}

//===----------------------------------------------------------------------===//
// Rasterizer
//===----------------------------------------------------------------------===//

#[cfg_attr(feature = "encore-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaceCullMode {
    Back,
    Front,
    None,
}

#[cfg_attr(feature = "encore-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolygonFillMode {
    Solid,
    Wireframe,
}

#[cfg_attr(feature = "encore-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrontFace {
    Clockwise,
    CounterClockwise,
}

#[cfg_attr(feature = "encore-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RasterizerStateDescription {
    pub cull_mode: FaceCullMode,
    pub fill_mode: PolygonFillMode,
    pub front_face: FrontFace,
    pub depth_clip_enabled: bool,
    pub scissor_test_enabled: bool,
}

impl Default for RasterizerStateDescription {
    fn default() -> Self {
        Self {
            cull_mode: FaceCullMode::Back,
            fill_mode: PolygonFillMode::Solid,
            front_face: FrontFace::Clockwise,
            depth_clip_enabled: true,
            scissor_test_enabled: false,
        }
    }
}

//===----------------------------------------------------------------------===//
// Vertex input
//===----------------------------------------------------------------------===//

#[cfg_attr(feature = "encore-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexElementSemantic {
    Position,
    Normal,
    TextureCoordinate,
    Color,
}

#[cfg_attr(feature = "encore-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexElementFormat {
    Float1,
    Float2,
    Float3,
    Float4,
    Byte4Norm,
    UInt1,
    UInt2,
    UInt4,
    Half4,
}

impl VertexElementFormat {
    pub fn size_in_bytes(self) -> u32 {
        match self {
            VertexElementFormat::Float1 | VertexElementFormat::UInt1 => 4,
            VertexElementFormat::Byte4Norm => 4,
            VertexElementFormat::Float2 | VertexElementFormat::UInt2 => 8,
            VertexElementFormat::Half4 => 8,
            VertexElementFormat::Float3 => 12,
            VertexElementFormat::Float4 | VertexElementFormat::UInt4 => 16,
        }
    }
}

#[cfg_attr(feature = "encore-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexElementDescription {
    pub name: String,
    pub semantic: VertexElementSemantic,
    pub format: VertexElementFormat,
    pub offset: u32,
}

#[cfg_attr(feature = "encore-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexLayoutDescription {
    pub stride: u32,
    pub elements: Vec<VertexElementDescription>,
    pub instance_step_rate: u32,
}

impl VertexLayoutDescription {
    /// Packs `elements` tightly in declaration order.
    pub fn packed(elements: &[(&str, VertexElementSemantic, VertexElementFormat)]) -> Self {
        let mut offset = 0;
        let elements = elements
            .iter()
            .map(|(name, semantic, format)| {
                let e = VertexElementDescription {
                    name: name.to_string(),
                    semantic: *semantic,
                    format: *format,
                    offset,
                };
                offset += format.size_in_bytes();
                e
            })
            .collect();

        Self {
            stride: offset,
            elements,
            instance_step_rate: 0,
        }
    }
}

//===----------------------------------------------------------------------===//
// Pipelines
//===----------------------------------------------------------------------===//

#[cfg_attr(feature = "encore-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveTopology {
    TriangleList,
    TriangleStrip,
    LineList,
    LineStrip,
    PointList,
}

#[derive(Debug, Clone)]
pub struct GraphicsPipelineDescription {
    pub blend_state: BlendStateDescription,
    pub depth_stencil_state: DepthStencilStateDescription,
    pub rasterizer_state: RasterizerStateDescription,
    pub primitive_topology: PrimitiveTopology,
    pub vertex_layouts: Vec<VertexLayoutDescription>,
    pub resource_layouts: Vec<ResourceLayout>,
    pub multisampled: bool,
}

impl Default for GraphicsPipelineDescription {
    fn default() -> Self {
        Self {
            blend_state: BlendStateDescription::single_override(),
            depth_stencil_state: DepthStencilStateDescription::default(),
            rasterizer_state: RasterizerStateDescription::default(),
            primitive_topology: PrimitiveTopology::TriangleList,
            vertex_layouts: Vec::new(),
            resource_layouts: Vec::new(),
            multisampled: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ComputePipelineDescription {
    pub stages: ShaderStages,
    pub resource_layouts: Vec<ResourceLayout>,
    pub thread_group_size: [u32; 3],
}

impl Default for ComputePipelineDescription {
    fn default() -> Self {
        Self {
            stages: ShaderStages::COMPUTE,
            resource_layouts: Vec::new(),
            thread_group_size: [1, 1, 1],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_vertex_layout_offsets() {
        let layout = VertexLayoutDescription::packed(&[
            ("Position", VertexElementSemantic::Position, VertexElementFormat::Float3),
            ("Color", VertexElementSemantic::Color, VertexElementFormat::Byte4Norm),
            ("Uv", VertexElementSemantic::TextureCoordinate, VertexElementFormat::Float2),
        ]);
        let offsets: Vec<u32> = layout.elements.iter().map(|e| e.offset).collect();
        assert_eq!(offsets, vec![0, 12, 16]);
        assert_eq!(layout.stride, 24);
    }

    #[test]
    fn disabled_blend_differs_from_override() {
        assert_ne!(
            BlendStateDescription::single(BlendAttachmentDescription::DISABLED),
            BlendStateDescription::single_override()
        );
    }
}
