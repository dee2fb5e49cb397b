//! Fixed-function state → wgpu descriptor translation.
//!
//! wgpu bakes depth, stencil, blend and culling into the render pipeline, so
//! every [`PipelineState`] maps to descriptor fragments here. The stencil
//! reference is the one exception: it stays dynamic and is set per draw.

use crate::renderer::state::{
    BlendFactor, BlendState, CompareFunction, CullState, Face, FrontFace, PipelineState,
    StencilOperation,
};

pub const DEPTH_STENCIL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24PlusStencil8;
pub const OFFSCREEN_COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

#[must_use]
pub fn compare(f: CompareFunction) -> wgpu::CompareFunction {
    match f {
        CompareFunction::Never => wgpu::CompareFunction::Never,
        CompareFunction::Less => wgpu::CompareFunction::Less,
        CompareFunction::Equal => wgpu::CompareFunction::Equal,
        CompareFunction::LessEqual => wgpu::CompareFunction::LessEqual,
        CompareFunction::Greater => wgpu::CompareFunction::Greater,
        CompareFunction::NotEqual => wgpu::CompareFunction::NotEqual,
        CompareFunction::GreaterEqual => wgpu::CompareFunction::GreaterEqual,
        CompareFunction::Always => wgpu::CompareFunction::Always,
    }
}

#[must_use]
pub fn stencil_op(op: StencilOperation) -> wgpu::StencilOperation {
    match op {
        StencilOperation::Keep => wgpu::StencilOperation::Keep,
        StencilOperation::Zero => wgpu::StencilOperation::Zero,
        StencilOperation::Replace => wgpu::StencilOperation::Replace,
        StencilOperation::IncrementClamp => wgpu::StencilOperation::IncrementClamp,
        StencilOperation::DecrementClamp => wgpu::StencilOperation::DecrementClamp,
        StencilOperation::Invert => wgpu::StencilOperation::Invert,
        StencilOperation::IncrementWrap => wgpu::StencilOperation::IncrementWrap,
        StencilOperation::DecrementWrap => wgpu::StencilOperation::DecrementWrap,
    }
}

fn blend_factor(f: BlendFactor) -> wgpu::BlendFactor {
    match f {
        BlendFactor::Zero => wgpu::BlendFactor::Zero,
        BlendFactor::One => wgpu::BlendFactor::One,
        BlendFactor::SrcAlpha => wgpu::BlendFactor::SrcAlpha,
        BlendFactor::OneMinusSrcAlpha => wgpu::BlendFactor::OneMinusSrcAlpha,
    }
}

/// `None` when blending is disabled.
#[must_use]
pub fn blend(state: &BlendState) -> Option<wgpu::BlendState> {
    state.enabled.then(|| {
        let component = wgpu::BlendComponent {
            src_factor: blend_factor(state.src_factor),
            dst_factor: blend_factor(state.dst_factor),
            operation: wgpu::BlendOperation::Add,
        };
        wgpu::BlendState {
            color: component,
            alpha: component,
        }
    })
}

#[must_use]
pub fn cull_mode(state: &CullState) -> Option<wgpu::Face> {
    state.enabled.then_some(match state.face {
        Face::Front => wgpu::Face::Front,
        Face::Back => wgpu::Face::Back,
    })
}

#[must_use]
pub fn front_face(state: &CullState) -> wgpu::FrontFace {
    match state.front_face {
        FrontFace::Ccw => wgpu::FrontFace::Ccw,
        FrontFace::Cw => wgpu::FrontFace::Cw,
    }
}

/// Depth and stencil for a pipeline.
///
/// A disabled depth test also disables depth writes; a disabled stencil test
/// always passes and never writes.
#[must_use]
pub fn depth_stencil(state: &PipelineState) -> wgpu::DepthStencilState {
    let depth = &state.depth;
    let s = &state.stencil;

    let stencil = if s.test_enabled {
        let face = wgpu::StencilFaceState {
            compare: compare(s.compare),
            fail_op: stencil_op(s.fail_op),
            depth_fail_op: stencil_op(s.depth_fail_op),
            pass_op: stencil_op(s.pass_op),
        };
        wgpu::StencilState {
            front: face,
            back: face,
            read_mask: u32::from(s.read_mask),
            write_mask: u32::from(s.write_mask),
        }
    } else {
        wgpu::StencilState {
            front: wgpu::StencilFaceState::IGNORE,
            back: wgpu::StencilFaceState::IGNORE,
            read_mask: 0xFF,
            write_mask: 0,
        }
    };

    wgpu::DepthStencilState {
        format: DEPTH_STENCIL_FORMAT,
        depth_write_enabled: Some(depth.test_enabled && depth.write_enabled),
        depth_compare: Some(if depth.test_enabled {
            compare(depth.compare)
        } else {
            wgpu::CompareFunction::Always
        }),
        stencil,
        bias: wgpu::DepthBiasState::default(),
    }
}

#[must_use]
pub fn clear_color(color: glam::Vec4) -> wgpu::Color {
    wgpu::Color {
        r: f64::from(color.x),
        g: f64::from(color.y),
        b: f64::from(color.z),
        a: f64::from(color.w),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::state::PassId;

    #[test]
    fn disabled_depth_test_never_writes() {
        let ds = depth_stencil(&PassId::PostProcess.state());
        assert_eq!(ds.depth_write_enabled, Some(false));
        assert_eq!(ds.depth_compare, Some(wgpu::CompareFunction::Always));
    }

    #[test]
    fn depth_fields_are_always_explicit() {
        let ds = depth_stencil(&PassId::Opaque.state());
        assert_eq!(ds.depth_write_enabled, Some(true));
        assert_eq!(ds.depth_compare, Some(wgpu::CompareFunction::Less));

        let ds = depth_stencil(&PassId::Skybox.state());
        assert_eq!(ds.depth_compare, Some(wgpu::CompareFunction::LessEqual));
    }

    #[test]
    fn outline_write_replaces_stencil() {
        let ds = depth_stencil(&PassId::OutlineWriteStencil.state());
        assert_eq!(ds.stencil.front.pass_op, wgpu::StencilOperation::Replace);
        assert_eq!(ds.stencil.write_mask, 0xFF);
        let ds = depth_stencil(&PassId::OutlineSilhouette.state());
        assert_eq!(ds.stencil.front.compare, wgpu::CompareFunction::NotEqual);
        assert_eq!(ds.stencil.write_mask, 0);
    }

    #[test]
    fn transparent_pass_disables_culling() {
        assert_eq!(cull_mode(&PassId::Transparent.state().cull), None);
        assert_eq!(cull_mode(&PassId::Opaque.state().cull), Some(wgpu::Face::Back));
    }
}
