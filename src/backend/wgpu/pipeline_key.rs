//! Hashable pipeline cache keys.
//!
//! `wgpu` descriptor types (`BlendState`, `DepthStencilState`, …) do not
//! implement `Hash` / `Eq`. The mirror types below keep the fields that decide
//! pipeline identity. The stencil reference is dynamic render-pass state and
//! never part of a key, so the outline stages share pipelines whenever their
//! masks and ops agree.

use super::convert;
use super::programs::ProgramKind;
use crate::renderer::state::PipelineState;

// ─── Hashable Mirror Types ────────────────────────────────────────────────────

/// Hashable mirror of `wgpu::BlendComponent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendComponentKey {
    pub src_factor: wgpu::BlendFactor,
    pub dst_factor: wgpu::BlendFactor,
    pub operation: wgpu::BlendOperation,
}

impl From<wgpu::BlendComponent> for BlendComponentKey {
    fn from(b: wgpu::BlendComponent) -> Self {
        Self {
            src_factor: b.src_factor,
            dst_factor: b.dst_factor,
            operation: b.operation,
        }
    }
}

/// Hashable mirror of `wgpu::BlendState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendStateKey {
    pub color: BlendComponentKey,
    pub alpha: BlendComponentKey,
}

impl From<wgpu::BlendState> for BlendStateKey {
    fn from(b: wgpu::BlendState) -> Self {
        Self {
            color: b.color.into(),
            alpha: b.alpha.into(),
        }
    }
}

impl From<BlendStateKey> for wgpu::BlendState {
    fn from(k: BlendStateKey) -> Self {
        let component = |c: BlendComponentKey| wgpu::BlendComponent {
            src_factor: c.src_factor,
            dst_factor: c.dst_factor,
            operation: c.operation,
        };
        Self {
            color: component(k.color),
            alpha: component(k.alpha),
        }
    }
}

/// Hashable mirror of `wgpu::StencilFaceState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StencilFaceKey {
    pub compare: wgpu::CompareFunction,
    pub fail_op: wgpu::StencilOperation,
    pub depth_fail_op: wgpu::StencilOperation,
    pub pass_op: wgpu::StencilOperation,
}

impl From<wgpu::StencilFaceState> for StencilFaceKey {
    fn from(s: wgpu::StencilFaceState) -> Self {
        Self {
            compare: s.compare,
            fail_op: s.fail_op,
            depth_fail_op: s.depth_fail_op,
            pass_op: s.pass_op,
        }
    }
}

impl From<StencilFaceKey> for wgpu::StencilFaceState {
    fn from(k: StencilFaceKey) -> Self {
        Self {
            compare: k.compare,
            fail_op: k.fail_op,
            depth_fail_op: k.depth_fail_op,
            pass_op: k.pass_op,
        }
    }
}

/// Hashable mirror of `wgpu::DepthStencilState` (bias is always zero here).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthStencilKey {
    pub format: wgpu::TextureFormat,
    pub depth_write_enabled: bool,
    pub depth_compare: wgpu::CompareFunction,
    pub front: StencilFaceKey,
    pub back: StencilFaceKey,
    pub read_mask: u32,
    pub write_mask: u32,
}

impl From<wgpu::DepthStencilState> for DepthStencilKey {
    fn from(d: wgpu::DepthStencilState) -> Self {
        Self {
            format: d.format,
            depth_write_enabled: d.depth_write_enabled.unwrap_or(false),
            depth_compare: d.depth_compare.unwrap_or(wgpu::CompareFunction::Always),
            front: d.stencil.front.into(),
            back: d.stencil.back.into(),
            read_mask: d.stencil.read_mask,
            write_mask: d.stencil.write_mask,
        }
    }
}

impl From<DepthStencilKey> for wgpu::DepthStencilState {
    fn from(k: DepthStencilKey) -> Self {
        Self {
            format: k.format,
            depth_write_enabled: Some(k.depth_write_enabled),
            depth_compare: Some(k.depth_compare),
            stencil: wgpu::StencilState {
                front: k.front.into(),
                back: k.back.into(),
                read_mask: k.read_mask,
                write_mask: k.write_mask,
            },
            bias: wgpu::DepthBiasState::default(),
        }
    }
}

// ─── Pipeline Key ─────────────────────────────────────────────────────────────

/// Everything that distinguishes one cached `wgpu::RenderPipeline` from
/// another.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RenderPipelineKey {
    pub program: ProgramKind,
    pub color_format: wgpu::TextureFormat,
    pub blend: Option<BlendStateKey>,
    pub depth_stencil: DepthStencilKey,
    pub cull_mode: Option<wgpu::Face>,
    pub front_face: wgpu::FrontFace,
}

impl RenderPipelineKey {
    #[must_use]
    pub fn new(
        program: ProgramKind,
        color_format: wgpu::TextureFormat,
        state: &PipelineState,
    ) -> Self {
        Self {
            program,
            color_format,
            blend: convert::blend(&state.blend).map(Into::into),
            depth_stencil: convert::depth_stencil(state).into(),
            cull_mode: convert::cull_mode(&state.cull),
            front_face: convert::front_face(&state.cull),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::state::PassId;

    fn key(pass: PassId) -> RenderPipelineKey {
        RenderPipelineKey::new(
            ProgramKind::FlatColor,
            convert::OFFSCREEN_COLOR_FORMAT,
            &pass.state(),
        )
    }

    #[test]
    fn stencil_reference_is_not_part_of_the_key() {
        let mut a = PassId::OutlineWriteStencil.state();
        let mut b = a;
        a.stencil.reference = 1;
        b.stencil.reference = 7;
        let fmt = convert::OFFSCREEN_COLOR_FORMAT;
        assert_eq!(
            RenderPipelineKey::new(ProgramKind::Lit, fmt, &a),
            RenderPipelineKey::new(ProgramKind::Lit, fmt, &b)
        );
    }

    #[test]
    fn distinct_pass_states_get_distinct_keys() {
        assert_ne!(key(PassId::Opaque), key(PassId::OutlineSilhouette));
        assert_ne!(key(PassId::Opaque), key(PassId::Transparent));
        assert_eq!(key(PassId::Opaque), key(PassId::Reflection));
    }

    #[test]
    fn unset_depth_fields_mirror_to_disabled() {
        let state = wgpu::DepthStencilState {
            format: convert::DEPTH_STENCIL_FORMAT,
            depth_write_enabled: None,
            depth_compare: None,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        };
        let key = DepthStencilKey::from(state);
        assert!(!key.depth_write_enabled);
        assert_eq!(key.depth_compare, wgpu::CompareFunction::Always);
    }

    #[test]
    fn rebuilt_state_sets_depth_fields() {
        let key = key(PassId::Opaque).depth_stencil;
        let rebuilt = wgpu::DepthStencilState::from(key);
        assert_eq!(rebuilt.depth_write_enabled, Some(true));
        assert_eq!(rebuilt.depth_compare, Some(wgpu::CompareFunction::Less));
        assert_eq!(DepthStencilKey::from(rebuilt), key);
    }
}
