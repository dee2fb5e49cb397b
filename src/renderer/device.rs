//! Render Device Abstraction
//!
//! The frame pipeline talks to the GPU exclusively through [`RenderDevice`].
//! The device owns every GPU-resident resource and hands out handles; the core
//! only sequences state, uniforms, texture bindings and draws.
//!
//! Two implementations ship with the crate:
//! - [`crate::backend::software::SoftwareDevice`]: CPU rasterizer, used for
//!   headless rendering and as the test double.
//! - `crate::backend::wgpu::WgpuDevice` (feature `wgpu`).

use bitflags::bitflags;
use glam::Vec4;

use super::state::{BlendState, CullState, DepthState, StencilState};
use super::uniforms::UniformValue;
use crate::assets::{MeshHandle, ProgramHandle, TargetHandle, TextureHandle};

bitflags! {
    /// Buffers cleared by [`RenderDevice::clear`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClearFlags: u8 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
        const STENCIL = 1 << 2;
        const ALL = Self::COLOR.bits() | Self::DEPTH.bits() | Self::STENCIL.bits();
    }
}

/// Where draws land.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderTarget {
    /// The window-visible framebuffer.
    Default,
    Offscreen(TargetHandle),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetStatus {
    Complete,
    Incomplete(String),
}

impl TargetStatus {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

/// The attachments of a freshly created offscreen target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffscreenAttachments {
    pub target: TargetHandle,
    /// The color attachment, sampleable once the target is unbound.
    pub color: TextureHandle,
    pub width: u32,
    pub height: u32,
}

/// Fixed-function state setters, driven by
/// [`GpuStateController`](super::state::GpuStateController).
pub trait StateSink {
    fn set_depth_state(&mut self, state: &DepthState);
    fn set_stencil_state(&mut self, state: &StencilState);
    fn set_blend_state(&mut self, state: &BlendState);
    fn set_cull_state(&mut self, state: &CullState);
}

/// Program selection and named uniform upload.
pub trait UniformBinder {
    fn use_program(&mut self, program: ProgramHandle);
    /// Sets a uniform on the program currently in use.
    fn set_uniform(&mut self, name: &str, value: UniformValue);
}

pub trait RenderDevice: StateSink + UniformBinder {
    // ========================================================================
    // Targets
    // ========================================================================

    /// Allocates a color + depth/stencil target. Allocation problems are
    /// reported through [`RenderDevice::target_status`], not here.
    fn create_offscreen_target(&mut self, width: u32, height: u32) -> OffscreenAttachments;

    fn target_status(&self, target: TargetHandle) -> TargetStatus;

    fn destroy_offscreen_target(&mut self, target: TargetHandle);

    /// Resizes the default framebuffer to the window's framebuffer size.
    fn configure_surface(&mut self, width: u32, height: u32);

    fn bind_target(&mut self, target: RenderTarget);

    /// Clears the bound target. Depth clears honour the depth write flag and
    /// stencil clears honour the stencil write mask.
    fn clear(&mut self, flags: ClearFlags, color: Vec4);

    // ========================================================================
    // Drawing
    // ========================================================================

    fn bind_texture(&mut self, unit: u32, texture: TextureHandle);

    /// Draws a mesh with the current program, uniforms, textures and state.
    fn draw_mesh(&mut self, mesh: MeshHandle);

    /// Shows the default framebuffer.
    fn present(&mut self);
}
