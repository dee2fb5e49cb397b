//! Software Render Device
//!
//! A CPU implementation of [`RenderDevice`]: nearest-sampled textures,
//! offscreen targets with color, depth and 8-bit stencil planes, and the
//! built-in programs in [`program`]. Rendering is deterministic, which makes
//! it the device of choice for headless rendering and tests.
//!
//! ```rust,ignore
//! let mut device = SoftwareDevice::new(320, 240);
//! let resources = device.standard_resources();
//! let cube = device.upload_mesh(primitives::cube(1.0));
//! ```

pub mod framebuffer;
pub mod program;
mod raster;
pub mod texture;

use glam::Vec4;
use rustc_hash::FxHashSet;
use slotmap::SlotMap;

pub use framebuffer::Framebuffer;
pub use program::{FragmentStage, MAX_TEXTURE_UNITS, SoftwareProgram, VertexStage};
pub use texture::{ColorImage, WrapMode};

use self::program::{FragmentShader, TextureLookup, VertexTransform};
use self::texture::SoftTexture;
use crate::assets::{
    ImageData, MeshData, MeshHandle, ProgramHandle, TargetHandle, TextureHandle, primitives,
};
use crate::renderer::device::{
    ClearFlags, OffscreenAttachments, RenderDevice, RenderTarget, StateSink, TargetStatus,
    UniformBinder,
};
use crate::renderer::resources::{BuiltinMeshes, PipelineResources, ProgramSet};
use crate::renderer::state::{BlendState, CullState, DepthState, PipelineState, StencilState};
use crate::renderer::uniforms::UniformValue;

/// Largest offscreen target edge accepted by default.
pub const DEFAULT_MAX_TARGET_SIZE: u32 = 8192;

/// Counters of everything the device was asked to do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceStats {
    pub draw_calls: u64,
    pub triangles: u64,
    pub fragments: u64,
    pub clears: u64,
    pub presents: u64,
    pub target_binds: u64,
    pub program_binds: u64,
    pub texture_binds: u64,
    pub uniform_writes: u64,
    pub depth_state_changes: u64,
    pub stencil_state_changes: u64,
    pub blend_state_changes: u64,
    pub cull_state_changes: u64,
}

impl DeviceStats {
    /// Fixed-function state setter calls of every category.
    #[must_use]
    pub fn state_changes(&self) -> u64 {
        self.depth_state_changes
            + self.stencil_state_changes
            + self.blend_state_changes
            + self.cull_state_changes
    }
}

pub(crate) struct SoftTarget {
    pub(crate) framebuffer: Framebuffer,
    color: TextureHandle,
    status: TargetStatus,
}

pub struct SoftwareDevice {
    meshes: SlotMap<MeshHandle, MeshData>,
    textures: SlotMap<TextureHandle, SoftTexture>,
    programs: SlotMap<ProgramHandle, SoftwareProgram>,
    targets: SlotMap<TargetHandle, SoftTarget>,

    surface: Framebuffer,
    presented: Option<ColorImage>,

    bound_target: RenderTarget,
    bound_program: Option<ProgramHandle>,
    texture_units: [Option<TextureHandle>; MAX_TEXTURE_UNITS],
    state: PipelineState,

    max_target_size: u32,
    stats: DeviceStats,
    reported: FxHashSet<String>,
}

impl SoftwareDevice {
    /// Creates a device whose default framebuffer is `width × height`.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            meshes: SlotMap::with_key(),
            textures: SlotMap::with_key(),
            programs: SlotMap::with_key(),
            targets: SlotMap::with_key(),
            surface: Framebuffer::new(width, height),
            presented: None,
            bound_target: RenderTarget::Default,
            bound_program: None,
            texture_units: [None; MAX_TEXTURE_UNITS],
            state: PipelineState::BASELINE,
            max_target_size: DEFAULT_MAX_TARGET_SIZE,
            stats: DeviceStats::default(),
            reported: FxHashSet::default(),
        }
    }

    /// Offscreen targets with an edge above `size` come back incomplete.
    #[must_use]
    pub fn with_max_target_size(mut self, size: u32) -> Self {
        self.max_target_size = size;
        self
    }

    // ========================================================================
    // Uploads
    // ========================================================================

    pub fn upload_mesh(&mut self, mesh: MeshData) -> MeshHandle {
        self.meshes.insert(mesh)
    }

    /// Images whose pixel buffer does not match their dimensions are
    /// replaced by [`ImageData::placeholder`].
    pub fn upload_texture(&mut self, image: &ImageData, wrap: WrapMode) -> TextureHandle {
        let image = self.decode_or_placeholder(image, "Texture");
        self.textures.insert(SoftTexture::Image { image, wrap })
    }

    /// Faces in [`CubeFace::ALL`](crate::assets::CubeFace::ALL) order.
    pub fn upload_cubemap(&mut self, faces: &[ImageData; 6]) -> TextureHandle {
        let faces = Box::new(
            faces
                .each_ref()
                .map(|face| self.decode_or_placeholder(face, "Cubemap face")),
        );
        self.textures.insert(SoftTexture::Cube(faces))
    }

    pub fn create_program(
        &mut self,
        vertex: VertexStage,
        fragment: FragmentStage,
    ) -> ProgramHandle {
        self.programs.insert(SoftwareProgram::new(vertex, fragment))
    }

    /// Creates the six built-in programs, the built-in meshes and the
    /// fallback textures.
    pub fn standard_resources(&mut self) -> PipelineResources {
        let programs = ProgramSet {
            lit: self.create_program(VertexStage::Standard, FragmentStage::Lit),
            flat_color: self.create_program(VertexStage::Standard, FragmentStage::FlatColor),
            alpha: self.create_program(VertexStage::Standard, FragmentStage::AlphaTexture),
            reflection: self.create_program(VertexStage::Standard, FragmentStage::Reflection),
            skybox: self.create_program(VertexStage::Skybox, FragmentStage::Skybox),
            screen: self.create_program(VertexStage::ScreenSpace, FragmentStage::Screen),
        };
        let meshes = BuiltinMeshes {
            skybox_cube: self.upload_mesh(primitives::skybox_cube()),
            screen_quad: self.upload_mesh(primitives::screen_quad()),
            light_marker: self.upload_mesh(primitives::cube(1.0)),
        };
        let placeholder = ImageData::placeholder();
        let blank = ImageData::solid(1, 1, [0, 0, 0, 255]);
        PipelineResources {
            programs,
            meshes,
            fallback_texture: self.upload_texture(&placeholder, WrapMode::Repeat),
            blank_texture: self.upload_texture(&blank, WrapMode::Repeat),
            fallback_cubemap: self.upload_cubemap(&std::array::from_fn(|_| placeholder.clone())),
        }
    }

    // ========================================================================
    // Readback
    // ========================================================================

    #[must_use]
    pub fn framebuffer(&self, target: RenderTarget) -> Option<&Framebuffer> {
        match target {
            RenderTarget::Default => Some(&self.surface),
            RenderTarget::Offscreen(handle) => self.targets.get(handle).map(|t| &t.framebuffer),
        }
    }

    #[must_use]
    pub fn color_at(&self, target: RenderTarget, x: u32, y: u32) -> Option<Vec4> {
        self.framebuffer(target)?.color_at(x, y)
    }

    #[must_use]
    pub fn depth_at(&self, target: RenderTarget, x: u32, y: u32) -> Option<f32> {
        self.framebuffer(target)?.depth_at(x, y)
    }

    #[must_use]
    pub fn stencil_at(&self, target: RenderTarget, x: u32, y: u32) -> Option<u8> {
        self.framebuffer(target)?.stencil_at(x, y)
    }

    /// The image shown by the last `present`.
    #[must_use]
    pub fn presented(&self) -> Option<&ColorImage> {
        self.presented.as_ref()
    }

    #[must_use]
    pub fn stats(&self) -> &DeviceStats {
        &self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = DeviceStats::default();
    }

    /// The fixed-function state the device currently holds.
    #[must_use]
    pub fn pipeline_state(&self) -> &PipelineState {
        &self.state
    }

    #[must_use]
    pub fn bound_target(&self) -> RenderTarget {
        self.bound_target
    }

    #[must_use]
    pub fn live_targets(&self) -> usize {
        self.targets.len()
    }

    #[must_use]
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn decode_or_placeholder(&mut self, image: &ImageData, label: &str) -> ColorImage {
        if image.is_well_formed() {
            return ColorImage::from_image_data(image);
        }
        self.report_once(format!(
            "{label} {}x{} has {} bytes, expected {}; using placeholder",
            image.width,
            image.height,
            image.pixels.len(),
            image.expected_len()
        ));
        ColorImage::from_image_data(&ImageData::placeholder())
    }

    fn report_once(&mut self, key: String) {
        if self.reported.insert(key.clone()) {
            log::warn!("{key}");
        }
    }

    fn bound_framebuffer_mut(&mut self) -> Option<&mut Framebuffer> {
        match self.bound_target {
            RenderTarget::Default => Some(&mut self.surface),
            RenderTarget::Offscreen(handle) => self
                .targets
                .get_mut(handle)
                .filter(|t| t.status.is_complete())
                .map(|t| &mut t.framebuffer),
        }
    }
}

impl StateSink for SoftwareDevice {
    fn set_depth_state(&mut self, state: &DepthState) {
        self.state.depth = *state;
        self.stats.depth_state_changes += 1;
    }

    fn set_stencil_state(&mut self, state: &StencilState) {
        self.state.stencil = *state;
        self.stats.stencil_state_changes += 1;
    }

    fn set_blend_state(&mut self, state: &BlendState) {
        self.state.blend = *state;
        self.stats.blend_state_changes += 1;
    }

    fn set_cull_state(&mut self, state: &CullState) {
        self.state.cull = *state;
        self.stats.cull_state_changes += 1;
    }
}

impl UniformBinder for SoftwareDevice {
    fn use_program(&mut self, program: ProgramHandle) {
        if !self.programs.contains_key(program) {
            self.report_once(format!("Unknown program {program:?}"));
        }
        self.bound_program = Some(program);
        self.stats.program_binds += 1;
    }

    fn set_uniform(&mut self, name: &str, value: UniformValue) {
        let program = self.bound_program.and_then(|h| self.programs.get_mut(h));
        match program {
            Some(program) => {
                program.uniforms.set(name, value);
                self.stats.uniform_writes += 1;
            }
            None => self.report_once(format!("Uniform '{name}' set without a valid program")),
        }
    }
}

impl RenderDevice for SoftwareDevice {
    fn create_offscreen_target(&mut self, width: u32, height: u32) -> OffscreenAttachments {
        let status = if width == 0 || height == 0 {
            TargetStatus::Incomplete("zero-sized attachment".into())
        } else if width > self.max_target_size || height > self.max_target_size {
            TargetStatus::Incomplete(format!(
                "attachment exceeds the maximum size of {}",
                self.max_target_size
            ))
        } else {
            TargetStatus::Complete
        };
        let framebuffer = if status.is_complete() {
            Framebuffer::new(width, height)
        } else {
            Framebuffer::default()
        };

        let textures = &mut self.textures;
        let target = self.targets.insert_with_key(|key| SoftTarget {
            framebuffer,
            color: textures.insert(SoftTexture::Attachment(key)),
            status,
        });

        OffscreenAttachments {
            target,
            color: self.targets[target].color,
            width,
            height,
        }
    }

    fn target_status(&self, target: TargetHandle) -> TargetStatus {
        self.targets.get(target).map_or_else(
            || TargetStatus::Incomplete("unknown target".into()),
            |t| t.status.clone(),
        )
    }

    fn destroy_offscreen_target(&mut self, target: TargetHandle) {
        if let Some(t) = self.targets.remove(target) {
            self.textures.remove(t.color);
        }
        if self.bound_target == RenderTarget::Offscreen(target) {
            self.bound_target = RenderTarget::Default;
        }
    }

    fn configure_surface(&mut self, width: u32, height: u32) {
        if self.surface.width() != width || self.surface.height() != height {
            self.surface = Framebuffer::new(width, height);
        }
    }

    fn bind_target(&mut self, target: RenderTarget) {
        if let RenderTarget::Offscreen(handle) = target {
            if !self.targets.contains_key(handle) {
                self.report_once(format!("Binding unknown target {handle:?}"));
            }
        }
        self.bound_target = target;
        self.stats.target_binds += 1;
    }

    fn clear(&mut self, flags: ClearFlags, color: Vec4) {
        let depth_write = self.state.depth.write_enabled;
        let stencil_mask = self.state.stencil.write_mask;
        if let Some(fb) = self.bound_framebuffer_mut() {
            fb.clear(flags, color, depth_write, stencil_mask);
        }
        self.stats.clears += 1;
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureHandle) {
        let Some(slot) = self.texture_units.get_mut(unit as usize) else {
            self.report_once(format!("Texture unit {unit} out of range"));
            return;
        };
        *slot = Some(texture);
        if !self.textures.contains_key(texture) {
            self.report_once(format!("Unknown texture {texture:?} bound to unit {unit}"));
        }
        self.stats.texture_binds += 1;
    }

    fn draw_mesh(&mut self, mesh: MeshHandle) {
        self.stats.draw_calls += 1;

        let Some(program_handle) = self.bound_program else {
            self.report_once("Draw without a program".into());
            return;
        };
        if !self.meshes.contains_key(mesh) || !self.programs.contains_key(program_handle) {
            self.report_once(format!(
                "Draw with unknown mesh {mesh:?} or program {program_handle:?}"
            ));
            return;
        }

        // 绘制期间把目标帧缓冲取出，采样其他目标时无需可变借用
        let mut fb = match self.bound_framebuffer_mut() {
            Some(fb) => std::mem::take(fb),
            None => return,
        };

        let raster_stats = {
            let program = &self.programs[program_handle];
            let lookup = TextureLookup {
                textures: &self.textures,
                targets: &self.targets,
                units: &self.texture_units,
            };
            let vertex = VertexTransform::new(program);
            let fragment = FragmentShader::resolve(program, &lookup);
            raster::draw_mesh(&mut fb, &self.meshes[mesh], &vertex, &fragment, &self.state)
        };

        if let Some(slot) = self.bound_framebuffer_mut() {
            *slot = fb;
        }
        self.stats.triangles += raster_stats.triangles;
        self.stats.fragments += raster_stats.fragments;
    }

    fn present(&mut self) {
        self.presented = Some(self.surface.color().clone());
        self.stats.presents += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::state::PassId;

    #[test]
    fn oversized_and_empty_targets_are_incomplete() {
        let mut device = SoftwareDevice::new(4, 4).with_max_target_size(16);
        let ok = device.create_offscreen_target(16, 16);
        assert!(device.target_status(ok.target).is_complete());

        let big = device.create_offscreen_target(17, 4);
        assert!(matches!(device.target_status(big.target), TargetStatus::Incomplete(_)));

        let empty = device.create_offscreen_target(0, 4);
        assert!(!device.target_status(empty.target).is_complete());
    }

    #[test]
    fn destroying_target_frees_its_color_texture() {
        let mut device = SoftwareDevice::new(4, 4);
        let before = device.texture_count();
        let t = device.create_offscreen_target(8, 8);
        assert_eq!(device.texture_count(), before + 1);
        device.destroy_offscreen_target(t.target);
        assert_eq!(device.texture_count(), before);
        assert_eq!(device.live_targets(), 0);
    }

    #[test]
    fn full_screen_quad_covers_every_pixel_once() {
        let mut device = SoftwareDevice::new(8, 6);
        let resources = device.standard_resources();
        let white = ImageData::solid(1, 1, [255, 255, 255, 255]);
        let white = device.upload_texture(&white, WrapMode::Repeat);

        device.set_depth_state(&PassId::PostProcess.state().depth);
        device.use_program(resources.programs.screen);
        device.set_uniform("screenTexture", UniformValue::Int(0));
        device.bind_texture(0, white);
        device.draw_mesh(resources.meshes.screen_quad);

        assert_eq!(device.stats().fragments, 48);
        assert_eq!(device.stats().triangles, 2);
        assert_eq!(device.color_at(RenderTarget::Default, 7, 5), Some(Vec4::ONE));
    }

    #[test]
    fn malformed_image_uploads_as_placeholder() {
        let mut device = SoftwareDevice::new(8, 6);
        let resources = device.standard_resources();
        let short = ImageData {
            width: 2,
            height: 2,
            pixels: vec![255; 8],
        };
        let texture = device.upload_texture(&short, WrapMode::Repeat);

        device.set_depth_state(&PassId::PostProcess.state().depth);
        device.use_program(resources.programs.screen);
        device.set_uniform("screenTexture", UniformValue::Int(0));
        device.bind_texture(0, texture);
        device.draw_mesh(resources.meshes.screen_quad);

        let magenta = Vec4::new(1.0, 0.0, 1.0, 1.0);
        let black = Vec4::new(0.0, 0.0, 0.0, 1.0);
        let mut magenta_seen = false;
        for y in 0..6 {
            for x in 0..8 {
                let color = device.color_at(RenderTarget::Default, x, y);
                assert!(color == Some(magenta) || color == Some(black), "{color:?}");
                magenta_seen |= color == Some(magenta);
            }
        }
        assert!(magenta_seen);
    }

    #[test]
    fn clear_follows_stencil_write_mask() {
        let mut device = SoftwareDevice::new(2, 2);
        let resources = device.standard_resources();
        let t = device.create_offscreen_target(2, 2);
        let target = RenderTarget::Offscreen(t.target);
        device.bind_target(target);

        device.set_stencil_state(&PassId::OutlineWriteStencil.state().stencil);
        device.use_program(resources.programs.screen);
        device.draw_mesh(resources.meshes.screen_quad);
        assert_eq!(device.stencil_at(target, 1, 1), Some(1));

        // Write mask 0: the clear leaves the stencil plane alone.
        device.set_stencil_state(&PassId::Opaque.state().stencil);
        device.clear(ClearFlags::STENCIL, Vec4::ZERO);
        assert_eq!(device.stencil_at(target, 1, 1), Some(1));

        device.set_stencil_state(&PipelineState::BASELINE.stencil);
        device.clear(ClearFlags::STENCIL, Vec4::ZERO);
        assert_eq!(device.stencil_at(target, 1, 1), Some(0));
        assert_eq!(device.stats().clears, 2);
    }
}
