//! Frame & Pass Contexts
//!
//! - [`FrameContext`]: immutable per-frame data derived once from the camera
//!   and viewport (matrices, eye position, the offscreen color texture).
//! - [`PassContext`]: what a pass sees while it runs. It bundles the device,
//!   the state controller and the frame statistics so a pass cannot issue a
//!   draw without it being counted against the pass that is active.

use glam::{Mat4, Vec3};
use smallvec::SmallVec;

use crate::assets::{MeshHandle, ProgramHandle, TextureHandle};
use crate::renderer::device::RenderDevice;
use crate::renderer::resources::PipelineResources;
use crate::renderer::settings::RendererSettings;
use crate::renderer::state::{GpuStateController, PassId, StateSnapshot};
use crate::renderer::target::Viewport;
use crate::renderer::uniforms::{UniformValue, normal_matrix};
use crate::scene::{Camera, SceneStore};

// ─── Frame Context ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameContext {
    pub frame_index: u64,
    pub viewport: Viewport,
    pub view: Mat4,
    pub projection: Mat4,
    /// `view` with translation stripped, for geometry centered on the eye.
    pub skybox_view: Mat4,
    pub camera_position: Vec3,
    /// Color attachment of the offscreen target, sampled by post-processing.
    pub scene_color: TextureHandle,
    /// Seconds since the loop started.
    pub time: f32,
}

impl FrameContext {
    #[must_use]
    pub fn new(
        frame_index: u64,
        camera: &Camera,
        viewport: Viewport,
        scene_color: TextureHandle,
        time: f32,
    ) -> Self {
        Self {
            frame_index,
            viewport,
            view: camera.view_matrix(),
            projection: camera.projection_matrix(viewport.aspect()),
            skybox_view: camera.rotation_only_view(),
            camera_position: camera.position,
            scene_color,
            time,
        }
    }

    /// Projects a world-space point to pixel coordinates (origin top-left).
    /// Returns `None` for points behind the eye.
    #[must_use]
    pub fn project_to_pixel(&self, world: Vec3) -> Option<(f32, f32)> {
        let clip = self.projection * self.view * world.extend(1.0);
        if clip.w <= f32::EPSILON {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        let x = (ndc.x * 0.5 + 0.5) * self.viewport.width as f32;
        let y = (0.5 - ndc.y * 0.5) * self.viewport.height as f32;
        Some((x, y))
    }
}

// ─── Frame Statistics ─────────────────────────────────────────────────────────

/// What one frame did, pass by pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub frame_index: u64,
    /// Names of the passes that ran, in execution order.
    pub passes: SmallVec<[&'static str; 8]>,
    /// State categories forwarded to the device over the whole frame.
    pub state_changes: u32,
    /// Whether the offscreen target was reallocated for this frame.
    pub target_recreated: bool,
    draws: [u32; PassId::COUNT],
}

impl FrameStats {
    #[must_use]
    pub fn new(frame_index: u64) -> Self {
        Self {
            frame_index,
            ..Self::default()
        }
    }

    pub(crate) fn record_draw(&mut self, pass: PassId) {
        self.draws[pass.index()] += 1;
    }

    /// Draw calls issued while `pass` was the active state.
    #[must_use]
    pub fn draws_in(&self, pass: PassId) -> u32 {
        self.draws[pass.index()]
    }

    #[must_use]
    pub fn total_draws(&self) -> u32 {
        self.draws.iter().sum()
    }
}

// ─── Pass Context ─────────────────────────────────────────────────────────────

/// Mutable view of the frame handed to each pass.
pub struct PassContext<'a> {
    pub frame: &'a FrameContext,
    pub scene: &'a SceneStore,
    pub settings: &'a RendererSettings,
    pub resources: &'a PipelineResources,
    pub gpu: &'a mut GpuStateController,
    pub device: &'a mut dyn RenderDevice,
    pub stats: &'a mut FrameStats,
}

impl PassContext<'_> {
    /// Switches the device to the state `pass` declares.
    pub fn enter(&mut self, pass: PassId) {
        let changes = self.gpu.enter(pass, &mut *self.device);
        self.stats.state_changes += changes.count() as u32;
    }

    #[must_use]
    pub fn snapshot(&self) -> StateSnapshot {
        self.gpu.snapshot()
    }

    pub fn restore(&mut self, snapshot: &StateSnapshot) {
        let changes = self.gpu.restore(snapshot, &mut *self.device);
        self.stats.state_changes += changes.count() as u32;
    }

    pub fn use_program(&mut self, program: ProgramHandle) {
        self.device.use_program(program);
    }

    pub fn set_uniform(&mut self, name: &str, value: impl Into<UniformValue>) {
        self.device.set_uniform(name, value.into());
    }

    /// Pushes the frame's `view` and `projection`.
    pub fn set_camera_uniforms(&mut self) {
        let (view, projection) = (self.frame.view, self.frame.projection);
        self.set_uniform("view", view);
        self.set_uniform("projection", projection);
    }

    /// Pushes `model` and its normal matrix.
    pub fn set_model(&mut self, model: &Mat4) {
        self.set_uniform("model", *model);
        self.set_uniform("normalMat", normal_matrix(model));
    }

    pub fn bind_texture(&mut self, unit: u32, texture: TextureHandle) {
        self.device.bind_texture(unit, texture);
    }

    /// Issues a draw and counts it against the active pass.
    pub fn draw(&mut self, mesh: MeshHandle) {
        self.device.draw_mesh(mesh);
        self.stats.record_draw(self.gpu.active_pass());
    }
}
