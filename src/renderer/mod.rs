//! Frame Orchestrator
//!
//! [`Renderer`] owns the offscreen target and the pass sequence and turns a
//! [`SceneStore`] into one presented frame per call.
//!
//! ```rust,ignore
//! let resources = device.standard_resources();
//! let settings = RendererSettings::default();
//! let mut renderer = Renderer::new(settings, resources, &mut device, viewport)?;
//! loop {
//!     let stats = renderer.render_frame(&mut device, &scene, viewport, time)?;
//! }
//! ```
//!
//! Everything that can fail does so before the first pass runs: viewport
//! validation and the offscreen target's completeness check. Passes themselves
//! never fail.

pub mod device;
pub mod graph;
pub mod resources;
pub mod settings;
pub mod state;
pub mod target;
pub mod uniforms;

pub use device::{
    ClearFlags, OffscreenAttachments, RenderDevice, RenderTarget, StateSink, TargetStatus,
    UniformBinder,
};
pub use graph::{FrameContext, FrameStats, PassContext, RenderFrame, RenderNode};
pub use resources::{BuiltinMeshes, PipelineResources, ProgramSet};
pub use settings::{OutlineSettings, PostProcessEffect, RendererSettings};
pub use state::{GpuStateController, PassId, PipelineState};
pub use target::{OffscreenTarget, Viewport};
pub use uniforms::UniformValue;

use crate::errors::Result;
use crate::scene::SceneStore;

pub struct Renderer {
    settings: RendererSettings,
    resources: PipelineResources,
    target: OffscreenTarget,
    frame: RenderFrame,
    frame_index: u64,
}

impl Renderer {
    /// Creates and validates the offscreen target.
    ///
    /// Fails with [`HaloError::IncompleteTarget`](crate::errors::HaloError::IncompleteTarget)
    /// when the device cannot provide a complete target; no frame may be
    /// rendered in that case.
    pub fn new(
        settings: RendererSettings,
        resources: PipelineResources,
        device: &mut dyn RenderDevice,
        viewport: Viewport,
    ) -> Result<Self> {
        let viewport = viewport.validate()?;
        device.configure_surface(viewport.width, viewport.height);
        let target = OffscreenTarget::create(device, viewport)?;
        let frame = RenderFrame::new(&settings);

        log::info!(
            "Renderer ready: {}x{}, post-process {:?}",
            viewport.width,
            viewport.height,
            settings.post_process
        );

        Ok(Self {
            settings,
            resources,
            target,
            frame,
            frame_index: 0,
        })
    }

    /// Matches the default framebuffer and the offscreen target to a new
    /// viewport. Returns whether the target was reallocated.
    pub fn resize(&mut self, device: &mut dyn RenderDevice, viewport: Viewport) -> Result<bool> {
        let viewport = viewport.validate()?;
        device.configure_surface(viewport.width, viewport.height);
        let recreated = self.target.ensure_size(device, viewport)?;
        if recreated {
            log::debug!("Offscreen target resized to {}x{}", viewport.width, viewport.height);
        }
        Ok(recreated)
    }

    /// Renders and presents one frame.
    pub fn render_frame(
        &mut self,
        device: &mut dyn RenderDevice,
        scene: &SceneStore,
        viewport: Viewport,
        time: f32,
    ) -> Result<FrameStats> {
        let recreated = if self.target.matches(viewport) {
            false
        } else {
            self.resize(device, viewport)?
        };

        let frame = FrameContext::new(
            self.frame_index,
            &scene.camera,
            viewport,
            self.target.color_texture(),
            time,
        );
        let mut stats = self.frame.render(
            device,
            scene,
            &self.settings,
            &self.resources,
            &self.target,
            &frame,
        );
        stats.target_recreated = recreated;

        self.frame_index += 1;
        Ok(stats)
    }

    #[must_use]
    pub fn settings(&self) -> &RendererSettings {
        &self.settings
    }

    /// Replaces the settings. Takes effect from the next frame.
    pub fn set_settings(&mut self, settings: RendererSettings) {
        self.frame.apply_settings(&settings);
        self.settings = settings;
    }

    #[must_use]
    pub fn target(&self) -> &OffscreenTarget {
        &self.target
    }

    #[must_use]
    pub fn resources(&self) -> &PipelineResources {
        &self.resources
    }

    #[must_use]
    pub fn frame(&self) -> &RenderFrame {
        &self.frame
    }

    /// Number of frames rendered so far.
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Releases the offscreen target.
    pub fn release(self, device: &mut dyn RenderDevice) {
        self.target.release(device);
    }
}
