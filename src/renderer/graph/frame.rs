//! 渲染帧管理
//!
//! [`RenderFrame`] owns the passes and the state controller and runs the
//! fixed per-frame sequence:
//!
//! 1. Bind the offscreen target, push the baseline state, clear color, depth
//!    and stencil.
//! 2. Scene passes: Opaque → Outline → Reflection → Skybox → Transparent.
//! 3. Bind the default framebuffer and clear it.
//! 4. Post-process the offscreen color onto it (depth test off, then on).
//! 5. Present.
//!
//! The baseline is pushed before the clear because clears honour the depth
//! write flag and the stencil write mask left over from the previous frame.

use super::context::{FrameContext, FrameStats, PassContext};
use super::node::RenderNode;
use super::passes::{
    OpaquePass, OutlinePass, PostProcessPass, ReflectionPass, SkyboxPass, TransparentPass,
};
use crate::renderer::device::{ClearFlags, RenderDevice, RenderTarget};
use crate::renderer::resources::PipelineResources;
use crate::renderer::settings::RendererSettings;
use crate::renderer::state::GpuStateController;
use crate::renderer::target::OffscreenTarget;
use crate::scene::SceneStore;

pub struct RenderFrame {
    gpu: GpuStateController,
    opaque: OpaquePass,
    outline: OutlinePass,
    reflection: ReflectionPass,
    skybox: SkyboxPass,
    transparent: TransparentPass,
    post_process: PostProcessPass,
}

impl RenderFrame {
    /// Scene pass names in execution order.
    pub const SCENE_PASSES: [&'static str; 5] =
        ["Opaque", "Outline", "Reflection", "Skybox", "Transparent"];

    #[must_use]
    pub fn new(settings: &RendererSettings) -> Self {
        Self {
            gpu: GpuStateController::new(),
            opaque: OpaquePass::new(),
            outline: OutlinePass::new(&settings.outline),
            reflection: ReflectionPass::new(),
            skybox: SkyboxPass::new(),
            transparent: TransparentPass::new(),
            post_process: PostProcessPass::new(settings.post_process),
        }
    }

    /// Rebuilds pass parameters after the settings changed.
    pub fn apply_settings(&mut self, settings: &RendererSettings) {
        self.outline = OutlinePass::new(&settings.outline);
        self.post_process.set_effect(settings.post_process);
    }

    #[must_use]
    pub fn gpu_state(&self) -> &GpuStateController {
        &self.gpu
    }

    #[must_use]
    pub fn transparent_pass(&self) -> &TransparentPass {
        &self.transparent
    }

    pub fn render(
        &mut self,
        device: &mut dyn RenderDevice,
        scene: &SceneStore,
        settings: &RendererSettings,
        resources: &PipelineResources,
        target: &OffscreenTarget,
        frame: &FrameContext,
    ) -> FrameStats {
        let mut stats = FrameStats::new(frame.frame_index);

        let Self {
            gpu,
            opaque,
            outline,
            reflection,
            skybox,
            transparent,
            post_process,
        } = self;

        let mut scene_passes: [&mut dyn RenderNode; 5] =
            [opaque, outline, reflection, skybox, transparent];
        for node in &mut scene_passes {
            node.prepare(frame, scene);
        }

        // 1. Offscreen target, baseline state, full clear
        device.bind_target(RenderTarget::Offscreen(target.handle()));
        let changes = gpu.restore_defaults(&mut *device);
        stats.state_changes += changes.count() as u32;
        device.clear(ClearFlags::ALL, settings.clear_color());

        let mut ctx = PassContext {
            frame,
            scene,
            settings,
            resources,
            gpu,
            device,
            stats: &mut stats,
        };

        // 2. Scene passes
        for node in &scene_passes {
            ctx.stats.passes.push(node.name());
            node.run(&mut ctx);
        }

        // 3. Default framebuffer
        ctx.device.bind_target(RenderTarget::Default);
        ctx.device
            .clear(ClearFlags::COLOR, settings.present_clear_color());

        // 4. Composite
        ctx.stats.passes.push(post_process.name());
        post_process.run(&mut ctx);

        // 5. Present
        ctx.device.present();

        stats
    }
}
