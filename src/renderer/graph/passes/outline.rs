//! Outline Render Pass
//!
//! Highlights instances with a flat-colored fringe using the stencil buffer.
//!
//! # 三个阶段
//! ```text
//! WriteStencil               DrawHighlightedSilhouette       Restore
//! (lit, stencil := 1)   →    (flat color, scaled model,  →   (stencil writes on,
//!                             only where stencil != 1)        always-pass)
//! ```
//!
//! Every outlined instance is written to the stencil buffer before any
//! silhouette is drawn, so neighbouring highlights never paint over each
//! other's interiors. The stencil buffer itself is only cleared at the start
//! of the next frame.

use glam::{Mat4, Vec3};

use super::lighting::{begin_lit, draw_lit};
use crate::renderer::graph::context::PassContext;
use crate::renderer::graph::node::RenderNode;
use crate::renderer::settings::OutlineSettings;
use crate::renderer::state::PassId;
use crate::scene::InstanceCategory;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutlineStage {
    WriteStencil,
    DrawHighlightedSilhouette,
    Restore,
}

impl OutlineStage {
    /// Execution order.
    pub const SEQUENCE: [Self; 3] = [
        Self::WriteStencil,
        Self::DrawHighlightedSilhouette,
        Self::Restore,
    ];

    /// The state each stage runs under.
    #[must_use]
    pub fn pass_id(self) -> PassId {
        match self {
            Self::WriteStencil => PassId::OutlineWriteStencil,
            Self::DrawHighlightedSilhouette => PassId::OutlineSilhouette,
            Self::Restore => PassId::OutlineRestore,
        }
    }

    #[must_use]
    pub fn next(self) -> Option<Self> {
        match self {
            Self::WriteStencil => Some(Self::DrawHighlightedSilhouette),
            Self::DrawHighlightedSilhouette => Some(Self::Restore),
            Self::Restore => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OutlinePass {
    scale: f32,
    color: Vec3,
}

impl Default for OutlinePass {
    fn default() -> Self {
        Self::new(&OutlineSettings::default())
    }
}

impl OutlinePass {
    #[must_use]
    pub fn new(settings: &OutlineSettings) -> Self {
        Self {
            scale: settings.scale,
            color: settings.color(),
        }
    }

    #[must_use]
    pub fn scale(&self) -> f32 {
        self.scale
    }

    #[must_use]
    pub fn color(&self) -> Vec3 {
        self.color
    }

    /// Runs a single stage for every outlined instance in the scene.
    pub fn execute_stage(&self, stage: OutlineStage, ctx: &mut PassContext<'_>) {
        ctx.enter(stage.pass_id());
        let scene = ctx.scene;

        match stage {
            OutlineStage::WriteStencil => {
                begin_lit(ctx);
                for (_, instance) in scene.instances_of(InstanceCategory::Outlined) {
                    draw_lit(ctx, instance, &instance.transform);
                }
            }
            OutlineStage::DrawHighlightedSilhouette => {
                let program = ctx.resources.programs.flat_color;
                ctx.use_program(program);
                ctx.set_camera_uniforms();
                ctx.set_uniform("lightColor", self.color);
                let scale = Mat4::from_scale(Vec3::splat(self.scale));
                for (_, instance) in scene.instances_of(InstanceCategory::Outlined) {
                    ctx.set_model(&(instance.transform * scale));
                    ctx.draw(instance.mesh);
                }
            }
            OutlineStage::Restore => {}
        }
    }
}

impl RenderNode for OutlinePass {
    fn name(&self) -> &'static str {
        "Outline"
    }

    fn run(&self, ctx: &mut PassContext<'_>) {
        if ctx.scene.count_of(InstanceCategory::Outlined) == 0 {
            return;
        }
        for stage in OutlineStage::SEQUENCE {
            self.execute_stage(stage, ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_chain_in_order() {
        let mut stage = Some(OutlineStage::WriteStencil);
        let mut seen = Vec::new();
        while let Some(s) = stage {
            seen.push(s);
            stage = s.next();
        }
        assert_eq!(seen, OutlineStage::SEQUENCE);
    }

    #[test]
    fn settings_feed_scale_and_color() {
        let pass = OutlinePass::new(&OutlineSettings {
            scale: 1.3,
            color: [0.0, 1.0, 0.0],
        });
        assert!((pass.scale() - 1.3).abs() < f32::EPSILON);
        assert_eq!(pass.color(), Vec3::Y);
    }
}
