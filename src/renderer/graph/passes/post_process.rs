//! Post-Process Pass
//!
//! Composites the offscreen color texture onto the default framebuffer with a
//! full-screen quad, applying the configured screen-space effect.
//!
//! Depth testing is off for the quad and back on once it is drawn.

use crate::renderer::graph::context::PassContext;
use crate::renderer::graph::node::RenderNode;
use crate::renderer::settings::PostProcessEffect;
use crate::renderer::state::PassId;

#[derive(Debug, Default)]
pub struct PostProcessPass {
    effect: PostProcessEffect,
}

impl PostProcessPass {
    #[must_use]
    pub fn new(effect: PostProcessEffect) -> Self {
        Self { effect }
    }

    #[must_use]
    pub fn effect(&self) -> PostProcessEffect {
        self.effect
    }

    pub fn set_effect(&mut self, effect: PostProcessEffect) {
        self.effect = effect;
    }
}

impl RenderNode for PostProcessPass {
    fn name(&self) -> &'static str {
        "PostProcess"
    }

    fn run(&self, ctx: &mut PassContext<'_>) {
        let saved = ctx.snapshot();
        ctx.enter(PassId::PostProcess);

        let program = ctx.resources.programs.screen;
        let quad = ctx.resources.meshes.screen_quad;
        let source = ctx.frame.scene_color;

        ctx.use_program(program);
        ctx.set_uniform("screenTexture", 0_i32);
        ctx.set_uniform("effect", self.effect.code());
        ctx.bind_texture(0, source);
        ctx.draw(quad);

        ctx.restore(&saved);
    }
}
