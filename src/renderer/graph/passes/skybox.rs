//! Skybox Render Pass
//!
//! Draws the environment cubemap behind everything else.
//!
//! # Render Graph Position
//!
//! ```text
//! ReflectionPass → SkyboxPass → TransparentPass
//! ```
//!
//! The cube is drawn with the rotation-only view so it stays centered on the
//! eye, and its vertex stage pins depth to the far plane (1.0). Depth compare
//! is relaxed to `LessEqual` for the draw so the cube passes against cleared
//! depth but not against anything already drawn. The previous state is
//! restored afterwards.

use crate::renderer::graph::context::PassContext;
use crate::renderer::graph::node::RenderNode;
use crate::renderer::state::PassId;

#[derive(Debug, Default)]
pub struct SkyboxPass;

impl SkyboxPass {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl RenderNode for SkyboxPass {
    fn name(&self) -> &'static str {
        "Skybox"
    }

    fn run(&self, ctx: &mut PassContext<'_>) {
        let Some(cubemap) = ctx.scene.environment else {
            log::trace!("No environment cubemap, skybox skipped");
            return;
        };

        let saved = ctx.snapshot();
        ctx.enter(PassId::Skybox);

        let unit = ctx.settings.environment_texture_unit;
        let program = ctx.resources.programs.skybox;
        let mesh = ctx.resources.meshes.skybox_cube;
        let (view, projection) = (ctx.frame.skybox_view, ctx.frame.projection);

        ctx.use_program(program);
        ctx.set_uniform("view", view);
        ctx.set_uniform("projection", projection);
        ctx.set_uniform("skybox", unit as i32);
        ctx.bind_texture(unit, cubemap);
        ctx.draw(mesh);

        ctx.restore(&saved);
    }
}
