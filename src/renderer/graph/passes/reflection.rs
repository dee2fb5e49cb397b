//! Environment Reflection Pass
//!
//! Shades reflective instances by sampling the environment cubemap along the
//! view ray reflected about the surface normal.
//!
//! Runs after the outline pass, so it always starts from the restored stencil
//! configuration instead of the outline's reference value.

use crate::renderer::graph::context::PassContext;
use crate::renderer::graph::node::RenderNode;
use crate::renderer::state::PassId;
use crate::scene::InstanceCategory;

#[derive(Debug, Default)]
pub struct ReflectionPass;

impl ReflectionPass {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl RenderNode for ReflectionPass {
    fn name(&self) -> &'static str {
        "Reflection"
    }

    fn run(&self, ctx: &mut PassContext<'_>) {
        let scene = ctx.scene;
        if scene.count_of(InstanceCategory::Reflective) == 0 {
            return;
        }

        ctx.enter(PassId::Reflection);

        let unit = ctx.settings.environment_texture_unit;
        let cubemap = scene.environment.unwrap_or(ctx.resources.fallback_cubemap);
        let program = ctx.resources.programs.reflection;
        let eye = ctx.frame.camera_position;

        ctx.use_program(program);
        ctx.set_camera_uniforms();
        ctx.set_uniform("cameraPos", eye);
        ctx.set_uniform("skybox", unit as i32);
        ctx.bind_texture(unit, cubemap);

        for (_, instance) in scene.instances_of(InstanceCategory::Reflective) {
            ctx.set_model(&instance.transform);
            ctx.draw(instance.mesh);
        }
    }
}
