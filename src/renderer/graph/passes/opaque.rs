//! Opaque Render Pass
//!
//! Draws opaque instances with the lit program, then a small flat-colored
//! marker at every point light.
//!
//! # 数据流
//! ```text
//! SceneStore (Opaque) → OpaquePass → Offscreen Color / Depth
//! ```
//!
//! The stencil buffer is read-only here: outlined instances are drawn by the
//! outline pass, which is the only writer.

use glam::{Mat4, Vec3};

use super::lighting::{begin_lit, draw_lit};
use crate::renderer::graph::context::PassContext;
use crate::renderer::graph::node::RenderNode;
use crate::renderer::state::PassId;
use crate::scene::InstanceCategory;

#[derive(Debug, Default)]
pub struct OpaquePass;

impl OpaquePass {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn draw_light_markers(ctx: &mut PassContext<'_>) {
        let scene = ctx.scene;
        let scale = ctx.settings.light_marker_scale;
        let mesh = ctx.resources.meshes.light_marker;

        let program = ctx.resources.programs.flat_color;
        ctx.use_program(program);
        ctx.set_camera_uniforms();
        for light in scene.point_lights().take(ctx.settings.max_point_lights) {
            let Some(position) = light.position() else {
                continue;
            };
            let model = Mat4::from_translation(position) * Mat4::from_scale(Vec3::splat(scale));
            ctx.set_uniform("lightColor", light.colors.diffuse);
            ctx.set_model(&model);
            ctx.draw(mesh);
        }
    }
}

impl RenderNode for OpaquePass {
    fn name(&self) -> &'static str {
        "Opaque"
    }

    fn run(&self, ctx: &mut PassContext<'_>) {
        let scene = ctx.scene;
        let has_instances = scene.count_of(InstanceCategory::Opaque) > 0;
        let has_markers = ctx.settings.light_markers && scene.point_lights().next().is_some();
        if !has_instances && !has_markers {
            return;
        }

        ctx.enter(PassId::Opaque);

        if has_instances {
            begin_lit(ctx);
            for (_, instance) in scene.instances_of(InstanceCategory::Opaque) {
                draw_lit(ctx, instance, &instance.transform);
            }
        }

        if has_markers {
            Self::draw_light_markers(ctx);
        }
    }
}
