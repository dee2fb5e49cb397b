//! Lit program setup shared by the opaque pass and the outline pass's
//! stencil-writing stage.

use glam::{Mat4, Vec3};

use crate::renderer::graph::context::PassContext;
use crate::scene::{Instance, LightKind};

/// Selects the lit program and pushes everything that is constant across the
/// pass: camera matrices, eye position, sampler units and all lights.
pub(crate) fn begin_lit(ctx: &mut PassContext<'_>) {
    let program = ctx.resources.programs.lit;
    ctx.use_program(program);
    ctx.set_camera_uniforms();
    let eye = ctx.frame.camera_position;
    ctx.set_uniform("viewPos", eye);
    ctx.set_uniform("material.diffuse", 0_i32);
    ctx.set_uniform("material.specular", 1_i32);
    upload_lights(ctx);
}

fn upload_lights(ctx: &mut PassContext<'_>) {
    let scene = ctx.scene;

    match scene.directional_light() {
        Some(light) => {
            if let LightKind::Directional { direction } = light.kind {
                ctx.set_uniform("dirLight.direction", direction);
            }
            ctx.set_uniform("dirLight.ambient", light.colors.ambient);
            ctx.set_uniform("dirLight.diffuse", light.colors.diffuse);
            ctx.set_uniform("dirLight.specular", light.colors.specular);
        }
        None => {
            ctx.set_uniform("dirLight.direction", Vec3::NEG_Y);
            ctx.set_uniform("dirLight.ambient", Vec3::ZERO);
            ctx.set_uniform("dirLight.diffuse", Vec3::ZERO);
            ctx.set_uniform("dirLight.specular", Vec3::ZERO);
        }
    }

    let max = ctx.settings.max_point_lights;
    let mut count = 0_i32;
    for (i, light) in scene.point_lights().take(max).enumerate() {
        let LightKind::Point {
            position,
            attenuation,
        } = light.kind
        else {
            continue;
        };
        let prefix = format!("pointLights[{i}].");
        ctx.set_uniform(&format!("{prefix}position"), position);
        ctx.set_uniform(&format!("{prefix}constant"), attenuation.constant);
        ctx.set_uniform(&format!("{prefix}linear"), attenuation.linear);
        ctx.set_uniform(&format!("{prefix}quadratic"), attenuation.quadratic);
        ctx.set_uniform(&format!("{prefix}ambient"), light.colors.ambient);
        ctx.set_uniform(&format!("{prefix}diffuse"), light.colors.diffuse);
        ctx.set_uniform(&format!("{prefix}specular"), light.colors.specular);
        count += 1;
    }
    if scene.point_lights().count() > max {
        log::trace!("Only the first {max} point lights are uploaded");
    }
    ctx.set_uniform("pointLightCount", count);
}

/// Binds the instance's material and draws it with `model`.
/// Requires [`begin_lit`] to have run in the current pass.
pub(crate) fn draw_lit(ctx: &mut PassContext<'_>, instance: &Instance, model: &Mat4) {
    let material = &instance.material;
    let diffuse = material.diffuse.unwrap_or(ctx.resources.fallback_texture);
    let specular = material.specular.unwrap_or(ctx.resources.blank_texture);
    ctx.bind_texture(0, diffuse);
    ctx.bind_texture(1, specular);
    ctx.set_uniform("material.shininess", material.shininess);
    ctx.set_model(model);
    ctx.draw(instance.mesh);
}
