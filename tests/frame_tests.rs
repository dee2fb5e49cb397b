//! Frame Integration Tests
//!
//! Tests for:
//! - Pass sequence and per-pass draw counts
//! - Stencil outline: fringe color, interior stencil values
//! - Skybox and transparent passes restoring the state they changed
//! - Offscreen target lifecycle: resize, incomplete target
//! - Post-process effects on the presented image

use glam::{Vec3, Vec4};
use halo::assets::{ImageData, primitives};
use halo::backend::software::{SoftwareDevice, WrapMode};
use halo::renderer::state::CompareFunction;
use halo::renderer::{
    FrameContext, GpuStateController, PassId, PostProcessEffect, RenderFrame, RenderTarget,
};
use halo::scene::{Camera, Instance, InstanceCategory, Light, LightColors, Material, SceneStore};
use halo::{HaloError, Renderer, RendererSettings, Viewport};

const EPSILON: f32 = 1e-3;

fn approx(a: Vec4, b: Vec4) -> bool {
    (a - b).abs().max_element() < EPSILON
}

fn setup(width: u32, height: u32, settings: RendererSettings) -> (SoftwareDevice, Renderer) {
    let mut device = SoftwareDevice::new(width, height);
    let resources = device.standard_resources();
    let renderer = Renderer::new(settings, resources, &mut device, Viewport::new(width, height))
        .expect("renderer should initialize");
    (device, renderer)
}

fn ambient_white() -> Light {
    Light::new_directional(
        Vec3::NEG_Z,
        LightColors::new(Vec3::ONE, Vec3::ZERO, Vec3::ZERO),
    )
}

fn white_texture(device: &mut SoftwareDevice) -> Material {
    let white = ImageData::solid(1, 1, [255, 255, 255, 255]);
    let white = device.upload_texture(&white, WrapMode::Repeat);
    Material::textured(white, None)
}

// ============================================================================
// Pass Sequence
// ============================================================================

#[test]
fn passes_run_in_fixed_order() {
    let (mut device, mut renderer) = setup(32, 32, RendererSettings::default());
    let scene = SceneStore::new(Camera::default());

    let stats = renderer
        .render_frame(&mut device, &scene, Viewport::new(32, 32), 0.0)
        .unwrap();

    let mut expected: Vec<&str> = RenderFrame::SCENE_PASSES.to_vec();
    expected.push("PostProcess");
    assert_eq!(stats.passes.as_slice(), expected.as_slice());
    assert_eq!(stats.frame_index, 0);
    assert_eq!(renderer.frame_index(), 1);
}

#[test]
fn empty_scene_only_composites() {
    let (mut device, mut renderer) = setup(32, 32, RendererSettings::default());
    let scene = SceneStore::new(Camera::default());

    let stats = renderer
        .render_frame(&mut device, &scene, Viewport::new(32, 32), 0.0)
        .unwrap();

    assert_eq!(stats.total_draws(), 1);
    assert_eq!(stats.draws_in(PassId::PostProcess), 1);
    assert_eq!(device.stats().presents, 1);
}

#[test]
fn point_lights_get_markers_in_opaque_pass() {
    let (mut device, mut renderer) = setup(32, 32, RendererSettings::default());
    let mut scene = SceneStore::new(Camera::default());
    scene.add_light(Light::new_point(
        Vec3::new(0.0, 0.0, -2.0),
        LightColors::new(Vec3::splat(0.1), Vec3::ONE, Vec3::ONE),
    ));

    let stats = renderer
        .render_frame(&mut device, &scene, Viewport::new(32, 32), 0.0)
        .unwrap();
    assert_eq!(stats.draws_in(PassId::Opaque), 1);

    let mut settings = RendererSettings::default();
    settings.light_markers = false;
    renderer.set_settings(settings);
    let stats = renderer
        .render_frame(&mut device, &scene, Viewport::new(32, 32), 0.0)
        .unwrap();
    assert_eq!(stats.draws_in(PassId::Opaque), 0);
}

// ============================================================================
// Stencil Outline
// ============================================================================

#[test]
fn outline_fringe_is_highlighted_and_interior_is_not() {
    let (mut device, mut renderer) = setup(128, 128, RendererSettings::default());
    let mut scene = SceneStore::new(Camera::default());
    let material = white_texture(&mut device);
    let quad = device.upload_mesh(primitives::quad(2.0, 2.0));
    scene.add_light(ambient_white());
    scene.add_instance(Instance::new(quad, InstanceCategory::Outlined).with_material(material));

    let viewport = Viewport::new(128, 128);
    let stats = renderer.render_frame(&mut device, &scene, viewport, 0.0).unwrap();
    assert_eq!(stats.draws_in(PassId::OutlineWriteStencil), 1);
    assert_eq!(stats.draws_in(PassId::OutlineSilhouette), 1);

    let color_texture = renderer.target().color_texture();
    let frame = FrameContext::new(0, &scene.camera, viewport, color_texture, 0.0);
    let (fx, fy) = frame.project_to_pixel(Vec3::new(1.05, 0.0, 0.0)).unwrap();
    let (cx, cy) = frame.project_to_pixel(Vec3::ZERO).unwrap();
    let (fx, fy, cx, cy) = (fx as u32, fy as u32, cx as u32, cy as u32);

    let offscreen = RenderTarget::Offscreen(renderer.target().handle());
    let yellow = Vec4::new(1.0, 1.0, 0.0, 1.0);

    assert!(approx(device.color_at(offscreen, fx, fy).unwrap(), yellow));
    assert_eq!(device.stencil_at(offscreen, fx, fy), Some(0));

    let interior = device.color_at(offscreen, cx, cy).unwrap();
    assert!(approx(interior, Vec4::ONE), "interior was {interior}");
    assert_eq!(device.stencil_at(offscreen, cx, cy), Some(1));

    // Far corner: untouched clear color.
    assert!(approx(device.color_at(offscreen, 0, 0).unwrap(), Vec4::new(0.0, 0.0, 0.0, 1.0)));
    assert_eq!(device.stencil_at(offscreen, 0, 0), Some(0));

    // Passthrough composite keeps the fringe.
    assert!(approx(device.color_at(RenderTarget::Default, fx, fy).unwrap(), yellow));
}

#[test]
fn outline_scale_and_color_follow_settings() {
    let mut settings = RendererSettings::default();
    settings.outline.color = [0.0, 1.0, 0.0];
    settings.outline.scale = 1.3;
    let (mut device, mut renderer) = setup(128, 128, settings);
    let mut scene = SceneStore::new(Camera::default());
    let quad = device.upload_mesh(primitives::quad(2.0, 2.0));
    scene.add_instance(Instance::new(quad, InstanceCategory::Outlined));

    let viewport = Viewport::new(128, 128);
    renderer.render_frame(&mut device, &scene, viewport, 0.0).unwrap();

    let color_texture = renderer.target().color_texture();
    let frame = FrameContext::new(0, &scene.camera, viewport, color_texture, 0.0);
    // Outside the default 1.1 fringe but inside 1.3.
    let (x, y) = frame.project_to_pixel(Vec3::new(1.2, 0.0, 0.0)).unwrap();
    let offscreen = RenderTarget::Offscreen(renderer.target().handle());
    let color = device.color_at(offscreen, x as u32, y as u32).unwrap();
    assert!(approx(color, Vec4::new(0.0, 1.0, 0.0, 1.0)), "fringe was {color}");
}

#[test]
fn stencil_is_cleared_every_frame() {
    let (mut device, mut renderer) = setup(64, 64, RendererSettings::default());
    let mut scene = SceneStore::new(Camera::default());
    let quad = device.upload_mesh(primitives::quad(2.0, 2.0));
    let id = scene.add_instance(Instance::new(quad, InstanceCategory::Outlined));

    let viewport = Viewport::new(64, 64);
    renderer.render_frame(&mut device, &scene, viewport, 0.0).unwrap();
    let offscreen = RenderTarget::Offscreen(renderer.target().handle());
    assert_eq!(device.stencil_at(offscreen, 32, 32), Some(1));

    // The stencil write mask of the last pass must not leak into the clear.
    scene.remove_instance(id);
    renderer.render_frame(&mut device, &scene, viewport, 0.0).unwrap();
    assert_eq!(device.stencil_at(offscreen, 32, 32), Some(0));
}

// ============================================================================
// Skybox & Transparency
// ============================================================================

#[test]
fn skybox_fills_background_and_restores_depth_compare() {
    let (mut device, mut renderer) = setup(32, 32, RendererSettings::default());
    let blue = ImageData::solid(1, 1, [0, 0, 255, 255]);
    let mut scene = SceneStore::new(Camera::default());
    scene.environment = Some(device.upload_cubemap(&std::array::from_fn(|_| blue.clone())));

    let stats = renderer
        .render_frame(&mut device, &scene, Viewport::new(32, 32), 0.0)
        .unwrap();
    assert_eq!(stats.draws_in(PassId::Skybox), 1);

    let offscreen = RenderTarget::Offscreen(renderer.target().handle());
    assert!(approx(device.color_at(offscreen, 16, 16).unwrap(), Vec4::new(0.0, 0.0, 1.0, 1.0)));
    assert_eq!(device.pipeline_state().depth.compare, CompareFunction::Less);
}

#[test]
fn skybox_skipped_without_environment() {
    let (mut device, mut renderer) = setup(32, 32, RendererSettings::default());
    let scene = SceneStore::new(Camera::default());

    let stats = renderer
        .render_frame(&mut device, &scene, Viewport::new(32, 32), 0.0)
        .unwrap();
    assert_eq!(stats.draws_in(PassId::Skybox), 0);
}

#[test]
fn transparent_pass_costs_nothing_when_empty() {
    let (mut device, mut renderer) = setup(32, 32, RendererSettings::default());
    let mut scene = SceneStore::new(Camera::default());
    let cube = device.upload_mesh(primitives::cube(1.0));
    scene.add_instance(Instance::new(cube, InstanceCategory::Opaque).at(Vec3::new(0.0, 0.0, -2.0)));

    device.reset_stats();
    let stats = renderer
        .render_frame(&mut device, &scene, Viewport::new(32, 32), 0.0)
        .unwrap();
    assert_eq!(stats.draws_in(PassId::Transparent), 0);
    // Only the baseline push at the start of the frame.
    assert_eq!(device.stats().cull_state_changes, 1);

    let quad = device.upload_mesh(primitives::quad(1.0, 1.0));
    scene.add_instance(Instance::new(quad, InstanceCategory::Translucent));

    device.reset_stats();
    let stats = renderer
        .render_frame(&mut device, &scene, Viewport::new(32, 32), 0.0)
        .unwrap();
    assert_eq!(stats.draws_in(PassId::Transparent), 1);
    // Culling off for the pass and back on afterwards.
    assert_eq!(device.stats().cull_state_changes, 3);
    assert!(device.pipeline_state().cull.enabled);
}

#[test]
fn translucent_instances_draw_far_to_near() {
    let (mut device, mut renderer) = setup(32, 32, RendererSettings::default());
    let mut scene = SceneStore::new(Camera::default());
    let quad = device.upload_mesh(primitives::quad(1.0, 1.0));

    let near = scene.add_instance(
        Instance::new(quad, InstanceCategory::Translucent).at(Vec3::new(0.0, 0.0, -1.0)),
    );
    let far = scene.add_instance(
        Instance::new(quad, InstanceCategory::Translucent).at(Vec3::new(0.0, 0.0, -5.0)),
    );
    let middle = scene.add_instance(
        Instance::new(quad, InstanceCategory::Translucent).at(Vec3::new(0.0, 0.0, -3.0)),
    );

    let stats = renderer
        .render_frame(&mut device, &scene, Viewport::new(32, 32), 0.0)
        .unwrap();
    assert_eq!(stats.draws_in(PassId::Transparent), 3);

    let order: Vec<_> = renderer.frame().transparent_pass().sorted().instances().collect();
    assert_eq!(order, vec![far, middle, near]);

    // Moving the camera behind the quads reverses the order.
    scene.camera.position = Vec3::new(0.0, 0.0, -10.0);
    renderer
        .render_frame(&mut device, &scene, Viewport::new(32, 32), 0.0)
        .unwrap();
    let order: Vec<_> = renderer.frame().transparent_pass().sorted().instances().collect();
    assert_eq!(order, vec![near, middle, far]);
}

#[test]
fn reflective_instances_use_fallback_environment() {
    let (mut device, mut renderer) = setup(32, 32, RendererSettings::default());
    let mut scene = SceneStore::new(Camera::default());
    let cube = device.upload_mesh(primitives::cube(1.0));
    scene.add_instance(Instance::new(cube, InstanceCategory::Reflective));

    let stats = renderer
        .render_frame(&mut device, &scene, Viewport::new(32, 32), 0.0)
        .unwrap();
    assert_eq!(stats.draws_in(PassId::Reflection), 1);
}

// ============================================================================
// State Controller
// ============================================================================

#[test]
fn controller_skips_redundant_device_calls() {
    let mut device = SoftwareDevice::new(8, 8);
    let mut gpu = GpuStateController::new();

    assert_eq!(gpu.restore_defaults(&mut device).count(), 4);
    let before = device.stats().state_changes();

    assert!(gpu.enter(PassId::Opaque, &mut device).stencil);
    assert!(gpu.enter(PassId::Opaque, &mut device).is_empty());
    assert_eq!(device.stats().state_changes(), before + 1);

    let saved = gpu.snapshot();
    let changes = gpu.enter(PassId::Skybox, &mut device);
    assert!(changes.depth && !changes.cull && !changes.blend);
    gpu.restore(&saved, &mut device);
    assert_eq!(device.pipeline_state(), &PassId::Opaque.state());
}

#[test]
fn state_changes_are_reported_per_frame() {
    let (mut device, mut renderer) = setup(32, 32, RendererSettings::default());
    let scene = SceneStore::new(Camera::default());

    let stats = renderer
        .render_frame(&mut device, &scene, Viewport::new(32, 32), 0.0)
        .unwrap();
    // Baseline push (4), then depth and stencil in and out of the composite.
    assert_eq!(stats.state_changes, 4 + 2 + 2);
}

// ============================================================================
// Target Lifecycle
// ============================================================================

#[test]
fn resize_recreates_target_once() {
    let (mut device, mut renderer) = setup(32, 32, RendererSettings::default());
    let scene = SceneStore::new(Camera::default());

    let stats = renderer
        .render_frame(&mut device, &scene, Viewport::new(48, 24), 0.0)
        .unwrap();
    assert!(stats.target_recreated);
    assert_eq!(renderer.target().size(), Viewport::new(48, 24));
    assert_eq!(device.live_targets(), 1);

    let stats = renderer
        .render_frame(&mut device, &scene, Viewport::new(48, 24), 0.0)
        .unwrap();
    assert!(!stats.target_recreated);
}

#[test]
fn oversized_target_is_fatal() {
    let mut device = SoftwareDevice::new(64, 64).with_max_target_size(32);
    let resources = device.standard_resources();

    let result = Renderer::new(
        RendererSettings::default(),
        resources,
        &mut device,
        Viewport::new(64, 64),
    );
    match result {
        Err(err @ HaloError::IncompleteTarget { .. }) => assert!(err.is_fatal()),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("an incomplete target must not produce a renderer"),
    }
}

#[test]
fn empty_viewport_is_rejected() {
    let mut device = SoftwareDevice::new(16, 16);
    let resources = device.standard_resources();

    let result = Renderer::new(
        RendererSettings::default(),
        resources,
        &mut device,
        Viewport::new(0, 16),
    );
    assert!(matches!(result, Err(HaloError::InvalidViewport { width: 0, height: 16 })));
}

#[test]
fn zero_sized_frame_is_skipped_not_fatal() {
    let (mut device, mut renderer) = setup(16, 16, RendererSettings::default());
    let scene = SceneStore::new(Camera::default());

    let err = renderer
        .render_frame(&mut device, &scene, Viewport::new(0, 0), 0.0)
        .unwrap_err();
    assert!(matches!(err, HaloError::InvalidViewport { .. }));
    assert!(!err.is_fatal());
    assert_eq!(renderer.frame_index(), 0);

    let stats = renderer
        .render_frame(&mut device, &scene, Viewport::new(16, 16), 0.0)
        .unwrap();
    assert_eq!(stats.frame_index, 0);
    assert_eq!(device.stats().presents, 1);
}

// ============================================================================
// Post-Processing
// ============================================================================

#[test]
fn passthrough_and_inversion_of_cleared_scene() {
    let (mut device, mut renderer) = setup(16, 16, RendererSettings::default());
    let scene = SceneStore::new(Camera::default());

    renderer
        .render_frame(&mut device, &scene, Viewport::new(16, 16), 0.0)
        .unwrap();
    let black = Vec4::new(0.0, 0.0, 0.0, 1.0);
    assert!(approx(device.color_at(RenderTarget::Default, 8, 8).unwrap(), black));

    let mut settings = RendererSettings::default();
    settings.post_process = PostProcessEffect::Inversion;
    renderer.set_settings(settings);
    renderer
        .render_frame(&mut device, &scene, Viewport::new(16, 16), 0.0)
        .unwrap();

    let presented = device.presented().unwrap();
    for (x, y) in [(0, 0), (8, 8), (15, 15)] {
        assert!(approx(presented.get(x, y).unwrap(), Vec4::ONE), "pixel ({x}, {y})");
    }
}

#[test]
fn grayscale_of_uniform_color() {
    let mut settings = RendererSettings::default();
    settings.clear_color = [1.0, 0.0, 0.0, 1.0];
    settings.post_process = PostProcessEffect::Grayscale;
    let (mut device, mut renderer) = setup(16, 16, settings);
    let scene = SceneStore::new(Camera::default());

    renderer
        .render_frame(&mut device, &scene, Viewport::new(16, 16), 0.0)
        .unwrap();
    let gray = device.color_at(RenderTarget::Default, 8, 8).unwrap();
    assert!(approx(gray, Vec4::new(0.2126, 0.2126, 0.2126, 1.0)), "got {gray}");
}
