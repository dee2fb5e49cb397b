//! Application Integration Tests
//!
//! Tests for:
//! - FrameLoop: close request, Escape, minimized window, camera input
//! - Settings files
//! - Missing assets resolving to the placeholder

use glam::Vec3;
use halo::app::{FlyCameraController, FrameLoop, Input, Key, MINIMIZED_IDLE, WindowHost};
use halo::assets::{AssetRegistry, ImageData, primitives};
use halo::backend::software::{SoftwareDevice, WrapMode};
use halo::renderer::PostProcessEffect;
use halo::scene::{Camera, Instance, InstanceCategory, Material, SceneStore};
use halo::{HaloError, Renderer, RendererSettings, Viewport};

const EPSILON: f32 = 1e-5;

/// Scripted window: a fixed number of polls, then a close request.
struct ScriptedHost {
    polls: u32,
    close_after: u32,
    size: (u32, u32),
    escape_on: Option<u32>,
    cursor: Vec<(f32, f32)>,
    idle_waits: u32,
}

impl ScriptedHost {
    fn closing_after(polls: u32) -> Self {
        Self {
            polls: 0,
            close_after: polls,
            size: (16, 16),
            escape_on: None,
            cursor: Vec::new(),
            idle_waits: 0,
        }
    }
}

impl WindowHost for ScriptedHost {
    fn close_requested(&self) -> bool {
        self.polls >= self.close_after
    }

    fn poll_events(&mut self, input: &mut Input) {
        self.polls += 1;
        if self.escape_on == Some(self.polls) {
            input.press(Key::Escape);
        }
        if let Some(&(x, y)) = self.cursor.get(self.polls as usize - 1) {
            input.handle_cursor_move(x, y);
        }
    }

    fn framebuffer_size(&self) -> (u32, u32) {
        self.size
    }

    fn wait_while_minimized(&mut self) {
        self.idle_waits += 1;
    }
}

fn setup() -> anyhow::Result<(SoftwareDevice, Renderer)> {
    let mut device = SoftwareDevice::new(16, 16);
    let resources = device.standard_resources();
    let renderer = Renderer::new(
        RendererSettings::default(),
        resources,
        &mut device,
        Viewport::new(16, 16),
    )?;
    Ok((device, renderer))
}

// ============================================================================
// Frame Loop
// ============================================================================

#[test]
fn loop_stops_on_close_request() -> anyhow::Result<()> {
    let (mut device, mut renderer) = setup()?;
    let mut scene = SceneStore::new(Camera::default());
    let mut host = ScriptedHost::closing_after(3);

    let summary = FrameLoop::new(FlyCameraController::default()).run(
        &mut host,
        &mut renderer,
        &mut device,
        &mut scene,
    )?;

    assert_eq!(summary.frames, 3);
    assert_eq!(summary.skipped, 0);
    assert_eq!(device.stats().presents, 3);
    assert_eq!(summary.last_frame.map(|f| f.frame_index), Some(2));
    Ok(())
}

#[test]
fn escape_ends_the_loop_after_the_current_frame() -> anyhow::Result<()> {
    let (mut device, mut renderer) = setup()?;
    let mut scene = SceneStore::new(Camera::default());
    let mut host = ScriptedHost::closing_after(100);
    host.escape_on = Some(2);

    let mut frame_loop = FrameLoop::new(FlyCameraController::default());
    let summary = frame_loop.run(&mut host, &mut renderer, &mut device, &mut scene)?;

    assert_eq!(summary.frames, 2);
    assert!(frame_loop.input().is_pressed(Key::Escape));
    Ok(())
}

#[test]
fn minimized_window_skips_rendering() -> anyhow::Result<()> {
    let (mut device, mut renderer) = setup()?;
    let mut scene = SceneStore::new(Camera::default());
    let mut host = ScriptedHost::closing_after(4);
    host.size = (0, 0);

    let summary = FrameLoop::new(FlyCameraController::default()).run(
        &mut host,
        &mut renderer,
        &mut device,
        &mut scene,
    )?;

    assert_eq!(summary.frames, 0);
    assert_eq!(summary.skipped, 4);
    assert_eq!(host.idle_waits, 4);
    assert!(summary.last_frame.is_none());
    assert_eq!(renderer.frame_index(), 0);
    Ok(())
}

#[test]
fn max_frames_ends_a_loop_that_stays_minimized() -> anyhow::Result<()> {
    let (mut device, mut renderer) = setup()?;
    let mut scene = SceneStore::new(Camera::default());
    let mut host = ScriptedHost::closing_after(u32::MAX);
    host.size = (0, 0);

    let summary = FrameLoop::new(FlyCameraController::default())
        .with_max_frames(3)
        .run(&mut host, &mut renderer, &mut device, &mut scene)?;

    assert_eq!(summary.frames, 0);
    assert_eq!(summary.skipped, 3);
    assert_eq!(host.idle_waits, 3);
    Ok(())
}

#[test]
fn default_idle_sleeps_between_minimized_polls() {
    struct Minimized;
    impl WindowHost for Minimized {
        fn close_requested(&self) -> bool {
            false
        }
        fn poll_events(&mut self, _input: &mut Input) {}
        fn framebuffer_size(&self) -> (u32, u32) {
            (0, 0)
        }
    }

    let start = std::time::Instant::now();
    Minimized.wait_while_minimized();
    assert!(start.elapsed() >= MINIMIZED_IDLE);
}

#[test]
fn max_frames_caps_the_loop() -> anyhow::Result<()> {
    let (mut device, mut renderer) = setup()?;
    let mut scene = SceneStore::new(Camera::default());
    let mut host = ScriptedHost::closing_after(u32::MAX);

    let summary = FrameLoop::new(FlyCameraController::default())
        .with_max_frames(5)
        .run(&mut host, &mut renderer, &mut device, &mut scene)?;

    assert_eq!(summary.frames, 5);
    Ok(())
}

#[test]
fn mouse_motion_turns_the_camera() -> anyhow::Result<()> {
    let (mut device, mut renderer) = setup()?;
    let mut scene = SceneStore::new(Camera::default());
    let mut host = ScriptedHost::closing_after(2);
    host.cursor = vec![(50.0, 50.0), (60.0, 50.0)];

    FrameLoop::new(FlyCameraController::default()).run(
        &mut host,
        &mut renderer,
        &mut device,
        &mut scene,
    )?;

    // 10 px × 0.1°/px; the first event only records the position.
    assert!((scene.camera.yaw - (-89.0)).abs() < EPSILON);
    assert!(scene.camera.pitch.abs() < EPSILON);
    Ok(())
}

#[test]
fn loop_follows_framebuffer_resize() -> anyhow::Result<()> {
    let (mut device, mut renderer) = setup()?;
    let mut scene = SceneStore::new(Camera::default());
    let mut host = ScriptedHost::closing_after(1);
    host.size = (24, 12);

    let summary = FrameLoop::new(FlyCameraController::default()).run(
        &mut host,
        &mut renderer,
        &mut device,
        &mut scene,
    )?;

    assert!(summary.last_frame.is_some_and(|f| f.target_recreated));
    assert_eq!(renderer.target().size(), Viewport::new(24, 12));
    assert_eq!(device.presented().map(|image| image.width()), Some(24));
    Ok(())
}

// ============================================================================
// Settings
// ============================================================================

#[test]
fn settings_load_from_file() -> anyhow::Result<()> {
    let path = std::env::temp_dir().join(format!("halo-settings-{}.json", std::process::id()));
    let json = r#"{ "post_process": "inversion", "clear_color": [0.1, 0.2, 0.3, 1.0] }"#;
    std::fs::write(&path, json)?;

    let settings = RendererSettings::load(&path);
    std::fs::remove_file(&path)?;
    let settings = settings?;

    assert_eq!(settings.post_process, PostProcessEffect::Inversion);
    assert_eq!(settings.clear_color, [0.1, 0.2, 0.3, 1.0]);
    assert_eq!(settings.outline, RendererSettings::default().outline);
    Ok(())
}

#[test]
fn missing_settings_file_is_an_io_error() {
    let err = RendererSettings::load("/nonexistent/halo/settings.json").unwrap_err();
    assert!(matches!(err, HaloError::Io(_)));
    assert!(err.is_fatal());
}

// ============================================================================
// Missing Assets
// ============================================================================

#[test]
fn missing_texture_renders_with_placeholder() -> anyhow::Result<()> {
    let (mut device, mut renderer) = setup()?;
    let placeholder = device.upload_texture(&ImageData::placeholder(), WrapMode::Repeat);
    let mut registry = AssetRegistry::new(placeholder);

    let loaded = Err(HaloError::MissingAsset {
        label: "container2.png".to_owned(),
        reason: "file not found".to_owned(),
    });
    let diffuse = registry.resolve_texture("container2.png", loaded);
    assert_eq!(diffuse, placeholder);
    assert!(registry.is_missing("container2.png"));

    let mut scene = SceneStore::new(Camera::default());
    let cube = device.upload_mesh(primitives::cube(1.0));
    scene.add_instance(
        Instance::new(cube, InstanceCategory::Opaque)
            .with_material(Material::textured(diffuse, None))
            .at(Vec3::new(0.0, 0.0, -1.0)),
    );

    let stats = renderer.render_frame(&mut device, &scene, Viewport::new(16, 16), 0.0)?;
    assert_eq!(stats.passes.len(), 6);
    Ok(())
}

#[test]
fn missing_cubemap_faces_are_replaced_individually() {
    let mut device = SoftwareDevice::new(4, 4);
    let placeholder = device.upload_texture(&ImageData::placeholder(), WrapMode::Repeat);
    let mut registry = AssetRegistry::new(placeholder);
    let sky = ImageData::solid(1, 1, [0, 0, 255, 255]);

    let faces = registry.resolve_cubemap_faces(
        "skybox",
        std::array::from_fn(|i| {
            if i == 2 {
                Err(HaloError::MissingAsset {
                    label: "top.jpg".to_owned(),
                    reason: "file not found".to_owned(),
                })
            } else {
                Ok(sky.clone())
            }
        }),
    );

    assert_eq!(faces[2], ImageData::placeholder());
    assert_eq!(faces[0], sky);
    assert!(registry.is_missing("skybox/top"));
    assert_eq!(registry.missing_count(), 1);
}
