//! Application Loop
//!
//! [`FrameLoop`] drives the renderer from a [`WindowHost`]:
//!
//! 1. Stop if the host reports a close request (or Escape is held).
//! 2. Poll events into [`Input`] and let the [`CameraController`] move the
//!    camera.
//! 3. Skip frames while the framebuffer is empty (minimized window), idling
//!    through [`WindowHost::wait_while_minimized`] instead of spinning.
//! 4. Render one frame; the renderer recreates its offscreen target when the
//!    framebuffer size changed.
//!
//! The close flag is only checked at the top of an iteration, so a frame that
//! has started always completes.

pub mod input;
pub mod window;

use std::time::Instant;

pub use input::{CameraController, FlyCameraController, Input, Key};
pub use window::{MINIMIZED_IDLE, WindowHost};

use crate::errors::Result;
use crate::renderer::{FrameStats, RenderDevice, Renderer, Viewport};
use crate::scene::SceneStore;

/// Installs `env_logger` with an `info` default, overridable through
/// `RUST_LOG`. Calling it more than once is harmless.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}

/// What a finished loop did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopSummary {
    pub frames: u64,
    /// Iterations skipped because the framebuffer was empty.
    pub skipped: u64,
    pub last_frame: Option<FrameStats>,
}

pub struct FrameLoop<C: CameraController> {
    controller: C,
    input: Input,
    max_frames: Option<u64>,
}

impl<C: CameraController> FrameLoop<C> {
    #[must_use]
    pub fn new(controller: C) -> Self {
        Self {
            controller,
            input: Input::new(),
            max_frames: None,
        }
    }

    /// Stops after `frames` iterations even without a close request.
    /// Skipped (minimized) iterations count too, so a host that never
    /// restores its window still ends.
    #[must_use]
    pub fn with_max_frames(mut self, frames: u64) -> Self {
        self.max_frames = Some(frames);
        self
    }

    #[must_use]
    pub fn input(&self) -> &Input {
        &self.input
    }

    /// Runs until the host asks to close. Fatal renderer errors end the loop.
    pub fn run(
        &mut self,
        host: &mut dyn WindowHost,
        renderer: &mut Renderer,
        device: &mut dyn RenderDevice,
        scene: &mut SceneStore,
    ) -> Result<LoopSummary> {
        let mut summary = LoopSummary::default();
        let start = Instant::now();
        let mut last = start;

        loop {
            if host.close_requested() || self.input.is_pressed(Key::Escape) {
                log::info!("Close requested after {} frames", summary.frames);
                break;
            }
            if self
                .max_frames
                .is_some_and(|max| summary.frames + summary.skipped >= max)
            {
                break;
            }

            host.poll_events(&mut self.input);

            let now = Instant::now();
            let dt = now.duration_since(last).as_secs_f32();
            last = now;

            self.controller.update(&mut scene.camera, &self.input, dt);
            self.input.end_frame();

            let (width, height) = host.framebuffer_size();
            let viewport = Viewport::new(width, height);
            if viewport.is_empty() {
                summary.skipped += 1;
                host.wait_while_minimized();
                continue;
            }

            let time = now.duration_since(start).as_secs_f32();
            let stats = renderer.render_frame(device, scene, viewport, time)?;
            summary.frames += 1;
            summary.last_frame = Some(stats);
        }

        Ok(summary)
    }
}
