use glam::Vec2;
use rustc_hash::FxHashSet;

use crate::scene::Camera;

/// Keys the frame loop and the camera controllers care about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    W,
    A,
    S,
    D,
    LeftShift,
    Escape,
}

#[derive(Default, Debug, Clone)]
pub struct Input {
    /// 上一次鼠标位置；首个事件只记录位置，不产生位移
    last_cursor: Option<Vec2>,
    /// 上一帧到这一帧的鼠标位移 (dx, dy)，y 向下
    pub cursor_delta: Vec2,
    /// 这一帧的滚轮滚动量
    pub scroll_delta: f32,
    keys: FxHashSet<Key>,
}

impl Input {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// 帧末清理（清除 delta 状态，防止一直旋转）
    pub fn end_frame(&mut self) {
        self.cursor_delta = Vec2::ZERO;
        self.scroll_delta = 0.0;
    }

    pub fn handle_cursor_move(&mut self, x: f32, y: f32) {
        let position = Vec2::new(x, y);
        if let Some(last) = self.last_cursor {
            self.cursor_delta += position - last;
        }
        self.last_cursor = Some(position);
    }

    pub fn handle_scroll(&mut self, delta: f32) {
        self.scroll_delta += delta;
    }

    pub fn press(&mut self, key: Key) {
        self.keys.insert(key);
    }

    pub fn release(&mut self, key: Key) {
        self.keys.remove(&key);
    }

    #[must_use]
    pub fn is_pressed(&self, key: Key) -> bool {
        self.keys.contains(&key)
    }
}

/// Mutates the camera from the input gathered for one frame.
pub trait CameraController {
    fn update(&mut self, camera: &mut Camera, input: &Input, dt: f32);
}

/// WASD movement, mouse look and scroll zoom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlyCameraController {
    /// World units per second.
    pub speed: f32,
    /// Speed multiplier while `LeftShift` is held.
    pub boost: f32,
    /// Degrees per pixel of mouse movement.
    pub sensitivity: f32,
}

impl Default for FlyCameraController {
    fn default() -> Self {
        Self {
            speed: 2.5,
            boost: 2.0,
            sensitivity: 0.1,
        }
    }
}

impl CameraController for FlyCameraController {
    fn update(&mut self, camera: &mut Camera, input: &Input, dt: f32) {
        let mut velocity = self.speed * dt;
        if input.is_pressed(Key::LeftShift) {
            velocity *= self.boost;
        }

        let (front, right) = (camera.front(), camera.right());
        let mut step = glam::Vec3::ZERO;
        if input.is_pressed(Key::W) {
            step += front;
        }
        if input.is_pressed(Key::S) {
            step -= front;
        }
        if input.is_pressed(Key::A) {
            step -= right;
        }
        if input.is_pressed(Key::D) {
            step += right;
        }
        camera.position += step * velocity;

        // 屏幕 y 向下，俯仰角向上为正
        let look = input.cursor_delta * self.sensitivity;
        if look != Vec2::ZERO {
            camera.rotate(look.x, -look.y);
        }
        if input.scroll_delta != 0.0 {
            camera.zoom_by(input.scroll_delta);
        }
    }
}
