use glam::{Mat3, Mat4, Vec3};

/// Free-flying perspective camera described by position and Euler angles.
///
/// The input collaborator mutates it between frames; the renderer only reads
/// it when building a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub world_up: Vec3,
    /// Degrees. -90 looks down -Z.
    pub yaw: f32,
    /// Degrees, clamped to ±89 by [`Camera::rotate`].
    pub pitch: f32,
    /// Vertical field of view in degrees.
    pub zoom: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 3.0),
            world_up: Vec3::Y,
            yaw: -90.0,
            pitch: 0.0,
            zoom: 45.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

impl Camera {
    pub const MIN_ZOOM: f32 = 1.0;
    pub const MAX_ZOOM: f32 = 45.0;

    #[must_use]
    pub fn new(position: Vec3, world_up: Vec3, yaw: f32, pitch: f32) -> Self {
        Self {
            position,
            world_up,
            yaw,
            pitch,
            ..Self::default()
        }
    }

    /// Unit view direction.
    #[must_use]
    pub fn front(&self) -> Vec3 {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos()).normalize()
    }

    #[must_use]
    pub fn right(&self) -> Vec3 {
        self.front().cross(self.world_up).normalize()
    }

    #[must_use]
    pub fn up(&self) -> Vec3 {
        self.right().cross(self.front()).normalize()
    }

    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front(), self.up())
    }

    /// The view matrix with its translation removed, so geometry drawn with it
    /// stays centered on the eye.
    #[must_use]
    pub fn rotation_only_view(&self) -> Mat4 {
        Mat4::from_mat3(Mat3::from_mat4(self.view_matrix()))
    }

    /// Perspective projection for the given aspect ratio.
    #[must_use]
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        // glam 的 perspective_rh 输出 0..1 深度范围
        Mat4::perspective_rh(self.zoom.to_radians(), aspect, self.near, self.far)
    }

    /// Applies a yaw/pitch delta in degrees, keeping pitch away from the poles.
    pub fn rotate(&mut self, yaw_delta: f32, pitch_delta: f32) {
        self.yaw += yaw_delta;
        self.pitch = (self.pitch + pitch_delta).clamp(-89.0, 89.0);
    }

    /// Narrows or widens the field of view.
    pub fn zoom_by(&mut self, delta: f32) {
        self.zoom = (self.zoom - delta).clamp(Self::MIN_ZOOM, Self::MAX_ZOOM);
    }
}
