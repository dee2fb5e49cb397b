//! Scene Data
//!
//! The per-frame inputs the renderer reads: camera, lights and categorized
//! instances. Collaborators (input handling, animation) mutate the store
//! between frames.

pub mod camera;
pub mod instance;
pub mod light;
pub mod store;

pub use camera::Camera;
pub use instance::{AlphaMode, Instance, InstanceCategory, Material};
pub use light::{Attenuation, Light, LightColors, LightKind};
pub use store::{InstanceId, SceneStore};
