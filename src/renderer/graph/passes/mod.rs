//! 渲染 Pass 实现
//!
//! The fixed frame sequence:
//!
//! ```text
//! Opaque → Outline → Reflection → Skybox → Transparent ┐ offscreen target
//!                                                       ↓
//!                                          PostProcess → default framebuffer
//! ```

mod lighting;
mod opaque;
mod outline;
mod post_process;
mod reflection;
mod skybox;
mod transparent;

pub use opaque::OpaquePass;
pub use outline::{OutlinePass, OutlineStage};
pub use post_process::PostProcessPass;
pub use reflection::ReflectionPass;
pub use skybox::SkyboxPass;
pub use transparent::TransparentPass;
