//! # Halo
//!
//! A multi-pass forward renderer built around explicit fixed-function state.
//!
//! Each frame renders the scene into an offscreen color + depth/stencil
//! target and composites it onto the default framebuffer:
//!
//! ```text
//! Opaque → Outline (stencil) → Reflection → Skybox → Transparent (sorted)
//!        → PostProcess → present
//! ```
//!
//! Every pass declares the complete depth/stencil/blend/cull state it needs
//! and the [`GpuStateController`](renderer::GpuStateController) forwards only
//! what changes. Rendering goes through the [`RenderDevice`](renderer::RenderDevice)
//! trait; [`SoftwareDevice`] implements it on the CPU and `WgpuDevice`
//! (feature `wgpu`) on the GPU.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod app;
pub mod assets;
pub mod backend;
pub mod errors;
pub mod renderer;
pub mod scene;

pub use app::{FrameLoop, WindowHost, init_logging};
pub use assets::{AssetRegistry, ImageData, MeshData, primitives};
pub use backend::software::SoftwareDevice;
#[cfg(feature = "wgpu")]
pub use backend::wgpu::WgpuDevice;
pub use errors::{HaloError, Result};
pub use renderer::{FrameStats, Renderer, RendererSettings, Viewport};
pub use scene::{Camera, Instance, InstanceCategory, Light, SceneStore};
