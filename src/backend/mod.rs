//! Render Devices
//!
//! Implementations of [`RenderDevice`](crate::renderer::RenderDevice):
//!
//! - [`software`]: deterministic CPU rasterizer, always available.
//! - `wgpu`: GPU device behind the `wgpu` feature.

pub mod software;

#[cfg(feature = "wgpu")]
pub mod wgpu;
