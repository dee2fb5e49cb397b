//! Asset Data
//!
//! CPU-side descriptions of the things the renderer draws with, plus the
//! handles a render device issues once they are resident.
//!
//! - [`handle`]: opaque keys for meshes, textures, programs and targets
//! - [`mesh`] / [`primitives`]: vertex layout and built-in geometry
//! - [`image`]: RGBA8 images and the cubemap face convention
//! - [`registry`]: placeholder substitution for assets that failed to load

pub mod handle;
pub mod image;
pub mod mesh;
pub mod primitives;
pub mod registry;

pub use handle::{MeshHandle, ProgramHandle, TargetHandle, TextureHandle};
pub use image::{CubeFace, ImageData};
pub use mesh::{MeshData, Vertex};
pub use registry::AssetRegistry;
