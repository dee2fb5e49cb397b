//! Resource Handles
//!
//! GPU-resident resources are owned by the render device; the core only holds
//! these lightweight, copyable keys. They are issued by the device when the
//! asset collaborator uploads data and never dereferenced by the core itself.

use slotmap::new_key_type;

new_key_type! {
    /// An uploaded vertex/index buffer pair.
    pub struct MeshHandle;
    /// An uploaded 2D texture, cubemap, or offscreen color attachment.
    pub struct TextureHandle;
    /// A compiled shader program.
    pub struct ProgramHandle;
    /// An offscreen render target (color + depth/stencil attachments).
    pub struct TargetHandle;
}
