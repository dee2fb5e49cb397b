//! 渲染节点 Trait
//!
//! Every pass of the frame pipeline implements [`RenderNode`]. The frame runs
//! nodes in a fixed sequence; a node never decides which node comes next.

use super::context::{FrameContext, PassContext};
use crate::scene::SceneStore;

pub trait RenderNode {
    /// Name used in frame statistics and logs.
    fn name(&self) -> &'static str;

    /// Per-frame CPU work that needs `&mut self` (sorting, list building).
    /// Runs for every node before any node draws.
    fn prepare(&mut self, _frame: &FrameContext, _scene: &SceneStore) {}

    /// Sets state, uniforms and textures, and issues draws.
    ///
    /// A node that has nothing to draw returns without touching device state.
    fn run(&self, ctx: &mut PassContext<'_>);
}
