//! 渲染管线组织
//!
//! 提供：
//! - RenderFrame: the fixed per-frame pass sequence
//! - RenderNode: the pass interface
//! - FrameContext / PassContext: per-frame data and the per-pass device view
//! - TransparencySorter: back-to-front ordering for blended instances
//! - passes: the concrete passes

pub mod context;
pub mod frame;
pub mod node;
pub mod passes;
pub mod sort;

pub use context::{FrameContext, FrameStats, PassContext};
pub use frame::RenderFrame;
pub use node::RenderNode;
pub use passes::{
    OpaquePass, OutlinePass, OutlineStage, PostProcessPass, ReflectionPass, SkyboxPass,
    TransparentPass,
};
pub use sort::{SortedDrawList, SortedEntry, TransparencySorter};
