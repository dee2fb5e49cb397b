//! Transparent Render Pass
//!
//! 按距离从远到近绘制半透明物体。
//!
//! # 数据流
//! ```text
//! SceneStore (Translucent) → TransparencySorter → SortedDrawList → TransparentPass
//! ```
//!
//! Culling is disabled for the pass so both faces of thin geometry show, and
//! re-enabled afterwards. With no translucent instances the pass returns
//! before touching any state.

use crate::renderer::graph::context::{FrameContext, PassContext};
use crate::renderer::graph::node::RenderNode;
use crate::renderer::graph::sort::{SortedDrawList, TransparencySorter};
use crate::renderer::state::PassId;
use crate::scene::{InstanceCategory, SceneStore};

#[derive(Debug, Default)]
pub struct TransparentPass {
    sorted: SortedDrawList,
}

impl TransparentPass {
    #[must_use]
    pub fn new() -> Self {
        Self {
            sorted: SortedDrawList::with_capacity(64),
        }
    }

    /// This frame's back-to-front order.
    #[must_use]
    pub fn sorted(&self) -> &SortedDrawList {
        &self.sorted
    }
}

impl RenderNode for TransparentPass {
    fn name(&self) -> &'static str {
        "Transparent"
    }

    fn prepare(&mut self, frame: &FrameContext, scene: &SceneStore) {
        let items = scene
            .instances_of(InstanceCategory::Translucent)
            .map(|(id, instance)| (id, instance.world_position()));
        TransparencySorter::sort_into(frame.camera_position, items, &mut self.sorted);
    }

    fn run(&self, ctx: &mut PassContext<'_>) {
        if self.sorted.is_empty() {
            return;
        }

        let saved = ctx.snapshot();
        ctx.enter(PassId::Transparent);

        let scene = ctx.scene;
        let program = ctx.resources.programs.alpha;
        let fallback = ctx.resources.fallback_texture;

        ctx.use_program(program);
        ctx.set_camera_uniforms();
        ctx.set_uniform("texture1", 0_i32);

        for entry in &self.sorted {
            let Some(instance) = scene.instance(entry.instance) else {
                continue;
            };
            ctx.bind_texture(0, instance.material.diffuse.unwrap_or(fallback));
            ctx.set_uniform("alphaCutoff", instance.material.alpha_mode.cutoff());
            ctx.set_model(&instance.transform);
            ctx.draw(instance.mesh);
        }

        ctx.restore(&saved);
    }
}
