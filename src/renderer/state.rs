//! GPU State Controller
//!
//! Fixed-function state (depth, stencil, blend, culling) is described by plain
//! hashable values. Every pass declares the complete state it needs through
//! [`PassId::state`]; nothing is inherited implicitly from whichever pass ran
//! before it.
//!
//! [`GpuStateController`] mirrors what the device currently has configured and
//! only forwards categories that actually change, in the same spirit as a
//! tracked render pass skipping redundant pipeline binds.
//!
//! # 状态约定
//!
//! Only [`PassId::OutlineWriteStencil`] writes the stencil buffer. Every other
//! pass carries a zero stencil write mask.

use super::device::StateSink;

// ─── State Values ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareFunction {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

impl CompareFunction {
    /// Evaluates `incoming <op> stored`.
    #[inline]
    #[must_use]
    pub fn passes<T: PartialOrd>(self, incoming: T, stored: T) -> bool {
        match self {
            Self::Never => false,
            Self::Less => incoming < stored,
            Self::Equal => incoming == stored,
            Self::LessEqual => incoming <= stored,
            Self::Greater => incoming > stored,
            Self::NotEqual => incoming != stored,
            Self::GreaterEqual => incoming >= stored,
            Self::Always => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StencilOperation {
    Keep,
    Zero,
    Replace,
    IncrementClamp,
    DecrementClamp,
    Invert,
    IncrementWrap,
    DecrementWrap,
}

impl StencilOperation {
    /// New stencil value before the write mask is applied.
    #[inline]
    #[must_use]
    pub fn apply(self, stored: u8, reference: u8) -> u8 {
        match self {
            Self::Keep => stored,
            Self::Zero => 0,
            Self::Replace => reference,
            Self::IncrementClamp => stored.saturating_add(1),
            Self::DecrementClamp => stored.saturating_sub(1),
            Self::Invert => !stored,
            Self::IncrementWrap => stored.wrapping_add(1),
            Self::DecrementWrap => stored.wrapping_sub(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthState {
    pub test_enabled: bool,
    pub compare: CompareFunction,
    pub write_enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StencilState {
    pub test_enabled: bool,
    pub compare: CompareFunction,
    pub reference: u8,
    pub read_mask: u8,
    pub write_mask: u8,
    pub fail_op: StencilOperation,
    pub depth_fail_op: StencilOperation,
    pub pass_op: StencilOperation,
}

impl StencilState {
    /// Whether a draw under this state can modify the stencil buffer.
    #[must_use]
    pub fn writes(&self) -> bool {
        let ops = [self.fail_op, self.depth_fail_op, self.pass_op];
        self.test_enabled
            && self.write_mask != 0
            && ops.iter().any(|op| *op != StencilOperation::Keep)
    }

    /// Applies `op` to `stored`, honouring the write mask.
    #[inline]
    #[must_use]
    pub fn update(&self, op: StencilOperation, stored: u8) -> u8 {
        let value = op.apply(stored, self.reference);
        (stored & !self.write_mask) | (value & self.write_mask)
    }

    /// `(ref & read_mask) <op> (stored & read_mask)`.
    #[inline]
    #[must_use]
    pub fn test(&self, stored: u8) -> bool {
        self.compare
            .passes(self.reference & self.read_mask, stored & self.read_mask)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcAlpha,
    OneMinusSrcAlpha,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendState {
    pub enabled: bool,
    pub src_factor: BlendFactor,
    pub dst_factor: BlendFactor,
}

impl BlendState {
    /// Standard "over" compositing.
    pub const ALPHA: Self = Self {
        enabled: true,
        src_factor: BlendFactor::SrcAlpha,
        dst_factor: BlendFactor::OneMinusSrcAlpha,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Face {
    Front,
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrontFace {
    Ccw,
    Cw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CullState {
    pub enabled: bool,
    pub face: Face,
    pub front_face: FrontFace,
}

/// The full fixed-function configuration for a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineState {
    pub depth: DepthState,
    pub stencil: StencilState,
    pub blend: BlendState,
    pub cull: CullState,
}

impl PipelineState {
    /// Startup configuration: depth test on (less), stencil test on with an
    /// always-pass function and keep/keep/keep ops, alpha blending on,
    /// back-face culling on with counter-clockwise front faces.
    pub const BASELINE: Self = Self {
        depth: DepthState {
            test_enabled: true,
            compare: CompareFunction::Less,
            write_enabled: true,
        },
        stencil: StencilState {
            test_enabled: true,
            compare: CompareFunction::Always,
            reference: 0,
            read_mask: 0xFF,
            write_mask: 0xFF,
            fail_op: StencilOperation::Keep,
            depth_fail_op: StencilOperation::Keep,
            pass_op: StencilOperation::Keep,
        },
        blend: BlendState::ALPHA,
        cull: CullState {
            enabled: true,
            face: Face::Back,
            front_face: FrontFace::Ccw,
        },
    };

    const fn with_stencil_write_mask(mut self, mask: u8) -> Self {
        self.stencil.write_mask = mask;
        self
    }
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::BASELINE
    }
}

// ─── Pass Identities ──────────────────────────────────────────────────────────

/// Every state configuration the frame pipeline can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassId {
    Baseline,
    Opaque,
    OutlineWriteStencil,
    OutlineSilhouette,
    OutlineRestore,
    Reflection,
    Skybox,
    Transparent,
    PostProcess,
}

impl PassId {
    pub const COUNT: usize = 9;

    pub const ALL: [Self; Self::COUNT] = [
        Self::Baseline,
        Self::Opaque,
        Self::OutlineWriteStencil,
        Self::OutlineSilhouette,
        Self::OutlineRestore,
        Self::Reflection,
        Self::Skybox,
        Self::Transparent,
        Self::PostProcess,
    ];

    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Baseline => "Baseline",
            Self::Opaque => "Opaque",
            Self::OutlineWriteStencil => "Outline/WriteStencil",
            Self::OutlineSilhouette => "Outline/Silhouette",
            Self::OutlineRestore => "Outline/Restore",
            Self::Reflection => "Reflection",
            Self::Skybox => "Skybox",
            Self::Transparent => "Transparent",
            Self::PostProcess => "PostProcess",
        }
    }

    /// The complete state this pass runs under.
    #[must_use]
    pub const fn state(self) -> PipelineState {
        let base = PipelineState::BASELINE;
        match self {
            Self::Baseline | Self::OutlineRestore => base,
            Self::Opaque | Self::Reflection => base.with_stencil_write_mask(0),
            Self::OutlineWriteStencil => {
                let mut state = base;
                state.stencil.compare = CompareFunction::Always;
                state.stencil.reference = 1;
                state.stencil.write_mask = 0xFF;
                state.stencil.pass_op = StencilOperation::Replace;
                state
            }
            Self::OutlineSilhouette => {
                let mut state = base.with_stencil_write_mask(0);
                state.stencil.compare = CompareFunction::NotEqual;
                state.stencil.reference = 1;
                state
            }
            Self::Skybox => {
                // 天空盒深度为 1.0，需要 LessEqual 才能通过清除值
                let mut state = base.with_stencil_write_mask(0);
                state.depth.compare = CompareFunction::LessEqual;
                state
            }
            Self::Transparent => {
                // 窗户类物体两面都可见
                let mut state = base.with_stencil_write_mask(0);
                state.cull.enabled = false;
                state
            }
            Self::PostProcess => {
                let mut state = base.with_stencil_write_mask(0);
                state.depth.test_enabled = false;
                state
            }
        }
    }
}

// ─── Controller ───────────────────────────────────────────────────────────────

/// Which state categories an `apply` call forwarded to the device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateChanges {
    pub depth: bool,
    pub stencil: bool,
    pub blend: bool,
    pub cull: bool,
}

impl StateChanges {
    #[must_use]
    pub fn count(self) -> usize {
        usize::from(self.depth)
            + usize::from(self.stencil)
            + usize::from(self.blend)
            + usize::from(self.cull)
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.count() == 0
    }
}

/// Saved controller state, used by passes that must hand back exactly what
/// they found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateSnapshot {
    state: PipelineState,
    pass: PassId,
}

impl StateSnapshot {
    #[must_use]
    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    #[must_use]
    pub fn pass(&self) -> PassId {
        self.pass
    }
}

/// Tracks the device's fixed-function state and applies per-pass
/// configurations as minimal diffs.
#[derive(Debug, Clone)]
pub struct GpuStateController {
    /// `None` until the first full push; the device state is unknown.
    current: Option<PipelineState>,
    active_pass: PassId,
}

impl Default for GpuStateController {
    fn default() -> Self {
        Self::new()
    }
}

impl GpuStateController {
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: None,
            active_pass: PassId::Baseline,
        }
    }

    /// Forgets the tracked state. The next `apply` pushes every category.
    pub fn invalidate(&mut self) {
        self.current = None;
    }

    /// Pushes the full baseline configuration regardless of what is tracked.
    pub fn restore_defaults<S: StateSink + ?Sized>(&mut self, device: &mut S) -> StateChanges {
        self.invalidate();
        self.active_pass = PassId::Baseline;
        self.apply(&PipelineState::BASELINE, device)
    }

    /// Switches to the state declared by `pass`. Calling it twice in a row
    /// issues no device calls the second time.
    pub fn enter<S: StateSink + ?Sized>(&mut self, pass: PassId, device: &mut S) -> StateChanges {
        let changes = self.apply(&pass.state(), device);
        if !changes.is_empty() || self.active_pass != pass {
            log::trace!("enter {} ({} state changes)", pass.name(), changes.count());
        }
        self.active_pass = pass;
        changes
    }

    /// Applies `target`, forwarding only categories that differ from the
    /// tracked state.
    pub fn apply<S: StateSink + ?Sized>(
        &mut self,
        target: &PipelineState,
        device: &mut S,
    ) -> StateChanges {
        let current = self.current;
        let changes = StateChanges {
            depth: current.is_none_or(|c| c.depth != target.depth),
            stencil: current.is_none_or(|c| c.stencil != target.stencil),
            blend: current.is_none_or(|c| c.blend != target.blend),
            cull: current.is_none_or(|c| c.cull != target.cull),
        };

        if changes.depth {
            device.set_depth_state(&target.depth);
        }
        if changes.stencil {
            device.set_stencil_state(&target.stencil);
        }
        if changes.blend {
            device.set_blend_state(&target.blend);
        }
        if changes.cull {
            device.set_cull_state(&target.cull);
        }

        self.current = Some(*target);
        changes
    }

    /// Captures the tracked state. Before the first push this reports the
    /// baseline.
    #[must_use]
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            state: self.current.unwrap_or(PipelineState::BASELINE),
            pass: self.active_pass,
        }
    }

    /// Returns the device to a previously captured state.
    pub fn restore<S: StateSink + ?Sized>(
        &mut self,
        snapshot: &StateSnapshot,
        device: &mut S,
    ) -> StateChanges {
        let changes = self.apply(&snapshot.state, device);
        self.active_pass = snapshot.pass;
        changes
    }

    #[must_use]
    pub fn current(&self) -> Option<&PipelineState> {
        self.current.as_ref()
    }

    #[must_use]
    pub fn active_pass(&self) -> PassId {
        self.active_pass
    }
}
