//! wgpu Render Device
//!
//! [`WgpuDevice`] implements [`RenderDevice`] on top of wgpu. wgpu has no
//! immediate-mode state machine, so the device records what the passes ask
//! for and replays it when the bound target changes or the frame is
//! presented:
//!
//! # 数据流
//!
//! ```text
//! set_*_state / set_uniform / bind_texture ──► current device state
//! clear / draw_mesh ──► RecordedOp (pipeline key + uniform bytes + textures)
//! bind_target / present ──► flush: one render pass per run of draws
//! ```
//!
//! - Fixed-function state becomes a [`RenderPipelineKey`]; pipelines are
//!   created once and cached.
//! - The stencil reference is set dynamically per draw.
//! - Uniforms are packed into std140 blocks and uploaded through a single
//!   dynamic-offset uniform buffer per flush.
//! - Clears become load operations of the next render pass.

mod convert;
mod pipeline_key;
mod programs;
mod tracked_pass;

use glam::Vec4;
use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::SlotMap;
use smallvec::SmallVec;
use wgpu::util::DeviceExt;

pub use convert::{DEPTH_STENCIL_FORMAT, OFFSCREEN_COLOR_FORMAT};
pub use pipeline_key::RenderPipelineKey;
pub use programs::{MAX_POINT_LIGHTS, ProgramKind};

use self::programs::SlotDimension;
use self::tracked_pass::TrackedRenderPass;
use crate::assets::{
    ImageData, MeshData, MeshHandle, ProgramHandle, TargetHandle, TextureHandle, Vertex,
    primitives,
};
use crate::errors::{HaloError, Result};
use crate::renderer::device::{
    ClearFlags, OffscreenAttachments, RenderDevice, RenderTarget, StateSink, TargetStatus,
    UniformBinder,
};
use crate::renderer::resources::{BuiltinMeshes, PipelineResources, ProgramSet};
use crate::renderer::state::{BlendState, CullState, DepthState, PipelineState, StencilState};
use crate::renderer::uniforms::{UniformBlock, UniformMap, UniformValue};

const MAX_TEXTURE_UNITS: usize = 8;

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 3] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];

// ─── Resources ────────────────────────────────────────────────────────────────

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

enum GpuTexture {
    Image {
        view: wgpu::TextureView,
        dimension: SlotDimension,
    },
    Attachment(TargetHandle),
}

struct TargetViews {
    color: wgpu::TextureView,
    depth: wgpu::TextureView,
}

struct GpuTarget {
    views: Option<TargetViews>,
    color: TextureHandle,
    status: TargetStatus,
}

struct GpuProgram {
    kind: ProgramKind,
    block: UniformBlock,
    values: UniformMap,
}

/// Shader module and layouts shared by every pipeline of one program kind.
struct ProgramLayouts {
    shader: wgpu::ShaderModule,
    texture_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
}

enum DefaultTarget {
    Window {
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
        frame: Option<wgpu::SurfaceTexture>,
    },
    Headless {
        color: wgpu::TextureView,
        width: u32,
        height: u32,
    },
}

// ─── Recording ────────────────────────────────────────────────────────────────

struct RecordedDraw {
    pipeline: usize,
    kind: ProgramKind,
    stencil_reference: u32,
    uniforms: Vec<u8>,
    textures: SmallVec<[Option<TextureHandle>; 2]>,
    mesh: MeshHandle,
}

enum RecordedOp {
    Clear {
        color: Option<Vec4>,
        depth: bool,
        stencil: bool,
    },
    Draw(RecordedDraw),
}

#[derive(Default)]
struct LoadOps {
    color: Option<Vec4>,
    depth: bool,
    stencil: bool,
}

/// Bind groups built for one draw before the render pass begins.
struct PreparedDraw {
    uniform_offset: u32,
    textures: wgpu::BindGroup,
}

// ─── Device ───────────────────────────────────────────────────────────────────

pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,

    default_target: DefaultTarget,
    default_depth: wgpu::TextureView,

    meshes: SlotMap<MeshHandle, GpuMesh>,
    textures: SlotMap<TextureHandle, GpuTexture>,
    programs: SlotMap<ProgramHandle, GpuProgram>,
    targets: SlotMap<TargetHandle, GpuTarget>,

    uniform_layout: wgpu::BindGroupLayout,
    uniform_binding_size: u64,
    uniform_stride: u64,
    program_layouts: Vec<ProgramLayouts>,
    repeat_sampler: wgpu::Sampler,
    clamp_sampler: wgpu::Sampler,
    fallback_2d: wgpu::TextureView,
    fallback_cube: wgpu::TextureView,

    pipelines: Vec<wgpu::RenderPipeline>,
    pipeline_lookup: FxHashMap<RenderPipelineKey, usize>,

    bound_target: RenderTarget,
    bound_program: Option<ProgramHandle>,
    texture_units: [Option<TextureHandle>; MAX_TEXTURE_UNITS],
    state: PipelineState,
    recorded: Vec<RecordedOp>,

    reported: FxHashSet<String>,
}

impl WgpuDevice {
    /// Creates a device rendering into an offscreen default target.
    pub fn headless(width: u32, height: u32) -> Result<Self> {
        pollster::block_on(Self::init(None, width, height, true))
    }

    /// Creates a device presenting to `window`.
    pub async fn with_window(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
        vsync: bool,
    ) -> Result<Self> {
        Self::init(Some(window.into()), width, height, vsync).await
    }

    async fn init(
        window: Option<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
        vsync: bool,
    ) -> Result<Self> {
        let instance = wgpu::Instance::default();
        let surface = window
            .map(|w| instance.create_surface(w))
            .transpose()
            .map_err(|e| HaloError::Surface(e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: surface.as_ref(),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| HaloError::AdapterRequestFailed(e.to_string()))?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Halo Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::Performance,
                ..Default::default()
            })
            .await?;

        let default_target = match surface {
            Some(surface) => {
                let mut config = surface
                    .get_default_config(&adapter, width.max(1), height.max(1))
                    .ok_or_else(|| {
                        HaloError::AdapterRequestFailed("Surface not supported by adapter".into())
                    })?;
                config.present_mode = if vsync {
                    wgpu::PresentMode::AutoVsync
                } else {
                    wgpu::PresentMode::AutoNoVsync
                };
                surface.configure(&device, &config);
                DefaultTarget::Window {
                    surface,
                    config,
                    frame: None,
                }
            }
            None => DefaultTarget::Headless {
                color: create_attachment(
                    &device,
                    "Default Color",
                    width,
                    height,
                    OFFSCREEN_COLOR_FORMAT,
                ),
                width,
                height,
            },
        };
        let default_depth =
            create_attachment(&device, "Default Depth", width, height, DEPTH_STENCIL_FORMAT);

        let uniform_binding_size = ProgramKind::ALL
            .iter()
            .map(|k| k.uniform_layout().size() as u64)
            .max()
            .unwrap_or(16);
        let alignment = u64::from(device.limits().min_uniform_buffer_offset_alignment.max(1));
        let uniform_stride = uniform_binding_size.div_ceil(alignment) * alignment;

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Uniform Block Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(uniform_binding_size),
                },
                count: None,
            }],
        });

        let program_layouts = ProgramKind::ALL
            .iter()
            .map(|kind| create_program_layouts(&device, &uniform_layout, *kind))
            .collect();

        let sampler = |label, address_mode| {
            device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some(label),
                address_mode_u: address_mode,
                address_mode_v: address_mode,
                address_mode_w: address_mode,
                mag_filter: wgpu::FilterMode::Nearest,
                min_filter: wgpu::FilterMode::Nearest,
                ..Default::default()
            })
        };
        let repeat_sampler = sampler("Repeat Sampler", wgpu::AddressMode::Repeat);
        let clamp_sampler = sampler("Clamp Sampler", wgpu::AddressMode::ClampToEdge);

        let placeholder = ImageData::placeholder();
        let fallback_2d = upload_layers(
            &device,
            &queue,
            "Fallback 2D",
            std::slice::from_ref(&placeholder),
            SlotDimension::D2,
        );
        let fallback_cube = upload_layers(
            &device,
            &queue,
            "Fallback Cube",
            &std::array::from_fn::<_, 6, _>(|_| placeholder.clone()),
            SlotDimension::Cube,
        );

        let mode = match default_target {
            DefaultTarget::Window { .. } => "windowed",
            DefaultTarget::Headless { .. } => "headless",
        };
        log::info!("wgpu device ready ({width}x{height}, {mode})");

        Ok(Self {
            device,
            queue,
            default_target,
            default_depth,
            meshes: SlotMap::with_key(),
            textures: SlotMap::with_key(),
            programs: SlotMap::with_key(),
            targets: SlotMap::with_key(),
            uniform_layout,
            uniform_binding_size,
            uniform_stride,
            program_layouts,
            repeat_sampler,
            clamp_sampler,
            fallback_2d,
            fallback_cube,
            pipelines: Vec::new(),
            pipeline_lookup: FxHashMap::default(),
            bound_target: RenderTarget::Default,
            bound_program: None,
            texture_units: [None; MAX_TEXTURE_UNITS],
            state: PipelineState::BASELINE,
            recorded: Vec::new(),
            reported: FxHashSet::default(),
        })
    }

    // ========================================================================
    // Uploads
    // ========================================================================

    pub fn upload_mesh(&mut self, mesh: &MeshData) -> MeshHandle {
        let buffer = |label, bytes: &[u8], usage| {
            // 空缓冲无法绑定
            let contents = if bytes.is_empty() { &[0u8; 4][..] } else { bytes };
            self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage,
            })
        };
        let gpu = GpuMesh {
            vertex_buffer: buffer("Mesh Vertices", mesh.vertex_bytes(), wgpu::BufferUsages::VERTEX),
            index_buffer: buffer("Mesh Indices", mesh.index_bytes(), wgpu::BufferUsages::INDEX),
            index_count: mesh.indices.len() as u32,
        };
        self.meshes.insert(gpu)
    }

    /// Images whose pixel buffer does not match their dimensions are
    /// replaced by [`ImageData::placeholder`].
    pub fn upload_texture(&mut self, image: &ImageData) -> TextureHandle {
        let placeholder;
        let image = if image.is_well_formed() {
            image
        } else {
            log::warn!(
                "Texture {}x{} has {} bytes, expected {}; using placeholder",
                image.width,
                image.height,
                image.pixels.len(),
                image.expected_len()
            );
            placeholder = ImageData::placeholder();
            &placeholder
        };
        let layers = std::slice::from_ref(image);
        let view = upload_layers(&self.device, &self.queue, "Texture", layers, SlotDimension::D2);
        self.textures.insert(GpuTexture::Image {
            view,
            dimension: SlotDimension::D2,
        })
    }

    /// Faces in [`CubeFace::ALL`](crate::assets::CubeFace::ALL) order. Faces
    /// whose size differs from the first, or whose pixel buffer is short, are
    /// replaced by solid magenta.
    pub fn upload_cubemap(&mut self, faces: &[ImageData; 6]) -> TextureHandle {
        let (width, height) = (faces[0].width, faces[0].height);
        let faces: [ImageData; 6] = std::array::from_fn(|i| {
            let face = &faces[i];
            if face.width == width && face.height == height && face.is_well_formed() {
                face.clone()
            } else {
                log::warn!(
                    "Cubemap face {i} is {}x{} with {} bytes, expected {width}x{height}",
                    face.width,
                    face.height,
                    face.pixels.len()
                );
                ImageData::solid(width, height, [255, 0, 255, 255])
            }
        });
        let view = upload_layers(&self.device, &self.queue, "Cubemap", &faces, SlotDimension::Cube);
        self.textures.insert(GpuTexture::Image {
            view,
            dimension: SlotDimension::Cube,
        })
    }

    pub fn create_program(&mut self, kind: ProgramKind) -> ProgramHandle {
        self.programs.insert(GpuProgram {
            kind,
            block: UniformBlock::new(kind.uniform_layout()),
            values: UniformMap::default(),
        })
    }

    /// Creates the six built-in programs, the built-in meshes and the
    /// fallback textures.
    pub fn standard_resources(&mut self) -> PipelineResources {
        let programs = ProgramSet {
            lit: self.create_program(ProgramKind::Lit),
            flat_color: self.create_program(ProgramKind::FlatColor),
            alpha: self.create_program(ProgramKind::AlphaTexture),
            reflection: self.create_program(ProgramKind::Reflection),
            skybox: self.create_program(ProgramKind::Skybox),
            screen: self.create_program(ProgramKind::Screen),
        };
        let meshes = BuiltinMeshes {
            skybox_cube: self.upload_mesh(&primitives::skybox_cube()),
            screen_quad: self.upload_mesh(&primitives::screen_quad()),
            light_marker: self.upload_mesh(&primitives::cube(1.0)),
        };
        let placeholder = ImageData::placeholder();
        PipelineResources {
            programs,
            meshes,
            fallback_texture: self.upload_texture(&placeholder),
            blank_texture: self.upload_texture(&ImageData::solid(1, 1, [0, 0, 0, 255])),
            fallback_cubemap: self.upload_cubemap(&std::array::from_fn(|_| placeholder.clone())),
        }
    }

    #[must_use]
    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn report_once(&mut self, key: String) {
        if self.reported.insert(key.clone()) {
            log::warn!("{key}");
        }
    }

    fn color_format(&self, target: RenderTarget) -> wgpu::TextureFormat {
        match (&self.default_target, target) {
            (DefaultTarget::Window { config, .. }, RenderTarget::Default) => config.format,
            _ => OFFSCREEN_COLOR_FORMAT,
        }
    }

    fn pipeline_index(&mut self, key: RenderPipelineKey) -> usize {
        if let Some(&index) = self.pipeline_lookup.get(&key) {
            return index;
        }

        let layouts = &self.program_layouts[key.program.index()];
        let vertex_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &VERTEX_ATTRIBUTES,
        };
        let pipeline = self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(key.program.label()),
            layout: Some(&layouts.pipeline_layout),
            vertex: wgpu::VertexState {
                module: &layouts.shader,
                entry_point: Some("vs_main"),
                buffers: &[vertex_layout],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &layouts.shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: key.color_format,
                    blend: key.blend.map(Into::into),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: key.front_face,
                cull_mode: key.cull_mode,
                ..Default::default()
            },
            depth_stencil: Some(key.depth_stencil.into()),
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        log::debug!("Created pipeline #{} for {:?}", self.pipelines.len(), key.program);
        let index = self.pipelines.len();
        self.pipelines.push(pipeline);
        self.pipeline_lookup.insert(key, index);
        index
    }

    /// Color and depth views of `target`, acquiring the surface frame when
    /// needed.
    fn target_views(
        &mut self,
        target: RenderTarget,
    ) -> Option<(wgpu::TextureView, wgpu::TextureView)> {
        match target {
            RenderTarget::Offscreen(handle) => {
                let views = self.targets.get(handle)?.views.as_ref()?;
                Some((views.color.clone(), views.depth.clone()))
            }
            RenderTarget::Default => {
                let color = match &mut self.default_target {
                    DefaultTarget::Headless { color, .. } => color.clone(),
                    DefaultTarget::Window {
                        surface,
                        config,
                        frame,
                    } => {
                        if frame.is_none() {
                            *frame = Some(acquire_frame(&self.device, surface, config)?);
                        }
                        frame
                            .as_ref()?
                            .texture
                            .create_view(&wgpu::TextureViewDescriptor::default())
                    }
                };
                Some((color, self.default_depth.clone()))
            }
        }
    }

    fn resolve_texture_view(
        &mut self,
        handle: Option<TextureHandle>,
        dimension: SlotDimension,
    ) -> wgpu::TextureView {
        let fallback = match dimension {
            SlotDimension::D2 => &self.fallback_2d,
            SlotDimension::Cube => &self.fallback_cube,
        };
        let resolved = match handle.and_then(|h| self.textures.get(h)) {
            Some(GpuTexture::Image { view, dimension: d }) if *d == dimension => Some(view.clone()),
            Some(GpuTexture::Attachment(target))
                if dimension == SlotDimension::D2
                    && self.bound_target != RenderTarget::Offscreen(*target) =>
            {
                self.targets
                    .get(*target)
                    .and_then(|t| t.views.as_ref())
                    .map(|v| v.color.clone())
            }
            _ => None,
        };
        match resolved {
            Some(view) => view,
            None => {
                let fallback = fallback.clone();
                self.report_once(format!("Texture {handle:?} cannot be sampled as {dimension:?}"));
                fallback
            }
        }
    }

    /// Replays everything recorded for the bound target.
    fn flush(&mut self) {
        let ops = std::mem::take(&mut self.recorded);
        if ops.is_empty() {
            return;
        }
        let Some((color_view, depth_view)) = self.target_views(self.bound_target) else {
            log::warn!("Dropping {} recorded operations: target unavailable", ops.len());
            return;
        };

        // 1. Uniform bytes at aligned offsets
        let draw_count = ops.iter().filter(|op| matches!(op, RecordedOp::Draw(_))).count();
        let stride = self.uniform_stride as usize;
        let mut uniform_bytes = vec![0u8; draw_count.max(1) * stride];
        let mut prepared = Vec::with_capacity(draw_count);
        for draw in ops.iter().filter_map(|op| match op {
            RecordedOp::Draw(d) => Some(d),
            RecordedOp::Clear { .. } => None,
        }) {
            let offset = prepared.len() * stride;
            uniform_bytes[offset..offset + draw.uniforms.len()].copy_from_slice(&draw.uniforms);

            let slots = draw.kind.texture_slots();
            let views: SmallVec<[wgpu::TextureView; 2]> = slots
                .iter()
                .zip(&draw.textures)
                .map(|(slot, handle)| self.resolve_texture_view(*handle, slot.dimension))
                .collect();
            let sampler = if draw.kind == ProgramKind::Screen {
                &self.clamp_sampler
            } else {
                &self.repeat_sampler
            };
            let mut entries = vec![wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Sampler(sampler),
            }];
            entries.extend(views.iter().enumerate().map(|(i, view)| wgpu::BindGroupEntry {
                binding: i as u32 + 1,
                resource: wgpu::BindingResource::TextureView(view),
            }));
            let textures = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Texture BindGroup"),
                layout: &self.program_layouts[draw.kind.index()].texture_layout,
                entries: &entries,
            });
            prepared.push(PreparedDraw {
                uniform_offset: offset as u32,
                textures,
            });
        }

        let uniform_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Frame Uniforms"),
            contents: &uniform_bytes,
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let uniform_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame Uniforms BindGroup"),
            layout: &self.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &uniform_buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(self.uniform_binding_size),
                }),
            }],
        });

        // 2. One render pass per run of draws; clears become load ops
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("Halo Flush") });
        let mut prepared = prepared.iter();
        let mut ops = ops.iter().peekable();
        while ops.peek().is_some() {
            let mut load = LoadOps::default();
            while let Some(RecordedOp::Clear { color, depth, stencil }) = ops.peek() {
                load.color = color.or(load.color);
                load.depth |= *depth;
                load.stencil |= *stencil;
                ops.next();
            }

            let pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Halo Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: load.color.map_or(wgpu::LoadOp::Load, |c| {
                            wgpu::LoadOp::Clear(convert::clear_color(c))
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: if load.depth {
                            wgpu::LoadOp::Clear(1.0)
                        } else {
                            wgpu::LoadOp::Load
                        },
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: Some(wgpu::Operations {
                        load: if load.stencil {
                            wgpu::LoadOp::Clear(0)
                        } else {
                            wgpu::LoadOp::Load
                        },
                        store: wgpu::StoreOp::Store,
                    }),
                }),
                ..Default::default()
            });
            let mut pass = TrackedRenderPass::new(pass);

            while let Some(RecordedOp::Draw(draw)) = ops.peek() {
                ops.next();
                let Some(prep) = prepared.next() else {
                    break;
                };
                let Some(mesh) = self.meshes.get(draw.mesh) else {
                    continue;
                };
                pass.set_pipeline(draw.pipeline, &self.pipelines[draw.pipeline]);
                pass.set_stencil_reference(draw.stencil_reference);
                pass.set_uniforms(&uniform_group, prep.uniform_offset);
                pass.set_textures(&prep.textures);
                pass.set_mesh(draw.mesh, mesh.vertex_buffer.slice(..), mesh.index_buffer.slice(..));
                pass.draw_indexed(mesh.index_count);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
    }
}

// ─── Creation Helpers ─────────────────────────────────────────────────────────

/// Next swapchain texture, or `None` when this frame has to be skipped.
/// An outdated or lost surface is reconfigured so the next frame can
/// acquire again.
fn acquire_frame(
    device: &wgpu::Device,
    surface: &wgpu::Surface<'static>,
    config: &wgpu::SurfaceConfiguration,
) -> Option<wgpu::SurfaceTexture> {
    match surface.get_current_texture() {
        wgpu::CurrentSurfaceTexture::Success(frame) => Some(frame),
        wgpu::CurrentSurfaceTexture::Suboptimal(frame) => {
            log::debug!("Surface is suboptimal, presenting anyway");
            Some(frame)
        }
        wgpu::CurrentSurfaceTexture::Outdated | wgpu::CurrentSurfaceTexture::Lost => {
            log::warn!("Surface outdated or lost, reconfiguring");
            surface.configure(device, config);
            None
        }
        wgpu::CurrentSurfaceTexture::Timeout | wgpu::CurrentSurfaceTexture::Occluded => None,
        wgpu::CurrentSurfaceTexture::Validation => {
            log::error!("Surface acquire failed validation");
            None
        }
    }
}

fn create_attachment(
    device: &wgpu::Device,
    label: &str,
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

/// Uploads one 2D image or six cube faces of equal size.
fn upload_layers(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    layers: &[ImageData],
    dimension: SlotDimension,
) -> wgpu::TextureView {
    let (width, height) = layers.first().map_or((1, 1), |l| (l.width.max(1), l.height.max(1)));
    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: layers.len().max(1) as u32,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: OFFSCREEN_COLOR_FORMAT,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    for (layer, image) in layers.iter().enumerate() {
        if image.pixels.len() != (width * height * 4) as usize {
            continue;
        }
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: 0,
                    y: 0,
                    z: layer as u32,
                },
                aspect: wgpu::TextureAspect::All,
            },
            &image.pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
    }

    texture.create_view(&wgpu::TextureViewDescriptor {
        dimension: Some(match dimension {
            SlotDimension::D2 => wgpu::TextureViewDimension::D2,
            SlotDimension::Cube => wgpu::TextureViewDimension::Cube,
        }),
        ..Default::default()
    })
}

fn create_program_layouts(
    device: &wgpu::Device,
    uniform_layout: &wgpu::BindGroupLayout,
    kind: ProgramKind,
) -> ProgramLayouts {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(kind.label()),
        source: wgpu::ShaderSource::Wgsl(kind.source().into()),
    });

    let mut entries = vec![wgpu::BindGroupLayoutEntry {
        binding: 0,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }];
    entries.extend(kind.texture_slots().iter().enumerate().map(|(i, slot)| {
        wgpu::BindGroupLayoutEntry {
            binding: i as u32 + 1,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: match slot.dimension {
                    SlotDimension::D2 => wgpu::TextureViewDimension::D2,
                    SlotDimension::Cube => wgpu::TextureViewDimension::Cube,
                },
                multisampled: false,
            },
            count: None,
        }
    }));
    let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Program Textures Layout"),
        entries: &entries,
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(kind.label()),
        bind_group_layouts: &[Some(uniform_layout), Some(&texture_layout)],
        immediate_size: 0,
    });

    ProgramLayouts {
        shader,
        texture_layout,
        pipeline_layout,
    }
}

// ─── Device Traits ────────────────────────────────────────────────────────────

impl StateSink for WgpuDevice {
    fn set_depth_state(&mut self, state: &DepthState) {
        self.state.depth = *state;
    }

    fn set_stencil_state(&mut self, state: &StencilState) {
        self.state.stencil = *state;
    }

    fn set_blend_state(&mut self, state: &BlendState) {
        self.state.blend = *state;
    }

    fn set_cull_state(&mut self, state: &CullState) {
        self.state.cull = *state;
    }
}

impl UniformBinder for WgpuDevice {
    fn use_program(&mut self, program: ProgramHandle) {
        if !self.programs.contains_key(program) {
            self.report_once(format!("Unknown program {program:?}"));
        }
        self.bound_program = Some(program);
    }

    fn set_uniform(&mut self, name: &str, value: UniformValue) {
        match self.bound_program.and_then(|h| self.programs.get_mut(h)) {
            Some(program) => {
                // 着色器未声明的名字直接忽略
                program.block.write(name, &value);
                program.values.set(name, value);
            }
            None => self.report_once(format!("Uniform '{name}' set without a valid program")),
        }
    }
}

impl RenderDevice for WgpuDevice {
    fn create_offscreen_target(&mut self, width: u32, height: u32) -> OffscreenAttachments {
        let max = self.device.limits().max_texture_dimension_2d;
        let status = if width == 0 || height == 0 {
            TargetStatus::Incomplete("zero-sized attachment".into())
        } else if width > max || height > max {
            TargetStatus::Incomplete(format!("attachment exceeds the device limit of {max}"))
        } else {
            TargetStatus::Complete
        };
        let attachment =
            |label, format| create_attachment(&self.device, label, width, height, format);
        let views = status.is_complete().then(|| TargetViews {
            color: attachment("Offscreen Color", OFFSCREEN_COLOR_FORMAT),
            depth: attachment("Offscreen Depth", DEPTH_STENCIL_FORMAT),
        });

        let textures = &mut self.textures;
        let target = self.targets.insert_with_key(|key| GpuTarget {
            views,
            color: textures.insert(GpuTexture::Attachment(key)),
            status,
        });

        OffscreenAttachments {
            target,
            color: self.targets[target].color,
            width,
            height,
        }
    }

    fn target_status(&self, target: TargetHandle) -> TargetStatus {
        self.targets.get(target).map_or_else(
            || TargetStatus::Incomplete("unknown target".into()),
            |t| t.status.clone(),
        )
    }

    fn destroy_offscreen_target(&mut self, target: TargetHandle) {
        self.flush();
        if let Some(t) = self.targets.remove(target) {
            self.textures.remove(t.color);
        }
        if self.bound_target == RenderTarget::Offscreen(target) {
            self.bound_target = RenderTarget::Default;
        }
    }

    fn configure_surface(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        let changed = match &mut self.default_target {
            DefaultTarget::Window { surface, config, .. } => {
                let changed = config.width != width || config.height != height;
                if changed {
                    config.width = width;
                    config.height = height;
                    surface.configure(&self.device, config);
                }
                changed
            }
            DefaultTarget::Headless {
                color,
                width: w,
                height: h,
            } => {
                let changed = *w != width || *h != height;
                if changed {
                    *color = create_attachment(
                        &self.device,
                        "Default Color",
                        width,
                        height,
                        OFFSCREEN_COLOR_FORMAT,
                    );
                    (*w, *h) = (width, height);
                }
                changed
            }
        };
        if changed {
            self.default_depth = create_attachment(
                &self.device,
                "Default Depth",
                width,
                height,
                DEPTH_STENCIL_FORMAT,
            );
        }
    }

    fn bind_target(&mut self, target: RenderTarget) {
        if target != self.bound_target {
            self.flush();
        }
        self.bound_target = target;
    }

    fn clear(&mut self, flags: ClearFlags, color: Vec4) {
        let mask = self.state.stencil.write_mask;
        if flags.contains(ClearFlags::STENCIL) && mask != 0 && mask != 0xFF {
            self.report_once(format!("Partial stencil clear mask {mask:#04x} clears all bits"));
        }
        self.recorded.push(RecordedOp::Clear {
            color: flags.contains(ClearFlags::COLOR).then_some(color),
            depth: flags.contains(ClearFlags::DEPTH) && self.state.depth.write_enabled,
            stencil: flags.contains(ClearFlags::STENCIL) && mask != 0,
        });
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureHandle) {
        match self.texture_units.get_mut(unit as usize) {
            Some(slot) => *slot = Some(texture),
            None => self.report_once(format!("Texture unit {unit} out of range")),
        }
    }

    fn draw_mesh(&mut self, mesh: MeshHandle) {
        if !self.meshes.contains_key(mesh) {
            self.report_once(format!("Draw with unknown mesh {mesh:?}"));
            return;
        }
        let Some(program) = self.bound_program.and_then(|h| self.programs.get(h)) else {
            self.report_once("Draw without a valid program".into());
            return;
        };

        let kind = program.kind;
        let uniforms = program.block.bytes().to_vec();
        let textures = kind
            .texture_slots()
            .iter()
            .map(|slot| {
                let unit = program.values.int(slot.unit_uniform).unwrap_or(0);
                usize::try_from(unit)
                    .ok()
                    .and_then(|u| self.texture_units.get(u).copied().flatten())
            })
            .collect();

        let key = RenderPipelineKey::new(kind, self.color_format(self.bound_target), &self.state);
        let pipeline = self.pipeline_index(key);
        self.recorded.push(RecordedOp::Draw(RecordedDraw {
            pipeline,
            kind,
            stencil_reference: u32::from(self.state.stencil.reference),
            uniforms,
            textures,
            mesh,
        }));
    }

    fn present(&mut self) {
        self.flush();
        if let DefaultTarget::Window { frame, .. } = &mut self.default_target {
            if let Some(frame) = frame.take() {
                frame.present();
            }
        }
    }
}
