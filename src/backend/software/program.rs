//! Built-in programs of the software device.
//!
//! A program pairs a vertex stage with a fragment stage from a closed set.
//! Uniforms live on the program (they persist across `use_program` calls) and
//! are resolved once per draw into a [`VertexTransform`] and a
//! [`FragmentShader`].

use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};
use slotmap::SlotMap;
use smallvec::SmallVec;

use super::SoftTarget;
use super::texture::{SoftTexture, TextureView, WrapMode};
use crate::assets::{TargetHandle, TextureHandle, Vertex};
use crate::renderer::settings::PostProcessEffect;
use crate::renderer::uniforms::UniformMap;

pub const MAX_TEXTURE_UNITS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexStage {
    /// `projection * view * model * position`; world position, normal and uv
    /// are passed on.
    Standard,
    /// Position used as the sampling direction; depth pinned to the far plane.
    Skybox,
    /// Position taken as normalized device coordinates.
    ScreenSpace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentStage {
    /// Ambient + diffuse + specular from one directional light and the point
    /// lights, with diffuse/specular maps.
    Lit,
    /// `lightColor`, fully opaque.
    FlatColor,
    /// `texture1`, with optional `alphaCutoff` discard.
    AlphaTexture,
    /// Environment cubemap along the reflected view ray.
    Reflection,
    /// Environment cubemap along the vertex position.
    Skybox,
    /// `screenTexture` with the `effect` post-process.
    Screen,
}

#[derive(Debug, Clone)]
pub struct SoftwareProgram {
    pub vertex: VertexStage,
    pub fragment: FragmentStage,
    pub(super) uniforms: UniformMap,
}

impl SoftwareProgram {
    #[must_use]
    pub fn new(vertex: VertexStage, fragment: FragmentStage) -> Self {
        Self {
            vertex,
            fragment,
            uniforms: UniformMap::default(),
        }
    }
}

// ─── Vertex Stage ─────────────────────────────────────────────────────────────

/// Interpolated per-fragment inputs.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(super) struct Varyings {
    pub world: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
    pub local: Vec3,
}

impl Varyings {
    pub(super) fn lerp(&self, other: &Self, t: f32) -> Self {
        Self {
            world: self.world.lerp(other.world, t),
            normal: self.normal.lerp(other.normal, t),
            uv: self.uv.lerp(other.uv, t),
            local: self.local.lerp(other.local, t),
        }
    }

    pub(super) fn weighted(v: [&Self; 3], w: [f32; 3]) -> Self {
        Self {
            world: v[0].world * w[0] + v[1].world * w[1] + v[2].world * w[2],
            normal: v[0].normal * w[0] + v[1].normal * w[1] + v[2].normal * w[2],
            uv: v[0].uv * w[0] + v[1].uv * w[1] + v[2].uv * w[2],
            local: v[0].local * w[0] + v[1].local * w[1] + v[2].local * w[2],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct ClipVertex {
    pub clip: Vec4,
    pub varyings: Varyings,
}

impl ClipVertex {
    pub(super) fn lerp(&self, other: &Self, t: f32) -> Self {
        Self {
            clip: self.clip.lerp(other.clip, t),
            varyings: self.varyings.lerp(&other.varyings, t),
        }
    }
}

pub(super) struct VertexTransform {
    stage: VertexStage,
    model: Mat4,
    view_projection: Mat4,
    normal: Mat3,
}

impl VertexTransform {
    pub(super) fn new(program: &SoftwareProgram) -> Self {
        let u = &program.uniforms;
        let model = u.mat4("model").unwrap_or(Mat4::IDENTITY);
        let view = u.mat4("view").unwrap_or(Mat4::IDENTITY);
        let projection = u.mat4("projection").unwrap_or(Mat4::IDENTITY);
        let normal = u
            .mat3("normalMat")
            .unwrap_or_else(|| Mat3::from_mat4(model).inverse().transpose());
        Self {
            stage: program.vertex,
            model,
            view_projection: projection * view,
            normal,
        }
    }

    pub(super) fn run(&self, vertex: &Vertex) -> ClipVertex {
        let position = vertex.position();
        match self.stage {
            VertexStage::Standard => {
                let world = self.model * position.extend(1.0);
                ClipVertex {
                    clip: self.view_projection * world,
                    varyings: Varyings {
                        world: world.truncate(),
                        normal: self.normal * vertex.normal(),
                        uv: vertex.uv(),
                        local: position,
                    },
                }
            }
            VertexStage::Skybox => {
                let clip = self.view_projection * position.extend(1.0);
                ClipVertex {
                    // z = w：透视除法后深度恒为 1.0
                    clip: Vec4::new(clip.x, clip.y, clip.w, clip.w),
                    varyings: Varyings {
                        local: position,
                        ..Varyings::default()
                    },
                }
            }
            VertexStage::ScreenSpace => ClipVertex {
                clip: Vec4::new(position.x, position.y, 0.0, 1.0),
                varyings: Varyings {
                    uv: vertex.uv(),
                    local: position,
                    ..Varyings::default()
                },
            },
        }
    }
}

// ─── Fragment Stage ───────────────────────────────────────────────────────────

/// Texture bindings visible to a draw.
pub(super) struct TextureLookup<'a> {
    pub textures: &'a SlotMap<TextureHandle, SoftTexture>,
    pub targets: &'a SlotMap<TargetHandle, SoftTarget>,
    pub units: &'a [Option<TextureHandle>; MAX_TEXTURE_UNITS],
}

impl<'a> TextureLookup<'a> {
    pub(super) fn unit(&self, unit: i32) -> TextureView<'a> {
        let handle = usize::try_from(unit)
            .ok()
            .and_then(|u| self.units.get(u).copied().flatten());
        handle.map_or(TextureView::Missing, |h| self.view(h))
    }

    pub(super) fn view(&self, handle: TextureHandle) -> TextureView<'a> {
        match self.textures.get(handle) {
            Some(SoftTexture::Image { image, wrap }) => TextureView::Image(image, *wrap),
            Some(SoftTexture::Cube(faces)) => TextureView::Cube(faces),
            Some(SoftTexture::Attachment(target)) => self
                .targets
                .get(*target)
                .map_or(TextureView::Missing, |t| {
                    TextureView::Image(&t.framebuffer.color, WrapMode::ClampToEdge)
                }),
            None => TextureView::Missing,
        }
    }
}

struct DirectionalParams {
    direction: Vec3,
    ambient: Vec3,
    diffuse: Vec3,
    specular: Vec3,
}

struct PointParams {
    position: Vec3,
    constant: f32,
    linear: f32,
    quadratic: f32,
    ambient: Vec3,
    diffuse: Vec3,
    specular: Vec3,
}

pub(super) struct LitShader<'a> {
    diffuse: TextureView<'a>,
    specular: TextureView<'a>,
    shininess: f32,
    view_pos: Vec3,
    directional: Option<DirectionalParams>,
    points: SmallVec<[PointParams; 4]>,
}

pub(super) enum FragmentShader<'a> {
    Lit(LitShader<'a>),
    Flat(Vec3),
    Alpha {
        texture: TextureView<'a>,
        cutoff: f32,
    },
    Reflection {
        eye: Vec3,
        environment: TextureView<'a>,
    },
    Skybox(TextureView<'a>),
    Screen {
        source: TextureView<'a>,
        effect: PostProcessEffect,
    },
}

#[inline]
fn reflect(incident: Vec3, normal: Vec3) -> Vec3 {
    incident - 2.0 * normal.dot(incident) * normal
}

impl<'a> FragmentShader<'a> {
    pub(super) fn resolve(program: &SoftwareProgram, lookup: &TextureLookup<'a>) -> Self {
        let u = &program.uniforms;
        match program.fragment {
            FragmentStage::Lit => {
                let directional = u.vec3("dirLight.direction").map(|direction| DirectionalParams {
                    direction,
                    ambient: u.vec3("dirLight.ambient").unwrap_or(Vec3::ZERO),
                    diffuse: u.vec3("dirLight.diffuse").unwrap_or(Vec3::ZERO),
                    specular: u.vec3("dirLight.specular").unwrap_or(Vec3::ZERO),
                });
                let count = u.int("pointLightCount").unwrap_or(0).max(0);
                let points = (0..count)
                    .filter_map(|i| {
                        let p = |field: &str| format!("pointLights[{i}].{field}");
                        Some(PointParams {
                            position: u.vec3(&p("position"))?,
                            constant: u.float(&p("constant")).unwrap_or(1.0),
                            linear: u.float(&p("linear")).unwrap_or(0.0),
                            quadratic: u.float(&p("quadratic")).unwrap_or(0.0),
                            ambient: u.vec3(&p("ambient")).unwrap_or(Vec3::ZERO),
                            diffuse: u.vec3(&p("diffuse")).unwrap_or(Vec3::ZERO),
                            specular: u.vec3(&p("specular")).unwrap_or(Vec3::ZERO),
                        })
                    })
                    .collect();
                Self::Lit(LitShader {
                    diffuse: lookup.unit(u.int("material.diffuse").unwrap_or(0)),
                    specular: lookup.unit(u.int("material.specular").unwrap_or(1)),
                    shininess: u.float("material.shininess").unwrap_or(32.0),
                    view_pos: u.vec3("viewPos").unwrap_or(Vec3::ZERO),
                    directional,
                    points,
                })
            }
            FragmentStage::FlatColor => Self::Flat(u.vec3("lightColor").unwrap_or(Vec3::ONE)),
            FragmentStage::AlphaTexture => Self::Alpha {
                texture: lookup.unit(u.int("texture1").unwrap_or(0)),
                cutoff: u.float("alphaCutoff").unwrap_or(0.0),
            },
            FragmentStage::Reflection => Self::Reflection {
                eye: u.vec3("cameraPos").unwrap_or(Vec3::ZERO),
                environment: lookup.unit(u.int("skybox").unwrap_or(0)),
            },
            FragmentStage::Skybox => Self::Skybox(lookup.unit(u.int("skybox").unwrap_or(0))),
            FragmentStage::Screen => Self::Screen {
                source: lookup.unit(u.int("screenTexture").unwrap_or(0)),
                effect: PostProcessEffect::from_code(u.int("effect").unwrap_or(0)),
            },
        }
    }

    /// Whether `shade` can return `None`.
    pub(super) fn may_discard(&self) -> bool {
        matches!(self, Self::Alpha { cutoff, .. } if *cutoff > 0.0)
    }

    /// Fragment color, or `None` when the fragment is discarded.
    pub(super) fn shade(&self, v: &Varyings) -> Option<Vec4> {
        match self {
            Self::Lit(lit) => Some(lit.shade(v).extend(1.0)),
            Self::Flat(color) => Some(color.extend(1.0)),
            Self::Alpha { texture, cutoff } => {
                let color = texture.sample(v.uv);
                (color.w >= *cutoff || *cutoff <= 0.0).then_some(color)
            }
            Self::Reflection { eye, environment } => {
                let incident = (v.world - *eye).normalize_or_zero();
                let dir = reflect(incident, v.normal.normalize_or_zero());
                Some(environment.sample_cube(dir).truncate().extend(1.0))
            }
            Self::Skybox(environment) => {
                Some(environment.sample_cube(v.local).truncate().extend(1.0))
            }
            Self::Screen { source, effect } => {
                Some(shade_screen(source, *effect, v.uv).extend(1.0))
            }
        }
    }
}

impl LitShader<'_> {
    fn shade(&self, v: &Varyings) -> Vec3 {
        let normal = v.normal.normalize_or_zero();
        let view_dir = (self.view_pos - v.world).normalize_or_zero();
        let albedo = self.diffuse.sample(v.uv).truncate();
        let spec_map = self.specular.sample(v.uv).truncate();

        let term = |light_dir: Vec3, ambient: Vec3, diffuse: Vec3, specular: Vec3| {
            let diff = normal.dot(light_dir).max(0.0);
            let reflected = reflect(-light_dir, normal);
            let spec = view_dir.dot(reflected).max(0.0).powf(self.shininess);
            ambient * albedo + diffuse * diff * albedo + specular * spec * spec_map
        };

        let mut result = Vec3::ZERO;
        if let Some(d) = &self.directional {
            result += term(
                (-d.direction).normalize_or_zero(),
                d.ambient,
                d.diffuse,
                d.specular,
            );
        }
        for p in &self.points {
            let to_light = p.position - v.world;
            let distance = to_light.length();
            let attenuation =
                1.0 / (p.constant + p.linear * distance + p.quadratic * distance * distance);
            result += term(to_light.normalize_or_zero(), p.ambient, p.diffuse, p.specular)
                * attenuation;
        }
        result
    }
}

fn shade_screen(source: &TextureView<'_>, effect: PostProcessEffect, uv: Vec2) -> Vec3 {
    if let Some(kernel) = effect.kernel() {
        let step = source.texel_size();
        let mut sum = Vec3::ZERO;
        // 行优先，从左上角开始
        for (i, weight) in kernel.iter().enumerate() {
            let dx = (i % 3) as f32 - 1.0;
            let dy = 1.0 - (i / 3) as f32;
            let offset = Vec2::new(dx * step.x, dy * step.y);
            sum += source.sample(uv + offset).truncate() * *weight;
        }
        return sum;
    }

    let color = source.sample(uv).truncate();
    match effect {
        PostProcessEffect::Inversion => Vec3::ONE - color,
        PostProcessEffect::Grayscale => {
            Vec3::splat(0.2126 * color.x + 0.7152 * color.y + 0.0722 * color.z)
        }
        _ => color,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::uniforms::UniformValue;

    const EPSILON: f32 = 1e-4;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < EPSILON
    }

    #[test]
    fn skybox_stage_pins_depth_to_far_plane() {
        let mut program = SoftwareProgram::new(VertexStage::Skybox, FragmentStage::Skybox);
        let projection = Mat4::perspective_rh(45f32.to_radians(), 1.0, 0.1, 100.0);
        program.uniforms.set("projection", UniformValue::Mat4(projection));
        let transform = VertexTransform::new(&program);
        let v = Vertex::new(Vec3::new(0.3, -0.2, -1.0), Vec3::Z, Vec2::ZERO);
        let out = transform.run(&v);
        assert!((out.clip.z / out.clip.w - 1.0).abs() < 1e-6);
        assert_eq!(out.varyings.local, Vec3::new(0.3, -0.2, -1.0));
    }

    #[test]
    fn flat_and_cutoff_shading() {
        let v = Varyings::default();
        assert_eq!(FragmentShader::Flat(Vec3::X).shade(&v), Some(Vec4::new(1.0, 0.0, 0.0, 1.0)));

        let cutout = FragmentShader::Alpha {
            texture: TextureView::Missing,
            cutoff: 0.5,
        };
        assert!(cutout.may_discard());
        // Missing texture samples opaque magenta, which survives the cutoff.
        assert!(cutout.shade(&v).is_some());
    }

    #[test]
    fn lit_shader_matches_hand_computation() {
        let white = crate::backend::software::texture::ColorImage::new(1, 1, Vec4::ONE);
        let lit = LitShader {
            diffuse: TextureView::Image(&white, WrapMode::Repeat),
            specular: TextureView::Missing,
            shininess: 64.0,
            view_pos: Vec3::new(0.0, 0.0, 5.0),
            directional: Some(DirectionalParams {
                direction: Vec3::NEG_Z,
                ambient: Vec3::splat(0.1),
                diffuse: Vec3::splat(0.5),
                specular: Vec3::ZERO,
            }),
            points: SmallVec::new(),
        };
        let v = Varyings {
            normal: Vec3::Z,
            ..Varyings::default()
        };
        // Head-on light: ambient + full diffuse.
        assert!(approx(lit.shade(&v), Vec3::splat(0.6)));
    }

    #[test]
    fn inversion_and_grayscale() {
        let red = Vec4::new(1.0, 0.0, 0.0, 1.0);
        let img = crate::backend::software::texture::ColorImage::new(1, 1, red);
        let view = TextureView::Image(&img, WrapMode::ClampToEdge);
        assert!(approx(
            shade_screen(&view, PostProcessEffect::Inversion, Vec2::splat(0.5)),
            Vec3::new(0.0, 1.0, 1.0)
        ));
        assert!(approx(
            shade_screen(&view, PostProcessEffect::Grayscale, Vec2::splat(0.5)),
            Vec3::splat(0.2126)
        ));
        // A flat image blurs to itself.
        assert!(approx(
            shade_screen(&view, PostProcessEffect::Blur, Vec2::splat(0.5)),
            Vec3::X
        ));
    }
}
