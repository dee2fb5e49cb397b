//! Built-in WGSL programs.
//!
//! Each [`ProgramKind`] carries its WGSL source, the std140 layout of its
//! uniform block (group 0, dynamic offset) and the texture slots of group 1.
//! Texture slots name the integer uniform that selects a texture unit, which
//! keeps the sampler-uniform indirection the passes rely on.

use crate::renderer::uniforms::{UniformBlockLayout, UniformKind};

/// Point-light slots compiled into the lit shader.
pub const MAX_POINT_LIGHTS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramKind {
    Lit,
    FlatColor,
    AlphaTexture,
    Reflection,
    Skybox,
    Screen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotDimension {
    D2,
    Cube,
}

/// A sampled texture: the uniform holding its unit and the view dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureSlot {
    pub unit_uniform: &'static str,
    pub dimension: SlotDimension,
}

const fn slot(unit_uniform: &'static str, dimension: SlotDimension) -> TextureSlot {
    TextureSlot {
        unit_uniform,
        dimension,
    }
}

impl ProgramKind {
    pub const ALL: [Self; 6] = [
        Self::Lit,
        Self::FlatColor,
        Self::AlphaTexture,
        Self::Reflection,
        Self::Skybox,
        Self::Screen,
    ];

    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Lit => "Lit",
            Self::FlatColor => "FlatColor",
            Self::AlphaTexture => "AlphaTexture",
            Self::Reflection => "Reflection",
            Self::Skybox => "Skybox",
            Self::Screen => "Screen",
        }
    }

    #[must_use]
    pub fn source(self) -> &'static str {
        match self {
            Self::Lit => include_str!("shaders/lit.wgsl"),
            Self::FlatColor => include_str!("shaders/flat_color.wgsl"),
            Self::AlphaTexture => include_str!("shaders/alpha_texture.wgsl"),
            Self::Reflection => include_str!("shaders/reflection.wgsl"),
            Self::Skybox => include_str!("shaders/skybox.wgsl"),
            Self::Screen => include_str!("shaders/screen.wgsl"),
        }
    }

    #[must_use]
    pub fn texture_slots(self) -> &'static [TextureSlot] {
        const LIT: [TextureSlot; 2] = [
            slot("material.diffuse", SlotDimension::D2),
            slot("material.specular", SlotDimension::D2),
        ];
        const ALPHA: [TextureSlot; 1] = [slot("texture1", SlotDimension::D2)];
        const CUBE: [TextureSlot; 1] = [slot("skybox", SlotDimension::Cube)];
        const SCREEN: [TextureSlot; 1] = [slot("screenTexture", SlotDimension::D2)];
        match self {
            Self::Lit => &LIT,
            Self::FlatColor => &[],
            Self::AlphaTexture => &ALPHA,
            Self::Reflection | Self::Skybox => &CUBE,
            Self::Screen => &SCREEN,
        }
    }

    /// Must mirror the `Uniforms` struct of the WGSL source field for field.
    #[must_use]
    pub fn uniform_layout(self) -> UniformBlockLayout {
        use UniformKind::{Float, Int, Mat3, Mat4, Vec3};

        let transforms = [("model", Mat4), ("view", Mat4), ("projection", Mat4)];
        match self {
            Self::Lit => {
                let mut fields: Vec<(String, UniformKind)> = transforms
                    .iter()
                    .map(|(n, k)| ((*n).to_owned(), *k))
                    .collect();
                fields.extend(
                    [
                        ("normalMat", Mat3),
                        ("viewPos", Vec3),
                        ("material.shininess", Float),
                        ("material.diffuse", Int),
                        ("material.specular", Int),
                        ("pointLightCount", Int),
                        ("dirLight.direction", Vec3),
                        ("dirLight.ambient", Vec3),
                        ("dirLight.diffuse", Vec3),
                        ("dirLight.specular", Vec3),
                    ]
                    .map(|(n, k)| (n.to_owned(), k)),
                );
                // 字段顺序与 WGSL PointLight 结构体一致（标量填充 vec3 尾部）
                for i in 0..MAX_POINT_LIGHTS {
                    for (field, kind) in [
                        ("position", Vec3),
                        ("constant", Float),
                        ("ambient", Vec3),
                        ("linear", Float),
                        ("diffuse", Vec3),
                        ("quadratic", Float),
                        ("specular", Vec3),
                    ] {
                        fields.push((format!("pointLights[{i}].{field}"), kind));
                    }
                }
                UniformBlockLayout::new(fields.iter().map(|(n, k)| (n.as_str(), *k)))
            }
            Self::FlatColor => {
                UniformBlockLayout::new(transforms.into_iter().chain([("lightColor", Vec3)]))
            }
            Self::AlphaTexture => UniformBlockLayout::new(
                transforms
                    .into_iter()
                    .chain([("texture1", Int), ("alphaCutoff", Float)]),
            ),
            Self::Reflection => UniformBlockLayout::new(transforms.into_iter().chain([
                ("normalMat", Mat3),
                ("cameraPos", Vec3),
                ("skybox", Int),
            ])),
            Self::Skybox => UniformBlockLayout::new([
                ("view", Mat4),
                ("projection", Mat4),
                ("skybox", Int),
            ]),
            Self::Screen => UniformBlockLayout::new([("screenTexture", Int), ("effect", Int)]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lit_layout_matches_wgsl_struct_offsets() {
        let layout = ProgramKind::Lit.uniform_layout();
        let offset = |name: &str| layout.field(name).map(|f| f.offset);
        assert_eq!(offset("normalMat"), Some(192));
        assert_eq!(offset("viewPos"), Some(240));
        assert_eq!(offset("material.shininess"), Some(252));
        assert_eq!(offset("pointLightCount"), Some(264));
        assert_eq!(offset("dirLight.direction"), Some(272));
        assert_eq!(offset("dirLight.specular"), Some(320));
        assert_eq!(offset("pointLights[0].position"), Some(336));
        assert_eq!(offset("pointLights[0].quadratic"), Some(380));
        assert_eq!(offset("pointLights[1].position"), Some(400));
        assert_eq!(layout.size(), 336 + 64 * MAX_POINT_LIGHTS);
    }

    #[test]
    fn small_blocks() {
        assert_eq!(ProgramKind::Screen.uniform_layout().size(), 16);
        let alpha = ProgramKind::AlphaTexture.uniform_layout();
        assert_eq!(alpha.field("alphaCutoff").map(|f| f.offset), Some(196));
        let reflection = ProgramKind::Reflection.uniform_layout();
        assert_eq!(reflection.field("skybox").map(|f| f.offset), Some(252));
    }

    #[test]
    fn cube_programs_sample_cubemaps() {
        for kind in [ProgramKind::Reflection, ProgramKind::Skybox] {
            assert_eq!(kind.texture_slots()[0].dimension, SlotDimension::Cube);
        }
        assert!(ProgramKind::FlatColor.texture_slots().is_empty());
    }
}
