use glam::{Mat4, Vec3};

use crate::assets::{MeshHandle, TextureHandle};

/// Which pass draws an instance. An instance belongs to exactly one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstanceCategory {
    /// Lit, depth-tested, no blending needs.
    Opaque,
    /// Lit like `Opaque` and highlighted by a colored silhouette.
    Outlined,
    /// Shaded from the environment cubemap.
    Reflective,
    /// Alpha-blended; drawn back to front after everything else.
    Translucent,
}

/// How a translucent material treats alpha.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AlphaMode {
    /// Regular "over" blending.
    Blend,
    /// Fragments below the threshold are discarded, the rest blended.
    Cutout(f32),
}

impl AlphaMode {
    /// Threshold pushed to the alpha program; zero disables discarding.
    #[must_use]
    pub fn cutoff(self) -> f32 {
        match self {
            Self::Blend => 0.0,
            Self::Cutout(threshold) => threshold,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub diffuse: Option<TextureHandle>,
    pub specular: Option<TextureHandle>,
    pub shininess: f32,
    pub alpha_mode: AlphaMode,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            diffuse: None,
            specular: None,
            shininess: 64.0,
            alpha_mode: AlphaMode::Blend,
        }
    }
}

impl Material {
    #[must_use]
    pub fn textured(diffuse: TextureHandle, specular: Option<TextureHandle>) -> Self {
        Self {
            diffuse: Some(diffuse),
            specular,
            ..Self::default()
        }
    }
}

/// A drawable: mesh, material, world transform and category.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Instance {
    pub mesh: MeshHandle,
    pub material: Material,
    pub transform: Mat4,
    pub category: InstanceCategory,
}

impl Instance {
    #[must_use]
    pub fn new(mesh: MeshHandle, category: InstanceCategory) -> Self {
        Self {
            mesh,
            material: Material::default(),
            transform: Mat4::IDENTITY,
            category,
        }
    }

    #[must_use]
    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    #[must_use]
    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }

    #[must_use]
    pub fn at(self, position: Vec3) -> Self {
        self.with_transform(Mat4::from_translation(position))
    }

    /// Translation part of the world transform.
    #[must_use]
    pub fn world_position(&self) -> Vec3 {
        self.transform.w_axis.truncate()
    }
}
