//! Texel storage and nearest-neighbour sampling.

use glam::{Vec2, Vec3, Vec4};

use crate::assets::{CubeFace, ImageData, TargetHandle};

/// Returned for textures that cannot be resolved.
pub const MISSING_COLOR: Vec4 = Vec4::new(1.0, 0.0, 1.0, 1.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WrapMode {
    #[default]
    Repeat,
    ClampToEdge,
}

impl WrapMode {
    #[inline]
    fn apply(self, coord: f32) -> f32 {
        match self {
            Self::Repeat => coord - coord.floor(),
            Self::ClampToEdge => coord.clamp(0.0, 1.0),
        }
    }
}

/// Floating-point RGBA image, rows top to bottom.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColorImage {
    width: u32,
    height: u32,
    texels: Vec<Vec4>,
}

impl ColorImage {
    #[must_use]
    pub fn new(width: u32, height: u32, fill: Vec4) -> Self {
        Self {
            width,
            height,
            texels: vec![fill; width as usize * height as usize],
        }
    }

    #[must_use]
    pub fn from_image_data(image: &ImageData) -> Self {
        let mut texels = Vec::with_capacity(image.width as usize * image.height as usize);
        for y in 0..image.height {
            for x in 0..image.width {
                texels.push(image.texel(x, y));
            }
        }
        Self {
            width: image.width,
            height: image.height,
            texels,
        }
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.texels.is_empty()
    }

    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<Vec4> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.texels.get(y as usize * self.width as usize + x as usize).copied()
    }

    #[inline]
    pub(super) fn texel_mut(&mut self, index: usize) -> &mut Vec4 {
        &mut self.texels[index]
    }

    pub fn fill(&mut self, color: Vec4) {
        self.texels.fill(color);
    }

    /// Converts back to RGBA8, e.g. for saving a presented frame.
    #[must_use]
    pub fn to_image_data(&self) -> ImageData {
        let mut pixels = Vec::with_capacity(self.texels.len() * 4);
        for texel in &self.texels {
            for channel in texel.to_array() {
                pixels.push((channel.clamp(0.0, 1.0) * 255.0).round() as u8);
            }
        }
        ImageData {
            width: self.width,
            height: self.height,
            pixels,
        }
    }

    /// Samples with `uv` in the usual convention: `v = 0` is the bottom row.
    #[must_use]
    pub fn sample(&self, uv: Vec2, wrap: WrapMode) -> Vec4 {
        let s = wrap.apply(uv.x);
        let t = 1.0 - wrap.apply(uv.y);
        self.sample_st(s, t)
    }

    /// Samples with `t = 0` at the top row.
    #[must_use]
    pub fn sample_st(&self, s: f32, t: f32) -> Vec4 {
        if self.is_empty() {
            return MISSING_COLOR;
        }
        let x = ((s * self.width as f32).floor() as i64).clamp(0, i64::from(self.width) - 1);
        let y = ((t * self.height as f32).floor() as i64).clamp(0, i64::from(self.height) - 1);
        self.texels[y as usize * self.width as usize + x as usize]
    }
}

pub(super) enum SoftTexture {
    Image { image: ColorImage, wrap: WrapMode },
    Cube(Box<[ColorImage; 6]>),
    /// Color attachment of an offscreen target.
    Attachment(TargetHandle),
}

/// A texture resolved for one draw.
#[derive(Clone, Copy)]
pub(super) enum TextureView<'a> {
    Image(&'a ColorImage, WrapMode),
    Cube(&'a [ColorImage; 6]),
    Missing,
}

impl TextureView<'_> {
    pub(super) fn sample(&self, uv: Vec2) -> Vec4 {
        match self {
            Self::Image(image, wrap) => image.sample(uv, *wrap),
            Self::Cube(_) | Self::Missing => MISSING_COLOR,
        }
    }

    pub(super) fn sample_cube(&self, dir: Vec3) -> Vec4 {
        match self {
            Self::Cube(faces) => {
                let (face, st) = CubeFace::from_direction(dir);
                faces[face.index()].sample_st(st.x, st.y)
            }
            Self::Image(..) | Self::Missing => MISSING_COLOR,
        }
    }

    /// Texel size in uv units, for kernel effects.
    pub(super) fn texel_size(&self) -> Vec2 {
        match self {
            Self::Image(image, _) if !image.is_empty() => {
                Vec2::new(1.0 / image.width() as f32, 1.0 / image.height() as f32)
            }
            _ => Vec2::splat(1.0 / 300.0),
        }
    }
}
