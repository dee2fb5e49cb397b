//! CPU-side image data and cubemap face conventions.

use glam::{Vec2, Vec3, Vec4};

/// Decoded RGBA8 image, rows stored top to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGBA8 texels, `width * height * 4` bytes.
    pub pixels: Vec<u8>,
}

impl ImageData {
    /// Creates an image from raw RGBA8 bytes.
    ///
    /// Returns `None` when the byte count does not match the dimensions.
    #[must_use]
    pub fn from_rgba8(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        let image = Self {
            width,
            height,
            pixels,
        };
        image.is_well_formed().then_some(image)
    }

    /// Byte count `pixels` must have for the declared dimensions.
    #[must_use]
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }

    /// Whether `pixels` holds exactly one RGBA8 texel per pixel.
    ///
    /// The fields are public, so uploads check this before reading texels.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.pixels.len() == self.expected_len()
    }

    /// Creates a single-color image.
    #[must_use]
    pub fn solid(width: u32, height: u32, color: [u8; 4]) -> Self {
        let count = width as usize * height as usize;
        let mut pixels = Vec::with_capacity(count * 4);
        for _ in 0..count {
            pixels.extend_from_slice(&color);
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    /// The visible stand-in for textures that failed to load:
    /// a 2×2 magenta/black checkerboard.
    #[must_use]
    pub fn placeholder() -> Self {
        const MAGENTA: [u8; 4] = [255, 0, 255, 255];
        const BLACK: [u8; 4] = [0, 0, 0, 255];
        let mut pixels = Vec::with_capacity(16);
        for texel in [MAGENTA, BLACK, BLACK, MAGENTA] {
            pixels.extend_from_slice(&texel);
        }
        Self {
            width: 2,
            height: 2,
            pixels,
        }
    }

    /// Returns the texel at `(x, y)` as normalized floats. Texels past the
    /// end of `pixels` read as transparent black.
    #[must_use]
    pub fn texel(&self, x: u32, y: u32) -> Vec4 {
        let index = (y as usize * self.width as usize + x as usize) * 4;
        let Some(p) = self.pixels.get(index..index + 4) else {
            return Vec4::ZERO;
        };
        Vec4::new(
            f32::from(p[0]) / 255.0,
            f32::from(p[1]) / 255.0,
            f32::from(p[2]) / 255.0,
            f32::from(p[3]) / 255.0,
        )
    }

    /// Whether any texel is not fully opaque.
    #[must_use]
    pub fn has_alpha(&self) -> bool {
        self.pixels.chunks_exact(4).any(|p| p[3] < 255)
    }
}

/// Cubemap faces in upload order: +X, −X, +Y, −Y, +Z, −Z.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CubeFace {
    PositiveX,
    NegativeX,
    PositiveY,
    NegativeY,
    PositiveZ,
    NegativeZ,
}

impl CubeFace {
    /// All faces in the fixed upload order.
    pub const ALL: [Self; 6] = [
        Self::PositiveX,
        Self::NegativeX,
        Self::PositiveY,
        Self::NegativeY,
        Self::PositiveZ,
        Self::NegativeZ,
    ];

    /// Index into a six-face array.
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Conventional file stem for the face ("right", "left", …).
    #[must_use]
    pub fn conventional_name(self) -> &'static str {
        match self {
            Self::PositiveX => "right",
            Self::NegativeX => "left",
            Self::PositiveY => "top",
            Self::NegativeY => "bottom",
            Self::PositiveZ => "front",
            Self::NegativeZ => "back",
        }
    }

    /// Selects the face a direction vector hits and the face-local
    /// coordinates in `[0, 1]²` (s to the right, t downwards).
    ///
    /// Follows the fixed-function major-axis table, so faces authored for
    /// OpenGL-style cubemaps sample correctly.
    #[must_use]
    pub fn from_direction(dir: Vec3) -> (Self, Vec2) {
        let a = dir.abs();
        let (face, sc, tc, ma) = if a.x >= a.y && a.x >= a.z {
            if dir.x > 0.0 {
                (Self::PositiveX, -dir.z, -dir.y, a.x)
            } else {
                (Self::NegativeX, dir.z, -dir.y, a.x)
            }
        } else if a.y >= a.z {
            if dir.y > 0.0 {
                (Self::PositiveY, dir.x, dir.z, a.y)
            } else {
                (Self::NegativeY, dir.x, -dir.z, a.y)
            }
        } else if dir.z > 0.0 {
            (Self::PositiveZ, dir.x, -dir.y, a.z)
        } else {
            (Self::NegativeZ, -dir.x, -dir.y, a.z)
        };

        if ma <= f32::EPSILON {
            return (face, Vec2::splat(0.5));
        }
        let s = 0.5 * (sc / ma + 1.0);
        let t = 0.5 * (tc / ma + 1.0);
        (face, Vec2::new(s, t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgba8_length_is_validated() {
        assert!(ImageData::from_rgba8(2, 2, vec![0; 16]).is_some());
        assert!(ImageData::from_rgba8(2, 2, vec![0; 15]).is_none());
    }

    #[test]
    fn short_pixel_buffer_is_malformed_but_readable() {
        let img = ImageData {
            width: 2,
            height: 2,
            pixels: vec![255; 8],
        };
        assert!(!img.is_well_formed());
        assert_eq!(img.expected_len(), 16);
        assert_eq!(img.texel(1, 0), Vec4::ONE);
        assert_eq!(img.texel(1, 1), Vec4::ZERO);
    }

    #[test]
    fn placeholder_is_checkerboard() {
        let img = ImageData::placeholder();
        assert_eq!(img.texel(0, 0), Vec4::new(1.0, 0.0, 1.0, 1.0));
        assert_eq!(img.texel(1, 0), Vec4::new(0.0, 0.0, 0.0, 1.0));
        assert!(!img.has_alpha());
    }

    #[test]
    fn axis_directions_hit_face_centers() {
        for (dir, face) in [
            (Vec3::X, CubeFace::PositiveX),
            (Vec3::NEG_X, CubeFace::NegativeX),
            (Vec3::Y, CubeFace::PositiveY),
            (Vec3::NEG_Y, CubeFace::NegativeY),
            (Vec3::Z, CubeFace::PositiveZ),
            (Vec3::NEG_Z, CubeFace::NegativeZ),
        ] {
            let (hit, st) = CubeFace::from_direction(dir);
            assert_eq!(hit, face);
            assert!((st - Vec2::splat(0.5)).length() < 1e-6);
        }
    }

    #[test]
    fn face_order_is_fixed() {
        let names: Vec<_> = CubeFace::ALL.iter().map(|f| f.conventional_name()).collect();
        assert_eq!(names, ["right", "left", "top", "bottom", "front", "back"]);
        assert_eq!(CubeFace::NegativeZ.index(), 5);
    }
}
