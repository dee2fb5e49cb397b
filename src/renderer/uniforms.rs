//! Named uniform values and std140 packing.
//!
//! Passes address uniforms by name, the way the programs declare them
//! (`"model"`, `"material.shininess"`, `"pointLights[2].position"`). Backends
//! either keep them in a [`UniformMap`] or pack them into a std140 block with
//! [`UniformBlock`].

use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat3(Mat3),
    Mat4(Mat4),
}

impl UniformValue {
    #[must_use]
    pub fn kind(&self) -> UniformKind {
        match self {
            Self::Int(_) => UniformKind::Int,
            Self::Float(_) => UniformKind::Float,
            Self::Vec2(_) => UniformKind::Vec2,
            Self::Vec3(_) => UniformKind::Vec3,
            Self::Vec4(_) => UniformKind::Vec4,
            Self::Mat3(_) => UniformKind::Mat3,
            Self::Mat4(_) => UniformKind::Mat4,
        }
    }
}

macro_rules! impl_from_uniform {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(impl From<$ty> for UniformValue {
            fn from(v: $ty) -> Self {
                Self::$variant(v)
            }
        })*
    };
}

impl_from_uniform! {
    i32 => Int,
    f32 => Float,
    Vec2 => Vec2,
    Vec3 => Vec3,
    Vec4 => Vec4,
    Mat3 => Mat3,
    Mat4 => Mat4,
}

/// Normal matrix for a model transform: inverse-transpose of its upper 3×3.
#[must_use]
pub fn normal_matrix(model: &Mat4) -> Mat3 {
    Mat3::from_mat4(*model).inverse().transpose()
}

// ─── Uniform Map ──────────────────────────────────────────────────────────────

/// Name → value storage with typed getters.
#[derive(Debug, Clone, Default)]
pub struct UniformMap {
    values: FxHashMap<String, UniformValue>,
}

impl UniformMap {
    pub fn set(&mut self, name: &str, value: UniformValue) {
        if let Some(slot) = self.values.get_mut(name) {
            *slot = value;
        } else {
            self.values.insert(name.to_owned(), value);
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&UniformValue> {
        self.values.get(name)
    }

    #[must_use]
    pub fn int(&self, name: &str) -> Option<i32> {
        match self.values.get(name) {
            Some(UniformValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn float(&self, name: &str) -> Option<f32> {
        match self.values.get(name) {
            Some(UniformValue::Float(v)) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn vec3(&self, name: &str) -> Option<Vec3> {
        match self.values.get(name) {
            Some(UniformValue::Vec3(v)) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn vec4(&self, name: &str) -> Option<Vec4> {
        match self.values.get(name) {
            Some(UniformValue::Vec4(v)) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn mat3(&self, name: &str) -> Option<Mat3> {
        match self.values.get(name) {
            Some(UniformValue::Mat3(v)) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn mat4(&self, name: &str) -> Option<Mat4> {
        match self.values.get(name) {
            Some(UniformValue::Mat4(v)) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ─── std140 Blocks ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformKind {
    Int,
    Float,
    Vec2,
    Vec3,
    Vec4,
    Mat3,
    Mat4,
}

impl UniformKind {
    /// (alignment, size) in bytes under std140.
    #[must_use]
    pub fn std140(self) -> (usize, usize) {
        match self {
            Self::Int | Self::Float => (4, 4),
            Self::Vec2 => (8, 8),
            Self::Vec3 => (16, 12),
            Self::Vec4 => (16, 16),
            // 每列按 vec4 对齐
            Self::Mat3 => (16, 48),
            Self::Mat4 => (16, 64),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformField {
    pub offset: usize,
    pub kind: UniformKind,
}

/// Field offsets of a std140 uniform block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UniformBlockLayout {
    fields: FxHashMap<String, UniformField>,
    order: Vec<String>,
    size: usize,
}

const fn align_to(value: usize, alignment: usize) -> usize {
    value.div_ceil(alignment) * alignment
}

impl UniformBlockLayout {
    /// Lays out fields in declaration order.
    #[must_use]
    pub fn new<'a>(fields: impl IntoIterator<Item = (&'a str, UniformKind)>) -> Self {
        let mut layout = Self::default();
        let mut cursor = 0;
        for (name, kind) in fields {
            let (align, size) = kind.std140();
            let offset = align_to(cursor, align);
            layout.fields.insert(name.to_owned(), UniformField { offset, kind });
            layout.order.push(name.to_owned());
            cursor = offset + size;
        }
        layout.size = align_to(cursor, 16);
        layout
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<UniformField> {
        self.fields.get(name).copied()
    }

    /// Block size, padded to 16 bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }
}

/// CPU copy of one std140 block.
#[derive(Debug, Clone)]
pub struct UniformBlock {
    layout: UniformBlockLayout,
    bytes: Vec<u8>,
}

impl UniformBlock {
    #[must_use]
    pub fn new(layout: UniformBlockLayout) -> Self {
        let bytes = vec![0; layout.size()];
        Self { layout, bytes }
    }

    /// Writes a value. Returns `false` (and leaves the block untouched) for
    /// unknown names or mismatched types.
    pub fn write(&mut self, name: &str, value: &UniformValue) -> bool {
        let Some(field) = self.layout.field(name) else {
            return false;
        };
        if field.kind != value.kind() {
            log::warn!(
                "Uniform '{name}' expects {:?}, got {:?}",
                field.kind,
                value.kind()
            );
            return false;
        }

        let dst = &mut self.bytes[field.offset..];
        match value {
            UniformValue::Int(v) => dst[..4].copy_from_slice(bytemuck::bytes_of(v)),
            UniformValue::Float(v) => dst[..4].copy_from_slice(bytemuck::bytes_of(v)),
            UniformValue::Vec2(v) => dst[..8].copy_from_slice(bytemuck::bytes_of(v)),
            UniformValue::Vec3(v) => dst[..12].copy_from_slice(bytemuck::bytes_of(v)),
            UniformValue::Vec4(v) => dst[..16].copy_from_slice(bytemuck::bytes_of(v)),
            UniformValue::Mat3(m) => {
                for (i, col) in [m.x_axis, m.y_axis, m.z_axis].iter().enumerate() {
                    let start = i * 16;
                    dst[start..start + 12].copy_from_slice(bytemuck::bytes_of(col));
                }
            }
            UniformValue::Mat4(m) => dst[..64].copy_from_slice(bytemuck::bytes_of(m)),
        }
        true
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn layout(&self) -> &UniformBlockLayout {
        &self.layout
    }
}
