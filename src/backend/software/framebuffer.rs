use glam::Vec4;

use super::texture::ColorImage;
use crate::renderer::device::ClearFlags;

/// Color + depth + 8-bit stencil planes of equal size.
#[derive(Debug, Clone, Default)]
pub struct Framebuffer {
    pub(super) color: ColorImage,
    pub(super) depth: Vec<f32>,
    pub(super) stencil: Vec<u8>,
}

impl Framebuffer {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        let count = width as usize * height as usize;
        Self {
            color: ColorImage::new(width, height, Vec4::ZERO),
            depth: vec![1.0; count],
            stencil: vec![0; count],
        }
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.color.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.color.height()
    }

    #[must_use]
    pub fn color(&self) -> &ColorImage {
        &self.color
    }

    #[must_use]
    pub fn depth_at(&self, x: u32, y: u32) -> Option<f32> {
        self.index(x, y).map(|i| self.depth[i])
    }

    #[must_use]
    pub fn stencil_at(&self, x: u32, y: u32) -> Option<u8> {
        self.index(x, y).map(|i| self.stencil[i])
    }

    #[must_use]
    pub fn color_at(&self, x: u32, y: u32) -> Option<Vec4> {
        self.color.get(x, y)
    }

    #[inline]
    pub(super) fn index(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width() && y < self.height())
            .then(|| y as usize * self.width() as usize + x as usize)
    }

    /// Depth is only cleared while depth writes are enabled, and stencil bits
    /// outside `stencil_write_mask` are preserved.
    pub(super) fn clear(
        &mut self,
        flags: ClearFlags,
        color: Vec4,
        depth_write: bool,
        stencil_write_mask: u8,
    ) {
        if flags.contains(ClearFlags::COLOR) {
            self.color.fill(color);
        }
        if flags.contains(ClearFlags::DEPTH) && depth_write {
            self.depth.fill(1.0);
        }
        if flags.contains(ClearFlags::STENCIL) {
            for s in &mut self.stencil {
                *s &= !stencil_write_mask;
            }
        }
    }
}
