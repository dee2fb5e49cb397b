//! Offscreen Render Target
//!
//! The scene passes draw into an offscreen color + depth/stencil target that
//! the post-process pass then samples. The target always matches the viewport:
//! a size change tears it down and allocates a new one.
//!
//! A target that fails its completeness check is fatal. Nothing is rendered
//! into a target that has not been validated.

use crate::assets::{TargetHandle, TextureHandle};
use crate::errors::{HaloError, Result};
use crate::renderer::device::{OffscreenAttachments, RenderDevice, TargetStatus};

/// Framebuffer dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[must_use]
    pub fn aspect(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }

    pub(crate) fn validate(self) -> Result<Self> {
        if self.is_empty() {
            return Err(HaloError::InvalidViewport {
                width: self.width,
                height: self.height,
            });
        }
        Ok(self)
    }
}

#[derive(Debug)]
pub struct OffscreenTarget {
    attachments: OffscreenAttachments,
}

impl OffscreenTarget {
    /// Allocates a target the size of `viewport` and validates it.
    pub fn create<D: RenderDevice + ?Sized>(device: &mut D, viewport: Viewport) -> Result<Self> {
        let viewport = viewport.validate()?;
        let attachments = device.create_offscreen_target(viewport.width, viewport.height);

        if let TargetStatus::Incomplete(reason) = device.target_status(attachments.target) {
            log::error!(
                "Offscreen target {}x{} is incomplete: {reason}",
                viewport.width,
                viewport.height
            );
            device.destroy_offscreen_target(attachments.target);
            return Err(HaloError::IncompleteTarget {
                width: viewport.width,
                height: viewport.height,
                reason,
            });
        }

        log::debug!(
            "Created offscreen target {}x{}",
            viewport.width,
            viewport.height
        );
        Ok(Self { attachments })
    }

    #[must_use]
    pub fn matches(&self, viewport: Viewport) -> bool {
        self.size() == viewport
    }

    /// Recreates the target if `viewport` differs from its size.
    ///
    /// Returns whether a new target was allocated. On failure the old target
    /// has already been released.
    pub fn ensure_size<D: RenderDevice + ?Sized>(
        &mut self,
        device: &mut D,
        viewport: Viewport,
    ) -> Result<bool> {
        if self.matches(viewport) {
            return Ok(false);
        }
        let viewport = viewport.validate()?;
        device.destroy_offscreen_target(self.attachments.target);
        *self = Self::create(device, viewport)?;
        Ok(true)
    }

    pub fn release<D: RenderDevice + ?Sized>(self, device: &mut D) {
        device.destroy_offscreen_target(self.attachments.target);
    }

    #[must_use]
    pub fn handle(&self) -> TargetHandle {
        self.attachments.target
    }

    #[must_use]
    pub fn color_texture(&self) -> TextureHandle {
        self.attachments.color
    }

    #[must_use]
    pub fn size(&self) -> Viewport {
        Viewport::new(self.attachments.width, self.attachments.height)
    }
}
