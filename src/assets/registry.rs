//! Missing-asset substitution.
//!
//! Loading is done by the asset collaborator; this registry only decides what
//! to bind when a load failed. A failed texture becomes the shared
//! placeholder, a failed cubemap face becomes a placeholder face. Each failing
//! label is reported once, not once per frame.

use rustc_hash::FxHashSet;

use super::handle::TextureHandle;
use super::image::{CubeFace, ImageData};
use crate::errors::{HaloError, Result};

#[derive(Debug)]
pub struct AssetRegistry {
    placeholder: TextureHandle,
    reported: FxHashSet<String>,
}

impl AssetRegistry {
    /// `placeholder` is the already-uploaded stand-in texture.
    #[must_use]
    pub fn new(placeholder: TextureHandle) -> Self {
        Self {
            placeholder,
            reported: FxHashSet::default(),
        }
    }

    #[must_use]
    pub fn placeholder(&self) -> TextureHandle {
        self.placeholder
    }

    /// Returns the loaded handle, or the placeholder if loading failed.
    pub fn resolve_texture(&mut self, label: &str, loaded: Result<TextureHandle>) -> TextureHandle {
        match loaded {
            Ok(handle) => handle,
            Err(err) => {
                self.report(label, &err);
                self.placeholder
            }
        }
    }

    /// Assembles six cubemap faces, substituting a placeholder image for each
    /// face that failed to load.
    ///
    /// `faces` must be in [`CubeFace::ALL`] order.
    pub fn resolve_cubemap_faces(
        &mut self,
        label: &str,
        faces: [Result<ImageData>; 6],
    ) -> [ImageData; 6] {
        let mut slot = 0;
        faces.map(|face| {
            let which = CubeFace::ALL[slot];
            slot += 1;
            face.unwrap_or_else(|err| {
                self.report(&format!("{label}/{}", which.conventional_name()), &err);
                ImageData::placeholder()
            })
        })
    }

    /// Whether `label` has failed at least once.
    #[must_use]
    pub fn is_missing(&self, label: &str) -> bool {
        self.reported.contains(label)
    }

    #[must_use]
    pub fn missing_count(&self) -> usize {
        self.reported.len()
    }

    fn report(&mut self, label: &str, err: &HaloError) {
        if self.reported.insert(label.to_owned()) {
            log::warn!("Asset '{label}' unavailable, using placeholder: {err}");
        }
    }
}
