//! Error Types
//!
//! This module defines the error types used throughout the renderer.
//!
//! # Overview
//!
//! The main error type [`HaloError`] covers the failure modes the frame
//! pipeline can report:
//! - Offscreen render targets that fail their completeness check (fatal)
//! - Invalid viewport dimensions (non-fatal, the frame is skipped)
//! - Missing assets (non-fatal, substituted with a placeholder by the caller)
//! - Configuration and I/O errors
//!
//! Pass executors never return errors: every pass completes unconditionally
//! once the frame has started.
//!
//! # Usage
//!
//! ```rust,ignore
//! use halo::errors::{HaloError, Result};
//!
//! fn start() -> Result<()> {
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// The main error type for the renderer.
#[derive(Error, Debug)]
pub enum HaloError {
    // ========================================================================
    // Render Target Errors
    // ========================================================================
    /// The offscreen target did not report "complete" after creation.
    ///
    /// This is unrecoverable: the render loop must not be entered.
    #[error("Offscreen target {width}x{height} is not complete: {reason}")]
    IncompleteTarget {
        /// Requested width in pixels
        width: u32,
        /// Requested height in pixels
        height: u32,
        /// Device-specific description of the failed check
        reason: String,
    },

    /// The viewport reported zero or otherwise unusable dimensions.
    ///
    /// A minimized window reports this; callers skip the frame and retry.
    #[error("Invalid viewport dimensions: {width}x{height}")]
    InvalidViewport {
        /// Reported width in pixels
        width: u32,
        /// Reported height in pixels
        height: u32,
    },

    // ========================================================================
    // Asset Errors
    // ========================================================================
    /// A texture or cubemap face could not be loaded.
    #[error("Asset '{label}' failed to load: {reason}")]
    MissingAsset {
        /// Name or path of the asset
        label: String,
        /// Why loading failed
        reason: String,
    },

    /// A handle did not resolve to a resident resource.
    #[error("Unknown handle: {0}")]
    UnknownHandle(String),

    // ========================================================================
    // Configuration & I/O Errors
    // ========================================================================
    /// Renderer settings could not be parsed.
    #[error("Settings parse error: {0}")]
    Settings(#[from] serde_json::Error),

    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ========================================================================
    // GPU Errors
    // ========================================================================
    /// Failed to request a compatible GPU adapter.
    #[cfg(feature = "wgpu")]
    #[error("Failed to request WGPU adapter: {0}")]
    AdapterRequestFailed(String),

    /// Failed to create the GPU device.
    #[cfg(feature = "wgpu")]
    #[error("Failed to create WGPU device: {0}")]
    DeviceCreateFailed(#[from] wgpu::RequestDeviceError),

    /// The presentation surface could not provide a frame.
    #[cfg(feature = "wgpu")]
    #[error("Surface error: {0}")]
    Surface(String),
}

impl HaloError {
    /// Returns `true` for errors after which the render loop must stop.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::MissingAsset { .. } | Self::InvalidViewport { .. }
        )
    }
}

/// Alias for `Result<T, HaloError>`.
pub type Result<T> = std::result::Result<T, HaloError>;
