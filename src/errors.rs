//! Error Types
//!
//! This module defines the error types used throughout the crate.
//!
//! # Overview
//!
//! The main error type [`PostFxError`] covers:
//! - GPU adapter and device acquisition failures
//! - Render targets that fail their completeness check
//! - Invalid or unreadable configuration
//!
//! # Usage
//!
//! All fallible public APIs return [`Result<T>`], an alias for
//! `std::result::Result<T, PostFxError>`.
//!
//! ```rust,ignore
//! use glowcast::errors::{PostFxError, Result};
//!
//! fn build() -> Result<()> {
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// The main error type for the crate.
#[derive(Error, Debug)]
pub enum PostFxError {
    // ========================================================================
    // GPU & Rendering Errors
    // ========================================================================
    /// Failed to request a compatible GPU adapter.
    #[error("Failed to request WGPU adapter: {0}")]
    AdapterRequestFailed(String),

    /// Failed to create the GPU device.
    #[error("Failed to create WGPU device: {0}")]
    DeviceCreateFailed(#[from] wgpu::RequestDeviceError),

    /// A render target did not pass its completeness check.
    ///
    /// Raised before any GPU allocation happens, so a failed
    /// initialization never leaves a partially built target behind.
    #[error("Render target '{target}' is incomplete: {reason}")]
    InitializationFailure {
        /// Debug label of the offending target
        target: String,
        /// Human readable cause
        reason: String,
    },

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// A setting is outside the range the renderer can honor.
    #[error("Invalid setting `{name}`: {reason}")]
    InvalidSetting {
        /// Dotted path of the setting
        name: &'static str,
        /// Why the value was rejected
        reason: String,
    },

    /// File I/O error while reading a settings file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings JSON could not be parsed.
    #[error("Settings parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Alias for `Result<T, PostFxError>`.
pub type Result<T> = std::result::Result<T, PostFxError>;

impl PostFxError {
    pub(crate) fn incomplete(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InitializationFailure {
            target: target.into(),
            reason: reason.into(),
        }
    }
}
