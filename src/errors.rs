//! Error Types
//!
//! This module defines the error type shared by the loader and the
//! animation runtime.
//!
//! # Overview
//!
//! [`Error`] follows a three-way taxonomy, exposed through [`Error::kind`]:
//! - [`ErrorKind::MalformedAsset`]: the manifest or its buffers are
//!   structurally invalid (missing accessor, out-of-range index, bad skin)
//! - [`ErrorKind::UnknownChannelType`]: an animation channel targets a
//!   property other than translation, rotation or scale
//! - [`ErrorKind::AssetFetchFailure`]: reading, downloading or decoding an
//!   external resource failed
//!
//! A fourth kind, [`ErrorKind::CallerContract`], covers misuse of the
//! per-frame API (stale entity handles, unknown clip names).
//!
//! None of these are retried internally; every failure propagates to the
//! caller of [`load_model`](crate::assets::load_model) or of the
//! [`Animator`](crate::animation::Animator).
//!
//! # Usage
//!
//! ```rust,ignore
//! use skinpose::errors::{ErrorKind, Result};
//!
//! async fn load() -> Result<()> {
//!     match skinpose::assets::load_model("models/fox.gltf").await {
//!         Ok(model) => println!("{} nodes", model.nodes.len()),
//!         Err(e) if e.kind() == ErrorKind::AssetFetchFailure => { /* retry later */ }
//!         Err(e) => return Err(e),
//!     }
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// The main error type for the asset-to-pose pipeline.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Malformed Assets
    // ========================================================================
    /// The manifest or its binary data violates the asset format.
    #[error("Malformed asset: {0}")]
    MalformedAsset(String),

    /// An index in the manifest points past the end of its target array.
    #[error("Asset index out of bounds: {context} (index: {index})")]
    AccessorOutOfBounds {
        /// Description of what was being accessed
        context: String,
        /// The invalid index
        index: usize,
    },

    // ========================================================================
    // Animation Errors
    // ========================================================================
    /// An animation channel targets an unsupported property.
    #[error("Unknown animation channel type: {0}")]
    UnknownChannelType(String),

    // ========================================================================
    // Fetch & Decode Errors
    // ========================================================================
    /// A buffer, image or manifest could not be read or decoded.
    #[error("Failed to fetch asset {uri}: {reason}")]
    AssetFetchFailure {
        /// The URI (or a label for embedded data) that failed
        uri: String,
        /// Human readable cause
        reason: String,
    },

    /// Feature not enabled.
    #[error("Feature not enabled: {0}")]
    FeatureNotEnabled(String),

    // ========================================================================
    // Runtime Contract Errors
    // ========================================================================
    /// The entity handle does not belong to this animator (or was removed).
    #[error("Animated entity not found")]
    EntityNotFound,

    /// The active clip key has no matching clip in the model.
    #[error("Animation clip not found: {0}")]
    ClipNotFound(String),
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MalformedAsset,
    UnknownChannelType,
    AssetFetchFailure,
    CallerContract,
}

impl Error {
    /// Shorthand for [`Error::MalformedAsset`].
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedAsset(msg.into())
    }

    pub(crate) fn out_of_bounds(context: impl Into<String>, index: usize) -> Self {
        Self::AccessorOutOfBounds {
            context: context.into(),
            index,
        }
    }

    pub(crate) fn fetch(uri: impl Into<String>, reason: impl ToString) -> Self {
        Self::AssetFetchFailure {
            uri: uri.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns the taxonomy bucket this error belongs to.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedAsset(_) | Self::AccessorOutOfBounds { .. } => ErrorKind::MalformedAsset,
            Self::UnknownChannelType(_) => ErrorKind::UnknownChannelType,
            Self::AssetFetchFailure { .. } | Self::FeatureNotEnabled(_) => {
                ErrorKind::AssetFetchFailure
            }
            Self::EntityNotFound | Self::ClipNotFound(_) => ErrorKind::CallerContract,
        }
    }
}

// ============================================================================
// Convenient conversion implementations
// ============================================================================

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::MalformedAsset(format!("invalid manifest JSON: {err}"))
    }
}

impl From<base64::DecodeError> for Error {
    fn from(err: base64::DecodeError) -> Self {
        Error::MalformedAsset(format!("invalid base64 payload: {err}"))
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::fetch("<decode task>", err)
    }
}

/// Alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
