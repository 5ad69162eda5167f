//! Error types for the binding layer

use serde::{Deserialize, Serialize};

/// Animation bytes could not be turned into a composition.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("cannot decode {len} bytes: {reason}")]
pub struct DecodeError {
    pub reason: String,
    pub len: usize,
}

impl DecodeError {
    pub fn new(reason: impl Into<String>, len: usize) -> Self {
        Self {
            reason: reason.into(),
            len,
        }
    }
}

/// Error type shared by the binding core and its adapters.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum BindingError {
    /// Malformed or unsupported animation bytes. The previous composition is kept.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Offscreen surface could not be created for the requested size.
    #[error("cannot attach a {width}x{height} surface: {reason}")]
    Attachment {
        width: u32,
        height: u32,
        reason: String,
    },

    /// A command reached a handle that was already released. Reported, never raised.
    #[error("'{operation}' ignored: player handle already released")]
    UseAfterRelease { operation: String },

    /// Binding configuration could not be parsed.
    #[error("config error: {reason}")]
    Config { reason: String },
}

impl BindingError {
    pub fn attachment(width: u32, height: u32, reason: impl Into<String>) -> Self {
        Self::Attachment {
            width,
            height,
            reason: reason.into(),
        }
    }

    pub fn use_after_release(operation: impl Into<String>) -> Self {
        Self::UseAfterRelease {
            operation: operation.into(),
        }
    }

    /// True when the binding keeps working after this error and a later state
    /// change may succeed.
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Decode(_) | Self::Attachment { .. })
    }

    /// Short category name for logging.
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Decode(_) => "decode",
            Self::Attachment { .. } => "attachment",
            Self::UseAfterRelease { .. } => "lifecycle",
            Self::Config { .. } => "config",
        }
    }
}

impl From<serde_json::Error> for BindingError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config {
            reason: err.to_string(),
        }
    }
}
