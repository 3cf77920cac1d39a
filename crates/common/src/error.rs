//! Error types shared across FaceIt crates.

use std::path::PathBuf;

/// Top-level error type for FaceIt operations.
#[derive(Debug, thiserror::Error)]
pub enum FaceitError {
    /// An explicitly requested camera failed to open or to yield a frame.
    #[error("Camera {index} unavailable: {message}")]
    DeviceUnavailable { index: u32, message: String },

    /// Auto-probing exhausted every candidate index.
    #[error("No camera found (probed indices 0..{probed})")]
    NoDeviceFound { probed: u32 },

    /// The persistent video sink could not be created.
    #[error("Failed to open video sink at {path}: {message}")]
    SinkOpenFailure { path: PathBuf, message: String },

    #[error("Capture error: {message}")]
    Capture { message: String },

    #[error("Analyzer error: {message}")]
    Analyzer { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Export error: {message}")]
    Export { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using FaceitError.
pub type FaceitResult<T> = Result<T, FaceitError>;

impl FaceitError {
    pub fn device_unavailable(index: u32, msg: impl Into<String>) -> Self {
        Self::DeviceUnavailable {
            index,
            message: msg.into(),
        }
    }

    pub fn sink_open(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::SinkOpenFailure {
            path: path.into(),
            message: msg.into(),
        }
    }

    pub fn capture(msg: impl Into<String>) -> Self {
        Self::Capture {
            message: msg.into(),
        }
    }

    pub fn analyzer(msg: impl Into<String>) -> Self {
        Self::Analyzer {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export {
            message: msg.into(),
        }
    }

    /// Whether the caller can reasonably retry with a different device.
    pub fn is_device_error(&self) -> bool {
        matches!(
            self,
            Self::DeviceUnavailable { .. } | Self::NoDeviceFound { .. }
        )
    }
}
