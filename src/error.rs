//! Error types for the encoding workflow.

use std::path::PathBuf;

use thiserror::Error;

use crate::qrcode::DataTooLong;

/// A failed encode. Kept on the session behind a `Failed` status, hence `Clone`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// The text does not fit the largest QR version at the configured level.
    #[error("input exceeds QR code capacity: {0}")]
    CapacityExceeded(#[from] DataTooLong),

    /// The raster could not be written as PNG.
    #[error("PNG encoding failed: {0}")]
    Png(String),

    /// The background encode task panicked or was cancelled by its runtime.
    #[error("encode task aborted: {0}")]
    TaskAborted(String),
}

impl From<image::ImageError> for EncodeError {
    fn from(err: image::ImageError) -> Self {
        EncodeError::Png(err.to_string())
    }
}

/// Errors returned by workflow operations.
#[derive(Error, Debug)]
pub enum WorkflowError {
    /// A second encode was requested while one is still pending.
    #[error("an encode is already in flight")]
    EncodeInFlight,

    /// The PNG could not be written to the download directory.
    #[error("failed to write {path}: {source}")]
    Download {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The clipboard backend refused the write or could not be opened.
    #[error("clipboard write failed: {0}")]
    Clipboard(String),
}

/// Result type alias for workflow operations
pub type Result<T> = std::result::Result<T, WorkflowError>;
