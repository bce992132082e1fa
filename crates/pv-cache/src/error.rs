//! Error types for rendering.

use std::path::PathBuf;

/// Failure reported by a [`Transform`](crate::Transform) implementation.
///
/// Returned directly from the transform call. `code` is the engine's own
/// error number (for `xsltproc`, its exit status).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} (code {code})")]
pub struct TransformError {
    /// Human-readable diagnostic from the engine.
    pub message: String,
    /// Engine-specific error code.
    pub code: i32,
}

impl TransformError {
    /// Create a transform error.
    #[must_use]
    pub fn new(message: impl Into<String>, code: i32) -> Self {
        Self {
            message: message.into(),
            code,
        }
    }
}

/// Error from resolving or rendering a [`RenderRequest`](crate::RenderRequest).
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Source document does not exist.
    #[error("Source document not found: {}", .0.display())]
    MissingInput(PathBuf),
    /// Stylesheet does not exist.
    #[error("Stylesheet not found: {}", .0.display())]
    MissingStylesheet(PathBuf),
    /// The transform capability failed. The cache file was not touched.
    #[error("Transform failed: {0}")]
    Transform(#[from] TransformError),
    /// Metadata lookup, cache read, or cache write failed.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl RenderError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
