//! Error types for chat statistics.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for chat statistics operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading a transcript or producing statistics.
#[derive(Debug, Error)]
pub enum Error {
    /// Reading the transcript or writing the output failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The transcript is not valid JSON or does not have a `messages` array.
    #[error("malformed transcript: {0}")]
    Parse(#[from] serde_json::Error),

    /// The transcript file is not valid UTF-8.
    #[error("transcript is not valid UTF-8")]
    InvalidUtf8,

    /// A transcript, stopword list or font file does not exist.
    #[error("resource not found: {}", path.display())]
    ResourceNotFound {
        /// The path that was looked up.
        path: PathBuf,
    },

    /// The word cloud could not be rendered.
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Failures specific to word cloud rendering.
#[derive(Debug, Error)]
pub enum RenderError {
    /// No word survived filtering, so there is nothing to draw.
    #[error("no words left to render; the chat may be empty, non-Persian or entirely stopwords")]
    EmptyText,

    /// The font file exists but could not be parsed.
    #[error("invalid font file: {}", path.display())]
    InvalidFont {
        /// The font path.
        path: PathBuf,
    },

    /// The background color is neither a known name nor a hex code.
    #[error("unknown color: {0}")]
    UnknownColor(String),

    /// Encoding or saving the image failed.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

impl Error {
    /// Maps a `NotFound` io error on `path` to [`Error::ResourceNotFound`].
    pub(crate) fn from_io(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Error::ResourceNotFound { path: path.into() }
        } else {
            Error::Io(err)
        }
    }
}
