// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Error types for the annotation service.

use std::fmt;

/// Result type alias for annotation operations.
pub type Result<T> = std::result::Result<T, AnnotatorError>;

/// Main error type for the annotation service.
///
/// Every variant except [`AnnotatorError::Request`] and
/// [`AnnotatorError::PayloadTooLarge`] is a processing failure and is reported to
/// HTTP clients as a 500 with the message as `detail`.
#[derive(Debug)]
pub enum AnnotatorError {
    /// Error loading the ONNX model.
    ModelLoad(String),
    /// Error decoding the input image bytes.
    Decode(String),
    /// Error during model inference or output decoding.
    Inference(String),
    /// Error drawing the skeleton overlay.
    Render(String),
    /// Error encoding the output image.
    Encode(String),
    /// Invalid configuration provided.
    Config(String),
    /// Malformed request (missing field, bad form value).
    Request(String),
    /// Request body larger than the configured limit.
    PayloadTooLarge(String),
    /// Wrapped `std::io::Error`.
    Io(std::io::Error),
}

impl AnnotatorError {
    /// Whether this error was caused by the client request rather than processing.
    #[must_use]
    pub const fn is_request_error(&self) -> bool {
        matches!(self, Self::Request(_) | Self::PayloadTooLarge(_))
    }
}

impl fmt::Display for AnnotatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ModelLoad(msg) => write!(f, "Model load error: {msg}"),
            Self::Decode(msg) => write!(f, "Image decode error: {msg}"),
            Self::Inference(msg) => write!(f, "Inference error: {msg}"),
            Self::Render(msg) => write!(f, "Render error: {msg}"),
            Self::Encode(msg) => write!(f, "Image encode error: {msg}"),
            Self::Config(msg) => write!(f, "Config error: {msg}"),
            Self::Request(msg) => write!(f, "Invalid request: {msg}"),
            Self::PayloadTooLarge(msg) => write!(f, "Payload too large: {msg}"),
            Self::Io(err) => write!(f, "IO error: {err}"),
        }
    }
}

impl std::error::Error for AnnotatorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for AnnotatorError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<image::ImageError> for AnnotatorError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::Encoding(e) => Self::Encode(e.to_string()),
            other => Self::Decode(other.to_string()),
        }
    }
}
