//! Transform error types
//!
//! Structured errors for parameter parsing and image transformation,
//! with an HTTP status mapping for front ends that need one.

use std::fmt;

/// Errors that can occur while parsing parameters or transforming an image
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    // === Parameter Errors ===
    /// Malformed, unknown, duplicate or out-of-range parameter
    InvalidParameter { param: String, message: String },
    /// Requested output dimensions are invalid
    InvalidDimensions {
        width: u32,
        height: u32,
        reason: String,
    },
    /// Crop rectangle does not fit inside the source image
    CropOutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        source_width: u32,
        source_height: u32,
    },

    // === Codec Errors ===
    /// Image format is not supported
    UnsupportedFormat { format: String },
    /// Failed to decode image data
    DecodeFailed { message: String },
    /// Resize operation failed
    ResizeFailed { message: String },
    /// Encoding to output format failed
    EncodeFailed { format: String, message: String },
}

impl fmt::Display for TransformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformError::InvalidParameter { param, message } => {
                write!(f, "Invalid parameter '{}': {}", param, message)
            }
            TransformError::InvalidDimensions {
                width,
                height,
                reason,
            } => {
                write!(f, "Invalid dimensions {}x{}: {}", width, height, reason)
            }
            TransformError::CropOutOfBounds {
                x,
                y,
                width,
                height,
                source_width,
                source_height,
            } => {
                write!(
                    f,
                    "Crop {}x{} at ({}, {}) exceeds source bounds {}x{}",
                    width, height, x, y, source_width, source_height
                )
            }
            TransformError::UnsupportedFormat { format } => {
                write!(f, "Unsupported image format: {}", format)
            }
            TransformError::DecodeFailed { message } => {
                write!(f, "Failed to decode image: {}", message)
            }
            TransformError::ResizeFailed { message } => {
                write!(f, "Resize failed: {}", message)
            }
            TransformError::EncodeFailed { format, message } => {
                write!(f, "Failed to encode to {}: {}", format, message)
            }
        }
    }
}

impl std::error::Error for TransformError {}

impl TransformError {
    /// Maps transform errors to HTTP status codes
    ///
    /// - InvalidParameter, InvalidDimensions, CropOutOfBounds, DecodeFailed → 400
    /// - UnsupportedFormat → 415
    /// - ResizeFailed, EncodeFailed → 500
    pub fn to_http_status(&self) -> u16 {
        match self {
            TransformError::InvalidParameter { .. }
            | TransformError::InvalidDimensions { .. }
            | TransformError::CropOutOfBounds { .. }
            | TransformError::DecodeFailed { .. } => 400,

            TransformError::UnsupportedFormat { .. } => 415,

            TransformError::ResizeFailed { .. } | TransformError::EncodeFailed { .. } => 500,
        }
    }

    /// True when the caller must resubmit with different parameters.
    /// Codec failures are not caller errors.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            TransformError::InvalidParameter { .. }
                | TransformError::InvalidDimensions { .. }
                | TransformError::CropOutOfBounds { .. }
        )
    }

    pub fn invalid_param(param: impl Into<String>, message: impl Into<String>) -> Self {
        TransformError::InvalidParameter {
            param: param.into(),
            message: message.into(),
        }
    }

    pub fn invalid_dimensions(width: u32, height: u32, reason: impl Into<String>) -> Self {
        TransformError::InvalidDimensions {
            width,
            height,
            reason: reason.into(),
        }
    }

    pub fn unsupported_format(format: impl Into<String>) -> Self {
        TransformError::UnsupportedFormat {
            format: format.into(),
        }
    }

    pub fn decode_failed(message: impl Into<String>) -> Self {
        TransformError::DecodeFailed {
            message: message.into(),
        }
    }

    pub fn resize_failed(message: impl Into<String>) -> Self {
        TransformError::ResizeFailed {
            message: message.into(),
        }
    }

    pub fn encode_failed(format: impl Into<String>, message: impl Into<String>) -> Self {
        TransformError::EncodeFailed {
            format: format.into(),
            message: message.into(),
        }
    }
}
