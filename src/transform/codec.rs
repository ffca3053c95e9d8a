//! Image decode/encode boundary
//!
//! Everything that touches a concrete file format lives here; the processor
//! only sees `DynamicImage` values.

use image::io::Reader as ImageReader;
use image::{DynamicImage, ImageFormat, ImageOutputFormat};
use std::io::Cursor;

use super::error::TransformError;

/// Format a derived artifact is written in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    Png,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
        }
    }

    /// JPEG stays JPEG; every other source format is written as PNG
    pub fn for_source(data: &[u8]) -> Self {
        match image::guess_format(data) {
            Ok(ImageFormat::Jpeg) => OutputFormat::Jpeg,
            _ => OutputFormat::Png,
        }
    }
}

fn reader(data: &[u8]) -> Result<ImageReader<Cursor<&[u8]>>, TransformError> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| TransformError::decode_failed(e.to_string()))?;
    if reader.format().is_none() {
        return Err(TransformError::unsupported_format("unrecognized image data"));
    }
    Ok(reader)
}

/// Read image dimensions from the header without decoding pixels
pub fn read_dimensions(data: &[u8]) -> Result<(u32, u32), TransformError> {
    reader(data)?
        .into_dimensions()
        .map_err(|e| TransformError::decode_failed(e.to_string()))
}

/// Decode image data into a DynamicImage
pub fn decode(data: &[u8]) -> Result<DynamicImage, TransformError> {
    reader(data)?
        .decode()
        .map_err(|e| TransformError::decode_failed(e.to_string()))
}

/// Encode an image; both encoders are deterministic for identical pixels
pub fn encode(
    img: &DynamicImage,
    format: OutputFormat,
    jpeg_quality: u8,
) -> Result<Vec<u8>, TransformError> {
    let mut buffer = Cursor::new(Vec::new());
    let result = match format {
        OutputFormat::Jpeg => DynamicImage::ImageRgb8(img.to_rgb8())
            .write_to(&mut buffer, ImageOutputFormat::Jpeg(jpeg_quality)),
        OutputFormat::Png => img.write_to(&mut buffer, ImageOutputFormat::Png),
    };
    result.map_err(|e| TransformError::encode_failed(format.as_str(), e.to_string()))?;
    Ok(buffer.into_inner())
}
