//! Transform engine
//!
//! Handles the actual image transformation: header read → decode → resize or crop → encode.
//! Given the same source bytes and the same effective spec the output is
//! byte-identical, which is what lets racing resolution branches agree.

use fast_image_resize::{FilterType, Image, PixelType, ResizeAlg, Resizer};
use image::DynamicImage;
use std::num::NonZeroU32;

use super::codec::{self, OutputFormat};
use super::config::TransformConfig;
use super::error::TransformError;
use super::params::{CanonicalParams, TransformSpec};

/// Result of applying a transform
#[derive(Debug, Clone)]
pub struct Transformed {
    /// Encoded output bytes
    pub data: Vec<u8>,
    /// Spec after aspect resolution
    pub spec: TransformSpec,
    /// Canonical form of the effective spec
    pub effective: CanonicalParams,
    /// Source dimensions (width, height)
    pub source_size: (u32, u32),
    /// Output dimensions (width, height)
    pub output_size: (u32, u32),
    pub format: OutputFormat,
}

/// Crop rectangle inside the source image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Applies resize and crop transforms to encoded image bytes
#[derive(Debug, Clone, Default)]
pub struct TransformEngine {
    config: TransformConfig,
}

impl TransformEngine {
    pub fn new(config: TransformConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TransformConfig {
        &self.config
    }

    /// Read source dimensions without decoding, enforcing the source pixel limit
    pub fn read_dimensions(&self, source: &[u8]) -> Result<(u32, u32), TransformError> {
        let (width, height) = codec::read_dimensions(source)?;
        let pixels = width as u64 * height as u64;
        if pixels > self.config.max_source_pixels {
            return Err(TransformError::invalid_dimensions(
                width,
                height,
                format!(
                    "source has {} pixels, limit is {}",
                    pixels, self.config.max_source_pixels
                ),
            ));
        }
        Ok((width, height))
    }

    /// Apply `spec` to `source`
    ///
    /// Crop mode is selected when `x` or `y` is present, otherwise resize mode.
    pub fn apply(
        &self,
        source: &[u8],
        spec: &TransformSpec,
    ) -> Result<Transformed, TransformError> {
        // 1. Guard against oversized sources before allocating pixels
        let (source_w, source_h) = self.read_dimensions(source)?;
        let effective = spec.resolve_aspect(source_w, source_h);

        // 2. Decode
        let img = codec::decode(source)?;
        let (src_w, src_h) = (img.width(), img.height());

        // 3. Crop or resize
        let output = if effective.is_crop() {
            let rect = plan_crop(src_w, src_h, &effective)?;
            if rect.width == 0 || rect.height == 0 {
                return Err(TransformError::invalid_dimensions(
                    rect.width,
                    rect.height,
                    "crop extent must be positive",
                ));
            }
            img.crop_imm(rect.x, rect.y, rect.width, rect.height)
        } else {
            let (target_w, target_h) = plan_resize(src_w, src_h, &effective);
            self.check_output(target_w, target_h)?;
            if (target_w, target_h) == (src_w, src_h) {
                img
            } else {
                resize_image(&img, target_w, target_h)?
            }
        };

        // 4. Encode in a format derived from the source
        let format = OutputFormat::for_source(source);
        let output_size = (output.width(), output.height());
        let data = codec::encode(&output, format, self.config.jpeg_quality)?;

        Ok(Transformed {
            data,
            spec: effective,
            effective: effective.canonicalize(),
            source_size: (src_w, src_h),
            output_size,
            format,
        })
    }

    fn check_output(&self, width: u32, height: u32) -> Result<(), TransformError> {
        if width == 0 || height == 0 {
            return Err(TransformError::invalid_dimensions(
                width,
                height,
                "output dimensions must be positive",
            ));
        }
        if width > self.config.max_width || height > self.config.max_height {
            return Err(TransformError::invalid_dimensions(
                width,
                height,
                format!(
                    "exceeds maximum {}x{}",
                    self.config.max_width, self.config.max_height
                ),
            ));
        }
        Ok(())
    }
}

/// Target dimensions for resize mode; unset values default to the source
pub fn plan_resize(src_width: u32, src_height: u32, spec: &TransformSpec) -> (u32, u32) {
    (
        spec.width.unwrap_or(src_width),
        spec.height.unwrap_or(src_height),
    )
}

/// Crop rectangle for crop mode
///
/// Origin defaults to (0, 0); extent defaults to the remaining distance to
/// the source edge. Requires `x < W`, `y < H`, `x + w <= W`, `y + h <= H`.
pub fn plan_crop(
    src_width: u32,
    src_height: u32,
    spec: &TransformSpec,
) -> Result<CropRect, TransformError> {
    let x = spec.x.unwrap_or(0);
    let y = spec.y.unwrap_or(0);

    let out_of_bounds = |width: u32, height: u32| TransformError::CropOutOfBounds {
        x,
        y,
        width,
        height,
        source_width: src_width,
        source_height: src_height,
    };

    if x >= src_width || y >= src_height {
        return Err(out_of_bounds(
            spec.width.unwrap_or(0),
            spec.height.unwrap_or(0),
        ));
    }

    let width = spec.width.unwrap_or(src_width - x);
    let height = spec.height.unwrap_or(src_height - y);

    if x as u64 + width as u64 > src_width as u64 || y as u64 + height as u64 > src_height as u64 {
        return Err(out_of_bounds(width, height));
    }

    Ok(CropRect {
        x,
        y,
        width,
        height,
    })
}

/// Resize image using fast-image-resize with a bilinear filter
fn resize_image(
    img: &DynamicImage,
    target_w: u32,
    target_h: u32,
) -> Result<DynamicImage, TransformError> {
    let src_width = NonZeroU32::new(img.width())
        .ok_or_else(|| TransformError::resize_failed("Source width is 0"))?;
    let src_height = NonZeroU32::new(img.height())
        .ok_or_else(|| TransformError::resize_failed("Source height is 0"))?;
    let dst_width = NonZeroU32::new(target_w)
        .ok_or_else(|| TransformError::resize_failed("Target width is 0"))?;
    let dst_height = NonZeroU32::new(target_h)
        .ok_or_else(|| TransformError::resize_failed("Target height is 0"))?;

    let src_image = Image::from_vec_u8(
        src_width,
        src_height,
        img.to_rgba8().into_raw(),
        PixelType::U8x4,
    )
    .map_err(|e| {
        TransformError::resize_failed(format!("Failed to create source image: {:?}", e))
    })?;

    let mut dst_image = Image::new(dst_width, dst_height, PixelType::U8x4);
    let mut resizer = Resizer::new(ResizeAlg::Convolution(FilterType::Bilinear));

    resizer
        .resize(&src_image.view(), &mut dst_image.view_mut())
        .map_err(|e| TransformError::resize_failed(format!("Resize operation failed: {:?}", e)))?;

    let rgba_image = image::RgbaImage::from_raw(target_w, target_h, dst_image.into_vec())
        .ok_or_else(|| TransformError::resize_failed("Failed to create output image buffer"))?;

    Ok(DynamicImage::ImageRgba8(rgba_image))
}
