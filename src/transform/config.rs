use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformConfig {
    /// Maximum allowed output width (to prevent abuse)
    #[serde(default = "default_max_width")]
    pub max_width: u32,

    /// Maximum allowed output height
    #[serde(default = "default_max_height")]
    pub max_height: u32,

    /// Largest source image (width * height) that will be decoded
    #[serde(default = "default_max_source_pixels")]
    pub max_source_pixels: u64,

    /// Quality used when re-encoding JPEG sources
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            max_width: default_max_width(),
            max_height: default_max_height(),
            max_source_pixels: default_max_source_pixels(),
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

impl TransformConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_width == 0 || self.max_height == 0 {
            return Err("transform max_width and max_height must be greater than 0".to_string());
        }
        if self.max_source_pixels == 0 {
            return Err("transform max_source_pixels must be greater than 0".to_string());
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(format!(
                "transform jpeg_quality must be 1-100, got {}",
                self.jpeg_quality
            ));
        }
        Ok(())
    }
}

fn default_max_width() -> u32 {
    8192
}

fn default_max_height() -> u32 {
    8192
}

fn default_max_source_pixels() -> u64 {
    100_000_000 // 100 megapixels
}

fn default_jpeg_quality() -> u8 {
    85
}
