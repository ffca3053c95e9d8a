//! Image transform module
//!
//! Provides:
//! - Parameter parsing and canonicalization (`x,y,w,h,a`)
//! - Resize (bilinear) and crop transforms
//! - Format-preserving re-encoding (JPEG stays JPEG, everything else becomes PNG)
//!
//! # Parameter Format
//!
//! ```text
//! w=800,h=600,a=1
//! x=10,y=10,w=64,h=64
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod params;
pub mod processor;

pub use codec::OutputFormat;
pub use config::TransformConfig;
pub use error::TransformError;
pub use params::{AspectMode, CanonicalParams, ParamKey, TransformSpec};
pub use processor::{plan_crop, plan_resize, CropRect, TransformEngine, Transformed};
