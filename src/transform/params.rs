//! Transform parameter parsing and canonicalization
//!
//! A parameter fragment is a comma-separated `key=value` list over the
//! closed vocabulary `x`, `y`, `w`, `h`, `a`:
//!
//! ```text
//! w=800,h=600        resize to 800x600
//! w=100,h=1,a=0      resize to width 100, height derived from the source aspect
//! x=10,y=20,w=64     crop 64 pixels wide starting at (10, 20)
//! ```
//!
//! The canonical form emits keys in the fixed order `x,y,w,h,a`, so requests
//! that differ only in key order collapse onto the same cache key.

use std::fmt;
use std::str::FromStr;

use super::error::TransformError;

/// Recognized parameter keys, in canonical order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKey {
    X,
    Y,
    W,
    H,
    A,
}

impl ParamKey {
    /// All keys in canonical emission order
    pub const CANONICAL_ORDER: [ParamKey; 5] =
        [ParamKey::X, ParamKey::Y, ParamKey::W, ParamKey::H, ParamKey::A];

    pub fn as_str(&self) -> &'static str {
        match self {
            ParamKey::X => "x",
            ParamKey::Y => "y",
            ParamKey::W => "w",
            ParamKey::H => "h",
            ParamKey::A => "a",
        }
    }
}

impl FromStr for ParamKey {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "x" => Ok(ParamKey::X),
            "y" => Ok(ParamKey::Y),
            "w" => Ok(ParamKey::W),
            "h" => Ok(ParamKey::H),
            "a" => Ok(ParamKey::A),
            _ => Err(TransformError::invalid_param(s, "unknown parameter")),
        }
    }
}

/// How `w` and `h` interact with the source aspect ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AspectMode {
    /// `a=0`: when both `w` and `h` are given, `w` wins and `h` is derived
    Derive,
    /// `a=1` (or absent): use `w` and `h` literally
    #[default]
    Literal,
}

impl AspectMode {
    pub fn as_value(&self) -> u32 {
        match self {
            AspectMode::Derive => 0,
            AspectMode::Literal => 1,
        }
    }
}

/// A parsed set of transform parameters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TransformSpec {
    /// Crop origin X
    pub x: Option<u32>,
    /// Crop origin Y
    pub y: Option<u32>,
    /// Target (resize) or extent (crop) width
    pub width: Option<u32>,
    /// Target (resize) or extent (crop) height
    pub height: Option<u32>,
    /// Aspect-fix flag
    pub aspect: Option<AspectMode>,
}

impl TransformSpec {
    /// Parse a raw parameter fragment such as `w=800,h=600`
    ///
    /// An empty fragment is a valid "no transform" spec.
    pub fn parse(raw: &str) -> Result<Self, TransformError> {
        let mut spec = Self::default();
        if raw.is_empty() {
            return Ok(spec);
        }

        for token in raw.split(',') {
            let parts: Vec<&str> = token.split('=').collect();
            let (key, value) = match parts.as_slice() {
                [key, value] => (*key, *value),
                _ => {
                    return Err(TransformError::invalid_param(
                        token,
                        "expected exactly one '=' in key=value",
                    ))
                }
            };

            let key: ParamKey = key.parse()?;
            if spec.get(key).is_some() {
                return Err(TransformError::invalid_param(
                    key.as_str(),
                    "parameter given more than once",
                ));
            }
            let value = parse_value(key, value)?;
            spec.set(key, value)?;
        }

        Ok(spec)
    }

    /// Serialize to the canonical `key=value` form in `x,y,w,h,a` order
    pub fn canonicalize(&self) -> CanonicalParams {
        let parts: Vec<String> = ParamKey::CANONICAL_ORDER
            .iter()
            .filter_map(|key| self.get(*key).map(|v| format!("{}={}", key.as_str(), v)))
            .collect();
        CanonicalParams(parts.join(","))
    }

    /// Apply the aspect-fix rule against the source dimensions
    ///
    /// With `a=0` and both `w` and `h` set in resize mode, `h` is replaced by
    /// `round(source_height * w / source_width)`. Every other spec is returned
    /// unchanged. The result is idempotent for a given source.
    pub fn resolve_aspect(&self, source_width: u32, source_height: u32) -> Self {
        if !self.needs_aspect_resolution() || source_width == 0 {
            return *self;
        }
        let Some(width) = self.width else {
            return *self;
        };

        let numerator = source_height as u128 * width as u128;
        let denominator = source_width as u128;
        // round half up
        let derived = (2 * numerator + denominator) / (2 * denominator);

        Self {
            height: Some(u32::try_from(derived).unwrap_or(u32::MAX)),
            ..*self
        }
    }

    /// True when no parameters are present
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Crop mode is selected by the presence of either origin coordinate
    pub fn is_crop(&self) -> bool {
        self.x.is_some() || self.y.is_some()
    }

    /// True when the effective height depends on the source dimensions
    pub fn needs_aspect_resolution(&self) -> bool {
        !self.is_crop()
            && self.aspect == Some(AspectMode::Derive)
            && self.width.is_some()
            && self.height.is_some()
    }

    fn get(&self, key: ParamKey) -> Option<u32> {
        match key {
            ParamKey::X => self.x,
            ParamKey::Y => self.y,
            ParamKey::W => self.width,
            ParamKey::H => self.height,
            ParamKey::A => self.aspect.map(|a| a.as_value()),
        }
    }

    fn set(&mut self, key: ParamKey, value: u32) -> Result<(), TransformError> {
        match key {
            ParamKey::X => self.x = Some(value),
            ParamKey::Y => self.y = Some(value),
            ParamKey::W => self.width = Some(value),
            ParamKey::H => self.height = Some(value),
            ParamKey::A => {
                self.aspect = Some(match value {
                    0 => AspectMode::Derive,
                    1 => AspectMode::Literal,
                    _ => return Err(TransformError::invalid_param("a", "must be 0 or 1")),
                })
            }
        }
        Ok(())
    }
}

impl FromStr for TransformSpec {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn parse_value(key: ParamKey, value: &str) -> Result<u32, TransformError> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TransformError::invalid_param(
            key.as_str(),
            format!("'{}' is not a non-negative integer", value),
        ));
    }
    value.parse().map_err(|_| {
        TransformError::invalid_param(key.as_str(), format!("'{}' is out of range", value))
    })
}

/// Deterministic serialization of a [`TransformSpec`]
///
/// Two specs are cache-equivalent iff their canonical strings are equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalParams(String);

impl CanonicalParams {
    /// Parse any valid fragment and return its canonical form
    pub fn parse(raw: &str) -> Result<Self, TransformError> {
        Ok(TransformSpec::parse(raw)?.canonicalize())
    }

    /// Recover the spec this canonical string was produced from
    pub fn to_spec(&self) -> Result<TransformSpec, TransformError> {
        TransformSpec::parse(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CanonicalParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
