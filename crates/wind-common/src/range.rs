//! Channel value ranges and the named channel-pair presets.

use serde::{Deserialize, Serialize};

use crate::error::{CodecError, CodecResult};

/// Number of distinct steps in a 16-bit quantized sample.
pub const QUANT_LEVELS: f64 = 65535.0;

/// Valid value range of one channel.
///
/// Construction validates `min < max` with both bounds finite, so code that
/// holds a `ChannelRange` never divides by a zero span.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRange")]
pub struct ChannelRange {
    min: f64,
    max: f64,
}

#[derive(Deserialize)]
struct RawRange {
    min: f64,
    max: f64,
}

impl TryFrom<RawRange> for ChannelRange {
    type Error = CodecError;

    fn try_from(raw: RawRange) -> CodecResult<Self> {
        ChannelRange::new(raw.min, raw.max)
    }
}

impl ChannelRange {
    /// Create a validated range.
    pub fn new(min: f64, max: f64) -> CodecResult<Self> {
        if !min.is_finite() || !max.is_finite() || min >= max {
            return Err(CodecError::InvalidRange { min, max });
        }
        Ok(Self { min, max })
    }

    const fn preset(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Lower bound.
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Upper bound.
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Width of the range, always positive.
    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    /// Quantization step, the bound on reconstruction error.
    pub fn step(&self) -> f64 {
        self.span() / QUANT_LEVELS
    }

    /// Check if a value lies inside the range (inclusive).
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// The two ranges co-encoded into one pixel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelPair {
    /// Range of channel A (high bytes of the pixel).
    pub a: ChannelRange,
    /// Range of channel B (low bytes of the pixel).
    pub b: ChannelRange,
}

impl ChannelPair {
    /// Latitude in [-90, 90], longitude in [-180, 180].
    pub const COORDS: ChannelPair = ChannelPair {
        a: ChannelRange::preset(-90.0, 90.0),
        b: ChannelRange::preset(-180.0, 180.0),
    };

    /// U and V wind components in [-50, 50] m/s.
    pub const WIND: ChannelPair = ChannelPair {
        a: ChannelRange::preset(-50.0, 50.0),
        b: ChannelRange::preset(-50.0, 50.0),
    };

    /// Create a pair from two validated ranges.
    pub fn new(a: ChannelRange, b: ChannelRange) -> Self {
        Self { a, b }
    }

    /// Look up a preset by name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "coords" | "coordinates" => Some(Self::COORDS),
            "wind" | "uv" => Some(Self::WIND),
            _ => None,
        }
    }
}
