//! Scalar quantization between floats and 16-bit fixed point.
//!
//! Canonical policy:
//! - A NaN input is replaced by `0.0` *before* normalization, so it encodes
//!   to whatever code `0.0` has in the range (32768 for symmetric ranges).
//! - The normalized value is clamped to `[0, 1]`.
//! - Scaling to `[0, 65535]` rounds to nearest, ties away from zero.
//!
//! Arithmetic runs in f64 so that every backend produces the same codes.

use wind_common::{ChannelPair, ChannelRange, CodecResult, QUANT_LEVELS};

/// Bytes per encoded pixel (RGBA).
pub const PIXEL_BYTES: usize = 4;

/// One encoded grid cell: A-high, A-low, B-high, B-low.
pub type Pixel = [u8; PIXEL_BYTES];

/// Quantize `value` into `[min, max]`.
///
/// Fails with `InvalidRange` when `min >= max` or a bound is not finite.
pub fn encode_scalar(value: f32, min: f64, max: f64) -> CodecResult<u16> {
    let range = ChannelRange::new(min, max)?;
    Ok(quantize(value, &range))
}

/// Reconstruct a value from its code in `[min, max]`.
pub fn decode_scalar(code: u16, min: f64, max: f64) -> CodecResult<f32> {
    let range = ChannelRange::new(min, max)?;
    Ok(dequantize(code, &range))
}

/// Quantize `value` into a validated range.
#[inline(always)]
pub fn quantize(value: f32, range: &ChannelRange) -> u16 {
    let value = if value.is_nan() { 0.0 } else { value as f64 };
    let norm = ((value - range.min()) / range.span()).clamp(0.0, 1.0);
    (norm * QUANT_LEVELS).round() as u16
}

/// Reconstruct a value from a code in a validated range.
#[inline(always)]
pub fn dequantize(code: u16, range: &ChannelRange) -> f32 {
    (code as f64 / QUANT_LEVELS * range.span() + range.min()) as f32
}

/// Split two codes into big-endian halves.
#[inline(always)]
pub fn pack(a: u16, b: u16) -> Pixel {
    let [a_hi, a_lo] = a.to_be_bytes();
    let [b_hi, b_lo] = b.to_be_bytes();
    [a_hi, a_lo, b_hi, b_lo]
}

/// Inverse of [`pack`].
#[inline(always)]
pub fn unpack(pixel: Pixel) -> (u16, u16) {
    (
        u16::from_be_bytes([pixel[0], pixel[1]]),
        u16::from_be_bytes([pixel[2], pixel[3]]),
    )
}

/// Per-cell encode kernel shared by every execution strategy.
#[inline(always)]
pub fn encode_pixel(a: f32, b: f32, ranges: &ChannelPair) -> Pixel {
    pack(quantize(a, &ranges.a), quantize(b, &ranges.b))
}

/// Per-cell decode kernel shared by every execution strategy.
#[inline(always)]
pub fn decode_pixel(pixel: Pixel, ranges: &ChannelPair) -> (f32, f32) {
    let (a, b) = unpack(pixel);
    (dequantize(a, &ranges.a), dequantize(b, &ranges.b))
}
