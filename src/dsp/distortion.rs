//! Distortion / Waveshaping
//!
//! Distortion adds harmonics by reshaping the waveform. Each function here is
//! a memoryless transfer function applied per sample:
//!
//!   output = f(input)
//!
//! # Transfer functions
//!
//! Soft clip:   f(x) = x / (1 + |x|)        warm, asymptotic to ±1
//! Curve:       (1 + k)·x / (1 + k·|x|)     adjustable knee, k from `amount`
//! Quantize:    round(x · L) / L            bit reduction, L = 2^(bits-1)

/// Soft clipping using x / (1 + |x|) transfer function.
#[inline]
pub fn soft_clip(sample: f32, drive: f32) -> f32 {
    let x = sample * drive;
    x / (1.0 + x.abs())
}

/// Waveshaper curve with an adjustable knee.
///
/// `amount` in 0..1 maps to a knee of k = 2·amount / (1 - amount); 0 is
/// linear, values towards 1 approach a square.
#[inline]
pub fn shape_curve(sample: f32, amount: f32) -> f32 {
    let amount = amount.clamp(0.0, 0.99);
    let k = 2.0 * amount / (1.0 - amount);
    let x = sample.clamp(-1.0, 1.0);
    (1.0 + k) * x / (1.0 + k * x.abs())
}

/// Reduce `sample` to `bits` of resolution.
#[inline]
pub fn quantize(sample: f32, bits: f32) -> f32 {
    let levels = 2.0_f32.powf(bits.clamp(1.0, 16.0) - 1.0);
    (sample.clamp(-1.0, 1.0) * levels).round() / levels
}
