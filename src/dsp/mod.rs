//! Low-level DSP primitives used by the voice and effect layers.
//!
//! These components are allocation-free and realtime-safe once constructed,
//! making them safe to embed directly inside voice and effect structs. They
//! intentionally stay focused on the signal-processing math so the voice pool
//! and the signal chain can layer on orchestration.

/// Time-domain delay line with fractional reads.
pub mod delay;
/// Waveshaping transfer functions and bit reduction.
pub mod distortion;
/// Attack/decay/sustain/release envelope generator.
pub mod envelope;
/// State-variable filter implementation with multiple responses.
pub mod filter;
/// Low frequency oscillator helpers.
pub mod lfo;
/// Output-stage peak limiter (the chain's sink).
pub mod limiter;
/// Dry/wet and summing helpers.
pub mod mix;
/// Oscillator waveforms.
pub mod oscillator;
/// Schroeder reverb network.
pub mod reverb;
/// Click-free parameter ramps.
pub mod smooth;

pub use envelope::EnvelopeState;

/// Reference pitch of A4 in Hz.
pub const A4_REFERENCE: f32 = 440.0;

/// Convert a note number plus octave shift to a frequency in Hz.
///
/// Equal-tempered, anchored so that note 69 with no shift is exactly
/// `A4_REFERENCE`:
///
/// ```
/// use saavy_modular::dsp::note_to_freq;
/// assert_eq!(note_to_freq(69, 0), 440.0);
/// assert!((note_to_freq(57, 1) - 440.0).abs() < 1e-3);
/// ```
#[inline]
pub fn note_to_freq(note: u8, octave_shift: i8) -> f32 {
    let semitones = note as f32 + 12.0 * octave_shift as f32 - 9.0;
    (A4_REFERENCE / 32.0) * 2.0_f32.powf(semitones / 12.0)
}

/// Context passed to DSP blocks during rendering
///
/// - sample_rate: Audio sample rate (e.g., 48000.0)
/// - frequency: Pitch to render (Hz), only meaningful for oscillators
/// - velocity: Intensity (0.0-127.0, MIDI-style)
#[derive(Debug, Clone, Copy)]
pub struct RenderCtx {
    pub sample_rate: f32,
    pub frequency: f32,
    pub velocity: f32,
}

impl RenderCtx {
    /// Create context from a direct frequency
    pub fn from_freq(sample_rate: f32, frequency: f32, velocity: f32) -> Self {
        Self {
            sample_rate,
            frequency,
            velocity,
        }
    }

    /// Context for effect processing, where pitch is irrelevant
    pub fn effect(sample_rate: f32) -> Self {
        Self::from_freq(sample_rate, 0.0, 0.0)
    }

    #[inline]
    pub fn seconds_to_samples(&self, seconds: f32) -> u32 {
        (seconds * self.sample_rate).round().max(1.0) as u32
    }
}
