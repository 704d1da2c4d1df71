use std::f32::consts::TAU;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/*
Oscillator
==========

A phase accumulator: `phase` walks from 0.0 to 1.0 once per cycle and a
waveform function turns that phase into a sample.

    phase_increment = frequency / sample_rate

Sine and triangle are smooth and used as-is. Sawtooth and square jump
instantly once per cycle; a naive jump aliases badly at high pitches, so we
smooth each discontinuity with a PolyBLEP residual (a two-sample polynomial
correction around the jump).

Custom waveforms are additive: up to MAX_PARTIALS harmonic amplitudes, summed
and normalised so the peak stays within ±1.
*/

/// Number of harmonic amplitudes a custom waveform can carry.
pub const MAX_PARTIALS: usize = 8;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum OscillatorWaveform {
    Sine,
    Square,
    #[strum(to_string = "sawtooth", serialize = "saw")]
    Sawtooth,
    Triangle,
    /// Additive waveform built from the configured partial amplitudes.
    Custom,
}

/// PolyBLEP residual for a discontinuity at phase 0.
#[inline]
fn poly_blep(phase: f32, increment: f32) -> f32 {
    if phase < increment {
        let t = phase / increment;
        2.0 * t - t * t - 1.0
    } else if phase > 1.0 - increment {
        let t = (phase - 1.0) / increment;
        t * t + 2.0 * t + 1.0
    } else {
        0.0
    }
}

#[inline]
fn wrap(phase: f32) -> f32 {
    phase - phase.floor()
}

/// Evaluate `waveform` at `phase` (0.0 - 1.0).
///
/// `increment` is the per-sample phase step, used for band-limiting.
pub fn shape(
    waveform: OscillatorWaveform,
    phase: f32,
    increment: f32,
    partials: &[f32; MAX_PARTIALS],
) -> f32 {
    let increment = increment.clamp(1e-6, 0.5);
    match waveform {
        OscillatorWaveform::Sine => (TAU * phase).sin(),
        OscillatorWaveform::Sawtooth => 2.0 * phase - 1.0 - poly_blep(phase, increment),
        OscillatorWaveform::Square => {
            let naive = if phase < 0.5 { 1.0 } else { -1.0 };
            naive + poly_blep(phase, increment) - poly_blep(wrap(phase + 0.5), increment)
        }
        OscillatorWaveform::Triangle => 4.0 * (wrap(phase + 0.75) - 0.5).abs() - 1.0,
        OscillatorWaveform::Custom => {
            let norm: f32 = partials.iter().map(|a| a.abs()).sum();
            if norm <= f32::EPSILON {
                return (TAU * phase).sin();
            }
            partials
                .iter()
                .enumerate()
                .filter(|(_, a)| **a != 0.0)
                .map(|(k, a)| a * (TAU * (k + 1) as f32 * phase).sin())
                .sum::<f32>()
                / norm
        }
    }
}

pub struct OscillatorBlock {
    waveform: OscillatorWaveform,
    phase: f32,
}

impl OscillatorBlock {
    pub fn new(waveform: OscillatorWaveform) -> Self {
        Self {
            waveform,
            phase: 0.0,
        }
    }

    pub fn sine() -> Self {
        Self::new(OscillatorWaveform::Sine)
    }

    pub fn sawtooth() -> Self {
        Self::new(OscillatorWaveform::Sawtooth)
    }

    pub fn square() -> Self {
        Self::new(OscillatorWaveform::Square)
    }

    pub fn triangle() -> Self {
        Self::new(OscillatorWaveform::Triangle)
    }

    /// Output the sample at the current phase (shifted by `phase_offset`
    /// cycles), then advance.
    #[inline]
    pub fn next_sample(
        &mut self,
        frequency: f32,
        sample_rate: f32,
        phase_offset: f32,
        partials: &[f32; MAX_PARTIALS],
    ) -> f32 {
        let increment = frequency / sample_rate;
        let phase = if phase_offset == 0.0 {
            self.phase
        } else {
            wrap(self.phase + phase_offset)
        };
        let sample = shape(self.waveform, phase, increment, partials);
        self.phase = wrap(self.phase + increment);
        sample
    }

    /// Fill `buffer` at a fixed frequency.
    pub fn render(&mut self, buffer: &mut [f32], frequency: f32, sample_rate: f32) {
        let partials = [0.0; MAX_PARTIALS];
        for sample in buffer.iter_mut() {
            *sample = self.next_sample(frequency, sample_rate, 0.0, &partials);
        }
    }

    /// Switch waveform without touching the phase.
    pub fn set_waveform(&mut self, waveform: OscillatorWaveform) {
        self.waveform = waveform;
    }

    pub fn waveform(&self) -> OscillatorWaveform {
        self.waveform
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }
}
