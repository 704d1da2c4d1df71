use std::f32::consts::PI;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/*
| type              | passes          | rejects      |
| ----------------- | --------------- | ------------ |
| low-pass          | below cutoff    | above cutoff |
| high-pass         | above cutoff    | below cutoff |
| band-pass         | around cutoff   | outside      |
| notch / band-stop | outside         | at cutoff    |

Topology-preserving-transform state-variable filter. One structure yields all
four responses at once; `filter_type` picks which one is returned.

  g = tan(π · cutoff / sample_rate)     (pre-warped integrator gain)
  k = 2 - 2 · resonance                 (damping; 0 resonance = k of 2)
*/

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    LowPass,
    HighPass,
    BandPass,
    Notch,
}

pub struct FilterOutputs {
    pub lowpass: f32,
    pub bandpass: f32,
    pub highpass: f32,
    pub notch: f32,
}

/// Precomputed per-block filter coefficients.
#[derive(Debug, Clone, Copy)]
pub struct SvfCoefficients {
    g: f32,
    k: f32,
    h: f32,
}

impl SvfCoefficients {
    pub fn new(cutoff_hz: f32, resonance: f32, sample_rate: f32) -> Self {
        // Keep clear of Nyquist where tan() blows up
        let cutoff = cutoff_hz.clamp(10.0, sample_rate * 0.49);
        let g = (PI * cutoff / sample_rate).tan();
        let k = 2.0 - 2.0 * resonance.clamp(0.0, 0.99);
        let h = 1.0 / (1.0 + g * (g + k));
        Self { g, k, h }
    }
}

pub struct SVFilter {
    ic1eq: f32, // First integrator's memory
    ic2eq: f32, // Second integrator's memory
    filter_type: FilterType,
}

impl SVFilter {
    pub fn new(filter_type: FilterType) -> Self {
        Self {
            ic1eq: 0.0,
            ic2eq: 0.0,
            filter_type,
        }
    }

    #[inline]
    pub fn tick(&mut self, sample: f32, c: &SvfCoefficients) -> FilterOutputs {
        let v3 = sample - self.ic2eq;
        let v1 = c.h * (self.ic1eq + c.g * v3);
        let v2 = self.ic2eq + c.g * v1;

        self.ic1eq = 2.0 * v1 - self.ic1eq;
        self.ic2eq = 2.0 * v2 - self.ic2eq;

        FilterOutputs {
            lowpass: v2,
            bandpass: v1,
            highpass: sample - c.k * v1 - v2,
            notch: sample - c.k * v1,
        }
    }

    /// Filter one sample and return the selected response.
    #[inline]
    pub fn next_sample(&mut self, sample: f32, c: &SvfCoefficients) -> f32 {
        let outputs = self.tick(sample, c);
        match self.filter_type {
            FilterType::LowPass => outputs.lowpass,
            FilterType::HighPass => outputs.highpass,
            FilterType::BandPass => outputs.bandpass,
            FilterType::Notch => outputs.notch,
        }
    }

    pub fn render(&mut self, buffer: &mut [f32], c: &SvfCoefficients) {
        for sample in buffer.iter_mut() {
            *sample = self.next_sample(*sample, c);
        }
    }

    pub fn reset(&mut self) {
        self.ic1eq = 0.0;
        self.ic2eq = 0.0;
    }
}
