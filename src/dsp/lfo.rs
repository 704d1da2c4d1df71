use std::f32::consts::TAU;

/*
LFO (Low Frequency Oscillator)
==============================

An oscillator running below the audio band (0.05 - 20 Hz) whose output moves
an effect parameter instead of being heard directly:

  Chorus / vibrato:  LFO → delay time
  Phaser:            LFO → allpass break frequency

Output is bipolar (-1.0 to +1.0); convert with `bipolar_to_unipolar` when a
parameter only sweeps one way. `offset` starts the LFO part-way through its
cycle, which is how the stereo effects put the right channel 90° behind the
left.
*/

pub struct Lfo {
    phase: f32,
}

impl Lfo {
    pub fn new() -> Self {
        Self { phase: 0.0 }
    }

    pub fn with_offset(offset: f32) -> Self {
        Self {
            phase: offset - offset.floor(),
        }
    }

    /// Return the sine value at the current phase, then advance.
    #[inline]
    pub fn next_sample(&mut self, rate_hz: f32, sample_rate: f32) -> f32 {
        let value = (TAU * self.phase).sin();
        self.phase += rate_hz / sample_rate;
        if self.phase >= 1.0 {
            self.phase -= self.phase.floor();
        }
        value
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
    }
}

impl Default for Lfo {
    fn default() -> Self {
        Self::new()
    }
}

/// Map -1..1 to 0..1.
#[inline]
pub fn bipolar_to_unipolar(bipolar: f32) -> f32 {
    (bipolar + 1.0) * 0.5
}
