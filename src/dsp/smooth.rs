//! Click-free parameter changes.
//!
//! Writing a new cutoff or gain straight into a running DSP block makes the
//! output jump, which is heard as a click (or "zipper noise" when a knob is
//! swept). `SmoothedParam` walks from the current value to the new target in
//! a straight line over a fixed number of samples instead.
//!
//! ```text
//!   value
//!     │        ┌──────── target
//!     │       ╱
//!     │      ╱   ramp_samples
//!     │─────╱
//!     └──────────────────→ samples
//! ```

/// Default ramp length for continuous parameters.
pub const DEFAULT_RAMP_SECONDS: f32 = 0.02;

#[derive(Debug, Clone, Copy)]
pub struct SmoothedParam {
    current: f32,
    target: f32,
    step: f32,
    remaining: u32,
    ramp_samples: u32,
}

impl SmoothedParam {
    pub fn new(value: f32, sample_rate: f32) -> Self {
        Self::with_ramp(value, sample_rate, DEFAULT_RAMP_SECONDS)
    }

    pub fn with_ramp(value: f32, sample_rate: f32, ramp_seconds: f32) -> Self {
        Self {
            current: value,
            target: value,
            step: 0.0,
            remaining: 0,
            ramp_samples: (ramp_seconds * sample_rate).round().max(1.0) as u32,
        }
    }

    /// Start ramping towards `target`.
    pub fn set_target(&mut self, target: f32) {
        if target == self.target {
            return;
        }
        self.target = target;
        self.remaining = self.ramp_samples;
        self.step = (target - self.current) / self.ramp_samples as f32;
    }

    /// Jump to `value` immediately (stepped parameters, initial state).
    pub fn set_immediate(&mut self, value: f32) {
        self.current = value;
        self.target = value;
        self.remaining = 0;
        self.step = 0.0;
    }

    /// Advance one sample and return the smoothed value.
    #[inline]
    pub fn next(&mut self) -> f32 {
        if self.remaining > 0 {
            self.remaining -= 1;
            if self.remaining == 0 {
                self.current = self.target;
            } else {
                self.current += self.step;
            }
        }
        self.current
    }

    /// Advance a whole block at once (block-rate parameters).
    pub fn skip(&mut self, samples: usize) -> f32 {
        let samples = samples.min(u32::MAX as usize) as u32;
        if samples >= self.remaining {
            self.current = self.target;
            self.remaining = 0;
        } else {
            self.current += self.step * samples as f32;
            self.remaining -= samples;
        }
        self.current
    }

    pub fn is_smoothing(&self) -> bool {
        self.remaining > 0
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    pub fn target(&self) -> f32 {
        self.target
    }
}
