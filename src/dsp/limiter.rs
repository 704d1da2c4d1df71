//! Output limiter - the signal chain's sink.
//!
//! Peak limiting with instant attack and a smooth release, followed by a hard
//! ceiling. The gain computer guarantees that loud passages are turned down
//! without clipping artifacts; the final clamp guarantees that nothing,
//! whatever the chain upstream does, leaves the engine above `ceiling`.
//!
//! ```text
//!   peak = max(|L|, |R|)
//!   wanted = ceiling / peak   (when peak · gain would exceed ceiling)
//!   gain   = wanted                          if wanted < gain   (attack)
//!          = gain + (1 - gain) · release     otherwise          (recover)
//!   out    = clamp(x · gain, ±ceiling)
//! ```
//!
//! Non-finite input (NaN/inf from a runaway feedback path) is replaced with
//! silence so the device never receives garbage.

pub const DEFAULT_CEILING: f32 = 0.98;
const RELEASE_SECONDS: f32 = 0.1;

pub struct Limiter {
    ceiling: f32,
    gain: f32,
    release_coeff: f32,
}

impl Limiter {
    pub fn new(ceiling: f32, sample_rate: f32) -> Self {
        Self {
            ceiling: ceiling.clamp(0.01, 1.0),
            gain: 1.0,
            release_coeff: 1.0 - (-1.0 / (RELEASE_SECONDS * sample_rate)).exp(),
        }
    }

    /// Limit a stereo block in place.
    pub fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            if !l.is_finite() {
                *l = 0.0;
            }
            if !r.is_finite() {
                *r = 0.0;
            }

            let peak = l.abs().max(r.abs());
            let wanted = if peak * self.gain > self.ceiling {
                self.ceiling / peak
            } else {
                1.0
            };

            if wanted < self.gain {
                self.gain = wanted;
            } else {
                self.gain += (wanted.min(1.0) - self.gain) * self.release_coeff;
            }

            *l = (*l * self.gain).clamp(-self.ceiling, self.ceiling);
            *r = (*r * self.gain).clamp(-self.ceiling, self.ceiling);
        }
    }

    /// Current gain reduction multiplier (1.0 = untouched).
    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn ceiling(&self) -> f32 {
        self.ceiling
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_signal_passes_untouched() {
        let mut limiter = Limiter::new(DEFAULT_CEILING, 48_000.0);
        let mut l = vec![0.5; 64];
        let mut r = vec![-0.25; 64];
        limiter.process(&mut l, &mut r);
        assert!(l.iter().all(|&s| (s - 0.5).abs() < 1e-6));
        assert!(r.iter().all(|&s| (s + 0.25).abs() < 1e-6));
    }

    #[test]
    fn loud_signal_is_bounded() {
        let mut limiter = Limiter::new(0.9, 48_000.0);
        let mut l: Vec<f32> = (0..512).map(|i| 40.0 * (i as f32 * 0.1).sin()).collect();
        let mut r = vec![100.0; 512];
        limiter.process(&mut l, &mut r);
        assert!(l.iter().chain(r.iter()).all(|s| s.abs() <= 0.9));
        assert!(limiter.gain() < 0.01);
    }

    #[test]
    fn non_finite_becomes_silence() {
        let mut limiter = Limiter::new(DEFAULT_CEILING, 48_000.0);
        let mut l = vec![f32::NAN, f32::INFINITY];
        let mut r = vec![f32::NEG_INFINITY, 0.1];
        limiter.process(&mut l, &mut r);
        assert_eq!(l[0], 0.0);
        assert_eq!(l[1], 0.0);
        assert_eq!(r[0], 0.0);
        assert!(r[1].is_finite());
    }

    #[test]
    fn gain_recovers_after_peak() {
        let mut limiter = Limiter::new(0.5, 1_000.0);
        let mut l = vec![1.0];
        let mut r = vec![1.0];
        limiter.process(&mut l, &mut r);
        assert!((limiter.gain() - 0.5).abs() < 1e-6);

        let mut l = vec![0.0; 1_000];
        let mut r = vec![0.0; 1_000];
        limiter.process(&mut l, &mut r);
        assert!(limiter.gain() > 0.99);
    }
}
