//! Circular-buffer delay line.
//!
//! The buffer is allocated once at construction (sized for the longest delay
//! the owner will ask for) and never resized, so reads and writes are
//! realtime-safe. Reads may be fractional; a linear interpolation between the
//! two neighbouring samples lets the delay time glide without stepping.

pub struct DelayLine {
    buffer: Vec<f32>,
    write_pos: usize,
}

impl DelayLine {
    /// Create a delay line that can hold `max_delay_samples` of history.
    pub fn new(max_delay_samples: usize) -> Self {
        Self {
            buffer: vec![0.0; max_delay_samples.max(2) + 1],
            write_pos: 0,
        }
    }

    /// Create a delay line long enough for `seconds` at `sample_rate`.
    pub fn with_duration(seconds: f32, sample_rate: f32) -> Self {
        Self::new((seconds * sample_rate).ceil() as usize + 1)
    }

    /// Longest delay (in samples) this line can produce.
    pub fn capacity(&self) -> usize {
        self.buffer.len() - 1
    }

    /// Push one sample into the line.
    #[inline]
    pub fn write(&mut self, sample: f32) {
        self.buffer[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
    }

    /// Read the sample written `delay_samples` writes ago (fractional).
    ///
    /// A delay of 1.0 returns the most recent write.
    #[inline]
    pub fn read_interpolated(&self, delay_samples: f32) -> f32 {
        let len = self.buffer.len();
        let delay = delay_samples.clamp(1.0, (len - 1) as f32);
        let whole = delay.floor() as usize;
        let frac = delay - whole as f32;

        let newer = self.buffer[(self.write_pos + len - whole) % len];
        let older = self.buffer[(self.write_pos + len - (whole + 1).min(len - 1)) % len];
        newer + (older - newer) * frac
    }

    /// Write `sample` and return the sample from `delay_samples` ago.
    #[inline]
    pub fn next_sample(&mut self, sample: f32, delay_samples: f32) -> f32 {
        let delayed = self.read_interpolated(delay_samples.max(1.0));
        self.write(sample);
        delayed
    }

    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}
