/*
Modulated effects
=================

An LFO (or, for the auto-wah, the input's own envelope) moves a parameter of
a simple DSP block:

  chorus   LFO → short delay time, blended with dry       (thickening)
  vibrato  LFO → short delay time, 100% wet               (pitch wobble)
  phaser   LFO → break frequency of 4 allpass stages      (moving notches)
  auto-wah level follower → resonant lowpass cutoff       (vowel sweep)

The right channel's LFO starts a quarter cycle behind the left, which gives
chorus and phaser their stereo spread.
*/

use std::f32::consts::PI;

use super::{EffectKind, EffectModule, EffectParam, EffectSettings, ParamBank};
use crate::dsp::{
    delay::DelayLine,
    filter::{FilterType, SVFilter, SvfCoefficients},
    lfo::{bipolar_to_unipolar, Lfo},
    mix::blend_dry_wet,
    RenderCtx,
};

const STEREO_OFFSET: f32 = 0.25;

// Chorus: [rate, depth (ms), mix]
const CHORUS_BASE_MS: f32 = 15.0;
const CHORUS_MAX_MS: f32 = 30.0;

pub struct Chorus {
    params: ParamBank,
    lines: [DelayLine; 2],
    lfos: [Lfo; 2],
}

impl Chorus {
    pub fn new(settings: &EffectSettings, sample_rate: f32) -> Self {
        Self {
            params: ParamBank::new(settings, sample_rate),
            lines: [
                DelayLine::with_duration(CHORUS_MAX_MS / 1000.0, sample_rate),
                DelayLine::with_duration(CHORUS_MAX_MS / 1000.0, sample_rate),
            ],
            lfos: [Lfo::new(), Lfo::with_offset(STEREO_OFFSET)],
        }
    }
}

impl EffectModule for Chorus {
    fn kind(&self) -> EffectKind {
        EffectKind::Chorus
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32], ctx: &RenderCtx) {
        let ms = ctx.sample_rate / 1000.0;
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let rate = self.params.next(0);
            let depth = self.params.next(1);
            let mix = self.params.next(2);

            for (channel, sample) in [l, r].into_iter().enumerate() {
                let lfo = self.lfos[channel].next_sample(rate, ctx.sample_rate);
                let sweep = bipolar_to_unipolar(lfo);
                let delay = (CHORUS_BASE_MS + depth * sweep) * ms;
                let wet = self.lines[channel].next_sample(*sample, delay);
                *sample = blend_dry_wet(*sample, wet, mix);
            }
        }
    }

    fn set_param(&mut self, param: EffectParam, value: f32) -> bool {
        self.params.set(param, value)
    }

    fn param(&self, param: EffectParam) -> Option<f32> {
        self.params.get(param)
    }

    fn reset(&mut self) {
        for line in self.lines.iter_mut() {
            line.reset();
        }
        self.lfos = [Lfo::new(), Lfo::with_offset(STEREO_OFFSET)];
        self.params.settle();
    }
}

// Vibrato: [rate, depth (fraction of VIBRATO_MAX_MS)]
const VIBRATO_MAX_MS: f32 = 5.0;

pub struct Vibrato {
    params: ParamBank,
    lines: [DelayLine; 2],
    lfo: Lfo,
}

impl Vibrato {
    pub fn new(settings: &EffectSettings, sample_rate: f32) -> Self {
        let seconds = (VIBRATO_MAX_MS + 1.0) / 1000.0;
        Self {
            params: ParamBank::new(settings, sample_rate),
            lines: [
                DelayLine::with_duration(seconds, sample_rate),
                DelayLine::with_duration(seconds, sample_rate),
            ],
            lfo: Lfo::new(),
        }
    }
}

impl EffectModule for Vibrato {
    fn kind(&self) -> EffectKind {
        EffectKind::Vibrato
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32], ctx: &RenderCtx) {
        let max_samples = VIBRATO_MAX_MS * ctx.sample_rate / 1000.0;
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let rate = self.params.next(0);
            let depth = self.params.next(1);
            let sweep = bipolar_to_unipolar(self.lfo.next_sample(rate, ctx.sample_rate));
            let delay = 1.0 + depth * max_samples * sweep;

            *l = self.lines[0].next_sample(*l, delay);
            *r = self.lines[1].next_sample(*r, delay);
        }
    }

    fn set_param(&mut self, param: EffectParam, value: f32) -> bool {
        self.params.set(param, value)
    }

    fn param(&self, param: EffectParam) -> Option<f32> {
        self.params.get(param)
    }

    fn reset(&mut self) {
        for line in self.lines.iter_mut() {
            line.reset();
        }
        self.lfo.reset();
        self.params.settle();
    }
}

// Phaser: [rate, depth, mix]
const PHASER_STAGES: usize = 4;
const PHASER_MIN_HZ: f32 = 200.0;
const PHASER_MAX_HZ: f32 = 4_000.0;
const PHASER_FEEDBACK: f32 = 0.4;

/// First-order allpass: unity gain, phase shift of 180° at the break frequency.
#[derive(Default, Clone, Copy)]
struct AllpassStage {
    state: f32,
}

impl AllpassStage {
    #[inline]
    fn process(&mut self, input: f32, a: f32) -> f32 {
        let output = a * input + self.state;
        self.state = input - a * output;
        output
    }
}

pub struct Phaser {
    params: ParamBank,
    stages: [[AllpassStage; PHASER_STAGES]; 2],
    feedback: [f32; 2],
    lfos: [Lfo; 2],
}

impl Phaser {
    pub fn new(settings: &EffectSettings, sample_rate: f32) -> Self {
        Self {
            params: ParamBank::new(settings, sample_rate),
            stages: [[AllpassStage::default(); PHASER_STAGES]; 2],
            feedback: [0.0; 2],
            lfos: [Lfo::new(), Lfo::with_offset(STEREO_OFFSET)],
        }
    }
}

impl EffectModule for Phaser {
    fn kind(&self) -> EffectKind {
        EffectKind::Phaser
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32], ctx: &RenderCtx) {
        let span = PHASER_MAX_HZ / PHASER_MIN_HZ;
        let nyquist_guard = 0.45 * ctx.sample_rate;

        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let rate = self.params.next(0);
            let depth = self.params.next(1);
            let mix = self.params.next(2);

            for (channel, sample) in [l, r].into_iter().enumerate() {
                let lfo = self.lfos[channel].next_sample(rate, ctx.sample_rate);
                let sweep = bipolar_to_unipolar(lfo);
                let freq = (PHASER_MIN_HZ * span.powf(depth * sweep)).min(nyquist_guard);
                let t = (PI * freq / ctx.sample_rate).tan();
                let a = (t - 1.0) / (t + 1.0);

                let mut wet = *sample + self.feedback[channel] * PHASER_FEEDBACK;
                for stage in self.stages[channel].iter_mut() {
                    wet = stage.process(wet, a);
                }
                self.feedback[channel] = wet;
                *sample = blend_dry_wet(*sample, wet, mix);
            }
        }
    }

    fn set_param(&mut self, param: EffectParam, value: f32) -> bool {
        self.params.set(param, value)
    }

    fn param(&self, param: EffectParam) -> Option<f32> {
        self.params.get(param)
    }

    fn reset(&mut self) {
        self.stages = [[AllpassStage::default(); PHASER_STAGES]; 2];
        self.feedback = [0.0; 2];
        self.lfos = [Lfo::new(), Lfo::with_offset(STEREO_OFFSET)];
        self.params.settle();
    }
}

// Auto-wah: [cutoff (base Hz), depth (octaves), resonance]
const WAH_ATTACK_SECONDS: f32 = 0.005;
const WAH_RELEASE_SECONDS: f32 = 0.1;
const WAH_CONTROL_INTERVAL: usize = 16;

pub struct AutoWah {
    params: ParamBank,
    filters: [SVFilter; 2],
    coeffs: SvfCoefficients,
    follower: f32,
    attack_coeff: f32,
    release_coeff: f32,
    countdown: usize,
}

impl AutoWah {
    pub fn new(settings: &EffectSettings, sample_rate: f32) -> Self {
        let params = ParamBank::new(settings, sample_rate);
        let coeffs = SvfCoefficients::new(params.current(0), params.current(2), sample_rate);
        Self {
            params,
            filters: [SVFilter::new(FilterType::LowPass), SVFilter::new(FilterType::LowPass)],
            coeffs,
            follower: 0.0,
            attack_coeff: 1.0 - (-1.0 / (WAH_ATTACK_SECONDS * sample_rate)).exp(),
            release_coeff: 1.0 - (-1.0 / (WAH_RELEASE_SECONDS * sample_rate)).exp(),
            countdown: 0,
        }
    }
}

impl EffectModule for AutoWah {
    fn kind(&self) -> EffectKind {
        EffectKind::AutoWah
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32], ctx: &RenderCtx) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let base = self.params.next(0);
            let depth = self.params.next(1);
            let resonance = self.params.next(2);

            let level = l.abs().max(r.abs()).min(1.0);
            let coeff = if level > self.follower {
                self.attack_coeff
            } else {
                self.release_coeff
            };
            self.follower += (level - self.follower) * coeff;

            if self.countdown == 0 {
                let cutoff = base * 2.0_f32.powf(depth * self.follower);
                self.coeffs = SvfCoefficients::new(cutoff, resonance, ctx.sample_rate);
                self.countdown = WAH_CONTROL_INTERVAL;
            }
            self.countdown -= 1;

            *l = self.filters[0].next_sample(*l, &self.coeffs);
            *r = self.filters[1].next_sample(*r, &self.coeffs);
        }
    }

    fn set_param(&mut self, param: EffectParam, value: f32) -> bool {
        self.params.set(param, value)
    }

    fn param(&self, param: EffectParam) -> Option<f32> {
        self.params.get(param)
    }

    fn reset(&mut self) {
        for filter in self.filters.iter_mut() {
            filter.reset();
        }
        self.follower = 0.0;
        self.countdown = 0;
        self.params.settle();
    }
}
