/*
Echo effects
============

  delay            out = dry·(1-mix) + line[t]·mix
  feedback-delay   line ← in + line[t]·feedback
  ping-pong-delay  L ← in + R[t]·feedback,  R ← L[t]
                   echoes alternate L, R, L, ... losing `feedback` per round trip

Delay time glides through the fractional read in DelayLine, so a time change
bends the pitch of the tail briefly instead of clicking.
*/

use super::{EffectKind, EffectModule, EffectParam, EffectSettings, ParamBank};
use crate::dsp::{delay::DelayLine, mix::blend_dry_wet, RenderCtx};

/// Longest delay time a module can be set to.
pub const MAX_DELAY_SECONDS: f32 = 2.0;

const TIME: usize = 0;

pub struct DelayModule {
    kind: EffectKind,
    params: ParamBank,
    left: DelayLine,
    right: DelayLine,
    feedback_index: Option<usize>,
    mix_index: usize,
}

impl DelayModule {
    pub fn new(settings: &EffectSettings, sample_rate: f32) -> Self {
        let kind = settings.kind();
        // Plain delay has no feedback slot: [time, mix]
        let (feedback_index, mix_index) = match kind {
            EffectKind::Delay => (None, 1),
            _ => (Some(1), 2),
        };
        Self {
            kind,
            params: ParamBank::new(settings, sample_rate),
            left: DelayLine::with_duration(MAX_DELAY_SECONDS, sample_rate),
            right: DelayLine::with_duration(MAX_DELAY_SECONDS, sample_rate),
            feedback_index,
            mix_index,
        }
    }
}

impl EffectModule for DelayModule {
    fn kind(&self) -> EffectKind {
        self.kind
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32], ctx: &RenderCtx) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let delay = self.params.next(TIME) * ctx.sample_rate;
            let feedback = match self.feedback_index {
                Some(index) => self.params.next(index),
                None => 0.0,
            };
            let mix = self.params.next(self.mix_index);

            let wet_l = self.left.read_interpolated(delay);
            let wet_r = self.right.read_interpolated(delay);

            if self.kind == EffectKind::PingPongDelay {
                let input = 0.5 * (*l + *r);
                self.left.write(input + wet_r * feedback);
                self.right.write(wet_l);
            } else {
                self.left.write(*l + wet_l * feedback);
                self.right.write(*r + wet_r * feedback);
            }

            *l = blend_dry_wet(*l, wet_l, mix);
            *r = blend_dry_wet(*r, wet_r, mix);
        }
    }

    fn set_param(&mut self, param: EffectParam, value: f32) -> bool {
        self.params.set(param, value)
    }

    fn param(&self, param: EffectParam) -> Option<f32> {
        self.params.get(param)
    }

    fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
        self.params.settle();
    }
}
