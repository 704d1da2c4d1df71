/*
Mid/side width
==============

  mid  = (L + R) / 2          side = (L - R) / 2
  side' = side · 2·width
  L' = mid + side'            R' = mid - side'

width 0 collapses to mono, 0.5 leaves the image alone, 1 doubles the side
signal.
*/

use super::{EffectKind, EffectModule, EffectParam, EffectSettings, ParamBank};
use crate::dsp::RenderCtx;

const WIDTH: usize = 0;

pub struct Widener {
    params: ParamBank,
}

impl Widener {
    pub fn new(settings: &EffectSettings, sample_rate: f32) -> Self {
        Self {
            params: ParamBank::new(settings, sample_rate),
        }
    }
}

impl EffectModule for Widener {
    fn kind(&self) -> EffectKind {
        EffectKind::StereoWidener
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32], _ctx: &RenderCtx) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let side_gain = 2.0 * self.params.next(WIDTH);
            let mid = 0.5 * (*l + *r);
            let side = 0.5 * (*l - *r) * side_gain;
            *l = mid + side;
            *r = mid - side;
        }
    }

    fn set_param(&mut self, param: EffectParam, value: f32) -> bool {
        self.params.set(param, value)
    }

    fn param(&self, param: EffectParam) -> Option<f32> {
        self.params.get(param)
    }

    fn reset(&mut self) {
        self.params.settle();
    }
}
