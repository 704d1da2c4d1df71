use super::{EffectKind, EffectModule, EffectParam, EffectSettings, ParamBank};
use crate::dsp::{
    distortion::{quantize, shape_curve, soft_clip},
    mix::blend_dry_wet,
    RenderCtx,
};

// Every shaper kind stores [amount-like, mix]
const SHAPE: usize = 0;
const MIX: usize = 1;

/// Memoryless waveshaping: distortion (drive), waveshaper (amount) and
/// bit crusher (bits).
pub struct ShaperModule {
    kind: EffectKind,
    params: ParamBank,
}

impl ShaperModule {
    pub fn new(settings: &EffectSettings, sample_rate: f32) -> Self {
        Self {
            kind: settings.kind(),
            params: ParamBank::new(settings, sample_rate),
        }
    }

    #[inline]
    fn shape(&self, sample: f32, amount: f32) -> f32 {
        match self.kind {
            EffectKind::Distortion => soft_clip(sample, amount),
            EffectKind::BitCrusher => quantize(sample, amount.round()),
            _ => shape_curve(sample, amount),
        }
    }
}

impl EffectModule for ShaperModule {
    fn kind(&self) -> EffectKind {
        self.kind
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32], _ctx: &RenderCtx) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let amount = self.params.next(SHAPE);
            let mix = self.params.next(MIX);
            *l = blend_dry_wet(*l, self.shape(*l, amount), mix);
            *r = blend_dry_wet(*r, self.shape(*r, amount), mix);
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
