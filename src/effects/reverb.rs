use super::{EffectKind, EffectModule, EffectParam, EffectSettings, ParamBank};
use crate::dsp::{mix::blend_dry_wet, reverb::SchroederReverb, RenderCtx};

const ROOM_SIZE: usize = 0;
const DAMPING: usize = 1;
const MIX: usize = 2;

/// Right-channel delay offset in samples, decorrelates the two tails.
const STEREO_SPREAD: usize = 23;

/// Stereo Schroeder reverb. Room size and damping are block-rate; mix is
/// per sample.
pub struct ReverbModule {
    params: ParamBank,
    left: SchroederReverb,
    right: SchroederReverb,
}

impl ReverbModule {
    pub fn new(settings: &EffectSettings, sample_rate: f32) -> Self {
        let mut module = Self {
            params: ParamBank::new(settings, sample_rate),
            left: SchroederReverb::new(sample_rate),
            right: SchroederReverb::with_spread(sample_rate, STEREO_SPREAD),
        };
        module.apply_room(module.params.current(ROOM_SIZE), module.params.current(DAMPING));
        module
    }

    fn apply_room(&mut self, room_size: f32, damping: f32) {
        for reverb in [&mut self.left, &mut self.right] {
            reverb.set_room_size(room_size);
            reverb.set_damping(damping);
        }
    }
}

impl EffectModule for ReverbModule {
    fn kind(&self) -> EffectKind {
        EffectKind::Reverb
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32], _ctx: &RenderCtx) {
        if self.params.is_smoothing() {
            let room_size = self.params.skip(ROOM_SIZE, left.len());
            let damping = self.params.skip(DAMPING, left.len());
            self.apply_room(room_size, damping);
        }

        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let mix = self.params.next(MIX);
            let wet_l = self.left.process(*l);
            let wet_r = self.right.process(*r);
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
        self.apply_room(self.params.current(ROOM_SIZE), self.params.current(DAMPING));
    }
}
