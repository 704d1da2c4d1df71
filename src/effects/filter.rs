use super::{EffectKind, EffectModule, EffectParam, EffectSettings, ParamBank};
use crate::dsp::{
    filter::{FilterType, SVFilter, SvfCoefficients},
    RenderCtx,
};

const CUTOFF: usize = 0;
const RESONANCE: usize = 1;

/// Highpass, lowpass, bandpass or notch: one SVF per channel.
///
/// Coefficients are recomputed per sample only while a cutoff or resonance
/// ramp is running; otherwise once per block.
pub struct FilterModule {
    kind: EffectKind,
    params: ParamBank,
    left: SVFilter,
    right: SVFilter,
    coeffs: SvfCoefficients,
    sample_rate: f32,
}

impl FilterModule {
    pub fn new(settings: &EffectSettings, sample_rate: f32) -> Self {
        let filter_type = match settings.kind() {
            EffectKind::Highpass => FilterType::HighPass,
            EffectKind::Bandpass => FilterType::BandPass,
            EffectKind::Notch => FilterType::Notch,
            _ => FilterType::LowPass,
        };
        let params = ParamBank::new(settings, sample_rate);
        let coeffs = SvfCoefficients::new(
            params.current(CUTOFF),
            params.current(RESONANCE),
            sample_rate,
        );
        Self {
            kind: settings.kind(),
            params,
            left: SVFilter::new(filter_type),
            right: SVFilter::new(filter_type),
            coeffs,
            sample_rate,
        }
    }
}

impl EffectModule for FilterModule {
    fn kind(&self) -> EffectKind {
        self.kind
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32], _ctx: &RenderCtx) {
        if !self.params.is_smoothing() {
            for (l, r) in left.iter_mut().zip(right.iter_mut()) {
                *l = self.left.next_sample(*l, &self.coeffs);
                *r = self.right.next_sample(*r, &self.coeffs);
            }
            return;
        }

        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let cutoff = self.params.next(CUTOFF);
            let resonance = self.params.next(RESONANCE);
            self.coeffs = SvfCoefficients::new(cutoff, resonance, self.sample_rate);
            *l = self.left.next_sample(*l, &self.coeffs);
            *r = self.right.next_sample(*r, &self.coeffs);
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
        self.coeffs = SvfCoefficients::new(
            self.params.current(CUTOFF),
            self.params.current(RESONANCE),
            self.sample_rate,
        );
    }
}
