//! Effect modules: the processing stages between the voice mix and the sink.
//!
//! Every kind is a stereo-in/stereo-out block behind the [`EffectModule`]
//! trait. Kinds and their parameters are closed enums; which parameters a
//! kind accepts (and their ranges) lives in one static [`ParamSpec`] table so
//! the control side can validate a change before it ever reaches the render
//! thread.
//!
//! ```text
//!   EffectSettings ──build()──→ Box<dyn EffectModule> ──→ ChainRunner slot
//!        ▲                              │
//!   update_module_parameter      set_param (smoothed)
//! ```

/// Delay, feedback delay and ping-pong delay.
pub mod delay;
/// Distortion, waveshaper and bit crusher.
pub mod distortion;
/// The four state-variable filter kinds.
pub mod filter;
/// LFO-driven effects: chorus, vibrato, phaser, auto-wah.
pub mod modulation;
/// Stereo Schroeder reverb.
pub mod reverb;
/// Mid/side stereo width.
pub mod widener;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::{Display, EnumCount, EnumIter, EnumString, IntoStaticStr};

use crate::{
    dsp::{smooth::SmoothedParam, RenderCtx},
    error::{EngineError, Result},
};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    EnumCount,
    IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum EffectKind {
    Highpass,
    Lowpass,
    Bandpass,
    Notch,
    Delay,
    FeedbackDelay,
    PingPongDelay,
    Chorus,
    Distortion,
    AutoWah,
    Phaser,
    StereoWidener,
    Vibrato,
    BitCrusher,
    Waveshaper,
    Reverb,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum EffectParam {
    Cutoff,
    Resonance,
    Time,
    Feedback,
    Mix,
    Rate,
    Depth,
    Drive,
    Amount,
    Bits,
    Width,
    RoomSize,
    Damping,
}

/// How a parameter reaches its new value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Smoothing {
    /// Linear ramp over `DEFAULT_RAMP_SECONDS`.
    Ramped,
    /// Jumps on the next sample.
    Stepped,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub param: EffectParam,
    pub min: f32,
    pub max: f32,
    pub default: f32,
    pub smoothing: Smoothing,
}

impl ParamSpec {
    const fn ramped(param: EffectParam, min: f32, max: f32, default: f32) -> Self {
        Self {
            param,
            min,
            max,
            default,
            smoothing: Smoothing::Ramped,
        }
    }

    const fn stepped(param: EffectParam, min: f32, max: f32, default: f32) -> Self {
        Self {
            param,
            min,
            max,
            default,
            smoothing: Smoothing::Stepped,
        }
    }

    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }
}

/// Most parameters any one kind accepts.
pub const MAX_EFFECT_PARAMS: usize = 3;

use EffectParam as P;

const fn mix(default: f32) -> ParamSpec {
    ParamSpec::ramped(P::Mix, 0.0, 1.0, default)
}

const fn cutoff(default: f32) -> ParamSpec {
    ParamSpec::ramped(P::Cutoff, 20.0, 20_000.0, default)
}

const RESONANCE: ParamSpec = ParamSpec::ramped(P::Resonance, 0.0, 0.95, 0.1);
const DELAY_TIME: ParamSpec = ParamSpec::ramped(P::Time, 0.0, delay::MAX_DELAY_SECONDS, 0.25);
const FEEDBACK: ParamSpec = ParamSpec::ramped(P::Feedback, 0.0, 0.95, 0.5);

static HIGHPASS: [ParamSpec; 2] = [cutoff(200.0), RESONANCE];
static LOWPASS: [ParamSpec; 2] = [cutoff(5_000.0), RESONANCE];
static BANDPASS: [ParamSpec; 2] = [cutoff(1_000.0), RESONANCE];
static NOTCH: [ParamSpec; 2] = [cutoff(1_000.0), RESONANCE];
static DELAY: [ParamSpec; 2] = [DELAY_TIME, mix(0.35)];
static FEEDBACK_DELAY: [ParamSpec; 3] = [DELAY_TIME, FEEDBACK, mix(0.35)];
static CHORUS: [ParamSpec; 3] = [
    ParamSpec::ramped(P::Rate, 0.1, 10.0, 1.5),
    ParamSpec::ramped(P::Depth, 0.5, 10.0, 3.0),
    mix(0.5),
];
static DISTORTION: [ParamSpec; 2] = [ParamSpec::ramped(P::Drive, 1.0, 20.0, 4.0), mix(1.0)];
static AUTO_WAH: [ParamSpec; 3] = [
    ParamSpec::ramped(P::Cutoff, 20.0, 5_000.0, 300.0),
    ParamSpec::ramped(P::Depth, 0.0, 6.0, 3.0),
    ParamSpec::ramped(P::Resonance, 0.0, 0.95, 0.6),
];
static PHASER: [ParamSpec; 3] = [
    ParamSpec::ramped(P::Rate, 0.05, 10.0, 0.5),
    ParamSpec::ramped(P::Depth, 0.0, 1.0, 0.7),
    mix(0.5),
];
static STEREO_WIDENER: [ParamSpec; 1] = [ParamSpec::ramped(P::Width, 0.0, 1.0, 0.5)];
static VIBRATO: [ParamSpec; 2] = [
    ParamSpec::ramped(P::Rate, 0.1, 20.0, 5.0),
    ParamSpec::ramped(P::Depth, 0.0, 1.0, 0.1),
];
static BIT_CRUSHER: [ParamSpec; 2] = [ParamSpec::stepped(P::Bits, 1.0, 8.0, 4.0), mix(1.0)];
static WAVESHAPER: [ParamSpec; 2] = [ParamSpec::ramped(P::Amount, 0.0, 1.0, 0.5), mix(1.0)];
static REVERB: [ParamSpec; 3] = [
    ParamSpec::ramped(P::RoomSize, 0.0, 1.0, 0.6),
    ParamSpec::ramped(P::Damping, 0.0, 1.0, 0.4),
    mix(0.3),
];

impl EffectKind {
    /// Dense index, `0..EffectKind::COUNT`.
    pub fn index(self) -> usize {
        self as usize
    }

    /// The parameters this kind accepts, in storage order.
    pub fn params(self) -> &'static [ParamSpec] {
        match self {
            EffectKind::Highpass => &HIGHPASS,
            EffectKind::Lowpass => &LOWPASS,
            EffectKind::Bandpass => &BANDPASS,
            EffectKind::Notch => &NOTCH,
            EffectKind::Delay => &DELAY,
            EffectKind::FeedbackDelay | EffectKind::PingPongDelay => &FEEDBACK_DELAY,
            EffectKind::Chorus => &CHORUS,
            EffectKind::Distortion => &DISTORTION,
            EffectKind::AutoWah => &AUTO_WAH,
            EffectKind::Phaser => &PHASER,
            EffectKind::StereoWidener => &STEREO_WIDENER,
            EffectKind::Vibrato => &VIBRATO,
            EffectKind::BitCrusher => &BIT_CRUSHER,
            EffectKind::Waveshaper => &WAVESHAPER,
            EffectKind::Reverb => &REVERB,
        }
    }

    pub fn spec(self, param: EffectParam) -> Option<&'static ParamSpec> {
        self.params().iter().find(|spec| spec.param == param)
    }

    fn position(self, param: EffectParam) -> Option<usize> {
        self.params().iter().position(|spec| spec.param == param)
    }
}

/// Stored parameter values for one effect kind.
///
/// Doubles as the default a future `add_module` builds from and the record of
/// what a live module was last told.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectSettings {
    kind: EffectKind,
    values: [f32; MAX_EFFECT_PARAMS],
}

impl EffectSettings {
    pub fn defaults(kind: EffectKind) -> Self {
        let mut values = [0.0; MAX_EFFECT_PARAMS];
        for (slot, spec) in values.iter_mut().zip(kind.params()) {
            *slot = spec.default;
        }
        Self { kind, values }
    }

    pub fn kind(&self) -> EffectKind {
        self.kind
    }

    pub fn get(&self, param: EffectParam) -> Option<f32> {
        self.kind.position(param).map(|index| self.values[index])
    }

    /// Store `value` (clamped to the parameter's range) and return what was
    /// stored.
    pub fn set(&mut self, param: EffectParam, value: f32) -> Result<f32> {
        let index = self
            .kind
            .position(param)
            .ok_or(EngineError::ParamNotSupported {
                kind: self.kind,
                param,
            })?;
        if !value.is_finite() {
            return Err(EngineError::InvalidValue {
                target: format!("effect.{}.{}", self.kind, param),
                reason: format!("{value} is not a finite number"),
            });
        }
        let clamped = self.kind.params()[index].clamp(value);
        self.values[index] = clamped;
        Ok(clamped)
    }

    pub fn iter(&self) -> impl Iterator<Item = (EffectParam, f32)> + '_ {
        self.kind
            .params()
            .iter()
            .zip(self.values.iter())
            .map(|(spec, &value)| (spec.param, value))
    }
}

/// A stereo processing stage.
///
/// Implementations are built on the control thread, moved to the render
/// thread inside a chain command, and dropped back on the control thread.
/// `process` must not allocate, lock or block.
pub trait EffectModule: Send {
    fn kind(&self) -> EffectKind;

    /// Process one block in place. `left` and `right` have equal length.
    fn process(&mut self, left: &mut [f32], right: &mut [f32], ctx: &RenderCtx);

    /// Retarget a parameter (clamped). False when the kind has no such
    /// parameter.
    fn set_param(&mut self, param: EffectParam, value: f32) -> bool;

    /// The value a parameter is heading to.
    fn param(&self, param: EffectParam) -> Option<f32>;

    /// Clear internal state (delay lines, filter memories, LFO phases).
    fn reset(&mut self);
}

/// Build a module of `settings.kind()` preloaded with `settings`.
pub fn build(settings: &EffectSettings, sample_rate: f32) -> Box<dyn EffectModule> {
    match settings.kind() {
        EffectKind::Highpass | EffectKind::Lowpass | EffectKind::Bandpass | EffectKind::Notch => {
            Box::new(filter::FilterModule::new(settings, sample_rate))
        }
        EffectKind::Delay | EffectKind::FeedbackDelay | EffectKind::PingPongDelay => {
            Box::new(delay::DelayModule::new(settings, sample_rate))
        }
        EffectKind::Chorus => Box::new(modulation::Chorus::new(settings, sample_rate)),
        EffectKind::Vibrato => Box::new(modulation::Vibrato::new(settings, sample_rate)),
        EffectKind::Phaser => Box::new(modulation::Phaser::new(settings, sample_rate)),
        EffectKind::AutoWah => Box::new(modulation::AutoWah::new(settings, sample_rate)),
        EffectKind::Distortion | EffectKind::Waveshaper | EffectKind::BitCrusher => {
            Box::new(distortion::ShaperModule::new(settings, sample_rate))
        }
        EffectKind::StereoWidener => Box::new(widener::Widener::new(settings, sample_rate)),
        EffectKind::Reverb => Box::new(reverb::ReverbModule::new(settings, sample_rate)),
    }
}

/// Smoothed live values for one module, laid out like `kind.params()`.
pub(crate) struct ParamBank {
    kind: EffectKind,
    values: [SmoothedParam; MAX_EFFECT_PARAMS],
}

impl ParamBank {
    pub(crate) fn new(settings: &EffectSettings, sample_rate: f32) -> Self {
        let mut values = [SmoothedParam::new(0.0, sample_rate); MAX_EFFECT_PARAMS];
        for (slot, (_, value)) in values.iter_mut().zip(settings.iter()) {
            slot.set_immediate(value);
        }
        Self {
            kind: settings.kind(),
            values,
        }
    }

    pub(crate) fn set(&mut self, param: EffectParam, value: f32) -> bool {
        let Some(index) = self.kind.position(param) else {
            return false;
        };
        if !value.is_finite() {
            return false;
        }
        let spec = &self.kind.params()[index];
        let value = spec.clamp(value);
        match spec.smoothing {
            Smoothing::Ramped => self.values[index].set_target(value),
            Smoothing::Stepped => self.values[index].set_immediate(value),
        }
        true
    }

    pub(crate) fn get(&self, param: EffectParam) -> Option<f32> {
        self.kind
            .position(param)
            .map(|index| self.values[index].target())
    }

    #[inline]
    pub(crate) fn next(&mut self, index: usize) -> f32 {
        self.values[index].next()
    }

    /// Advance a block-rate parameter by a whole block.
    pub(crate) fn skip(&mut self, index: usize, samples: usize) -> f32 {
        self.values[index].skip(samples)
    }

    pub(crate) fn current(&self, index: usize) -> f32 {
        self.values[index].current()
    }

    pub(crate) fn is_smoothing(&self) -> bool {
        self.values.iter().any(SmoothedParam::is_smoothing)
    }

    /// Land every ramp on its target.
    pub(crate) fn settle(&mut self) {
        for value in self.values.iter_mut() {
            value.set_immediate(value.target());
        }
    }
}
