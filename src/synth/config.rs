#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::{
    dsp::{
        envelope::EnvelopeSettings,
        oscillator::{OscillatorWaveform, MAX_PARTIALS},
    },
    error::{EngineError, Result},
};

/// How a voice produces its raw tone.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SynthKind {
    /// One oscillator.
    #[default]
    Classic,
    /// Carrier amplitude-modulated by a second oscillator at `harmonicity × f`.
    Am,
    /// Carrier phase-modulated by a second oscillator at `harmonicity × f`,
    /// scaled by `modulation_index`.
    Fm,
}

/// Whether configuration changes reach voices that are already sounding.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum VoicePolicy {
    /// Each note snapshots the configuration at trigger time.
    #[default]
    PerNote,
    /// Every sounding note follows the live configuration.
    Shared,
}

/// Addressable envelope fields for `set_envelope`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum EnvelopeStage {
    Attack,
    Decay,
    Sustain,
    Release,
}

/// Longest envelope stage accepted, in seconds.
pub const MAX_STAGE_SECONDS: f32 = 10.0;

/// Process-wide voice defaults.
///
/// Read by the voice pool whenever it builds a voice; under
/// `VoicePolicy::Shared` also pushed into voices that are already playing.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynthConfig {
    pub kind: SynthKind,
    pub waveform: OscillatorWaveform,
    /// Modulator waveform for AM/FM kinds.
    pub modulation_waveform: OscillatorWaveform,
    pub envelope: EnvelopeSettings,
    /// Modulator frequency ratio for AM/FM kinds.
    pub harmonicity: f32,
    /// FM depth in radians of carrier phase.
    pub modulation_index: f32,
    /// Harmonic amplitudes for `OscillatorWaveform::Custom`.
    pub partials: [f32; MAX_PARTIALS],
    /// Private per-voice gain stage after the velocity gain.
    pub voice_gain: f32,
}

impl Default for SynthConfig {
    fn default() -> Self {
        let mut partials = [0.0; MAX_PARTIALS];
        partials[0] = 1.0;
        Self {
            kind: SynthKind::Classic,
            waveform: OscillatorWaveform::Sine,
            modulation_waveform: OscillatorWaveform::Sine,
            envelope: EnvelopeSettings::default(),
            harmonicity: 3.0,
            modulation_index: 2.0,
            partials,
            voice_gain: 0.2,
        }
    }
}

impl SynthConfig {
    /// Set one envelope field, clamped to its legal range.
    pub fn set_envelope_stage(&mut self, stage: EnvelopeStage, value: f32) {
        let env = &mut self.envelope;
        match stage {
            EnvelopeStage::Attack => env.attack = value.clamp(0.0, MAX_STAGE_SECONDS),
            EnvelopeStage::Decay => env.decay = value.clamp(0.0, MAX_STAGE_SECONDS),
            EnvelopeStage::Sustain => env.sustain = value.clamp(0.0, 1.0),
            EnvelopeStage::Release => env.release = value.clamp(0.0, MAX_STAGE_SECONDS),
        }
        *env = env.sanitized();
    }

    pub fn envelope_stage(&self, stage: EnvelopeStage) -> f32 {
        match stage {
            EnvelopeStage::Attack => self.envelope.attack,
            EnvelopeStage::Decay => self.envelope.decay,
            EnvelopeStage::Sustain => self.envelope.sustain,
            EnvelopeStage::Release => self.envelope.release,
        }
    }

    pub fn set_harmonicity(&mut self, value: f32) {
        self.harmonicity = value.clamp(0.1, 20.0);
    }

    pub fn set_modulation_index(&mut self, value: f32) {
        self.modulation_index = value.clamp(0.0, 50.0);
    }

    pub fn set_voice_gain(&mut self, value: f32) {
        self.voice_gain = value.clamp(0.0, 1.0);
    }

    /// Copy with every field run through its setter clamp. Fails on the
    /// first non-finite field.
    pub fn checked(self) -> Result<Self> {
        let non_finite = |target: String, value: f32| EngineError::InvalidValue {
            target,
            reason: format!("{value} is not a finite number"),
        };
        let scalars = [
            ("synth.harmonicity", self.harmonicity),
            ("synth.modulation_index", self.modulation_index),
            ("synth.gain", self.voice_gain),
            ("envelope.attack", self.envelope.attack),
            ("envelope.decay", self.envelope.decay),
            ("envelope.sustain", self.envelope.sustain),
            ("envelope.release", self.envelope.release),
        ];
        if let Some((target, value)) = scalars.iter().find(|(_, v)| !v.is_finite()) {
            return Err(non_finite(target.to_string(), *value));
        }
        if let Some((index, value)) = self
            .partials
            .iter()
            .enumerate()
            .find(|(_, v)| !v.is_finite())
        {
            return Err(non_finite(format!("synth.partials.{index}"), *value));
        }

        let mut next = self;
        next.set_harmonicity(self.harmonicity);
        next.set_modulation_index(self.modulation_index);
        next.set_voice_gain(self.voice_gain);
        for (index, amplitude) in self.partials.iter().enumerate() {
            next.set_partial(index, *amplitude);
        }
        for (stage, value) in [
            (EnvelopeStage::Attack, self.envelope.attack),
            (EnvelopeStage::Decay, self.envelope.decay),
            (EnvelopeStage::Sustain, self.envelope.sustain),
            (EnvelopeStage::Release, self.envelope.release),
        ] {
            next.set_envelope_stage(stage, value);
        }
        Ok(next)
    }

    /// Returns false when `index` is outside the partial table.
    pub fn set_partial(&mut self, index: usize, amplitude: f32) -> bool {
        match self.partials.get_mut(index) {
            Some(slot) => {
                *slot = amplitude.clamp(-1.0, 1.0);
                true
            }
            None => false,
        }
    }
}
