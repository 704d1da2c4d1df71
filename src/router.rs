//! Parameter routing: one explicit message type for every knob.
//!
//! A [`ParameterChange`] names its target with a dotted path and carries
//! either a number or a name:
//!
//! ```text
//! synth.kind                  name   classic | am | fm
//! synth.waveform              name   sine | square | sawtooth | triangle | custom
//! synth.modulation_waveform   name
//! synth.harmonicity           number
//! synth.modulation_index      number
//! synth.gain                  number
//! synth.partials.<0..7>       number
//! envelope.<attack|decay|sustain|release>
//!                             number
//! effect.<kind>.<param>       number
//! chain.add | chain.remove    name   effect kind
//! ```
//!
//! ```
//! use saavy_modular::router::ParamTarget;
//! let target: ParamTarget = "effect.lowpass.cutoff".parse().unwrap();
//! assert_eq!(target.to_string(), "effect.lowpass.cutoff");
//! ```

use std::{fmt, str::FromStr};

use crate::{
    chain::EditOutcome,
    dsp::oscillator::{OscillatorWaveform, MAX_PARTIALS},
    effects::{EffectKind, EffectParam},
    engine::SynthEngine,
    error::{EngineError, Result},
    synth::{EnvelopeStage, SynthKind},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamTarget {
    SynthKind,
    Waveform,
    ModulationWaveform,
    Harmonicity,
    ModulationIndex,
    VoiceGain,
    Partial(usize),
    Envelope(EnvelopeStage),
    Effect { kind: EffectKind, param: EffectParam },
    ChainAdd,
    ChainRemove,
}

impl FromStr for ParamTarget {
    type Err = EngineError;

    fn from_str(path: &str) -> Result<Self> {
        let unknown = || EngineError::UnknownTarget(path.to_string());
        let parts: Vec<&str> = path.trim().split('.').collect();

        let target = match parts.as_slice() {
            ["synth", "kind"] => ParamTarget::SynthKind,
            ["synth", "waveform"] => ParamTarget::Waveform,
            ["synth", "modulation_waveform"] => ParamTarget::ModulationWaveform,
            ["synth", "harmonicity"] => ParamTarget::Harmonicity,
            ["synth", "modulation_index"] => ParamTarget::ModulationIndex,
            ["synth", "gain"] => ParamTarget::VoiceGain,
            ["synth", "partials", index] => {
                let index: usize = index.parse().map_err(|_| unknown())?;
                if index >= MAX_PARTIALS {
                    return Err(unknown());
                }
                ParamTarget::Partial(index)
            }
            ["envelope", stage] => {
                ParamTarget::Envelope(stage.parse().map_err(|_| unknown())?)
            }
            ["effect", kind, param] => {
                let kind: EffectKind = kind
                    .parse()
                    .map_err(|_| EngineError::UnknownEffect(kind.to_string()))?;
                let param: EffectParam = param
                    .parse()
                    .map_err(|_| EngineError::UnknownParameter(param.to_string()))?;
                if kind.spec(param).is_none() {
                    return Err(EngineError::ParamNotSupported { kind, param });
                }
                ParamTarget::Effect { kind, param }
            }
            ["chain", "add"] => ParamTarget::ChainAdd,
            ["chain", "remove"] => ParamTarget::ChainRemove,
            _ => return Err(unknown()),
        };
        Ok(target)
    }
}

impl fmt::Display for ParamTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamTarget::SynthKind => f.write_str("synth.kind"),
            ParamTarget::Waveform => f.write_str("synth.waveform"),
            ParamTarget::ModulationWaveform => f.write_str("synth.modulation_waveform"),
            ParamTarget::Harmonicity => f.write_str("synth.harmonicity"),
            ParamTarget::ModulationIndex => f.write_str("synth.modulation_index"),
            ParamTarget::VoiceGain => f.write_str("synth.gain"),
            ParamTarget::Partial(index) => write!(f, "synth.partials.{index}"),
            ParamTarget::Envelope(stage) => write!(f, "envelope.{stage}"),
            ParamTarget::Effect { kind, param } => write!(f, "effect.{kind}.{param}"),
            ParamTarget::ChainAdd => f.write_str("chain.add"),
            ParamTarget::ChainRemove => f.write_str("chain.remove"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Number(f32),
    Name(String),
}

impl From<f32> for ParamValue {
    fn from(value: f32) -> Self {
        ParamValue::Number(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Name(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Name(value)
    }
}

impl ParamValue {
    /// Numeric reading. Names that spell a number are accepted.
    fn number(&self, target: ParamTarget) -> Result<f32> {
        match self {
            ParamValue::Number(value) => Ok(*value),
            ParamValue::Name(name) => name.trim().parse().map_err(|_| EngineError::InvalidValue {
                target: target.to_string(),
                reason: format!("expected a number, got `{name}`"),
            }),
        }
    }

    fn name(&self, target: ParamTarget) -> Result<&str> {
        match self {
            ParamValue::Name(name) => Ok(name.trim()),
            ParamValue::Number(value) => Err(EngineError::InvalidValue {
                target: target.to_string(),
                reason: format!("expected a name, got {value}"),
            }),
        }
    }

    fn parse_name<T: FromStr>(&self, target: ParamTarget) -> Result<T> {
        let name = self.name(target)?;
        name.parse().map_err(|_| EngineError::InvalidValue {
            target: target.to_string(),
            reason: format!("`{name}` is not recognised"),
        })
    }
}

/// One routed parameter change.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterChange {
    pub target: ParamTarget,
    pub value: ParamValue,
}

impl ParameterChange {
    pub fn new(target: ParamTarget, value: impl Into<ParamValue>) -> Self {
        Self {
            target,
            value: value.into(),
        }
    }

    pub fn parse(path: &str, value: impl Into<ParamValue>) -> Result<Self> {
        Ok(Self::new(path.parse()?, value))
    }
}

impl SynthEngine {
    /// Dispatch a change to the matching control call.
    pub fn apply(&mut self, change: ParameterChange) -> Result<EditOutcome> {
        let ParameterChange { target, value } = change;
        let outcome = match target {
            ParamTarget::SynthKind => self.set_synth_kind(value.parse_name::<SynthKind>(target)?),
            ParamTarget::Waveform => {
                self.set_waveform(value.parse_name::<OscillatorWaveform>(target)?)
            }
            ParamTarget::ModulationWaveform => {
                self.set_modulation_waveform(value.parse_name::<OscillatorWaveform>(target)?)
            }
            ParamTarget::Harmonicity => self.set_harmonicity(value.number(target)?),
            ParamTarget::ModulationIndex => self.set_modulation_index(value.number(target)?),
            ParamTarget::VoiceGain => self.set_voice_gain(value.number(target)?),
            ParamTarget::Partial(index) => self.set_partial(index, value.number(target)?),
            ParamTarget::Envelope(stage) => self.set_envelope(stage, value.number(target)?),
            ParamTarget::Effect { kind, param } => {
                self.update_module_parameter(kind, param, value.number(target)?)
            }
            ParamTarget::ChainAdd | ParamTarget::ChainRemove => {
                let name = value.name(target)?;
                let kind: EffectKind = name
                    .parse()
                    .map_err(|_| EngineError::UnknownEffect(name.to_string()))?;
                if target == ParamTarget::ChainAdd {
                    self.add_module(kind)
                } else {
                    self.remove_module(kind)
                }
            }
        };
        outcome.inspect_err(|e| tracing::warn!(%target, "parameter change rejected: {e}"))
    }

    /// Parse `path` and apply it in one step.
    pub fn apply_path(&mut self, path: &str, value: impl Into<ParamValue>) -> Result<EditOutcome> {
        let change = ParameterChange::parse(path, value)
            .inspect_err(|e| tracing::warn!(path, "parameter change rejected: {e}"))?;
        self.apply(change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{chain::Stage, engine::EngineConfig};

    fn engine() -> SynthEngine {
        let (engine, _renderer) = SynthEngine::new(EngineConfig::default()).expect("valid config");
        engine
    }

    #[test]
    fn every_path_form_parses_and_prints_back() {
        for path in [
            "synth.kind",
            "synth.waveform",
            "synth.modulation_waveform",
            "synth.harmonicity",
            "synth.modulation_index",
            "synth.gain",
            "synth.partials.7",
            "envelope.attack",
            "envelope.release",
            "effect.ping-pong-delay.feedback",
            "effect.reverb.room_size",
            "chain.add",
            "chain.remove",
        ] {
            let target: ParamTarget = path.parse().expect(path);
            assert_eq!(target.to_string(), path);
        }
    }

    #[test]
    fn bad_paths_say_what_is_wrong() {
        assert_eq!(
            "synth.volume".parse::<ParamTarget>(),
            Err(EngineError::UnknownTarget("synth.volume".into()))
        );
        assert_eq!(
            "synth.partials.8".parse::<ParamTarget>(),
            Err(EngineError::UnknownTarget("synth.partials.8".into()))
        );
        assert_eq!(
            "effect.flanger.rate".parse::<ParamTarget>(),
            Err(EngineError::UnknownEffect("flanger".into()))
        );
        assert_eq!(
            "effect.chorus.wobble".parse::<ParamTarget>(),
            Err(EngineError::UnknownParameter("wobble".into()))
        );
        assert_eq!(
            "effect.chorus.cutoff".parse::<ParamTarget>(),
            Err(EngineError::ParamNotSupported {
                kind: EffectKind::Chorus,
                param: EffectParam::Cutoff
            })
        );
    }

    #[test]
    fn changes_reach_the_engine() {
        let mut engine = engine();
        engine.apply_path("synth.kind", "fm").expect("fm is a kind");
        engine.apply_path("synth.waveform", "saw").expect("saw is a waveform");
        engine.apply_path("envelope.release", 0.5_f32).expect("release is numeric");
        engine.apply_path("synth.partials.2", "0.25").expect("numeric name accepted");
        engine.apply_path("chain.add", "reverb").expect("reverb is a kind");
        engine
            .apply_path("effect.reverb.mix", 0.8_f32)
            .expect("reverb has mix");

        let synth = engine.synth_config();
        assert_eq!(synth.kind, SynthKind::Fm);
        assert_eq!(synth.waveform, OscillatorWaveform::Sawtooth);
        assert_eq!(synth.envelope.release, 0.5);
        assert_eq!(synth.partials[2], 0.25);
        assert_eq!(
            engine.stages(),
            vec![Stage::Source, Stage::Effect(EffectKind::Reverb), Stage::Sink]
        );
        assert_eq!(
            engine.effect_settings(EffectKind::Reverb).get(EffectParam::Mix),
            Some(0.8)
        );
    }

    #[test]
    fn mistyped_values_are_rejected() {
        let mut engine = engine();
        assert!(matches!(
            engine.apply_path("synth.kind", 2.0_f32),
            Err(EngineError::InvalidValue { .. })
        ));
        assert!(matches!(
            engine.apply_path("synth.kind", "granular"),
            Err(EngineError::InvalidValue { .. })
        ));
        assert!(matches!(
            engine.apply_path("envelope.attack", "slow"),
            Err(EngineError::InvalidValue { .. })
        ));
        assert!(matches!(
            engine.apply_path("envelope.attack", f32::NAN),
            Err(EngineError::InvalidValue { .. })
        ));
        assert_eq!(
            engine.apply_path("chain.add", "flanger"),
            Err(EngineError::UnknownEffect("flanger".into()))
        );
        assert_eq!(engine.synth_config().kind, SynthKind::Classic);
    }

    #[test]
    fn redundant_changes_are_unchanged() {
        let mut engine = engine();
        assert_eq!(engine.apply_path("synth.kind", "classic"), Ok(EditOutcome::Unchanged));
        assert_eq!(engine.apply_path("chain.remove", "delay"), Ok(EditOutcome::Unchanged));
    }
}
