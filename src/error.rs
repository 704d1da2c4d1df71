use thiserror::Error;

use crate::effects::{EffectKind, EffectParam};

/// Everything the control surface can refuse.
///
/// Returned before anything reaches the render thread; a rejected call never
/// leaves a half-applied edit behind.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("note {0} is outside 0..=127")]
    NoteOutOfRange(i32),

    #[error("velocity {0} is outside 1..=127")]
    VelocityOutOfRange(i32),

    #[error("octave shift {0} is outside -4..=4")]
    OctaveOutOfRange(i32),

    #[error("unknown effect kind `{0}`")]
    UnknownEffect(String),

    #[error("unknown parameter `{0}`")]
    UnknownParameter(String),

    #[error("unknown parameter target `{0}`")]
    UnknownTarget(String),

    #[error("{kind} has no `{param}` parameter")]
    ParamNotSupported { kind: EffectKind, param: EffectParam },

    #[error("invalid value for `{target}`: {reason}")]
    InvalidValue { target: String, reason: String },

    #[error("render command queue is full")]
    QueueFull,
}

pub type Result<T> = std::result::Result<T, EngineError>;
