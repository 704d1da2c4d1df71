// Voice lifecycle and polyphony.
// The pool sits on the render thread; config and message types are shared
// with the control handle.

pub mod config;
pub mod message;
pub mod pool;
pub mod voice;

pub use config::{EnvelopeStage, SynthConfig, SynthKind, VoicePolicy};
pub use message::{NoteEvent, NoteIdentity, NoteKind};
pub use pool::VoicePool;
pub use voice::{Voice, VoiceStage};
