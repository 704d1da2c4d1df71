use crate::error::{EngineError, Result};

pub const MIN_OCTAVE_SHIFT: i8 = -4;
pub const MAX_OCTAVE_SHIFT: i8 = 4;

/// What keys a voice: the note number plus the octave shift it was played at.
///
/// The same note played at two octave shifts is two independent voices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NoteIdentity {
    pub note: u8,
    pub octave_shift: i8,
}

impl NoteIdentity {
    /// Validate raw inputs into an identity.
    pub fn new(note: i32, octave_shift: i32) -> Result<Self> {
        let note = u8::try_from(note)
            .ok()
            .filter(|n| *n <= 127)
            .ok_or(EngineError::NoteOutOfRange(note))?;
        let octave_shift = i8::try_from(octave_shift)
            .ok()
            .filter(|o| (MIN_OCTAVE_SHIFT..=MAX_OCTAVE_SHIFT).contains(o))
            .ok_or(EngineError::OctaveOutOfRange(octave_shift))?;
        Ok(Self { note, octave_shift })
    }

    pub fn frequency(&self) -> f32 {
        crate::dsp::note_to_freq(self.note, self.octave_shift)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteKind {
    On,
    Off,
}

/// A note event as it arrives from a keyboard or sequencer, unvalidated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteEvent {
    pub note: i32,
    pub velocity: i32,
    pub octave_shift: i32,
    pub kind: NoteKind,
}

impl NoteEvent {
    pub fn on(note: i32, velocity: i32, octave_shift: i32) -> Self {
        Self {
            note,
            velocity,
            octave_shift,
            kind: NoteKind::On,
        }
    }

    pub fn off(note: i32, octave_shift: i32) -> Self {
        Self {
            note,
            velocity: 0,
            octave_shift,
            kind: NoteKind::Off,
        }
    }
}

/// Velocity must be 1..=127; zero is not a note-on.
pub fn validate_velocity(velocity: i32) -> Result<u8> {
    u8::try_from(velocity)
        .ok()
        .filter(|v| (1..=127).contains(v))
        .ok_or(EngineError::VelocityOutOfRange(velocity))
}

/// Render-thread voice messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceMessage {
    NoteOn { identity: NoteIdentity, velocity: u8 },
    NoteOff { identity: NoteIdentity },
    AllNotesOff,
}
