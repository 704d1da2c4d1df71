#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{dsp::RenderCtx, MIN_TIME};

/*
ADSR Envelope Implementation
============================

The envelope owns a voice's amplitude lifecycle: it turns the note's gate
(note_on / note_off) into a gain multiplier that changes over time.

Vocabulary
----------

  level       The envelope's current output value (0.0 to 1.0). It multiplies
              the voice's oscillator output.

  stage       Idle, Attack, Decay, Sustain, Release or Finished. A small state
              machine governs the transitions.

  floor       The level an exponential release aims for. Exponential curves
              never reach zero, so we aim for 0.0001 (-80 dB) and call the
              note finished once the release time has run out.


The Shape
---------

  Level
    1.0 ┐     ╱╲
        │    ╱  ╲___________
    S   │   ╱               ╲
        │  ╱                 ╲_
    0.0 └─╱────────────────────‾‾──→ Time
        Attack Decay  Sustain  Release
        linear linear  hold    exponential

Attack and decay are LINEAR ramps driven by a sample counter, so a stage ends
on an exact sample: after round(attack * sr) samples the level is exactly 1.0,
after round(decay * sr) more it is exactly the sustain level.

Release is EXPONENTIAL. At note_off we snapshot the current level L0 and
derive a per-sample ratio r so that

    L0 * r^N = FLOOR        where N = round(release * sr)

Each sample we do `level *= r`. Multiplying by a constant ratio sounds like a
natural decay and never produces a discontinuity.


The State Machine
-----------------

    Idle ──note_on──→ Attack ──level=1──→ Decay ──level=S──→ Sustain
                         │                  │                   │
                         └──────note_off────┴─────note_off──────┘
                                            ↓
                                         Release ──N samples──→ Finished

note_off moves to Release from Attack, Decay or Sustain and always starts
from the CURRENT level. A second note_off while releasing is ignored, so the
tail is never restarted.

note_on also starts from the current level. A retriggered voice ramps up
from wherever it was instead of snapping to zero.
*/

/// Floor for the exponential release ramp (-80 dB).
pub const RELEASE_FLOOR: f32 = 1e-4;

/// The current stage of the envelope state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeState {
    Idle,     // Gate never opened, level = 0
    Attack,   // Ramping up to 1.0
    Decay,    // Ramping towards the sustain level
    Sustain,  // Holding while the gate is high
    Release,  // Gate went low, decaying towards the floor
    Finished, // Release tail elapsed, level = 0
}

/// Envelope times in seconds and the sustain level (0.0 - 1.0).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeSettings {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
}

impl EnvelopeSettings {
    pub fn new(attack: f32, decay: f32, sustain: f32, release: f32) -> Self {
        Self {
            attack,
            decay,
            sustain,
            release,
        }
        .sanitized()
    }

    /// Clamp times to at least one sample and sustain to 0..=1.
    pub fn sanitized(self) -> Self {
        Self {
            attack: self.attack.max(MIN_TIME),
            decay: self.decay.max(MIN_TIME),
            sustain: self.sustain.clamp(0.0, 1.0),
            release: self.release.max(MIN_TIME),
        }
    }
}

impl Default for EnvelopeSettings {
    fn default() -> Self {
        Self {
            attack: 0.01,
            decay: 0.1,
            sustain: 0.7,
            release: 0.03,
        }
    }
}

pub struct Envelope {
    settings: EnvelopeSettings,

    stage: EnvelopeState,
    level: f32,

    // Linear stages interpolate from stage_start_level using a sample counter
    stage_start_level: f32,
    stage_elapsed: u32,

    // Release bookkeeping, fixed at note_off
    release_ratio: f32,
    release_total_samples: u32,
}

impl Envelope {
    pub fn new(settings: EnvelopeSettings) -> Self {
        Self {
            settings: settings.sanitized(),
            stage: EnvelopeState::Idle,
            level: 0.0,
            stage_start_level: 0.0,
            stage_elapsed: 0,
            release_ratio: 1.0,
            release_total_samples: 1,
        }
    }

    pub fn adsr(attack: f32, decay: f32, sustain: f32, release: f32) -> Self {
        Self::new(EnvelopeSettings::new(attack, decay, sustain, release))
    }

    /// Seed the level a subsequent `note_on` ramps up from.
    pub fn prime(&mut self, level: f32) {
        self.level = level.clamp(0.0, 1.0);
    }

    /// Gate high: start the attack phase from the current level.
    pub fn note_on(&mut self) {
        self.enter(EnvelopeState::Attack);
    }

    /// Gate low: start the release phase from the current level.
    ///
    /// Ignored when the envelope is idle, already releasing or finished.
    pub fn note_off(&mut self, ctx: &RenderCtx) {
        if !matches!(
            self.stage,
            EnvelopeState::Attack | EnvelopeState::Decay | EnvelopeState::Sustain
        ) {
            return;
        }

        self.release_total_samples = ctx.seconds_to_samples(self.settings.release);
        self.release_ratio = if self.level > RELEASE_FLOOR {
            (RELEASE_FLOOR / self.level).powf(1.0 / self.release_total_samples as f32)
        } else {
            1.0
        };
        self.enter(EnvelopeState::Release);
    }

    /// Apply new times without restarting the note.
    ///
    /// A running attack or decay continues from the current level with the new
    /// rate. A sustain change while sustaining glides there through the decay
    /// stage. Release time only affects the next release.
    pub fn set_settings(&mut self, settings: EnvelopeSettings) {
        let settings = settings.sanitized();
        let sustain_changed = settings.sustain != self.settings.sustain;
        self.settings = settings;

        match self.stage {
            EnvelopeState::Attack | EnvelopeState::Decay => {
                let stage = self.stage;
                self.enter(stage);
            }
            EnvelopeState::Sustain if sustain_changed => self.enter(EnvelopeState::Decay),
            _ => {}
        }
    }

    fn enter(&mut self, stage: EnvelopeState) {
        self.stage = stage;
        self.stage_start_level = self.level;
        self.stage_elapsed = 0;
    }

    /// Advance the envelope by one sample.
    pub fn next_sample(&mut self, ctx: &RenderCtx) -> f32 {
        match self.stage {
            EnvelopeState::Idle | EnvelopeState::Finished => {
                self.level = 0.0;
            }

            EnvelopeState::Attack => {
                let total = ctx.seconds_to_samples(self.settings.attack);
                self.stage_elapsed += 1;
                if self.stage_elapsed >= total {
                    self.level = 1.0;
                    self.enter(EnvelopeState::Decay);
                } else {
                    let progress = self.stage_elapsed as f32 / total as f32;
                    self.level = self.stage_start_level + (1.0 - self.stage_start_level) * progress;
                }
            }

            EnvelopeState::Decay => {
                let target = self.settings.sustain;
                let total = ctx.seconds_to_samples(self.settings.decay);
                self.stage_elapsed += 1;
                if self.stage_elapsed >= total {
                    self.level = target;
                    self.enter(EnvelopeState::Sustain);
                } else {
                    let progress = self.stage_elapsed as f32 / total as f32;
                    self.level =
                        self.stage_start_level + (target - self.stage_start_level) * progress;
                }
            }

            EnvelopeState::Sustain => {
                self.level = self.settings.sustain;
            }

            EnvelopeState::Release => {
                self.stage_elapsed += 1;
                if self.stage_elapsed >= self.release_total_samples {
                    self.level = 0.0;
                    self.stage = EnvelopeState::Finished;
                } else {
                    self.level *= self.release_ratio;
                }
            }
        }

        debug_assert!((0.0..=1.0).contains(&self.level));
        self.level
    }

    /// Render a block of envelope values into the buffer.
    pub fn render(&mut self, buffer: &mut [f32], ctx: &RenderCtx) {
        for sample in buffer.iter_mut() {
            *sample = self.next_sample(ctx);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.stage == EnvelopeState::Finished
    }

    /// Samples spent in the current stage.
    pub fn stage_elapsed(&self) -> u32 {
        self.stage_elapsed
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn state(&self) -> EnvelopeState {
        self.stage
    }

    pub fn settings(&self) -> EnvelopeSettings {
        self.settings
    }
}
