use std::f32::consts::TAU;

use crate::{
    dsp::{
        envelope::{Envelope, EnvelopeState},
        oscillator::{OscillatorBlock, MAX_PARTIALS},
        smooth::SmoothedParam,
        RenderCtx,
    },
    synth::{
        config::{SynthConfig, SynthKind},
        message::NoteIdentity,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceStage {
    Attacking,
    Decaying,
    Sustaining,
    Releasing, // Key up, release ramp running
    Finished,  // Silent, waiting out the guard before eviction
}

/// Carrier plus optional modulator, shaped by the synth kind.
///
/// ```text
///   classic:  out = carrier(f)
///   am:       out = carrier(f) · (1 + modulator(h·f)) / 2
///   fm:       out = carrier(f, phase + I·modulator(h·f) / 2π)
/// ```
pub struct VoiceOscillator {
    kind: SynthKind,
    carrier: OscillatorBlock,
    modulator: OscillatorBlock,
    harmonicity: f32,
    modulation_index: f32,
    partials: [f32; MAX_PARTIALS],
}

impl VoiceOscillator {
    pub fn new(config: &SynthConfig) -> Self {
        let mut oscillator = Self {
            kind: config.kind,
            carrier: OscillatorBlock::new(config.waveform),
            modulator: OscillatorBlock::new(config.modulation_waveform),
            harmonicity: config.harmonicity,
            modulation_index: config.modulation_index,
            partials: config.partials,
        };
        oscillator.configure(config);
        oscillator
    }

    /// Adopt a new configuration, keeping both phases.
    pub fn configure(&mut self, config: &SynthConfig) {
        self.kind = config.kind;
        self.carrier.set_waveform(config.waveform);
        self.modulator.set_waveform(config.modulation_waveform);
        self.harmonicity = config.harmonicity;
        self.modulation_index = config.modulation_index;
        self.partials = config.partials;
    }

    #[inline]
    pub fn next_sample(&mut self, frequency: f32, sample_rate: f32) -> f32 {
        match self.kind {
            SynthKind::Classic => self
                .carrier
                .next_sample(frequency, sample_rate, 0.0, &self.partials),
            SynthKind::Am => {
                let m = self.modulator.next_sample(
                    frequency * self.harmonicity,
                    sample_rate,
                    0.0,
                    &self.partials,
                );
                let c = self
                    .carrier
                    .next_sample(frequency, sample_rate, 0.0, &self.partials);
                c * 0.5 * (1.0 + m)
            }
            SynthKind::Fm => {
                let m = self.modulator.next_sample(
                    frequency * self.harmonicity,
                    sample_rate,
                    0.0,
                    &self.partials,
                );
                let offset = self.modulation_index * m / TAU;
                self.carrier
                    .next_sample(frequency, sample_rate, offset, &self.partials)
            }
        }
    }

    pub fn kind(&self) -> SynthKind {
        self.kind
    }

    pub fn carrier_phase(&self) -> f32 {
        self.carrier.phase()
    }
}

/// One sounding note: oscillator × envelope × velocity gain × voice gain.
pub struct Voice {
    identity: NoteIdentity,
    velocity: u8,
    frequency: f32,
    // Velocity × voice gain, ramped when a live config changes it
    gain: SmoothedParam,
    sample_rate: f32,
    age: u64,

    oscillator: VoiceOscillator,
    envelope: Envelope,

    // Set at note-off: samples rendered since, and when the slot may go
    released: bool,
    tail_elapsed: u32,
    dispose_after: u32,
}

impl Voice {
    pub fn new(
        identity: NoteIdentity,
        velocity: u8,
        config: &SynthConfig,
        sample_rate: f32,
        age: u64,
    ) -> Self {
        let mut envelope = Envelope::new(config.envelope);
        envelope.note_on();
        Self {
            identity,
            velocity,
            frequency: identity.frequency(),
            gain: SmoothedParam::new(peak_gain(velocity, config.voice_gain), sample_rate),
            sample_rate,
            age,
            oscillator: VoiceOscillator::new(config),
            envelope,
            released: false,
            tail_elapsed: 0,
            dispose_after: 0,
        }
    }

    /// Replace this voice with a fresh note of the same identity.
    ///
    /// The new attack starts from the current envelope level and the
    /// oscillator keeps its phase, so the handover is continuous.
    pub fn retrigger(&mut self, velocity: u8, config: &SynthConfig, age: u64) {
        let level = self.envelope.level();
        self.envelope = Envelope::new(config.envelope);
        self.envelope.prime(level);
        self.envelope.note_on();

        self.oscillator.configure(config);
        self.velocity = velocity;
        self.gain.set_target(peak_gain(velocity, config.voice_gain));
        self.age = age;
        self.released = false;
        self.tail_elapsed = 0;
        self.dispose_after = 0;
    }

    /// Start the release ramp. Returns false (and changes nothing) when the
    /// voice is already releasing or finished.
    pub fn release(&mut self, guard_samples: u32) -> bool {
        if self.released {
            return false;
        }
        let ctx = self.ctx();
        self.envelope.note_off(&ctx);
        self.released = true;
        self.tail_elapsed = 0;
        self.dispose_after = ctx
            .seconds_to_samples(self.envelope.settings().release)
            .saturating_add(guard_samples);
        true
    }

    /// Follow a live configuration change (shared voice policy).
    pub fn apply_config(&mut self, config: &SynthConfig) {
        self.oscillator.configure(config);
        self.envelope.set_settings(config.envelope);
        self.gain.set_target(peak_gain(self.velocity, config.voice_gain));
    }

    /// Add this voice's output to `out`.
    pub fn render_add(&mut self, out: &mut [f32]) {
        if self.released {
            self.tail_elapsed = self.tail_elapsed.saturating_add(out.len() as u32);
        }
        if self.envelope.is_finished() {
            return;
        }

        let ctx = self.ctx();
        for sample in out.iter_mut() {
            let env = self.envelope.next_sample(&ctx);
            let tone = self.oscillator.next_sample(self.frequency, self.sample_rate);
            *sample += tone * env * self.gain.next();
        }
    }

    fn ctx(&self) -> RenderCtx {
        RenderCtx::from_freq(self.sample_rate, self.frequency, self.velocity as f32)
    }

    pub fn stage(&self) -> VoiceStage {
        match self.envelope.state() {
            EnvelopeState::Idle | EnvelopeState::Attack => VoiceStage::Attacking,
            EnvelopeState::Decay => VoiceStage::Decaying,
            EnvelopeState::Sustain => VoiceStage::Sustaining,
            EnvelopeState::Release => VoiceStage::Releasing,
            EnvelopeState::Finished => VoiceStage::Finished,
        }
    }

    /// True once release plus guard have elapsed.
    pub fn is_evictable(&self) -> bool {
        self.released && self.tail_elapsed >= self.dispose_after
    }

    /// Samples rendered since note-off.
    pub fn tail_elapsed(&self) -> u32 {
        self.tail_elapsed
    }

    pub fn identity(&self) -> NoteIdentity {
        self.identity
    }

    pub fn velocity(&self) -> u8 {
        self.velocity
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn age(&self) -> u64 {
        self.age
    }

    pub fn level(&self) -> f32 {
        self.envelope.level()
    }

    /// Gain the voice settles at once any ramp is done.
    pub fn peak_gain(&self) -> f32 {
        self.gain.target()
    }

    /// Gain applied to the last rendered sample.
    pub fn current_gain(&self) -> f32 {
        self.gain.current()
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    pub fn oscillator(&self) -> &VoiceOscillator {
        &self.oscillator
    }
}

/// Linear velocity curve into the per-voice gain stage.
#[inline]
fn peak_gain(velocity: u8, voice_gain: f32) -> f32 {
    velocity as f32 / 127.0 * voice_gain
}
