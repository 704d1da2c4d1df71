//! The engine context: a control handle and a render half.
//!
//! ```text
//!   SynthEngine (control thread)              Renderer (audio thread)
//!   ─────────────────────────────             ───────────────────────
//!   validate → build module → push ──rtrb──→  drain commands (block start)
//!   mirror: SynthConfig, ChainLayout          VoicePool → ChainRunner → Limiter
//!   drop retired modules        ←──rtrb────   detach modules
//! ```
//!
//! Every call on [`SynthEngine`] validates first and touches its own state
//! only after the matching command is queued. A full queue therefore leaves
//! both sides exactly as they were. The renderer never allocates, locks or
//! frees; modules leave the audio thread through the return queue and are
//! dropped by [`SynthEngine::collect_garbage`].

use rtrb::{Consumer, Producer, RingBuffer};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::EnumCount;
use tracing::{debug, info, warn};

use crate::{
    chain::{ChainEdit, ChainLayout, ChainOrder, ChainRunner, EditOutcome, Stage},
    dsp::{
        envelope::EnvelopeSettings,
        limiter::{Limiter, DEFAULT_CEILING},
        oscillator::{OscillatorWaveform, MAX_PARTIALS},
        RenderCtx,
    },
    effects::{self, EffectKind, EffectModule, EffectParam, EffectSettings},
    error::{EngineError, Result},
    synth::{
        message::{validate_velocity, VoiceMessage},
        EnvelopeStage, NoteEvent, NoteIdentity, NoteKind, SynthConfig, SynthKind, VoicePolicy,
        VoicePool,
    },
    MAX_BLOCK_SIZE,
};

/// Engine-wide settings fixed at construction.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    pub sample_rate: f32,
    /// Polyphony cap. Beyond it, voices are stolen.
    pub max_voices: usize,
    pub policy: VoicePolicy,
    /// Slots in the control → render command queue.
    pub command_capacity: usize,
    /// Margin after a release ends before the voice's slot is reclaimed.
    pub release_guard_ms: f32,
    pub limiter_ceiling: f32,
    /// Initial voice defaults.
    pub synth: SynthConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000.0,
            max_voices: 16,
            policy: VoicePolicy::PerNote,
            command_capacity: 256,
            release_guard_ms: 10.0,
            limiter_ceiling: DEFAULT_CEILING,
            synth: SynthConfig::default(),
        }
    }
}

impl EngineConfig {
    /// The config as the engine will run it: rejected if any field is
    /// unusable, with the voice defaults clamped into range.
    fn validate(self) -> Result<Self> {
        let invalid = |target: &str, reason: &str| EngineError::InvalidValue {
            target: target.to_string(),
            reason: reason.to_string(),
        };
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(invalid("sample_rate", "must be positive"));
        }
        if self.max_voices == 0 {
            return Err(invalid("max_voices", "must be at least 1"));
        }
        if self.command_capacity == 0 {
            return Err(invalid("command_capacity", "must be at least 1"));
        }
        if !(self.release_guard_ms.is_finite() && self.release_guard_ms >= 0.0) {
            return Err(invalid("release_guard_ms", "must be zero or positive"));
        }
        if !(self.limiter_ceiling > 0.0 && self.limiter_ceiling <= 1.0) {
            return Err(invalid("limiter_ceiling", "must be in (0, 1]"));
        }
        Ok(Self {
            synth: self.synth.checked()?,
            ..self
        })
    }
}

/// Control → render messages. One command is one atomic change.
#[derive(Debug)]
pub enum EngineCommand {
    Voice(VoiceMessage),
    Config(SynthConfig),
    Chain(ChainEdit),
    /// Drop every voice and clear every effect tail.
    Panic,
}

/// Control handle. Owns the authoritative synth configuration and chain
/// layout; all edits go through here.
pub struct SynthEngine {
    config: EngineConfig,
    synth: SynthConfig,
    layout: ChainLayout,
    commands: Producer<EngineCommand>,
    retired: Consumer<Box<dyn EffectModule>>,
}

impl SynthEngine {
    /// Build both halves. Move the [`Renderer`] into the audio callback.
    pub fn new(config: EngineConfig) -> Result<(SynthEngine, Renderer)> {
        let config = config
            .validate()
            .inspect_err(|e| warn!("engine config rejected: {e}"))?;

        let (commands_tx, commands_rx) = RingBuffer::new(config.command_capacity);
        let (retired_tx, retired_rx) =
            RingBuffer::new(config.command_capacity.max(2 * EffectKind::COUNT));

        let pool = VoicePool::new(
            config.sample_rate,
            config.max_voices,
            config.policy,
            config.synth,
            config.release_guard_ms / 1000.0,
        );
        let chain = ChainRunner::new(
            Limiter::new(config.limiter_ceiling, config.sample_rate),
            retired_tx,
        );

        info!(
            sample_rate = config.sample_rate,
            max_voices = config.max_voices,
            policy = %config.policy,
            "synth engine created"
        );

        let engine = SynthEngine {
            config,
            synth: config.synth,
            layout: ChainLayout::new(),
            commands: commands_tx,
            retired: retired_rx,
        };
        let renderer = Renderer {
            pool,
            chain,
            commands: commands_rx,
            ctx: RenderCtx::effect(config.sample_rate),
            left: vec![0.0; MAX_BLOCK_SIZE],
            right: vec![0.0; MAX_BLOCK_SIZE],
        };
        Ok((engine, renderer))
    }

    fn send(&mut self, command: EngineCommand) -> Result<()> {
        self.collect_garbage();
        self.commands.push(command).map_err(|_| {
            warn!("render command queue is full, change dropped");
            EngineError::QueueFull
        })
    }

    /// Drop modules the renderer has detached. Returns how many were freed.
    pub fn collect_garbage(&mut self) -> usize {
        let mut freed = 0;
        while let Ok(module) = self.retired.pop() {
            debug!(kind = %module.kind(), "disposing detached module");
            drop(module);
            freed += 1;
        }
        freed
    }

    // ── Notes ──────────────────────────────────────────────────────────

    pub fn note_on(&mut self, note: i32, velocity: i32, octave_shift: i32) -> Result<()> {
        let identity = NoteIdentity::new(note, octave_shift)
            .inspect_err(|e| warn!("note on rejected: {e}"))?;
        let velocity =
            validate_velocity(velocity).inspect_err(|e| warn!("note on rejected: {e}"))?;
        self.send(EngineCommand::Voice(VoiceMessage::NoteOn { identity, velocity }))?;
        debug!(note, velocity, octave_shift, "note on");
        Ok(())
    }

    pub fn note_off(&mut self, note: i32, octave_shift: i32) -> Result<()> {
        let identity = NoteIdentity::new(note, octave_shift)
            .inspect_err(|e| warn!("note off rejected: {e}"))?;
        self.send(EngineCommand::Voice(VoiceMessage::NoteOff { identity }))?;
        debug!(note, octave_shift, "note off");
        Ok(())
    }

    pub fn handle_note(&mut self, event: NoteEvent) -> Result<()> {
        match event.kind {
            NoteKind::On => self.note_on(event.note, event.velocity, event.octave_shift),
            NoteKind::Off => self.note_off(event.note, event.octave_shift),
        }
    }

    /// Release every sounding voice.
    pub fn all_notes_off(&mut self) -> Result<()> {
        self.send(EngineCommand::Voice(VoiceMessage::AllNotesOff))?;
        debug!("all notes off");
        Ok(())
    }

    /// Hard stop: voices are cut without release and delay or reverb
    /// tails are cleared. The chain layout is kept.
    pub fn panic(&mut self) -> Result<()> {
        self.send(EngineCommand::Panic)?;
        info!("panic, all sound cut");
        Ok(())
    }

    // ── Chain ──────────────────────────────────────────────────────────

    /// Insert `kind` before the sink, built from its stored settings.
    pub fn add_module(&mut self, kind: EffectKind) -> Result<EditOutcome> {
        let Some(order) = self.layout.plan_add(kind) else {
            debug!(%kind, "already in chain, add ignored");
            return Ok(EditOutcome::Unchanged);
        };
        let module = effects::build(self.layout.settings(kind), self.config.sample_rate);
        self.send(EngineCommand::Chain(ChainEdit::Insert { module, order }))?;
        self.layout.commit_order(order);
        info!(%kind, "module added");
        Ok(EditOutcome::Applied)
    }

    pub fn remove_module(&mut self, kind: EffectKind) -> Result<EditOutcome> {
        let Some(order) = self.layout.plan_remove(kind) else {
            warn!(%kind, "not in chain, remove ignored");
            return Ok(EditOutcome::Unchanged);
        };
        self.send(EngineCommand::Chain(ChainEdit::Remove { kind, order }))?;
        self.layout.commit_order(order);
        info!(%kind, "module removed");
        Ok(EditOutcome::Applied)
    }

    /// Move a live module to `index` among the effects (clamped to the end).
    pub fn move_module(&mut self, kind: EffectKind, index: usize) -> Result<EditOutcome> {
        if !self.layout.contains(kind) {
            warn!(%kind, "not in chain, move ignored");
            return Ok(EditOutcome::Unchanged);
        }
        let Some(order) = self.layout.plan_move(kind, index) else {
            return Ok(EditOutcome::Unchanged);
        };
        self.send(EngineCommand::Chain(ChainEdit::Reorder { order }))?;
        self.layout.commit_order(order);
        info!(%kind, index, "module moved");
        Ok(EditOutcome::Applied)
    }

    /// Remove every module. The chain becomes source → sink.
    pub fn clear_chain(&mut self) -> Result<EditOutcome> {
        if self.layout.order().is_empty() {
            return Ok(EditOutcome::Unchanged);
        }
        self.send(EngineCommand::Chain(ChainEdit::Clear))?;
        self.layout.commit_order(ChainOrder::new());
        info!("chain cleared");
        Ok(EditOutcome::Applied)
    }

    /// Store a parameter value for `kind` and, if the module is live, retune
    /// it. Values are clamped to the parameter's range.
    pub fn update_module_parameter(
        &mut self,
        kind: EffectKind,
        param: EffectParam,
        value: f32,
    ) -> Result<EditOutcome> {
        let next = self
            .layout
            .plan_update(kind, param, value)
            .inspect_err(|e| warn!("parameter update rejected: {e}"))?;
        if next == *self.layout.settings(kind) {
            return Ok(EditOutcome::Unchanged);
        }

        if self.layout.contains(kind) {
            let value = next.get(param).unwrap_or(value);
            self.send(EngineCommand::Chain(ChainEdit::SetParam { kind, param, value }))?;
        }
        self.layout.commit_settings(next);
        debug!(%kind, %param, value, "module parameter updated");
        Ok(EditOutcome::Applied)
    }

    // ── Voice configuration ────────────────────────────────────────────

    fn update_synth(&mut self, change: impl FnOnce(&mut SynthConfig)) -> Result<EditOutcome> {
        let mut next = self.synth;
        change(&mut next);
        if next == self.synth {
            return Ok(EditOutcome::Unchanged);
        }
        self.send(EngineCommand::Config(next))?;
        self.synth = next;
        Ok(EditOutcome::Applied)
    }

    pub fn set_synth_kind(&mut self, kind: SynthKind) -> Result<EditOutcome> {
        let outcome = self.update_synth(|c| c.kind = kind)?;
        info!(%kind, "synth kind set");
        Ok(outcome)
    }

    pub fn set_waveform(&mut self, waveform: OscillatorWaveform) -> Result<EditOutcome> {
        let outcome = self.update_synth(|c| c.waveform = waveform)?;
        debug!(%waveform, "waveform set");
        Ok(outcome)
    }

    pub fn set_modulation_waveform(&mut self, waveform: OscillatorWaveform) -> Result<EditOutcome> {
        self.update_synth(|c| c.modulation_waveform = waveform)
    }

    pub fn set_envelope(&mut self, stage: EnvelopeStage, value: f32) -> Result<EditOutcome> {
        let value = finite(&format!("envelope.{stage}"), value)?;
        let outcome = self.update_synth(|c| c.set_envelope_stage(stage, value))?;
        debug!(%stage, value, "envelope set");
        Ok(outcome)
    }

    /// Replace all four envelope values at once.
    pub fn set_envelope_settings(&mut self, settings: EnvelopeSettings) -> Result<EditOutcome> {
        let values = [
            (EnvelopeStage::Attack, settings.attack),
            (EnvelopeStage::Decay, settings.decay),
            (EnvelopeStage::Sustain, settings.sustain),
            (EnvelopeStage::Release, settings.release),
        ];
        for (stage, value) in values {
            finite(&format!("envelope.{stage}"), value)?;
        }
        self.update_synth(|c| {
            for (stage, value) in values {
                c.set_envelope_stage(stage, value);
            }
        })
    }

    pub fn set_harmonicity(&mut self, value: f32) -> Result<EditOutcome> {
        let value = finite("synth.harmonicity", value)?;
        self.update_synth(|c| c.set_harmonicity(value))
    }

    pub fn set_modulation_index(&mut self, value: f32) -> Result<EditOutcome> {
        let value = finite("synth.modulation_index", value)?;
        self.update_synth(|c| c.set_modulation_index(value))
    }

    pub fn set_voice_gain(&mut self, value: f32) -> Result<EditOutcome> {
        let value = finite("synth.gain", value)?;
        self.update_synth(|c| c.set_voice_gain(value))
    }

    pub fn set_partial(&mut self, index: usize, amplitude: f32) -> Result<EditOutcome> {
        let target = format!("synth.partials.{index}");
        if index >= MAX_PARTIALS {
            return Err(EngineError::UnknownTarget(target));
        }
        let amplitude = finite(&target, amplitude)?;
        self.update_synth(|c| {
            c.set_partial(index, amplitude);
        })
    }

    // ── Inspection ─────────────────────────────────────────────────────

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn synth_config(&self) -> &SynthConfig {
        &self.synth
    }

    /// `Source, Effect(..)…, Sink` as the control side last committed it.
    pub fn stages(&self) -> Vec<Stage> {
        self.layout.stages()
    }

    pub fn chain_order(&self) -> ChainOrder {
        self.layout.order()
    }

    pub fn effect_settings(&self, kind: EffectKind) -> &EffectSettings {
        self.layout.settings(kind)
    }
}

fn finite(target: &str, value: f32) -> Result<f32> {
    if value.is_finite() {
        Ok(value)
    } else {
        let error = EngineError::InvalidValue {
            target: target.to_string(),
            reason: format!("{value} is not a finite number"),
        };
        warn!("{error}");
        Err(error)
    }
}

/// Render half. Lives in the audio callback.
pub struct Renderer {
    pool: VoicePool,
    chain: ChainRunner,
    commands: Consumer<EngineCommand>,
    ctx: RenderCtx,
    // Scratch for render_interleaved
    left: Vec<f32>,
    right: Vec<f32>,
}

impl Renderer {
    fn drain_commands(&mut self) {
        while let Ok(command) = self.commands.pop() {
            match command {
                EngineCommand::Voice(message) => self.pool.handle(message),
                EngineCommand::Config(config) => self.pool.set_config(config),
                EngineCommand::Chain(edit) => self.chain.apply(edit),
                EngineCommand::Panic => {
                    self.pool.silence();
                    self.chain.reset();
                }
            }
        }
    }

    /// Fill a stereo pair. Pending commands are applied first; the block is
    /// then rendered against a stable voice set and chain.
    pub fn render(&mut self, left: &mut [f32], right: &mut [f32]) {
        self.drain_commands();

        let frames = left.len().min(right.len());
        let (left, left_rest) = left.split_at_mut(frames);
        let (right, right_rest) = right.split_at_mut(frames);
        left_rest.fill(0.0);
        right_rest.fill(0.0);

        for (l, r) in left
            .chunks_mut(MAX_BLOCK_SIZE)
            .zip(right.chunks_mut(MAX_BLOCK_SIZE))
        {
            self.pool.render(l);
            // Non-finite samples must not reach effect feedback state
            for sample in l.iter_mut().filter(|s| !s.is_finite()) {
                *sample = 0.0;
            }
            r.copy_from_slice(l);
            self.chain.process(l, r, &self.ctx);
        }
    }

    /// Fill an interleaved buffer with `channels` channels. Mono gets the
    /// average of left and right; channels past the second are silent.
    pub fn render_interleaved(&mut self, out: &mut [f32], channels: usize) {
        if channels == 0 {
            return;
        }
        let mut left = std::mem::take(&mut self.left);
        let mut right = std::mem::take(&mut self.right);

        for frame_block in out.chunks_mut(MAX_BLOCK_SIZE * channels) {
            let frames = frame_block.len() / channels;
            self.render(&mut left[..frames], &mut right[..frames]);

            for (i, frame) in frame_block.chunks_mut(channels).enumerate() {
                if i >= frames {
                    frame.fill(0.0);
                    continue;
                }
                match channels {
                    1 => frame[0] = 0.5 * (left[i] + right[i]),
                    _ => {
                        frame[0] = left[i];
                        frame[1] = right[i];
                        frame[2..].fill(0.0);
                    }
                }
            }
        }

        self.left = left;
        self.right = right;
    }

    pub fn pool(&self) -> &VoicePool {
        &self.pool
    }

    pub fn chain(&self) -> &ChainRunner {
        &self.chain
    }

    pub fn sample_rate(&self) -> f32 {
        self.ctx.sample_rate
    }
}
