use crate::synth::{
    config::{SynthConfig, VoicePolicy},
    message::{NoteIdentity, VoiceMessage},
    voice::{Voice, VoiceStage},
};

/// Fixed-capacity set of voices, keyed by [`NoteIdentity`].
///
/// Slots are allocated once; triggering, releasing and evicting only move
/// `Voice` values in and out of them. At most one non-finished voice exists
/// per identity: a repeated note-on retriggers the existing voice in place.
pub struct VoicePool {
    slots: Vec<Option<Voice>>,
    config: SynthConfig,
    policy: VoicePolicy,
    sample_rate: f32,
    guard_samples: u32,
    triggers: u64,
}

impl VoicePool {
    pub fn new(
        sample_rate: f32,
        max_voices: usize,
        policy: VoicePolicy,
        config: SynthConfig,
        release_guard_seconds: f32,
    ) -> Self {
        Self {
            slots: (0..max_voices.max(1)).map(|_| None).collect(),
            config,
            policy,
            sample_rate,
            guard_samples: (release_guard_seconds.max(0.0) * sample_rate).round() as u32,
            triggers: 0,
        }
    }

    pub fn handle(&mut self, message: VoiceMessage) {
        match message {
            VoiceMessage::NoteOn { identity, velocity } => self.note_on(identity, velocity),
            VoiceMessage::NoteOff { identity } => self.note_off(identity),
            VoiceMessage::AllNotesOff => self.all_notes_off(),
        }
    }

    pub fn note_on(&mut self, identity: NoteIdentity, velocity: u8) {
        let age = self.triggers;
        self.triggers += 1;

        let config = self.config;
        if let Some(voice) = self.find_sounding(identity) {
            voice.retrigger(velocity, &config, age);
            return;
        }

        let index = self.allocate_slot();
        self.slots[index] = Some(Voice::new(identity, velocity, &config, self.sample_rate, age));
    }

    /// Release the sounding voice for `identity`. Missing, releasing and
    /// finished voices are left alone.
    pub fn note_off(&mut self, identity: NoteIdentity) {
        let guard = self.guard_samples;
        if let Some(voice) = self.find_sounding(identity) {
            voice.release(guard);
        }
    }

    pub fn all_notes_off(&mut self) {
        let guard = self.guard_samples;
        for voice in self.slots.iter_mut().flatten() {
            voice.release(guard);
        }
    }

    /// Cut every voice at once, without a release.
    pub fn silence(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
    }

    /// Replace the voice defaults. Under the shared policy every voice that
    /// is still sounding follows immediately.
    pub fn set_config(&mut self, config: SynthConfig) {
        self.config = config;
        if self.policy == VoicePolicy::Shared {
            for voice in self.slots.iter_mut().flatten() {
                if voice.stage() != VoiceStage::Finished {
                    voice.apply_config(&config);
                }
            }
        }
    }

    /// Mix every voice into `out` (overwriting it), then evict voices whose
    /// release and guard have elapsed.
    pub fn render(&mut self, out: &mut [f32]) {
        out.fill(0.0);
        for voice in self.slots.iter_mut().flatten() {
            voice.render_add(out);
        }

        for slot in self.slots.iter_mut() {
            if slot.as_ref().is_some_and(Voice::is_evictable) {
                *slot = None;
            }
        }
    }

    fn find_sounding(&mut self, identity: NoteIdentity) -> Option<&mut Voice> {
        self.slots
            .iter_mut()
            .flatten()
            .find(|v| v.identity() == identity && v.stage() != VoiceStage::Finished)
    }

    fn allocate_slot(&self) -> usize {
        // First pass: any empty slot
        if let Some(index) = self.slots.iter().position(Option::is_none) {
            return index;
        }

        // Second pass: oldest releasing or finished voice
        let oldest = |releasing_only: bool| {
            self.slots
                .iter()
                .enumerate()
                .filter_map(|(index, slot)| slot.as_ref().map(|voice| (index, voice)))
                .filter(|(_, voice)| {
                    !releasing_only
                        || matches!(voice.stage(), VoiceStage::Releasing | VoiceStage::Finished)
                })
                .min_by_key(|(_, voice)| voice.age())
                .map(|(index, _)| index)
        };

        // Last resort: oldest voice overall
        oldest(true).or_else(|| oldest(false)).unwrap_or(0)
    }

    /// The voice for `identity`, preferring a sounding one over a finished
    /// one still waiting out its guard.
    pub fn voice(&self, identity: NoteIdentity) -> Option<&Voice> {
        self.voices()
            .filter(|v| v.identity() == identity)
            .min_by_key(|v| v.stage() == VoiceStage::Finished)
    }

    pub fn voices(&self) -> impl Iterator<Item = &Voice> {
        self.slots.iter().flatten()
    }

    /// Voices occupying a slot, including finished ones awaiting eviction.
    pub fn len(&self) -> usize {
        self.voices().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Voices that are still audible.
    pub fn sounding(&self) -> usize {
        self.voices()
            .filter(|v| v.stage() != VoiceStage::Finished)
            .count()
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    pub fn policy(&self) -> VoicePolicy {
        self.policy
    }
}
