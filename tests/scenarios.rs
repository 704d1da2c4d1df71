use saavy_modular::{
    chain::{EditOutcome, Stage},
    effects::EffectKind,
    synth::{NoteIdentity, VoiceStage},
    EngineConfig, Renderer, SynthEngine,
};

const SR: f32 = 48_000.0;

fn engine() -> (SynthEngine, Renderer) {
    SynthEngine::new(EngineConfig::default()).expect("default config is valid")
}

fn render(renderer: &mut Renderer, frames: usize) -> Vec<f32> {
    let mut left = vec![0.0; frames];
    let mut right = vec![0.0; frames];
    renderer.render(&mut left, &mut right);
    left
}

fn samples(seconds: f32) -> usize {
    (seconds * SR).round() as usize
}

fn id(note: i32, octave_shift: i32) -> NoteIdentity {
    NoteIdentity::new(note, octave_shift).expect("valid identity")
}

#[test]
fn full_velocity_note_reaches_sustain_after_attack_and_decay() {
    let (mut engine, mut renderer) = engine();
    let envelope = engine.synth_config().envelope;
    engine.note_on(60, 127, 0).expect("valid note");

    render(&mut renderer, 1);
    assert_eq!(renderer.pool().len(), 1);
    let voice = renderer.pool().voice(id(60, 0)).expect("voice exists");
    assert_eq!(voice.peak_gain(), engine.synth_config().voice_gain);

    render(&mut renderer, samples(envelope.attack + envelope.decay) - 1);
    let voice = renderer.pool().voice(id(60, 0)).expect("voice exists");
    assert_eq!(voice.stage(), VoiceStage::Sustaining);
    assert_eq!(voice.level(), envelope.sustain);
    assert_eq!(renderer.pool().len(), 1);
}

#[test]
fn duplicate_lowpass_is_rejected() {
    let (mut engine, mut renderer) = engine();
    assert_eq!(engine.add_module(EffectKind::Lowpass), Ok(EditOutcome::Applied));
    assert_eq!(engine.add_module(EffectKind::Lowpass), Ok(EditOutcome::Unchanged));
    render(&mut renderer, 64);

    let lowpasses = renderer
        .chain()
        .stages()
        .filter(|s| *s == Stage::Effect(EffectKind::Lowpass))
        .count();
    assert_eq!(lowpasses, 1);
}

#[test]
fn chain_never_loses_its_sink_across_edits() {
    let (mut engine, mut renderer) = engine();
    let edits: [fn(&mut SynthEngine); 3] = [
        |e| {
            e.add_module(EffectKind::Delay).expect("room");
        },
        |e| {
            e.remove_module(EffectKind::Delay).expect("room");
        },
        |e| {
            e.add_module(EffectKind::Reverb).expect("room");
        },
    ];

    for edit in edits {
        edit(&mut engine);
        // Small blocks so every edit lands between renders
        render(&mut renderer, 16);
        let stages: Vec<Stage> = renderer.chain().stages().collect();
        assert_eq!(stages.first(), Some(&Stage::Source));
        assert_eq!(stages.last(), Some(&Stage::Sink));
    }

    assert_eq!(
        renderer.chain().stages().collect::<Vec<_>>(),
        vec![Stage::Source, Stage::Effect(EffectKind::Reverb), Stage::Sink]
    );
    assert_eq!(engine.collect_garbage(), 1, "detached delay comes back for disposal");
}

#[test]
fn retrigger_while_held_keeps_one_oscillator() {
    let (mut engine, mut renderer) = engine();
    engine.note_on(60, 100, 0).expect("valid note");
    render(&mut renderer, 256);
    engine.note_on(60, 100, 0).expect("valid note");
    render(&mut renderer, 256);

    let c4 = id(60, 0);
    let sounding = renderer
        .pool()
        .voices()
        .filter(|v| v.identity() == c4 && v.stage() != VoiceStage::Finished)
        .count();
    assert_eq!(sounding, 1);
    assert_eq!(renderer.pool().len(), 1);
}

#[test]
fn released_voice_lives_for_release_then_leaves_within_the_guard() {
    let (mut engine, mut renderer) = engine();
    let release = samples(engine.synth_config().envelope.release);
    let guard = samples(engine.config().release_guard_ms / 1000.0);
    let block = 32;

    engine.note_on(67, 100, 0).expect("valid note");
    engine.note_off(67, 0).expect("valid note");

    let mut rendered = 0;
    while rendered < release {
        render(&mut renderer, block);
        rendered += block;
        if rendered < release {
            assert_eq!(renderer.pool().len(), 1, "evicted early at {rendered}");
        }
    }
    while !renderer.pool().is_empty() {
        render(&mut renderer, block);
        rendered += block;
        assert!(rendered <= release + guard + block, "lingered until {rendered}");
    }
    assert!(rendered >= release);
}

#[test]
fn voice_stops_sounding_at_release_end_inside_a_large_block() {
    let (mut engine, mut renderer) = engine();
    let release = samples(engine.synth_config().envelope.release);
    engine.note_on(62, 100, 0).expect("valid note");
    render(&mut renderer, 4_800);
    engine.note_off(62, 0).expect("valid note");

    render(&mut renderer, release - 1);
    assert_eq!(renderer.pool().sounding(), 1);
    render(&mut renderer, 1);
    assert_eq!(renderer.pool().sounding(), 0, "finished exactly at release end");
    assert_eq!(renderer.pool().len(), 1, "slot held through the guard");

    render(&mut renderer, saavy_modular::MAX_BLOCK_SIZE);
    assert!(renderer.pool().is_empty());
}

#[test]
fn second_note_off_changes_nothing() {
    let (mut once, mut once_out) = engine();
    let (mut twice, mut twice_out) = engine();
    for engine in [&mut once, &mut twice] {
        engine.note_on(64, 90, 0).expect("valid note");
    }
    render(&mut once_out, 1_000);
    render(&mut twice_out, 1_000);

    once.note_off(64, 0).expect("valid note");
    twice.note_off(64, 0).expect("valid note");
    twice.note_off(64, 0).expect("valid note");

    assert_eq!(render(&mut once_out, 2_000), render(&mut twice_out, 2_000));
    let tail = |r: &Renderer| r.pool().voice(id(64, 0)).map(|v| v.tail_elapsed());
    assert_eq!(tail(&once_out), tail(&twice_out));
}

#[test]
fn same_note_in_two_octaves_sounds_twice() {
    let (mut engine, mut renderer) = engine();
    engine.note_on(60, 100, 0).expect("valid note");
    engine.note_on(60, 100, 1).expect("valid note");
    render(&mut renderer, 128);
    assert_eq!(renderer.pool().sounding(), 2);

    engine.note_off(60, 1).expect("valid note");
    render(&mut renderer, 128);
    let low = renderer.pool().voice(id(60, 0)).expect("low voice");
    let high = renderer.pool().voice(id(60, 1)).expect("high voice");
    assert_ne!(low.stage(), VoiceStage::Releasing);
    assert_eq!(high.stage(), VoiceStage::Releasing);
}

#[test]
fn polyphony_is_capped_by_stealing() {
    let config = EngineConfig {
        max_voices: 4,
        ..EngineConfig::default()
    };
    let (mut engine, mut renderer) = SynthEngine::new(config).expect("valid config");
    for note in 60..68 {
        engine.note_on(note, 100, 0).expect("valid note");
    }
    render(&mut renderer, 64);
    assert_eq!(renderer.pool().len(), 4);
    // Oldest notes were stolen
    assert!(renderer.pool().voice(id(60, 0)).is_none());
    assert!(renderer.pool().voice(id(67, 0)).is_some());
}
