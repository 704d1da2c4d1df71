//! Benchmarks for the voice pool at different polyphony levels.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_modular::{
    dsp::oscillator::OscillatorWaveform,
    synth::{NoteIdentity, SynthConfig, SynthKind, VoicePolicy, VoicePool},
};

use crate::{BLOCK_SIZES, SAMPLE_RATE};

fn held_pool(kind: SynthKind, voices: usize) -> VoicePool {
    let config = SynthConfig {
        kind,
        waveform: OscillatorWaveform::Sawtooth,
        ..SynthConfig::default()
    };
    let mut pool = VoicePool::new(SAMPLE_RATE, 16, VoicePolicy::PerNote, config, 0.01);
    for i in 0..voices {
        let identity = NoteIdentity::new(48 + i as i32, 0).expect("valid note");
        pool.note_on(identity, 100);
    }
    pool
}

pub fn bench_voices(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/voices");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        for kind in [SynthKind::Classic, SynthKind::Am, SynthKind::Fm] {
            for voices in [1, 8, 16] {
                let mut pool = held_pool(kind, voices);
                group.bench_with_input(
                    BenchmarkId::new(format!("{kind}_{voices}"), size),
                    &size,
                    |b, _| b.iter(|| pool.render(black_box(&mut buffer))),
                );
            }
        }

        // Churn: a note-on and the previous note's note-off every block
        let mut pool = held_pool(SynthKind::Classic, 0);
        let mut note = 0;
        group.bench_with_input(BenchmarkId::new("churn", size), &size, |b, _| {
            b.iter(|| {
                let on = NoteIdentity::new(36 + note, 0).expect("valid note");
                let off = NoteIdentity::new(36 + (note + 47) % 48, 0).expect("valid note");
                pool.note_on(on, 100);
                pool.note_off(off);
                note = (note + 1) % 48;
                pool.render(black_box(&mut buffer));
            })
        });
    }

    group.finish();
}
