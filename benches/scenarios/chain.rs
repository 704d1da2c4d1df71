//! Full renders through effect chains.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_modular::{effects::EffectKind, EngineConfig, Renderer, SynthEngine};
use strum::IntoEnumIterator;

use crate::{BLOCK_SIZES, SAMPLE_RATE};

fn patched(chain: &[EffectKind]) -> (SynthEngine, Renderer) {
    let config = EngineConfig {
        sample_rate: SAMPLE_RATE,
        ..EngineConfig::default()
    };
    let (mut engine, renderer) = SynthEngine::new(config).expect("valid config");
    for &kind in chain {
        engine.add_module(kind).expect("queue has room");
    }
    for note in [48, 55, 60, 64, 67, 72] {
        engine.note_on(note, 100, 0).expect("valid note");
    }
    (engine, renderer)
}

pub fn bench_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/chain");
    let all: Vec<EffectKind> = EffectKind::iter().collect();

    let chains: [(&str, &[EffectKind]); 4] = [
        ("empty", &[]),
        ("filter_delay", &[EffectKind::Lowpass, EffectKind::FeedbackDelay]),
        (
            "classic_fx",
            &[
                EffectKind::Chorus,
                EffectKind::Lowpass,
                EffectKind::PingPongDelay,
                EffectKind::Reverb,
            ],
        ),
        ("every_kind", &all),
    ];

    for &size in BLOCK_SIZES {
        let mut left = vec![0.0f32; size];
        let mut right = vec![0.0f32; size];

        for (name, chain) in chains {
            // Engine half stays alive so the queues stay connected
            let (_engine, mut renderer) = patched(chain);
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| renderer.render(black_box(&mut left), black_box(&mut right)))
            });
        }
    }

    group.finish();
}
