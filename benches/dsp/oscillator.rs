//! Benchmarks for oscillator waveform generation.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_modular::dsp::oscillator::{OscillatorBlock, OscillatorWaveform, MAX_PARTIALS};

use crate::{BLOCK_SIZES, SAMPLE_RATE};

pub fn bench_oscillator(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/oscillator");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        for (name, mut osc) in [
            ("sine", OscillatorBlock::sine()),
            ("sawtooth", OscillatorBlock::sawtooth()),
            ("square", OscillatorBlock::square()),
            ("triangle", OscillatorBlock::triangle()),
        ] {
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| osc.render(black_box(&mut buffer), black_box(440.0), SAMPLE_RATE))
            });
        }

        // Additive: every partial populated
        let partials = [0.5; MAX_PARTIALS];
        let mut osc = OscillatorBlock::new(OscillatorWaveform::Custom);
        group.bench_with_input(BenchmarkId::new("custom_8_partials", size), &size, |b, _| {
            b.iter(|| {
                for sample in buffer.iter_mut() {
                    *sample = osc.next_sample(black_box(440.0), SAMPLE_RATE, 0.0, &partials);
                }
            })
        });
    }

    group.finish();
}
