//! Benchmarks for delay line operations.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_modular::dsp::delay::DelayLine;

use crate::{BLOCK_SIZES, SAMPLE_RATE};

pub fn bench_delay(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/delay");

    let delay_times: &[f32] = &[
        480.0,   // 10ms at 48kHz
        4_800.0, // 100ms
        48_000.0, // 1 second
    ];

    for &size in BLOCK_SIZES {
        let input: Vec<f32> = (0..size).map(|i| (i as f32 * 0.1).sin()).collect();

        for &delay_samples in delay_times {
            let delay_ms = delay_samples / 48.0;
            let mut delay = DelayLine::with_duration(2.0, SAMPLE_RATE);
            let mut buffer = input.clone();
            group.bench_with_input(
                BenchmarkId::new(format!("fixed_{}ms", delay_ms as u32), size),
                &size,
                |b, _| {
                    b.iter(|| {
                        for (out, &sample) in buffer.iter_mut().zip(&input) {
                            *out = delay.next_sample(sample, black_box(delay_samples));
                        }
                    })
                },
            );
        }

        // Modulated read, as chorus and vibrato do
        let mut delay = DelayLine::with_duration(0.1, SAMPLE_RATE);
        for &sample in &input {
            delay.write(sample);
        }
        group.bench_with_input(BenchmarkId::new("read_interpolated", size), &size, |b, _| {
            b.iter(|| {
                let mut sum = 0.0f32;
                for i in 0..size {
                    let delay_time = 480.0 + (i as f32 * 0.1).sin() * 48.0;
                    sum += delay.read_interpolated(black_box(delay_time));
                }
                sum
            })
        });
    }

    group.finish();
}
