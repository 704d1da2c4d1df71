//! Benchmarks for waveshaping transfer functions.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_modular::dsp::distortion;

use crate::BLOCK_SIZES;

pub fn bench_distortion(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/distortion");

    for &size in BLOCK_SIZES {
        let input: Vec<f32> = (0..size).map(|i| (i as f32 * 0.1).sin()).collect();

        let mut buffer = input.clone();
        group.bench_with_input(BenchmarkId::new("soft_clip", size), &size, |b, _| {
            b.iter(|| {
                for (out, &x) in buffer.iter_mut().zip(&input) {
                    *out = distortion::soft_clip(x, black_box(4.0));
                }
            })
        });

        let mut buffer = input.clone();
        group.bench_with_input(BenchmarkId::new("shape_curve", size), &size, |b, _| {
            b.iter(|| {
                for (out, &x) in buffer.iter_mut().zip(&input) {
                    *out = distortion::shape_curve(x, black_box(0.8));
                }
            })
        });

        let mut buffer = input.clone();
        group.bench_with_input(BenchmarkId::new("quantize", size), &size, |b, _| {
            b.iter(|| {
                for (out, &x) in buffer.iter_mut().zip(&input) {
                    *out = distortion::quantize(x, black_box(4.0));
                }
            })
        });
    }

    group.finish();
}
