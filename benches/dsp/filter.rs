//! Benchmarks for the state-variable filter.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_modular::dsp::filter::{FilterType, SVFilter, SvfCoefficients};

use crate::{BLOCK_SIZES, SAMPLE_RATE};

pub fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/filter");
    let coeffs = SvfCoefficients::new(1_000.0, 0.5, SAMPLE_RATE);

    for &size in BLOCK_SIZES {
        let input: Vec<f32> = (0..size)
            .map(|i| (i as f32 / size as f32) * 2.0 - 1.0)
            .collect();

        for (name, filter_type) in [
            ("lowpass", FilterType::LowPass),
            ("highpass", FilterType::HighPass),
            ("bandpass", FilterType::BandPass),
            ("notch", FilterType::Notch),
        ] {
            let mut filter = SVFilter::new(filter_type);
            let mut buffer = input.clone();
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| {
                    buffer.copy_from_slice(&input);
                    filter.render(black_box(&mut buffer), black_box(&coeffs));
                })
            });
        }

        // Cutoff sweep: coefficients recomputed every sample
        let mut filter = SVFilter::new(FilterType::LowPass);
        let mut buffer = input.clone();
        group.bench_with_input(BenchmarkId::new("lowpass_sweep", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                for (i, sample) in buffer.iter_mut().enumerate() {
                    let cutoff = 500.0 + i as f32 * 4.0;
                    let c = SvfCoefficients::new(cutoff, 0.5, SAMPLE_RATE);
                    *sample = filter.next_sample(*sample, &c);
                }
                black_box(&buffer);
            })
        });
    }

    group.finish();
}
