#![allow(missing_docs, clippy::unwrap_used)]

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use vx_audio::fft::Spectrogram;
use vx_audio::features::FeatureExtractor;
use vx_audio::signal::CanonicalSignal;
use vx_core::config::FeatureConfig;

fn voice_like(secs: usize) -> Vec<f32> {
    (0..16_000 * secs)
        .map(|i| {
            let phase = 2.0 * std::f32::consts::PI * 160.0 * i as f32 / 16_000.0;
            0.3 * (phase.sin() + 0.4 * (2.0 * phase).sin() + 0.2 * (3.0 * phase).sin())
        })
        .collect()
}

fn bench_spectrogram(c: &mut Criterion) {
    let samples = voice_like(3);
    c.bench_function("spectrogram_3s", |b| {
        b.iter(|| Spectrogram::compute(black_box(&samples), 16_000, 2048, 512));
    });
}

fn bench_extract(c: &mut Criterion) {
    let extractor = FeatureExtractor::new(&FeatureConfig::default(), 16_000);
    let mut group = c.benchmark_group("extract");
    for secs in [1usize, 3, 10] {
        let signal = CanonicalSignal::new(voice_like(secs), 16_000);
        group.throughput(Throughput::Elements((16_000 * secs) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(secs), &signal, |b, signal| {
            b.iter(|| extractor.extract(black_box(signal)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_spectrogram, bench_extract);
criterion_main!(benches);
