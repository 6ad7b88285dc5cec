//! K-weighting and loudness meter benchmarks

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use lg_dsp::MonoProcessor;
use lg_dsp::biquad::{BiquadCoeffs, BiquadTDF2};
use lg_dsp::meter::LoudnessMeter;

fn bench_kweight_cascade(c: &mut Criterion) {
    let mut shelf = BiquadTDF2::with_coeffs(BiquadCoeffs::k_weight_shelf(48000.0), 48000.0);
    let mut hp = BiquadTDF2::with_coeffs(BiquadCoeffs::k_weight_highpass(48000.0), 48000.0);

    let buffer: Vec<f64> = (0..1024).map(|i| (i as f64 * 0.01).sin()).collect();

    c.bench_function("kweight_cascade_1024", |b| {
        b.iter(|| {
            let mut acc = 0.0;
            for &sample in black_box(&buffer) {
                let out = hp.process_sample(shelf.process_sample(sample));
                acc += out * out;
            }
            black_box(acc)
        })
    });
}

fn bench_meter_stereo_block(c: &mut Criterion) {
    let mut meter = LoudnessMeter::new();
    meter.prepare(48000.0, 1024, 2);

    let left: Vec<f64> = (0..1024).map(|i| (i as f64 * 0.01).sin()).collect();
    let right = left.clone();

    c.bench_function("meter_stereo_1024", |b| {
        b.iter(|| {
            meter.process_planar(black_box(&[&left, &right]));
        })
    });
}

criterion_group!(benches, bench_kweight_cascade, bench_meter_stereo_block);
criterion_main!(benches);
