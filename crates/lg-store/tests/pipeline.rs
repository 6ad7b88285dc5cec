//! End-to-end pipeline: audio blocks through the meter, atomic readouts
//! sampled at 10 Hz into the history store, range queries on top.
//!
//! The timer loop is simulated deterministically: one store point per
//! 100 ms of processed audio, exactly what the feed thread does on a tick.

use std::f64::consts::PI;

use lg_dsp::meter::LoudnessMeter;
use lg_store::LoudnessHistory;

fn sine(freq: f64, amplitude: f64, sample_rate: f64, frames: usize) -> Vec<f64> {
    (0..frames)
        .map(|i| amplitude * (2.0 * PI * freq * i as f64 / sample_rate).sin())
        .collect()
}

#[test]
fn test_meter_to_store_pipeline() {
    const SAMPLE_RATE: f64 = 48000.0;
    const BLOCK: usize = 4800; // 100 ms

    let mut meter = LoudnessMeter::new();
    meter.prepare(SAMPLE_RATE, BLOCK, 2);
    let outputs = meter.outputs();

    let store = LoudnessHistory::default();
    store.prepare(10.0);

    // 2 s silence, then 5 s of a 997 Hz tone at half scale
    let silence = vec![0.0; BLOCK];
    for _ in 0..20 {
        meter.process_planar(&[&silence, &silence]);
        store.add_point(outputs.momentary_lufs(), outputs.short_term_lufs());
    }
    let tone = sine(997.0, 0.5, SAMPLE_RATE, BLOCK * 50);
    for chunk in tone.chunks(BLOCK) {
        meter.process_planar(&[chunk, chunk]);
        store.add_point(outputs.momentary_lufs(), outputs.short_term_lufs());
    }

    assert_eq!(store.point_count(), 70);
    assert!((store.current_time() - 6.9).abs() < 1e-9);

    // The silent prefix is all sentinel
    let quiet = store.points_in_range(0.0, 2.0);
    assert_eq!(quiet.len(), 20);
    assert!(quiet.iter().all(|p| p.momentary == -100.0));

    // The tone tail converged; the latest readout is loud and finite
    let latest = store.latest_point();
    assert!(latest.momentary > -100.0);
    assert!(latest.momentary < 0.0);

    // A whole-session query spans the silence-to-tone envelope
    let data = store.data_for_range(0.0, 7.0, 8);
    assert!(!data.is_empty());
    let min = data
        .buckets
        .iter()
        .map(|b| b.momentary_min)
        .fold(f32::MAX, f32::min);
    let max = data
        .buckets
        .iter()
        .map(|b| b.momentary_max)
        .fold(f32::MIN, f32::max);
    assert_eq!(min, -100.0);
    assert!(max > -10.0); // ~-6.0 LUFS for a half-scale stereo sine
}

#[test]
fn test_pipeline_reset_consistency() {
    let mut meter = LoudnessMeter::new();
    meter.prepare(48000.0, 4800, 2);
    let outputs = meter.outputs();

    let store = LoudnessHistory::default();
    store.prepare(10.0);

    let tone = sine(1000.0, 0.5, 48000.0, 48000);
    for chunk in tone.chunks(4800) {
        meter.process_planar(&[chunk, chunk]);
        store.add_point(outputs.momentary_lufs(), outputs.short_term_lufs());
    }
    assert!(store.point_count() > 0);

    meter.reset();
    store.reset();

    assert_eq!(outputs.momentary_lufs(), -100.0);
    assert_eq!(store.point_count(), 0);
    assert!(store.data_for_range(0.0, 10.0, 10).is_empty());
}
