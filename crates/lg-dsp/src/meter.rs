//! EBU R128 loudness meter
//!
//! Two-stage K-weighting (shelf then RLB high-pass) per channel, squared and
//! channel-weighted into 100 ms mean-square blocks. Momentary loudness
//! averages the last 4 blocks (400 ms), Short-term averages all 30 (3 s).
//! Both are ungated; gating applies to Integrated loudness, which this meter
//! does not measure.
//!
//! `process_*` runs on the audio thread: no allocation, no locks. Results
//! are published through relaxed atomic stores and read from any thread via
//! [`MeterOutputs`].

use std::sync::Arc;

use lg_core::{LUFS_SILENCE, Sample};
use portable_atomic::{AtomicF32, Ordering};

use crate::MonoProcessor;
use crate::biquad::{BiquadCoeffs, BiquadTDF2};

/// Fixed channel capacity; channel count is clamped at `prepare` time
pub const MAX_CHANNELS: usize = 8;

/// 100 ms blocks in the Momentary window (400 ms)
pub const BLOCKS_PER_MOMENTARY: usize = 4;

/// 100 ms blocks in the Short-term window (3 s)
pub const BLOCKS_PER_SHORT_TERM: usize = 30;

/// Surround channel weight (~+1.5 dB) per the BS.1770-4 channel table
const SURROUND_WEIGHT: f64 = 1.41;

/// Thread-shared loudness readouts (single writer, multiple readers)
#[derive(Debug)]
pub struct MeterOutputs {
    momentary: AtomicF32,
    short_term: AtomicF32,
}

impl MeterOutputs {
    fn new() -> Self {
        Self {
            momentary: AtomicF32::new(LUFS_SILENCE),
            short_term: AtomicF32::new(LUFS_SILENCE),
        }
    }

    /// Momentary loudness (400 ms) in LUFS
    #[inline]
    pub fn momentary_lufs(&self) -> f32 {
        self.momentary.load(Ordering::Relaxed)
    }

    /// Short-term loudness (3 s) in LUFS
    #[inline]
    pub fn short_term_lufs(&self) -> f32 {
        self.short_term.load(Ordering::Relaxed)
    }

    #[inline]
    fn publish(&self, momentary: f32, short_term: f32) {
        // Staleness by one block is acceptable; only atomicity is required
        self.momentary.store(momentary, Ordering::Relaxed);
        self.short_term.store(short_term, Ordering::Relaxed);
    }
}

/// EBU R128 Momentary / Short-term loudness meter
#[derive(Debug)]
pub struct LoudnessMeter {
    sample_rate: f64,
    num_channels: usize,

    /// Per-channel cascade: shelf stage then RLB high-pass stage
    shelf: [BiquadTDF2; MAX_CHANNELS],
    highpass: [BiquadTDF2; MAX_CHANNELS],

    /// Channel weights per ITU-R BS.1770-4
    channel_weights: [f64; MAX_CHANNELS],

    /// Ring of completed 100 ms mean-square blocks (3 s of history)
    mean_square_blocks: [f64; BLOCKS_PER_SHORT_TERM],
    current_block_index: usize,

    /// Accumulator for the in-progress 100 ms block
    current_block_sum: f64,
    current_block_samples: usize,
    samples_per_block: usize,

    outputs: Arc<MeterOutputs>,
}

impl Default for LoudnessMeter {
    fn default() -> Self {
        Self::new()
    }
}

impl LoudnessMeter {
    pub fn new() -> Self {
        Self {
            sample_rate: 48000.0,
            num_channels: 2,
            shelf: std::array::from_fn(|_| BiquadTDF2::new(48000.0)),
            highpass: std::array::from_fn(|_| BiquadTDF2::new(48000.0)),
            channel_weights: [1.0; MAX_CHANNELS],
            mean_square_blocks: [0.0; BLOCKS_PER_SHORT_TERM],
            current_block_index: 0,
            current_block_sum: 0.0,
            current_block_samples: 0,
            samples_per_block: 4800,
            outputs: Arc::new(MeterOutputs::new()),
        }
    }

    /// Derive filter coefficients and channel weights for the session.
    ///
    /// Must be called before `process_*`; re-callable on sample rate or
    /// layout changes. `_max_block_size` is a host hint and unused (the
    /// meter is block-size agnostic).
    pub fn prepare(&mut self, sample_rate: f64, _max_block_size: usize, channels: usize) {
        self.sample_rate = sample_rate;
        self.num_channels = channels.min(MAX_CHANNELS);

        let shelf_coeffs = BiquadCoeffs::k_weight_shelf(sample_rate);
        let hp_coeffs = BiquadCoeffs::k_weight_highpass(sample_rate);
        for ch in 0..MAX_CHANNELS {
            self.shelf[ch] = BiquadTDF2::with_coeffs(shelf_coeffs, sample_rate);
            self.highpass[ch] = BiquadTDF2::with_coeffs(hp_coeffs, sample_rate);
        }

        self.samples_per_block = (sample_rate * 0.1).round().max(1.0) as usize;

        // L, R, C = 1.0; LFE = 0.0; Ls, Rs = 1.41. Layouts beyond 5.1 keep
        // unity weights (extension point, unspecified by the source table).
        self.channel_weights = [1.0; MAX_CHANNELS];
        if self.num_channels >= 4 {
            self.channel_weights[3] = 0.0; // LFE
        }
        if self.num_channels >= 5 {
            self.channel_weights[4] = SURROUND_WEIGHT; // Ls
        }
        if self.num_channels >= 6 {
            self.channel_weights[5] = SURROUND_WEIGHT; // Rs
        }

        self.reset();

        log::info!(
            "loudness meter prepared: {} Hz, {} channels, {} samples/block",
            sample_rate,
            self.num_channels,
            self.samples_per_block
        );
    }

    /// Clear all filter state and history; publish silence sentinels.
    pub fn reset(&mut self) {
        use crate::Processor;

        for filter in self.shelf.iter_mut().chain(self.highpass.iter_mut()) {
            filter.reset();
        }
        self.mean_square_blocks = [0.0; BLOCKS_PER_SHORT_TERM];
        self.current_block_index = 0;
        self.current_block_sum = 0.0;
        self.current_block_samples = 0;

        self.outputs.publish(LUFS_SILENCE, LUFS_SILENCE);
    }

    /// Shared handle to the atomic readouts, for the feed/UI threads.
    pub fn outputs(&self) -> Arc<MeterOutputs> {
        Arc::clone(&self.outputs)
    }

    /// Momentary loudness (400 ms) in LUFS
    pub fn momentary_lufs(&self) -> f32 {
        self.outputs.momentary_lufs()
    }

    /// Short-term loudness (3 s) in LUFS
    pub fn short_term_lufs(&self) -> f32 {
        self.outputs.short_term_lufs()
    }

    /// Process one planar buffer (one slice per channel).
    ///
    /// Channels beyond the prepared count are ignored; frame count follows
    /// the shortest provided channel.
    pub fn process_planar(&mut self, channels: &[&[Sample]]) {
        let active = channels.len().min(self.num_channels);
        if active == 0 {
            return;
        }
        let frames = channels[..active]
            .iter()
            .map(|ch| ch.len())
            .min()
            .unwrap_or(0);

        for frame in 0..frames {
            let mut frame_sum = 0.0;
            for ch in 0..active {
                frame_sum += self.weighted_square(ch, channels[ch][frame]);
            }
            self.accumulate(frame_sum);
        }
    }

    /// Process an interleaved buffer with the given channel count.
    pub fn process_interleaved(&mut self, samples: &[Sample], num_channels: usize) {
        if num_channels == 0 {
            return;
        }
        let active = num_channels.min(self.num_channels);

        for frame in samples.chunks_exact(num_channels) {
            let mut frame_sum = 0.0;
            for (ch, &sample) in frame.iter().take(active).enumerate() {
                frame_sum += self.weighted_square(ch, sample);
            }
            self.accumulate(frame_sum);
        }
    }

    /// K-weight one sample and return its channel-weighted square
    #[inline]
    fn weighted_square(&mut self, ch: usize, input: Sample) -> f64 {
        let shelved = self.shelf[ch].process_sample(input);
        let weighted = self.highpass[ch].process_sample(shelved);
        self.channel_weights[ch] * weighted * weighted
    }

    #[inline]
    fn accumulate(&mut self, frame_sum: f64) {
        self.current_block_sum += frame_sum;
        self.current_block_samples += 1;

        if self.current_block_samples >= self.samples_per_block {
            self.finalize_block();
        }
    }

    /// Complete the current 100 ms block and republish both loudness values
    fn finalize_block(&mut self) {
        let mean_square = self.current_block_sum / self.current_block_samples as f64;
        self.mean_square_blocks[self.current_block_index] = mean_square;
        self.current_block_index = (self.current_block_index + 1) % BLOCKS_PER_SHORT_TERM;

        self.current_block_sum = 0.0;
        self.current_block_samples = 0;

        // Momentary: most recent 4 blocks
        let mut momentary_sum = 0.0;
        for i in 0..BLOCKS_PER_MOMENTARY {
            let idx = (self.current_block_index + BLOCKS_PER_SHORT_TERM - 1 - i)
                % BLOCKS_PER_SHORT_TERM;
            momentary_sum += self.mean_square_blocks[idx];
        }

        // Short-term: all 30 blocks
        let short_term_sum: f64 = self.mean_square_blocks.iter().sum();

        self.outputs.publish(
            loudness(momentary_sum / BLOCKS_PER_MOMENTARY as f64),
            loudness(short_term_sum / BLOCKS_PER_SHORT_TERM as f64),
        );
    }
}

/// Mean square to LUFS: `-0.691 + 10 * log10(x)`, silence sentinel for
/// non-positive input. The -0.691 offset cancels the K-filter gain at
/// 997 Hz per BS.1770.
#[inline]
pub fn loudness(mean_square: f64) -> f32 {
    if mean_square <= 0.0 {
        LUFS_SILENCE
    } else {
        (-0.691 + 10.0 * mean_square.log10()) as f32
    }
}
