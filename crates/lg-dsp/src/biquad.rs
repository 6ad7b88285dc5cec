//! Biquad filter implementation using Transposed Direct Form II
//!
//! TDF-II is numerically optimal for floating-point arithmetic,
//! minimizing quantization noise and ensuring stability.
//!
//! Includes the analytic K-weighting coefficient derivations from
//! ITU-R BS.1770-4: a high-frequency shelf modeling head diffraction and
//! the RLB (Revised Low-frequency B-curve) high-pass.

use lg_core::Sample;
use std::f64::consts::PI;

use crate::{MonoProcessor, Processor, ProcessorConfig};

/// Shelf stage gain, 10^(4/20) (~+4 dB boost above the shelf corner)
pub const SHELF_GAIN: f64 = 1.584_862_509_787_59;

/// Shelf stage center frequency in Hz (ITU-R BS.1770-4 analog prototype)
pub const SHELF_CENTER_HZ: f64 = 1681.974_450_955_533;

/// Shelf stage Q-related term
pub const SHELF_Q: f64 = 0.707_175_236_955_419_6;

/// RLB high-pass corner frequency in Hz
pub const RLB_CORNER_HZ: f64 = 38.135_470_876_024_44;

/// RLB high-pass Q factor
pub const RLB_Q: f64 = 0.500_327_037_323_877_3;

/// Biquad coefficients
///
/// Immutable once derived for a sample rate; shared read-only across all
/// channels of one filter stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct BiquadCoeffs {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl BiquadCoeffs {
    /// K-weighting pre-filter: high shelf with ~+4 dB boost above ~1.5 kHz.
    ///
    /// Bilinear transform of the fixed analog prototype from
    /// ITU-R BS.1770-4. The constants are conformance-critical; any
    /// deviation changes measured LUFS against reference meters.
    pub fn k_weight_shelf(sample_rate: f64) -> Self {
        let vh = SHELF_GAIN;
        let vb = vh.sqrt();
        let k = (PI * SHELF_CENTER_HZ / sample_rate).tan();
        let k2 = k * k;
        let d = 1.0 + k / SHELF_Q + k2;

        Self {
            b0: (vh + vb * k / SHELF_Q + k2) / d,
            b1: 2.0 * (k2 - vh) / d,
            b2: (vh - vb * k / SHELF_Q + k2) / d,
            a1: 2.0 * (k2 - 1.0) / d,
            a2: (1.0 - k / SHELF_Q + k2) / d,
        }
    }

    /// K-weighting RLB stage: second-order Butterworth-style high-pass at
    /// ~38.14 Hz removing rumble and DC.
    pub fn k_weight_highpass(sample_rate: f64) -> Self {
        let k = (PI * RLB_CORNER_HZ / sample_rate).tan();
        let k2 = k * k;
        let d = 1.0 + k / RLB_Q + k2;

        Self {
            b0: 1.0 / d,
            b1: -2.0 / d,
            b2: 1.0 / d,
            a1: 2.0 * (k2 - 1.0) / d,
            a2: (1.0 - k / RLB_Q + k2) / d,
        }
    }

    /// Bypass (unity gain, no filtering)
    pub fn bypass() -> Self {
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
        }
    }
}

/// Transposed Direct Form II biquad filter
#[derive(Debug, Clone)]
pub struct BiquadTDF2 {
    coeffs: BiquadCoeffs,
    z1: f64,
    z2: f64,
    sample_rate: f64,
}

impl BiquadTDF2 {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            coeffs: BiquadCoeffs::bypass(),
            z1: 0.0,
            z2: 0.0,
            sample_rate,
        }
    }

    pub fn with_coeffs(coeffs: BiquadCoeffs, sample_rate: f64) -> Self {
        Self {
            coeffs,
            z1: 0.0,
            z2: 0.0,
            sample_rate,
        }
    }

    #[inline]
    pub fn set_coeffs(&mut self, coeffs: BiquadCoeffs) {
        self.coeffs = coeffs;
    }

    #[inline]
    pub fn coeffs(&self) -> &BiquadCoeffs {
        &self.coeffs
    }

    /// Set as K-weighting shelf stage
    pub fn set_k_weight_shelf(&mut self) {
        self.coeffs = BiquadCoeffs::k_weight_shelf(self.sample_rate);
    }

    /// Set as K-weighting RLB high-pass stage
    pub fn set_k_weight_highpass(&mut self) {
        self.coeffs = BiquadCoeffs::k_weight_highpass(self.sample_rate);
    }
}

impl Processor for BiquadTDF2 {
    fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }
}

impl MonoProcessor for BiquadTDF2 {
    #[inline(always)]
    fn process_sample(&mut self, input: Sample) -> Sample {
        let output = self.coeffs.b0 * input + self.z1;
        self.z1 = self.coeffs.b1 * input - self.coeffs.a1 * output + self.z2;
        self.z2 = self.coeffs.b2 * input - self.coeffs.a2 * output;
        output
    }
}

impl ProcessorConfig for BiquadTDF2 {
    fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_bypass() {
        let mut filter = BiquadTDF2::new(48000.0);

        let input = 0.5;
        let output = filter.process_sample(input);
        assert_abs_diff_eq!(output, input, epsilon = 1e-10);
    }

    #[test]
    fn test_rlb_blocks_dc() {
        let mut filter = BiquadTDF2::new(48000.0);
        filter.set_k_weight_highpass();

        // DC settles to zero through the high-pass
        let mut output = 0.0;
        for _ in 0..100_000 {
            output = filter.process_sample(1.0);
        }
        assert_abs_diff_eq!(output, 0.0, epsilon = 1e-4);
    }

    #[test]
    fn test_shelf_passes_dc_at_unity() {
        let mut filter = BiquadTDF2::new(48000.0);
        filter.set_k_weight_shelf();

        let mut output = 0.0;
        for _ in 0..100_000 {
            output = filter.process_sample(1.0);
        }
        // Shelf boosts highs only; DC gain is unity
        assert_abs_diff_eq!(output, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_impulse_response_bounded_and_decaying() {
        // Cascaded shelf + RLB must stay bounded for every supported rate
        for rate in [8000.0, 16000.0, 44100.0, 48000.0, 96000.0, 192000.0] {
            let mut shelf = BiquadTDF2::with_coeffs(BiquadCoeffs::k_weight_shelf(rate), rate);
            let mut hp = BiquadTDF2::with_coeffs(BiquadCoeffs::k_weight_highpass(rate), rate);

            let mut tail_energy = 0.0;
            for n in 0..10_000 {
                let input = if n == 0 { 1.0 } else { 0.0 };
                let out = hp.process_sample(shelf.process_sample(input));
                assert!(out.is_finite(), "diverged at {rate} Hz, sample {n}");
                assert!(out.abs() < 4.0, "unbounded at {rate} Hz, sample {n}");
                if n >= 9_000 {
                    tail_energy += out * out;
                }
            }
            assert!(tail_energy < 1e-6, "not decaying at {rate} Hz");
        }
    }

    #[test]
    fn test_reset_clears_state() {
        let mut filter = BiquadTDF2::new(48000.0);
        filter.set_k_weight_highpass();

        for _ in 0..100 {
            filter.process_sample(1.0);
        }
        filter.reset();

        assert_eq!(filter.z1, 0.0);
        assert_eq!(filter.z2, 0.0);
    }

    #[test]
    fn test_coeffs_deterministic() {
        let a = BiquadCoeffs::k_weight_shelf(48000.0);
        let b = BiquadCoeffs::k_weight_shelf(48000.0);
        assert_eq!(a.b0, b.b0);
        assert_eq!(a.a2, b.a2);
    }
}
