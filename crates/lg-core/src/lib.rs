//! lg-core: Shared types for LoudGraph
//!
//! Foundational types used across the LoudGraph crates: the sample type,
//! the loudness data model, and the shared error type.

mod error;
mod point;

pub use error::*;
pub use point::*;

/// Type alias for audio samples (always f64 for maximum precision)
pub type Sample = f64;

/// Sentinel LUFS value meaning "no measurable loudness".
///
/// Published for silence and before any 100 ms block has completed.
/// Display layers conventionally render it as "-inf LUFS".
pub const LUFS_SILENCE: f32 = -100.0;

/// Decibel value wrapper
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Decibels(pub f64);

impl Decibels {
    pub const ZERO: Self = Self(0.0);
    pub const NEG_INF: Self = Self(f64::NEG_INFINITY);

    #[inline]
    pub fn from_gain(gain: f64) -> Self {
        if gain <= 0.0 {
            Self::NEG_INF
        } else {
            Self(20.0 * gain.log10())
        }
    }

    #[inline]
    pub fn to_gain(self) -> f64 {
        if self.0 <= -144.0 {
            0.0
        } else {
            10.0_f64.powf(self.0 / 20.0)
        }
    }
}

impl Default for Decibels {
    fn default() -> Self {
        Self::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decibels_roundtrip() {
        let db = Decibels(-6.0);
        let gain = db.to_gain();
        let back = Decibels::from_gain(gain);
        assert!((back.0 - db.0).abs() < 1e-12);
    }

    #[test]
    fn test_decibels_silence() {
        assert_eq!(Decibels::from_gain(0.0).to_gain(), 0.0);
    }
}
