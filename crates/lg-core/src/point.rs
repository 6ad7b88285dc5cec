//! Loudness data model shared between the meter, the history store, and
//! display layers.

use crate::LUFS_SILENCE;

/// One loudness measurement, produced every 100 ms by the ingestion path.
///
/// Immutable after creation; `timestamp` is seconds since measurement start.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LoudnessPoint {
    /// Momentary loudness (400 ms window) in LUFS
    pub momentary: f32,
    /// Short-term loudness (3 s window) in LUFS
    pub short_term: f32,
    /// Seconds since measurement start
    pub timestamp: f64,
}

impl Default for LoudnessPoint {
    fn default() -> Self {
        Self {
            momentary: LUFS_SILENCE,
            short_term: LUFS_SILENCE,
            timestamp: 0.0,
        }
    }
}

/// Min/max envelope of all points falling into one time-aligned bucket.
///
/// Bucket boundaries are a pure function of absolute time
/// (`floor(t / bucket_duration) * bucket_duration`), never of arrival
/// order, so re-querying a range always yields the same buckets.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MinMaxAggregate {
    pub momentary_min: f32,
    pub momentary_max: f32,
    pub short_term_min: f32,
    pub short_term_max: f32,
    /// Bucket start time in seconds (duration is uniform per LOD level)
    pub start_time: f64,
}

impl MinMaxAggregate {
    /// Start a new bucket from its first point
    pub fn from_point(point: &LoudnessPoint, start_time: f64) -> Self {
        Self {
            momentary_min: point.momentary,
            momentary_max: point.momentary,
            short_term_min: point.short_term,
            short_term_max: point.short_term,
            start_time,
        }
    }

    /// Degenerate aggregate representing a single raw point (min == max)
    pub fn from_raw(point: &LoudnessPoint) -> Self {
        Self::from_point(point, point.timestamp)
    }

    /// Fold another point into this bucket's envelope
    #[inline]
    pub fn fold(&mut self, point: &LoudnessPoint) {
        self.momentary_min = self.momentary_min.min(point.momentary);
        self.momentary_max = self.momentary_max.max(point.momentary);
        self.short_term_min = self.short_term_min.min(point.short_term);
        self.short_term_max = self.short_term_max.max(point.short_term);
    }
}

/// Result of a range query against the history store.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RangeData {
    /// LOD level the buckets came from; -1 means raw full-resolution points
    pub lod_level: i32,
    /// Bucket duration in seconds (point spacing for the raw case)
    pub bucket_duration: f64,
    /// Ordered oldest-to-newest aggregates overlapping the queried range
    pub buckets: Vec<MinMaxAggregate>,
}

impl RangeData {
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_point_is_silence() {
        let p = LoudnessPoint::default();
        assert_eq!(p.momentary, LUFS_SILENCE);
        assert_eq!(p.short_term, LUFS_SILENCE);
    }

    #[test]
    fn test_fold_expands_envelope() {
        let mut agg = MinMaxAggregate::from_point(
            &LoudnessPoint {
                momentary: -20.0,
                short_term: -21.0,
                timestamp: 0.0,
            },
            0.0,
        );
        agg.fold(&LoudnessPoint {
            momentary: -18.0,
            short_term: -25.0,
            timestamp: 0.1,
        });

        assert_eq!(agg.momentary_min, -20.0);
        assert_eq!(agg.momentary_max, -18.0);
        assert_eq!(agg.short_term_min, -25.0);
        assert_eq!(agg.short_term_max, -21.0);
    }
}
