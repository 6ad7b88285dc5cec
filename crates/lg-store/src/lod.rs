//! Fixed-bucket level-of-detail aggregation
//!
//! One `LodLevel` holds an ordered sequence of finalized min/max buckets
//! plus a single in-progress bucket. Bucket boundaries are time-aligned
//! (`floor(t / duration) * duration`), so the same query always sees the
//! same buckets. A finalized bucket is never mutated again, which keeps the
//! reader's critical section down to a binary search and a copy.

use lg_core::{LoudnessPoint, MinMaxAggregate};

/// One LOD resolution: finalized buckets (oldest to newest) plus the
/// bucket currently being filled.
#[derive(Debug, Clone)]
pub struct LodLevel {
    bucket_duration: f64,
    finalized: Vec<MinMaxAggregate>,
    /// Bucket index and envelope of the in-progress bucket
    in_progress: Option<(i64, MinMaxAggregate)>,
}

impl LodLevel {
    pub fn new(bucket_duration: f64) -> Self {
        Self {
            bucket_duration,
            finalized: Vec::new(),
            in_progress: None,
        }
    }

    #[inline]
    pub fn bucket_duration(&self) -> f64 {
        self.bucket_duration
    }

    pub fn finalized(&self) -> &[MinMaxAggregate] {
        &self.finalized
    }

    pub fn in_progress(&self) -> Option<&MinMaxAggregate> {
        self.in_progress.as_ref().map(|(_, agg)| agg)
    }

    /// Fold a point into the level. Points arrive with monotonically
    /// increasing timestamps; crossing a bucket boundary finalizes the
    /// previous bucket.
    pub fn add_point(&mut self, point: &LoudnessPoint) {
        let index = (point.timestamp / self.bucket_duration).floor() as i64;

        match &mut self.in_progress {
            Some((current, agg)) if *current == index => agg.fold(point),
            Some((current, agg)) => {
                self.finalized.push(*agg);
                *current = index;
                *agg = MinMaxAggregate::from_point(point, index as f64 * self.bucket_duration);
            }
            None => {
                self.in_progress = Some((
                    index,
                    MinMaxAggregate::from_point(point, index as f64 * self.bucket_duration),
                ));
            }
        }
    }

    /// Append all buckets overlapping [start, end) to `out`, oldest first.
    pub fn buckets_in_range(&self, start: f64, end: f64, out: &mut Vec<MinMaxAggregate>) {
        let first = self
            .finalized
            .partition_point(|b| b.start_time + self.bucket_duration <= start);

        out.extend(
            self.finalized[first..]
                .iter()
                .take_while(|b| b.start_time < end),
        );

        if let Some((_, agg)) = &self.in_progress {
            if agg.start_time < end && agg.start_time + self.bucket_duration > start {
                out.push(*agg);
            }
        }
    }

    pub fn reset(&mut self) {
        self.finalized.clear();
        self.in_progress = None;
    }
}
