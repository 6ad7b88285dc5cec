//! Loudness history store
//!
//! Single-writer (feed thread) / single-query-reader (UI thread) store with
//! a two-tier concurrency split: the instantaneous values (latest point,
//! current time) are lock-free atomics, while the bucket sequences and the
//! recent full-resolution ring sit behind a short-held mutex.
//!
//! Memory policy: recent full-resolution points live in a bounded ring
//! (oldest evicted first); every LOD level is folded synchronously on
//! ingestion, so coarse aggregates survive eviction of the raw data they
//! were built from. Full resolution older than the ring is irrecoverable.

use std::collections::VecDeque;

use lg_core::{LUFS_SILENCE, LoudnessPoint, MinMaxAggregate, RangeData};
use parking_lot::Mutex;
use portable_atomic::{AtomicF32, AtomicF64, AtomicI32, AtomicU64, Ordering};

use crate::lod::LodLevel;

/// No level chosen yet (raw queries do not participate in hysteresis)
const NO_LEVEL: i32 = -1;

/// Store configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct StoreConfig {
    /// Nominal ingestion cadence in points per second
    pub update_rate_hz: f64,
    /// Capacity of the full-resolution recent ring (points)
    pub ring_capacity: usize,
    /// Number of LOD levels
    pub lod_levels: usize,
    /// Bucket duration ratio between consecutive levels
    pub lod_reduction: usize,
    /// Points per bucket at the finest level
    pub lod_base_points: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            update_rate_hz: 10.0,
            // ~6.8 minutes of full resolution at 10 Hz
            ring_capacity: 4096,
            // 0.4 s .. ~6554 s buckets with the defaults below
            lod_levels: 8,
            lod_reduction: 4,
            lod_base_points: 4,
        }
    }
}

#[derive(Debug)]
struct Inner {
    config: StoreConfig,
    ring: VecDeque<LoudnessPoint>,
    levels: Vec<LodLevel>,
    point_count: u64,
}

impl Inner {
    fn new(config: StoreConfig) -> Self {
        let base_duration = config.lod_base_points.max(1) as f64 / config.update_rate_hz;
        let levels = (0..config.lod_levels.max(1))
            .map(|k| LodLevel::new(base_duration * (config.lod_reduction.max(2) as f64).powi(k as i32)))
            .collect();

        Self {
            ring: VecDeque::with_capacity(config.ring_capacity),
            levels,
            point_count: 0,
            config,
        }
    }

    fn point_spacing(&self) -> f64 {
        1.0 / self.config.update_rate_hz
    }
}

/// Multi-resolution loudness history
#[derive(Debug)]
pub struct LoudnessHistory {
    inner: Mutex<Inner>,
    current_time: AtomicF64,
    total_points: AtomicU64,
    latest_momentary: AtomicF32,
    latest_short_term: AtomicF32,
    /// Last LOD level served, for the zoom hysteresis dead-band
    last_level: AtomicI32,
}

impl Default for LoudnessHistory {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl LoudnessHistory {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            inner: Mutex::new(Inner::new(config)),
            current_time: AtomicF64::new(0.0),
            total_points: AtomicU64::new(0),
            latest_momentary: AtomicF32::new(LUFS_SILENCE),
            latest_short_term: AtomicF32::new(LUFS_SILENCE),
            last_level: AtomicI32::new(NO_LEVEL),
        }
    }

    /// Fix the ingestion cadence and clear all buffered data.
    ///
    /// Must be called before ingestion when the cadence differs from the
    /// configured default; callers serialize this around lifecycle
    /// transitions (no concurrent `add_point`/query in flight).
    pub fn prepare(&self, update_rate_hz: f64) {
        let mut inner = self.inner.lock();
        let mut config = inner.config.clone();
        config.update_rate_hz = update_rate_hz;
        *inner = Inner::new(config);
        drop(inner);

        self.clear_readouts();
        log::info!("loudness history prepared at {update_rate_hz} Hz");
    }

    /// Clear all buffered data and reset the logical clock to zero.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.ring.clear();
        for level in &mut inner.levels {
            level.reset();
        }
        inner.point_count = 0;
        drop(inner);

        self.clear_readouts();
        log::info!("loudness history reset");
    }

    fn clear_readouts(&self) {
        self.current_time.store(0.0, Ordering::Release);
        self.total_points.store(0, Ordering::Relaxed);
        self.latest_momentary.store(LUFS_SILENCE, Ordering::Relaxed);
        self.latest_short_term.store(LUFS_SILENCE, Ordering::Relaxed);
        self.last_level.store(NO_LEVEL, Ordering::Relaxed);
    }

    /// Ingest one loudness point. O(1) amortized; the point receives the
    /// next sequential timestamp (`point_index / update_rate`).
    ///
    /// Single producer; runs on the feed thread, never the audio thread.
    pub fn add_point(&self, momentary: f32, short_term: f32) {
        let mut inner = self.inner.lock();

        let timestamp = inner.point_count as f64 / inner.config.update_rate_hz;
        let point = LoudnessPoint {
            momentary,
            short_term,
            timestamp,
        };

        inner.ring.push_back(point);
        if inner.ring.len() > inner.config.ring_capacity {
            inner.ring.pop_front();
        }
        for level in &mut inner.levels {
            level.add_point(&point);
        }
        inner.point_count += 1;
        drop(inner);

        self.latest_momentary.store(momentary, Ordering::Relaxed);
        self.latest_short_term.store(short_term, Ordering::Relaxed);
        self.total_points.fetch_add(1, Ordering::Relaxed);
        self.current_time.store(timestamp, Ordering::Release);
    }

    /// Timestamp of the newest ingested point, in seconds. Lock-free.
    pub fn current_time(&self) -> f64 {
        self.current_time.load(Ordering::Acquire)
    }

    /// Total points ingested since the last `prepare`/`reset`. Lock-free.
    pub fn point_count(&self) -> u64 {
        self.total_points.load(Ordering::Relaxed)
    }

    /// Latest point snapshot for instantaneous readouts. Lock-free.
    pub fn latest_point(&self) -> LoudnessPoint {
        LoudnessPoint {
            momentary: self.latest_momentary.load(Ordering::Relaxed),
            short_term: self.latest_short_term.load(Ordering::Relaxed),
            timestamp: self.current_time(),
        }
    }

    /// Full-resolution points with timestamps in [start, end), as far as the
    /// recent ring still holds them.
    pub fn points_in_range(&self, start: f64, end: f64) -> Vec<LoudnessPoint> {
        if end <= start {
            return Vec::new();
        }
        let inner = self.inner.lock();
        Self::raw_range(&inner.ring, start, end)
    }

    /// Full-resolution points newer than `timestamp`, for incremental
    /// streaming renderers.
    pub fn points_since(&self, timestamp: f64) -> Vec<LoudnessPoint> {
        let inner = self.inner.lock();
        let first = inner.ring.partition_point(|p| p.timestamp <= timestamp);
        inner.ring.iter().skip(first).copied().collect()
    }

    /// Best-available representation of [start, end) at roughly
    /// `target_points` output points.
    ///
    /// Fine zooms are served raw from the ring (`lod_level == -1`); wider
    /// ranges pick the coarsest LOD level still meeting the requested
    /// density, with a ~50% dead-band before switching levels so continuous
    /// re-querying during zoom does not oscillate. Queries with unchanged
    /// inputs return identical results.
    pub fn data_for_range(&self, start: f64, end: f64, target_points: usize) -> RangeData {
        if end <= start || target_points == 0 {
            return RangeData::default();
        }

        let inner = self.inner.lock();
        if inner.point_count == 0 {
            return RangeData::default();
        }

        let ideal_duration = (end - start) / target_points as f64;
        let finest_duration = inner.levels[0].bucket_duration();

        // Raw path: resolution fine enough that no reduction is needed,
        // provided the ring still covers the start of the range
        if ideal_duration < finest_duration {
            let ring_covers = inner
                .ring
                .front()
                .is_some_and(|p| p.timestamp <= start.max(0.0));
            if ring_covers {
                let buckets: Vec<MinMaxAggregate> = Self::raw_range(&inner.ring, start, end)
                    .iter()
                    .map(MinMaxAggregate::from_raw)
                    .collect();
                return RangeData {
                    lod_level: -1,
                    bucket_duration: inner.point_spacing(),
                    buckets,
                };
            }
        }

        // Coarsest level whose buckets still meet the requested density,
        // or the coarsest available if even that is too fine
        let mut chosen = inner
            .levels
            .iter()
            .position(|l| l.bucket_duration() >= ideal_duration)
            .unwrap_or(inner.levels.len() - 1);

        // Dead-band: stay on the previous level while the ideal duration
        // remains within ~50% of its residence band
        let last = self.last_level.load(Ordering::Relaxed);
        if last >= 0 && (last as usize) < inner.levels.len() && chosen != last as usize {
            let last_duration = inner.levels[last as usize].bucket_duration();
            let reduction = inner.config.lod_reduction.max(2) as f64;
            if ideal_duration <= last_duration * 1.5
                && ideal_duration > last_duration / (reduction * 1.5)
            {
                chosen = last as usize;
            }
        }
        if chosen as i32 != last {
            log::debug!("lod level switch: {last} -> {chosen}");
        }
        self.last_level.store(chosen as i32, Ordering::Relaxed);

        let level = &inner.levels[chosen];
        let mut buckets = Vec::new();
        level.buckets_in_range(start, end, &mut buckets);

        RangeData {
            lod_level: chosen as i32,
            bucket_duration: level.bucket_duration(),
            buckets,
        }
    }

    fn raw_range(ring: &VecDeque<LoudnessPoint>, start: f64, end: f64) -> Vec<LoudnessPoint> {
        let first = ring.partition_point(|p| p.timestamp < start);
        ring.iter()
            .skip(first)
            .take_while(|p| p.timestamp < end)
            .copied()
            .collect()
    }
}
