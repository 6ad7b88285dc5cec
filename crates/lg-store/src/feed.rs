//! Timer-thread bridge between the meter's atomic readouts and the store
//!
//! The audio thread never touches the store; a dedicated worker wakes at
//! the store's update rate, samples the loudness source, and ingests one
//! point. The shutdown channel doubles as the tick timer via
//! `recv_timeout`.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Sender, bounded};
use lg_core::{LgError, LgResult};

use crate::store::LoudnessHistory;

/// Periodic ingestion worker feeding a [`LoudnessHistory`].
///
/// The source closure is sampled once per tick and returns
/// `(momentary_lufs, short_term_lufs)` — typically two relaxed atomic loads
/// from the meter's shared outputs.
#[derive(Debug)]
pub struct MeterFeed {
    stop_tx: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl MeterFeed {
    /// Spawn the feed thread at `update_rate_hz`.
    pub fn start<F>(
        store: Arc<LoudnessHistory>,
        update_rate_hz: f64,
        source: F,
    ) -> LgResult<Self>
    where
        F: Fn() -> (f32, f32) + Send + 'static,
    {
        if !(update_rate_hz > 0.0 && update_rate_hz.is_finite()) {
            return Err(LgError::InvalidParam(format!(
                "update rate must be positive, got {update_rate_hz}"
            )));
        }

        let (stop_tx, stop_rx) = bounded::<()>(1);
        let interval = Duration::from_secs_f64(1.0 / update_rate_hz);

        let handle = std::thread::Builder::new()
            .name("lg-meter-feed".into())
            .spawn(move || {
                log::info!("meter feed started at {update_rate_hz} Hz");
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                            let (momentary, short_term) = source();
                            store.add_point(momentary, short_term);
                        }
                        // Stop requested or handle dropped
                        _ => break,
                    }
                }
                log::info!("meter feed stopped");
            })?;

        Ok(Self {
            stop_tx,
            handle: Some(handle),
        })
    }

    /// Signal the worker and wait for it to exit. Idempotent.
    pub fn stop(&mut self) {
        let _ = self.stop_tx.try_send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MeterFeed {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_ingests_points() {
        let store = Arc::new(LoudnessHistory::default());
        store.prepare(100.0);

        let mut feed =
            MeterFeed::start(Arc::clone(&store), 100.0, || (-20.0, -21.0)).expect("spawn feed");

        std::thread::sleep(Duration::from_millis(300));
        feed.stop();

        assert!(store.point_count() >= 1);
        let latest = store.latest_point();
        assert_eq!(latest.momentary, -20.0);
        assert_eq!(latest.short_term, -21.0);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let store = Arc::new(LoudnessHistory::default());
        let mut feed = MeterFeed::start(store, 50.0, || (-23.0, -23.0)).expect("spawn feed");
        feed.stop();
        feed.stop();
    }

    #[test]
    fn test_rejects_bad_rate() {
        let store = Arc::new(LoudnessHistory::default());
        assert!(MeterFeed::start(Arc::clone(&store), 0.0, || (0.0, 0.0)).is_err());
        assert!(MeterFeed::start(store, f64::NAN, || (0.0, 0.0)).is_err());
    }
}
