//! lg-store: Multi-resolution loudness history for LoudGraph
//!
//! Ingests one [`lg_core::LoudnessPoint`] every 100 ms (potentially for
//! hours) and answers "~N points over [t0, t1)" range queries from a UI
//! thread, with bounded memory and bounded latency on both sides.
//!
//! ## Modules
//! - `lod` - fixed-bucket min/max aggregation levels
//! - `store` - `LoudnessHistory`: ingestion, eviction, range queries
//! - `feed` - timer-thread bridge from meter atomics into the store

pub mod feed;
pub mod lod;
pub mod store;

pub use feed::MeterFeed;
pub use store::{LoudnessHistory, StoreConfig};
