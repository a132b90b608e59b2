//! Keeping the bus snapshot current.
//!
//! A [`SnapshotSlot`] holds the latest normalized collection. Independent
//! producers started by [`spawn_feed`] write into it: a one-shot initial
//! fetch, the push subscription, and a refresh task for polling and manual
//! retries. A clock task publishes the current minute so that views can be
//! re-derived as statuses change. Readers never talk to the producers.

mod runner;
mod slot;

pub use runner::{FeedConfig, FeedControl, FeedHandle, spawn_feed};
pub use slot::{FeedHealth, Snapshot, SnapshotOrigin, SnapshotSlot};
