//! Application state for the web layer.

use std::sync::Arc;

use crate::cache::ViewCache;
use crate::feed::{FeedControl, SnapshotSlot};

/// Shared application state.
///
/// Handlers only read the snapshot slot and the clock; the feed tasks are
/// the only writers.
#[derive(Clone)]
pub struct AppState {
    /// Latest bus snapshot and feed health
    pub slot: SnapshotSlot,

    /// Clock and manual refresh
    pub feed: FeedControl,

    /// Memo of derived timetable views
    pub cache: Arc<ViewCache>,
}

impl AppState {
    /// Create a new app state.
    pub fn new(slot: SnapshotSlot, feed: FeedControl, cache: ViewCache) -> Self {
        Self {
            slot,
            feed,
            cache: Arc::new(cache),
        }
    }
}
