//! The latest-snapshot slot.
//!
//! Producers (initial fetch, subscription, refresh) publish complete
//! replacements; readers always see one whole snapshot, never a mix.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;

use crate::domain::Bus;
use crate::pipeline::normalize;
use crate::store::BusDocument;

/// Where a snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SnapshotOrigin {
    InitialFetch,
    Subscription,
    Refresh,
}

/// One normalized, versioned snapshot of the bus collection.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Increases by one on every publish.
    pub version: u64,
    pub buses: Vec<Bus>,
    /// Documents received, including inactive ones.
    pub document_count: usize,
    pub received_at: DateTime<Utc>,
    pub origin: SnapshotOrigin,
}

/// Health of the feed, as shown to users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "state")]
pub enum FeedHealth {
    /// No snapshot yet and no failure yet.
    Starting,
    Live,
    /// The push subscription broke; the last snapshot is still served.
    Degraded { message: String },
    /// A fetch failed. Any earlier snapshot is still served.
    FetchFailed { message: String },
}

impl FeedHealth {
    /// Banner text for a degraded feed.
    pub fn notice(&self) -> Option<String> {
        match self {
            FeedHealth::Starting | FeedHealth::Live => None,
            FeedHealth::Degraded { message } => {
                Some(format!("Live updates interrupted, using cached data ({message})"))
            }
            FeedHealth::FetchFailed { message } => {
                Some(format!("Could not load buses: {message}"))
            }
        }
    }
}

/// Shared holder of the latest snapshot and feed health.
///
/// Cloning gives another handle onto the same slot.
#[derive(Clone)]
pub struct SnapshotSlot {
    snapshot: Arc<watch::Sender<Option<Arc<Snapshot>>>>,
    health: Arc<watch::Sender<FeedHealth>>,
}

impl SnapshotSlot {
    pub fn new() -> Self {
        let (snapshot, _) = watch::channel(None);
        let (health, _) = watch::channel(FeedHealth::Starting);
        Self {
            snapshot: Arc::new(snapshot),
            health: Arc::new(health),
        }
    }

    /// Normalize `documents` and publish them as the new snapshot.
    ///
    /// Last write wins. Marks the feed live and returns the new version.
    pub fn publish(&self, documents: &[BusDocument], origin: SnapshotOrigin) -> u64 {
        let buses = normalize(documents);
        let mut version = 0;

        self.snapshot.send_modify(|current| {
            version = current.as_ref().map_or(0, |s| s.version) + 1;
            *current = Some(Arc::new(Snapshot {
                version,
                buses,
                document_count: documents.len(),
                received_at: Utc::now(),
                origin,
            }));
        });
        self.set_health(FeedHealth::Live);

        tracing::info!(
            version,
            documents = documents.len(),
            origin = ?origin,
            "published bus snapshot"
        );
        version
    }

    /// The current snapshot, if one was ever published.
    pub fn latest(&self) -> Option<Arc<Snapshot>> {
        self.snapshot.borrow().clone()
    }

    /// Version of the current snapshot, 0 before the first publish.
    pub fn version(&self) -> u64 {
        self.snapshot.borrow().as_ref().map_or(0, |s| s.version)
    }

    pub fn health(&self) -> FeedHealth {
        self.health.borrow().clone()
    }

    pub fn set_health(&self, health: FeedHealth) {
        self.health.send_if_modified(|current| {
            if *current == health {
                return false;
            }
            *current = health;
            true
        });
    }

    /// Receiver notified on every publish.
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<Snapshot>>> {
        self.snapshot.subscribe()
    }

    /// Receiver notified on every health change.
    pub fn subscribe_health(&self) -> watch::Receiver<FeedHealth> {
        self.health.subscribe()
    }
}

impl Default for SnapshotSlot {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, active: bool) -> BusDocument {
        BusDocument {
            id: Some(id.into()),
            is_active: Some(active),
            ..Default::default()
        }
    }

    #[test]
    fn empty_until_published() {
        let slot = SnapshotSlot::new();
        assert!(slot.latest().is_none());
        assert_eq!(slot.health(), FeedHealth::Starting);
    }

    #[test]
    fn publish_normalizes_and_bumps_version() {
        let slot = SnapshotSlot::new();

        let v1 = slot.publish(&[doc("a", true), doc("b", false)], SnapshotOrigin::InitialFetch);
        let first = slot.latest().unwrap();
        assert_eq!(v1, 1);
        assert_eq!(first.buses.len(), 1);
        assert_eq!(first.document_count, 2);
        assert_eq!(slot.health(), FeedHealth::Live);

        let v2 = slot.publish(&[doc("c", true), doc("d", true)], SnapshotOrigin::Subscription);
        let second = slot.latest().unwrap();
        assert_eq!(v2, 2);
        assert_eq!(second.buses.len(), 2);
        assert_eq!(second.origin, SnapshotOrigin::Subscription);

        // Earlier readers keep their whole snapshot.
        assert_eq!(first.buses[0].id, "a");
    }

    #[test]
    fn failure_keeps_snapshot() {
        let slot = SnapshotSlot::new();
        slot.publish(&[doc("a", true)], SnapshotOrigin::InitialFetch);
        slot.set_health(FeedHealth::FetchFailed {
            message: "timeout".into(),
        });

        assert_eq!(slot.latest().unwrap().buses.len(), 1);
        assert!(slot.health().notice().unwrap().contains("timeout"));
    }

    #[test]
    fn subscribers_see_publishes() {
        let slot = SnapshotSlot::new();
        let mut rx = slot.subscribe();
        assert!(!rx.has_changed().unwrap());

        slot.publish(&[doc("a", true)], SnapshotOrigin::Refresh);
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().as_ref().unwrap().version, 1);
    }

    #[test]
    fn health_serializes_with_state_tag() {
        let json = serde_json::to_value(FeedHealth::Degraded {
            message: "reset".into(),
        })
        .unwrap();
        assert_eq!(json["state"], "degraded");
        assert_eq!(json["message"], "reset");
        let degraded = FeedHealth::Degraded {
            message: "x".into(),
        };
        assert!(degraded.notice().unwrap().contains("cached data"));
    }
}
