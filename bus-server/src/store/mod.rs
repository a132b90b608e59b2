//! Document store access.
//!
//! Bus services live in a collection of a managed document store. This
//! module reads that collection, either once or as a push subscription
//! that delivers a full snapshot on every change.
//!
//! Key characteristics of the store:
//! - Every delivery is a full replacement; there is no incremental diffing
//! - Documents are loosely typed, see [`BusDocument`]
//! - The store is read-only from this service's point of view

mod client;
mod error;
mod mock;
mod types;

use std::future::Future;

use futures::stream::BoxStream;

pub use client::{StoreClient, StoreConfig};
pub use error::StoreError;
pub use mock::MockStore;
pub use types::{BusDocument, RouteDocument, decode_documents};

/// Stream of full collection snapshots from a push subscription.
pub type SnapshotStream = BoxStream<'static, Result<Vec<BusDocument>, StoreError>>;

/// A source of bus collection snapshots.
pub trait BusSource: Send + Sync + 'static {
    /// Read the whole collection once.
    fn fetch_all(&self) -> impl Future<Output = Result<Vec<BusDocument>, StoreError>> + Send;

    /// Open a push subscription. Each item replaces the previous snapshot.
    fn subscribe(&self) -> impl Future<Output = Result<SnapshotStream, StoreError>> + Send;
}
