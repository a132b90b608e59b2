//! Mock document store for running without a live backend.
//!
//! Serves bus documents loaded from a JSON file (or supplied directly) as
//! if they were live collection reads. `publish` replaces the collection and
//! pushes the new snapshot to every open subscription.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::{StreamExt, stream};
use tokio::sync::{RwLock, broadcast};

use super::error::StoreError;
use super::types::{BusDocument, decode_documents};
use super::{BusSource, SnapshotStream};

/// Snapshots buffered per subscriber before it starts lagging.
const UPDATE_BUFFER: usize = 16;

/// Mock store that serves documents from memory.
#[derive(Clone)]
pub struct MockStore {
    inner: Arc<MockInner>,
}

struct MockInner {
    documents: RwLock<Vec<BusDocument>>,
    updates: broadcast::Sender<Update>,
    failing: AtomicBool,
}

#[derive(Clone)]
enum Update {
    Snapshot(Vec<BusDocument>),
    Disconnect,
}

impl MockStore {
    /// Create a mock store holding the given documents.
    pub fn new(documents: Vec<BusDocument>) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_BUFFER);
        Self {
            inner: Arc::new(MockInner {
                documents: RwLock::new(documents),
                updates,
                failing: AtomicBool::new(false),
            }),
        }
    }

    /// Create a mock store from a JSON file holding a bus collection.
    ///
    /// The file may contain `{"documents": [...]}` or a bare array.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let documents = read_documents(path.as_ref())?;
        Ok(Self::new(documents))
    }

    /// Replace the collection and push it to subscribers.
    pub async fn publish(&self, documents: Vec<BusDocument>) {
        let mut guard = self.inner.documents.write().await;
        *guard = documents.clone();
        drop(guard);

        // No receivers just means nobody is subscribed right now.
        let _ = self.inner.updates.send(Update::Snapshot(documents));
    }

    /// End every open subscription with a `StreamClosed` error, as if the
    /// connection dropped.
    pub fn disconnect(&self) {
        let _ = self.inner.updates.send(Update::Disconnect);
    }

    /// Make subsequent reads and subscriptions fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.inner.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of documents currently held.
    pub async fn len(&self) -> usize {
        self.inner.documents.read().await.len()
    }

    /// Whether the collection is empty.
    pub async fn is_empty(&self) -> bool {
        self.inner.documents.read().await.is_empty()
    }

    fn check_failing(&self) -> Result<(), StoreError> {
        if self.inner.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Mock("store unavailable".to_string()));
        }
        Ok(())
    }
}

impl BusSource for MockStore {
    async fn fetch_all(&self) -> Result<Vec<BusDocument>, StoreError> {
        self.check_failing()?;
        Ok(self.inner.documents.read().await.clone())
    }

    /// Like a real listener, the subscription first delivers the current
    /// collection and then every later publish.
    async fn subscribe(&self) -> Result<SnapshotStream, StoreError> {
        self.check_failing()?;

        let receiver = self.inner.updates.subscribe();
        let current = self.inner.documents.read().await.clone();

        let updates = stream::unfold(Some(receiver), |state| async move {
            let mut receiver = state?;
            loop {
                match receiver.recv().await {
                    Ok(Update::Snapshot(documents)) => {
                        return Some((Ok::<_, StoreError>(documents), Some(receiver)));
                    }
                    Ok(Update::Disconnect) => return Some((Err(StoreError::StreamClosed), None)),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "mock subscriber lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        });

        Ok(stream::once(async move { Ok::<_, StoreError>(current) })
            .chain(updates)
            .boxed())
    }
}

fn read_documents(path: &Path) -> Result<Vec<BusDocument>, StoreError> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| StoreError::Mock(format!("failed to read {}: {}", path.display(), e)))?;

    decode_documents(&json)
        .map_err(|e| StoreError::Mock(format!("failed to parse {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn doc(id: &str) -> BusDocument {
        BusDocument {
            id: Some(id.to_string()),
            is_active: Some(true),
            ..Default::default()
        }
    }

    fn write_json(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn load_from_file() {
        let file = write_json(r#"{ "documents": [ { "id": "a" }, { "id": "b" } ] }"#);
        let store = MockStore::load(file.path()).unwrap();

        let docs = store.fetch_all().await.unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].id.as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn load_bundled_sample_data() {
        let store = MockStore::load(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/data/mock_buses.json"
        ))
        .unwrap();
        assert!(!store.is_empty().await);
    }

    #[test]
    fn load_missing_file_fails() {
        let result = MockStore::load("/nonexistent/buses.json");
        assert!(matches!(result, Err(StoreError::Mock(_))));
    }

    #[test]
    fn load_invalid_json_fails() {
        let file = write_json("{ not json");
        assert!(matches!(
            MockStore::load(file.path()),
            Err(StoreError::Mock(_))
        ));
    }

    #[tokio::test]
    async fn failing_store_errors() {
        let store = MockStore::new(vec![doc("a")]);
        store.set_failing(true);
        assert!(store.fetch_all().await.is_err());
        assert!(store.subscribe().await.is_err());

        store.set_failing(false);
        assert_eq!(store.fetch_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn subscription_delivers_current_then_updates() {
        let store = MockStore::new(vec![doc("a")]);
        let mut stream = store.subscribe().await.unwrap();

        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.len(), 1);

        store.publish(vec![doc("b"), doc("c")]).await;
        let second = stream.next().await.unwrap().unwrap();
        assert_eq!(second.len(), 2);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn disconnect_ends_subscription() {
        let store = MockStore::new(vec![doc("a")]);
        let mut stream = store.subscribe().await.unwrap();
        assert!(stream.next().await.unwrap().is_ok());

        store.disconnect();
        assert!(matches!(
            stream.next().await,
            Some(Err(StoreError::StreamClosed))
        ));
        assert!(stream.next().await.is_none());
    }
}
