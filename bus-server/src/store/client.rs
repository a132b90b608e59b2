//! Document store HTTP client.
//!
//! Reads the bus collection in one shot and opens the push subscription,
//! which delivers newline-delimited JSON, one full collection snapshot per
//! line. Blank lines are keep-alives.

use std::sync::Arc;
use std::time::Duration;

use futures::{Stream, StreamExt, stream};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tokio::sync::Semaphore;

use super::error::StoreError;
use super::types::{BusDocument, decode_documents};
use super::{BusSource, SnapshotStream};

/// Default collection holding bus services.
const DEFAULT_COLLECTION: &str = "buses";

/// Default maximum concurrent one-shot reads.
const DEFAULT_MAX_CONCURRENT: usize = 2;

/// Configuration for the store client.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// API key sent as `x-api-key`
    pub api_key: String,
    /// Base URL of the store's REST endpoint
    pub base_url: String,
    /// Collection holding bus documents
    pub collection: String,
    /// Maximum concurrent one-shot reads
    pub max_concurrent: usize,
    /// Timeout for one-shot reads, in seconds
    pub timeout_secs: u64,
    /// Timeout for establishing the subscription connection, in seconds
    pub connect_timeout_secs: u64,
}

impl StoreConfig {
    /// Create a new config for the given endpoint and API key.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }

    /// Read from a different collection.
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    /// Set maximum concurrent reads.
    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n;
        self
    }

    /// Set the one-shot read timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    fn documents_url(&self) -> String {
        format!(
            "{}/collections/{}/documents",
            self.base_url, self.collection
        )
    }

    fn listen_url(&self) -> String {
        format!("{}/collections/{}/listen", self.base_url, self.collection)
    }
}

/// Document store client.
///
/// One-shot reads go through a semaphore so a burst of manual refreshes
/// cannot flood the store. The subscription uses its own HTTP client with
/// no overall timeout, since the response body stays open indefinitely.
#[derive(Debug, Clone)]
pub struct StoreClient {
    http: reqwest::Client,
    stream_http: reqwest::Client,
    documents_url: String,
    listen_url: String,
    semaphore: Arc<Semaphore>,
}

impl StoreClient {
    /// Create a new store client with the given configuration.
    pub fn new(config: StoreConfig) -> Result<Self, StoreError> {
        let mut headers = HeaderMap::new();
        let api_key = HeaderValue::from_str(&config.api_key).map_err(|_| StoreError::Api {
            status: 0,
            message: "Invalid API key format".to_string(),
        })?;
        headers.insert(HeaderName::from_static("x-api-key"), api_key);

        let http = reqwest::Client::builder()
            .default_headers(headers.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let stream_http = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            stream_http,
            documents_url: config.documents_url(),
            listen_url: config.listen_url(),
            semaphore: Arc::new(Semaphore::new(config.max_concurrent)),
        })
    }

    /// Read every document in the bus collection.
    pub async fn fetch_documents(&self) -> Result<Vec<BusDocument>, StoreError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| StoreError::Api {
                status: 0,
                message: "Semaphore closed".to_string(),
            })?;

        let response = self.http.get(&self.documents_url).send().await?;
        let response = check_status(response).await?;
        let body = response.text().await?;

        decode_documents(&body).map_err(|e| StoreError::json(e, &body))
    }

    /// Open the push subscription on the bus collection.
    pub async fn listen(&self) -> Result<SnapshotStream, StoreError> {
        let response = self
            .stream_http
            .get(&self.listen_url)
            .header(reqwest::header::ACCEPT, "application/x-ndjson")
            .send()
            .await?;
        let response = check_status(response).await?;

        tracing::debug!(url = %self.listen_url, "subscription opened");
        Ok(ndjson_snapshots(response.bytes_stream().boxed()).boxed())
    }
}

impl BusSource for StoreClient {
    async fn fetch_all(&self) -> Result<Vec<BusDocument>, StoreError> {
        self.fetch_documents().await
    }

    async fn subscribe(&self) -> Result<SnapshotStream, StoreError> {
        self.listen().await
    }
}

/// Map error statuses onto `StoreError`.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    let status = response.status();

    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(StoreError::Unauthorized);
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(StoreError::Api {
            status: status.as_u16(),
            message: body,
        });
    }

    Ok(response)
}

/// Longest line accepted from the subscription, in bytes.
const MAX_LINE_BYTES: usize = 8 * 1024 * 1024;

struct LineReader<S> {
    chunks: S,
    buf: Vec<u8>,
    max_line: usize,
    /// Dropping the rest of an oversized line.
    skipping: bool,
    /// Upstream has ended; only the buffered tail is left.
    finished: bool,
}

/// Split a byte stream into newline-delimited snapshots.
///
/// Each non-blank line is decoded as a full collection, including a final
/// line with no trailing newline. A line that fails to decode, or grows
/// past `MAX_LINE_BYTES`, yields an error item but does not end the
/// stream; transport errors and end-of-stream do.
pub(crate) fn ndjson_snapshots<S, B, E>(
    chunks: S,
) -> impl Stream<Item = Result<Vec<BusDocument>, StoreError>> + Send
where
    S: Stream<Item = Result<B, E>> + Send + Unpin + 'static,
    B: AsRef<[u8]> + Send,
    E: Into<StoreError> + Send,
{
    ndjson_with_limit(chunks, MAX_LINE_BYTES)
}

fn ndjson_with_limit<S, B, E>(
    chunks: S,
    max_line: usize,
) -> impl Stream<Item = Result<Vec<BusDocument>, StoreError>> + Send
where
    S: Stream<Item = Result<B, E>> + Send + Unpin + 'static,
    B: AsRef<[u8]> + Send,
    E: Into<StoreError> + Send,
{
    let reader = LineReader {
        chunks,
        buf: Vec::new(),
        max_line,
        skipping: false,
        finished: false,
    };

    stream::unfold(Some(reader), |state| async move {
        let mut reader = state?;
        loop {
            if let Some(pos) = reader.buf.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = reader.buf.drain(..=pos).collect();
                if std::mem::take(&mut reader.skipping) {
                    continue;
                }
                if let Some(item) = decode_line(&line) {
                    return Some((item, Some(reader)));
                }
                continue;
            }

            if reader.finished {
                let tail = std::mem::take(&mut reader.buf);
                if !reader.skipping
                    && let Some(item) = decode_line(&tail)
                {
                    return Some((item, Some(reader)));
                }
                return Some((Err(StoreError::StreamClosed), None));
            }

            if reader.buf.len() > reader.max_line {
                reader.buf.clear();
                if !reader.skipping {
                    reader.skipping = true;
                    tracing::warn!(limit = reader.max_line, "subscription line too long");
                    let err = StoreError::Json {
                        message: format!("line longer than {} bytes", reader.max_line),
                        body: None,
                    };
                    return Some((Err(err), Some(reader)));
                }
            }

            match reader.chunks.next().await {
                Some(Ok(chunk)) => reader.buf.extend_from_slice(chunk.as_ref()),
                Some(Err(e)) => return Some((Err(e.into()), None)),
                None => reader.finished = true,
            }
        }
    })
}

/// Decode one line, or `None` when it is blank.
fn decode_line(line: &[u8]) -> Option<Result<Vec<BusDocument>, StoreError>> {
    let text = String::from_utf8_lossy(line);
    let line = text.trim();
    if line.is_empty() {
        return None;
    }
    Some(decode_documents(line).map_err(|e| StoreError::json(e, line)))
}
