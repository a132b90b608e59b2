//! Document store error types.

/// Errors from reading the bus collection.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not a bus collection
    #[error("JSON parse error: {message}")]
    Json {
        message: String,
        body: Option<String>,
    },

    /// Store returned an error status code
    #[error("store error {status}: {message}")]
    Api { status: u16, message: String },

    /// Invalid API key or missing permission on the collection
    #[error("unauthorized: check BUS_STORE_API_KEY")]
    Unauthorized,

    /// The push subscription ended
    #[error("subscription stream closed")]
    StreamClosed,

    /// Local mock data could not be used
    #[error("mock store error: {0}")]
    Mock(String),
}

impl StoreError {
    pub(crate) fn json(err: serde_json::Error, body: &str) -> Self {
        StoreError::Json {
            message: err.to_string(),
            body: Some(body.chars().take(500).collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = StoreError::Api {
            status: 503,
            message: "Service Unavailable".into(),
        };
        assert_eq!(err.to_string(), "store error 503: Service Unavailable");

        let err = StoreError::StreamClosed;
        assert_eq!(err.to_string(), "subscription stream closed");

        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = StoreError::json(parse, "{");
        assert!(err.to_string().contains("JSON parse error"));
    }

    #[test]
    fn json_error_truncates_body() {
        let parse = serde_json::from_str::<serde_json::Value>("x").unwrap_err();
        let body = "x".repeat(2000);
        match StoreError::json(parse, &body) {
            StoreError::Json { body: Some(b), .. } => assert_eq!(b.len(), 500),
            other => panic!("unexpected {other:?}"),
        }
    }
}
