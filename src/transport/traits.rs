// SPDX-License-Identifier: GPL-3.0-only
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;

#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Invalid JSON from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Body of {url} interrupted: {reason}")]
    Interrupted { url: String, reason: String },
}

/// A response body that is consumed chunk by chunk
pub struct BodyStream {
    /// Value of the Content-Length header, if the server sent one
    pub content_length: Option<u64>,

    pub chunks: BoxStream<'static, Result<Bytes, TransportError>>,
}

impl std::fmt::Debug for BodyStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BodyStream")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `url` and decode the body as JSON
    async fn fetch_json(&self, url: &str) -> Result<serde_json::Value, TransportError>;

    /// GET `url` and hand back the body as a stream.
    /// `cookies` are sent in addition to the session cookie.
    async fn fetch_stream(
        &self,
        url: &str,
        cookies: &[(&str, &str)],
    ) -> Result<BodyStream, TransportError>;
}
