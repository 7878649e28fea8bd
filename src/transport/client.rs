// SPDX-License-Identifier: GPL-3.0-only
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, Response};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::Config;
use crate::transport::traits::{BodyStream, Transport, TransportError};

/// reqwest-backed transport for the document-distribution service.
///
/// Every request carries the same browser-like header set the service's
/// web frontend sends, plus the configured session cookie.
///
/// `request_timeout_secs` bounds JSON calls end to end. Document bodies
/// only time out when the connection goes idle for that long, so a large
/// file on a slow link is not cut off.
pub struct HttpTransport {
    client: Client,
    session_cookie: Option<String>,
    json_timeout: Duration,
}

impl HttpTransport {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        if config.accept_invalid_certs {
            warn!("Certificate verification is disabled for the benchmark download client");
        }

        let request_timeout = Duration::from_secs(config.request_timeout_secs);
        let client = Client::builder()
            .default_headers(default_headers(&config.base_url)?)
            .user_agent(config.user_agent.as_str())
            .read_timeout(request_timeout)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;

        Ok(Self {
            client,
            session_cookie: config.session_cookie.clone(),
            json_timeout: request_timeout,
        })
    }

    async fn get(
        &self,
        url: &str,
        cookies: &[(&str, &str)],
        timeout: Option<Duration>,
    ) -> Result<Response, TransportError> {
        let mut request = self.client.get(url);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        if let Some(cookie) = cookie_header(self.session_cookie.as_deref(), cookies) {
            request = request.header(header::COOKIE, cookie);
        }

        let response = request.send().await.map_err(|source| TransportError::Request {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch_json(&self, url: &str) -> Result<serde_json::Value, TransportError> {
        debug!(url = %url, "Fetching JSON");

        let body = self
            .get(url, &[], Some(self.json_timeout))
            .await?
            .bytes()
            .await
            .map_err(|source| TransportError::Request {
                url: url.to_string(),
                source,
            })?;

        serde_json::from_slice(&body).map_err(|source| TransportError::Decode {
            url: url.to_string(),
            source,
        })
    }

    async fn fetch_stream(
        &self,
        url: &str,
        cookies: &[(&str, &str)],
    ) -> Result<BodyStream, TransportError> {
        debug!(url = %url, "Opening download stream");

        let response = self.get(url, cookies, None).await?;
        let content_length = response.content_length();
        let owned_url = url.to_string();
        let chunks = response
            .bytes_stream()
            .map(move |chunk| {
                chunk.map_err(|source| TransportError::Request {
                    url: owned_url.clone(),
                    source,
                })
            })
            .boxed();

        Ok(BodyStream { content_length, chunks })
    }
}

/// Headers the service's own web client sends on XHR calls
fn default_headers(base_url: &str) -> anyhow::Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert("x-requested-with", HeaderValue::from_static("XMLHttpRequest"));
    headers.insert("sec-fetch-site", HeaderValue::from_static("same-origin"));
    headers.insert("sec-fetch-mode", HeaderValue::from_static("cors"));
    headers.insert("sec-fetch-dest", HeaderValue::from_static("empty"));

    let referer = format!("{}/", base_url.trim_end_matches('/'));
    headers.insert(header::REFERER, HeaderValue::from_str(&referer)?);

    Ok(headers)
}

/// Merge the session cookie and per-request cookies into one Cookie header value
fn cookie_header(session: Option<&str>, extra: &[(&str, &str)]) -> Option<String> {
    let parts: Vec<String> = session
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .into_iter()
        .chain(extra.iter().map(|(name, value)| format!("{}={}", name, value)))
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("; "))
    }
}
