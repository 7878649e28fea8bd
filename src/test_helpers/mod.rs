// SPDX-License-Identifier: GPL-3.0-only
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{self, StreamExt};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::catalog::Resource;
use crate::scheduler::{DownloadTask, OutcomeStatus, ProgressSink};
use crate::transport::{BodyStream, Transport, TransportError};

/// Canned body served by [`FakeTransport::fetch_stream`]
#[derive(Debug, Clone)]
pub struct FakeBody {
    chunks: Vec<Vec<u8>>,
    content_length: Option<u64>,
    fail_after: Option<usize>,
    delay: Duration,
}

impl FakeBody {
    /// Body made of `chunks`, advertising its exact length
    pub fn new(chunks: Vec<Vec<u8>>) -> Self {
        let total = chunks.iter().map(|c| c.len() as u64).sum();
        Self {
            chunks,
            content_length: Some(total),
            fail_after: None,
            delay: Duration::ZERO,
        }
    }

    pub fn with_content_length(mut self, length: Option<u64>) -> Self {
        self.content_length = length;
        self
    }

    /// Deliver `count` chunks, then fail the stream
    pub fn fail_after(mut self, count: usize) -> Self {
        self.fail_after = Some(count);
        self
    }

    /// Sleep before the response and before each chunk
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Decrements the in-flight counter when the body stream is dropped
struct InFlightGuard {
    counter: Arc<AtomicUsize>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

/// In-memory [`Transport`]. Unknown URLs answer HTTP 404.
#[derive(Default)]
pub struct FakeTransport {
    json: Mutex<HashMap<String, Value>>,
    bodies: Mutex<HashMap<String, FakeBody>>,
    cookies: Mutex<HashMap<String, Vec<(String, String)>>>,
    json_requests: Mutex<Vec<String>>,
    stream_requests: AtomicUsize,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: AtomicUsize,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_json(&self, url: &str, value: Value) {
        self.json.lock().unwrap().insert(url.to_string(), value);
    }

    pub fn add_body(&self, url: &str, body: FakeBody) {
        self.bodies.lock().unwrap().insert(url.to_string(), body);
    }

    pub fn json_requests(&self) -> Vec<String> {
        self.json_requests.lock().unwrap().clone()
    }

    pub fn stream_requests(&self) -> usize {
        self.stream_requests.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn cookies_for(&self, url: &str) -> Option<Vec<(String, String)>> {
        self.cookies.lock().unwrap().get(url).cloned()
    }

    fn not_found(url: &str) -> TransportError {
        TransportError::Status {
            url: url.to_string(),
            status: 404,
        }
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn fetch_json(&self, url: &str) -> Result<Value, TransportError> {
        self.json_requests.lock().unwrap().push(url.to_string());
        self.json
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| Self::not_found(url))
    }

    async fn fetch_stream(
        &self,
        url: &str,
        cookies: &[(&str, &str)],
    ) -> Result<BodyStream, TransportError> {
        self.stream_requests.fetch_add(1, Ordering::SeqCst);
        self.cookies.lock().unwrap().insert(
            url.to_string(),
            cookies.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        );

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let guard = InFlightGuard {
            counter: Arc::clone(&self.in_flight),
        };

        let body = self.bodies.lock().unwrap().get(url).cloned();
        let Some(body) = body else {
            return Err(Self::not_found(url));
        };

        if !body.delay.is_zero() {
            tokio::time::sleep(body.delay).await;
        }

        let content_length = body.content_length;
        let state = (
            body.chunks.into_iter().enumerate(),
            body.fail_after,
            body.delay,
            url.to_string(),
            guard,
        );
        let chunks = stream::unfold(state, |(mut chunks, fail_after, delay, url, guard)| async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let (index, chunk) = chunks.next()?;
            if fail_after == Some(index) {
                let err = TransportError::Interrupted {
                    url: url.clone(),
                    reason: "connection reset".to_string(),
                };
                // Drain so the next poll ends the stream
                chunks.by_ref().for_each(drop);
                return Some((Err(err), (chunks, fail_after, delay, url, guard)));
            }
            Some((Ok(Bytes::from(chunk)), (chunks, fail_after, delay, url, guard)))
        })
        .boxed();

        Ok(BodyStream { content_length, chunks })
    }
}

/// Records the last update and terminal status per task
#[derive(Default)]
pub struct RecordingProgress {
    updates: Mutex<HashMap<usize, (u64, Option<u64>)>>,
    finished: Mutex<HashMap<usize, OutcomeStatus>>,
}

impl RecordingProgress {
    pub fn last_update(&self, task_id: usize) -> Option<(u64, Option<u64>)> {
        self.updates.lock().unwrap().get(&task_id).copied()
    }

    pub fn finished(&self, task_id: usize) -> Option<OutcomeStatus> {
        self.finished.lock().unwrap().get(&task_id).copied()
    }
}

impl ProgressSink for RecordingProgress {
    fn begin(&self, _task: &DownloadTask, _position: &str, _total: Option<u64>) {}

    fn update(&self, task_id: usize, bytes_done: u64, total: Option<u64>) {
        self.updates.lock().unwrap().insert(task_id, (bytes_done, total));
    }

    fn finish(&self, task_id: usize, status: OutcomeStatus) {
        self.finished.lock().unwrap().insert(task_id, status);
    }
}

/// Task writing `filename` into `dir`
pub fn make_task(id: usize, dir: &Path, filename: &str, url: &str) -> DownloadTask {
    DownloadTask {
        id,
        category: "Test Category".to_string(),
        resource: Resource {
            category_id: 1,
            filename: filename.to_string(),
            source_url: url.to_string(),
            document_id: None,
        },
        target_path: dir.join(filename),
    }
}
