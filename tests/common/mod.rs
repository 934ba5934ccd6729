//! Shared test utilities

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, Bytes},
    http::{Request, Response},
};
use futures::StreamExt;
use voice_gate::api::{self, ApiState};
use voice_gate::config::WaitConfig;
use voice_gate::speech::{DEFAULT_RATE, SpeechSynthesizer};
use voice_gate::{Error, Result};

/// Synthesizer that records what it was asked to say
#[derive(Debug, Default)]
pub struct RecordingSynthesizer {
    spoken: Mutex<Vec<(String, u32)>>,
    fail: bool,
}

impl RecordingSynthesizer {
    /// Synthesizer whose every call fails like a crashed speech command
    #[must_use]
    pub fn failing() -> Self {
        Self {
            spoken: Mutex::default(),
            fail: true,
        }
    }

    pub fn spoken(&self) -> Vec<(String, u32)> {
        self.spoken.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for RecordingSynthesizer {
    async fn speak(&self, text: &str, rate: u32) -> Result<()> {
        if self.fail {
            return Err(Error::Upstream("say exited with code 1".to_string()));
        }
        self.spoken.lock().unwrap().push((text.to_string(), rate));
        Ok(())
    }
}

/// Build a test API router around `speech`
pub fn build_test_router(speech: Arc<RecordingSynthesizer>) -> (Router, Arc<ApiState>) {
    let state = Arc::new(ApiState::new(speech, DEFAULT_RATE, WaitConfig::default()));
    (api::router(state.clone()), state)
}

/// Request with a JSON body
pub fn json_request(method: &str, uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Request without a body
pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Read a whole response body as JSON
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Incremental reader of `data:` payloads from an SSE response
pub struct SseReader {
    stream: futures::stream::BoxStream<'static, std::result::Result<Bytes, axum::Error>>,
    buffer: String,
}

impl SseReader {
    pub fn new(response: Response<Body>) -> Self {
        Self {
            stream: response.into_body().into_data_stream().boxed(),
            buffer: String::new(),
        }
    }

    /// Next event payload, skipping comments
    pub async fn next_event(&mut self) -> serde_json::Value {
        loop {
            if let Some(end) = self.buffer.find("\n\n") {
                let frame: String = self.buffer.drain(..end + 2).collect();
                let data: String = frame
                    .lines()
                    .filter_map(|line| line.strip_prefix("data:"))
                    .map(str::trim_start)
                    .collect();
                if !data.is_empty() {
                    return serde_json::from_str(&data).unwrap();
                }
                continue;
            }

            let chunk = tokio::time::timeout(std::time::Duration::from_secs(5), self.stream.next())
                .await
                .expect("timed out waiting for event")
                .expect("event stream ended")
                .unwrap();
            self.buffer.push_str(std::str::from_utf8(&chunk).unwrap());
        }
    }
}
