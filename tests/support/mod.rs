//! Shared fakes and request helpers for the HTTP integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use suichat::Config;
use suichat::channels::web::{AppState, router};
use suichat::error::{GatewayError, ImageError};
use suichat::llm::{CompletionRequest, LlmProvider};
use suichat::media::{GeneratedImage, HostedImage, ImageGenerator, ImageHost};

pub const SELF_WALLET: &str = "0xSELF";

/// A syntactically valid 42-character address ending in `tail`.
pub fn address(tail: char) -> String {
    format!("0x{}", tail.to_string().repeat(40))
}

/// LLM fake that replays scripted completions and records each request.
#[derive(Default)]
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<Result<String, GatewayError>>>,
    seen: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedLlm {
    pub fn new(replies: Vec<Result<String, GatewayError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn replying(replies: &[&str]) -> Arc<Self> {
        Self::new(replies.iter().map(|r| Ok(r.to_string())).collect())
    }

    pub fn seen(&self) -> Vec<CompletionRequest> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    fn name(&self) -> &str {
        "scripted"
    }

    fn default_model(&self) -> &str {
        "test/model"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, GatewayError> {
        self.seen.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("out of script".to_string()))
    }
}

/// Image generator that always succeeds with a tiny PNG payload, or always
/// fails.
pub struct FakeImages {
    pub fail: bool,
}

#[async_trait]
impl ImageGenerator for FakeImages {
    async fn generate(&self, prompt: &str) -> Result<GeneratedImage, ImageError> {
        if self.fail {
            return Err(ImageError::RequestFailed {
                service: "fake".to_string(),
                reason: "model loading".to_string(),
            });
        }
        Ok(GeneratedImage {
            mime_type: "image/png".to_string(),
            base64: "aW1hZ2U=".to_string(),
            prompt: prompt.to_string(),
        })
    }
}

/// Image host that records payloads.
#[derive(Default)]
pub struct FakeHost {
    pub uploads: Mutex<Vec<String>>,
}

#[async_trait]
impl ImageHost for FakeHost {
    async fn upload(&self, base64: &str) -> Result<HostedImage, ImageError> {
        if base64.trim().is_empty() {
            return Err(ImageError::EmptyPayload);
        }
        self.uploads.lock().unwrap().push(base64.to_string());
        Ok(HostedImage {
            url: "https://iili.io/fake.png".to_string(),
            display_url: "https://iili.io/fake.md.png".to_string(),
        })
    }
}

pub struct Harness {
    pub app: Router,
    pub state: Arc<AppState>,
    pub llm: Arc<ScriptedLlm>,
    pub host: Arc<FakeHost>,
}

pub fn harness(llm: Arc<ScriptedLlm>) -> Harness {
    harness_with(llm, false, |_| {})
}

pub fn harness_with(
    llm: Arc<ScriptedLlm>,
    images_fail: bool,
    tweak: impl FnOnce(&mut Config),
) -> Harness {
    let mut config = Config::default();
    config.http.contract_config_path = PathBuf::from("/nonexistent/contract_config.json");
    tweak(&mut config);

    let host = Arc::new(FakeHost::default());
    let state = Arc::new(
        AppState::new(
            &config,
            llm.clone(),
            Arc::new(FakeImages { fail: images_fail }),
            host.clone(),
        )
        .unwrap(),
    );
    Harness {
        app: router(state.clone()),
        state,
        llm,
        host,
    }
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, body)
}

pub async fn post_json(app: &Router, path: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn get(app: &Router, path: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(path).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn delete(app: &Router, path: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("DELETE")
        .uri(path)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn chat(app: &Router, message: &str, mode: Option<&str>) -> Value {
    let mut body = serde_json::json!({
        "message": message,
        "wallet_address": SELF_WALLET,
        "current_balance": "10",
    });
    if let Some(mode) = mode {
        body["mode"] = Value::String(mode.to_string());
    }
    let (status, value) = post_json(app, "/api/chat", body).await;
    assert_eq!(status, StatusCode::OK, "chat always answers 200");
    value
}
