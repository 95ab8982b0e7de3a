//! Spy answer pipeline for integration testing.
//!
//! Answers every `POST /v1/answer` with a fixed body, optionally after a
//! delay, and remembers the requests it received.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::sync::RwLock;

use super::spawn_app;

/// Handle to a running spy answer pipeline.
#[derive(Debug, Clone)]
pub struct MockAnswer {
    pub addr: SocketAddr,
    state: Arc<MockState>,
}

#[derive(Debug)]
struct MockState {
    reply: Value,
    delay: Duration,
    requests: RwLock<Vec<Value>>,
}

impl MockAnswer {
    /// Start a spy that replies with `reply`.
    pub async fn start(reply: Value) -> Self {
        Self::start_with_delay(reply, Duration::ZERO).await
    }

    /// Start a spy that waits `delay` before replying with `reply`.
    pub async fn start_with_delay(reply: Value, delay: Duration) -> Self {
        let state = Arc::new(MockState {
            reply,
            delay,
            requests: RwLock::new(Vec::new()),
        });
        let router = Router::new()
            .route("/v1/answer", post(handle_answer))
            .with_state(state.clone());
        let addr = spawn_app(router).await;
        Self { addr, state }
    }

    /// Start a spy with a default reply that carries an extra field.
    pub async fn start_default() -> Self {
        Self::start(default_reply()).await
    }

    /// Number of requests received.
    pub async fn request_count(&self) -> usize {
        self.state.requests.read().await.len()
    }

    /// Most recent request body.
    pub async fn last_request(&self) -> Option<Value> {
        self.state.requests.read().await.last().cloned()
    }
}

/// Reply used by [`MockAnswer::start_default`].
pub fn default_reply() -> Value {
    json!({
        "answer": "mock answer",
        "used_context": "mock ctx",
        "trace_id": "t-1"
    })
}

async fn handle_answer(
    State(state): State<Arc<MockState>>,
    Json(body): Json<Value>,
) -> Json<Value> {
    state.requests.write().await.push(body);
    tokio::time::sleep(state.delay).await;
    Json(state.reply.clone())
}
