//! Shared test collector: a local HTTP server standing in for the
//! Respectlytics API, with scriptable status codes per request.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};

#[derive(Default)]
pub struct Collector {
    received: Mutex<Vec<serde_json::Value>>,
    api_keys: Mutex<Vec<String>>,
    script: Mutex<VecDeque<u16>>,
}

impl Collector {
    /// Queue up status codes for the next requests. Anything beyond the
    /// script gets a 200.
    pub fn script(&self, statuses: &[u16]) {
        self.script
            .lock()
            .unwrap()
            .extend(statuses.iter().copied());
    }

    /// Bodies of every request received so far.
    pub fn bodies(&self) -> Vec<serde_json::Value> {
        self.received.lock().unwrap().clone()
    }

    /// `event_name` of every request received so far.
    pub fn event_names(&self) -> Vec<String> {
        self.bodies()
            .iter()
            .map(|b| b["event_name"].as_str().unwrap_or("").to_string())
            .collect()
    }

    pub fn request_count(&self) -> usize {
        self.received.lock().unwrap().len()
    }

    /// `X-App-Key` header of every request received so far.
    pub fn api_keys(&self) -> Vec<String> {
        self.api_keys.lock().unwrap().clone()
    }
}

async fn handle(
    State(collector): State<Arc<Collector>>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> StatusCode {
    collector.received.lock().unwrap().push(body);
    if let Some(key) = headers.get("x-app-key").and_then(|v| v.to_str().ok()) {
        collector.api_keys.lock().unwrap().push(key.to_string());
    }

    let status = collector.script.lock().unwrap().pop_front().unwrap_or(200);
    StatusCode::from_u16(status).unwrap_or(StatusCode::OK)
}

/// Start a collector on a random port; returns the events endpoint URL.
pub async fn start_collector() -> (String, Arc<Collector>) {
    let collector = Arc::new(Collector::default());
    let app = Router::new()
        .route("/api/v1/events/", post(handle))
        .with_state(collector.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind test collector");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}/api/v1/events/"), collector)
}
