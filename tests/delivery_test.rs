//! Delivery transport tests against a scripted local collector.

mod common;

use std::sync::Arc;
use std::time::Duration;

use respectlytics::{
    Config, Diagnostics, Event, EventMetadata, NetworkClient, NetworkError, Transport,
};

use common::start_collector;

fn fast_config(api_key: &str, endpoint: &str) -> Config {
    let mut config = Config::new(api_key).with_endpoint(endpoint);
    config.retry_base_delay = Duration::from_millis(10);
    config
}

fn client_for(config: &Config) -> (NetworkClient, Arc<Diagnostics>) {
    let diagnostics = Arc::new(Diagnostics::default());
    (NetworkClient::new(config, diagnostics.clone()), diagnostics)
}

fn event(name: &str) -> Event {
    Event::new(name, "a".repeat(32), None, EventMetadata::detect("test"))
}

#[tokio::test]
async fn test_batch_delivered_in_order_with_credentials() {
    let (endpoint, collector) = start_collector().await;
    let (client, diagnostics) = client_for(&fast_config("k1", &endpoint));

    let batch = vec![event("first"), event("second"), event("third")];
    client.send_batch(batch).await.unwrap();

    assert_eq!(collector.event_names(), vec!["first", "second", "third"]);
    assert_eq!(collector.api_keys(), vec!["k1", "k1", "k1"]);
    assert_eq!(diagnostics.snapshot().events_sent, 3);
}

#[tokio::test]
async fn test_unauthorized_aborts_batch_without_retry() {
    let (endpoint, collector) = start_collector().await;
    collector.script(&[401]);
    let (client, _) = client_for(&fast_config("bad-key", &endpoint));

    let failure = client
        .send_batch(vec![event("a"), event("b"), event("c")])
        .await
        .unwrap_err();

    assert_eq!(failure.error, NetworkError::Unauthorized);
    assert_eq!(failure.unsent.len(), 3);
    assert_eq!(failure.unsent[0].event_name, "a");
    // One request only: nothing after the first event was attempted.
    assert_eq!(collector.request_count(), 1);
}

#[tokio::test]
async fn test_bad_request_drops_event_and_continues() {
    let (endpoint, collector) = start_collector().await;
    collector.script(&[400]);
    let (client, diagnostics) = client_for(&fast_config("k1", &endpoint));

    client
        .send_batch(vec![event("malformed"), event("fine")])
        .await
        .unwrap();

    assert_eq!(collector.event_names(), vec!["malformed", "fine"]);
    let snapshot = diagnostics.snapshot();
    assert_eq!(snapshot.events_dropped, 1);
    assert_eq!(snapshot.events_sent, 1);
}

#[tokio::test]
async fn test_rate_limit_retried_with_backoff() {
    let (endpoint, collector) = start_collector().await;
    collector.script(&[429, 429]);
    let (client, _) = client_for(&fast_config("k1", &endpoint));

    client.send_batch(vec![event("e")]).await.unwrap();

    // Two 429s, then success on the third attempt.
    assert_eq!(collector.request_count(), 3);
}

#[tokio::test]
async fn test_rate_limit_exhausts_retries() {
    let (endpoint, collector) = start_collector().await;
    collector.script(&[429, 429, 429]);
    let (client, _) = client_for(&fast_config("k1", &endpoint));

    let failure = client.send_batch(vec![event("e")]).await.unwrap_err();

    assert_eq!(failure.error, NetworkError::RateLimited);
    assert_eq!(failure.unsent.len(), 1);
    assert_eq!(collector.request_count(), 3);
}

#[tokio::test]
async fn test_server_error_retried_then_reported() {
    let (endpoint, collector) = start_collector().await;
    collector.script(&[500, 503]);
    let (client, _) = client_for(&fast_config("k1", &endpoint));

    // Recovers within the retry budget.
    client.send_batch(vec![event("e")]).await.unwrap();
    assert_eq!(collector.request_count(), 3);

    // Exhausts the budget: the error carries the final status code.
    collector.script(&[500, 500, 502]);
    let failure = client.send_batch(vec![event("e2")]).await.unwrap_err();
    assert_eq!(failure.error, NetworkError::ServerError(502));
}

#[tokio::test]
async fn test_unreachable_collector_reports_network_error() {
    // Nothing listens here; connections are refused immediately.
    let (client, _) = client_for(&fast_config("k1", "http://127.0.0.1:9/api/v1/events/"));

    let failure = client
        .send_batch(vec![event("a"), event("b")])
        .await
        .unwrap_err();

    assert!(matches!(failure.error, NetworkError::Network(_)));
    assert_eq!(failure.unsent.len(), 2);
}
