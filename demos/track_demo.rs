//! Minimal tracking demo.
//!
//! Run with:
//!     RESPECTLYTICS_API_KEY=your-key cargo run --example track_demo

use respectlytics::{Config, Respectlytics};
use std::time::Duration;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let api_key =
        std::env::var("RESPECTLYTICS_API_KEY").unwrap_or_else(|_| "demo-key".to_string());

    let config = Config::new(api_key).with_app_version(env!("CARGO_PKG_VERSION"));
    let client = Respectlytics::new(config).expect("invalid configuration");

    client.track("demo_started");
    client.track_on_screen("button_clicked", "Home");
    client.flush();

    // Give the detached delivery task a moment before exiting.
    tokio::time::sleep(Duration::from_secs(2)).await;

    println!("{:#?}", client.diagnostics());
    client.shutdown().await;
}
