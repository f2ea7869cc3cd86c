//! Polls a JSON endpoint every 30 seconds and prints each response.
//!
//! ```bash
//! WATCH_URL=https://api.github.com/zen cargo run --example watch
//! ```

use std::time::Duration;

use micropoll::{Poller, Request};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let url = std::env::var("WATCH_URL")
        .unwrap_or_else(|_| "https://httpbin.org/json".to_owned());

    let poller = Poller::<serde_json::Value>::builder(
        Request::get(url.as_str()).retry_after(Duration::from_secs(5)),
    )
    .on_success(|body| println!("{body}"))
    .on_error(|error| eprintln!("poll failed: {error}"))
    .build();

    if poller.start(Duration::from_secs(30)).await.is_none() {
        eprintln!("first poll of {url} failed, retrying in the background");
    }

    tokio::time::sleep(Duration::from_secs(120)).await;
    poller.stop();
    Ok(())
}
